use std::sync::{Arc, RwLock};

use crate::Catalog;

/// Shared, atomically replaceable catalog snapshot.
///
/// Readers clone the `Arc` and keep it for the whole request; a swap never
/// affects a snapshot already handed out.
#[derive(Debug)]
pub struct CatalogHandle {
    inner: RwLock<Slot>,
}

#[derive(Debug)]
struct Slot {
    generation: u64,
    catalog: Arc<Catalog>,
}

impl CatalogHandle {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            inner: RwLock::new(Slot {
                generation: 1,
                catalog: Arc::new(catalog),
            }),
        }
    }

    pub fn snapshot(&self) -> Arc<Catalog> {
        let slot = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&slot.catalog)
    }

    pub fn generation(&self) -> u64 {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).generation
    }

    /// Install `catalog` and return the new generation.
    pub fn swap(&self, catalog: Catalog) -> u64 {
        let mut slot = self.inner.write().unwrap_or_else(|e| e.into_inner());
        slot.generation += 1;
        slot.catalog = Arc::new(catalog);
        slot.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Column, ColumnType, Table};

    fn catalog(table: &str) -> Catalog {
        Catalog::new(
            vec![Table::new(table).with_column(Column::new("id", ColumnType::Number))],
            vec![],
        )
        .unwrap()
    }

    #[test]
    fn swap_bumps_generation_and_keeps_old_snapshots() {
        let handle = CatalogHandle::new(catalog("a"));
        let before = handle.snapshot();
        assert_eq!(handle.generation(), 1);

        assert_eq!(handle.swap(catalog("b")), 2);
        assert_eq!(before.table_names(), vec!["a"]);
        assert_eq!(handle.snapshot().table_names(), vec!["b"]);
    }
}

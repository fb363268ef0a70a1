//! Name resolution against the catalog.
//!
//! Tables: exact, then normalised (case, spaces, hyphens), then singular/plural
//! variants, then declared aliases. Columns: exact, normalised, declared aliases.
//! A stage that matches more than one entry stops resolution as ambiguous.

use crate::{Catalog, Column, Table};

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<T> {
    Found(T),
    Missing,
    /// Canonical names of every candidate matched at the deciding stage.
    Ambiguous(Vec<String>),
}

impl<T> Resolution<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Resolution::Found(t) => Some(t),
            _ => None,
        }
    }
}

/// Lowercase, trim, and collapse whitespace/hyphen runs into `_`.
pub fn normalize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_sep = false;
    for c in name.trim().chars() {
        if c.is_whitespace() || c == '-' || c == '_' {
            pending_sep = true;
            continue;
        }
        if pending_sep && !out.is_empty() {
            out.push('_');
        }
        pending_sep = false;
        out.extend(c.to_lowercase());
    }
    out
}

/// Singular/plural spellings of an already-normalised word, excluding the word itself.
pub fn number_variants(word: &str) -> Vec<String> {
    let mut variants = Vec::new();
    if let Some(stem) = word.strip_suffix("ies") {
        variants.push(format!("{stem}y"));
    }
    if let Some(stem) = word.strip_suffix("es") {
        variants.push(stem.to_string());
    }
    if let Some(stem) = word.strip_suffix('s') {
        variants.push(stem.to_string());
    } else {
        variants.push(format!("{word}s"));
        variants.push(format!("{word}es"));
        if let Some(stem) = word.strip_suffix('y') {
            if !stem.ends_with(['a', 'e', 'i', 'o', 'u']) {
                variants.push(format!("{stem}ies"));
            }
        }
    }
    variants.retain(|v| !v.is_empty() && v != word);
    variants.dedup();
    variants
}

fn decide<'a, T, F>(candidates: Vec<&'a T>, name_of: F) -> Option<Resolution<&'a T>>
where
    F: Fn(&T) -> &str,
{
    let mut unique: Vec<&'a T> = Vec::new();
    for c in candidates {
        if !unique.iter().any(|u| std::ptr::eq(*u, c)) {
            unique.push(c);
        }
    }
    match unique.len() {
        0 => None,
        1 => Some(Resolution::Found(unique[0])),
        _ => Some(Resolution::Ambiguous(
            unique.iter().map(|c| name_of(c).to_string()).collect(),
        )),
    }
}

impl Catalog {
    pub fn resolve_table(&self, name: &str) -> Resolution<&Table> {
        if let Some(t) = self.tables().iter().find(|t| t.name == name) {
            return Resolution::Found(t);
        }

        let wanted = normalize(name);
        if wanted.is_empty() {
            return Resolution::Missing;
        }
        let by_name = |target: &str| -> Vec<&Table> {
            self.tables()
                .iter()
                .filter(|t| normalize(&t.name) == target)
                .collect()
        };

        if let Some(r) = decide(by_name(&wanted), |t| &t.name) {
            return r;
        }

        let variants = number_variants(&wanted);
        let plural: Vec<&Table> = variants.iter().flat_map(|v| by_name(v)).collect();
        if let Some(r) = decide(plural, |t| &t.name) {
            return r;
        }

        let aliased: Vec<&Table> = self
            .tables()
            .iter()
            .filter(|t| t.aliases.iter().any(|a| normalize(a) == wanted))
            .collect();
        decide(aliased, |t| &t.name).unwrap_or(Resolution::Missing)
    }
}

impl Table {
    pub fn resolve_column(&self, name: &str) -> Resolution<&Column> {
        if let Some(c) = self.find_column(name) {
            return Resolution::Found(c);
        }

        let wanted = normalize(name);
        if wanted.is_empty() {
            return Resolution::Missing;
        }

        let normalised: Vec<&Column> = self
            .columns
            .iter()
            .filter(|c| normalize(&c.name) == wanted)
            .collect();
        if let Some(r) = decide(normalised, |c| &c.name) {
            return r;
        }

        let aliased: Vec<&Column> = self
            .columns
            .iter()
            .filter(|c| c.aliases.iter().any(|a| normalize(a) == wanted))
            .collect();
        decide(aliased, |c| &c.name).unwrap_or(Resolution::Missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Column, ColumnType};

    fn catalog() -> Catalog {
        Catalog::new(
            vec![
                Table::new("customers")
                    .with_alias("clients")
                    .with_column(Column::new("customerid", ColumnType::Number).primary_key())
                    .with_column(
                        Column::new("annual_income_k", ColumnType::Number)
                            .with_alias("income")
                            .with_alias("salary"),
                    )
                    .with_column(Column::new("spending_score", ColumnType::Number)),
                Table::new("category")
                    .with_column(Column::new("id", ColumnType::Number).primary_key()),
                Table::new("order_items")
                    .with_column(Column::new("id", ColumnType::Number).primary_key()),
            ],
            vec![],
        )
        .unwrap()
    }

    #[test]
    fn normalize_collapses_separators() {
        assert_eq!(normalize("  Spending  Score "), "spending_score");
        assert_eq!(normalize("order-items"), "order_items");
    }

    #[test]
    fn plural_variants_cover_common_forms() {
        assert!(number_variants("customer").contains(&"customers".to_string()));
        assert!(number_variants("categories").contains(&"category".to_string()));
        assert!(number_variants("category").contains(&"categories".to_string()));
        assert!(number_variants("boxes").contains(&"box".to_string()));
    }

    #[test]
    fn table_resolution_stages() {
        let c = catalog();
        assert_eq!(c.resolve_table("customers").found().unwrap().name, "customers");
        assert_eq!(c.resolve_table("CUSTOMERS").found().unwrap().name, "customers");
        assert_eq!(c.resolve_table("customer").found().unwrap().name, "customers");
        assert_eq!(c.resolve_table("categories").found().unwrap().name, "category");
        assert_eq!(c.resolve_table("order item").found().unwrap().name, "order_items");
        assert_eq!(c.resolve_table("Clients").found().unwrap().name, "customers");
    }

    #[test]
    fn misspelled_table_is_missing() {
        assert_eq!(catalog().resolve_table("custmers"), Resolution::Missing);
    }

    #[test]
    fn column_resolution_uses_aliases() {
        let c = catalog();
        let customers = c.table("customers").unwrap();
        assert_eq!(
            customers.resolve_column("Spending Score").found().unwrap().name,
            "spending_score"
        );
        assert_eq!(
            customers.resolve_column("salary").found().unwrap().name,
            "annual_income_k"
        );
        assert_eq!(customers.resolve_column("height"), Resolution::Missing);
    }

    #[test]
    fn alias_shared_by_two_columns_is_ambiguous() {
        let table = Table::new("t")
            .with_column(Column::new("a", ColumnType::Number).with_alias("score"))
            .with_column(Column::new("b", ColumnType::Number).with_alias("score"));
        match table.resolve_column("score") {
            Resolution::Ambiguous(names) => assert_eq!(names, vec!["a", "b"]),
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }
}

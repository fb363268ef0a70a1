//! Tables visible to one statement and column lookup against them.

use nlq_schema::resolve::normalize;
use nlq_schema::{Catalog, Column, Resolution, Table};
use nlq_types::ColumnRef;

use crate::writer::quote_ident;
use crate::SynthError;

pub(crate) fn resolve_table<'c>(catalog: &'c Catalog, name: &str) -> Result<&'c Table, SynthError> {
    match catalog.resolve_table(name) {
        Resolution::Found(table) => Ok(table),
        Resolution::Missing => Err(SynthError::UnknownTable(name.to_string())),
        Resolution::Ambiguous(candidates) => Err(SynthError::AmbiguousReference {
            name: name.to_string(),
            candidates,
        }),
    }
}

/// A column resolved to its canonical table and column.
#[derive(Clone, Copy)]
pub(crate) struct Bound<'c> {
    pub table: &'c Table,
    pub column: &'c Column,
}

pub(crate) struct Scope<'c> {
    catalog: &'c Catalog,
    tables: Vec<&'c Table>,
    qualify: bool,
}

impl<'c> Scope<'c> {
    pub(crate) fn single(catalog: &'c Catalog, table: &'c Table) -> Self {
        Self {
            catalog,
            tables: vec![table],
            qualify: false,
        }
    }

    pub(crate) fn joined(catalog: &'c Catalog, tables: Vec<&'c Table>) -> Self {
        Self {
            catalog,
            tables,
            qualify: true,
        }
    }

    pub(crate) fn column(&self, reference: &ColumnRef) -> Result<Bound<'c>, SynthError> {
        match &reference.table {
            Some(qualifier) => {
                let wanted = resolve_table(self.catalog, qualifier)?;
                let table = self
                    .tables
                    .iter()
                    .copied()
                    .find(|t| t.name == wanted.name)
                    .ok_or_else(|| {
                        SynthError::UnsupportedIntent(format!(
                            "column `{reference}` refers to table `{}` which is not part of the query",
                            wanted.name
                        ))
                    })?;
                match table.resolve_column(&reference.column) {
                    Resolution::Found(column) => Ok(Bound { table, column }),
                    Resolution::Missing => Err(SynthError::UnknownColumn {
                        table: table.name.clone(),
                        column: reference.column.clone(),
                    }),
                    Resolution::Ambiguous(candidates) => Err(SynthError::AmbiguousReference {
                        name: reference.to_string(),
                        candidates: candidates
                            .into_iter()
                            .map(|c| format!("{}.{c}", table.name))
                            .collect(),
                    }),
                }
            }
            None => self.unqualified(&reference.column),
        }
    }

    fn unqualified(&self, name: &str) -> Result<Bound<'c>, SynthError> {
        let mut found = Vec::new();
        let mut ambiguous = Vec::new();
        for &table in &self.tables {
            match table.resolve_column(name) {
                Resolution::Found(column) => found.push(Bound { table, column }),
                Resolution::Missing => {}
                Resolution::Ambiguous(candidates) => ambiguous
                    .extend(candidates.into_iter().map(|c| format!("{}.{c}", table.name))),
            }
        }

        if found.len() > 1 {
            let wanted = normalize(name);
            let exact: Vec<Bound<'c>> = found
                .iter()
                .copied()
                .filter(|b| normalize(&b.column.name) == wanted)
                .collect();
            if exact.len() == 1 {
                return Ok(exact[0]);
            }
        }

        match (found.as_slice(), ambiguous.is_empty()) {
            ([only], true) => Ok(*only),
            ([], true) => Err(SynthError::UnknownColumn {
                table: self
                    .tables
                    .iter()
                    .map(|t| t.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                column: name.to_string(),
            }),
            _ => Err(SynthError::AmbiguousReference {
                name: name.to_string(),
                candidates: found
                    .iter()
                    .map(|b| format!("{}.{}", b.table.name, b.column.name))
                    .chain(ambiguous)
                    .collect(),
            }),
        }
    }

    /// Column expression as it appears in statement text.
    pub(crate) fn render(&self, bound: Bound<'_>) -> String {
        if self.qualify {
            format!(
                "{}.{}",
                quote_ident(&bound.table.name),
                quote_ident(&bound.column.name)
            )
        } else {
            quote_ident(&bound.column.name)
        }
    }
}

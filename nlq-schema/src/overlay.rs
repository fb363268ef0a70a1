//! Extra table/column aliases and qualifiers layered over a catalog loaded
//! from database metadata, which carries neither.
//!
//! ```yaml
//! tables:
//!   customers:
//!     aliases: [clients, shoppers]
//!     columns:
//!       annual_income_k: [income, salary]
//!     qualifiers:
//!       gender:
//!         - { phrase: female, value: Female }
//!       spending_score:
//!         - { phrase: high spending, operator: greater_than, value: 70 }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Catalog, CatalogError, Column, Qualifier};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AliasOverlay {
    #[serde(default)]
    pub tables: BTreeMap<String, TableOverlay>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TableOverlay {
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub columns: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub qualifiers: BTreeMap<String, Vec<Qualifier>>,
}

impl AliasOverlay {
    pub fn from_yaml_str(text: &str) -> Result<Self, CatalogError> {
        serde_yaml::from_str(text).map_err(|e| CatalogError::Parse(e.to_string()))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let text = fs::read_to_string(path).map_err(|e| CatalogError::Io(e.to_string()))?;
        Self::from_yaml_str(&text)
    }
}

impl Catalog {
    /// Merge `overlay` into a copy of this catalog. Targets are matched
    /// case-insensitively; an unknown target is an error, duplicate aliases are
    /// dropped.
    pub fn with_overlay(&self, overlay: &AliasOverlay) -> Result<Catalog, CatalogError> {
        let mut tables = self.tables.clone();
        for (table_name, extra) in &overlay.tables {
            let table = tables
                .iter_mut()
                .find(|t| t.name.eq_ignore_ascii_case(table_name))
                .ok_or_else(|| CatalogError::UnknownTable(table_name.clone()))?;
            merge(&mut table.aliases, &extra.aliases);

            for (column_name, aliases) in &extra.columns {
                let column = column_mut(&table.name, &mut table.columns, column_name)?;
                merge(&mut column.aliases, aliases);
            }
            for (column_name, qualifiers) in &extra.qualifiers {
                let column = column_mut(&table.name, &mut table.columns, column_name)?;
                for qualifier in qualifiers {
                    column
                        .qualifiers
                        .retain(|q| !q.phrase.eq_ignore_ascii_case(&qualifier.phrase));
                    column.qualifiers.push(qualifier.clone());
                }
            }
        }
        Catalog::new(tables, self.relationships.clone())
    }
}

fn column_mut<'a>(
    table: &str,
    columns: &'a mut [Column],
    name: &str,
) -> Result<&'a mut Column, CatalogError> {
    columns
        .iter_mut()
        .find(|c| c.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| CatalogError::UnknownColumn {
            table: table.to_string(),
            column: name.to_string(),
        })
}

fn merge(into: &mut Vec<String>, extra: &[String]) {
    for alias in extra {
        if !into.iter().any(|a| a.eq_ignore_ascii_case(alias)) {
            into.push(alias.clone());
        }
    }
}

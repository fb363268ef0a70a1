#![forbid(unsafe_code)]

//! Schema Catalog: the read-only description of the target database that every
//! synthesized statement is checked against.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod demo;
pub mod handle;
pub mod join;
pub mod macros;
pub mod overlay;
pub mod resolve;

pub use handle::CatalogHandle;
pub use join::{JoinPath, JoinStep};
pub use nlq_types::{ColumnType, Qualifier};
pub use overlay::AliasOverlay;
pub use resolve::Resolution;

use nlq_types::{ColumnTerms, TableTerms, Vocabulary};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("duplicate table `{0}`")]
    DuplicateTable(String),
    #[error("table `{0}` has no columns")]
    EmptyTable(String),
    #[error("duplicate column `{column}` in table `{table}`")]
    DuplicateColumn { table: String, column: String },
    #[error("unknown table `{0}`")]
    UnknownTable(String),
    #[error("unknown column `{table}.{column}`")]
    UnknownColumn { table: String, column: String },
    #[error("qualifier `{phrase}` on `{table}.{column}` needs one value, or none for a null check")]
    InvalidQualifier {
        table: String,
        column: String,
        phrase: String,
    },
    #[error("relationship target `{table}.{column}` is not a primary key")]
    TargetNotPrimaryKey { table: String, column: String },
    #[error("io error: {0}")]
    Io(String),
    #[error("parse error: {0}")]
    Parse(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: ColumnType,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub primary_key: bool,
    /// Derived from the catalog's relationships; ignored on input.
    #[serde(default)]
    pub foreign_key: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub qualifiers: Vec<Qualifier>,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: false,
            primary_key: false,
            foreign_key: false,
            aliases: Vec::new(),
            qualifiers: Vec::new(),
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn with_qualifier(mut self, qualifier: Qualifier) -> Self {
        self.qualifiers.push(qualifier);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            aliases: Vec::new(),
        }
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Exact-name lookup.
    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    fn find_column_ci(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// Directed reference from a foreign-key column to a primary-key column.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relationship {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
}

impl Relationship {
    pub fn new(
        from_table: impl Into<String>,
        from_column: impl Into<String>,
        to_table: impl Into<String>,
        to_column: impl Into<String>,
    ) -> Self {
        Self {
            from_table: from_table.into(),
            from_column: from_column.into(),
            to_table: to_table.into(),
            to_column: to_column.into(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
struct CatalogSpec {
    tables: Vec<Table>,
    #[serde(default)]
    relationships: Vec<Relationship>,
}

impl TryFrom<CatalogSpec> for Catalog {
    type Error = CatalogError;

    fn try_from(spec: CatalogSpec) -> Result<Self, Self::Error> {
        Catalog::new(spec.tables, spec.relationships)
    }
}

/// Validated, immutable catalog snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CatalogSpec")]
pub struct Catalog {
    tables: Vec<Table>,
    relationships: Vec<Relationship>,
}

impl Catalog {
    /// Validate tables and relationships and derive foreign-key flags.
    ///
    /// Relationship endpoints are matched case-insensitively and rewritten to the
    /// canonical table/column spelling.
    pub fn new(
        mut tables: Vec<Table>,
        relationships: Vec<Relationship>,
    ) -> Result<Self, CatalogError> {
        for (i, table) in tables.iter().enumerate() {
            if table.columns.is_empty() {
                return Err(CatalogError::EmptyTable(table.name.clone()));
            }
            if tables[..i]
                .iter()
                .any(|t| t.name.eq_ignore_ascii_case(&table.name))
            {
                return Err(CatalogError::DuplicateTable(table.name.clone()));
            }
            for (j, column) in table.columns.iter().enumerate() {
                if table.columns[..j]
                    .iter()
                    .any(|c| c.name.eq_ignore_ascii_case(&column.name))
                {
                    return Err(CatalogError::DuplicateColumn {
                        table: table.name.clone(),
                        column: column.name.clone(),
                    });
                }
                if let Some(bad) = column.qualifiers.iter().find(|q| !q.is_well_formed()) {
                    return Err(CatalogError::InvalidQualifier {
                        table: table.name.clone(),
                        column: column.name.clone(),
                        phrase: bad.phrase.clone(),
                    });
                }
            }
        }

        for table in tables.iter_mut() {
            for column in table.columns.iter_mut() {
                column.foreign_key = false;
            }
        }

        let mut canonical = Vec::with_capacity(relationships.len());
        for rel in relationships {
            let (to_table, to_column) = {
                let (table, column) = locate(&tables, &rel.to_table, &rel.to_column)?;
                if !column.primary_key {
                    return Err(CatalogError::TargetNotPrimaryKey {
                        table: table.name.clone(),
                        column: column.name.clone(),
                    });
                }
                (table.name.clone(), column.name.clone())
            };
            let (from_table, from_column) = {
                let (table, column) = locate(&tables, &rel.from_table, &rel.from_column)?;
                (table.name.clone(), column.name.clone())
            };
            if let Some(column) = tables
                .iter_mut()
                .find(|t| t.name == from_table)
                .and_then(|t| t.columns.iter_mut().find(|c| c.name == from_column))
            {
                column.foreign_key = true;
            }
            let rel = Relationship {
                from_table,
                from_column,
                to_table,
                to_column,
            };
            if !canonical.contains(&rel) {
                canonical.push(rel);
            }
        }

        Ok(Self {
            tables,
            relationships: canonical,
        })
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, CatalogError> {
        serde_yaml::from_str(text).map_err(|e| CatalogError::Parse(e.to_string()))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let text = fs::read_to_string(path).map_err(|e| CatalogError::Io(e.to_string()))?;
        Self::from_yaml_str(&text)
    }

    pub fn to_yaml_string(&self) -> Result<String, CatalogError> {
        serde_yaml::to_string(self).map_err(|e| CatalogError::Parse(e.to_string()))
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    /// Exact-name lookup.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Names, aliases and types handed to intent parsers for grounding.
    pub fn vocabulary(&self) -> Vocabulary {
        Vocabulary {
            tables: self
                .tables
                .iter()
                .map(|t| TableTerms {
                    name: t.name.clone(),
                    aliases: t.aliases.clone(),
                    columns: t
                        .columns
                        .iter()
                        .map(|c| ColumnTerms {
                            name: c.name.clone(),
                            aliases: c.aliases.clone(),
                            data_type: c.data_type,
                            qualifiers: c.qualifiers.clone(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

fn locate<'a>(
    tables: &'a [Table],
    table: &str,
    column: &str,
) -> Result<(&'a Table, &'a Column), CatalogError> {
    let t = tables
        .iter()
        .find(|t| t.name.eq_ignore_ascii_case(table))
        .ok_or_else(|| CatalogError::UnknownTable(table.to_string()))?;
    let c = t
        .find_column_ci(column)
        .ok_or_else(|| CatalogError::UnknownColumn {
            table: t.name.clone(),
            column: column.to_string(),
        })?;
    Ok((t, c))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Table {
        Table::new("users")
            .with_column(Column::new("id", ColumnType::Number).primary_key())
            .with_column(Column::new("email", ColumnType::String))
    }

    fn posts() -> Table {
        Table::new("posts")
            .with_column(Column::new("id", ColumnType::Number).primary_key())
            .with_column(Column::new("author_id", ColumnType::Number))
    }

    #[test]
    fn relationships_mark_foreign_keys_and_canonicalize() {
        let catalog = Catalog::new(
            vec![users(), posts()],
            vec![Relationship::new("POSTS", "Author_Id", "users", "ID")],
        )
        .unwrap();
        let rel = &catalog.relationships()[0];
        assert_eq!(rel.from_table, "posts");
        assert_eq!(rel.from_column, "author_id");
        assert_eq!(rel.to_column, "id");
        let author = catalog.table("posts").unwrap().find_column("author_id").unwrap();
        assert!(author.foreign_key);
    }

    #[test]
    fn duplicate_tables_are_rejected_case_insensitively() {
        let err = Catalog::new(vec![users(), Table::new("Users").with_column(Column::new("x", ColumnType::String))], vec![])
            .unwrap_err();
        assert_eq!(err, CatalogError::DuplicateTable("Users".into()));
    }

    #[test]
    fn relationship_target_must_be_primary_key() {
        let err = Catalog::new(
            vec![users(), posts()],
            vec![Relationship::new("posts", "author_id", "users", "email")],
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::TargetNotPrimaryKey { .. }));
    }

    #[test]
    fn unknown_relationship_column_is_rejected() {
        let err = Catalog::new(
            vec![users(), posts()],
            vec![Relationship::new("posts", "writer_id", "users", "id")],
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::UnknownColumn { .. }));
    }

    #[test]
    fn qualifiers_must_carry_one_value() {
        let customers = Table::new("customers")
            .with_column(Column::new("id", ColumnType::Number).primary_key())
            .with_column(
                Column::new("gender", ColumnType::String)
                    .with_qualifier(Qualifier::new("female", nlq_types::Operator::Equals, "Female")),
            );
        let catalog = Catalog::new(vec![customers.clone()], vec![]).unwrap();
        let terms = &catalog.vocabulary().tables[0].columns[1];
        assert_eq!(terms.qualifiers[0].phrase, "female");

        let broken = customers.with_column(
            Column::new("age", ColumnType::Number)
                .with_qualifier(Qualifier::new("old", nlq_types::Operator::GreaterThan, nlq_types::SqlValue::Null)),
        );
        let err = Catalog::new(vec![broken], vec![]).unwrap_err();
        assert_eq!(
            err,
            CatalogError::InvalidQualifier {
                table: "customers".into(),
                column: "age".into(),
                phrase: "old".into(),
            }
        );
    }

    #[test]
    fn yaml_catalog_is_validated_on_load() {
        let yaml = r#"
tables:
  - name: users
    columns:
      - { name: id, data_type: number, primary_key: true }
  - name: posts
    columns:
      - { name: id, data_type: number, primary_key: true }
      - { name: user_id, data_type: number }
relationships:
  - { from_table: posts, from_column: user_id, to_table: users, to_column: id }
"#;
        let catalog = Catalog::from_yaml_str(yaml).unwrap();
        assert_eq!(catalog.table_names(), vec!["users", "posts"]);

        let broken = yaml.replace("to_column: id", "to_column: nope");
        assert!(matches!(
            Catalog::from_yaml_str(&broken),
            Err(CatalogError::Parse(_))
        ));
    }

    #[test]
    fn vocabulary_lists_every_column() {
        let catalog = Catalog::new(vec![users()], vec![]).unwrap();
        let vocab = catalog.vocabulary();
        assert_eq!(vocab.tables[0].columns.len(), 2);
        assert_eq!(vocab.tables[0].columns[1].data_type, ColumnType::String);
    }
}

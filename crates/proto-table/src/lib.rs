#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid table name {name:?}")]
    InvalidTableName { name: String },
    #[error("invalid column name {column:?} in table {table}")]
    InvalidColumnName { table: String, column: String },
    #[error("invalid SQL type {sql_type:?} for column {column:?} of table {table}")]
    InvalidColumnType {
        table: String,
        column: String,
        sql_type: String,
    },
    #[error("duplicate column {column:?} in table {table}")]
    DuplicateColumn { table: String, column: String },
    #[error("column {column:?} of table {table} has an invalid path")]
    InvalidColumnPath {
        table: String,
        column: String,
        #[source]
        source: proto_sqlite::Error,
    },
    #[error("invalid index suffix {suffix:?} in table {table}")]
    InvalidIndexSuffix { table: String, suffix: String },
    #[error("failed to install proto table {table}")]
    Install {
        table: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("schema script contains illegal NUL characters")]
    NulString(#[from] std::ffi::NulError),
    #[error("schema script has trailing content without a closing ';': {trailing}")]
    ScriptTrailingContent { trailing: String },
    #[error("not inside an open transaction")]
    NotInTransaction,
    #[error("failed to decode the stored message of row {id}")]
    RowDecode {
        id: i64,
        #[source]
        source: prost::DecodeError,
    },
    #[error(transparent)]
    Rusqlite(#[from] rusqlite::Error),
}

mod db;
mod fingerprint;
mod install;
mod rows;
mod schema;

#[cfg(test)]
pub(crate) mod testdata;

pub use db::{ProtoDb, DEFAULT_BATCH_SIZE};
pub use install::install;
pub use rows::{populate, write_rows, ResultRow};
pub use schema::schema_script;

/// Declarative description of a proto table: an updatable view over a
/// raw `(id, proto)` table, with typed path-extraction columns and
/// functional indexes over them.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtoTable {
    /// View name; the backing table is `<table>_raw`.
    pub table: String,
    /// Fully qualified message name stored in the `proto` column.
    pub message: String,
    pub columns: Vec<Column>,
    #[serde(default)]
    pub indexes: Vec<Index>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    /// SQL type the extracted value is CAST to, like `TEXT` or `INTEGER`.
    pub sql_type: String,
    /// Path expression within the stored message, like `$.name`.
    pub path: String,
    #[serde(default)]
    pub strength: Strength,
}

/// Whether a column is selective enough to deserve an automatic
/// functional index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Strength {
    #[default]
    Strong,
    Weak,
}

/// An explicitly declared index. Components naming a view column are
/// expanded to that column's extraction expression; anything else
/// passes through verbatim.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Index {
    pub suffix: String,
    pub components: Vec<String>,
}

impl ProtoTable {
    pub fn validate(&self) -> Result<(), Error> {
        if !is_identifier(&self.table) {
            return Err(Error::InvalidTableName {
                name: self.table.clone(),
            });
        }

        let mut seen = std::collections::BTreeSet::new();
        for column in &self.columns {
            if !is_identifier(&column.name) {
                return Err(Error::InvalidColumnName {
                    table: self.table.clone(),
                    column: column.name.clone(),
                });
            }
            if !is_sql_type(&column.sql_type) {
                return Err(Error::InvalidColumnType {
                    table: self.table.clone(),
                    column: column.name.clone(),
                    sql_type: column.sql_type.clone(),
                });
            }
            if !seen.insert(column.name.as_str()) {
                return Err(Error::DuplicateColumn {
                    table: self.table.clone(),
                    column: column.name.clone(),
                });
            }
            proto_sqlite::parse_path(&column.path).map_err(|source| Error::InvalidColumnPath {
                table: self.table.clone(),
                column: column.name.clone(),
                source,
            })?;
        }

        for index in &self.indexes {
            if !is_identifier(&index.suffix) {
                return Err(Error::InvalidIndexSuffix {
                    table: self.table.clone(),
                    suffix: index.suffix.clone(),
                });
            }
        }

        Ok(())
    }

    pub(crate) fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// Permissive enough for `VARCHAR(64)`, restrictive enough to keep the
// generated DDL well-formed.
fn is_sql_type(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '(' | ')'))
}

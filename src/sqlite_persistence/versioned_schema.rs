use std::fmt;

use anyhow::{bail, Result};
use rusqlite::{params, Connection};

pub const DEFAULT_TIMESTAMP: &str = "(cast(strftime('%s','now') as int))";

/// Offset added to the schema version stored in `PRAGMA user_version`, so that
/// a database created before versioning (user_version 0) is never mistaken for
/// version 0 of a versioned schema.
pub const BASE_DB_VERSION: usize = 99999;

#[macro_export]
macro_rules! sqlite_column {
    ($name:expr, $sql_type:expr $(, $field:ident = $value:expr)*) => {{
        // unused_mut: the variable is only mutated when optional field
        // assignments are passed (e.g. `non_null = true`)
        #[allow(unused_mut)]
        let mut column = Column {
            name: $name,
            sql_type: $sql_type,
            is_primary_key: false,
            non_null: false,
            is_unique: false,
            default_value: None,
            foreign_key: None,
        };
        $(column.$field = $value;)*
        column
    }};
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
    Real,
    Blob,
}

impl SqlType {
    fn from_live(s: &str) -> Option<SqlType> {
        match s {
            "TEXT" => Some(SqlType::Text),
            "INTEGER" => Some(SqlType::Integer),
            "REAL" => Some(SqlType::Real),
            "BLOB" => Some(SqlType::Blob),
            _ => None,
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
            SqlType::Blob => "BLOB",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDeleteAction {
    NoAction,
    Restrict,
    SetNull,
    SetDefault,
    Cascade,
}

impl OnDeleteAction {
    fn as_sql(&self) -> &'static str {
        match self {
            OnDeleteAction::NoAction => "NO ACTION",
            OnDeleteAction::Restrict => "RESTRICT",
            OnDeleteAction::SetNull => "SET NULL",
            OnDeleteAction::SetDefault => "SET DEFAULT",
            OnDeleteAction::Cascade => "CASCADE",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ForeignKey {
    pub table: &'static str,
    pub column: &'static str,
    pub on_delete: OnDeleteAction,
}

pub struct Column {
    pub name: &'static str,
    pub sql_type: SqlType,
    pub is_primary_key: bool,
    pub non_null: bool,
    pub is_unique: bool,
    pub default_value: Option<&'static str>,
    pub foreign_key: Option<ForeignKey>,
}

pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column],
    pub indices: &'static [(&'static str, &'static str)],
    pub unique_constraints: &'static [&'static [&'static str]],
}

struct LiveColumn {
    name: String,
    sql_type: SqlType,
    non_null: bool,
    default_value: Option<String>,
    is_primary_key: bool,
}

struct LiveForeignKey {
    from_column: String,
    to_table: String,
    to_column: String,
    on_delete: String,
}

// SQLite may echo default values back wrapped in parentheses.
fn normalize_default<S: AsRef<str>>(s: S) -> String {
    let s = s.as_ref();
    if s.starts_with('(') && s.ends_with(')') {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}

impl Column {
    fn ddl(&self) -> String {
        let mut ddl = format!("{} {}", self.name, self.sql_type);
        if self.is_primary_key {
            ddl.push_str(" PRIMARY KEY");
        }
        if self.non_null {
            ddl.push_str(" NOT NULL");
        }
        if self.is_unique {
            ddl.push_str(" UNIQUE");
        }
        if let Some(default_value) = self.default_value {
            ddl.push_str(&format!(" DEFAULT {}", default_value));
        }
        if let Some(fk) = &self.foreign_key {
            ddl.push_str(&format!(
                " REFERENCES {}({}) ON DELETE {}",
                fk.table,
                fk.column,
                fk.on_delete.as_sql()
            ));
        }
        ddl
    }
}

impl Table {
    pub fn create(&self, conn: &Connection) -> Result<()> {
        let mut parts: Vec<String> = self.columns.iter().map(Column::ddl).collect();
        for unique_columns in self.unique_constraints {
            parts.push(format!("UNIQUE ({})", unique_columns.join(", ")));
        }
        conn.execute(
            &format!("CREATE TABLE {} ({});", self.name, parts.join(", ")),
            params![],
        )?;
        for (index_name, column_name) in self.indices {
            conn.execute(
                &format!(
                    "CREATE INDEX {} ON {}({});",
                    index_name, self.name, column_name
                ),
                params![],
            )?;
        }
        Ok(())
    }

    fn validate_columns(&self, conn: &Connection) -> Result<()> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", self.name))?;
        let live_columns: Vec<LiveColumn> = stmt
            .query_map(params![], |row| {
                Ok((
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i32>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, i32>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|(name, type_name, non_null, default_value, pk)| {
                let sql_type = match SqlType::from_live(&type_name) {
                    Some(t) => t,
                    None => bail!(
                        "Table {} column {} has unsupported type {}",
                        self.name,
                        name,
                        type_name
                    ),
                };
                Ok(LiveColumn {
                    name,
                    sql_type,
                    non_null: non_null == 1,
                    default_value,
                    is_primary_key: pk == 1,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if live_columns.len() != self.columns.len() {
            bail!(
                "Table {} has {} columns, expected {}. Found: [{}], expected: [{}]",
                self.name,
                live_columns.len(),
                self.columns.len(),
                live_columns
                    .iter()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                self.columns
                    .iter()
                    .map(|c| c.name)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        for (live, expected) in live_columns.iter().zip(self.columns.iter()) {
            if live.name != expected.name {
                bail!(
                    "Table {} column name mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    live.name
                );
            }
            if live.sql_type != expected.sql_type {
                bail!(
                    "Table {} column {} type mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    expected.sql_type,
                    live.sql_type
                );
            }
            if live.non_null != expected.non_null {
                bail!(
                    "Table {} column {} non-null mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    expected.non_null,
                    live.non_null
                );
            }
            if live.default_value.as_ref().map(normalize_default)
                != expected.default_value.map(normalize_default)
            {
                bail!(
                    "Table {} column {} default value mismatch: expected {:?}, got {:?}",
                    self.name,
                    expected.name,
                    expected.default_value,
                    live.default_value
                );
            }
            if live.is_primary_key != expected.is_primary_key {
                bail!(
                    "Table {} column {} primary key mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    expected.is_primary_key,
                    live.is_primary_key
                );
            }
        }
        Ok(())
    }

    fn validate_indices(&self, conn: &Connection) -> Result<()> {
        for (index_name, _) in self.indices {
            let found: bool = conn
                .query_row(
                    "SELECT 1 FROM sqlite_master WHERE type='index' AND name=?1 AND tbl_name=?2",
                    params![index_name, self.name],
                    |_| Ok(true),
                )
                .unwrap_or(false);
            if !found {
                bail!("Table {} is missing index '{}'", self.name, index_name);
            }
        }
        Ok(())
    }

    // SQLite surfaces table-level unique constraints as unique indices.
    fn validate_unique_constraints(&self, conn: &Connection) -> Result<()> {
        if self.unique_constraints.is_empty() {
            return Ok(());
        }

        let mut stmt = conn.prepare(&format!("PRAGMA index_list({})", self.name))?;
        let unique_index_names: Vec<String> = stmt
            .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, i32>(2)?)))?
            .filter_map(|r| r.ok())
            .filter(|(_, is_unique)| *is_unique == 1)
            .map(|(name, _)| name)
            .collect();

        let mut live_unique_column_sets: Vec<Vec<String>> = Vec::new();
        for index_name in &unique_index_names {
            let mut index_stmt = conn.prepare(&format!("PRAGMA index_info({})", index_name))?;
            let mut columns: Vec<String> = index_stmt
                .query_map([], |row| row.get::<_, String>(2))?
                .filter_map(|r| r.ok())
                .collect();
            columns.sort();
            live_unique_column_sets.push(columns);
        }

        for expected_columns in self.unique_constraints {
            let mut expected_sorted: Vec<&str> = expected_columns.to_vec();
            expected_sorted.sort_unstable();
            let found = live_unique_column_sets.iter().any(|live| {
                live.iter().map(String::as_str).collect::<Vec<_>>() == expected_sorted
            });
            if !found {
                bail!(
                    "Table {} is missing unique constraint on columns ({})",
                    self.name,
                    expected_columns.join(", ")
                );
            }
        }
        Ok(())
    }

    fn validate_foreign_keys(&self, conn: &Connection) -> Result<()> {
        // PRAGMA foreign_key_list: id, seq, table, from, to, on_update, on_delete, match
        let mut stmt = conn.prepare(&format!("PRAGMA foreign_key_list({})", self.name))?;
        let live_fks: Vec<LiveForeignKey> = stmt
            .query_map([], |row| {
                Ok(LiveForeignKey {
                    from_column: row.get(3)?,
                    to_table: row.get(2)?,
                    to_column: row.get(4)?,
                    on_delete: row.get(6)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        for column in self.columns {
            let Some(expected) = &column.foreign_key else {
                continue;
            };
            let matches = live_fks.iter().any(|live| {
                live.from_column == column.name
                    && live.to_table == expected.table
                    && live.to_column == expected.column
                    && live.on_delete == expected.on_delete.as_sql()
            });
            if matches {
                continue;
            }
            match live_fks.iter().find(|live| live.from_column == column.name) {
                Some(live) => bail!(
                    "Table {} column {} has foreign key mismatch: expected REFERENCES {}({}) ON DELETE {}, got REFERENCES {}({}) ON DELETE {}",
                    self.name,
                    column.name,
                    expected.table,
                    expected.column,
                    expected.on_delete.as_sql(),
                    live.to_table,
                    live.to_column,
                    live.on_delete
                ),
                None => bail!(
                    "Table {} column {} is missing foreign key: expected REFERENCES {}({}) ON DELETE {}",
                    self.name,
                    column.name,
                    expected.table,
                    expected.column,
                    expected.on_delete.as_sql()
                ),
            }
        }
        Ok(())
    }
}

pub struct VersionedSchema {
    pub version: usize,
    pub tables: &'static [Table],
    pub migration: Option<fn(&Connection) -> Result<()>>,
}

impl VersionedSchema {
    pub fn create(&self, conn: &Connection) -> Result<()> {
        conn.execute("PRAGMA foreign_keys = ON;", params![])?;
        for table in self.tables {
            table.create(conn)?;
        }
        conn.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + self.version),
            [],
        )?;
        Ok(())
    }

    pub fn validate(&self, conn: &Connection) -> Result<()> {
        for table in self.tables {
            table.validate_columns(conn)?;
            table.validate_indices(conn)?;
            table.validate_unique_constraints(conn)?;
            table.validate_foreign_keys(conn)?;
        }
        Ok(())
    }
}

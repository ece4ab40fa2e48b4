//! SQL schema for the rowkeep SQLite store.
//!
//! Tables are described as data and rendered to `CREATE ... IF NOT EXISTS`
//! statements, so provisioning can be repeated against a database in any
//! state. An existing table is never altered: if it lacks a declared column,
//! provisioning fails with [`Error::SchemaMismatch`].

use rusqlite::Connection;
use tracing::debug;

use crate::{Error, Result};

/// Written to `PRAGMA user_version` once provisioning succeeds.
pub const SCHEMA_VERSION: i64 = 1;

/// Connection-level settings. Must run outside a transaction.
const PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
";

// ─── Definitions ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct ColumnDef {
  pub name: &'static str,
  /// Everything after the column name: type, constraints, default.
  pub decl: &'static str,
}

const fn col(name: &'static str, decl: &'static str) -> ColumnDef {
  ColumnDef { name, decl }
}

#[derive(Debug, Clone, Copy)]
pub struct TableDef {
  pub name:        &'static str,
  pub columns:     &'static [ColumnDef],
  /// Table-level constraints appended after the columns.
  pub constraints: &'static [&'static str],
}

impl TableDef {
  pub fn create_sql(&self) -> String {
    let body = self
      .columns
      .iter()
      .map(|c| format!("{} {}", c.name, c.decl))
      .chain(self.constraints.iter().map(|c| (*c).to_owned()))
      .collect::<Vec<_>>()
      .join(",\n    ");
    format!("CREATE TABLE IF NOT EXISTS {} (\n    {body}\n)", self.name)
  }
}

#[derive(Debug, Clone, Copy)]
pub struct IndexDef {
  pub name:  &'static str,
  pub table: &'static str,
  /// Indexed columns or expressions, comma-separated.
  pub on:    &'static str,
}

impl IndexDef {
  pub fn create_sql(&self) -> String {
    format!("CREATE INDEX IF NOT EXISTS {} ON {}({})", self.name, self.table, self.on)
  }
}

#[derive(Debug, Clone, Copy)]
pub struct ViewDef {
  pub name:   &'static str,
  pub select: &'static str,
}

impl ViewDef {
  pub fn create_sql(&self) -> String {
    format!("CREATE VIEW IF NOT EXISTS {} AS {}", self.name, self.select)
  }
}

// ─── Tables ──────────────────────────────────────────────────────────────────

pub const USERS: TableDef = TableDef {
  name:        "users",
  columns:     &[
    col("id", "INTEGER PRIMARY KEY AUTOINCREMENT"),
    col("email", "TEXT NOT NULL UNIQUE"),
    col("name", "TEXT"),
    col("country", "TEXT NOT NULL DEFAULT 'US' CHECK (country IN ('US', 'CO', 'TN'))"),
    // 0 = not yet validated
    col("valid_email", "INTEGER NOT NULL DEFAULT 0"),
    col("average_score", "REAL NOT NULL DEFAULT 0"),
  ],
  constraints: &[],
};

pub const METAL_BANDS: TableDef = TableDef {
  name:        "metal_bands",
  columns:     &[
    col("id", "INTEGER PRIMARY KEY AUTOINCREMENT"),
    col("band_name", "TEXT NOT NULL"),
    col("fans", "INTEGER NOT NULL DEFAULT 0"),
    col("formed", "INTEGER"),
    col("split", "INTEGER"),
    col("origin", "TEXT NOT NULL"),
    col("style", "TEXT"),
  ],
  constraints: &[],
};

// No CHECK on quantity: orders are allowed to drive it negative.
pub const ITEMS: TableDef = TableDef {
  name:        "items",
  columns:     &[
    col("id", "INTEGER PRIMARY KEY AUTOINCREMENT"),
    col("name", "TEXT NOT NULL UNIQUE"),
    col("quantity", "INTEGER NOT NULL DEFAULT 10"),
  ],
  constraints: &[],
};

pub const ORDERS: TableDef = TableDef {
  name:        "orders",
  columns:     &[
    col("id", "INTEGER PRIMARY KEY AUTOINCREMENT"),
    col("item_name", "TEXT NOT NULL REFERENCES items(name)"),
    col("number", "INTEGER NOT NULL"),
    col("ordered_at", "TEXT NOT NULL"), // RFC 3339 UTC
  ],
  constraints: &[],
};

pub const PROJECTS: TableDef = TableDef {
  name:        "projects",
  columns:     &[
    col("id", "INTEGER PRIMARY KEY AUTOINCREMENT"),
    col("name", "TEXT NOT NULL UNIQUE"),
    col("weight", "INTEGER NOT NULL DEFAULT 1"),
  ],
  constraints: &[],
};

pub const CORRECTIONS: TableDef = TableDef {
  name:        "corrections",
  columns:     &[
    col("id", "INTEGER PRIMARY KEY AUTOINCREMENT"),
    col("user_id", "INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE"),
    col("project_id", "INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE"),
    col("score", "INTEGER NOT NULL DEFAULT 0"),
  ],
  constraints: &[],
};

pub const NAMES: TableDef = TableDef {
  name:        "names",
  columns:     &[col("name", "TEXT NOT NULL"), col("score", "INTEGER NOT NULL DEFAULT 0")],
  constraints: &[],
};

pub const STUDENTS: TableDef = TableDef {
  name:        "students",
  columns:     &[
    col("id", "INTEGER PRIMARY KEY AUTOINCREMENT"),
    col("name", "TEXT NOT NULL"),
    col("score", "INTEGER NOT NULL DEFAULT 0"),
    col("last_meeting", "TEXT"), // YYYY-MM-DD or NULL
  ],
  constraints: &[
    "CHECK (last_meeting IS NULL OR last_meeting GLOB '[0-9][0-9][0-9][0-9]-[0-9][0-9]-[0-9][0-9]')",
  ],
};

/// Creation order respects foreign-key dependencies.
pub const TABLES: &[TableDef] =
  &[USERS, METAL_BANDS, ITEMS, ORDERS, PROJECTS, CORRECTIONS, NAMES, STUDENTS];

// ─── Indexes and views ───────────────────────────────────────────────────────

/// The first-letter expression must match the one used by name lookups
/// exactly, or SQLite will not use these indexes. It keeps the letter's case;
/// lookups match both case forms, since SQLite's `lower()` only folds ASCII.
pub const NAME_INITIAL_EXPR: &str = "substr(name, 1, 1)";

pub const INDEXES: &[IndexDef] = &[
  IndexDef { name: "idx_name_first", table: "names", on: "substr(name, 1, 1)" },
  IndexDef { name: "idx_name_first_score", table: "names", on: "substr(name, 1, 1), score" },
  IndexDef { name: "orders_item_idx", table: "orders", on: "item_name" },
  IndexDef { name: "corrections_user_idx", table: "corrections", on: "user_id" },
];

/// Students scoring under 80 with no meeting, or none in the last month,
/// relative to the engine's current date. SQLite normalises month-end dates
/// forward (`date('2024-03-31', '-1 month')` is 2024-03-02), so on those days
/// the view can list students that `students_needing_meeting` leaves out.
pub const VIEWS: &[ViewDef] = &[ViewDef {
  name:   "need_meeting",
  select: "SELECT id, name, score, last_meeting FROM students
           WHERE score < 80
             AND (last_meeting IS NULL OR last_meeting < date('now', '-1 month'))",
}];

// ─── Provisioning ────────────────────────────────────────────────────────────

/// Create every table, index and view that does not exist yet, verifying
/// that each table carries all of its declared columns.
///
/// Safe to run any number of times; existing rows are never touched.
pub fn provision(conn: &mut Connection) -> Result<()> {
  conn.execute_batch(PRAGMAS)?;

  let tx = conn.transaction()?;
  for table in TABLES {
    debug!(table = table.name, "ensuring table");
    tx.execute_batch(&table.create_sql())?;
  }
  // Before indexes and views, which would otherwise fail on a missing column
  // with a less useful engine error.
  for table in TABLES {
    verify_columns(&tx, table)?;
  }
  for index in INDEXES {
    tx.execute_batch(&index.create_sql())?;
  }
  for view in VIEWS {
    tx.execute_batch(&view.create_sql())?;
  }
  tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
  tx.commit()?;

  debug!(version = SCHEMA_VERSION, tables = TABLES.len(), "schema provisioned");
  Ok(())
}

/// Fail if `table` exists without one of its declared columns.
fn verify_columns(conn: &Connection, table: &TableDef) -> Result<()> {
  let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
  let present = stmt
    .query_map([table.name], |row| row.get::<_, String>(0))?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let missing: Vec<String> = table
    .columns
    .iter()
    .filter(|c| !present.iter().any(|p| p.eq_ignore_ascii_case(c.name)))
    .map(|c| c.name.to_owned())
    .collect();

  if missing.is_empty() {
    Ok(())
  } else {
    Err(Error::SchemaMismatch { table: table.name, missing })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn table_sql_is_guarded() {
    for table in TABLES {
      assert!(table.create_sql().starts_with("CREATE TABLE IF NOT EXISTS "));
    }
    for index in INDEXES {
      assert!(index.create_sql().starts_with("CREATE INDEX IF NOT EXISTS "));
    }
    for view in VIEWS {
      assert!(view.create_sql().starts_with("CREATE VIEW IF NOT EXISTS "));
    }
  }

  #[test]
  fn table_sql_lists_every_column() {
    let sql = STUDENTS.create_sql();
    for column in STUDENTS.columns {
      assert!(sql.contains(column.name), "{} missing from {sql}", column.name);
    }
    assert!(sql.contains("CHECK (last_meeting IS NULL OR last_meeting GLOB"));
  }

  #[test]
  fn name_indexes_use_the_lookup_expression() {
    for index in INDEXES.iter().filter(|i| i.table == "names") {
      assert!(index.on.starts_with(NAME_INITIAL_EXPR), "{}", index.name);
    }
  }

  #[test]
  fn provisions_twice_on_one_connection() {
    let mut conn = Connection::open_in_memory().unwrap();
    provision(&mut conn).unwrap();
    provision(&mut conn).unwrap();
    let version: i64 = conn
      .query_row("PRAGMA user_version", [], |r| r.get(0))
      .unwrap();
    assert_eq!(version, SCHEMA_VERSION);
  }
}

use std::path::Path;

use rusqlite::Connection;

use crate::error::{Result, ShelfError};

/// Schema executed when a library database is created.
pub const SCHEMA_SCRIPT: &str = "
CREATE TABLE IF NOT EXISTS publishers (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT UNIQUE NOT NULL
);

CREATE TABLE IF NOT EXISTS authors (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT UNIQUE NOT NULL
);

CREATE TABLE IF NOT EXISTS categories (
    id   INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT UNIQUE NOT NULL
);

CREATE TABLE IF NOT EXISTS books (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    title        TEXT NOT NULL,
    isbn         TEXT NOT NULL,
    publisher_id INTEGER REFERENCES publishers(id),
    author_id    INTEGER REFERENCES authors(id),
    category_id  INTEGER REFERENCES categories(id),
    destination  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_books_isbn ON books(isbn);
";

pub fn apply_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        ",
    )?;
    Ok(())
}

/// Read the schema script, preferring an external file when one is configured.
pub fn load_schema_script(schema_path: Option<&Path>) -> Result<String> {
    match schema_path {
        None => Ok(SCHEMA_SCRIPT.to_string()),
        Some(path) if path.is_file() => Ok(std::fs::read_to_string(path)?),
        Some(path) => Err(ShelfError::SchemaScriptMissing(path.display().to_string())),
    }
}

pub fn has_table(conn: &Connection, name: &str) -> Result<bool> {
    let exists = conn
        .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name=?1")?
        .exists([name])?;
    Ok(exists)
}

//! Relational store for shelved books.
//!
//! `books` is an append-only fact table; `publishers`, `authors` and
//! `categories` are lookup tables resolved by exact name. The store assumes a
//! single writer: resolve-or-create is a SELECT followed by an INSERT and is
//! not atomic under concurrent writers.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info};

use super::schema::{apply_pragmas, has_table, load_schema_script};
use crate::error::Result;
use crate::models::{BookRecord, StoredBook};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupTable {
    Publishers,
    Authors,
    Categories,
}

impl LookupTable {
    fn table_name(self) -> &'static str {
        match self {
            LookupTable::Publishers => "publishers",
            LookupTable::Authors => "authors",
            LookupTable::Categories => "categories",
        }
    }
}

pub struct LibraryStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl LibraryStore {
    /// Open the store at `path` using the built-in schema.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_schema(path, None)
    }

    /// Open the store, creating the database and running the schema script
    /// when the file does not exist yet.
    pub fn open_with_schema(path: &Path, schema_path: Option<&Path>) -> Result<Self> {
        let is_new = !path.exists();
        if is_new {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        apply_pragmas(&conn)?;

        if is_new || !has_table(&conn, "books")? {
            let script = load_schema_script(schema_path)?;
            conn.execute_batch(&script)?;
            info!(path = %path.display(), "initialized library database");
        }

        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_pragmas(&conn)?;
        conn.execute_batch(&load_schema_script(None)?)?;
        Ok(Self { conn, path: None })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Look up `name` in `table`, inserting it first if absent.
    pub fn resolve_id(&self, table: LookupTable, name: &str) -> Result<i64> {
        let select = format!("SELECT id FROM {} WHERE name = ?1", table.table_name());

        if let Some(id) = self
            .conn
            .query_row(&select, [name], |row| row.get::<_, i64>(0))
            .optional()?
        {
            return Ok(id);
        }

        self.conn.execute(
            &format!("INSERT INTO {}(name) VALUES (?1)", table.table_name()),
            [name],
        )?;
        debug!(table = table.table_name(), name, "created lookup row");

        let id = self
            .conn
            .query_row(&select, [name], |row| row.get::<_, i64>(0))?;
        Ok(id)
    }

    fn resolve_optional(&self, table: LookupTable, name: Option<&str>) -> Result<Option<i64>> {
        name.map(|name| self.resolve_id(table, name)).transpose()
    }

    /// Record a shelved book. Returns the new `books` row id.
    ///
    /// Only the first author is stored; the schema has a single author slot.
    pub fn store(&self, record: &BookRecord, destination: &Path) -> Result<i64> {
        let publisher_id =
            self.resolve_optional(LookupTable::Publishers, record.publisher.as_deref())?;
        let author_id = self.resolve_optional(LookupTable::Authors, record.primary_author())?;
        let category_id =
            self.resolve_optional(LookupTable::Categories, record.category.as_deref())?;

        self.conn.execute(
            "INSERT INTO books(title, isbn, publisher_id, author_id, category_id, destination)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.title,
                record.isbn,
                publisher_id,
                author_id,
                category_id,
                destination.to_string_lossy(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recently stored books first.
    pub fn list_books(&self, limit: usize) -> Result<Vec<StoredBook>> {
        let mut stmt = self.conn.prepare(
            "SELECT b.id, b.title, b.isbn, p.name, a.name, c.name, b.destination
             FROM books b
             LEFT JOIN publishers p ON p.id = b.publisher_id
             LEFT JOIN authors a    ON a.id = b.author_id
             LEFT JOIN categories c ON c.id = b.category_id
             ORDER BY b.id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map([limit as i64], |row| {
            Ok(StoredBook {
                id: row.get(0)?,
                title: row.get(1)?,
                isbn: row.get(2)?,
                publisher: row.get(3)?,
                author: row.get(4)?,
                category: row.get(5)?,
                destination: row.get(6)?,
            })
        })?;

        let mut books = Vec::new();
        for row in rows {
            books.push(row?);
        }
        Ok(books)
    }

    pub fn count(&self, table: LookupTable) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", table.table_name());
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn count_books(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShelfError;
    use tempfile::TempDir;

    fn make_record(title: &str, publisher: &str) -> BookRecord {
        let mut record = BookRecord::new(title, "9784867104562");
        record.publisher = Some(publisher.to_string());
        record.authors = vec!["山田太郎".to_string(), "鈴木花子".to_string()];
        record.category = Some("ライトノベル".to_string());
        record
    }

    #[test]
    fn test_open_in_memory() {
        let store = LibraryStore::open_in_memory().unwrap();
        assert_eq!(store.count_books().unwrap(), 0);
        assert!(store.path().is_none());
    }

    #[test]
    fn test_resolve_id_is_idempotent() {
        let store = LibraryStore::open_in_memory().unwrap();
        let first = store.resolve_id(LookupTable::Publishers, "KADOKAWA").unwrap();
        let second = store.resolve_id(LookupTable::Publishers, "KADOKAWA").unwrap();
        let other = store.resolve_id(LookupTable::Publishers, "講談社").unwrap();
        assert_eq!(first, second);
        assert_ne!(first, other);
        assert_eq!(store.count(LookupTable::Publishers).unwrap(), 2);
    }

    #[test]
    fn test_store_shares_publisher_row() {
        let store = LibraryStore::open_in_memory().unwrap();
        store.store(&make_record("A", "KADOKAWA"), Path::new("/books/a.pdf")).unwrap();
        store.store(&make_record("B", "KADOKAWA"), Path::new("/books/b.pdf")).unwrap();

        assert_eq!(store.count_books().unwrap(), 2);
        assert_eq!(store.count(LookupTable::Publishers).unwrap(), 1);
        assert_eq!(store.count(LookupTable::Categories).unwrap(), 1);
    }

    #[test]
    fn test_store_keeps_first_author_only() {
        let store = LibraryStore::open_in_memory().unwrap();
        store.store(&make_record("A", "KADOKAWA"), Path::new("/books/a.pdf")).unwrap();

        assert_eq!(store.count(LookupTable::Authors).unwrap(), 1);
        let books = store.list_books(10).unwrap();
        assert_eq!(books[0].author.as_deref(), Some("山田太郎"));
        assert_eq!(books[0].destination, "/books/a.pdf");
    }

    #[test]
    fn test_absent_fields_store_null_references() {
        let store = LibraryStore::open_in_memory().unwrap();
        let record = BookRecord::new("Bare", "4088725158");
        store.store(&record, Path::new("/books/bare.pdf")).unwrap();

        assert_eq!(store.count(LookupTable::Publishers).unwrap(), 0);
        assert_eq!(store.count(LookupTable::Authors).unwrap(), 0);
        let books = store.list_books(10).unwrap();
        assert_eq!(books[0].publisher, None);
        assert_eq!(books[0].category, None);
    }

    #[test]
    fn test_open_creates_database_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("library.db");
        {
            let store = LibraryStore::open(&path).unwrap();
            store.store(&make_record("A", "KADOKAWA"), Path::new("/books/a.pdf")).unwrap();
        }
        assert!(path.exists());

        let reopened = LibraryStore::open(&path).unwrap();
        assert_eq!(reopened.count_books().unwrap(), 1);
    }

    #[test]
    fn test_external_schema_script() {
        let dir = TempDir::new().unwrap();
        let schema = dir.path().join("schema.sql");
        std::fs::write(&schema, crate::storage::SCHEMA_SCRIPT).unwrap();

        let store = LibraryStore::open_with_schema(&dir.path().join("lib.db"), Some(&schema)).unwrap();
        assert_eq!(store.count_books().unwrap(), 0);
    }

    #[test]
    fn test_missing_schema_script_is_fatal() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.sql");
        let result = LibraryStore::open_with_schema(&dir.path().join("lib.db"), Some(&missing));
        assert!(matches!(result, Err(ShelfError::SchemaScriptMissing(_))));
    }
}

//! Opening and diagnosing collection database files.

use super::DatabaseError;
use rusqlite::{Connection, OpenFlags};
use std::io::Read;
use std::path::Path;

/// Every `SQLite` 3 file starts with this 16-byte magic string.
pub const SQLITE_MAGIC: &[u8; 16] = b"SQLite format 3\0";

/// Size of the fixed `SQLite` database header.
pub const SQLITE_HEADER_LEN: u64 = 100;

/// Tables a collection database must expose.
pub const REQUIRED_TABLES: [&str; 5] = ["col", "notes", "cards", "revlog", "graves"];

/// Checks the file header before handing the file to `SQLite`.
///
/// Distinguishes an empty file, a file too small to hold a header, and a
/// file whose header is not the `SQLite` magic.
pub fn check_header(path: &Path) -> Result<(), DatabaseError> {
    let len = std::fs::metadata(path)
        .map_err(|e| DatabaseError::Unreadable(e.to_string()))?
        .len();
    if len == 0 {
        return Err(DatabaseError::Empty);
    }
    if len < SQLITE_HEADER_LEN {
        return Err(DatabaseError::TooSmall(len));
    }
    let mut magic = [0_u8; 16];
    std::fs::File::open(path)
        .and_then(|mut f| f.read_exact(&mut magic))
        .map_err(|e| DatabaseError::Unreadable(e.to_string()))?;
    if &magic != SQLITE_MAGIC {
        return Err(DatabaseError::BadHeader);
    }
    Ok(())
}

/// Opens a collection database read-only after validating its header and tables.
pub fn open_validated(path: &Path) -> Result<Connection, DatabaseError> {
    check_header(path)?;
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| DatabaseError::Unreadable(e.to_string()))?;
    let missing = missing_tables(&conn)?;
    if !missing.is_empty() {
        return Err(DatabaseError::MissingTables(missing));
    }
    Ok(conn)
}

/// Returns the required tables absent from the database, in canonical order.
pub fn missing_tables(conn: &Connection) -> Result<Vec<String>, DatabaseError> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table'")
        .map_err(|e| DatabaseError::Unreadable(e.to_string()))?;
    let present: Vec<String> = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .and_then(|rows| rows.collect::<rusqlite::Result<Vec<String>>>())
        .map_err(|e| DatabaseError::Unreadable(e.to_string()))?;
    Ok(REQUIRED_TABLES
        .iter()
        .filter(|t| !present.iter().any(|p| p == *t))
        .map(|t| (*t).to_string())
        .collect())
}

/// Configures a connection used to write a fresh collection file.
///
/// The vendor expects a plain rollback journal, so WAL is explicitly off.
pub fn configure_for_export(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "journal_mode", "DELETE")?;
    conn.pragma_update(None, "synchronous", "OFF")?;
    conn.pragma_update(None, "page_size", 4096)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.db");
        std::fs::write(&path, b"").unwrap();
        assert_eq!(check_header(&path), Err(DatabaseError::Empty));
    }

    #[test]
    fn test_too_small_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.db");
        std::fs::write(&path, b"SQLite format 3\0").unwrap();
        assert_eq!(check_header(&path), Err(DatabaseError::TooSmall(16)));
    }

    #[test]
    fn test_bad_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.db");
        std::fs::write(&path, vec![b'x'; 200]).unwrap();
        assert_eq!(check_header(&path), Err(DatabaseError::BadHeader));
    }

    #[test]
    fn test_valid_header_missing_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch("CREATE TABLE col (id integer primary key); CREATE TABLE notes (id integer);")
                .unwrap();
        }
        match open_validated(&path) {
            Err(DatabaseError::MissingTables(missing)) => {
                assert_eq!(missing, vec!["cards", "revlog", "graves"]);
            },
            other => unreachable!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_configure_for_export() {
        let dir = tempfile::tempdir().unwrap();
        let conn = Connection::open(dir.path().join("out.db")).unwrap();
        configure_for_export(&conn).unwrap();
        let journal_mode: String = conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .unwrap();
        assert_eq!(journal_mode.to_lowercase(), "delete");
    }
}

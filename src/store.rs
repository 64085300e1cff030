//! SQLite-backed icon store.
//!
//! Window classes are mapped to an application type, and types to an icon,
//! so several classes (e.g. `firefox` and `firefox-esr`) can share one icon
//! entry. The effective class -> icon mapping is the join of both tables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{params, Connection};

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Sql(rusqlite::Error),
    InvalidInput(&'static str),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io: {err}"),
            Self::Sql(err) => write!(f, "sqlite: {err}"),
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sql(value)
    }
}

const SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS type_class(window_class TEXT, window_type TEXT);
CREATE TABLE IF NOT EXISTS type_icon(window_type TEXT, window_icon TEXT);";

/// Handle to the icon database
#[derive(Debug)]
pub struct IconStore {
    conn: Connection,
    path: PathBuf,
}

impl IconStore {
    /// Open (creating if needed) the database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self { conn, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Map a window class to an application type
    pub fn insert_class_type(&self, class: &str, window_type: &str) -> Result<(), StoreError> {
        let class = non_blank(class, "window class must not be empty")?;
        let window_type = non_blank(window_type, "window type must not be empty")?;
        self.conn.execute(
            "INSERT INTO type_class(window_class, window_type) VALUES (?1, ?2)",
            params![class, window_type],
        )?;
        Ok(())
    }

    /// Map an application type to an icon
    pub fn insert_type_icon(&self, window_type: &str, icon: &str) -> Result<(), StoreError> {
        let window_type = non_blank(window_type, "window type must not be empty")?;
        let icon = non_blank(icon, "icon must not be empty")?;
        self.conn.execute(
            "INSERT INTO type_icon(window_type, window_icon) VALUES (?1, ?2)",
            params![window_type, icon],
        )?;
        Ok(())
    }

    /// Map a window class straight to an icon, using the class as its own type
    pub fn insert_class_icon(&mut self, class: &str, icon: &str) -> Result<(), StoreError> {
        let class = non_blank(class, "window class must not be empty")?;
        let icon = non_blank(icon, "icon must not be empty")?;
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO type_class(window_class, window_type) VALUES (?1, ?1)",
            params![class],
        )?;
        tx.execute(
            "INSERT INTO type_icon(window_type, window_icon) VALUES (?1, ?2)",
            params![class, icon],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// All (class, icon) pairs, oldest rows first
    pub fn all_icons(&self) -> Result<Vec<(String, String)>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT type_class.window_class, type_icon.window_icon \
             FROM type_class \
             INNER JOIN type_icon ON type_class.window_type = type_icon.window_type \
             ORDER BY type_class.rowid ASC, type_icon.rowid ASC",
        )?;

        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let class: Option<String> = row.get(0)?;
            let icon: Option<String> = row.get(1)?;
            if let (Some(class), Some(icon)) = (class, icon) {
                out.push((class, icon));
            }
        }
        Ok(out)
    }
}

fn non_blank<'a>(value: &'a str, message: &'static str) -> Result<&'a str, StoreError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(StoreError::InvalidInput(message));
    }
    Ok(value)
}

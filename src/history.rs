use rusqlite::{Connection, Result, params};
use std::path::Path;

#[derive(Debug)]
pub struct DownloadRecord {
    pub id: i64,
    pub name: String,
    pub status: String,
    pub bytes: u64,
    pub created_at: String,
}

/// Log of every download the client attempted.
pub struct History {
    conn: Connection,
}

impl History {
    pub fn open(path: &Path) -> Result<Self> {
        Self::init(Connection::open(path)?)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS downloads (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                status TEXT NOT NULL,
                bytes INTEGER NOT NULL DEFAULT 0,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;
        Ok(History { conn })
    }

    pub fn record(&self, name: &str, status: &str, bytes: u64) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO downloads (name, status, bytes) VALUES (?1, ?2, ?3)",
            params![name, status, bytes],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list(&self) -> Result<Vec<DownloadRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, status, bytes, created_at FROM downloads ORDER BY id DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(DownloadRecord {
                id: row.get(0)?,
                name: row.get(1)?,
                status: row.get(2)?,
                bytes: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?;

        let mut records = Vec::new();
        for r in rows {
            records.push(r?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_are_listed_newest_first() {
        let history = History::open_in_memory().unwrap();
        history.record("File1.zip", "Completed", 2048).unwrap();
        history.record("Nope.zip", "NotFound", 0).unwrap();

        let records = history.list().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "Nope.zip");
        assert_eq!(records[0].status, "NotFound");
        assert_eq!(records[1].name, "File1.zip");
        assert_eq!(records[1].bytes, 2048);
        assert!(!records[1].created_at.is_empty());
    }

    #[test]
    fn history_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");
        {
            let history = History::open(&path).unwrap();
            history.record("File2.zip", "Completed", 5).unwrap();
        }
        let history = History::open(&path).unwrap();
        assert_eq!(history.list().unwrap().len(), 1);
    }
}

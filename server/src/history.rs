use std::path::Path;

use kernel::{ListAction, ListOperation, ListPosition};
use rusqlite::{params, Connection, Error, OpenFlags};

use crate::sqlite::Mode;

/// Audit log of linked-list simulator operations, kept in its own small
/// store separate from the main database. Only the log is durable; the
/// simulated list itself lives in process memory.
pub struct HistoryLog {
    conn: Connection,
}

impl HistoryLog {
    pub fn open<P: AsRef<Path>>(path: P, mode: Mode) -> Result<HistoryLog, Error> {
        let conn = match mode {
            Mode::ReadWrite => Connection::open(path)?,
            Mode::ReadOnly => {
                Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?
            }
        };
        Ok(Self { conn })
    }

    pub fn new_database(&self) -> Result<(), Error> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS list_history (
                  id         INTEGER PRIMARY KEY AUTOINCREMENT,
                  action     TEXT NOT NULL,
                  value      TEXT,
                  position   TEXT NOT NULL,
                  created_at INTEGER NOT NULL
                  )",
            [],
        )?;
        Ok(())
    }

    pub fn append(
        &mut self,
        action: ListAction,
        value: Option<&str>,
        position: ListPosition,
        created_at: i64,
    ) -> Result<i64, Error> {
        self.conn.execute(
            "INSERT INTO list_history (action, value, position, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
            params![action.as_str(), value, position.as_str(), created_at],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// All recorded operations, newest first.
    pub fn list(&mut self) -> Result<Vec<ListOperation>, Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, action, value, position, created_at
                 FROM list_history ORDER BY id DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            let action: String = row.get(1)?;
            let position: String = row.get(3)?;
            Ok(ListOperation {
                id: row.get(0)?,
                // Rows are only ever written by append(), so the tokens parse.
                action: ListAction::parse(&action).unwrap_or(ListAction::Add),
                value: row.get(2)?,
                position: ListPosition::parse(&position).unwrap_or(ListPosition::End),
                created_at: row.get(4)?,
            })
        })?;
        rows.collect()
    }
}

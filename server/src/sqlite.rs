use std::path::Path;

use kernel::{DeleteResult, FileEntry, Folder, Profile};
use rusqlite::{params, Connection, Error, OpenFlags, Row};

use crate::domain::{NewFileRecord, Storage};

const CACHE_SIZE: &str = "4096";

pub enum Mode {
    ReadWrite,
    ReadOnly,
}

pub struct Sqlite {
    conn: Connection,
}

impl Storage for Sqlite {
    type Err = Error;

    fn new_database(&self) -> Result<(), Self::Err> {
        self.pragma_update("encoding", "UTF-8")?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS folders (
                  id         INTEGER PRIMARY KEY AUTOINCREMENT,
                  name       TEXT NOT NULL,
                  created_at INTEGER NOT NULL
                  )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS files (
                  id         INTEGER PRIMARY KEY AUTOINCREMENT,
                  folder_id  INTEGER REFERENCES folders(id) ON DELETE CASCADE,
                  name       TEXT NOT NULL,
                  filename   TEXT NOT NULL,
                  file_type  TEXT NOT NULL,
                  created_at INTEGER NOT NULL
                  )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS profile (
                  id              INTEGER PRIMARY KEY AUTOINCREMENT,
                  name            TEXT NOT NULL,
                  title           TEXT,
                  bio             TEXT,
                  profile_picture TEXT,
                  email           TEXT,
                  github          TEXT,
                  linkedin        TEXT
                  )",
            [],
        )?;

        self.seed_profile()?;

        Ok(())
    }

    fn get_profile(&mut self) -> Result<Profile, Self::Err> {
        self.conn.query_row(
            "SELECT id, name, title, bio, profile_picture, email, github, linkedin
                 FROM profile LIMIT 1",
            [],
            |row| {
                Ok(Profile {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    title: row.get(2)?,
                    bio: row.get(3)?,
                    profile_picture: row.get(4)?,
                    email: row.get(5)?,
                    github: row.get(6)?,
                    linkedin: row.get(7)?,
                })
            },
        )
    }

    fn get_folders(&mut self) -> Result<Vec<Folder>, Self::Err> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, created_at FROM folders ORDER BY created_at DESC")?;
        let rows = stmt.query_map([], Self::map_folder)?;
        rows.collect()
    }

    fn get_folder(&mut self, id: i64) -> Result<Folder, Self::Err> {
        self.conn.query_row(
            "SELECT id, name, created_at FROM folders WHERE id = ?1",
            params![id],
            Self::map_folder,
        )
    }

    fn folder_exists(&mut self, id: i64) -> Result<bool, Self::Err> {
        let mut stmt = self.conn.prepare("SELECT id FROM folders WHERE id = ?1")?;
        stmt.exists(params![id])
    }

    fn insert_folder(&mut self, name: &str, created_at: i64) -> Result<i64, Self::Err> {
        self.conn.execute(
            "INSERT INTO folders (name, created_at) VALUES (?1, ?2)",
            params![name, created_at],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn rename_folder(&mut self, id: i64, name: &str) -> Result<usize, Self::Err> {
        self.conn.execute(
            "UPDATE folders SET name = ?1 WHERE id = ?2",
            params![name, id],
        )
    }

    fn delete_folder(&mut self, id: i64) -> Result<DeleteResult, Self::Err> {
        let tx = self.conn.transaction()?;

        let files: i64 = tx.query_row(
            "SELECT COUNT(*) FROM files WHERE folder_id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        // Cascades to file rows, the pragma is set on every writable connection.
        let folders = tx.execute("DELETE FROM folders WHERE id = ?1", params![id])?;

        tx.commit()?;

        let files = if folders == 0 {
            0
        } else {
            usize::try_from(files).unwrap_or_default()
        };
        Ok(DeleteResult {
            folders,
            files,
            blobs: 0,
        })
    }

    fn get_files(&mut self, folder: Option<i64>) -> Result<Vec<FileEntry>, Self::Err> {
        match folder {
            Some(folder_id) => {
                let mut stmt = self.conn.prepare(
                    "SELECT id, folder_id, name, filename, file_type, created_at
                         FROM files WHERE folder_id = ?1 ORDER BY created_at DESC",
                )?;
                let rows = stmt.query_map(params![folder_id], Self::map_file)?;
                rows.collect()
            }
            None => {
                let mut stmt = self.conn.prepare(
                    "SELECT id, folder_id, name, filename, file_type, created_at
                         FROM files ORDER BY created_at DESC",
                )?;
                let rows = stmt.query_map([], Self::map_file)?;
                rows.collect()
            }
        }
    }

    fn unfiled_files(&mut self) -> Result<Vec<FileEntry>, Self::Err> {
        let mut stmt = self.conn.prepare(
            "SELECT id, folder_id, name, filename, file_type, created_at
                 FROM files WHERE folder_id IS NULL ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map([], Self::map_file)?;
        rows.collect()
    }

    fn insert_file(&mut self, record: &NewFileRecord) -> Result<i64, Self::Err> {
        self.conn.execute(
            "INSERT INTO files (folder_id, name, filename, file_type, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.folder_id,
                record.name,
                record.filename,
                record.file_type,
                record.created_at
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_file(&mut self, id: i64) -> Result<FileEntry, Self::Err> {
        self.conn.query_row(
            "SELECT id, folder_id, name, filename, file_type, created_at
                 FROM files WHERE id = ?1",
            params![id],
            Self::map_file,
        )
    }

    fn update_file(
        &mut self,
        id: i64,
        name: &str,
        folder_id: Option<i64>,
    ) -> Result<usize, Self::Err> {
        self.conn.execute(
            "UPDATE files SET name = ?1, folder_id = ?2 WHERE id = ?3",
            params![name, folder_id, id],
        )
    }

    fn delete_file(&mut self, id: i64) -> Result<usize, Self::Err> {
        self.conn
            .execute("DELETE FROM files WHERE id = ?1", params![id])
    }
}

impl Sqlite {
    pub fn open<P: AsRef<Path>>(path: P, mode: Mode) -> Result<Sqlite, Error> {
        let conn = match mode {
            Mode::ReadWrite => Connection::open(path)?,
            Mode::ReadOnly => {
                Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?
            }
        };
        let storage = Self { conn };
        if matches!(mode, Mode::ReadWrite) {
            storage.assign_cache_size()?;
            // Folder deletion cascades rely on referential enforcement.
            storage.enable_foreign_keys()?;
        }
        Ok(storage)
    }

    fn seed_profile(&self) -> Result<(), Error> {
        let existing: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM profile", [], |row| row.get(0))?;
        if existing == 0 {
            self.conn.execute(
                "INSERT INTO profile (name, title, bio, profile_picture, email, github, linkedin)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    "Your Name",
                    "Software Engineer",
                    "Short bio goes here.",
                    "profile.png",
                    "you@example.com",
                    "your-github",
                    "https://linkedin.com/in/you"
                ],
            )?;
        }
        Ok(())
    }

    fn map_folder(row: &Row<'_>) -> Result<Folder, Error> {
        Ok(Folder {
            id: row.get(0)?,
            name: row.get(1)?,
            created_at: row.get(2)?,
        })
    }

    fn map_file(row: &Row<'_>) -> Result<FileEntry, Error> {
        Ok(FileEntry {
            id: row.get(0)?,
            folder_id: row.get(1)?,
            name: row.get(2)?,
            filename: row.get(3)?,
            file_type: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    fn enable_foreign_keys(&self) -> Result<(), Error> {
        self.pragma_update("foreign_keys", "ON")
    }

    fn assign_cache_size(&self) -> Result<(), Error> {
        self.pragma_update("cache_size", CACHE_SIZE)
    }

    fn pragma_update(&self, name: &str, value: &str) -> Result<(), Error> {
        self.conn.pragma_update(None, name, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewFileRecord;
    use std::env;
    use std::path::PathBuf;

    fn temp_db() -> PathBuf {
        let file = format!("folio_sqlite_test_{}.db", uuid::Uuid::new_v4().simple());
        env::temp_dir().join(file)
    }

    fn record(folder_id: Option<i64>, name: &str) -> NewFileRecord {
        NewFileRecord {
            folder_id,
            name: name.to_owned(),
            filename: format!("{name}.txt"),
            file_type: String::from("txt"),
            created_at: 1_700_000_000,
        }
    }

    #[test]
    fn folder_roundtrip() {
        let db = temp_db();
        let mut storage = Sqlite::open(&db, Mode::ReadWrite).unwrap();
        storage.new_database().unwrap();

        let id = storage.insert_folder("projects", 1_700_000_000).unwrap();
        let folders = storage.get_folders().unwrap();

        assert_eq!(folders.len(), 1);
        assert_eq!(folders[0].id, id);
        assert_eq!(folders[0].name, "projects");

        std::fs::remove_file(db).unwrap_or_default();
    }

    #[test]
    fn delete_folder_cascades_file_rows() {
        let db = temp_db();
        let mut storage = Sqlite::open(&db, Mode::ReadWrite).unwrap();
        storage.new_database().unwrap();

        let folder = storage.insert_folder("projects", 1_700_000_000).unwrap();
        storage.insert_file(&record(Some(folder), "a")).unwrap();
        storage.insert_file(&record(Some(folder), "b")).unwrap();
        storage.insert_file(&record(None, "loose")).unwrap();

        let result = storage.delete_folder(folder).unwrap();

        assert_eq!(result.folders, 1);
        assert_eq!(result.files, 2);
        assert_eq!(storage.get_files(None).unwrap().len(), 1);

        std::fs::remove_file(db).unwrap_or_default();
    }

    #[test]
    fn delete_missing_folder_reports_nothing() {
        let db = temp_db();
        let mut storage = Sqlite::open(&db, Mode::ReadWrite).unwrap();
        storage.new_database().unwrap();

        let result = storage.delete_folder(42).unwrap();

        assert_eq!(result.folders, 0);
        assert_eq!(result.files, 0);

        std::fs::remove_file(db).unwrap_or_default();
    }

    #[test]
    fn profile_seeded_once() {
        let db = temp_db();
        let mut storage = Sqlite::open(&db, Mode::ReadWrite).unwrap();
        storage.new_database().unwrap();
        // Second initialization must not duplicate the singleton.
        storage.new_database().unwrap();

        let profile = storage.get_profile().unwrap();
        assert!(!profile.name.is_empty());

        let count: i64 = storage
            .conn
            .query_row("SELECT COUNT(*) FROM profile", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);

        std::fs::remove_file(db).unwrap_or_default();
    }

    #[test]
    fn unfiled_files_excludes_foldered_ones() {
        let db = temp_db();
        let mut storage = Sqlite::open(&db, Mode::ReadWrite).unwrap();
        storage.new_database().unwrap();

        let folder = storage.insert_folder("projects", 1_700_000_000).unwrap();
        storage.insert_file(&record(Some(folder), "a")).unwrap();
        storage.insert_file(&record(None, "loose")).unwrap();

        let unfiled = storage.unfiled_files().unwrap();
        assert_eq!(unfiled.len(), 1);
        assert_eq!(unfiled[0].name, "loose");

        std::fs::remove_file(db).unwrap_or_default();
    }
}

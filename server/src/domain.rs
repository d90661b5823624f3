use std::fmt::{Debug, Display};

use kernel::{DeleteResult, FileEntry, Folder, Profile};

/// A new file metadata row, recorded after the blob has already been
/// written into the upload directory under `filename`.
pub struct NewFileRecord {
    pub folder_id: Option<i64>,
    pub name: String,
    pub filename: String,
    pub file_type: String,
    pub created_at: i64,
}

pub trait Storage {
    type Err: Debug + Display;

    fn new_database(&self) -> Result<(), Self::Err>;

    fn get_profile(&mut self) -> Result<Profile, Self::Err>;

    fn get_folders(&mut self) -> Result<Vec<Folder>, Self::Err>;

    fn get_folder(&mut self, id: i64) -> Result<Folder, Self::Err>;

    fn folder_exists(&mut self, id: i64) -> Result<bool, Self::Err>;

    fn insert_folder(&mut self, name: &str, created_at: i64) -> Result<i64, Self::Err>;

    fn rename_folder(&mut self, id: i64, name: &str) -> Result<usize, Self::Err>;

    fn delete_folder(&mut self, id: i64) -> Result<DeleteResult, Self::Err>;

    /// All files, or the files of one folder, newest first.
    fn get_files(&mut self, folder: Option<i64>) -> Result<Vec<FileEntry>, Self::Err>;

    /// Files without an owning folder, newest first.
    fn unfiled_files(&mut self) -> Result<Vec<FileEntry>, Self::Err>;

    fn insert_file(&mut self, record: &NewFileRecord) -> Result<i64, Self::Err>;

    fn get_file(&mut self, id: i64) -> Result<FileEntry, Self::Err>;

    fn update_file(
        &mut self,
        id: i64,
        name: &str,
        folder_id: Option<i64>,
    ) -> Result<usize, Self::Err>;

    fn delete_file(&mut self, id: i64) -> Result<usize, Self::Err>;
}

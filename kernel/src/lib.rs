#![warn(clippy::unwrap_in_result)]
#![warn(clippy::unwrap_used)]

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A named container owning zero or more files.
///
/// Deleting a folder cascades to the metadata of all files inside it.
/// The blobs of cascaded files stay in the upload directory.
#[derive(Serialize, Deserialize, Clone, ToSchema)]
pub struct Folder {
    /// Unique numeric identifier for the folder
    pub id: i64,
    /// Display name, non-empty after trimming
    pub name: String,
    /// Creation time as unix seconds
    pub created_at: i64,
}

/// Metadata of an uploaded file.
///
/// The content itself is a blob in the upload directory addressed by
/// `filename`; the display `name` is user-editable and independent of it.
#[derive(Serialize, Deserialize, Clone, ToSchema)]
pub struct FileEntry {
    /// Unique numeric identifier for the file
    pub id: i64,
    /// Owning folder, `None` for uncategorized files
    pub folder_id: Option<i64>,
    /// User-facing display name, need not be unique
    pub name: String,
    /// On-disk name, unique within the upload directory
    pub filename: String,
    /// Lowercase extension without the dot
    pub file_type: String,
    /// Upload time as unix seconds
    pub created_at: i64,
}

/// The singleton profile record, seeded once at initialization and
/// read-only through the API.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct Profile {
    pub id: i64,
    pub name: String,
    pub title: Option<String>,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
    pub email: Option<String>,
    pub github: Option<String>,
    pub linkedin: Option<String>,
}

/// Result of a delete operation showing the number of items removed.
///
/// Distinguishes folder rows, file metadata rows and blobs actually
/// removed from the upload directory.
#[derive(Serialize, Deserialize, Default, ToSchema)]
pub struct DeleteResult {
    /// Number of folder rows deleted
    pub folders: usize,
    /// Number of file metadata rows deleted
    pub files: usize,
    /// Number of upload-directory blobs removed
    pub blobs: usize,
}

/// One folder with its files, as stored in the cache mirror.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct CacheFolder {
    pub id: i64,
    pub name: String,
    pub created_at: i64,
    pub files: Vec<FileEntry>,
}

/// Derived, non-authoritative snapshot of the folder/file listing.
///
/// Rewritten in full after every mutation; the relational store remains
/// the single source of truth and the snapshot can always be rebuilt
/// from it.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct CacheSnapshot {
    pub folders: Vec<CacheFolder>,
    /// Files without an owning folder
    pub root_files: Vec<FileEntry>,
    /// Regeneration time as unix seconds
    pub updated_at: i64,
}

/// Captured output of a finished script execution.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ExecOutcome {
    /// Process exit code, `None` when terminated by a signal
    pub returncode: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Which end of the simulated list an operation targets.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ListPosition {
    Begin,
    End,
}

impl ListPosition {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ListPosition::Begin => "begin",
            ListPosition::End => "end",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "begin" => Some(ListPosition::Begin),
            "end" => Some(ListPosition::End),
            _ => None,
        }
    }
}

/// Kind of a recorded list operation.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ListAction {
    Add,
    Remove,
}

impl ListAction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ListAction::Add => "add",
            ListAction::Remove => "remove",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "add" => Some(ListAction::Add),
            "remove" => Some(ListAction::Remove),
            _ => None,
        }
    }
}

/// One audit-log row of the linked-list simulator.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ListOperation {
    pub id: i64,
    pub action: ListAction,
    /// Added or removed value, when the operation carried one
    pub value: Option<String>,
    pub position: ListPosition,
    pub created_at: i64,
}

/// Current list content plus the persisted operation history.
///
/// The list lives in process memory and is not rebuilt from the history
/// on restart, so the two may diverge after a restart.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ListToolState {
    pub list: Vec<String>,
    pub history: Vec<ListOperation>,
}

/// List content after a mutation.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ListState {
    pub list: Vec<String>,
}

/// List content after a removal, with the value taken out.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ListRemoveResult {
    pub removed: String,
    pub list: Vec<String>,
}

/// Folder create/rename request body.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct FolderName {
    pub name: String,
}

/// File rename/reparent request body.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct UpdateFile {
    pub name: String,
    /// New owning folder, `None` to uncategorize
    pub folder_id: Option<i64>,
}

/// Textual file content, both as read response and overwrite request.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct FileContent {
    pub content: String,
}

/// Acknowledgement of a content overwrite.
#[derive(Serialize, Deserialize, ToSchema)]
pub struct SaveResult {
    pub saved: bool,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct UppercaseRequest {
    #[serde(default)]
    pub text: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct UppercaseResult {
    pub result: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct CircleRequest {
    #[serde(default)]
    pub radius: f64,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct TriangleRequest {
    #[serde(default)]
    pub base: f64,
    #[serde(default)]
    pub height: f64,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct AreaResult {
    pub area: f64,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ListAddRequest {
    pub value: String,
    pub position: ListPosition,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ListRemoveRequest {
    pub position: ListPosition,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct PostfixRequest {
    #[serde(default)]
    pub expression: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct PostfixResult {
    pub result: String,
}

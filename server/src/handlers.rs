#![allow(clippy::unused_async)]
use crate::cache;
use crate::domain::{NewFileRecord, Storage};
use crate::error::ApiError;
use crate::exec;
use crate::file_reply::FileReply;
use crate::history::HistoryLog;
use crate::sqlite::{Mode, Sqlite};
use crate::tools;
use crate::uploads;
use crate::AppState;
use axum::body::Bytes;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use futures::{Stream, TryStreamExt};
use futures_util::StreamExt;
use kernel::{
    AreaResult, CacheSnapshot, CircleRequest, DeleteResult, ExecOutcome, FileContent, FileEntry,
    Folder, FolderName, ListAction, ListAddRequest, ListRemoveRequest, ListRemoveResult, ListState,
    ListToolState, PostfixRequest, PostfixResult, Profile, SaveResult, TriangleRequest, UpdateFile,
    UppercaseRequest, UppercaseResult,
};
use serde::Deserialize;
use std::io;
use std::path::Path as StdPath;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::io::StreamReader;
use utoipa::IntoParams;

/// Gets the singleton profile record
#[utoipa::path(
    get,
    path = "/api/profile",
    tag = "profile",
    responses(
        (status = 200, description = "Profile record", body = Profile),
        (status = 500, description = "Server error", body = String)
    ),
)]
pub async fn get_profile(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    execute(&state.db, Mode::ReadOnly, |mut repository| {
        let profile = repository.get_profile()?;
        Ok(Json(profile))
    })
}

/// Lists all folders, newest first
#[utoipa::path(
    get,
    path = "/api/folders",
    tag = "folders",
    responses(
        (status = 200, description = "List all folders successfully", body = [Folder]),
    ),
)]
pub async fn get_folders(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    execute(&state.db, Mode::ReadOnly, |mut repository| {
        let folders = repository.get_folders()?;
        Ok(Json(folders))
    })
}

/// Creates a folder from a non-empty trimmed name
#[utoipa::path(
    post,
    path = "/api/folders",
    tag = "folders",
    request_body = FolderName,
    responses(
        (status = 201, description = "Folder created", body = Folder),
        (status = 400, description = "Folder name required", body = String)
    ),
)]
pub async fn create_folder(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<FolderName>,
) -> Result<impl IntoResponse, ApiError> {
    let name = payload.name.trim().to_owned();
    if name.is_empty() {
        return Err(ApiError::validation("Folder name required"));
    }

    execute(&state.db, Mode::ReadWrite, |mut repository| {
        let created_at = Utc::now().timestamp();
        let id = repository.insert_folder(&name, created_at)?;
        tracing::info!("folder '{}' created with id {}", name, id);
        refresh_cache(&mut repository, &state)?;
        Ok((
            StatusCode::CREATED,
            Json(Folder {
                id,
                name,
                created_at,
            }),
        ))
    })
}

/// Renames a folder
#[utoipa::path(
    put,
    path = "/api/folders/{id}",
    tag = "folders",
    request_body = FolderName,
    responses(
        (status = 200, description = "Folder renamed", body = Folder),
        (status = 400, description = "Folder name required", body = String),
        (status = 404, description = "Folder not found", body = String)
    ),
    params(
        ("id" = i64, Path, description = "Folder id")
    ),
)]
pub async fn rename_folder(
    Path(id): Path<i64>,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<FolderName>,
) -> Result<impl IntoResponse, ApiError> {
    let name = payload.name.trim().to_owned();
    if name.is_empty() {
        return Err(ApiError::validation("Folder name required"));
    }

    execute(&state.db, Mode::ReadWrite, |mut repository| {
        let updated = repository.rename_folder(id, &name)?;
        if updated == 0 {
            return Err(ApiError::not_found("Folder not found"));
        }
        let folder = repository.get_folder(id)?;
        refresh_cache(&mut repository, &state)?;
        Ok(Json(folder))
    })
}

/// Deletes a folder, cascading to the metadata of its files.
/// Blobs of cascaded files stay in the upload directory.
#[utoipa::path(
    delete,
    path = "/api/folders/{id}",
    tag = "folders",
    responses(
        (status = 200, description = "Folder deleted", body = DeleteResult),
        (status = 404, description = "Folder not found", body = String)
    ),
    params(
        ("id" = i64, Path, description = "Folder id")
    ),
)]
pub async fn delete_folder(
    Path(id): Path<i64>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    execute(&state.db, Mode::ReadWrite, |mut repository| {
        let result = repository.delete_folder(id)?;
        if result.folders == 0 {
            return Err(ApiError::not_found("Folder not found"));
        }
        tracing::info!(
            "folder {} deleted, {} file records cascaded",
            id,
            result.files
        );
        refresh_cache(&mut repository, &state)?;
        Ok(Json(result))
    })
}

#[derive(Deserialize, IntoParams)]
pub struct FilesQuery {
    /// Restrict the listing to one folder
    pub folder_id: Option<i64>,
}

/// Lists files, optionally restricted to one folder
#[utoipa::path(
    get,
    path = "/api/files",
    tag = "files",
    params(FilesQuery),
    responses(
        (status = 200, description = "List files successfully", body = [FileEntry]),
    ),
)]
pub async fn get_files(
    Query(query): Query<FilesQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    execute(&state.db, Mode::ReadOnly, |mut repository| {
        let files = repository.get_files(query.folder_id)?;
        Ok(Json(files))
    })
}

/// Uploads a file from a multipart form.
///
/// The `file` part is required; `folder_id` and `display_name` text
/// fields are optional. The on-disk name is made unique on collision,
/// the display name defaults to the submitted filename.
#[utoipa::path(
    post,
    path = "/api/files",
    tag = "files",
    request_body(content = String, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "File uploaded", body = FileEntry),
        (status = 400, description = "No file part or empty filename", body = String),
        (status = 500, description = "Server error", body = String)
    ),
)]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut file_part: Option<(String, Vec<u8>)> = None;
    let mut folder_id: Option<i64> = None;
    let mut display_name: Option<String> = None;

    while let Ok(Some(field)) = multipart.next_field().await {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "file" => {
                let submitted = field.file_name().unwrap_or_default().to_string();
                let (data, read_bytes) = read_from_stream(field)
                    .await
                    .map_err(|e| ApiError::Internal(e.to_string()))?;
                tracing::debug!("received '{}', {} bytes", submitted, read_bytes);
                file_part = Some((submitted, data));
            }
            "folder_id" => {
                let text = field.text().await.unwrap_or_default();
                let text = text.trim();
                if !text.is_empty() {
                    let parsed = text
                        .parse()
                        .map_err(|_| ApiError::validation("folder_id must be an integer"))?;
                    folder_id = Some(parsed);
                }
            }
            "display_name" => {
                display_name = Some(field.text().await.unwrap_or_default());
            }
            _ => {}
        }
    }

    let Some((submitted, data)) = file_part else {
        return Err(ApiError::validation("No file part"));
    };
    if submitted.is_empty() {
        return Err(ApiError::validation("No selected file"));
    }

    execute(&state.db, Mode::ReadWrite, |mut repository| {
        if let Some(folder) = folder_id {
            if !repository.folder_exists(folder)? {
                return Err(ApiError::validation("folder_id does not reference a folder"));
            }
        }

        let filename = state.uploads.unique_name(&submitted);
        state.uploads.save(&filename, &data)?;

        let record = NewFileRecord {
            folder_id,
            name: match display_name {
                Some(n) if !n.trim().is_empty() => n.trim().to_owned(),
                _ => submitted.clone(),
            },
            file_type: uploads::extension_of(&filename),
            filename,
            created_at: Utc::now().timestamp(),
        };
        let id = repository.insert_file(&record)?;
        tracing::info!(
            "file '{}' stored as '{}' with id {}",
            record.name,
            record.filename,
            id
        );
        refresh_cache(&mut repository, &state)?;

        Ok((
            StatusCode::CREATED,
            Json(FileEntry {
                id,
                folder_id: record.folder_id,
                name: record.name,
                filename: record.filename,
                file_type: record.file_type,
                created_at: record.created_at,
            }),
        ))
    })
}

/// Gets file metadata by id
#[utoipa::path(
    get,
    path = "/api/files/{id}",
    tag = "files",
    responses(
        (status = 200, description = "File metadata", body = FileEntry),
        (status = 404, description = "File not found", body = String)
    ),
    params(
        ("id" = i64, Path, description = "File id")
    ),
)]
pub async fn get_file(
    Path(id): Path<i64>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    execute(&state.db, Mode::ReadOnly, |mut repository| {
        let file = repository.get_file(id)?;
        Ok(Json(file))
    })
}

/// Renames and/or reparents a file
#[utoipa::path(
    put,
    path = "/api/files/{id}",
    tag = "files",
    request_body = UpdateFile,
    responses(
        (status = 200, description = "File updated", body = FileEntry),
        (status = 400, description = "Name required or unknown folder", body = String),
        (status = 404, description = "File not found", body = String)
    ),
    params(
        ("id" = i64, Path, description = "File id")
    ),
)]
pub async fn update_file(
    Path(id): Path<i64>,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<UpdateFile>,
) -> Result<impl IntoResponse, ApiError> {
    let name = payload.name.trim().to_owned();
    if name.is_empty() {
        return Err(ApiError::validation("name required"));
    }

    execute(&state.db, Mode::ReadWrite, |mut repository| {
        if let Some(folder) = payload.folder_id {
            if !repository.folder_exists(folder)? {
                return Err(ApiError::validation("folder_id does not reference a folder"));
            }
        }
        let updated = repository.update_file(id, &name, payload.folder_id)?;
        if updated == 0 {
            return Err(ApiError::not_found("File not found"));
        }
        let file = repository.get_file(id)?;
        refresh_cache(&mut repository, &state)?;
        Ok(Json(file))
    })
}

/// Deletes a file: best-effort blob removal, then metadata deletion
#[utoipa::path(
    delete,
    path = "/api/files/{id}",
    tag = "files",
    responses(
        (status = 200, description = "File deleted", body = DeleteResult),
        (status = 404, description = "File not found", body = String)
    ),
    params(
        ("id" = i64, Path, description = "File id")
    ),
)]
pub async fn delete_file(
    Path(id): Path<i64>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    execute(&state.db, Mode::ReadWrite, |mut repository| {
        let file = repository.get_file(id)?;
        let blobs = usize::from(state.uploads.remove(&file.filename));
        let files = repository.delete_file(id)?;
        tracing::info!("file {} deleted, {} blob(s) removed", id, blobs);
        refresh_cache(&mut repository, &state)?;
        Ok(Json(DeleteResult {
            folders: 0,
            files,
            blobs,
        }))
    })
}

/// Reads a file's textual content
#[utoipa::path(
    get,
    path = "/api/file-content/{id}",
    tag = "content",
    responses(
        (status = 200, description = "File content", body = FileContent),
        (status = 404, description = "File or blob missing", body = String)
    ),
    params(
        ("id" = i64, Path, description = "File id")
    ),
)]
pub async fn read_file_content(
    Path(id): Path<i64>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    execute(&state.db, Mode::ReadOnly, |mut repository| {
        let file = repository.get_file(id)?;
        if !state.uploads.exists(&file.filename) {
            return Err(ApiError::not_found("File missing"));
        }
        let content = state.uploads.read_text(&file.filename)?;
        Ok(Json(FileContent { content }))
    })
}

/// Overwrites a file's textual content
#[utoipa::path(
    put,
    path = "/api/file-content/{id}",
    tag = "content",
    request_body = FileContent,
    responses(
        (status = 200, description = "Content saved", body = SaveResult),
        (status = 404, description = "File not found", body = String)
    ),
    params(
        ("id" = i64, Path, description = "File id")
    ),
)]
pub async fn write_file_content(
    Path(id): Path<i64>,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<FileContent>,
) -> Result<impl IntoResponse, ApiError> {
    execute(&state.db, Mode::ReadWrite, |mut repository| {
        let file = repository.get_file(id)?;
        state.uploads.write_text(&file.filename, &payload.content)?;
        refresh_cache(&mut repository, &state)?;
        Ok(Json(SaveResult { saved: true }))
    })
}

/// Downloads a file's blob as an attachment
#[utoipa::path(
    get,
    path = "/api/download/{id}",
    tag = "files",
    responses(
        (status = 200, response = FileReply),
        (status = 404, description = "File or blob missing", body = String)
    ),
    params(
        ("id" = i64, Path, description = "File id")
    ),
)]
pub async fn download_file(
    Path(id): Path<i64>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    execute(&state.db, Mode::ReadOnly, |mut repository| {
        let file = repository.get_file(id)?;
        let data = state
            .uploads
            .read(&file.filename)
            .map_err(|_| ApiError::not_found("File missing"))?;
        Ok(FileReply::new(data, file))
    })
}

/// Executes an uploaded script with a fixed timeout.
///
/// Deliberate, explicitly-flagged hazard: the child runs unsandboxed
/// with the service's privileges. Local, trusted use only.
#[utoipa::path(
    post,
    path = "/api/exec/{id}",
    tag = "exec",
    responses(
        (status = 200, description = "Captured output and exit code", body = ExecOutcome),
        (status = 400, description = "Not an executable script", body = String),
        (status = 404, description = "File or blob missing", body = String),
        (status = 500, description = "Execution error", body = String),
        (status = 504, description = "Execution timed out", body = String)
    ),
    params(
        ("id" = i64, Path, description = "File id")
    ),
)]
pub async fn exec_file(
    Path(id): Path<i64>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let file = execute(&state.db, Mode::ReadOnly, |mut repository| {
        Ok(repository.get_file(id)?)
    })?;

    if file.file_type != exec::SCRIPT_EXTENSION {
        return Err(ApiError::validation("only .py execution supported"));
    }
    if !state.uploads.exists(&file.filename) {
        return Err(ApiError::not_found("File missing on disk"));
    }

    let outcome = exec::run_script(state.uploads.root(), &file.filename).await?;
    Ok(Json(outcome))
}

/// Returns the last written cache mirror verbatim
#[utoipa::path(
    get,
    path = "/api/cache",
    tag = "cache",
    responses(
        (status = 200, description = "Mirror snapshot, empty object when absent", body = CacheSnapshot),
    ),
)]
pub async fn get_cache(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(cache::load(&state.cache))
}

/// Uppercases the submitted text
#[utoipa::path(
    post,
    path = "/api/tool/uppercaser",
    tag = "tools",
    request_body = UppercaseRequest,
    responses(
        (status = 200, description = "Uppercased text", body = UppercaseResult),
    ),
)]
pub async fn uppercaser(Json(payload): Json<UppercaseRequest>) -> impl IntoResponse {
    Json(UppercaseResult {
        result: tools::uppercase(&payload.text),
    })
}

/// Area of a circle from its radius
#[utoipa::path(
    post,
    path = "/api/tool/area/circle",
    tag = "tools",
    request_body = CircleRequest,
    responses(
        (status = 200, description = "Computed area", body = AreaResult),
    ),
)]
pub async fn area_circle(Json(payload): Json<CircleRequest>) -> impl IntoResponse {
    Json(AreaResult {
        area: tools::circle_area(payload.radius),
    })
}

/// Area of a triangle from base and height
#[utoipa::path(
    post,
    path = "/api/tool/area/triangle",
    tag = "tools",
    request_body = TriangleRequest,
    responses(
        (status = 200, description = "Computed area", body = AreaResult),
    ),
)]
pub async fn area_triangle(Json(payload): Json<TriangleRequest>) -> impl IntoResponse {
    Json(AreaResult {
        area: tools::triangle_area(payload.base, payload.height),
    })
}

/// Current simulated list plus the persisted operation history
#[utoipa::path(
    get,
    path = "/api/tool/linkedlist",
    tag = "tools",
    responses(
        (status = 200, description = "List content and history", body = ListToolState),
    ),
)]
pub async fn list_state(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let list = state.list.lock().await.items();
    let history = with_history(&state.history, Mode::ReadOnly, |mut log| Ok(log.list()?))?;
    Ok(Json(ListToolState { list, history }))
}

/// Adds a value at either end of the simulated list
#[utoipa::path(
    post,
    path = "/api/tool/linkedlist/add",
    tag = "tools",
    request_body = ListAddRequest,
    responses(
        (status = 200, description = "List after the addition", body = ListState),
        (status = 400, description = "Value required", body = String)
    ),
)]
pub async fn list_add(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ListAddRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let value = payload.value.trim().to_owned();
    if value.is_empty() {
        return Err(ApiError::validation("value required"));
    }

    let list = {
        let mut sim = state.list.lock().await;
        sim.add(value.clone(), payload.position);
        sim.items()
    };

    with_history(&state.history, Mode::ReadWrite, |mut log| {
        log.append(
            ListAction::Add,
            Some(&value),
            payload.position,
            Utc::now().timestamp(),
        )?;
        Ok(())
    })?;

    Ok(Json(ListState { list }))
}

/// Removes a value from either end of the simulated list
#[utoipa::path(
    post,
    path = "/api/tool/linkedlist/remove",
    tag = "tools",
    request_body = ListRemoveRequest,
    responses(
        (status = 200, description = "List after the removal", body = ListRemoveResult),
        (status = 400, description = "List is empty", body = String)
    ),
)]
pub async fn list_remove(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ListRemoveRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (removed, list) = {
        let mut sim = state.list.lock().await;
        let Some(removed) = sim.remove(payload.position) else {
            return Err(ApiError::validation("list is empty"));
        };
        (removed, sim.items())
    };

    with_history(&state.history, Mode::ReadWrite, |mut log| {
        log.append(
            ListAction::Remove,
            Some(&removed),
            payload.position,
            Utc::now().timestamp(),
        )?;
        Ok(())
    })?;

    Ok(Json(ListRemoveResult { removed, list }))
}

/// Converts an infix expression to postfix
#[utoipa::path(
    post,
    path = "/api/tool/stack/infix_to_postfix",
    tag = "tools",
    request_body = PostfixRequest,
    responses(
        (status = 200, description = "Converted expression", body = PostfixResult),
    ),
)]
pub async fn infix_to_postfix(Json(payload): Json<PostfixRequest>) -> impl IntoResponse {
    Json(PostfixResult {
        result: tools::infix_to_postfix(&payload.expression),
    })
}

fn refresh_cache(repository: &mut Sqlite, state: &AppState) -> Result<(), ApiError> {
    cache::rebuild(repository, &state.cache, Utc::now().timestamp())?;
    Ok(())
}

fn execute<F, R>(db: &StdPath, mode: Mode, action: F) -> Result<R, ApiError>
where
    F: FnOnce(Sqlite) -> Result<R, ApiError>,
{
    let start = Instant::now();
    match Sqlite::open(db, mode) {
        Ok(repository) => {
            let res = action(repository);
            tracing::debug!("DB query time: {:?}", start.elapsed());
            res
        }
        Err(e) => {
            tracing::error!("{e}");
            Err(ApiError::Internal(e.to_string()))
        }
    }
}

fn with_history<F, R>(path: &StdPath, mode: Mode, action: F) -> Result<R, ApiError>
where
    F: FnOnce(HistoryLog) -> Result<R, ApiError>,
{
    match HistoryLog::open(path, mode) {
        Ok(log) => action(log),
        Err(e) => {
            tracing::error!("{e}");
            Err(ApiError::Internal(e.to_string()))
        }
    }
}

async fn read_from_stream<S, E>(stream: S) -> io::Result<(Vec<u8>, usize)>
where
    S: Stream<Item = Result<Bytes, E>> + StreamExt,
    E: Sync + std::error::Error + Send + 'static,
{
    // Convert the stream into an `AsyncRead`.
    let body_with_io_error = stream.map_err(io::Error::other);
    let body_reader = StreamReader::new(body_with_io_error);
    futures::pin_mut!(body_reader);
    let mut buffer = Vec::new();

    let copied_bytes = tokio::io::copy(&mut body_reader, &mut buffer).await?;
    let copied_bytes = usize::try_from(copied_bytes).unwrap_or(usize::MAX);
    Ok((buffer, copied_bytes))
}

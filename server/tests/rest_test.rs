use futures::channel::oneshot;
use futures::channel::oneshot::Sender;
use kernel::{DeleteResult, FileEntry, Folder};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use reqwest::StatusCode;
use serial_test::serial;
use server::AppState;
use std::env;
use std::path::PathBuf;
use test_context::{test_context, AsyncTestContext};
use tokio::task::JoinHandle;
use uuid::Uuid;

struct FolioAsyncContext {
    root: PathBuf,
    port: String,
    shutdown: Sender<()>,
    join: JoinHandle<()>,
}

impl FolioAsyncContext {
    fn blob_path(&self, filename: &str) -> PathBuf {
        self.root.join("uploads").join(filename)
    }
}

impl AsyncTestContext for FolioAsyncContext {
    async fn setup() -> FolioAsyncContext {
        let root = env::temp_dir().join(format!("folio_test_{}", Uuid::new_v4().simple()));
        tokio::fs::create_dir_all(&root).await.unwrap();

        let state = AppState::new(
            root.join("folio.db"),
            root.join("history.db"),
            root.join("uploads"),
            root.join("cache.json"),
        );
        server::init_stores(&state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port().to_string();

        let (send, recv) = oneshot::channel::<()>();

        let app = server::create_routes(state);
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = recv.await;
                })
                .await
                .unwrap()
        });

        FolioAsyncContext {
            root,
            port,
            shutdown: send,
            join: task,
        }
    }

    async fn teardown(self) {
        self.shutdown.send(()).unwrap_or_default();
        self.join.await.unwrap_or_default();
        tokio::fs::remove_dir_all(self.root)
            .await
            .unwrap_or_default();
    }
}

fn url(ctx: &FolioAsyncContext, path: &str) -> String {
    format!("http://localhost:{}{}", ctx.port, path)
}

async fn create_folder(client: &Client, ctx: &FolioAsyncContext, name: &str) -> Folder {
    let response = client
        .post(url(ctx, "/api/folders"))
        .json(&serde_json::json!({ "name": name }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    response.json().await.unwrap()
}

async fn upload(
    client: &Client,
    ctx: &FolioAsyncContext,
    file_name: &str,
    content: &[u8],
    folder_id: Option<i64>,
    display_name: Option<&str>,
) -> reqwest::Response {
    let mut form = Form::new().part(
        "file",
        Part::bytes(content.to_vec()).file_name(file_name.to_string()),
    );
    if let Some(folder) = folder_id {
        form = form.text("folder_id", folder.to_string());
    }
    if let Some(name) = display_name {
        form = form.text("display_name", name.to_string());
    }
    client
        .post(url(ctx, "/api/files"))
        .multipart(form)
        .send()
        .await
        .unwrap()
}

async fn upload_ok(
    client: &Client,
    ctx: &FolioAsyncContext,
    file_name: &str,
    content: &[u8],
    folder_id: Option<i64>,
    display_name: Option<&str>,
) -> FileEntry {
    let response = upload(client, ctx, file_name, content, folder_id, display_name).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    response.json().await.unwrap()
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn create_folder_then_list_contains_it_once(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();

    // Act
    let created = create_folder(&client, ctx, "projects").await;
    let folders: Vec<Folder> = client
        .get(url(ctx, "/api/folders"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Assert
    let matching: Vec<&Folder> = folders.iter().filter(|f| f.name == "projects").collect();
    assert_eq!(matching.len(), 1);
    assert_eq!(matching[0].id, created.id);
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn create_folder_with_empty_name_rejected(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();

    // Act
    let response = client
        .post(url(ctx, "/api/folders"))
        .json(&serde_json::json!({ "name": "   " }))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn rename_folder_changes_listing(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();
    let created = create_folder(&client, ctx, "old name").await;

    // Act
    let response = client
        .put(url(ctx, &format!("/api/folders/{}", created.id)))
        .json(&serde_json::json!({ "name": "new name" }))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let renamed: Folder = response.json().await.unwrap();
    assert_eq!(renamed.name, "new name");

    let folders: Vec<Folder> = client
        .get(url(ctx, "/api/folders"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(folders.iter().any(|f| f.name == "new name"));
    assert!(!folders.iter().any(|f| f.name == "old name"));
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn rename_missing_folder_not_found(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();

    // Act
    let response = client
        .put(url(ctx, "/api/folders/30000"))
        .json(&serde_json::json!({ "name": "whatever" }))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn delete_folder_cascades_file_records_but_keeps_blobs(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();
    let folder = create_folder(&client, ctx, "projects").await;
    let f1 = upload_ok(&client, ctx, "a.txt", b"a", Some(folder.id), None).await;
    let f2 = upload_ok(&client, ctx, "b.txt", b"b", Some(folder.id), None).await;

    // Act
    let response = client
        .delete(url(ctx, &format!("/api/folders/{}", folder.id)))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let result: DeleteResult = response.json().await.unwrap();
    assert_eq!(result.folders, 1);
    assert_eq!(result.files, 2);

    let files: Vec<FileEntry> = client
        .get(url(ctx, "/api/files"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(files.is_empty());

    // Cascaded metadata deletion leaves the blobs behind in the
    // upload directory.
    assert!(ctx.blob_path(&f1.filename).exists());
    assert!(ctx.blob_path(&f2.filename).exists());
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn delete_missing_folder_not_found(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();

    // Act
    let response = client
        .delete(url(ctx, "/api/folders/30000"))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn upload_defaults_display_name_to_submitted_filename(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();

    // Act
    let file = upload_ok(&client, ctx, "report.txt", b"content", None, None).await;

    // Assert
    assert_eq!(file.name, "report.txt");
    assert_eq!(file.filename, "report.txt");
    assert_eq!(file.file_type, "txt");
    assert!(file.folder_id.is_none());
    assert!(ctx.blob_path(&file.filename).exists());
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn upload_collision_gets_distinct_disk_name(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();
    let first = upload_ok(&client, ctx, "notes.txt", b"one", None, None).await;

    // Act
    let second = upload_ok(&client, ctx, "notes.txt", b"two", None, None).await;

    // Assert
    assert_eq!(first.filename, "notes.txt");
    assert_eq!(second.filename, "notes_1.txt");
    // Both keep the requested display name.
    assert_eq!(first.name, "notes.txt");
    assert_eq!(second.name, "notes.txt");
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn upload_with_display_name_override(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();

    // Act
    let file = upload_ok(&client, ctx, "raw.txt", b"x", None, Some("My report")).await;

    // Assert
    assert_eq!(file.name, "My report");
    assert_eq!(file.filename, "raw.txt");
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn upload_without_file_part_rejected(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();
    let form = Form::new().text("display_name", "nothing here");

    // Act
    let response = client
        .post(url(ctx, "/api/files"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn upload_into_unknown_folder_rejected(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();

    // Act
    let response = upload(&client, ctx, "lost.txt", b"x", Some(30000), None).await;

    // Assert
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn list_files_filtered_by_folder(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();
    let folder = create_folder(&client, ctx, "projects").await;
    upload_ok(&client, ctx, "in.txt", b"x", Some(folder.id), None).await;
    upload_ok(&client, ctx, "out.txt", b"y", None, None).await;

    // Act
    let filtered: Vec<FileEntry> = client
        .get(url(ctx, &format!("/api/files?folder_id={}", folder.id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let all: Vec<FileEntry> = client
        .get(url(ctx, "/api/files"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Assert
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].name, "in.txt");
    assert_eq!(all.len(), 2);
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn get_missing_file_not_found(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();

    // Act
    let response = client
        .get(url(ctx, "/api/files/30000"))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn rename_and_reparent_file(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();
    let folder = create_folder(&client, ctx, "projects").await;
    let file = upload_ok(&client, ctx, "draft.txt", b"x", None, None).await;

    // Act
    let response = client
        .put(url(ctx, &format!("/api/files/{}", file.id)))
        .json(&serde_json::json!({ "name": "final", "folder_id": folder.id }))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let updated: FileEntry = response.json().await.unwrap();
    assert_eq!(updated.name, "final");
    assert_eq!(updated.folder_id, Some(folder.id));
    // The on-disk name does not change on rename.
    assert_eq!(updated.filename, "draft.txt");
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn delete_file_removes_blob_and_content_is_gone(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();
    let file = upload_ok(&client, ctx, "gone.txt", b"bye", None, None).await;

    // Act
    let response = client
        .delete(url(ctx, &format!("/api/files/{}", file.id)))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let result: DeleteResult = response.json().await.unwrap();
    assert_eq!(result.files, 1);
    assert_eq!(result.blobs, 1);
    assert!(!ctx.blob_path(&file.filename).exists());

    let content = client
        .get(url(ctx, &format!("/api/file-content/{}", file.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(content.status(), StatusCode::NOT_FOUND);
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn file_content_roundtrip(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();
    let file = upload_ok(&client, ctx, "notes.txt", b"first", None, None).await;
    let content_url = url(ctx, &format!("/api/file-content/{}", file.id));

    // Act
    let read: serde_json::Value = client
        .get(&content_url)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let write = client
        .put(&content_url)
        .json(&serde_json::json!({ "content": "second" }))
        .send()
        .await
        .unwrap();
    let reread: serde_json::Value = client
        .get(&content_url)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Assert
    assert_eq!(read["content"], "first");
    assert_eq!(write.status(), StatusCode::OK);
    assert_eq!(reread["content"], "second");
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn download_as_attachment(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();
    let file = upload_ok(&client, ctx, "data.bin", b"payload", None, None).await;

    // Act
    let response = client
        .get(url(ctx, &format!("/api/download/{}", file.id)))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("attachment"));
    assert!(disposition.contains("data.bin"));
    let body = response.bytes().await.unwrap();
    assert_eq!(&body[..], b"payload");
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn cache_is_empty_object_before_any_mutation(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();

    // Act
    let value: serde_json::Value = client
        .get(url(ctx, "/api/cache"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Assert
    assert_eq!(value, serde_json::json!({}));
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn cache_reflects_mutation_immediately(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();
    let folder = create_folder(&client, ctx, "projects").await;
    upload_ok(&client, ctx, "in.txt", b"x", Some(folder.id), None).await;
    upload_ok(&client, ctx, "loose.txt", b"y", None, None).await;

    // Act
    let value: serde_json::Value = client
        .get(url(ctx, "/api/cache"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Assert
    let folders = value["folders"].as_array().unwrap();
    assert_eq!(folders.len(), 1);
    assert_eq!(folders[0]["name"], "projects");
    let folder_files = folders[0]["files"].as_array().unwrap();
    assert_eq!(folder_files.len(), 1);
    assert_eq!(folder_files[0]["name"], "in.txt");
    let root_files = value["root_files"].as_array().unwrap();
    assert_eq!(root_files.len(), 1);
    assert_eq!(root_files[0]["name"], "loose.txt");
    assert!(value["updated_at"].as_i64().unwrap() > 0);
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn oversized_upload_rejected_by_serving_layer(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();
    let oversized = vec![0u8; 17 * 1024 * 1024];

    // Act
    let response = upload(&client, ctx, "big.bin", &oversized, None, None).await;

    // Assert
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn exec_non_script_rejected(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();
    let file = upload_ok(&client, ctx, "notes.txt", b"print('nope')", None, None).await;

    // Act
    let response = client
        .post(url(ctx, &format!("/api/exec/{}", file.id)))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn exec_missing_file_not_found(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();

    // Act
    let response = client
        .post(url(ctx, "/api/exec/30000"))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn profile_is_seeded_and_readable(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();

    // Act
    let value: serde_json::Value = client
        .get(url(ctx, "/api/profile"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Assert
    assert!(value["name"].as_str().is_some());
    assert!(!value["name"].as_str().unwrap().is_empty());
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn uppercaser_tool(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();

    // Act
    let value: serde_json::Value = client
        .post(url(ctx, "/api/tool/uppercaser"))
        .json(&serde_json::json!({ "text": "hello folio" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Assert
    assert_eq!(value["result"], "HELLO FOLIO");
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn area_tools(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();

    // Act
    let circle: serde_json::Value = client
        .post(url(ctx, "/api/tool/area/circle"))
        .json(&serde_json::json!({ "radius": 2.0 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let triangle: serde_json::Value = client
        .post(url(ctx, "/api/tool/area/triangle"))
        .json(&serde_json::json!({ "base": 4.0, "height": 3.0 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Assert
    let circle_area = circle["area"].as_f64().unwrap();
    assert!((circle_area - 12.566_370_614_359_172).abs() < 1e-9);
    let triangle_area = triangle["area"].as_f64().unwrap();
    assert!((triangle_area - 6.0).abs() < 1e-9);
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn linked_list_sequence_and_history(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();
    let add_url = url(ctx, "/api/tool/linkedlist/add");

    // Act
    client
        .post(&add_url)
        .json(&serde_json::json!({ "value": "x", "position": "begin" }))
        .send()
        .await
        .unwrap();
    client
        .post(&add_url)
        .json(&serde_json::json!({ "value": "y", "position": "end" }))
        .send()
        .await
        .unwrap();
    let removed: serde_json::Value = client
        .post(url(ctx, "/api/tool/linkedlist/remove"))
        .json(&serde_json::json!({ "position": "end" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let state: serde_json::Value = client
        .get(url(ctx, "/api/tool/linkedlist"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Assert
    assert_eq!(removed["removed"], "y");
    assert_eq!(removed["list"], serde_json::json!(["x"]));
    assert_eq!(state["list"], serde_json::json!(["x"]));
    let history = state["history"].as_array().unwrap();
    assert_eq!(history.len(), 3);
    // Newest first.
    assert_eq!(history[0]["action"], "remove");
    assert_eq!(history[0]["value"], "y");
    assert_eq!(history[2]["action"], "add");
    assert_eq!(history[2]["value"], "x");
    assert_eq!(history[2]["position"], "begin");
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn remove_from_empty_list_rejected(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();

    // Act
    let response = client
        .post(url(ctx, "/api/tool/linkedlist/remove"))
        .json(&serde_json::json!({ "position": "begin" }))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn infix_to_postfix_endpoint(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();
    let convert_url = url(ctx, "/api/tool/stack/infix_to_postfix");

    // Act
    let plain: serde_json::Value = client
        .post(&convert_url)
        .json(&serde_json::json!({ "expression": "A+B*C" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let parenthesized: serde_json::Value = client
        .post(&convert_url)
        .json(&serde_json::json!({ "expression": "(A+B)*C" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Assert
    assert_eq!(plain["result"], "ABC*+");
    assert_eq!(parenthesized["result"], "AB+C*");
}

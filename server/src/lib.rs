use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use futures::lock::Mutex;
use std::time::Duration;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    classify::ServerErrorsFailureClass, limit::RequestBodyLimitLayer, trace::TraceLayer,
};
use tracing::Span;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod cache;
pub mod domain;
pub mod error;
pub mod exec;
pub mod file_reply;
mod handlers;
pub mod history;
pub mod sqlite;
pub mod tools;
pub mod uploads;

extern crate serde;

#[cfg(test)] // <-- not needed in integration tests
extern crate rstest;

use crate::domain::Storage;
use crate::history::HistoryLog;
use crate::sqlite::{Mode, Sqlite};
use crate::tools::LinkedListSim;
use crate::uploads::UploadStore;
use std::env;
use std::net::SocketAddr;
use std::path::Path;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DB_FILE: &str = "folio.db";
const HISTORY_FILE: &str = "history.db";
const CACHE_FILE: &str = "cache.json";
const UPLOAD_DIR: &str = "uploads";
const CURRENT_DIR: &str = "./";

/// Upload cap; oversized requests are rejected by the serving layer
/// before any handler runs.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Shared per-process state: store locations plus the in-memory
/// linked-list simulator. Database connections are NOT held here, every
/// handler opens its own scoped connection.
pub struct AppState {
    pub db: PathBuf,
    pub history: PathBuf,
    pub uploads: UploadStore,
    pub cache: PathBuf,
    pub list: Mutex<LinkedListSim>,
}

impl AppState {
    #[must_use]
    pub fn new(db: PathBuf, history: PathBuf, upload_root: PathBuf, cache: PathBuf) -> Self {
        Self {
            db,
            history,
            uploads: UploadStore::new(upload_root),
            cache,
            list: Mutex::new(LinkedListSim::default()),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::get_profile,
        handlers::get_folders,
        handlers::create_folder,
        handlers::rename_folder,
        handlers::delete_folder,
        handlers::get_files,
        handlers::upload_file,
        handlers::get_file,
        handlers::update_file,
        handlers::delete_file,
        handlers::read_file_content,
        handlers::write_file_content,
        handlers::download_file,
        handlers::exec_file,
        handlers::get_cache,
        handlers::uppercaser,
        handlers::area_circle,
        handlers::area_triangle,
        handlers::list_state,
        handlers::list_add,
        handlers::list_remove,
        handlers::infix_to_postfix,
    ),
    components(
        schemas(
            kernel::Folder,
            kernel::FileEntry,
            kernel::Profile,
            kernel::DeleteResult,
            kernel::CacheFolder,
            kernel::CacheSnapshot,
            kernel::ExecOutcome,
            kernel::ListPosition,
            kernel::ListAction,
            kernel::ListOperation,
            kernel::ListToolState,
            kernel::ListState,
            kernel::ListRemoveResult,
            kernel::FolderName,
            kernel::UpdateFile,
            kernel::FileContent,
            kernel::SaveResult,
            kernel::UppercaseRequest,
            kernel::UppercaseResult,
            kernel::CircleRequest,
            kernel::TriangleRequest,
            kernel::AreaResult,
            kernel::ListAddRequest,
            kernel::ListRemoveRequest,
            kernel::PostfixRequest,
            kernel::PostfixResult,
        ),
        responses(file_reply::FileReply)
    ),
    tags(
        (name = "profile", description = "Singleton profile record"),
        (name = "folders", description = "Folder management"),
        (name = "files", description = "File management"),
        (name = "content", description = "Textual file content"),
        (name = "cache", description = "Denormalized listing mirror"),
        (name = "tools", description = "Demo tool endpoints"),
        (name = "exec", description = "Script execution (unsandboxed, local use only)")
    )
)]
struct ApiDoc;

pub async fn run() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "folio=debug,server=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Configuration from environment
    let dir = env::var("FOLIO_DATA_DIR").unwrap_or_else(|_| String::from(CURRENT_DIR));
    let db_file = env::var("FOLIO_DATA_FILE").unwrap_or_else(|_| String::from(DB_FILE));
    let history_file =
        env::var("FOLIO_HISTORY_FILE").unwrap_or_else(|_| String::from(HISTORY_FILE));
    let cache_file = env::var("FOLIO_CACHE_FILE").unwrap_or_else(|_| String::from(CACHE_FILE));
    let upload_dir = env::var("FOLIO_UPLOAD_DIR").unwrap_or_else(|_| String::from(UPLOAD_DIR));
    let port = env::var("FOLIO_PORT").unwrap_or_else(|_| String::from("5000"));

    // Start init
    let root = Path::new(&dir);
    let state = AppState::new(
        root.join(db_file),
        root.join(history_file),
        root.join(upload_dir),
        root.join(cache_file),
    );
    init_stores(&state);

    let socket: SocketAddr = format!("0.0.0.0:{port}").parse().expect("Invalid socket");
    tracing::debug!("listening on {socket}");

    let app = create_routes(state);

    let listener = tokio::net::TcpListener::bind(socket)
        .await
        .expect("Cannot bind server socket");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();
}

/// Creates the stores the service needs on first run: the upload
/// directory, the main database with its seeded profile row, and the
/// list-history database.
pub fn init_stores(state: &AppState) {
    state
        .uploads
        .ensure_root()
        .expect("Upload directory cannot be created");
    if !state.db.exists() {
        Sqlite::open(&state.db, Mode::ReadWrite)
            .expect("Database file cannot be created")
            .new_database()
            .unwrap_or_default();
    }
    if !state.history.exists() {
        HistoryLog::open(&state.history, Mode::ReadWrite)
            .expect("History file cannot be created")
            .new_database()
            .unwrap_or_default();
    }
}

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .route("/api/profile", get(handlers::get_profile))
        .route(
            "/api/folders",
            get(handlers::get_folders).post(handlers::create_folder),
        )
        .route(
            "/api/folders/:id",
            put(handlers::rename_folder).delete(handlers::delete_folder),
        )
        .route(
            "/api/files",
            get(handlers::get_files).post(handlers::upload_file),
        )
        .route(
            "/api/files/:id",
            get(handlers::get_file)
                .put(handlers::update_file)
                .delete(handlers::delete_file),
        )
        .route(
            "/api/file-content/:id",
            get(handlers::read_file_content).put(handlers::write_file_content),
        )
        .route("/api/download/:id", get(handlers::download_file))
        .route("/api/exec/:id", post(handlers::exec_file))
        .route("/api/cache", get(handlers::get_cache))
        .route("/api/tool/uppercaser", post(handlers::uppercaser))
        .route("/api/tool/area/circle", post(handlers::area_circle))
        .route("/api/tool/area/triangle", post(handlers::area_triangle))
        .route("/api/tool/linkedlist", get(handlers::list_state))
        .route("/api/tool/linkedlist/add", post(handlers::list_add))
        .route("/api/tool/linkedlist/remove", post(handlers::list_remove))
        .route(
            "/api/tool/stack/infix_to_postfix",
            post(handlers::infix_to_postfix),
        )
        .with_state(Arc::new(state))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http().on_failure(
                    |error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                        tracing::error!("Server error: {error}");
                    },
                ))
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
                .into_inner(),
        )
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    println!("signal received, starting graceful shutdown");
}

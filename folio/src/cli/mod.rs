pub mod bugreport;
pub mod client;
pub mod version;

pub const SERVER_SUBCOMMAND: &str = "server";
pub const SERVER_DESCRIPTION: &str = "Run the server";

pub const VERSION_SUBCOMMAND: &str = "version";
pub const VERSION_DESCRIPTION: &str = "Display the version and build information";

pub const BUGREPORT_SUBCOMMAND: &str = "bugreport";
pub const BUGREPORT_DESCRIPTION: &str = "Collect environment information for a bug report";

pub const FOLDER_SUBCOMMAND: &str = "folder";
pub const FOLDER_DESCRIPTION: &str = "Work with folders on a running server";

pub const FILE_SUBCOMMAND: &str = "file";
pub const FILE_DESCRIPTION: &str = "Work with files on a running server";

pub const LIST_SUBCOMMAND: &str = "list";
pub const FOLDER_LIST_DESCRIPTION: &str = "List all folders";
pub const FILE_LIST_DESCRIPTION: &str = "List files, optionally restricted to one folder";

pub const CREATE_SUBCOMMAND: &str = "create";
pub const FOLDER_CREATE_DESCRIPTION: &str = "Create a folder";

pub const UPLOAD_SUBCOMMAND: &str = "upload";
pub const FILE_UPLOAD_DESCRIPTION: &str = "Upload a single file";

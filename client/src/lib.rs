use std::path::PathBuf;

use comfy_table::{presets::UTF8_HORIZONTAL_ONLY, Attribute, Cell, ContentArrangement, Table};
use kernel::{FileEntry, Folder};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use url::Url;

pub struct UploadParams {
    pub uri: String,
    pub file: String,
    pub folder: Option<i64>,
    pub display_name: Option<String>,
}

fn endpoint(base: &str, path: &str) -> Option<Url> {
    let base = Url::parse(base).ok()?;
    base.join(path).ok()
}

pub async fn upload_file(params: UploadParams) {
    let Some(target) = endpoint(&params.uri, "/api/files") else {
        println!("invalid server uri: {}", params.uri);
        return;
    };

    let path = PathBuf::from(&params.file);
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_owned();

    let error_message = format!("no such file {}", &params.file);
    let f = File::open(&params.file).await.expect(&error_message);
    let stream = ReaderStream::new(f);
    let body = reqwest::Body::wrap_stream(stream);

    let mut form = Form::new().part("file", Part::stream(body).file_name(file_name));
    if let Some(folder) = params.folder {
        form = form.text("folder_id", folder.to_string());
    }
    if let Some(name) = params.display_name {
        form = form.text("display_name", name);
    }

    let client = Client::new();
    let result = client.post(target).multipart(form).send().await;
    match result {
        Ok(x) => {
            println!("file {} uploaded. Status: {}", params.file, x.status());
        }
        Err(e) => {
            println!("upload error: {e}");
        }
    }
}

pub async fn create_folder(uri: &str, name: &str) {
    let Some(target) = endpoint(uri, "/api/folders") else {
        println!("invalid server uri: {uri}");
        return;
    };

    let client = Client::new();
    let result = client
        .post(target)
        .json(&serde_json::json!({ "name": name }))
        .send()
        .await;
    match result {
        Ok(x) => match x.json::<Folder>().await {
            Ok(folder) => println!("folder '{}' created with id {}", folder.name, folder.id),
            Err(e) => println!("JSON decode error: {e}"),
        },
        Err(e) => {
            println!("error: {e}");
        }
    }
}

pub async fn list_folders(uri: &str) {
    let Some(target) = endpoint(uri, "/api/folders") else {
        println!("invalid server uri: {uri}");
        return;
    };

    let client = Client::new();

    match client.get(target).send().await {
        Ok(response) => match response.json().await {
            Ok(r) => {
                let mut table = Table::new();
                table
                    .load_preset(UTF8_HORIZONTAL_ONLY)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_width(120)
                    .set_header(vec![
                        Cell::new("Id").add_attribute(Attribute::Bold),
                        Cell::new("Name").add_attribute(Attribute::Bold),
                        Cell::new("Created").add_attribute(Attribute::Bold),
                    ]);

                let folders: Vec<Folder> = r;
                for f in folders {
                    table.add_row(vec![
                        Cell::new(f.id),
                        Cell::new(f.name),
                        Cell::new(f.created_at),
                    ]);
                }
                println!("{table}");
            }
            Err(e) => println!("JSON decode error: {e}"),
        },
        Err(e) => {
            println!("error: {e}");
        }
    }
}

pub async fn list_files(uri: &str, folder: Option<i64>) {
    let path = match folder {
        Some(id) => format!("/api/files?folder_id={id}"),
        None => String::from("/api/files"),
    };
    let Some(target) = endpoint(uri, &path) else {
        println!("invalid server uri: {uri}");
        return;
    };

    let client = Client::new();

    match client.get(target).send().await {
        Ok(response) => match response.json().await {
            Ok(r) => {
                let mut table = Table::new();
                table
                    .load_preset(UTF8_HORIZONTAL_ONLY)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_width(120)
                    .set_header(vec![
                        Cell::new("Id").add_attribute(Attribute::Bold),
                        Cell::new("Name").add_attribute(Attribute::Bold),
                        Cell::new("On disk").add_attribute(Attribute::Bold),
                        Cell::new("Type").add_attribute(Attribute::Bold),
                        Cell::new("Folder").add_attribute(Attribute::Bold),
                    ]);

                let files: Vec<FileEntry> = r;
                for f in files {
                    let folder = f
                        .folder_id
                        .map_or_else(|| String::from("-"), |id| id.to_string());
                    table.add_row(vec![
                        Cell::new(f.id),
                        Cell::new(f.name),
                        Cell::new(f.filename),
                        Cell::new(f.file_type),
                        Cell::new(folder),
                    ]);
                }
                println!("{table}");
            }
            Err(e) => println!("JSON decode error: {e}"),
        },
        Err(e) => {
            println!("error: {e}");
        }
    }
}

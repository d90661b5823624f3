use client::UploadParams;

pub async fn upload_single_file(params: UploadParams) {
    client::upload_file(params).await;
}

pub async fn create_folder(uri: &str, name: &str) {
    client::create_folder(uri, name).await;
}

pub async fn list_folders(uri: &str) {
    client::list_folders(uri).await;
}

pub async fn list_files(uri: &str, folder: Option<i64>) {
    client::list_files(uri, folder).await;
}

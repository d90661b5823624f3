use axum::{
    body::Body,
    http::HeaderValue,
    response::{IntoResponse, Response},
};
use kernel::FileEntry;
use utoipa::{
    openapi::{self, content, ObjectBuilder, RefOr, ResponseBuilder, SchemaType},
    ToResponse,
};

/// Attachment download of an uploaded blob. The suggested client-side
/// name is the unique on-disk filename, not the display name.
pub struct FileReply {
    data: Vec<u8>,
    file: FileEntry,
}

impl FileReply {
    #[must_use]
    pub fn new(data: Vec<u8>, file: FileEntry) -> Self {
        Self { data, file }
    }
}

impl IntoResponse for FileReply {
    fn into_response(self) -> Response {
        let len = self.data.len().to_string();
        let attachment = format!(r#"attachment; filename="{}""#, self.file.filename);

        let mut res = Body::from(self.data).into_response();
        res.headers_mut().insert(
            "content-type",
            HeaderValue::from_static("application/octet-stream"),
        );
        if let Ok(val) = HeaderValue::from_str(attachment.as_str()) {
            res.headers_mut().insert("content-disposition", val);
        }
        if let Ok(val) = HeaderValue::from_str(len.as_str()) {
            res.headers_mut().insert("Content-Length", val);
        }

        res
    }
}

impl ToResponse<'static> for FileReply {
    fn response() -> (&'static str, RefOr<openapi::Response>) {
        let object_builder = ObjectBuilder::new();
        let object = object_builder
            .schema_type(SchemaType::String)
            .format(Some(openapi::SchemaFormat::KnownFormat(
                openapi::KnownFormat::Binary,
            )))
            .build();
        let content = content::Content::new(object);
        (
            "FileReply",
            ResponseBuilder::new()
                .description("File binary content")
                .content("application/octet-stream", content)
                .build()
                .into(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(filename: &str) -> FileEntry {
        FileEntry {
            id: 1,
            folder_id: None,
            name: String::from("display name"),
            filename: filename.to_owned(),
            file_type: String::from("txt"),
            created_at: 0,
        }
    }

    #[test]
    fn reply_headers() {
        let reply = FileReply::new(b"hello".to_vec(), entry("notes_1.txt"));

        let response = reply.into_response();

        let headers = response.headers();
        assert_eq!(
            headers.get("content-disposition").unwrap(),
            r#"attachment; filename="notes_1.txt""#
        );
        assert_eq!(headers.get("content-type").unwrap(), "application/octet-stream");
        assert_eq!(headers.get("Content-Length").unwrap(), "5");
    }
}

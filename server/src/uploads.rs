use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Filesystem directory holding uploaded blobs.
///
/// Metadata lives in the relational store; blobs are addressed by the
/// collision-avoided on-disk `filename`, which may differ from the
/// user-facing display name.
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure_root(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root)
    }

    #[must_use]
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.path_of(name).exists()
    }

    /// Sanitized submitted name, made unique within the directory by
    /// appending a numeric suffix before the extension on collision.
    #[must_use]
    pub fn unique_name(&self, submitted: &str) -> String {
        let sanitized = sanitize_file_name(submitted);
        let (stem, ext) = split_name(&sanitized);
        let mut candidate = sanitized.clone();
        let mut counter = 1;
        while self.exists(&candidate) {
            candidate = if ext.is_empty() {
                format!("{stem}_{counter}")
            } else {
                format!("{stem}_{counter}.{ext}")
            };
            counter += 1;
        }
        candidate
    }

    pub fn save(&self, name: &str, data: &[u8]) -> io::Result<()> {
        fs::write(self.path_of(name), data)
    }

    pub fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        fs::read(self.path_of(name))
    }

    /// Blob content as text, with invalid UTF-8 replaced.
    pub fn read_text(&self, name: &str) -> io::Result<String> {
        let bytes = self.read(name)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn write_text(&self, name: &str, content: &str) -> io::Result<()> {
        fs::write(self.path_of(name), content)
    }

    /// Best-effort removal. Failures are logged and swallowed, the
    /// caller proceeds with metadata deletion either way.
    pub fn remove(&self, name: &str) -> bool {
        match fs::remove_file(self.path_of(name)) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("blob '{}' not removed: {}", name, e);
                false
            }
        }
    }
}

/// Strips path components and replaces anything outside
/// `[A-Za-z0-9._-]`, so a stored name cannot escape the upload
/// directory.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let name = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        String::from("file")
    } else {
        trimmed.to_owned()
    }
}

/// Lowercase extension of an on-disk name, without the dot.
#[must_use]
pub fn extension_of(name: &str) -> String {
    split_name(name).1.to_ascii_lowercase()
}

fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(ix) if ix > 0 => (&name[..ix], &name[ix + 1..]),
        _ => (name, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::env;

    fn temp_store() -> UploadStore {
        let dir = env::temp_dir().join(format!(
            "folio_uploads_test_{}",
            uuid::Uuid::new_v4().simple()
        ));
        let store = UploadStore::new(dir);
        store.ensure_root().unwrap();
        store
    }

    #[rstest]
    #[case("report.txt", "report.txt")]
    #[case("my report.txt", "my_report.txt")]
    #[case("../../etc/passwd", "passwd")]
    #[case("dir\\notes.md", "notes.md")]
    #[case(".hidden", "hidden")]
    #[case("...", "file")]
    #[case("", "file")]
    #[case("café.py", "caf_.py")]
    #[trace]
    fn sanitize(#[case] submitted: &str, #[case] expected: &str) {
        assert_eq!(sanitize_file_name(submitted), expected);
    }

    #[rstest]
    #[case("script.py", "py")]
    #[case("archive.tar.GZ", "gz")]
    #[case("noext", "")]
    #[trace]
    fn extension(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(extension_of(name), expected);
    }

    #[test]
    fn unique_name_appends_suffix_before_extension() {
        let store = temp_store();

        let first = store.unique_name("notes.txt");
        assert_eq!(first, "notes.txt");
        store.save(&first, b"one").unwrap();

        let second = store.unique_name("notes.txt");
        assert_eq!(second, "notes_1.txt");
        store.save(&second, b"two").unwrap();

        let third = store.unique_name("notes.txt");
        assert_eq!(third, "notes_2.txt");

        fs::remove_dir_all(store.root()).unwrap_or_default();
    }

    #[test]
    fn unique_name_without_extension() {
        let store = temp_store();

        store.save("notes", b"one").unwrap();
        assert_eq!(store.unique_name("notes"), "notes_1");

        fs::remove_dir_all(store.root()).unwrap_or_default();
    }

    #[test]
    fn remove_is_best_effort() {
        let store = temp_store();

        store.save("gone.txt", b"x").unwrap();
        assert!(store.remove("gone.txt"));
        assert!(!store.remove("gone.txt"));

        fs::remove_dir_all(store.root()).unwrap_or_default();
    }

    #[test]
    fn text_roundtrip() {
        let store = temp_store();

        store.write_text("a.txt", "hello").unwrap();
        assert_eq!(store.read_text("a.txt").unwrap(), "hello");

        fs::remove_dir_all(store.root()).unwrap_or_default();
    }
}

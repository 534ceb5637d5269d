use std::fmt;
use std::path::{Path, PathBuf};

use mime::Mime;
use reqwest::multipart::Part;
use tokio::fs::File;
use tracing::{debug, error};

use super::error::UploadError;

enum UploadBody {
    Bytes(Vec<u8>),
    File { path: PathBuf, len: u64 },
}

/// A file to send with [`ChatService::upload_file`](super::ChatService::upload_file).
pub struct UploadFile {
    file_name: String,
    mime: Option<Mime>,
    body: UploadBody,
}

impl fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadFile")
            .field("file_name", &self.file_name)
            .field("mime", &self.mime)
            .field("len", &self.len())
            .finish()
    }
}

impl UploadFile {
    /// In-memory file contents.
    pub fn from_bytes(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            mime: None,
            body: UploadBody::Bytes(bytes.into()),
        }
    }

    /// A local file, streamed from disk when uploaded.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, UploadError> {
        let path = path.as_ref();
        if !path.is_file() {
            error!(target: "ava::service::upload", path = %path.display(), "Path is not a file or does not exist");
            return Err(UploadError::InvalidPath(path.to_path_buf()));
        }
        let file_name = path
            .file_name()
            .and_then(|os_str| os_str.to_str())
            .map(|s| s.to_string())
            .ok_or_else(|| UploadError::FileName(path.to_path_buf()))?;
        let len = tokio::fs::metadata(path).await?.len();
        debug!(target: "ava::service::upload", %file_name, len, "Prepared file for upload");

        Ok(Self {
            file_name,
            mime: None,
            body: UploadBody::File { path: path.to_path_buf(), len },
        })
    }

    /// Content type of the `file` part; left to the server to guess otherwise.
    #[must_use]
    pub fn with_mime(mut self, mime: Mime) -> Self {
        self.mime = Some(mime);
        self
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime(&self) -> Option<&Mime> {
        self.mime.as_ref()
    }

    pub fn len(&self) -> u64 {
        match &self.body {
            UploadBody::Bytes(bytes) => bytes.len() as u64,
            UploadBody::File { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Builds the multipart `file` part.
    pub(crate) async fn into_part(self) -> Result<Part, UploadError> {
        let part = match self.body {
            UploadBody::Bytes(bytes) => Part::bytes(bytes),
            UploadBody::File { path, len } => {
                let file = File::open(&path).await?;
                let stream = reqwest::Body::wrap_stream(tokio_util::io::ReaderStream::new(file));
                Part::stream_with_length(stream, len)
            }
        }
        .file_name(self.file_name);

        match self.mime {
            Some(mime) => Ok(part.mime_str(mime.as_ref())?),
            None => Ok(part),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn reads_name_and_length_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::File::create(&path).unwrap().write_all(b"hello").unwrap();

        let file = UploadFile::from_path(&path).await.unwrap();
        assert_eq!(file.file_name(), "notes.txt");
        assert_eq!(file.len(), 5);
        assert!(file.into_part().await.is_ok());
    }

    #[tokio::test]
    async fn missing_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = UploadFile::from_path(dir.path().join("absent.png")).await.unwrap_err();
        assert!(matches!(err, UploadError::InvalidPath(_)));
    }

    #[test]
    fn in_memory_file() {
        let file = UploadFile::from_bytes("a.png", vec![1, 2, 3]).with_mime(mime::IMAGE_PNG);
        assert_eq!(file.len(), 3);
        assert_eq!(file.mime(), Some(&mime::IMAGE_PNG));
    }
}

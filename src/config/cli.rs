use crate::core::Attachment;
use crate::utils::error::Result;
use std::path::{Path, PathBuf};

/// Loads attachment files from the local disk for command-line submissions.
#[derive(Debug, Clone)]
pub struct LocalFiles {
    base_path: PathBuf,
}

impl LocalFiles {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub async fn read_attachment(&self, path: impl AsRef<Path>) -> Result<Attachment> {
        let full_path = self.base_path.join(path.as_ref());
        let data = tokio::fs::read(&full_path).await?;

        let file_name = full_path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("attachment")
            .to_string();
        let content_type = guess_content_type(&full_path).to_string();

        tracing::debug!(
            file = %full_path.display(),
            bytes = data.len(),
            content_type = %content_type,
            "Loaded attachment"
        );

        Ok(Attachment::new(file_name, content_type, data))
    }

    pub async fn read_all<P: AsRef<Path>>(&self, paths: &[P]) -> Result<Vec<Attachment>> {
        let mut attachments = Vec::with_capacity(paths.len());
        for path in paths {
            attachments.push(self.read_attachment(path).await?);
        }
        Ok(attachments)
    }
}

pub fn guess_content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("m4a") => "audio/mp4",
        Some("aac") => "audio/aac",
        Some("ogg") | Some("oga") => "audio/ogg",
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_guess_content_type() {
        assert_eq!(guess_content_type(Path::new("azaan.MP3")), "audio/mpeg");
        assert_eq!(guess_content_type(Path::new("takhbira.mov")), "video/quicktime");
        assert_eq!(guess_content_type(Path::new("notes")), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_read_attachment_relative_to_base() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("azaan.m4a"), b"fake-audio").unwrap();

        let files = LocalFiles::new(dir.path());
        let attachment = files.read_attachment("azaan.m4a").await.unwrap();

        assert_eq!(attachment.file_name, "azaan.m4a");
        assert_eq!(attachment.content_type, "audio/mp4");
        assert_eq!(attachment.data, b"fake-audio");

        assert!(files.read_attachment("missing.mp3").await.is_err());
    }
}

//! Backend that reads recognizer output already written next to the image.
//!
//! For `scans/page.png` it looks for `scans/page.hocr` and per-page passes
//! `scans/page.1.hocr`, `scans/page.2.hocr`, ... each optionally accompanied by a
//! transcript with the same stem and a `.txt` extension.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use crate::engine::{EngineError, MarkupPass, OcrInput, Recognition, RecognitionBackend};

pub struct SidecarBackend {
    markup_extension: String,
    transcript_extension: String,
}

impl SidecarBackend {
    pub fn new() -> Self {
        Self {
            markup_extension: "hocr".to_string(),
            transcript_extension: "txt".to_string(),
        }
    }

    pub fn with_extensions(markup: impl Into<String>, transcript: impl Into<String>) -> Self {
        Self {
            markup_extension: markup.into(),
            transcript_extension: transcript.into(),
        }
    }

    /// Markup files belonging to `image`, whole-document pass first, then per-page passes
    /// in page order.
    async fn markup_files(&self, image: &Path) -> Result<Vec<PathBuf>, EngineError> {
        let stem = image
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| EngineError::InvalidInput(image.display().to_string()))?;
        let dir = match image.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut files = Vec::new();
        let whole = dir.join(format!("{}.{}", stem, self.markup_extension));
        if fs::try_exists(&whole).await? {
            files.push(whole);
        }

        let prefix = format!("{}.", stem);
        let suffix = format!(".{}", self.markup_extension);
        let mut numbered = Vec::new();
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let page = name
                .strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(&suffix))
                .and_then(|n| n.parse::<u32>().ok());
            if let Some(page) = page {
                numbered.push((page, entry.path()));
            }
        }
        numbered.sort();
        files.extend(numbered.into_iter().map(|(_, path)| path));
        Ok(files)
    }

    async fn read_pass(&self, markup_path: &Path) -> Result<MarkupPass, EngineError> {
        let markup = fs::read_to_string(markup_path).await?;
        let transcript_path = markup_path.with_extension(&self.transcript_extension);
        let transcript = match fs::read_to_string(&transcript_path).await {
            Ok(text) => Some(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        debug!(
            markup = %markup_path.display(),
            transcript = transcript.is_some(),
            "read recognition pass"
        );
        Ok(MarkupPass { markup, transcript })
    }
}

impl Default for SidecarBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecognitionBackend for SidecarBackend {
    async fn recognize(&self, input: &OcrInput) -> Result<Recognition, EngineError> {
        match input {
            OcrInput::FilePath(path) => {
                let files = self.markup_files(path).await?;
                if files.is_empty() {
                    return Err(EngineError::MissingOutput(path.clone()));
                }
                let mut passes = Vec::with_capacity(files.len());
                for file in &files {
                    passes.push(self.read_pass(file).await?);
                }
                Ok(Recognition::Markup(passes))
            }
            OcrInput::Bytes(_) => Err(EngineError::Unsupported),
        }
    }
}

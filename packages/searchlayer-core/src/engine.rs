use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::region::PageIndex;

#[derive(Debug, Clone)]
pub enum OcrInput {
    FilePath(PathBuf),
    Bytes(Vec<u8>),
}

/// One recognition pass: an hOCR document and, when the engine produced one, the plain-text
/// transcript of the same pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkupPass {
    pub markup: String,
    pub transcript: Option<String>,
}

impl MarkupPass {
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
            transcript: None,
        }
    }

    pub fn with_transcript(mut self, transcript: impl Into<String>) -> Self {
        self.transcript = Some(transcript.into());
        self
    }
}

/// What a backend hands back for one image.
#[derive(Debug, Clone, PartialEq)]
pub enum Recognition {
    /// Raw markup, one entry per pass (several when pages were recognized one at a time).
    Markup(Vec<MarkupPass>),
    /// Regions already structured per page, in pixel units, bottom-up.
    Regions(PageIndex),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unsupported operation")]
    Unsupported,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("no recognition output found for {0}")]
    MissingOutput(PathBuf),
    #[error("engine error: {0}")]
    EngineError(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A text-recognition engine, viewed only through what it produces.
#[async_trait]
pub trait RecognitionBackend: Send + Sync {
    async fn recognize(&self, input: &OcrInput) -> Result<Recognition, EngineError>;
}

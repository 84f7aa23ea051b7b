use std::path::{Path, PathBuf};

/// Convenience result type used across image-merge.
pub type MergeResult<T> = Result<T, MergeError>;

/// Everything that can abort a merge. Each variant fails the whole run before
/// any output file is created.
#[derive(thiserror::Error, Debug)]
pub enum MergeError {
    /// Image count outside the supported range or not matching the template.
    #[error("invalid image count: got {count}, expected {expected}")]
    InvalidImageCount { count: usize, expected: String },

    /// A source file could not be opened or decoded.
    #[error("cannot load image '{}': {reason}", path.display())]
    ImageLoad { path: PathBuf, reason: String },

    /// An explicitly requested template name is unknown.
    #[error("template not found: '{0}' (known: 2-up, 3-up, 4-up, landscape-max-height)")]
    TemplateNotFound(String),

    /// JPEG encoding or writing the output file failed.
    #[error("encode error: {0}")]
    Encode(String),

    /// The requested image size does not fit on the page.
    #[error("image size error: {0}")]
    ImageSize(String),

    /// Batch input does not divide evenly into pages.
    #[error("{count} images is not a multiple of {per_page} images per page")]
    IncompletePage { count: usize, per_page: usize },

    /// Invalid configuration or paths.
    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MergeError {
    pub fn invalid_count(count: usize, expected: impl Into<String>) -> Self {
        Self::InvalidImageCount {
            count,
            expected: expected.into(),
        }
    }

    pub fn image_load(path: &Path, reason: impl ToString) -> Self {
        Self::ImageLoad {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    pub fn image_size(msg: impl Into<String>) -> Self {
        Self::ImageSize(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

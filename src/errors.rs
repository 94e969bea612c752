use std::path::PathBuf;
use thiserror::Error;

/// Whole-load failures. Row-level problems never surface here; they are
/// logged and counted in `ParseStats` instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("data source is empty (no header line)")]
    EmptyInput,

    #[error("failed to fetch data from {location}")]
    Fetch {
        location: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to write chart export {}", path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

impl PipelineError {
    pub fn fetch(location: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        PipelineError::Fetch {
            location: location.into(),
            source: source.into(),
        }
    }

    pub fn export(path: impl Into<PathBuf>, source: impl Into<anyhow::Error>) -> Self {
        PipelineError::Export {
            path: path.into(),
            source: source.into(),
        }
    }
}

/// Expected, non-fatal rejections from the trend selection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("selection already holds the maximum of {cap} entities")]
    Full { cap: usize },

    #[error("{0} is not part of the trend dataset")]
    UnknownEntity(String),
}

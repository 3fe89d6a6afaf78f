use std::path::PathBuf;
use thiserror::Error;

/// Input problems detected before any media is decoded.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("cannot read folder {path}: {source}")]
    FolderUnreadable {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error("{name} folder is empty: {path}")]
    EmptyFolder { name: &'static str, path: PathBuf },
    #[error("found {images} images but {audio} audio clips")]
    CountMismatch { images: usize, audio: usize },
    #[error("expected exactly one long video, found {found}")]
    LongVideoCount { found: usize },
    #[error("long video provides {available:.2}s but narration needs {required:.2}s")]
    LongVideoTooShort { available: f64, required: f64 },
    #[error("frame image not found: {0}")]
    FrameMissing(PathBuf),
    #[error("operator declined to continue")]
    Declined,
}

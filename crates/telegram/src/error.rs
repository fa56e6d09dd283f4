use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("telegram api: {0}")]
    Api(#[from] teloxide::RequestError),

    /// The pic to push is not on disk anymore.
    #[error("pic file not found: {path}")]
    MissingPic { path: PathBuf },
}

pub type Result<T> = std::result::Result<T, Error>;

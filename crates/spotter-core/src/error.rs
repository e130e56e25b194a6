use std::path::PathBuf;

/// Errors produced inside Spotter.
///
/// None of these are fatal: the capture and matching boundaries turn
/// them into "no frame" or `found = false` and the next tick retries.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("process '{0}' is not running")]
    ProcessNotFound(String),

    #[error("no main window found for process {0}")]
    WindowNotFound(u32),

    #[error("{call} failed: {message}")]
    Platform { call: &'static str, message: String },

    #[error("capture failed: {0}")]
    Capture(String),

    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("{}: {source}", path.display())]
    ImageFile {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("config: {0}")]
    Config(String),
}

impl Error {
    /// Wraps an OS call failure with the name of the call.
    pub fn platform(call: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Platform {
            call,
            message: err.to_string(),
        }
    }
}

/// Result type for window, capture and matching operations.
pub type WindowResult<T> = Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_error_names_the_call() {
        // Act
        let err = Error::platform("PrintWindow", "access denied");

        // Assert
        assert_eq!(err.to_string(), "PrintWindow failed: access denied");
    }
}

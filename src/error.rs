//! Error types for the pixelboost crate.

/// Errors that can occur while loading, upscaling or exporting an image.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The file's MIME type is not one of JPEG, PNG or WebP.
    #[error("unsupported image format: {0}")]
    InvalidFormat(String),

    /// The file exceeds the intake size ceiling.
    #[error("file too large ({size} bytes, maximum is {max} bytes)")]
    FileTooLarge {
        /// Size of the rejected file in bytes.
        size: u64,
        /// Configured ceiling in bytes.
        max: u64,
    },

    /// The file passed validation but its contents could not be decoded.
    #[error("failed to decode image: {0}")]
    Decode(image::ImageError),

    /// The upscaling engine failed or rejected the request.
    #[error("upscaling failed: {0}")]
    ProcessingFailed(String),

    /// The user dismissed the save dialog.
    #[error("save cancelled")]
    SaveCancelled,

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error occurred while encoding the result image.
    #[error("image processing error: {0}")]
    Image(#[from] image::ImageError),
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

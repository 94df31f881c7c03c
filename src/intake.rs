//! File intake: MIME and size validation, then decoding.
//!
//! Validation only looks at the declared MIME type and byte size, the same
//! facts a browser file object exposes. Format is checked before size, so a
//! huge unsupported file is reported as [`Error::InvalidFormat`].

use std::fmt;
use std::path::Path;

use image::ImageFormat;

use crate::error::{Error, Result};
use crate::session::LoadedImage;

/// MIME type assigned to files whose extension is not recognized.
pub const UNKNOWN_MIME: &str = "application/octet-stream";

/// Image formats accepted by intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MimeType {
    /// `image/jpeg`
    Jpeg,
    /// `image/png`
    Png,
    /// `image/webp`
    WebP,
}

impl MimeType {
    /// Parse a MIME string against the allow-list.
    #[must_use]
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" => Some(MimeType::Jpeg),
            "image/png" => Some(MimeType::Png),
            "image/webp" => Some(MimeType::WebP),
            _ => None,
        }
    }

    /// Guess from a file extension (case insensitive).
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(MimeType::Jpeg),
            "png" => Some(MimeType::Png),
            "webp" => Some(MimeType::WebP),
            _ => None,
        }
    }

    /// Canonical MIME string.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MimeType::Jpeg => "image/jpeg",
            MimeType::Png => "image/png",
            MimeType::WebP => "image/webp",
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            MimeType::Jpeg => ImageFormat::Jpeg,
            MimeType::Png => ImageFormat::Png,
            MimeType::WebP => ImageFormat::WebP,
        }
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file offered by the user, before any validation.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    /// Display name, usually the file name.
    pub name: String,
    /// Declared MIME type.
    pub mime: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl CandidateFile {
    /// Wrap in-memory bytes.
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// Read a file from disk, inferring its MIME type from the extension.
    ///
    /// The format and the on-disk size are checked against the allow-list and
    /// `max_size` before any byte is read, so an oversized file is rejected
    /// without being loaded.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`validate`], or [`Error::Io`] if the file cannot
    /// be inspected or read.
    pub fn from_path(path: &Path, max_size: u64) -> Result<Self> {
        let mime = mime_for_path(path);
        let declared = std::fs::metadata(path)?.len();
        validate(mime, declared, max_size)?;

        let bytes = std::fs::read(path)?;
        let name = path.file_name().map_or_else(
            || path.display().to_string(),
            |f| f.to_string_lossy().to_string(),
        );
        Ok(Self {
            name,
            mime: mime.to_string(),
            bytes,
        })
    }

    /// Size in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// MIME string for a path, [`UNKNOWN_MIME`] if the extension is not supported.
#[must_use]
pub fn mime_for_path(path: &Path) -> &'static str {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(MimeType::from_extension)
        .map_or(UNKNOWN_MIME, MimeType::as_str)
}

/// Check a declared MIME type and size against the allow-list and ceiling.
///
/// # Errors
///
/// Returns [`Error::InvalidFormat`] for MIME types outside JPEG/PNG/WebP and
/// [`Error::FileTooLarge`] when `size > max_size`.
pub fn validate(mime: &str, size: u64, max_size: u64) -> Result<MimeType> {
    let kind = MimeType::from_mime(mime).ok_or_else(|| Error::InvalidFormat(mime.to_string()))?;
    if size > max_size {
        return Err(Error::FileTooLarge {
            size,
            max: max_size,
        });
    }
    Ok(kind)
}

/// Validate and decode a candidate file.
///
/// # Errors
///
/// Returns the errors of [`validate`], or [`Error::Decode`] if the bytes are
/// not a valid image of the declared format.
pub fn load(file: &CandidateFile, max_size: u64) -> Result<LoadedImage> {
    let mime = validate(&file.mime, file.size(), max_size)?;
    let image = image::load_from_memory_with_format(&file.bytes, mime.image_format())
        .map_err(Error::Decode)?;
    tracing::debug!(
        name = %file.name,
        %mime,
        width = image.width(),
        height = image.height(),
        "decoded upload"
    );
    Ok(LoadedImage {
        image,
        mime,
        byte_size: file.size(),
    })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{DynamicImage, RgbImage};

    use super::*;

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::new(w, h))
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn mime_allow_list() {
        assert_eq!(MimeType::from_mime("image/jpeg"), Some(MimeType::Jpeg));
        assert_eq!(MimeType::from_mime("IMAGE/PNG"), Some(MimeType::Png));
        assert_eq!(MimeType::from_mime("image/webp"), Some(MimeType::WebP));
        assert_eq!(MimeType::from_mime("image/gif"), None);
        assert_eq!(MimeType::from_mime("image/bmp"), None);
        assert_eq!(MimeType::from_mime(""), None);
    }

    #[test]
    fn mime_for_path_uses_extension() {
        assert_eq!(mime_for_path(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(mime_for_path(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(mime_for_path(Path::new("a.webp")), "image/webp");
        assert_eq!(mime_for_path(Path::new("a.gif")), UNKNOWN_MIME);
        assert_eq!(mime_for_path(Path::new("noext")), UNKNOWN_MIME);
    }

    #[test]
    fn validate_checks_format_before_size() {
        let err = validate("image/gif", 100 * 1024 * 1024, 10).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(m) if m == "image/gif"));
    }

    #[test]
    fn validate_size_ceiling_is_inclusive() {
        let max = 10 * 1024 * 1024;
        assert_eq!(validate("image/png", max, max).unwrap(), MimeType::Png);
        let err = validate("image/png", max + 1, max).unwrap_err();
        assert!(matches!(err, Error::FileTooLarge { size, .. } if size == max + 1));
    }

    #[test]
    fn load_decodes_valid_png() {
        let file = CandidateFile::new("a.png", "image/png", png_bytes(7, 3));
        let loaded = load(&file, 1024 * 1024).unwrap();
        assert_eq!(loaded.dimensions(), (7, 3));
        assert_eq!(loaded.mime, MimeType::Png);
        assert_eq!(loaded.byte_size, file.size());
    }

    #[test]
    fn load_reports_corrupt_bytes_as_decode_error() {
        let file = CandidateFile::new("a.png", "image/png", vec![0u8; 32]);
        assert!(matches!(load(&file, 1024), Err(Error::Decode(_))));
    }

    #[test]
    fn from_path_rejects_oversized_file_before_reading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.png");
        std::fs::write(&path, vec![0u8; 64]).unwrap();

        let err = CandidateFile::from_path(&path, 16).unwrap_err();
        assert!(matches!(err, Error::FileTooLarge { size: 64, max: 16 }));
    }

    #[test]
    fn from_path_rejects_unknown_extension_before_reading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.gif");
        std::fs::write(&path, b"GIF89a").unwrap();

        let err = CandidateFile::from_path(&path, 1024).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(m) if m == UNKNOWN_MIME));
    }

    #[test]
    fn from_path_reads_file_within_ceiling() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.PNG");
        let bytes = png_bytes(3, 2);
        std::fs::write(&path, &bytes).unwrap();

        let file = CandidateFile::from_path(&path, bytes.len() as u64).unwrap();
        assert_eq!(file.name, "small.PNG");
        assert_eq!(file.mime, "image/png");
        assert_eq!(file.size(), bytes.len() as u64);
    }
}

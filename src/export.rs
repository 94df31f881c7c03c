//! Export of the upscaled result as PNG.
//!
//! The primary path is a user-directed save dialog, which may be absent. The
//! fallback is a direct download, which is always available. Cancelling the
//! dialog ends the export quietly; any other dialog failure falls back.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat};

use crate::error::{Error, Result};
use crate::session::Scale;

/// Export file name: `<product>-upscaled-<N>x.png`.
#[must_use]
pub fn file_name(product: &str, scale: Scale) -> String {
    format!("{product}-upscaled-{}x.png", scale.factor())
}

/// Encode an image as PNG bytes.
///
/// # Errors
///
/// Returns [`Error::Image`] if encoding fails.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}

/// A user-directed save location.
pub trait SaveDialog {
    /// Ask the user where to save `suggested_name`, then write `bytes` there.
    ///
    /// # Errors
    ///
    /// [`Error::SaveCancelled`] when the user dismissed the dialog; anything
    /// else when the location could not be written.
    fn save(&mut self, suggested_name: &str, bytes: &[u8]) -> Result<PathBuf>;
}

/// Direct download under a fixed file name.
pub trait Download {
    /// Deliver `bytes` as `file_name`.
    ///
    /// # Errors
    ///
    /// Any I/O failure while delivering the file.
    fn download(&mut self, file_name: &str, bytes: &[u8]) -> Result<PathBuf>;
}

/// How an export ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// Written through the save dialog.
    Saved(PathBuf),
    /// Written through the fallback download.
    Downloaded(PathBuf),
    /// The user cancelled the save dialog; nothing was written.
    Cancelled,
}

/// Save dialog that "picks" a path chosen up front, e.g. from a command line.
#[derive(Debug, Clone)]
pub struct PathSaveDialog {
    path: PathBuf,
}

impl PathSaveDialog {
    /// Dialog that always writes to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SaveDialog for PathSaveDialog {
    fn save(&mut self, _suggested_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        write_creating_parent(&self.path, bytes)?;
        Ok(self.path.clone())
    }
}

/// Download into a directory, like a browser's downloads folder.
#[derive(Debug, Clone)]
pub struct DirectoryDownload {
    dir: PathBuf,
}

impl DirectoryDownload {
    /// Downloads land in `dir`, created on demand.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl Download for DirectoryDownload {
    fn download(&mut self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.dir.join(file_name);
        write_creating_parent(&path, bytes)?;
        Ok(path)
    }
}

fn write_creating_parent(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Encode and deliver a result.
///
/// `dialog` is the capability-gated primary path; pass `None` when it is not
/// available.
///
/// # Errors
///
/// Returns the encoding error, or the fallback download's error when both
/// paths failed. A cancelled dialog is not an error.
pub fn export(
    image: &DynamicImage,
    file_name: &str,
    dialog: Option<&mut dyn SaveDialog>,
    fallback: &mut dyn Download,
) -> Result<ExportOutcome> {
    let bytes = encode_png(image)?;

    if let Some(dialog) = dialog {
        match dialog.save(file_name, &bytes) {
            Ok(path) => {
                tracing::info!(path = %path.display(), "image saved");
                return Ok(ExportOutcome::Saved(path));
            }
            Err(Error::SaveCancelled) => {
                tracing::debug!("save dialog cancelled");
                return Ok(ExportOutcome::Cancelled);
            }
            Err(e) => {
                tracing::warn!(error = %e, "save failed, falling back to download");
            }
        }
    }

    let path = fallback.download(file_name, &bytes)?;
    tracing::info!(path = %path.display(), "image downloaded");
    Ok(ExportOutcome::Downloaded(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CancellingDialog;

    impl SaveDialog for CancellingDialog {
        fn save(&mut self, _: &str, _: &[u8]) -> Result<PathBuf> {
            Err(Error::SaveCancelled)
        }
    }

    struct BrokenDialog;

    impl SaveDialog for BrokenDialog {
        fn save(&mut self, _: &str, _: &[u8]) -> Result<PathBuf> {
            Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        }
    }

    #[derive(Default)]
    struct MemoryDownload {
        files: Vec<(String, Vec<u8>)>,
    }

    impl Download for MemoryDownload {
        fn download(&mut self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
            self.files.push((file_name.to_string(), bytes.to_vec()));
            Ok(PathBuf::from(file_name))
        }
    }

    #[test]
    fn file_name_pattern() {
        assert_eq!(file_name("pixelboost", Scale::X2), "pixelboost-upscaled-2x.png");
        assert_eq!(file_name("pixelboost", Scale::X4), "pixelboost-upscaled-4x.png");
    }

    #[test]
    fn missing_dialog_uses_download() {
        let img = DynamicImage::new_rgba8(3, 3);
        let mut fallback = MemoryDownload::default();
        let outcome = export(&img, "a.png", None, &mut fallback).unwrap();
        assert_eq!(outcome, ExportOutcome::Downloaded(PathBuf::from("a.png")));
        assert_eq!(fallback.files.len(), 1);
        assert!(fallback.files[0].1.starts_with(b"\x89PNG"));
    }

    #[test]
    fn cancelled_dialog_is_silent_and_skips_fallback() {
        let img = DynamicImage::new_rgba8(3, 3);
        let mut dialog = CancellingDialog;
        let mut fallback = MemoryDownload::default();
        let outcome = export(&img, "a.png", Some(&mut dialog), &mut fallback).unwrap();
        assert_eq!(outcome, ExportOutcome::Cancelled);
        assert!(fallback.files.is_empty());
    }

    #[test]
    fn failed_dialog_falls_back_under_same_name() {
        let img = DynamicImage::new_rgba8(3, 3);
        let mut dialog = BrokenDialog;
        let mut fallback = MemoryDownload::default();
        let outcome = export(&img, "b.png", Some(&mut dialog), &mut fallback).unwrap();
        assert_eq!(outcome, ExportOutcome::Downloaded(PathBuf::from("b.png")));
        assert_eq!(fallback.files[0].0, "b.png");
    }

    #[test]
    fn path_dialog_and_directory_download_write_files() {
        let dir = tempfile::tempdir().unwrap();
        let img = DynamicImage::new_rgba8(2, 2);

        let target = dir.path().join("nested/out.png");
        let mut dialog = PathSaveDialog::new(&target);
        let mut fallback = DirectoryDownload::new(dir.path().join("downloads"));
        let outcome = export(&img, "x.png", Some(&mut dialog), &mut fallback).unwrap();
        assert_eq!(outcome, ExportOutcome::Saved(target.clone()));
        assert!(target.exists());

        let outcome = export(&img, "x.png", None, &mut fallback).unwrap();
        let expected = dir.path().join("downloads").join("x.png");
        assert_eq!(outcome, ExportOutcome::Downloaded(expected.clone()));
        let decoded = image::open(expected).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (2, 2));
    }
}

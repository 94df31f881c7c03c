//! Rendering surface abstraction.
//!
//! The application core never touches a concrete UI. Everything it shows goes
//! through [`View`], so the whole upload/upscale/compare flow runs against a
//! recording view in tests and a terminal view in the CLI.

use std::borrow::Cow;
use std::fmt;

/// User-facing notification, shown as a blocking alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// The chosen file is not JPEG, PNG or WebP.
    InvalidFormat,
    /// The chosen file exceeds the size ceiling.
    FileTooLarge {
        /// Ceiling in bytes, as configured.
        max_bytes: u64,
    },
    /// The chosen file could not be decoded.
    DecodeFailed,
    /// The upscale failed.
    ProcessingFailed,
    /// Neither the save dialog nor the download could write the result.
    SaveFailed,
}

impl Notice {
    /// Text shown to the user.
    #[must_use]
    pub fn message(self) -> Cow<'static, str> {
        match self {
            Notice::InvalidFormat => "Please select a JPG, PNG or WebP image.".into(),
            Notice::FileTooLarge { max_bytes } => format!(
                "The image is too large. The maximum size is {}.",
                byte_size_label(max_bytes)
            )
            .into(),
            Notice::DecodeFailed => "The image could not be read. Please try another file.".into(),
            Notice::ProcessingFailed => {
                "Failed to process the image. Please try again or use a smaller image.".into()
            }
            Notice::SaveFailed => "The image could not be saved. Please try again.".into(),
        }
    }
}

/// `10485760` -> `10MB`, `2048` -> `2KB`, anything else in bytes.
fn byte_size_label(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;
    match bytes {
        0 => "0 bytes".to_string(),
        b if b % MIB == 0 => format!("{}MB", b / MIB),
        b if b % KIB == 0 => format!("{}KB", b / KIB),
        b => format!("{b} bytes"),
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Visual state updates issued by the application.
///
/// Implementations only render; they hold no business logic. Exactly one of
/// the upload and processing panels is visible at a time. The comparison
/// panel is an overlay on the processing panel.
pub trait View {
    /// Show the upload panel, hiding processing and comparison.
    fn show_upload_panel(&mut self);

    /// Show the processing panel. Clears the result label, disables download
    /// and hides the comparison overlay.
    fn show_processing_panel(&mut self);

    /// Toggle the comparison overlay.
    fn show_comparison_panel(&mut self, visible: bool);

    /// Toggle the loading overlay and set its status text. While active the
    /// upscale trigger is disabled.
    fn set_loading(&mut self, active: bool, message: &str);

    /// Set the progress bar, `0..=100`.
    fn set_progress(&mut self, percent: u8);

    /// Dimension label of the original image, `None` to clear.
    fn set_original_size(&mut self, size: Option<(u32, u32)>);

    /// Dimension label of the upscaled image, `None` to clear.
    fn set_upscaled_size(&mut self, size: Option<(u32, u32)>);

    /// Enable or disable the download action.
    fn set_download_enabled(&mut self, enabled: bool);

    /// Move the comparison divider, `0.0..=100.0`.
    fn set_divider(&mut self, percent: f32);

    /// Show a blocking notification.
    fn notify(&mut self, notice: Notice);
}

/// Format a dimension label the way the panels display it.
#[must_use]
pub fn size_label(size: (u32, u32)) -> String {
    format!("{} × {}", size.0, size.1)
}

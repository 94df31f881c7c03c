//! Session state: the single owner of everything a user has loaded or produced.

use std::fmt;
use std::str::FromStr;

use image::DynamicImage;

use crate::intake::MimeType;

/// Magnification factor offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scale {
    /// Double width and height.
    #[default]
    X2,
    /// Quadruple width and height.
    X4,
}

impl Scale {
    /// Integer multiplier applied to each dimension.
    #[must_use]
    pub fn factor(self) -> u32 {
        match self {
            Scale::X2 => 2,
            Scale::X4 => 4,
        }
    }

    /// Map an integer factor back to a scale, if offered.
    #[must_use]
    pub fn from_factor(factor: u32) -> Option<Self> {
        match factor {
            2 => Some(Scale::X2),
            4 => Some(Scale::X4),
            _ => None,
        }
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.factor())
    }
}

impl FromStr for Scale {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let digits = s.trim().trim_end_matches(['x', 'X']);
        digits
            .parse::<u32>()
            .ok()
            .and_then(Scale::from_factor)
            .ok_or_else(|| format!("unsupported scale '{s}' (expected 2 or 4)"))
    }
}

/// A decoded image together with what intake learned about its source.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    /// Decoded pixels.
    pub image: DynamicImage,
    /// Format the bytes were decoded as.
    pub mime: MimeType,
    /// Size of the source file in bytes.
    pub byte_size: u64,
}

impl LoadedImage {
    /// Pixel dimensions as `(width, height)`.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }
}

/// Result of a successful upscale.
#[derive(Debug, Clone)]
pub struct UpscaledImage {
    /// Upscaled pixels.
    pub image: DynamicImage,
    /// Scale the result was produced at.
    pub scale: Scale,
}

impl UpscaledImage {
    /// Pixel dimensions as `(width, height)`.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.image.width(), self.image.height())
    }
}

/// Coarse lifecycle phase derived from [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Nothing loaded.
    Empty,
    /// An original is loaded, no result yet.
    Loaded,
    /// An upscale is in flight.
    Processing,
    /// A result exists for the current original.
    Upscaled,
}

/// Mutable state of one user session.
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Image accepted by intake.
    pub original: Option<LoadedImage>,
    /// Latest successful upscale of `original`.
    pub upscaled: Option<UpscaledImage>,
    /// Scale used by the next upscale and by export naming.
    pub scale: Scale,
    processing: bool,
    generation: u64,
}

impl Session {
    /// Empty session with the given starting scale.
    #[must_use]
    pub fn new(scale: Scale) -> Self {
        Self {
            scale,
            ..Self::default()
        }
    }

    /// Whether an upscale is in flight.
    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.processing
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        if self.processing {
            SessionPhase::Processing
        } else if self.upscaled.is_some() {
            SessionPhase::Upscaled
        } else if self.original.is_some() {
            SessionPhase::Loaded
        } else {
            SessionPhase::Empty
        }
    }

    /// Claim the single-flight slot. Returns `false` when an upscale is
    /// already running or there is nothing to upscale.
    pub(crate) fn try_begin_processing(&mut self) -> bool {
        if self.processing || self.original.is_none() {
            return false;
        }
        self.processing = true;
        true
    }

    pub(crate) fn end_processing(&mut self) {
        self.processing = false;
    }

    /// Bumped whenever the original is replaced or cleared, so a result
    /// computed for an older image can be recognized and dropped. A bump also
    /// releases the single-flight slot: the job holding it no longer belongs
    /// to this session.
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Replace the original; any previous result belongs to the old image.
    pub(crate) fn load(&mut self, image: LoadedImage) {
        self.original = Some(image);
        self.upscaled = None;
        self.processing = false;
        self.generation += 1;
    }

    /// Drop both images and release the single-flight slot. The selected
    /// scale is kept.
    pub(crate) fn clear(&mut self) {
        self.original = None;
        self.upscaled = None;
        self.processing = false;
        self.generation += 1;
    }
}

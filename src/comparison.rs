//! Before/after comparison: divider dragging and split-view compositing.
//!
//! The "before" image is visible left of the divider, the "after" image to
//! its right. Moving the divider right reveals more of "before".

use image::{imageops, DynamicImage, RgbaImage};

/// Divider position a fresh comparison starts at.
pub const DEFAULT_POSITION: f32 = 50.0;

/// Pointer device that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerSource {
    /// Mouse button and movement.
    Mouse,
    /// Touch contact; `client_x` is taken from the first touch point.
    Touch,
}

/// What the pointer did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    /// Mouse button down or touch start, on the widget.
    Press,
    /// Mouse or touch movement, anywhere in the document.
    Move,
    /// Mouse button up or touch end, anywhere in the document.
    Release,
}

/// A pointer event in client coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    /// What happened.
    pub kind: PointerKind,
    /// Device that produced the event.
    pub source: PointerSource,
    /// Horizontal client coordinate.
    pub client_x: f32,
}

impl PointerEvent {
    /// Press at `client_x`.
    #[must_use]
    pub fn press(source: PointerSource, client_x: f32) -> Self {
        Self {
            kind: PointerKind::Press,
            source,
            client_x,
        }
    }

    /// Move to `client_x`.
    #[must_use]
    pub fn moved(source: PointerSource, client_x: f32) -> Self {
        Self {
            kind: PointerKind::Move,
            source,
            client_x,
        }
    }

    /// Release at `client_x`.
    #[must_use]
    pub fn release(source: PointerSource, client_x: f32) -> Self {
        Self {
            kind: PointerKind::Release,
            source,
            client_x,
        }
    }
}

/// Horizontal extent of the comparison widget in client coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WidgetBounds {
    /// Left edge.
    pub left: f32,
    /// Width; non-positive widths pin the divider to 0.
    pub width: f32,
}

impl WidgetBounds {
    /// Divider position for a client x coordinate, clamped to `[0, 100]`.
    #[must_use]
    pub fn position_for(&self, client_x: f32) -> f32 {
        if self.width <= 0.0 || !self.width.is_finite() || client_x.is_nan() {
            return 0.0;
        }
        ((client_x - self.left) / self.width * 100.0).clamp(0.0, 100.0)
    }

    /// Whether `client_x` lies on the widget, edges included.
    #[must_use]
    pub fn contains(&self, client_x: f32) -> bool {
        self.width > 0.0 && (self.left..=self.left + self.width).contains(&client_x)
    }
}

/// Drag state of the divider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComparisonSlider {
    position: f32,
    dragging: bool,
}

impl Default for ComparisonSlider {
    fn default() -> Self {
        Self {
            position: DEFAULT_POSITION,
            dragging: false,
        }
    }
}

impl ComparisonSlider {
    /// Slider at the default position, not dragging.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current divider position, `0.0..=100.0`.
    #[must_use]
    pub fn position(&self) -> f32 {
        self.position
    }

    /// Whether a press is being held.
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Set the position directly, clamped. Does not affect dragging.
    pub fn set_position(&mut self, percent: f32) {
        self.position = if percent.is_nan() {
            0.0
        } else {
            percent.clamp(0.0, 100.0)
        };
    }

    /// Back to the default position, dropping any drag.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Feed one pointer event. Returns the new position when it changed
    /// the divider.
    ///
    /// A `Press` outside `bounds` is ignored. `Move` and `Release` may come
    /// from anywhere, so a release outside the widget still ends the drag.
    pub fn handle(&mut self, event: PointerEvent, bounds: WidgetBounds) -> Option<f32> {
        match event.kind {
            PointerKind::Press if !bounds.contains(event.client_x) => None,
            PointerKind::Press => {
                self.dragging = true;
                self.position = bounds.position_for(event.client_x);
                Some(self.position)
            }
            PointerKind::Move if self.dragging => {
                self.position = bounds.position_for(event.client_x);
                Some(self.position)
            }
            PointerKind::Move => None,
            PointerKind::Release => {
                self.dragging = false;
                None
            }
        }
    }
}

/// Right-hand inset of the "before" clip, in percent of the widget width.
#[must_use]
pub fn before_clip_inset(position: f32) -> f32 {
    100.0 - position.clamp(0.0, 100.0)
}

/// Render the split view at the "after" image's dimensions.
///
/// `before` is resized to match `after` so images of different pixel
/// dimensions line up. Columns left of the divider come from `before`.
#[must_use]
pub fn compose(before: &DynamicImage, after: &DynamicImage, position: f32) -> RgbaImage {
    let (w, h) = (after.width(), after.height());
    let before = if (before.width(), before.height()) == (w, h) {
        before.to_rgba8()
    } else {
        imageops::resize(&before.to_rgba8(), w, h, imageops::FilterType::Triangle)
    };
    let mut canvas = after.to_rgba8();

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let split = ((f64::from(w) * f64::from(position.clamp(0.0, 100.0)) / 100.0).round() as u32)
        .min(w);
    if split > 0 {
        let left = imageops::crop_imm(&before, 0, 0, split, h).to_image();
        imageops::replace(&mut canvas, &left, 0, 0);
    }
    canvas
}

//! Upscaling engine contract and a tiled resampling implementation.

use image::{imageops, DynamicImage, RgbaImage};

use crate::session::Scale;

/// Error reported by an engine. The message is for logs only; users see a
/// generic notice.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct EngineError(pub String);

/// Model configuration selected per scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Model {
    /// Slim ESRGAN-style model producing 2x output.
    Slim2x,
    /// Slim ESRGAN-style model producing 4x output.
    Slim4x,
}

impl Model {
    /// Model trained for the given scale.
    #[must_use]
    pub fn for_scale(scale: Scale) -> Self {
        match scale {
            Scale::X2 => Model::Slim2x,
            Scale::X4 => Model::Slim4x,
        }
    }

    /// Output magnification of this model.
    #[must_use]
    pub fn factor(self) -> u32 {
        match self {
            Model::Slim2x => 2,
            Model::Slim4x => 4,
        }
    }
}

/// Pixel layout of the engine's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputEncoding {
    /// 8-bit RGBA, alpha preserved.
    #[default]
    Rgba8,
    /// 8-bit RGB, alpha dropped.
    Rgb8,
}

/// Engine options for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpscaleOptions {
    /// Result pixel layout.
    pub output: OutputEncoding,
    /// Edge length of the square tiles the source is split into.
    pub patch_size: u32,
    /// Overlap added on each side of a tile before inference.
    pub padding: u32,
}

impl Default for UpscaleOptions {
    fn default() -> Self {
        Self {
            output: OutputEncoding::Rgba8,
            patch_size: 64,
            padding: 2,
        }
    }
}

/// Everything an engine needs for one upscale. Built per invocation.
#[derive(Debug, Clone)]
pub struct UpscaleRequest {
    /// Image to upscale.
    pub source: DynamicImage,
    /// Model to run.
    pub model: Model,
    /// Tiling and output options.
    pub options: UpscaleOptions,
}

/// An upscaling engine.
///
/// `progress` receives a non-decreasing fraction in `[0, 1]`. It is invoked
/// on the caller's thread.
pub trait Upscaler {
    /// Upscale `request.source` with `request.model`.
    ///
    /// # Errors
    ///
    /// Any failure of the engine, reported as an [`EngineError`].
    fn upscale(
        &self,
        request: &UpscaleRequest,
        progress: &mut dyn FnMut(f32),
    ) -> Result<DynamicImage, EngineError>;
}

impl<U: Upscaler + ?Sized> Upscaler for Box<U> {
    fn upscale(
        &self,
        request: &UpscaleRequest,
        progress: &mut dyn FnMut(f32),
    ) -> Result<DynamicImage, EngineError> {
        (**self).upscale(request, progress)
    }
}

/// Reference engine: tiled Lanczos3 resampling.
///
/// Splits the source into `patch_size` squares, grows each by `padding` on
/// every side (clipped to the image), resamples the padded tile and keeps
/// only the scaled core. Progress is reported once per row of tiles.
#[derive(Debug, Clone, Copy)]
pub struct ResampleUpscaler {
    filter: imageops::FilterType,
}

impl ResampleUpscaler {
    /// Engine using Lanczos3.
    #[must_use]
    pub fn new() -> Self {
        Self {
            filter: imageops::FilterType::Lanczos3,
        }
    }
}

impl Default for ResampleUpscaler {
    fn default() -> Self {
        Self::new()
    }
}

/// Core rectangle of a tile in source coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Tile {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

impl ResampleUpscaler {
    fn upscale_tile(
        &self,
        source: &RgbaImage,
        tile: Tile,
        padding: u32,
        factor: u32,
    ) -> RgbaImage {
        let px0 = tile.x.saturating_sub(padding);
        let py0 = tile.y.saturating_sub(padding);
        let px1 = (tile.x + tile.width).saturating_add(padding).min(source.width());
        let py1 = (tile.y + tile.height).saturating_add(padding).min(source.height());

        let padded = imageops::crop_imm(source, px0, py0, px1 - px0, py1 - py0).to_image();
        let scaled = imageops::resize(
            &padded,
            padded.width() * factor,
            padded.height() * factor,
            self.filter,
        );

        imageops::crop_imm(
            &scaled,
            (tile.x - px0) * factor,
            (tile.y - py0) * factor,
            tile.width * factor,
            tile.height * factor,
        )
        .to_image()
    }
}

impl Upscaler for ResampleUpscaler {
    fn upscale(
        &self,
        request: &UpscaleRequest,
        progress: &mut dyn FnMut(f32),
    ) -> Result<DynamicImage, EngineError> {
        let UpscaleOptions {
            output,
            patch_size,
            padding,
        } = request.options;
        if patch_size == 0 {
            return Err(EngineError("patch size must be positive".to_string()));
        }

        let source = request.source.to_rgba8();
        let (w, h) = source.dimensions();
        if w == 0 || h == 0 {
            return Err(EngineError(format!("cannot upscale empty image ({w}x{h})")));
        }

        let factor = request.model.factor();
        let out_w = w
            .checked_mul(factor)
            .ok_or_else(|| EngineError(format!("output width overflows ({w} * {factor})")))?;
        let out_h = h
            .checked_mul(factor)
            .ok_or_else(|| EngineError(format!("output height overflows ({h} * {factor})")))?;
        let mut result = RgbaImage::new(out_w, out_h);

        let rows: Vec<u32> = (0..h).step_by(patch_size as usize).collect();
        let total = rows.len();
        tracing::debug!(
            width = w,
            height = h,
            factor,
            patch_size,
            padding,
            rows = total,
            "starting tiled upscale"
        );

        progress(0.0);
        for (row_index, &y) in rows.iter().enumerate() {
            let tiles: Vec<Tile> = (0..w)
                .step_by(patch_size as usize)
                .map(|x| Tile {
                    x,
                    y,
                    width: patch_size.min(w - x),
                    height: patch_size.min(h - y),
                })
                .collect();

            #[cfg(feature = "cli")]
            let pieces: Vec<(Tile, RgbaImage)> = {
                use rayon::prelude::*;
                tiles
                    .par_iter()
                    .map(|&tile| (tile, self.upscale_tile(&source, tile, padding, factor)))
                    .collect()
            };

            #[cfg(not(feature = "cli"))]
            let pieces: Vec<(Tile, RgbaImage)> = tiles
                .iter()
                .map(|&tile| (tile, self.upscale_tile(&source, tile, padding, factor)))
                .collect();

            for (tile, piece) in &pieces {
                imageops::replace(
                    &mut result,
                    piece,
                    i64::from(tile.x * factor),
                    i64::from(tile.y * factor),
                );
            }

            #[allow(clippy::cast_precision_loss)]
            progress((row_index + 1) as f32 / total as f32);
        }

        let image = DynamicImage::ImageRgba8(result);
        Ok(match output {
            OutputEncoding::Rgba8 => image,
            OutputEncoding::Rgb8 => DynamicImage::ImageRgb8(image.to_rgb8()),
        })
    }
}

//! Upscale orchestration: phase sequencing, progress relay, single-flight.
//!
//! One upscale is split in three steps so the engine call can run away from
//! the session owner:
//!
//! 1. [`begin`] claims the single-flight slot and builds an [`UpscaleJob`].
//! 2. [`UpscaleJob::run`] calls the engine, relaying progress to a
//!    [`ProgressSink`].
//! 3. [`finish`] applies the outcome to the session and restores the view.
//!
//! The progress bar head (0-50%) covers preparation; the engine's own
//! fraction is mapped onto 50-95%.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::Sender;

use image::DynamicImage;

use crate::config::Config;
use crate::engine::{EngineError, Model, UpscaleOptions, UpscaleRequest, Upscaler};
use crate::error::{Error, Result};
use crate::session::{Scale, Session, UpscaledImage};
use crate::view::{Notice, View};

/// Progress bar value where engine progress starts.
pub const INFERENCE_START: u8 = 50;

/// Width of the progress range reserved for the engine.
pub const INFERENCE_SPAN: u8 = 45;

/// Fixed preparation steps before the engine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Slot claimed, nothing done yet.
    Preparing,
    /// Selecting the model for the chosen scale.
    LoadingModel,
    /// Building the request from the source image.
    Processing,
    /// Engine running.
    Enhancing,
}

impl Phase {
    /// Progress bar value shown when the phase starts.
    #[must_use]
    pub fn percent(self) -> u8 {
        match self {
            Phase::Preparing => 5,
            Phase::LoadingModel => 10,
            Phase::Processing => 30,
            Phase::Enhancing => INFERENCE_START,
        }
    }

    /// Loading overlay text.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Phase::Preparing => "Preparing...",
            Phase::LoadingModel => "Loading AI model...",
            Phase::Processing => "Processing image...",
            Phase::Enhancing => "Enhancing with AI...",
        }
    }
}

/// Map an engine fraction onto the progress bar, `50..=95`.
#[must_use]
pub fn inference_percent(fraction: f32) -> u8 {
    let f = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let offset = (f * f32::from(INFERENCE_SPAN)).round() as u8;
    INFERENCE_START + offset
}

/// Loading overlay text while the engine runs.
#[must_use]
pub fn inference_message(fraction: f32) -> String {
    let f = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let percent = (f * 100.0).round() as u8;
    format!("Enhancing... {percent}%")
}

/// One progress report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// Progress bar value, `0..=100`.
    pub percent: u8,
    /// Loading overlay text.
    pub message: String,
}

/// Receiver of progress reports while a job runs.
pub trait ProgressSink {
    /// Deliver one update.
    fn report(&mut self, update: ProgressUpdate);
}

impl<V: View + ?Sized> ProgressSink for V {
    fn report(&mut self, update: ProgressUpdate) {
        self.set_loading(true, &update.message);
        self.set_progress(update.percent);
    }
}

/// Forwards updates to another thread. A closed channel is ignored; the job
/// keeps running.
impl ProgressSink for Sender<ProgressUpdate> {
    fn report(&mut self, update: ProgressUpdate) {
        let _ = self.send(update);
    }
}

fn enter(view: &mut dyn View, phase: Phase) {
    tracing::debug!(?phase, "upscale phase");
    view.set_loading(true, phase.message());
    view.set_progress(phase.percent());
}

/// An upscale that holds the single-flight slot.
///
/// Produced only by [`begin`]; consumed by [`UpscaleJob::run`].
#[derive(Debug)]
#[must_use = "a job holds the single-flight slot until it is run and finished"]
pub struct UpscaleJob {
    request: UpscaleRequest,
    scale: Scale,
    generation: u64,
}

impl UpscaleJob {
    /// The request handed to the engine.
    pub fn request(&self) -> &UpscaleRequest {
        &self.request
    }

    /// Run the engine, relaying its progress.
    ///
    /// A panicking engine is reported as a failed upscale, so the job can
    /// still be finished and the slot released.
    pub fn run<U, P>(self, engine: &U, sink: &mut P) -> FinishedJob
    where
        U: Upscaler + ?Sized,
        P: ProgressSink + ?Sized,
    {
        let mut relay = |fraction: f32| {
            sink.report(ProgressUpdate {
                percent: inference_percent(fraction),
                message: inference_message(fraction),
            });
        };
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            engine.upscale(&self.request, &mut relay)
        }))
        .unwrap_or_else(|payload| Err(EngineError(panic_message(payload.as_ref()))));
        FinishedJob {
            outcome,
            scale: self.scale,
            generation: self.generation,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string payload");
    format!("engine panicked: {detail}")
}

/// A job whose engine call has returned.
#[derive(Debug)]
#[must_use = "a finished job must be passed to `finish` to release the single-flight slot"]
pub struct FinishedJob {
    outcome: std::result::Result<DynamicImage, EngineError>,
    scale: Scale,
    generation: u64,
}

impl FinishedJob {
    /// Whether the engine succeeded.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Claim the single-flight slot and prepare a job.
///
/// Returns `None`, touching nothing, when no image is loaded or an upscale
/// is already in flight.
pub fn begin(session: &mut Session, view: &mut dyn View, config: &Config) -> Option<UpscaleJob> {
    let source = match (&session.original, session.is_processing()) {
        (Some(original), false) => original.image.clone(),
        (original, processing) => {
            tracing::debug!(processing, loaded = original.is_some(), "upscale trigger ignored");
            return None;
        }
    };
    let claimed = session.try_begin_processing();
    debug_assert!(claimed);

    enter(view, Phase::Preparing);

    enter(view, Phase::LoadingModel);
    let model = Model::for_scale(session.scale);

    enter(view, Phase::Processing);
    let request = UpscaleRequest {
        source,
        model,
        options: UpscaleOptions {
            output: config.output,
            patch_size: config.patch_size,
            padding: config.padding,
        },
    };

    enter(view, Phase::Enhancing);
    Some(UpscaleJob {
        request,
        scale: session.scale,
        generation: session.generation(),
    })
}

/// Apply a finished job and release the single-flight slot.
///
/// On success stores the result and shows its size. On failure leaves any
/// previous result in place and shows [`Notice::ProcessingFailed`].
///
/// A job for an image that has since been replaced or reset is dropped
/// silently, success or failure. Its slot was already released by the
/// replacement, so neither the session flag nor the view is touched.
///
/// Returns `true` when a result was stored.
///
/// # Errors
///
/// Returns [`Error::ProcessingFailed`] when the engine failed.
pub fn finish(session: &mut Session, view: &mut dyn View, job: FinishedJob) -> Result<bool> {
    let FinishedJob {
        outcome,
        scale,
        generation,
    } = job;

    if generation != session.generation() {
        match outcome {
            Ok(image) => tracing::debug!(
                width = image.width(),
                height = image.height(),
                "discarding result for a replaced image"
            ),
            Err(e) => tracing::debug!(error = %e, "discarding failure for a replaced image"),
        }
        return Ok(false);
    }

    let result = match outcome {
        Ok(image) => {
            view.set_progress(100);
            let upscaled = UpscaledImage { image, scale };
            let size = upscaled.dimensions();
            tracing::info!(width = size.0, height = size.1, %scale, "upscale complete");
            session.upscaled = Some(upscaled);
            view.set_upscaled_size(Some(size));
            view.set_download_enabled(true);
            Ok(true)
        }
        Err(e) => {
            tracing::warn!(error = %e, "upscale failed");
            view.notify(Notice::ProcessingFailed);
            Err(Error::ProcessingFailed(e.0))
        }
    };

    view.set_loading(false, "");
    session.end_processing();
    view.set_progress(0);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inference_percent_maps_onto_reserved_tail() {
        assert_eq!(inference_percent(0.0), 50);
        assert_eq!(inference_percent(0.5), 73);
        assert_eq!(inference_percent(1.0), 95);
        assert_eq!(inference_percent(-3.0), 50);
        assert_eq!(inference_percent(7.0), 95);
        assert_eq!(inference_percent(f32::NAN), 50);
    }

    #[test]
    fn inference_message_shows_engine_fraction() {
        assert_eq!(inference_message(0.0), "Enhancing... 0%");
        assert_eq!(inference_message(0.426), "Enhancing... 43%");
        assert_eq!(inference_message(1.0), "Enhancing... 100%");
    }

    #[test]
    fn phases_are_ordered_within_the_head() {
        let phases = [
            Phase::Preparing,
            Phase::LoadingModel,
            Phase::Processing,
            Phase::Enhancing,
        ];
        assert!(phases.windows(2).all(|w| w[0].percent() < w[1].percent()));
        assert_eq!(Phase::Enhancing.percent(), INFERENCE_START);
    }

    #[test]
    fn channel_sink_survives_closed_receiver() {
        let (tx, rx) = std::sync::mpsc::channel();
        let mut tx: Sender<ProgressUpdate> = tx;
        drop(rx);
        tx.report(ProgressUpdate {
            percent: 60,
            message: "x".to_string(),
        });
    }

    #[test]
    fn panic_payloads_become_engine_messages() {
        let literal: Box<dyn Any + Send> = Box::new("tile buffer exhausted");
        assert_eq!(
            panic_message(literal.as_ref()),
            "engine panicked: tile buffer exhausted"
        );
        let owned: Box<dyn Any + Send> = Box::new(format!("row {}", 3));
        assert_eq!(panic_message(owned.as_ref()), "engine panicked: row 3");
        let other: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(
            panic_message(other.as_ref()),
            "engine panicked: non-string payload"
        );
    }
}

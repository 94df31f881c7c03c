//! The application: user actions over one session.

use std::path::Path;

use crate::comparison::{ComparisonSlider, PointerEvent, WidgetBounds};
use crate::config::Config;
use crate::engine::Upscaler;
use crate::error::{Error, Result};
use crate::export::{self, Download, ExportOutcome, SaveDialog};
use crate::intake::{self, CandidateFile};
use crate::orchestrator::{self, FinishedJob, UpscaleJob};
use crate::session::{Scale, Session, SessionPhase};
use crate::view::{Notice, View};

/// Owns the session, the view and the engine, and turns user actions into
/// state transitions.
///
/// ```text
/// Empty --load--> Loaded --upscale--> Upscaled --reset--> Empty
/// ```
///
/// Re-upload and re-upscale overwrite. Reset is available from any state.
pub struct App<V, U> {
    session: Session,
    view: V,
    engine: U,
    config: Config,
    slider: ComparisonSlider,
}

impl<V: View, U: Upscaler> App<V, U> {
    /// Start an empty session on the upload panel.
    pub fn new(mut view: V, engine: U, config: Config) -> Self {
        view.show_upload_panel();
        Self {
            session: Session::new(config.default_scale),
            view,
            engine,
            config,
            slider: ComparisonSlider::new(),
        }
    }

    /// Session state.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        self.session.phase()
    }

    /// The rendering surface.
    pub fn view(&self) -> &V {
        &self.view
    }

    /// The rendering surface, mutably.
    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    /// The upscaling engine.
    pub fn engine(&self) -> &U {
        &self.engine
    }

    /// Active settings.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Comparison divider state.
    pub fn slider(&self) -> &ComparisonSlider {
        &self.slider
    }

    /// Validate, decode and adopt a user file, then switch to the processing
    /// panel.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidFormat`], [`Error::FileTooLarge`] or [`Error::Decode`].
    /// The user is notified and the session is left unchanged.
    pub fn load_file(&mut self, file: &CandidateFile) -> Result<()> {
        let loaded = match intake::load(file, self.config.max_file_size) {
            Ok(loaded) => loaded,
            Err(e) => return Err(self.reject(&file.name, e)),
        };

        let size = loaded.dimensions();
        tracing::info!(name = %file.name, width = size.0, height = size.1, "image loaded");
        self.release_loading();
        self.session.load(loaded);
        self.view.set_original_size(Some(size));
        self.view.show_processing_panel();
        Ok(())
    }

    /// Read a file from disk and load it as with [`App::load_file`].
    ///
    /// The size ceiling is checked against the file's metadata before it is
    /// read.
    ///
    /// # Errors
    ///
    /// The errors of [`App::load_file`], or [`Error::Io`] when the file
    /// cannot be read. The user is notified and the session is left
    /// unchanged.
    pub fn load_path(&mut self, path: &Path) -> Result<()> {
        match CandidateFile::from_path(path, self.config.max_file_size) {
            Ok(file) => self.load_file(&file),
            Err(e) => Err(self.reject(&path.display().to_string(), e)),
        }
    }

    fn reject(&mut self, name: &str, error: Error) -> Error {
        tracing::warn!(name, error = %error, "upload rejected");
        self.view.notify(match &error {
            Error::InvalidFormat(_) => Notice::InvalidFormat,
            Error::FileTooLarge { max, .. } => Notice::FileTooLarge { max_bytes: *max },
            _ => Notice::DecodeFailed,
        });
        error
    }

    /// Choose the scale used by the next upscale.
    pub fn select_scale(&mut self, scale: Scale) {
        tracing::debug!(%scale, "scale selected");
        self.session.scale = scale;
    }

    /// Start an upscale whose engine call the caller runs, e.g. on a worker
    /// thread. Returns `None` when nothing is loaded or an upscale is already
    /// in flight.
    pub fn begin_upscale(&mut self) -> Option<UpscaleJob> {
        orchestrator::begin(&mut self.session, &mut self.view, &self.config)
    }

    /// Apply a job started with [`App::begin_upscale`].
    ///
    /// On success the comparison is shown with the divider reset.
    ///
    /// # Errors
    ///
    /// [`Error::ProcessingFailed`] when the engine failed; the previous
    /// result, if any, is kept.
    pub fn finish_upscale(&mut self, job: FinishedJob) -> Result<()> {
        if orchestrator::finish(&mut self.session, &mut self.view, job)? {
            self.show_comparison();
        }
        Ok(())
    }

    /// Upscale the loaded image with the selected scale, on this thread.
    ///
    /// A trigger while nothing is loaded or an upscale is in flight is a
    /// no-op returning `Ok(false)`.
    ///
    /// # Errors
    ///
    /// [`Error::ProcessingFailed`] when the engine failed.
    pub fn upscale(&mut self) -> Result<bool> {
        let Some(job) = self.begin_upscale() else {
            return Ok(false);
        };
        let finished = job.run(&self.engine, &mut self.view);
        self.finish_upscale(finished)?;
        Ok(true)
    }

    fn show_comparison(&mut self) {
        self.slider.reset();
        self.view.set_divider(self.slider.position());
        self.view.show_comparison_panel(true);
    }

    /// Feed a pointer event to the comparison divider.
    ///
    /// Ignored while no result exists.
    pub fn pointer(&mut self, event: PointerEvent, bounds: WidgetBounds) {
        if self.session.upscaled.is_none() {
            return;
        }
        if let Some(position) = self.slider.handle(event, bounds) {
            self.view.set_divider(position);
        }
    }

    /// File name the current result is exported under, if any.
    pub fn export_file_name(&self) -> Option<String> {
        self.session
            .upscaled
            .as_ref()
            .map(|u| export::file_name(&self.config.product_name, u.scale))
    }

    /// Save the current result. Returns `Ok(None)` when there is nothing to
    /// export.
    ///
    /// # Errors
    ///
    /// Encoding errors, or a failed fallback download. The user is notified
    /// and the result stays available.
    pub fn export(
        &mut self,
        dialog: Option<&mut dyn SaveDialog>,
        fallback: &mut dyn Download,
    ) -> Result<Option<ExportOutcome>> {
        let Some(upscaled) = self.session.upscaled.as_ref() else {
            return Ok(None);
        };
        let name = export::file_name(&self.config.product_name, upscaled.scale);
        match export::export(&upscaled.image, &name, dialog, fallback) {
            Ok(outcome) => Ok(Some(outcome)),
            Err(e) => {
                tracing::warn!(error = %e, "export failed");
                self.view.notify(Notice::SaveFailed);
                Err(e)
            }
        }
    }

    /// Drop both images and return to the upload panel.
    ///
    /// An upscale in flight is abandoned: the slot is released at once and
    /// its outcome is discarded when it arrives.
    pub fn reset(&mut self) {
        tracing::debug!(phase = ?self.session.phase(), "reset");
        self.release_loading();
        self.session.clear();
        self.slider.reset();
        self.view.show_comparison_panel(false);
        self.view.set_original_size(None);
        self.view.set_upscaled_size(None);
        self.view.set_download_enabled(false);
        self.view.show_upload_panel();
    }

    /// Hide the overlay of an upscale that is about to be abandoned.
    fn release_loading(&mut self) {
        if self.session.is_processing() {
            tracing::debug!("abandoning in-flight upscale");
            self.view.set_loading(false, "");
            self.view.set_progress(0);
        }
    }
}

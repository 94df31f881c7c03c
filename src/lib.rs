//! Upload an image, upscale it 2x or 4x, compare before/after, export as PNG.
//!
//! The crate is the headless core of an upscaling front-end. It owns the
//! session state and its transitions; the rendering surface, the upscaling
//! engine, the save dialog and the download target are all traits, so the
//! same flow drives a GUI, a terminal or a test harness.
//!
//! # Quick Start
//!
//! ```no_run
//! # struct MyView;
//! # impl pixelboost::View for MyView {
//! #     fn show_upload_panel(&mut self) {}
//! #     fn show_processing_panel(&mut self) {}
//! #     fn show_comparison_panel(&mut self, _: bool) {}
//! #     fn set_loading(&mut self, _: bool, _: &str) {}
//! #     fn set_progress(&mut self, _: u8) {}
//! #     fn set_original_size(&mut self, _: Option<(u32, u32)>) {}
//! #     fn set_upscaled_size(&mut self, _: Option<(u32, u32)>) {}
//! #     fn set_download_enabled(&mut self, _: bool) {}
//! #     fn set_divider(&mut self, _: f32) {}
//! #     fn notify(&mut self, _: pixelboost::Notice) {}
//! # }
//! use std::path::Path;
//!
//! use pixelboost::{App, Config, DirectoryDownload, ResampleUpscaler, Scale};
//!
//! let mut app = App::new(MyView, ResampleUpscaler::new(), Config::default());
//! app.load_path(Path::new("photo.png")).unwrap();
//! app.select_scale(Scale::X4);
//! app.upscale().unwrap();
//! app.export(None, &mut DirectoryDownload::new("downloads")).unwrap();
//! ```
//!
//! # Running the engine elsewhere
//!
//! [`App::begin_upscale`] claims the single-flight slot and returns a job
//! that can be moved to a worker thread. While it runs, further triggers are
//! ignored; [`App::finish_upscale`] applies the outcome.

#![deny(missing_docs)]

mod app;
pub mod comparison;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod intake;
pub mod orchestrator;
pub mod session;
pub mod view;

pub use app::App;
pub use comparison::{ComparisonSlider, PointerEvent, PointerKind, PointerSource, WidgetBounds};
pub use config::Config;
pub use engine::{Model, OutputEncoding, ResampleUpscaler, UpscaleOptions, UpscaleRequest, Upscaler};
pub use error::{Error, Result};
pub use export::{DirectoryDownload, Download, ExportOutcome, PathSaveDialog, SaveDialog};
pub use intake::{CandidateFile, MimeType};
pub use orchestrator::{FinishedJob, ProgressSink, ProgressUpdate, UpscaleJob};
pub use session::{Scale, Session, SessionPhase};
pub use view::{Notice, View};

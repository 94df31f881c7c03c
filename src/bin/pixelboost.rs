use std::path::Path;
use std::process;
use std::sync::mpsc;
use std::thread;

use clap::Parser;

use pixelboost::comparison::compose;
use pixelboost::view::size_label;
use pixelboost::{
    App, Config, DirectoryDownload, ExportOutcome, Notice, OutputEncoding, PathSaveDialog,
    PointerEvent, PointerSource, ProgressUpdate, ResampleUpscaler, SaveDialog, Scale, View,
    WidgetBounds,
};

#[derive(Parser)]
#[command(
    name = "pixelboost",
    about = "Upscale an image 2x or 4x and save the result as PNG",
    version,
    after_help = "Simple usage: pixelboost <image>  (2x, saved as ./pixelboost-upscaled-2x.png)"
)]
struct Cli {
    /// Input image (JPEG, PNG or WebP, at most 10MB)
    input: String,

    /// Magnification factor: 2 or 4
    #[arg(short, long, default_value = "2")]
    scale: Scale,

    /// Save the result to this path instead of downloading it
    #[arg(short, long)]
    output: Option<String>,

    /// Directory downloads are written to
    #[arg(long, default_value = ".")]
    download_dir: String,

    /// Also write a before/after split image to this path
    #[arg(long)]
    compare: Option<String>,

    /// Divider position for --compare, 0-100
    #[arg(long, default_value = "50")]
    divider: f32,

    /// Tile size handed to the engine
    #[arg(long, default_value = "64")]
    patch_size: u32,

    /// Tile overlap handed to the engine
    #[arg(long, default_value = "2")]
    padding: u32,

    /// Write an RGB result, dropping the alpha channel
    #[arg(long)]
    no_alpha: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

/// Renders view updates as status lines on stderr.
struct TerminalView {
    quiet: bool,
    last_message: String,
}

impl TerminalView {
    fn new(quiet: bool) -> Self {
        Self {
            quiet,
            last_message: String::new(),
        }
    }

    fn status(&self, line: &str) {
        if !self.quiet {
            eprintln!("{line}");
        }
    }
}

impl View for TerminalView {
    fn show_upload_panel(&mut self) {}

    fn show_processing_panel(&mut self) {}

    fn show_comparison_panel(&mut self, visible: bool) {
        if visible {
            self.status("[OK] Comparison ready");
        }
    }

    fn set_loading(&mut self, active: bool, message: &str) {
        if active && message != self.last_message {
            self.status(&format!("  .. {message}"));
            self.last_message = message.to_string();
        } else if !active {
            self.last_message.clear();
        }
    }

    fn set_progress(&mut self, _percent: u8) {}

    fn set_original_size(&mut self, size: Option<(u32, u32)>) {
        if let Some(size) = size {
            self.status(&format!("[OK] Loaded {}", size_label(size)));
        }
    }

    fn set_upscaled_size(&mut self, size: Option<(u32, u32)>) {
        if let Some(size) = size {
            self.status(&format!("[OK] Upscaled to {}", size_label(size)));
        }
    }

    fn set_download_enabled(&mut self, _enabled: bool) {}

    fn set_divider(&mut self, _percent: f32) {}

    fn notify(&mut self, notice: Notice) {
        eprintln!("[FAIL] {notice}");
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if !(0.0..=100.0).contains(&cli.divider) {
        eprintln!("Error: Divider must be between 0 and 100");
        process::exit(1);
    }
    if cli.patch_size == 0 {
        eprintln!("Error: Patch size must be positive");
        process::exit(1);
    }

    let input_path = Path::new(&cli.input);
    if !input_path.is_file() {
        eprintln!("Error: Input file does not exist: {}", cli.input);
        process::exit(1);
    }

    let config = Config {
        patch_size: cli.patch_size,
        padding: cli.padding,
        default_scale: cli.scale,
        output: if cli.no_alpha {
            OutputEncoding::Rgb8
        } else {
            OutputEncoding::Rgba8
        },
        ..Config::default()
    };
    let mut app = App::new(
        TerminalView::new(cli.quiet),
        ResampleUpscaler::new(),
        config,
    );

    // The view has already told the user what went wrong.
    if let Err(e) = app.load_path(input_path) {
        tracing::debug!(error = %e, "intake failed");
        process::exit(1);
    }

    if !cli.quiet {
        eprintln!("Upscaling {} at {}", input_path.display(), cli.scale);
    }
    if run_upscale(&mut app).is_err() {
        process::exit(1);
    }

    if let Some(compare_path) = &cli.compare {
        write_comparison(&mut app, Path::new(compare_path), cli.divider, cli.quiet);
    }

    let mut dialog = cli.output.as_ref().map(PathSaveDialog::new);
    let mut fallback = DirectoryDownload::new(&cli.download_dir);
    let outcome = app.export(
        dialog.as_mut().map(|d| d as &mut dyn SaveDialog),
        &mut fallback,
    );
    match outcome {
        Ok(Some(ExportOutcome::Saved(path) | ExportOutcome::Downloaded(path))) => {
            if !cli.quiet {
                eprintln!("[OK] Saved {}", path.display());
            }
        }
        Ok(Some(ExportOutcome::Cancelled) | None) => {}
        Err(_) => process::exit(1),
    }
}

/// Run the engine on a worker thread while this thread renders progress.
fn run_upscale(app: &mut App<TerminalView, ResampleUpscaler>) -> pixelboost::Result<()> {
    let Some(job) = app.begin_upscale() else {
        return Ok(());
    };
    let engine = *app.engine();
    let (tx, rx) = mpsc::channel::<ProgressUpdate>();

    let finished = thread::scope(|scope| {
        let worker = scope.spawn(move || {
            let mut tx = tx;
            job.run(&engine, &mut tx)
        });
        for update in rx {
            app.view_mut().set_loading(true, &update.message);
            app.view_mut().set_progress(update.percent);
        }
        worker.join()
    });

    match finished {
        Ok(finished) => app.finish_upscale(finished),
        Err(_) => {
            eprintln!("Fatal: upscale worker panicked");
            process::exit(1);
        }
    }
}

/// Drag the divider to `divider` and render the split view.
fn write_comparison(
    app: &mut App<TerminalView, ResampleUpscaler>,
    path: &Path,
    divider: f32,
    quiet: bool,
) {
    let bounds = WidgetBounds {
        left: 0.0,
        width: 100.0,
    };
    app.pointer(PointerEvent::press(PointerSource::Mouse, divider), bounds);
    app.pointer(PointerEvent::release(PointerSource::Mouse, divider), bounds);

    let session = app.session();
    let (Some(original), Some(upscaled)) = (&session.original, &session.upscaled) else {
        return;
    };
    let split = compose(&original.image, &upscaled.image, app.slider().position());
    match split.save(path) {
        Ok(()) => {
            if !quiet {
                eprintln!("[OK] Comparison written to {}", path.display());
            }
        }
        Err(e) => eprintln!("[FAIL] Comparison: {e}"),
    }
}

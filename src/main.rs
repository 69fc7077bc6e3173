//! Main application for the YST Downloader GUI

// Data models: formats, requests, outcomes, UI events
mod model;
// External engine configuration and invocation (yt-dlp)
mod engine;
// Per-request background worker
mod dispatcher;
// Progress parsing utilities
mod progress;
// Thumbnail fetching module
mod thumbnail;

use model::{DownloadOutcome, DownloadRequest, Format, UiEvent};

// eframe/egui for GUI application framework
use eframe::{App, Frame, egui};
// OnceCell for single-time runtime initialization
use once_cell::sync::OnceCell;
// FileDialog for folder selection dialogs
use rfd::FileDialog;
use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};
use tokio::{
    runtime::Runtime,
    sync::mpsc::{UnboundedReceiver, unbounded_channel},
};
use egui::{Color32, ColorImage, ProgressBar, RichText, TextureOptions, Visuals};
use tracing::warn;

// Global Tokio runtime stored in a OnceCell for lazy init
static RUNTIME: OnceCell<Arc<Runtime>> = OnceCell::new();

const APP_TITLE: &str = "YST Downloader";
/// Default output directory, created at startup if absent.
const DOWNLOADS_DIR: &str = "downloads";
/// How long a toast notification stays on screen.
const TOAST_LIFETIME: Duration = Duration::from_secs(4);

/// Program entry point: initializes logging and runtime, launches the GUI
fn main() -> Result<(), eframe::Error> {
    tracing_subscriber::fmt().with_target(false).init();

    // Create a new Tokio runtime and store it globally
    let rt = Arc::new(Runtime::new().unwrap());
    RUNTIME.set(rt).unwrap();

    // The downloads directory is the only filesystem resource; create it once
    if let Err(err) = ensure_downloads_dir(Path::new(DOWNLOADS_DIR)) {
        warn!(error = %err, "could not create the downloads directory");
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([500.0, 600.0]),
        ..Default::default()
    };
    eframe::run_native(
        APP_TITLE,
        options,
        Box::new(|cc| {
            // Use dark theme visuals
            cc.egui_ctx.set_visuals(Visuals::dark());
            Box::new(DownloaderApp::default())
        }),
    )
}

/// Creates the downloads directory if it does not exist yet.
fn ensure_downloads_dir(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)
}

/// Returns the URL to dispatch, or `None` when the trimmed input is empty.
fn trimmed_url(input: &str) -> Option<String> {
    let url = input.trim();
    if url.is_empty() { None } else { Some(url.to_string()) }
}

/// Visual severity of the status line.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Severity {
    Neutral,
    Busy,
    Success,
    Failure,
}

impl Severity {
    fn color(self) -> Color32 {
        match self {
            Severity::Neutral => Color32::GRAY,
            Severity::Busy => Color32::from_rgb(100, 149, 237),
            Severity::Success => Color32::from_rgb(80, 200, 120),
            Severity::Failure => Color32::from_rgb(220, 80, 80),
        }
    }
}

/// Transient notification shown at the bottom of the window.
struct Toast {
    message: String,
    expires: Instant,
}

/// Application state for the GUI
struct DownloaderApp {
    /// Input field for the video URL
    url_input: String,
    /// Destination folder for downloads
    download_folder: String,
    /// Current status line text
    status_text: String,
    /// Current status line severity
    status_severity: Severity,
    /// File-info line under the status
    file_info: String,
    /// Progress fraction while a download runs; `None` hides the bar
    progress: Option<f32>,
    /// Whether a request currently occupies the single download slot
    in_flight: bool,
    /// Live event channel from the current worker
    events: Option<UnboundedReceiver<UiEvent>>,
    /// Active toast, if any
    toast: Option<Toast>,
    /// Thumbnail texture for the current video
    thumbnail_tex: Option<egui::TextureHandle>,
    /// Incoming thumbnail fetch result
    thumbnail_result: Arc<Mutex<Option<ColorImage>>>,
}

/// Default initial state for the app
impl Default for DownloaderApp {
    fn default() -> Self {
        Self {
            url_input: String::new(),
            download_folder: DOWNLOADS_DIR.to_string(),
            status_text: "Ready to download".to_string(),
            status_severity: Severity::Neutral,
            file_info: String::new(),
            progress: None,
            in_flight: false,
            events: None,
            toast: None,
            thumbnail_tex: None,
            thumbnail_result: Arc::new(Mutex::new(None)),
        }
    }
}

impl DownloaderApp {
    fn show_toast(&mut self, message: impl Into<String>) {
        self.toast = Some(Toast {
            message: message.into(),
            expires: Instant::now() + TOAST_LIFETIME,
        });
    }

    /// Validation then dispatch; invoked once per button press.
    fn on_format_selected(&mut self, format: Format) {
        // Input error: surface a toast only, touch nothing else
        let Some(url) = trimmed_url(&self.url_input) else {
            self.show_toast("Please enter a URL");
            return;
        };

        // UI-visible side effects happen before the worker is spawned
        self.status_text = format!("Downloading {}...", format.label());
        self.status_severity = Severity::Busy;
        self.progress = Some(0.0);
        self.file_info.clear();
        self.thumbnail_tex = None;
        self.in_flight = true;

        // Fresh channel per request; the previous one is dropped with it
        let (tx, rx) = unbounded_channel();
        self.events = Some(rx);

        let request = DownloadRequest { url, format };
        let folder = self.download_folder.trim();
        let downloads_dir = if folder.is_empty() {
            PathBuf::from(DOWNLOADS_DIR)
        } else {
            PathBuf::from(folder)
        };
        RUNTIME
            .get()
            .unwrap()
            .spawn(dispatcher::run_request(request, downloads_dir, tx));
    }

    /// Applies the terminal outcome of the current request.
    fn finish(&mut self, outcome: DownloadOutcome) {
        if outcome.is_success() {
            self.status_text = "Download complete".to_string();
            self.status_severity = Severity::Success;
            let title = outcome.title.as_deref().unwrap_or("video");
            self.file_info = format!("Saved: {}", title);
            self.show_toast("Download completed!");
        } else {
            self.status_text = "Download failed".to_string();
            self.status_severity = Severity::Failure;
            self.file_info = format!("Error: {}", outcome.message);
            self.show_toast(format!("Error: {}", outcome.message));
        }

        // Hiding the bar is the final step, success or failure alike
        self.progress = None;
        self.in_flight = false;
        self.events = None;
    }

    /// Fetches the thumbnail off the UI thread and requests a repaint when done.
    fn spawn_thumbnail_fetch(&self, ctx: &egui::Context, url: String) {
        let result = Arc::clone(&self.thumbnail_result);
        let ctx = ctx.clone();
        RUNTIME.get().unwrap().spawn_blocking(move || {
            if let Some(img) = thumbnail::fetch_thumbnail(&url) {
                *result.lock().unwrap() = Some(img);
                ctx.request_repaint();
            }
        });
    }
}

/// GUI update loop: called each frame to redraw and handle interactions
impl App for DownloaderApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        // 1. Drain worker events and apply them serially
        let mut pending = Vec::new();
        if let Some(rx) = self.events.as_mut() {
            while let Ok(event) = rx.try_recv() {
                pending.push(event);
            }
        }
        for event in pending {
            match event {
                UiEvent::Metadata(meta) => {
                    self.file_info = format!("Downloading: {}", meta.title);
                    if let Some(url) = meta.thumbnail {
                        self.spawn_thumbnail_fetch(ctx, url);
                    }
                }
                UiEvent::Progress(fraction) => {
                    // Only move forward; yt-dlp restarts percentages between fragments
                    if let Some(current) = self.progress {
                        if fraction > current {
                            self.progress = Some(fraction);
                        }
                    }
                }
                UiEvent::Finished(outcome) => self.finish(outcome),
            }
        }

        // 2. Handle a completed thumbnail fetch
        if let Some(img) = self.thumbnail_result.lock().unwrap().take() {
            self.thumbnail_tex = Some(ctx.load_texture("thumbnail", img, TextureOptions::default()));
        }

        // 3. Toast: expire, then render (panels go in before the central one)
        if self.toast.as_ref().is_some_and(|t| Instant::now() >= t.expires) {
            self.toast = None;
        }
        if let Some(toast) = &self.toast {
            egui::TopBottomPanel::bottom("toast").show(ctx, |ui| {
                ui.label(RichText::new(&toast.message).color(Color32::WHITE));
            });
        }

        // 4. Main panel: URL input, folder row, format buttons, status regions
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading(APP_TITLE);
            ui.separator();

            ui.label("Paste a video URL:");
            ui.text_edit_singleline(&mut self.url_input);

            // Folder selection
            ui.horizontal(|ui| {
                ui.label("Download folder:");
                ui.text_edit_singleline(&mut self.download_folder);
                if ui.button("Browse…").clicked() {
                    if let Some(folder) = FileDialog::new()
                        .set_directory(&self.download_folder)
                        .pick_folder()
                    {
                        self.download_folder = folder.display().to_string();
                    }
                }
            });

            ui.add_space(8.0);

            // One button per target; disabled while the single slot is taken
            let mut clicked = None;
            ui.horizontal_wrapped(|ui| {
                for format in Format::ALL {
                    if ui
                        .add_enabled(!self.in_flight, egui::Button::new(format.label()))
                        .clicked()
                    {
                        clicked = Some(format);
                    }
                }
            });
            if let Some(format) = clicked {
                self.on_format_selected(format);
            }

            ui.add_space(8.0);

            if let Some(fraction) = self.progress {
                ui.add(ProgressBar::new(fraction).show_percentage());
            }

            ui.label(
                RichText::new(&self.status_text)
                    .size(16.0)
                    .color(self.status_severity.color()),
            );
            ui.label(RichText::new(&self.file_info).size(12.0).color(Color32::GRAY));

            if let Some(tex) = &self.thumbnail_tex {
                ui.add_space(8.0);
                ui.add(egui::Image::new(tex).max_width(320.0));
            }

            ui.add_space(16.0);
            ui.label(
                RichText::new(concat!("YST Downloader v", env!("CARGO_PKG_VERSION")))
                    .size(12.0)
                    .color(Color32::DARK_GRAY),
            );
        });

        // Request periodic repaint so progress keeps flowing
        ctx.request_repaint_after(Duration::from_millis(100));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn whitespace_only_input_is_rejected() {
        assert_eq!(trimmed_url(""), None);
        assert_eq!(trimmed_url("   \t "), None);
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        assert_eq!(
            trimmed_url("  https://example.com/watch?v=abc  "),
            Some("https://example.com/watch?v=abc".to_string())
        );
    }

    #[test]
    fn downloads_dir_creation_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("downloads");
        ensure_downloads_dir(&dir).unwrap();
        ensure_downloads_dir(&dir).unwrap();
        assert!(dir.is_dir());
    }
}

//! Facet headless driver
//!
//! Loads a model, applies placement edits, runs one conversion through the
//! pipeline while a frame loop renders through a recording backend, prints
//! the report and writes the output file.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use facet::cli::CliArgs;
use facet::{AppConfig, AppContext, Collaborators, Job};
use facet_ipc::{ConversionReport, CoreToUi, PipelineStatus, UiToCore, format_bytes};
use facet_scene::RecordingBackend;
use tokio::sync::mpsc;

/// Frame pacing for the render loop while a job is in flight
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "facet=info".into()),
        )
        .init();

    let args = CliArgs::from_env();

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let local = tokio::task::LocalSet::new();
    match local.block_on(&runtime, run(args)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            tracing::error!("{message}");
            ExitCode::FAILURE
        }
    }
}

struct Driver {
    context: AppContext,
    from_core: mpsc::UnboundedReceiver<CoreToUi>,
    backend: RecordingBackend,
    frames: usize,
}

impl Driver {
    fn new() -> Self {
        let (to_ui, from_core) = mpsc::unbounded_channel();
        Self {
            context: AppContext::new(AppConfig::from_env(), to_ui),
            from_core,
            backend: RecordingBackend::new(),
            frames: 0,
        }
    }

    fn render(&mut self) {
        self.backend.clear();
        self.context.render(&mut self.backend);
        self.frames += 1;
    }

    /// Run a job on the local set while the frame loop keeps rendering.
    async fn drive(&mut self, job: Job) -> Result<(), String> {
        let mut handle =
            tokio::task::spawn_local(async move { job.run(&Collaborators::builtin()).await });
        let mut ticker = tokio::time::interval(FRAME_INTERVAL);
        loop {
            tokio::select! {
                outcome = &mut handle => {
                    let outcome = outcome.map_err(|e| format!("job panicked: {e}"))?;
                    self.context.complete(outcome);
                    self.render();
                    return Ok(());
                }
                _ = ticker.tick() => self.render(),
            }
        }
    }

    /// Send a message; run the job it starts, if any.
    async fn send(&mut self, message: UiToCore) -> Result<(), String> {
        match self.context.handle(message) {
            Some(job) => self.drive(job).await,
            None => Ok(()),
        }
    }

    /// Drain notifications, failing on the first error.
    fn notifications(&mut self) -> Result<Vec<CoreToUi>, String> {
        let mut messages = Vec::new();
        while let Ok(message) = self.from_core.try_recv() {
            match message.to_json() {
                Ok(json) => tracing::debug!("core -> ui {json}"),
                Err(e) => tracing::warn!("{e}"),
            }
            if let CoreToUi::Error { kind, message } = &message {
                return Err(format!("{kind:?} error: {message}"));
            }
            messages.push(message);
        }
        Ok(messages)
    }
}

fn print_report(report: &ConversionReport) {
    println!("output:   {}", report.filename);
    println!(
        "original: {} ({} vertices, {} faces)",
        format_bytes(report.original_bytes),
        report.original.vertices,
        report.original.faces
    );
    println!(
        "result:   {} ({} vertices, {} faces)",
        format_bytes(report.final_bytes),
        report.result.vertices,
        report.result.faces
    );
    if let Some(badge) = report.badge() {
        println!("size:     {badge}");
    }
}

async fn run(args: CliArgs) -> Result<(), String> {
    let bytes = std::fs::read(&args.input)
        .map_err(|e| format!("Failed to read {}: {e}", args.input.display()))?;
    let file_name = args
        .input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model".to_string());

    let mut driver = Driver::new();

    if let Some(target) = args.target {
        driver.send(UiToCore::SelectTarget { format: target }).await?;
        driver.notifications()?;
    }

    driver.send(UiToCore::LoadFile { file_name, bytes }).await?;
    driver.notifications()?;
    if driver.context.pipeline().status() != PipelineStatus::Loaded {
        return Err("Model did not load".to_string());
    }

    for edit in args.edits {
        tracing::debug!("Applying {:?}", edit);
        driver.send(UiToCore::ModelCommand(edit)).await?;
    }

    driver.send(UiToCore::Convert(args.options)).await?;
    let report = driver
        .notifications()?
        .into_iter()
        .find_map(|message| match message {
            CoreToUi::ConversionComplete(report) => Some(report),
            _ => None,
        })
        .ok_or_else(|| "Conversion produced no report".to_string())?;
    print_report(&report);

    driver.send(UiToCore::Download).await?;
    for download in driver.context.take_downloads() {
        let path = args
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(&download.filename));
        std::fs::write(&path, &download.bytes)
            .map_err(|e| format!("Failed to write {}: {e}", path.display()))?;
        tracing::info!(
            "Wrote {} ({}, {})",
            path.display(),
            format_bytes(download.bytes.len() as u64),
            download.mime_type
        );
    }

    tracing::debug!(
        "Rendered {} frames, last frame had {} draws",
        driver.frames,
        driver.backend.draws.len()
    );
    Ok(())
}

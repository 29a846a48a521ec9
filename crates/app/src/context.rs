//! Application context: the one owner of stage, camera, sculpt engine and
//! pipeline.
//!
//! UI messages come in through [`AppContext::handle`], which may hand back a
//! [`Job`] to run at a suspend point. Finished jobs come back through
//! [`AppContext::complete`]. Notifications for the UI go out on an unbounded
//! channel.

use facet_ipc::{
    CameraCommand, ConversionOptions, CoreToUi, ModelCommand, PipelineStatus, PointerEvent,
    SculptCommand, UiToCore,
};
use facet_scene::{ModelFormat, OrbitCamera, RenderBackend, Stage, Surface, render_frame};
use sculpting::SculptEngine;
use tokio::sync::mpsc;

use crate::config::AppConfig;
use crate::input::InputRouter;
use crate::pipeline::{Download, Job, JobOutcome, Pipeline, PipelineError};

pub struct AppContext {
    config: AppConfig,
    stage: Stage,
    camera: OrbitCamera,
    sculpt: SculptEngine,
    pipeline: Pipeline,
    input: InputRouter,
    surface: Surface,
    to_ui: mpsc::UnboundedSender<CoreToUi>,
    downloads: Vec<Download>,
}

impl AppContext {
    pub fn new(config: AppConfig, to_ui: mpsc::UnboundedSender<CoreToUi>) -> Self {
        let surface = Surface {
            width: config.display.scaled_width(),
            height: config.display.scaled_height(),
        };
        let mut camera = OrbitCamera::new(&config.camera);
        camera.resize(surface.width, surface.height);
        Self {
            stage: Stage::new(),
            camera,
            sculpt: SculptEngine::new(&config.brush),
            pipeline: Pipeline::new(config.target_format()),
            input: InputRouter::default(),
            surface,
            to_ui,
            downloads: Vec::new(),
            config,
        }
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn sculpt(&self) -> &SculptEngine {
        &self.sculpt
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn surface(&self) -> Surface {
        self.surface
    }

    fn emit(&self, message: CoreToUi) {
        if self.to_ui.send(message).is_err() {
            tracing::trace!("UI channel closed, dropping notification");
        }
    }

    fn emit_status(&self) {
        self.emit(CoreToUi::StatusChanged(self.pipeline.status()));
    }

    fn emit_error(&self, error: &PipelineError) {
        self.emit(CoreToUi::Error {
            kind: error.kind(),
            message: error.to_string(),
        });
    }

    fn emit_cursor(&self) {
        self.emit(CoreToUi::BrushCursor(self.sculpt.cursor().info()));
    }

    /// Apply one UI message. Returns work to run when the message started a
    /// load or a conversion.
    pub fn handle(&mut self, message: UiToCore) -> Option<Job> {
        match message {
            UiToCore::LoadFile { file_name, bytes } => {
                match self.pipeline.begin_load(&file_name, bytes) {
                    Ok(job) => {
                        self.emit_status();
                        return Some(Job::Load(job));
                    }
                    Err(error) => {
                        tracing::warn!("Rejected {}: {}", file_name, error);
                        self.emit_error(&error);
                    }
                }
            }
            UiToCore::Pointer(event) => self.handle_pointer(event),
            UiToCore::SetSliderFraction(fraction) => {
                self.stage.comparison.set_slider_fraction(fraction);
            }
            UiToCore::ModelCommand(command) => self.apply_model_command(&command),
            UiToCore::SculptCommand(command) => self.apply_sculpt_command(&command),
            UiToCore::CameraCommand(command) => match command {
                CameraCommand::Orbit { delta_x, delta_y } => {
                    if !self.sculpt.is_stroking() {
                        self.camera.orbit(delta_x, delta_y);
                    }
                }
                CameraCommand::Zoom { delta } => self.camera.zoom(delta),
                CameraCommand::Reset => self.camera.reset(),
            },
            UiToCore::SelectTarget { format } => match self.pipeline.set_target(&format) {
                Ok(true) => self.emit(CoreToUi::ReportHidden),
                Ok(false) => {}
                Err(error) => self.emit_error(&error),
            },
            UiToCore::Convert(options) => return self.start_conversion(&options),
            UiToCore::Download => match self.pipeline.download() {
                Some(download) => self.downloads.push(download),
                None => tracing::debug!("Nothing to download yet"),
            },
            UiToCore::Reset => self.reset(),
            UiToCore::Resize { width, height } => {
                self.surface = Surface { width, height };
                if !self.camera.resize(width, height) {
                    tracing::debug!("Ignoring camera update for empty surface {}x{}", width, height);
                }
            }
        }
        None
    }

    fn start_conversion(&mut self, options: &ConversionOptions) -> Option<Job> {
        let job = self.pipeline.begin_conversion(
            &self.stage,
            options,
            self.config.conversion.quantization_bits,
        )?;
        self.emit_status();
        Some(Job::Conversion(job))
    }

    fn apply_model_command(&mut self, command: &ModelCommand) {
        match command {
            ModelCommand::Rotate(axis) => self.stage.rotate(*axis),
            ModelCommand::Mirror(axis) => self.stage.mirror(*axis),
            ModelCommand::Center => self.stage.center(),
            ModelCommand::Ground => self.stage.ground(),
            ModelCommand::Scale(factor) => self.stage.apply_scale(*factor),
            ModelCommand::SetWireframe(wireframe) => self.stage.set_wireframe(*wireframe),
            ModelCommand::SetBaseColor(hex) => self.stage.set_base_color(hex),
        }
    }

    fn apply_sculpt_command(&mut self, command: &SculptCommand) {
        self.sculpt.apply_command(&mut self.stage, command);
        if matches!(
            command,
            SculptCommand::SetEnabled(_) | SculptCommand::SetBrushRadius(_)
        ) {
            self.emit_cursor();
        }
    }

    fn handle_pointer(&mut self, event: PointerEvent) {
        let outcome = self.input.handle(
            event,
            &mut self.stage,
            &mut self.camera,
            &mut self.sculpt,
            self.surface,
        );
        if outcome.cursor_changed {
            self.emit_cursor();
        }
    }

    /// Hand a finished job back to the pipeline.
    pub fn complete(&mut self, outcome: JobOutcome) {
        match outcome {
            JobOutcome::Load(outcome) => {
                match self.pipeline.complete_load(&mut self.stage, outcome) {
                    None => {}
                    Some(Ok(stats)) => {
                        self.camera.reset();
                        self.sculpt.reset();
                        self.input.reset();
                        if let Some(model) = self.pipeline.model() {
                            self.emit(CoreToUi::ModelLoaded {
                                file_name: model.file_name.clone(),
                                input_format: model.format.to_string(),
                                stats,
                                targets: ModelFormat::TARGETS
                                    .iter()
                                    .map(|format| format.to_string())
                                    .collect(),
                                target: self.pipeline.target().to_string(),
                            });
                        }
                        self.emit_status();
                    }
                    Some(Err(error)) => {
                        self.emit_error(&error);
                        self.emit_status();
                    }
                }
            }
            JobOutcome::Conversion(outcome) => {
                match self.pipeline.complete_conversion(&mut self.stage, outcome) {
                    None => {}
                    Some(Ok(report)) => {
                        self.emit(CoreToUi::ConversionComplete(report));
                        self.emit_status();
                    }
                    Some(Err(error)) => {
                        self.emit_error(&error);
                        self.emit_status();
                    }
                }
            }
        }
    }

    fn reset(&mut self) {
        self.pipeline.reset(&mut self.stage);
        self.sculpt.reset();
        self.input.reset();
        self.camera.reset();
        self.emit(CoreToUi::StatusChanged(PipelineStatus::NoModel));
    }

    /// Render one frame through `backend`. Returns the number of passes.
    pub fn render(&mut self, backend: &mut impl RenderBackend) -> usize {
        render_frame(&mut self.stage, &mut self.camera, self.surface, backend)
    }

    /// Downloads requested since the last call.
    pub fn take_downloads(&mut self) -> Vec<Download> {
        std::mem::take(&mut self.downloads)
    }
}

//! Load and conversion orchestration.
//!
//! The pipeline is a state machine over [`PipelineStatus`]:
//!
//! ```text
//! NoModel -> Loading -> Loaded -> Converting -> Previewed
//!                          ^           |
//!                          +-(failure)-+
//! ```
//!
//! Work that calls into codecs or the optimizer is split around a suspend
//! point. `begin_*` moves the state forward and returns a job that owns
//! everything it needs; the job runs without touching the pipeline; its
//! outcome is handed back to `complete_*`. Every job carries the generation
//! it was started in, and a reset or a newer job bumps the generation, so
//! late completions are recognized and dropped.

use facet_formats::{BuiltinFormats, BuiltinOptimizer};
use facet_ipc::{ConversionOptions, ConversionReport, ErrorKind, PipelineStatus, SceneStats, reduction_percent};
use facet_scene::{
    DegenerateGeometryError, ExportError, ExportOptions, ExportSnapshot, Exporter, FormatError,
    Importer, ModelFormat, Normalization, OptimizationError, OptimizeOptions, Optimizer, Scene,
    Stage, normalize, output_file_name, up_axis_correction,
};
use glam::Affine3A;

/// Any failure that aborts a load or a conversion.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Optimization(#[from] OptimizationError),

    #[error(transparent)]
    DegenerateGeometry(#[from] DegenerateGeometryError),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Format(_) => ErrorKind::Format,
            PipelineError::Export(_) => ErrorKind::Export,
            PipelineError::Optimization(_) => ErrorKind::Optimization,
            PipelineError::DegenerateGeometry(_) => ErrorKind::DegenerateGeometry,
        }
    }
}

/// The external codecs and optimizer used by jobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct Collaborators<I, E, O> {
    pub importer: I,
    pub exporter: E,
    pub optimizer: O,
}

impl Collaborators<BuiltinFormats, BuiltinFormats, BuiltinOptimizer> {
    pub fn builtin() -> Self {
        Self::default()
    }
}

/// The model currently in the original slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedModel {
    pub file_name: String,
    pub format: ModelFormat,
    pub original_bytes: u64,
}

/// Output of the last successful conversion, kept for the download sink.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionOutput {
    pub bytes: Vec<u8>,
    pub report: ConversionReport,
}

/// `(bytes, filename, mime type)` handed to the download sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime_type: String,
}

/// Parsed and normalized model ready to install.
#[derive(Debug)]
pub struct LoadedScene {
    pub scene: Scene,
    pub normalization: Normalization,
}

/// Import work for one file.
#[derive(Debug)]
pub struct LoadJob {
    generation: u64,
    file_name: String,
    format: ModelFormat,
    bytes: Vec<u8>,
}

#[derive(Debug)]
pub struct LoadOutcome {
    generation: u64,
    model: LoadedModel,
    result: Result<LoadedScene, PipelineError>,
}

impl LoadJob {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Parse, check and normalize. Runs without access to the pipeline.
    pub async fn run<I: Importer>(self, importer: &I) -> LoadOutcome {
        let result = Self::prepare(importer, self.format, &self.bytes).await;
        LoadOutcome {
            generation: self.generation,
            model: LoadedModel {
                file_name: self.file_name,
                format: self.format,
                original_bytes: self.bytes.len() as u64,
            },
            result,
        }
    }

    async fn prepare<I: Importer>(
        importer: &I,
        format: ModelFormat,
        bytes: &[u8],
    ) -> Result<LoadedScene, PipelineError> {
        let mut scene = importer.parse(format, bytes).await?;
        if scene.vertex_count(scene.root()) == 0 {
            return Err(DegenerateGeometryError("model has no vertices".into()).into());
        }
        for mesh_ref in scene.mesh_refs(scene.root()) {
            if let Some(mesh) = scene.mesh_mut(mesh_ref) {
                mesh.ensure_normals();
            }
        }
        let normalization = normalize(&scene)?;
        Ok(LoadedScene {
            scene,
            normalization,
        })
    }
}

/// Export, optimize and re-import work for one conversion.
#[derive(Debug)]
pub struct ConversionJob {
    generation: u64,
    target: ModelFormat,
    snapshot: ExportSnapshot,
    optimize: OptimizeOptions,
    filename: String,
    original_bytes: u64,
}

/// Bytes and preview produced by a conversion.
#[derive(Debug)]
pub struct ConvertedModel {
    pub bytes: Vec<u8>,
    pub preview: Scene,
    pub export_matrix: Affine3A,
}

#[derive(Debug)]
pub struct ConversionOutcome {
    generation: u64,
    target: ModelFormat,
    filename: String,
    original_bytes: u64,
    result: Result<ConvertedModel, PipelineError>,
}

impl ConversionJob {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub async fn run<I: Importer, E: Exporter, O: Optimizer>(
        self,
        collaborators: &Collaborators<I, E, O>,
    ) -> ConversionOutcome {
        let ConversionJob {
            generation,
            target,
            snapshot,
            optimize,
            filename,
            original_bytes,
        } = self;
        let result = Self::convert(collaborators, target, snapshot, optimize).await;
        ConversionOutcome {
            generation,
            target,
            filename,
            original_bytes,
            result,
        }
    }

    async fn convert<I: Importer, E: Exporter, O: Optimizer>(
        collaborators: &Collaborators<I, E, O>,
        target: ModelFormat,
        snapshot: ExportSnapshot,
        optimize: OptimizeOptions,
    ) -> Result<ConvertedModel, PipelineError> {
        let mut bytes = collaborators
            .exporter
            .serialize(target, &snapshot.scene, ExportOptions::default())
            .await?;
        tracing::debug!("Exported {} bytes of {}", bytes.len(), target);

        if optimize.is_active() {
            bytes = collaborators.optimizer.optimize(target, &bytes, optimize).await?;
        }

        let preview = collaborators.importer.parse(target, &bytes).await?;
        Ok(ConvertedModel {
            bytes,
            preview,
            export_matrix: snapshot.export_matrix,
        })
    }
}

/// Work started by the pipeline.
#[derive(Debug)]
pub enum Job {
    Load(LoadJob),
    Conversion(ConversionJob),
}

/// Finished work to hand back to the pipeline.
#[derive(Debug)]
pub enum JobOutcome {
    Load(LoadOutcome),
    Conversion(ConversionOutcome),
}

impl Job {
    pub fn generation(&self) -> u64 {
        match self {
            Job::Load(job) => job.generation(),
            Job::Conversion(job) => job.generation(),
        }
    }

    pub async fn run<I: Importer, E: Exporter, O: Optimizer>(
        self,
        collaborators: &Collaborators<I, E, O>,
    ) -> JobOutcome {
        match self {
            Job::Load(job) => JobOutcome::Load(job.run(&collaborators.importer).await),
            Job::Conversion(job) => JobOutcome::Conversion(job.run(collaborators).await),
        }
    }
}

/// Load/convert state machine.
#[derive(Debug)]
pub struct Pipeline {
    status: PipelineStatus,
    /// Where a failed load or conversion returns to
    stable: PipelineStatus,
    generation: u64,
    target: ModelFormat,
    model: Option<LoadedModel>,
    output: Option<ConversionOutput>,
}

impl Pipeline {
    pub fn new(target: ModelFormat) -> Self {
        Self {
            status: PipelineStatus::NoModel,
            stable: PipelineStatus::NoModel,
            generation: 0,
            target,
            model: None,
            output: None,
        }
    }

    pub fn status(&self) -> PipelineStatus {
        self.status
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn target(&self) -> ModelFormat {
        self.target
    }

    pub fn model(&self) -> Option<&LoadedModel> {
        self.model.as_ref()
    }

    pub fn output(&self) -> Option<&ConversionOutput> {
        self.output.as_ref()
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Start loading a file. Unknown extensions fail before any state change.
    pub fn begin_load(&mut self, file_name: &str, bytes: Vec<u8>) -> Result<LoadJob, PipelineError> {
        let format = ModelFormat::from_file_name(file_name)?;
        if !matches!(self.status, PipelineStatus::Loading | PipelineStatus::Converting) {
            self.stable = self.status;
        }
        let generation = self.next_generation();
        self.status = PipelineStatus::Loading;
        tracing::info!(
            "Loading {} ({} bytes, {}) as generation {}",
            file_name,
            bytes.len(),
            format,
            generation
        );
        Ok(LoadJob {
            generation,
            file_name: file_name.to_string(),
            format,
            bytes,
        })
    }

    /// Install a finished load. Returns `None` for stale outcomes.
    pub fn complete_load(
        &mut self,
        stage: &mut Stage,
        outcome: LoadOutcome,
    ) -> Option<Result<SceneStats, PipelineError>> {
        if outcome.generation != self.generation || self.status != PipelineStatus::Loading {
            tracing::debug!(
                "Discarding stale load of {} (generation {}, current {})",
                outcome.model.file_name,
                outcome.generation,
                self.generation
            );
            return None;
        }

        match outcome.result {
            Ok(loaded) => {
                stage.install_original(loaded.scene, loaded.normalization);
                let stats = stage.original_stats();
                tracing::info!(
                    "Loaded {}: {} vertices, {} faces, {} bytes",
                    outcome.model.file_name,
                    stats.vertices,
                    stats.faces,
                    outcome.model.original_bytes
                );
                self.model = Some(outcome.model);
                self.output = None;
                self.status = PipelineStatus::Loaded;
                Some(Ok(stats))
            }
            Err(error) => {
                tracing::warn!("Failed to load {}: {}", outcome.model.file_name, error);
                self.status = self.stable;
                Some(Err(error))
            }
        }
    }

    /// Select the conversion target. Returns whether it changed.
    pub fn set_target(&mut self, extension: &str) -> Result<bool, PipelineError> {
        let format = ModelFormat::from_extension(extension)?;
        if !format.is_target() {
            return Err(FormatError::Unsupported(format!("{format} is not a conversion target")).into());
        }
        let changed = format != self.target;
        self.target = format;
        Ok(changed)
    }

    /// Start a conversion of the original's current state.
    ///
    /// Ignored (returns `None`) unless a model is loaded and nothing is in
    /// flight.
    pub fn begin_conversion(
        &mut self,
        stage: &Stage,
        options: &ConversionOptions,
        quantization_bits: u8,
    ) -> Option<ConversionJob> {
        if !matches!(self.status, PipelineStatus::Loaded | PipelineStatus::Previewed) {
            tracing::debug!("Conversion request ignored while {:?}", self.status);
            return None;
        }
        let model = self.model.as_ref()?;

        let up_correction = up_axis_correction(model.format, self.target);
        let snapshot = stage.export_snapshot(up_correction, options.weld)?;
        let filename = output_file_name(&model.file_name, self.target, options.compress);
        let original_bytes = model.original_bytes;

        self.stable = self.status;
        let generation = self.next_generation();
        self.status = PipelineStatus::Converting;
        tracing::info!(
            "Converting to {} (weld: {}, simplify: {}%, compress: {}) as generation {}",
            self.target,
            options.weld,
            options.simplify_ratio,
            options.compress,
            generation
        );

        Some(ConversionJob {
            generation,
            target: self.target,
            snapshot,
            optimize: OptimizeOptions {
                weld: options.weld,
                simplify_ratio: options.simplify_ratio.min(100),
                compress: options.compress,
                quantization_bits,
            }
            .for_target(self.target),
            filename,
            original_bytes,
        })
    }

    /// Install a finished conversion as the result. Returns `None` for
    /// stale outcomes.
    pub fn complete_conversion(
        &mut self,
        stage: &mut Stage,
        outcome: ConversionOutcome,
    ) -> Option<Result<ConversionReport, PipelineError>> {
        if outcome.generation != self.generation || self.status != PipelineStatus::Converting {
            tracing::debug!(
                "Discarding stale conversion (generation {}, current {})",
                outcome.generation,
                self.generation
            );
            return None;
        }

        let converted = match outcome.result {
            Ok(converted) => converted,
            Err(error) => {
                tracing::error!("Conversion to {} failed: {}", outcome.target, error);
                self.status = self.stable;
                return Some(Err(error));
            }
        };

        if !stage.install_result(converted.preview, converted.export_matrix) {
            self.status = self.stable;
            return None;
        }

        let final_bytes = converted.bytes.len() as u64;
        let report = ConversionReport {
            original_bytes: outcome.original_bytes,
            final_bytes,
            reduction_percent: reduction_percent(outcome.original_bytes, final_bytes),
            original: stage.original_stats(),
            result: stage.result_stats(),
            filename: outcome.filename,
            mime_type: outcome.target.mime_type().to_string(),
        };
        tracing::info!(
            "Converted to {}: {} -> {} bytes ({})",
            report.filename,
            report.original_bytes,
            report.final_bytes,
            report.badge().unwrap_or_default()
        );

        self.output = Some(ConversionOutput {
            bytes: converted.bytes,
            report: report.clone(),
        });
        self.status = PipelineStatus::Previewed;
        Some(Ok(report))
    }

    /// Drop everything. In-flight work becomes stale.
    pub fn reset(&mut self, stage: &mut Stage) {
        self.next_generation();
        self.status = PipelineStatus::NoModel;
        self.stable = PipelineStatus::NoModel;
        self.model = None;
        self.output = None;
        stage.clear();
        tracing::info!("Pipeline reset");
    }

    /// Last output for the download sink.
    pub fn download(&self) -> Option<Download> {
        self.output.as_ref().map(|output| Download {
            bytes: output.bytes.clone(),
            filename: output.report.filename.clone(),
            mime_type: output.report.mime_type.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_scene::{MeshBuffer, Node};
    use glam::Vec3;
    use std::rc::Rc;
    use tokio::sync::Notify;

    /// 100 separate triangles, 300 vertices
    fn soup_scene() -> Scene {
        let positions = (0..100)
            .flat_map(|i| {
                let x = i as f32;
                [Vec3::new(x, 0.0, 0.0), Vec3::new(x + 1.0, 0.0, 0.0), Vec3::new(x, 1.0, 0.0)]
            })
            .collect();
        Scene::with_root(Node::new("soup").with_mesh(MeshBuffer::new(positions)))
    }

    struct FakeImporter;

    impl Importer for FakeImporter {
        async fn parse(&self, _format: ModelFormat, bytes: &[u8]) -> Result<Scene, FormatError> {
            match bytes.first() {
                Some(b'!') => Err(FormatError::malformed("fake", "bad magic")),
                Some(b'0') => Ok(Scene::new()),
                _ => Ok(soup_scene()),
            }
        }
    }

    /// Writes `size` bytes or fails when `size` is zero.
    struct FakeExporter {
        size: usize,
    }

    impl Exporter for FakeExporter {
        async fn serialize(
            &self,
            _format: ModelFormat,
            _scene: &Scene,
            _options: ExportOptions,
        ) -> Result<Vec<u8>, ExportError> {
            if self.size == 0 {
                return Err(ExportError::Serialize("fake failure".into()));
            }
            Ok(vec![1; self.size])
        }
    }

    /// Passes bytes through once `gate` is notified (immediately without one).
    #[derive(Default)]
    struct GatedOptimizer {
        gate: Option<Rc<Notify>>,
    }

    impl Optimizer for GatedOptimizer {
        async fn optimize(
            &self,
            _format: ModelFormat,
            bytes: &[u8],
            _options: OptimizeOptions,
        ) -> Result<Vec<u8>, OptimizationError> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            Ok(bytes.to_vec())
        }
    }

    fn collaborators(size: usize) -> Collaborators<FakeImporter, FakeExporter, GatedOptimizer> {
        Collaborators {
            importer: FakeImporter,
            exporter: FakeExporter { size },
            optimizer: GatedOptimizer::default(),
        }
    }

    async fn loaded(pipeline: &mut Pipeline, stage: &mut Stage) {
        let job = pipeline.begin_load("model.stl", vec![7; 50_000]).unwrap();
        let outcome = job.run(&FakeImporter).await;
        pipeline.complete_load(stage, outcome).unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_conversion_report() {
        let mut pipeline = Pipeline::new(ModelFormat::Glb);
        let mut stage = Stage::new();
        loaded(&mut pipeline, &mut stage).await;
        assert_eq!(pipeline.status(), PipelineStatus::Loaded);
        assert_eq!(stage.original_stats(), SceneStats::from_vertex_count(300));

        let job = pipeline
            .begin_conversion(&stage, &ConversionOptions::default(), 11)
            .unwrap();
        assert_eq!(pipeline.status(), PipelineStatus::Converting);
        let outcome = job.run(&collaborators(20_000)).await;
        let report = pipeline.complete_conversion(&mut stage, outcome).unwrap().unwrap();

        assert_eq!(report.reduction_percent, Some(60));
        assert_eq!(report.original.faces, 100);
        assert_eq!(report.result.vertices, 300);
        assert_eq!(report.filename, "model.draco.glb");
        assert_eq!(report.mime_type, "model/gltf-binary");
        assert_eq!(pipeline.status(), PipelineStatus::Previewed);
        assert!(stage.has_result());
        assert!(stage.comparison.comparing);

        let download = pipeline.download().unwrap();
        assert_eq!(download.bytes.len(), 20_000);
        assert_eq!(download.filename, "model.draco.glb");
    }

    #[tokio::test]
    async fn test_reset_discards_inflight_conversion() {
        let mut pipeline = Pipeline::new(ModelFormat::Glb);
        let mut stage = Stage::new();
        loaded(&mut pipeline, &mut stage).await;

        let job = pipeline
            .begin_conversion(&stage, &ConversionOptions::default(), 11)
            .unwrap();
        pipeline.reset(&mut stage);

        let outcome = job.run(&collaborators(20_000)).await;
        assert!(pipeline.complete_conversion(&mut stage, outcome).is_none());
        assert_eq!(pipeline.status(), PipelineStatus::NoModel);
        assert!(!stage.has_result());
        assert!(pipeline.output().is_none());
    }

    #[tokio::test]
    async fn test_reset_while_optimizer_suspended() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let mut pipeline = Pipeline::new(ModelFormat::Glb);
                let mut stage = Stage::new();
                loaded(&mut pipeline, &mut stage).await;

                let gate = Rc::new(Notify::new());
                let collaborators = Collaborators {
                    importer: FakeImporter,
                    exporter: FakeExporter { size: 100 },
                    optimizer: GatedOptimizer {
                        gate: Some(gate.clone()),
                    },
                };
                let job = pipeline
                    .begin_conversion(&stage, &ConversionOptions::default(), 11)
                    .unwrap();
                let handle = tokio::task::spawn_local(async move { job.run(&collaborators).await });
                tokio::task::yield_now().await;

                // Reset and load again while the optimizer is still waiting
                pipeline.reset(&mut stage);
                loaded(&mut pipeline, &mut stage).await;
                gate.notify_one();

                let outcome = handle.await.unwrap();
                assert!(pipeline.complete_conversion(&mut stage, outcome).is_none());
                assert_eq!(pipeline.status(), PipelineStatus::Loaded);
                assert!(!stage.has_result());
            })
            .await;
    }

    #[tokio::test]
    async fn test_concurrent_trigger_ignored() {
        let mut pipeline = Pipeline::new(ModelFormat::Glb);
        let mut stage = Stage::new();
        loaded(&mut pipeline, &mut stage).await;

        let first = pipeline.begin_conversion(&stage, &ConversionOptions::default(), 11);
        assert!(first.is_some());
        let generation = pipeline.generation();
        assert!(pipeline
            .begin_conversion(&stage, &ConversionOptions::default(), 11)
            .is_none());
        assert_eq!(pipeline.generation(), generation);
        assert_eq!(pipeline.status(), PipelineStatus::Converting);
    }

    #[tokio::test]
    async fn test_export_failure_keeps_loaded() {
        let mut pipeline = Pipeline::new(ModelFormat::Glb);
        let mut stage = Stage::new();
        loaded(&mut pipeline, &mut stage).await;

        let job = pipeline
            .begin_conversion(&stage, &ConversionOptions::default(), 11)
            .unwrap();
        let outcome = job.run(&collaborators(0)).await;
        let error = pipeline.complete_conversion(&mut stage, outcome).unwrap().unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Export);
        assert_eq!(pipeline.status(), PipelineStatus::Loaded);
        assert!(!stage.has_result());
        assert!(pipeline.download().is_none());
    }

    #[tokio::test]
    async fn test_failure_after_preview_keeps_previous_result() {
        let mut pipeline = Pipeline::new(ModelFormat::Stl);
        let mut stage = Stage::new();
        loaded(&mut pipeline, &mut stage).await;

        let job = pipeline
            .begin_conversion(&stage, &ConversionOptions::default(), 11)
            .unwrap();
        let outcome = job.run(&collaborators(500)).await;
        pipeline.complete_conversion(&mut stage, outcome).unwrap().unwrap();

        let job = pipeline
            .begin_conversion(&stage, &ConversionOptions::default(), 11)
            .unwrap();
        let outcome = job.run(&collaborators(0)).await;
        assert!(pipeline.complete_conversion(&mut stage, outcome).unwrap().is_err());
        assert_eq!(pipeline.status(), PipelineStatus::Previewed);
        assert!(stage.has_result());
        assert_eq!(pipeline.download().unwrap().bytes.len(), 500);
    }

    #[tokio::test]
    async fn test_obj_target_keeps_coordinates_exact() {
        let collaborators = Collaborators::builtin();
        let mut pipeline = Pipeline::new(ModelFormat::Obj);
        let mut stage = Stage::new();
        let source = b"v 0.123456 1 0.3\nv 2 0 0\nv 0 0 1\nf 1 2 3\n".to_vec();
        let job = pipeline.begin_load("part.obj", source).unwrap();
        let outcome = job.run(&collaborators.importer).await;
        pipeline.complete_load(&mut stage, outcome).unwrap().unwrap();

        // Compression is on by default but only applies to GLB output
        let job = pipeline
            .begin_conversion(&stage, &ConversionOptions::default(), 11)
            .unwrap();
        let outcome = job.run(&collaborators).await;
        let report = pipeline.complete_conversion(&mut stage, outcome).unwrap().unwrap();
        assert_eq!(report.filename, "part.obj");

        let download = pipeline.download().unwrap();
        let written = BuiltinFormats::parse_bytes(ModelFormat::Obj, &download.bytes).unwrap();
        let first = written.mesh(written.mesh_refs(written.root())[0]).unwrap().positions()[0];
        assert!((first - Vec3::new(0.123456, 1.0, 0.3)).length() < 1e-6);
    }

    #[tokio::test]
    async fn test_unsupported_extension_rejected_up_front() {
        let mut pipeline = Pipeline::new(ModelFormat::Glb);
        let error = pipeline.begin_load("notes.txt", vec![1, 2, 3]).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Format);
        assert_eq!(pipeline.status(), PipelineStatus::NoModel);
        assert_eq!(pipeline.generation(), 0);
    }

    #[tokio::test]
    async fn test_failed_load_restores_previous_model() {
        let mut pipeline = Pipeline::new(ModelFormat::Glb);
        let mut stage = Stage::new();
        loaded(&mut pipeline, &mut stage).await;

        let job = pipeline.begin_load("broken.obj", b"!".to_vec()).unwrap();
        assert_eq!(pipeline.status(), PipelineStatus::Loading);
        let outcome = job.run(&FakeImporter).await;
        let error = pipeline.complete_load(&mut stage, outcome).unwrap().unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Format);
        assert_eq!(pipeline.status(), PipelineStatus::Loaded);
        assert_eq!(pipeline.model().unwrap().file_name, "model.stl");
        assert!(stage.has_model());
    }

    #[tokio::test]
    async fn test_empty_model_is_degenerate() {
        let mut pipeline = Pipeline::new(ModelFormat::Glb);
        let mut stage = Stage::new();
        let job = pipeline.begin_load("empty.obj", b"0".to_vec()).unwrap();
        let outcome = job.run(&FakeImporter).await;
        let error = pipeline.complete_load(&mut stage, outcome).unwrap().unwrap_err();
        assert_eq!(error.kind(), ErrorKind::DegenerateGeometry);
        assert_eq!(pipeline.status(), PipelineStatus::NoModel);
        assert!(!stage.has_model());
    }

    #[tokio::test]
    async fn test_superseded_load_is_stale() {
        let mut pipeline = Pipeline::new(ModelFormat::Glb);
        let mut stage = Stage::new();
        let first = pipeline.begin_load("a.stl", vec![1; 10]).unwrap();
        let second = pipeline.begin_load("b.stl", vec![1; 20]).unwrap();

        let stale = first.run(&FakeImporter).await;
        assert!(pipeline.complete_load(&mut stage, stale).is_none());
        assert_eq!(pipeline.status(), PipelineStatus::Loading);

        let fresh = second.run(&FakeImporter).await;
        assert!(pipeline.complete_load(&mut stage, fresh).unwrap().is_ok());
        assert_eq!(pipeline.model().unwrap().original_bytes, 20);
    }

    #[test]
    fn test_set_target() {
        let mut pipeline = Pipeline::new(ModelFormat::Glb);
        assert!(pipeline.set_target("stl").unwrap());
        assert!(!pipeline.set_target("STL").unwrap());
        assert_eq!(pipeline.target(), ModelFormat::Stl);
        assert!(pipeline.set_target("fbx").is_err());
        assert!(pipeline.set_target("docx").is_err());
        assert_eq!(pipeline.target(), ModelFormat::Stl);
    }

    #[test]
    fn test_conversion_requires_model() {
        let mut pipeline = Pipeline::new(ModelFormat::Glb);
        let stage = Stage::new();
        assert!(pipeline
            .begin_conversion(&stage, &ConversionOptions::default(), 11)
            .is_none());
        assert_eq!(pipeline.status(), PipelineStatus::NoModel);
    }
}

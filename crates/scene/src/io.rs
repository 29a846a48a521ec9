//! Interfaces to the external format codecs and optimizer.
//!
//! The core never parses or writes file formats itself; it talks to
//! [`Importer`], [`Exporter`] and [`Optimizer`] implementations. Their calls
//! are async so a slow codec never blocks the frame loop.

use std::fmt;

use glam::Quat;

use crate::error::{ExportError, FormatError, OptimizationError};
use crate::scene::Scene;

/// Interchange formats known to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelFormat {
    Stl,
    Obj,
    Glb,
    Ply,
    Fbx,
    ThreeMf,
    Usdz,
}

impl ModelFormat {
    /// Formats accepted for loading.
    pub const INPUTS: [ModelFormat; 7] = [
        ModelFormat::Stl,
        ModelFormat::Obj,
        ModelFormat::Glb,
        ModelFormat::Ply,
        ModelFormat::Fbx,
        ModelFormat::ThreeMf,
        ModelFormat::Usdz,
    ];

    /// Conversion targets offered regardless of the input format.
    pub const TARGETS: [ModelFormat; 5] = [
        ModelFormat::Glb,
        ModelFormat::Stl,
        ModelFormat::Obj,
        ModelFormat::Ply,
        ModelFormat::Usdz,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            ModelFormat::Stl => "stl",
            ModelFormat::Obj => "obj",
            ModelFormat::Glb => "glb",
            ModelFormat::Ply => "ply",
            ModelFormat::Fbx => "fbx",
            ModelFormat::ThreeMf => "3mf",
            ModelFormat::Usdz => "usdz",
        }
    }

    /// Parse a bare extension such as `STL` or `glb`.
    pub fn from_extension(extension: &str) -> Result<Self, FormatError> {
        let lower = extension.trim_start_matches('.').to_ascii_lowercase();
        Self::INPUTS
            .into_iter()
            .find(|format| format.extension() == lower)
            .ok_or_else(|| FormatError::Unsupported(extension.to_string()))
    }

    /// Format of a file name, from its final extension.
    pub fn from_file_name(file_name: &str) -> Result<Self, FormatError> {
        match file_name.rsplit_once('.') {
            Some((_, extension)) => Self::from_extension(extension),
            None => Err(FormatError::Unsupported(file_name.to_string())),
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ModelFormat::Glb => "model/gltf-binary",
            ModelFormat::Stl => "application/sla",
            ModelFormat::Obj => "text/plain",
            ModelFormat::Usdz => "model/vnd.usdz+zip",
            _ => "application/octet-stream",
        }
    }

    /// STL files are conventionally Z-up; everything else is Y-up.
    pub fn is_z_up(self) -> bool {
        self == ModelFormat::Stl
    }

    pub fn is_target(self) -> bool {
        Self::TARGETS.contains(&self)
    }
}

impl fmt::Display for ModelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Rotation applied to the export wrapper when the up-axis convention changes.
///
/// Y-up content exported to STL is turned +90 degrees about X so it stands
/// upright in Z-up tools. Returns `None` when no correction applies.
pub fn up_axis_correction(input: ModelFormat, target: ModelFormat) -> Option<Quat> {
    if target.is_z_up() && !input.is_z_up() {
        Some(Quat::from_rotation_x(std::f32::consts::FRAC_PI_2))
    } else {
        None
    }
}

/// Input file name without its final extension (`model` when empty).
pub fn file_stem(file_name: &str) -> &str {
    let stem = match file_name.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => file_name,
    };
    if stem.is_empty() { "model" } else { stem }
}

/// Download file name: `<stem>[.draco].<ext>`.
pub fn output_file_name(input_name: &str, target: ModelFormat, compress: bool) -> String {
    let stem = file_stem(input_name);
    if target == ModelFormat::Glb && compress {
        format!("{stem}.draco.{}", target.extension())
    } else {
        format!("{stem}.{}", target.extension())
    }
}

/// Options understood by exporters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    /// Binary encoding where the format has a choice
    pub binary: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { binary: true }
    }
}

/// Options passed to the optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimizeOptions {
    pub weld: bool,
    /// Percentage of geometry to remove (0-100)
    pub simplify_ratio: u8,
    pub compress: bool,
    pub quantization_bits: u8,
}

impl OptimizeOptions {
    /// Whether running the optimizer would change anything.
    pub fn is_active(&self) -> bool {
        self.weld || self.simplify_ratio > 0 || self.compress
    }

    /// Options that apply when writing `target`. Only GLB output goes
    /// through the optimizer; other formats are written as exported.
    pub fn for_target(self, target: ModelFormat) -> Self {
        if target == ModelFormat::Glb {
            self
        } else {
            Self {
                weld: false,
                simplify_ratio: 0,
                compress: false,
                ..self
            }
        }
    }
}

/// Parses bytes of a given format into a scene.
#[allow(async_fn_in_trait)]
pub trait Importer {
    async fn parse(&self, format: ModelFormat, bytes: &[u8]) -> Result<Scene, FormatError>;
}

/// Serializes a scene into bytes of a given format.
#[allow(async_fn_in_trait)]
pub trait Exporter {
    async fn serialize(
        &self,
        format: ModelFormat,
        scene: &Scene,
        options: ExportOptions,
    ) -> Result<Vec<u8>, ExportError>;
}

/// Opaque size-reduction step over exported bytes.
#[allow(async_fn_in_trait)]
pub trait Optimizer {
    async fn optimize(
        &self,
        format: ModelFormat,
        bytes: &[u8],
        options: OptimizeOptions,
    ) -> Result<Vec<u8>, OptimizationError>;
}

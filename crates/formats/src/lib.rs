//! Model codecs for Facet
//!
//! [`BuiltinFormats`] reads and writes STL, OBJ and GLB. The remaining
//! formats in [`ModelFormat`] are recognized by extension but report
//! `Unsupported`. [`BuiltinOptimizer`] runs weld, simplify and
//! quantization over exported bytes.

pub mod glb;
pub mod obj;
pub mod optimizer;
pub mod stl;

use facet_scene::{
    ExportError, ExportOptions, Exporter, FormatError, Importer, ModelFormat, OptimizationError,
    OptimizeOptions, Optimizer, Scene,
};

pub use optimizer::{grid_cells, optimize_scene, quantize, simplify};

/// Importer and exporter for the formats with a native codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinFormats;

impl BuiltinFormats {
    /// Synchronous parse used by both the importer and the optimizer.
    pub fn parse_bytes(format: ModelFormat, bytes: &[u8]) -> Result<Scene, FormatError> {
        let scene = match format {
            ModelFormat::Stl => stl::parse(bytes)?,
            ModelFormat::Obj => obj::parse(bytes)?,
            ModelFormat::Glb => glb::parse(bytes)?,
            other => return Err(FormatError::Unsupported(format!("no reader for .{other}"))),
        };
        tracing::debug!(
            "Parsed {} bytes of {} into {} vertices",
            bytes.len(),
            format,
            scene.vertex_count(scene.root())
        );
        Ok(scene)
    }

    pub fn serialize_scene(
        format: ModelFormat,
        scene: &Scene,
        options: ExportOptions,
    ) -> Result<Vec<u8>, ExportError> {
        match format {
            ModelFormat::Stl => stl::write(scene, options.binary),
            ModelFormat::Obj => obj::write(scene),
            ModelFormat::Glb => glb::write(scene),
            other => Err(ExportError::Unsupported(other.to_string())),
        }
    }
}

impl Importer for BuiltinFormats {
    async fn parse(&self, format: ModelFormat, bytes: &[u8]) -> Result<Scene, FormatError> {
        Self::parse_bytes(format, bytes)
    }
}

impl Exporter for BuiltinFormats {
    async fn serialize(
        &self,
        format: ModelFormat,
        scene: &Scene,
        options: ExportOptions,
    ) -> Result<Vec<u8>, ExportError> {
        Self::serialize_scene(format, scene, options)
    }
}

/// Re-encodes exported bytes after weld, simplify and quantization.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinOptimizer;

impl Optimizer for BuiltinOptimizer {
    async fn optimize(
        &self,
        format: ModelFormat,
        bytes: &[u8],
        options: OptimizeOptions,
    ) -> Result<Vec<u8>, OptimizationError> {
        if !options.is_active() {
            return Ok(bytes.to_vec());
        }
        let scene = BuiltinFormats::parse_bytes(format, bytes)?;
        let quantization = options.compress.then_some(options.quantization_bits);
        let optimized = optimize_scene(&scene, options.weld, options.simplify_ratio, quantization);
        let out = BuiltinFormats::serialize_scene(format, &optimized, ExportOptions::default())?;
        tracing::info!(
            "Optimized {} output: {} -> {} bytes",
            format,
            bytes.len(),
            out.len()
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_scene::{MeshBuffer, Node};
    use glam::Vec3;

    fn quad_scene() -> Scene {
        let mesh = MeshBuffer::new(vec![
            Vec3::ZERO,
            Vec3::X,
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::ZERO,
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::Y,
        ]);
        Scene::with_root(Node::new("quad").with_mesh(mesh))
    }

    #[tokio::test]
    async fn test_dispatch_by_format() {
        let formats = BuiltinFormats;
        for format in [ModelFormat::Stl, ModelFormat::Obj, ModelFormat::Glb] {
            let bytes = formats
                .serialize(format, &quad_scene(), ExportOptions::default())
                .await
                .unwrap();
            let scene = formats.parse(format, &bytes).await.unwrap();
            assert_eq!(scene.stats(scene.root()).faces, 2, "{format}");
        }
    }

    #[tokio::test]
    async fn test_unsupported_formats() {
        let formats = BuiltinFormats;
        assert!(matches!(
            formats.parse(ModelFormat::Fbx, b"").await,
            Err(FormatError::Unsupported(_))
        ));
        assert!(matches!(
            formats
                .serialize(ModelFormat::Usdz, &quad_scene(), ExportOptions::default())
                .await,
            Err(ExportError::Unsupported(_))
        ));
    }

    #[tokio::test]
    async fn test_optimizer_welds_soup() {
        let bytes = BuiltinFormats::serialize_scene(ModelFormat::Glb, &quad_scene(), ExportOptions::default()).unwrap();
        let options = OptimizeOptions {
            weld: true,
            simplify_ratio: 0,
            compress: false,
            quantization_bits: 11,
        };
        let out = BuiltinOptimizer.optimize(ModelFormat::Glb, &bytes, options).await.unwrap();
        let scene = BuiltinFormats::parse_bytes(ModelFormat::Glb, &out).unwrap();
        assert_eq!(scene.vertex_count(scene.root()), 4);
    }

    #[tokio::test]
    async fn test_inactive_optimizer_passes_through() {
        let options = OptimizeOptions {
            weld: false,
            simplify_ratio: 0,
            compress: false,
            quantization_bits: 11,
        };
        let out = BuiltinOptimizer.optimize(ModelFormat::Stl, b"anything", options).await.unwrap();
        assert_eq!(out, b"anything");
    }

    #[tokio::test]
    async fn test_optimizer_rejects_bad_input() {
        let options = OptimizeOptions {
            weld: true,
            simplify_ratio: 0,
            compress: false,
            quantization_bits: 11,
        };
        assert!(matches!(
            BuiltinOptimizer.optimize(ModelFormat::Glb, b"nope", options).await,
            Err(OptimizationError::Input(_))
        ));
    }
}

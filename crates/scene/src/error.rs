//! Error taxonomy for importing, exporting and optimizing models.

/// Malformed or unsupported input bytes.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("Unsupported format: {0}")]
    Unsupported(String),

    #[error("Malformed {format} data: {message}")]
    Malformed {
        format: &'static str,
        message: String,
    },

    #[error("Vertex index {index} out of range ({vertices} vertices)")]
    IndexOutOfRange { index: u32, vertices: usize },
}

impl FormatError {
    pub fn malformed(format: &'static str, message: impl Into<String>) -> Self {
        Self::Malformed {
            format,
            message: message.into(),
        }
    }
}

/// Serialization failure for the chosen target format.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Export to {0} is not supported")]
    Unsupported(String),

    #[error("Nothing to export: {0}")]
    EmptyScene(String),

    #[error("Serialization failed: {0}")]
    Serialize(String),
}

/// Failure reported by the external optimization step.
#[derive(Debug, thiserror::Error)]
pub enum OptimizationError {
    #[error("Optimizer could not read its input: {0}")]
    Input(#[from] FormatError),

    #[error("Optimizer could not write its output: {0}")]
    Output(#[from] ExportError),

    #[error("Optimization failed: {0}")]
    Failed(String),
}

/// Empty geometry that cannot be displayed or normalized.
#[derive(Debug, thiserror::Error)]
#[error("Degenerate geometry: {0}")]
pub struct DegenerateGeometryError(pub String);

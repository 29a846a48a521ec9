//! Facet - load, edit, sculpt and convert 3D models, then compare the
//! result with the original in a split view
//!
//! The library owns the orchestration layer:
//!
//! - **Context**: [`AppContext`] holds the stage, camera, sculpt engine and
//!   pipeline, and speaks the `facet-ipc` protocol
//! - **Pipeline**: generation-tagged load and conversion state machine
//! - **Input**: routing of pointer events to slider, brush or camera
//! - **Config**: defaults plus environment overrides

pub mod cli;
pub mod config;
pub mod context;
pub mod input;
pub mod pipeline;

pub use config::AppConfig;
pub use context::AppContext;
pub use input::{InputRouter, PointerOutcome};
pub use pipeline::{
    Collaborators, ConversionJob, Download, Job, JobOutcome, LoadJob, Pipeline, PipelineError,
};

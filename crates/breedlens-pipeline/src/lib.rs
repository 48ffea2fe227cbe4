//! BreedLens Pipeline
//!
//! The gated end-to-end flow for one uploaded image: decode, optional gate
//! check, primary classification, and presentation formatting with CSV
//! export. The gate call and the classifier call are strictly sequential;
//! a suppressing gate decision guarantees the classifier is never invoked
//! for that image.

pub mod format;
pub mod pipeline;
pub mod state;

pub use format::{DisplayRow, PredictionReport, DEFAULT_TOP_N, EXPORT_FILE_NAME};
pub use pipeline::{ClassificationPipeline, PipelineRun, DEFAULT_CALL_TIMEOUT};
pub use state::{PipelineState, StateTrace};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::format::PredictionReport;
    pub use crate::pipeline::{ClassificationPipeline, PipelineRun};
    pub use crate::state::PipelineState;
}

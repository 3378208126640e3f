//! End-to-end pipeline
//!
//! Sequences the crawl, the ranking and the model-backed stages into one
//! [`PipelineReport`].

mod report;
mod sequencer;

pub use report::PipelineReport;
pub use sequencer::{run_pipeline, PipelineFailure, PipelineRequest, PipelineStage};

//! The multi-resolution crop pipeline
//!
//! `CropOrchestrator` dispatches one unit per box through a
//! `TaskScheduler`; each unit runs a `BoxCropWriter` that writes every
//! resolution level of its box into one container.

pub mod layout;
pub mod scheduler;
pub mod box_writer;
pub mod orchestrator;

pub use layout::OutputLayout;
pub use scheduler::{DispatchMode, ParallelScheduler, SerialScheduler, TaskScheduler};
pub use box_writer::{BoxCropWriter, BoxWriteSummary};
pub use orchestrator::{BoxOutcome, CropOptions, CropOrchestrator, CropReport};

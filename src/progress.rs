//! Progress events for a pipeline run.
//!
//! Pass an [`Arc<dyn PipelineProgressCallback>`] to
//! [`crate::analyse::analyse_and_report_with_progress`] to hear about stage boundaries
//! and warnings as they happen. The CLI uses this to drive its spinner;
//! a service could forward the same events to a channel or a job record.
//!
//! Stages run one after another, so events arrive in order on whichever
//! task is driving the pipeline. The trait is still `Send + Sync` because
//! that task may move between runtime threads.
//!
//! # Example
//!
//! ```rust
//! use finreport::{PipelineProgressCallback, Stage};
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct StageLog(Mutex<Vec<Stage>>);
//!
//! impl PipelineProgressCallback for StageLog {
//!     fn on_stage_complete(&self, stage: Stage, _output_chars: usize) {
//!         self.0.lock().unwrap().push(stage);
//!     }
//! }
//!
//! let log = Arc::new(StageLog::default());
//! let callback: Arc<dyn PipelineProgressCallback> = log.clone();
//! callback.on_stage_complete(Stage::Extract, 1024);
//! assert_eq!(*log.0.lock().unwrap(), [Stage::Extract]);
//! ```

use crate::error::PipelineWarning;
use crate::output::{PipelineStats, Stage};
use std::sync::Arc;

/// Called by the pipeline as it moves through its stages.
///
/// Every method has a no-op default; implement only what you need.
pub trait PipelineProgressCallback: Send + Sync {
    /// Page images are resolved and the model stages are about to start.
    fn on_pipeline_start(&self, pages: usize) {
        let _ = pages;
    }

    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// `output_chars` is the length of the stage's reply (for
    /// [`Stage::Render`], of the Markdown that was rendered).
    fn on_stage_complete(&self, stage: Stage, output_chars: usize) {
        let _ = (stage, output_chars);
    }

    /// A non-fatal problem was recorded. The same value ends up in
    /// [`crate::output::PipelineOutcome::warnings`].
    fn on_warning(&self, warning: &PipelineWarning) {
        let _ = warning;
    }

    /// The report and its PDF are on disk.
    fn on_pipeline_complete(&self, stats: &PipelineStats) {
        let _ = stats;
    }
}

/// Ignores every event. Used when no callback is given.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;

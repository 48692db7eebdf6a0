/*!
 * Document translation pipeline.
 *
 * - `orchestrator`: per-page state machine, worker pool and result barrier
 * - `cancel`: shared cancellation token
 * - `report`: machine-readable run report
 */

pub use self::cancel::CancellationToken;
pub use self::orchestrator::{
    DocumentPipeline, PipelineConfig, PipelinePhase, PipelineProgress, PipelineResult, ProgressCallback,
    default_workers,
};
pub use self::report::{
    BlockFlag, BlockReport, BlockStatus, DocumentOutcome, FlagEntry, PageReport, PageStatus, RunStats,
    TranslationReport, sha256_hex,
};

pub mod cancel;
pub mod orchestrator;
pub mod report;

pub mod pipeline;

pub use pipeline::{AnalysisOutcome, OracleEngine, PageView, Reading, ReadingSource, SubmissionForm};

pub mod analysis;
pub mod config;
pub mod db;
pub mod error;
pub mod inference;
pub mod models;

pub use analysis::{Analysis, AnalysisError, ExtractionMode, FALLBACK_SUMMARY};
pub use config::LensConfig;
pub use db::{FeedbackStore, PgFeedbackStore};
pub use error::LensError;
pub use inference::{InferenceBackend, InferenceError, WorkersAiClient};
pub use models::{FeedbackRecord, NewFeedback, Sentiment};

pub mod ingest;

pub use ingest::{Binding, Capabilities, FeedbackIngestor, IngestError};

pub mod feedback;

pub use feedback::{FeedbackRecord, NewFeedback, Sentiment};

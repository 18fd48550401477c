pub mod messages;
pub mod pipeline;

pub use messages::{api_message, reply_for_error, reply_for_failure, REPLY_RECOGNITION_FAILED, REPLY_SUCCESS};
pub use pipeline::{Pipeline, PipelineOutcome};

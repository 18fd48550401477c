pub mod error;
pub mod traits;
pub mod types;

pub use error::PipelineError;
pub use traits::{GenerateRequest, GenerateResponse, GenerativeModel, InlineImage, SheetSink};
pub use types::{AppendReport, ImageRef, SheetRow, Table, SHEET_HEADER_PREFIX};

//! Image and text understanding backed by hosted generative models.
//!
//! `ocr` turns an image into free text, `table` turns free text into rows.

pub mod gemini;
pub mod mock;
pub mod ocr;
pub mod table;

pub use gemini::GeminiClient;
pub use mock::MockModel;
pub use ocr::{TextExtractor, EXTRACT_PROMPT};
pub use table::{parse_table, render_table_prompt, TableFormatter, TABLE_PROMPT_TEMPLATE};

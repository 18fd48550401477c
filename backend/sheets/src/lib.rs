//! Google Sheets persistence: OAuth token providers, a minimal Sheets v4
//! values client, and the clear-then-append appender.

pub mod appender;
pub mod auth;
pub mod client;

pub use appender::{sheet_range, SpreadsheetAppender};
pub use auth::{authorize, Credentials, GoogleAuth, StaticToken, TokenProvider, SHEETS_SCOPE};
pub use client::SheetsClient;

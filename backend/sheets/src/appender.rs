use anyhow::{Context, Result};
use async_trait::async_trait;
use snapsheet_core::{AppendReport, SheetRow, SheetSink};
use tracing::{error, info, warn};

use crate::client::SheetsClient;

/// Columns written by one cycle.
const COLUMNS: &str = "A:Z";

/// A1 range covering the writable columns of `sheet`. Names other than plain
/// ASCII words are single-quoted, with embedded quotes doubled.
pub fn sheet_range(sheet: &str) -> String {
    let plain = !sheet.is_empty() && sheet.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        format!("{sheet}!{COLUMNS}")
    } else {
        format!("'{}'!{COLUMNS}", sheet.replace('\'', "''"))
    }
}

/// Clears a sheet, then appends a header row and one call per data row.
pub struct SpreadsheetAppender {
    client: SheetsClient,
    sheet_name: String,
}

impl SpreadsheetAppender {
    pub fn new(client: SheetsClient, sheet_name: impl Into<String>) -> Self {
        Self { client, sheet_name: sheet_name.into() }
    }
}

#[async_trait]
impl SheetSink for SpreadsheetAppender {
    /// A failed clear or data-row append is logged and the cycle continues;
    /// a failed header append aborts it.
    async fn replace_contents(&self, header: &[String], rows: Vec<SheetRow>) -> Result<AppendReport> {
        let range = sheet_range(&self.sheet_name);
        let spreadsheet = self.client.spreadsheet_id();

        let cleared = match self.client.clear(&range).await {
            Ok(()) => {
                info!(spreadsheet, range = %range, "Cleared sheet");
                true
            }
            Err(e) => {
                error!(spreadsheet, range = %range, error = %format!("{e:#}"), "Failed to clear sheet");
                false
            }
        };

        let header_cells = self
            .client
            .append(&range, &[header.to_vec()])
            .await
            .with_context(|| format!("Failed to write header row to {spreadsheet} {range}"))?;

        let mut row_cells = Vec::with_capacity(rows.len());
        for (index, row) in rows.into_iter().enumerate() {
            match self.client.append(&range, &[row.into_values()]).await {
                Ok(cells) => {
                    info!(row = index + 1, cells, "Appended row to spreadsheet");
                    row_cells.push(Some(cells));
                }
                Err(e) => {
                    error!(row = index + 1, error = %format!("{e:#}"), "Failed to append row");
                    row_cells.push(None);
                }
            }
        }

        let report = AppendReport { cleared, header_cells, row_cells };
        if report.rows_failed() > 0 {
            warn!(
                spreadsheet,
                failed = report.rows_failed(),
                written = report.rows_written(),
                "Some rows were not written"
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticToken;
    use axum::http::{HeaderMap, StatusCode, Uri};
    use axum::response::IntoResponse;
    use axum::Router;
    use serde_json::{json, Value};
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct FakeSheets {
        requests: Mutex<Vec<(String, String, Value)>>,
        fail_clear: bool,
        fail_append_call: Option<usize>,
    }

    async fn serve(fake: Arc<FakeSheets>) -> SocketAddr {
        let app = Router::new().fallback(move |uri: Uri, headers: HeaderMap, body: String| {
            let fake = fake.clone();
            async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                let body: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
                let mut requests = fake.requests.lock().unwrap();
                requests.push((uri.to_string(), auth, body));
                let is_clear = uri.path().ends_with(":clear");
                let appends = requests.iter().filter(|(u, _, _)| u.contains(":append")).count();
                if is_clear && fake.fail_clear {
                    return (StatusCode::INTERNAL_SERVER_ERROR, "backend error").into_response();
                }
                if !is_clear && Some(appends) == fake.fail_append_call {
                    return (StatusCode::BAD_REQUEST, "bad row").into_response();
                }
                let cells = requests.last().unwrap().2["values"][0].as_array().map_or(0, |v| v.len());
                axum::Json(json!({ "updates": { "updatedCells": cells } })).into_response()
            }
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        addr
    }

    fn appender(addr: SocketAddr) -> SpreadsheetAppender {
        let client = SheetsClient::new(Arc::new(StaticToken("tok".into())), "sheet-123")
            .with_base_url(format!("http://{addr}"));
        SpreadsheetAppender::new(client, "Sheet1")
    }

    fn row(cells: &[&str]) -> SheetRow {
        SheetRow {
            timestamp: "2024-05-01 09:30:00".into(),
            image: "saved_images/image_20240501_093000.jpg".into(),
            cells: cells.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn header() -> Vec<String> {
        ["日時", "画像パス", "品名", "金額"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn quotes_sheet_names_when_needed() {
        assert_eq!(sheet_range("Sheet1"), "Sheet1!A:Z");
        assert_eq!(sheet_range("My Sheet"), "'My Sheet'!A:Z");
        assert_eq!(sheet_range("受信"), "'受信'!A:Z");
        assert_eq!(sheet_range("Bob's"), "'Bob''s'!A:Z");
    }

    #[tokio::test]
    async fn clears_then_appends_header_and_each_row() {
        let fake = Arc::new(FakeSheets::default());
        let addr = serve(fake.clone()).await;

        let report = appender(addr)
            .replace_contents(&header(), vec![row(&["りんご", "120"]), row(&["みかん", "80"])])
            .await
            .unwrap();

        assert!(report.cleared);
        assert_eq!(report.header_cells, 4);
        assert_eq!(report.row_cells, vec![Some(4), Some(4)]);

        let requests = fake.requests.lock().unwrap();
        assert_eq!(requests.len(), 4);
        assert!(requests[0].0.starts_with("/spreadsheets/sheet-123/values/Sheet1%21A%3AZ:clear"));
        for (uri, auth, _) in requests.iter().skip(1) {
            assert!(uri.contains(":append?"));
            assert!(uri.contains("valueInputOption=RAW"));
            assert_eq!(auth, "Bearer tok");
        }
        assert_eq!(requests[1].2["values"][0][0], "日時");
        assert_eq!(requests[2].2["values"][0][2], "りんご");
        assert_eq!(requests[3].2["values"][0][2], "みかん");
    }

    #[tokio::test]
    async fn failed_clear_is_logged_and_writing_continues() {
        let fake = Arc::new(FakeSheets { fail_clear: true, ..Default::default() });
        let addr = serve(fake.clone()).await;
        let report = appender(addr).replace_contents(&header(), vec![row(&["a"])]).await.unwrap();
        assert!(!report.cleared);
        assert_eq!(report.rows_written(), 1);
    }

    #[tokio::test]
    async fn failed_row_is_reported_without_retry() {
        // append #1 is the header, #3 is the second data row
        let fake = Arc::new(FakeSheets { fail_append_call: Some(3), ..Default::default() });
        let addr = serve(fake.clone()).await;
        let report = appender(addr)
            .replace_contents(&header(), vec![row(&["a"]), row(&["b"]), row(&["c"])])
            .await
            .unwrap();
        assert_eq!(report.row_cells, vec![Some(3), None, Some(3)]);
        assert_eq!(fake.requests.lock().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn failed_header_aborts_the_cycle() {
        let fake = Arc::new(FakeSheets { fail_append_call: Some(1), ..Default::default() });
        let addr = serve(fake.clone()).await;
        let err = appender(addr).replace_contents(&header(), vec![row(&["a"])]).await.unwrap_err();
        assert!(format!("{err:#}").contains("header"));
        assert_eq!(fake.requests.lock().unwrap().len(), 2);
    }
}

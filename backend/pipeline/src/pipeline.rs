use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use chrono::Local;
use snapsheet_core::{AppendReport, ImageRef, PipelineError, SheetSink, Table};
use snapsheet_media::{detect_mime_type, sniff_image_mime, ImageStore};
use snapsheet_understanding::{TableFormatter, TextExtractor};
use tokio::sync::Mutex;
use tracing::{error, info};

/// Result of one successful run.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub image: ImageRef,
    pub text: String,
    pub table: Table,
    pub report: AppendReport,
}

/// Drives image → text → table → sheet for one image at a time.
///
/// Runs never overlap: the sheet is cleared at the start of each write, so
/// two interleaved runs would leave a mix of both tables behind.
pub struct Pipeline {
    store: ImageStore,
    extractor: TextExtractor,
    formatter: TableFormatter,
    sink: Arc<dyn SheetSink>,
    run_lock: Mutex<()>,
}

impl Pipeline {
    pub fn new(
        store: ImageStore,
        extractor: TextExtractor,
        formatter: TableFormatter,
        sink: Arc<dyn SheetSink>,
    ) -> Self {
        Self { store, extractor, formatter, sink, run_lock: Mutex::new(()) }
    }

    /// Store freshly received image bytes, then process them.
    pub async fn save_and_run(&self, data: Bytes) -> Result<PipelineOutcome, PipelineError> {
        let image = self.store.save(&data, Local::now()).await?;
        self.run(image, Some(data)).await
    }

    /// Process the most recently modified image in the store.
    pub async fn run_latest(&self) -> Result<PipelineOutcome, PipelineError> {
        let image = self.store.latest().await?;
        self.run(image, None).await
    }

    /// Process an image already on disk.
    pub async fn run_image(&self, image: ImageRef) -> Result<PipelineOutcome, PipelineError> {
        self.run(image, None).await
    }

    async fn run(&self, image: ImageRef, data: Option<Bytes>) -> Result<PipelineOutcome, PipelineError> {
        let _guard = self.run_lock.lock().await;
        let started = Instant::now();

        let data = match data {
            Some(data) => data,
            None => self.store.read(&image).await?,
        };
        let mime_type = sniff_image_mime(&data).unwrap_or_else(|| detect_mime_type(image.path()));
        info!(image = %image, mime_type, "Processing image");

        let text = self.extractor.extract(data, mime_type).await?;
        info!(image = %image, chars = text.chars().count(), "Extracted text");

        let table = self.formatter.format(&text).await?;
        info!(image = %image, rows = table.len(), "Formatted table");

        let header = table.sheet_header();
        let rows = table.sheet_rows(Local::now(), &image);
        let report = self.sink.replace_contents(&header, rows).await.map_err(|e| {
            error!(image = %image, error = %format!("{e:#}"), "Spreadsheet write failed");
            PipelineError::Spreadsheet(format!("{e:#}"))
        })?;

        info!(
            image = %image,
            rows = report.rows_written(),
            failed = report.rows_failed(),
            latency_ms = started.elapsed().as_millis() as u64,
            "Pipeline run complete"
        );
        Ok(PipelineOutcome { image, text, table, report })
    }
}

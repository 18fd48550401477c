use thiserror::Error;

/// Failure of one stage of the image → text → table → sheet pipeline.
///
/// Each variant names the stage that stopped the run; callers pick the
/// HTTP status and the reply text from it.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no image files found in {0}")]
    ImageNotFound(String),

    #[error("image storage error: {0}")]
    Storage(String),

    #[error("text extraction failed: {0}")]
    Extraction(String),

    #[error("text extraction returned no text")]
    EmptyExtraction,

    #[error("table formatting failed: {0}")]
    Formatting(String),

    #[error("table formatting produced no rows")]
    EmptyTable,

    #[error("spreadsheet write failed: {0}")]
    Spreadsheet(String),
}

impl PipelineError {
    /// HTTP status code for operator-facing endpoints.
    pub fn status_code(&self) -> u16 {
        match self {
            PipelineError::ImageNotFound(_) => 404,
            _ => 500,
        }
    }

    /// True when the run stopped before reaching the spreadsheet.
    pub fn is_recognition_failure(&self) -> bool {
        matches!(
            self,
            PipelineError::Extraction(_)
                | PipelineError::EmptyExtraction
                | PipelineError::Formatting(_)
                | PipelineError::EmptyTable
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_image_maps_to_not_found() {
        let err = PipelineError::ImageNotFound("saved_images".into());
        assert_eq!(err.status_code(), 404);
        assert!(err.to_string().contains("saved_images"));
    }

    #[test]
    fn stage_failures_map_to_server_error() {
        assert_eq!(PipelineError::EmptyTable.status_code(), 500);
        assert_eq!(PipelineError::Spreadsheet("quota".into()).status_code(), 500);
        assert!(PipelineError::EmptyExtraction.is_recognition_failure());
        assert!(!PipelineError::Spreadsheet("x".into()).is_recognition_failure());
    }
}

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, bail};
use async_trait::async_trait;
use snapsheet_core::{GenerateRequest, GenerateResponse, GenerativeModel};

/// A model that replays canned responses in order, for tests and dry runs.
///
/// `None` entries fail the call. Once the script runs out the last entry
/// repeats.
pub struct MockModel {
    name: String,
    script: Vec<Option<String>>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Vec::new(),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.script.push(Some(response.into()));
        self
    }

    pub fn with_failure(mut self) -> Self {
        self.script.push(None);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl GenerativeModel for MockModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(request.prompt.clone());
        }
        let entry = self.script.get(call).or(self.script.last()).cloned().flatten();
        match entry {
            Some(text) => Ok(GenerateResponse { text, model: "mock".to_string(), latency_ms: 0 }),
            None => bail!("mock model {} failed", self.name),
        }
    }
}

use async_trait::async_trait;
use parking_lot::Mutex;
use promptline_core::{EnumFetcher, TransportError};
use promptline_protocol::EnumOption;
use std::collections::HashMap;

/// Enum fetcher serving fixed options per URL; unknown URLs fail with 404.
#[derive(Debug, Default)]
pub struct StubEnumFetcher {
    options: HashMap<String, Vec<EnumOption>>,
    fetched: Mutex<Vec<String>>,
}

impl StubEnumFetcher {
    pub fn with_options(mut self, url: impl Into<String>, options: Vec<EnumOption>) -> Self {
        self.options.insert(url.into(), options);
        self
    }

    /// URLs requested so far.
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().clone()
    }
}

#[async_trait]
impl EnumFetcher for StubEnumFetcher {
    async fn fetch_options(&self, url: &str) -> Result<Vec<EnumOption>, TransportError> {
        self.fetched.lock().push(url.to_string());
        self.options
            .get(url)
            .cloned()
            .ok_or(TransportError::Status(404))
    }
}

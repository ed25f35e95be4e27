//! Stub provider for builds without the `browser` feature.

use anyhow::Result;
use async_trait::async_trait;

use crate::browser::{BrowserProvider, PageHandle};
use crate::config::BrowserSettings;
use crate::proxy::ProxyEndpoint;

pub struct ChromiumProvider;

impl ChromiumProvider {
    pub fn new(_settings: BrowserSettings) -> Self {
        Self
    }
}

#[async_trait]
impl BrowserProvider for ChromiumProvider {
    async fn new_page(&self, _proxy: Option<&ProxyEndpoint>) -> Result<Box<dyn PageHandle>> {
        Err(anyhow::anyhow!(
            "Browser support not compiled. Rebuild with: cargo build --features browser"
        ))
    }
}

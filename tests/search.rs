//! Top-level collect_records fan-out over scripted sessions.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use websift::browser::{BrowserProvider, PageHandle};
use websift::error::{Error, NavigateError};
use websift::proxy::ProxyEndpoint;
use websift::{collect_records, Fetcher, PipelineConfig, ReadinessStrategy, RecordKind};

/// Serves a fixed body per URL.
struct SiteProvider {
    pages: HashMap<String, String>,
}

#[async_trait]
impl BrowserProvider for SiteProvider {
    async fn new_page(&self, _proxy: Option<&ProxyEndpoint>) -> Result<Box<dyn PageHandle>> {
        Ok(Box::new(SitePage {
            pages: self.pages.clone(),
            current: Mutex::new(None),
        }))
    }
}

struct SitePage {
    pages: HashMap<String, String>,
    current: Mutex<Option<String>>,
}

#[async_trait]
impl PageHandle for SitePage {
    async fn navigate(
        &self,
        url: &str,
        _strategy: ReadinessStrategy,
        _timeout: Duration,
    ) -> Result<(), NavigateError> {
        *self.current.lock().unwrap() = Some(url.to_string());
        Ok(())
    }

    async fn content(&self) -> Result<String> {
        let current = self.current.lock().unwrap();
        let url = current.as_deref().unwrap_or_default();
        Ok(self.pages.get(url).cloned().unwrap_or_default())
    }

    async fn close(self: Box<Self>) {}
}

fn web_page() -> String {
    r#"<html><body><article>
        <div><div><div>
            <a data-testid="result-extras-url-link" href="https://example.com/"><div>example.com</div></a>
            <p>Example Site</p>
        </div></div></div>
        <a data-testid="result-title-a" href="https://example.com/"><span>Example Title</span></a>
        <div data-result="snippet"><span>Example snippet</span></div>
    </article></body></html>"#
        .to_string()
}

fn news_page() -> String {
    r#"<html><body><article><div>
        <a href="https://news.test/story">Story</a>
        <h2>Story</h2>
        <span>Example Wire</span>
        <div>4 hours ago</div>
        <p>Details emerged today.</p>
    </div></article></body></html>"#
        .to_string()
}

fn test_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.navigation.settle_delay_ms = 0;
    config
}

#[tokio::test(start_paused = true)]
async fn collects_records_across_kinds_in_request_order() {
    let provider = SiteProvider {
        pages: HashMap::from([
            ("https://ddg.test/web".to_string(), web_page()),
            ("https://ddg.test/news".to_string(), news_page()),
        ]),
    };
    let fetcher = Fetcher::with_pool(provider, test_config(), None);

    let records = collect_records(
        &fetcher,
        &[
            (RecordKind::Web, "https://ddg.test/web".to_string()),
            (RecordKind::News, "https://ddg.test/news".to_string()),
        ],
        false,
    )
    .await
    .unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].kind, RecordKind::Web);
    assert_eq!(records[0].title.as_deref(), Some("Example Title"));
    assert_eq!(records[1].kind, RecordKind::News);
    assert_eq!(records[1].link.as_deref(), Some("https://news.test/story"));
    assert_eq!(records[1].relative_time.as_deref(), Some("4 hours ago"));
}

#[tokio::test(start_paused = true)]
async fn unsupported_kind_fails_the_whole_call() {
    let provider = SiteProvider {
        pages: HashMap::from([("https://ddg.test/images".to_string(), web_page())]),
    };
    let fetcher = Fetcher::with_pool(provider, test_config(), None);

    let err = collect_records(
        &fetcher,
        &[(RecordKind::Images, "https://ddg.test/images".to_string())],
        false,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Extract(_)));
}

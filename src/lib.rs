//! websift — resilient browser-based page fetching, HTML distillation,
//! and search record extraction.
//!
//! The pipeline drives a headless browser through layered navigation
//! retries and a rotating, credential-masked proxy pool, reduces the
//! rendered HTML to its semantic core, and maps `<article>` fragments
//! into typed [`SearchRecord`]s.
//!
//! ```no_run
//! use websift::{collect_records, ChromiumProvider, Fetcher, PipelineConfig, RecordKind};
//!
//! # async fn run() -> Result<(), websift::Error> {
//! let config = PipelineConfig::default();
//! let provider = ChromiumProvider::new(config.browser.clone());
//! let fetcher = Fetcher::new(provider, config);
//!
//! let records = collect_records(
//!     &fetcher,
//!     &[(RecordKind::Web, "https://duckduckgo.com/?q=rust".to_string())],
//!     false,
//! )
//! .await?;
//! # Ok(())
//! # }
//! ```

pub mod backoff;
pub mod browser;
pub mod config;
pub mod distill;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod proxy;
pub mod search;

pub use backoff::BackoffPolicy;
pub use browser::{BrowserProvider, ChromiumProvider, PageHandle, ReadinessStrategy};
pub use config::{BrowserSettings, FetchSettings, NavigationSettings, PipelineConfig, ProxySettings};
pub use distill::{
    analyze_structure, distill, distill_structure_only, distill_ultra_minimal, DistillConfig,
    DistillationResult, RemovalCounts, StructureAnalysis,
};
pub use error::{Error, ExtractError, FetchError, NavigationError, ProxyError};
pub use extract::{extract, RecordKind, SearchRecord};
pub use fetch::{FetchOutcome, Fetcher};
pub use proxy::{MaskedProxyView, ProxyEndpoint, ProxyPool, ProxyProber};
pub use search::collect_records;

//! Proxy pool selection and validation behavior with a scripted prober.

use std::io::Write;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::NamedTempFile;
use websift::config::ProxySettings;
use websift::error::{ProbeError, ProxyError};
use websift::proxy::{ProxyEndpoint, ProxyPool, ProxyProber};

const BAD_LINE: &str = "10.0.0.1:8080:baduser:badpass";
const GOOD_LINE: &str = "10.0.0.2:8080:gooduser:goodpass";

/// Probes succeed only for one configured address.
struct ScriptedProber {
    valid_address: &'static str,
}

#[async_trait]
impl ProxyProber for ScriptedProber {
    async fn probe(
        &self,
        endpoint: &ProxyEndpoint,
        _probe_url: &str,
    ) -> Result<String, ProbeError> {
        if endpoint.address == self.valid_address {
            Ok("198.51.100.7".to_string())
        } else {
            Err(ProbeError::Transport("connection refused".to_string()))
        }
    }
}

/// Prober that must never be reached.
struct PanickingProber;

#[async_trait]
impl ProxyProber for PanickingProber {
    async fn probe(&self, _: &ProxyEndpoint, _: &str) -> Result<String, ProbeError> {
        panic!("probe called for unvalidated selection");
    }
}

fn pool_file(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    file
}

fn settings(file: &NamedTempFile, max_attempts: u32) -> ProxySettings {
    ProxySettings {
        pool_file: file.path().to_path_buf(),
        max_attempts,
        base_delay_ms: 10,
        max_delay_ms: 80,
        ..ProxySettings::default()
    }
}

#[tokio::test(start_paused = true)]
async fn validated_selection_never_returns_a_failing_endpoint() {
    let file = pool_file(&[BAD_LINE, GOOD_LINE]);
    // A generous budget makes an all-bad-draws run impossible in
    // practice for any seed.
    let pool = ProxyPool::with_prober(
        &settings(&file, 32),
        Box::new(ScriptedProber {
            valid_address: "10.0.0.2:8080",
        }),
    );

    for seed in 0..10 {
        let mut rng = StdRng::seed_from_u64(seed);
        let endpoint = pool.select_with_rng(&mut rng, true).await.unwrap();
        assert_eq!(endpoint.address, "10.0.0.2:8080");
        assert_eq!(endpoint.username, "gooduser");
    }
}

#[tokio::test(start_paused = true)]
async fn validation_budget_exhaustion_reports_attempts_and_last_error() {
    let file = pool_file(&[BAD_LINE]);
    let pool = ProxyPool::with_prober(
        &settings(&file, 5),
        Box::new(ScriptedProber {
            valid_address: "10.9.9.9:1",
        }),
    );

    let mut rng = StdRng::seed_from_u64(7);
    let err = pool.select_with_rng(&mut rng, true).await.unwrap_err();
    match err {
        ProxyError::Validation {
            attempts,
            last_error,
        } => {
            assert_eq!(attempts, 5);
            assert!(matches!(*last_error, ProxyError::ProbeFailed { .. }));
        }
        other => panic!("expected Validation, got {other:?}"),
    }
}

#[tokio::test]
async fn unvalidated_selection_skips_probing() {
    let file = pool_file(&[GOOD_LINE]);
    let pool = ProxyPool::with_prober(&settings(&file, 5), Box::new(PanickingProber));

    let endpoint = pool.select(false).await.unwrap();
    assert_eq!(endpoint.address, "10.0.0.2:8080");
}

#[tokio::test]
async fn malformed_line_is_a_selection_time_error() {
    let file = pool_file(&["10.0.0.1:8080:only-three"]);
    let pool = ProxyPool::with_prober(&settings(&file, 5), Box::new(PanickingProber));

    let err = pool.select(false).await.unwrap_err();
    assert!(matches!(err, ProxyError::MalformedLine { fields: 3 }));
}

#[tokio::test]
async fn empty_pool_file_is_rejected() {
    let file = pool_file(&[]);
    let pool = ProxyPool::with_prober(&settings(&file, 5), Box::new(PanickingProber));

    let err = pool.select(false).await.unwrap_err();
    assert!(matches!(err, ProxyError::EmptyPool));
}

#[tokio::test]
async fn missing_pool_file_surfaces_io_error() {
    let settings = ProxySettings {
        pool_file: "/nonexistent/proxies.txt".into(),
        ..ProxySettings::default()
    };
    let pool = ProxyPool::with_prober(&settings, Box::new(PanickingProber));

    let err = pool.select(false).await.unwrap_err();
    assert!(matches!(err, ProxyError::Io(_)));
}

#[tokio::test(start_paused = true)]
async fn validation_error_messages_stay_masked() {
    let file = pool_file(&["203.0.113.42:8080:alice123:s3cr3t!"]);
    let pool = ProxyPool::with_prober(
        &settings(&file, 2),
        Box::new(ScriptedProber {
            valid_address: "10.9.9.9:1",
        }),
    );

    let mut rng = StdRng::seed_from_u64(1);
    let err = pool.select_with_rng(&mut rng, true).await.unwrap_err();
    let chain = format!("{err} {:?}", err);
    assert!(!chain.contains("alice123"));
    assert!(!chain.contains("s3cr3t!"));
    assert!(!chain.contains("113.42"));
}

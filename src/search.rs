//! Top-level fan-out: fetch, distill, and extract several result pages
//! concurrently.

use futures::future::join_all;
use tracing::{debug, info};

use crate::browser::BrowserProvider;
use crate::distill::{distill, DistillConfig};
use crate::error::Error;
use crate::extract::{extract, RecordKind, SearchRecord};
use crate::fetch::Fetcher;

/// Fetch each requested page, distill it with the default config, and
/// extract its records. Requests run concurrently; results are
/// concatenated in request order. The first failure fails the call.
pub async fn collect_records<P: BrowserProvider>(
    fetcher: &Fetcher<P>,
    requests: &[(RecordKind, String)],
    use_proxy: bool,
) -> Result<Vec<SearchRecord>, Error> {
    let distill_config = DistillConfig::default();

    let results = join_all(requests.iter().map(|(kind, url)| {
        let distill_config = &distill_config;
        async move {
            info!(kind = %kind, url = %url, "collecting records");
            let outcome = fetcher.fetch(url, use_proxy).await?;
            let distilled = distill(&outcome.html, distill_config);
            debug!(
                kind = %kind,
                original_bytes = distilled.original_size,
                cleaned_bytes = distilled.cleaned_size,
                ratio = distilled.compression_ratio,
                "distilled result page"
            );
            let records = extract(*kind, &distilled.cleaned_html).await?;
            info!(kind = %kind, records = records.len(), "extracted records");
            Ok::<_, Error>(records)
        }
    }))
    .await;

    let mut all = Vec::new();
    for result in results {
        all.extend(result?);
    }
    Ok(all)
}

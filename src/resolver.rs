//! Resolves one entity name to its dataset count, memoized.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::CountCache;
use crate::client::CatalogApi;
use crate::error::FetchError;
use crate::retry::{run_with_retry, RetryPolicy};

/// Per-entity count resolution over the catalog search endpoint.
///
/// Infallible by contract: blank names and absorbed failures resolve to 0 so
/// one ailing entity can never abort a whole dashboard. Successful lookups
/// are written through to the shared [`CountCache`]; failures are not, so the
/// next request tries the upstream again.
pub struct CountResolver<C> {
    api: Arc<C>,
    cache: CountCache,
    retry: RetryPolicy,
}

impl<C: CatalogApi> CountResolver<C> {
    pub fn new(api: Arc<C>, cache: CountCache, retry: RetryPolicy) -> Self {
        CountResolver { api, cache, retry }
    }

    pub async fn resolve(&self, name: &str) -> u64 {
        let name = name.trim();
        if name.is_empty() {
            debug!("[RESOLVE] Blank entity name, counting zero datasets");
            return 0;
        }

        if let Some(count) = self.cache.get(name) {
            debug!(entity = name, count, "[RESOLVE] Cache hit");
            return count;
        }

        let searched = run_with_retry(self.retry, FetchError::is_retryable, || {
            self.api.search_count(name)
        })
        .await;

        match searched {
            Ok(answer) => {
                if !answer.success {
                    debug!(
                        entity = name,
                        "[RESOLVE] Catalog flagged the search unsuccessful, keeping reported count"
                    );
                }
                let count = answer.result.map(|result| result.count).unwrap_or(0);
                self.cache.insert(name, count);
                debug!(entity = name, count, "[RESOLVE] Resolved dataset count");
                count
            }
            Err(exhausted) => {
                warn!(
                    entity = name,
                    attempts = exhausted.attempts,
                    error = %exhausted.source,
                    "[RESOLVE] Could not resolve dataset count, degrading to zero"
                );
                0
            }
        }
    }
}

//! Loads the ministry hierarchy from the static departments document.

use std::sync::Arc;

use tracing::{error, info};

use crate::client::CatalogApi;
use crate::error::{AggregateError, FetchError};
use crate::model::Department;
use crate::retry::{run_with_retry, RetryPolicy};

pub struct HierarchyLoader<C> {
    api: Arc<C>,
    retry: RetryPolicy,
}

impl<C: CatalogApi> HierarchyLoader<C> {
    pub fn new(api: Arc<C>, retry: RetryPolicy) -> Self {
        HierarchyLoader { api, retry }
    }

    /// Fetch and decode the hierarchy, retrying transient transport faults.
    /// Any failure here is fatal to the aggregation that asked for it.
    pub async fn load(&self) -> Result<Vec<Department>, AggregateError> {
        info!("[HIERARCHY] Loading departments document");
        let fetched = run_with_retry(self.retry, FetchError::is_retryable, || {
            self.api.fetch_departments()
        })
        .await;

        match fetched {
            Ok(document) => {
                info!(
                    departments = document.departments.len(),
                    "[HIERARCHY] Departments document loaded"
                );
                Ok(document.departments)
            }
            Err(exhausted) => {
                error!(
                    attempts = exhausted.attempts,
                    error = %exhausted.source,
                    "[HIERARCHY][ERROR] Failed to load departments document"
                );
                Err(AggregateError::from(exhausted))
            }
        }
    }
}

//! Coordinating module for the load-resolve-rank dashboard pipeline.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, error, info};

use crate::cache::CountCache;
use crate::client::CatalogApi;
use crate::error::AggregateError;
use crate::hierarchy::HierarchyLoader;
use crate::model::MinistryTotal;
use crate::resolver::CountResolver;
use crate::retry::RetryPolicy;
use crate::sink::TotalsSink;

/// Orchestrates one dashboard: load the hierarchy, resolve every entity's
/// dataset count, sum per ministry, rank by descending count.
///
/// Ministries are processed sequentially in document order; each ministry's
/// subordinates are resolved concurrently. Only one hierarchy level is
/// descended: a subordinate's own subordinates do not contribute.
pub struct DashboardAggregator<C> {
    hierarchy: HierarchyLoader<C>,
    resolver: CountResolver<C>,
}

impl<C: CatalogApi> DashboardAggregator<C> {
    pub fn new(api: Arc<C>, cache: CountCache, retry: RetryPolicy) -> Self {
        DashboardAggregator {
            hierarchy: HierarchyLoader::new(api.clone(), retry),
            resolver: CountResolver::new(api, cache, retry),
        }
    }

    /// Buffered mode: the whole ranked dashboard, or the fault that stopped
    /// it. An empty hierarchy yields an empty dashboard, not an error.
    pub async fn aggregate(&self) -> Result<Vec<MinistryTotal>, AggregateError> {
        let departments = self.hierarchy.load().await?;
        info!(
            departments = departments.len(),
            "[AGGREGATE] Resolving dataset counts"
        );

        let mut totals = Vec::with_capacity(departments.len());
        for department in &departments {
            let own = self.resolver.resolve(&department.name).await;
            let subordinate_counts = join_all(
                department
                    .subordinates
                    .iter()
                    .map(|subordinate| self.resolver.resolve(&subordinate.name)),
            )
            .await;
            let count = own + subordinate_counts.iter().sum::<u64>();
            debug!(
                ministry = %department.name,
                own,
                subordinates = department.subordinates.len(),
                count,
                "[AGGREGATE] Ministry total assembled"
            );
            totals.push(MinistryTotal {
                name: department.name.clone(),
                count,
            });
        }

        totals.sort_by(|a, b| b.count.cmp(&a.count));
        info!(ministries = totals.len(), "[AGGREGATE] Dashboard assembled");
        Ok(totals)
    }

    /// Streaming mode: the same dashboard written to `sink` as an
    /// incrementally flushed JSON array.
    ///
    /// If aggregation fails before anything is written the sink sees
    /// `fail(fault, false)` and no framing at all. Once framing has started,
    /// a sink failure stops the stream where it is: `fail(fault, true)` is
    /// the signal that the output is truncated.
    pub async fn aggregate_streaming<S: TotalsSink>(
        &self,
        sink: &mut S,
    ) -> Result<(), AggregateError> {
        let totals = match self.aggregate().await {
            Ok(totals) => totals,
            Err(fault) => {
                error!(
                    error = %fault,
                    "[AGGREGATE][ERROR] Aggregation failed before streaming began"
                );
                sink.fail(&fault, false).await;
                return Err(fault);
            }
        };

        if let Err(e) = sink.begin().await {
            let fault = AggregateError::SinkWrite {
                written: 0,
                source: e,
            };
            error!(error = %fault, "[AGGREGATE][ERROR] Sink rejected the array opening");
            sink.fail(&fault, false).await;
            return Err(fault);
        }

        let mut written = 0usize;
        for total in &totals {
            if let Err(e) = sink.element(total).await {
                let fault = AggregateError::SinkWrite { written, source: e };
                error!(
                    written,
                    error = %fault,
                    "[AGGREGATE][ERROR] Streaming sink failed mid-array"
                );
                sink.fail(&fault, true).await;
                return Err(fault);
            }
            written += 1;
        }

        if let Err(e) = sink.end().await {
            let fault = AggregateError::SinkWrite { written, source: e };
            error!(error = %fault, "[AGGREGATE][ERROR] Sink rejected the array closing");
            sink.fail(&fault, true).await;
            return Err(fault);
        }

        info!(ministries = written, "[AGGREGATE] Dashboard streamed");
        Ok(())
    }
}

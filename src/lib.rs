#![doc = "govdata-dashboard: ranked per-ministry dataset counts from the GovData catalog."]

//! The pipeline: load the ministry hierarchy from a static JSON document,
//! resolve each entity's dataset count against the catalog search API
//! (memoized, retried under backoff), sum ministries with their subordinates
//! and rank by descending count. The result is served buffered or streamed
//! as an incrementally flushed JSON array.
//!
//! # Usage
//! The binary calls [`run`]; tests compose the modules directly against a
//! mocked [`client::CatalogApi`].

pub mod aggregate;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod hierarchy;
pub mod http;
pub mod model;
pub mod resolver;
pub mod retry;
pub mod sink;

use std::sync::Arc;

use anyhow::Result;

/// Wire the service from the environment and serve it until shutdown.
pub async fn run() -> Result<()> {
    let config = config::AppConfig::from_env()?;
    config.trace_loaded();

    let client = client::CatalogClient::new(
        config.departments_url.clone(),
        config.search_url.clone(),
        config.request_timeout,
    )?;
    let aggregator = Arc::new(aggregate::DashboardAggregator::new(
        Arc::new(client),
        cache::CountCache::new(),
        config.retry,
    ));

    http::serve(config.bind_addr, aggregator).await
}

//! # CatalogApi: seam for the two upstream endpoints
//!
//! This module defines a single trait ([`CatalogApi`]) covering both remote
//! calls the dashboard depends on: fetching the static departments document
//! and querying the catalog search endpoint for one entity's dataset count.
//!
//! ## Interface & Extensibility
//! - Implement [`CatalogApi`] to plug in a real client, a fixture, or a mock.
//! - All methods are async and return [`FetchError`] so callers can classify
//!   the failure without knowing the transport.
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall` so the test suite can generate
//!   deterministic mocks; see the integration tests for usage.

use std::time::Duration;

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use tracing::{debug, error};

use crate::error::FetchError;
use crate::model::{DepartmentsDocument, SearchResponse};

/// The two upstream exchanges the dashboard needs.
///
/// Implemented by [`CatalogClient`] for real use and by generated mocks in
/// tests. `Send + Sync` so one instance can serve concurrent resolutions.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Fetch and decode the organizational hierarchy document.
    async fn fetch_departments(&self) -> Result<DepartmentsDocument, FetchError>;

    /// Query the catalog for the number of datasets matching `name`.
    async fn search_count(&self, name: &str) -> Result<SearchResponse, FetchError>;
}

/// Real client over `reqwest`, one shared connection pool, fixed per-request
/// timeout. A timed-out request counts as "no response" for classification.
pub struct CatalogClient {
    http: reqwest::Client,
    departments_url: String,
    search_url: String,
}

impl CatalogClient {
    pub fn new(
        departments_url: String,
        search_url: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        tracing::info!(
            departments_url = %departments_url,
            search_url = %search_url,
            timeout_ms = timeout.as_millis() as u64,
            "Initialized catalog client"
        );
        Ok(CatalogClient {
            http,
            departments_url,
            search_url,
        })
    }
}

#[async_trait]
impl CatalogApi for CatalogClient {
    async fn fetch_departments(&self) -> Result<DepartmentsDocument, FetchError> {
        debug!(url = %self.departments_url, "[FETCH] Requesting departments document");
        let response = match self.http.get(&self.departments_url).send().await {
            Ok(response) => response,
            Err(e) => {
                error!(error = ?e, "[FETCH][ERROR] Departments request produced no response");
                return Err(classify_send_error("fetch departments", e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            error!(
                status = status.as_u16(),
                "[FETCH][ERROR] Departments endpoint answered non-success status"
            );
            return Err(FetchError::Status {
                context: "fetch departments",
                status: status.as_u16(),
            });
        }

        match response.json::<DepartmentsDocument>().await {
            Ok(document) => {
                debug!(
                    departments = document.departments.len(),
                    "[FETCH] Departments document decoded"
                );
                Ok(document)
            }
            Err(e) => {
                error!(error = ?e, "[FETCH][ERROR] Departments document failed to decode");
                Err(FetchError::Decode {
                    context: "fetch departments",
                    source: Box::new(e),
                })
            }
        }
    }

    async fn search_count(&self, name: &str) -> Result<SearchResponse, FetchError> {
        debug!(entity = name, "[FETCH] Querying catalog search");
        let request = self.http.get(&self.search_url).query(&[("q", name)]);
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                error!(entity = name, error = ?e, "[FETCH][ERROR] Search request produced no response");
                return Err(classify_send_error("search datasets", e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            error!(
                entity = name,
                status = status.as_u16(),
                "[FETCH][ERROR] Search endpoint answered non-success status"
            );
            return Err(FetchError::Status {
                context: "search datasets",
                status: status.as_u16(),
            });
        }

        match response.json::<SearchResponse>().await {
            Ok(answer) => Ok(answer),
            Err(e) => {
                error!(entity = name, error = ?e, "[FETCH][ERROR] Search answer failed to decode");
                Err(FetchError::Decode {
                    context: "search datasets",
                    source: Box::new(e),
                })
            }
        }
    }
}

/// An error out of `send()` means no usable response exists: builder errors
/// never reached the network, everything else died in transit.
fn classify_send_error(context: &'static str, err: reqwest::Error) -> FetchError {
    if err.is_builder() {
        FetchError::Request {
            context,
            source: Box::new(err),
        }
    } else {
        FetchError::NoResponse {
            context,
            source: Box::new(err),
        }
    }
}

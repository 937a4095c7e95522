use std::sync::Arc;
use std::time::Duration;

use govdata_dashboard::aggregate::DashboardAggregator;
use govdata_dashboard::cache::CountCache;
use govdata_dashboard::client::MockCatalogApi;
use govdata_dashboard::error::{AggregateError, FetchError};
use govdata_dashboard::model::{
    Department, DepartmentsDocument, MinistryTotal, SearchResponse, SearchResult,
};
use govdata_dashboard::retry::RetryPolicy;

fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_delay: Duration::from_millis(1),
    }
}

fn dept(name: &str, subordinates: &[&str]) -> Department {
    Department {
        name: name.to_string(),
        subordinates: subordinates
            .iter()
            .map(|subordinate| Department {
                name: subordinate.to_string(),
                subordinates: vec![],
            })
            .collect(),
    }
}

fn search_hit(count: u64) -> SearchResponse {
    SearchResponse {
        success: true,
        result: Some(SearchResult { count }),
    }
}

fn expect_count(api: &mut MockCatalogApi, name: &'static str, count: u64) {
    api.expect_search_count()
        .withf(move |queried| queried == name)
        .times(1)
        .returning(move |_| Ok(search_hit(count)));
}

fn aggregator(api: MockCatalogApi, retry: RetryPolicy) -> DashboardAggregator<MockCatalogApi> {
    DashboardAggregator::new(Arc::new(api), CountCache::new(), retry)
}

#[tokio::test]
async fn ministry_totals_include_subordinate_counts() {
    let mut api = MockCatalogApi::new();
    let doc = DepartmentsDocument {
        departments: vec![dept("Ministry A", &["Agency A1", "Agency A2"])],
    };
    api.expect_fetch_departments()
        .times(1)
        .returning(move || Ok(doc.clone()));
    expect_count(&mut api, "Ministry A", 10);
    expect_count(&mut api, "Agency A1", 3);
    expect_count(&mut api, "Agency A2", 5);

    let totals = aggregator(api, fast_policy(2))
        .aggregate()
        .await
        .expect("aggregation should succeed");
    assert_eq!(
        totals,
        vec![MinistryTotal {
            name: "Ministry A".into(),
            count: 18,
        }]
    );
}

#[tokio::test]
async fn one_failing_subordinate_does_not_abort_the_ministry() {
    let mut api = MockCatalogApi::new();
    let doc = DepartmentsDocument {
        departments: vec![dept("Ministry A", &["Agency A1", "Agency A2"])],
    };
    api.expect_fetch_departments()
        .times(1)
        .returning(move || Ok(doc.clone()));
    expect_count(&mut api, "Ministry A", 10);
    api.expect_search_count()
        .withf(|name| name == "Agency A1")
        .times(1)
        .returning(|_| {
            Err(FetchError::Status {
                context: "search datasets",
                status: 404,
            })
        });
    expect_count(&mut api, "Agency A2", 5);

    let totals = aggregator(api, fast_policy(2))
        .aggregate()
        .await
        .expect("a failing subordinate must not abort aggregation");
    assert_eq!(
        totals,
        vec![MinistryTotal {
            name: "Ministry A".into(),
            count: 15,
        }],
        "the failed subordinate contributes zero, its siblings still count"
    );
}

#[tokio::test]
async fn totals_are_sorted_descending_with_stable_ties() {
    let mut api = MockCatalogApi::new();
    let doc = DepartmentsDocument {
        departments: vec![
            dept("Culture", &[]),
            dept("Transport", &[]),
            dept("Health", &[]),
            dept("Finance", &[]),
        ],
    };
    api.expect_fetch_departments()
        .times(1)
        .returning(move || Ok(doc.clone()));
    expect_count(&mut api, "Culture", 3);
    expect_count(&mut api, "Transport", 7);
    expect_count(&mut api, "Health", 3);
    expect_count(&mut api, "Finance", 9);

    let totals = aggregator(api, fast_policy(2))
        .aggregate()
        .await
        .expect("aggregation should succeed");
    let names: Vec<&str> = totals.iter().map(|total| total.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["Finance", "Transport", "Culture", "Health"],
        "descending by count, document order preserved on ties"
    );
}

#[tokio::test]
async fn empty_hierarchy_yields_an_empty_dashboard() {
    let mut api = MockCatalogApi::new();
    api.expect_fetch_departments()
        .times(1)
        .returning(|| Ok(DepartmentsDocument { departments: vec![] }));

    let totals = aggregator(api, fast_policy(2))
        .aggregate()
        .await
        .expect("an empty hierarchy is not an error");
    assert!(totals.is_empty());
}

#[tokio::test]
async fn grand_total_equals_the_sum_of_raw_counts() {
    let mut api = MockCatalogApi::new();
    let doc = DepartmentsDocument {
        departments: vec![
            dept("Ministry A", &["Agency A1", "Agency A2"]),
            dept("Ministry B", &["Agency B1"]),
        ],
    };
    api.expect_fetch_departments()
        .times(1)
        .returning(move || Ok(doc.clone()));
    expect_count(&mut api, "Ministry A", 1);
    expect_count(&mut api, "Agency A1", 2);
    expect_count(&mut api, "Agency A2", 3);
    expect_count(&mut api, "Ministry B", 10);
    expect_count(&mut api, "Agency B1", 4);

    let totals = aggregator(api, fast_policy(2))
        .aggregate()
        .await
        .expect("aggregation should succeed");

    let grand_total: u64 = totals.iter().map(|total| total.count).sum();
    assert_eq!(grand_total, 1 + 2 + 3 + 10 + 4);
    assert_eq!(
        totals,
        vec![
            MinistryTotal {
                name: "Ministry B".into(),
                count: 14,
            },
            MinistryTotal {
                name: "Ministry A".into(),
                count: 6,
            },
        ]
    );
}

#[tokio::test]
async fn a_subordinate_shared_by_two_ministries_is_resolved_once() {
    let mut api = MockCatalogApi::new();
    let doc = DepartmentsDocument {
        departments: vec![
            dept("Ministry X", &["Shared Agency"]),
            dept("Ministry Y", &["Shared Agency"]),
        ],
    };
    api.expect_fetch_departments()
        .times(1)
        .returning(move || Ok(doc.clone()));
    expect_count(&mut api, "Ministry X", 1);
    expect_count(&mut api, "Ministry Y", 2);
    // times(1): the second ministry must be served from the cache.
    expect_count(&mut api, "Shared Agency", 4);

    let totals = aggregator(api, fast_policy(2))
        .aggregate()
        .await
        .expect("aggregation should succeed");
    assert_eq!(
        totals,
        vec![
            MinistryTotal {
                name: "Ministry Y".into(),
                count: 6,
            },
            MinistryTotal {
                name: "Ministry X".into(),
                count: 5,
            },
        ]
    );
}

#[tokio::test]
async fn aggregation_descends_exactly_one_level() {
    let mut api = MockCatalogApi::new();
    let doc = DepartmentsDocument {
        departments: vec![Department {
            name: "Ministry A".into(),
            subordinates: vec![Department {
                name: "Agency A1".into(),
                subordinates: vec![Department {
                    name: "Deep Agency".into(),
                    subordinates: vec![],
                }],
            }],
        }],
    };
    api.expect_fetch_departments()
        .times(1)
        .returning(move || Ok(doc.clone()));
    expect_count(&mut api, "Ministry A", 2);
    expect_count(&mut api, "Agency A1", 3);
    // No expectation for "Deep Agency": resolving it would panic the test.

    let totals = aggregator(api, fast_policy(2))
        .aggregate()
        .await
        .expect("aggregation should succeed");
    assert_eq!(
        totals,
        vec![MinistryTotal {
            name: "Ministry A".into(),
            count: 5,
        }],
        "a subordinate's own subordinates do not contribute"
    );
}

#[tokio::test]
async fn hierarchy_fetch_failure_is_fatal() {
    let mut api = MockCatalogApi::new();
    api.expect_fetch_departments().times(2).returning(|| {
        Err(FetchError::NoResponse {
            context: "fetch departments",
            source: "connect timeout".into(),
        })
    });

    let fault = aggregator(api, fast_policy(2))
        .aggregate()
        .await
        .expect_err("a hierarchy failure must abort the aggregation");
    match fault {
        AggregateError::UpstreamUnavailable { attempts, .. } => {
            assert_eq!(attempts, 2, "the whole retry budget is spent first")
        }
        other => panic!("expected UpstreamUnavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn hierarchy_client_error_relays_the_status_without_retry() {
    let mut api = MockCatalogApi::new();
    api.expect_fetch_departments().times(1).returning(|| {
        Err(FetchError::Status {
            context: "fetch departments",
            status: 403,
        })
    });

    let fault = aggregator(api, fast_policy(3))
        .aggregate()
        .await
        .expect_err("a 4xx from the hierarchy endpoint must abort");
    assert!(
        matches!(fault, AggregateError::UpstreamRejected { status: 403 }),
        "expected UpstreamRejected, got {fault:?}"
    );
    assert_eq!(fault.status_code(), 403);
}

#[tokio::test]
async fn hierarchy_decode_failure_reports_a_malformed_response() {
    let mut api = MockCatalogApi::new();
    api.expect_fetch_departments().times(1).returning(|| {
        Err(FetchError::Decode {
            context: "fetch departments",
            source: "missing field `departments`".into(),
        })
    });

    let fault = aggregator(api, fast_policy(3))
        .aggregate()
        .await
        .expect_err("an undecodable hierarchy body must abort");
    assert!(
        matches!(fault, AggregateError::MalformedResponse { .. }),
        "expected MalformedResponse, got {fault:?}"
    );
    assert_eq!(fault.status_code(), 500);
}

use serde::{Deserialize, Serialize};

/// One node of the organizational hierarchy: a ministry or a subordinate
/// agency. Subordinates use the same shape, so deeper nesting parses, but
/// aggregation only descends one level below a ministry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Department {
    pub name: String,
    #[serde(default)]
    pub subordinates: Vec<Department>,
}

/// The hierarchy document as served by the static departments endpoint.
/// The `departments` field is required; a body without it is malformed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DepartmentsDocument {
    pub departments: Vec<Department>,
}

/// Answer of the catalog search endpoint. Deliberately permissive: the
/// `success` flag is carried but not enforced, and a missing `result` or
/// `count` reads as zero datasets.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub success: bool,
    pub result: Option<SearchResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub count: u64,
}

/// One row of the finished dashboard: a ministry with its aggregate dataset
/// count (own datasets plus all immediate subordinates'). Field order is the
/// wire order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinistryTotal {
    pub name: String,
    pub count: u64,
}

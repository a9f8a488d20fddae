use serde::{Deserialize, Serialize};

use super::repo_types::{Feature, ReviewSummary, Trail, TrailPoint, TrailSummary};

#[derive(Debug, Deserialize)]
pub struct TrailQuery {
    pub difficulty: Option<String>,
    pub min_length: Option<f64>,
    pub max_length: Option<f64>,
    pub location_id: Option<i64>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize)]
pub struct TrailListResponse {
    pub trails: Vec<TrailSummary>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub has_more: bool,
    pub authenticated: bool,
}

#[derive(Debug, Serialize)]
pub struct TrailDetails {
    #[serde(flatten)]
    pub summary: TrailSummary,
    pub points: Vec<TrailPoint>,
    pub features: Vec<Feature>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviews: Option<ReviewSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PointInput {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub description: Option<String>,
    pub elevation: Option<f64>,
}

/// Body for creating or updating a trail. Every field is optional so
/// updates can be partial; creation checks the required ones.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrailInput {
    pub trail_name: Option<String>,
    pub location_id: Option<i64>,
    pub difficulty: Option<String>,
    pub length: Option<f64>,
    pub elevation_gain: Option<i32>,
    pub route_type: Option<String>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
    pub est_time_min: Option<i32>,
    pub est_time_max: Option<i32>,
    #[serde(default)]
    pub points: Vec<PointInput>,
    #[serde(default)]
    pub feature_ids: Vec<i64>,
    /// Ignored; the owner always comes from the session.
    pub user_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TrailCreated {
    pub message: &'static str,
    pub trail: Trail,
}

#[derive(Debug, Serialize)]
pub struct TrailUpdated {
    pub message: &'static str,
    pub trail: Trail,
}

#[derive(Debug, Serialize)]
pub struct TrailDeleted {
    pub message: &'static str,
    pub trail_id: i64,
}

#[derive(Debug, Serialize)]
pub struct PointCreated {
    pub message: &'static str,
    pub point: TrailPoint,
}

#[derive(Debug, Serialize)]
pub struct TrailPoints {
    pub trail_id: i64,
    pub points: Vec<TrailPoint>,
}

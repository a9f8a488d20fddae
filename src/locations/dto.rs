use serde::{Deserialize, Serialize};

use super::repo_types::Location;

#[derive(Debug, Deserialize)]
pub struct LocationQuery {
    pub city_id: Option<i64>,
    pub country_id: Option<i64>,
    pub name: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// Optional substring filter for countries and cities.
#[derive(Debug, Default, Deserialize)]
pub struct NameQuery {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LocationInput {
    pub location_name: Option<String>,
    pub city_id: Option<i64>,
    pub country_id: Option<i64>,
    pub coordinates: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LocationCreated {
    pub location_id: i64,
    pub message: &'static str,
    pub location: Location,
}

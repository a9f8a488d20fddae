use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::auth::policy::Ownership;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Moderate,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Moderate, Difficulty::Hard];

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Moderate => "Moderate",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_str() == s)
    }

    /// Walking minutes per kilometre used for time estimates.
    pub fn minutes_per_km(self) -> f64 {
        match self {
            Difficulty::Easy => 15.0,
            Difficulty::Moderate => 20.0,
            Difficulty::Hard => 25.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteType {
    Loop,
    #[serde(rename = "Out & back")]
    OutAndBack,
    #[serde(rename = "Point-to-point")]
    PointToPoint,
}

impl RouteType {
    pub const ALL: [RouteType; 3] = [RouteType::Loop, RouteType::OutAndBack, RouteType::PointToPoint];

    pub fn as_str(self) -> &'static str {
        match self {
            RouteType::Loop => "Loop",
            RouteType::OutAndBack => "Out & back",
            RouteType::PointToPoint => "Point-to-point",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == s)
    }
}

/// Row of `trails`.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Trail {
    pub trail_id: i64,
    pub trail_name: String,
    pub location_id: Option<i64>,
    pub difficulty: String,
    pub length: f64,
    pub elevation_gain: Option<i32>,
    pub est_time_min: i32,
    pub est_time_max: i32,
    pub route_type: String,
    pub description: Option<String>,
    pub user_id: i64,
    pub is_public: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Trail {
    pub fn ownership(&self) -> Ownership {
        Ownership {
            owner_id: self.user_id,
            is_public: self.is_public,
        }
    }
}

/// Trail joined with owner name and location name, for listings.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TrailSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub trail: Trail,
    pub username: Option<String>,
    pub location_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TrailPoint {
    pub point_id: i64,
    pub trail_id: i64,
    pub point_order: i32,
    pub latitude: f64,
    pub longitude: f64,
    pub description: Option<String>,
    pub elevation: Option<f64>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Feature {
    pub feature_id: i64,
    pub feature_name: String,
    pub description: Option<String>,
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, FromRow)]
pub struct ReviewSummary {
    pub total_reviews: i64,
    pub average_rating: Option<f64>,
    pub five_star: i64,
    pub four_star: i64,
    pub three_star: i64,
    pub two_star: i64,
    pub one_star: i64,
}

/// Filters accepted by the trail listing.
#[derive(Debug, Clone, Default)]
pub struct TrailFilter {
    pub difficulty: Option<Difficulty>,
    pub min_length: Option<f64>,
    pub max_length: Option<f64>,
    pub location_id: Option<i64>,
}

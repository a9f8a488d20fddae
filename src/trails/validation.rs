//! Input checks for trails and points. Errors are collected, not
//! short-circuited, so a client sees every problem at once.

use super::{
    dto::{PointInput, TrailInput},
    repo_types::{Difficulty, RouteType},
};

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_LENGTH_KM: f64 = 999.99;

pub fn validate_coordinates(latitude: f64, longitude: f64) -> Vec<String> {
    let mut errors = Vec::new();
    if !(-90.0..=90.0).contains(&latitude) {
        errors.push("Latitude must be between -90 and 90".to_string());
    }
    if !(-180.0..=180.0).contains(&longitude) {
        errors.push("Longitude must be between -180 and 180".to_string());
    }
    errors
}

pub fn validate_point(point: &PointInput) -> Vec<String> {
    match (point.latitude, point.longitude) {
        (Some(lat), Some(lon)) => validate_coordinates(lat, lon),
        _ => vec!["Latitude and longitude are required".to_string()],
    }
}

/// `creating` makes name, difficulty, length and route type mandatory.
pub fn validate_trail(input: &TrailInput, creating: bool) -> Vec<String> {
    let mut errors = Vec::new();

    match input.trail_name.as_deref().map(str::trim) {
        Some("") => errors.push("Trail name cannot be empty".to_string()),
        Some(name) if name.chars().count() > MAX_NAME_LEN => {
            errors.push(format!("Trail name cannot exceed {MAX_NAME_LEN} characters"))
        }
        None if creating => errors.push("trail_name is required".to_string()),
        _ => {}
    }

    match input.difficulty.as_deref() {
        Some(d) if Difficulty::parse(d).is_none() => {
            errors.push("Difficulty must be one of: Easy, Moderate, Hard".to_string())
        }
        None if creating => errors.push("difficulty is required".to_string()),
        _ => {}
    }

    match input.length {
        Some(len) if !(len > 0.0 && len <= MAX_LENGTH_KM) => {
            errors.push(format!("Length must be greater than 0 and at most {MAX_LENGTH_KM}"))
        }
        None if creating => errors.push("length is required".to_string()),
        _ => {}
    }

    if input.elevation_gain.is_some_and(|e| e < 0) {
        errors.push("Elevation gain cannot be negative".to_string());
    }

    match input.route_type.as_deref() {
        Some(r) if RouteType::parse(r).is_none() => errors
            .push("Route type must be one of: Loop, Out & back, Point-to-point".to_string()),
        None if creating => errors.push("route_type is required".to_string()),
        _ => {}
    }

    if let (Some(min), Some(max)) = (input.est_time_min, input.est_time_max) {
        if min > max {
            errors.push("Minimum time cannot exceed maximum time".to_string());
        }
    }

    for (i, point) in input.points.iter().enumerate() {
        for e in validate_point(point) {
            errors.push(format!("Point {}: {e}", i + 1));
        }
    }

    if input.feature_ids.iter().any(|&id| id <= 0) {
        errors.push("Feature ids must be positive".to_string());
    }

    errors
}

/// Estimated (min, max) minutes for a trail of `length` km.
pub fn estimate_minutes(difficulty: Difficulty, length: f64) -> (i32, i32) {
    let base = length * difficulty.minutes_per_km();
    ((base * 0.8).round() as i32, (base * 1.2).round() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> TrailInput {
        TrailInput {
            trail_name: Some("Ridge walk".into()),
            difficulty: Some("Moderate".into()),
            length: Some(5.0),
            route_type: Some("Loop".into()),
            ..Default::default()
        }
    }

    #[test]
    fn complete_input_passes() {
        assert!(validate_trail(&complete(), true).is_empty());
    }

    #[test]
    fn create_requires_core_fields() {
        let errors = validate_trail(&TrailInput::default(), true);
        assert_eq!(errors.len(), 4);
        assert!(validate_trail(&TrailInput::default(), false).is_empty());
    }

    #[test]
    fn all_problems_are_reported() {
        let input = TrailInput {
            trail_name: Some("x".repeat(101)),
            difficulty: Some("Extreme".into()),
            length: Some(0.0),
            elevation_gain: Some(-5),
            route_type: Some("Circle".into()),
            feature_ids: vec![1, 0],
            points: vec![PointInput {
                latitude: Some(91.0),
                longitude: Some(10.0),
                description: None,
                elevation: None,
            }],
            ..Default::default()
        };
        let errors = validate_trail(&input, false);
        assert_eq!(errors.len(), 7, "{errors:?}");
        assert!(errors.iter().any(|e| e.starts_with("Point 1: Latitude")));
    }

    #[test]
    fn length_bounds() {
        let mut input = complete();
        input.length = Some(999.99);
        assert!(validate_trail(&input, true).is_empty());
        input.length = Some(1000.0);
        assert_eq!(validate_trail(&input, true).len(), 1);
    }

    #[test]
    fn coordinate_edges() {
        assert!(validate_coordinates(90.0, -180.0).is_empty());
        assert_eq!(validate_coordinates(-90.1, 180.1).len(), 2);
        let missing = PointInput { latitude: Some(1.0), longitude: None, description: None, elevation: None };
        assert_eq!(validate_point(&missing), vec!["Latitude and longitude are required"]);
    }

    #[test]
    fn estimates_scale_with_difficulty() {
        assert_eq!(estimate_minutes(Difficulty::Easy, 10.0), (120, 180));
        assert_eq!(estimate_minutes(Difficulty::Moderate, 5.0), (80, 120));
        assert_eq!(estimate_minutes(Difficulty::Hard, 2.0), (40, 60));
    }
}

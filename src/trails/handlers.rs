use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::{
    dto::{
        PointCreated, PointInput, TrailCreated, TrailDeleted, TrailDetails, TrailInput,
        TrailListResponse, TrailPoints, TrailQuery, TrailUpdated,
    },
    repo::{self, NewTrail},
    repo_types::{Difficulty, TrailFilter, TrailSummary},
    validation::{estimate_minutes, validate_point, validate_trail},
};
use crate::{
    audit,
    auth::extractors::{CurrentUser, MaybeUser},
    error::ApiError,
    state::AppState,
    users::repo_types::User,
};

pub fn trail_routes() -> Router<AppState> {
    Router::new()
        .route("/trails", get(list_trails).post(create_trail))
        .route(
            "/trails/:id",
            get(get_trail).put(update_trail).delete(delete_trail),
        )
        .route("/trails/:id/points", get(list_points).post(add_point))
}

fn check_page(limit: i64, offset: i64) -> Result<(), ApiError> {
    if !(1..=100).contains(&limit) {
        return Err(ApiError::bad_request("limit must be between 1 and 100"));
    }
    if offset < 0 {
        return Err(ApiError::bad_request("offset cannot be negative"));
    }
    Ok(())
}

fn ensure_valid(errors: Vec<String>) -> Result<(), ApiError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Invalid(errors))
    }
}

async fn load(state: &AppState, trail_id: i64) -> Result<TrailSummary, ApiError> {
    repo::find_by_id(&state.db, trail_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Trail with ID {trail_id} not found")))
}

/// Loads a trail the requester is allowed to see.
async fn load_visible(
    state: &AppState,
    trail_id: i64,
    requester: Option<&User>,
) -> Result<TrailSummary, ApiError> {
    let trail = load(state, trail_id).await?;
    trail.trail.ownership().ensure_visible(requester, "trail")?;
    Ok(trail)
}

#[instrument(skip(state, user, q))]
pub async fn list_trails(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Query(q): Query<TrailQuery>,
) -> Result<Json<TrailListResponse>, ApiError> {
    check_page(q.limit, q.offset)?;
    let difficulty = match q.difficulty.as_deref() {
        Some(d) => Some(Difficulty::parse(d).ok_or_else(|| {
            ApiError::bad_request("Difficulty must be one of: Easy, Moderate, Hard")
        })?),
        None => None,
    };
    let filter = TrailFilter {
        difficulty,
        min_length: q.min_length,
        max_length: q.max_length,
        location_id: q.location_id,
    };
    let viewer = user.as_ref().map(|u| u.user_id);

    let trails = repo::list_visible(&state.db, viewer, &filter, q.limit, q.offset).await?;
    let total = repo::count_visible(&state.db, viewer, &filter).await?;

    Ok(Json(TrailListResponse {
        has_more: q.offset + (trails.len() as i64) < total,
        trails,
        total,
        limit: q.limit,
        offset: q.offset,
        authenticated: user.is_some(),
    }))
}

#[instrument(skip(state, user))]
pub async fn get_trail(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(trail_id): Path<i64>,
) -> Result<Json<TrailDetails>, ApiError> {
    let summary = load_visible(&state, trail_id, user.as_ref()).await?;
    let points = repo::list_points(&state.db, trail_id).await?;
    let features = repo::list_features(&state.db, trail_id).await?;
    let owner_asks = user.as_ref().is_some_and(|u| u.user_id == summary.trail.user_id);
    let reviews = if summary.trail.is_public || owner_asks {
        Some(repo::review_summary(&state.db, trail_id).await?)
    } else {
        None
    };
    Ok(Json(TrailDetails {
        summary,
        points,
        features,
        reviews,
    }))
}

#[instrument(skip(state, user, input), fields(user_id = user.user_id))]
pub async fn create_trail(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<TrailInput>,
) -> Result<(StatusCode, Json<TrailCreated>), ApiError> {
    if input.user_id.is_some_and(|id| id != user.user_id) {
        warn!(claimed = ?input.user_id, "ignoring user_id in trail body");
    }
    ensure_valid(validate_trail(&input, true))?;

    // Presence and shape were checked above.
    let (Some(name), Some(difficulty), Some(length), Some(route_type)) = (
        input.trail_name.as_deref().map(str::trim),
        input.difficulty.as_deref().and_then(Difficulty::parse),
        input.length,
        input.route_type.as_deref(),
    ) else {
        return Err(ApiError::bad_request("Missing required trail fields"));
    };

    let estimate = estimate_minutes(difficulty, length);
    let est_time = (
        input.est_time_min.unwrap_or(estimate.0),
        input.est_time_max.unwrap_or(estimate.1),
    );

    let new = NewTrail {
        trail_name: name,
        location_id: input.location_id,
        difficulty: difficulty.as_str(),
        length,
        elevation_gain: input.elevation_gain,
        est_time,
        route_type,
        description: input.description.as_deref(),
        owner_id: user.user_id,
        is_public: input.is_public.unwrap_or(true),
    };
    let trail =
        repo::create_with_children(&state.db, &new, &input.points, &input.feature_ids).await?;

    info!(trail_id = trail.trail_id, "trail created");
    audit::record(
        &state.db,
        Some(trail.trail_id),
        user.user_id,
        "CREATE_TRAIL",
        &format!("Created trail '{}'", trail.trail_name),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(TrailCreated {
            message: "Trail created successfully",
            trail,
        }),
    ))
}

#[instrument(skip(state, user, input), fields(user_id = user.user_id))]
pub async fn update_trail(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(trail_id): Path<i64>,
    Json(input): Json<TrailInput>,
) -> Result<Json<TrailUpdated>, ApiError> {
    let current = load(&state, trail_id).await?.trail;
    current.ownership().ensure_mutable(&user, "update", "trail")?;
    ensure_valid(validate_trail(&input, false))?;

    // Re-estimate only when the inputs of the estimate moved and the
    // caller did not pin the times.
    let est_time = match (input.difficulty.is_some() || input.length.is_some())
        .then(|| {
            input
                .difficulty
                .as_deref()
                .or(Some(current.difficulty.as_str()))
                .and_then(Difficulty::parse)
        })
        .flatten()
    {
        Some(d) => {
            let (min, max) = estimate_minutes(d, input.length.unwrap_or(current.length));
            (
                Some(input.est_time_min.unwrap_or(min)),
                Some(input.est_time_max.unwrap_or(max)),
            )
        }
        None => (input.est_time_min, input.est_time_max),
    };

    let trail = repo::update(&state.db, trail_id, &input, est_time)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Trail with ID {trail_id} not found")))?;

    audit::record(
        &state.db,
        Some(trail_id),
        user.user_id,
        "UPDATE_TRAIL",
        &format!("Updated trail '{}'", trail.trail_name),
    )
    .await;

    Ok(Json(TrailUpdated {
        message: "Trail updated successfully",
        trail,
    }))
}

#[instrument(skip(state, user), fields(user_id = user.user_id))]
pub async fn delete_trail(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(trail_id): Path<i64>,
) -> Result<Json<TrailDeleted>, ApiError> {
    let current = load(&state, trail_id).await?.trail;
    current.ownership().ensure_mutable(&user, "delete", "trail")?;

    if !repo::delete(&state.db, trail_id).await? {
        return Err(ApiError::not_found(format!("Trail with ID {trail_id} not found")));
    }

    info!(trail_id, "trail deleted");
    audit::record(
        &state.db,
        Some(trail_id),
        user.user_id,
        "DELETE_TRAIL",
        &format!("Deleted trail '{}'", current.trail_name),
    )
    .await;

    Ok(Json(TrailDeleted {
        message: "Trail deleted successfully",
        trail_id,
    }))
}

#[instrument(skip(state, user))]
pub async fn list_points(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(trail_id): Path<i64>,
) -> Result<Json<TrailPoints>, ApiError> {
    load_visible(&state, trail_id, user.as_ref()).await?;
    let points = repo::list_points(&state.db, trail_id).await?;
    Ok(Json(TrailPoints { trail_id, points }))
}

#[instrument(skip(state, user, point), fields(user_id = user.user_id))]
pub async fn add_point(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(trail_id): Path<i64>,
    Json(point): Json<PointInput>,
) -> Result<(StatusCode, Json<PointCreated>), ApiError> {
    let current = load(&state, trail_id).await?.trail;
    current.ownership().ensure_mutable(&user, "modify", "trail")?;

    ensure_valid(validate_point(&point))?;
    let (Some(lat), Some(lon)) = (point.latitude, point.longitude) else {
        return Err(ApiError::bad_request("Latitude and longitude are required"));
    };

    let point = repo::insert_point_next(
        &state.db,
        trail_id,
        lat,
        lon,
        point.description.as_deref(),
        point.elevation,
    )
    .await?;

    audit::record(
        &state.db,
        Some(trail_id),
        user.user_id,
        "ADD_TRAIL_POINT",
        &format!("Added point {} to trail", point.point_order),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(PointCreated {
            message: "Point added successfully",
            point,
        }),
    ))
}

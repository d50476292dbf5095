//! JSON-over-HTTP front end (feature `server`).

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{FromRef, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::config::SessionConfig;
use crate::error::{OctreeError, Result};
use crate::octree::{Moved, Octree};
use crate::session::Direction;
use crate::types::Point;

/// The tree shared between request handlers.
pub type SharedOctree = Arc<Mutex<Octree>>;

type Response = (StatusCode, Json<Value>);

#[derive(Clone)]
struct ApiState {
    tree: SharedOctree,
    session: SessionConfig,
}

impl FromRef<ApiState> for SharedOctree {
    fn from_ref(state: &ApiState) -> Self {
        state.tree.clone()
    }
}

impl FromRef<ApiState> for SessionConfig {
    fn from_ref(state: &ApiState) -> Self {
        state.session.clone()
    }
}

#[derive(Debug, Deserialize)]
struct RangeRequest {
    min: Point,
    max: Point,
}

#[derive(Debug, Deserialize)]
struct NearestRequest {
    x: f32,
    y: f32,
    z: f32,
    k: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MoveRequest {
    old_point: Point,
    new_point: Point,
}

#[derive(Debug, Deserialize)]
struct DirectionRequest {
    point: Point,
    direction: String,
}

/// Build the API router around `tree`; `session` supplies the step for
/// directional moves.
pub fn router(tree: Octree, session: SessionConfig) -> Router {
    Router::new()
        .route("/api/octree/insert", post(insert_point))
        .route("/api/octree/delete", delete(delete_point))
        .route("/api/octree/search", post(search_point))
        .route("/api/octree/range", post(range_query))
        .route("/api/octree/nearest", post(nearest_point))
        .route("/api/octree/points", get(all_points))
        .route("/api/octree/structure", get(structure))
        .route("/api/game/collision", post(check_collision))
        .route("/api/game/move", put(move_point))
        .route("/api/game/move_direction", post(move_by_direction))
        .with_state(ApiState {
            tree: Arc::new(Mutex::new(tree)),
            session,
        })
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(addr: &str, tree: Octree, session: SessionConfig) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr, "Serving octree API");
    axum::serve(listener, router(tree, session)).await?;
    Ok(())
}

fn lock(tree: &SharedOctree) -> MutexGuard<'_, Octree> {
    tree.lock().unwrap_or_else(PoisonError::into_inner)
}

fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({ "message": message.into(), "success": false })),
    )
}

async fn insert_point(State(tree): State<SharedOctree>, Json(point): Json<Point>) -> Response {
    let mut tree = lock(&tree);
    if tree.contains(point) {
        return failure(StatusCode::BAD_REQUEST, format!("Point {point} already exists"));
    }
    match tree.insert(point) {
        Ok(()) => (
            StatusCode::CREATED,
            Json(json!({
                "message": "Point inserted successfully",
                "success": true,
                "point": point,
            })),
        ),
        Err(e) => failure(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

async fn delete_point(State(tree): State<SharedOctree>, Json(point): Json<Point>) -> Response {
    if lock(&tree).remove(point) {
        (
            StatusCode::OK,
            Json(json!({
                "message": "Point deleted successfully",
                "success": true,
                "point": point,
            })),
        )
    } else {
        failure(StatusCode::NOT_FOUND, "Point not found")
    }
}

async fn search_point(State(tree): State<SharedOctree>, Json(point): Json<Point>) -> Response {
    let tree = lock(&tree);
    match tree.find(point) {
        Some(leaf) => (
            StatusCode::OK,
            Json(json!({
                "found": true,
                "point": point,
                "depth": leaf.depth,
                "success": true,
            })),
        ),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "found": false, "message": "Point not found", "success": false })),
        ),
    }
}

async fn range_query(State(tree): State<SharedOctree>, Json(req): Json<RangeRequest>) -> Response {
    let points = lock(&tree).query_range(req.min, req.max);
    (
        StatusCode::OK,
        Json(json!({
            "points": points,
            "count": points.len(),
            "range": { "min": req.min, "max": req.max },
            "success": true,
        })),
    )
}

async fn nearest_point(
    State(tree): State<SharedOctree>,
    Json(req): Json<NearestRequest>,
) -> Response {
    if req.k.is_some_and(|k| k != 1) {
        return failure(StatusCode::BAD_REQUEST, "Only k = 1 is supported");
    }
    let target = Point::new(req.x, req.y, req.z);
    match lock(&tree).nearest_neighbor(target) {
        Some(n) => (
            StatusCode::OK,
            Json(json!({
                "nearest": [n.point],
                "distance": n.distance,
                "target": target,
                "success": true,
            })),
        ),
        None => failure(StatusCode::NOT_FOUND, "No points found"),
    }
}

async fn all_points(State(tree): State<SharedOctree>) -> Response {
    let points = lock(&tree).points();
    (
        StatusCode::OK,
        Json(json!({ "points": points, "count": points.len(), "success": true })),
    )
}

async fn structure(State(tree): State<SharedOctree>) -> Response {
    let snapshot = lock(&tree).snapshot();
    (
        StatusCode::OK,
        Json(json!({ "octree": snapshot, "success": true })),
    )
}

async fn check_collision(State(tree): State<SharedOctree>, Json(point): Json<Point>) -> Response {
    let mut tree = lock(&tree);
    let box_size = tree.config().collision_size;
    let collision = tree.detect_collision(point, box_size);
    (
        StatusCode::OK,
        Json(json!({ "collision": collision, "success": true })),
    )
}

async fn move_point(State(tree): State<SharedOctree>, Json(req): Json<MoveRequest>) -> Response {
    let mut tree = lock(&tree);
    let box_size = tree.config().collision_size;
    if tree.detect_collision(req.new_point, box_size) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "message": "Collision detected, movement not allowed.",
                "success": false,
                "collision": true,
            })),
        );
    }
    match tree.update_position(req.old_point, req.new_point) {
        Ok(how) => (
            StatusCode::OK,
            Json(json!({
                "message": "Point moved successfully.",
                "in_place": how == Moved::InPlace,
                "old_position": req.old_point,
                "new_position": req.new_point,
                "success": true,
                "collision": false,
            })),
        ),
        Err(e @ OctreeError::NotFound(_)) => failure(StatusCode::NOT_FOUND, e.to_string()),
        Err(e) => failure(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

async fn move_by_direction(
    State(tree): State<SharedOctree>,
    State(session): State<SessionConfig>,
    Json(req): Json<DirectionRequest>,
) -> Response {
    let key = req.direction.to_lowercase();
    let Some(direction) = Direction::from_key(&key) else {
        return failure(StatusCode::BAD_REQUEST, "Invalid direction. Use w/a/s/d/e/f");
    };
    let from = req.point;
    let to = direction.apply(from, session.step);

    let mut tree = lock(&tree);
    if !tree.contains(from) {
        return failure(StatusCode::NOT_FOUND, format!("Point {from} not found"));
    }
    let box_size = tree.config().collision_size;
    if tree.detect_collision(to, box_size) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "message": "Collision detected, movement not allowed.",
                "success": false,
                "collision": true,
                "current_position": from,
            })),
        );
    }
    match tree.update_position(from, to) {
        Ok(how) => (
            StatusCode::OK,
            Json(json!({
                "message": format!("Point moved {} successfully.", key.to_uppercase()),
                "in_place": how == Moved::InPlace,
                "old_position": from,
                "new_position": to,
                "success": true,
                "collision": false,
            })),
        ),
        Err(e @ OctreeError::NotFound(_)) => failure(StatusCode::NOT_FOUND, e.to_string()),
        Err(e) => failure(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

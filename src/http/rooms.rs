use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::auth::AuthUser;
use crate::model::{Money, RoomInfo, RoomListing};

use super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRoomRequest {
    pub room_type: String,
    /// Minor currency units per night.
    pub price_per_night: Money,
    #[serde(default)]
    pub amenities: Vec<String>,
}

pub async fn create(
    user: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<AddRoomRequest>,
) -> Result<(StatusCode, Json<RoomInfo>), ApiError> {
    let room = state
        .store
        .add_room(&user.id, req.room_type, req.price_per_night, req.amenities)
        .await?;
    Ok((StatusCode::CREATED, Json(room)))
}

#[derive(Debug, Serialize)]
pub struct RoomsResponse {
    pub rooms: Vec<RoomListing>,
}

/// Public browse listing: only rooms currently flagged available.
pub async fn list_available(State(state): State<AppState>) -> Json<RoomsResponse> {
    Json(RoomsResponse {
        rooms: state.store.available_rooms().await,
    })
}

#[derive(Debug, Serialize)]
pub struct OwnerRoomsResponse {
    pub rooms: Vec<RoomInfo>,
}

pub async fn owner_rooms(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<OwnerRoomsResponse>, ApiError> {
    Ok(Json(OwnerRoomsResponse {
        rooms: state.store.owner_rooms(&user.id).await?,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleAvailabilityRequest {
    pub room_id: Ulid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleAvailabilityResponse {
    pub room_id: Ulid,
    pub is_available: bool,
}

pub async fn toggle_availability(
    user: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<ToggleAvailabilityRequest>,
) -> Result<Json<ToggleAvailabilityResponse>, ApiError> {
    let is_available = state
        .store
        .toggle_room_availability(&user.id, req.room_id)
        .await?;
    Ok(Json(ToggleAvailabilityResponse {
        room_id: req.room_id,
        is_available,
    }))
}

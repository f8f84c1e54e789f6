use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::model::HotelInfo;

use super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct RegisterHotelRequest {
    pub name: String,
    pub address: String,
    pub city: String,
    pub contact: String,
}

pub async fn register(
    user: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<RegisterHotelRequest>,
) -> Result<(StatusCode, Json<HotelInfo>), ApiError> {
    let hotel = state
        .store
        .register_hotel(&user, req.name, req.address, req.city, req.contact)
        .await?;
    Ok((StatusCode::CREATED, Json(HotelInfo::from(&hotel))))
}

pub async fn my_hotel(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<HotelInfo>, ApiError> {
    Ok(Json(state.store.my_hotel(&user.id)?))
}

#[derive(Debug, Serialize)]
pub struct HotelsResponse {
    pub hotels: Vec<HotelInfo>,
}

pub async fn list_all(State(state): State<AppState>) -> Json<HotelsResponse> {
    Json(HotelsResponse {
        hotels: state.store.list_hotels(),
    })
}

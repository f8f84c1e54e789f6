use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;

use super::{ApiError, AppState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub role: &'static str,
    pub recent_searched_cities: Vec<String>,
}

/// The caller's app-side profile. `role` is derived — owning a hotel makes
/// you a hotelOwner, nothing is stored.
pub async fn profile(user: AuthUser, State(state): State<AppState>) -> Json<ProfileResponse> {
    let role = if state.store.is_owner(&user.id) {
        "hotelOwner"
    } else {
        "user"
    };
    let recent_searched_cities = state
        .store
        .get_user(&user.id)
        .map(|u| u.recent_cities)
        .unwrap_or_default();
    Json(ProfileResponse {
        role,
        recent_searched_cities,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSearchRequest {
    pub recent_searched_city: String,
}

#[derive(Debug, Serialize)]
pub struct StoredResponse {
    pub stored: bool,
}

pub async fn store_recent_search(
    user: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<StoreSearchRequest>,
) -> Result<Json<StoredResponse>, ApiError> {
    state
        .store
        .record_search(&user.id, &req.recent_searched_city)
        .await?;
    Ok(Json(StoredResponse { stored: true }))
}

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::error;
use ulid::Ulid;

use crate::auth::AuthUser;
use crate::model::{BookingDetails, Dashboard, StayRange};
use crate::store::StoreError;

use super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRequest {
    pub room: Ulid,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    pub is_available: bool,
}

/// Public availability probe. A storage failure answers "not available"
/// rather than an error — a blocked booking beats a double one.
pub async fn check_availability(
    State(state): State<AppState>,
    Json(req): Json<AvailabilityRequest>,
) -> Result<Json<AvailabilityResponse>, ApiError> {
    let stay = StayRange::new(req.check_in_date, req.check_out_date);
    match state.store.check_availability(req.room, stay).await {
        Ok(is_available) => Ok(Json(AvailabilityResponse { is_available })),
        Err(StoreError::WalError(detail)) => {
            error!("availability check degraded: {detail}");
            Ok(Json(AvailabilityResponse { is_available: false }))
        }
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub room: Ulid,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub guests: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingCreatedResponse {
    pub booking_id: Ulid,
}

pub async fn create(
    user: AuthUser,
    State(state): State<AppState>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingCreatedResponse>), ApiError> {
    let stay = StayRange::new(req.check_in_date, req.check_out_date);
    let booking_id = state
        .store
        .create_booking(&user, req.room, stay, req.guests)
        .await?;
    Ok((StatusCode::CREATED, Json(BookingCreatedResponse { booking_id })))
}

#[derive(Debug, Serialize)]
pub struct BookingsResponse {
    pub bookings: Vec<BookingDetails>,
}

pub async fn user_bookings(
    user: AuthUser,
    State(state): State<AppState>,
) -> Json<BookingsResponse> {
    Json(BookingsResponse {
        bookings: state.store.user_bookings(&user.id).await,
    })
}

pub async fn hotel_bookings(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Dashboard>, ApiError> {
    Ok(Json(state.store.hotel_dashboard(&user.id).await?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelledResponse {
    pub booking_id: Ulid,
}

pub async fn cancel(
    user: AuthUser,
    State(state): State<AppState>,
    Path(booking_id): Path<Ulid>,
) -> Result<Json<CancelledResponse>, ApiError> {
    state.store.cancel_booking(&user.id, booking_id).await?;
    Ok(Json(CancelledResponse { booking_id }))
}

mod bookings;
mod hotels;
mod rooms;
mod users;

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{FromRequestParts, MatchedPath, Request, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::request::Parts;
use axum::http::{Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use thiserror::Error;
use tokio::sync::Semaphore;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, warn};

use crate::auth::{AuthUser, IdentityProvider};
use crate::observability;
use crate::store::{Store, StoreError};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub identity: Arc<dyn IdentityProvider>,
    pub limiter: Arc<Semaphore>,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_origin(Any);

    Router::new()
        .route("/", get(health))
        .route("/api/user", get(users::profile))
        .route("/api/user/store-recent-search", post(users::store_recent_search))
        .route("/api/hotels/register", post(hotels::register))
        .route("/api/hotels/my-hotel", get(hotels::my_hotel))
        .route("/api/hotels/all", get(hotels::list_all))
        .route("/api/rooms", get(rooms::list_available).post(rooms::create))
        .route("/api/rooms/owner", get(rooms::owner_rooms))
        .route("/api/rooms/toggle-availability", post(rooms::toggle_availability))
        .route("/api/bookings/check-availability", post(bookings::check_availability))
        .route("/api/bookings/book", post(bookings::create))
        .route("/api/bookings/user", get(bookings::user_bookings))
        .route("/api/bookings/hotel", get(bookings::hotel_bookings))
        .route("/api/bookings/{id}/cancel", post(bookings::cancel))
        .layer(middleware::from_fn(track_metrics))
        .layer(middleware::from_fn_with_state(state.clone(), shed_load))
        .layer(cors)
        .with_state(state)
}

async fn health() -> &'static str {
    "innkeep is running"
}

/// User-facing failure with a stable machine-readable code. Everything a
/// handler can answer with, except success.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("not authenticated")]
    Unauthenticated,
    #[error("not found")]
    NotFound,
    #[error("a hotel is already registered for this user")]
    AlreadyExists,
    #[error("room is not available for booking")]
    RoomUnavailable,
    #[error("room is already booked for the selected dates")]
    DateConflict,
    #[error("check-out date must be after check-in date")]
    InvalidRange,
    #[error("server is busy, try again shortly")]
    Overloaded,
    #[error("internal error")]
    Internal,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::InvalidRange => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::AlreadyExists | ApiError::RoomUnavailable | ApiError::DateConflict => {
                StatusCode::CONFLICT
            }
            ApiError::Overloaded => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation",
            ApiError::Unauthenticated => "unauthenticated",
            ApiError::NotFound => "not_found",
            ApiError::AlreadyExists => "already_exists",
            ApiError::RoomUnavailable => "room_unavailable",
            ApiError::DateConflict => "date_conflict",
            ApiError::InvalidRange => "invalid_range",
            ApiError::Overloaded => "overloaded",
            ApiError::Internal => "internal",
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Validation(msg) => ApiError::Validation(msg.to_string()),
            StoreError::LimitExceeded(msg) => {
                ApiError::Validation(format!("limit exceeded: {msg}"))
            }
            StoreError::NotFound(_) | StoreError::NoHotel => ApiError::NotFound,
            StoreError::AlreadyExists(_) => ApiError::AlreadyExists,
            StoreError::RoomUnavailable(_) => ApiError::RoomUnavailable,
            StoreError::DateConflict(_) => ApiError::DateConflict,
            StoreError::InvalidRange => ApiError::InvalidRange,
            StoreError::WalError(detail) => {
                // Detail stays in the log; the client gets the generic body
                error!("storage failure: {detail}");
                ApiError::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "success": false,
            "code": self.code(),
            "message": self.to_string(),
        }));
        (self.status(), body).into_response()
    }
}

/// Bearer-token authentication. Verifies against the identity provider and
/// lazily creates the user's profile on first sight.
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(ApiError::Unauthenticated)?;

        let user = match state.identity.verify(token).await {
            Ok(user) => user,
            Err(e) => {
                metrics::counter!(observability::AUTH_FAILURES_TOTAL).increment(1);
                debug!("token verification failed: {e}");
                return Err(ApiError::Unauthenticated);
            }
        };

        if state.store.get_user(&user.id).is_none()
            && let Err(e) = state.store.upsert_user(&user).await {
                // The request proceeds with the verified identity regardless
                warn!("failed to record profile for {}: {e}", user.id);
            }

        Ok(user)
    }
}

/// Admission gate: hold a permit for the lifetime of the request, shed with
/// 503 when none are left.
async fn shed_load(State(state): State<AppState>, req: Request, next: Next) -> Response {
    match state.limiter.clone().try_acquire_owned() {
        Ok(_permit) => next.run(req).await,
        Err(_) => {
            metrics::counter!(observability::REQUESTS_SHED_TOTAL).increment(1);
            ApiError::Overloaded.into_response()
        }
    }
}

async fn track_metrics(req: Request, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned());
    let method = req.method().to_string();
    let start = Instant::now();

    let response = next.run(req).await;

    metrics::counter!(
        observability::REQUESTS_TOTAL,
        "route" => route.clone(),
        "method" => method,
        "status" => response.status().as_u16().to_string()
    )
    .increment(1);
    metrics::histogram!(observability::REQUEST_DURATION_SECONDS, "route" => route)
        .record(start.elapsed().as_secs_f64());

    response
}

//! HTTP endpoints implemented by the x402 facilitator.
//!
//! Protocol-critical endpoints (`/verify`, `/settle`) always answer 200 with
//! the verdict in the body; HTTP status codes are reserved for transport
//! problems: 400 for malformed request bodies, 404 for unknown paths, 500
//! for internal faults. Discovery endpoints (`/supported`, `/health`,
//! `/transaction/:signature`) are plain JSON GETs.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::instrument;

use crate::facilitator::Facilitator;
use crate::facilitator_local::{FacilitatorLocal, TransactionStatusError};
use crate::network::Network;
use crate::timestamp::UnixTimestampMillis;
use crate::types::{ErrorResponse, HealthResponse, SettleRequest, VerifyRequest};

/// Shared application state: the facilitator behind every handler.
pub type FacilitatorState = Arc<FacilitatorLocal>;

/// Request bodies larger than this are rejected outright.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Creates an axum [`Router`] with all facilitator endpoints.
///
/// - `GET /` — liveness banner
/// - `GET /health` — health probe with server time
/// - `GET /supported` — supported (scheme, network) pairs
/// - `POST /verify` — verify a payment header against requirements
/// - `POST /settle` — settle an accepted payment on-chain
/// - `GET /transaction/{signature}?network=…` — signature status
pub fn routes() -> Router<FacilitatorState> {
    Router::new()
        .route("/", get(get_root))
        .route("/health", get(get_health))
        .route("/supported", get(get_supported))
        .route("/verify", post(post_verify))
        .route("/settle", post(post_settle))
        .route("/transaction/{signature}", get(get_transaction))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
}

/// `GET /`: Liveness or sanity check route.
async fn get_root() -> impl IntoResponse {
    "x402-solana facilitator"
}

/// `GET /health`: Health probe, reporting the server's clock in milliseconds.
#[instrument(skip_all)]
async fn get_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        timestamp: UnixTimestampMillis::now().as_millis(),
    })
}

/// `GET /supported`: Lists the payment schemes and networks this facilitator
/// can verify and settle.
#[instrument(skip_all)]
async fn get_supported(State(facilitator): State<FacilitatorState>) -> Response {
    match facilitator.supported().await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(error) => internal_error(error),
    }
}

/// `POST /verify`: Facilitator-side verification of a proposed x402 payment.
///
/// Responds 200 with `{isValid, invalidReason}` whether or not the payment
/// passes; a malformed body is the only way to get a 4xx here.
#[instrument(skip_all)]
async fn post_verify(
    State(facilitator): State<FacilitatorState>,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_request(rejection),
    };
    match facilitator.verify(&body).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(error) => internal_error(error),
    }
}

/// `POST /settle`: Facilitator-side execution of a valid x402 payment
/// on-chain. Typically called by the resource server after `/verify`.
#[instrument(skip_all)]
async fn post_settle(
    State(facilitator): State<FacilitatorState>,
    body: Result<Json<SettleRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return bad_request(rejection),
    };
    match facilitator.settle(&body).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(error) => internal_error(error),
    }
}

#[derive(Debug, Deserialize)]
struct TransactionQuery {
    network: Network,
}

/// `GET /transaction/{signature}`: Confirmation status of a signature on the
/// network named by the `network` query parameter.
#[instrument(skip_all, fields(signature = %signature))]
async fn get_transaction(
    State(facilitator): State<FacilitatorState>,
    Path(signature): Path<String>,
    Query(query): Query<TransactionQuery>,
) -> Response {
    match facilitator.transaction_status(&signature, query.network).await {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(error @ TransactionStatusError::UnsupportedNetwork)
        | Err(error @ TransactionStatusError::InvalidSignature) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: error.to_string(),
            }),
        )
            .into_response(),
        Err(TransactionStatusError::Chain(error)) => internal_error(error),
    }
}

fn bad_request(rejection: JsonRejection) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: rejection.body_text(),
        }),
    )
        .into_response()
}

fn internal_error<E: std::fmt::Display>(error: E) -> Response {
    tracing::error!(error = %error, "Internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "Internal server error".to_string(),
        }),
    )
        .into_response()
}

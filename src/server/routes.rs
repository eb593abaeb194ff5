use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tracing::{error, info};

use crate::error::{AgentError, UpstreamError};
use crate::server::envelope::{failure, success};
use crate::server::params::{BangumiQuery, PsnMode, PsnQuery};
use crate::server::server::AppState;
use crate::utils::constants::truncate_diagnostic;

pub const PSN_TROPHIES_PATH: &str = "/api/psn/trophies";
pub const BANGUMI_ANIME_PATH: &str = "/api/bangumi/anime";
pub const BANGUMI_COLLECTIONS_PATH: &str = "/api/bangumi/collections";

pub fn router() -> Router<AppState> {
    for path in [PSN_TROPHIES_PATH, BANGUMI_ANIME_PATH, BANGUMI_COLLECTIONS_PATH] {
        info!("served path: {}", path);
    }
    Router::new()
        .route(PSN_TROPHIES_PATH, get(psn_trophies))
        .route(BANGUMI_ANIME_PATH, get(bangumi_anime))
        .route(BANGUMI_COLLECTIONS_PATH, get(bangumi_collections))
}

/// Malformed query strings are answered in the envelope like any other bad parameter.
fn parsed<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, Response> {
    query
        .map(|Query(query)| query)
        .map_err(|rejection| AgentError::BadRequest(rejection.body_text()).into_response())
}

async fn psn_trophies(State(state): State<AppState>, query: Result<Query<PsnQuery>, QueryRejection>) -> Response {
    let query = match parsed(query) {
        Ok(query) => query,
        Err(response) => return response,
    };
    let mode = match query.into_mode() {
        Ok(mode) => mode,
        Err(err) => return err.into_response(),
    };

    let result = match mode {
        PsnMode::Summary => state.psn.summary().await.map(success),
        PsnMode::Titles { limit, offset, normalized } => state.psn.titles(limit, offset, normalized).await.map(success),
        PsnMode::Title { np_communication_id, service } => {
            state.psn.title_detail(&np_communication_id, service).await.map(success)
        }
    };
    result.unwrap_or_else(IntoResponse::into_response)
}

async fn bangumi_anime(State(state): State<AppState>, query: Result<Query<BangumiQuery>, QueryRejection>) -> Response {
    let query = match parsed(query) {
        Ok(query) => query,
        Err(response) => return response,
    };
    let user = match query.user(state.default_bangumi_user.as_deref()) {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };
    let (limit, offset) = query.anime_page();

    state
        .bangumi
        .anime(&user, limit, offset)
        .await
        .map(success)
        .unwrap_or_else(IntoResponse::into_response)
}

/// Raw pass-through. Upstream status and payload problems are a bad gateway.
async fn bangumi_collections(
    State(state): State<AppState>,
    query: Result<Query<BangumiQuery>, QueryRejection>,
) -> Response {
    let query = match parsed(query) {
        Ok(query) => query,
        Err(response) => return response,
    };
    let user = match query.user(state.default_bangumi_user.as_deref()) {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };

    match state.bangumi.collections(&user, query.collection_query()).await {
        Ok(data) => success(data),
        Err(err) => {
            error!(%user, "collection pass-through failed: {}", err);
            match err {
                UpstreamError::Unauthorized => failure(
                    StatusCode::BAD_GATEWAY,
                    "collection API request failed",
                    Some(StatusCode::UNAUTHORIZED.as_u16()),
                    None,
                ),
                UpstreamError::Status { status, body } => failure(
                    StatusCode::BAD_GATEWAY,
                    "collection API request failed",
                    Some(status),
                    Some(body),
                ),
                UpstreamError::InvalidJson(_) | UpstreamError::Rejected(_) => failure(
                    StatusCode::BAD_GATEWAY,
                    "collection API returned an unusable payload",
                    None,
                    Some(truncate_diagnostic(&err.to_string())),
                ),
                UpstreamError::Timeout | UpstreamError::Network(_) => failure(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "collection API proxy error",
                    None,
                    Some(truncate_diagnostic(&err.to_string())),
                ),
            }
        }
    }
}

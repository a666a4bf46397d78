use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::info;

use super::AdminState;

pub(super) async fn clear_page_cache(State(state): State<AdminState>) -> Response {
    let removed = state.cache.as_ref().map_or(0, |cache| cache.clear());
    info!(
        target = "yatube::admin::cache",
        removed, "page cache cleared"
    );
    StatusCode::NO_CONTENT.into_response()
}

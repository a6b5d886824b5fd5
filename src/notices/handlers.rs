use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tracing::instrument;

use crate::{
    auth::extractors::AuthUser, db, error::ApiError, notices::repo::Notice, state::AppState,
};

pub fn notice_routes() -> Router<AppState> {
    Router::new().route("/notices", get(get_notices))
}

#[derive(Debug, Serialize)]
pub struct NoticesResponse {
    pub notices: Vec<Notice>,
}

#[instrument(skip(state, _auth))]
pub async fn get_notices(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<NoticesResponse>, ApiError> {
    let notices = db::bounded(Notice::list_all(&state.db)).await?;
    Ok(Json(NoticesResponse { notices }))
}

// API 路由汇总入口。
pub mod download;
pub mod errors;
pub mod susar;

use crate::state::AppState;
use axum::Router;
use std::sync::Arc;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(susar::router(state.max_upload_bytes()))
        .with_state(state)
}

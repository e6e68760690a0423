use axum::Router;

use crate::api::state::AppState;

pub mod system;
pub mod user;

/// `/v1` 之下的全部路由
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(system::routes())
        .merge(user::routes())
}

// src/api/routes/user.rs
use axum::{
    routing::{get, post},
    Router,
};

use crate::api::handlers::user;
use crate::api::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/test_post", post(user::test_post))
        .route("/get_user", get(user::get_user))
}

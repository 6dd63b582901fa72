use axum::{
    Router,
    routing::{get, post},
};

pub mod auth;
pub mod system;
pub mod tasks;
pub mod users;

/// Endpoints reachable without a token.
pub fn public_router() -> Router {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
}

/// Router for all authenticated endpoints.
pub fn protected_router() -> Router {
    Router::new()
        .route("/logout", post(auth::logout))
        .route("/user", get(auth::current_user))
        .nest("/users", users::router())
        .nest("/tasks", tasks::router())
}

// src/routes.rs

use axum::{
    Router,
    http::Method,
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{admin, auth, quiz},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, optional_auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, test, results, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (stores, report pipeline, config).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new().route("/login", post(auth::login));

    let test_routes = Router::new()
        .route("/api/tests", get(quiz::list_tests))
        .route("/api/test", get(quiz::get_test))
        // Anonymous submissions are allowed; a token only attributes the result
        .route(
            "/api/test/submit",
            post(quiz::submit_test).layer(middleware::from_fn_with_state(
                state.clone(),
                optional_auth_middleware,
            )),
        );

    let result_routes = Router::new().route("/{id}", get(quiz::get_result));

    let admin_routes = Router::new()
        .route("/stats", get(admin::stats))
        .route(
            "/questions",
            get(admin::list_questions).post(admin::create_question),
        )
        .route(
            "/questions/{id}",
            put(admin::update_question).delete(admin::delete_question),
        )
        .route("/results", get(admin::list_results))
        .route("/results/{id}", delete(admin::delete_result))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(test_routes)
        .nest("/api/auth", auth_routes)
        .nest("/api/results", result_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

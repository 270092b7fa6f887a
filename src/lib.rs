// src/lib.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod common;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use crate::config::AppState;
use crate::docs::ApiDoc;
use crate::middleware::auth::auth_guard;

/// Monta o router completo. Separado do `main` para poder ser exercitado nos testes.
pub fn build_router(app_state: AppState) -> Router {
    // Rotas de autenticação (públicas)
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login));

    // Rotas da sessão (protegidas pelo middleware)
    let session_routes = Router::new()
        .route("/logout", post(handlers::auth::logout))
        .route("/me", get(handlers::auth::get_me))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let member_routes = Router::new()
        .route("/"
               ,get(handlers::members::list_members)
               .post(handlers::members::create_member)
        )
        .route("/{id}"
               ,get(handlers::members::get_member)
               .put(handlers::members::update_member)
               .delete(handlers::members::delete_member)
        )
        .route("/{id}/toggle-status"
               ,post(handlers::members::toggle_member_status)
        )
        .route("/{id}/observations"
               ,post(handlers::members::add_observation)
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let small_group_routes = Router::new()
        .route("/"
               ,get(handlers::small_groups::list_small_groups)
               .post(handlers::small_groups::create_small_group)
        )
        .route("/{id}"
               ,get(handlers::small_groups::get_small_group)
               .put(handlers::small_groups::update_small_group)
               .delete(handlers::small_groups::delete_small_group)
        )
        .route("/{id}/members/{member_id}"
               ,post(handlers::small_groups::add_member)
               .delete(handlers::small_groups::remove_member)
        )
        .route("/{id}/attendance"
               ,post(handlers::small_groups::register_attendance)
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let report_routes = Router::new()
        .route("/summary", get(handlers::reports::get_summary))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Combina tudo no router principal
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes.merge(session_routes))
        .nest("/api/members", member_routes)
        .nest("/api/small-groups", small_group_routes)
        .nest("/api/reports", report_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

// src/handlers/auth.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        notification::NotificationQueue,
    },
    config::AppState,
    handlers::{failure, Envelope},
    middleware::auth::CurrentSession,
    models::auth::{AuthResponse, LoginUserPayload, Profile, RegisterUserPayload},
};

// Abre a sessão (carga inicial incluída) e devolve o token que aponta para ela.
async fn open_session(
    app_state: &AppState,
    profile: Profile,
    queue: &NotificationQueue,
) -> Result<AuthResponse, AppError> {
    let session = app_state.sessions.open(profile, queue).await;
    let token = app_state
        .auth_service
        .create_token(session.profile.id, session.id)?;
    Ok(AuthResponse {
        token,
        profile: session.profile.clone(),
    })
}

// POST /api/auth/register
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterUserPayload,
    responses(
        (status = 201, description = "Usuário criado e sessão aberta", body = AuthResponse),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "E-mail já cadastrado")
    )
)]
pub async fn register(
    State(app_state): State<AppState>,
    Json(payload): Json<RegisterUserPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let profile = app_state
        .auth_service
        .register_user(
            &payload.nome,
            &payload.email,
            &payload.password,
            payload.cargo.as_deref(),
        )
        .await?;

    let queue = NotificationQueue::new();
    let response = open_session(&app_state, profile, &queue)
        .await
        .map_err(failure(&queue))?;

    Ok((StatusCode::CREATED, Json(Envelope::new(response, &queue))))
}

// POST /api/auth/login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginUserPayload,
    responses(
        (status = 200, description = "Sessão aberta", body = AuthResponse),
        (status = 401, description = "Credenciais inválidas")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    Json(payload): Json<LoginUserPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let profile = app_state
        .auth_service
        .login_user(&payload.email, &payload.password)
        .await?;

    let queue = NotificationQueue::new();
    let response = open_session(&app_state, profile, &queue)
        .await
        .map_err(failure(&queue))?;

    Ok((StatusCode::OK, Json(Envelope::new(response, &queue))))
}

// POST /api/auth/logout
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    responses(
        (status = 204, description = "Sessão encerrada"),
        (status = 401, description = "Sem sessão ativa")
    ),
    security(("api_jwt" = []))
)]
pub async fn logout(
    State(app_state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> StatusCode {
    app_state.sessions.close(session.id).await;
    StatusCode::NO_CONTENT
}

// GET /api/auth/me
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Perfil da sessão atual", body = Profile)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_me(CurrentSession(session): CurrentSession) -> Json<Profile> {
    Json(session.profile.clone())
}

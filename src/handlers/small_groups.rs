// src/handlers/small_groups.rs

use axum::{extract::Path, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        notification::NotificationQueue,
    },
    handlers::{failure, Envelope},
    middleware::auth::CurrentSession,
    models::small_group::{
        AttendanceRecord, Frequency, GroupAddress, GroupResponsible, NewAttendance,
        NewSmallGroup, SmallGroup, Weekday,
    },
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SmallGroupPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "PG Vila Nova")]
    pub nome: String,
    pub descricao: Option<String>,
    #[validate(nested)]
    pub endereco: GroupAddress,
    #[validate(nested)]
    pub responsavel: GroupResponsible,
    #[serde(default)]
    pub frequencia: Frequency,
    pub dia_semana: Option<Weekday>,
    #[schema(example = "19:30")]
    pub horario: Option<String>,
    #[serde(default)]
    pub membros: Vec<Uuid>,
}

impl From<SmallGroupPayload> for NewSmallGroup {
    fn from(payload: SmallGroupPayload) -> Self {
        Self {
            nome: payload.nome,
            descricao: payload.descricao.filter(|d| !d.trim().is_empty()),
            endereco: payload.endereco,
            responsavel: payload.responsavel,
            frequencia: payload.frequencia,
            dia_semana: payload.dia_semana,
            horario: payload.horario.filter(|h| !h.trim().is_empty()),
            membros: payload.membros,
        }
    }
}

// GET /api/small-groups
#[utoipa::path(
    get,
    path = "/api/small-groups",
    tag = "Small Groups",
    responses(
        (status = 200, description = "Pequenos grupos da sessão", body = Vec<SmallGroup>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_small_groups(CurrentSession(session): CurrentSession) -> Json<Vec<SmallGroup>> {
    Json(session.small_groups.small_groups().await)
}

// POST /api/small-groups
#[utoipa::path(
    post,
    path = "/api/small-groups",
    tag = "Small Groups",
    request_body = SmallGroupPayload,
    responses(
        (status = 201, description = "Pequeno grupo criado", body = SmallGroup),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_small_group(
    CurrentSession(session): CurrentSession,
    Json(payload): Json<SmallGroupPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let queue = NotificationQueue::new();
    let group = session
        .small_groups
        .add_small_group(payload.into(), &queue)
        .await
        .map_err(failure(&queue))?;

    Ok((StatusCode::CREATED, Json(Envelope::new(group, &queue))))
}

// GET /api/small-groups/{id}
#[utoipa::path(
    get,
    path = "/api/small-groups/{id}",
    tag = "Small Groups",
    params(("id" = Uuid, Path, description = "ID do pequeno grupo")),
    responses(
        (status = 200, description = "Pequeno grupo com membros e chamadas", body = SmallGroup),
        (status = 404, description = "Pequeno grupo não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_small_group(
    CurrentSession(session): CurrentSession,
    Path(id): Path<Uuid>,
) -> Result<Json<SmallGroup>, ApiError> {
    let queue = NotificationQueue::new();
    let group = session
        .small_groups
        .get_small_group(id, &queue)
        .await
        .map_err(failure(&queue))?
        .ok_or(AppError::SmallGroupNotFound)?;

    Ok(Json(group))
}

// PUT /api/small-groups/{id}
#[utoipa::path(
    put,
    path = "/api/small-groups/{id}",
    tag = "Small Groups",
    params(("id" = Uuid, Path, description = "ID do pequeno grupo")),
    request_body = SmallGroupPayload,
    responses(
        (status = 200, description = "Pequeno grupo atualizado, rol sincronizado", body = SmallGroup),
        (status = 404, description = "Pequeno grupo não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_small_group(
    CurrentSession(session): CurrentSession,
    Path(id): Path<Uuid>,
    Json(payload): Json<SmallGroupPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let group = NewSmallGroup::from(payload).into_group(id);
    let queue = NotificationQueue::new();
    let updated = session
        .small_groups
        .update_small_group(group, &queue)
        .await
        .map_err(failure(&queue))?;

    Ok((StatusCode::OK, Json(Envelope::new(updated, &queue))))
}

// DELETE /api/small-groups/{id}
#[utoipa::path(
    delete,
    path = "/api/small-groups/{id}",
    tag = "Small Groups",
    params(("id" = Uuid, Path, description = "ID do pequeno grupo")),
    responses(
        (status = 200, description = "Pequeno grupo removido")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_small_group(
    CurrentSession(session): CurrentSession,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let queue = NotificationQueue::new();
    let deleted = session
        .small_groups
        .delete_small_group(id, &queue)
        .await
        .map_err(failure(&queue))?;

    Ok((StatusCode::OK, Json(Envelope::new(deleted, &queue))))
}

// POST /api/small-groups/{id}/members/{member_id}
#[utoipa::path(
    post,
    path = "/api/small-groups/{id}/members/{member_id}",
    tag = "Small Groups",
    params(
        ("id" = Uuid, Path, description = "ID do pequeno grupo"),
        ("member_id" = Uuid, Path, description = "ID do membro")
    ),
    responses(
        (status = 200, description = "true se o vínculo foi criado agora"),
        (status = 404, description = "Grupo ou membro não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_member(
    CurrentSession(session): CurrentSession,
    Path((id, member_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let queue = NotificationQueue::new();
    let inserted = session
        .small_groups
        .add_member_to_group(id, member_id, &queue)
        .await
        .map_err(failure(&queue))?;

    Ok((StatusCode::OK, Json(Envelope::new(inserted, &queue))))
}

// DELETE /api/small-groups/{id}/members/{member_id}
#[utoipa::path(
    delete,
    path = "/api/small-groups/{id}/members/{member_id}",
    tag = "Small Groups",
    params(
        ("id" = Uuid, Path, description = "ID do pequeno grupo"),
        ("member_id" = Uuid, Path, description = "ID do membro")
    ),
    responses(
        (status = 200, description = "true se havia vínculo para remover")
    ),
    security(("api_jwt" = []))
)]
pub async fn remove_member(
    CurrentSession(session): CurrentSession,
    Path((id, member_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let queue = NotificationQueue::new();
    let removed = session
        .small_groups
        .remove_member_from_group(id, member_id, &queue)
        .await
        .map_err(failure(&queue))?;

    Ok((StatusCode::OK, Json(Envelope::new(removed, &queue))))
}

// POST /api/small-groups/{id}/attendance
#[utoipa::path(
    post,
    path = "/api/small-groups/{id}/attendance",
    tag = "Small Groups",
    params(("id" = Uuid, Path, description = "ID do pequeno grupo")),
    request_body = NewAttendance,
    responses(
        (status = 201, description = "Chamada registrada", body = AttendanceRecord),
        (status = 404, description = "Pequeno grupo não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn register_attendance(
    CurrentSession(session): CurrentSession,
    Path(id): Path<Uuid>,
    Json(payload): Json<NewAttendance>,
) -> Result<impl IntoResponse, ApiError> {
    let queue = NotificationQueue::new();
    let record = session
        .small_groups
        .register_attendance(id, payload, &queue)
        .await
        .map_err(failure(&queue))?;

    Ok((StatusCode::CREATED, Json(Envelope::new(record, &queue))))
}

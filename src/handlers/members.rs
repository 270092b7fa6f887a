// src/handlers/members.rs

use axum::{
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        format::display_date,
        notification::NotificationQueue,
    },
    handlers::{failure, Envelope},
    middleware::auth::CurrentSession,
    models::member::{Address, Member, MemberStatus, NewObservation, Responsibles},
};

// =============================================================================
//  PAYLOADS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Ana Souza")]
    pub nome: String,

    #[validate(email(message = "invalid_email"))]
    pub email: Option<String>,

    #[serde(default)]
    #[schema(example = "(11) 98765-4321")]
    pub telefone: String,

    #[serde(default)]
    #[schema(example = "Diaconisa")]
    pub funcao: String,

    #[serde(default)]
    pub status: MemberStatus,

    #[serde(default, with = "display_date::option")]
    #[schema(value_type = String, example = "07/03/1990")]
    pub data_nascimento: Option<NaiveDate>,

    #[serde(default, with = "display_date::option")]
    #[schema(value_type = String, example = "01/01/2020")]
    pub data_ingresso: Option<NaiveDate>,

    #[serde(default)]
    pub local_nascimento: String,

    #[serde(default)]
    pub batizado: bool,

    pub endereco: Option<Address>,
    pub responsaveis: Option<Responsibles>,

    #[serde(default)]
    pub habilidades: Vec<String>,
}

impl MemberPayload {
    fn into_member(self, id: Uuid) -> Member {
        Member {
            id,
            nome: self.nome,
            email: self.email.unwrap_or_default(),
            telefone: self.telefone,
            funcao: self.funcao,
            status: self.status,
            data_nascimento: self.data_nascimento,
            data_ingresso: self.data_ingresso,
            local_nascimento: self.local_nascimento,
            batizado: self.batizado,
            endereco: self.endereco,
            responsaveis: self.responsaveis,
            habilidades: self.habilidades,
            observacoes: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObservationPayload {
    #[validate(length(min = 1, message = "required"))]
    pub titulo: String,
    #[validate(length(min = 1, message = "required"))]
    pub texto: String,
    /// Data no formato de exibição (dd/mm/aaaa); se inválida, vale hoje.
    #[serde(default)]
    #[schema(example = "10/06/2024")]
    pub data: String,
    #[serde(default)]
    pub autor: String,
}

// =============================================================================
//  HANDLERS
// =============================================================================

// GET /api/members
#[utoipa::path(
    get,
    path = "/api/members",
    tag = "Members",
    responses(
        (status = 200, description = "Membros da sessão, ordenados por nome", body = Vec<Member>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_members(CurrentSession(session): CurrentSession) -> Json<Vec<Member>> {
    Json(session.members.members().await)
}

// POST /api/members
#[utoipa::path(
    post,
    path = "/api/members",
    tag = "Members",
    request_body = MemberPayload,
    responses(
        (status = 201, description = "Membro criado", body = Member),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_member(
    CurrentSession(session): CurrentSession,
    Json(payload): Json<MemberPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let queue = NotificationQueue::new();
    let member = session
        .members
        .add_member(payload.into_member(Uuid::nil()), &queue)
        .await
        .map_err(failure(&queue))?;

    Ok((StatusCode::CREATED, Json(Envelope::new(member, &queue))))
}

// GET /api/members/{id}
#[utoipa::path(
    get,
    path = "/api/members/{id}",
    tag = "Members",
    params(("id" = Uuid, Path, description = "ID do membro")),
    responses(
        (status = 200, description = "Membro com dependentes", body = Member),
        (status = 404, description = "Membro não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_member(
    CurrentSession(session): CurrentSession,
    Path(id): Path<Uuid>,
) -> Result<Json<Member>, ApiError> {
    let queue = NotificationQueue::new();
    let member = session
        .members
        .get_member(id, &queue)
        .await
        .map_err(failure(&queue))?
        .ok_or(AppError::MemberNotFound)?;

    Ok(Json(member))
}

// PUT /api/members/{id}
#[utoipa::path(
    put,
    path = "/api/members/{id}",
    tag = "Members",
    params(("id" = Uuid, Path, description = "ID do membro")),
    request_body = MemberPayload,
    responses(
        (status = 200, description = "Membro atualizado", body = Member),
        (status = 404, description = "Membro não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_member(
    CurrentSession(session): CurrentSession,
    Path(id): Path<Uuid>,
    Json(payload): Json<MemberPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let queue = NotificationQueue::new();
    let member = session
        .members
        .update_member(payload.into_member(id), &queue)
        .await
        .map_err(failure(&queue))?;

    Ok((StatusCode::OK, Json(Envelope::new(member, &queue))))
}

// DELETE /api/members/{id}
#[utoipa::path(
    delete,
    path = "/api/members/{id}",
    tag = "Members",
    params(("id" = Uuid, Path, description = "ID do membro")),
    responses(
        (status = 200, description = "Membro removido")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_member(
    CurrentSession(session): CurrentSession,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let queue = NotificationQueue::new();
    let deleted = session
        .members
        .delete_member(id, &queue)
        .await
        .map_err(failure(&queue))?;

    Ok((StatusCode::OK, Json(Envelope::new(deleted, &queue))))
}

// POST /api/members/{id}/toggle-status
#[utoipa::path(
    post,
    path = "/api/members/{id}/toggle-status",
    tag = "Members",
    params(("id" = Uuid, Path, description = "ID do membro")),
    responses(
        (status = 200, description = "Novo status do membro", body = MemberStatus),
        (status = 404, description = "Membro não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn toggle_member_status(
    CurrentSession(session): CurrentSession,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let queue = NotificationQueue::new();
    let status = session
        .members
        .toggle_member_status(id, &queue)
        .await
        .map_err(failure(&queue))?;

    Ok((StatusCode::OK, Json(Envelope::new(status, &queue))))
}

// POST /api/members/{id}/observations
#[utoipa::path(
    post,
    path = "/api/members/{id}/observations",
    tag = "Members",
    params(("id" = Uuid, Path, description = "ID do membro")),
    request_body = ObservationPayload,
    responses(
        (status = 201, description = "Membro atualizado com a nova observação", body = Member),
        (status = 404, description = "Membro não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_observation(
    CurrentSession(session): CurrentSession,
    Path(id): Path<Uuid>,
    Json(payload): Json<ObservationPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let observation = NewObservation {
        titulo: payload.titulo,
        texto: payload.texto,
        data: payload.data,
        autor: payload.autor,
    };

    let queue = NotificationQueue::new();
    let member = session
        .members
        .add_observacao(id, observation, &queue)
        .await
        .map_err(failure(&queue))?;

    Ok((StatusCode::CREATED, Json(Envelope::new(member, &queue))))
}

// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::common;
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::get_me,

        // --- MEMBERS ---
        handlers::members::list_members,
        handlers::members::create_member,
        handlers::members::get_member,
        handlers::members::update_member,
        handlers::members::delete_member,
        handlers::members::toggle_member_status,
        handlers::members::add_observation,

        // --- SMALL GROUPS ---
        handlers::small_groups::list_small_groups,
        handlers::small_groups::create_small_group,
        handlers::small_groups::get_small_group,
        handlers::small_groups::update_small_group,
        handlers::small_groups::delete_small_group,
        handlers::small_groups::add_member,
        handlers::small_groups::remove_member,
        handlers::small_groups::register_attendance,

        // --- Reports ---
        handlers::reports::get_summary,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::Profile,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,

            // --- Notifications ---
            common::notification::Notification,
            common::notification::NotificationKind,

            // --- Members ---
            models::member::MemberStatus,
            models::member::Address,
            models::member::ResponsibleParty,
            models::member::Responsibles,
            models::member::Observation,
            models::member::Member,
            handlers::members::MemberPayload,
            handlers::members::ObservationPayload,

            // --- Small Groups ---
            models::small_group::Frequency,
            models::small_group::Weekday,
            models::small_group::GroupAddress,
            models::small_group::GroupResponsible,
            models::small_group::Visitor,
            models::small_group::AttendanceRecord,
            models::small_group::NewAttendance,
            models::small_group::SmallGroup,
            handlers::small_groups::SmallGroupPayload,

            // --- Reports ---
            models::report::Summary,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação, Registro e Sessão"),
        (name = "Members", description = "Cadastro de Membros"),
        (name = "Small Groups", description = "Pequenos Grupos, Rol e Chamadas"),
        (name = "Reports", description = "Indicadores do Painel")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

// src/models/report.rs

use serde::Serialize;
use utoipa::ToSchema;

// Resumo exibido nos cards do painel
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_members: usize,
    pub active_members: usize,
    pub inactive_members: usize,
    pub total_small_groups: usize,
    pub total_attendance_records: usize,
    pub average_attendance: f64, // presentes + visitantes, por encontro
    pub total_visitors: usize,
    pub birthdays_this_month: usize,
}

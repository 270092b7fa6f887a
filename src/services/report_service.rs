// src/services/report_service.rs

use chrono::{Datelike, NaiveDate};

use crate::models::{
    member::{Member, MemberStatus},
    report::Summary,
    small_group::SmallGroup,
};

/// Indicadores do painel, calculados sobre o estado da sessão (sem consultas).
pub fn build_summary(members: &[Member], groups: &[SmallGroup], today: NaiveDate) -> Summary {
    let active_members = members
        .iter()
        .filter(|m| m.status == MemberStatus::Ativo)
        .count();

    let records: Vec<_> = groups.iter().flat_map(|g| g.chamadas.iter()).collect();
    let total_visitors: usize = records.iter().map(|c| c.visitantes.len()).sum();
    let total_present: usize = records.iter().map(|c| c.membros_presentes.len()).sum();

    let average_attendance = if records.is_empty() {
        0.0
    } else {
        (total_present + total_visitors) as f64 / records.len() as f64
    };

    let birthdays_this_month = members
        .iter()
        .filter_map(|m| m.data_nascimento)
        .filter(|d| d.month() == today.month())
        .count();

    Summary {
        total_members: members.len(),
        active_members,
        inactive_members: members.len() - active_members,
        total_small_groups: groups.len(),
        total_attendance_records: records.len(),
        average_attendance,
        total_visitors,
        birthdays_this_month,
    }
}

// src/models/small_group.rs

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// --- ENUMS ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "group_frequency", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Diario,
    #[default]
    Semanal,
    Quinzenal,
    Mensal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "weekday", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Domingo,
    Segunda,
    Terca,
    Quarta,
    Quinta,
    Sexta,
    Sabado,
}

// --- SUB-REGISTROS ---

/// Endereço do grupo, guardado como JSON na própria linha do grupo.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct GroupAddress {
    #[validate(length(min = 1, message = "required"))]
    pub rua: String,
    #[validate(length(min = 1, message = "required"))]
    pub numero: String,
    #[validate(length(min = 1, message = "required"))]
    pub cep: String,
    #[validate(length(min = 1, message = "required"))]
    pub bairro: String,
    #[validate(length(min = 1, message = "required"))]
    pub cidade: String,
    #[validate(length(min = 1, message = "required"))]
    pub estado: String,
}

fn string_field(object: &Map<String, Value>, key: &str) -> String {
    match object.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

impl GroupAddress {
    /// Qualquer coisa que não seja objeto vira endereço vazio; campos
    /// ausentes viram string vazia.
    pub fn from_json(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::default();
        };
        Self {
            rua: string_field(object, "rua"),
            numero: string_field(object, "numero"),
            cep: string_field(object, "cep"),
            bairro: string_field(object, "bairro"),
            cidade: string_field(object, "cidade"),
            estado: string_field(object, "estado"),
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "rua": self.rua,
            "numero": self.numero,
            "cep": self.cep,
            "bairro": self.bairro,
            "cidade": self.cidade,
            "estado": self.estado,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct GroupResponsible {
    #[validate(length(min = 1, message = "required"))]
    pub nome: String,
    #[validate(length(min = 1, message = "required"))]
    pub telefone: String,
    #[validate(email(message = "invalid_email"))]
    pub email: Option<String>,
}

/// Visitante de um encontro. Não é normalizado: vive dentro do JSON da chamada.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Visitor {
    pub id: Option<String>,
    pub nome: String,
    pub telefone: String,
    pub convidado_por: String,
}

impl Visitor {
    fn from_json(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::default();
        };
        let id = match object.get("id") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        Self {
            id,
            nome: string_field(object, "nome"),
            telefone: string_field(object, "telefone"),
            convidado_por: string_field(object, "convidadoPor"),
        }
    }

    /// Lista ausente ou malformada vira lista vazia; cada visitante tem todos
    /// os campos preenchidos (no mínimo com string vazia).
    pub fn list_from_json(value: &Value) -> Vec<Visitor> {
        match value.as_array() {
            Some(items) => items.iter().map(Visitor::from_json).collect(),
            None => Vec::new(),
        }
    }

    pub fn list_to_json(visitors: &[Visitor]) -> Value {
        Value::Array(
            visitors
                .iter()
                .map(|v| {
                    let mut object = json!({
                        "nome": v.nome,
                        "telefone": v.telefone,
                        "convidadoPor": v.convidado_por,
                    });
                    if let Some(id) = &v.id {
                        object["id"] = json!(id);
                    }
                    object
                })
                .collect(),
        )
    }
}

// --- CHAMADA ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: Uuid,
    #[schema(value_type = String, format = Date, example = "2024-06-10")]
    pub data: NaiveDate,
    pub membros_presentes: Vec<Uuid>,
    pub visitantes: Vec<Visitor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewAttendance {
    #[schema(value_type = String, format = Date, example = "2024-06-10")]
    pub data: NaiveDate,
    #[serde(default)]
    pub membros_presentes: Vec<Uuid>,
    #[serde(default)]
    pub visitantes: Vec<Visitor>,
}

// --- PEQUENO GRUPO ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SmallGroup {
    pub id: Uuid,
    pub nome: String,
    pub descricao: Option<String>,
    pub endereco: GroupAddress,
    pub responsavel: GroupResponsible,
    pub frequencia: Frequency,
    pub dia_semana: Option<Weekday>,
    pub horario: Option<String>,
    /// Reflete sempre a tabela `small_group_members`; só muda pelas operações
    /// de adicionar/remover membro ou pela atualização do grupo.
    pub membros: Vec<Uuid>,
    pub chamadas: Vec<AttendanceRecord>,
}

/// Dados de criação; o id vem do banco.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct NewSmallGroup {
    pub nome: String,
    pub descricao: Option<String>,
    pub endereco: GroupAddress,
    pub responsavel: GroupResponsible,
    pub frequencia: Frequency,
    pub dia_semana: Option<Weekday>,
    pub horario: Option<String>,
    pub membros: Vec<Uuid>,
}

impl NewSmallGroup {
    pub fn into_group(self, id: Uuid) -> SmallGroup {
        SmallGroup {
            id,
            nome: self.nome,
            descricao: self.descricao,
            endereco: self.endereco,
            responsavel: self.responsavel,
            frequencia: self.frequencia,
            dia_semana: self.dia_semana,
            horario: self.horario,
            membros: self.membros,
            chamadas: Vec::new(),
        }
    }
}

impl SmallGroup {
    pub fn assemble(row: SmallGroupRow, membros: Vec<Uuid>, attendance: Vec<AttendanceRow>) -> Self {
        let endereco = row
            .endereco
            .as_ref()
            .map(GroupAddress::from_json)
            .unwrap_or_default();

        let mut chamadas: Vec<AttendanceRecord> =
            attendance.into_iter().map(AttendanceRecord::from).collect();
        // Ordem estável por data; registros do mesmo dia mantêm a ordem de chegada.
        chamadas.sort_by_key(|c| c.data);

        Self {
            id: row.id,
            nome: row.nome,
            descricao: row.descricao,
            endereco,
            responsavel: GroupResponsible {
                nome: row.responsavel_nome.unwrap_or_default(),
                telefone: row.responsavel_telefone.unwrap_or_default(),
                email: row.responsavel_email,
            },
            frequencia: row.frequencia,
            dia_semana: row.dia_semana,
            horario: row.horario,
            membros,
            chamadas,
        }
    }
}

/// Junta as três consultas (grupos, vínculos e chamadas) agrupando por grupo.
pub fn assemble_small_groups(
    rows: Vec<SmallGroupRow>,
    joins: Vec<GroupMemberRow>,
    attendance: Vec<AttendanceRow>,
) -> Vec<SmallGroup> {
    let mut members_by_group: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for join in joins {
        let roster = members_by_group.entry(join.grupo_id).or_default();
        if !roster.contains(&join.membro_id) {
            roster.push(join.membro_id);
        }
    }

    let mut attendance_by_group: HashMap<Uuid, Vec<AttendanceRow>> = HashMap::new();
    for record in attendance {
        attendance_by_group.entry(record.grupo_id).or_default().push(record);
    }

    rows.into_iter()
        .map(|row| {
            let id = row.id;
            SmallGroup::assemble(
                row,
                members_by_group.remove(&id).unwrap_or_default(),
                attendance_by_group.remove(&id).unwrap_or_default(),
            )
        })
        .collect()
}

// --- LINHAS DO BANCO ---

#[derive(Debug, Clone, FromRow)]
pub struct SmallGroupRow {
    pub id: Uuid,
    pub nome: String,
    pub descricao: Option<String>,
    pub endereco: Option<Value>,
    pub responsavel_nome: Option<String>,
    pub responsavel_telefone: Option<String>,
    pub responsavel_email: Option<String>,
    pub frequencia: Frequency,
    pub dia_semana: Option<Weekday>,
    pub horario: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct GroupMemberRow {
    pub grupo_id: Uuid,
    pub membro_id: Uuid,
}

#[derive(Debug, Clone, FromRow)]
pub struct AttendanceRow {
    pub id: Uuid,
    pub grupo_id: Uuid,
    pub data_encontro: NaiveDate,
    pub membros_presentes: Vec<Uuid>,
    pub visitantes: Option<Value>,
}

impl From<AttendanceRow> for AttendanceRecord {
    fn from(row: AttendanceRow) -> Self {
        Self {
            id: row.id,
            data: row.data_encontro,
            membros_presentes: row.membros_presentes,
            visitantes: row
                .visitantes
                .as_ref()
                .map(Visitor::list_from_json)
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group_row(id: Uuid, endereco: Option<Value>) -> SmallGroupRow {
        SmallGroupRow {
            id,
            nome: "Célula A".to_string(),
            descricao: None,
            endereco,
            responsavel_nome: Some("João".to_string()),
            responsavel_telefone: None,
            responsavel_email: None,
            frequencia: Frequency::Semanal,
            dia_semana: Some(Weekday::Segunda),
            horario: Some("19:30".to_string()),
        }
    }

    #[test]
    fn malformed_address_becomes_empty_address() {
        for value in [json!("Rua A, 10"), json!([1, 2]), json!(null), json!(42)] {
            assert_eq!(GroupAddress::from_json(&value), GroupAddress::default());
        }
    }

    #[test]
    fn partial_address_fills_missing_fields_with_empty_strings() {
        let address = GroupAddress::from_json(&json!({ "rua": "Rua A", "numero": 10 }));
        assert_eq!(address.rua, "Rua A");
        assert_eq!(address.numero, "10");
        assert_eq!(address.cep, "");
        assert_eq!(address.estado, "");
    }

    #[test]
    fn empty_address_round_trips_as_empty_strings() {
        let stored = GroupAddress::default().to_json();
        let read = GroupAddress::from_json(&stored);
        assert_eq!(read, GroupAddress::default());
        assert!(stored.as_object().unwrap().values().all(|v| v == ""));
    }

    #[test]
    fn visitors_are_default_filled() {
        let visitors = Visitor::list_from_json(&json!([
            { "nome": "Ana", "convidadoPor": "m2" },
            { "id": 7 },
            "lixo"
        ]));

        assert_eq!(visitors.len(), 3);
        assert_eq!(visitors[0].nome, "Ana");
        assert_eq!(visitors[0].telefone, "");
        assert_eq!(visitors[0].convidado_por, "m2");
        assert_eq!(visitors[1].id.as_deref(), Some("7"));
        assert_eq!(visitors[1].nome, "");
        assert_eq!(visitors[2], Visitor::default());
    }

    #[test]
    fn non_array_visitor_list_is_empty() {
        assert!(Visitor::list_from_json(&json!({ "nome": "Ana" })).is_empty());
        assert!(Visitor::list_from_json(&json!(null)).is_empty());
    }

    #[test]
    fn visitors_round_trip_through_json() {
        let visitors = vec![Visitor {
            id: None,
            nome: "Ana".into(),
            telefone: "".into(),
            convidado_por: "m2".into(),
        }];
        assert_eq!(Visitor::list_from_json(&Visitor::list_to_json(&visitors)), visitors);
    }

    #[test]
    fn assemble_small_groups_groups_joins_and_attendance() {
        let g1 = Uuid::new_v4();
        let g2 = Uuid::new_v4();
        let m1 = Uuid::new_v4();
        let m2 = Uuid::new_v4();

        let groups = assemble_small_groups(
            vec![group_row(g1, Some(json!("inválido"))), group_row(g2, None)],
            vec![
                GroupMemberRow { grupo_id: g1, membro_id: m1 },
                GroupMemberRow { grupo_id: g1, membro_id: m2 },
                GroupMemberRow { grupo_id: g1, membro_id: m1 },
                GroupMemberRow { grupo_id: g2, membro_id: m2 },
            ],
            vec![
                AttendanceRow {
                    id: Uuid::new_v4(),
                    grupo_id: g1,
                    data_encontro: NaiveDate::from_ymd_opt(2024, 6, 17).unwrap(),
                    membros_presentes: vec![m1],
                    visitantes: None,
                },
                AttendanceRow {
                    id: Uuid::new_v4(),
                    grupo_id: g1,
                    data_encontro: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
                    membros_presentes: vec![m2],
                    visitantes: Some(json!({ "nome": "não é lista" })),
                },
            ],
        );

        assert_eq!(groups[0].membros, vec![m1, m2]);
        assert_eq!(groups[0].endereco, GroupAddress::default());
        assert_eq!(groups[0].chamadas.len(), 2);
        assert_eq!(groups[0].chamadas[0].data, NaiveDate::from_ymd_opt(2024, 6, 10).unwrap());
        assert!(groups[0].chamadas[0].visitantes.is_empty());
        assert_eq!(groups[0].responsavel.telefone, "");

        assert_eq!(groups[1].membros, vec![m2]);
        assert!(groups[1].chamadas.is_empty());
    }

    #[test]
    fn group_address_requires_every_field() {
        let mut address = GroupAddress {
            rua: "Rua A".into(),
            numero: "10".into(),
            cep: "01310-100".into(),
            bairro: "Centro".into(),
            cidade: "São Paulo".into(),
            estado: "SP".into(),
        };
        assert!(address.validate().is_ok());

        address.bairro.clear();
        let errors = address.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("bairro"));
    }
}

// src/models/member.rs

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::{format::display_date, sync::dedup_preserving_order};

// --- ENUMS ---

// Mapeia o CREATE TYPE member_status do banco
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "member_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    #[default]
    Ativo,
    Inativo,
}

impl MemberStatus {
    pub fn toggled(self) -> Self {
        match self {
            MemberStatus::Ativo => MemberStatus::Inativo,
            MemberStatus::Inativo => MemberStatus::Ativo,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MemberStatus::Ativo => "ativo",
            MemberStatus::Inativo => "inativo",
        }
    }
}

// Mapeia o CREATE TYPE responsible_kind (pai / mãe)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "responsible_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ResponsibleKind {
    Pai,
    Mae,
}

// --- VIEW MODEL (o que as telas consomem) ---

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    /// Id da linha em `member_addresses`, quando já existe.
    pub id: Option<Uuid>,
    pub rua: String,
    pub numero: String,
    pub cep: String,
    pub bairro: String,
    pub cidade: String,
    pub estado: String,
}

impl Address {
    /// Só gravamos o endereço se pelo menos um campo foi preenchido.
    pub fn has_content(&self) -> bool {
        [&self.rua, &self.numero, &self.cep, &self.bairro, &self.cidade, &self.estado]
            .iter()
            .any(|field| !field.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ResponsibleParty {
    pub id: Option<Uuid>,
    pub nome: String,
    pub telefone: String,
}

impl ResponsibleParty {
    pub fn has_content(&self) -> bool {
        !self.nome.trim().is_empty() || !self.telefone.trim().is_empty()
    }
}

/// Pai e mãe, usados para membros menores de idade.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Responsibles {
    pub pai: Option<ResponsibleParty>,
    pub mae: Option<ResponsibleParty>,
}

impl Responsibles {
    pub fn get(&self, kind: ResponsibleKind) -> Option<&ResponsibleParty> {
        match kind {
            ResponsibleKind::Pai => self.pai.as_ref(),
            ResponsibleKind::Mae => self.mae.as_ref(),
        }
    }

    fn slot(&mut self, kind: ResponsibleKind) -> &mut Option<ResponsibleParty> {
        match kind {
            ResponsibleKind::Pai => &mut self.pai,
            ResponsibleKind::Mae => &mut self.mae,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub id: Uuid,
    pub titulo: String,
    pub texto: String,
    #[serde(with = "display_date")]
    #[schema(value_type = String, example = "10/06/2024")]
    pub data: NaiveDate,
    pub autor: String,
}

/// Observação como vem do formulário: a data ainda está no formato de exibição.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct NewObservation {
    pub titulo: String,
    pub texto: String,
    #[schema(example = "10/06/2024")]
    pub data: String,
    pub autor: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Member {
    /// Provisório até o insert; o id definitivo vem do banco.
    pub id: Uuid,
    pub nome: String,
    pub email: String,
    pub telefone: String,
    pub funcao: String,
    pub status: MemberStatus,
    #[serde(with = "display_date::option")]
    #[schema(value_type = String, example = "07/03/1990")]
    pub data_nascimento: Option<NaiveDate>,
    #[serde(with = "display_date::option")]
    #[schema(value_type = String, example = "01/01/2020")]
    pub data_ingresso: Option<NaiveDate>,
    pub local_nascimento: String,
    pub batizado: bool,
    pub endereco: Option<Address>,
    pub responsaveis: Option<Responsibles>,
    pub habilidades: Vec<String>,
    pub observacoes: Vec<Observation>,
}

impl Member {
    /// Endereço a ser gravado no insert (ausente se todos os campos estão vazios).
    pub fn address_to_write(&self) -> Option<&Address> {
        self.endereco.as_ref().filter(|address| address.has_content())
    }

    /// Responsáveis preenchidos, na ordem pai, mãe.
    pub fn responsibles_to_write(&self) -> Vec<(ResponsibleKind, &ResponsibleParty)> {
        let Some(responsibles) = self.responsaveis.as_ref() else {
            return Vec::new();
        };
        [ResponsibleKind::Pai, ResponsibleKind::Mae]
            .into_iter()
            .filter_map(|kind| {
                responsibles
                    .get(kind)
                    .filter(|party| party.has_content())
                    .map(|party| (kind, party))
            })
            .collect()
    }

    /// Habilidades sem espaços sobrando, sem vazias e sem repetição.
    pub fn skills_to_write(&self) -> Vec<String> {
        let trimmed: Vec<String> = self
            .habilidades
            .iter()
            .map(|skill| skill.trim().to_string())
            .filter(|skill| !skill.is_empty())
            .collect();
        dedup_preserving_order(&trimmed)
    }

    /// Monta o objeto aninhado a partir das linhas planas.
    pub fn assemble(
        row: MemberRow,
        address: Option<MemberAddressRow>,
        responsibles: Vec<ResponsibleRow>,
        skills: Vec<SkillRow>,
        observations: Vec<ObservationRow>,
    ) -> Self {
        let responsaveis = if responsibles.is_empty() {
            None
        } else {
            let mut pair = Responsibles::default();
            for r in responsibles {
                *pair.slot(r.tipo) = Some(ResponsibleParty {
                    id: Some(r.id),
                    nome: r.nome.unwrap_or_default(),
                    telefone: r.telefone.unwrap_or_default(),
                });
            }
            Some(pair)
        };

        let mut observacoes: Vec<Observation> =
            observations.into_iter().map(Observation::from).collect();
        observacoes.sort_by(|a, b| b.data.cmp(&a.data));

        Self {
            id: row.id,
            nome: row.nome,
            email: row.email.unwrap_or_default(),
            telefone: row.telefone.unwrap_or_default(),
            funcao: row.funcao.unwrap_or_default(),
            status: row.status,
            data_nascimento: row.data_nascimento,
            data_ingresso: row.data_ingresso,
            local_nascimento: row.local_nascimento.unwrap_or_default(),
            batizado: row.batizado,
            endereco: address.map(Address::from),
            responsaveis,
            habilidades: skills.into_iter().map(|s| s.habilidade).collect(),
            observacoes,
        }
    }
}

/// Agrupa os dependentes por `member_id` e monta a lista na ordem das linhas.
pub fn assemble_members(
    rows: Vec<MemberRow>,
    addresses: Vec<MemberAddressRow>,
    responsibles: Vec<ResponsibleRow>,
    skills: Vec<SkillRow>,
    observations: Vec<ObservationRow>,
) -> Vec<Member> {
    let mut addresses_by_member: HashMap<Uuid, MemberAddressRow> = HashMap::new();
    for address in addresses {
        // Se houver mais de um endereço para o mesmo membro, vale o primeiro.
        addresses_by_member.entry(address.member_id).or_insert(address);
    }

    let mut responsibles_by_member: HashMap<Uuid, Vec<ResponsibleRow>> = HashMap::new();
    for r in responsibles {
        responsibles_by_member.entry(r.member_id).or_default().push(r);
    }

    let mut skills_by_member: HashMap<Uuid, Vec<SkillRow>> = HashMap::new();
    for s in skills {
        skills_by_member.entry(s.member_id).or_default().push(s);
    }

    let mut observations_by_member: HashMap<Uuid, Vec<ObservationRow>> = HashMap::new();
    for o in observations {
        observations_by_member.entry(o.member_id).or_default().push(o);
    }

    rows.into_iter()
        .map(|row| {
            let id = row.id;
            Member::assemble(
                row,
                addresses_by_member.remove(&id),
                responsibles_by_member.remove(&id).unwrap_or_default(),
                skills_by_member.remove(&id).unwrap_or_default(),
                observations_by_member.remove(&id).unwrap_or_default(),
            )
        })
        .collect()
}

// --- LINHAS DO BANCO ---

#[derive(Debug, Clone, FromRow)]
pub struct MemberRow {
    pub id: Uuid,
    pub nome: String,
    pub email: Option<String>,
    pub telefone: Option<String>,
    pub funcao: Option<String>,
    pub status: MemberStatus,
    pub data_nascimento: Option<NaiveDate>,
    pub data_ingresso: Option<NaiveDate>,
    pub local_nascimento: Option<String>,
    pub batizado: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct MemberAddressRow {
    pub id: Uuid,
    pub member_id: Uuid,
    pub rua: Option<String>,
    pub numero: Option<String>,
    pub cep: Option<String>,
    pub bairro: Option<String>,
    pub cidade: Option<String>,
    pub estado: Option<String>,
}

impl From<MemberAddressRow> for Address {
    fn from(row: MemberAddressRow) -> Self {
        Self {
            id: Some(row.id),
            rua: row.rua.unwrap_or_default(),
            numero: row.numero.unwrap_or_default(),
            cep: row.cep.unwrap_or_default(),
            bairro: row.bairro.unwrap_or_default(),
            cidade: row.cidade.unwrap_or_default(),
            estado: row.estado.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ResponsibleRow {
    pub id: Uuid,
    pub member_id: Uuid,
    pub tipo: ResponsibleKind,
    pub nome: Option<String>,
    pub telefone: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct SkillRow {
    pub id: Uuid,
    pub member_id: Uuid,
    pub habilidade: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct ObservationRow {
    pub id: Uuid,
    pub member_id: Uuid,
    pub titulo: String,
    pub texto: String,
    pub data: NaiveDate,
    pub autor: Option<String>,
}

impl From<ObservationRow> for Observation {
    fn from(row: ObservationRow) -> Self {
        Self {
            id: row.id,
            titulo: row.titulo,
            texto: row.texto,
            data: row.data,
            autor: row.autor.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member_row(id: Uuid, nome: &str) -> MemberRow {
        MemberRow {
            id,
            nome: nome.to_string(),
            email: None,
            telefone: Some("(11) 98765-4321".to_string()),
            funcao: Some("Diácono".to_string()),
            status: MemberStatus::Ativo,
            data_nascimento: NaiveDate::from_ymd_opt(1990, 3, 7),
            data_ingresso: None,
            local_nascimento: None,
            batizado: true,
        }
    }

    #[test]
    fn toggling_status_twice_is_identity() {
        for status in [MemberStatus::Ativo, MemberStatus::Inativo] {
            assert_ne!(status.toggled(), status);
            assert_eq!(status.toggled().toggled(), status);
        }
    }

    #[test]
    fn assemble_without_dependents_leaves_sub_records_absent() {
        let id = Uuid::new_v4();
        let member = Member::assemble(member_row(id, "Ana"), None, vec![], vec![], vec![]);

        assert_eq!(member.id, id);
        assert_eq!(member.email, "");
        assert_eq!(member.local_nascimento, "");
        assert!(member.endereco.is_none());
        assert!(member.responsaveis.is_none());
        assert!(member.habilidades.is_empty());
    }

    #[test]
    fn assemble_members_groups_dependents_by_member() {
        let ana = Uuid::new_v4();
        let bia = Uuid::new_v4();

        let members = assemble_members(
            vec![member_row(ana, "Ana"), member_row(bia, "Bia")],
            vec![MemberAddressRow {
                id: Uuid::new_v4(),
                member_id: bia,
                rua: Some("Rua A".into()),
                numero: None,
                cep: Some("01310-100".into()),
                bairro: None,
                cidade: Some("São Paulo".into()),
                estado: Some("SP".into()),
            }],
            vec![ResponsibleRow {
                id: Uuid::new_v4(),
                member_id: ana,
                tipo: ResponsibleKind::Mae,
                nome: Some("Maria".into()),
                telefone: None,
            }],
            vec![
                SkillRow { id: Uuid::new_v4(), member_id: ana, habilidade: "violão".into() },
                SkillRow { id: Uuid::new_v4(), member_id: bia, habilidade: "som".into() },
            ],
            vec![],
        );

        assert_eq!(members.len(), 2);
        assert_eq!(members[0].nome, "Ana");
        assert_eq!(members[0].habilidades, vec!["violão"]);
        let responsaveis = members[0].responsaveis.as_ref().unwrap();
        assert!(responsaveis.pai.is_none());
        assert_eq!(responsaveis.mae.as_ref().unwrap().telefone, "");
        assert!(members[0].endereco.is_none());

        let address = members[1].endereco.as_ref().unwrap();
        assert_eq!(address.numero, "");
        assert_eq!(address.cidade, "São Paulo");
        assert_eq!(members[1].habilidades, vec!["som"]);
    }

    #[test]
    fn only_filled_sub_records_are_written() {
        let member = Member {
            endereco: Some(Address::default()),
            responsaveis: Some(Responsibles {
                pai: Some(ResponsibleParty { id: None, nome: " ".into(), telefone: "".into() }),
                mae: Some(ResponsibleParty { id: None, nome: "Maria".into(), telefone: "".into() }),
            }),
            habilidades: vec![" louvor ".into(), "".into(), "louvor".into(), "som".into()],
            ..Default::default()
        };

        assert!(member.address_to_write().is_none());
        let responsibles = member.responsibles_to_write();
        assert_eq!(responsibles.len(), 1);
        assert_eq!(responsibles[0].0, ResponsibleKind::Mae);
        assert_eq!(member.skills_to_write(), vec!["louvor", "som"]);
    }

    #[test]
    fn member_dates_use_display_format_in_json() {
        let member = Member {
            nome: "Ana".into(),
            data_nascimento: NaiveDate::from_ymd_opt(1990, 3, 7),
            ..Default::default()
        };
        let json = serde_json::to_value(&member).unwrap();
        assert_eq!(json["dataNascimento"], "07/03/1990");
        assert_eq!(json["dataIngresso"], "");
        assert_eq!(json["status"], "ativo");

        let back: Member = serde_json::from_value(json).unwrap();
        assert_eq!(back, member);
    }
}

// Repositórios em memória para exercitar stores, sessões e rotas sem Postgres.
#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Mutex,
};

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use ministerio::{
    common::{error::AppError, sync::SetDiff},
    db::{MemberRepository, SmallGroupRepository},
    models::{
        auth::Profile,
        member::{Member, MemberStatus, Observation, ResponsibleKind, Responsibles},
        small_group::{AttendanceRecord, NewAttendance, NewSmallGroup, SmallGroup},
    },
};

pub fn profile() -> Profile {
    Profile {
        id: Uuid::new_v4(),
        nome: "Secretaria".to_string(),
        cargo: Some("Secretária".to_string()),
        email: "secretaria@igreja.org".to_string(),
    }
}

pub fn member_named(nome: &str) -> Member {
    Member {
        nome: nome.to_string(),
        ..Member::default()
    }
}

pub fn group_named(nome: &str, membros: Vec<Uuid>) -> NewSmallGroup {
    NewSmallGroup {
        nome: nome.to_string(),
        membros,
        ..NewSmallGroup::default()
    }
}

fn unavailable() -> AppError {
    AppError::DatabaseError(sqlx::Error::PoolTimedOut)
}

// =============================================================================
//  MEMBROS
// =============================================================================

#[derive(Default)]
pub struct InMemoryMemberRepository {
    members: Mutex<Vec<Member>>,
    failing: AtomicBool,
    pub list_calls: AtomicUsize,
}

impl InMemoryMemberRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// A partir daqui toda chamada falha como se o banco estivesse fora.
    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn recover(&self) {
        self.failing.store(false, Ordering::SeqCst);
    }

    pub fn stored(&self, id: Uuid) -> Option<Member> {
        self.members.lock().unwrap().iter().find(|m| m.id == id).cloned()
    }

    fn check(&self) -> Result<(), AppError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(unavailable())
        } else {
            Ok(())
        }
    }
}

// O mesmo recorte que o banco faria: só sub-registros com conteúdo ganham linha.
fn normalize_new(member: &Member, id: Uuid) -> Member {
    let endereco = member.address_to_write().map(|address| {
        let mut address = address.clone();
        address.id = Some(Uuid::new_v4());
        address
    });

    let written = member.responsibles_to_write();
    let responsaveis = if written.is_empty() {
        None
    } else {
        let mut pair = Responsibles::default();
        for (kind, party) in written {
            let mut party = party.clone();
            party.id = Some(Uuid::new_v4());
            match kind {
                ResponsibleKind::Pai => pair.pai = Some(party),
                ResponsibleKind::Mae => pair.mae = Some(party),
            }
        }
        Some(pair)
    };

    let mut habilidades = member.skills_to_write();
    habilidades.sort();

    Member {
        id,
        endereco,
        responsaveis,
        habilidades,
        observacoes: Vec::new(),
        ..member.clone()
    }
}

#[async_trait]
impl MemberRepository for InMemoryMemberRepository {
    async fn list_members(&self) -> Result<Vec<Member>, AppError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let mut members = self.members.lock().unwrap().clone();
        members.sort_by(|a, b| a.nome.cmp(&b.nome));
        Ok(members)
    }

    async fn find_member(&self, id: Uuid) -> Result<Option<Member>, AppError> {
        self.check()?;
        Ok(self.stored(id))
    }

    async fn insert_member(&self, member: &Member) -> Result<Uuid, AppError> {
        self.check()?;
        let id = Uuid::new_v4();
        self.members.lock().unwrap().push(normalize_new(member, id));
        Ok(id)
    }

    async fn update_member(&self, member: &Member) -> Result<(), AppError> {
        self.check()?;
        let mut members = self.members.lock().unwrap();
        let stored = members
            .iter_mut()
            .find(|m| m.id == member.id)
            .ok_or(AppError::MemberNotFound)?;

        // Um id de sub-registro só vale se pertencer a este membro.
        if let Some(address) = &member.endereco {
            let own_id = stored.endereco.as_ref().and_then(|a| a.id);
            let known_id = address.id.filter(|id| Some(*id) == own_id).or(own_id);
            if known_id.is_some() || address.has_content() {
                let mut address = address.clone();
                address.id = known_id.or_else(|| Some(Uuid::new_v4()));
                stored.endereco = Some(address);
            }
        }

        if let Some(incoming) = &member.responsaveis {
            let mut pair = stored.responsaveis.clone().unwrap_or_default();
            for kind in [ResponsibleKind::Pai, ResponsibleKind::Mae] {
                let Some(party) = incoming.get(kind) else {
                    continue;
                };
                let existing = pair.get(kind).and_then(|p| p.id);
                let known_id = party.id.filter(|id| Some(*id) == existing).or(existing);
                if known_id.is_some() || party.has_content() {
                    let mut party = party.clone();
                    party.id = known_id.or_else(|| Some(Uuid::new_v4()));
                    match kind {
                        ResponsibleKind::Pai => pair.pai = Some(party),
                        ResponsibleKind::Mae => pair.mae = Some(party),
                    }
                }
            }
            if pair.pai.is_some() || pair.mae.is_some() {
                stored.responsaveis = Some(pair);
            }
        }

        let diff = SetDiff::between(&stored.habilidades, &member.skills_to_write());
        stored.habilidades.retain(|s| !diff.removed.contains(s));
        stored.habilidades.extend(diff.added);
        stored.habilidades.sort();

        stored.nome = member.nome.clone();
        stored.email = member.email.clone();
        stored.telefone = member.telefone.clone();
        stored.funcao = member.funcao.clone();
        stored.status = member.status;
        stored.data_nascimento = member.data_nascimento;
        stored.data_ingresso = member.data_ingresso;
        stored.local_nascimento = member.local_nascimento.clone();
        stored.batizado = member.batizado;
        Ok(())
    }

    async fn delete_member(&self, id: Uuid) -> Result<bool, AppError> {
        self.check()?;
        let mut members = self.members.lock().unwrap();
        let before = members.len();
        members.retain(|m| m.id != id);
        Ok(members.len() < before)
    }

    async fn set_member_status(&self, id: Uuid, status: MemberStatus) -> Result<bool, AppError> {
        self.check()?;
        let mut members = self.members.lock().unwrap();
        match members.iter_mut().find(|m| m.id == id) {
            Some(member) => {
                member.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_observation(
        &self,
        member_id: Uuid,
        titulo: &str,
        texto: &str,
        data: NaiveDate,
        autor: &str,
    ) -> Result<Observation, AppError> {
        self.check()?;
        let mut members = self.members.lock().unwrap();
        let member = members
            .iter_mut()
            .find(|m| m.id == member_id)
            .ok_or(AppError::MemberNotFound)?;

        let observation = Observation {
            id: Uuid::new_v4(),
            titulo: titulo.to_string(),
            texto: texto.to_string(),
            data,
            autor: autor.to_string(),
        };
        member.observacoes.push(observation.clone());
        member.observacoes.sort_by(|a, b| b.data.cmp(&a.data));
        Ok(observation)
    }
}

// =============================================================================
//  PEQUENOS GRUPOS
// =============================================================================

#[derive(Default)]
pub struct InMemorySmallGroupRepository {
    groups: Mutex<Vec<SmallGroup>>,
    failing: AtomicBool,
    pub find_calls: AtomicUsize,
    pub membership_inserts: AtomicUsize,
}

impl InMemorySmallGroupRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn recover(&self) {
        self.failing.store(false, Ordering::SeqCst);
    }

    /// Grava direto no "banco", sem passar pelo store.
    pub fn seed(&self, group: NewSmallGroup) -> Uuid {
        let id = Uuid::new_v4();
        self.groups.lock().unwrap().push(group.into_group(id));
        id
    }

    pub fn stored(&self, id: Uuid) -> Option<SmallGroup> {
        self.groups.lock().unwrap().iter().find(|g| g.id == id).cloned()
    }

    fn check(&self) -> Result<(), AppError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(unavailable())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SmallGroupRepository for InMemorySmallGroupRepository {
    async fn list_small_groups(&self) -> Result<Vec<SmallGroup>, AppError> {
        self.check()?;
        let mut groups = self.groups.lock().unwrap().clone();
        groups.sort_by(|a, b| a.nome.cmp(&b.nome));
        Ok(groups)
    }

    async fn find_small_group(&self, id: Uuid) -> Result<Option<SmallGroup>, AppError> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.stored(id))
    }

    async fn insert_small_group(&self, group: &NewSmallGroup) -> Result<SmallGroup, AppError> {
        self.check()?;
        let mut created = group.clone().into_group(Uuid::new_v4());
        let mut unique = Vec::new();
        for id in created.membros {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        created.membros = unique;
        self.groups.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn update_small_group(&self, group: &SmallGroup) -> Result<(), AppError> {
        self.check()?;
        let mut groups = self.groups.lock().unwrap();
        let stored = groups
            .iter_mut()
            .find(|g| g.id == group.id)
            .ok_or(AppError::SmallGroupNotFound)?;

        let diff = SetDiff::between(&stored.membros, &group.membros);
        stored.membros.retain(|id| !diff.removed.contains(id));
        stored.membros.extend(diff.added);

        stored.nome = group.nome.clone();
        stored.descricao = group.descricao.clone();
        stored.endereco = group.endereco.clone();
        stored.responsavel = group.responsavel.clone();
        stored.frequencia = group.frequencia;
        stored.dia_semana = group.dia_semana;
        stored.horario = group.horario.clone();
        Ok(())
    }

    async fn delete_small_group(&self, id: Uuid) -> Result<bool, AppError> {
        self.check()?;
        let mut groups = self.groups.lock().unwrap();
        let before = groups.len();
        groups.retain(|g| g.id != id);
        Ok(groups.len() < before)
    }

    async fn membership_exists(&self, group_id: Uuid, member_id: Uuid) -> Result<bool, AppError> {
        self.check()?;
        Ok(self
            .stored(group_id)
            .is_some_and(|g| g.membros.contains(&member_id)))
    }

    async fn insert_membership(&self, group_id: Uuid, member_id: Uuid) -> Result<bool, AppError> {
        self.check()?;
        let mut groups = self.groups.lock().unwrap();
        let group = groups
            .iter_mut()
            .find(|g| g.id == group_id)
            .ok_or(AppError::SmallGroupNotFound)?;
        if group.membros.contains(&member_id) {
            return Ok(false);
        }
        self.membership_inserts.fetch_add(1, Ordering::SeqCst);
        group.membros.push(member_id);
        Ok(true)
    }

    async fn delete_membership(&self, group_id: Uuid, member_id: Uuid) -> Result<bool, AppError> {
        self.check()?;
        let mut groups = self.groups.lock().unwrap();
        let Some(group) = groups.iter_mut().find(|g| g.id == group_id) else {
            return Ok(false);
        };
        let before = group.membros.len();
        group.membros.retain(|id| *id != member_id);
        Ok(group.membros.len() < before)
    }

    async fn insert_attendance(
        &self,
        group_id: Uuid,
        attendance: &NewAttendance,
    ) -> Result<AttendanceRecord, AppError> {
        self.check()?;
        let mut groups = self.groups.lock().unwrap();
        let group = groups
            .iter_mut()
            .find(|g| g.id == group_id)
            .ok_or(AppError::SmallGroupNotFound)?;

        let record = AttendanceRecord {
            id: Uuid::new_v4(),
            data: attendance.data,
            membros_presentes: attendance.membros_presentes.clone(),
            visitantes: attendance.visitantes.clone(),
        };
        group.chamadas.push(record.clone());
        Ok(record)
    }
}

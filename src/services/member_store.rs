// src/services/member_store.rs

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use chrono::Local;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        format::parse_observation_date,
        notification::{report_failure, Notification, Notifier},
    },
    db::MemberRepository,
    models::member::{Member, MemberStatus, NewObservation},
};

/// Fonte única dos dados de membros durante uma sessão.
///
/// Mantém a lista materializada em memória; toda escrita passa pelo
/// repositório, recarrega o estado e emite exatamente uma notificação.
pub struct MemberStore {
    repo: Arc<dyn MemberRepository>,
    members: RwLock<Vec<Member>>,
    loading: AtomicBool,
}

impl MemberStore {
    pub fn new(repo: Arc<dyn MemberRepository>) -> Self {
        Self {
            repo,
            members: RwLock::new(Vec::new()),
            loading: AtomicBool::new(false),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Cópia do estado atual.
    pub async fn members(&self) -> Vec<Member> {
        self.members.read().await.clone()
    }

    /// Descarta o estado (logout).
    pub async fn clear(&self) {
        self.members.write().await.clear();
    }

    async fn reload(&self) -> Result<(), AppError> {
        self.loading.store(true, Ordering::SeqCst);
        let result = self.repo.list_members().await;
        self.loading.store(false, Ordering::SeqCst);

        let members = result?;
        *self.members.write().await = members;
        Ok(())
    }

    // Depois de uma escrita bem-sucedida, falha na releitura não desfaz o
    // sucesso; só fica registrada no log.
    async fn reload_after_write(&self) {
        if let Err(e) = self.reload().await {
            tracing::warn!("⚠️ Escrita concluída, mas a lista de membros não foi recarregada: {}", e);
        }
    }

    /// Carga completa, disparada na abertura da sessão. Em caso de falha a
    /// lista fica vazia.
    pub async fn list_members(&self, notifier: &dyn Notifier) -> Result<Vec<Member>, AppError> {
        match self.reload().await {
            Ok(()) => {
                let members = self.members().await;
                tracing::debug!("{} membros carregados", members.len());
                Ok(members)
            }
            Err(e) => {
                self.members.write().await.clear();
                Err(report_failure(notifier, "carregar os membros", e))
            }
        }
    }

    pub async fn get_member(
        &self,
        id: Uuid,
        notifier: &dyn Notifier,
    ) -> Result<Option<Member>, AppError> {
        self.repo
            .find_member(id)
            .await
            .map_err(|e| report_failure(notifier, "carregar o membro", e))
    }

    /// Não valida nada (isso é papel do formulário). O id do argumento é
    /// provisório: vale o que o banco gerar.
    pub async fn add_member(&self, member: Member, notifier: &dyn Notifier) -> Result<Member, AppError> {
        let id = self
            .repo
            .insert_member(&member)
            .await
            .map_err(|e| report_failure(notifier, "adicionar o membro", e))?;

        tracing::info!("✅ Membro {} criado ({})", member.nome, id);
        self.reload_after_write().await;

        let created = self
            .find_cached(id)
            .await
            .unwrap_or(Member { id, ..member });

        notifier.notify(Notification::success(
            "Membro adicionado",
            format!("{} foi adicionado com sucesso.", created.nome),
        ));
        Ok(created)
    }

    pub async fn update_member(&self, member: Member, notifier: &dyn Notifier) -> Result<Member, AppError> {
        self.repo
            .update_member(&member)
            .await
            .map_err(|e| report_failure(notifier, "atualizar o membro", e))?;

        tracing::info!("✅ Membro {} atualizado", member.id);
        self.reload_after_write().await;

        let updated = self.find_cached(member.id).await.unwrap_or(member);
        notifier.notify(Notification::success(
            "Membro atualizado",
            format!("Os dados de {} foram atualizados.", updated.nome),
        ));
        Ok(updated)
    }

    /// Remove o membro (dependentes caem em cascata). Devolve `false` se não
    /// havia linha no banco.
    pub async fn delete_member(&self, id: Uuid, notifier: &dyn Notifier) -> Result<bool, AppError> {
        let known_name = self.find_cached(id).await.map(|m| m.nome);

        let deleted = self
            .repo
            .delete_member(id)
            .await
            .map_err(|e| report_failure(notifier, "remover o membro", e))?;

        tracing::info!("🗑️ Membro {} removido (existia: {})", id, deleted);
        self.reload_after_write().await;

        let description = match known_name {
            Some(nome) => format!("{} foi removido.", nome),
            None => "O membro foi removido.".to_string(),
        };
        notifier.notify(Notification::success("Membro removido", description));
        Ok(deleted)
    }

    /// Alterna ativo <-> inativo e devolve o novo status.
    pub async fn toggle_member_status(
        &self,
        id: Uuid,
        notifier: &dyn Notifier,
    ) -> Result<MemberStatus, AppError> {
        let current = match self.find_cached(id).await {
            Some(member) => Some(member),
            None => self
                .repo
                .find_member(id)
                .await
                .map_err(|e| report_failure(notifier, "alterar o status do membro", e))?,
        };
        let Some(member) = current else {
            return Err(report_failure(
                notifier,
                "alterar o status do membro",
                AppError::MemberNotFound,
            ));
        };

        let new_status = member.status.toggled();
        let updated = self
            .repo
            .set_member_status(id, new_status)
            .await
            .map_err(|e| report_failure(notifier, "alterar o status do membro", e))?;
        if !updated {
            return Err(report_failure(
                notifier,
                "alterar o status do membro",
                AppError::MemberNotFound,
            ));
        }

        self.reload_after_write().await;
        notifier.notify(Notification::success(
            "Status atualizado",
            format!("{} agora está {}.", member.nome, new_status.label()),
        ));
        Ok(new_status)
    }

    /// Grava a observação e substitui só a entrada desse membro no estado,
    /// sem recarregar a lista inteira.
    pub async fn add_observacao(
        &self,
        member_id: Uuid,
        observation: NewObservation,
        notifier: &dyn Notifier,
    ) -> Result<Member, AppError> {
        let data = parse_observation_date(&observation.data, Local::now().date_naive());

        self.repo
            .insert_observation(
                member_id,
                &observation.titulo,
                &observation.texto,
                data,
                &observation.autor,
            )
            .await
            .map_err(|e| report_failure(notifier, "adicionar a observação", e))?;

        let refreshed = self
            .repo
            .find_member(member_id)
            .await
            .map_err(|e| report_failure(notifier, "adicionar a observação", e))?;
        let Some(refreshed) = refreshed else {
            return Err(report_failure(
                notifier,
                "adicionar a observação",
                AppError::MemberNotFound,
            ));
        };

        {
            let mut members = self.members.write().await;
            match members.iter_mut().find(|m| m.id == member_id) {
                Some(slot) => *slot = refreshed.clone(),
                None => members.push(refreshed.clone()),
            }
        }

        notifier.notify(Notification::success(
            "Observação adicionada",
            format!("Observação registrada para {}.", refreshed.nome),
        ));
        Ok(refreshed)
    }

    async fn find_cached(&self, id: Uuid) -> Option<Member> {
        self.members.read().await.iter().find(|m| m.id == id).cloned()
    }
}

// src/services/small_group_store.rs

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        format::to_display_date,
        notification::{report_failure, Notification, Notifier},
        sync::{apply_diff, dedup_preserving_order, SetDiff},
    },
    db::SmallGroupRepository,
    models::small_group::{AttendanceRecord, NewAttendance, NewSmallGroup, SmallGroup},
};

/// Grupos, vínculos com membros e histórico de chamadas de uma sessão.
pub struct SmallGroupStore {
    repo: Arc<dyn SmallGroupRepository>,
    groups: RwLock<Vec<SmallGroup>>,
    loading: AtomicBool,
}

impl SmallGroupStore {
    pub fn new(repo: Arc<dyn SmallGroupRepository>) -> Self {
        Self {
            repo,
            groups: RwLock::new(Vec::new()),
            loading: AtomicBool::new(false),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub async fn small_groups(&self) -> Vec<SmallGroup> {
        self.groups.read().await.clone()
    }

    pub async fn clear(&self) {
        self.groups.write().await.clear();
    }

    pub async fn list_small_groups(
        &self,
        notifier: &dyn Notifier,
    ) -> Result<Vec<SmallGroup>, AppError> {
        self.loading.store(true, Ordering::SeqCst);
        let result = self.repo.list_small_groups().await;
        self.loading.store(false, Ordering::SeqCst);

        match result {
            Ok(groups) => {
                tracing::debug!("{} pequenos grupos carregados", groups.len());
                *self.groups.write().await = groups.clone();
                Ok(groups)
            }
            Err(e) => {
                self.groups.write().await.clear();
                Err(report_failure(notifier, "carregar os pequenos grupos", e))
            }
        }
    }

    pub async fn add_small_group(
        &self,
        group: NewSmallGroup,
        notifier: &dyn Notifier,
    ) -> Result<SmallGroup, AppError> {
        let created = self
            .repo
            .insert_small_group(&group)
            .await
            .map_err(|e| report_failure(notifier, "criar o pequeno grupo", e))?;

        tracing::info!("✅ Pequeno grupo {} criado ({})", created.nome, created.id);
        self.groups.write().await.push(created.clone());

        notifier.notify(Notification::success(
            "Pequeno grupo criado",
            format!("{} foi criado com sucesso.", created.nome),
        ));
        Ok(created)
    }

    /// Atualiza o grupo e sincroniza o rol de membros com `group.membros`.
    /// As chamadas não são alteradas por aqui.
    pub async fn update_small_group(
        &self,
        mut group: SmallGroup,
        notifier: &dyn Notifier,
    ) -> Result<SmallGroup, AppError> {
        group.membros = dedup_preserving_order(&group.membros);

        self.repo
            .update_small_group(&group)
            .await
            .map_err(|e| report_failure(notifier, "atualizar o pequeno grupo", e))?;

        tracing::info!("✅ Pequeno grupo {} atualizado", group.id);
        let cached = {
            let mut groups = self.groups.write().await;
            groups.iter_mut().find(|g| g.id == group.id).map(|slot| {
                // Mesma ordem do banco: quem ficou mantém a posição, quem entrou vai para o fim.
                let diff = SetDiff::between(&slot.membros, &group.membros);
                group.membros = apply_diff(&slot.membros, &diff);
                group.chamadas = std::mem::take(&mut slot.chamadas);
                *slot = group.clone();
                slot.clone()
            })
        };
        let updated = match cached {
            Some(updated) => updated,
            None => self.cache_from_backend(group).await,
        };

        notifier.notify(Notification::success(
            "Pequeno grupo atualizado",
            format!("{} foi atualizado.", updated.nome),
        ));
        Ok(updated)
    }

    // Grupo fora do estado: as chamadas só existem no banco, então relemos
    // antes de gravar. Se a releitura falhar, o estado fica como estava.
    async fn cache_from_backend(&self, written: SmallGroup) -> SmallGroup {
        match self.repo.find_small_group(written.id).await {
            Ok(Some(fresh)) => {
                let mut groups = self.groups.write().await;
                if let Some(existing) = groups.iter().find(|g| g.id == fresh.id) {
                    return existing.clone();
                }
                groups.push(fresh.clone());
                fresh
            }
            Ok(None) => written,
            Err(e) => {
                tracing::warn!(
                    "⚠️ Pequeno grupo {} atualizado, mas não foi relido do banco: {}",
                    written.id,
                    e
                );
                written
            }
        }
    }

    pub async fn delete_small_group(&self, id: Uuid, notifier: &dyn Notifier) -> Result<bool, AppError> {
        let known_name = self.find_cached(id).await.map(|g| g.nome);

        let deleted = self
            .repo
            .delete_small_group(id)
            .await
            .map_err(|e| report_failure(notifier, "remover o pequeno grupo", e))?;

        tracing::info!("🗑️ Pequeno grupo {} removido (existia: {})", id, deleted);
        self.groups.write().await.retain(|g| g.id != id);

        let description = match known_name {
            Some(nome) => format!("{} foi removido.", nome),
            None => "O pequeno grupo foi removido.".to_string(),
        };
        notifier.notify(Notification::success("Pequeno grupo removido", description));
        Ok(deleted)
    }

    /// Leitura cache-first. Num cache miss o grupo é buscado no banco e
    /// gravado no estado, para que todos os leitores vejam a mesma cópia.
    pub async fn get_small_group_by_id(
        &self,
        id: Uuid,
        notifier: &dyn Notifier,
    ) -> Result<Option<SmallGroup>, AppError> {
        if let Some(group) = self.find_cached(id).await {
            tracing::debug!("Pequeno grupo {} servido do estado", id);
            return Ok(Some(group));
        }

        tracing::debug!("Pequeno grupo {} fora do estado, buscando no banco", id);
        let fetched = self
            .repo
            .find_small_group(id)
            .await
            .map_err(|e| report_failure(notifier, "carregar o pequeno grupo", e))?;

        if let Some(group) = &fetched {
            let mut groups = self.groups.write().await;
            // Outro leitor pode ter gravado enquanto buscávamos
            if let Some(existing) = groups.iter().find(|g| g.id == id) {
                return Ok(Some(existing.clone()));
            }
            groups.push(group.clone());
        }
        Ok(fetched)
    }

    pub async fn get_small_group(
        &self,
        id: Uuid,
        notifier: &dyn Notifier,
    ) -> Result<Option<SmallGroup>, AppError> {
        self.get_small_group_by_id(id, notifier).await
    }

    /// Idempotente: se o vínculo já existe nada é gravado. Devolve `true`
    /// quando um vínculo novo foi criado.
    pub async fn add_member_to_group(
        &self,
        group_id: Uuid,
        member_id: Uuid,
        notifier: &dyn Notifier,
    ) -> Result<bool, AppError> {
        let exists = self
            .repo
            .membership_exists(group_id, member_id)
            .await
            .map_err(|e| report_failure(notifier, "adicionar o membro ao grupo", e))?;

        let inserted = if exists {
            tracing::debug!("Membro {} já pertence ao grupo {}", member_id, group_id);
            false
        } else {
            self.repo
                .insert_membership(group_id, member_id)
                .await
                .map_err(|e| report_failure(notifier, "adicionar o membro ao grupo", e))?
        };

        self.append_to_roster(group_id, member_id).await;

        if inserted {
            tracing::info!("✅ Membro {} adicionado ao grupo {}", member_id, group_id);
            notifier.notify(Notification::success(
                "Membro adicionado ao grupo",
                "O membro agora faz parte do pequeno grupo.",
            ));
        } else {
            notifier.notify(Notification::success(
                "Nenhuma alteração",
                "O membro já faz parte deste pequeno grupo.",
            ));
        }
        Ok(inserted)
    }

    pub async fn remove_member_from_group(
        &self,
        group_id: Uuid,
        member_id: Uuid,
        notifier: &dyn Notifier,
    ) -> Result<bool, AppError> {
        let removed = self
            .repo
            .delete_membership(group_id, member_id)
            .await
            .map_err(|e| report_failure(notifier, "remover o membro do grupo", e))?;

        {
            let mut groups = self.groups.write().await;
            if let Some(group) = groups.iter_mut().find(|g| g.id == group_id) {
                group.membros.retain(|id| *id != member_id);
            }
        }

        tracing::info!("🗑️ Membro {} removido do grupo {}", member_id, group_id);
        notifier.notify(Notification::success(
            "Membro removido do grupo",
            "O membro não faz mais parte do pequeno grupo.",
        ));
        Ok(removed)
    }

    /// Chamadas só crescem: cada registro entra no fim da lista do grupo.
    pub async fn register_attendance(
        &self,
        group_id: Uuid,
        attendance: NewAttendance,
        notifier: &dyn Notifier,
    ) -> Result<AttendanceRecord, AppError> {
        let record = self
            .repo
            .insert_attendance(group_id, &attendance)
            .await
            .map_err(|e| report_failure(notifier, "registrar a chamada", e))?;

        {
            let mut groups = self.groups.write().await;
            if let Some(group) = groups.iter_mut().find(|g| g.id == group_id) {
                // Ordenado por data como na leitura do banco; mesmo dia, ordem de chegada.
                let position = group.chamadas.partition_point(|c| c.data <= record.data);
                group.chamadas.insert(position, record.clone());
            }
        }

        tracing::info!(
            "✅ Chamada de {} registrada no grupo {} ({} presentes, {} visitantes)",
            record.data,
            group_id,
            record.membros_presentes.len(),
            record.visitantes.len()
        );
        notifier.notify(Notification::success(
            "Chamada registrada",
            format!("Chamada do dia {} registrada.", to_display_date(record.data)),
        ));
        Ok(record)
    }

    async fn append_to_roster(&self, group_id: Uuid, member_id: Uuid) {
        let mut groups = self.groups.write().await;
        if let Some(group) = groups.iter_mut().find(|g| g.id == group_id) {
            if !group.membros.contains(&member_id) {
                group.membros.push(member_id);
            }
        }
    }

    async fn find_cached(&self, id: Uuid) -> Option<SmallGroup> {
        self.groups.read().await.iter().find(|g| g.id == id).cloned()
    }
}

// src/services/session.rs

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::{
    common::notification::Notifier,
    db::{MemberRepository, SmallGroupRepository},
    models::auth::Profile,
    services::{member_store::MemberStore, small_group_store::SmallGroupStore},
};

/// Estado de uma sessão autenticada: criado no login, descartado no logout.
pub struct Session {
    pub id: Uuid,
    pub profile: Profile,
    pub opened_at: DateTime<Utc>,
    pub members: MemberStore,
    pub small_groups: SmallGroupStore,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn { session_id: Uuid, user_id: Uuid },
    SignedOut { session_id: Uuid, user_id: Uuid },
}

#[derive(Clone)]
pub struct SessionRegistry {
    member_repo: Arc<dyn MemberRepository>,
    small_group_repo: Arc<dyn SmallGroupRepository>,
    sessions: Arc<RwLock<HashMap<Uuid, Arc<Session>>>>,
    events: broadcast::Sender<SessionEvent>,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(
        member_repo: Arc<dyn MemberRepository>,
        small_group_repo: Arc<dyn SmallGroupRepository>,
        ttl: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            member_repo,
            small_group_repo,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            events,
            ttl,
        }
    }

    /// Abre a sessão e faz a carga inicial de membros e grupos. Falhas na
    /// carga já viram notificação; a sessão abre mesmo assim, com listas vazias.
    pub async fn open(&self, profile: Profile, notifier: &dyn Notifier) -> Arc<Session> {
        let session = Arc::new(Session {
            id: Uuid::new_v4(),
            profile,
            opened_at: Utc::now(),
            members: MemberStore::new(self.member_repo.clone()),
            small_groups: SmallGroupStore::new(self.small_group_repo.clone()),
        });

        if let Err(e) = session.members.list_members(notifier).await {
            tracing::warn!("Sessão {} aberta sem membros: {}", session.id, e);
        }
        if let Err(e) = session.small_groups.list_small_groups(notifier).await {
            tracing::warn!("Sessão {} aberta sem pequenos grupos: {}", session.id, e);
        }

        self.sweep_expired().await;
        self.sessions
            .write()
            .await
            .insert(session.id, session.clone());

        tracing::info!("🔓 Sessão {} aberta para {}", session.id, session.profile.email);
        // Sem assinantes o envio falha, o que não é um problema.
        let _ = self.events.send(SessionEvent::SignedIn {
            session_id: session.id,
            user_id: session.profile.id,
        });
        session
    }

    /// Sessão ativa; sessões vencidas são encerradas na consulta.
    pub async fn get(&self, id: Uuid) -> Option<Arc<Session>> {
        let session = self.sessions.read().await.get(&id).cloned()?;
        if Utc::now() - session.opened_at > self.ttl {
            tracing::info!("⌛ Sessão {} expirada", id);
            self.close(id).await;
            return None;
        }
        Some(session)
    }

    /// Encerra a sessão e descarta o estado em memória.
    pub async fn close(&self, id: Uuid) -> bool {
        let Some(session) = self.sessions.write().await.remove(&id) else {
            return false;
        };

        session.members.clear().await;
        session.small_groups.clear().await;

        tracing::info!("🔒 Sessão {} encerrada", id);
        let _ = self.events.send(SessionEvent::SignedOut {
            session_id: id,
            user_id: session.profile.id,
        });
        true
    }

    /// Encerra todas as sessões vencidas. Devolve quantas foram removidas.
    pub async fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let expired: Vec<Arc<Session>> = {
            let mut sessions = self.sessions.write().await;
            let ids: Vec<Uuid> = sessions
                .values()
                .filter(|s| now - s.opened_at > self.ttl)
                .map(|s| s.id)
                .collect();
            ids.iter().filter_map(|id| sessions.remove(id)).collect()
        };

        for session in &expired {
            session.members.clear().await;
            session.small_groups.clear().await;
            let _ = self.events.send(SessionEvent::SignedOut {
                session_id: session.id,
                user_id: session.profile.id,
            });
        }

        if !expired.is_empty() {
            tracing::info!(
                "⌛ {} sessão(ões) expirada(s) encerrada(s); {} ativa(s)",
                expired.len(),
                self.active_sessions().await
            );
        }
        expired.len()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn active_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }
}

// src/common/notification.rs

use std::sync::Mutex;

use serde::Serialize;
use utoipa::ToSchema;

use crate::common::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Destructive,
}

/// Aviso exibido ao usuário ao final de uma operação.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub description: String,
}

impl Notification {
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn destructive(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Destructive,
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Destino das notificações. Toda operação de escrita emite exatamente uma.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Fila em memória, criada por requisição e esvaziada na resposta.
#[derive(Debug, Default)]
pub struct NotificationQueue {
    inner: Mutex<Vec<Notification>>,
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<Notification> {
        let mut guard = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::take(&mut *guard)
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Notifier for NotificationQueue {
    fn notify(&self, notification: Notification) {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(notification);
    }
}

/// Loga a falha, avisa o usuário com a mensagem genérica e devolve o erro.
pub fn report_failure(notifier: &dyn Notifier, action: &str, err: AppError) -> AppError {
    tracing::error!("🔥 Falha ao {}: {}", action, err);
    notifier.notify(Notification::destructive(
        "Erro",
        format!("Não foi possível {}. Tente novamente.", action),
    ));
    err
}

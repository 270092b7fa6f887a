pub mod auth;
pub mod members;
pub mod reports;
pub mod small_groups;

use serde::Serialize;

use crate::common::{
    error::{ApiError, AppError},
    notification::{Notification, NotificationQueue},
};

/// Corpo das respostas de escrita: o dado e as notificações emitidas.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub data: T,
    pub notifications: Vec<Notification>,
}

impl<T> Envelope<T> {
    pub fn new(data: T, queue: &NotificationQueue) -> Self {
        Self {
            data,
            notifications: queue.drain(),
        }
    }
}

/// Converte o erro da operação carregando o que já foi notificado.
pub(crate) fn failure(queue: &NotificationQueue) -> impl FnOnce(AppError) -> ApiError + '_ {
    move |err| ApiError::from(err).with_notifications(queue.drain())
}

pub mod error;
pub mod format;
pub mod notification;
pub mod sync;

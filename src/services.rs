pub mod auth;
pub mod member_store;
pub mod report_service;
pub mod session;
pub mod small_group_store;

pub mod auth;
pub mod member;
pub mod report;
pub mod small_group;

pub mod audit;
pub mod auth;
pub mod rbac;
pub mod restaurant;
pub mod subscription;
pub mod transaction;

// src/middleware/mod.rs

pub mod auth;
pub mod context;
pub mod rbac;
pub mod subscription;

// src/services/mod.rs

pub mod access;
pub mod auth;
pub mod lifecycle;
pub mod notify;
pub mod pricing;
pub mod restaurant;
pub mod subscription;
pub mod sweep;
pub mod team;

// src/handlers/mod.rs

pub mod audit;
pub mod auth;
pub mod members;
pub mod restaurants;
pub mod roles;
pub mod subscriptions;

// src/middleware.rs

pub mod audit;
pub mod auth;
pub mod rbac;

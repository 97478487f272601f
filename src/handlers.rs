// src/handlers.rs

pub mod audit;
pub mod auth;
pub mod permissions;

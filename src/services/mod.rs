// src/services/mod.rs
pub mod ai;
pub mod auth;
pub mod config;
pub mod download;
pub mod error;
pub mod history;
pub mod http;
pub mod reports;
pub mod session;
pub mod subscriptions;

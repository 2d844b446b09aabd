// src/handlers/mod.rs

pub mod admin;
pub mod auth;
pub mod blogs;
pub mod comments;
pub mod follows;
pub mod interactions;
pub mod notifications;
pub mod profile;
pub mod reactions;
pub mod taxonomy;

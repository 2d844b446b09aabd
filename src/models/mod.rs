// src/models/mod.rs

pub mod blog;
pub mod comment;
pub mod follow;
pub mod interaction;
pub mod notification;
pub mod otp;
pub mod profile;
pub mod reaction;
pub mod taxonomy;
pub mod user;

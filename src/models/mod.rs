// src/models/mod.rs

pub mod analytics;
pub mod survey;
pub mod template;
pub mod user;

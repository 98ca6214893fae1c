// src/services/mod.rs

pub mod aggregator;
pub mod auth;
pub mod survey;

// src/utils/mod.rs

pub mod hash;
pub mod html;
pub mod jwt;
pub mod mailer;

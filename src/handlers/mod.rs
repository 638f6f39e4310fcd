// src/handlers/mod.rs

pub mod admin;
pub mod auth;
pub mod guest;
pub mod participation;
pub mod quiz;
pub mod reclamation;
pub mod student;
pub mod subscription;

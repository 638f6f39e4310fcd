// src/models/mod.rs

pub mod guest;
pub mod participation;
pub mod quiz;
pub mod reclamation;
pub mod subscription;
pub mod user;

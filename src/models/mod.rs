// src/models/mod.rs
pub mod admin;
pub mod generation;
pub mod media;
pub mod prompt;
pub mod search;

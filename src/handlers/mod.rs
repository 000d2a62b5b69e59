pub mod admin;
pub mod auth;
pub mod files;
pub mod image;
pub mod prompt;
pub mod tips;
pub mod ui;
pub mod video;

//! Amicale - a small association site
//!
//! Public news pages, a members' photo gallery with staff moderation,
//! one-shot donation checkout and a contact form.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod view;

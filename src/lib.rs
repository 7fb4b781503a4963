//! sendlater - schedule Webex text messages for future delivery
//!
//! This library provides the core functionality for the sendlater backend.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;

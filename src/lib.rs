//! Quillpress - a markdown blogging server with OAuth sign-in
//!
//! This library provides the core functionality for the Quillpress blog server.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;

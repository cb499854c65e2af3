//! Ébano Storefront library.
//!
//! The web application as a library: the binary in `main.rs` wires it to a
//! listener, and `ebano-cli` reuses its configuration, repositories and
//! password hashing.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

//! Ébano Core - Shared domain types.
//!
//! This crate provides the types shared by every Ébano component:
//! - `storefront` - The web application (shop, customer area, back-office)
//! - `cli` - Command-line tools for migrations and data maintenance
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and easy to test.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, emails, roles, order statuses, ratings, money helpers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;

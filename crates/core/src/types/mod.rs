//! Core types for Ébano.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod money;
pub mod rating;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::{format_display_amount, format_store_amount, parse_amount, round_display};
pub use rating::{Rating, RatingError};
pub use status::*;

//! Common utilities shared across wishlist backend components.

#![warn(clippy::pedantic)]

/// Module for JWT utilities (size limits, clock skew bounds, header extraction)
pub mod jwt;

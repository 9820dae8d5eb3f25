//! Bubblemart Core - Shared types library.
//!
//! This crate provides the types used across all Bubblemart components:
//! - `storefront` - The commerce state core (API client, stores, checkout)
//! - `cli` - Terminal front end driving the storefront library
//!
//! # Architecture
//!
//! The core crate contains only types and pure validation - no I/O, no HTTP
//! clients, no async. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Ids, money, products, carts, orders, users and form checks

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;

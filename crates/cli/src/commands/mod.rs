//! Command implementations.
//!
//! Each command drives the storefront services and renders the stores
//! afterwards, the way a page would.

pub mod account;
pub mod admin;
pub mod cart;
pub mod catalog;
pub mod orders;

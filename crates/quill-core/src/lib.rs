//! # Quill Core
//!
//! The domain layer of the Quill blogging platform.
//! This crate contains pure business logic with zero infrastructure dependencies:
//! the post status machine, the engagement counters, and the ports that
//! infrastructure adapters implement.

pub mod domain;
pub mod error;
pub mod ports;
pub mod services;

pub use error::DomainError;

//! Core types and trait definitions for rowkeep.
//!
//! This crate is free of database dependencies. Storage backends implement
//! [`store::Store`]; the command-line front end depends on the trait and on
//! the types defined here.

pub mod band;
pub mod error;
pub mod inventory;
pub mod roster;
pub mod scoring;
pub mod store;
pub mod user;

pub use error::{Error, Result};
pub use scoring::safe_divide;

//! Core modules of the profile store.
//!
//! Leaves first: `locator`, `registry`, `schema` and `path` have no
//! dependencies on each other's state; `store` ties them together and
//! `protocol`/`bus` carry its changes across endpoints.

pub mod bus;
pub mod config;
pub mod document;
pub mod error;
pub mod event;
pub mod locator;
pub mod path;
pub mod protocol;
pub mod registry;
pub mod schema;
pub mod store;

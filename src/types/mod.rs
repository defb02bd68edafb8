//! Common types used across the Broker client library.

pub mod common;

pub use common::*;

//! Core types, rules, and the game engine for Squares, a host-driven trivia
//! game played on a 3×3 grid.
//!
//! This crate is deliberately free of database and transport dependencies.
//! Storage backends implement [`store::GameStore`]; the engine modules are
//! generic over it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod board;
pub mod entity;
pub mod error;
pub mod identity;
pub mod judge;
pub mod ledger;
pub mod questions;
pub mod session;
pub mod squares;
pub mod store;

pub use error::{Error, Precondition, Result};
pub use session::GameSession;

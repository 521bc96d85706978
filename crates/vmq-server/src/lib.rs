//! VM query server: library crate for the HTTP front end.
//!
//! Re-exports all modules so the binary (`main.rs`) and external crates
//! (e.g. `vmq-e2e-tests`) can reach `AppState` and `build_router`.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

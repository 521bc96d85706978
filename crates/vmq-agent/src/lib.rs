//! VM query agent: intent routing, VM backend dispatch, and corpus-grounded answers.
//!
//! Re-exports all modules so the binaries (`vmq-agent`, `vmq-server`) and
//! external crates (e.g. `vmq-e2e-tests`) can reach `QueryEngine`,
//! `IntentRouter`, `OperationDispatcher`, and the Ollama client.

pub mod backend;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod formatter;
pub mod llm;
pub mod mock;
pub mod router;
pub mod synthesizer;

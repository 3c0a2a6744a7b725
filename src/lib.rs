//! MCP server that lets chat assistants work with GitHub repositories.
//!
//! Provides tools for creating and cloning repositories, committing and
//! pushing local changes, opening issues, and listing or inspecting repos.
//! Calls go through an authenticated `gh` session when one exists, otherwise
//! through the REST API with a token.

pub mod auth;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod runner;
pub mod server;
pub mod tools;

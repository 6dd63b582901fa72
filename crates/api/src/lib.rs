//! HTTP API: server, routing, and request/response mapping.

pub mod app;
pub mod authz;
pub mod cli;
pub mod config;
pub mod context;
pub mod middleware;

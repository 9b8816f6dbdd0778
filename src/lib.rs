pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod policy;
pub mod routes;
pub mod server;
pub mod services;
pub mod state;
pub mod types;

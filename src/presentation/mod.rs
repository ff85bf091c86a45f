// Presentation layer - HTTP endpoints and command line
pub mod app_state;
pub mod cli;
pub mod commands;
pub mod handlers;
pub mod routes;

// Infrastructure layer - External dependencies and adapters
pub mod api_error;
pub mod browser;
pub mod config;
pub mod superset_client;
pub mod token_signer;

// Application layer - Use cases and port traits
pub mod cleanup_service;
pub mod guest_token_service;
pub mod inventory_service;
pub mod layout_service;
pub mod provisioning_service;
pub mod superset_api;
pub mod verification_service;

#[cfg(test)]
mod fake_superset;

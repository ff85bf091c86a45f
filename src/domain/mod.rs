// Domain layer - Payload shapes dictated by the Superset API
pub mod chart;
pub mod dashboard;
pub mod dataset;
pub mod guest_token;
pub mod layout;
pub mod native_filter;

// Application state for HTTP handlers
use crate::application::guest_token_service::GuestTokenService;
use crate::domain::guest_token::Department;

#[derive(Clone)]
pub struct AppState {
    pub guest_tokens: GuestTokenService,
    pub departments: Vec<Department>,
}

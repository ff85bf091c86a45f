// HS256 signing of guest token claims
use crate::application::guest_token_service::TokenSigner;
use crate::domain::guest_token::GuestTokenClaims;
use anyhow::Context;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};

pub struct HmacTokenSigner {
    key: EncodingKey,
}

impl HmacTokenSigner {
    pub fn new(secret: &str) -> Self {
        Self {
            key: EncodingKey::from_secret(secret.as_bytes()),
        }
    }
}

impl TokenSigner for HmacTokenSigner {
    fn sign(&self, claims: &GuestTokenClaims) -> anyhow::Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.key).context("Failed to sign guest token")
    }
}

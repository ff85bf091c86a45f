// Guest token service - Use case for issuing embed credentials
use crate::domain::guest_token::{GuestTokenClaims, default_guest_username};
use crate::infrastructure::config::EmbedSettings;
use anyhow::{anyhow, ensure};
use serde::Serialize;
use std::sync::Arc;

pub trait TokenSigner: Send + Sync {
    fn sign(&self, claims: &GuestTokenClaims) -> anyhow::Result<String>;
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IssuedGuestToken {
    pub token: String,
    /// Embedded dashboard URL for the embedding SDK
    pub dashboard_url: String,
    /// Same URL with the token attached, openable directly in a browser
    pub embed_url: String,
    pub department_id: i64,
    pub username: String,
}

#[derive(Clone)]
pub struct GuestTokenService {
    signer: Arc<dyn TokenSigner>,
    settings: EmbedSettings,
    superset_url: String,
}

impl GuestTokenService {
    pub fn new(signer: Arc<dyn TokenSigner>, settings: EmbedSettings, superset_url: &str) -> Self {
        Self {
            signer,
            settings,
            superset_url: superset_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn issue(
        &self,
        department_id: i64,
        username: Option<&str>,
        issued_at: i64,
    ) -> anyhow::Result<IssuedGuestToken> {
        let username = match username.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => default_guest_username(department_id),
        };

        let ttl_hours = self.settings.token_ttl_hours;
        ensure!(ttl_hours > 0, "embed.token_ttl_hours must be positive, got {}", ttl_hours);
        let ttl_seconds = ttl_hours
            .checked_mul(3600)
            .filter(|ttl| issued_at.checked_add(*ttl).is_some())
            .ok_or_else(|| anyhow!("embed.token_ttl_hours {} is out of range", ttl_hours))?;

        let claims = GuestTokenClaims::for_department(
            department_id,
            &username,
            &self.settings.embedded_uuid,
            &self.settings.audience,
            issued_at,
            ttl_seconds,
        );
        let token = self.signer.sign(&claims)?;
        tracing::debug!("Issued guest token for department {} ({})", department_id, username);

        let dashboard_url = format!(
            "{}/dashboard/{}/embedded",
            self.superset_url, self.settings.dashboard_id
        );
        let embed_url = format!(
            "{}?guest_token={}&standalone=true",
            dashboard_url,
            urlencoding::encode(&token)
        );

        Ok(IssuedGuestToken {
            token,
            dashboard_url,
            embed_url,
            department_id,
            username,
        })
    }
}

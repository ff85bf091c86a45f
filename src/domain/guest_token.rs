// Guest token claims for embedded dashboards
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GuestUser {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_json: Option<GuestUserExtra>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GuestUserExtra {
    pub target_department_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GuestResource {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RlsRule {
    pub clause: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GuestTokenClaims {
    pub user: GuestUser,
    pub resources: Vec<GuestResource>,
    pub rls_rules: Vec<RlsRule>,
    pub iat: i64,
    pub exp: i64,
    pub aud: String,
    #[serde(rename = "type")]
    pub token_type: String,
}

impl GuestTokenClaims {
    /// Claims scoping one embedded dashboard to a single department's rows.
    pub fn for_department(
        department_id: i64,
        username: &str,
        embedded_uuid: &str,
        audience: &str,
        issued_at: i64,
        ttl_seconds: i64,
    ) -> Self {
        Self {
            user: GuestUser {
                username: username.to_string(),
                first_name: "Guest".to_string(),
                last_name: "User".to_string(),
                extra_json: Some(GuestUserExtra {
                    target_department_id: department_id,
                }),
            },
            resources: vec![GuestResource {
                kind: "dashboard".to_string(),
                id: embedded_uuid.to_string(),
            }],
            rls_rules: vec![RlsRule {
                clause: format!("department_id = {department_id}"),
            }],
            iat: issued_at,
            exp: issued_at + ttl_seconds,
            aud: audience.to_string(),
            token_type: "guest".to_string(),
        }
    }
}

pub fn default_guest_username(department_id: i64) -> String {
    format!("Department {department_id} user")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: i64,
    pub name: String,
    #[serde(alias = "expected_total")]
    pub expected_total: String,
}

pub fn default_departments() -> Vec<Department> {
    [(101, "Sales", "¥955,000"), (102, "Development", "¥835,000"), (103, "Marketing", "¥240,000")]
        .into_iter()
        .map(|(id, name, total)| Department {
            id,
            name: name.to_string(),
            expected_total: total.to_string(),
        })
        .collect()
}

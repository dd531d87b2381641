use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The identity behind an access token, as reported by the auth endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A row in the `connections` table. Each row belongs to exactly one user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Connection {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub email: Option<String>,
    pub company: Option<String>,
    pub position: Option<String>,
    pub location: Option<String>,
    pub connected_on: Option<String>,
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for `connections`; `id` and `created_at` are assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewConnection {
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub company: Option<String>,
    pub position: Option<String>,
    pub location: Option<String>,
    pub connected_on: Option<String>,
    pub url: Option<String>,
}

#[cfg(test)]
impl Connection {
    /// Minimal row for tests; optional fields start empty.
    pub fn sample(first_name: &str, last_name: &str) -> Self {
        Connection {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: None,
            company: None,
            position: None,
            location: None,
            connected_on: None,
            url: None,
            created_at: Utc::now(),
        }
    }

    pub fn at(mut self, company: &str) -> Self {
        self.company = Some(company.to_string());
        self
    }

    pub fn in_location(mut self, location: &str) -> Self {
        self.location = Some(location.to_string());
        self
    }

    pub fn as_position(mut self, position: &str) -> Self {
        self.position = Some(position.to_string());
        self
    }
}

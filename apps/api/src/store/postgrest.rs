use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{RowStore, StoreError};
use crate::models::connection::{Connection, NewConnection};
use crate::models::user::AuthenticatedUser;

const CONNECTIONS_TABLE: &str = "connections";

/// Hosted Postgres backend reached through its auth and REST gateways
/// (`/auth/v1` and `/rest/v1`).
#[derive(Clone)]
pub struct PostgrestStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl PostgrestStore {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn request(&self, method: Method, path: &str, access_token: &str) -> RequestBuilder {
        let api_key = self.api_key.as_deref().unwrap_or(access_token);
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header("apikey", api_key)
            .bearer_auth(access_token)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(StoreError::Unauthorized);
        }

        let message = response.text().await.unwrap_or_default();
        warn!("Row store returned {}: {}", status, message);
        Err(StoreError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl RowStore for PostgrestStore {
    async fn authenticate(&self, access_token: &str) -> Result<AuthenticatedUser, StoreError> {
        let response = self
            .send(self.request(Method::GET, "/auth/v1/user", access_token))
            .await?;
        response
            .json::<AuthenticatedUser>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn fetch_connections(
        &self,
        access_token: &str,
        user_id: Uuid,
    ) -> Result<Vec<Connection>, StoreError> {
        let user_filter = format!("eq.{user_id}");
        let request = self
            .request(
                Method::GET,
                &format!("/rest/v1/{CONNECTIONS_TABLE}"),
                access_token,
            )
            .query(&[
                ("select", "*"),
                ("user_id", user_filter.as_str()),
                ("order", "created_at.desc"),
            ]);

        let rows: Vec<Connection> = self
            .send(request)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        debug!("Fetched {} connections for user {}", rows.len(), user_id);
        Ok(rows)
    }

    async fn insert_connections(
        &self,
        access_token: &str,
        rows: &[NewConnection],
    ) -> Result<usize, StoreError> {
        if rows.is_empty() {
            return Ok(0);
        }
        let request = self
            .request(
                Method::POST,
                &format!("/rest/v1/{CONNECTIONS_TABLE}"),
                access_token,
            )
            .header("Prefer", "return=minimal")
            .json(rows);

        self.send(request).await?;
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn store_for(server: &mockito::ServerGuard, api_key: Option<&str>) -> PostgrestStore {
        PostgrestStore::new(
            &format!("{}/", server.url()),
            api_key.map(str::to_string),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_authenticate_returns_user() {
        let mut server = mockito::Server::new_async().await;
        let user_id = Uuid::new_v4();
        let mock = server
            .mock("GET", "/auth/v1/user")
            .match_header("authorization", "Bearer tok")
            .match_header("apikey", "anon")
            .with_status(200)
            .with_body(json!({"id": user_id, "email": "me@example.com", "aud": "authenticated"}).to_string())
            .create_async()
            .await;

        let user = store_for(&server, Some("anon"))
            .authenticate("tok")
            .await
            .unwrap();

        assert_eq!(user.id, user_id);
        assert_eq!(user.email.as_deref(), Some("me@example.com"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_authenticate_maps_401_to_unauthorized() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/auth/v1/user")
            .with_status(401)
            .with_body(r#"{"msg":"invalid JWT"}"#)
            .create_async()
            .await;

        let result = store_for(&server, None).authenticate("expired").await;
        assert_eq!(result, Err(StoreError::Unauthorized));
    }

    #[tokio::test]
    async fn test_token_used_as_apikey_when_unset() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/auth/v1/user")
            .match_header("apikey", "tok")
            .with_status(200)
            .with_body(json!({"id": Uuid::new_v4()}).to_string())
            .create_async()
            .await;

        store_for(&server, None).authenticate("tok").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_connections_filters_by_user() {
        let mut server = mockito::Server::new_async().await;
        let user_id = Uuid::new_v4();
        let mock = server
            .mock("GET", "/rest/v1/connections")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("select".into(), "*".into()),
                Matcher::UrlEncoded("user_id".into(), format!("eq.{user_id}")),
                Matcher::UrlEncoded("order".into(), "created_at.desc".into()),
            ]))
            .with_status(200)
            .with_body(
                json!([{
                    "id": Uuid::new_v4(),
                    "user_id": user_id,
                    "first_name": "Ada",
                    "last_name": "Lovelace",
                    "email": null,
                    "company": "Analytical Engines",
                    "position": null,
                    "location": "London",
                    "connected_on": "10 Dec 1815",
                    "url": null,
                    "created_at": "2024-03-01T12:00:00.123456+00:00"
                }])
                .to_string(),
            )
            .create_async()
            .await;

        let rows = store_for(&server, Some("anon"))
            .fetch_connections("tok", user_id)
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].company.as_deref(), Some("Analytical Engines"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_connections_reports_server_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/rest/v1/connections")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("relation does not exist")
            .create_async()
            .await;

        let result = store_for(&server, Some("anon"))
            .fetch_connections("tok", Uuid::new_v4())
            .await;
        assert_eq!(
            result,
            Err(StoreError::Status {
                status: 500,
                message: "relation does not exist".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_insert_posts_rows() {
        let mut server = mockito::Server::new_async().await;
        let user_id = Uuid::new_v4();
        let mock = server
            .mock("POST", "/rest/v1/connections")
            .match_header("prefer", "return=minimal")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#""first_name":"Ada""#.to_string()),
                Matcher::Regex(r#""company":"Acme""#.to_string()),
            ]))
            .with_status(201)
            .create_async()
            .await;

        let rows = vec![NewConnection {
            user_id,
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: None,
            company: Some("Acme".to_string()),
            position: None,
            location: None,
            connected_on: None,
            url: None,
        }];
        let written = store_for(&server, Some("anon"))
            .insert_connections("tok", &rows)
            .await
            .unwrap();

        assert_eq!(written, 1);
        mock.assert_async().await;
    }
}

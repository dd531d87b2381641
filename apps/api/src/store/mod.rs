//! Row store access.
//!
//! The store is the hosted backend holding users and their connections. Every
//! call carries the caller's access token, so the store's own row-level
//! security applies in addition to the explicit `user_id` filter.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::connection::{Connection, NewConnection};
use crate::models::user::AuthenticatedUser;

pub mod postgrest;

pub use postgrest::PostgrestStore;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("access token rejected")]
    Unauthorized,

    #[error("row store request failed: {0}")]
    Request(String),

    #[error("row store returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("could not decode row store response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait RowStore: Send + Sync {
    /// Resolves an access token to its user. Rejected tokens yield `Unauthorized`.
    async fn authenticate(&self, access_token: &str) -> Result<AuthenticatedUser, StoreError>;

    async fn fetch_connections(
        &self,
        access_token: &str,
        user_id: Uuid,
    ) -> Result<Vec<Connection>, StoreError>;

    /// Inserts rows and returns how many were written.
    async fn insert_connections(
        &self,
        access_token: &str,
        rows: &[NewConnection],
    ) -> Result<usize, StoreError>;
}

/// An authenticated view of the store, scoped to one request.
///
/// Borrows both the store and the caller's token, so it cannot be kept past
/// the request that opened it. All reads and writes are pinned to `user()`.
pub struct RowStoreSession<'a> {
    store: &'a dyn RowStore,
    access_token: &'a str,
    user: AuthenticatedUser,
}

impl<'a> RowStoreSession<'a> {
    pub async fn open(store: &'a dyn RowStore, access_token: &'a str) -> Result<Self, StoreError> {
        let user = store.authenticate(access_token).await?;
        Ok(Self {
            store,
            access_token,
            user,
        })
    }

    pub fn user(&self) -> &AuthenticatedUser {
        &self.user
    }

    pub async fn connections(&self) -> Result<Vec<Connection>, StoreError> {
        self.store
            .fetch_connections(self.access_token, self.user.id)
            .await
    }

    /// Inserts rows owned by the session user; any other `user_id` is overwritten.
    pub async fn insert_connections(&self, mut rows: Vec<NewConnection>) -> Result<usize, StoreError> {
        if rows.is_empty() {
            return Ok(0);
        }
        for row in &mut rows {
            row.user_id = self.user.id;
        }
        self.store.insert_connections(self.access_token, &rows).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockStore;

    fn new_row(user_id: Uuid) -> NewConnection {
        NewConnection {
            user_id,
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: None,
            company: None,
            position: None,
            location: None,
            connected_on: None,
            url: None,
        }
    }

    #[tokio::test]
    async fn test_open_rejects_unknown_token() {
        let store = MockStore::new(vec![]);
        let result = RowStoreSession::open(&store, "bogus").await;
        assert!(matches!(result, Err(StoreError::Unauthorized)));
        assert_eq!(store.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn test_session_scopes_reads_to_user() {
        let store = MockStore::new(vec![]);
        let session = RowStoreSession::open(&store, MockStore::VALID_TOKEN)
            .await
            .unwrap();
        session.connections().await.unwrap();
        assert_eq!(store.last_fetch_user(), Some(MockStore::user_id()));
    }

    #[tokio::test]
    async fn test_insert_pins_rows_to_session_user() {
        let store = MockStore::new(vec![]);
        let session = RowStoreSession::open(&store, MockStore::VALID_TOKEN)
            .await
            .unwrap();
        let written = session
            .insert_connections(vec![new_row(Uuid::new_v4()), new_row(Uuid::nil())])
            .await
            .unwrap();

        assert_eq!(written, 2);
        let inserted = store.inserted();
        assert!(inserted.iter().all(|r| r.user_id == MockStore::user_id()));
    }

    #[tokio::test]
    async fn test_insert_nothing_skips_store() {
        let store = MockStore::new(vec![]);
        let session = RowStoreSession::open(&store, MockStore::VALID_TOKEN)
            .await
            .unwrap();
        assert_eq!(session.insert_connections(vec![]).await.unwrap(), 0);
        assert_eq!(store.insert_calls(), 0);
    }
}

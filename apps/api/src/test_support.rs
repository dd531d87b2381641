//! In-memory collaborators with call counters, shared by handler and proxy tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use crate::config::Config;
use crate::llm_client::{
    ChatProvider, CompletionRequest, ProviderFailure, ProviderId, ProviderRegistry,
};
use crate::models::connection::{Connection, NewConnection};
use crate::models::user::AuthenticatedUser;
use crate::state::AppState;
use crate::store::{RowStore, StoreError};

pub struct MockStore {
    connections: Vec<Connection>,
    auth_error: Option<StoreError>,
    fetch_error: Option<StoreError>,
    auth_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
    insert_calls: AtomicUsize,
    last_fetch_user: Mutex<Option<Uuid>>,
    inserted: Mutex<Vec<NewConnection>>,
}

impl MockStore {
    pub const VALID_TOKEN: &'static str = "valid-token";

    pub fn user_id() -> Uuid {
        Uuid::from_u128(0x00c0_ffee)
    }

    pub fn new(connections: Vec<Connection>) -> Self {
        Self {
            connections,
            auth_error: None,
            fetch_error: None,
            auth_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
            insert_calls: AtomicUsize::new(0),
            last_fetch_user: Mutex::new(None),
            inserted: Mutex::new(Vec::new()),
        }
    }

    /// Every `authenticate` call fails with `error`, whatever the token.
    pub fn failing_auth(error: StoreError) -> Self {
        let mut store = Self::new(vec![]);
        store.auth_error = Some(error);
        store
    }

    pub fn failing_fetch(error: StoreError) -> Self {
        let mut store = Self::new(vec![]);
        store.fetch_error = Some(error);
        store
    }

    pub fn auth_calls(&self) -> usize {
        self.auth_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    pub fn last_fetch_user(&self) -> Option<Uuid> {
        *self.last_fetch_user.lock().unwrap()
    }

    pub fn inserted(&self) -> Vec<NewConnection> {
        self.inserted.lock().unwrap().clone()
    }
}

#[async_trait]
impl RowStore for MockStore {
    async fn authenticate(&self, access_token: &str) -> Result<AuthenticatedUser, StoreError> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = &self.auth_error {
            return Err(e.clone());
        }
        if access_token == Self::VALID_TOKEN {
            Ok(AuthenticatedUser {
                id: Self::user_id(),
                email: Some("owner@example.com".to_string()),
            })
        } else {
            Err(StoreError::Unauthorized)
        }
    }

    async fn fetch_connections(
        &self,
        _access_token: &str,
        user_id: Uuid,
    ) -> Result<Vec<Connection>, StoreError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_fetch_user.lock().unwrap() = Some(user_id);
        match &self.fetch_error {
            Some(e) => Err(e.clone()),
            None => Ok(self.connections.clone()),
        }
    }

    async fn insert_connections(
        &self,
        _access_token: &str,
        rows: &[NewConnection],
    ) -> Result<usize, StoreError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        self.inserted.lock().unwrap().extend_from_slice(rows);
        Ok(rows.len())
    }
}

/// Provider that returns a fixed outcome and records what it was asked.
pub struct MockProvider {
    id: ProviderId,
    outcome: Result<String, ProviderFailure>,
    calls: AtomicUsize,
    last_request: Mutex<Option<(String, String)>>,
}

impl MockProvider {
    pub fn replying(id: ProviderId, text: &str) -> Arc<Self> {
        Arc::new(Self::with_outcome(id, Ok(text.to_string())))
    }

    pub fn failing(id: ProviderId, failure: ProviderFailure) -> Arc<Self> {
        Arc::new(Self::with_outcome(id, Err(failure)))
    }

    fn with_outcome(id: ProviderId, outcome: Result<String, ProviderFailure>) -> Self {
        Self {
            id,
            outcome,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `(system, user)` of the most recent call.
    pub fn last_request(&self) -> Option<(String, String)> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatProvider for MockProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, ProviderFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() =
            Some((request.system.to_string(), request.user.to_string()));
        self.outcome.clone()
    }
}

/// Registry preferring Anthropic with both providers present.
pub fn registry(anthropic: Arc<MockProvider>, openai: Arc<MockProvider>) -> ProviderRegistry {
    ProviderRegistry::new(ProviderId::Anthropic)
        .with_provider(anthropic)
        .with_provider(openai)
}

pub fn app_state(store: Arc<MockStore>, providers: ProviderRegistry) -> AppState {
    AppState {
        config: Config::for_tests(),
        store,
        providers,
        archive: None,
    }
}

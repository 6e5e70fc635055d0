#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use chrono::{Duration, Utc};
use conversation_service::auth::{JwtIdentityResolver, SessionClaims};
use conversation_service::config::AuthConfig;
use conversation_service::models::UserSubscription;
use conversation_service::services::providers::mock::MockCompletionProvider;
use conversation_service::services::providers::CompletionSettings;
use conversation_service::services::{
    InMemoryStore, StoreError, SubscriptionChecker, UsageLimiter,
};
use conversation_service::{build_router, AppState};
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use secrecy::Secret;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tower::util::ServiceExt;

pub const TEST_JWT_SECRET: &str = "test-session-secret";
pub const TEST_USER_ID: &str = "user_2abc";
pub const MAX_FREE_CALLS: u32 = 5;
pub const REPLY: &str = "Hello! How can I help you today?";

/// Store wrapper that counts every collaborator call and can be told to fail.
pub struct SpyStore {
    inner: InMemoryStore,
    pub quota_checks: AtomicUsize,
    pub subscription_checks: AtomicUsize,
    pub increments: AtomicUsize,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
}

impl SpyStore {
    pub fn new(max_free_calls: u32) -> Self {
        Self {
            inner: InMemoryStore::new(max_free_calls),
            quota_checks: AtomicUsize::new(0),
            subscription_checks: AtomicUsize::new(0),
            increments: AtomicUsize::new(0),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &InMemoryStore {
        &self.inner
    }

    pub fn subscribe(&self, user_id: &str) {
        self.inner.upsert_subscription(UserSubscription {
            user_id: user_id.to_string(),
            customer_id: Some("cus_test".to_string()),
            subscription_id: Some("sub_test".to_string()),
            price_id: Some("price_pro".to_string()),
            current_period_end: Some(Utc::now() + Duration::days(30)),
        });
    }

    pub async fn use_free_calls(&self, user_id: &str, calls: u32) {
        for _ in 0..calls {
            self.inner
                .record_usage(user_id)
                .await
                .expect("in-memory increment");
        }
    }

    pub fn collaborator_calls(&self) -> usize {
        self.quota_checks.load(Ordering::SeqCst)
            + self.subscription_checks.load(Ordering::SeqCst)
            + self.increments.load(Ordering::SeqCst)
    }

    pub fn increments(&self) -> usize {
        self.increments.load(Ordering::SeqCst)
    }

    fn read_guard(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("read failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl UsageLimiter for SpyStore {
    fn max_free_calls(&self) -> u32 {
        self.inner.max_free_calls()
    }

    async fn usage_count(&self, user_id: &str) -> Result<u32, StoreError> {
        self.quota_checks.fetch_add(1, Ordering::SeqCst);
        self.read_guard()?;
        self.inner.usage_count(user_id).await
    }

    async fn record_usage(&self, user_id: &str) -> Result<(), StoreError> {
        self.increments.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("write failure".to_string()));
        }
        self.inner.record_usage(user_id).await
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.read_guard()
    }
}

#[async_trait]
impl SubscriptionChecker for SpyStore {
    async fn is_subscribed(&self, user_id: &str) -> Result<bool, StoreError> {
        self.subscription_checks.fetch_add(1, Ordering::SeqCst);
        self.read_guard()?;
        self.inner.is_subscribed(user_id).await
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<SpyStore>,
    pub provider: Arc<MockCompletionProvider>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_provider(MockCompletionProvider::replying(REPLY), false)
    }

    pub fn forwarding() -> Self {
        Self::with_provider(MockCompletionProvider::replying(REPLY), true)
    }

    pub fn with_provider(provider: MockCompletionProvider, forward_messages: bool) -> Self {
        let store = Arc::new(SpyStore::new(MAX_FREE_CALLS));
        let provider = Arc::new(provider);

        let auth = AuthConfig {
            jwt_secret: Secret::new(TEST_JWT_SECRET.to_string()),
            jwt_issuer: None,
        };

        let state = AppState {
            identity: Arc::new(JwtIdentityResolver::new(&auth)),
            usage: store.clone(),
            subscriptions: store.clone(),
            provider: provider.clone(),
            completion: CompletionSettings {
                model: "gpt-3.5-turbo".to_string(),
                system_prompt: "You are a helpful assistant.".to_string(),
                forward_messages,
            },
        };

        Self {
            router: build_router(state),
            store,
            provider,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn post_conversation(&self, token: Option<&str>, body: &str) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/conversation")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }
}

/// Mint a session token the test app accepts.
pub fn session_token(user_id: &str) -> String {
    let now = Utc::now().timestamp();
    let claims = SessionClaims {
        sub: user_id.to_string(),
        exp: now + 3600,
        iat: Some(now),
        iss: None,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .expect("token encoding")
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body collect")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_str(&body_text(response).await).expect("json body")
}

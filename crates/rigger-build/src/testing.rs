//! テスト用のレジストリ / シークレットストア / ランタイム

use crate::credentials::RegistryCredential;
use crate::event::{EventStream, ProgressEvent, StreamError};
use crate::registry::{AuthorizationData, RegistryApi, RegistryApiError};
use crate::runtime::{ContainerRuntime, RemoteBuild};
use crate::secrets::{SecretStore, SecretStoreError};
use async_trait::async_trait;
use base64::Engine;
use futures_util::StreamExt;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn encode(text: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(text)
}

pub fn registry_credential() -> RegistryCredential {
    RegistryCredential::new(
        format!("https://{}", MockRegistry::HOST),
        "AWS",
        "password",
        None,
    )
}

/// `describe_repository` の振る舞い
#[derive(Debug, Clone)]
pub enum Lookup {
    Exists,
    NotFound,
    Fail(String),
}

pub struct MockRegistry {
    token: String,
    token_error: Option<String>,
    lookup: Lookup,
    create_error: Option<String>,
    token_scopes: Mutex<Vec<Option<String>>>,
    describes: Mutex<Vec<String>>,
    creates: Mutex<Vec<String>>,
}

impl MockRegistry {
    pub const HOST: &'static str = "123456789012.dkr.ecr.eu-west-1.amazonaws.com";

    pub fn new() -> Self {
        Self {
            token: encode("AWS:password"),
            token_error: None,
            lookup: Lookup::NotFound,
            create_error: None,
            token_scopes: Mutex::new(Vec::new()),
            describes: Mutex::new(Vec::new()),
            creates: Mutex::new(Vec::new()),
        }
    }

    pub fn with_token(mut self, token: String) -> Self {
        self.token = token;
        self
    }

    pub fn failing_token(mut self, message: &str) -> Self {
        self.token_error = Some(message.to_string());
        self
    }

    pub fn with_lookup(mut self, lookup: Lookup) -> Self {
        self.lookup = lookup;
        self
    }

    pub fn failing_create(mut self, message: &str) -> Self {
        self.create_error = Some(message.to_string());
        self
    }

    pub fn token_scopes(&self) -> Vec<Option<String>> {
        self.token_scopes.lock().unwrap().clone()
    }

    pub fn describes(&self) -> Vec<String> {
        self.describes.lock().unwrap().clone()
    }

    pub fn creates(&self) -> Vec<String> {
        self.creates.lock().unwrap().clone()
    }
}

#[async_trait]
impl RegistryApi for MockRegistry {
    async fn get_authorization_token(
        &self,
        registry_id: Option<&str>,
    ) -> Result<AuthorizationData, RegistryApiError> {
        self.token_scopes
            .lock()
            .unwrap()
            .push(registry_id.map(str::to_string));

        if let Some(message) = &self.token_error {
            return Err(RegistryApiError::Api(message.clone()));
        }

        Ok(AuthorizationData {
            token: self.token.clone(),
            proxy_endpoint: format!("https://{}", Self::HOST),
            expires_at: None,
        })
    }

    async fn describe_repository(&self, name: &str) -> Result<(), RegistryApiError> {
        self.describes.lock().unwrap().push(name.to_string());
        match &self.lookup {
            Lookup::Exists => Ok(()),
            Lookup::NotFound => Err(RegistryApiError::RepositoryNotFound(name.to_string())),
            Lookup::Fail(message) => Err(RegistryApiError::Api(message.clone())),
        }
    }

    async fn create_repository(&self, name: &str) -> Result<(), RegistryApiError> {
        self.creates.lock().unwrap().push(name.to_string());
        match &self.create_error {
            Some(message) => Err(RegistryApiError::Api(message.clone())),
            None => Ok(()),
        }
    }
}

pub struct MockSecrets {
    values: HashMap<String, String>,
    denied: HashSet<String>,
    requests: Mutex<Vec<(String, bool)>>,
}

impl MockSecrets {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
            denied: HashSet::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_value(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_denied(mut self, key: &str) -> Self {
        self.denied.insert(key.to_string());
        self
    }

    pub fn requests(&self) -> Vec<(String, bool)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SecretStore for MockSecrets {
    async fn get_parameter(&self, key: &str, decrypt: bool) -> Result<String, SecretStoreError> {
        self.requests
            .lock()
            .unwrap()
            .push((key.to_string(), decrypt));

        if self.denied.contains(key) {
            return Err(SecretStoreError::Access {
                key: key.to_string(),
                message: "AccessDeniedException".to_string(),
            });
        }

        self.values
            .get(key)
            .cloned()
            .ok_or_else(|| SecretStoreError::NotFound(key.to_string()))
    }
}

type ScriptedEvents = Vec<Result<ProgressEvent, StreamError>>;

/// 台本どおりのイベントを返すランタイム
pub struct MockRuntime {
    build_events: ScriptedEvents,
    push_events: ScriptedEvents,
    builds: Mutex<Vec<RemoteBuild>>,
    pushes: Mutex<Vec<(String, String)>>,
    consumed_build: AtomicUsize,
    consumed_push: AtomicUsize,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self {
            build_events: Vec::new(),
            push_events: Vec::new(),
            builds: Mutex::new(Vec::new()),
            pushes: Mutex::new(Vec::new()),
            consumed_build: AtomicUsize::new(0),
            consumed_push: AtomicUsize::new(0),
        }
    }

    pub fn with_build_events(mut self, events: ScriptedEvents) -> Self {
        self.build_events = events;
        self
    }

    pub fn with_push_events(mut self, events: ScriptedEvents) -> Self {
        self.push_events = events;
        self
    }

    pub fn builds(&self) -> Vec<RemoteBuild> {
        self.builds.lock().unwrap().clone()
    }

    /// (reference, username)
    pub fn pushes(&self) -> Vec<(String, String)> {
        self.pushes.lock().unwrap().clone()
    }

    pub fn consumed_build_events(&self) -> usize {
        self.consumed_build.load(Ordering::SeqCst)
    }

    pub fn consumed_push_events(&self) -> usize {
        self.consumed_push.load(Ordering::SeqCst)
    }
}

impl ContainerRuntime for MockRuntime {
    fn build_remote(&self, build: &RemoteBuild) -> EventStream<'_> {
        self.builds.lock().unwrap().push(build.clone());
        let counter = &self.consumed_build;
        futures_util::stream::iter(self.build_events.clone())
            .inspect(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .boxed()
    }

    fn push(&self, reference: &str, credential: &RegistryCredential) -> EventStream<'_> {
        self.pushes
            .lock()
            .unwrap()
            .push((reference.to_string(), credential.username().to_string()));
        let counter = &self.consumed_push;
        futures_util::stream::iter(self.push_events.clone())
            .inspect(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .boxed()
    }
}

//! In-memory repositories, used by tests and for running without a database.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use super::{check_name, ResponseMapping, ResponseRepository, Source, SourceRepository};
use crate::error::{GatewayError, Result};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
pub struct MemorySourceStore {
    sources: Mutex<BTreeMap<String, Source>>,
    lookups: AtomicUsize,
}

impl MemorySourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(self, source: Source) -> Self {
        lock(&self.sources).insert(source.id.clone(), source);
        self
    }

    /// Number of `get_by_id` calls served so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceRepository for MemorySourceStore {
    async fn create(&self, source: &Source) -> Result<()> {
        check_name(&source.name)?;
        let mut sources = lock(&self.sources);
        if sources.values().any(|s| s.name == source.name) {
            return Err(GatewayError::Conflict(format!("source '{}'", source.name)));
        }
        sources.insert(source.id.clone(), source.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Source> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        lock(&self.sources)
            .get(&id.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("source '{}'", id)))
    }

    async fn list(&self) -> Result<Vec<Source>> {
        let mut sources: Vec<Source> = lock(&self.sources).values().cloned().collect();
        sources.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(sources)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        lock(&self.sources)
            .remove(&id.to_ascii_lowercase())
            .map(|_| ())
            .ok_or_else(|| GatewayError::NotFound(format!("source '{}'", id)))
    }
}

#[derive(Debug, Default)]
pub struct MemoryResponseStore {
    responses: Mutex<BTreeMap<String, ResponseMapping>>,
    failure: Option<String>,
}

impl MemoryResponseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose lookups always fail with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_response(self, response: ResponseMapping) -> Self {
        lock(&self.responses).insert(response.id.clone(), response);
        self
    }
}

#[async_trait]
impl ResponseRepository for MemoryResponseStore {
    async fn create(&self, response: &ResponseMapping) -> Result<()> {
        check_name(&response.name)?;
        let mut responses = lock(&self.responses);
        if responses.values().any(|r| r.name == response.name) {
            return Err(GatewayError::Conflict(format!("response '{}'", response.name)));
        }
        responses.insert(response.id.clone(), response.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<ResponseMapping>> {
        if let Some(message) = &self.failure {
            return Err(GatewayError::Unknown(message.clone()));
        }
        Ok(lock(&self.responses).get(&id.to_ascii_lowercase()).cloned())
    }

    async fn list(&self) -> Result<Vec<ResponseMapping>> {
        let mut responses: Vec<ResponseMapping> =
            lock(&self.responses).values().cloned().collect();
        responses.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(responses)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        lock(&self.responses)
            .remove(&id.to_ascii_lowercase())
            .map(|_| ())
            .ok_or_else(|| GatewayError::NotFound(format!("response '{}'", id)))
    }
}

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Barrier, RwLock};

use listener_registry::{Listener, ListenerError};

pub type Args = Vec<Value>;

// ============================================================================
// Mock Listeners
// ============================================================================

/// Records every argument list it receives
pub struct RecordingListener {
    name: &'static str,
    calls: RwLock<Vec<Args>>,
}

impl RecordingListener {
    pub fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            calls: RwLock::new(Vec::new()),
        })
    }

    pub async fn calls(&self) -> Vec<Args> {
        self.calls.read().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }
}

#[async_trait]
impl Listener<Args> for RecordingListener {
    async fn call(&self, args: &Args) -> Result<(), ListenerError> {
        self.calls.write().await.push(args.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        self.name
    }
}

/// Always fails
pub struct FailingListener;

#[async_trait]
impl Listener<Args> for FailingListener {
    async fn call(&self, _args: &Args) -> Result<(), ListenerError> {
        Err(ListenerError::failed("simulated failure"))
    }

    fn name(&self) -> &str {
        "FailingListener"
    }
}

/// Panics when called
pub struct PanickingListener;

#[async_trait]
impl Listener<Args> for PanickingListener {
    async fn call(&self, _args: &Args) -> Result<(), ListenerError> {
        panic!("simulated panic");
    }

    fn name(&self) -> &str {
        "PanickingListener"
    }
}

/// Waits on a shared barrier, so a group of them only finishes if they all
/// run at the same time
pub struct RendezvousListener {
    barrier: Arc<Barrier>,
}

impl RendezvousListener {
    pub fn new(barrier: Arc<Barrier>) -> Arc<Self> {
        Arc::new(Self { barrier })
    }
}

#[async_trait]
impl Listener<Args> for RendezvousListener {
    async fn call(&self, _args: &Args) -> Result<(), ListenerError> {
        self.barrier.wait().await;
        Ok(())
    }

    fn name(&self) -> &str {
        "RendezvousListener"
    }
}

/// Sleeps before recording that it finished
pub struct SlowListener {
    delay: Duration,
    finished: RwLock<bool>,
}

impl SlowListener {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            finished: RwLock::new(false),
        })
    }

    pub async fn finished(&self) -> bool {
        *self.finished.read().await
    }
}

#[async_trait]
impl Listener<Args> for SlowListener {
    async fn call(&self, _args: &Args) -> Result<(), ListenerError> {
        tokio::time::sleep(self.delay).await;
        *self.finished.write().await = true;
        Ok(())
    }

    fn name(&self) -> &str {
        "SlowListener"
    }
}

//! Mock post callback for testing
//!
//! A configurable [`PostCallback`] that records every invocation and can be
//! told to succeed, fail, return an error, stall or panic. Used by the
//! scheduler tests and available to downstream crates for theirs.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use super::PostCallback;
use crate::error::{PizziniError, Result};
use crate::types::EntryId;

/// What the mock does when called
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockBehavior {
    Succeed,
    Fail,
    Error(String),
    Panic,
}

/// One recorded invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub entry_id: EntryId,
    pub platforms: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct MockCallback {
    behavior: MockBehavior,
    delay: Duration,
    calls: Arc<Mutex<Vec<MockCall>>>,
}

impl MockCallback {
    pub fn new(behavior: MockBehavior, delay: Duration) -> Self {
        Self {
            behavior,
            delay,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Always reports success
    pub fn success() -> Self {
        Self::new(MockBehavior::Succeed, Duration::ZERO)
    }

    /// Always reports failure without an error
    pub fn failure() -> Self {
        Self::new(MockBehavior::Fail, Duration::ZERO)
    }

    /// Always returns a publish error
    pub fn error(message: &str) -> Self {
        Self::new(MockBehavior::Error(message.to_string()), Duration::ZERO)
    }

    pub fn panicking() -> Self {
        Self::new(MockBehavior::Panic, Duration::ZERO)
    }

    /// Succeeds after sleeping for `delay`
    pub fn with_delay(delay: Duration) -> Self {
        Self::new(MockBehavior::Succeed, delay)
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Entry ids in call order
    pub fn called_ids(&self) -> Vec<EntryId> {
        self.calls().into_iter().map(|c| c.entry_id).collect()
    }
}

#[async_trait]
impl PostCallback for MockCallback {
    async fn post(&self, entry_id: EntryId, platforms: &[String]) -> Result<bool> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(MockCall {
                entry_id,
                platforms: platforms.to_vec(),
            });

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        match &self.behavior {
            MockBehavior::Succeed => Ok(true),
            MockBehavior::Fail => Ok(false),
            MockBehavior::Error(message) => Err(PizziniError::Publish(message.clone())),
            MockBehavior::Panic => panic!("mock callback panicked for entry {}", entry_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_calls() {
        let mock = MockCallback::success();
        let platforms = vec!["twitter".to_string(), "x".to_string()];
        assert!(mock.post(3, &platforms).await.unwrap());
        assert!(mock.post(4, &[]).await.unwrap());

        assert_eq!(mock.call_count(), 2);
        assert_eq!(mock.called_ids(), vec![3, 4]);
        assert_eq!(mock.calls()[0].platforms, platforms);
    }

    #[tokio::test]
    async fn test_failure_and_error() {
        assert!(!MockCallback::failure().post(1, &[]).await.unwrap());

        let err = MockCallback::error("rate limited").post(1, &[]).await.unwrap_err();
        assert_eq!(err.to_string(), "Publishing failed: rate limited");
    }

    #[tokio::test]
    async fn test_clones_share_call_log() {
        let mock = MockCallback::success();
        let clone = mock.clone();
        clone.post(9, &[]).await.unwrap();
        assert_eq!(mock.called_ids(), vec![9]);
    }
}

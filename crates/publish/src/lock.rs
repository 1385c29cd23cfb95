//! The "publishing in progress" flag, as an owned token.

use crate::error::{ErrorKind, Result};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

/// Tracks which channels are currently being published.
///
/// Cloning shares the underlying set.
#[derive(Debug, Clone, Default)]
pub struct PublishLock {
    channels: Arc<Mutex<HashSet<String>>>,
}

impl PublishLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `channel_id` as publishing until the returned token is dropped.
    pub fn acquire(&self, channel_id: &str) -> Result<PublishToken> {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        if !channels.insert(channel_id.to_string()) {
            exn::bail!(ErrorKind::AlreadyPublishing(channel_id.to_string()));
        }
        tracing::debug!(channel = channel_id, "acquired publish lock");
        Ok(PublishToken { channel_id: channel_id.to_string(), channels: Arc::clone(&self.channels) })
    }

    pub fn is_publishing(&self, channel_id: &str) -> bool {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner).contains(channel_id)
    }
}

/// Proof that a channel is flagged as publishing. Releases the flag on drop,
/// whichever way the publish ends.
#[derive(Debug)]
pub struct PublishToken {
    channel_id: String,
    channels: Arc<Mutex<HashSet<String>>>,
}

impl PublishToken {
    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }
}

impl Drop for PublishToken {
    fn drop(&mut self) {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner).remove(&self.channel_id);
        tracing::debug!(channel = %self.channel_id, "released publish lock");
    }
}

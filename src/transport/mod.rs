//! Summary reporting collaborators.
//!
//! Once per frame the pipeline publishes a compact label -> probability
//! summary to a remote consumer. The transport is a point-to-point publish
//! call: failures are logged by the caller and never stop the next frame.

mod mqtt;

use std::sync::{Arc, Mutex};

use anyhow::Result;

pub use mqtt::{MqttConfig, MqttPublisher};

/// Topic-based publish collaborator.
pub trait SummaryPublisher: Send {
    /// Publish one payload to `topic`.
    fn publish(&mut self, topic: &str, payload: &str) -> Result<()>;
}

/// In-memory publisher for tests. Clones share the same message list.
#[derive(Clone, Default)]
pub struct InMemoryPublisher {
    messages: Arc<Mutex<Vec<(String, String)>>>,
}

impl InMemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().expect("publisher lock").clone()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().expect("publisher lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SummaryPublisher for InMemoryPublisher {
    fn publish(&mut self, topic: &str, payload: &str) -> Result<()> {
        self.messages
            .lock()
            .expect("publisher lock")
            .push((topic.to_string(), payload.to_string()));
        Ok(())
    }
}

/// Publisher that fails every call. Lets tests exercise the non-fatal
/// publish-failure path.
#[cfg(test)]
pub(crate) struct FailingPublisher;

#[cfg(test)]
impl SummaryPublisher for FailingPublisher {
    fn publish(&mut self, _topic: &str, _payload: &str) -> Result<()> {
        Err(anyhow::anyhow!("publisher unavailable"))
    }
}

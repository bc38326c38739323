//! Device transport boundary
//!
//! Framing, chunking and timeouts live below this trait; the signing session
//! only exchanges whole protocol messages.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::VecDeque;

use crate::messages::Message;

#[async_trait]
pub trait Transport: Send {
    /// Write one message to the device
    async fn send(&mut self, message: Message) -> Result<()>;

    /// Block until the device answers with one message
    async fn receive(&mut self) -> Result<Message>;
}

/// In-memory transport replaying a fixed list of device responses.
///
/// Every sent message is recorded so tests can assert on the exchange.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: VecDeque<Message>,
    sent: Vec<Message>,
}

impl ScriptedTransport {
    pub fn new(responses: impl IntoIterator<Item = Message>) -> Self {
        Self {
            responses: responses.into_iter().collect(),
            sent: Vec::new(),
        }
    }

    /// Messages sent so far, in order
    pub fn sent(&self) -> &[Message] {
        &self.sent
    }

    /// Responses not consumed yet
    pub fn remaining(&self) -> usize {
        self.responses.len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&mut self, message: Message) -> Result<()> {
        tracing::trace!("scripted send: {}", message.name());
        self.sent.push(message);
        Ok(())
    }

    async fn receive(&mut self) -> Result<Message> {
        self.responses
            .pop_front()
            .ok_or_else(|| anyhow!("device disconnected: no scripted response left"))
    }
}

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::blocks::MessageTemplate;
use crate::events::{ChatEnvelope, ChatEvent, EventContext, EventDispatcher, HandlerResult};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport ack failed: {0}")]
    Acknowledge(String),
    #[error("transport reply failed: {0}")]
    Reply(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let multiplier = 1_u64 << attempt.min(16);
        Duration::from_millis(self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms))
    }
}

/// Connection to the chat platform's event stream.
#[async_trait]
pub trait GatewayTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    async fn next_envelope(&self) -> Result<Option<ChatEnvelope>, TransportError>;
    async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError>;
    /// Answers the interaction carried by `envelope_id`.
    async fn reply(
        &self,
        envelope_id: &str,
        message: &MessageTemplate,
    ) -> Result<(), TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

/// Transport with no upstream: connects and immediately reports a closed stream.
#[derive(Default)]
pub struct NoopGatewayTransport;

#[async_trait]
impl GatewayTransport for NoopGatewayTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<ChatEnvelope>, TransportError> {
        Ok(None)
    }

    async fn acknowledge(&self, _envelope_id: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn reply(
        &self,
        _envelope_id: &str,
        _message: &MessageTemplate,
    ) -> Result<(), TransportError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

struct SessionFailure {
    connected: bool,
    error: TransportError,
}

pub struct GatewayRunner {
    transport: Arc<dyn GatewayTransport>,
    dispatcher: EventDispatcher,
    reconnect_policy: ReconnectPolicy,
}

impl GatewayRunner {
    pub fn new(
        transport: Arc<dyn GatewayTransport>,
        dispatcher: EventDispatcher,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, dispatcher, reconnect_policy }
    }

    /// Pumps events until the stream closes. Transport failures reconnect with
    /// exponential backoff; once retries are exhausted the runner returns. A
    /// session that got connected earns a fresh retry budget.
    pub async fn start(&self) -> Result<()> {
        let max_retries = self.reconnect_policy.max_retries;
        let mut attempt = 0;

        loop {
            let Err(failure) = self.connect_and_pump(attempt).await else {
                return Ok(());
            };
            if failure.connected {
                attempt = 0;
            }

            warn!(
                event_name = "gateway.transport.failed",
                attempt,
                max_retries,
                connected = failure.connected,
                error = %failure.error,
                "gateway transport failed"
            );

            if attempt >= max_retries {
                warn!(
                    event_name = "gateway.transport.exhausted",
                    max_retries,
                    "gateway retries exhausted; continuing process without crash"
                );
                return Ok(());
            }

            let delay = self.reconnect_policy.backoff(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            attempt += 1;
        }
    }

    async fn connect_and_pump(&self, attempt: u32) -> Result<(), SessionFailure> {
        info!(event_name = "gateway.transport.connecting", attempt, "opening gateway connection");
        self.transport
            .connect()
            .await
            .map_err(|error| SessionFailure { connected: false, error })?;
        info!(event_name = "gateway.transport.connected", attempt, "gateway connected");

        self.pump().await.map_err(|error| SessionFailure { connected: true, error })
    }

    async fn pump(&self) -> Result<(), TransportError> {
        loop {
            let Some(envelope) = self.transport.next_envelope().await? else {
                info!(event_name = "gateway.stream.closed", "gateway stream closed");
                self.transport.disconnect().await?;
                return Ok(());
            };
            let (guild_id, thread_id) = correlation_fields(&envelope);

            info!(
                event_name = "ingress.chat.envelope_received",
                envelope_id = %envelope.envelope_id,
                event_type = ?envelope.event.event_type(),
                correlation_id = %envelope.envelope_id,
                guild_id = guild_id.unwrap_or("unknown"),
                thread_id = thread_id.unwrap_or("unknown"),
                "received chat envelope"
            );

            if let Err(error) = self.transport.acknowledge(&envelope.envelope_id).await {
                warn!(
                    event_name = "ingress.chat.ack_failed",
                    correlation_id = %envelope.envelope_id,
                    error = %error,
                    "failed to acknowledge chat envelope"
                );
            } else {
                debug!(
                    event_name = "ingress.chat.ack_sent",
                    correlation_id = %envelope.envelope_id,
                    "acknowledged chat envelope"
                );
            }

            let context = EventContext { correlation_id: envelope.envelope_id.clone() };
            match self.dispatcher.dispatch(&envelope, &context).await {
                Ok(HandlerResult::Responded(message)) => {
                    if let Err(error) = self.transport.reply(&envelope.envelope_id, &message).await {
                        warn!(
                            event_name = "egress.chat.reply_failed",
                            correlation_id = %envelope.envelope_id,
                            error = %error,
                            "failed to deliver reply"
                        );
                    }
                }
                Ok(HandlerResult::Processed | HandlerResult::Ignored) => {}
                Err(error) => {
                    warn!(
                        event_name = "ingress.chat.dispatch_failed",
                        correlation_id = %envelope.envelope_id,
                        guild_id = guild_id.unwrap_or("unknown"),
                        thread_id = thread_id.unwrap_or("unknown"),
                        error = %error,
                        "event dispatch failed; continuing gateway loop"
                    );
                }
            }
        }
    }
}

fn correlation_fields(envelope: &ChatEnvelope) -> (Option<&str>, Option<&str>) {
    match &envelope.event {
        ChatEvent::SlashCommand(payload) => {
            (Some(payload.guild_id.as_str()), Some(payload.channel_id.as_str()))
        }
        ChatEvent::ThreadCreated(event) => {
            (Some(event.thread.guild_id.0.as_str()), Some(event.thread.id.0.as_str()))
        }
        ChatEvent::Unsupported { .. } => (None, None),
    }
}

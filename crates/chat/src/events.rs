use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;

use helpline_core::domain::thread::HelpThread;

use crate::{
    blocks::MessageTemplate,
    commands::{CommandRouteError, CommandRouter, CommandService, SlashCommandPayload},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatEnvelope {
    pub envelope_id: String,
    pub event: ChatEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatEvent {
    SlashCommand(SlashCommandPayload),
    ThreadCreated(ThreadCreatedEvent),
    Unsupported { event_type: String },
}

impl ChatEvent {
    pub fn event_type(&self) -> ChatEventType {
        match self {
            Self::SlashCommand(_) => ChatEventType::SlashCommand,
            Self::ThreadCreated(_) => ChatEventType::ThreadCreated,
            Self::Unsupported { .. } => ChatEventType::Unsupported,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChatEventType {
    SlashCommand,
    ThreadCreated,
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThreadCreatedEvent {
    pub thread: HelpThread,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Responded(MessageTemplate),
    Processed,
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error(transparent)]
    Route(#[from] CommandRouteError),
    #[error("thread created handler failure: {0}")]
    ThreadCreated(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> ChatEventType;
    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<ChatEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

pub struct SlashCommandHandler<S> {
    router: CommandRouter<S>,
}

impl<S> SlashCommandHandler<S>
where
    S: CommandService,
{
    pub fn new(service: S) -> Self {
        Self { router: CommandRouter::new(service) }
    }
}

#[async_trait]
impl<S> EventHandler for SlashCommandHandler<S>
where
    S: CommandService + 'static,
{
    fn event_type(&self) -> ChatEventType {
        ChatEventType::SlashCommand
    }

    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let ChatEvent::SlashCommand(payload) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        let message = self.router.route(payload).await?;
        Ok(HandlerResult::Responded(message))
    }
}

#[async_trait]
pub trait ThreadCreatedService: Send + Sync {
    /// Returns `false` when the thread does not belong to a help forum.
    async fn handle_thread_created(
        &self,
        event: &ThreadCreatedEvent,
        ctx: &EventContext,
    ) -> Result<bool, EventHandlerError>;
}

pub struct ThreadCreatedHandler<S> {
    service: S,
}

impl<S> ThreadCreatedHandler<S>
where
    S: ThreadCreatedService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> EventHandler for ThreadCreatedHandler<S>
where
    S: ThreadCreatedService + 'static,
{
    fn event_type(&self) -> ChatEventType {
        ChatEventType::ThreadCreated
    }

    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let ChatEvent::ThreadCreated(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        Ok(if self.service.handle_thread_created(event, ctx).await? {
            HandlerResult::Processed
        } else {
            HandlerResult::Ignored
        })
    }
}

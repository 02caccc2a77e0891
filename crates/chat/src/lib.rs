//! Chat platform surface for helpline
//!
//! - **Gateway** (`gateway`) - event stream runner with reconnect/backoff
//! - **Events** (`events`) - envelopes, dispatcher, slash command and thread-created handlers
//! - **Commands** (`commands`) - `/help-thread`, `/mute`, `/ban`, `/quarantine`, `/kick`, `/warn`, `/audit`
//! - **Blocks** (`blocks`) - message templates posted back to the platform
//! - **Platform** (`platform`) - in-process implementation of the core ports
//! - **Service** (`service`) - wires commands and events to the core services
//!
//! ```text
//! Gateway → EventDispatcher → Handlers → HelplineCommandService → helpline-core
//!                                 ↓
//!                          MessageTemplate reply
//! ```

pub mod blocks;
pub mod commands;
pub mod events;
pub mod gateway;
pub mod platform;
pub mod service;

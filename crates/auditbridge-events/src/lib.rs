//! # auditbridge-events
//!
//! The inbound side of the bridge.
//!
//! - [`decoder::SchemaDecoder`] implements
//!   [`auditbridge_core::traits::EventDecoder`]: it parses a payload, checks
//!   it against an optional JSON Schema and any registered record checks,
//!   and yields an `AuditEvent`.
//! - [`source::ChannelEventSource`] and [`source::JsonLinesSource`]
//!   implement [`auditbridge_core::traits::EventSource`].
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use auditbridge_events::{source, SchemaDecoder};
//!
//! let decoder = SchemaDecoder::new();
//! let (publisher, mut events) = source::channel("clause-events", "clause-hlf", 64);
//! publisher.publish(r#"{"contractId":"C1","status":"executed"}"#).await?;
//! ```

pub mod decoder;
pub mod source;

pub use decoder::{EventCheckFn, SchemaDecoder};
pub use source::{channel, ChannelEventSource, EventPublisher, JsonLinesSource};

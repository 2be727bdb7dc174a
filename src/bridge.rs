//! Bridges standard [`tracing`] events into the active tree logger frontier.
//!
//! Grounded in the teacher's own [`Layer`] implementation for event handling,
//! and in the source implementation's `TreeLogHandler`, which hooks the
//! standard library's `logging` module the same way: every record becomes one
//! `log()` call, with the level folded down to just two message types.

use tracing::field::{Field, Visit};
use tracing::Subscriber;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use crate::api;
use crate::logs::MessageType;

/// A [`Layer`] that forwards every [`tracing::Event`] into [`api::log`] on
/// whatever branches are in the current frontier.
///
/// Spans aren't modeled; this only sees events, the same scope the source
/// implementation's logging bridge covered.
#[derive(Default)]
pub struct ForestBridgeLayer {
    _private: (),
}

impl ForestBridgeLayer {
    pub fn new() -> Self {
        ForestBridgeLayer::default()
    }
}

impl<S> Layer<S> for ForestBridgeLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let metadata = event.metadata();
        let message_type = to_message_type(*metadata.level());
        let message = format!("[{}] {}: {}", metadata.level(), metadata.target(), visitor.message);

        api::log(message, message_type, None);
    }
}

fn to_message_type(level: tracing::Level) -> MessageType {
    match level {
        tracing::Level::WARN | tracing::Level::ERROR => MessageType::Error,
        tracing::Level::TRACE | tracing::Level::DEBUG | tracing::Level::INFO => MessageType::User,
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warn_and_error_fold_to_error_message_type() {
        assert_eq!(to_message_type(tracing::Level::WARN), MessageType::Error);
        assert_eq!(to_message_type(tracing::Level::ERROR), MessageType::Error);
    }

    #[test]
    fn trace_debug_info_fold_to_user_message_type() {
        assert_eq!(to_message_type(tracing::Level::TRACE), MessageType::User);
        assert_eq!(to_message_type(tracing::Level::DEBUG), MessageType::User);
        assert_eq!(to_message_type(tracing::Level::INFO), MessageType::User);
    }
}

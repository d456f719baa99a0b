use thiserror::Error as ThisError;

///
/// PublishError
/// Raised by a sink; logged and counted by the dispatcher, never retried.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("publish to '{topic}' failed: {message}")]
pub struct PublishError {
    pub topic: String,
    pub message: String,
}

impl PublishError {
    pub fn new(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            message: message.into(),
        }
    }
}

///
/// PublishSink
///
/// Broker-facing side of the dispatcher. Implementations hand the payload to
/// the transport and return without waiting for delivery.
///

pub trait PublishSink: Send + Sync {
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), PublishError>;
}

impl<S: PublishSink + ?Sized> PublishSink for &S {
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), PublishError> {
        (**self).publish(topic, payload)
    }
}

use crate::Error;

/// Destination for failures that should be seen by a human.
pub trait ErrorSink: Send + Sync + 'static {
    fn capture(&self, error: &Error);
}

pub struct SentrySink;

impl ErrorSink for SentrySink {
    fn capture(&self, error: &Error) {
        sentry::capture_error(error);
    }
}

//! Delivery of reports to the operator.
//!
//! Delivery failures never interrupt a backup: [deliver] logs them and returns.

pub mod telegram;

use std::io;
use std::path::Path;

use derive_more::{Display, Error, From};

pub use telegram::Telegram;

/// Channel reports are sent to.
pub trait Notifier {
    /// Send `message` and, if given, the file at `attachment`.
    fn send(&self, message: &str, attachment: Option<&Path>) -> Result<(), NotifyError>;
}

#[derive(Debug, Display, Error, From)]
/// Errors on delivering a notification.
pub enum NotifyError {
    /// The request didn't reach the API or the response was unreadable.
    #[display("Request failed: {_0}")]
    #[from]
    Http(reqwest::Error),
    /// The API rejected the request.
    #[display("{method} rejected: {description}")]
    Api {
        method: &'static str,
        description: String,
    },
    /// The attachment can't be read.
    #[display("Reading attachment failed: {_0}")]
    #[from]
    Attachment(io::Error),
}

/// Send a report, logging instead of returning a failure.
pub fn deliver<N: Notifier + ?Sized>(notifier: &N, message: &str, attachment: Option<&Path>) {
    if let Err(e) = notifier.send(message, attachment) {
        log::error!(target: "notify", "Sending notification failed: {e}");
    }
}

/// Writes reports to the log. Used when no notification channel is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, message: &str, attachment: Option<&Path>) -> Result<(), NotifyError> {
        for line in message.lines() {
            log::info!(target: "notify", "{line}");
        }
        if let Some(attachment) = attachment {
            log::info!(target: "notify", "Attachment: {}", attachment.display());
        }
        Ok(())
    }
}

impl<N: Notifier + ?Sized> Notifier for Box<N> {
    fn send(&self, message: &str, attachment: Option<&Path>) -> Result<(), NotifyError> {
        (**self).send(message, attachment)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    struct Unreachable {
        attempts: Cell<usize>,
    }

    impl Notifier for Unreachable {
        fn send(&self, _message: &str, _attachment: Option<&Path>) -> Result<(), NotifyError> {
            self.attempts.set(self.attempts.get() + 1);
            Err(NotifyError::Api {
                method: "sendMessage",
                description: "Bad Gateway".into(),
            })
        }
    }

    #[test]
    fn deliver_swallows_errors() {
        let notifier = Unreachable {
            attempts: Cell::new(0),
        };
        deliver(&notifier, "hello", None);
        assert_eq!(notifier.attempts.get(), 1);
    }

    #[test]
    fn log_notifier_always_succeeds() {
        assert!(LogNotifier.send("line 1\nline 2", Some(Path::new("/tmp/x"))).is_ok());
    }

    #[test]
    fn boxed_notifier_forwards() {
        let boxed: Box<dyn Notifier> = Box::new(LogNotifier);
        assert!(boxed.send("boxed", None).is_ok());
    }
}

/// Errors raised while producing notifications
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    /// The identifier is not part of the notification catalog.
    ///
    /// Identifiers are never user supplied, so this always indicates a bug.
    #[error("Unknown notification identifier: {0}")]
    UnknownIdentifier(String),
}

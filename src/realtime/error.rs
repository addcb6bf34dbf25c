/// Failures of the realtime layer. Hub and router failures are isolated
/// per connection and never tear down the process.
#[derive(Debug, PartialEq, Eq)]
pub enum RealtimeError {
    /// No identity token was supplied at handshake
    IdentityRequired,
    /// A registration already exists for this connection handle
    AlreadyRegistered,
    /// Inbound event carried an unsupported or malformed kind
    UnknownEventKind(String),
    /// Notification operation on an id not in the caller's feed
    NotFound(String),
}

impl std::fmt::Display for RealtimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RealtimeError::IdentityRequired => {
                write!(f, "No identity token supplied at handshake")
            }
            RealtimeError::AlreadyRegistered => {
                write!(f, "Connection handle is already registered")
            }
            RealtimeError::UnknownEventKind(kind) => {
                write!(f, "Unknown event kind: {}", kind)
            }
            RealtimeError::NotFound(id) => {
                write!(f, "Notification not found: {}", id)
            }
        }
    }
}

impl std::error::Error for RealtimeError {}

//! Error types for tinysa.
//!
//! All fallible operations across the library return [`Result<T>`], which
//! uses [`Error`] as the error type. Argument legality failures are carried
//! by [`ValidationError`] so callers can tell a rejected call (nothing was
//! written to the wire) apart from a failed exchange.

/// The error type for all tinysa operations.
///
/// Variants cover the failure modes met when talking to the instrument's
/// serial console: transport faults, malformed or oversized frames,
/// timeouts, cancellation, and rejected arguments.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level error (port could not be opened, write failed).
    #[error("transport error: {0}")]
    Transport(String),

    /// A framing-level error (response frame exceeded the size cap).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Timed out waiting for the prompt that ends a response frame.
    ///
    /// Usually the instrument is busy with a long sweep, has been unplugged,
    /// or the port belongs to a different device.
    #[error("timeout waiting for response")]
    Timeout,

    /// No connection to the instrument has been established.
    #[error("not connected")]
    NotConnected,

    /// The connection to the instrument was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// A previous command (`reset`, `clearconfig`, `restart`) made the
    /// instrument drop the link; a new transport must be installed first.
    #[error("instrument link was reset; reconnect required")]
    ReconnectRequired,

    /// The exchange was cancelled by the caller before the prompt arrived.
    #[error("exchange cancelled")]
    Cancelled,

    /// An invalid configuration parameter was passed to a builder or helper.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A command argument failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// An argument legality failure detected before anything reached the wire.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The command name is not present in the constraint table.
    #[error("unknown command `{0}` (use the raw passthrough for unmodeled commands)")]
    UnknownCommand(String),

    /// A required argument was omitted and has no default.
    #[error("{command}: missing required argument `{argument}`")]
    MissingArgument { command: String, argument: String },

    /// More arguments were supplied than the command declares.
    #[error("{command}: unexpected extra argument `{value}`")]
    UnexpectedArgument { command: String, value: String },

    /// A value matched none of the argument's accepted forms.
    #[error("{command}: `{argument}` does not accept {value} (expected {expected})")]
    Rejected {
        command: String,
        argument: String,
        value: String,
        expected: String,
    },

    /// Raw text would reach the shell as more than one command line.
    #[error("raw command {0:?} contains a line break")]
    EmbeddedLineBreak(String),
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

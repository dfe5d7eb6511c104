use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt::{self, Display};

use solstice_model::{ErrorKind, ModelProviderError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    SpawnFailed,
    Io,
    CliFailed,
    MalformedResponse,
}

/// Error type for [`ClaudeCliProvider`](crate::ClaudeCliProvider).
#[derive(Debug)]
pub struct Error {
    stage: Stage,
    reason: Option<String>,
}

impl Error {
    #[inline]
    fn new(stage: Stage) -> Self {
        Self {
            stage,
            reason: None,
        }
    }

    #[inline]
    pub(crate) fn spawn_failed() -> Self {
        Self::new(Stage::SpawnFailed)
    }

    #[inline]
    pub(crate) fn io() -> Self {
        Self::new(Stage::Io)
    }

    #[inline]
    pub(crate) fn cli_failed() -> Self {
        Self::new(Stage::CliFailed)
    }

    #[inline]
    pub(crate) fn malformed_response() -> Self {
        Self::new(Stage::MalformedResponse)
    }

    #[inline]
    pub(crate) fn with_reason<S: Into<String>>(mut self, reason: S) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Returns the human-readable reason of the error.
    pub fn reason(&self) -> Cow<'_, str> {
        match &self.reason {
            Some(reason) => Cow::Borrowed(reason),
            None => Cow::Borrowed(match self.stage {
                Stage::SpawnFailed => "failed to spawn the subprocess",
                Stage::Io => "failed to talk to the subprocess",
                Stage::CliFailed => "the subprocess reported an error",
                Stage::MalformedResponse => {
                    "the subprocess produced malformed output"
                }
            }),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "claude cli error: {}", self.reason())
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Errors that cross the message bus and reach the control surface
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error, serde::Deserialize, serde::Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Error {
    #[error("Unknown error: {message}")]
    Unknown { message: String },

    #[error("No active page to collect from")]
    NoActivePage,

    #[error("Page did not confirm the collection loop in time")]
    BeginLoopTimeout,

    #[error("Automation could not start: {reason}")]
    Automation { reason: AutomationError },

    #[error("Message delivery failed: {reason}")]
    Channel { reason: ChannelError },
}

impl Error {
    pub fn unknown(message: impl std::fmt::Display) -> Error {
        Error::Unknown {
            message: message.to_string(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Error::Unknown { .. } => "unknown",
            Error::NoActivePage => "no-active-page",
            Error::BeginLoopTimeout => "begin-loop-timeout",
            Error::Automation { reason } => reason.code(),
            Error::Channel { reason } => reason.code(),
        }
    }
}

impl From<AutomationError> for Error {
    fn from(reason: AutomationError) -> Error {
        Error::Automation { reason }
    }
}

impl From<ChannelError> for Error {
    fn from(reason: ChannelError) -> Error {
        Error::Channel { reason }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AutomationError {
    #[error("no control to open the comment panel")]
    ControlNotFound,

    #[error("comment panel did not open")]
    DidNotOpen,
}

impl AutomationError {
    pub fn code(&self) -> &'static str {
        match self {
            AutomationError::ControlNotFound => "control-not-found",
            AutomationError::DidNotOpen => "did-not-open",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChannelError {
    #[error("receiving side is gone")]
    Closed,

    #[error("receiving side dropped the request without answering")]
    NoReply,
}

impl ChannelError {
    pub fn code(&self) -> &'static str {
        match self {
            ChannelError::Closed => "channel-closed",
            ChannelError::NoReply => "no-reply",
        }
    }
}

use murmur_api::{AutomationError, ChannelError, Error as ApiError};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl Error {
    pub fn no_active_page() -> Error {
        Error::Api(ApiError::NoActivePage)
    }

    pub fn begin_loop_timeout() -> Error {
        Error::Api(ApiError::BeginLoopTimeout)
    }

    pub fn automation(reason: AutomationError) -> Error {
        Error::Api(ApiError::from(reason))
    }

    pub fn channel(reason: ChannelError) -> Error {
        Error::Api(ApiError::from(reason))
    }

    /// What the caller gets to see
    pub fn into_api(self) -> ApiError {
        match self {
            Error::Anyhow(err) => {
                tracing::error!(?err, "internal worker error");
                ApiError::unknown(format!("{err:#}"))
            }
            Error::Api(err) => {
                tracing::info!("returning error to caller: {err}");
                err
            }
        }
    }
}

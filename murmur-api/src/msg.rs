use crate::{
    AutomationError, CaptureEvent, CollectionState, Comment, Error, IngestResult, PageInfo,
};

/// Requests handled by the worker, the persistence side
#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkerRequest {
    Capture(CaptureEvent),
    Start,
    Stop,
    LoopFinished { reason: FinishReason },
    GetState,
    Export,
}

#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkerResponse {
    Ingested(IngestResult),
    Started {
        state: CollectionState,
        auto_opened: bool,
    },
    Failed(Error),
    State(CollectionState),
    Exported(Vec<Comment>),
}

/// Requests handled by the page side
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageRequest {
    BeginLoop,
    StopLoop,
    PageInfo,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageResponse {
    Began { auto_opened: bool },
    Refused(AutomationError),
    Stopped,
    Info(PageInfo),
}

/// Why the collection loop ended by itself
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinishReason {
    /// No new comments for the configured number of iterations
    Exhausted,

    /// The scroll container could not be found within the retry budget
    ContainerNotFound,
}

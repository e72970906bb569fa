use chrono::Utc;

pub use uuid::Uuid;
pub type Time = chrono::DateTime<Utc>;

pub mod bus;

mod endpoint;
pub use endpoint::{Endpoint, COMMENT_LIST_PATH, COMMENT_REPLY_PATH, PAGE_ORIGIN};

mod error;
pub use error::{AutomationError, ChannelError, Error};

mod msg;
pub use msg::{FinishReason, PageRequest, PageResponse, WorkerRequest, WorkerResponse};

pub type WorkerSender = bus::Sender<WorkerRequest, WorkerResponse>;
pub type WorkerReceiver = bus::Receiver<WorkerRequest, WorkerResponse>;
pub type PageSender = bus::Sender<PageRequest, PageResponse>;
pub type PageReceiver = bus::Receiver<PageRequest, PageResponse>;

pub mod raw;

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize)]
pub struct CommentId(pub String);

impl From<&str> for CommentId {
    fn from(s: &str) -> CommentId {
        CommentId(String::from(s))
    }
}

#[derive(Clone, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct SubjectId(pub String);

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> SessionId {
        SessionId(Uuid::new_v4())
    }
}

/// One harvested comment, as stored. Apart from a late `reply_to_handle`
/// backfill, a stored comment never changes.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Comment {
    pub id: CommentId,
    pub author_handle: String,
    pub author_display_name: String,

    /// Arbitrary user content, never trusted downstream
    pub text: String,

    pub like_count: u64,
    pub declared_reply_count: u64,

    /// Epoch seconds, 0 when unknown
    pub created_at: i64,

    pub is_reply: bool,

    /// None for top-level comments and for orphan replies
    pub parent_id: Option<CommentId>,

    pub reply_to_handle: Option<String>,
    pub creator_liked: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Idle,
    Collecting,
    Complete,
    Error,
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CollectionState {
    pub session: SessionId,
    pub status: Status,
    pub subject_id: Option<SubjectId>,
    pub subject_url: Option<String>,

    /// Top-level total, as declared by the listing
    pub declared_total: u64,

    /// Progress hint only, may be off in both directions
    pub estimated_reply_total: u64,

    /// Always the cardinality of the comment store
    pub collected_count: u64,

    pub cursor: u64,
    pub has_more: bool,
    pub started_at: Option<Time>,
}

impl Default for CollectionState {
    fn default() -> CollectionState {
        CollectionState {
            session: SessionId::new(),
            status: Status::Idle,
            subject_id: None,
            subject_url: None,
            declared_total: 0,
            estimated_reply_total: 0,
            collected_count: 0,
            cursor: 0,
            has_more: true,
            started_at: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct IngestResult {
    pub collected_count: u64,
    pub declared_total: u64,
    pub estimated_reply_total: u64,
    pub new_count: u64,
}

impl IngestResult {
    pub fn zero() -> IngestResult {
        IngestResult::default()
    }
}

/// A comment-listing response observed on the page
#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CaptureEvent {
    pub url: String,
    pub body: serde_json::Value,
    pub timestamp: Time,
}

impl CaptureEvent {
    pub fn now(url: String, body: serde_json::Value) -> CaptureEvent {
        CaptureEvent {
            url,
            body,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct PageInfo {
    pub url: String,
    pub title: String,
}

mod error;
pub use error::Error;

pub mod storage;
pub use storage::{DirStorage, MemoryStorage, Storage, StorageError};

mod worker;
pub use worker::{Worker, WorkerConfig};

mod writer;
pub use writer::{Outcome, Transition, Writer};

pub mod api {
    pub use murmur_api::*;
}

mod export;

mod ingest;
pub use ingest::ingest;

mod state;
pub use state::SessionExt;

mod store;
pub use store::{CommentStore, Insert};

pub mod api {
    pub use murmur_api::*;
}

pub mod prelude {
    pub use crate::SessionExt;
}

use std::collections::{hash_map, HashMap};

use crate::api::{Comment, CommentId};

/// Every comment seen in the current session, keyed by id
#[derive(Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(transparent)]
pub struct CommentStore {
    comments: HashMap<CommentId, Comment>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Insert {
    New,
    /// Already stored, and the stored copy just learned its `reply_to_handle`
    Backfilled,
    Duplicate,
}

impl CommentStore {
    pub fn new() -> CommentStore {
        CommentStore::default()
    }

    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    pub fn get(&self, id: &CommentId) -> Option<&Comment> {
        self.comments.get(id)
    }

    pub fn contains(&self, id: &CommentId) -> bool {
        self.comments.contains_key(id)
    }

    pub fn comments(&self) -> impl Iterator<Item = &Comment> {
        self.comments.values()
    }

    /// Author handle of a stored comment, if known and non-empty
    pub fn handle_of(&self, id: &CommentId) -> Option<&str> {
        self.comments
            .get(id)
            .map(|c| &c.author_handle as &str)
            .filter(|h| !h.is_empty())
    }

    /// First write wins: an id already present is never overwritten, except that a
    /// missing `reply_to_handle` gets filled in.
    pub fn insert(&mut self, c: Comment) -> Insert {
        match self.comments.entry(c.id.clone()) {
            hash_map::Entry::Vacant(entry) => {
                entry.insert(c);
                Insert::New
            }
            hash_map::Entry::Occupied(mut entry) => {
                let stored = entry.get_mut();
                if stored.reply_to_handle.is_none() && c.reply_to_handle.is_some() {
                    stored.reply_to_handle = c.reply_to_handle;
                    Insert::Backfilled
                } else {
                    Insert::Duplicate
                }
            }
        }
    }
}

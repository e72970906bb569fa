use std::{cmp::Ordering, collections::HashMap};

use crate::{
    api::{Comment, CommentId},
    CommentStore,
};

impl CommentStore {
    /// Threaded order: each top-level comment immediately followed by its replies, then
    /// every reply whose parent is not a stored top-level comment. Each group is sorted by
    /// `created_at`, ties broken by id.
    pub fn export_ordered(&self) -> Vec<Comment> {
        let mut top_level = Vec::new();
        let mut replies: HashMap<&CommentId, Vec<&Comment>> = HashMap::new();
        let mut orphans = Vec::new();
        for c in self.comments() {
            match (&c.parent_id, c.is_reply) {
                (_, false) => top_level.push(c),
                (Some(p), true) if self.get(p).map_or(false, |p| !p.is_reply) => {
                    replies.entry(p).or_default().push(c)
                }
                (_, true) => orphans.push(c),
            }
        }

        top_level.sort_unstable_by(chronological);
        orphans.sort_unstable_by(chronological);
        let mut res = Vec::with_capacity(self.len());
        for c in top_level {
            res.push(c.clone());
            if let Some(mut children) = replies.remove(&c.id) {
                children.sort_unstable_by(chronological);
                res.extend(children.into_iter().cloned());
            }
        }
        res.extend(orphans.into_iter().cloned());
        res
    }
}

fn chronological(a: &&Comment, b: &&Comment) -> Ordering {
    (a.created_at, &a.id).cmp(&(b.created_at, &b.id))
}

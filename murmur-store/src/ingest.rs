use anyhow::anyhow;
use serde_json::Value;

use crate::{
    api::{
        raw::{RawComment, RawListing},
        CollectionState, Comment, CommentId, Endpoint, IngestResult,
    },
    CommentStore, Insert,
};

/// Applies one captured listing to the session.
///
/// Nothing is modified unless the url and body are both recognized, so a failed call
/// leaves `state` and `store` exactly as they were. Persisting the result is up to the
/// caller.
pub fn ingest(
    state: &mut CollectionState,
    store: &mut CommentStore,
    url: &str,
    body: &Value,
) -> anyhow::Result<IngestResult> {
    let endpoint = Endpoint::classify(url)
        .ok_or_else(|| anyhow!("url {url:?} is not a comment listing"))?;
    let listing = RawListing::parse(body)?;

    if state.subject_id.is_none() {
        state.subject_id = Endpoint::subject_id(url);
    }

    let mut new_count = 0;
    match endpoint {
        Endpoint::TopLevel => {
            if listing.total != 0 {
                state.declared_total = listing.total;
            }
            if listing.cursor != 0 {
                state.cursor = listing.cursor;
            }
            state.has_more = listing.has_more;

            for raw in listing.records() {
                let c = derive(raw, None);
                let is_top_level = !c.is_reply;
                if store.insert(c) == Insert::New {
                    new_count += 1;
                    if is_top_level {
                        // approximate, never reconciled with the reply listings
                        let inline = raw.inline_replies().len() as u64;
                        state.estimated_reply_total = state
                            .estimated_reply_total
                            .saturating_add(raw.reply_comment_total.saturating_sub(inline));
                    }
                }
                let parent_handle = Some(raw.handle()).filter(|h| !h.is_empty());
                for reply in raw.inline_replies() {
                    let mut r = derive(reply, Some(&raw.cid));
                    r.reply_to_handle = parent_handle.map(String::from);
                    if store.insert(r) == Insert::New {
                        new_count += 1;
                    }
                }
            }
        }
        Endpoint::Replies => {
            let parent = Endpoint::parent_id(url);
            let parent_handle = parent
                .as_ref()
                .and_then(|p| store.handle_of(p))
                .map(String::from);
            if let Some(p) = parent.as_ref().filter(|p| !store.contains(p)) {
                tracing::debug!(parent = ?p, "replies for a comment not seen yet");
            }
            for raw in listing.records() {
                let mut c = derive(raw, parent.as_ref());
                c.is_reply = true;
                c.reply_to_handle = parent_handle.clone();
                if store.insert(c) == Insert::New {
                    new_count += 1;
                }
            }
        }
    }

    state.collected_count = store.len() as u64;
    Ok(IngestResult {
        collected_count: state.collected_count,
        declared_total: state.declared_total,
        estimated_reply_total: state.estimated_reply_total,
        new_count,
    })
}

fn derive(raw: &RawComment, parent: Option<&CommentId>) -> Comment {
    let parent_id = parent.cloned().or_else(|| raw.declared_parent());
    Comment {
        id: raw.cid.clone(),
        author_handle: String::from(raw.handle()),
        author_display_name: String::from(raw.display_name()),
        text: raw.text.clone().unwrap_or_default(),
        like_count: raw.digg_count,
        declared_reply_count: raw.reply_comment_total,
        created_at: raw.create_time,
        is_reply: parent_id.is_some(),
        parent_id,
        reply_to_handle: None,
        creator_liked: raw.is_author_digged,
    }
}

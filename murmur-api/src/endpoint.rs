use url::Url;

use crate::{CommentId, SubjectId};

pub const COMMENT_LIST_PATH: &str = "/api/comment/list/";
pub const COMMENT_REPLY_PATH: &str = "/api/comment/list/reply/";

// Page-relative request urls are resolved against this
pub const PAGE_ORIGIN: &str = "https://www.tiktok.com";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Endpoint {
    TopLevel,
    Replies,
}

impl Endpoint {
    pub fn classify(url: &str) -> Option<Endpoint> {
        let path = parse(url).map(|u| u.path().to_string())?;
        if path.contains(COMMENT_REPLY_PATH) {
            Some(Endpoint::Replies)
        } else if path.contains(COMMENT_LIST_PATH) {
            Some(Endpoint::TopLevel)
        } else {
            None
        }
    }

    pub fn subject_id(url: &str) -> Option<SubjectId> {
        query_param(url, "aweme_id").map(SubjectId)
    }

    /// The comment whose replies a reply listing carries
    pub fn parent_id(url: &str) -> Option<CommentId> {
        query_param(url, "comment_id").map(CommentId)
    }
}

fn parse(url: &str) -> Option<Url> {
    let base = Url::parse(PAGE_ORIGIN).ok()?;
    base.join(url).ok()
}

fn query_param(url: &str, name: &str) -> Option<String> {
    parse(url)?
        .query_pairs()
        .find(|(k, v)| k == name && !v.is_empty())
        .map(|(_, v)| v.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_listing_urls() {
        assert_eq!(
            Endpoint::classify("/api/comment/list/?aweme_id=123&cursor=0"),
            Some(Endpoint::TopLevel),
        );
        assert_eq!(
            Endpoint::classify("https://www.tiktok.com/api/comment/list/reply/?comment_id=9"),
            Some(Endpoint::Replies),
        );
        assert_eq!(Endpoint::classify("/api/item/detail/?itemId=1"), None);
    }

    #[test]
    fn extracts_query_parameters() {
        let url = "/api/comment/list/reply/?aweme_id=77&comment_id=A&count=3";
        assert_eq!(Endpoint::subject_id(url), Some(SubjectId(String::from("77"))));
        assert_eq!(Endpoint::parent_id(url), Some(CommentId::from("A")));
        assert_eq!(Endpoint::parent_id("/api/comment/list/?aweme_id=77"), None);
        assert_eq!(Endpoint::subject_id("/api/comment/list/?aweme_id="), None);
    }
}

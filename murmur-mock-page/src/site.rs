use std::sync::Arc;

use anyhow::{anyhow, Context};
use murmur_api::{COMMENT_LIST_PATH, COMMENT_REPLY_PATH, PAGE_ORIGIN};
use murmur_page::{Fetch, FetchRequest, FetchResponse};
use serde_json::{json, Value};

#[derive(Clone, Debug)]
pub struct SiteComment {
    pub cid: String,
    pub handle: String,
    pub nickname: String,
    pub text: String,
    pub likes: u64,
    pub create_time: i64,
    pub replies: Vec<SiteComment>,
}

impl SiteComment {
    fn to_json(&self, reply_to: Option<&str>, inline: &[SiteComment]) -> Value {
        json!({
            "cid": self.cid,
            "user": { "unique_id": self.handle, "nickname": self.nickname },
            "text": self.text,
            "digg_count": self.likes,
            "reply_comment_total": self.replies.len(),
            "create_time": self.create_time,
            "reply_id": reply_to.unwrap_or("0"),
            "is_author_digged": 0,
            "reply_comment": match inline.is_empty() {
                true => Value::Null,
                false => inline
                    .iter()
                    .map(|r| r.to_json(Some(&self.cid), &[]))
                    .collect(),
            },
        })
    }
}

#[derive(Debug)]
struct Inner {
    aweme_id: String,
    comments: Vec<SiteComment>,
    page_size: usize,
    inline_replies: usize,
    requests: Vec<String>,
}

/// The observed service's comment API, serving a fixed comment tree
#[derive(Clone, Debug)]
pub struct MockSite(Arc<parking_lot::Mutex<Inner>>);

impl MockSite {
    pub fn new(aweme_id: &str, comments: Vec<SiteComment>) -> MockSite {
        MockSite(Arc::new(parking_lot::Mutex::new(Inner {
            aweme_id: String::from(aweme_id),
            comments,
            page_size: 20,
            inline_replies: 1,
            requests: Vec::new(),
        })))
    }

    /// `top_level` comments `c<i>`, each with `replies` replies `c<i>r<j>`, one second apart
    pub fn generate(top_level: usize, replies: usize) -> MockSite {
        let comment = |cid: String, i: usize| SiteComment {
            handle: format!("user{}", i % 7),
            nickname: format!("User {}", i % 7),
            text: lipsum::lipsum_words(3 + i % 5),
            likes: (i * 3 % 11) as u64,
            create_time: 1_700_000_000 + i as i64,
            replies: Vec::new(),
            cid,
        };
        let comments = (0..top_level)
            .map(|i| SiteComment {
                replies: (0..replies)
                    .map(|j| comment(format!("c{i}r{j}"), i * 1000 + j + 1))
                    .collect(),
                ..comment(format!("c{i}"), i * 1000)
            })
            .collect();
        MockSite::new("7300000000000000001", comments)
    }

    pub fn with_page_size(self, page_size: usize) -> MockSite {
        self.0.lock().page_size = page_size.max(1);
        self
    }

    pub fn with_inline_replies(self, inline_replies: usize) -> MockSite {
        self.0.lock().inline_replies = inline_replies;
        self
    }

    pub fn aweme_id(&self) -> String {
        self.0.lock().aweme_id.clone()
    }

    pub fn page_url(&self) -> String {
        format!("{PAGE_ORIGIN}/@someone/video/{}", self.aweme_id())
    }

    /// Every comment, replies included
    pub fn total(&self) -> usize {
        self.0
            .lock()
            .comments
            .iter()
            .map(|c| 1 + c.replies.len())
            .sum()
    }

    pub fn requests(&self) -> Vec<String> {
        self.0.lock().requests.clone()
    }

    pub fn top_level_url(&self, cursor: usize) -> String {
        let inner = self.0.lock();
        format!(
            "{COMMENT_LIST_PATH}?aweme_id={}&cursor={cursor}&count={}",
            inner.aweme_id, inner.page_size
        )
    }

    pub fn replies_url(&self, cid: &str, cursor: usize) -> String {
        let inner = self.0.lock();
        format!(
            "{COMMENT_REPLY_PATH}?comment_id={cid}&item_id={}&cursor={cursor}&count={}",
            inner.aweme_id, inner.page_size
        )
    }

    fn respond(&self, url: &str) -> anyhow::Result<Option<Value>> {
        let base = url::Url::parse(PAGE_ORIGIN).context("parsing page origin")?;
        let url = base
            .join(url)
            .with_context(|| format!("parsing request url {url:?}"))?;
        let param = |name: &str| {
            url.query_pairs()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.into_owned())
        };
        let number = |name: &str| param(name).and_then(|v| v.parse::<usize>().ok());

        let mut inner = self.0.lock();
        inner.requests.push(String::from(url.as_str()));
        let count = number("count").unwrap_or(inner.page_size).max(1);
        let cursor = number("cursor").unwrap_or(0);

        let page = |all: &[SiteComment], render: &dyn Fn(&SiteComment) -> Value| {
            let end = all.len().min(cursor + count);
            let records = all
                .get(cursor.min(end)..end)
                .unwrap_or(&[])
                .iter()
                .map(render)
                .collect::<Vec<_>>();
            json!({
                "status_code": 0,
                "comments": records,
                "cursor": end,
                "has_more": (end < all.len()) as u8,
                "total": all.len(),
            })
        };

        match url.path() {
            COMMENT_REPLY_PATH => {
                let parent = param("comment_id").ok_or_else(|| anyhow!("missing comment_id"))?;
                let Some(parent) = inner.comments.iter().find(|c| c.cid == parent) else {
                    return Ok(Some(page(&[], &|c| c.to_json(None, &[]))));
                };
                Ok(Some(page(&parent.replies, &|r| {
                    r.to_json(Some(&parent.cid), &[])
                })))
            }
            COMMENT_LIST_PATH => {
                let inline = inner.inline_replies;
                Ok(Some(page(&inner.comments, &|c| {
                    c.to_json(None, &c.replies[..inline.min(c.replies.len())])
                })))
            }
            _ => Ok(None),
        }
    }
}

#[async_trait::async_trait]
impl Fetch for MockSite {
    async fn fetch(&self, req: FetchRequest) -> anyhow::Result<FetchResponse> {
        Ok(match self.respond(&req.url)? {
            Some(body) => FetchResponse::ok(body.to_string()),
            None => FetchResponse {
                status: 404,
                body: bytes::Bytes::from_static(b"{}"),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn get(site: &MockSite, url: &str) -> Value {
        let resp = site.fetch(FetchRequest::get(url)).await.expect("fetching");
        assert!(resp.is_success());
        serde_json::from_slice(&resp.body).expect("parsing body")
    }

    #[tokio::test]
    async fn pages_through_top_level_comments() {
        let site = MockSite::generate(5, 2).with_page_size(2);
        assert_eq!(site.total(), 15);

        let first = get(&site, &site.top_level_url(0)).await;
        assert_eq!(first["comments"].as_array().map(Vec::len), Some(2));
        assert_eq!(first["cursor"], 2);
        assert_eq!(first["has_more"], 1);
        assert_eq!(first["total"], 5);
        assert_eq!(first["comments"][0]["reply_comment"][0]["cid"], "c0r0");
        assert_eq!(first["comments"][0]["reply_comment"][0]["reply_id"], "c0");

        let last = get(&site, &site.top_level_url(4)).await;
        assert_eq!(last["comments"].as_array().map(Vec::len), Some(1));
        assert_eq!(last["has_more"], 0);
    }

    #[tokio::test]
    async fn serves_replies_of_one_comment() {
        let site = MockSite::generate(2, 3).with_page_size(2);
        let replies = get(&site, &site.replies_url("c1", 2)).await;
        assert_eq!(replies["comments"][0]["cid"], "c1r2");
        assert_eq!(replies["has_more"], 0);

        let unknown = get(&site, &site.replies_url("nope", 0)).await;
        assert_eq!(unknown["comments"].as_array().map(Vec::len), Some(0));

        let resp = site
            .fetch(FetchRequest::get("/api/other/"))
            .await
            .expect("fetching");
        assert_eq!(resp.status, 404);
        assert_eq!(site.requests().len(), 3);
    }
}

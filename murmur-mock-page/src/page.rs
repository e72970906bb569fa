use std::{collections::HashMap, sync::Arc};

use futures::StreamExt;
use murmur_api::raw::RawListing;
use murmur_page::{Dom, FetchRequest, NodeId, PageContext};

use crate::{DomEvent, MockDom, MockSite};

/// What an expand button loads when clicked
#[derive(Clone, Debug)]
struct ReplyCursor {
    item: NodeId,
    cid: String,
    cursor: u64,
}

/// A video page of the observed service: a comment icon, and a scrollable comment panel
/// that loads listings through the page's own fetch as the user scrolls and expands
/// replies.
pub struct MockPage {
    dom: Arc<MockDom>,
    site: MockSite,
    ctx: Arc<PageContext>,
    icon: NodeId,
    panel: NodeId,
    list: NodeId,
}

impl MockPage {
    pub fn new(site: MockSite, panel_open: bool) -> MockPage {
        let dom = Arc::new(MockDom::new(&site.page_url(), "mock video"));

        let icon = dom.add(None, "button");
        dom.set_attr(icon, "data-e2e", "comment-icon");
        let count = dom.add(Some(icon), "strong");
        dom.set_attr(count, "data-e2e", "comment-count");
        dom.set_text(count, &site.total().to_string());

        let panel = dom.add(None, "div");
        dom.set_attr(panel, "class", "css-13wx DivCommentMain");
        dom.set_scrollable(panel, true);
        dom.set_visible(panel, panel_open);
        dom.show_on_click(icon, panel);

        let list = dom.add(Some(panel), "div");
        dom.set_attr(list, "data-e2e", "comment-list");

        let ctx = Arc::new(PageContext::new(Arc::new(site.clone())));
        MockPage {
            dom,
            site,
            ctx,
            icon,
            panel,
            list,
        }
    }

    pub fn dom(&self) -> Arc<MockDom> {
        self.dom.clone()
    }

    pub fn ctx(&self) -> Arc<PageContext> {
        self.ctx.clone()
    }

    pub fn site(&self) -> &MockSite {
        &self.site
    }

    pub fn icon(&self) -> NodeId {
        self.icon
    }

    pub fn panel(&self) -> NodeId {
        self.panel
    }

    /// Starts reacting to clicks and scrolls. The first page of comments loads as soon as
    /// the panel is visible.
    pub fn spawn(&self) -> tokio::task::JoinHandle<()> {
        let mut events = self.dom.subscribe();
        let mut pump = Pump {
            dom: self.dom.clone(),
            site: self.site.clone(),
            ctx: self.ctx.clone(),
            panel: self.panel,
            list: self.list,
            next_cursor: Some(0),
            buttons: HashMap::new(),
        };
        tokio::spawn(async move {
            pump.load_top_level_if_open().await;
            while let Some(event) = events.next().await {
                match event {
                    DomEvent::ScrolledToEnd(node) if node == pump.panel => {
                        pump.load_top_level().await
                    }
                    DomEvent::ScrolledToEnd(_) => (),
                    DomEvent::Clicked(node) => {
                        pump.load_top_level_if_open().await;
                        if let Some(at) = pump.buttons.remove(&node) {
                            pump.load_replies(node, at).await;
                        }
                    }
                }
            }
        })
    }
}

struct Pump {
    dom: Arc<MockDom>,
    site: MockSite,
    ctx: Arc<PageContext>,
    panel: NodeId,
    list: NodeId,

    /// None once the last top-level page is loaded
    next_cursor: Option<u64>,

    buttons: HashMap<NodeId, ReplyCursor>,
}

impl Pump {
    async fn get(&self, url: String) -> Option<RawListing> {
        let resp = match self.ctx.fetch(FetchRequest::get(url.clone())).await {
            Ok(resp) if resp.is_success() => resp,
            Ok(resp) => {
                tracing::warn!(%url, status = resp.status, "listing request failed");
                return None;
            }
            Err(err) => {
                tracing::warn!(?err, %url, "listing request failed");
                return None;
            }
        };
        let parsed = serde_json::from_slice(&resp.body)
            .map_err(anyhow::Error::from)
            .and_then(|body| RawListing::parse(&body));
        match parsed {
            Ok(listing) => Some(listing),
            Err(err) => {
                tracing::warn!(?err, %url, "unreadable listing");
                None
            }
        }
    }

    async fn load_top_level_if_open(&mut self) {
        if self.next_cursor == Some(0) && self.dom.is_visible(self.panel) {
            self.load_top_level().await;
        }
    }

    async fn load_top_level(&mut self) {
        let Some(cursor) = self.next_cursor else {
            return;
        };
        let Some(listing) = self.get(self.site.top_level_url(cursor as usize)).await else {
            return;
        };
        for record in listing.records() {
            let item = self.dom.add(Some(self.list), "div");
            self.dom.set_attr(item, "data-e2e", "comment-item");
            self.dom.set_text(item, record.text.as_deref().unwrap_or(""));
            if record.reply_comment_total > 0 {
                let action = self.dom.add(Some(item), "div");
                self.dom.set_attr(action, "class", "DivReplyActionContainer");
                self.add_button(
                    action,
                    format!("View {} replies", record.reply_comment_total),
                    ReplyCursor {
                        item,
                        cid: record.cid.0.clone(),
                        cursor: 0,
                    },
                );
            }
        }
        self.next_cursor = listing.has_more.then_some(listing.cursor);
    }

    async fn load_replies(&mut self, button: NodeId, at: ReplyCursor) {
        let url = self.site.replies_url(&at.cid, at.cursor as usize);
        let Some(listing) = self.get(url).await else {
            return;
        };
        self.dom.set_visible(button, false);
        for record in listing.records() {
            let reply = self.dom.add(Some(at.item), "div");
            self.dom.set_attr(reply, "data-e2e", "comment-reply");
            self.dom.set_text(reply, record.text.as_deref().unwrap_or(""));
        }
        if listing.has_more {
            let remaining = listing.total.saturating_sub(listing.cursor);
            let action = self.dom.parent(button).unwrap_or(at.item);
            self.add_button(
                action,
                format!("View {remaining} more replies"),
                ReplyCursor {
                    cursor: listing.cursor,
                    ..at
                },
            );
        }
    }

    fn add_button(&mut self, parent: NodeId, text: String, at: ReplyCursor) {
        let button = self.dom.add(Some(parent), "button");
        self.dom.set_text(button, &text);
        self.buttons.insert(button, at);
    }
}

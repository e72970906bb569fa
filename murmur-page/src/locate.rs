//! Element lookup by ordered fallback strategies.
//!
//! The observed page changes its markup often, so every element the driver needs is
//! described by a [`Locator`]: a list of [`Strategy`] tried in order. Adapting to new
//! markup only means editing the lists in [`Locators::default`].

use regex::Regex;

use crate::{Dom, NodeId};

lazy_static::lazy_static! {
    static ref COMMENT_LABEL: Regex = Regex::new(r"(?i)comment").expect("valid regex");
    static ref VIEW_REPLIES: Regex =
        Regex::new(r"(?i)view\s+\d+\s+(more\s+)?repl").expect("valid regex");
}

#[derive(Clone, Debug)]
pub enum Strategy {
    Selector(String),

    /// Elements whose `aria-label` matches
    Labelled { selector: String, pattern: Regex },

    /// Closest scrollable ancestor of the first element matching `of`
    ScrollableAncestor { of: String },

    /// Matching elements that are scrollable themselves
    Scrollable { selector: String },

    /// Elements whose text content matches
    TextMatches { selector: String, pattern: Regex },
}

impl Strategy {
    pub fn selector(s: &str) -> Strategy {
        Strategy::Selector(String::from(s))
    }

    pub fn find_all(&self, dom: &dyn Dom) -> Vec<NodeId> {
        match self {
            Strategy::Selector(s) => dom.query_all(s),
            Strategy::Labelled { selector, pattern } => dom
                .query_all(selector)
                .into_iter()
                .filter(|n| {
                    dom.attribute(*n, "aria-label")
                        .map_or(false, |l| pattern.is_match(&l))
                })
                .collect(),
            Strategy::ScrollableAncestor { of } => {
                let mut res = Vec::new();
                if let Some(start) = dom.query_all(of).into_iter().next() {
                    let mut node = dom.parent(start);
                    while let Some(n) = node {
                        if dom.is_scrollable(n) {
                            res.push(n);
                            break;
                        }
                        node = dom.parent(n);
                    }
                }
                res
            }
            Strategy::Scrollable { selector } => dom
                .query_all(selector)
                .into_iter()
                .filter(|n| dom.is_scrollable(*n))
                .collect(),
            Strategy::TextMatches { selector, pattern } => dom
                .query_all(selector)
                .into_iter()
                .filter(|n| pattern.is_match(&dom.text(*n)))
                .collect(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Locator {
    pub name: &'static str,
    pub strategies: Vec<Strategy>,
}

impl Locator {
    pub fn new(name: &'static str, strategies: Vec<Strategy>) -> Locator {
        Locator { name, strategies }
    }

    /// First element found by the first strategy that finds any
    pub fn locate(&self, dom: &dyn Dom) -> Option<NodeId> {
        self.strategies
            .iter()
            .find_map(|s| s.find_all(dom).into_iter().next())
    }

    pub fn locate_visible(&self, dom: &dyn Dom) -> Option<NodeId> {
        self.strategies
            .iter()
            .find_map(|s| s.find_all(dom).into_iter().find(|n| dom.is_visible(*n)))
    }

    /// Everything found by the first strategy that finds any
    pub fn locate_all(&self, dom: &dyn Dom) -> Vec<NodeId> {
        self.strategies
            .iter()
            .map(|s| s.find_all(dom))
            .find(|found| !found.is_empty())
            .unwrap_or_default()
    }
}

#[derive(Clone, Debug)]
pub struct Locators {
    pub panel: Locator,
    pub open_control: Locator,
    pub container: Locator,
    pub expand_replies: Locator,
}

impl Default for Locators {
    fn default() -> Locators {
        Locators {
            panel: Locator::new(
                "comment panel",
                vec![
                    Strategy::selector(r#"[data-e2e="comment-list"]"#),
                    Strategy::selector(r#"[class*="DivCommentMain"]"#),
                ],
            ),
            open_control: Locator::new(
                "comment panel control",
                vec![
                    Strategy::selector(r#"[data-e2e="comment-icon"]"#),
                    Strategy::Labelled {
                        selector: String::from(r#"button, [role="button"]"#),
                        pattern: COMMENT_LABEL.clone(),
                    },
                    Strategy::selector(r#"[data-e2e="comment-count"]"#),
                ],
            ),
            container: Locator::new(
                "scroll container",
                vec![
                    Strategy::Scrollable {
                        selector: String::from(r#"[class*="DivCommentMain"]"#),
                    },
                    Strategy::ScrollableAncestor {
                        of: String::from(r#"[data-e2e="comment-list"]"#),
                    },
                    Strategy::ScrollableAncestor {
                        of: String::from(r#"[class*="CommentList"]"#),
                    },
                ],
            ),
            expand_replies: Locator::new(
                "expand replies buttons",
                vec![Strategy::TextMatches {
                    selector: String::from(
                        r#"[class*="ReplyAction"] button, [data-e2e="view-more-replies"]"#,
                    ),
                    pattern: VIEW_REPLIES.clone(),
                }],
            ),
        }
    }
}

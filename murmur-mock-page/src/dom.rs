use std::collections::BTreeMap;

use futures::channel::mpsc;
use murmur_page::{Dom, NodeId};

use crate::selector::{self, Complex, Element};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DomEvent {
    Clicked(NodeId),
    ScrolledToEnd(NodeId),
}

#[derive(Debug)]
struct Node {
    tag: String,
    attrs: BTreeMap<String, String>,
    text: String,
    visible: bool,
    scrollable: bool,
    parent: Option<NodeId>,
    shows_on_click: Vec<NodeId>,
    clicks: usize,
    scrolls: usize,
}

impl Element for Node {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(|v| v.as_str())
    }
}

#[derive(Debug, Default)]
struct Inner {
    nodes: Vec<Node>,
    location: String,
    title: String,
    listeners: Vec<mpsc::UnboundedSender<DomEvent>>,
}

impl Inner {
    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.node(id).parent, |p| self.node(*p).parent)
    }

    fn matches(&self, id: NodeId, complex: &Complex) -> bool {
        let Some((last, outer)) = complex.split_last() else {
            return false;
        };
        if !last.matches(self.node(id)) {
            return false;
        }
        let mut outer = outer.iter().rev().peekable();
        for a in self.ancestors(id) {
            match outer.peek() {
                None => break,
                Some(c) if c.matches(self.node(a)) => {
                    outer.next();
                }
                Some(_) => (),
            }
        }
        outer.peek().is_none()
    }

    fn text(&self, id: NodeId) -> String {
        let mut res = self.node(id).text.clone();
        for (i, n) in self.nodes.iter().enumerate() {
            if n.parent == Some(id) {
                let child = self.text(NodeId(i));
                if !res.is_empty() && !child.is_empty() {
                    res.push(' ');
                }
                res.push_str(&child);
            }
        }
        res
    }

    fn emit(&mut self, event: DomEvent) {
        self.listeners
            .retain(|l| matches!(l.unbounded_send(event), Ok(())));
    }
}

/// In-memory document. Nodes are never removed, only hidden.
#[derive(Debug, Default)]
pub struct MockDom(parking_lot::Mutex<Inner>);

impl MockDom {
    pub fn new(location: &str, title: &str) -> MockDom {
        MockDom(parking_lot::Mutex::new(Inner {
            location: String::from(location),
            title: String::from(title),
            ..Inner::default()
        }))
    }

    /// Visible, not scrollable, no attributes
    pub fn add(&self, parent: Option<NodeId>, tag: &str) -> NodeId {
        let mut inner = self.0.lock();
        inner.nodes.push(Node {
            tag: String::from(tag),
            attrs: BTreeMap::new(),
            text: String::new(),
            visible: true,
            scrollable: false,
            parent,
            shows_on_click: Vec::new(),
            clicks: 0,
            scrolls: 0,
        });
        NodeId(inner.nodes.len() - 1)
    }

    pub fn set_attr(&self, node: NodeId, name: &str, value: &str) {
        self.0.lock().nodes[node.0]
            .attrs
            .insert(String::from(name), String::from(value));
    }

    pub fn set_text(&self, node: NodeId, text: &str) {
        self.0.lock().nodes[node.0].text = String::from(text);
    }

    pub fn set_visible(&self, node: NodeId, visible: bool) {
        self.0.lock().nodes[node.0].visible = visible;
    }

    pub fn set_scrollable(&self, node: NodeId, scrollable: bool) {
        self.0.lock().nodes[node.0].scrollable = scrollable;
    }

    /// Clicking `control`, or anything inside it, makes `target` visible
    pub fn show_on_click(&self, control: NodeId, target: NodeId) {
        self.0.lock().nodes[control.0].shows_on_click.push(target);
    }

    pub fn clicks(&self, node: NodeId) -> usize {
        self.0.lock().node(node).clicks
    }

    pub fn scrolls(&self, node: NodeId) -> usize {
        self.0.lock().node(node).scrolls
    }

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<DomEvent> {
        let (sender, receiver) = mpsc::unbounded();
        self.0.lock().listeners.push(sender);
        receiver
    }
}

impl Dom for MockDom {
    fn query_all(&self, selector: &str) -> Vec<NodeId> {
        let complexes = match selector::parse(selector) {
            Ok(c) => c,
            Err(err) => {
                tracing::warn!(?err, selector, "unsupported selector");
                return Vec::new();
            }
        };
        let inner = self.0.lock();
        (0..inner.nodes.len())
            .map(NodeId)
            .filter(|n| complexes.iter().any(|c| inner.matches(*n, c)))
            .collect()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.0.lock().node(node).parent
    }

    fn text(&self, node: NodeId) -> String {
        self.0.lock().text(node)
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.0.lock().node(node).attr(name).map(String::from)
    }

    fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
        self.set_attr(node, name, value)
    }

    fn is_visible(&self, node: NodeId) -> bool {
        let inner = self.0.lock();
        inner.node(node).visible && inner.ancestors(node).all(|a| inner.node(a).visible)
    }

    fn is_scrollable(&self, node: NodeId) -> bool {
        self.0.lock().node(node).scrollable
    }

    fn click(&self, node: NodeId) {
        let mut inner = self.0.lock();
        inner.nodes[node.0].clicks += 1;
        let targets = std::iter::once(node)
            .chain(inner.ancestors(node))
            .flat_map(|n| inner.node(n).shows_on_click.clone())
            .collect::<Vec<_>>();
        for t in targets {
            inner.nodes[t.0].visible = true;
        }
        inner.emit(DomEvent::Clicked(node));
    }

    fn scroll_to_end(&self, node: NodeId) {
        let mut inner = self.0.lock();
        inner.nodes[node.0].scrolls += 1;
        inner.emit(DomEvent::ScrolledToEnd(node));
    }

    fn location(&self) -> String {
        self.0.lock().location.clone()
    }

    fn title(&self) -> String {
        self.0.lock().title.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descendant_queries_and_visibility() {
        let dom = MockDom::new("https://www.tiktok.com/@a/video/1", "video");
        let main = dom.add(None, "div");
        dom.set_attr(main, "class", "DivCommentMain-x");
        let action = dom.add(Some(main), "div");
        dom.set_attr(action, "class", "DivReplyActionContainer");
        let button = dom.add(Some(action), "button");
        dom.set_text(button, "View 2 replies");
        let stray = dom.add(None, "button");

        let sel = r#"[class*="ReplyAction"] button"#;
        assert_eq!(dom.query_all(sel), vec![button]);
        assert_eq!(dom.query_all("button"), vec![button, stray]);
        assert_eq!(dom.text(action), "View 2 replies");

        dom.set_visible(main, false);
        assert!(!dom.is_visible(button));
        assert!(dom.is_visible(stray));
    }

    #[test]
    fn clicks_bubble_to_show_targets() {
        let dom = MockDom::new("", "");
        let icon = dom.add(None, "div");
        let count = dom.add(Some(icon), "strong");
        let panel = dom.add(None, "div");
        dom.set_visible(panel, false);
        dom.show_on_click(icon, panel);

        let mut events = dom.subscribe();
        dom.click(count);
        assert!(dom.is_visible(panel));
        assert_eq!(dom.clicks(count), 1);
        assert_eq!(events.try_next().expect("event ready"), Some(DomEvent::Clicked(count)));
    }
}

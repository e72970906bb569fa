/// Handle to one element of the page
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct NodeId(pub usize);

/// The subset of the document the driver gets to see and touch.
///
/// Selectors are CSS selectors, matched the way the document matches them, and results
/// come in document order.
pub trait Dom: Send + Sync {
    fn query_all(&self, selector: &str) -> Vec<NodeId>;
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Text content, descendants included
    fn text(&self, node: NodeId) -> String;

    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;
    fn set_attribute(&self, node: NodeId, name: &str, value: &str);

    /// Rendered, taking ancestors into account
    fn is_visible(&self, node: NodeId) -> bool;

    /// Vertical overflow is `scroll` or `auto`
    fn is_scrollable(&self, node: NodeId) -> bool;

    fn click(&self, node: NodeId);
    fn scroll_to_end(&self, node: NodeId);

    fn location(&self) -> String;
    fn title(&self) -> String;
}

//! crates/ub_reader_core/src/markup.rs
//!
//! A small arena tree for paragraph markup (`<em>`, `<span class="..">`, `<br>` and
//! friends). Paragraph text is parsed into it, the highlighter rewrites it, and it is
//! rendered back to a markup string.
//!
//! Nodes are addressed by `NodeId`. Removing a node only detaches it from its
//! parent; ids stay valid for the lifetime of the tree.

use regex::Regex;
use std::sync::OnceLock;

/// Tag name of the synthetic root element; it never appears in rendered output.
const ROOT_TAG: &str = "#root";

const VOID_TAGS: [&str; 4] = ["br", "hr", "img", "wbr"];

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum MarkupError {
    #[error("closing tag </{found}> does not match open <{expected}>")]
    Mismatched { expected: String, found: String },
    #[error("closing tag </{0}> has no matching open tag")]
    UnexpectedClose(String),
    #[error("tag <{0}> is never closed")]
    Unclosed(String),
    #[error("node {0:?} is not a text node")]
    NotText(NodeId),
    #[error("node {0:?} is not attached to the tree")]
    Detached(NodeId),
    #[error("offset {offset} is outside node {node:?} of length {len}")]
    OffsetOutOfRange { node: NodeId, offset: usize, len: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A position inside a text node, counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextPoint {
    pub node: NodeId,
    pub offset: usize,
}

/// A selection between two text points, start before end in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRange {
    pub start: TextPoint,
    pub end: TextPoint,
}

impl TextRange {
    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone)]
pub struct MarkupTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Default for MarkupTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkupTree {
    /// An empty tree holding only the root.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Element {
                    tag: ROOT_TAG.to_string(),
                    attrs: Vec::new(),
                },
                parent: None,
                children: Vec::new(),
            }],
            root: NodeId(0),
        }
    }

    /// Parses inline markup. Text is kept verbatim (entities are not decoded).
    pub fn parse(input: &str) -> Result<Self, MarkupError> {
        let mut tree = Self::new();
        let mut open: Vec<(NodeId, String)> = Vec::new();
        let mut cursor = 0;

        for caps in tag_pattern().captures_iter(input) {
            let Some(whole) = caps.get(0) else { continue };
            if whole.start() > cursor {
                let parent = open.last().map_or(tree.root, |(id, _)| *id);
                let text = tree.create_text(&input[cursor..whole.start()]);
                tree.append_child(parent, text);
            }
            cursor = whole.end();

            let closing = caps.get(1).map_or(false, |m| !m.as_str().is_empty());
            let tag = caps
                .get(2)
                .map_or(String::new(), |m| m.as_str().to_ascii_lowercase());

            if closing {
                match open.pop() {
                    Some((_, expected)) if expected == tag => {}
                    Some((_, expected)) => {
                        return Err(MarkupError::Mismatched {
                            expected,
                            found: tag,
                        })
                    }
                    None => return Err(MarkupError::UnexpectedClose(tag)),
                }
                continue;
            }

            let attrs = caps
                .get(3)
                .map(|m| parse_attrs(m.as_str()))
                .unwrap_or_default();
            let self_closing = caps.get(4).map_or(false, |m| !m.as_str().is_empty());
            let parent = open.last().map_or(tree.root, |(id, _)| *id);
            let element = tree.push(NodeKind::Element {
                tag: tag.clone(),
                attrs,
            });
            tree.append_child(parent, element);
            if !self_closing && !VOID_TAGS.contains(&tag.as_str()) {
                open.push((element, tag));
            }
        }

        if cursor < input.len() {
            let parent = open.last().map_or(tree.root, |(id, _)| *id);
            let text = tree.create_text(&input[cursor..]);
            tree.append_child(parent, text);
        }
        if let Some((_, tag)) = open.pop() {
            return Err(MarkupError::Unclosed(tag));
        }
        Ok(tree)
    }

    /// Renders the root's content back to markup.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for child in self.children(self.root) {
            self.render_into(*child, &mut out);
        }
        out
    }

    /// Renders one node including its own tags.
    pub fn render_node(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.render_into(id, &mut out);
        out
    }

    fn render_into(&self, id: NodeId, out: &mut String) {
        match &self.node(id).kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Element { tag, attrs } => {
                if tag == ROOT_TAG {
                    for child in &self.node(id).children {
                        self.render_into(*child, out);
                    }
                    return;
                }
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    out.push_str(&format!(" {}=\"{}\"", name, value));
                }
                out.push('>');
                if VOID_TAGS.contains(&tag.as_str()) {
                    return;
                }
                for child in &self.node(id).children {
                    self.render_into(*child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }

    //-------------------------------------------------------------------------------------
    // Accessors
    //-------------------------------------------------------------------------------------

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Text(text) => Some(text),
            NodeKind::Element { .. } => None,
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { tag, .. } => Some(tag),
            NodeKind::Text(_) => None,
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeKind::Element { attrs, .. } = &mut self.node_mut(id).kind {
            match attrs.iter_mut().find(|(n, _)| n == name) {
                Some(entry) => entry.1 = value.to_string(),
                None => attrs.push((name.to_string(), value.to_string())),
            }
        }
    }

    pub fn classes(&self, id: NodeId) -> Vec<String> {
        self.attr(id, "class")
            .map(|c| c.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .map_or(false, |c| c.split_whitespace().any(|c| c == class))
    }

    pub fn set_classes(&mut self, id: NodeId, classes: &[String]) {
        self.set_attr(id, "class", &classes.join(" "));
    }

    /// Length of a text node in characters; elements have length 0.
    pub fn char_len(&self, id: NodeId) -> usize {
        self.text(id).map_or(0, |t| t.chars().count())
    }

    /// True when `id` is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.is_descendant(id, self.root)
    }

    /// True when `id` is `ancestor` or lies beneath it.
    pub fn is_descendant(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    //-------------------------------------------------------------------------------------
    // Traversal
    //-------------------------------------------------------------------------------------

    /// Visits `from` and every node beneath it in document order.
    pub fn walk(&self, from: NodeId, visit: &mut impl FnMut(NodeId, &NodeKind)) {
        visit(from, &self.node(from).kind);
        for child in &self.node(from).children {
            self.walk(*child, visit);
        }
    }

    /// Text leaves beneath `from` that satisfy `predicate`, in document order.
    pub fn text_nodes_where(
        &self,
        from: NodeId,
        predicate: impl Fn(&MarkupTree, NodeId) -> bool,
    ) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.walk(from, &mut |id, kind| {
            if matches!(kind, NodeKind::Text(_)) && predicate(self, id) {
                found.push(id);
            }
        });
        found
    }

    pub fn text_nodes(&self, from: NodeId) -> Vec<NodeId> {
        self.text_nodes_where(from, |_, _| true)
    }

    /// Concatenated text beneath `id`, without any markup.
    pub fn text_content(&self, id: NodeId) -> String {
        self.text_nodes(id)
            .into_iter()
            .filter_map(|n| self.text(n))
            .collect()
    }

    //-------------------------------------------------------------------------------------
    // Mutation
    //-------------------------------------------------------------------------------------

    fn push(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        NodeId(self.nodes.len() - 1)
    }

    /// Creates a detached element carrying `classes`.
    pub fn create_element(&mut self, tag: &str, classes: &[String]) -> NodeId {
        let attrs = if classes.is_empty() {
            Vec::new()
        } else {
            vec![("class".to_string(), classes.join(" "))]
        };
        self.push(NodeKind::Element {
            tag: tag.to_string(),
            attrs,
        })
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_string()))
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    /// Removes `id` from its parent. The node and its subtree stay addressable.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.node(id).parent {
            self.node_mut(parent).children.retain(|c| *c != id);
            self.node_mut(id).parent = None;
        }
    }

    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        let children = &mut self.node_mut(parent).children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.node_mut(child).parent = Some(parent);
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let len = self.children(parent).len();
        self.insert_child(parent, len, child);
    }

    /// Puts `replacement` where `id` was and detaches `id`.
    pub fn replace_with(&mut self, id: NodeId, replacement: NodeId) -> Result<(), MarkupError> {
        let parent = self.parent(id).ok_or(MarkupError::Detached(id))?;
        let index = self.index_in_parent(id).ok_or(MarkupError::Detached(id))?;
        self.detach(id);
        self.insert_child(parent, index, replacement);
        Ok(())
    }

    /// Moves an element's children up into its parent and detaches the element.
    pub fn unwrap_element(&mut self, id: NodeId) -> Result<(), MarkupError> {
        let parent = self.parent(id).ok_or(MarkupError::Detached(id))?;
        let mut index = self.index_in_parent(id).ok_or(MarkupError::Detached(id))?;
        for child in self.children(id).to_vec() {
            index += 1;
            self.insert_child(parent, index, child);
        }
        self.detach(id);
        Ok(())
    }

    /// Splits a text node at a character offset strictly inside it. The left part keeps
    /// `id`; the right part becomes a new sibling directly after it and is returned.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> Result<NodeId, MarkupError> {
        let text = self.text(id).ok_or(MarkupError::NotText(id))?.to_string();
        let len = text.chars().count();
        if offset == 0 || offset >= len {
            return Err(MarkupError::OffsetOutOfRange {
                node: id,
                offset,
                len,
            });
        }
        let parent = self.parent(id).ok_or(MarkupError::Detached(id))?;
        let index = self.index_in_parent(id).ok_or(MarkupError::Detached(id))?;

        let split_at = byte_index(&text, offset);
        let (left, right) = text.split_at(split_at);
        self.node_mut(id).kind = NodeKind::Text(left.to_string());
        let right = self.create_text(right);
        self.insert_child(parent, index + 1, right);
        Ok(right)
    }

    /// Merges adjacent text siblings and drops empty text nodes beneath `id`.
    pub fn normalize(&mut self, id: NodeId) {
        let children = self.children(id).to_vec();
        let mut previous_text: Option<NodeId> = None;
        for child in children {
            match self.text(child).map(str::to_string) {
                Some(text) if text.is_empty() => self.detach(child),
                Some(text) => match previous_text {
                    Some(prev) => {
                        if let NodeKind::Text(existing) = &mut self.node_mut(prev).kind {
                            existing.push_str(&text);
                        }
                        self.detach(child);
                    }
                    None => previous_text = Some(child),
                },
                None => {
                    previous_text = None;
                    self.normalize(child);
                }
            }
        }
    }

    //-------------------------------------------------------------------------------------
    // Ranges
    //-------------------------------------------------------------------------------------

    /// Maps character offsets over the text of `container` to a range.
    pub fn range_for_text(&self, container: NodeId, start: usize, end: usize) -> Option<TextRange> {
        if start > end {
            return None;
        }
        let nodes = self.text_nodes(container);
        let mut start_point = None;
        let mut end_point = None;
        let mut position = 0;
        for node in &nodes {
            let len = self.char_len(*node);
            if start_point.is_none() && start >= position && start < position + len {
                start_point = Some(TextPoint {
                    node: *node,
                    offset: start - position,
                });
            }
            if end_point.is_none() && end > position && end <= position + len {
                end_point = Some(TextPoint {
                    node: *node,
                    offset: end - position,
                });
            }
            position += len;
        }

        if start == end {
            // Collapsed: anchor at the end of the text when nothing else matched.
            let point = start_point.or_else(|| {
                let last = *nodes.last()?;
                (start == position).then(|| TextPoint {
                    node: last,
                    offset: self.char_len(last),
                })
            })?;
            return Some(TextRange {
                start: point,
                end: point,
            });
        }
        Some(TextRange {
            start: start_point?,
            end: end_point?,
        })
    }

    /// Character offset of a point within the text of `container`.
    pub fn text_offset(&self, container: NodeId, point: TextPoint) -> Option<usize> {
        let mut position = 0;
        for node in self.text_nodes(container) {
            if node == point.node {
                return (point.offset <= self.char_len(node)).then_some(position + point.offset);
            }
            position += self.char_len(node);
        }
        None
    }

    /// The plain text a range covers.
    pub fn range_text(&self, range: &TextRange) -> Result<String, MarkupError> {
        let nodes = self.text_nodes(self.root);
        let position_of = |point: &TextPoint| -> Result<usize, MarkupError> {
            let index = nodes
                .iter()
                .position(|n| *n == point.node)
                .ok_or(MarkupError::Detached(point.node))?;
            let len = self.char_len(point.node);
            if point.offset > len {
                return Err(MarkupError::OffsetOutOfRange {
                    node: point.node,
                    offset: point.offset,
                    len,
                });
            }
            Ok(index)
        };
        let first = position_of(&range.start)?;
        let last = position_of(&range.end)?;
        if first > last || (first == last && range.start.offset > range.end.offset) {
            return Ok(String::new());
        }

        let mut out = String::new();
        for (index, node) in nodes.iter().enumerate().take(last + 1).skip(first) {
            let text = self.text(*node).unwrap_or_default();
            let from = if index == first { range.start.offset } else { 0 };
            let to = if index == last {
                range.end.offset
            } else {
                self.char_len(*node)
            };
            out.push_str(&text[byte_index(text, from)..byte_index(text, to)]);
        }
        Ok(out)
    }
}

/// Byte position of the `chars`-th character of `s` (or `s.len()` past the end).
fn byte_index(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map_or(s.len(), |(i, _)| i)
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"<(/?)([A-Za-z][A-Za-z0-9]*)((?:\s+[^>]*?)?)\s*(/?)>")
            .expect("tag pattern is valid")
    })
}

fn attr_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
            .expect("attribute pattern is valid")
    })
}

fn parse_attrs(raw: &str) -> Vec<(String, String)> {
    attr_pattern()
        .captures_iter(raw)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str().to_ascii_lowercase();
            let value = caps.get(2).or_else(|| caps.get(3))?.as_str().to_string();
            Some((name, value))
        })
        .collect()
}

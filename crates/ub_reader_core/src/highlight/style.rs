//! Marker class names, the highlight stylesheet, and in-process implementations of the
//! style and visibility capabilities.

use crate::domain::HighlightColor;
use crate::markup::{MarkupTree, NodeId};
use crate::ports::{StyleRegistry, VisibilitySink};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Identifier the highlight stylesheet is registered under.
pub const STYLE_ID: &str = "ub-highlight-styles";

/// Document-level class that suppresses highlight styling while present.
pub const HIDDEN_CLASS: &str = "ub-highlights-hidden";

/// Element used to wrap highlighted text.
pub const MARKER_TAG: &str = "span";

/// Class names identifying highlight markers and their colours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerClasses {
    pub marker: String,
    pub color_prefix: String,
}

impl Default for MarkerClasses {
    fn default() -> Self {
        Self {
            marker: "ub-highlight".to_string(),
            color_prefix: "ub-highlight-".to_string(),
        }
    }
}

impl MarkerClasses {
    pub fn color_class(&self, color: HighlightColor) -> String {
        format!("{}{}", self.color_prefix, color.as_str())
    }

    /// The full class list of a marker of `color`.
    pub fn classes_for(&self, color: HighlightColor) -> Vec<String> {
        vec![self.marker.clone(), self.color_class(color)]
    }

    pub fn is_marker(&self, tree: &MarkupTree, id: NodeId) -> bool {
        tree.has_class(id, &self.marker)
    }

    /// The colour a marker currently carries.
    pub fn color_of(&self, tree: &MarkupTree, id: NodeId) -> Option<HighlightColor> {
        tree.classes(id)
            .iter()
            .filter_map(|c| c.strip_prefix(&self.color_prefix))
            .find_map(|c| c.parse().ok())
    }
}

/// Builds the stylesheet for a palette: one rule per colour, dark-mode variants, and
/// the rule that neutralizes every marker while the hidden class is set.
pub fn stylesheet(classes: &MarkerClasses, palette: &[HighlightColor]) -> String {
    let mut css = String::new();
    css.push_str(&format!(
        ".{} {{ border-radius: 2px; padding: 0 1px; }}\n",
        classes.marker
    ));
    for color in palette.iter().filter(|c| !c.is_none()) {
        css.push_str(&format!(
            ".{} {{ background-color: {}; }}\n",
            classes.color_class(*color),
            color.background(false)
        ));
        css.push_str(&format!(
            ".dark .{} {{ background-color: {}; color: #fff; }}\n",
            classes.color_class(*color),
            color.background(true)
        ));
    }
    css.push_str(&format!(
        ".{} .{} {{ background-color: transparent !important; color: inherit !important; }}\n",
        HIDDEN_CLASS, classes.marker
    ));
    css
}

/// Keeps registered stylesheets in memory, keyed by id.
#[derive(Debug, Default)]
pub struct StyleSheets {
    sheets: Mutex<BTreeMap<String, String>>,
}

impl StyleSheets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<String> {
        self.sheets.lock().ok()?.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.sheets.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StyleRegistry for StyleSheets {
    fn register(&self, id: &str, css: &str) -> bool {
        let Ok(mut sheets) = self.sheets.lock() else {
            return false;
        };
        if sheets.contains_key(id) {
            return false;
        }
        sheets.insert(id.to_string(), css.to_string());
        true
    }
}

/// Remembers the hidden flag; stands in for toggling a class on the document body.
#[derive(Debug, Default)]
pub struct VisibilityFlag {
    hidden: AtomicBool,
}

impl VisibilityFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden.load(Ordering::SeqCst)
    }
}

impl VisibilitySink for VisibilityFlag {
    fn set_hidden(&self, hidden: bool) {
        self.hidden.store(hidden, Ordering::SeqCst);
    }
}

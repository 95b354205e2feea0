//! Applying and removing highlight markers over a text range.
//!
//! A range may start and end inside different elements, so markers are never wrapped
//! around the range as a whole. Instead the boundary text nodes are split and every
//! covered text leaf is handled on its own: wrapped in a fresh marker, or, when its
//! parent already is a marker, given the new colour by restyling that marker.
//! Markers therefore only ever contain text and never nest.

use super::style::{MarkerClasses, MARKER_TAG};
use crate::domain::HighlightColor;
use crate::markup::{MarkupError, MarkupTree, NodeId, TextRange};
use std::collections::HashSet;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum HighlightError {
    #[error("no active selection")]
    NoSelection,
    #[error("invalid range: {0}")]
    InvalidRange(String),
    #[error(transparent)]
    Markup(#[from] MarkupError),
}

/// Marks the text of `range` with `color`. `HighlightColor::None` removes marking instead.
/// Returns the markers that now carry `color`, in document order.
pub fn apply_highlight(
    tree: &mut MarkupTree,
    range: &TextRange,
    color: HighlightColor,
    classes: &MarkerClasses,
) -> Result<Vec<NodeId>, HighlightError> {
    if color.is_none() {
        remove_highlight(tree, range, classes)?;
        return Ok(Vec::new());
    }

    let covered = isolate(tree, range)?;
    let covered_set: HashSet<NodeId> = covered.iter().copied().collect();
    let mut markers = Vec::new();
    let mut colored = Vec::new();

    for node in covered {
        let parent = tree.parent(node).ok_or(MarkupError::Detached(node))?;
        if classes.is_marker(tree, parent) {
            if !markers.contains(&parent) {
                markers.push(parent);
            }
            continue;
        }
        if tree.text(node).map_or(true, |t| t.trim().is_empty()) {
            continue;
        }
        let marker = tree.create_element(MARKER_TAG, &classes.classes_for(color));
        tree.replace_with(node, marker)?;
        tree.append_child(marker, node);
        colored.push(marker);
    }

    for marker in markers {
        colored.extend(restyle_marker(tree, marker, &covered_set, Some(color), classes)?);
    }
    colored.sort_by_key(|id| document_position(tree, *id));
    Ok(colored)
}

/// Strips highlight marking from the text of `range`, leaving uncovered text in any
/// partly covered marker highlighted. Returns how many markers were touched.
pub fn remove_highlight(
    tree: &mut MarkupTree,
    range: &TextRange,
    classes: &MarkerClasses,
) -> Result<usize, HighlightError> {
    let covered = isolate(tree, range)?;
    let covered_set: HashSet<NodeId> = covered.iter().copied().collect();

    let mut markers = Vec::new();
    for node in &covered {
        if let Some(parent) = tree.parent(*node) {
            if classes.is_marker(tree, parent) && !markers.contains(&parent) {
                markers.push(parent);
            }
        }
    }

    let mut containers = Vec::new();
    for marker in &markers {
        let container = tree.parent(*marker).ok_or(MarkupError::Detached(*marker))?;
        restyle_marker(tree, *marker, &covered_set, None, classes)?;
        if !containers.contains(&container) {
            containers.push(container);
        }
    }
    for container in containers {
        tree.normalize(container);
    }
    Ok(markers.len())
}

/// Splits the boundary text nodes so the range starts and ends on node edges, and
/// returns every text node it covers in document order.
fn isolate(tree: &mut MarkupTree, range: &TextRange) -> Result<Vec<NodeId>, HighlightError> {
    let order = tree.text_nodes(tree.root());
    let start_index = order
        .iter()
        .position(|n| *n == range.start.node)
        .ok_or_else(|| HighlightError::InvalidRange("start is not attached text".to_string()))?;
    let end_index = order
        .iter()
        .position(|n| *n == range.end.node)
        .ok_or_else(|| HighlightError::InvalidRange("end is not attached text".to_string()))?;

    let start_len = tree.char_len(range.start.node);
    let end_len = tree.char_len(range.end.node);
    if range.start.offset > start_len || range.end.offset > end_len {
        return Err(HighlightError::InvalidRange(
            "offset past the end of its text".to_string(),
        ));
    }
    if start_index > end_index
        || (start_index == end_index && range.start.offset > range.end.offset)
    {
        return Err(HighlightError::InvalidRange(
            "range ends before it starts".to_string(),
        ));
    }
    if range.is_collapsed() {
        return Ok(Vec::new());
    }

    // End first: the left half keeps the node id, so a start offset in the same node
    // stays valid.
    let (last, last_inclusive) = if range.end.offset == 0 {
        (range.end.node, false)
    } else {
        if range.end.offset < end_len {
            tree.split_text(range.end.node, range.end.offset)?;
        }
        (range.end.node, true)
    };

    let start_len = tree.char_len(range.start.node);
    let (first, first_inclusive) = if range.start.offset == 0 {
        (range.start.node, true)
    } else if range.start.offset >= start_len {
        (range.start.node, false)
    } else {
        (tree.split_text(range.start.node, range.start.offset)?, true)
    };

    let order = tree.text_nodes(tree.root());
    let position = |id: NodeId| order.iter().position(|n| *n == id);
    let (Some(first_at), Some(last_at)) = (position(first), position(last)) else {
        return Err(HighlightError::InvalidRange(
            "boundary lost while splitting".to_string(),
        ));
    };
    let from = if first_inclusive { first_at } else { first_at + 1 };
    let to = if last_inclusive {
        last_at + 1
    } else {
        last_at
    };
    if from >= to {
        return Ok(Vec::new());
    }
    Ok(order[from..to].to_vec())
}

/// Rewrites one marker after some of its text was covered. A fully covered marker is
/// recoloured (or unwrapped when `color` is `None`); a partly covered one is split into
/// runs so only the covered text changes. Returns the markers now carrying `color`.
fn restyle_marker(
    tree: &mut MarkupTree,
    marker: NodeId,
    covered: &HashSet<NodeId>,
    color: Option<HighlightColor>,
    classes: &MarkerClasses,
) -> Result<Vec<NodeId>, HighlightError> {
    let children = tree.children(marker).to_vec();
    if children.iter().all(|c| covered.contains(c)) {
        return match color {
            Some(color) => {
                tree.set_classes(marker, &classes.classes_for(color));
                Ok(vec![marker])
            }
            None => {
                tree.unwrap_element(marker)?;
                Ok(Vec::new())
            }
        };
    }

    let parent = tree.parent(marker).ok_or(MarkupError::Detached(marker))?;
    let mut insert_at = tree.index_in_parent(marker).ok_or(MarkupError::Detached(marker))?;
    let previous_classes = tree.classes(marker);
    let mut recolored = Vec::new();

    let mut runs: Vec<(bool, Vec<NodeId>)> = Vec::new();
    for child in children {
        let is_covered = covered.contains(&child);
        match runs.last_mut() {
            Some((flag, nodes)) if *flag == is_covered => nodes.push(child),
            _ => runs.push((is_covered, vec![child])),
        }
    }

    for (is_covered, nodes) in runs {
        let run_classes = match (is_covered, color) {
            (true, Some(color)) => Some(classes.classes_for(color)),
            (true, None) => None,
            (false, _) => Some(previous_classes.clone()),
        };
        match run_classes {
            Some(run_classes) => {
                let wrapper = tree.create_element(MARKER_TAG, &run_classes);
                tree.insert_child(parent, insert_at, wrapper);
                insert_at += 1;
                for node in nodes {
                    tree.append_child(wrapper, node);
                }
                if is_covered {
                    recolored.push(wrapper);
                }
            }
            None => {
                for node in nodes {
                    tree.insert_child(parent, insert_at, node);
                    insert_at += 1;
                }
            }
        }
    }
    tree.detach(marker);
    Ok(recolored)
}

fn document_position(tree: &MarkupTree, id: NodeId) -> usize {
    let mut position = 0;
    let mut found = None;
    tree.walk(tree.root(), &mut |node, _| {
        if node == id && found.is_none() {
            found = Some(position);
        }
        position += 1;
    });
    found.unwrap_or(usize::MAX)
}

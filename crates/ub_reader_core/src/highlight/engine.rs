//! The selection-driven highlight engine.
//!
//! The engine owns the transient UI state around a text selection: the captured
//! selection, the floating action menu with its colour picker, the auto-dismiss
//! deadline, and the global visibility switch. Input events (pointer-up, context menu,
//! copy) arrive as plain values; the markup tree is passed in by the caller.
//! Durable storage is the caller's job, reached through the `on_highlight` callback.

use super::apply::{apply_highlight, HighlightError};
use super::style::{stylesheet, MarkerClasses, STYLE_ID};
use crate::domain::HighlightColor;
use crate::markup::{MarkupTree, NodeId, TextRange};
use crate::ports::{StyleRegistry, VisibilitySink};
use crate::positioning::{menu_position, pointer_position, Point, Rect, Size};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error};

pub const DEFAULT_MIN_SELECTION_LEN: usize = 3;
pub const DEFAULT_AUTO_DISMISS: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Shortest trimmed selection, in characters, that opens the menu.
    pub min_selection_len: usize,
    pub auto_dismiss: Duration,
    pub palette: Vec<HighlightColor>,
    pub initially_visible: bool,
    pub classes: MarkerClasses,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_selection_len: DEFAULT_MIN_SELECTION_LEN,
            auto_dismiss: DEFAULT_AUTO_DISMISS,
            palette: HighlightColor::PALETTE.to_vec(),
            initially_visible: true,
            classes: MarkerClasses::default(),
        }
    }
}

/// What the UI reports about the live selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionSnapshot {
    pub range: TextRange,
    pub bounds: Rect,
}

/// The selection as captured when the menu opened.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedSelection {
    pub text: String,
    pub range: TextRange,
    /// Character offsets of the range within the container's text.
    pub offsets: Option<(usize, usize)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuAction {
    Highlight,
    Copy,
    Note,
    Quote,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MenuState {
    pub position: Point,
    pub picker_open: bool,
    pub selected_color: Option<HighlightColor>,
    deadline: Option<Instant>,
}

/// Reported to the caller after every successful apply or remove.
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightEvent {
    pub text: String,
    /// `None` when marking was removed.
    pub color: Option<HighlightColor>,
    pub range: TextRange,
    pub offsets: Option<(usize, usize)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    PickerShown,
    /// Plain text to place on the clipboard.
    Copied(String),
    NoteRequested(CapturedSelection),
    QuoteRequested(String),
    Highlighted(HighlightEvent),
    Removed(HighlightEvent),
    /// Nothing to act on; logged.
    Aborted,
    Failed(HighlightError),
    /// The engine is torn down or no menu is open.
    Ignored,
}

pub type HighlightCallback = Box<dyn FnMut(&HighlightEvent) + Send>;
pub type DarkModeQuery = Box<dyn Fn() -> bool + Send + Sync>;

pub struct HighlightEngine {
    config: EngineConfig,
    container: NodeId,
    visibility: Arc<dyn VisibilitySink>,
    dark_mode: DarkModeQuery,
    on_highlight: HighlightCallback,
    selection: Option<CapturedSelection>,
    menu: Option<MenuState>,
    visible: bool,
    attached: bool,
}

impl HighlightEngine {
    /// Attaches the engine to `container`, registers the highlight stylesheet (once per
    /// registry), and applies the initial visibility.
    pub fn initialize(
        config: EngineConfig,
        container: NodeId,
        styles: &dyn StyleRegistry,
        visibility: Arc<dyn VisibilitySink>,
        dark_mode: DarkModeQuery,
        on_highlight: HighlightCallback,
    ) -> Self {
        let css = stylesheet(&config.classes, &config.palette);
        if !styles.register(STYLE_ID, &css) {
            debug!("Highlight stylesheet already registered");
        }
        let visible = config.initially_visible;
        visibility.set_hidden(!visible);
        Self {
            config,
            container,
            visibility,
            dark_mode,
            on_highlight,
            selection: None,
            menu: None,
            visible,
            attached: true,
        }
    }

    pub fn menu(&self) -> Option<&MenuState> {
        self.menu.as_ref()
    }

    pub fn selection(&self) -> Option<&CapturedSelection> {
        self.selection.as_ref()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn palette(&self) -> &[HighlightColor] {
        &self.config.palette
    }

    /// Pointer released. Opens the menu below the selection when it qualifies, otherwise
    /// closes any open menu. Returns whether the menu is showing.
    pub fn pointer_up(
        &mut self,
        tree: &MarkupTree,
        selection: Option<SelectionSnapshot>,
        menu_size: Size,
        viewport: Size,
        now: Instant,
    ) -> bool {
        if !self.attached {
            return false;
        }
        let Some((snapshot, captured)) = selection.and_then(|s| self.capture(tree, s).map(|c| (s, c)))
        else {
            self.dismiss();
            return false;
        };
        let position = menu_position(snapshot.bounds, menu_size, viewport);
        self.show(captured, position, now);
        true
    }

    /// Context menu requested at `pointer`. Opens the menu there when the selection
    /// qualifies. Returns whether the native context menu must be suppressed.
    pub fn context_menu(
        &mut self,
        tree: &MarkupTree,
        selection: Option<SelectionSnapshot>,
        pointer: Point,
        menu_size: Size,
        viewport: Size,
        now: Instant,
    ) -> bool {
        if !self.attached {
            return false;
        }
        let Some(captured) = selection.and_then(|s| self.capture(tree, s)) else {
            self.dismiss();
            return false;
        };
        let position = pointer_position(pointer, menu_size, viewport);
        self.show(captured, position, now);
        true
    }

    fn capture(&self, tree: &MarkupTree, snapshot: SelectionSnapshot) -> Option<CapturedSelection> {
        let range = snapshot.range;
        if range.is_collapsed()
            || !tree.contains(range.start.node)
            || !tree.contains(range.end.node)
            || !tree.is_descendant(range.start.node, self.container)
            || !tree.is_descendant(range.end.node, self.container)
        {
            return None;
        }
        let text = tree.range_text(&range).ok()?;
        if text.trim().chars().count() < self.config.min_selection_len {
            return None;
        }
        let offsets = tree
            .text_offset(self.container, range.start)
            .zip(tree.text_offset(self.container, range.end));
        Some(CapturedSelection {
            text,
            range,
            offsets,
        })
    }

    fn show(&mut self, captured: CapturedSelection, position: Point, now: Instant) {
        debug!(
            "Selection menu shown at ({:.0}, {:.0}) for {} chars",
            position.x,
            position.y,
            captured.text.chars().count()
        );
        self.selection = Some(captured);
        self.menu = Some(MenuState {
            position,
            picker_open: false,
            selected_color: None,
            deadline: Some(now + self.config.auto_dismiss),
        });
    }

    /// Closes the menu and picker and forgets the captured selection.
    pub fn dismiss(&mut self) {
        self.menu = None;
        self.selection = None;
    }

    /// Closes the menu once its deadline passed without any action being taken.
    /// Returns whether it was closed by this call.
    pub fn poll(&mut self, now: Instant) -> bool {
        let expired = self
            .menu
            .as_ref()
            .and_then(|m| m.deadline)
            .map_or(false, |deadline| now >= deadline);
        if expired {
            debug!("Selection menu auto-dismissed");
            self.dismiss();
        }
        expired
    }

    pub fn choose(&mut self, action: MenuAction) -> ActionOutcome {
        if !self.attached || self.menu.is_none() {
            return ActionOutcome::Ignored;
        }
        let Some(selection) = self.selection.clone() else {
            error!("Menu action {:?} chosen without an active selection", action);
            self.dismiss();
            return ActionOutcome::Aborted;
        };
        match action {
            MenuAction::Highlight => {
                if let Some(menu) = self.menu.as_mut() {
                    menu.picker_open = true;
                    menu.deadline = None;
                }
                ActionOutcome::PickerShown
            }
            MenuAction::Copy => {
                self.dismiss();
                ActionOutcome::Copied(selection.text)
            }
            MenuAction::Note => {
                self.dismiss();
                ActionOutcome::NoteRequested(selection)
            }
            MenuAction::Quote => {
                self.dismiss();
                ActionOutcome::QuoteRequested(selection.text)
            }
        }
    }

    /// Selects a colour in the open picker. `None` is always accepted; other colours
    /// must belong to the palette.
    pub fn pick_color(&mut self, color: HighlightColor) -> bool {
        let allowed = color.is_none() || self.config.palette.contains(&color);
        match self.menu.as_mut() {
            Some(menu) if self.attached && menu.picker_open && allowed => {
                menu.selected_color = Some(color);
                true
            }
            _ => false,
        }
    }

    /// Applies the picked colour (or removes marking for `None`) to the captured range.
    pub fn confirm(&mut self, tree: &mut MarkupTree) -> ActionOutcome {
        if !self.attached {
            return ActionOutcome::Ignored;
        }
        let Some(color) = self.menu.as_ref().and_then(|m| m.selected_color) else {
            return ActionOutcome::Ignored;
        };
        let Some(selection) = self.selection.take() else {
            error!("Highlight confirmed without an active range");
            self.dismiss();
            return ActionOutcome::Aborted;
        };
        self.dismiss();

        match apply_highlight(tree, &selection.range, color, &self.config.classes) {
            Ok(_) => {
                let event = HighlightEvent {
                    text: selection.text,
                    color: (!color.is_none()).then_some(color),
                    range: selection.range,
                    offsets: selection.offsets,
                };
                (self.on_highlight)(&event);
                if event.color.is_some() {
                    ActionOutcome::Highlighted(event)
                } else {
                    ActionOutcome::Removed(event)
                }
            }
            Err(e) => {
                error!("Failed to apply highlight: {}", e);
                ActionOutcome::Failed(e)
            }
        }
    }

    /// Shortcut for opening the picker, choosing `color`, and confirming.
    pub fn highlight(&mut self, tree: &mut MarkupTree, color: HighlightColor) -> ActionOutcome {
        match self.choose(MenuAction::Highlight) {
            ActionOutcome::PickerShown => {}
            other => return other,
        }
        if !self.pick_color(color) {
            return ActionOutcome::Ignored;
        }
        self.confirm(tree)
    }

    /// Copy intercepted. In dark mode returns the plain text that replaces the native
    /// payload; otherwise `None` and the native copy proceeds.
    pub fn handle_copy(&self, tree: &MarkupTree, range: &TextRange) -> Option<String> {
        if !self.attached || !(self.dark_mode)() {
            return None;
        }
        tree.range_text(range).ok()
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        self.visibility.set_hidden(!visible);
    }

    /// Flips global highlight visibility and returns the new state.
    pub fn toggle_visibility(&mut self) -> bool {
        self.set_visible(!self.visible);
        self.visible
    }

    /// Detaches the engine; every later event is ignored.
    pub fn teardown(&mut self) {
        self.dismiss();
        self.attached = false;
    }
}

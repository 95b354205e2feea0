//! Text highlighting over a markup tree: the apply/remove algorithms, the marker
//! stylesheet, the selection-menu engine, and the persisted highlight store.

pub mod apply;
pub mod engine;
pub mod store;
pub mod style;

pub use apply::{apply_highlight, remove_highlight, HighlightError};
pub use engine::{
    ActionOutcome, CapturedSelection, EngineConfig, HighlightEngine, HighlightEvent, MenuAction,
    MenuState, SelectionSnapshot,
};
pub use store::{HighlightStore, NewHighlight};
pub use style::{stylesheet, MarkerClasses, StyleSheets, VisibilityFlag, STYLE_ID};

pub mod panels;
pub mod state;
pub mod theme;

pub use panels::{UiActions, ViewStats, draw_side_panel};
pub use state::{StatusKind, UiState};
pub use theme::apply_theme;

//! Client-side board view-model with optimistic drag-and-drop reordering.
//!
//! Local state mutates immediately on drag gestures; the resulting move
//! command is sent to the server asynchronously. On failure the whole board
//! is refetched and applied wholesale; no partial rollback is attempted.

pub mod board_view;

pub use board_view::{
    BoardSnapshot, BoardView, ColumnView, DragTarget, MoveCommand, ReconcileError, TaskCard,
    array_move,
};

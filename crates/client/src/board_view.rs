use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("No drag gesture is active")]
    NoActiveDrag,
    #[error("A drag gesture is already active")]
    DragInProgress,
    #[error("A move request is still settling")]
    Settling,
    #[error("Task not found in local state")]
    UnknownTask,
    #[error("Drop target not found in local state")]
    UnknownTarget,
}

/// Task fields the board view renders. Extra fields in the server payload
/// are ignored on deserialization and survive untouched on the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskCard {
    pub id: Uuid,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnView {
    pub id: Uuid,
    pub title: String,
    pub tasks: Vec<TaskCard>,
}

/// Server board tree as delivered by the board detail endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub id: Uuid,
    pub columns: Vec<ColumnView>,
}

/// The move request produced by a completed drag gesture, to be sent to the
/// server as `moveTask(task_id, column_id, index)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveCommand {
    pub task_id: Uuid,
    pub column_id: Uuid,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragTarget {
    Column(Uuid),
    Task(Uuid),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum DragPhase {
    Idle,
    Dragging { task_id: Uuid },
    Settling { task_id: Uuid },
}

/// `arrayMove` semantics: remove at `from`, insert at `to` (clamped).
pub fn array_move<T>(items: &mut Vec<T>, from: usize, to: usize) {
    if from >= items.len() {
        return;
    }
    let item = items.remove(from);
    let to = to.min(items.len());
    items.insert(to, item);
}

/// One board's local state plus the per-gesture drag state machine:
/// `idle -> dragging -> dropped -> settling -> idle`. Only one gesture is
/// active at a time.
#[derive(Debug, Clone)]
pub struct BoardView {
    board_id: Uuid,
    columns: Vec<ColumnView>,
    phase: DragPhase,
}

impl BoardView {
    pub fn from_snapshot(snapshot: BoardSnapshot) -> Self {
        Self {
            board_id: snapshot.id,
            columns: snapshot.columns,
            phase: DragPhase::Idle,
        }
    }

    pub fn board_id(&self) -> Uuid {
        self.board_id
    }

    pub fn columns(&self) -> &[ColumnView] {
        &self.columns
    }

    /// Replaces local state wholesale with fresh server state. Used on
    /// initial load and as the full-resync fallback after a failed move.
    pub fn apply_snapshot(&mut self, snapshot: BoardSnapshot) {
        self.board_id = snapshot.id;
        self.columns = snapshot.columns;
        self.phase = DragPhase::Idle;
    }

    fn locate(&self, task_id: Uuid) -> Option<(usize, usize)> {
        self.columns.iter().enumerate().find_map(|(col_idx, col)| {
            col.tasks
                .iter()
                .position(|task| task.id == task_id)
                .map(|task_idx| (col_idx, task_idx))
        })
    }

    fn column_index(&self, column_id: Uuid) -> Option<usize> {
        self.columns.iter().position(|col| col.id == column_id)
    }

    pub fn drag_start(&mut self, task_id: Uuid) -> Result<(), ReconcileError> {
        match self.phase {
            DragPhase::Idle => {}
            DragPhase::Dragging { .. } => return Err(ReconcileError::DragInProgress),
            DragPhase::Settling { .. } => return Err(ReconcileError::Settling),
        }

        if self.locate(task_id).is_none() {
            return Err(ReconcileError::UnknownTask);
        }

        self.phase = DragPhase::Dragging { task_id };
        Ok(())
    }

    /// Hovering over a different column speculatively moves the task there
    /// (appended at the end) so the UI previews the result. Hovering within
    /// the current column is a no-op until drop.
    pub fn drag_over(&mut self, target: DragTarget) -> Result<(), ReconcileError> {
        let DragPhase::Dragging { task_id } = self.phase else {
            return Err(ReconcileError::NoActiveDrag);
        };

        let (src_col, src_idx) = self.locate(task_id).ok_or(ReconcileError::UnknownTask)?;

        let dst_col = match target {
            DragTarget::Column(column_id) => self
                .column_index(column_id)
                .ok_or(ReconcileError::UnknownTarget)?,
            DragTarget::Task(other_id) => {
                if other_id == task_id {
                    return Ok(());
                }
                self.locate(other_id).ok_or(ReconcileError::UnknownTarget)?.0
            }
        };

        if dst_col == src_col {
            return Ok(());
        }

        let task = self.columns[src_col].tasks.remove(src_idx);
        self.columns[dst_col].tasks.push(task);
        Ok(())
    }

    /// Completes the gesture: applies the final local reordering and returns
    /// the move command to send to the server.
    pub fn drop_on(&mut self, target: DragTarget) -> Result<MoveCommand, ReconcileError> {
        let DragPhase::Dragging { task_id } = self.phase else {
            return Err(ReconcileError::NoActiveDrag);
        };

        let (src_col, src_idx) = self.locate(task_id).ok_or(ReconcileError::UnknownTask)?;

        let (dst_col, final_idx) = match target {
            DragTarget::Task(other_id) if other_id == task_id => (src_col, src_idx),
            DragTarget::Task(other_id) => {
                let (target_col, target_idx) =
                    self.locate(other_id).ok_or(ReconcileError::UnknownTarget)?;
                if target_col == src_col {
                    array_move(&mut self.columns[src_col].tasks, src_idx, target_idx);
                    (src_col, target_idx)
                } else {
                    let task = self.columns[src_col].tasks.remove(src_idx);
                    let insert_at = target_idx.min(self.columns[target_col].tasks.len());
                    self.columns[target_col].tasks.insert(insert_at, task);
                    (target_col, insert_at)
                }
            }
            DragTarget::Column(column_id) => {
                let target_col = self
                    .column_index(column_id)
                    .ok_or(ReconcileError::UnknownTarget)?;
                if target_col == src_col {
                    let last = self.columns[src_col].tasks.len() - 1;
                    array_move(&mut self.columns[src_col].tasks, src_idx, last);
                    (src_col, last)
                } else {
                    let task = self.columns[src_col].tasks.remove(src_idx);
                    self.columns[target_col].tasks.push(task);
                    let last = self.columns[target_col].tasks.len() - 1;
                    (target_col, last)
                }
            }
        };

        self.phase = DragPhase::Settling { task_id };
        Ok(MoveCommand {
            task_id,
            column_id: self.columns[dst_col].id,
            index: final_idx,
        })
    }

    /// The move request succeeded; the optimistic state is authoritative
    /// enough to keep. The response body is discarded by design.
    pub fn settle_success(&mut self) -> Result<(), ReconcileError> {
        match self.phase {
            DragPhase::Settling { .. } => {
                self.phase = DragPhase::Idle;
                Ok(())
            }
            _ => Err(ReconcileError::NoActiveDrag),
        }
    }

    /// The move request failed. Local optimistic state is no longer
    /// trustworthy: the caller must refetch the board and call
    /// [`BoardView::apply_snapshot`]. No partial rollback is attempted.
    #[must_use = "a failed settle requires a full board refetch"]
    pub fn settle_failure(&mut self) -> bool {
        let was_settling = matches!(self.phase, DragPhase::Settling { .. });
        self.phase = DragPhase::Idle;
        was_settling
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(title: &str) -> TaskCard {
        TaskCard {
            id: Uuid::new_v4(),
            title: title.to_string(),
        }
    }

    fn snapshot() -> BoardSnapshot {
        BoardSnapshot {
            id: Uuid::new_v4(),
            columns: vec![
                ColumnView {
                    id: Uuid::new_v4(),
                    title: "Todo".to_string(),
                    tasks: vec![task("A"), task("B"), task("C")],
                },
                ColumnView {
                    id: Uuid::new_v4(),
                    title: "Done".to_string(),
                    tasks: vec![task("D")],
                },
            ],
        }
    }

    fn titles(view: &BoardView, col: usize) -> Vec<&str> {
        view.columns()[col]
            .tasks
            .iter()
            .map(|t| t.title.as_str())
            .collect()
    }

    #[test]
    fn array_move_removes_then_inserts() {
        let mut items = vec!["a", "b", "c", "d"];
        array_move(&mut items, 1, 3);
        assert_eq!(items, vec!["a", "c", "d", "b"]);

        array_move(&mut items, 3, 0);
        assert_eq!(items, vec!["b", "a", "c", "d"]);

        // Out-of-range source is a no-op; target is clamped.
        array_move(&mut items, 9, 0);
        assert_eq!(items, vec!["b", "a", "c", "d"]);
        array_move(&mut items, 0, 9);
        assert_eq!(items, vec!["a", "c", "d", "b"]);
    }

    #[test]
    fn within_column_drop_on_task_uses_target_index() {
        let mut view = BoardView::from_snapshot(snapshot());
        let b = view.columns()[0].tasks[1].id;
        let a = view.columns()[0].tasks[0].id;
        let todo = view.columns()[0].id;

        view.drag_start(b).unwrap();
        let command = view.drop_on(DragTarget::Task(a)).unwrap();

        assert_eq!(command, MoveCommand {
            task_id: b,
            column_id: todo,
            index: 0,
        });
        assert_eq!(titles(&view, 0), vec!["B", "A", "C"]);
    }

    #[test]
    fn cross_column_hover_moves_speculatively() {
        let mut view = BoardView::from_snapshot(snapshot());
        let b = view.columns()[0].tasks[1].id;
        let done = view.columns()[1].id;

        view.drag_start(b).unwrap();
        view.drag_over(DragTarget::Column(done)).unwrap();

        // Speculative: removed from source, appended to the hovered column.
        assert_eq!(titles(&view, 0), vec!["A", "C"]);
        assert_eq!(titles(&view, 1), vec!["D", "B"]);

        // Hovering the column the task is now in is a no-op.
        view.drag_over(DragTarget::Column(done)).unwrap();
        assert_eq!(titles(&view, 1), vec!["D", "B"]);

        let command = view.drop_on(DragTarget::Column(done)).unwrap();
        assert_eq!(command.column_id, done);
        assert_eq!(command.index, 1);
    }

    #[test]
    fn cross_column_drop_on_task_inserts_at_its_index() {
        let mut view = BoardView::from_snapshot(snapshot());
        let a = view.columns()[0].tasks[0].id;
        let d = view.columns()[1].tasks[0].id;
        let done = view.columns()[1].id;

        view.drag_start(a).unwrap();
        let command = view.drop_on(DragTarget::Task(d)).unwrap();

        assert_eq!(command.column_id, done);
        assert_eq!(command.index, 0);
        assert_eq!(titles(&view, 0), vec!["B", "C"]);
        assert_eq!(titles(&view, 1), vec!["A", "D"]);
    }

    #[test]
    fn only_one_gesture_at_a_time() {
        let mut view = BoardView::from_snapshot(snapshot());
        let a = view.columns()[0].tasks[0].id;
        let b = view.columns()[0].tasks[1].id;

        view.drag_start(a).unwrap();
        assert_eq!(view.drag_start(b), Err(ReconcileError::DragInProgress));

        let _command = view.drop_on(DragTarget::Task(b)).unwrap();
        // Settling: no new drag until the request resolves.
        assert_eq!(view.drag_start(b), Err(ReconcileError::Settling));

        view.settle_success().unwrap();
        view.drag_start(b).unwrap();
    }

    #[test]
    fn gestures_require_known_ids_and_active_state() {
        let mut view = BoardView::from_snapshot(snapshot());
        let a = view.columns()[0].tasks[0].id;

        assert_eq!(
            view.drag_start(Uuid::new_v4()),
            Err(ReconcileError::UnknownTask)
        );
        assert_eq!(
            view.drop_on(DragTarget::Task(a)),
            Err(ReconcileError::NoActiveDrag)
        );
        assert_eq!(
            view.drag_over(DragTarget::Task(a)),
            Err(ReconcileError::NoActiveDrag)
        );

        view.drag_start(a).unwrap();
        assert_eq!(
            view.drag_over(DragTarget::Column(Uuid::new_v4())),
            Err(ReconcileError::UnknownTarget)
        );
    }

    #[test]
    fn failed_settle_resets_and_applies_fresh_snapshot() {
        let server_state = snapshot();
        let mut view = BoardView::from_snapshot(server_state.clone());
        let a = view.columns()[0].tasks[0].id;
        let done = view.columns()[1].id;

        view.drag_start(a).unwrap();
        view.drag_over(DragTarget::Column(done)).unwrap();
        let _command = view.drop_on(DragTarget::Column(done)).unwrap();

        // Request failed: optimistic state is discarded by a full reload.
        assert!(view.settle_failure());
        view.apply_snapshot(server_state);

        assert_eq!(titles(&view, 0), vec!["A", "B", "C"]);
        assert_eq!(titles(&view, 1), vec!["D"]);

        // Back to idle: a new gesture may start.
        let a_again = view.columns()[0].tasks[0].id;
        view.drag_start(a_again).unwrap();
    }

    #[test]
    fn snapshot_deserializes_from_server_board_tree() {
        // The server serializes a richer tree; unknown fields are ignored.
        let json = serde_json::json!({
            "id": Uuid::new_v4(),
            "workspace_id": Uuid::new_v4(),
            "name": "Sprint1",
            "columns": [{
                "id": Uuid::new_v4(),
                "board_id": Uuid::new_v4(),
                "title": "Todo",
                "order": 0,
                "tasks": [{
                    "id": Uuid::new_v4(),
                    "title": "A",
                    "priority": "low",
                    "order": 0,
                    "labels": []
                }]
            }]
        });

        let snapshot: BoardSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(snapshot.columns.len(), 1);
        assert_eq!(snapshot.columns[0].tasks[0].title, "A");
    }
}

use std::collections::HashMap;

use crate::board::{Board, MoveRequest, PositionChange, TaskStatus};
use crate::error::Result;
use crate::task::{BoardView, TaskRecord};

/// Direction of a keyboard move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shift {
    Left,
    Right,
    Up,
    Down,
}

/// Client-side board: columns of task records plus the cursor.
#[derive(Debug, Clone)]
pub struct BoardModel {
    pub workspace_id: String,
    pub workspace_name: String,
    pub columns: Vec<(TaskStatus, Vec<TaskRecord>)>,
    pub focus: usize,
    pub rows: Vec<usize>,
}

impl BoardModel {
    pub fn from_view(view: BoardView) -> Self {
        let columns: Vec<(TaskStatus, Vec<TaskRecord>)> = view
            .columns
            .into_iter()
            .map(|column| (column.status, column.tasks))
            .collect();
        let rows = vec![0; columns.len()];
        Self {
            workspace_id: view.workspace_id,
            workspace_name: view.workspace_name,
            columns,
            focus: 0,
            rows,
        }
    }

    /// Swap in freshly loaded data, keeping the cursor on the same card.
    pub fn replace(&mut self, view: BoardView) {
        let selected = self.selected().map(|task| task.id.clone());
        let focus = self.focus;
        *self = Self::from_view(view);
        self.focus = focus.min(self.columns.len().saturating_sub(1));
        if let Some(id) = selected {
            self.select_id(&id);
        }
    }

    pub fn task_count(&self) -> usize {
        self.columns.iter().map(|(_, tasks)| tasks.len()).sum()
    }

    pub fn focused_status(&self) -> Option<TaskStatus> {
        self.columns.get(self.focus).map(|(status, _)| *status)
    }

    pub fn selected(&self) -> Option<&TaskRecord> {
        let (_, tasks) = self.columns.get(self.focus)?;
        tasks.get(self.rows[self.focus])
    }

    pub fn select_id(&mut self, id: &str) -> bool {
        for (col, (_, tasks)) in self.columns.iter().enumerate() {
            if let Some(row) = tasks.iter().position(|task| task.id == id) {
                self.focus = col;
                self.rows[col] = row;
                return true;
            }
        }
        false
    }

    pub fn focus_column(&mut self, delta: isize) {
        if self.columns.is_empty() {
            return;
        }
        let last = self.columns.len() as isize - 1;
        self.focus = (self.focus as isize + delta).clamp(0, last) as usize;
    }

    pub fn select_row(&mut self, delta: isize) {
        let Some((_, tasks)) = self.columns.get(self.focus) else {
            return;
        };
        if tasks.is_empty() {
            self.rows[self.focus] = 0;
            return;
        }
        let last = tasks.len() as isize - 1;
        let row = (self.rows[self.focus] as isize + delta).clamp(0, last);
        self.rows[self.focus] = row as usize;
    }

    /// The move a key would request for the selected card, if any.
    pub fn plan_shift(&self, shift: Shift) -> Option<MoveRequest> {
        let task = self.selected()?;
        let row = self.rows[self.focus];
        let status = task.status;
        let (to, index) = match shift {
            Shift::Left => (status.prev()?, row),
            Shift::Right => (status.next()?, row),
            Shift::Up => (status, row.checked_sub(1)?),
            Shift::Down => {
                let len = self.columns[self.focus].1.len();
                if row + 1 >= len {
                    return None;
                }
                (status, row + 1)
            }
        };
        Some(MoveRequest {
            task_id: task.id.clone(),
            to,
            index,
        })
    }

    fn board(&self) -> Board {
        Board::from_cards(
            self.columns
                .iter()
                .flat_map(|(_, tasks)| tasks.iter().map(TaskRecord::card)),
        )
    }

    /// Apply a move locally and return the planned diff. The cursor follows
    /// the moved card.
    pub fn apply_move(&mut self, request: &MoveRequest) -> Result<Vec<PositionChange>> {
        let changes = self.board().plan_move(request)?;
        self.apply_changes(&changes);
        self.select_id(&request.task_id);
        Ok(changes)
    }

    /// Reorder records to match `changes`, the same way the board does.
    pub fn apply_changes(&mut self, changes: &[PositionChange]) {
        let mut board = self.board();
        board.apply_changes(changes);

        let mut records: HashMap<String, TaskRecord> = self
            .columns
            .iter_mut()
            .flat_map(|(_, tasks)| tasks.drain(..))
            .map(|task| (task.id.clone(), task))
            .collect();
        for (status, tasks) in self.columns.iter_mut() {
            for card in board.column(*status) {
                if let Some(mut task) = records.remove(&card.id) {
                    task.status = card.status;
                    task.position = card.position;
                    tasks.push(task);
                }
            }
        }
        for (col, (_, tasks)) in self.columns.iter().enumerate() {
            self.rows[col] = self.rows[col].min(tasks.len().saturating_sub(1));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::BoardColumn;
    use chrono::Utc;

    fn record(id: &str, status: TaskStatus, position: u32) -> TaskRecord {
        let now = Utc::now();
        TaskRecord {
            id: id.to_string(),
            workspace_id: "ws-1".to_string(),
            project_id: None,
            title: id.to_string(),
            description: None,
            status,
            position,
            assignee: None,
            due_date: None,
            created_at: now,
            updated_at: now,
            created_by: None,
            updated_by: None,
            comments_count: 0,
            last_comment_at: None,
        }
    }

    fn model(cards: &[(&str, TaskStatus, u32)]) -> BoardModel {
        let columns = TaskStatus::ALL
            .iter()
            .map(|status| BoardColumn {
                status: *status,
                title: status.title().to_string(),
                tasks: cards
                    .iter()
                    .filter(|(_, s, _)| s == status)
                    .map(|(id, s, p)| record(id, *s, *p))
                    .collect(),
            })
            .collect();
        BoardModel::from_view(BoardView {
            workspace_id: "ws-1".to_string(),
            workspace_name: "Ops".to_string(),
            project_id: None,
            columns,
        })
    }

    fn ids(model: &BoardModel, status: TaskStatus) -> Vec<&str> {
        model
            .columns
            .iter()
            .find(|(s, _)| *s == status)
            .map(|(_, tasks)| tasks.iter().map(|t| t.id.as_str()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn shift_down_reorders_and_cursor_follows() {
        let mut m = model(&[
            ("a", TaskStatus::Backlog, 1000),
            ("b", TaskStatus::Backlog, 2000),
        ]);
        let request = m.plan_shift(Shift::Down).unwrap();
        let changes = m.apply_move(&request).unwrap();
        assert_eq!(ids(&m, TaskStatus::Backlog), vec!["b", "a"]);
        assert_eq!(changes.len(), 2);
        assert_eq!(m.selected().unwrap().id, "a");
        assert!(m.plan_shift(Shift::Down).is_none());
    }

    #[test]
    fn shift_right_moves_to_next_column() {
        let mut m = model(&[
            ("a", TaskStatus::Backlog, 1000),
            ("b", TaskStatus::Todo, 1000),
        ]);
        let request = m.plan_shift(Shift::Right).unwrap();
        assert_eq!(request.to, TaskStatus::Todo);
        m.apply_move(&request).unwrap();
        assert_eq!(ids(&m, TaskStatus::Todo), vec!["a", "b"]);
        assert!(ids(&m, TaskStatus::Backlog).is_empty());
        assert_eq!(m.focused_status(), Some(TaskStatus::Todo));
    }

    #[test]
    fn no_shift_past_board_edges() {
        let m = model(&[("a", TaskStatus::Backlog, 1000)]);
        assert!(m.plan_shift(Shift::Left).is_none());
        assert!(m.plan_shift(Shift::Up).is_none());
    }

    #[test]
    fn replace_keeps_selection_by_id() {
        let mut m = model(&[
            ("a", TaskStatus::Todo, 1000),
            ("b", TaskStatus::Todo, 2000),
        ]);
        m.select_id("b");
        let mut fresh = model(&[
            ("b", TaskStatus::Done, 1000),
            ("a", TaskStatus::Todo, 1000),
        ]);
        fresh.focus = 0;
        let view = BoardView {
            workspace_id: fresh.workspace_id.clone(),
            workspace_name: fresh.workspace_name.clone(),
            project_id: None,
            columns: fresh
                .columns
                .drain(..)
                .map(|(status, tasks)| BoardColumn {
                    status,
                    title: status.title().to_string(),
                    tasks,
                })
                .collect(),
        };
        m.replace(view);
        assert_eq!(m.focused_status(), Some(TaskStatus::Done));
        assert_eq!(m.selected().unwrap().id, "b");
    }
}

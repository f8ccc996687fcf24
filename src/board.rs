//! Kanban columns and position planning.
//!
//! A board is the set of tasks of one workspace grouped by [`TaskStatus`].
//! Inside a column, cards are ordered by `position`; after any move planned
//! here every touched column is renumbered to the stepped form
//! `min((index + 1) * POSITION_STEP, POSITION_CEILING)`, so positions in a
//! column are strictly increasing and never exceed the ceiling.
//!
//! Planning is pure: [`Board::plan_move`] returns the minimal list of
//! [`PositionChange`]s (only cards whose status or position changed). The
//! task store persists such a list as one batch, see
//! [`crate::task::TaskStore::apply_batch`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Distance between consecutive slots in a renumbered column.
pub const POSITION_STEP: u32 = 1000;

/// Largest position a card may hold.
pub const POSITION_CEILING: u32 = 1_000_000;

/// Cards that fit in a column before stepped slots hit the ceiling.
pub const MAX_COLUMN_LEN: usize = (POSITION_CEILING / POSITION_STEP) as usize;

/// Board columns, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Backlog,
    Todo,
    InProgress,
    InReview,
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::Backlog,
        TaskStatus::Todo,
        TaskStatus::InProgress,
        TaskStatus::InReview,
        TaskStatus::Done,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Backlog => "backlog",
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::InReview => "in_review",
            Self::Done => "done",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Backlog => "Backlog",
            Self::Todo => "To do",
            Self::InProgress => "In progress",
            Self::InReview => "In review",
            Self::Done => "Done",
        }
    }

    /// Column to the left, if any.
    pub fn prev(&self) -> Option<TaskStatus> {
        let idx = self.index();
        idx.checked_sub(1).map(|i| Self::ALL[i])
    }

    /// Column to the right, if any.
    pub fn next(&self) -> Option<TaskStatus> {
        Self::ALL.get(self.index() + 1).copied()
    }

    pub fn index(&self) -> usize {
        Self::ALL
            .iter()
            .position(|status| status == self)
            .unwrap_or(0)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "backlog" => Ok(Self::Backlog),
            "todo" => Ok(Self::Todo),
            "in_progress" => Ok(Self::InProgress),
            "in_review" => Ok(Self::InReview),
            "done" => Ok(Self::Done),
            _ => Err(format!(
                "invalid status '{}' (expected backlog|todo|in_progress|in_review|done)",
                s.trim()
            )),
        }
    }
}

/// Parse a status for user-facing input.
pub fn parse_status(raw: &str) -> Result<TaskStatus> {
    raw.parse().map_err(Error::InvalidArgument)
}

/// Position of the card at `index` in a renumbered column.
pub fn slot_position(index: usize) -> u32 {
    let slot = (index as u64 + 1) * POSITION_STEP as u64;
    slot.min(POSITION_CEILING as u64) as u32
}

/// The ordering-relevant part of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardCard {
    pub id: String,
    pub status: TaskStatus,
    pub position: u32,
}

/// One entry of a batch update: the new status and position of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionChange {
    pub id: String,
    pub status: TaskStatus,
    pub position: u32,
}

/// Move a card to `index` of column `to`. The index is clamped to the
/// destination length (after the card is taken out of its source column).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub task_id: String,
    pub to: TaskStatus,
    pub index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board {
    columns: BTreeMap<TaskStatus, Vec<BoardCard>>,
}

impl Board {
    /// Group cards into columns ordered by `(position, id)`.
    pub fn from_cards(cards: impl IntoIterator<Item = BoardCard>) -> Self {
        let mut columns: BTreeMap<TaskStatus, Vec<BoardCard>> =
            TaskStatus::ALL.iter().map(|s| (*s, Vec::new())).collect();
        for card in cards {
            columns.entry(card.status).or_default().push(card);
        }
        for column in columns.values_mut() {
            sort_column(column);
        }
        Self { columns }
    }

    pub fn column(&self, status: TaskStatus) -> &[BoardCard] {
        self.columns
            .get(&status)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.columns.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Column and index of a card.
    pub fn locate(&self, id: &str) -> Option<(TaskStatus, usize)> {
        self.columns.iter().find_map(|(status, column)| {
            column
                .iter()
                .position(|card| card.id == id)
                .map(|idx| (*status, idx))
        })
    }

    pub fn card(&self, id: &str) -> Option<&BoardCard> {
        self.locate(id)
            .map(|(status, idx)| &self.columns[&status][idx])
    }

    /// Plan a move without mutating the board.
    pub fn plan_move(&self, request: &MoveRequest) -> Result<Vec<PositionChange>> {
        let mut scratch = self.clone();
        scratch.move_card(request)
    }

    /// Move a card, renumber the touched columns and return the diff.
    pub fn move_card(&mut self, request: &MoveRequest) -> Result<Vec<PositionChange>> {
        let (from, from_idx) = self
            .locate(&request.task_id)
            .ok_or_else(|| Error::TaskNotFound(request.task_id.clone()))?;
        let to = request.to;

        if from != to && self.column(to).len() >= MAX_COLUMN_LEN {
            return Err(Error::ColumnFull {
                status: to.to_string(),
                limit: MAX_COLUMN_LEN,
            });
        }

        let before = self.positions_of(&[from, to]);

        let mut card = self.column_mut(from).remove(from_idx);
        card.status = to;
        let dest = self.column_mut(to);
        let index = request.index.min(dest.len());
        dest.insert(index, card);

        renumber(self.column_mut(to));
        if from != to {
            renumber(self.column_mut(from));
        }

        let mut touched = vec![to];
        if from != to {
            touched.push(from);
        }
        Ok(self.diff_against(&before, &touched))
    }

    /// Position for a new card appended to `status`, plus any changes needed
    /// to make room. The new card's own entry is included in the changes.
    pub fn append_card(&mut self, id: &str, status: TaskStatus) -> Result<Vec<PositionChange>> {
        if self.locate(id).is_some() {
            return Err(Error::InvalidArgument(format!("task already on board: {id}")));
        }
        let column = self.column_mut(status);
        if column.len() >= MAX_COLUMN_LEN {
            return Err(Error::ColumnFull {
                status: status.to_string(),
                limit: MAX_COLUMN_LEN,
            });
        }

        let candidate = column
            .last()
            .map(|last| last.position as u64 + POSITION_STEP as u64)
            .unwrap_or(POSITION_STEP as u64);

        if candidate <= POSITION_CEILING as u64 {
            let card = BoardCard {
                id: id.to_string(),
                status,
                position: candidate as u32,
            };
            column.push(card);
            return Ok(vec![PositionChange {
                id: id.to_string(),
                status,
                position: candidate as u32,
            }]);
        }

        // Gaps pushed the tail to the ceiling: compact the column first.
        let before = self.positions_of(&[status]);
        let column = self.column_mut(status);
        column.push(BoardCard {
            id: id.to_string(),
            status,
            position: 0,
        });
        renumber(column);
        Ok(self.diff_against(&before, &[status]))
    }

    /// Next free append slot of a column, without reserving it.
    pub fn next_position(&self, status: TaskStatus) -> Result<u32> {
        let mut scratch = self.clone();
        let probe = "\u{0}probe";
        let changes = scratch.append_card(probe, status)?;
        changes
            .into_iter()
            .find(|change| change.id == probe)
            .map(|change| change.position)
            .ok_or_else(|| Error::OperationFailed("append slot not planned".to_string()))
    }

    /// Apply already-planned changes (optimistic client update).
    pub fn apply_changes(&mut self, changes: &[PositionChange]) {
        let mut touched = Vec::new();
        for change in changes {
            if let Some((status, idx)) = self.locate(&change.id) {
                let mut card = self.column_mut(status).remove(idx);
                card.status = change.status;
                card.position = change.position;
                self.column_mut(change.status).push(card);
                touched.push(status);
                touched.push(change.status);
            }
        }
        touched.sort();
        touched.dedup();
        for status in touched {
            sort_column(self.column_mut(status));
        }
    }

    /// Remove a card, leaving a gap in its column.
    pub fn remove_card(&mut self, id: &str) -> Option<BoardCard> {
        let (status, idx) = self.locate(id)?;
        Some(self.column_mut(status).remove(idx))
    }

    /// First duplicate or out-of-range position among `statuses`.
    pub fn first_violation(&self, statuses: &[TaskStatus]) -> Option<(TaskStatus, u32)> {
        for status in statuses {
            let column = self.column(*status);
            for card in column {
                if card.position == 0 || card.position > POSITION_CEILING {
                    return Some((*status, card.position));
                }
            }
            for pair in column.windows(2) {
                if pair[0].position >= pair[1].position {
                    return Some((*status, pair[1].position));
                }
            }
        }
        None
    }

    /// Every column strictly increasing and within the ceiling.
    pub fn is_ordered(&self) -> bool {
        self.first_violation(&TaskStatus::ALL).is_none()
    }

    fn column_mut(&mut self, status: TaskStatus) -> &mut Vec<BoardCard> {
        self.columns.entry(status).or_default()
    }

    fn positions_of(&self, statuses: &[TaskStatus]) -> HashMap<String, (TaskStatus, u32)> {
        statuses
            .iter()
            .flat_map(|status| self.column(*status))
            .map(|card| (card.id.clone(), (card.status, card.position)))
            .collect()
    }

    fn diff_against(
        &self,
        before: &HashMap<String, (TaskStatus, u32)>,
        statuses: &[TaskStatus],
    ) -> Vec<PositionChange> {
        statuses
            .iter()
            .flat_map(|status| self.column(*status))
            .filter(|card| before.get(&card.id) != Some(&(card.status, card.position)))
            .map(|card| PositionChange {
                id: card.id.clone(),
                status: card.status,
                position: card.position,
            })
            .collect()
    }
}

fn sort_column(column: &mut [BoardCard]) {
    column.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.id.cmp(&b.id)));
}

fn renumber(column: &mut [BoardCard]) {
    for (idx, card) in column.iter_mut().enumerate() {
        card.position = slot_position(idx);
    }
}

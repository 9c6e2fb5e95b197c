//! Note list state: ordered snapshot plus selection set.
//!
//! # Responsibility
//! - Hold the notes currently displayed and which of them are selected.
//! - Translate store results and row gestures into minimal update
//!   instructions for the rendering layer.
//!
//! # Invariants
//! - Selected ids are always a subset of the snapshot's ids.
//! - Removing a note drops it from the selection; a full load clears it.
//! - Every mutation either fully applies or leaves state untouched.
//! - A persisted id appears at most once in the snapshot.
//! - Notes inserted or upserted locally surface at index 0 until the next
//!   full `load` or `submit`.
//!
//! Selection refresh contract: `toggle_selection` reports only the rows
//! whose visual state changed, never the whole visible range.

use crate::model::note::{Note, NoteId};
use log::debug;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// View update emitted after a state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateInstruction {
    /// Whole list replaced; re-render all `len` rows.
    FullReplace { len: usize },
    Inserted { index: usize },
    /// Row content changed in place.
    Changed { index: usize },
    Removed { index: usize },
    /// Only the selected/normal styling of the row changed.
    SelectionChanged { index: usize },
}

/// What the caller should do in response to a row gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    OpenNote(NoteId),
    ToggleSelection(NoteId),
    /// First phase of a two-phase delete: the caller deletes from the store
    /// and reports back through [`NoteListController::apply_delete_outcome`].
    RequestDelete { id: NoteId, index: usize },
}

/// Visual state of one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowState {
    Normal,
    Selected,
}

/// Why the storage half of a delete did not take effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteFailure {
    /// The store reported zero affected rows.
    NoRowsAffected,
    /// The store returned an error; carries its display text.
    Storage(String),
}

/// Result of the storage phase of a two-phase delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Success { id: NoteId, index: usize },
    Failed { id: NoteId, reason: DeleteFailure },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListError {
    IndexOutOfRange { index: usize, len: usize },
}

impl Display for ListError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IndexOutOfRange { index, len } => {
                write!(f, "index {index} out of range for list of length {len}")
            }
        }
    }
}

impl Error for ListError {}

/// Selection and ordering state for one list screen.
#[derive(Debug, Default)]
pub struct NoteListController {
    notes: Vec<Note>,
    selected: BTreeSet<NoteId>,
}

impl NoteListController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole snapshot and clears the selection.
    pub fn load(&mut self, notes: Vec<Note>) -> Vec<UpdateInstruction> {
        self.notes = notes;
        self.selected.clear();
        debug!(
            "event=list_load module=list status=ok len={}",
            self.notes.len()
        );
        vec![UpdateInstruction::FullReplace {
            len: self.notes.len(),
        }]
    }

    /// Reconciles the snapshot with `notes`, diffing by id.
    ///
    /// Instructions apply in order: removals bottom-up, then inserts and
    /// in-place changes top-down. A row is `Changed` only when its title or
    /// content differs. When surviving rows were reordered the diff falls
    /// back to a single `FullReplace`. Selection keeps the ids that are
    /// still present.
    pub fn submit(&mut self, notes: Vec<Note>) -> Vec<UpdateInstruction> {
        let incoming: HashSet<NoteId> = notes.iter().map(|note| note.id).collect();
        self.selected.retain(|id| incoming.contains(id));

        let retained_ids: Vec<NoteId> = self
            .notes
            .iter()
            .map(|note| note.id)
            .filter(|id| incoming.contains(id))
            .collect();
        let previous: HashMap<NoteId, &Note> =
            self.notes.iter().map(|note| (note.id, note)).collect();
        let incoming_order: Vec<NoteId> = notes
            .iter()
            .map(|note| note.id)
            .filter(|id| previous.contains_key(id))
            .collect();

        let instructions = if retained_ids == incoming_order {
            let mut instructions: Vec<UpdateInstruction> = (0..self.notes.len())
                .rev()
                .filter(|index| !incoming.contains(&self.notes[*index].id))
                .map(|index| UpdateInstruction::Removed { index })
                .collect();
            for (index, note) in notes.iter().enumerate() {
                match previous.get(&note.id) {
                    None => instructions.push(UpdateInstruction::Inserted { index }),
                    Some(old) if !old.same_contents(note) => {
                        instructions.push(UpdateInstruction::Changed { index })
                    }
                    Some(_) => {}
                }
            }
            instructions
        } else {
            vec![UpdateInstruction::FullReplace { len: notes.len() }]
        };

        self.notes = notes;
        debug!(
            "event=list_submit module=list status=ok len={} instructions={}",
            self.notes.len(),
            instructions.len()
        );
        instructions
    }

    /// Puts `note` at index 0.
    ///
    /// A note whose id is already listed is moved to the top rather than
    /// duplicated; its selection state is kept.
    pub fn insert_at_top(&mut self, note: Note) -> Vec<UpdateInstruction> {
        let mut instructions = Vec::with_capacity(2);
        if note.is_persisted() {
            if let Some(index) = self.index_of(note.id) {
                self.notes.remove(index);
                instructions.push(UpdateInstruction::Removed { index });
            }
        }
        self.notes.insert(0, note);
        instructions.push(UpdateInstruction::Inserted { index: 0 });
        instructions
    }

    /// Replaces the note with the same id in place, or prepends it.
    pub fn upsert_by_id(&mut self, note: Note) -> (usize, UpdateInstruction) {
        match self.index_of(note.id) {
            Some(index) => {
                self.notes[index] = note;
                (index, UpdateInstruction::Changed { index })
            }
            None => {
                self.notes.insert(0, note);
                (0, UpdateInstruction::Inserted { index: 0 })
            }
        }
    }

    /// Removes the note at `index` and drops it from the selection.
    pub fn remove_at(&mut self, index: usize) -> Result<UpdateInstruction, ListError> {
        if index >= self.notes.len() {
            return Err(ListError::IndexOutOfRange {
                index,
                len: self.notes.len(),
            });
        }
        let removed = self.notes.remove(index);
        self.selected.remove(&removed.id);
        Ok(UpdateInstruction::Removed { index })
    }

    /// Flips selection of `id` and reports rows whose styling changed.
    ///
    /// Ids not present in the snapshot are ignored.
    pub fn toggle_selection(&mut self, id: NoteId) -> Vec<UpdateInstruction> {
        let Some(index) = self.index_of(id) else {
            return Vec::new();
        };
        if !self.selected.remove(&id) {
            self.selected.insert(id);
        }
        vec![UpdateInstruction::SelectionChanged { index }]
    }

    /// Tap opens the note unless a selection is active.
    pub fn on_row_tap(&self, id: NoteId) -> RowAction {
        if self.in_selection_mode() {
            RowAction::ToggleSelection(id)
        } else {
            RowAction::OpenNote(id)
        }
    }

    pub fn on_row_long_press(&self, id: NoteId) -> RowAction {
        RowAction::ToggleSelection(id)
    }

    pub fn on_delete_icon_tap(&self, id: NoteId, index: usize) -> RowAction {
        RowAction::RequestDelete { id, index }
    }

    /// Second phase of a two-phase delete.
    ///
    /// On success the row is removed; when the list moved since the request
    /// the note is located by id instead. A note that is already gone
    /// yields `Ok(None)`. Failures leave the list untouched.
    pub fn apply_delete_outcome(
        &mut self,
        outcome: &DeleteOutcome,
    ) -> Result<Option<UpdateInstruction>, ListError> {
        match outcome {
            DeleteOutcome::Success { id, index } => {
                let target = match self.notes.get(*index) {
                    Some(note) if note.id == *id => Some(*index),
                    _ => self.index_of(*id),
                };
                match target {
                    Some(index) => self.remove_at(index).map(Some),
                    None => Ok(None),
                }
            }
            DeleteOutcome::Failed { .. } => Ok(None),
        }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Note> {
        self.notes.get(index)
    }

    pub fn index_of(&self, id: NoteId) -> Option<usize> {
        self.notes.iter().position(|note| note.id == id)
    }

    pub fn is_selected(&self, id: NoteId) -> bool {
        self.selected.contains(&id)
    }

    pub fn row_state(&self, id: NoteId) -> RowState {
        if self.is_selected(id) {
            RowState::Selected
        } else {
            RowState::Normal
        }
    }

    /// Selected ids in ascending order.
    pub fn selected_ids(&self) -> Vec<NoteId> {
        self.selected.iter().copied().collect()
    }

    pub fn in_selection_mode(&self) -> bool {
        !self.selected.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{
        DeleteFailure, DeleteOutcome, ListError, NoteListController, RowAction, RowState,
        UpdateInstruction,
    };
    use crate::model::note::Note;

    fn note(id: i64, created_at: i64) -> Note {
        Note {
            id,
            title: Some(format!("title {id}")),
            content: format!("content {id}"),
            created_at,
        }
    }

    fn loaded(ids: &[i64]) -> NoteListController {
        let mut controller = NoteListController::new();
        let notes = ids
            .iter()
            .enumerate()
            .map(|(pos, id)| note(*id, 1000 - pos as i64))
            .collect();
        controller.load(notes);
        controller
    }

    fn ids(controller: &NoteListController) -> Vec<i64> {
        controller.notes().iter().map(|n| n.id).collect()
    }

    #[test]
    fn load_replaces_snapshot_and_clears_selection() {
        let mut controller = loaded(&[1, 2]);
        controller.toggle_selection(1);

        let instructions = controller.load(vec![note(3, 5)]);
        assert_eq!(instructions, vec![UpdateInstruction::FullReplace { len: 1 }]);
        assert_eq!(ids(&controller), vec![3]);
        assert!(!controller.in_selection_mode());
    }

    #[test]
    fn upsert_existing_id_changes_in_place() {
        let mut controller = loaded(&[1, 2]);
        let updated = Note {
            id: 2,
            title: Some("X".to_string()),
            content: "Y".to_string(),
            created_at: 999,
        };

        let (index, instruction) = controller.upsert_by_id(updated.clone());
        assert_eq!(index, 1);
        assert_eq!(instruction, UpdateInstruction::Changed { index: 1 });
        assert_eq!(ids(&controller), vec![1, 2]);
        assert_eq!(controller.get(1), Some(&updated));
    }

    #[test]
    fn upsert_unknown_id_prepends() {
        let mut controller = loaded(&[1, 2]);
        let (index, instruction) = controller.upsert_by_id(note(7, 1));
        assert_eq!(index, 0);
        assert_eq!(instruction, UpdateInstruction::Inserted { index: 0 });
        assert_eq!(ids(&controller), vec![7, 1, 2]);
    }

    #[test]
    fn insert_at_top_ignores_created_at_order() {
        let mut controller = loaded(&[1, 2]);
        assert_eq!(
            controller.insert_at_top(note(3, 0)),
            vec![UpdateInstruction::Inserted { index: 0 }]
        );
        assert_eq!(ids(&controller), vec![3, 1, 2]);
    }

    #[test]
    fn insert_at_top_moves_listed_id_instead_of_duplicating() {
        let mut controller = loaded(&[1, 2]);
        controller.toggle_selection(2);

        let mut revised = note(2, 1);
        revised.content = "revised".to_string();
        assert_eq!(
            controller.insert_at_top(revised),
            vec![
                UpdateInstruction::Removed { index: 1 },
                UpdateInstruction::Inserted { index: 0 },
            ]
        );
        assert_eq!(ids(&controller), vec![2, 1]);
        assert_eq!(controller.get(0).unwrap().content, "revised");
        assert_eq!(controller.selected_ids(), vec![2]);

        assert_eq!(
            controller.toggle_selection(2),
            vec![UpdateInstruction::SelectionChanged { index: 0 }]
        );
        assert!(!controller.in_selection_mode());
    }

    #[test]
    fn submit_reports_only_the_row_whose_contents_changed() {
        let mut controller = loaded(&[1, 2]);
        let mut refreshed = controller.notes().to_vec();
        refreshed[1].content = "edited elsewhere".to_string();

        assert_eq!(
            controller.submit(refreshed.clone()),
            vec![UpdateInstruction::Changed { index: 1 }]
        );
        assert_eq!(controller.notes(), &refreshed[..]);
        assert!(controller.submit(refreshed).is_empty());
    }

    #[test]
    fn submit_emits_removals_then_inserts_and_keeps_surviving_selection() {
        let mut controller = loaded(&[1, 2, 3]);
        controller.toggle_selection(1);
        controller.toggle_selection(2);

        let next = vec![note(4, 2000), note(1, 1000), note(3, 998)];
        assert_eq!(
            controller.submit(next),
            vec![
                UpdateInstruction::Removed { index: 1 },
                UpdateInstruction::Inserted { index: 0 },
            ]
        );
        assert_eq!(ids(&controller), vec![4, 1, 3]);
        assert_eq!(controller.selected_ids(), vec![1]);
    }

    #[test]
    fn submit_falls_back_to_full_replace_on_reorder() {
        let mut controller = loaded(&[1, 2]);
        controller.toggle_selection(2);

        assert_eq!(
            controller.submit(vec![note(2, 5), note(1, 4)]),
            vec![UpdateInstruction::FullReplace { len: 2 }]
        );
        assert_eq!(ids(&controller), vec![2, 1]);
        assert_eq!(controller.selected_ids(), vec![2]);
    }

    #[test]
    fn remove_at_drops_note_and_its_selection() {
        let mut controller = loaded(&[1, 2]);
        controller.toggle_selection(1);
        controller.toggle_selection(2);

        assert_eq!(
            controller.remove_at(0),
            Ok(UpdateInstruction::Removed { index: 0 })
        );
        assert_eq!(ids(&controller), vec![2]);
        assert_eq!(controller.selected_ids(), vec![2]);
    }

    #[test]
    fn remove_at_out_of_range_leaves_state_untouched() {
        let mut controller = loaded(&[1, 2]);
        controller.toggle_selection(2);

        assert_eq!(
            controller.remove_at(2),
            Err(ListError::IndexOutOfRange { index: 2, len: 2 })
        );
        assert_eq!(ids(&controller), vec![1, 2]);
        assert_eq!(controller.selected_ids(), vec![2]);
    }

    #[test]
    fn toggle_reports_exactly_the_toggled_row() {
        let mut controller = loaded(&[1, 2, 3, 4]);
        assert_eq!(
            controller.toggle_selection(3),
            vec![UpdateInstruction::SelectionChanged { index: 2 }]
        );
        assert_eq!(
            controller.toggle_selection(1),
            vec![UpdateInstruction::SelectionChanged { index: 0 }]
        );
        assert_eq!(
            controller.toggle_selection(3),
            vec![UpdateInstruction::SelectionChanged { index: 2 }]
        );
        assert_eq!(controller.selected_ids(), vec![1]);
    }

    #[test]
    fn double_toggle_restores_row_state() {
        let mut controller = loaded(&[1, 2]);
        assert_eq!(controller.row_state(2), RowState::Normal);
        controller.toggle_selection(2);
        assert_eq!(controller.row_state(2), RowState::Selected);
        controller.toggle_selection(2);
        assert_eq!(controller.row_state(2), RowState::Normal);
        assert!(!controller.in_selection_mode());
    }

    #[test]
    fn toggle_of_unknown_id_selects_nothing() {
        let mut controller = loaded(&[1]);
        assert!(controller.toggle_selection(99).is_empty());
        assert!(controller.selected_ids().is_empty());
    }

    #[test]
    fn tap_opens_until_a_long_press_starts_selection() {
        let mut controller = loaded(&[1, 2]);
        assert_eq!(controller.on_row_tap(1), RowAction::OpenNote(1));
        assert_eq!(controller.on_row_long_press(1), RowAction::ToggleSelection(1));
        controller.toggle_selection(1);

        assert_eq!(controller.on_row_tap(2), RowAction::ToggleSelection(2));
        controller.toggle_selection(1);
        assert_eq!(controller.on_row_tap(2), RowAction::OpenNote(2));
    }

    #[test]
    fn delete_icon_requests_two_phase_delete() {
        let controller = loaded(&[1, 2]);
        assert_eq!(
            controller.on_delete_icon_tap(2, 1),
            RowAction::RequestDelete { id: 2, index: 1 }
        );
        assert_eq!(controller.len(), 2);
    }

    #[test]
    fn delete_outcome_success_removes_and_failure_keeps() {
        let mut controller = loaded(&[1, 2, 3]);
        let failed = DeleteOutcome::Failed {
            id: 2,
            reason: DeleteFailure::NoRowsAffected,
        };
        assert_eq!(controller.apply_delete_outcome(&failed), Ok(None));
        assert_eq!(controller.len(), 3);

        let success = DeleteOutcome::Success { id: 2, index: 1 };
        assert_eq!(
            controller.apply_delete_outcome(&success),
            Ok(Some(UpdateInstruction::Removed { index: 1 }))
        );
        assert_eq!(ids(&controller), vec![1, 3]);
    }

    #[test]
    fn delete_outcome_follows_note_when_list_shifted() {
        let mut controller = loaded(&[1, 2]);
        controller.upsert_by_id(note(5, 0));

        let stale = DeleteOutcome::Success { id: 2, index: 1 };
        assert_eq!(
            controller.apply_delete_outcome(&stale),
            Ok(Some(UpdateInstruction::Removed { index: 2 }))
        );
        assert_eq!(ids(&controller), vec![5, 1]);

        assert_eq!(controller.apply_delete_outcome(&stale), Ok(None));
    }
}

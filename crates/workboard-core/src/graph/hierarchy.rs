//! Parent-child containment queries and progress roll-up.
//!
//! These functions read a [`WorkBoard`] to answer hierarchy questions:
//!
//! - What is an item's progress (done/total direct children)?
//! - What is its nested progress (rolling up through the whole subtree)?
//! - What is the full subtree of a given item?
//! - What are the ancestors of a given item?
//! - Would a proposed link close a cycle?
//!
//! # Terminology
//!
//! - **Root**: an item whose `parent_id` is empty.
//! - **Leaf**: an item with no children.
//! - **Progress**: the ratio of done children to total children. Nested
//!   progress counts leaf items only; intermediate items contribute their
//!   own children instead of themselves.
//!
//! # Cycles
//!
//! Links are allowed to form cycles unless the board rejects them, so every
//! traversal here keeps a visited set and stops at the first repeat.

use std::collections::{HashSet, VecDeque};
use std::fmt;

use crate::error::BoardError;
use crate::model::board::WorkBoard;
use crate::model::item::{ItemId, Status, WorkItem};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// How many items under a node are done vs total.
///
/// A child is **done** when its status is `done`, in progress when it is
/// `in_progress`. `to_do` children count only toward `total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HierarchyProgress {
    pub done: u32,
    pub in_progress: u32,
    pub total: u32,
}

impl HierarchyProgress {
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            done: 0,
            in_progress: 0,
            total: 0,
        }
    }

    /// Percentage of work completed, in the range `0.0..=100.0`.
    ///
    /// Returns `100.0` if total is 0 (vacuously complete).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent_complete(&self) -> f32 {
        if self.total == 0 {
            return 100.0;
        }
        (self.done as f32 / self.total as f32) * 100.0
    }

    /// Returns `true` if all children are done (or there are no children).
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.total == 0 || self.done == self.total
    }

    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.total.saturating_sub(self.done)
    }

    fn tally(&mut self, item: &WorkItem) {
        self.total += 1;
        match item.status() {
            Status::Done => self.done += 1,
            Status::InProgress => self.in_progress += 1,
            Status::ToDo => {}
        }
    }
}

impl fmt::Display for HierarchyProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} ({:.0}%)",
            self.done,
            self.total,
            self.percent_complete()
        )
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress over the **direct** children of `id`.
///
/// # Errors
///
/// Returns [`BoardError::NotFound`] if `id` is not on the board, or
/// [`BoardError::DanglingReference`] if a child does not resolve.
pub fn direct_progress(board: &WorkBoard, id: ItemId) -> Result<HierarchyProgress, BoardError> {
    let mut progress = HierarchyProgress::zero();
    for child in board.get_children(id)? {
        progress.tally(child);
    }
    Ok(progress)
}

/// Progress over every **leaf** in the subtree under `id`.
///
/// For a hierarchy like:
/// ```text
/// Epic A
///   ├── Task X (done)
///   ├── Feature B
///   │   ├── Task Y (done)
///   │   └── Task Z (to_do)
///   └── Task W (in_progress)
/// ```
///
/// the nested progress for Epic A is `done=2, in_progress=1, total=4`.
/// Feature B is not counted itself, only its children.
///
/// # Errors
///
/// Same as [`direct_progress`].
pub fn nested_progress(board: &WorkBoard, id: ItemId) -> Result<HierarchyProgress, BoardError> {
    board.get_work_item(id)?;

    let mut progress = HierarchyProgress::zero();
    let mut visited = HashSet::new();
    accumulate_progress(board, id, &mut progress, &mut visited)?;
    Ok(progress)
}

fn accumulate_progress(
    board: &WorkBoard,
    current_id: ItemId,
    accumulator: &mut HierarchyProgress,
    visited: &mut HashSet<ItemId>,
) -> Result<(), BoardError> {
    if !visited.insert(current_id) {
        return Ok(());
    }

    for child in board.get_children(current_id)? {
        if child.children_ids().is_empty() {
            accumulator.tally(child);
        } else {
            accumulate_progress(board, child.id(), accumulator, visited)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Traversal
// ---------------------------------------------------------------------------

/// All item ids in the subtree rooted at `root_id`, including the root,
/// in BFS order (root first).
///
/// Ids that do not resolve are skipped.
///
/// # Errors
///
/// Returns [`BoardError::NotFound`] if `root_id` is not on the board.
pub fn subtree_ids(board: &WorkBoard, root_id: ItemId) -> Result<Vec<ItemId>, BoardError> {
    board.get_work_item(root_id)?;

    let mut visited: HashSet<ItemId> = HashSet::new();
    let mut queue: VecDeque<ItemId> = VecDeque::new();
    let mut result: Vec<ItemId> = Vec::new();

    queue.push_back(root_id);

    while let Some(current_id) = queue.pop_front() {
        if !visited.insert(current_id) {
            continue;
        }
        let Some(current) = board.find_work_item(current_id) else {
            continue;
        };
        result.push(current_id);

        queue.extend(
            current
                .children_ids()
                .iter()
                .filter(|child_id| !visited.contains(*child_id)),
        );
    }

    Ok(result)
}

/// The ancestor chain of `item_id`, immediate parent first, root last.
///
/// The chain stops at a repeat (cycle) or at a parent id that does not
/// resolve.
///
/// # Errors
///
/// Returns [`BoardError::NotFound`] if `item_id` is not on the board.
pub fn ancestors(board: &WorkBoard, item_id: ItemId) -> Result<Vec<&WorkItem>, BoardError> {
    board.get_work_item(item_id)?;
    Ok(ancestor_ids(board, item_id)
        .into_iter()
        .filter_map(|id| board.find_work_item(id))
        .collect())
}

/// Ids along the parent chain of `item_id`, immediate parent first.
///
/// Empty if the item is absent or has no parent.
#[must_use]
pub fn ancestor_ids(board: &WorkBoard, item_id: ItemId) -> Vec<ItemId> {
    let mut chain = Vec::new();
    let mut visited = HashSet::from([item_id]);
    let mut current = board.find_work_item(item_id).and_then(WorkItem::parent_id);

    while let Some(parent_id) = current {
        if !visited.insert(parent_id) {
            break;
        }
        let Some(parent) = board.find_work_item(parent_id) else {
            break;
        };
        chain.push(parent_id);
        current = parent.parent_id();
    }

    chain
}

/// Whether making `child_id` a child of `parent_id` would close a cycle,
/// i.e. the child is the parent itself or one of its ancestors.
#[must_use]
pub fn would_create_cycle(board: &WorkBoard, parent_id: ItemId, child_id: ItemId) -> bool {
    parent_id == child_id || ancestor_ids(board, parent_id).contains(&child_id)
}

/// Items with no parent.
#[must_use]
pub fn roots(board: &WorkBoard) -> Vec<&WorkItem> {
    board
        .iter()
        .filter(|item| item.parent_id().is_none())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BoardConfig, CyclePolicy};
    use crate::model::board::WorkItemUpdate;
    use crate::model::item::ItemType;
    use uuid::Uuid;

    fn test_board() -> WorkBoard {
        WorkBoard::new("Roadmap", "Quarterly roadmap").expect("valid board")
    }

    fn insert_item(
        board: &mut WorkBoard,
        item_type: ItemType,
        status: Status,
        parent_id: Option<ItemId>,
    ) -> ItemId {
        let item = WorkItem::new(item_type, format!("{item_type} item"), "details")
            .expect("valid item");
        let id = board.add_work_item(item).expect("add item").id();
        board
            .update_work_item(id, WorkItemUpdate::default().status(status))
            .expect("set status");
        if let Some(parent_id) = parent_id {
            board.link_parent_and_child(parent_id, id).expect("link");
        }
        id
    }

    // -----------------------------------------------------------------------
    // HierarchyProgress
    // -----------------------------------------------------------------------

    #[test]
    fn progress_zero_total_is_complete() {
        let p = HierarchyProgress::zero();
        assert_eq!(p.percent_complete(), 100.0);
        assert!(p.is_complete());
        assert_eq!(p.remaining(), 0);
    }

    #[test]
    fn progress_display() {
        let p = HierarchyProgress {
            done: 2,
            in_progress: 1,
            total: 4,
        };
        assert_eq!(p.to_string(), "2/4 (50%)");
        assert_eq!(p.remaining(), 2);
        assert!(!p.is_complete());
    }

    // -----------------------------------------------------------------------
    // direct_progress / nested_progress
    // -----------------------------------------------------------------------

    #[test]
    fn direct_progress_mixed_states() {
        let mut board = test_board();
        let story = insert_item(&mut board, ItemType::Story, Status::ToDo, None);
        insert_item(&mut board, ItemType::Task, Status::Done, Some(story));
        insert_item(&mut board, ItemType::Task, Status::InProgress, Some(story));
        insert_item(&mut board, ItemType::Task, Status::ToDo, Some(story));

        let p = direct_progress(&board, story).unwrap();
        assert_eq!(
            p,
            HierarchyProgress {
                done: 1,
                in_progress: 1,
                total: 3
            }
        );
    }

    #[test]
    fn direct_progress_not_found() {
        let board = test_board();
        let missing = Uuid::new_v4();
        assert_eq!(
            direct_progress(&board, missing).unwrap_err(),
            BoardError::NotFound { id: missing }
        );
    }

    #[test]
    fn nested_progress_rolls_up_through_intermediate_items() {
        let mut board = test_board();
        let epic = insert_item(&mut board, ItemType::Epic, Status::ToDo, None);
        insert_item(&mut board, ItemType::Task, Status::Done, Some(epic));
        let feature = insert_item(&mut board, ItemType::Feature, Status::ToDo, Some(epic));
        insert_item(&mut board, ItemType::Task, Status::Done, Some(feature));
        insert_item(&mut board, ItemType::Task, Status::ToDo, Some(feature));
        insert_item(&mut board, ItemType::Task, Status::InProgress, Some(epic));

        let p = nested_progress(&board, epic).unwrap();
        assert_eq!(p.done, 2);
        assert_eq!(p.in_progress, 1);
        assert_eq!(p.total, 4);
    }

    #[test]
    fn nested_progress_survives_cycles() {
        let mut board = test_board();
        let a = insert_item(&mut board, ItemType::Epic, Status::ToDo, None);
        let b = insert_item(&mut board, ItemType::Feature, Status::ToDo, Some(a));
        board.link_parent_and_child(b, a).expect("warn policy links");

        let p = nested_progress(&board, a).unwrap();
        assert_eq!(p.total, 0);
    }

    // -----------------------------------------------------------------------
    // subtree_ids / ancestors / roots
    // -----------------------------------------------------------------------

    #[test]
    fn subtree_bfs_order_root_first() {
        let mut board = test_board();
        let root = insert_item(&mut board, ItemType::Epic, Status::ToDo, None);
        let f1 = insert_item(&mut board, ItemType::Feature, Status::ToDo, Some(root));
        let f2 = insert_item(&mut board, ItemType::Feature, Status::ToDo, Some(root));
        let t1 = insert_item(&mut board, ItemType::Task, Status::ToDo, Some(f1));

        assert_eq!(subtree_ids(&board, root).unwrap(), vec![root, f1, f2, t1]);
        assert_eq!(subtree_ids(&board, t1).unwrap(), vec![t1]);
    }

    #[test]
    fn ancestors_three_levels() {
        let mut board = test_board();
        let epic = insert_item(&mut board, ItemType::Epic, Status::ToDo, None);
        let feature = insert_item(&mut board, ItemType::Feature, Status::ToDo, Some(epic));
        let story = insert_item(&mut board, ItemType::Story, Status::ToDo, Some(feature));
        let task = insert_item(&mut board, ItemType::Task, Status::ToDo, Some(story));

        let chain: Vec<ItemId> = ancestors(&board, task)
            .unwrap()
            .into_iter()
            .map(WorkItem::id)
            .collect();
        assert_eq!(chain, vec![story, feature, epic]);
        assert!(ancestors(&board, epic).unwrap().is_empty());
        assert!(ancestors(&board, Uuid::new_v4()).is_err());
    }

    #[test]
    fn roots_are_items_without_parent() {
        let mut board = test_board();
        let a = insert_item(&mut board, ItemType::Epic, Status::ToDo, None);
        insert_item(&mut board, ItemType::Task, Status::ToDo, Some(a));
        let b = insert_item(&mut board, ItemType::Epic, Status::ToDo, None);

        let mut found: Vec<ItemId> = roots(&board).into_iter().map(WorkItem::id).collect();
        found.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(found, expected);
    }

    // -----------------------------------------------------------------------
    // would_create_cycle
    // -----------------------------------------------------------------------

    #[test]
    fn cycle_detection_direct_indirect_and_self() {
        let mut board = test_board();
        let a = insert_item(&mut board, ItemType::Epic, Status::ToDo, None);
        let b = insert_item(&mut board, ItemType::Feature, Status::ToDo, Some(a));
        let c = insert_item(&mut board, ItemType::Story, Status::ToDo, Some(b));

        assert!(would_create_cycle(&board, b, a));
        assert!(would_create_cycle(&board, c, a));
        assert!(would_create_cycle(&board, a, a));
        assert!(!would_create_cycle(&board, a, c));
    }

    #[test]
    fn moving_to_a_sibling_subtree_is_not_a_cycle() {
        let config = BoardConfig {
            links: crate::config::LinkConfig {
                cycles: CyclePolicy::Reject,
            },
            ..BoardConfig::default()
        };
        let mut board = WorkBoard::with_config("Roadmap", "Quarterly roadmap", &config).unwrap();
        let root = insert_item(&mut board, ItemType::Epic, Status::ToDo, None);
        let left = insert_item(&mut board, ItemType::Feature, Status::ToDo, Some(root));
        let right = insert_item(&mut board, ItemType::Feature, Status::ToDo, Some(root));
        let task = insert_item(&mut board, ItemType::Task, Status::ToDo, Some(left));

        assert!(!would_create_cycle(&board, right, task));
        board.link_parent_and_child(right, task).unwrap();
        assert_eq!(ancestor_ids(&board, task), vec![right, root]);
    }
}

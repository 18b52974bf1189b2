use std::fmt;

use serde::Serialize;
use workboard_core::verify::check_links;
use workboard_core::{ItemId, Status, WorkBoard};

use crate::ops::{BoardOp, Outcome};

// ── Core result types ─────────────────────────────────────────────────────────

/// Oracle result for an invariant check.
///
/// Returned by each checker and by [`BoardOracle::check_step`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OracleResult {
    /// `true` iff no violations were found.
    pub passed: bool,
    /// Detailed description of every invariant that was violated.
    pub violations: Vec<InvariantViolation>,
}

impl OracleResult {
    /// Construct a passing result.
    #[must_use]
    pub const fn pass() -> Self {
        Self {
            passed: true,
            violations: Vec::new(),
        }
    }

    /// Construct a failing result from one or more violations.
    #[must_use]
    pub fn fail(violations: Vec<InvariantViolation>) -> Self {
        if violations.is_empty() {
            return Self::pass();
        }
        Self {
            passed: false,
            violations,
        }
    }

    /// Merge another result into this one (failures accumulate).
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        if !other.passed {
            self.passed = false;
            self.violations.extend(other.violations);
        }
        self
    }
}

// ── Invariant violation diagnostics ──────────────────────────────────────────

/// Diagnostic information for a single failed invariant check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// The board's links are no longer symmetric, or a reference dangles.
    ///
    /// Emitted by `check_link_integrity`.
    Link {
        step: usize,
        /// Rendered [`workboard_core::verify::LinkViolation`].
        detail: String,
    },

    /// A rejected operation still changed the board.
    ///
    /// Emitted by `check_rejection_is_clean`.
    PartialMutation {
        step: usize,
        op: &'static str,
        code: String,
    },

    /// Deleting an item removed one of its children along with it.
    ///
    /// Emitted by `check_delete_orphans`.
    DeleteCascaded {
        step: usize,
        deleted: ItemId,
        child: ItemId,
    },

    /// Something still references an item after it was deleted.
    ///
    /// Emitted by `check_delete_orphans`.
    DeleteLeftReference {
        step: usize,
        deleted: ItemId,
        holder: ItemId,
    },

    /// The deleted item is still on the board.
    ///
    /// Emitted by `check_delete_orphans`.
    DeletedStillPresent { step: usize, id: ItemId },

    /// The item count moved by something other than the operation's effect.
    ///
    /// Emitted by `check_item_count`.
    ItemCountDrift {
        step: usize,
        expected: usize,
        actual: usize,
    },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Link { step, detail } => write!(f, "Link: step {step}: {detail}"),
            Self::PartialMutation { step, op, code } => write!(
                f,
                "PartialMutation: step {step}: rejected {op} ({code}) changed the board"
            ),
            Self::DeleteCascaded {
                step,
                deleted,
                child,
            } => write!(
                f,
                "DeleteCascaded: step {step}: deleting {deleted} removed child {child}"
            ),
            Self::DeleteLeftReference {
                step,
                deleted,
                holder,
            } => write!(
                f,
                "DeleteLeftReference: step {step}: {holder} still references deleted {deleted}"
            ),
            Self::DeletedStillPresent { step, id } => {
                write!(f, "DeletedStillPresent: step {step}: {id} survived delete")
            }
            Self::ItemCountDrift {
                step,
                expected,
                actual,
            } => write!(
                f,
                "ItemCountDrift: step {step}: expected {expected} items, found {actual}"
            ),
        }
    }
}

// ── Snapshots ────────────────────────────────────────────────────────────────

/// Mutable state of one item, for before/after comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemState {
    pub id: ItemId,
    pub title: String,
    pub description: String,
    pub status: Status,
    pub parent_id: Option<ItemId>,
    pub children_ids: Vec<ItemId>,
}

/// Order-independent view of every item on the board.
#[must_use]
pub fn snapshot(board: &WorkBoard) -> Vec<ItemState> {
    let mut items: Vec<ItemState> = board
        .iter()
        .map(|item| ItemState {
            id: item.id(),
            title: item.title().to_string(),
            description: item.description().to_string(),
            status: item.status(),
            parent_id: item.parent_id(),
            children_ids: item.children_ids().to_vec(),
        })
        .collect();
    items.sort_by_key(|state| state.id);
    items
}

// ── Oracle ───────────────────────────────────────────────────────────────────

/// Per-step invariant checks over a board before and after one operation.
pub struct BoardOracle;

impl BoardOracle {
    /// Run every check for one step.
    ///
    /// `deleted` is the id the operation resolved to when it was a delete.
    #[must_use]
    pub fn check_step(
        step: usize,
        before: &WorkBoard,
        after: &WorkBoard,
        op: &BoardOp,
        outcome: &Outcome,
        deleted: Option<ItemId>,
    ) -> OracleResult {
        Self::check_link_integrity(step, after)
            .merge(Self::check_rejection_is_clean(step, before, after, op, outcome))
            .merge(Self::check_item_count(step, before, after, op, outcome))
            .merge(match deleted {
                Some(id) if !outcome.is_rejected() => {
                    Self::check_delete_orphans(step, before, after, id)
                }
                _ => OracleResult::pass(),
            })
    }

    /// Every link has both ends and no reference dangles.
    #[must_use]
    pub fn check_link_integrity(step: usize, board: &WorkBoard) -> OracleResult {
        let report = check_links(board);
        OracleResult::fail(
            report
                .violations
                .iter()
                .map(|v| InvariantViolation::Link {
                    step,
                    detail: v.to_string(),
                })
                .collect(),
        )
    }

    /// A rejected operation leaves no trace.
    #[must_use]
    pub fn check_rejection_is_clean(
        step: usize,
        before: &WorkBoard,
        after: &WorkBoard,
        op: &BoardOp,
        outcome: &Outcome,
    ) -> OracleResult {
        let Outcome::Rejected { code } = outcome else {
            return OracleResult::pass();
        };
        if snapshot(before) == snapshot(after) {
            OracleResult::pass()
        } else {
            OracleResult::fail(vec![InvariantViolation::PartialMutation {
                step,
                op: op.name(),
                code: code.clone(),
            }])
        }
    }

    /// Adds grow the board by one, deletes shrink it by one, nothing else
    /// changes the count.
    #[must_use]
    pub fn check_item_count(
        step: usize,
        before: &WorkBoard,
        after: &WorkBoard,
        op: &BoardOp,
        outcome: &Outcome,
    ) -> OracleResult {
        let expected = match (op, outcome) {
            (_, Outcome::Created { .. }) => before.len() + 1,
            (BoardOp::Delete { .. }, Outcome::Applied) => before.len().saturating_sub(1),
            _ => before.len(),
        };
        if after.len() == expected {
            OracleResult::pass()
        } else {
            OracleResult::fail(vec![InvariantViolation::ItemCountDrift {
                step,
                expected,
                actual: after.len(),
            }])
        }
    }

    /// Deleting an item orphans its children and detaches it from its parent.
    #[must_use]
    pub fn check_delete_orphans(
        step: usize,
        before: &WorkBoard,
        after: &WorkBoard,
        deleted: ItemId,
    ) -> OracleResult {
        let mut violations = Vec::new();

        if after.contains(deleted) {
            violations.push(InvariantViolation::DeletedStillPresent { step, id: deleted });
        }

        let Some(old) = before.find_work_item(deleted) else {
            return OracleResult::fail(violations);
        };

        for &child in old.children_ids() {
            // A self-linked item is its own child; it is meant to go.
            if child == deleted {
                continue;
            }
            match after.find_work_item(child) {
                None => violations.push(InvariantViolation::DeleteCascaded {
                    step,
                    deleted,
                    child,
                }),
                Some(item) if item.parent_id() == Some(deleted) => {
                    violations.push(InvariantViolation::DeleteLeftReference {
                        step,
                        deleted,
                        holder: child,
                    });
                }
                Some(_) => {}
            }
        }

        let stale_parent = old
            .parent_id()
            .and_then(|p| after.find_work_item(p))
            .filter(|parent| parent.has_child(deleted));
        if let Some(parent) = stale_parent {
            violations.push(InvariantViolation::DeleteLeftReference {
                step,
                deleted,
                holder: parent.id(),
            });
        }

        OracleResult::fail(violations)
    }
}

//! Integrity checks for a board's parent/child links.
//!
//! The board keeps links symmetric on its own; this module re-derives that
//! from scratch so tests, simulations and callers holding a board read back
//! through serde can confirm it.

use std::collections::HashSet;
use std::fmt;

use crate::model::board::WorkBoard;
use crate::model::item::ItemId;

/// One broken link invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkViolation {
    /// `parent` lists `child`, but `child.parent_id` points elsewhere.
    ChildNotPointingBack {
        parent: ItemId,
        child: ItemId,
        actual_parent: Option<ItemId>,
    },
    /// `child.parent_id` is `parent`, but `parent` does not list it.
    ParentNotListingChild { parent: ItemId, child: ItemId },
    /// `child.parent_id` refers to an item not on the board.
    DanglingParent { child: ItemId, parent: ItemId },
    /// `parent.children_ids` refers to an item not on the board.
    DanglingChild { parent: ItemId, child: ItemId },
    /// `parent.children_ids` lists `child` more than once.
    DuplicateChild { parent: ItemId, child: ItemId },
    /// `parent` has more children than the board allows.
    TooManyChildren {
        parent: ItemId,
        count: usize,
        max: usize,
    },
    /// The board holds more items than it allows.
    TooManyItems { count: usize, max: usize },
}

impl fmt::Display for LinkViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChildNotPointingBack {
                parent,
                child,
                actual_parent,
            } => match actual_parent {
                Some(actual) => write!(
                    f,
                    "{parent} lists child {child}, whose parent is {actual}"
                ),
                None => write!(f, "{parent} lists child {child}, which has no parent"),
            },
            Self::ParentNotListingChild { parent, child } => {
                write!(f, "{child} points at parent {parent}, which does not list it")
            }
            Self::DanglingParent { child, parent } => {
                write!(f, "{child} points at missing parent {parent}")
            }
            Self::DanglingChild { parent, child } => {
                write!(f, "{parent} lists missing child {child}")
            }
            Self::DuplicateChild { parent, child } => {
                write!(f, "{parent} lists child {child} more than once")
            }
            Self::TooManyChildren { parent, count, max } => {
                write!(f, "{parent} has {count} children (max {max})")
            }
            Self::TooManyItems { count, max } => {
                write!(f, "board holds {count} items (max {max})")
            }
        }
    }
}

/// Result of [`check_links`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkReport {
    /// Number of items inspected.
    pub items_checked: usize,
    /// Number of parent/child links found (counted from the child side).
    pub links_checked: usize,
    pub violations: Vec<LinkViolation>,
}

impl LinkReport {
    /// Return `true` when no violation was found.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Walk every item and report each place where the two ends of a link
/// disagree or a reference does not resolve.
#[must_use]
pub fn check_links(board: &WorkBoard) -> LinkReport {
    let mut report = LinkReport {
        items_checked: board.len(),
        ..LinkReport::default()
    };

    if board.len() > board.max_work_items() {
        report.violations.push(LinkViolation::TooManyItems {
            count: board.len(),
            max: board.max_work_items(),
        });
    }

    for item in board.iter() {
        let id = item.id();

        if let Some(parent_id) = item.parent_id() {
            report.links_checked += 1;
            match board.find_work_item(parent_id) {
                None => report.violations.push(LinkViolation::DanglingParent {
                    child: id,
                    parent: parent_id,
                }),
                Some(parent) if !parent.has_child(id) => {
                    report
                        .violations
                        .push(LinkViolation::ParentNotListingChild {
                            parent: parent_id,
                            child: id,
                        });
                }
                Some(_) => {}
            }
        }

        let children = item.children_ids();
        if children.len() > board.max_children() {
            report.violations.push(LinkViolation::TooManyChildren {
                parent: id,
                count: children.len(),
                max: board.max_children(),
            });
        }

        let mut seen = HashSet::with_capacity(children.len());
        for &child_id in children {
            if !seen.insert(child_id) {
                report.violations.push(LinkViolation::DuplicateChild {
                    parent: id,
                    child: child_id,
                });
                continue;
            }
            match board.find_work_item(child_id) {
                None => report.violations.push(LinkViolation::DanglingChild {
                    parent: id,
                    child: child_id,
                }),
                Some(child) if child.parent_id() != Some(id) => {
                    report.violations.push(LinkViolation::ChildNotPointingBack {
                        parent: id,
                        child: child_id,
                        actual_parent: child.parent_id(),
                    });
                }
                Some(_) => {}
            }
        }
    }

    if !report.is_ok() {
        tracing::warn!(
            violations = report.violations.len(),
            board_id = %board.id(),
            "board link check failed"
        );
    }

    report
}

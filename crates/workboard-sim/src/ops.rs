//! Random board operations and their application.
//!
//! Operations refer to items through [`IdRef`] rather than raw ids, so a
//! trace is a pure function of the seed: item ids are random v4 UUIDs, but
//! the position of an item in the creation log is not.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use workboard_core::{
    BoardError, ItemId, ItemType, NewWorkItem, Status, WorkBoard, WorkItemUpdate,
};

use crate::rng::DeterministicRng;

/// High half of every ghost id; keeps them visibly apart from v4 ids.
const GHOST_PREFIX: u64 = 0x6768_6f73_7400_0000;

/// Reference to an item by creation order, or to an id that never existed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdRef {
    /// The n-th item ever created. It may have been deleted since.
    Known(usize),
    /// A fabricated id no item has ever had.
    Ghost(u64),
}

impl IdRef {
    /// Map this reference onto a concrete id.
    #[must_use]
    pub fn resolve(self, known: &[ItemId]) -> ItemId {
        match self {
            Self::Known(index) => known
                .get(index)
                .copied()
                .unwrap_or_else(|| ghost_id(u64::try_from(index).unwrap_or(u64::MAX))),
            Self::Ghost(n) => ghost_id(n),
        }
    }
}

/// Deterministic id that cannot collide with a v4 UUID.
#[must_use]
pub const fn ghost_id(n: u64) -> ItemId {
    Uuid::from_u64_pair(GHOST_PREFIX, n)
}

/// One step the simulator performs against the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BoardOp {
    Add {
        item_type: ItemType,
        title: String,
        parent: Option<IdRef>,
        children: Vec<IdRef>,
    },
    Update {
        target: IdRef,
        title: Option<String>,
        status: Option<Status>,
    },
    Delete {
        target: IdRef,
    },
    Link {
        parent: IdRef,
        child: IdRef,
    },
    Unlink {
        parent: IdRef,
        child: IdRef,
    },
}

impl BoardOp {
    /// Short operation name for logs and summaries.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
            Self::Link { .. } => "link",
            Self::Unlink { .. } => "unlink",
        }
    }
}

/// What happened when an operation was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// A new item was created; `index` is its position in the creation log.
    Created { index: usize },
    /// The operation succeeded without creating anything.
    Applied,
    /// The board refused the operation.
    Rejected { code: String },
}

impl Outcome {
    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

/// Knobs for [`generate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpMix {
    /// Chance (percent) that an id slot is filled with a ghost id.
    pub stale_id_percent: u8,
    /// Chance (percent) that a title is blank or oversized.
    pub invalid_input_percent: u8,
}

// Relative weights of the five operation kinds.
const WEIGHT_ADD: u64 = 30;
const WEIGHT_UPDATE: u64 = 15;
const WEIGHT_DELETE: u64 = 10;
const WEIGHT_LINK: u64 = 30;
const WEIGHT_UNLINK: u64 = 15;

/// Generate the next operation given how many items have been created.
///
/// Creation always wins while nothing exists yet, so early steps are not
/// wasted on references that can only be ghosts.
#[must_use]
pub fn generate(rng: &mut DeterministicRng, created: usize, mix: OpMix) -> BoardOp {
    if created == 0 {
        return generate_add(rng, created, mix);
    }

    let total = WEIGHT_ADD + WEIGHT_UPDATE + WEIGHT_DELETE + WEIGHT_LINK + WEIGHT_UNLINK;
    let mut roll = rng.next_bounded(total);

    if roll < WEIGHT_ADD {
        return generate_add(rng, created, mix);
    }
    roll -= WEIGHT_ADD;
    if roll < WEIGHT_UPDATE {
        let target = pick_ref(rng, created, mix);
        let title = rng.hit_rate_percent(50).then(|| title(rng, mix));
        let status = rng.hit_rate_percent(60).then(|| {
            rng.pick(&Status::ALL).copied().unwrap_or_default()
        });
        return BoardOp::Update {
            target,
            title,
            status,
        };
    }
    roll -= WEIGHT_UPDATE;
    if roll < WEIGHT_DELETE {
        return BoardOp::Delete {
            target: pick_ref(rng, created, mix),
        };
    }
    roll -= WEIGHT_DELETE;
    if roll < WEIGHT_LINK {
        return BoardOp::Link {
            parent: pick_ref(rng, created, mix),
            child: pick_ref(rng, created, mix),
        };
    }
    BoardOp::Unlink {
        parent: pick_ref(rng, created, mix),
        child: pick_ref(rng, created, mix),
    }
}

fn generate_add(rng: &mut DeterministicRng, created: usize, mix: OpMix) -> BoardOp {
    let item_type = rng.pick(&ItemType::ALL).copied().unwrap_or(ItemType::Task);
    let title = title(rng, mix);
    let parent = (created > 0 && rng.hit_rate_percent(50)).then(|| pick_ref(rng, created, mix));

    let mut children = Vec::new();
    if created > 0 {
        for _ in 0..rng.next_bounded(3) {
            let child = pick_ref(rng, created, mix);
            if !children.contains(&child) {
                children.push(child);
            }
        }
    }

    BoardOp::Add {
        item_type,
        title,
        parent,
        children,
    }
}

fn pick_ref(rng: &mut DeterministicRng, created: usize, mix: OpMix) -> IdRef {
    if created == 0 || rng.hit_rate_percent(mix.stale_id_percent) {
        IdRef::Ghost(rng.next_bounded(1_000))
    } else {
        IdRef::Known(rng.next_index(created))
    }
}

fn title(rng: &mut DeterministicRng, mix: OpMix) -> String {
    if rng.hit_rate_percent(mix.invalid_input_percent) {
        if rng.hit_rate_percent(50) {
            String::new()
        } else {
            "x".repeat(300)
        }
    } else {
        format!("item {}", rng.next_bounded(10_000))
    }
}

/// Apply `op` to `board`, appending any newly created id to `known`.
///
/// # Errors
///
/// Returns whatever [`BoardError`] the board reports; the board is left as
/// it was in that case.
pub fn apply(
    board: &mut WorkBoard,
    known: &mut Vec<ItemId>,
    op: &BoardOp,
) -> Result<Outcome, BoardError> {
    match op {
        BoardOp::Add {
            item_type,
            title,
            parent,
            children,
        } => {
            let description = format!("simulated {item_type}");
            let mut init = NewWorkItem::new(*item_type, title.clone(), description)
                .children(children.iter().map(|c| c.resolve(known)).collect());
            if let Some(parent) = parent {
                init = init.parent(parent.resolve(known));
            }
            let item = init.build()?;
            let id = board.add_work_item(item)?.id();
            known.push(id);
            Ok(Outcome::Created {
                index: known.len() - 1,
            })
        }
        BoardOp::Update {
            target,
            title,
            status,
        } => {
            let mut update = WorkItemUpdate::default();
            if let Some(title) = title {
                update = update.title(title.clone());
            }
            if let Some(status) = status {
                update = update.status(*status);
            }
            board.update_work_item(target.resolve(known), update)?;
            Ok(Outcome::Applied)
        }
        BoardOp::Delete { target } => {
            board.delete_work_item(target.resolve(known))?;
            Ok(Outcome::Applied)
        }
        BoardOp::Link { parent, child } => {
            board.link_parent_and_child(parent.resolve(known), child.resolve(known))?;
            Ok(Outcome::Applied)
        }
        BoardOp::Unlink { parent, child } => {
            board.unlink_parent_and_child(parent.resolve(known), child.resolve(known))?;
            Ok(Outcome::Applied)
        }
    }
}

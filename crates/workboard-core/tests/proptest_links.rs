use proptest::prelude::*;
use workboard_core::config::{BoardConfig, CyclePolicy, LimitsConfig, LinkConfig};
use workboard_core::model::board::{WorkBoard, WorkItemUpdate};
use workboard_core::model::item::{ItemId, ItemType, NewWorkItem, Status, WorkItem};
use workboard_core::verify::check_links;

/// One step against the board. Indices pick from the ids created so far
/// (including deleted ones), wrapping around.
#[derive(Debug, Clone)]
enum Op {
    Add {
        parent: Option<usize>,
        children: Vec<usize>,
    },
    Link(usize, usize),
    Unlink(usize, usize),
    Delete(usize),
    Retitle(usize),
    Complete(usize),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (
            proptest::option::of(0usize..64),
            proptest::collection::vec(0usize..64, 0..4)
        )
            .prop_map(|(parent, children)| Op::Add { parent, children }),
        4 => (0usize..64, 0usize..64).prop_map(|(p, c)| Op::Link(p, c)),
        2 => (0usize..64, 0usize..64).prop_map(|(p, c)| Op::Unlink(p, c)),
        2 => (0usize..64).prop_map(Op::Delete),
        1 => (0usize..64).prop_map(Op::Retitle),
        1 => (0usize..64).prop_map(Op::Complete),
    ]
}

fn arb_policy() -> impl Strategy<Value = CyclePolicy> {
    prop_oneof![
        Just(CyclePolicy::Allow),
        Just(CyclePolicy::Warn),
        Just(CyclePolicy::Reject),
    ]
}

fn pick(ids: &[ItemId], index: usize) -> Option<ItemId> {
    if ids.is_empty() {
        None
    } else {
        Some(ids[index % ids.len()])
    }
}

fn apply(board: &mut WorkBoard, ids: &mut Vec<ItemId>, op: &Op) {
    match op {
        Op::Add { parent, children } => {
            let mut init = NewWorkItem::new(ItemType::Task, "generated", "generated item");
            if let Some(parent) = parent.and_then(|p| pick(ids, p)) {
                init = init.parent(parent);
            }
            let mut kids: Vec<ItemId> = children.iter().filter_map(|c| pick(ids, *c)).collect();
            kids.sort();
            kids.dedup();
            init = init.children(kids);
            if let Ok(item) = init.build() {
                ids.push(item.id());
                let _ = board.add_work_item(item);
            }
        }
        Op::Link(p, c) => {
            if let (Some(p), Some(c)) = (pick(ids, *p), pick(ids, *c)) {
                let _ = board.link_parent_and_child(p, c);
            }
        }
        Op::Unlink(p, c) => {
            if let (Some(p), Some(c)) = (pick(ids, *p), pick(ids, *c)) {
                let _ = board.unlink_parent_and_child(p, c);
            }
        }
        Op::Delete(i) => {
            if let Some(id) = pick(ids, *i) {
                let _ = board.delete_work_item(id);
            }
        }
        Op::Retitle(i) => {
            if let Some(id) = pick(ids, *i) {
                let _ = board.update_work_item(id, WorkItemUpdate::default().title("renamed"));
            }
        }
        Op::Complete(i) => {
            if let Some(id) = pick(ids, *i) {
                let _ = board.update_work_item(id, WorkItemUpdate::default().status(Status::Done));
            }
        }
    }
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(256))]

    #[test]
    fn links_stay_symmetric_under_any_sequence(
        policy in arb_policy(),
        max_children in 1usize..6,
        ops in proptest::collection::vec(arb_op(), 1..80),
    ) {
        let config = BoardConfig {
            limits: LimitsConfig { max_work_items: 40, max_children },
            links: LinkConfig { cycles: policy },
        };
        let mut board = WorkBoard::with_config("prop", "property board", &config).unwrap();
        let mut ids = Vec::new();

        for op in &ops {
            apply(&mut board, &mut ids, op);
            let report = check_links(&board);
            prop_assert!(report.is_ok(), "after {:?}: {:?}", op, report.violations);
            prop_assert!(board.len() <= 40);
        }
    }

    #[test]
    fn failed_operations_leave_board_unchanged(
        ops in proptest::collection::vec(arb_op(), 1..60),
    ) {
        let config = BoardConfig {
            limits: LimitsConfig { max_work_items: 20, max_children: 3 },
            links: LinkConfig { cycles: CyclePolicy::Reject },
        };
        let mut board = WorkBoard::with_config("prop", "property board", &config).unwrap();
        let mut ids = Vec::new();

        for op in &ops {
            let before = snapshot(&board);
            let failed = op_failed(&board, &ids, op);
            apply(&mut board, &mut ids, op);
            if failed {
                prop_assert_eq!(snapshot(&board), before);
            }
        }
    }

    #[test]
    fn reject_policy_never_produces_a_cycle(
        ops in proptest::collection::vec(arb_op(), 1..80),
    ) {
        let config = BoardConfig {
            links: LinkConfig { cycles: CyclePolicy::Reject },
            ..BoardConfig::default()
        };
        let mut board = WorkBoard::with_config("prop", "property board", &config).unwrap();
        let mut ids = Vec::new();

        for op in &ops {
            apply(&mut board, &mut ids, op);
        }
        for item in board.iter() {
            let chain = workboard_core::graph::hierarchy::ancestor_ids(&board, item.id());
            prop_assert!(!chain.contains(&item.id()));
            prop_assert_ne!(item.parent_id(), Some(item.id()));
        }
    }
}

/// Order-independent view of every item's mutable state.
fn snapshot(board: &WorkBoard) -> Vec<(ItemId, String, Status, Option<ItemId>, Vec<ItemId>)> {
    let mut items: Vec<_> = board
        .iter()
        .map(|item: &WorkItem| {
            (
                item.id(),
                item.title().to_string(),
                item.status(),
                item.parent_id(),
                item.children_ids().to_vec(),
            )
        })
        .collect();
    items.sort_by_key(|entry| entry.0);
    items
}

/// Whether `op` fails on `board`, determined on a throwaway clone.
fn op_failed(board: &WorkBoard, ids: &[ItemId], op: &Op) -> bool {
    let mut trial = board.clone();
    match op {
        Op::Add { .. } => {
            let mut trial_ids = ids.to_vec();
            let before = trial.len();
            apply(&mut trial, &mut trial_ids, op);
            trial.len() == before
        }
        Op::Link(p, c) => match (pick(ids, *p), pick(ids, *c)) {
            (Some(p), Some(c)) => trial.link_parent_and_child(p, c).is_err(),
            _ => false,
        },
        Op::Unlink(p, c) => match (pick(ids, *p), pick(ids, *c)) {
            (Some(p), Some(c)) => trial.unlink_parent_and_child(p, c).is_err(),
            _ => false,
        },
        Op::Delete(i) => pick(ids, *i).is_some_and(|id| trial.delete_work_item(id).is_err()),
        Op::Retitle(i) | Op::Complete(i) => pick(ids, *i).is_some_and(|id| {
            trial
                .update_work_item(id, WorkItemUpdate::default())
                .is_err()
        }),
    }
}

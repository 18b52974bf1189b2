//! workboard-sim library.
//!
//! Drives a [`WorkBoard`] through long, seeded sequences of random
//! operations and checks the link invariants after every step. A seed fully
//! determines the trace, so any failure can be replayed.
//!
//! # Conventions
//!
//! - **Errors**: Use `anyhow::Result` for return types.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod campaign;
pub mod ops;
pub mod oracle;
pub mod rng;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use workboard_core::config::{BoardConfig, LimitsConfig, LinkConfig};
use workboard_core::verify::check_links;
use workboard_core::{CyclePolicy, ItemId, WorkBoard};

use crate::ops::{BoardOp, OpMix, Outcome};
use crate::oracle::{BoardOracle, OracleResult};
use crate::rng::DeterministicRng;

/// Parameters for a single simulated run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub seed: u64,
    /// Operations to apply.
    pub ops: usize,
    pub max_work_items: usize,
    pub max_children: usize,
    pub cycles: CyclePolicy,
    /// Chance (percent) that an id slot refers to an item that never existed.
    pub stale_id_percent: u8,
    /// Chance (percent) that a generated title is blank or oversized.
    pub invalid_input_percent: u8,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            ops: 200,
            max_work_items: 48,
            max_children: 4,
            cycles: CyclePolicy::Warn,
            stale_id_percent: 10,
            invalid_input_percent: 5,
        }
    }
}

impl SimulationConfig {
    /// Board settings this run uses.
    #[must_use]
    pub fn board_config(&self) -> BoardConfig {
        BoardConfig {
            limits: LimitsConfig {
                max_work_items: self.max_work_items,
                max_children: self.max_children,
            },
            links: LinkConfig {
                cycles: self.cycles,
            },
        }
    }

    const fn op_mix(&self) -> OpMix {
        OpMix {
            stale_id_percent: self.stale_id_percent,
            invalid_input_percent: self.invalid_input_percent,
        }
    }
}

/// One applied operation and what came of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub step: usize,
    pub op: BoardOp,
    pub outcome: Outcome,
}

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub seed: u64,
    pub trace: Vec<TraceEntry>,
    pub oracle: OracleResult,
    /// Operations the board accepted.
    pub applied: usize,
    /// Operations the board refused.
    pub rejected: usize,
    /// Items on the board after the last step.
    pub final_items: usize,
    /// Parent/child links on the board after the last step.
    pub final_links: usize,
}

/// Seeded driver for one board.
#[derive(Debug, Clone)]
pub struct Simulator {
    config: SimulationConfig,
    rng: DeterministicRng,
    board: WorkBoard,
    /// Every id ever created, in creation order.
    known: Vec<ItemId>,
}

impl Simulator {
    /// Create a simulator with a fresh, empty board.
    ///
    /// # Errors
    ///
    /// Returns an error if the board limits are out of range.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        let board_config = config.board_config();
        board_config.validate()?;
        let board = WorkBoard::with_config(
            format!("sim-{}", config.seed),
            "simulated board",
            &board_config,
        )?;
        Ok(Self {
            rng: DeterministicRng::new(config.seed),
            config,
            board,
            known: Vec::new(),
        })
    }

    #[must_use]
    pub const fn board(&self) -> &WorkBoard {
        &self.board
    }

    /// Apply the configured number of operations, checking invariants after
    /// each one.
    pub fn run(&mut self) -> SimulationResult {
        let mix = self.config.op_mix();
        let mut trace = Vec::with_capacity(self.config.ops);
        let mut oracle = OracleResult::pass();
        let mut applied = 0_usize;
        let mut rejected = 0_usize;

        for step in 0..self.config.ops {
            let op = ops::generate(&mut self.rng, self.known.len(), mix);
            let (outcome, check) = self.step(step, &op);
            if outcome.is_rejected() {
                rejected += 1;
            } else {
                applied += 1;
            }
            if !check.passed {
                warn!(
                    seed = self.config.seed,
                    step,
                    op = op.name(),
                    violations = check.violations.len(),
                    "invariant violated"
                );
            }
            oracle = oracle.merge(check);
            trace.push(TraceEntry { step, op, outcome });
        }

        let final_links = check_links(&self.board).links_checked;
        info!(
            seed = self.config.seed,
            ops = self.config.ops,
            applied,
            rejected,
            items = self.board.len(),
            passed = oracle.passed,
            "simulation complete"
        );

        SimulationResult {
            seed: self.config.seed,
            trace,
            oracle,
            applied,
            rejected,
            final_items: self.board.len(),
            final_links,
        }
    }

    fn step(&mut self, step: usize, op: &BoardOp) -> (Outcome, OracleResult) {
        let before = self.board.clone();
        let deleted = match op {
            BoardOp::Delete { target } => Some(target.resolve(&self.known)),
            _ => None,
        };

        let outcome = match ops::apply(&mut self.board, &mut self.known, op) {
            Ok(outcome) => outcome,
            Err(err) => Outcome::Rejected {
                code: err.code().code().to_string(),
            },
        };
        debug!(step, op = op.name(), ?outcome, "applied operation");

        let check = BoardOracle::check_step(step, &before, &self.board, op, &outcome, deleted);
        (outcome, check)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_run_passes() {
        let mut sim = Simulator::new(SimulationConfig::default()).unwrap();
        let result = sim.run();
        assert!(result.oracle.passed, "violations: {:?}", result.oracle.violations);
        assert_eq!(result.trace.len(), 200);
        assert_eq!(result.applied + result.rejected, 200);
        assert!(result.final_items <= 48);
        assert_eq!(result.final_items, sim.board().len());
    }

    #[test]
    fn same_seed_same_trace() {
        let config = SimulationConfig {
            seed: 17,
            ..SimulationConfig::default()
        };
        let first = Simulator::new(config.clone()).unwrap().run();
        let second = Simulator::new(config).unwrap().run();
        assert_eq!(first.trace, second.trace);
        assert_eq!(first.final_items, second.final_items);
        assert_eq!(first.final_links, second.final_links);
    }

    #[test]
    fn out_of_range_limits_are_rejected() {
        let config = SimulationConfig {
            max_children: 0,
            ..SimulationConfig::default()
        };
        assert!(Simulator::new(config).is_err());
    }

    #[test]
    fn runs_reach_both_accepted_and_rejected_ops() {
        let mut sim = Simulator::new(SimulationConfig {
            seed: 3,
            ops: 400,
            ..SimulationConfig::default()
        })
        .unwrap();
        let result = sim.run();
        assert!(result.applied > 0);
        assert!(result.rejected > 0);
        assert!(result.final_links > 0);
    }

    #[test]
    fn first_op_creates_an_item() {
        let mut sim = Simulator::new(SimulationConfig {
            ops: 1,
            invalid_input_percent: 0,
            ..SimulationConfig::default()
        })
        .unwrap();
        let result = sim.run();
        assert_eq!(result.trace[0].outcome, Outcome::Created { index: 0 });
        assert_eq!(result.final_items, 1);
    }
}

//! Campaign runner for deterministic simulation campaigns.
//!
//! Executes many seeds with the same board parameters, collecting pass/fail
//! results and identifying the first failing seed for replay.

use std::ops::Range;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use workboard_core::CyclePolicy;
use workboard_core::model::board::MAX_WORK_ITEMS;
use workboard_core::model::item::MAX_CHILDREN;

use crate::{SimulationConfig, SimulationResult, Simulator};

/// Campaign-level configuration controlling how many seeds to run and
/// what simulation parameters to use for each seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignConfig {
    /// Range of seeds to execute, e.g., `0..100`.
    pub seed_range: Range<u64>,
    /// Operations applied per seed.
    pub ops_per_seed: usize,
    /// Board item capacity for every seed.
    pub max_work_items: usize,
    /// Per-parent child capacity for every seed.
    pub max_children: usize,
    pub cycles: CyclePolicy,
    /// Chance (percent) that an id slot refers to an item that never existed.
    pub stale_id_percent: u8,
    /// Chance (percent) that a generated title is blank or oversized.
    pub invalid_input_percent: u8,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        let sim = SimulationConfig::default();
        Self {
            seed_range: 0..100,
            ops_per_seed: sim.ops,
            max_work_items: sim.max_work_items,
            max_children: sim.max_children,
            cycles: sim.cycles,
            stale_id_percent: sim.stale_id_percent,
            invalid_input_percent: sim.invalid_input_percent,
        }
    }
}

impl CampaignConfig {
    /// Build a [`SimulationConfig`] for a specific seed.
    #[must_use]
    pub fn sim_config_for_seed(&self, seed: u64) -> SimulationConfig {
        SimulationConfig {
            seed,
            ops: self.ops_per_seed,
            max_work_items: self.max_work_items,
            max_children: self.max_children,
            cycles: self.cycles,
            stale_id_percent: self.stale_id_percent,
            invalid_input_percent: self.invalid_input_percent,
        }
    }

    /// Validate configuration before running.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if self.seed_range.is_empty() {
            bail!("seed_range must not be empty");
        }
        if self.ops_per_seed == 0 {
            bail!("ops_per_seed must be > 0");
        }
        if self.max_work_items == 0 || self.max_work_items > MAX_WORK_ITEMS {
            bail!("max_work_items must be in 1..={MAX_WORK_ITEMS}");
        }
        if self.max_children == 0 || self.max_children > MAX_CHILDREN {
            bail!("max_children must be in 1..={MAX_CHILDREN}");
        }
        if self.stale_id_percent > 100 || self.invalid_input_percent > 100 {
            bail!("percentages must be in 0..=100");
        }
        Ok(())
    }
}

/// Failure details for a single seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedFailure {
    /// The seed that failed.
    pub seed: u64,
    /// Invariant violations found.
    pub violations: Vec<String>,
}

/// Aggregate report produced by a campaign run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignReport {
    /// Total seeds executed.
    pub seeds_run: usize,
    /// Seeds that passed all invariants.
    pub seeds_passed: usize,
    /// First seed that failed (for prioritized replay).
    pub first_failure: Option<u64>,
    /// All seed failures with violation details.
    pub failures: Vec<SeedFailure>,
    /// Operations the boards accepted, across all seeds.
    pub ops_applied: usize,
    /// Operations the boards refused, across all seeds.
    pub ops_rejected: usize,
}

impl CampaignReport {
    /// True if every seed passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Run a full campaign across all seeds in the config.
///
/// # Errors
///
/// Returns an error if config validation fails.
pub fn run_campaign(config: &CampaignConfig) -> Result<CampaignReport> {
    config.validate()?;

    let mut report = CampaignReport {
        seeds_run: 0,
        seeds_passed: 0,
        first_failure: None,
        failures: Vec::new(),
        ops_applied: 0,
        ops_rejected: 0,
    };

    for seed in config.seed_range.clone() {
        let result = run_single_seed(seed, config)?;
        report.seeds_run += 1;
        report.ops_applied += result.applied;
        report.ops_rejected += result.rejected;

        if result.oracle.passed {
            report.seeds_passed += 1;
        } else {
            report.first_failure.get_or_insert(seed);
            report.failures.push(SeedFailure {
                seed,
                violations: result
                    .oracle
                    .violations
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
            });
        }
    }

    tracing::info!(
        seeds = report.seeds_run,
        passed = report.seeds_passed,
        first_failure = ?report.first_failure,
        "campaign complete"
    );

    Ok(report)
}

/// Run one seed of a campaign.
///
/// # Errors
///
/// Returns an error if the board cannot be built from the config.
pub fn run_single_seed(seed: u64, config: &CampaignConfig) -> Result<SimulationResult> {
    let mut simulator = Simulator::new(config.sim_config_for_seed(seed))?;
    Ok(simulator.run())
}

/// Replay a single seed with full trace details for debugging.
///
/// # Errors
///
/// Returns an error when config validation or board setup fails.
pub fn replay_seed(seed: u64, config: &CampaignConfig) -> Result<SimulationResult> {
    config.validate()?;
    tracing::debug!(seed, "replaying seed");
    run_single_seed(seed, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn campaign_config_default_is_valid() {
        let config = CampaignConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn campaign_config_empty_seed_range_rejected() {
        let config = CampaignConfig {
            seed_range: 5..5,
            ..CampaignConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn campaign_config_zero_ops_rejected() {
        let config = CampaignConfig {
            ops_per_seed: 0,
            ..CampaignConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn campaign_config_oversized_limits_rejected() {
        let config = CampaignConfig {
            max_children: MAX_CHILDREN + 1,
            ..CampaignConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn sim_config_for_seed_uses_correct_seed() {
        let config = CampaignConfig::default();
        let sim = config.sim_config_for_seed(42);
        assert_eq!(sim.seed, 42);
        assert_eq!(sim.ops, config.ops_per_seed);
        assert_eq!(sim.max_children, config.max_children);
    }

    #[test]
    fn run_campaign_all_seeds_pass() {
        let config = CampaignConfig {
            seed_range: 0..20,
            ops_per_seed: 150,
            ..CampaignConfig::default()
        };
        let report = run_campaign(&config).expect("campaign should not error");
        assert_eq!(report.seeds_run, 20);
        assert_eq!(report.seeds_passed, 20);
        assert!(report.all_passed());
        assert!(report.first_failure.is_none());
        assert_eq!(report.ops_applied + report.ops_rejected, 20 * 150);
    }

    #[test]
    fn every_cycle_policy_holds_invariants() {
        for cycles in [CyclePolicy::Allow, CyclePolicy::Warn, CyclePolicy::Reject] {
            let config = CampaignConfig {
                seed_range: 100..110,
                ops_per_seed: 200,
                max_work_items: 16,
                max_children: 2,
                cycles,
                ..CampaignConfig::default()
            };
            let report = run_campaign(&config).expect("campaign should not error");
            assert!(
                report.all_passed(),
                "{cycles:?} failed: {:?}",
                report.failures
            );
        }
    }

    #[test]
    fn replay_is_deterministic() {
        let config = CampaignConfig::default();
        let first = replay_seed(7, &config).expect("replay 1");
        let second = replay_seed(7, &config).expect("replay 2");
        assert_eq!(first.trace, second.trace);
        assert_eq!(first.applied, second.applied);
        assert!(first.oracle.passed);
    }

    #[test]
    fn campaign_report_serializes_to_json() {
        let report = CampaignReport {
            seeds_run: 10,
            seeds_passed: 9,
            first_failure: Some(7),
            failures: vec![SeedFailure {
                seed: 7,
                violations: vec!["Link: step 3: a lists missing child b".into()],
            }],
            ops_applied: 1_500,
            ops_rejected: 500,
        };
        let json = serde_json::to_string(&report).expect("serialize");
        assert!(json.contains("\"seeds_run\":10"));
        assert!(json.contains("\"first_failure\":7"));
    }
}

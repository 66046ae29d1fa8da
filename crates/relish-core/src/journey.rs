use crate::baseline::{BaselineEvaluator, LayerBaselineStatus};
use crate::config::Config;
use crate::error::{RelishError, Result};
use crate::manual::Manual;
use crate::milestone::{self, MilestoneContext, MilestoneEvent};
use crate::progress::{self, Aggregator, NextStep, OnboardingProgress};
use crate::requirements::RequirementTable;
use crate::store::RecordStore;
use crate::types::{LayerId, Phase};
use serde::Serialize;
use std::collections::BTreeMap;

/// Result of one evaluate → milestones → advance → persist pass.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshOutcome {
    pub progress: OnboardingProgress,
    /// Newly achieved milestones, catalog order. Empty on a repeat refresh.
    pub milestones: Vec<MilestoneEvent>,
    pub phase_completed: Option<Phase>,
    pub baselines: BTreeMap<LayerId, LayerBaselineStatus>,
}

/// Drives a manual's onboarding against a record store.
pub struct Journey<'a> {
    store: &'a dyn RecordStore,
    table: RequirementTable,
    aggregator: Aggregator,
}

impl<'a> Journey<'a> {
    pub fn new(store: &'a dyn RecordStore, table: RequirementTable, aggregator: Aggregator) -> Self {
        Self {
            store,
            table,
            aggregator,
        }
    }

    /// Built-in requirement tables and the default phase layout.
    pub fn with_defaults(store: &'a dyn RecordStore) -> Result<Self> {
        Ok(Self::new(store, RequirementTable::builtin()?, Aggregator::default()))
    }

    pub fn from_config(store: &'a dyn RecordStore, config: &Config) -> Result<Self> {
        Ok(Self::new(store, RequirementTable::builtin()?, config.aggregator()?))
    }

    pub fn table(&self) -> &RequirementTable {
        &self.table
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn evaluator(&self) -> BaselineEvaluator<'_> {
        BaselineEvaluator::new(&self.table)
    }

    /// Load `manual_id` and evaluate every layer.
    pub fn evaluate(&self, manual_id: &str) -> Result<(Manual, BTreeMap<LayerId, LayerBaselineStatus>)> {
        let manual = Manual::load(self.store, manual_id)?;
        let baselines = self.evaluator().evaluate_all(&manual);
        Ok((manual, baselines))
    }

    pub fn start(&self, manual_id: &str) -> Result<OnboardingProgress> {
        let manual = Manual::load(self.store, manual_id)?;
        if OnboardingProgress::exists(self.store, manual_id)? {
            return Err(RelishError::ProgressExists(manual_id.to_string()));
        }
        let mut progress = OnboardingProgress::new(&manual, &self.table);
        progress.save(self.store)?;
        tracing::info!(manual = manual_id, manual_type = %progress.manual_type, "onboarding started");
        Ok(progress)
    }

    pub fn progress(&self, manual_id: &str) -> Result<OnboardingProgress> {
        OnboardingProgress::load(self.store, manual_id)
    }

    pub fn refresh(&self, manual_id: &str) -> Result<RefreshOutcome> {
        let (manual, baselines) = self.evaluate(manual_id)?;
        let current = OnboardingProgress::load(self.store, manual_id)?;

        let statuses = progress::layer_statuses(&self.table, &manual, &baselines);

        // Milestone triggers see this evaluation's layer states.
        let mut snapshot = current.clone();
        snapshot.layer_statuses = statuses.clone();
        let fired = milestone::newly_achieved(&MilestoneContext {
            progress: &snapshot,
        });
        let ids: Vec<&str> = fired.iter().map(|m| m.id).collect();

        let mut next = self.aggregator.advance(&current, &ids, statuses);
        next.save(self.store)?;

        for m in &fired {
            tracing::info!(manual = manual_id, milestone = m.id, "milestone achieved");
        }

        let phase_completed = next
            .phases_completed
            .iter()
            .find(|p| !current.is_phase_completed(**p))
            .copied();

        Ok(RefreshOutcome {
            progress: next,
            milestones: fired.into_iter().map(MilestoneEvent::from).collect(),
            phase_completed,
            baselines,
        })
    }

    pub fn acknowledge(&self, manual_id: &str, milestone_id: &str) -> Result<OnboardingProgress> {
        let mut progress = OnboardingProgress::load(self.store, manual_id)?;
        if self.aggregator.acknowledge(&mut progress, milestone_id)? {
            progress.save(self.store)?;
        }
        Ok(progress)
    }

    pub fn launch(&self, manual_id: &str) -> Result<OnboardingProgress> {
        let mut progress = OnboardingProgress::load(self.store, manual_id)?;
        if self.aggregator.complete_launch(&mut progress)? {
            progress.save(self.store)?;
            tracing::info!(manual = manual_id, "launch completed");
        }
        Ok(progress)
    }

    pub fn graduate(&self, manual_id: &str) -> Result<OnboardingProgress> {
        let mut progress = OnboardingProgress::load(self.store, manual_id)?;
        if self.aggregator.graduate(&mut progress)? {
            progress.save(self.store)?;
            tracing::info!(manual = manual_id, "graduated");
        }
        Ok(progress)
    }

    pub fn next_step(&self, manual_id: &str) -> Result<NextStep> {
        let progress = OnboardingProgress::load(self.store, manual_id)?;
        Ok(self.aggregator.next_step(&progress))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

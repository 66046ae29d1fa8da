use crate::baseline::LayerBaselineStatus;
use crate::error::{RelishError, Result};
use crate::manual::Manual;
use crate::milestone::GRADUATION;
use crate::requirements::RequirementTable;
use crate::store::{self, RecordStore};
use crate::types::{LayerId, ManualType, Phase, RespondentType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub const COLLECTION: &str = "progress";

// ---------------------------------------------------------------------------
// LayerOnboardingStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerState {
    NotStarted,
    InProgress,
    Complete,
}

impl LayerState {
    pub fn as_str(self) -> &'static str {
        match self {
            LayerState::NotStarted => "not_started",
            LayerState::InProgress => "in_progress",
            LayerState::Complete => "complete",
        }
    }
}

impl fmt::Display for LayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerOnboardingStatus {
    pub layer: LayerId,
    pub name: String,
    pub state: LayerState,
    /// Content baseline met at the last evaluation.
    pub met: bool,
    pub content_percent: u8,
    #[serde(default)]
    pub required_respondents: Vec<RespondentType>,
    #[serde(default)]
    pub completed_respondents: Vec<RespondentType>,
    pub perspective_percent: u8,
}

impl LayerOnboardingStatus {
    pub fn not_started(layer: LayerId, name: &str, required: &[RespondentType]) -> Self {
        Self {
            layer,
            name: name.to_string(),
            state: LayerState::NotStarted,
            met: false,
            content_percent: 0,
            required_respondents: required.to_vec(),
            completed_respondents: Vec::new(),
            perspective_percent: 0,
        }
    }

    pub fn from_baseline(
        baseline: &LayerBaselineStatus,
        required: &[RespondentType],
        contributed: &BTreeSet<RespondentType>,
    ) -> Self {
        let perspective_percent = perspective_percent(required, contributed);
        let state = if baseline.met && perspective_percent >= 100 {
            LayerState::Complete
        } else if baseline.has_content() || !contributed.is_empty() {
            LayerState::InProgress
        } else {
            LayerState::NotStarted
        };
        Self {
            layer: baseline.layer,
            name: baseline.name.clone(),
            state,
            met: baseline.met,
            content_percent: baseline.percent_complete,
            required_respondents: required.to_vec(),
            completed_respondents: contributed.iter().copied().collect(),
            perspective_percent,
        }
    }

    fn weighted_percent(&self) -> f64 {
        (f64::from(self.content_percent) + f64::from(self.perspective_percent)) / 2.0
    }
}

/// Share of required respondents who contributed, rounded. A layer that asks
/// for no particular respondent is fully covered.
pub fn perspective_percent(required: &[RespondentType], contributed: &BTreeSet<RespondentType>) -> u8 {
    if required.is_empty() {
        return 100;
    }
    let covered = required.iter().filter(|r| contributed.contains(r)).count();
    (covered as f64 * 100.0 / required.len() as f64).round() as u8
}

/// Onboarding status per layer from a fresh set of baselines.
pub fn layer_statuses(
    table: &RequirementTable,
    manual: &Manual,
    baselines: &BTreeMap<LayerId, LayerBaselineStatus>,
) -> BTreeMap<LayerId, LayerOnboardingStatus> {
    let manual_type = manual.manual_type();
    baselines
        .iter()
        .map(|(&layer, baseline)| {
            let (required, kinds) = match table.layer(manual_type, layer) {
                Some(l) => (l.respondents, l.kinds()),
                None => (&[][..], Vec::new()),
            };
            let contributed = manual.respondents_for(&kinds);
            (
                layer,
                LayerOnboardingStatus::from_baseline(baseline, required, &contributed),
            )
        })
        .collect()
}

/// Complete layers in onboarding order.
pub fn completed_layers(statuses: &BTreeMap<LayerId, LayerOnboardingStatus>) -> Vec<LayerId> {
    LayerId::onboarding_order()
        .iter()
        .copied()
        .filter(|l| statuses.get(l).is_some_and(|s| s.state == LayerState::Complete))
        .collect()
}

/// First layer in onboarding order that is not complete yet.
pub fn next_layer(statuses: &BTreeMap<LayerId, LayerOnboardingStatus>) -> Option<LayerId> {
    LayerId::onboarding_order()
        .iter()
        .copied()
        .find(|l| !statuses.get(l).is_some_and(|s| s.state == LayerState::Complete))
}

/// Mean over layers of (content + perspective) / 2, rounded.
pub fn overall_percent(statuses: &BTreeMap<LayerId, LayerOnboardingStatus>) -> u8 {
    if statuses.is_empty() {
        return 0;
    }
    let total: f64 = statuses.values().map(|s| s.weighted_percent()).sum();
    (total / statuses.len() as f64).round() as u8
}

// ---------------------------------------------------------------------------
// OnboardingProgress
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneRecord {
    pub id: String,
    pub achieved_at: DateTime<Utc>,
    #[serde(default)]
    pub celebration_shown: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnboardingProgress {
    pub progress_id: String,
    pub manual_id: String,
    pub family_id: String,
    pub manual_type: ManualType,
    /// Bumped on every successful save; a write from an older snapshot is
    /// rejected as stale.
    #[serde(default)]
    pub version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_phase: Option<Phase>,
    #[serde(default)]
    pub phases_completed: Vec<Phase>,
    /// Layer to work on next; none once every layer is complete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_layer: Option<LayerId>,
    #[serde(default)]
    pub completed_layers: Vec<LayerId>,
    #[serde(default)]
    pub layer_statuses: BTreeMap<LayerId, LayerOnboardingStatus>,
    #[serde(default)]
    pub milestones_achieved: Vec<MilestoneRecord>,
    #[serde(default)]
    pub launch_completed: bool,
    #[serde(default)]
    pub overall_percent: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graduated_at: Option<DateTime<Utc>>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OnboardingProgress {
    /// Fresh progress: first phase, every layer not started.
    pub fn new(manual: &Manual, table: &RequirementTable) -> Self {
        let manual_type = manual.manual_type();
        let layer_statuses = LayerId::all()
            .iter()
            .map(|&layer| {
                let required = table
                    .layer(manual_type, layer)
                    .map(|l| l.respondents)
                    .unwrap_or(&[]);
                let name = table.layer_name(manual_type, layer);
                (layer, LayerOnboardingStatus::not_started(layer, name, required))
            })
            .collect();
        let now = Utc::now();
        Self {
            progress_id: manual.manual_id.clone(),
            manual_id: manual.manual_id.clone(),
            family_id: manual.family_id.clone(),
            manual_type,
            version: 0,
            current_phase: Phase::all().first().copied(),
            phases_completed: Vec::new(),
            current_layer: LayerId::onboarding_order().first().copied(),
            completed_layers: Vec::new(),
            layer_statuses,
            milestones_achieved: Vec::new(),
            launch_completed: false,
            overall_percent: 0,
            graduated_at: None,
            started_at: now,
            updated_at: now,
        }
    }

    pub fn has_milestone(&self, id: &str) -> bool {
        self.milestones_achieved.iter().any(|m| m.id == id)
    }

    pub fn is_phase_completed(&self, phase: Phase) -> bool {
        self.phases_completed.contains(&phase)
    }

    pub fn layers_met(&self) -> usize {
        self.layer_statuses.values().filter(|s| s.met).count()
    }

    /// Content baseline met and every required respondent heard from.
    pub fn is_layer_complete(&self, layer: LayerId) -> bool {
        self.layer_statuses
            .get(&layer)
            .is_some_and(|s| s.state == LayerState::Complete)
    }

    pub fn is_graduated(&self) -> bool {
        self.graduated_at.is_some()
    }

    /// Distinct respondents across every layer.
    pub fn respondents(&self) -> BTreeSet<RespondentType> {
        self.layer_statuses
            .values()
            .flat_map(|s| s.completed_respondents.iter().copied())
            .collect()
    }

    // ---------------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------------

    pub fn load(store: &dyn RecordStore, manual_id: &str) -> Result<Self> {
        match store::get_typed(store, COLLECTION, manual_id)? {
            Some(p) => Ok(p),
            None => Err(RelishError::ProgressNotFound(manual_id.to_string())),
        }
    }

    pub fn exists(store: &dyn RecordStore, manual_id: &str) -> Result<bool> {
        Ok(store.get(COLLECTION, manual_id)?.is_some())
    }

    /// Write if the stored version still matches this snapshot, then bump it.
    pub fn save(&mut self, store: &dyn RecordStore) -> Result<()> {
        let stored: Option<OnboardingProgress> = store::get_typed(store, COLLECTION, &self.progress_id)?;
        if let Some(stored) = stored {
            if stored.version != self.version {
                tracing::warn!(
                    progress = %self.progress_id,
                    expected = self.version,
                    found = stored.version,
                    "rejecting stale progress write"
                );
                return Err(RelishError::StaleProgress {
                    id: self.progress_id.clone(),
                    expected: self.version,
                    found: stored.version,
                });
            }
        }
        self.version += 1;
        if let Err(e) = store::set_typed(store, COLLECTION, &self.progress_id, self) {
            self.version -= 1;
            return Err(e);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PhasePlan
// ---------------------------------------------------------------------------

/// Which layers each onboarding phase requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhasePlan {
    layout: BTreeMap<Phase, Vec<LayerId>>,
}

impl Default for PhasePlan {
    fn default() -> Self {
        Self {
            layout: default_layout(),
        }
    }
}

pub fn default_layout() -> BTreeMap<Phase, Vec<LayerId>> {
    BTreeMap::from([
        (Phase::Foundation, vec![LayerId::Values, LayerId::Regulation]),
        (
            Phase::Relationships,
            vec![LayerId::Boundaries, LayerId::Strategies],
        ),
        (Phase::Operations, vec![LayerId::Triggers]),
        (Phase::Strategy, vec![LayerId::Growth]),
    ])
}

impl PhasePlan {
    /// Every phase needs at least one layer and every layer belongs to
    /// exactly one phase.
    pub fn new(layout: BTreeMap<Phase, Vec<LayerId>>) -> Result<Self> {
        let mut seen: BTreeMap<LayerId, Phase> = BTreeMap::new();
        for &phase in Phase::all() {
            let layers = layout.get(&phase).map(Vec::as_slice).unwrap_or(&[]);
            if layers.is_empty() {
                return Err(RelishError::InvalidPhaseLayout(format!(
                    "phase '{phase}' requires no layers"
                )));
            }
            for &layer in layers {
                if let Some(other) = seen.insert(layer, phase) {
                    return Err(RelishError::InvalidPhaseLayout(format!(
                        "layer '{layer}' appears in both '{other}' and '{phase}'"
                    )));
                }
            }
        }
        if let Some(layer) = LayerId::all().iter().find(|l| !seen.contains_key(l)) {
            return Err(RelishError::InvalidPhaseLayout(format!(
                "layer '{layer}' is not assigned to any phase"
            )));
        }
        Ok(Self { layout })
    }

    pub fn layers_for(&self, phase: Phase) -> &[LayerId] {
        self.layout.get(&phase).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn phase_for(&self, layer: LayerId) -> Option<Phase> {
        self.layout
            .iter()
            .find(|(_, layers)| layers.contains(&layer))
            .map(|(&phase, _)| phase)
    }

    pub fn layout(&self) -> &BTreeMap<Phase, Vec<LayerId>> {
        &self.layout
    }
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "step", content = "phase", rename_all = "snake_case")]
pub enum NextStep {
    Phase(Phase),
    Launch,
    Done,
}

impl fmt::Display for NextStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NextStep::Phase(p) => write!(f, "{p}"),
            NextStep::Launch => f.write_str("launch"),
            NextStep::Done => f.write_str("done"),
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

pub const MIN_PHASES_FOR_LAUNCH: usize = 2;

#[derive(Debug, Clone)]
pub struct Aggregator {
    plan: PhasePlan,
    min_phases_for_launch: usize,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(PhasePlan::default(), MIN_PHASES_FOR_LAUNCH)
    }
}

impl Aggregator {
    pub fn new(plan: PhasePlan, min_phases_for_launch: usize) -> Self {
        Self {
            plan,
            min_phases_for_launch,
        }
    }

    pub fn plan(&self) -> &PhasePlan {
        &self.plan
    }

    pub fn min_phases_for_launch(&self) -> usize {
        self.min_phases_for_launch
    }

    /// Fold one evaluation into `progress`.
    ///
    /// Milestones are unioned, layer statuses replaced wholesale, and the
    /// current phase completes when every layer it requires is met. A layer
    /// missing from `statuses` counts as unmet. At most one phase completes
    /// per call. The current layer moves to the first incomplete one in
    /// onboarding order.
    pub fn advance<S: AsRef<str>>(
        &self,
        progress: &OnboardingProgress,
        newly_achieved: &[S],
        statuses: BTreeMap<LayerId, LayerOnboardingStatus>,
    ) -> OnboardingProgress {
        let now = Utc::now();
        let mut next = progress.clone();

        for id in newly_achieved {
            let id = id.as_ref();
            if !next.has_milestone(id) {
                next.milestones_achieved.push(MilestoneRecord {
                    id: id.to_string(),
                    achieved_at: now,
                    celebration_shown: false,
                });
            }
        }

        next.layer_statuses = statuses;
        next.overall_percent = overall_percent(&next.layer_statuses);
        next.completed_layers = completed_layers(&next.layer_statuses);
        next.current_layer = next_layer(&next.layer_statuses);

        if let Some(phase) = next.current_phase {
            if next.is_phase_completed(phase) {
                next.current_phase = self.first_open_phase(&next);
            } else if self.phase_met(phase, &next.layer_statuses) {
                next.phases_completed.push(phase);
                next.current_phase = self.first_open_phase(&next);
                tracing::info!(
                    manual = %next.manual_id,
                    phase = %phase,
                    next = ?next.current_phase,
                    "phase completed"
                );
            }
        }

        next.updated_at = now;
        next
    }

    fn phase_met(&self, phase: Phase, statuses: &BTreeMap<LayerId, LayerOnboardingStatus>) -> bool {
        self.plan
            .layers_for(phase)
            .iter()
            .all(|layer| statuses.get(layer).is_some_and(|s| s.met))
    }

    fn first_open_phase(&self, progress: &OnboardingProgress) -> Option<Phase> {
        Phase::all()
            .iter()
            .copied()
            .find(|p| !progress.is_phase_completed(*p))
    }

    pub fn next_step(&self, progress: &OnboardingProgress) -> NextStep {
        if let Some(phase) = progress.current_phase {
            return NextStep::Phase(phase);
        }
        if let Some(phase) = self.first_open_phase(progress) {
            return NextStep::Phase(phase);
        }
        if !progress.launch_completed {
            return NextStep::Launch;
        }
        NextStep::Done
    }

    pub fn can_launch(&self, progress: &OnboardingProgress) -> bool {
        progress.phases_completed.len() >= self.min_phases_for_launch
    }

    /// Returns whether the flag changed.
    pub fn complete_launch(&self, progress: &mut OnboardingProgress) -> Result<bool> {
        if !self.can_launch(progress) {
            return Err(RelishError::LaunchNotReady {
                completed: progress.phases_completed.len(),
                required: self.min_phases_for_launch,
            });
        }
        if progress.launch_completed {
            return Ok(false);
        }
        progress.launch_completed = true;
        progress.updated_at = Utc::now();
        Ok(true)
    }

    /// Every layer complete and not graduated yet.
    pub fn can_graduate(&self, progress: &OnboardingProgress) -> bool {
        !progress.is_graduated() && progress.completed_layers.len() == LayerId::all().len()
    }

    /// Stamp graduation and queue its celebration again. Returns whether the
    /// progress changed.
    pub fn graduate(&self, progress: &mut OnboardingProgress) -> Result<bool> {
        if progress.is_graduated() {
            return Ok(false);
        }
        if !self.can_graduate(progress) {
            return Err(RelishError::GraduationNotReady {
                completed: progress.completed_layers.len(),
                required: LayerId::all().len(),
            });
        }
        let now = Utc::now();
        progress.graduated_at = Some(now);
        match progress
            .milestones_achieved
            .iter_mut()
            .find(|m| m.id == GRADUATION)
        {
            Some(record) => {
                record.achieved_at = now;
                record.celebration_shown = false;
            }
            None => progress.milestones_achieved.push(MilestoneRecord {
                id: GRADUATION.to_string(),
                achieved_at: now,
                celebration_shown: false,
            }),
        }
        progress.updated_at = now;
        Ok(true)
    }

    /// Mark a milestone's celebration as shown. Returns whether it changed.
    pub fn acknowledge(&self, progress: &mut OnboardingProgress, milestone_id: &str) -> Result<bool> {
        let record = progress
            .milestones_achieved
            .iter_mut()
            .find(|m| m.id == milestone_id)
            .ok_or_else(|| RelishError::MilestoneNotFound(milestone_id.to_string()))?;
        if record.celebration_shown {
            return Ok(false);
        }
        record.celebration_shown = true;
        progress.updated_at = Utc::now();
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn status(layer: LayerId, met: bool) -> LayerOnboardingStatus {
        LayerOnboardingStatus {
            layer,
            name: layer.display_name().to_string(),
            state: if met {
                LayerState::Complete
            } else {
                LayerState::InProgress
            },
            met,
            content_percent: if met { 100 } else { 50 },
            required_respondents: Vec::new(),
            completed_respondents: Vec::new(),
            perspective_percent: 100,
        }
    }

    fn statuses(met: &[LayerId]) -> BTreeMap<LayerId, LayerOnboardingStatus> {
        LayerId::all()
            .iter()
            .map(|&l| (l, status(l, met.contains(&l))))
            .collect()
    }

    fn progress() -> OnboardingProgress {
        let table = RequirementTable::builtin().unwrap();
        let manual = Manual::new("kid", "fam", ManualType::Child, "Kid");
        OnboardingProgress::new(&manual, &table)
    }

    const NONE: &[&str] = &[];

    #[test]
    fn new_progress_starts_at_foundation() {
        let p = progress();
        assert_eq!(p.current_phase, Some(Phase::Foundation));
        assert!(p.phases_completed.is_empty());
        assert_eq!(p.layer_statuses.len(), 6);
        assert!(p
            .layer_statuses
            .values()
            .all(|s| s.state == LayerState::NotStarted));
        assert_eq!(
            p.layer_statuses[&LayerId::Triggers].required_respondents,
            vec![RespondentType::Parent, RespondentType::Subject]
        );
    }

    #[test]
    fn phase_completes_when_its_layers_are_met() {
        let agg = Aggregator::default();
        let p = progress();
        let p = agg.advance(&p, NONE, statuses(&[LayerId::Values]));
        assert_eq!(p.current_phase, Some(Phase::Foundation));
        assert!(p.phases_completed.is_empty());

        let p = agg.advance(&p, NONE, statuses(&[LayerId::Values, LayerId::Regulation]));
        assert_eq!(p.phases_completed, vec![Phase::Foundation]);
        assert_eq!(p.current_phase, Some(Phase::Relationships));
    }

    #[test]
    fn relationships_advances_to_operations() {
        let agg = Aggregator::default();
        let mut p = progress();
        p.current_phase = Some(Phase::Relationships);
        p.phases_completed = vec![Phase::Foundation];

        let p = agg.advance(
            &p,
            NONE,
            statuses(&[
                LayerId::Values,
                LayerId::Regulation,
                LayerId::Boundaries,
                LayerId::Strategies,
            ]),
        );
        assert_eq!(p.phases_completed, vec![Phase::Foundation, Phase::Relationships]);
        assert_eq!(p.current_phase, Some(Phase::Operations));
    }

    #[test]
    fn missing_required_layer_is_not_met() {
        let agg = Aggregator::default();
        let mut p = progress();
        p.current_phase = Some(Phase::Operations);
        let mut s = statuses(&LayerId::all().to_vec());
        s.remove(&LayerId::Triggers);
        let p = agg.advance(&p, NONE, s);
        assert_eq!(p.current_phase, Some(Phase::Operations));
        assert!(p.phases_completed.is_empty());
    }

    #[test]
    fn at_most_one_phase_per_call() {
        let agg = Aggregator::default();
        let p = agg.advance(&progress(), NONE, statuses(LayerId::all()));
        assert_eq!(p.phases_completed, vec![Phase::Foundation]);
        let p = agg.advance(&p, NONE, statuses(LayerId::all()));
        let p = agg.advance(&p, NONE, statuses(LayerId::all()));
        let p = agg.advance(&p, NONE, statuses(LayerId::all()));
        assert_eq!(p.phases_completed, Phase::all().to_vec());
        assert_eq!(p.current_phase, None);
    }

    #[test]
    fn phases_completed_never_shrinks() {
        let agg = Aggregator::default();
        let p = agg.advance(&progress(), NONE, statuses(LayerId::all()));
        let p = agg.advance(&p, NONE, statuses(&[]));
        assert_eq!(p.phases_completed, vec![Phase::Foundation]);
        assert!(!p.layer_statuses[&LayerId::Values].met);
    }

    #[test]
    fn current_layer_follows_onboarding_order() {
        let agg = Aggregator::default();
        let p = progress();
        assert_eq!(p.current_layer, Some(LayerId::Values));
        assert!(p.completed_layers.is_empty());

        let p = agg.advance(&p, NONE, statuses(&[LayerId::Values, LayerId::Triggers]));
        assert_eq!(p.current_layer, Some(LayerId::Growth));
        assert_eq!(p.completed_layers, vec![LayerId::Values, LayerId::Triggers]);

        let p = agg.advance(&p, NONE, statuses(LayerId::all()));
        assert_eq!(p.current_layer, None);
        assert_eq!(p.completed_layers, LayerId::onboarding_order().to_vec());
    }

    #[test]
    fn met_without_perspective_is_not_a_completed_layer() {
        let agg = Aggregator::default();
        let mut s = statuses(&[]);
        let values = s.get_mut(&LayerId::Values).unwrap();
        values.met = true;
        values.content_percent = 100;
        values.perspective_percent = 0;
        values.state = LayerState::InProgress;

        let p = agg.advance(&progress(), NONE, s);
        assert!(p.completed_layers.is_empty());
        assert_eq!(p.current_layer, Some(LayerId::Values));
        assert!(!p.is_layer_complete(LayerId::Values));
    }

    #[test]
    fn graduation_requires_every_layer_complete() {
        let agg = Aggregator::default();
        let mut p = agg.advance(&progress(), NONE, statuses(&[LayerId::Values]));
        assert!(!agg.can_graduate(&p));
        assert!(matches!(
            agg.graduate(&mut p),
            Err(RelishError::GraduationNotReady {
                completed: 1,
                required: 6
            })
        ));
        assert!(p.graduated_at.is_none());

        let mut p = agg.advance(&p, &["graduation"], statuses(LayerId::all()));
        agg.acknowledge(&mut p, "graduation").unwrap();
        assert!(agg.can_graduate(&p));
        assert!(agg.graduate(&mut p).unwrap());
        assert!(p.is_graduated());
        assert!(!agg.can_graduate(&p));

        let records: Vec<&MilestoneRecord> = p
            .milestones_achieved
            .iter()
            .filter(|m| m.id == "graduation")
            .collect();
        assert_eq!(records.len(), 1);
        assert!(!records[0].celebration_shown);

        let stamped = p.graduated_at;
        assert!(!agg.graduate(&mut p).unwrap());
        assert_eq!(p.graduated_at, stamped);
    }

    #[test]
    fn graduation_records_milestone_when_missing() {
        let agg = Aggregator::default();
        let mut p = agg.advance(&progress(), NONE, statuses(LayerId::all()));
        assert!(!p.has_milestone("graduation"));
        agg.graduate(&mut p).unwrap();
        assert!(p.has_milestone("graduation"));
    }

    #[test]
    fn skips_phases_already_completed() {
        let agg = Aggregator::default();
        let mut p = progress();
        p.phases_completed = vec![Phase::Relationships];
        let p = agg.advance(&p, NONE, statuses(&[LayerId::Values, LayerId::Regulation]));
        assert_eq!(p.phases_completed, vec![Phase::Relationships, Phase::Foundation]);
        assert_eq!(p.current_phase, Some(Phase::Operations));
    }

    #[test]
    fn milestones_are_unioned_once() {
        let agg = Aggregator::default();
        let p = agg.advance(&progress(), &["first-layer"], statuses(&[]));
        let p = agg.advance(&p, &["first-layer", "halfway"], statuses(&[]));
        let ids: Vec<&str> = p.milestones_achieved.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["first-layer", "halfway"]);
    }

    #[test]
    fn launch_is_never_set_by_advance() {
        let agg = Aggregator::default();
        let mut p = progress();
        for _ in 0..4 {
            p = agg.advance(&p, NONE, statuses(LayerId::all()));
        }
        assert!(!p.launch_completed);
        assert_eq!(agg.next_step(&p), NextStep::Launch);
    }

    #[test]
    fn launch_requires_minimum_phases() {
        let agg = Aggregator::default();
        let mut p = progress();
        let err = agg.complete_launch(&mut p).unwrap_err();
        assert!(matches!(
            err,
            RelishError::LaunchNotReady {
                completed: 0,
                required: 2
            }
        ));
        p.phases_completed = vec![Phase::Foundation, Phase::Relationships];
        assert!(agg.can_launch(&p));
        assert!(agg.complete_launch(&mut p).unwrap());
        assert!(!agg.complete_launch(&mut p).unwrap());
        assert!(p.launch_completed);
    }

    #[test]
    fn next_step_routing() {
        let agg = Aggregator::default();
        let mut p = progress();
        assert_eq!(agg.next_step(&p), NextStep::Phase(Phase::Foundation));

        p.current_phase = None;
        p.phases_completed = vec![Phase::Foundation];
        assert_eq!(agg.next_step(&p), NextStep::Phase(Phase::Relationships));

        p.phases_completed = Phase::all().to_vec();
        assert_eq!(agg.next_step(&p), NextStep::Launch);

        p.launch_completed = true;
        assert_eq!(agg.next_step(&p), NextStep::Done);
        assert_eq!(NextStep::Done.to_string(), "done");
    }

    #[test]
    fn acknowledge_marks_celebration_shown() {
        let agg = Aggregator::default();
        let mut p = agg.advance(&progress(), &["first-layer"], statuses(&[]));
        assert!(agg.acknowledge(&mut p, "first-layer").unwrap());
        assert!(!agg.acknowledge(&mut p, "first-layer").unwrap());
        assert!(p.milestones_achieved[0].celebration_shown);
        assert!(matches!(
            agg.acknowledge(&mut p, "graduation"),
            Err(RelishError::MilestoneNotFound(_))
        ));
    }

    #[test]
    fn phase_plan_validation() {
        PhasePlan::new(default_layout()).unwrap();

        let mut layout = default_layout();
        layout.insert(Phase::Strategy, vec![LayerId::Growth, LayerId::Values]);
        assert!(matches!(
            PhasePlan::new(layout),
            Err(RelishError::InvalidPhaseLayout(_))
        ));

        let mut layout = default_layout();
        layout.insert(Phase::Strategy, Vec::new());
        assert!(PhasePlan::new(layout).is_err());

        let mut layout = default_layout();
        layout.insert(Phase::Operations, vec![LayerId::Growth]);
        layout.insert(Phase::Strategy, vec![LayerId::Growth]);
        assert!(PhasePlan::new(layout).is_err());
    }

    #[test]
    fn phase_for_layer() {
        let plan = PhasePlan::default();
        assert_eq!(plan.phase_for(LayerId::Triggers), Some(Phase::Operations));
        assert_eq!(plan.phase_for(LayerId::Values), Some(Phase::Foundation));
    }

    #[test]
    fn perspective_and_overall_percent() {
        use crate::types::RespondentType::{Parent, Partner, Subject};
        let contributed = BTreeSet::from([Parent]);
        assert_eq!(perspective_percent(&[], &contributed), 100);
        assert_eq!(perspective_percent(&[Parent, Subject], &contributed), 50);
        assert_eq!(perspective_percent(&[Parent, Subject, Partner], &contributed), 33);

        let mut s = statuses(&[]);
        assert_eq!(overall_percent(&s), 75);
        for st in s.values_mut() {
            st.content_percent = 0;
            st.perspective_percent = 0;
        }
        assert_eq!(overall_percent(&s), 0);
        assert_eq!(overall_percent(&BTreeMap::new()), 0);
    }

    #[test]
    fn save_rejects_stale_snapshot() {
        let store = MemoryStore::new();
        let mut first = progress();
        first.save(&store).unwrap();
        assert_eq!(first.version, 1);

        let mut stale = OnboardingProgress::load(&store, "kid").unwrap();
        first.launch_completed = true;
        first.save(&store).unwrap();
        assert_eq!(first.version, 2);

        stale.overall_percent = 10;
        let err = stale.save(&store).unwrap_err();
        assert!(matches!(
            err,
            RelishError::StaleProgress {
                expected: 1,
                found: 2,
                ..
            }
        ));
        assert_eq!(stale.version, 1);
        assert!(OnboardingProgress::load(&store, "kid").unwrap().launch_completed);
    }

    #[test]
    fn load_missing_progress() {
        let store = MemoryStore::new();
        assert!(matches!(
            OnboardingProgress::load(&store, "kid"),
            Err(RelishError::ProgressNotFound(_))
        ));
        assert!(!OnboardingProgress::exists(&store, "kid").unwrap());
    }
}

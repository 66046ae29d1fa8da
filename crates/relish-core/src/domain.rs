use crate::baseline::LayerBaselineStatus;
use crate::error::RelishError;
use crate::types::LayerId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ---------------------------------------------------------------------------
// FocusDomain
// ---------------------------------------------------------------------------

/// Area of family life a planning session can focus on. Each one is gated on
/// the baselines of the layers it draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusDomain {
    PhysicalEnvironment,
    BehaviorBoundaries,
    PartnerDynamics,
    RoutinesRituals,
    SelfRegulation,
    ValuesAlignment,
}

impl FocusDomain {
    pub fn all() -> &'static [FocusDomain] {
        &[
            FocusDomain::PhysicalEnvironment,
            FocusDomain::BehaviorBoundaries,
            FocusDomain::PartnerDynamics,
            FocusDomain::RoutinesRituals,
            FocusDomain::SelfRegulation,
            FocusDomain::ValuesAlignment,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FocusDomain::PhysicalEnvironment => "physical_environment",
            FocusDomain::BehaviorBoundaries => "behavior_boundaries",
            FocusDomain::PartnerDynamics => "partner_dynamics",
            FocusDomain::RoutinesRituals => "routines_rituals",
            FocusDomain::SelfRegulation => "self_regulation",
            FocusDomain::ValuesAlignment => "values_alignment",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FocusDomain::PhysicalEnvironment => "Physical Environment",
            FocusDomain::BehaviorBoundaries => "Behavior & Boundaries",
            FocusDomain::PartnerDynamics => "Partner Dynamics",
            FocusDomain::RoutinesRituals => "Routines & Rituals",
            FocusDomain::SelfRegulation => "Self-Regulation",
            FocusDomain::ValuesAlignment => "Values Alignment",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            FocusDomain::PhysicalEnvironment => "Sanctuary zones, organization",
            FocusDomain::BehaviorBoundaries => "Child behavior, sibling dynamics",
            FocusDomain::PartnerDynamics => "Communication, fair play",
            FocusDomain::RoutinesRituals => "Daily/weekly rhythms",
            FocusDomain::SelfRegulation => "Managing stress and big feelings",
            FocusDomain::ValuesAlignment => "Living out what matters most",
        }
    }

    /// Layers whose baselines must be met before the domain opens.
    pub fn required_layers(self) -> &'static [LayerId] {
        use LayerId::*;
        match self {
            FocusDomain::PhysicalEnvironment => &[Values, Triggers],
            FocusDomain::BehaviorBoundaries => &[Values, Triggers, Boundaries],
            FocusDomain::PartnerDynamics => &[Values, Regulation, Strategies],
            FocusDomain::RoutinesRituals => &[Values, Strategies],
            FocusDomain::SelfRegulation => &[Values, Triggers, Strategies],
            FocusDomain::ValuesAlignment => &[Values],
        }
    }
}

impl fmt::Display for FocusDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FocusDomain {
    type Err = RelishError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.replace('-', "_");
        FocusDomain::all()
            .iter()
            .copied()
            .find(|d| d.as_str() == normalized)
            .ok_or_else(|| RelishError::InvalidDomain(s.to_string()))
    }
}

/// Union of the layers `domains` require, in canonical order.
pub fn required_layers_for(domains: &[FocusDomain]) -> Vec<LayerId> {
    domains
        .iter()
        .flat_map(|d| d.required_layers().iter().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

// ---------------------------------------------------------------------------
// Gating
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingRequirement {
    pub layer: LayerId,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainStatus {
    pub domain: FocusDomain,
    pub name: &'static str,
    pub description: &'static str,
    pub required_layers: Vec<LayerId>,
    pub complete: bool,
    pub completion_percent: u8,
    pub missing: Vec<MissingRequirement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockedDomain {
    pub domain: FocusDomain,
    pub missing_count: usize,
}

fn rounded_mean(values: &[u8]) -> u8 {
    if values.is_empty() {
        return 100;
    }
    let sum: u32 = values.iter().map(|&v| u32::from(v)).sum();
    (f64::from(sum) / values.len() as f64).round() as u8
}

/// A required layer absent from `baselines` counts as 0% and blocks the domain.
pub fn domain_status(
    baselines: &BTreeMap<LayerId, LayerBaselineStatus>,
    domain: FocusDomain,
) -> DomainStatus {
    let required = domain.required_layers();
    let mut percents = Vec::with_capacity(required.len());
    let mut missing = Vec::new();

    for &layer in required {
        match baselines.get(&layer) {
            Some(b) => {
                percents.push(b.percent_complete);
                missing.extend(b.missing.iter().map(|m| MissingRequirement {
                    layer,
                    message: m.clone(),
                }));
            }
            None => {
                percents.push(0);
                missing.push(MissingRequirement {
                    layer,
                    message: "layer not evaluated".to_string(),
                });
            }
        }
    }

    DomainStatus {
        domain,
        name: domain.label(),
        description: domain.description(),
        required_layers: required.to_vec(),
        complete: missing.is_empty(),
        completion_percent: rounded_mean(&percents),
        missing,
    }
}

pub fn all_statuses(baselines: &BTreeMap<LayerId, LayerBaselineStatus>) -> Vec<DomainStatus> {
    FocusDomain::all()
        .iter()
        .map(|&d| domain_status(baselines, d))
        .collect()
}

pub fn available_domains(baselines: &BTreeMap<LayerId, LayerBaselineStatus>) -> Vec<FocusDomain> {
    all_statuses(baselines)
        .into_iter()
        .filter(|s| s.complete)
        .map(|s| s.domain)
        .collect()
}

pub fn blocked_domains(baselines: &BTreeMap<LayerId, LayerBaselineStatus>) -> Vec<BlockedDomain> {
    all_statuses(baselines)
        .into_iter()
        .filter(|s| !s.complete)
        .map(|s| BlockedDomain {
            domain: s.domain,
            missing_count: s.missing.len(),
        })
        .collect()
}

/// Rounded mean completion over all six layers; unevaluated layers count as 0.
pub fn baseline_health(baselines: &BTreeMap<LayerId, LayerBaselineStatus>) -> u8 {
    let percents: Vec<u8> = LayerId::all()
        .iter()
        .map(|l| baselines.get(l).map(|b| b.percent_complete).unwrap_or(0))
        .collect();
    rounded_mean(&percents)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::BaselineEvaluator;
    use crate::manual::{ContentItem, Manual};
    use crate::requirements::RequirementTable;
    use crate::types::{ContentKind, ManualType};

    fn household_with_charter() -> Manual {
        let mut m = Manual::new("home", "fam", ManualType::Household, "Home");
        m.add_item(ContentKind::Mission, ContentItem::new("a calm, kind home"))
            .unwrap();
        for text in ["no hitting", "screens off at 8", "family dinner"] {
            m.add_item(ContentKind::NonNegotiables, ContentItem::new(text))
                .unwrap();
        }
        m
    }

    #[test]
    fn values_alignment_opens_with_the_charter() {
        let table = RequirementTable::builtin().unwrap();
        let b = BaselineEvaluator::new(&table).evaluate_all(&household_with_charter());

        let status = domain_status(&b, FocusDomain::ValuesAlignment);
        assert!(status.complete);
        assert_eq!(status.completion_percent, 100);
        assert_eq!(available_domains(&b), vec![FocusDomain::ValuesAlignment]);

        let physical = domain_status(&b, FocusDomain::PhysicalEnvironment);
        assert!(!physical.complete);
        assert_eq!(physical.completion_percent, 50);
        assert_eq!(physical.missing.len(), 2);
        assert!(physical.missing.iter().all(|m| m.layer == LayerId::Triggers));
    }

    #[test]
    fn blocked_domains_count_missing_requirements() {
        let table = RequirementTable::builtin().unwrap();
        let b = BaselineEvaluator::new(&table).evaluate_all(&household_with_charter());
        let blocked = blocked_domains(&b);
        assert_eq!(blocked.len(), 5);
        let partner = blocked
            .iter()
            .find(|d| d.domain == FocusDomain::PartnerDynamics)
            .unwrap();
        // sync + repair + rituals + fair_play
        assert_eq!(partner.missing_count, 4);
    }

    #[test]
    fn unevaluated_layer_blocks_domain() {
        let b = BTreeMap::new();
        let status = domain_status(&b, FocusDomain::ValuesAlignment);
        assert!(!status.complete);
        assert_eq!(status.completion_percent, 0);
        assert_eq!(baseline_health(&b), 0);
    }

    #[test]
    fn baseline_health_is_rounded_mean() {
        let table = RequirementTable::builtin().unwrap();
        let b = BaselineEvaluator::new(&table).evaluate_all(&household_with_charter());
        // 100 for the charter, 0 elsewhere
        assert_eq!(baseline_health(&b), 17);
    }

    #[test]
    fn required_layers_union_is_sorted() {
        let layers = required_layers_for(&[
            FocusDomain::PartnerDynamics,
            FocusDomain::PhysicalEnvironment,
        ]);
        assert_eq!(
            layers,
            vec![
                LayerId::Triggers,
                LayerId::Regulation,
                LayerId::Strategies,
                LayerId::Values
            ]
        );
    }

    #[test]
    fn parse_domain() {
        assert_eq!(
            "self-regulation".parse::<FocusDomain>().unwrap(),
            FocusDomain::SelfRegulation
        );
        assert!(matches!(
            "chores".parse::<FocusDomain>(),
            Err(RelishError::InvalidDomain(_))
        ));
    }
}

use crate::error::RelishError;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// ManualType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManualType {
    Child,
    Adult,
    Marriage,
    Household,
    Person,
}

impl ManualType {
    pub fn all() -> &'static [ManualType] {
        &[
            ManualType::Child,
            ManualType::Adult,
            ManualType::Marriage,
            ManualType::Household,
            ManualType::Person,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ManualType::Child => "child",
            ManualType::Adult => "adult",
            ManualType::Marriage => "marriage",
            ManualType::Household => "household",
            ManualType::Person => "person",
        }
    }
}

impl fmt::Display for ManualType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ManualType {
    type Err = RelishError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ManualType::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| RelishError::InvalidManualType(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// LayerId
// ---------------------------------------------------------------------------

/// The six content layers of a manual, L1 (inputs) through L6 (values).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerId {
    Triggers,
    Regulation,
    Boundaries,
    Strategies,
    Growth,
    Values,
}

impl LayerId {
    /// Canonical order, L1 first.
    pub fn all() -> &'static [LayerId] {
        &[
            LayerId::Triggers,
            LayerId::Regulation,
            LayerId::Boundaries,
            LayerId::Strategies,
            LayerId::Growth,
            LayerId::Values,
        ]
    }

    /// Onboarding walks the layers top-down: values first, triggers last.
    pub fn onboarding_order() -> &'static [LayerId] {
        &[
            LayerId::Values,
            LayerId::Growth,
            LayerId::Strategies,
            LayerId::Boundaries,
            LayerId::Regulation,
            LayerId::Triggers,
        ]
    }

    pub fn number(self) -> u8 {
        self as u8 + 1
    }

    pub fn from_number(n: u8) -> Option<LayerId> {
        LayerId::all().get(usize::from(n).checked_sub(1)?).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LayerId::Triggers => "triggers",
            LayerId::Regulation => "regulation",
            LayerId::Boundaries => "boundaries",
            LayerId::Strategies => "strategies",
            LayerId::Growth => "growth",
            LayerId::Values => "values",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            LayerId::Triggers => "Inputs & Triggers",
            LayerId::Regulation => "Processing & Co-Regulation",
            LayerId::Boundaries => "Memory & Structure",
            LayerId::Strategies => "Execution & Strategies",
            LayerId::Growth => "Outputs & Growth",
            LayerId::Values => "Values & Principles",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            LayerId::Triggers => "What sets us off - triggers, sensory sensitivities, warning signs",
            LayerId::Regulation => {
                "How we help each other regulate - co-regulation needs, communication style"
            }
            LayerId::Boundaries => {
                "What boundaries and structures support us - routines, expectations"
            }
            LayerId::Strategies => "What works and doesn't work - strategies, daily routines",
            LayerId::Growth => {
                "What does flourishing look like - goals, aspirations, signs of thriving"
            }
            LayerId::Values => "What matters most - core values, guiding principles, non-negotiables",
        }
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LayerId {
    type Err = RelishError;

    /// Accepts the layer name ("triggers") or its number ("1", "l1").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        let digits = lower.strip_prefix('l').unwrap_or(&lower);
        if let Ok(n) = digits.parse::<u8>() {
            return LayerId::from_number(n).ok_or_else(|| RelishError::InvalidLayer(s.to_string()));
        }
        LayerId::all()
            .iter()
            .copied()
            .find(|l| l.as_str() == lower)
            .ok_or_else(|| RelishError::InvalidLayer(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Foundation,
    Relationships,
    Operations,
    Strategy,
}

impl Phase {
    pub fn all() -> &'static [Phase] {
        &[
            Phase::Foundation,
            Phase::Relationships,
            Phase::Operations,
            Phase::Strategy,
        ]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Option<Phase> {
        Phase::all().get(self.index() + 1).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Foundation => "foundation",
            Phase::Relationships => "relationships",
            Phase::Operations => "operations",
            Phase::Strategy => "strategy",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Phase::Foundation => "Foundation",
            Phase::Relationships => "Relationships",
            Phase::Operations => "Operations",
            Phase::Strategy => "Strategy",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Phase::Foundation => "Your values, identity, and how you communicate",
            Phase::Relationships => "How you connect and share responsibilities",
            Phase::Operations => "Your spaces, systems, and how you handle change",
            Phase::Strategy => "How you solve problems and manage resources",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Phase {
    type Err = RelishError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Phase::all()
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| RelishError::InvalidPhase(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// RespondentType
// ---------------------------------------------------------------------------

/// Whose perspective a piece of content records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RespondentType {
    Parent,
    Partner,
    /// The manual's subject speaking for themselves.
    #[serde(rename = "self")]
    Subject,
    Child,
    Sibling,
    Caregiver,
}

impl RespondentType {
    pub fn all() -> &'static [RespondentType] {
        &[
            RespondentType::Parent,
            RespondentType::Partner,
            RespondentType::Subject,
            RespondentType::Child,
            RespondentType::Sibling,
            RespondentType::Caregiver,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RespondentType::Parent => "parent",
            RespondentType::Partner => "partner",
            RespondentType::Subject => "self",
            RespondentType::Child => "child",
            RespondentType::Sibling => "sibling",
            RespondentType::Caregiver => "caregiver",
        }
    }
}

impl fmt::Display for RespondentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RespondentType {
    type Err = RelishError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RespondentType::all()
            .iter()
            .copied()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| RelishError::InvalidRespondent(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// ContentKind
// ---------------------------------------------------------------------------

/// A named content collection inside a manual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Values,
    Principles,
    Goals,
    Thriving,
    Strategies,
    Avoid,
    Routines,
    Boundaries,
    Regulation,
    Coregulation,
    Communication,
    Repair,
    Triggers,
    WarningSigns,
    Mission,
    NonNegotiables,
    Rituals,
    FairPlay,
    Sync,
    Zones,
}

impl ContentKind {
    pub fn all() -> &'static [ContentKind] {
        &[
            ContentKind::Values,
            ContentKind::Principles,
            ContentKind::Goals,
            ContentKind::Thriving,
            ContentKind::Strategies,
            ContentKind::Avoid,
            ContentKind::Routines,
            ContentKind::Boundaries,
            ContentKind::Regulation,
            ContentKind::Coregulation,
            ContentKind::Communication,
            ContentKind::Repair,
            ContentKind::Triggers,
            ContentKind::WarningSigns,
            ContentKind::Mission,
            ContentKind::NonNegotiables,
            ContentKind::Rituals,
            ContentKind::FairPlay,
            ContentKind::Sync,
            ContentKind::Zones,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Values => "values",
            ContentKind::Principles => "principles",
            ContentKind::Goals => "goals",
            ContentKind::Thriving => "thriving",
            ContentKind::Strategies => "strategies",
            ContentKind::Avoid => "avoid",
            ContentKind::Routines => "routines",
            ContentKind::Boundaries => "boundaries",
            ContentKind::Regulation => "regulation",
            ContentKind::Coregulation => "coregulation",
            ContentKind::Communication => "communication",
            ContentKind::Repair => "repair",
            ContentKind::Triggers => "triggers",
            ContentKind::WarningSigns => "warning_signs",
            ContentKind::Mission => "mission",
            ContentKind::NonNegotiables => "non_negotiables",
            ContentKind::Rituals => "rituals",
            ContentKind::FairPlay => "fair_play",
            ContentKind::Sync => "sync",
            ContentKind::Zones => "zones",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContentKind {
    type Err = RelishError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.replace('-', "_");
        ContentKind::all()
            .iter()
            .copied()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| RelishError::InvalidContentKind(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_numbers_follow_canonical_order() {
        for (i, layer) in LayerId::all().iter().enumerate() {
            assert_eq!(layer.number() as usize, i + 1);
            assert_eq!(LayerId::from_number(layer.number()), Some(*layer));
        }
        assert_eq!(LayerId::from_number(0), None);
        assert_eq!(LayerId::from_number(7), None);
    }

    #[test]
    fn layer_parses_name_or_number() {
        assert_eq!("triggers".parse::<LayerId>().unwrap(), LayerId::Triggers);
        assert_eq!("6".parse::<LayerId>().unwrap(), LayerId::Values);
        assert_eq!("L4".parse::<LayerId>().unwrap(), LayerId::Strategies);
        assert!(matches!(
            "l9".parse::<LayerId>(),
            Err(RelishError::InvalidLayer(_))
        ));
        assert!("feelings".parse::<LayerId>().is_err());
    }

    #[test]
    fn onboarding_order_starts_with_values() {
        let order = LayerId::onboarding_order();
        assert_eq!(order.first(), Some(&LayerId::Values));
        assert_eq!(order.last(), Some(&LayerId::Triggers));
        assert_eq!(order.len(), LayerId::all().len());
    }

    #[test]
    fn phase_sequence() {
        assert_eq!(Phase::Foundation.next(), Some(Phase::Relationships));
        assert_eq!(Phase::Operations.next(), Some(Phase::Strategy));
        assert_eq!(Phase::Strategy.next(), None);
        assert_eq!("operations".parse::<Phase>().unwrap(), Phase::Operations);
        assert!("launch".parse::<Phase>().is_err());
    }

    #[test]
    fn respondent_self_serializes_as_self() {
        let yaml = serde_yaml::to_string(&RespondentType::Subject).unwrap();
        assert_eq!(yaml.trim(), "self");
        assert_eq!(
            "self".parse::<RespondentType>().unwrap(),
            RespondentType::Subject
        );
    }

    #[test]
    fn content_kind_accepts_hyphens() {
        assert_eq!(
            "warning-signs".parse::<ContentKind>().unwrap(),
            ContentKind::WarningSigns
        );
        assert_eq!(
            "non_negotiables".parse::<ContentKind>().unwrap(),
            ContentKind::NonNegotiables
        );
    }

    #[test]
    fn serde_names_match_as_str() {
        for kind in ContentKind::all() {
            let yaml = serde_yaml::to_string(kind).unwrap();
            assert_eq!(yaml.trim(), kind.as_str());
        }
        for layer in LayerId::all() {
            let yaml = serde_yaml::to_string(layer).unwrap();
            assert_eq!(yaml.trim(), layer.as_str());
        }
    }
}

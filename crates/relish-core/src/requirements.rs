use crate::error::{RelishError, Result};
use crate::manual::{BoundaryCategory, ContentItem, Manual, ManualContent};
use crate::types::{ContentKind, LayerId, ManualType, RespondentType};
use std::collections::{BTreeMap, HashSet};

// ---------------------------------------------------------------------------
// Quality predicates
// ---------------------------------------------------------------------------

/// Narrows a requirement to items that satisfy a predicate.
#[derive(Debug, Clone, Copy)]
pub struct Quality {
    pub label: &'static str,
    pub matches: fn(&ContentItem) -> bool,
}

fn severity_rated(item: &ContentItem) -> bool {
    item.severity.is_some()
}

fn marked_effective(item: &ContentItem) -> bool {
    item.effective
}

fn immovable(item: &ContentItem) -> bool {
    item.boundary == Some(BoundaryCategory::Immovable)
}

fn negotiable(item: &ContentItem) -> bool {
    item.boundary == Some(BoundaryCategory::Negotiable)
}

pub const SEVERITY_RATED: Quality = Quality {
    label: "severity rated",
    matches: severity_rated,
};

pub const MARKED_EFFECTIVE: Quality = Quality {
    label: "marked effective",
    matches: marked_effective,
};

pub const IMMOVABLE: Quality = Quality {
    label: "immovable",
    matches: immovable,
};

pub const NEGOTIABLE: Quality = Quality {
    label: "negotiable",
    matches: negotiable,
};

// ---------------------------------------------------------------------------
// ContentRequirement
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ContentRequirement {
    pub id: &'static str,
    pub description: &'static str,
    pub kind: ContentKind,
    pub minimum: usize,
    pub quality: Option<Quality>,
}

impl ContentRequirement {
    /// Number of items in `manual` that count toward this requirement.
    pub fn count(&self, manual: &Manual) -> usize {
        let items = manual.items(self.kind);
        match self.quality {
            Some(q) => items.iter().filter(|i| (q.matches)(i)).count(),
            None => items.len(),
        }
    }

    /// Short name used in "missing" messages, e.g. `triggers (severity rated)`.
    pub fn label(&self) -> String {
        match self.quality {
            Some(q) => format!("{} ({})", self.kind, q.label),
            None => self.kind.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// LayerRequirement
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LayerRequirement {
    pub layer: LayerId,
    pub name: &'static str,
    pub content: Vec<ContentRequirement>,
    /// Perspectives the layer asks for. Empty means any single contributor.
    pub respondents: &'static [RespondentType],
}

impl LayerRequirement {
    pub fn new(layer: LayerId, content: Vec<ContentRequirement>) -> Self {
        Self {
            layer,
            name: layer.display_name(),
            content,
            respondents: &[],
        }
    }

    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn asking(mut self, respondents: &'static [RespondentType]) -> Self {
        self.respondents = respondents;
        self
    }

    pub fn kinds(&self) -> Vec<ContentKind> {
        let mut kinds: Vec<ContentKind> = Vec::new();
        for req in &self.content {
            if !kinds.contains(&req.kind) {
                kinds.push(req.kind);
            }
        }
        kinds
    }
}

// ---------------------------------------------------------------------------
// RequirementTable
// ---------------------------------------------------------------------------

/// Immutable (manual type, layer) → requirements mapping.
///
/// Construction checks that every pair has exactly one entry and that every
/// requirement names content its manual type carries, so lookups never fall
/// back to an implicit empty layer.
#[derive(Debug, Clone)]
pub struct RequirementTable {
    entries: BTreeMap<(ManualType, LayerId), LayerRequirement>,
}

impl RequirementTable {
    pub fn new(entries: Vec<(ManualType, LayerRequirement)>) -> Result<Self> {
        let mut map = BTreeMap::new();
        let mut ids = HashSet::new();

        for (manual_type, layer_req) in entries {
            for req in &layer_req.content {
                if !ids.insert(req.id) {
                    return Err(RelishError::InvalidRequirement {
                        id: req.id.to_string(),
                        reason: "duplicate requirement id".to_string(),
                    });
                }
                if req.minimum == 0 {
                    return Err(RelishError::InvalidRequirement {
                        id: req.id.to_string(),
                        reason: "minimum must be at least 1".to_string(),
                    });
                }
                if !ManualContent::carries(manual_type, req.kind) {
                    return Err(RelishError::InvalidRequirement {
                        id: req.id.to_string(),
                        reason: format!("{manual_type} manuals do not carry '{}'", req.kind),
                    });
                }
            }
            let key = (manual_type, layer_req.layer);
            if map.insert(key, layer_req).is_some() {
                return Err(RelishError::InvalidRequirement {
                    id: format!("{}/{}", key.0, key.1),
                    reason: "duplicate layer entry".to_string(),
                });
            }
        }

        for &manual_type in ManualType::all() {
            for &layer in LayerId::all() {
                if !map.contains_key(&(manual_type, layer)) {
                    return Err(RelishError::UnknownLayer {
                        manual_type: manual_type.to_string(),
                        layer: layer.to_string(),
                    });
                }
            }
        }

        Ok(Self { entries: map })
    }

    pub fn builtin() -> Result<Self> {
        Self::new(builtin_entries())
    }

    pub fn layer(&self, manual_type: ManualType, layer: LayerId) -> Option<&LayerRequirement> {
        self.entries.get(&(manual_type, layer))
    }

    /// Requirements in declaration order.
    pub fn requirements_for(&self, manual_type: ManualType, layer: LayerId) -> &[ContentRequirement] {
        self.layer(manual_type, layer)
            .map(|l| l.content.as_slice())
            .unwrap_or(&[])
    }

    pub fn layer_name(&self, manual_type: ManualType, layer: LayerId) -> &'static str {
        self.layer(manual_type, layer)
            .map(|l| l.name)
            .unwrap_or_else(|| layer.display_name())
    }
}

// ---------------------------------------------------------------------------
// Built-in tables
// ---------------------------------------------------------------------------

macro_rules! req {
    ($id:expr, $desc:expr, $kind:ident >= $min:expr) => {
        ContentRequirement {
            id: $id,
            description: $desc,
            kind: ContentKind::$kind,
            minimum: $min,
            quality: None,
        }
    };
    ($id:expr, $desc:expr, $kind:ident >= $min:expr, $quality:expr) => {
        ContentRequirement {
            id: $id,
            description: $desc,
            kind: ContentKind::$kind,
            minimum: $min,
            quality: Some($quality),
        }
    };
}

use crate::types::RespondentType::{Parent, Partner, Subject};

fn child_entries() -> Vec<LayerRequirement> {
    vec![
        LayerRequirement::new(
            LayerId::Values,
            vec![
                req!("child-values", "Core values documented", Values >= 2),
                req!("child-principles", "Guiding principles identified", Principles >= 1),
            ],
        )
        .asking(&[Parent]),
        LayerRequirement::new(
            LayerId::Growth,
            vec![
                req!("child-growth-goals", "Growth goals defined", Goals >= 2),
                req!("child-thriving-signs", "Signs of thriving identified", Thriving >= 1),
            ],
        )
        .asking(&[Parent]),
        LayerRequirement::new(
            LayerId::Strategies,
            vec![
                req!("child-what-works", "What works strategies", Strategies >= 2),
                req!("child-what-doesnt", "What doesn't work documented", Avoid >= 2),
            ],
        )
        .asking(&[Parent, Subject]),
        LayerRequirement::new(
            LayerId::Boundaries,
            vec![req!("child-boundaries", "Boundaries defined", Boundaries >= 1)],
        )
        .asking(&[Parent]),
        LayerRequirement::new(
            LayerId::Regulation,
            vec![
                req!("child-regulation", "Regulation approach documented", Regulation >= 1),
                req!("child-coregulation", "Co-regulation needs identified", Coregulation >= 1),
            ],
        )
        .asking(&[Parent]),
        LayerRequirement::new(
            LayerId::Triggers,
            vec![
                req!("child-triggers", "Triggers documented", Triggers >= 3),
                req!(
                    "child-trigger-severity",
                    "Trigger severity rated",
                    Triggers >= 1,
                    SEVERITY_RATED
                ),
            ],
        )
        .asking(&[Parent, Subject]),
    ]
}

fn adult_entries() -> Vec<LayerRequirement> {
    vec![
        LayerRequirement::new(
            LayerId::Values,
            vec![
                req!("adult-values", "Core values documented", Values >= 3),
                req!("adult-principles", "Guiding principles identified", Principles >= 2),
            ],
        )
        .asking(&[Subject]),
        LayerRequirement::new(
            LayerId::Growth,
            vec![
                req!("adult-goals", "Personal goals defined", Goals >= 3),
                req!("adult-thriving", "Thriving indicators identified", Thriving >= 2),
            ],
        )
        .asking(&[Subject]),
        LayerRequirement::new(
            LayerId::Strategies,
            vec![
                req!(
                    "adult-strategies",
                    "Effective strategies documented",
                    Strategies >= 3,
                    MARKED_EFFECTIVE
                ),
                req!("adult-routines", "Key routines identified", Routines >= 2),
            ],
        )
        .asking(&[Subject, Partner]),
        LayerRequirement::new(
            LayerId::Boundaries,
            vec![
                req!(
                    "adult-immovable-boundaries",
                    "Immovable boundaries defined",
                    Boundaries >= 2,
                    IMMOVABLE
                ),
                req!(
                    "adult-negotiable-boundaries",
                    "Negotiable boundaries defined",
                    Boundaries >= 2,
                    NEGOTIABLE
                ),
            ],
        )
        .asking(&[Subject]),
        LayerRequirement::new(
            LayerId::Regulation,
            vec![
                req!("adult-communication", "Communication style documented", Communication >= 1),
                req!("adult-repair", "Repair approach defined", Repair >= 1),
            ],
        )
        .asking(&[Subject, Partner]),
        LayerRequirement::new(
            LayerId::Triggers,
            vec![
                req!("adult-triggers", "Triggers documented", Triggers >= 3),
                req!("adult-warning-signs", "Warning signs identified", WarningSigns >= 2),
            ],
        )
        .asking(&[Subject, Partner]),
    ]
}

fn marriage_entries() -> Vec<LayerRequirement> {
    vec![
        LayerRequirement::new(
            LayerId::Values,
            vec![req!("marriage-values", "Shared values documented", Values >= 2)],
        )
        .asking(&[Subject, Partner]),
        LayerRequirement::new(
            LayerId::Growth,
            vec![req!("marriage-goals", "Shared goals defined", Goals >= 1)],
        ),
        LayerRequirement::new(
            LayerId::Strategies,
            vec![req!("marriage-rituals", "Couple rituals defined", Rituals >= 2)],
        ),
        LayerRequirement::new(
            LayerId::Boundaries,
            vec![req!("marriage-boundaries", "Boundaries defined", Boundaries >= 1)],
        ),
        LayerRequirement::new(
            LayerId::Regulation,
            vec![
                req!("marriage-communication", "Communication style documented", Communication >= 1),
                req!("marriage-repair", "Repair approach defined", Repair >= 1),
            ],
        )
        .asking(&[Subject, Partner]),
        LayerRequirement::new(
            LayerId::Triggers,
            vec![req!("marriage-triggers", "Triggers documented", Triggers >= 2)],
        )
        .asking(&[Subject, Partner]),
    ]
}

fn household_entries() -> Vec<LayerRequirement> {
    vec![
        LayerRequirement::new(
            LayerId::Values,
            vec![
                req!("household-mission", "Family mission defined", Mission >= 1),
                req!("household-non-negotiables", "Non-negotiables documented", NonNegotiables >= 3),
            ],
        )
        .named("Home Charter")
        .asking(&[Parent, Partner]),
        LayerRequirement::new(
            LayerId::Growth,
            vec![req!("household-goals", "Shared family goals", Goals >= 2)],
        )
        .named("Household Pulse"),
        LayerRequirement::new(
            LayerId::Strategies,
            vec![
                req!("household-rituals", "Family rituals defined", Rituals >= 2),
                req!("household-fairplay", "Fair Play awareness", FairPlay >= 1),
            ],
        )
        .named("Roles & Rituals"),
        LayerRequirement::new(
            LayerId::Boundaries,
            vec![req!("household-boundaries", "Household boundaries", Boundaries >= 2)],
        )
        .named("Household Boundaries"),
        LayerRequirement::new(
            LayerId::Regulation,
            vec![
                req!("household-sync", "Weekly sync configured", Sync >= 1),
                req!("household-repair", "Repair protocol defined", Repair >= 1),
            ],
        )
        .named("Communication Rhythm"),
        LayerRequirement::new(
            LayerId::Triggers,
            vec![
                req!("household-zones", "Home zones mapped", Zones >= 2),
                req!("household-triggers", "Household triggers identified", Triggers >= 2),
            ],
        )
        .named("Sanctuary Map"),
    ]
}

fn person_entries() -> Vec<LayerRequirement> {
    vec![
        LayerRequirement::new(
            LayerId::Values,
            vec![req!("person-values", "Core values documented", Values >= 2)],
        ),
        LayerRequirement::new(
            LayerId::Growth,
            vec![req!("person-goals", "Goals documented", Goals >= 1)],
        ),
        LayerRequirement::new(
            LayerId::Strategies,
            vec![req!("person-strategies", "Strategies documented", Strategies >= 2)],
        ),
        LayerRequirement::new(
            LayerId::Boundaries,
            vec![req!("person-boundaries", "Boundaries defined", Boundaries >= 1)],
        ),
        LayerRequirement::new(
            LayerId::Regulation,
            vec![req!("person-regulation", "Regulation approach documented", Regulation >= 1)],
        ),
        LayerRequirement::new(
            LayerId::Triggers,
            vec![req!("person-triggers", "Triggers documented", Triggers >= 3)],
        ),
    ]
}

fn builtin_entries() -> Vec<(ManualType, LayerRequirement)> {
    let mut entries = Vec::new();
    for (manual_type, layers) in [
        (ManualType::Child, child_entries()),
        (ManualType::Adult, adult_entries()),
        (ManualType::Marriage, marriage_entries()),
        (ManualType::Household, household_entries()),
        (ManualType::Person, person_entries()),
    ] {
        entries.extend(layers.into_iter().map(|l| (manual_type, l)));
    }
    entries
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

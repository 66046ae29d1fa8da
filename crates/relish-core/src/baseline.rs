use crate::manual::Manual;
use crate::requirements::{ContentRequirement, RequirementTable};
use crate::types::{ContentKind, LayerId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Status types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementCheck {
    pub id: String,
    pub description: String,
    pub kind: ContentKind,
    pub minimum: usize,
    pub count: usize,
    pub satisfied: bool,
}

/// Derived per-layer status. Never stored as the source of truth; it is
/// recomputed from the manual on every evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerBaselineStatus {
    pub layer: LayerId,
    pub name: String,
    pub percent_complete: u8,
    pub met: bool,
    /// Unsatisfied requirements in declaration order.
    pub missing: Vec<String>,
    pub checks: Vec<RequirementCheck>,
}

impl LayerBaselineStatus {
    /// True once any item counts toward the layer.
    pub fn has_content(&self) -> bool {
        self.checks.iter().any(|c| c.count > 0)
    }
}

pub fn missing_message(req: &ContentRequirement, count: usize) -> String {
    format!("{}: need {}, have {}", req.label(), req.minimum, count)
}

/// `floor(satisfied / total * 100)`, 100 when there is nothing to satisfy.
pub fn percent(satisfied: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    (satisfied.min(total) * 100 / total) as u8
}

// ---------------------------------------------------------------------------
// BaselineEvaluator
// ---------------------------------------------------------------------------

pub struct BaselineEvaluator<'a> {
    table: &'a RequirementTable,
}

impl<'a> BaselineEvaluator<'a> {
    pub fn new(table: &'a RequirementTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &'a RequirementTable {
        self.table
    }

    pub fn evaluate(&self, manual: &Manual, layer: LayerId) -> LayerBaselineStatus {
        let manual_type = manual.manual_type();
        let requirements = self.table.requirements_for(manual_type, layer);

        let mut checks = Vec::with_capacity(requirements.len());
        let mut missing = Vec::new();
        for req in requirements {
            let count = req.count(manual);
            let satisfied = count >= req.minimum;
            if !satisfied {
                missing.push(missing_message(req, count));
            }
            checks.push(RequirementCheck {
                id: req.id.to_string(),
                description: req.description.to_string(),
                kind: req.kind,
                minimum: req.minimum,
                count,
                satisfied,
            });
        }

        let satisfied = checks.iter().filter(|c| c.satisfied).count();
        LayerBaselineStatus {
            layer,
            name: self.table.layer_name(manual_type, layer).to_string(),
            percent_complete: percent(satisfied, checks.len()),
            met: missing.is_empty(),
            missing,
            checks,
        }
    }

    /// All six layers, keyed (and therefore iterated) in canonical L1..L6 order.
    pub fn evaluate_all(&self, manual: &Manual) -> BTreeMap<LayerId, LayerBaselineStatus> {
        LayerId::all()
            .iter()
            .map(|&layer| (layer, self.evaluate(manual, layer)))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manual::{BoundaryCategory, ContentItem};
    use crate::requirements::{LayerRequirement, SEVERITY_RATED};
    use crate::types::ManualType;

    fn two_trigger_table() -> RequirementTable {
        let mut entries = Vec::new();
        for &t in ManualType::all() {
            for &l in LayerId::all() {
                let content = if t == ManualType::Child && l == LayerId::Triggers {
                    vec![ContentRequirement {
                        id: "child-triggers",
                        description: "Triggers documented",
                        kind: ContentKind::Triggers,
                        minimum: 2,
                        quality: None,
                    }]
                } else {
                    Vec::new()
                };
                entries.push((t, LayerRequirement::new(l, content)));
            }
        }
        RequirementTable::new(entries).unwrap()
    }

    fn add(m: &mut Manual, kind: ContentKind, n: usize) {
        for i in 0..n {
            m.add_item(kind, ContentItem::new(format!("{kind} {i}")))
                .unwrap();
        }
    }

    #[test]
    fn empty_manual_is_zero_for_every_layer() {
        let table = RequirementTable::builtin().unwrap();
        let eval = BaselineEvaluator::new(&table);
        for &t in ManualType::all() {
            let m = Manual::new("m", "fam", t, "M");
            for status in eval.evaluate_all(&m).values() {
                assert_eq!(status.percent_complete, 0, "{t}/{}", status.layer);
                assert!(!status.met);
                assert_eq!(status.missing.len(), status.checks.len());
                assert!(!status.has_content());
            }
        }
    }

    #[test]
    fn single_trigger_reports_what_is_missing() {
        let table = two_trigger_table();
        let eval = BaselineEvaluator::new(&table);
        let mut m = Manual::new("kid", "fam", ManualType::Child, "Kid");
        add(&mut m, ContentKind::Triggers, 1);

        let status = eval.evaluate(&m, LayerId::Triggers);
        assert!(!status.met);
        assert_eq!(status.percent_complete, 0);
        assert_eq!(status.missing, vec!["triggers: need 2, have 1"]);

        add(&mut m, ContentKind::Triggers, 1);
        let status = eval.evaluate(&m, LayerId::Triggers);
        assert!(status.met);
        assert_eq!(status.percent_complete, 100);
        assert!(status.missing.is_empty());
    }

    #[test]
    fn layer_without_requirements_is_met() {
        let table = two_trigger_table();
        let eval = BaselineEvaluator::new(&table);
        let m = Manual::new("kid", "fam", ManualType::Child, "Kid");
        let status = eval.evaluate(&m, LayerId::Values);
        assert!(status.met);
        assert_eq!(status.percent_complete, 100);
        assert!(status.checks.is_empty());
    }

    #[test]
    fn partial_layer_floors_percentage() {
        let table = RequirementTable::builtin().unwrap();
        let eval = BaselineEvaluator::new(&table);
        let mut m = Manual::new("ada", "fam", ManualType::Household, "Home");
        add(&mut m, ContentKind::Zones, 2);
        let status = eval.evaluate(&m, LayerId::Triggers);
        assert_eq!(status.percent_complete, 50);
        assert_eq!(status.missing, vec!["triggers: need 2, have 0"]);
        assert_eq!(status.name, "Sanctuary Map");
    }

    #[test]
    fn quality_requirement_names_its_label() {
        let table = RequirementTable::builtin().unwrap();
        let eval = BaselineEvaluator::new(&table);
        let mut m = Manual::new("kid", "fam", ManualType::Child, "Kid");
        add(&mut m, ContentKind::Triggers, 3);

        let status = eval.evaluate(&m, LayerId::Triggers);
        assert!(!status.met);
        assert_eq!(status.percent_complete, 50);
        assert_eq!(
            status.missing,
            vec!["triggers (severity rated): need 1, have 0"]
        );

        m.add_item(
            ContentKind::Triggers,
            ContentItem::new("transitions").with_severity(4),
        )
        .unwrap();
        assert!(eval.evaluate(&m, LayerId::Triggers).met);
        assert_eq!(SEVERITY_RATED.label, "severity rated");
    }

    #[test]
    fn missing_keeps_declaration_order() {
        let table = RequirementTable::builtin().unwrap();
        let eval = BaselineEvaluator::new(&table);
        let mut m = Manual::new("ada", "fam", ManualType::Adult, "Ada");
        m.add_item(
            ContentKind::Boundaries,
            ContentItem::new("sleep").with_boundary(BoundaryCategory::Negotiable),
        )
        .unwrap();
        let status = eval.evaluate(&m, LayerId::Boundaries);
        assert_eq!(
            status.missing,
            vec![
                "boundaries (immovable): need 2, have 0",
                "boundaries (negotiable): need 2, have 1",
            ]
        );
    }

    #[test]
    fn evaluation_is_idempotent() {
        let table = RequirementTable::builtin().unwrap();
        let eval = BaselineEvaluator::new(&table);
        let mut m = Manual::new("kid", "fam", ManualType::Child, "Kid");
        add(&mut m, ContentKind::Values, 2);
        add(&mut m, ContentKind::Goals, 1);
        assert_eq!(eval.evaluate_all(&m), eval.evaluate_all(&m));
    }

    #[test]
    fn removing_content_can_unmeet_a_layer() {
        let table = two_trigger_table();
        let eval = BaselineEvaluator::new(&table);
        let mut m = Manual::new("kid", "fam", ManualType::Child, "Kid");
        add(&mut m, ContentKind::Triggers, 2);
        assert!(eval.evaluate(&m, LayerId::Triggers).met);

        let id = m.items(ContentKind::Triggers)[0].id.clone();
        m.remove_item(&id).unwrap();
        assert!(!eval.evaluate(&m, LayerId::Triggers).met);
    }

    #[test]
    fn evaluate_all_is_canonical_order() {
        let table = RequirementTable::builtin().unwrap();
        let eval = BaselineEvaluator::new(&table);
        let m = Manual::new("m", "fam", ManualType::Person, "M");
        let layers: Vec<LayerId> = eval.evaluate_all(&m).into_keys().collect();
        assert_eq!(layers, LayerId::all().to_vec());
    }

    #[test]
    fn percent_edges() {
        assert_eq!(percent(0, 0), 100);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 66);
        assert_eq!(percent(3, 3), 100);
    }
}

use crate::error::{RelishError, Result};
use crate::paths;
use crate::store::{self, RecordStore};
use crate::types::{ContentKind, ManualType, RespondentType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ---------------------------------------------------------------------------
// ContentItem
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryCategory {
    Immovable,
    Negotiable,
}

impl fmt::Display for BoundaryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BoundaryCategory::Immovable => "immovable",
            BoundaryCategory::Negotiable => "negotiable",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for BoundaryCategory {
    type Err = RelishError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "immovable" => Ok(BoundaryCategory::Immovable),
            "negotiable" => Ok(BoundaryCategory::Negotiable),
            _ => Err(RelishError::InvalidContentKind(format!("boundary category '{s}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contributed_by: Option<RespondentType>,
    /// 1 (mild) to 5 (severe); only meaningful for triggers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<u8>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub effective: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boundary: Option<BoundaryCategory>,
    pub added_at: DateTime<Utc>,
}

impl ContentItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            text: text.into(),
            contributed_by: None,
            severity: None,
            effective: false,
            boundary: None,
            added_at: Utc::now(),
        }
    }

    pub fn by(mut self, respondent: RespondentType) -> Self {
        self.contributed_by = Some(respondent);
        self
    }

    pub fn with_severity(mut self, severity: u8) -> Self {
        self.severity = Some(severity.clamp(1, 5));
        self
    }

    pub fn marked_effective(mut self) -> Self {
        self.effective = true;
        self
    }

    pub fn with_boundary(mut self, category: BoundaryCategory) -> Self {
        self.boundary = Some(category);
        self
    }
}

// ---------------------------------------------------------------------------
// Per-type content collections
// ---------------------------------------------------------------------------

macro_rules! manual_content {
    ($name:ident { $($field:ident => $kind:ident),+ $(,)? }) => {
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            $(
                #[serde(default, skip_serializing_if = "Vec::is_empty")]
                pub $field: Vec<ContentItem>,
            )+
        }

        impl $name {
            pub const KINDS: &'static [ContentKind] = &[$(ContentKind::$kind),+];

            fn collection(&self, kind: ContentKind) -> Option<&Vec<ContentItem>> {
                match kind {
                    $(ContentKind::$kind => Some(&self.$field),)+
                    _ => None,
                }
            }

            fn collection_mut(&mut self, kind: ContentKind) -> Option<&mut Vec<ContentItem>> {
                match kind {
                    $(ContentKind::$kind => Some(&mut self.$field),)+
                    _ => None,
                }
            }
        }
    };
}

manual_content!(ChildContent {
    values => Values,
    principles => Principles,
    goals => Goals,
    thriving => Thriving,
    strategies => Strategies,
    avoid => Avoid,
    boundaries => Boundaries,
    regulation => Regulation,
    coregulation => Coregulation,
    triggers => Triggers,
});

manual_content!(AdultContent {
    values => Values,
    principles => Principles,
    goals => Goals,
    thriving => Thriving,
    strategies => Strategies,
    routines => Routines,
    boundaries => Boundaries,
    communication => Communication,
    repair => Repair,
    triggers => Triggers,
    warning_signs => WarningSigns,
});

manual_content!(MarriageContent {
    values => Values,
    goals => Goals,
    rituals => Rituals,
    boundaries => Boundaries,
    communication => Communication,
    repair => Repair,
    triggers => Triggers,
});

manual_content!(HouseholdContent {
    mission => Mission,
    non_negotiables => NonNegotiables,
    goals => Goals,
    rituals => Rituals,
    fair_play => FairPlay,
    boundaries => Boundaries,
    sync => Sync,
    repair => Repair,
    zones => Zones,
    triggers => Triggers,
});

manual_content!(PersonContent {
    values => Values,
    goals => Goals,
    strategies => Strategies,
    boundaries => Boundaries,
    regulation => Regulation,
    triggers => Triggers,
});

// ---------------------------------------------------------------------------
// ManualContent
// ---------------------------------------------------------------------------

/// Content of a manual, one variant per manual type. Each variant carries
/// only the collections its type uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ManualContent {
    Child(ChildContent),
    Adult(AdultContent),
    Marriage(MarriageContent),
    Household(HouseholdContent),
    Person(PersonContent),
}

impl ManualContent {
    pub fn empty(manual_type: ManualType) -> Self {
        match manual_type {
            ManualType::Child => ManualContent::Child(ChildContent::default()),
            ManualType::Adult => ManualContent::Adult(AdultContent::default()),
            ManualType::Marriage => ManualContent::Marriage(MarriageContent::default()),
            ManualType::Household => ManualContent::Household(HouseholdContent::default()),
            ManualType::Person => ManualContent::Person(PersonContent::default()),
        }
    }

    pub fn manual_type(&self) -> ManualType {
        match self {
            ManualContent::Child(_) => ManualType::Child,
            ManualContent::Adult(_) => ManualType::Adult,
            ManualContent::Marriage(_) => ManualType::Marriage,
            ManualContent::Household(_) => ManualType::Household,
            ManualContent::Person(_) => ManualType::Person,
        }
    }

    /// Content kinds a manual of `manual_type` carries.
    pub fn kinds_for(manual_type: ManualType) -> &'static [ContentKind] {
        match manual_type {
            ManualType::Child => ChildContent::KINDS,
            ManualType::Adult => AdultContent::KINDS,
            ManualType::Marriage => MarriageContent::KINDS,
            ManualType::Household => HouseholdContent::KINDS,
            ManualType::Person => PersonContent::KINDS,
        }
    }

    pub fn carries(manual_type: ManualType, kind: ContentKind) -> bool {
        Self::kinds_for(manual_type).contains(&kind)
    }

    fn collection(&self, kind: ContentKind) -> Option<&Vec<ContentItem>> {
        match self {
            ManualContent::Child(c) => c.collection(kind),
            ManualContent::Adult(c) => c.collection(kind),
            ManualContent::Marriage(c) => c.collection(kind),
            ManualContent::Household(c) => c.collection(kind),
            ManualContent::Person(c) => c.collection(kind),
        }
    }

    fn collection_mut(&mut self, kind: ContentKind) -> Option<&mut Vec<ContentItem>> {
        match self {
            ManualContent::Child(c) => c.collection_mut(kind),
            ManualContent::Adult(c) => c.collection_mut(kind),
            ManualContent::Marriage(c) => c.collection_mut(kind),
            ManualContent::Household(c) => c.collection_mut(kind),
            ManualContent::Person(c) => c.collection_mut(kind),
        }
    }

    /// Items of `kind`; empty when the variant does not carry that kind.
    pub fn items(&self, kind: ContentKind) -> &[ContentItem] {
        self.collection(kind).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

// ---------------------------------------------------------------------------
// Manual
// ---------------------------------------------------------------------------

pub const COLLECTION: &str = "manuals";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manual {
    pub manual_id: String,
    pub family_id: String,
    pub title: String,
    pub content: ManualContent,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Manual {
    pub fn new(
        manual_id: impl Into<String>,
        family_id: impl Into<String>,
        manual_type: ManualType,
        title: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            manual_id: manual_id.into(),
            family_id: family_id.into(),
            title: title.into(),
            content: ManualContent::empty(manual_type),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn manual_type(&self) -> ManualType {
        self.content.manual_type()
    }

    pub fn items(&self, kind: ContentKind) -> &[ContentItem] {
        self.content.items(kind)
    }

    pub fn total_items(&self) -> usize {
        ManualContent::kinds_for(self.manual_type())
            .iter()
            .map(|&k| self.items(k).len())
            .sum()
    }

    /// Distinct respondents who contributed to any of `kinds`.
    pub fn respondents_for(&self, kinds: &[ContentKind]) -> BTreeSet<RespondentType> {
        kinds
            .iter()
            .flat_map(|&k| self.items(k))
            .filter_map(|item| item.contributed_by)
            .collect()
    }

    // ---------------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------------

    pub fn create(
        store: &dyn RecordStore,
        manual_id: impl Into<String>,
        family_id: impl Into<String>,
        manual_type: ManualType,
        title: impl Into<String>,
    ) -> Result<Self> {
        let manual_id = manual_id.into();
        paths::validate_id(&manual_id)?;
        if store.get(COLLECTION, &manual_id)?.is_some() {
            return Err(RelishError::ManualExists(manual_id));
        }
        let manual = Self::new(manual_id, family_id, manual_type, title);
        manual.save(store)?;
        Ok(manual)
    }

    /// Fails with `MissingManual` rather than defaulting; evaluation must
    /// never run against an absent manual.
    pub fn load(store: &dyn RecordStore, manual_id: &str) -> Result<Self> {
        match store::get_typed(store, COLLECTION, manual_id)? {
            Some(manual) => Ok(manual),
            None => Err(RelishError::MissingManual(manual_id.to_string())),
        }
    }

    pub fn save(&self, store: &dyn RecordStore) -> Result<()> {
        store::set_typed(store, COLLECTION, &self.manual_id, self)
    }

    pub fn list(store: &dyn RecordStore) -> Result<Vec<Self>> {
        let mut manuals = Vec::new();
        for id in store.list(COLLECTION)? {
            match Self::load(store, &id) {
                Ok(m) => manuals.push(m),
                Err(RelishError::MissingManual(_)) => {}
                Err(e) => return Err(e),
            }
        }
        manuals.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(manuals)
    }

    // ---------------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------------

    pub fn add_item(&mut self, kind: ContentKind, item: ContentItem) -> Result<&ContentItem> {
        let manual_type = self.manual_type();
        let collection = self
            .content
            .collection_mut(kind)
            .ok_or_else(|| RelishError::KindNotCarried {
                manual_type: manual_type.to_string(),
                kind: kind.to_string(),
            })?;
        collection.push(item);
        self.updated_at = Utc::now();
        let last = collection.len() - 1;
        Ok(&collection[last])
    }

    /// Remove an item by id from whichever collection holds it.
    pub fn remove_item(&mut self, item_id: &str) -> Result<(ContentKind, ContentItem)> {
        for &kind in ManualContent::kinds_for(self.manual_type()) {
            if let Some(collection) = self.content.collection_mut(kind) {
                if let Some(pos) = collection.iter().position(|i| i.id == item_id) {
                    let item = collection.remove(pos);
                    self.updated_at = Utc::now();
                    return Ok((kind, item));
                }
            }
        }
        Err(RelishError::ItemNotFound(item_id.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn every_type_carries_triggers_and_boundaries() {
        for &t in ManualType::all() {
            assert!(ManualContent::carries(t, ContentKind::Triggers), "{t}");
            assert!(ManualContent::carries(t, ContentKind::Boundaries), "{t}");
        }
    }

    #[test]
    fn add_item_rejects_kind_not_carried() {
        let mut m = Manual::new("ada", "fam", ManualType::Person, "Ada");
        let err = m
            .add_item(ContentKind::Zones, ContentItem::new("kitchen"))
            .unwrap_err();
        assert!(matches!(err, RelishError::KindNotCarried { .. }));
        assert_eq!(m.total_items(), 0);
    }

    #[test]
    fn item_ids_are_full_uuids() {
        let ids: std::collections::BTreeSet<String> =
            (0..200).map(|_| ContentItem::new("x").id).collect();
        assert_eq!(ids.len(), 200);
        assert!(ids.iter().all(|id| id.len() == 32));
        assert!(ids.iter().all(|id| crate::paths::validate_id(id).is_ok()));
    }

    #[test]
    fn add_and_remove_items() {
        let mut m = Manual::new("ada", "fam", ManualType::Child, "Ada");
        let id = m
            .add_item(ContentKind::Triggers, ContentItem::new("loud noises"))
            .unwrap()
            .id
            .clone();
        m.add_item(ContentKind::Strategies, ContentItem::new("quiet corner"))
            .unwrap();
        assert_eq!(m.items(ContentKind::Triggers).len(), 1);
        assert_eq!(m.total_items(), 2);

        let (kind, item) = m.remove_item(&id).unwrap();
        assert_eq!(kind, ContentKind::Triggers);
        assert_eq!(item.text, "loud noises");
        assert!(m.items(ContentKind::Triggers).is_empty());
        assert!(matches!(
            m.remove_item(&id),
            Err(RelishError::ItemNotFound(_))
        ));
    }

    #[test]
    fn respondents_are_distinct() {
        let mut m = Manual::new("ada", "fam", ManualType::Child, "Ada");
        m.add_item(
            ContentKind::Triggers,
            ContentItem::new("a").by(RespondentType::Parent),
        )
        .unwrap();
        m.add_item(
            ContentKind::Triggers,
            ContentItem::new("b").by(RespondentType::Parent),
        )
        .unwrap();
        m.add_item(
            ContentKind::Triggers,
            ContentItem::new("c").by(RespondentType::Subject),
        )
        .unwrap();
        m.add_item(ContentKind::Triggers, ContentItem::new("d")).unwrap();
        let who = m.respondents_for(&[ContentKind::Triggers]);
        assert_eq!(who.len(), 2);
        assert!(who.contains(&RespondentType::Subject));
    }

    #[test]
    fn content_yaml_is_tagged_by_type() {
        let mut m = Manual::new("home", "fam", ManualType::Household, "Our Home");
        m.add_item(ContentKind::Mission, ContentItem::new("be kind"))
            .unwrap();
        let yaml = serde_yaml::to_string(&m).unwrap();
        assert!(yaml.contains("type: household"));
        assert!(yaml.contains("mission:"));
        assert!(!yaml.contains("zones:"));
        let parsed: Manual = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, m);
    }

    #[test]
    fn create_load_and_duplicate() {
        let store = MemoryStore::new();
        Manual::create(&store, "ada", "fam", ManualType::Child, "Ada").unwrap();
        let loaded = Manual::load(&store, "ada").unwrap();
        assert_eq!(loaded.manual_type(), ManualType::Child);
        assert!(matches!(
            Manual::create(&store, "ada", "fam", ManualType::Child, "Ada"),
            Err(RelishError::ManualExists(_))
        ));
    }

    #[test]
    fn load_absent_manual_is_missing() {
        let store = MemoryStore::new();
        assert!(matches!(
            Manual::load(&store, "ghost"),
            Err(RelishError::MissingManual(_))
        ));
    }

    #[test]
    fn create_rejects_bad_id() {
        let store = MemoryStore::new();
        assert!(matches!(
            Manual::create(&store, "Not An Id", "fam", ManualType::Person, "x"),
            Err(RelishError::InvalidId(_))
        ));
    }
}

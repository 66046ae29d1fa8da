use crate::progress::OnboardingProgress;
use crate::types::{LayerId, ManualType, RespondentType};
use serde::Serialize;

pub const GRADUATION: &str = "graduation";

// ---------------------------------------------------------------------------
// MilestoneContext
// ---------------------------------------------------------------------------

/// Layer triggers count complete layers: content met and every required
/// respondent heard from.
pub struct MilestoneContext<'a> {
    pub progress: &'a OnboardingProgress,
}

impl MilestoneContext<'_> {
    fn complete(&self, layer: LayerId) -> bool {
        self.progress.is_layer_complete(layer)
    }

    fn complete_count(&self) -> usize {
        LayerId::all().iter().filter(|l| self.complete(**l)).count()
    }

    fn heard_from(&self, respondent: RespondentType) -> bool {
        self.progress.respondents().contains(&respondent)
    }
}

// ---------------------------------------------------------------------------
// MilestoneConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Celebration {
    pub title: &'static str,
    pub message: &'static str,
    pub encouragement: &'static str,
}

pub struct MilestoneConfig {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub trigger: fn(&MilestoneContext) -> bool,
    pub celebration: Celebration,
}

/// What the celebration UI receives for a newly achieved milestone.
#[derive(Debug, Clone, Serialize)]
pub struct MilestoneEvent {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub celebration: Celebration,
}

impl From<&MilestoneConfig> for MilestoneEvent {
    fn from(m: &MilestoneConfig) -> Self {
        Self {
            id: m.id,
            name: m.name,
            icon: m.icon,
            celebration: m.celebration,
        }
    }
}

macro_rules! milestone {
    (
        $id:expr, $name:expr, $icon:expr, $desc:expr,
        when: $trigger:expr,
        celebrate: ($title:expr, $message:expr, $encouragement:expr)
    ) => {
        MilestoneConfig {
            id: $id,
            name: $name,
            description: $desc,
            icon: $icon,
            trigger: $trigger,
            celebration: Celebration {
                title: $title,
                message: $message,
                encouragement: $encouragement,
            },
        }
    };
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

static UNIVERSAL: [MilestoneConfig; 6] = [
    milestone!(
        "first-layer", "Foundation Set", "🏛️",
        "Values layer (L6) complete - you know your \"why\"",
        when: |c| c.complete(LayerId::Values),
        celebrate: (
            "Foundation Set!",
            "You've established your core values - the foundation everything else builds on.",
            "This clarity will guide every decision in the manual."
        )
    ),
    milestone!(
        "halfway", "Halfway There", "🌗",
        "3 of 6 layers complete",
        when: |c| c.complete_count() >= 3,
        celebrate: (
            "Halfway There!",
            "Three layers complete. You're building something meaningful.",
            "The momentum is building. Keep going!"
        )
    ),
    milestone!(
        "multi-perspective", "Many Eyes", "👀",
        "Collected input from 3+ family members",
        when: |c| c.progress.respondents().len() >= 3,
        celebrate: (
            "Many Eyes!",
            "Multiple family members have contributed their perspectives.",
            "Different viewpoints create a richer, more accurate picture."
        )
    ),
    milestone!(
        "strategies-complete", "Toolbox Ready", "🧰",
        "Strategies layer (L4) complete - you have your toolkit",
        when: |c| c.complete(LayerId::Strategies),
        celebrate: (
            "Toolbox Ready!",
            "You now have a complete toolkit of strategies that work.",
            "These proven approaches will serve you well."
        )
    ),
    milestone!(
        "triggers-complete", "Self-Aware", "🔔",
        "Triggers layer (L1) complete - you know your signals",
        when: |c| c.complete(LayerId::Triggers),
        celebrate: (
            "Self-Aware!",
            "You've mapped out the warning signs and triggers.",
            "Awareness is the first step to better responses."
        )
    ),
    milestone!(
        GRADUATION, "Ready to Breathe", "🎉",
        "All 6 layers baselined - manual is alive!",
        when: |c| c.complete_count() == LayerId::all().len(),
        celebrate: (
            "Ready to Breathe!",
            "All six layers are complete. Your manual is alive!",
            "This is just the beginning - your manual will grow with you."
        )
    ),
];

static CHILD_VOICE: MilestoneConfig = milestone!(
    "child-voice", "Their Voice Heard", "🗣️",
    "Child contributed their own perspective",
    when: |c| c.heard_from(RespondentType::Subject),
    celebrate: (
        "Their Voice Heard!",
        "The child has shared their own perspective.",
        "Their input makes this manual truly theirs too."
    )
);

static PARTNER_INPUT: MilestoneConfig = milestone!(
    "partner-input", "Partner Perspective", "💑",
    "Partner contributed their observations",
    when: |c| c.heard_from(RespondentType::Partner),
    celebrate: (
        "Partner Perspective!",
        "Your partner has contributed their observations.",
        "Two perspectives create a more complete picture."
    )
);

static HOUSEHOLD: [MilestoneConfig; 2] = [
    milestone!(
        "charter-complete", "Charter Drafted", "📜",
        "Home Charter (values & non-negotiables) complete",
        when: |c| c.complete(LayerId::Values),
        celebrate: (
            "Charter Drafted!",
            "Your family's values and non-negotiables are documented.",
            "This charter will guide your household decisions."
        )
    ),
    milestone!(
        "rhythm-established", "Rhythm Established", "🎵",
        "Communication rhythm and repair protocol defined",
        when: |c| c.complete(LayerId::Regulation),
        celebrate: (
            "Rhythm Established!",
            "Your communication rhythm and repair protocols are set.",
            "Healthy communication is the heartbeat of family life."
        )
    ),
];

/// Milestones for `manual_type` in priority order: universal first, then the
/// type's own.
pub fn catalog(manual_type: ManualType) -> Vec<&'static MilestoneConfig> {
    let extra: &'static [MilestoneConfig] = match manual_type {
        ManualType::Child => std::slice::from_ref(&CHILD_VOICE),
        ManualType::Adult | ManualType::Marriage => std::slice::from_ref(&PARTNER_INPUT),
        ManualType::Household => &HOUSEHOLD,
        ManualType::Person => &[],
    };
    UNIVERSAL.iter().chain(extra.iter()).collect()
}

pub fn find(manual_type: ManualType, id: &str) -> Option<&'static MilestoneConfig> {
    catalog(manual_type).into_iter().find(|m| m.id == id)
}

/// Milestones whose trigger holds and that `progress` has not recorded yet,
/// in catalog order.
pub fn newly_achieved(ctx: &MilestoneContext) -> Vec<&'static MilestoneConfig> {
    catalog(ctx.progress.manual_type)
        .into_iter()
        .filter(|m| !ctx.progress.has_milestone(m.id) && (m.trigger)(ctx))
        .collect()
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MilestoneSummary {
    pub achieved: usize,
    pub total: usize,
    pub percent: u8,
    pub next: Option<&'static str>,
}

pub fn summary(progress: &OnboardingProgress) -> MilestoneSummary {
    let milestones = catalog(progress.manual_type);
    let achieved = milestones
        .iter()
        .filter(|m| progress.has_milestone(m.id))
        .count();
    let total = milestones.len();
    let percent = if total == 0 {
        0
    } else {
        (achieved as f64 * 100.0 / total as f64).round() as u8
    };
    MilestoneSummary {
        achieved,
        total,
        percent,
        next: milestones
            .iter()
            .find(|m| !progress.has_milestone(m.id))
            .map(|m| m.id),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

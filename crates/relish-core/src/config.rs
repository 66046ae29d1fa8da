use crate::error::{RelishError, Result};
use crate::paths;
use crate::progress::{default_layout, Aggregator, PhasePlan, MIN_PHASES_FOR_LAUNCH};
use crate::types::{LayerId, Phase};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// FamilyConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyConfig {
    pub id: String,
    pub name: String,
}

// ---------------------------------------------------------------------------
// OnboardingConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnboardingConfig {
    #[serde(default = "default_min_phases")]
    pub min_phases_for_launch: usize,
}

fn default_min_phases() -> usize {
    MIN_PHASES_FOR_LAUNCH
}

impl Default for OnboardingConfig {
    fn default() -> Self {
        Self {
            min_phases_for_launch: default_min_phases(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    pub family: FamilyConfig,
    /// Layers each phase requires before it completes.
    #[serde(default = "default_layout")]
    pub phases: BTreeMap<Phase, Vec<LayerId>>,
    #[serde(default)]
    pub onboarding: OnboardingConfig,
}

fn default_version() -> u32 {
    1
}

impl Config {
    pub fn new(family_id: impl Into<String>, family_name: impl Into<String>) -> Self {
        Self {
            version: 1,
            family: FamilyConfig {
                id: family_id.into(),
                name: family_name.into(),
            },
            phases: default_layout(),
            onboarding: OnboardingConfig::default(),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(RelishError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn phase_plan(&self) -> Result<PhasePlan> {
        PhasePlan::new(self.phases.clone())
    }

    /// Fails on an invalid phase layout or an unreachable launch threshold
    /// rather than running with either.
    pub fn aggregator(&self) -> Result<Aggregator> {
        let plan = self.phase_plan()?;
        let min = self.onboarding.min_phases_for_launch;
        if min > Phase::all().len() {
            return Err(RelishError::InvalidOnboarding(format!(
                "min_phases_for_launch is {min} but there are only {} phases",
                Phase::all().len()
            )));
        }
        Ok(Aggregator::new(plan, min))
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.version != default_version() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!("unknown config version {}", self.version),
            });
        }

        if paths::validate_id(&self.family.id).is_err() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!("family.id '{}' is not a valid id", self.family.id),
            });
        }

        if let Err(e) = self.phase_plan() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: e.to_string(),
            });
        }

        let min = self.onboarding.min_phases_for_launch;
        if min == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "onboarding.min_phases_for_launch is 0; launch is open before any phase completes"
                    .to_string(),
            });
        } else if min > Phase::all().len() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "onboarding.min_phases_for_launch is {min} but there are only {} phases",
                    Phase::all().len()
                ),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn minimal_yaml_uses_defaults() {
        let yaml = "family:\n  id: smiths\n  name: The Smiths\n";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.version, 1);
        assert_eq!(cfg.phases, default_layout());
        assert_eq!(cfg.onboarding.min_phases_for_launch, 2);
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn custom_layout_round_trips_through_disk() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::new("smiths", "The Smiths");
        cfg.phases.insert(Phase::Operations, vec![LayerId::Triggers, LayerId::Growth]);
        cfg.phases.insert(Phase::Strategy, vec![]);
        cfg.save(dir.path()).unwrap();

        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded.phases[&Phase::Operations].len(), 2);
        assert!(matches!(
            loaded.aggregator(),
            Err(RelishError::InvalidPhaseLayout(_))
        ));
    }

    #[test]
    fn load_without_init_is_not_initialized() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Config::load(dir.path()),
            Err(RelishError::NotInitialized)
        ));
    }

    #[test]
    fn validate_reports_layout_and_launch_problems() {
        let mut cfg = Config::new("Bad Id", "x");
        cfg.phases.remove(&Phase::Strategy);
        cfg.onboarding.min_phases_for_launch = 9;
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 3);
        assert!(warnings.iter().all(|w| w.level == WarnLevel::Error));
        assert!(warnings
            .iter()
            .any(|w| w.message.contains("phase 'strategy' requires no layers")));
    }

    #[test]
    fn zero_launch_minimum_is_a_warning() {
        let mut cfg = Config::new("smiths", "The Smiths");
        cfg.onboarding.min_phases_for_launch = 0;
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, WarnLevel::Warning);
        assert_eq!(cfg.aggregator().unwrap().min_phases_for_launch(), 0);
    }

    #[test]
    fn unreachable_launch_minimum_fails_aggregator() {
        let mut cfg = Config::new("smiths", "The Smiths");
        cfg.onboarding.min_phases_for_launch = 4;
        assert_eq!(cfg.aggregator().unwrap().min_phases_for_launch(), 4);

        cfg.onboarding.min_phases_for_launch = 5;
        let err = cfg.aggregator().unwrap_err();
        assert!(matches!(err, RelishError::InvalidOnboarding(_)));
        assert!(err.to_string().contains("only 4 phases"));
    }
}

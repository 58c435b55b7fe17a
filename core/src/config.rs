//! Engine configuration and the configuration provider.
//!
//! RULE: No component reads global state. Every pure function receives the
//! `EngineConfig` it must apply. A batch run takes exactly one snapshot from
//! the `ConfigProvider` and scores every account against it.

use crate::types::{Amount, RiskLevel};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Deserializer, Serialize};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
};

/// Names of the motivations the engine knows how to evaluate.
pub mod motivation {
    pub const STRUCTURING: &str = "structuring";
    pub const BONUS_CONCENTRATION: &str = "bonus_concentration";
    pub const LIVE_CASINO_CONCENTRATION: &str = "live_casino_concentration";
    pub const RAPID_CYCLE: &str = "rapid_cycle";
    pub const VOLUME_MONTHLY: &str = "volume_monthly";
    pub const VOLUME_WEEKLY: &str = "volume_weekly";
    pub const VOLUME_DAILY: &str = "volume_daily";
}

// ── Sections ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeThresholds {
    pub daily:   Amount,
    pub weekly:  Amount,
    pub monthly: Amount,
}

impl Default for VolumeThresholds {
    fn default() -> Self {
        Self {
            daily:   dec!(2000.00),
            weekly:  dec!(5000.00),
            monthly: dec!(15000.00),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuringConfig {
    pub deposit_threshold:    Amount,
    pub withdrawal_threshold: Amount,
    /// Calendar days covered by one window, day 0 inclusive.
    pub window_days:          i64,
}

impl Default for StructuringConfig {
    fn default() -> Self {
        Self {
            deposit_threshold:    dec!(5000.00),
            withdrawal_threshold: dec!(5000.00),
            window_days:          7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NettingConfig {
    /// Amounts match when their absolute difference is strictly below this.
    pub amount_tolerance: Amount,
    pub max_age_days:     i64,
}

impl Default for NettingConfig {
    fn default() -> Self {
        Self {
            amount_tolerance: dec!(0.01),
            max_age_days:     90,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    pub rapid_cycle_days: i64,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self { rapid_cycle_days: 2 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weight {
    /// Reported, never aggravates.
    Base,
    Minor,
    Major,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotivationConfig {
    pub enabled: bool,
    pub weight:  Weight,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_percentage: Option<Decimal>,
}

impl MotivationConfig {
    fn new(weight: Weight, threshold_percentage: Option<Decimal>) -> Self {
        Self {
            enabled: true,
            weight,
            threshold_percentage,
        }
    }
}

/// Partial motivation override; unset fields keep the built-in value.
#[derive(Debug, Clone, Default, Deserialize)]
struct MotivationOverride {
    enabled: Option<bool>,
    weight:  Option<Weight>,
    threshold_percentage: Option<Decimal>,
}

fn default_motivations() -> BTreeMap<String, MotivationConfig> {
    use motivation::*;
    [
        (STRUCTURING,               MotivationConfig::new(Weight::Major, None)),
        (BONUS_CONCENTRATION,       MotivationConfig::new(Weight::Major, Some(dec!(10)))),
        (LIVE_CASINO_CONCENTRATION, MotivationConfig::new(Weight::Minor, Some(dec!(40)))),
        (RAPID_CYCLE,               MotivationConfig::new(Weight::Base, None)),
        (VOLUME_MONTHLY,            MotivationConfig::new(Weight::Base, None)),
        (VOLUME_WEEKLY,             MotivationConfig::new(Weight::Base, None)),
        (VOLUME_DAILY,              MotivationConfig::new(Weight::Base, None)),
    ]
    .into_iter()
    .map(|(name, cfg)| (name.to_string(), cfg))
    .collect()
}

fn merge_motivations<'de, D>(deserializer: D) -> Result<BTreeMap<String, MotivationConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    let overrides = BTreeMap::<String, MotivationOverride>::deserialize(deserializer)?;
    let mut merged = default_motivations();
    for (name, o) in overrides {
        let entry = merged
            .entry(name)
            .or_insert_with(|| MotivationConfig::new(Weight::Base, None));
        if let Some(enabled) = o.enabled {
            entry.enabled = enabled;
        }
        if let Some(weight) = o.weight {
            entry.weight = weight;
        }
        if o.threshold_percentage.is_some() {
            entry.threshold_percentage = o.threshold_percentage;
        }
    }
    Ok(merged)
}

/// Aggravant classes a rule can react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggravantClass {
    Minor,
    Major,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationRule {
    pub from:      RiskLevel,
    pub aggravant: AggravantClass,
    pub to:        RiskLevel,
}

impl EscalationRule {
    pub fn new(from: RiskLevel, aggravant: AggravantClass, to: RiskLevel) -> Self {
        Self { from, aggravant, to }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreTable {
    pub low:      u32,
    pub medium:   u32,
    pub high:     u32,
    pub elevated: u32,
}

impl ScoreTable {
    pub fn score(&self, level: RiskLevel) -> u32 {
        match level {
            RiskLevel::Low      => self.low,
            RiskLevel::Medium   => self.medium,
            RiskLevel::High     => self.high,
            RiskLevel::Elevated => self.elevated,
        }
    }
}

impl Default for ScoreTable {
    fn default() -> Self {
        Self {
            low:      20,
            medium:   50,
            high:     80,
            elevated: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationConfig {
    /// Base level when any monthly bucket exceeds its threshold.
    pub monthly_breach_level: RiskLevel,
    /// Base level when any weekly or daily bucket exceeds its threshold.
    pub period_breach_level:  RiskLevel,
    pub rules:                Vec<EscalationRule>,
    pub scores:               ScoreTable,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        use AggravantClass::*;
        use RiskLevel::*;
        Self {
            monthly_breach_level: High,
            period_breach_level:  Medium,
            rules: vec![
                EscalationRule::new(Low, Major, High),
                EscalationRule::new(Low, Minor, Medium),
                EscalationRule::new(Medium, Major, High),
                EscalationRule::new(High, Major, Elevated),
                EscalationRule::new(High, Minor, Elevated),
            ],
            scores: ScoreTable::default(),
        }
    }
}

/// Substrings the default keyword classifier looks for (case-insensitive).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    pub cancellation: Vec<String>,
    pub bonus:        Vec<String>,
    pub deposit:      Vec<String>,
    pub withdrawal:   Vec<String>,
    pub live:         Vec<String>,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            cancellation: words(&[
                "cancellation of withdrawal",
                "withdrawal cancellation",
                "withdrawal cancelled",
                "cancelled withdrawal",
                "withdrawal reversal",
            ]),
            bonus:      words(&["bonus", "free spin", "freebet", "free bet"]),
            deposit:    words(&["direct top-up", "top-up", "topup", "deposit"]),
            withdrawal: words(&["withdrawal", "payout", "cash-out", "cashout"]),
            live: words(&[
                "live casino",
                "live-casino",
                "live dealer",
                "live roulette",
                "live blackjack",
                "live baccarat",
                "live game",
            ]),
        }
    }
}

// ── EngineConfig ─────────────────────────────────────────────────────────────

/// Longest day span any window or age limit may be configured with.
pub const MAX_SPAN_DAYS: i64 = 3650;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub version:     String,
    pub thresholds:  VolumeThresholds,
    pub structuring: StructuringConfig,
    pub netting:     NettingConfig,
    pub patterns:    PatternConfig,
    #[serde(deserialize_with = "merge_motivations")]
    pub motivations: BTreeMap<String, MotivationConfig>,
    pub escalation:  EscalationConfig,
    pub vocabulary:  Vocabulary,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version:     "builtin".into(),
            thresholds:  VolumeThresholds::default(),
            structuring: StructuringConfig::default(),
            netting:     NettingConfig::default(),
            patterns:    PatternConfig::default(),
            motivations: default_motivations(),
            escalation:  EscalationConfig::default(),
            vocabulary:  Vocabulary::default(),
        }
    }
}

impl EngineConfig {
    /// Load a (possibly partial) JSON override file. Missing fields keep
    /// their built-in defaults.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", path.display()))?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no algorithm can run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        let t = &self.thresholds;
        anyhow::ensure!(
            t.daily > Decimal::ZERO && t.weekly > Decimal::ZERO && t.monthly > Decimal::ZERO,
            "volume thresholds must be positive"
        );
        anyhow::ensure!(
            self.structuring.deposit_threshold > Decimal::ZERO
                && self.structuring.withdrawal_threshold > Decimal::ZERO,
            "structuring thresholds must be positive"
        );
        anyhow::ensure!(
            (1..=MAX_SPAN_DAYS).contains(&self.structuring.window_days),
            "window_days must be between 1 and {MAX_SPAN_DAYS}"
        );
        anyhow::ensure!(
            self.netting.amount_tolerance >= Decimal::ZERO,
            "netting tolerance must be non-negative"
        );
        anyhow::ensure!(
            (0..=MAX_SPAN_DAYS).contains(&self.netting.max_age_days),
            "max_age_days must be between 0 and {MAX_SPAN_DAYS}"
        );
        anyhow::ensure!(
            (0..=MAX_SPAN_DAYS).contains(&self.patterns.rapid_cycle_days),
            "rapid_cycle_days must be between 0 and {MAX_SPAN_DAYS}"
        );
        for (name, m) in &self.motivations {
            if let Some(pct) = m.threshold_percentage {
                anyhow::ensure!(
                    (Decimal::ZERO..=dec!(100)).contains(&pct),
                    "motivation '{name}' threshold_percentage out of range: {pct}"
                );
            }
        }
        Ok(())
    }

    pub fn motivation(&self, name: &str) -> Option<&MotivationConfig> {
        self.motivations.get(name)
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.motivation(name).is_some_and(|m| m.enabled)
    }

    pub fn weight_of(&self, name: &str) -> Weight {
        self.motivation(name).map_or(Weight::Base, |m| m.weight)
    }

    /// Percentage threshold for `name`, or `fallback` when unset.
    pub fn threshold_percentage(&self, name: &str, fallback: Decimal) -> Decimal {
        self.motivation(name)
            .and_then(|m| m.threshold_percentage)
            .unwrap_or(fallback)
    }
}

// ── Provider ─────────────────────────────────────────────────────────────────

/// Anything that can hand out a full configuration.
pub trait ConfigSource {
    fn describe(&self) -> String;
    fn fetch(&self) -> anyhow::Result<EngineConfig>;
}

/// JSON file holding a (possibly partial) `EngineConfig`.
pub struct FileConfigSource {
    path: PathBuf,
}

impl FileConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigSource for FileConfigSource {
    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }

    fn fetch(&self) -> anyhow::Result<EngineConfig> {
        EngineConfig::load(&self.path)
    }
}

/// Hands out immutable configuration snapshots.
///
/// A failing source never fails the caller: the provider logs the problem
/// and falls back to the built-in defaults.
#[derive(Default)]
pub struct ConfigProvider<'a> {
    source: Option<&'a dyn ConfigSource>,
}

impl<'a> ConfigProvider<'a> {
    pub fn new(source: &'a dyn ConfigSource) -> Self {
        Self {
            source: Some(source),
        }
    }

    /// Built-in defaults only.
    pub fn builtin() -> Self {
        Self { source: None }
    }

    pub fn snapshot(&self) -> Arc<EngineConfig> {
        let Some(source) = self.source else {
            return Arc::new(EngineConfig::default());
        };
        match source.fetch().and_then(|c| c.validate().map(|_| c)) {
            Ok(config) => {
                log::info!("Loaded engine config version '{}' from {}", config.version, source.describe());
                Arc::new(config)
            }
            Err(e) => {
                log::warn!("Config unavailable from {} ({e}); using built-in defaults", source.describe());
                Arc::new(EngineConfig::default())
            }
        }
    }
}

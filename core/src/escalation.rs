//! Escalation engine.
//!
//! Levels are computed in one pass, never traversed step by step:
//!   1. Base level from volume buckets against the configured thresholds.
//!   2. Aggravant classes from the triggered, enabled motivations.
//!   3. Every rule matching (base level, present class) fires; the highest
//!      resulting level wins. Rules never lower a level.
//!   4. Final level is mapped through the score table.

use crate::{
    config::{motivation, AggravantClass, EngineConfig, Weight},
    patterns::PatternFlag,
    types::{RiskAssessment, RiskLevel, StructuringEvent},
    volume::{Granularity, VolumeProfile},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A motivation that fired for this account, with the weight it was
/// applied at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggeredMotivation {
    pub name:   String,
    pub weight: Weight,
}

/// Everything the escalation engine consumes.
pub struct Signals<'s> {
    pub volumes:           &'s VolumeProfile,
    pub deposit_events:    &'s [StructuringEvent],
    pub withdrawal_events: &'s [StructuringEvent],
    pub flags:             &'s BTreeSet<PatternFlag>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Escalation {
    pub base_level:  RiskLevel,
    pub assessment:  RiskAssessment,
    pub motivations: Vec<TriggeredMotivation>,
}

pub fn base_level(volumes: &VolumeProfile, cfg: &EngineConfig) -> RiskLevel {
    let t = &cfg.thresholds;
    if volumes.exceeds(Granularity::Month, t) {
        cfg.escalation.monthly_breach_level
    } else if volumes.exceeds(Granularity::Week, t) || volumes.exceeds(Granularity::Day, t) {
        cfg.escalation.period_breach_level
    } else {
        RiskLevel::Low
    }
}

/// Names of every motivation whose underlying signal is present, enabled
/// or not, in a stable order.
fn signalled_motivations(signals: &Signals<'_>, cfg: &EngineConfig) -> Vec<&'static str> {
    let t = &cfg.thresholds;
    let mut names = Vec::new();
    if !signals.deposit_events.is_empty() || !signals.withdrawal_events.is_empty() {
        names.push(motivation::STRUCTURING);
    }
    for flag in signals.flags {
        names.push(flag.motivation());
    }
    let volume_checks = [
        (Granularity::Month, motivation::VOLUME_MONTHLY),
        (Granularity::Week, motivation::VOLUME_WEEKLY),
        (Granularity::Day, motivation::VOLUME_DAILY),
    ];
    for (granularity, name) in volume_checks {
        if signals.volumes.exceeds(granularity, t) {
            names.push(name);
        }
    }
    names
}

pub fn escalate(signals: &Signals<'_>, cfg: &EngineConfig) -> Escalation {
    let base = base_level(signals.volumes, cfg);

    let motivations: Vec<TriggeredMotivation> = signalled_motivations(signals, cfg)
        .into_iter()
        .filter(|name| cfg.is_enabled(name))
        .map(|name| TriggeredMotivation {
            name:   name.to_string(),
            weight: cfg.weight_of(name),
        })
        .collect();

    let has_major = motivations.iter().any(|m| m.weight == Weight::Major);
    let has_minor = motivations.iter().any(|m| m.weight == Weight::Minor);
    let present = |class: AggravantClass| match class {
        AggravantClass::Major => has_major,
        AggravantClass::Minor => has_minor,
    };

    let level = cfg
        .escalation
        .rules
        .iter()
        .filter(|rule| rule.from == base && present(rule.aggravant))
        .map(|rule| rule.to)
        .fold(base, RiskLevel::max);

    log::debug!(
        "Escalation: base={base} major={has_major} minor={has_minor} final={level}"
    );

    Escalation {
        base_level: base,
        assessment: RiskAssessment {
            score: cfg.escalation.scores.score(level),
            level,
        },
        motivations,
    }
}

//! Named simulation scenarios: a lobby plan plus the expectations every
//! round of it must meet.
use anyhow::{Result, bail};
use rolecall_engine::{CustomRole, GameOptions, RoleSettings};

use crate::simulation::{RoundSummary, SimPlan};

pub type Expectation = fn(&RoundSummary) -> Result<()>;

pub struct Scenario {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub plan: SimPlan,
    pub expectations: Vec<Expectation>,
}

impl Scenario {
    /// First unmet expectation for `summary`, if any.
    pub fn evaluate(&self, summary: &RoundSummary) -> Option<String> {
        if let Some(violation) = summary.violations.first() {
            return Some(format!("invariant violated: {violation}"));
        }
        self.expectations
            .iter()
            .find_map(|expect| expect(summary).err().map(|err| err.to_string()))
    }
}

const SCENARIOS: [(&str, &str); 3] = [
    ("smoke", "Bundled lobby options, ten players, two impostors"),
    ("ghost-pool", "Every death competes for a small ghost-role pool"),
    ("sabotage-policy", "Sabotage disabled lobby-wide; no sabotage may land"),
];

pub fn list_scenarios() -> impl Iterator<Item = (&'static str, &'static str)> {
    SCENARIOS.into_iter()
}

/// Build the scenario named `key` on top of `base` options.
pub fn get_scenario(key: &str, base: &GameOptions) -> Option<Scenario> {
    let description = SCENARIOS.iter().find(|(k, _)| *k == key)?.1;
    let scenario = match key {
        "smoke" => Scenario {
            key: "smoke",
            name: "Smoke",
            description,
            plan: SimPlan::new(base.clone()),
            expectations: vec![round_finishes as Expectation, deaths_are_unique],
        },
        "ghost-pool" => {
            let options = GameOptions {
                max_crew_ghost: 1,
                max_imp_ghost: 1,
                ..base.clone()
            }
            .with_role(CustomRole::Hawk, RoleSettings::with_mode(100, 1))
            .with_role(CustomRole::Warden, RoleSettings::with_mode(100, 1))
            .with_role(CustomRole::Minion, RoleSettings::with_mode(100, 1))
            .with_role(CustomRole::Bloodmoon, RoleSettings::with_mode(100, 1));
            Scenario {
                key: "ghost-pool",
                name: "Ghost Pool",
                description,
                plan: SimPlan::new(options).with_lobby(12, 3),
                expectations: vec![deaths_are_unique as Expectation, ghost_caps_hold],
            }
        }
        "sabotage-policy" => Scenario {
            key: "sabotage-policy",
            name: "Sabotage Policy",
            description,
            plan: SimPlan::new(GameOptions {
                disable_sabotage: true,
                ..base.clone()
            }),
            expectations: vec![no_sabotage_lands as Expectation],
        },
        _ => return None,
    };
    Some(scenario)
}

fn round_finishes(summary: &RoundSummary) -> Result<()> {
    if summary.steps == 0 {
        bail!("round never started");
    }
    Ok(())
}

fn deaths_are_unique(summary: &RoundSummary) -> Result<()> {
    let mut victims: Vec<_> = summary.deaths.iter().map(|d| d.victim).collect();
    let total = victims.len();
    victims.sort();
    victims.dedup();
    if victims.len() != total {
        bail!("{} duplicate death records", total - victims.len());
    }
    Ok(())
}

fn ghost_caps_hold(summary: &RoundSummary) -> Result<()> {
    let crew: u32 = [CustomRole::Hawk, CustomRole::Warden]
        .iter()
        .filter_map(|r| summary.ghost_grants.get(r))
        .sum();
    let imp: u32 = [CustomRole::Minion, CustomRole::Bloodmoon]
        .iter()
        .filter_map(|r| summary.ghost_grants.get(r))
        .sum();
    if crew > 1 || imp > 1 {
        bail!("ghost grants over cap: crew {crew}, impostor {imp}");
    }
    Ok(())
}

fn no_sabotage_lands(summary: &RoundSummary) -> Result<()> {
    if summary.sabotages_applied > 0 {
        bail!("{} sabotages landed", summary.sabotages_applied);
    }
    let refused = summary.suppressed_matching("sabotage/SabotageDisabled");
    if refused != summary.sabotages_attempted {
        bail!(
            "{} of {} sabotage attempts refused by policy",
            refused,
            summary.sabotages_attempted
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_scenario_builds() {
        let base = GameOptions::load_from_static();
        for (key, _) in list_scenarios() {
            let scenario = get_scenario(key, &base).unwrap();
            assert_eq!(scenario.key, key);
            assert!(!scenario.expectations.is_empty());
        }
        assert!(get_scenario("nope", &base).is_none());
    }

    #[test]
    fn violations_fail_before_expectations() {
        let base = GameOptions::load_from_static();
        let scenario = get_scenario("smoke", &base).unwrap();
        let summary = RoundSummary {
            steps: 1,
            violations: vec!["boom".to_string()],
            ..RoundSummary::default()
        };
        assert_eq!(
            scenario.evaluate(&summary).as_deref(),
            Some("invariant violated: boom")
        );
    }

    #[test]
    fn empty_round_fails_smoke() {
        let base = GameOptions::load_from_static();
        let scenario = get_scenario("smoke", &base).unwrap();
        assert!(scenario.evaluate(&RoundSummary::default()).is_some());
    }
}

// Lineup validator: last gate before a result leaves the core.
//
// Works only from the lineup's identifiers and the constraint set, never
// from the search engine's working state, so a bookkeeping bug in the
// engine surfaces here instead of reaching the caller.

use std::collections::{HashMap, HashSet};

use crate::constraints::Constraints;
use crate::error::LineupError;
use crate::optimize::Lineup;
use crate::pool::PlayerPool;

/// Placeholder player name for slot count violations.
const VACANT: &str = "(vacant)";

/// Check `lineup` against every hard constraint.
pub fn validate(
    lineup: &Lineup,
    constraints: &Constraints,
    pool: &PlayerPool,
) -> Result<(), LineupError> {
    let mut seen = HashSet::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut total_cost = 0u64;

    for seat in &lineup.slots {
        let mismatch = || LineupError::SlotMismatch {
            slot: seat.label.clone(),
            player: seat.player.clone(),
        };

        let rule = constraints.rule_by_label(&seat.label).ok_or_else(mismatch)?;
        let idx = pool.index_of(&seat.player).ok_or_else(mismatch)?;
        if !seen.insert(idx) {
            return Err(mismatch());
        }
        if constraints.is_banned(idx) {
            return Err(LineupError::BannedPresent {
                player: seat.player.clone(),
            });
        }
        let record = pool.get(idx);
        if !record.is_eligible_for(&rule.positions) {
            return Err(mismatch());
        }

        let count = counts.entry(rule.label.as_str()).or_default();
        *count += 1;
        if *count > rule.max {
            return Err(mismatch());
        }
        total_cost += record.cost_or_zero();
    }

    for rule in constraints.rules() {
        if counts.get(rule.label.as_str()).copied().unwrap_or(0) < rule.min {
            return Err(LineupError::SlotMismatch {
                slot: rule.label.clone(),
                player: VACANT.to_string(),
            });
        }
    }
    if lineup.slots.len() != constraints.roster_size() {
        let slot = lineup
            .slots
            .last()
            .map(|s| s.label.clone())
            .unwrap_or_default();
        return Err(LineupError::SlotMismatch {
            slot,
            player: VACANT.to_string(),
        });
    }

    for &locked in constraints.locked() {
        if !seen.contains(&locked) {
            return Err(LineupError::MissingLocked {
                player: pool.get(locked).id.clone(),
            });
        }
    }

    if let Some(budget) = constraints.budget() {
        if total_cost > budget {
            return Err(LineupError::BudgetExceeded {
                total: total_cost,
                budget,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::RosterSlotSpec;
    use crate::optimize::LineupSlot;
    use crate::pool::Player;

    fn pool() -> PlayerPool {
        PlayerPool::build(vec![
            Player::new("qb1", &["QB"], 20.0).with_cost(40),
            Player::new("rb1", &["RB"], 12.0).with_cost(30),
            Player::new("rb2", &["RB"], 10.0).with_cost(20),
            Player::new("wr1", &["WR"], 15.0).with_cost(50),
        ])
        .unwrap()
    }

    fn constraints(pool: &PlayerPool, locked: &[&str], banned: &[&str]) -> Constraints {
        let slots = vec![
            RosterSlotSpec::new("QB", 1, &["QB"]),
            RosterSlotSpec::new("FLEX", 1, &["RB", "WR"]),
        ];
        let locked: Vec<String> = locked.iter().map(|s| s.to_string()).collect();
        let banned: Vec<String> = banned.iter().map(|s| s.to_string()).collect();
        Constraints::build(&slots, None, Some(100), &locked, &banned, pool).unwrap()
    }

    fn lineup(seats: &[(&str, &str)]) -> Lineup {
        Lineup {
            slots: seats
                .iter()
                .map(|&(label, player)| LineupSlot {
                    label: label.to_string(),
                    player: player.to_string(),
                })
                .collect(),
            total_cost: None,
            projection_total: 0.0,
            synergy_total: 0.0,
            total_value: 0.0,
        }
    }

    #[test]
    fn accepts_legal_lineup() {
        let pool = pool();
        let c = constraints(&pool, &[], &[]);
        assert_eq!(
            validate(&lineup(&[("QB", "qb1"), ("FLEX", "wr1")]), &c, &pool),
            Ok(())
        );
    }

    #[test]
    fn rejects_ineligible_player() {
        let pool = pool();
        let c = constraints(&pool, &[], &[]);
        let err = validate(&lineup(&[("QB", "rb1"), ("FLEX", "wr1")]), &c, &pool).unwrap_err();
        assert_eq!(
            err,
            LineupError::SlotMismatch {
                slot: "QB".into(),
                player: "rb1".into()
            }
        );
    }

    #[test]
    fn rejects_unknown_label_and_duplicates() {
        let pool = pool();
        let c = constraints(&pool, &[], &[]);
        assert!(matches!(
            validate(&lineup(&[("QB", "qb1"), ("TE", "wr1")]), &c, &pool),
            Err(LineupError::SlotMismatch { .. })
        ));
        assert!(matches!(
            validate(&lineup(&[("QB", "qb1"), ("FLEX", "qb1")]), &c, &pool),
            Err(LineupError::SlotMismatch { .. })
        ));
    }

    #[test]
    fn rejects_short_or_overfilled_roster() {
        let pool = pool();
        let c = constraints(&pool, &[], &[]);
        assert_eq!(
            validate(&lineup(&[("QB", "qb1")]), &c, &pool),
            Err(LineupError::SlotMismatch {
                slot: "FLEX".into(),
                player: VACANT.into()
            })
        );
        assert!(validate(
            &lineup(&[("QB", "qb1"), ("FLEX", "rb1"), ("FLEX", "rb2")]),
            &c,
            &pool
        )
        .is_err());
    }

    #[test]
    fn rejects_budget_overrun() {
        let pool = pool();
        let slots = vec![
            RosterSlotSpec::new("QB", 1, &["QB"]),
            RosterSlotSpec::new("FLEX", 1, &["RB", "WR"]),
        ];
        let c = Constraints::build(&slots, None, Some(80), &[], &[], &pool).unwrap();
        assert_eq!(
            validate(&lineup(&[("QB", "qb1"), ("FLEX", "wr1")]), &c, &pool),
            Err(LineupError::BudgetExceeded {
                total: 90,
                budget: 80
            })
        );
    }

    #[test]
    fn rejects_missing_lock_and_banned_player() {
        let pool = pool();
        let c = constraints(&pool, &["rb2"], &["wr1"]);
        assert_eq!(
            validate(&lineup(&[("QB", "qb1"), ("FLEX", "rb1")]), &c, &pool),
            Err(LineupError::MissingLocked {
                player: "rb2".into()
            })
        );
        assert_eq!(
            validate(&lineup(&[("QB", "qb1"), ("FLEX", "wr1")]), &c, &pool),
            Err(LineupError::BannedPresent {
                player: "wr1".into()
            })
        );
    }
}

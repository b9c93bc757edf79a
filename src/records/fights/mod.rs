
use itertools::Itertools;
use tracing::debug;

use super::CleanRecord;

/// A fight involving the focus fighter, with the outcome seen from their corner
#[derive(Debug, Clone, PartialEq)]
pub struct FocusFight<'a> {
    pub record: &'a CleanRecord,
    pub opponent: Option<&'a str>,
    pub outcome: Option<String>,
}

/// Career totals for the focus fighter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FightSummary {
    pub fighter: String,
    pub fight_count: usize,
    /// Derived outcomes, most frequent first
    pub outcomes: Vec<(String, usize)>,
    /// Methods of the fights the focus fighter won, most frequent first
    pub win_methods: Vec<(String, usize)>,
}

/// Outcome from the focus fighter's point of view.
///
/// As `fighter_a` the recorded outcome is kept. As `fighter_b` a win and a loss
/// swap; anything else (draw, no contest) is passed through unchanged rather
/// than being counted as a win, and a missing outcome stays `None`.
#[inline]
pub fn derive_outcome(record: &CleanRecord, fighter: &str) -> Option<String> {
    let outcome = record.outcome.as_deref()?;

    if is_fighter(record.fighter_a.as_deref(), fighter) {
        return Some(outcome.to_string());
    }

    if is_fighter(record.fighter_b.as_deref(), fighter) {
        let flipped = match outcome.trim().to_ascii_lowercase().as_str() {
            "win" => "Loss".to_string(),
            "loss" => "Win".to_string(),
            _ => outcome.to_string(),
        };
        return Some(flipped);
    }

    None
}

/// Records where the focus fighter appears on either side
#[inline]
pub fn filter_focus_fights<'a>(records: &'a [CleanRecord], fighter: &str) -> Vec<FocusFight<'a>> {
    let fights = records
        .iter()
        .filter_map(|record| {
            let opponent = if is_fighter(record.fighter_a.as_deref(), fighter) {
                record.fighter_b.as_deref()
            } else if is_fighter(record.fighter_b.as_deref(), fighter) {
                record.fighter_a.as_deref()
            } else {
                return None;
            };

            Some(FocusFight {
                record,
                opponent,
                outcome: derive_outcome(record, fighter),
            })
        })
        .collect::<Vec<_>>();

    debug!("{} of {} records involve {}", fights.len(), records.len(), fighter);
    fights
}

#[inline]
pub fn summarize(fights: &[FocusFight<'_>], fighter: &str) -> FightSummary {
    let outcomes = ranked(fights.iter().filter_map(|fight| fight.outcome.clone()));

    let win_methods = ranked(
        fights
            .iter()
            .filter(|fight| fight.outcome.as_deref() == Some("Win"))
            .filter_map(|fight| fight.record.method.clone()),
    );

    FightSummary {
        fighter: fighter.to_string(),
        fight_count: fights.len(),
        outcomes,
        win_methods,
    }
}

fn is_fighter(name: Option<&str>, fighter: &str) -> bool {
    name.is_some_and(|name| name.trim() == fighter.trim())
}

// Ties keep first-seen order
fn ranked<I>(values: I) -> Vec<(String, usize)>
where
    I: Iterator<Item = String>,
{
    let values = values.collect::<Vec<_>>();
    let counts = values.iter().counts();

    values
        .iter()
        .unique()
        .map(|value| (value.clone(), counts[value]))
        .sorted_by(|a, b| b.1.cmp(&a.1))
        .collect()
}

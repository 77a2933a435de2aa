use std::collections::HashSet;

use crate::models::Candidate;

/// Scores at or above this go to the high-scored pool
pub const SCORE_THRESHOLD: f64 = 0.3;

/// Interleave target: position i swaps toward floor(i * 0.7)
const INTERLEAVE_FACTOR: f64 = 0.7;

/// A mixed selection plus the size of its protected personalized head
#[derive(Debug, Clone)]
pub struct MixOutcome {
    pub items: Vec<Candidate>,
    /// How many leading items came from the high-scored pool; the interleave
    /// step starts its swaps at this boundary
    pub personalized_count: usize,
}

impl MixOutcome {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            personalized_count: 0,
        }
    }
}

/// Splits scored candidates at [`SCORE_THRESHOLD`], preserving input order
pub fn partition(candidates: Vec<Candidate>) -> (Vec<Candidate>, Vec<Candidate>) {
    candidates
        .into_iter()
        .partition(|c| c.score >= SCORE_THRESHOLD)
}

/// Picks `target` items mixing the two pools by `diversity_ratio`
///
/// round(target * ratio) slots go to low-scored discovery picks, the rest to
/// the head of the high-scored pool. Low picks skip identities already chosen
/// from the high pool. When either pool runs short the other backfills, so
/// the outcome only falls below `target` when both pools together do.
pub fn select(
    high: Vec<Candidate>,
    low: Vec<Candidate>,
    diversity_ratio: f64,
    target: usize,
) -> MixOutcome {
    let target = target.min(high.len() + low.len());
    if target == 0 {
        return MixOutcome::empty();
    }

    let ratio = diversity_ratio.clamp(0.0, 1.0);
    let diverse_quota = (target as f64 * ratio).round() as usize;
    let personalized_quota = target.saturating_sub(diverse_quota);

    let mut high = high.into_iter();
    let mut items: Vec<Candidate> = high.by_ref().take(personalized_quota).collect();
    let personalized_count = items.len();

    let chosen: HashSet<String> = items.iter().map(|c| c.identity.clone()).collect();
    for candidate in low {
        if items.len() >= target {
            break;
        }
        if chosen.contains(&candidate.identity) {
            continue;
        }
        items.push(candidate);
    }

    // Low pool ran short: top back up from the rest of the high pool
    for candidate in high {
        if items.len() >= target {
            break;
        }
        items.push(candidate);
    }

    MixOutcome {
        items,
        personalized_count,
    }
}

/// Spreads discovery picks through the tail of a display-sorted page
///
/// Runs after the final sort (sorting afterwards would undo it): each
/// position past the personalized boundary swaps toward floor(i * 0.7).
/// A zero boundary means no mixing happened and the order stands.
pub fn interleave(items: &mut [Candidate], personalized_count: usize) {
    if personalized_count == 0 || personalized_count >= items.len() {
        return;
    }
    for i in personalized_count..items.len() {
        let j = (i as f64 * INTERLEAVE_FACTOR).floor() as usize;
        items.swap(i, j);
    }
}

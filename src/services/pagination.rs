use std::cmp::Ordering;

use crate::models::{Candidate, CandidateKind};
use crate::services::diversity;

/// Display order: score descending, ties on type (movies first) then title
///
/// Stable sort so equal candidates keep their accumulation order; NaN scores
/// cannot occur (scores are clamped) but compare as equal if they did.
pub fn sort_for_display(items: &mut [Candidate]) {
    items.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.kind.cmp(&b.kind))
            .then_with(|| a.title.cmp(&b.title))
    });
}

/// Sorts, interleaves and slices the accumulated pool down to one page
///
/// `personalized_count` is the protected head size reported by the diversity
/// mix (zero when no mix ran). The requested page is cut after interleaving;
/// a page beyond the pool comes back shorter or empty rather than erroring.
pub fn paginate(
    mut items: Vec<Candidate>,
    personalized_count: usize,
    page: usize,
    limit: usize,
) -> Vec<Candidate> {
    sort_for_display(&mut items);
    diversity::interleave(&mut items, personalized_count);
    items
        .into_iter()
        .skip(page.saturating_mul(limit))
        .take(limit)
        .collect()
}

/// One page of inert sample entries, served only when the catalog yields
/// nothing and padding is switched on
pub fn placeholder_page(limit: usize) -> Vec<Candidate> {
    (0..limit)
        .map(|i| Candidate {
            identity: format!("placeholder:{}", i),
            source_id: format!("placeholder-{}", i),
            kind: CandidateKind::Movie,
            title: format!("Sample Title {}", i + 1),
            genres: Vec::new(),
            media_locator: Some(format!("sample://title-{}", i + 1)),
            episode_ref: None,
            is_next_episode: false,
            is_new_show: false,
            watch_count: None,
            last_updated: None,
            score: 0.0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(title: &str, kind: CandidateKind, score: f64) -> Candidate {
        Candidate {
            identity: format!("{}:{}", kind, title),
            source_id: title.to_string(),
            kind,
            title: title.to_string(),
            genres: vec![],
            media_locator: Some(format!("/m/{}.mp4", title)),
            episode_ref: None,
            is_next_episode: false,
            is_new_show: false,
            watch_count: None,
            last_updated: None,
            score,
        }
    }

    #[test]
    fn test_sort_orders_by_score_then_type_then_title() {
        let mut items = vec![
            candidate("Beta", CandidateKind::Tv, 0.5),
            candidate("Alpha", CandidateKind::Movie, 0.9),
            candidate("Gamma", CandidateKind::Movie, 0.5),
            candidate("Delta", CandidateKind::Movie, 0.5),
        ];
        sort_for_display(&mut items);
        let titles: Vec<&str> = items.iter().map(|c| c.title.as_str()).collect();
        // 0.9 first; among the 0.5 ties movies precede tv, then title order
        assert_eq!(titles, ["Alpha", "Delta", "Gamma", "Beta"]);
    }

    #[test]
    fn test_paginate_slices_requested_page() {
        let items: Vec<Candidate> = (0..7)
            .map(|i| candidate(&format!("t{}", i), CandidateKind::Movie, 1.0 - i as f64 * 0.1))
            .collect();

        let page0 = paginate(items.clone(), 0, 0, 3);
        let page1 = paginate(items.clone(), 0, 1, 3);
        let page2 = paginate(items.clone(), 0, 2, 3);
        let page3 = paginate(items, 0, 3, 3);

        assert_eq!(page0.len(), 3);
        assert_eq!(page1.len(), 3);
        assert_eq!(page2.len(), 1);
        assert!(page3.is_empty());
        assert_eq!(page0[0].title, "t0");
        assert_eq!(page1[0].title, "t3");
        assert_eq!(page2[0].title, "t6");
    }

    #[test]
    fn test_paginate_applies_interleave_after_sorting() {
        // Six high scorers ahead of four low; boundary 6 pulls tail items in
        let mut items: Vec<Candidate> = (0..6)
            .map(|i| candidate(&format!("h{}", i), CandidateKind::Movie, 0.9 - i as f64 * 0.01))
            .collect();
        items.extend((0..4).map(|i| {
            candidate(&format!("l{}", i), CandidateKind::Movie, 0.2 - i as f64 * 0.01)
        }));

        let page = paginate(items, 6, 0, 10);
        assert_eq!(page.len(), 10);
        // i=6 swaps toward floor(6*0.7)=4: a low scorer lands inside the
        // former high block while the top of the page stays personalized
        assert!(page[4].title.starts_with('l'));
        assert!(page[..4].iter().all(|c| c.title.starts_with('h')));
    }

    #[test]
    fn test_placeholder_page_shape() {
        let page = placeholder_page(3);
        assert_eq!(page.len(), 3);
        assert_eq!(page[0].identity, "placeholder:0");
        assert_eq!(page[0].title, "Sample Title 1");
        assert_eq!(page[0].media_locator.as_deref(), Some("sample://title-1"));
        assert!(page.iter().all(|c| c.score == 0.0));
    }
}

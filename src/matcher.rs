use std::collections::HashSet;

/// Jaccard similarity of two word sets: |intersection| / |union|.
/// An empty union scores 0.
pub fn jaccard(a: &HashSet<&str>, b: &HashSet<&str>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    intersection as f64 / union as f64
}

/// Find the window of `body` most similar to `passage`.
///
/// Slides a window of exactly k consecutive words (k = passage word
/// count) over the body. Each window is prefiltered by Jaccard word-set
/// similarity; only windows scoring above 0.6 pay for the precise
/// normalized-edit-distance score, so the expensive comparison runs on
/// a handful of candidates instead of every position. Ties keep the
/// leftmost window.
///
/// Returns `(0.0, None)` when the body has fewer words than the passage
/// or no window passes the prefilter.
pub fn find_best_window(passage: &str, body: &str) -> (f64, Option<String>) {
    let passage_words: Vec<&str> = passage.split_whitespace().collect();
    let body_words: Vec<&str> = body.split_whitespace().collect();
    let k = passage_words.len();

    if k == 0 || body_words.len() < k {
        return (0.0, None);
    }

    let passage_set: HashSet<&str> = passage_words.iter().copied().collect();

    let mut max_sim = 0.0;
    let mut most_similar = None;

    for window in body_words.windows(k) {
        let window_set: HashSet<&str> = window.iter().copied().collect();
        if jaccard(&window_set, &passage_set) <= 0.6 {
            continue;
        }
        let joined = window.join(" ");
        let sim = strsim::normalized_levenshtein(passage, &joined);
        if sim > max_sim {
            max_sim = sim;
            most_similar = Some(joined);
        }
    }

    (max_sim, most_similar)
}

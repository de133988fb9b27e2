use serde::Serialize;

use crate::matcher::find_best_window;

/// A gazetteer passage tied to one map record, to be located in a
/// document body.
#[derive(Debug, Clone, Serialize)]
pub struct LocationRecord {
    pub record_id: i64,
    pub passage: String,
}

/// Why a record could not be annotated. All of these are expected
/// steady-state outcomes; hand correction is the recovery path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    /// The passage is empty (possibly after markup truncation).
    EmptyPassage,
    /// No window scored above the 0.7 similarity threshold.
    NoSimilarMatch,
    /// Markup truncation removed more than 30% of the passage.
    TruncationTooAggressive,
    /// The (possibly truncated) passage is absent from the body.
    NotFound,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmptyPassage => "empty passage",
            Self::NoSimilarMatch => "no sufficiently similar match",
            Self::TruncationTooAggressive => "truncation too aggressive",
            Self::NotFound => "passage could not be found",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome")]
pub enum Outcome {
    /// The passage appeared verbatim in the body.
    Direct,
    /// A fuzzy window match was annotated instead.
    Indirect { score: f64 },
    Skipped { reason: SkipReason },
}

/// The result of attempting one record against the body.
#[derive(Debug, Clone, Serialize)]
pub struct RecordOutcome {
    pub record_id: i64,
    pub outcome: Outcome,
}

/// Strip markup fragments that leaked into gazetteer text. If the
/// passage contains `<`, keep everything before the first `<`; if it
/// contains `>`, keep everything after the first `>` instead. The two
/// checks are independent, so `>` overrides `<` when both apply.
/// Returns None when the passage contains neither character.
fn truncate_markup(passage: &str) -> Option<&str> {
    let mut kept = None;
    if let Some(idx) = passage.find('<') {
        kept = Some(&passage[..idx]);
    }
    if let Some(idx) = passage.find('>') {
        kept = Some(&passage[idx + 1..]);
    }
    kept
}

fn wrap_first(body: &str, passage: &str, record_id: i64) -> String {
    let marker = format!("<span id=\"record_{record_id}\">{passage}</span>");
    body.replacen(passage, &marker, 1)
}

/// Attempt one record against the body. On success the returned body has
/// the first occurrence of the matched passage wrapped in an identifying
/// span; on any skip the body is returned unchanged.
pub fn apply_record(body: String, record: &LocationRecord) -> (String, Outcome) {
    if record.passage.trim().is_empty() {
        return (body, Outcome::Skipped { reason: SkipReason::EmptyPassage });
    }

    // Direct case: the exact passage is in the text.
    let (mut passage, outcome) = if body.contains(&record.passage) {
        (record.passage.clone(), Outcome::Direct)
    } else {
        // Indirect case: the passage may have been mistranscribed.
        let (score, window) = find_best_window(&record.passage, &body);
        match window {
            Some(w) if score > 0.7 => (w, Outcome::Indirect { score }),
            _ => return (body, Outcome::Skipped { reason: SkipReason::NoSimilarMatch }),
        }
    };

    if let Some(kept) = truncate_markup(&passage) {
        let ratio = kept.chars().count() as f64 / passage.chars().count() as f64;
        if ratio < 0.7 {
            return (
                body,
                Outcome::Skipped { reason: SkipReason::TruncationTooAggressive },
            );
        }
        passage = kept.to_string();
    }

    if passage.trim().is_empty() {
        return (body, Outcome::Skipped { reason: SkipReason::EmptyPassage });
    }

    if !body.contains(&passage) {
        // Truncation can change the string enough that it no longer occurs.
        return (body, Outcome::Skipped { reason: SkipReason::NotFound });
    }

    let annotated = wrap_first(&body, &passage, record.record_id);
    (annotated, outcome)
}

/// Annotate every record against the body, in order, as a fold:
/// each replacement is applied against the already-modified body, so a
/// later record's search sees earlier markers. Returns the final body
/// and one outcome per record.
pub fn annotate(body: String, records: &[LocationRecord]) -> (String, Vec<RecordOutcome>) {
    let mut outcomes = Vec::with_capacity(records.len());
    let mut body = body;
    for record in records {
        let (next, outcome) = apply_record(body, record);
        body = next;
        outcomes.push(RecordOutcome {
            record_id: record.record_id,
            outcome,
        });
    }
    (body, outcomes)
}

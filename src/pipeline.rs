use anyhow::{Context, Result};

use crate::annotate::{annotate, LocationRecord, RecordOutcome};
use crate::normalize::normalize;
use crate::tree::{parse_document, serialize, take_element};

/// Fixed header block prepended to every output page.
pub const FRONTMATTER: &str = "---\nlayout: text\n---\n";

pub struct Converted {
    /// Final page text: frontmatter + annotated flattened body.
    pub page: String,
    pub outcomes: Vec<RecordOutcome>,
}

/// Convert one XML document: parse, extract the `<text>` node, normalize
/// it to block-level structure, serialize to a flat line, annotate the
/// location records, and prepend the frontmatter.
pub fn convert_document(xml: &str, records: &[LocationRecord]) -> Result<Converted> {
    let mut root = parse_document(xml)?;
    let mut text = take_element(&mut root, "text").context("document has no <text> node")?;
    normalize(&mut text);
    let body = serialize(&text);
    let (annotated, outcomes) = annotate(body, records);
    Ok(Converted {
        page: format!("{FRONTMATTER}{annotated}"),
        outcomes,
    })
}

use crate::tree::{Element, Node};

// ── Rule tables ──────────────────────────────────────────────────────

/// Predicate over an element: tag name plus zero or more attribute
/// key/value pairs, all of which must match exactly.
#[derive(Debug, Clone, Copy)]
pub struct TagMatch {
    pub tag: &'static str,
    pub attrs: &'static [(&'static str, &'static str)],
}

impl TagMatch {
    pub fn matches(&self, el: &Element) -> bool {
        el.name == self.tag && self.attrs.iter().all(|(k, v)| el.attr(k) == Some(v))
    }
}

/// Retag rule: rename matching elements to `newtag`.
#[derive(Debug, Clone, Copy)]
pub struct TagMap {
    pub from: TagMatch,
    pub newtag: &'static str,
}

/// Nodes removed outright, subtree included.
pub const TAGS_TO_REMOVE: &[TagMatch] = &[
    TagMatch { tag: "figure", attrs: &[] },
    TagMatch { tag: "pb", attrs: &[] },
    TagMatch { tag: "div1", attrs: &[("type", "contents")] },
];

/// TEI tags renamed into the output vocabulary. Applied in order, each
/// rule's matches processed fully before the next; first applicable rule
/// wins per node.
pub const TAG_MAPS: &[TagMap] = &[
    TagMap {
        from: TagMatch { tag: "titlepart", attrs: &[("type", "main")] },
        newtag: "h1",
    },
    TagMap {
        from: TagMatch { tag: "titlepart", attrs: &[("type", "subtitle")] },
        newtag: "h2",
    },
    TagMap {
        from: TagMatch { tag: "head", attrs: &[] },
        newtag: "h3",
    },
    TagMap {
        from: TagMatch { tag: "lb", attrs: &[] },
        newtag: "br",
    },
];

/// The only tags that survive flattening; everything else is unwrapped.
pub const BLOCK_TAGS: &[&str] = &["h1", "h2", "h3", "p"];

// ── Passes ───────────────────────────────────────────────────────────

/// Removal pass: delete every node (and its subtree) matching any rule.
pub fn remove_tags(el: &mut Element, rules: &[TagMatch]) {
    el.children.retain(|child| match child {
        Node::Element(e) => !rules.iter().any(|r| r.matches(e)),
        Node::Text(_) => true,
    });
    for child in &mut el.children {
        if let Node::Element(e) = child {
            remove_tags(e, rules);
        }
    }
}

fn rename_matching(el: &mut Element, rule: &TagMap) {
    for child in &mut el.children {
        if let Node::Element(e) = child {
            if rule.from.matches(e) {
                e.name = rule.newtag.to_string();
            }
            rename_matching(e, rule);
        }
    }
}

/// Retagging pass: apply each rename rule over the whole tree in order.
pub fn convert_tags(el: &mut Element, rules: &[TagMap]) {
    for rule in rules {
        rename_matching(el, rule);
    }
}

/// Flattening pass: unwrap every element whose tag is not block-level,
/// promoting its children into its position. Post-order, so nested
/// non-block wrappers collapse in one call; idempotent.
pub fn flatten(el: &mut Element) {
    let old = std::mem::take(&mut el.children);
    for child in old {
        match child {
            Node::Element(mut e) => {
                flatten(&mut e);
                if BLOCK_TAGS.contains(&e.name.as_str()) {
                    el.children.push(Node::Element(e));
                } else {
                    el.children.append(&mut e.children);
                }
            }
            text => el.children.push(text),
        }
    }
}

/// Run the three passes: remove, retag, flatten. The element is mutated
/// in place and afterwards holds block-level structure only.
pub fn normalize(el: &mut Element) {
    remove_tags(el, TAGS_TO_REMOVE);
    convert_tags(el, TAG_MAPS);
    flatten(el);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{parse_document, serialize, take_element};

    fn text_of(xml: &str) -> Element {
        let mut root = parse_document(xml).unwrap();
        take_element(&mut root, "text").unwrap()
    }

    #[test]
    fn test_remove_plain_and_attr_filtered() {
        let mut t = text_of(
            "<text><figure>art</figure><div1 type=\"contents\">toc</div1>\
             <div1 type=\"chapter\"><p>kept</p></div1><pb/></text>",
        );
        remove_tags(&mut t, TAGS_TO_REMOVE);
        convert_tags(&mut t, TAG_MAPS);
        flatten(&mut t);
        assert_eq!(serialize(&t), "<p> kept </p>");
    }

    #[test]
    fn test_attr_filter_requires_exact_match() {
        let rule = TagMatch { tag: "div1", attrs: &[("type", "contents")] };
        let mut t = text_of("<text><div1 type=\"Contents\"><p>x</p></div1></text>");
        remove_tags(&mut t, &[rule]);
        flatten(&mut t);
        assert_eq!(serialize(&t), "<p> x </p>");
    }

    #[test]
    fn test_convert_first_rule_wins() {
        // A main titlepart renamed to h1 no longer matches the subtitle rule.
        let mut t = text_of(
            "<text><titlepart type=\"main\">T</titlepart>\
             <titlepart type=\"subtitle\">S</titlepart></text>",
        );
        convert_tags(&mut t, TAG_MAPS);
        flatten(&mut t);
        assert_eq!(serialize(&t), "<h1 type=\"main\"> T </h1> <h2 type=\"subtitle\"> S </h2>");
    }

    #[test]
    fn test_flatten_unwraps_inline_tags() {
        let mut t = text_of("<text><p>near <placeName>Boston</placeName> harbor</p></text>");
        flatten(&mut t);
        assert_eq!(serialize(&t), "<p> near Boston harbor </p>");
    }

    #[test]
    fn test_flatten_preserves_sibling_order() {
        let mut t = text_of("<text>a<wrap>b<inner>c</inner>d</wrap>e</text>");
        flatten(&mut t);
        assert_eq!(serialize(&t), "a b c d e");
    }

    #[test]
    fn test_flatten_idempotent() {
        let mut t = text_of(
            "<text><div1><head>H</head><p>one <hi rend=\"italic\">two</hi></p></div1></text>",
        );
        convert_tags(&mut t, TAG_MAPS);
        flatten(&mut t);
        let once = t.clone();
        flatten(&mut t);
        assert_eq!(t, once);
    }

    #[test]
    fn test_normalize_full() {
        let mut t = text_of(
            "<text><front><titlepart type=\"main\">A Journey</titlepart>\
             <titlepart type=\"subtitle\">North</titlepart></front>\
             <pb/><body><div1 type=\"contents\"><p>toc</p></div1>\
             <div1 type=\"chapter\"><head>I.</head>\
             <p>We went<lb/>onward.</p></div1></body></text>",
        );
        normalize(&mut t);
        assert_eq!(
            serialize(&t),
            "<h1 type=\"main\"> A Journey </h1> <h2 type=\"subtitle\"> North </h2> \
             <h3> I. </h3> <p> We went onward. </p>"
        );
    }
}

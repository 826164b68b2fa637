//! Outline extraction.
//!
//! Flattens heading texts, in document order, filtered by the
//! configured maximum depth. Headings nested in quotes or list items
//! count too.

use crate::tree::{Block, inline_text, normalize_text};

/// Collect heading texts at or above `max_depth`.
#[must_use]
pub(crate) fn build_outline(blocks: &[Block], max_depth: u8) -> Vec<String> {
    let mut outline: Vec<String> = Vec::new();
    visit(blocks, max_depth, &mut outline);
    outline
}

fn visit(blocks: &[Block], max_depth: u8, outline: &mut Vec<String>) {
    for block in blocks {
        match block {
            Block::Heading { depth, children } => {
                if *depth <= max_depth {
                    let title = normalize_text(&inline_text(children));
                    if !title.is_empty() {
                        outline.push(title);
                    }
                }
            }
            Block::BlockQuote(children) => visit(children, max_depth, outline),
            Block::List { items, .. } => {
                for item in items {
                    visit(&item.blocks, max_depth, outline);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::tree::parse_markdown;

    #[test]
    fn test_outline_in_document_order() {
        let blocks = parse_markdown("# One\n\ntext\n\n## Two\n\n### Three");
        assert_eq!(build_outline(&blocks, 6), vec!["One", "Two", "Three"]);
    }

    #[test]
    fn test_outline_depth_filtered() {
        let blocks = parse_markdown("# One\n\n## Two\n\n### Three");
        assert_eq!(build_outline(&blocks, 2), vec!["One", "Two"]);
    }

    #[test]
    fn test_outline_ignores_non_headings() {
        let blocks = parse_markdown("# Title\n\n- item one\n- item two\n\n```\n# not a heading\n```");
        assert_eq!(build_outline(&blocks, 6), vec!["Title"]);
    }

    #[test]
    fn test_outline_includes_quoted_heading() {
        let blocks = parse_markdown("> ## Quoted Section");
        assert_eq!(build_outline(&blocks, 6), vec!["Quoted Section"]);
    }
}

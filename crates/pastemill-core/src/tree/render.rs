//! Canonical markdown serialization.
//!
//! Renders the cleaned tree back to the pipeline's canonical text: ATX
//! headings, `-` bullets, incrementing ordered markers, backtick fences
//! sized past any embedded run, pipe tables with a dash separator.
//! Plain text is emitted verbatim: URLs, underscores, and brackets are
//! never backslash-escaped; pipes are escaped only inside table cells.

use super::{Block, Inline, ListItem};

/// Render a block sequence to canonical markdown.
pub(crate) fn render_blocks(blocks: &[Block]) -> String {
    let rendered: Vec<String> = blocks.iter().map(render_block).collect();
    rendered.join("\n\n")
}

fn render_block(block: &Block) -> String {
    match block {
        Block::Heading { depth, children } => {
            format!("{} {}", "#".repeat(usize::from(*depth)), render_inline(children))
        }
        Block::Paragraph(children) => render_inline(children),
        Block::List { ordered, start, items } => render_list(*ordered, *start, items),
        Block::Code { language, code } => render_code(language.as_deref(), code),
        Block::BlockQuote(children) => {
            let inner = render_blocks(children);
            inner
                .lines()
                .map(|line| {
                    if line.is_empty() {
                        ">".to_owned()
                    } else {
                        format!("> {line}")
                    }
                })
                .collect::<Vec<_>>()
                .join("\n")
        }
        Block::Table { rows } => render_table(rows),
        Block::Rule => "---".to_owned(),
        Block::Html(raw) => raw.trim_end_matches('\n').to_owned(),
    }
}

fn render_list(ordered: bool, start: u64, items: &[ListItem]) -> String {
    let mut lines: Vec<String> = Vec::new();

    for (index, item) in items.iter().enumerate() {
        let marker = if ordered {
            format!("{}.", start + index as u64)
        } else {
            "-".to_owned()
        };
        let indent = " ".repeat(marker.len() + 1);
        let body = render_blocks(&item.blocks);

        for (line_index, line) in body.lines().enumerate() {
            if line_index == 0 {
                lines.push(format!("{marker} {line}"));
            } else if line.is_empty() {
                lines.push(String::new());
            } else {
                lines.push(format!("{indent}{line}"));
            }
        }
    }

    lines.join("\n")
}

fn render_code(language: Option<&str>, code: &str) -> String {
    // The fence must outrun any backtick run inside the code
    let longest_run = code
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest_run.max(2) + 1);
    let body = code.trim_end_matches('\n');
    format!("{fence}{}\n{body}\n{fence}", language.unwrap_or(""))
}

fn render_table(rows: &[super::TableRow]) -> String {
    let mut lines: Vec<String> = Vec::new();
    for (index, row) in rows.iter().enumerate() {
        let cells: Vec<String> = row.cells.iter().map(|cell| render_cell(cell)).collect();
        lines.push(format!("| {} |", cells.join(" | ")));
        if index == 0 {
            let dashes: Vec<&str> = row.cells.iter().map(|_| "---").collect();
            lines.push(format!("| {} |", dashes.join(" | ")));
        }
    }
    lines.join("\n")
}

fn render_cell(cell: &[Inline]) -> String {
    render_inline(cell).replace('\n', " ").replace('|', "\\|")
}

fn render_inline(nodes: &[Inline]) -> String {
    let mut output = String::new();
    for node in nodes {
        match node {
            Inline::Text(value) => output.push_str(value),
            Inline::Code(code) => output.push_str(&render_inline_code(code)),
            Inline::Emphasis(children) => {
                let inner = render_inline(children);
                output.push_str(&format!("*{inner}*"));
            }
            Inline::Strong(children) => {
                let inner = render_inline(children);
                output.push_str(&format!("**{inner}**"));
            }
            Inline::Strikethrough(children) => {
                let inner = render_inline(children);
                output.push_str(&format!("~~{inner}~~"));
            }
            Inline::Link { url, children } => {
                let text = render_inline(children);
                let label = if text.is_empty() { url.as_str() } else { text.as_str() };
                output.push_str(&format!("[{label}]({url})"));
            }
            Inline::Image { url, alt } => {
                output.push_str(&format!("![{alt}]({url})"));
            }
            Inline::SoftBreak | Inline::HardBreak => output.push('\n'),
        }
    }
    output
}

fn render_inline_code(code: &str) -> String {
    if code.contains('`') {
        format!("`` {code} ``")
    } else {
        format!("`{code}`")
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::tree::parse_markdown;

    fn roundtrip(input: &str) -> String {
        render_blocks(&parse_markdown(input))
    }

    #[test]
    fn test_heading_roundtrip() {
        assert_eq!(roundtrip("## Section Title"), "## Section Title");
    }

    #[test]
    fn test_paragraph_roundtrip() {
        assert_eq!(roundtrip("Plain text."), "Plain text.");
    }

    #[test]
    fn test_urls_not_escaped() {
        let text = roundtrip("See https://example.com/path?x=1 and content[].items[].id here");
        assert!(text.contains("https://example.com/path?x=1"));
        assert!(text.contains("content[].items[].id"));
        assert!(!text.contains("\\:"));
        assert!(!text.contains("\\["));
    }

    #[test]
    fn test_underscores_not_escaped() {
        let text = roundtrip("Status IN_DELIVERY applies");
        assert_eq!(text, "Status IN_DELIVERY applies");
    }

    #[test]
    fn test_bullet_list() {
        assert_eq!(roundtrip("* one\n* two"), "- one\n- two");
    }

    #[test]
    fn test_ordered_list_renumbered_from_start() {
        assert_eq!(roundtrip("1. first\n1. second"), "1. first\n2. second");
    }

    #[test]
    fn test_nested_list_indent() {
        let text = roundtrip("- outer\n  - inner");
        assert_eq!(text, "- outer\n  - inner");
    }

    #[test]
    fn test_code_fence_roundtrip() {
        assert_eq!(roundtrip("```json\n{}\n```"), "```json\n{}\n```");
    }

    #[test]
    fn test_fence_grows_past_embedded_backticks() {
        let text = render_blocks(&[crate::tree::Block::Code {
            language: None,
            code: "a ``` b".to_owned(),
        }]);
        assert!(text.starts_with("````"));
    }

    #[test]
    fn test_table_roundtrip() {
        let input = "| A | B |\n| --- | --- |\n| 1 | 2 |";
        assert_eq!(roundtrip(input), input);
    }

    #[test]
    fn test_table_cell_pipe_escaped() {
        let text = render_blocks(&[crate::tree::Block::Table {
            rows: vec![
                crate::tree::TableRow {
                    cells: vec![vec![Inline::Text("a|b".to_owned())]],
                },
                crate::tree::TableRow {
                    cells: vec![vec![Inline::Text("c".to_owned())]],
                },
            ],
        }]);
        assert!(text.contains("a\\|b"));
    }

    #[test]
    fn test_blockquote_roundtrip() {
        assert_eq!(roundtrip("> quoted"), "> quoted");
    }

    #[test]
    fn test_inline_marks_roundtrip() {
        assert_eq!(
            roundtrip("**bold** and *em* and ~~gone~~ and `code`"),
            "**bold** and *em* and ~~gone~~ and `code`"
        );
    }

    #[test]
    fn test_link_roundtrip() {
        assert_eq!(
            roundtrip("[docs](https://example.com/docs)"),
            "[docs](https://example.com/docs)"
        );
    }

    #[test]
    fn test_inline_code_with_backtick() {
        assert_eq!(render_inline_code("a`b"), "`` a`b ``");
    }
}

//! Sanitized markup to canonical text conversion.
//!
//! Walks the sanitized element tree emitting the pipeline's canonical
//! structured text: ATX headings, `-` bullets, fenced code, pipe tables.
//! Whitespace-only `div`/`span` wrappers disappear; content-bearing ones
//! are unwrapped to their content.

use crate::sanitize::{HtmlElement, HtmlNode};

/// Convert a sanitized element tree to canonical markdown.
pub(crate) fn html_to_markdown(root: &HtmlElement) -> String {
    let blocks = render_blocks(&root.children);
    collapse_outer_blank_runs(&blocks.join("\n\n"))
}

/// Render a child list as a sequence of block strings.
fn render_blocks(children: &[HtmlNode]) -> Vec<String> {
    let mut blocks: Vec<String> = Vec::new();
    // Consecutive inline nodes merge into one implicit paragraph
    let mut pending_inline = String::new();

    for child in children {
        match child {
            HtmlNode::Text(_) => {
                pending_inline.push_str(&render_inline_node(child));
            }
            HtmlNode::Element(element) if is_inline_tag(&element.tag) => {
                pending_inline.push_str(&render_inline_node(child));
            }
            HtmlNode::Element(element) => {
                flush_paragraph(&mut blocks, &mut pending_inline);
                blocks.extend(render_block_element(element));
            }
        }
    }
    flush_paragraph(&mut blocks, &mut pending_inline);
    blocks
}

/// Push accumulated inline content as a paragraph block.
fn flush_paragraph(blocks: &mut Vec<String>, pending: &mut String) {
    let text = pending.trim().to_owned();
    pending.clear();
    if !text.is_empty() {
        blocks.push(text);
    }
}

/// Render one block-level element to zero or more block strings.
fn render_block_element(element: &HtmlElement) -> Vec<String> {
    match element.tag.as_str() {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = element.tag[1..].parse::<usize>().unwrap_or(1);
            let text = render_inline(&element.children);
            let text = text.trim();
            if text.is_empty() {
                Vec::new()
            } else {
                vec![format!("{} {text}", "#".repeat(level))]
            }
        }
        "p" => {
            let text = render_inline(&element.children);
            let text = text.trim();
            if text.is_empty() {
                Vec::new()
            } else {
                vec![text.to_owned()]
            }
        }
        "hr" => vec!["---".to_owned()],
        "blockquote" => {
            let inner = render_blocks(&element.children).join("\n\n");
            if inner.trim().is_empty() {
                Vec::new()
            } else {
                vec![
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
                        .join("\n"),
                ]
            }
        }
        "pre" => vec![render_code_block(element)],
        "ul" => render_list(element, false),
        "ol" => render_list(element, true),
        "table" => {
            let table = build_gfm_table(element);
            if table.is_empty() { Vec::new() } else { vec![table] }
        }
        // div and unwrapped containers are transparent at block level
        "div" => render_blocks(&element.children),
        _ => {
            let text = render_inline_node(&HtmlNode::Element(element.clone()));
            let text = text.trim().to_owned();
            if text.is_empty() { Vec::new() } else { vec![text] }
        }
    }
}

/// Render a `pre` element as a fenced code block.
fn render_code_block(element: &HtmlElement) -> String {
    // Language comes from the nested code element's class, if any
    let language = find_code_class(element)
        .and_then(|class| {
            class
                .split_whitespace()
                .find_map(|part| part.strip_prefix("language-").map(str::to_owned))
        })
        .unwrap_or_default();

    let mut code = String::new();
    collect_raw_text(&element.children, &mut code);
    let code = code.trim_end_matches('\n').trim_start_matches('\n');
    format!("```{language}\n{code}\n```")
}

fn find_code_class(element: &HtmlElement) -> Option<String> {
    for child in &element.children {
        if let HtmlNode::Element(el) = child {
            if el.tag == "code" {
                return el.attr("class").map(str::to_owned);
            }
        }
    }
    element.attr("class").map(str::to_owned)
}

/// Collect text verbatim (used inside `pre` where spacing is content).
fn collect_raw_text(children: &[HtmlNode], out: &mut String) {
    for child in children {
        match child {
            HtmlNode::Text(text) => out.push_str(text),
            HtmlNode::Element(el) if el.tag == "br" => out.push('\n'),
            HtmlNode::Element(el) => collect_raw_text(&el.children, out),
        }
    }
}

/// Render a list element with `-` or `1.` markers.
fn render_list(element: &HtmlElement, ordered: bool) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut index = 0usize;

    for child in &element.children {
        let HtmlNode::Element(item) = child else {
            continue;
        };
        if item.tag != "li" {
            continue;
        }
        index += 1;
        let marker = if ordered {
            format!("{index}.")
        } else {
            "-".to_owned()
        };

        let item_blocks = render_blocks(&item.children);
        if item_blocks.is_empty() {
            continue;
        }
        for (block_index, block) in item_blocks.iter().enumerate() {
            for (line_index, line) in block.lines().enumerate() {
                if block_index == 0 && line_index == 0 {
                    lines.push(format!("{marker} {line}"));
                } else {
                    lines.push(format!("  {line}"));
                }
            }
        }
    }

    if lines.is_empty() {
        Vec::new()
    } else {
        vec![lines.join("\n")]
    }
}

/// Build a GFM pipe table from a table element.
///
/// The header is the first row of a head group (or the first row
/// overall); every row is padded or truncated to the widest row seen.
fn build_gfm_table(table: &HtmlElement) -> String {
    let mut head_rows: Vec<Vec<String>> = Vec::new();
    let mut body_rows: Vec<Vec<String>> = Vec::new();
    let mut all_rows: Vec<Vec<String>> = Vec::new();
    collect_table_rows(table, false, &mut head_rows, &mut body_rows, &mut all_rows);

    let (header, body) = if head_rows.is_empty() {
        match all_rows.split_first() {
            Some((first, rest)) => (first.clone(), rest.to_vec()),
            None => return String::new(),
        }
    } else {
        let header = head_rows[0].clone();
        let body = if body_rows.is_empty() {
            // All rows minus the one chosen as header
            let mut rest = all_rows;
            if let Some(position) = rest.iter().position(|row| *row == header) {
                rest.remove(position);
            }
            rest
        } else {
            body_rows
        };
        (header, body)
    };

    let col_count = body
        .iter()
        .map(Vec::len)
        .chain([header.len()])
        .max()
        .unwrap_or(1)
        .max(1);

    let mut lines = Vec::with_capacity(body.len() + 2);
    lines.push(format_row(&normalize_cells(&header, col_count)));
    lines.push(format_row(&vec!["---".to_owned(); col_count]));
    for row in &body {
        lines.push(format_row(&normalize_cells(row, col_count)));
    }
    lines.join("\n")
}

/// Walk a table subtree collecting rows, noting head-group membership.
fn collect_table_rows(
    element: &HtmlElement,
    in_head: bool,
    head_rows: &mut Vec<Vec<String>>,
    body_rows: &mut Vec<Vec<String>>,
    all_rows: &mut Vec<Vec<String>>,
) {
    for child in &element.children {
        let HtmlNode::Element(el) = child else {
            continue;
        };
        match el.tag.as_str() {
            "tr" => {
                let cells: Vec<String> = el
                    .children
                    .iter()
                    .filter_map(|cell| match cell {
                        HtmlNode::Element(c) if c.tag == "th" || c.tag == "td" => {
                            Some(render_inline(&c.children).trim().to_owned())
                        }
                        _ => None,
                    })
                    .collect();
                if in_head {
                    head_rows.push(cells.clone());
                } else if element.tag == "tbody" {
                    body_rows.push(cells.clone());
                }
                all_rows.push(cells);
            }
            "thead" => collect_table_rows(el, true, head_rows, body_rows, all_rows),
            "tbody" | "tfoot" => collect_table_rows(el, in_head, head_rows, body_rows, all_rows),
            _ => {}
        }
    }
}

fn normalize_cells(cells: &[String], width: usize) -> Vec<String> {
    let mut filled: Vec<String> = cells.iter().take(width).cloned().collect();
    while filled.len() < width {
        filled.push(String::new());
    }
    filled
}

fn format_row(cells: &[String]) -> String {
    let escaped: Vec<String> = cells.iter().map(|cell| cell.replace('|', "\\|")).collect();
    format!("| {} |", escaped.join(" | "))
}

/// Tags rendered inline rather than as blocks.
fn is_inline_tag(tag: &str) -> bool {
    matches!(
        tag,
        "strong" | "b" | "em" | "i" | "u" | "s" | "del" | "code" | "a" | "img" | "br" | "span"
    )
}

/// Render phrasing content to a single inline string.
fn render_inline(children: &[HtmlNode]) -> String {
    children.iter().map(render_inline_node).collect()
}

fn render_inline_node(node: &HtmlNode) -> String {
    match node {
        HtmlNode::Text(text) => collapse_inline_whitespace(text),
        HtmlNode::Element(element) => match element.tag.as_str() {
            "strong" | "b" => wrap_nonempty(&render_inline(&element.children), "**"),
            "em" | "i" => wrap_nonempty(&render_inline(&element.children), "*"),
            "s" | "del" => wrap_nonempty(&render_inline(&element.children), "~~"),
            "code" => {
                let code = render_inline(&element.children);
                if code.trim().is_empty() {
                    String::new()
                } else {
                    format!("`{}`", code.trim())
                }
            }
            "a" => {
                let text = render_inline(&element.children);
                let text = text.trim();
                match element.attr("href") {
                    Some(href) => {
                        let label = if text.is_empty() { href } else { text };
                        format!("[{label}]({href})")
                    }
                    None => text.to_owned(),
                }
            }
            "img" => {
                let alt = element.attr("alt").unwrap_or_default();
                match element.attr("src") {
                    Some(src) => match element.attr("title") {
                        Some(title) if !title.is_empty() => {
                            format!("![{alt}]({src} \"{title}\")")
                        }
                        _ => format!("![{alt}]({src})"),
                    },
                    None => alt.to_owned(),
                }
            }
            "br" => "\n".to_owned(),
            // u has no markdown equivalent; span is transparent
            "u" | "span" => render_inline(&element.children),
            // Block elements nested in inline context: flatten to text
            _ => render_inline(&element.children),
        },
    }
}

/// Surround inline content with a delimiter, preserving edge spacing.
fn wrap_nonempty(content: &str, delimiter: &str) -> String {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        let leading = if content.starts_with(' ') { " " } else { "" };
        let trailing = if content.ends_with(' ') { " " } else { "" };
        format!("{leading}{delimiter}{trimmed}{delimiter}{trailing}")
    }
}

/// Collapse HTML whitespace runs to single spaces.
fn collapse_inline_whitespace(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut last_was_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                output.push(' ');
                last_was_space = true;
            }
        } else {
            output.push(ch);
            last_was_space = false;
        }
    }
    output
}

/// Trim leading/trailing blank runs produced by empty wrappers.
fn collapse_outer_blank_runs(text: &str) -> String {
    text.trim().to_owned()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::sanitize::sanitize_html;

    fn convert(html: &str) -> String {
        html_to_markdown(&sanitize_html(html))
    }

    #[test]
    fn test_headings_and_paragraphs() {
        let md = convert("<h1>Title</h1><p>Body text.</p><h2>Sub</h2>");
        assert_eq!(md, "# Title\n\nBody text.\n\n## Sub");
    }

    #[test]
    fn test_inline_marks() {
        let md = convert("<p><strong>bold</strong> and <em>italic</em> and <del>gone</del></p>");
        assert_eq!(md, "**bold** and *italic* and ~~gone~~");
    }

    #[test]
    fn test_link_with_text() {
        let md = convert(r#"<p><a href="https://example.com">Example</a></p>"#);
        assert_eq!(md, "[Example](https://example.com)");
    }

    #[test]
    fn test_link_without_text_uses_href() {
        let md = convert(r#"<p><a href="https://example.com"> </a></p>"#);
        assert_eq!(md, "[https://example.com](https://example.com)");
    }

    #[test]
    fn test_link_without_href_renders_text() {
        let md = convert(r#"<p><a href="javascript:x()">click</a></p>"#);
        assert_eq!(md, "click");
    }

    #[test]
    fn test_lists() {
        let md = convert("<ul><li>one</li><li>two</li></ul><ol><li>first</li><li>second</li></ol>");
        assert_eq!(md, "- one\n- two\n\n1. first\n2. second");
    }

    #[test]
    fn test_code_block_with_language() {
        let md = convert(r#"<pre><code class="language-rust">fn main() {}</code></pre>"#);
        assert_eq!(md, "```rust\nfn main() {}\n```");
    }

    #[test]
    fn test_inline_code() {
        let md = convert("<p>run <code>cargo test</code> locally</p>");
        assert_eq!(md, "run `cargo test` locally");
    }

    #[test]
    fn test_table_with_thead() {
        let md = convert(
            "<table><thead><tr><th>Owner</th><th>Status</th></tr></thead>\
             <tbody><tr><td>Team A</td><td>Draft</td></tr></tbody></table>",
        );
        assert_eq!(
            md,
            "| Owner | Status |\n| --- | --- |\n| Team A | Draft |"
        );
    }

    #[test]
    fn test_table_without_thead_uses_first_row() {
        let md = convert("<table><tr><th>Owner</th></tr><tr><td>Team A</td></tr></table>");
        assert_eq!(md, "| Owner |\n| --- |\n| Team A |");
    }

    #[test]
    fn test_table_rows_padded_to_widest() {
        let md = convert(
            "<table><tr><td>A</td><td>B</td><td>C</td></tr><tr><td>1</td></tr></table>",
        );
        assert_eq!(md, "| A | B | C |\n| --- | --- | --- |\n| 1 |  |  |");
    }

    #[test]
    fn test_pipe_escaped_in_cells() {
        let md = convert("<table><tr><td>a|b</td></tr><tr><td>c</td></tr></table>");
        assert!(md.contains("a\\|b"));
    }

    #[test]
    fn test_empty_wrappers_dropped() {
        let md = convert("<div>  </div><p>real</p><span>\n</span>");
        assert_eq!(md, "real");
    }

    #[test]
    fn test_content_bearing_div_unwrapped() {
        let md = convert("<div><p>inner</p></div>");
        assert_eq!(md, "inner");
    }

    #[test]
    fn test_blockquote() {
        let md = convert("<blockquote><p>quoted</p></blockquote>");
        assert_eq!(md, "> quoted");
    }

    #[test]
    fn test_br_becomes_newline() {
        let md = convert("<p>one<br>two</p>");
        assert_eq!(md, "one\ntwo");
    }
}

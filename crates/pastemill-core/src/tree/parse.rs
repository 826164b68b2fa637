//! Canonical text to tree parsing.
//!
//! Drives pulldown-cmark over the preprocessed text and folds the event
//! stream into the owned [`Block`] tree. Frame stacks track open block
//! containers and inline runs; tight list items, which produce inline
//! events without an enclosing paragraph, get an implicit paragraph.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use super::{Block, Inline, ListItem, TableRow};

/// Numeric depth of a pulldown-cmark heading level.
fn heading_depth(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// An open block-level container.
enum BlockFrame {
    Blocks { quote: bool, blocks: Vec<Block> },
    List { ordered: bool, start: u64, items: Vec<ListItem> },
}

/// An open inline run.
enum InlineFrame {
    Paragraph(Vec<Inline>),
    Heading(u8, Vec<Inline>),
    Emphasis(Vec<Inline>),
    Strong(Vec<Inline>),
    Strikethrough(Vec<Inline>),
    Link(String, Vec<Inline>),
    Image(String, Vec<Inline>),
    Cell(Vec<Inline>),
}

struct TreeBuilder {
    block_stack: Vec<BlockFrame>,
    inline_stack: Vec<InlineFrame>,
    code: Option<(Option<String>, String)>,
    table_rows: Vec<TableRow>,
    table_row: Vec<Vec<Inline>>,
}

/// Parse canonical markdown into the block tree.
pub(crate) fn parse_markdown(input: &str) -> Vec<Block> {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    let parser = Parser::new_ext(input, options);

    let mut builder = TreeBuilder {
        block_stack: vec![BlockFrame::Blocks {
            quote: false,
            blocks: Vec::new(),
        }],
        inline_stack: Vec::new(),
        code: None,
        table_rows: Vec::new(),
        table_row: Vec::new(),
    };

    for event in parser {
        builder.process(event);
    }
    builder.finish()
}

impl TreeBuilder {
    fn process(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => {
                if let Some((_, buffer)) = self.code.as_mut() {
                    buffer.push_str(&text);
                } else {
                    self.push_inline(Inline::Text(text.into_string()));
                }
            }
            Event::Code(code) => self.push_inline(Inline::Code(code.into_string())),
            Event::Html(html) => {
                self.close_implicit_paragraph();
                self.push_block(Block::Html(html.into_string()));
            }
            Event::InlineHtml(html) => self.push_inline(Inline::Text(html.into_string())),
            Event::SoftBreak => self.push_inline(Inline::SoftBreak),
            Event::HardBreak => self.push_inline(Inline::HardBreak),
            Event::Rule => {
                self.close_implicit_paragraph();
                self.push_block(Block::Rule);
            }
            Event::TaskListMarker(_)
            | Event::FootnoteReference(_)
            | Event::InlineMath(_)
            | Event::DisplayMath(_) => {}
        }
    }

    fn start_tag(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => self.inline_stack.push(InlineFrame::Paragraph(Vec::new())),
            Tag::Heading { level, .. } => {
                self.close_implicit_paragraph();
                self.inline_stack
                    .push(InlineFrame::Heading(heading_depth(level), Vec::new()));
            }
            Tag::BlockQuote(_) => {
                self.close_implicit_paragraph();
                self.block_stack.push(BlockFrame::Blocks {
                    quote: true,
                    blocks: Vec::new(),
                });
            }
            Tag::CodeBlock(kind) => {
                self.close_implicit_paragraph();
                let language = match kind {
                    CodeBlockKind::Fenced(info) if !info.is_empty() => {
                        Some(info.split_whitespace().next().unwrap_or("").to_owned())
                            .filter(|lang| !lang.is_empty())
                    }
                    _ => None,
                };
                self.code = Some((language, String::new()));
            }
            Tag::List(start) => {
                self.close_implicit_paragraph();
                self.block_stack.push(BlockFrame::List {
                    ordered: start.is_some(),
                    start: start.unwrap_or(1),
                    items: Vec::new(),
                });
            }
            Tag::Item => {
                self.block_stack.push(BlockFrame::Blocks {
                    quote: false,
                    blocks: Vec::new(),
                });
            }
            Tag::Table(_) => {
                self.close_implicit_paragraph();
                self.table_rows.clear();
            }
            Tag::TableHead | Tag::TableRow => self.table_row.clear(),
            Tag::TableCell => self.inline_stack.push(InlineFrame::Cell(Vec::new())),
            Tag::Emphasis => self.inline_stack.push(InlineFrame::Emphasis(Vec::new())),
            Tag::Strong => self.inline_stack.push(InlineFrame::Strong(Vec::new())),
            Tag::Strikethrough => self.inline_stack.push(InlineFrame::Strikethrough(Vec::new())),
            Tag::Link { dest_url, .. } => self
                .inline_stack
                .push(InlineFrame::Link(dest_url.into_string(), Vec::new())),
            Tag::Image { dest_url, .. } => self
                .inline_stack
                .push(InlineFrame::Image(dest_url.into_string(), Vec::new())),
            Tag::FootnoteDefinition(_)
            | Tag::HtmlBlock
            | Tag::MetadataBlock(_)
            | Tag::DefinitionList
            | Tag::DefinitionListTitle
            | Tag::DefinitionListDefinition
            | Tag::Superscript
            | Tag::Subscript => {}
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                if let Some(InlineFrame::Paragraph(children)) = self.inline_stack.pop() {
                    self.push_block(Block::Paragraph(children));
                }
            }
            TagEnd::Heading(_) => {
                if let Some(InlineFrame::Heading(depth, children)) = self.inline_stack.pop() {
                    self.push_block(Block::Heading { depth, children });
                }
            }
            TagEnd::BlockQuote(_) => {
                self.close_implicit_paragraph();
                if let Some(BlockFrame::Blocks { blocks, .. }) = self.block_stack.pop() {
                    self.push_block(Block::BlockQuote(blocks));
                }
            }
            TagEnd::CodeBlock => {
                if let Some((language, code)) = self.code.take() {
                    self.push_block(Block::Code { language, code });
                }
            }
            TagEnd::Item => {
                self.close_implicit_paragraph();
                if let Some(BlockFrame::Blocks { blocks, .. }) = self.block_stack.pop() {
                    if let Some(BlockFrame::List { items, .. }) = self.block_stack.last_mut() {
                        items.push(ListItem { blocks });
                    }
                }
            }
            TagEnd::List(_) => {
                if let Some(BlockFrame::List { ordered, start, items }) = self.block_stack.pop() {
                    self.push_block(Block::List { ordered, start, items });
                }
            }
            TagEnd::Table => {
                let rows = std::mem::take(&mut self.table_rows);
                self.push_block(Block::Table { rows });
            }
            TagEnd::TableHead | TagEnd::TableRow => {
                let cells = std::mem::take(&mut self.table_row);
                self.table_rows.push(TableRow { cells });
            }
            TagEnd::TableCell => {
                if let Some(InlineFrame::Cell(children)) = self.inline_stack.pop() {
                    self.table_row.push(children);
                }
            }
            TagEnd::Emphasis => self.fold_inline(Inline::Emphasis),
            TagEnd::Strong => self.fold_inline(Inline::Strong),
            TagEnd::Strikethrough => self.fold_inline(Inline::Strikethrough),
            TagEnd::Link => {
                if let Some(InlineFrame::Link(url, children)) = self.inline_stack.pop() {
                    self.push_inline(Inline::Link { url, children });
                }
            }
            TagEnd::Image => {
                if let Some(InlineFrame::Image(url, children)) = self.inline_stack.pop() {
                    let alt = super::inline_text(&children);
                    self.push_inline(Inline::Image { url, alt });
                }
            }
            TagEnd::FootnoteDefinition
            | TagEnd::HtmlBlock
            | TagEnd::MetadataBlock(_)
            | TagEnd::DefinitionList
            | TagEnd::DefinitionListTitle
            | TagEnd::DefinitionListDefinition
            | TagEnd::Superscript
            | TagEnd::Subscript => {}
        }
    }

    /// Pop the top inline frame and fold it into a single node.
    fn fold_inline(&mut self, wrap: impl FnOnce(Vec<Inline>) -> Inline) {
        let children = match self.inline_stack.pop() {
            Some(
                InlineFrame::Emphasis(children)
                | InlineFrame::Strong(children)
                | InlineFrame::Strikethrough(children),
            ) => children,
            Some(other) => {
                // Mismatched frame: restore and bail
                self.inline_stack.push(other);
                return;
            }
            None => return,
        };
        self.push_inline(wrap(children));
    }

    /// Append an inline node to the open inline frame, opening an
    /// implicit paragraph for tight list items.
    fn push_inline(&mut self, node: Inline) {
        if self.inline_stack.is_empty() {
            self.inline_stack.push(InlineFrame::Paragraph(Vec::new()));
        }
        let children = match self.inline_stack.last_mut().expect("checked non-empty") {
            InlineFrame::Paragraph(children)
            | InlineFrame::Heading(_, children)
            | InlineFrame::Emphasis(children)
            | InlineFrame::Strong(children)
            | InlineFrame::Strikethrough(children)
            | InlineFrame::Link(_, children)
            | InlineFrame::Image(_, children)
            | InlineFrame::Cell(children) => children,
        };
        children.push(node);
    }

    /// Close an implicit paragraph opened for tight-item inline text.
    fn close_implicit_paragraph(&mut self) {
        if let Some(InlineFrame::Paragraph(_)) = self.inline_stack.last() {
            if let Some(InlineFrame::Paragraph(children)) = self.inline_stack.pop() {
                if children.is_empty() {
                    return;
                }
                self.push_block(Block::Paragraph(children));
            }
        }
    }

    /// Append a block to the innermost block container.
    fn push_block(&mut self, block: Block) {
        for frame in self.block_stack.iter_mut().rev() {
            if let BlockFrame::Blocks { blocks, .. } = frame {
                blocks.push(block);
                return;
            }
        }
    }

    fn finish(mut self) -> Vec<Block> {
        self.close_implicit_paragraph();
        while self.block_stack.len() > 1 {
            match self.block_stack.pop() {
                Some(BlockFrame::Blocks { quote, blocks }) => {
                    if quote {
                        self.push_block(Block::BlockQuote(blocks));
                    } else {
                        for block in blocks {
                            self.push_block(block);
                        }
                    }
                }
                Some(BlockFrame::List { ordered, start, items }) => {
                    self.push_block(Block::List { ordered, start, items });
                }
                None => break,
            }
        }
        match self.block_stack.pop() {
            Some(BlockFrame::Blocks { blocks, .. }) => blocks,
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::tree::inline_text;

    #[test]
    fn test_heading_and_paragraph() {
        let blocks = parse_markdown("# Title\n\nBody text.");
        assert_eq!(blocks.len(), 2);
        assert!(matches!(&blocks[0], Block::Heading { depth: 1, .. }));
        assert!(matches!(&blocks[1], Block::Paragraph(_)));
    }

    #[test]
    fn test_tight_list_items() {
        let blocks = parse_markdown("- one\n- two");
        let Block::List { ordered, items, .. } = &blocks[0] else {
            panic!("expected list");
        };
        assert!(!ordered);
        assert_eq!(items.len(), 2);
        let Block::Paragraph(children) = &items[0].blocks[0] else {
            panic!("expected implicit paragraph");
        };
        assert_eq!(inline_text(children), "one");
    }

    #[test]
    fn test_ordered_list_start() {
        let blocks = parse_markdown("3. third\n4. fourth");
        let Block::List { ordered, start, items } = &blocks[0] else {
            panic!("expected list");
        };
        assert!(ordered);
        assert_eq!(*start, 3);
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_code_block() {
        let blocks = parse_markdown("```json\n{}\n```");
        let Block::Code { language, code } = &blocks[0] else {
            panic!("expected code block");
        };
        assert_eq!(language.as_deref(), Some("json"));
        assert_eq!(code, "{}\n");
    }

    #[test]
    fn test_table() {
        let blocks = parse_markdown("| A | B |\n| --- | --- |\n| 1 | 2 |");
        let Block::Table { rows } = &blocks[0] else {
            panic!("expected table");
        };
        assert_eq!(rows.len(), 2);
        assert_eq!(inline_text(&rows[0].cells[0]), "A");
        assert_eq!(inline_text(&rows[1].cells[1]), "2");
    }

    #[test]
    fn test_nested_list() {
        let blocks = parse_markdown("- outer\n  - inner");
        let Block::List { items, .. } = &blocks[0] else {
            panic!("expected list");
        };
        assert_eq!(items.len(), 1);
        assert!(
            items[0]
                .blocks
                .iter()
                .any(|block| matches!(block, Block::List { .. }))
        );
    }

    #[test]
    fn test_blockquote() {
        let blocks = parse_markdown("> quoted text");
        let Block::BlockQuote(children) = &blocks[0] else {
            panic!("expected blockquote");
        };
        assert!(matches!(&children[0], Block::Paragraph(_)));
    }

    #[test]
    fn test_inline_marks() {
        let blocks = parse_markdown("**bold** and *em* and ~~gone~~ and `code`");
        let Block::Paragraph(children) = &blocks[0] else {
            panic!("expected paragraph");
        };
        assert!(children.iter().any(|n| matches!(n, Inline::Strong(_))));
        assert!(children.iter().any(|n| matches!(n, Inline::Emphasis(_))));
        assert!(children.iter().any(|n| matches!(n, Inline::Strikethrough(_))));
        assert!(children.iter().any(|n| matches!(n, Inline::Code(_))));
    }

    #[test]
    fn test_link() {
        let blocks = parse_markdown("[text](https://example.com)");
        let Block::Paragraph(children) = &blocks[0] else {
            panic!("expected paragraph");
        };
        let Inline::Link { url, children } = &children[0] else {
            panic!("expected link");
        };
        assert_eq!(url, "https://example.com");
        assert_eq!(inline_text(children), "text");
    }
}

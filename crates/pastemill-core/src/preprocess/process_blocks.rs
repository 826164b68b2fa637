//! Process-block restructuring (opt-in).
//!
//! A pseudo-table header row followed by a flat run that mixes exactly
//! numbered steps and bulleted requirements is split into two labelled
//! groups. Off by default; the pattern is specific to one family of
//! exported process documents.

use std::sync::LazyLock;

use regex::Regex;

use crate::preprocess::lines::{is_markdown_heading, split_pseudo_row};

static NUMBERED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+[.)]\s+").expect("invalid numbered regex"));

static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*-\s+").expect("invalid bullet regex"));

/// Split qualifying blocks, returning the restructured count.
pub(crate) fn restructure_process_blocks(input: &str, enabled: bool) -> (String, usize) {
    if !enabled {
        return (input.to_owned(), 0);
    }
    let lines: Vec<&str> = input.split('\n').collect();
    let mut output: Vec<&str> = Vec::new();
    let mut restructured = 0usize;
    let mut i = 0usize;

    while i < lines.len() {
        let line = lines[i];
        let is_header_row = split_pseudo_row(line).is_some() && !is_markdown_heading(line);
        if !is_header_row {
            output.push(line);
            i += 1;
            continue;
        }

        let mut block: Vec<&str> = Vec::new();
        let mut j = i + 1;
        while j < lines.len() && !lines[j].trim().is_empty() {
            block.push(lines[j]);
            j += 1;
        }

        let numbered: Vec<&str> = block.iter().copied().filter(|l| NUMBERED.is_match(l)).collect();
        let bullets: Vec<&str> = block.iter().copied().filter(|l| BULLET.is_match(l)).collect();
        let only_lists = !block.is_empty()
            && block
                .iter()
                .all(|l| NUMBERED.is_match(l) || BULLET.is_match(l));

        if only_lists && numbered.len() >= 2 && bullets.len() >= 2 {
            output.push("**Process**");
            output.extend(numbered);
            output.push("");
            output.push("**Requirements**");
            output.extend(bullets);
            output.push("");
            restructured += 1;
            i = j + 1;
            continue;
        }

        output.push(line);
        output.extend(block);
        if j < lines.len() {
            output.push(lines[j]);
        }
        i = j + 1;
    }

    (output.join("\n"), restructured)
}

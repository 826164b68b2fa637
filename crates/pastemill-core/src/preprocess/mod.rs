//! Heuristic structure-recovery passes.
//!
//! An ordered chain of rewrites over the whole text. Each pass is a
//! total function returning the rewritten text plus a count; counts
//! surface in the warnings list so callers can see what the heuristics
//! decided. Order matters: headings must be promoted before table
//! detection looks for title lines, and token wrapping runs last so it
//! never sees half-built structures.

mod artifacts;
mod fences;
mod headings;
mod lines;
mod process_blocks;
mod tables;
mod tokens;

pub(crate) use artifacts::is_attachment_artifact_line;

use crate::options::PrepareOptions;

/// Run the full preprocessing chain.
pub(crate) fn preprocess_text(input: &str, options: &PrepareOptions) -> (String, Vec<String>) {
    let mut warnings: Vec<String> = Vec::new();

    let (mut working, _removed) = artifacts::remove_attachment_artifacts(input);

    let (promoted_text, promoted) = headings::promote_pseudo_headings(&working, options);
    working = promoted_text;
    if promoted > 0 {
        warnings.push(format!("Promoted {promoted} pseudo-headings"));
    }

    let (table_text, converted) = tables::convert_pseudo_tables(&working, options);
    working = table_text;
    if converted > 0 {
        warnings.push(format!(
            "Converted {converted} pseudo-tables to Markdown tables"
        ));
    }

    let (unwrapped_text, unwrapped) =
        fences::unwrap_accidental_fences(&working, options.unwrap_accidental_fences);
    working = unwrapped_text;
    if unwrapped > 0 {
        warnings.push(format!("Unwrapped {unwrapped} accidental fenced blocks"));
    }

    let (restructured_text, restructured) =
        process_blocks::restructure_process_blocks(&working, options.restructure_process_blocks);
    working = restructured_text;
    if restructured > 0 {
        warnings.push(format!("Restructured {restructured} process blocks"));
    }

    working = fences::wrap_request_response_blocks(&working);

    let (wrapped_text, wrapped) = tokens::wrap_technical_tokens(&working);
    working = wrapped_text;
    if wrapped > 0 {
        warnings.push(format!("Wrapped {wrapped} technical tokens in inline code"));
    }

    (working, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_reports_warnings_in_order() {
        let input = "intro\n\n1. Section A\n\nName\tType\tValue\nAlpha\tText\tOne\nBeta\tText\tTwo\n\nStatus is READY_4_SHIPMENT now";
        let (text, warnings) = preprocess_text(input, &PrepareOptions::default());

        assert!(text.contains("## Section A"));
        assert!(text.contains("| Name | Type | Value |"));
        assert!(text.contains("`READY_4_SHIPMENT`"));

        let joined = warnings.join(";");
        assert!(joined.contains("Promoted 1 pseudo-headings"));
        assert!(joined.contains("Converted 1 pseudo-tables"));
        assert!(joined.contains("Wrapped 1 technical tokens"));
    }

    #[test]
    fn test_artifacts_removed_silently() {
        let input = "Text before.\nphoto.png (2)\nText after.";
        let (text, warnings) = preprocess_text(input, &PrepareOptions::default());
        assert!(!text.contains("photo.png"));
        assert!(text.contains("Text before."));
        assert!(text.contains("Text after."));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_clean_input_yields_no_warnings() {
        let input = "# Title\n\nJust a paragraph.";
        let (text, warnings) = preprocess_text(input, &PrepareOptions::default());
        assert_eq!(text, input);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_request_marker_fenced() {
        let input = "Request:\n{ \"id\": 5 }";
        let (text, _) = preprocess_text(input, &PrepareOptions::default());
        assert!(text.contains("```json"));
    }
}

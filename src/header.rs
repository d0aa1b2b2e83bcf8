//! Section metadata parsing for AERMOD POST/PLOT files.
//!
//! Every section of an output file opens with six `*` documentation lines,
//! followed by a column title line and a separator line. The fourth line
//! names the result (type, form and source group) and the fifth line gives
//! the receptor count.

use crate::constants::{METADATA_LINES, TITLE_LINES, markers};
use crate::error::{PostError, Result};
use crate::models::ResultKey;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Metadata extracted from the documentation block of one section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionMeta {
    pub result_type: String,
    pub result_form: String,
    pub source_group: String,
    /// Receptor count announced by the section, if one could be read
    pub receptor_count: Option<usize>,
    /// Data format descriptor from the `FORMAT:` line
    pub format: Option<String>,
    /// The six raw documentation lines
    pub documentation: Vec<String>,
}

impl SectionMeta {
    pub fn key(&self) -> ResultKey {
        ResultKey::new(&self.result_type, &self.result_form, &self.source_group)
    }
}

/// Read the six-line documentation block of the next section
pub fn read_section<I>(lines: &mut I) -> Result<SectionMeta>
where
    I: Iterator<Item = Result<String>>,
{
    let mut documentation = Vec::with_capacity(METADATA_LINES);
    for line in lines.by_ref().take(METADATA_LINES) {
        documentation.push(line?);
    }

    if documentation.len() < METADATA_LINES {
        return Err(PostError::TruncatedHeader {
            expected: METADATA_LINES,
            found: documentation.len(),
        });
    }

    let (result_type, result_form, source_group) = parse_result_description(&documentation[3])?;
    let receptor_count = parse_receptor_count(&documentation[4]);
    let format = parse_format(&documentation[5]);

    debug!(
        "Section metadata: type='{}' form='{}' group='{}' receptors={:?}",
        result_type, result_form, source_group, receptor_count
    );

    Ok(SectionMeta {
        result_type,
        result_form,
        source_group,
        receptor_count,
        format,
        documentation,
    })
}

/// Consume the column title line and the separator line, returning the title
pub fn read_title<I>(lines: &mut I) -> Result<String>
where
    I: Iterator<Item = Result<String>>,
{
    let mut consumed = Vec::with_capacity(TITLE_LINES);
    for line in lines.by_ref().take(TITLE_LINES) {
        consumed.push(line?);
    }

    if consumed.len() < TITLE_LINES {
        return Err(PostError::TruncatedHeader {
            expected: TITLE_LINES,
            found: consumed.len(),
        });
    }

    Ok(consumed.swap_remove(0).trim().to_string())
}

/// Split the result description line into (type, form, source group).
///
/// `*   POST/PLOT FILE OF CONCURRENT 1-HR VALUES FOR SOURCE GROUP: ALL`
/// yields `("1-HR", "CONCURRENT", "ALL")`.
pub fn parse_result_description(line: &str) -> Result<(String, String, String)> {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    let values_at = tokens
        .iter()
        .position(|t| *t == markers::VALUES)
        .ok_or_else(|| {
            PostError::header_format(format!(
                "no '{}' marker in: {}",
                markers::VALUES,
                line.trim()
            ))
        })?;
    let of_at = tokens
        .iter()
        .position(|t| *t == markers::OF)
        .ok_or_else(|| {
            PostError::header_format(format!(
                "no '{}' marker in: {}",
                markers::OF,
                line.trim()
            ))
        })?;

    if values_at == 0 || of_at + 1 > values_at - 1 {
        return Err(PostError::header_format(format!(
            "'{}' must precede the result type before '{}' in: {}",
            markers::OF,
            markers::VALUES,
            line.trim()
        )));
    }

    let result_type = tokens[values_at - 1].to_string();
    let result_form = tokens[of_at + 1..values_at - 1].join(" ");
    let source_group = tokens
        .last()
        .map(|t| t.to_string())
        .unwrap_or_default();

    Ok((result_type, result_form, source_group))
}

/// First purely numeric token of the receptor line
pub fn parse_receptor_count(line: &str) -> Option<usize> {
    line.split_whitespace()
        .filter(|t| t.chars().all(|c| c.is_ascii_digit()))
        .find_map(|t| t.parse::<usize>().ok())
}

/// Text after the `FORMAT:` marker, if present
fn parse_format(line: &str) -> Option<String> {
    line.find(markers::FORMAT)
        .map(|at| line[at + markers::FORMAT.len()..].trim().to_string())
        .filter(|f| !f.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_block(description: &str, receptors: &str) -> Vec<String> {
        vec![
            "* AERMOD ( 19191): SUNY ESF NO2 RUN".to_string(),
            "* MODELING OPTIONS USED: RegDFAULT CONC ELEV".to_string(),
            "*         MODEL OPTIONS".to_string(),
            description.to_string(),
            receptors.to_string(),
            "*         FORMAT: (3(1X,F13.5),3(1X,F8.2),3X,A5,2X,A8,2X,I8.8,2X,A8)".to_string(),
        ]
    }

    fn as_stream(lines: Vec<String>) -> impl Iterator<Item = Result<String>> {
        lines.into_iter().map(Ok)
    }

    #[test]
    fn test_parse_post_section() {
        let block = doc_block(
            "*         POST/PLOT FILE OF CONCURRENT 1-HR VALUES FOR SOURCE GROUP: ALL",
            "*         FOR A TOTAL OF  1000 RECEPTORS.",
        );
        let meta = read_section(&mut as_stream(block)).unwrap();

        assert_eq!(meta.result_type, "1-HR");
        assert_eq!(meta.result_form, "CONCURRENT");
        assert_eq!(meta.source_group, "ALL");
        assert_eq!(meta.receptor_count, Some(1000));
        assert_eq!(
            meta.format.as_deref(),
            Some("(3(1X,F13.5),3(1X,F8.2),3X,A5,2X,A8,2X,I8.8,2X,A8)")
        );
        assert_eq!(meta.documentation.len(), 6);
        assert_eq!(meta.key(), ResultKey::new("1-HR", "CONCURRENT", "ALL"));
    }

    #[test]
    fn test_multi_word_result_form() {
        let (r_type, r_form, group) = parse_result_description(
            "*         PLOT FILE OF  HIGH   1ST HIGH  24-HR VALUES FOR SOURCE GROUP: STACKS",
        )
        .unwrap();
        assert_eq!(r_type, "24-HR");
        assert_eq!(r_form, "HIGH 1ST HIGH");
        assert_eq!(group, "STACKS");
    }

    #[test]
    fn test_missing_markers() {
        assert!(matches!(
            parse_result_description("*   PLOT FILE OF 1-HR RESULTS"),
            Err(PostError::HeaderFormat { .. })
        ));
        assert!(matches!(
            parse_result_description("*   PLOT FILE 1-HR VALUES FOR GROUP ALL"),
            Err(PostError::HeaderFormat { .. })
        ));
        // nothing between OF and VALUES to serve as the result type
        assert!(matches!(
            parse_result_description("* OF VALUES"),
            Err(PostError::HeaderFormat { .. })
        ));
    }

    #[test]
    fn test_truncated_header() {
        let block: Vec<String> = doc_block("* x", "* y").into_iter().take(4).collect();
        match read_section(&mut as_stream(block)) {
            Err(PostError::TruncatedHeader { expected, found }) => {
                assert_eq!(expected, 6);
                assert_eq!(found, 4);
            }
            other => panic!("expected TruncatedHeader, got {:?}", other),
        }
    }

    #[test]
    fn test_receptor_count_parsing() {
        assert_eq!(
            parse_receptor_count("*         FOR A TOTAL OF   250 RECEPTORS."),
            Some(250)
        );
        assert_eq!(parse_receptor_count("*  NO COUNT HERE 12A"), None);
    }

    #[test]
    fn test_read_title_consumes_two_lines() {
        let mut stream = as_stream(vec![
            "*         X             Y      AVERAGE CONC    ZELEV".to_string(),
            "* ____________  ____________  ____________  ______".to_string(),
            " data row".to_string(),
        ]);
        let title = read_title(&mut stream).unwrap();
        assert!(title.starts_with("*         X"));
        assert_eq!(stream.next().unwrap().unwrap(), " data row");
    }

    #[test]
    fn test_read_title_truncated() {
        let mut stream = as_stream(vec!["*   X   Y".to_string()]);
        assert!(matches!(
            read_title(&mut stream),
            Err(PostError::TruncatedHeader { expected: 2, found: 1 })
        ));
    }
}

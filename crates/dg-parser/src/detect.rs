use dg_core::{Dialect, DiagramError};

/// Dialect signatures in priority order. Keywords are mutually exclusive, so
/// first-match-wins can never be ambiguous; the order still mirrors the
/// registration order of the diagram family.
const SIGNATURES: &[(&str, Dialect)] = &[
    ("sequenceDiagram", Dialect::Sequence),
    ("flowchart", Dialect::Flowchart),
    ("graph", Dialect::Flowchart),
];

/// Classify raw diagram text by its first significant line. Pure; performs
/// no parsing beyond normalization (front matter, directives, comments).
pub fn detect(text: &str) -> Result<Dialect, DiagramError> {
    let Some(first_line) = first_significant_line(text) else {
        return Err(DiagramError::UnknownDiagramType {
            first_line: String::new(),
        });
    };

    for &(keyword, dialect) in SIGNATURES {
        if matches_signature(first_line, keyword) {
            return Ok(dialect);
        }
    }

    Err(DiagramError::UnknownDiagramType {
        first_line: first_line.chars().take(80).collect(),
    })
}

fn matches_signature(line: &str, keyword: &str) -> bool {
    let Some(rest) = line.strip_prefix(keyword) else {
        return false;
    };
    // The keyword must be a whole token: `graphic` is not a flow header.
    match rest.chars().next() {
        None => true,
        Some(next) => next.is_whitespace() || next == ';',
    }
}

/// First line that is neither blank, a `%%` comment, front matter, nor part
/// of a `%%{ ... }%%` directive.
pub(crate) fn first_significant_line(input: &str) -> Option<&str> {
    let (content, _) = strip_front_matter(input);
    let mut in_directive = false;
    for line in content.lines() {
        let trimmed = line.trim();
        if in_directive {
            if trimmed.contains("}%%") {
                in_directive = false;
            }
            continue;
        }
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.starts_with("%%{") {
            if !trimmed.contains("}%%") {
                in_directive = true;
            }
            continue;
        }
        if trimmed.starts_with("%%") {
            continue;
        }
        return Some(trimmed);
    }
    None
}

/// Split a leading `---` fenced front-matter block off the document.
/// Returns the remaining body and the number of lines consumed, so parsers
/// can keep reporting positions against the original input.
pub(crate) fn strip_front_matter(input: &str) -> (&str, usize) {
    let mut segments = input.split_inclusive('\n');
    let Some(first_segment) = segments.next() else {
        return (input, 0);
    };
    if first_segment.trim_end_matches(['\r', '\n']).trim() != "---" {
        return (input, 0);
    }

    let mut offset = first_segment.len();
    let mut lines = 1;
    for segment in segments {
        let line = segment.trim_end_matches(['\r', '\n']);
        offset += segment.len();
        lines += 1;
        if line.trim() == "---" {
            return (&input[offset..], lines);
        }
    }

    (input, 0)
}

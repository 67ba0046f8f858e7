use dg_core::{
    ActorKind, BlockKind, DiagramError, MessageKind, NotePlacement, SequenceDb, Span,
};
use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

use crate::detect::strip_front_matter;

/// Message operators, longest first so a scan can take the longest match at
/// the earliest position.
const MESSAGE_OPERATORS: [(&str, MessageKind); 6] = [
    ("-->>", MessageKind::DottedArrow),
    ("-->", MessageKind::Dotted),
    ("->>", MessageKind::SolidArrow),
    ("--x", MessageKind::DottedCross),
    ("->", MessageKind::Solid),
    ("-x", MessageKind::SolidCross),
];

/// Parse a sequence-dialect document into the bound database.
pub fn parse(text: &str, db: &mut SequenceDb) -> Result<(), DiagramError> {
    let (content, line_offset) = strip_front_matter(text);
    debug!(dialect = "sequence", "parse start");

    let mut saw_header = false;
    let mut in_directive = false;
    let mut block_stack: Vec<(BlockKind, usize)> = Vec::new();
    let mut last_line_number = line_offset;

    for (index, raw_line) in content.lines().enumerate() {
        let line_number = line_offset + index + 1;
        last_line_number = line_number;
        let line = raw_line.trim();

        if in_directive {
            if line.contains("}%%") {
                in_directive = false;
            }
            continue;
        }
        if line.is_empty() {
            continue;
        }
        if line.starts_with("%%{") {
            if !line.contains("}%%") {
                in_directive = true;
            }
            continue;
        }
        if line.starts_with("%%") {
            continue;
        }

        if !saw_header {
            if line == "sequenceDiagram" {
                saw_header = true;
                continue;
            }
            return Err(statement_error(
                line_number,
                line,
                format!("expected 'sequenceDiagram' header, found: {line}"),
                vec!["sequenceDiagram".to_string()],
            ));
        }

        parse_statement(line, line_number, db, &mut block_stack)?;
    }

    if !saw_header {
        return Err(DiagramError::Parse {
            message: "expected a 'sequenceDiagram' header".to_string(),
            span: Span::at_line(line_offset + 1, 1),
            expected: vec!["sequenceDiagram".to_string()],
        });
    }
    if let Some((kind, opened_at)) = block_stack.last() {
        return Err(DiagramError::Parse {
            message: format!(
                "'{}' block opened on line {opened_at} is never closed",
                kind.as_str()
            ),
            span: Span::at_line(last_line_number, 1),
            expected: vec!["end".to_string()],
        });
    }
    Ok(())
}

fn parse_statement(
    line: &str,
    line_number: usize,
    db: &mut SequenceDb,
    block_stack: &mut Vec<(BlockKind, usize)>,
) -> Result<(), DiagramError> {
    if let Some(rest) = keyword(line, "participant") {
        return declare_participant(rest, ActorKind::Participant, line_number, line, db);
    }
    if let Some(rest) = keyword(line, "actor") {
        return declare_participant(rest, ActorKind::Actor, line_number, line, db);
    }
    if let Some(rest) = keyword(line, "activate") {
        let actor = expect_actor_id(rest.trim(), line_number, line)?;
        db.activate(actor);
        return Ok(());
    }
    if let Some(rest) = keyword(line, "deactivate") {
        let actor = expect_actor_id(rest.trim(), line_number, line)?;
        db.deactivate(actor);
        return Ok(());
    }
    if let Some(rest) = line.strip_prefix("title")
        && rest.starts_with([' ', '\t', ':'])
    {
        db.set_title(rest.trim_start().trim_start_matches(':').trim());
        return Ok(());
    }
    if line == "autonumber" {
        db.enable_autonumber();
        return Ok(());
    }
    if keyword(line, "Note").is_some() || keyword(line, "note").is_some() {
        let rest = &line["Note".len()..];
        return parse_note(rest.trim_start(), line_number, line, db);
    }

    // Block structure.
    if line == "end" {
        if block_stack.pop().is_none() {
            return Err(statement_error(
                line_number,
                line,
                "'end' without an open block".to_string(),
                vec!["alt".to_string(), "opt".to_string(), "loop".to_string(), "par".to_string()],
            ));
        }
        db.end_block();
        return Ok(());
    }
    for (kw, kind) in [
        ("alt", BlockKind::Alt),
        ("opt", BlockKind::Opt),
        ("loop", BlockKind::Loop),
        ("par", BlockKind::Par),
    ] {
        if line == kw || keyword(line, kw).is_some() {
            let title = line[kw.len()..].trim();
            block_stack.push((kind, line_number));
            db.begin_block(kind, (!title.is_empty()).then_some(title));
            return Ok(());
        }
    }
    for (kw, parent) in [("else", BlockKind::Alt), ("and", BlockKind::Par)] {
        if line == kw || keyword(line, kw).is_some() {
            match block_stack.last() {
                Some((kind, _)) if *kind == parent => {
                    let title = line[kw.len()..].trim();
                    db.alternate_block((!title.is_empty()).then_some(title));
                    return Ok(());
                }
                _ => {
                    return Err(statement_error(
                        line_number,
                        line,
                        format!("'{kw}' is only valid inside an open '{}' block", parent.as_str()),
                        vec![parent.as_str().to_string()],
                    ));
                }
            }
        }
    }

    parse_message(line, line_number, db)
}

fn declare_participant(
    rest: &str,
    kind: ActorKind,
    line_number: usize,
    line: &str,
    db: &mut SequenceDb,
) -> Result<(), DiagramError> {
    let rest = rest.trim();
    let (id, alias) = match rest.split_once(" as ") {
        Some((id, alias)) => (id.trim(), Some(alias.trim())),
        None => (rest, None),
    };
    let id = expect_actor_id(id, line_number, line)?;
    db.declare_actor(id, alias, kind);
    Ok(())
}

fn parse_note(
    rest: &str,
    line_number: usize,
    line: &str,
    db: &mut SequenceDb,
) -> Result<(), DiagramError> {
    let (placement, rest) = if let Some(rest) = rest.strip_prefix("right of ") {
        (NotePlacement::RightOf, rest)
    } else if let Some(rest) = rest.strip_prefix("left of ") {
        (NotePlacement::LeftOf, rest)
    } else if let Some(rest) = rest.strip_prefix("over ") {
        (NotePlacement::Over, rest)
    } else {
        return Err(statement_error(
            line_number,
            line,
            "expected a note placement".to_string(),
            vec![
                "right of".to_string(),
                "left of".to_string(),
                "over".to_string(),
            ],
        ));
    };

    let Some((anchors, text)) = rest.split_once(':') else {
        return Err(statement_error(
            line_number,
            line,
            "note is missing the ': text' part".to_string(),
            vec![":".to_string()],
        ));
    };

    let mut anchor_iter = anchors.split(',').map(str::trim);
    let first = anchor_iter.next().unwrap_or("");
    let first = expect_actor_id(first, line_number, line)?;
    let second = match anchor_iter.next() {
        Some(id) if placement == NotePlacement::Over => {
            Some(expect_actor_id(id, line_number, line)?)
        }
        Some(_) => {
            return Err(statement_error(
                line_number,
                line,
                "only 'Note over' accepts two anchor actors".to_string(),
                vec!["over".to_string()],
            ));
        }
        None => None,
    };
    if anchor_iter.next().is_some() {
        return Err(statement_error(
            line_number,
            line,
            "a note accepts at most two anchor actors".to_string(),
            Vec::new(),
        ));
    }

    db.add_note(placement, first, second, text.trim());
    Ok(())
}

fn parse_message(
    line: &str,
    line_number: usize,
    db: &mut SequenceDb,
) -> Result<(), DiagramError> {
    let Some((op_at, op, kind)) = find_operator(line) else {
        return Err(statement_error(
            line_number,
            line,
            format!("unrecognized sequence statement: {line}"),
            MESSAGE_OPERATORS
                .iter()
                .map(|(op, _)| (*op).to_string())
                .collect(),
        ));
    };

    let from = expect_actor_id(line[..op_at].trim(), line_number, line)?;
    let mut rest = &line[op_at + op.len()..];

    // Activation shorthand: `A->>+B: x` activates the target,
    // `A->>-B: x` deactivates the source.
    let mut activation: Option<char> = None;
    if let Some(stripped) = rest.strip_prefix('+') {
        activation = Some('+');
        rest = stripped;
    } else if let Some(stripped) = rest.strip_prefix('-') {
        activation = Some('-');
        rest = stripped;
    }

    let Some((to, text)) = rest.split_once(':') else {
        return Err(statement_error(
            line_number,
            line,
            "message is missing the ': text' part".to_string(),
            vec![":".to_string()],
        ));
    };
    let to = expect_actor_id(to.trim(), line_number, line)?;

    db.add_message(from, to, kind, text.trim());
    match activation {
        Some('+') => db.activate(to),
        Some('-') => db.deactivate(from),
        _ => {}
    }
    Ok(())
}

/// Earliest operator occurrence; ties at one position resolve to the longest
/// operator because the table is ordered by length.
fn find_operator(line: &str) -> Option<(usize, &'static str, MessageKind)> {
    for (i, _) in line.char_indices() {
        for &(op, kind) in &MESSAGE_OPERATORS {
            if line[i..].starts_with(op) {
                return Some((i, op, kind));
            }
        }
    }
    None
}

fn keyword<'a>(line: &'a str, kw: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(kw)?;
    rest.starts_with([' ', '\t']).then_some(rest)
}

fn expect_actor_id<'a>(
    candidate: &'a str,
    line_number: usize,
    line: &str,
) -> Result<&'a str, DiagramError> {
    let valid = !candidate.is_empty()
        && candidate
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | ' '));
    if valid {
        Ok(candidate)
    } else {
        Err(statement_error(
            line_number,
            line,
            format!("invalid actor name: {candidate:?}"),
            vec!["actor identifier".to_string()],
        ))
    }
}

fn statement_error(
    line_number: usize,
    line: &str,
    message: String,
    expected: Vec<String>,
) -> DiagramError {
    DiagramError::Parse {
        message,
        span: Span::at_line(line_number, line.graphemes(true).count()),
        expected,
    }
}

use chumsky::prelude::*;
use dg_core::{
    DiagramError, Direction, EdgeType, FlowDb, LinkStyleIndex, Span, VertexShape,
};
use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

use crate::detect::strip_front_matter;

#[derive(Debug, Clone, PartialEq, Eq)]
struct VertexToken {
    id: String,
    text: Option<String>,
    shape: Option<VertexShape>,
    class: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct EdgeToken {
    kind: EdgeType,
    label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum LinkStyleTargets {
    Default,
    Indices(Vec<usize>),
}

/// One parsed flow statement, lowered into [`FlowDb`] semantic actions after
/// the chumsky pass succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
enum FlowStmt {
    Chain {
        first: VertexToken,
        links: Vec<(EdgeToken, VertexToken)>,
    },
    LinkStyle {
        targets: LinkStyleTargets,
        interpolate: Option<String>,
        styles: Vec<String>,
    },
    ClassDef {
        name: String,
        styles: Vec<String>,
    },
    ClassAssign {
        ids: Vec<String>,
        class: String,
    },
    Style {
        id: String,
        styles: Vec<String>,
    },
    Click {
        id: String,
        link: String,
        tooltip: Option<String>,
    },
}

/// Parse a flow-dialect document into the bound database. The database is an
/// explicit argument: each caller owns its parser+database pair and nothing
/// is shared between parses.
pub fn parse(text: &str, db: &mut FlowDb) -> Result<(), DiagramError> {
    let (content, line_offset) = strip_front_matter(text);
    debug!(dialect = "flowchart", "parse start");

    let mut saw_header = false;
    let mut in_directive = false;

    for (index, raw_line) in content.lines().enumerate() {
        let line_number = line_offset + index + 1;
        let trimmed = raw_line.trim();

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

        let line = strip_inline_comment(raw_line);
        for (stmt_offset, statement) in split_statements(line) {
            if !saw_header {
                let direction = parse_header(statement, line_number, line, stmt_offset)?;
                db.set_direction(direction);
                saw_header = true;
                continue;
            }

            let (output, errors) = flow_statement_parser()
                .parse(statement)
                .into_output_errors();
            if let Some(error) = errors.into_iter().next() {
                return Err(rich_to_error(&error, statement, line, stmt_offset, line_number));
            }
            let Some(stmt) = output else {
                return Err(DiagramError::Parse {
                    message: format!("unrecognized statement: {statement}"),
                    span: Span::at_token(line_number, col_at(line, stmt_offset), 1),
                    expected: Vec::new(),
                });
            };
            apply_statement(stmt, db);
        }
    }

    if !saw_header {
        return Err(DiagramError::Parse {
            message: "expected a 'graph' or 'flowchart' header".to_string(),
            span: Span::at_line(line_offset + 1, 1),
            expected: vec!["graph".to_string(), "flowchart".to_string()],
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Chumsky statement grammar (character-level on &str)
// ---------------------------------------------------------------------------
// Parses a single semicolon-free statement; document structure (lines,
// comments, header) is handled by the outer loop.

fn flow_statement_parser<'a>() -> impl Parser<'a, &'a str, FlowStmt, extra::Err<Rich<'a, char>>> {
    // -- Whitespace helpers --------------------------------------------------
    let ws_char = any().filter(|c: &char| *c == ' ' || *c == '\t');
    let inline_ws = ws_char.repeated().to(());
    let required_ws = ws_char.repeated().at_least(1).to(());

    // -- Identifier ----------------------------------------------------------
    // `-` is deliberately excluded so edge operators tokenize unambiguously.
    let ident = any()
        .filter(|c: &char| c.is_ascii_alphanumeric() || matches!(*c, '_' | '.'))
        .repeated()
        .at_least(1)
        .to_slice();

    // -- Quoted string -------------------------------------------------------
    let quoted = {
        let double_q = just('"')
            .ignore_then(any().filter(|c: &char| *c != '"').repeated().to_slice())
            .then_ignore(just('"'));
        let single_q = just('\'')
            .ignore_then(any().filter(|c: &char| *c != '\'').repeated().to_slice())
            .then_ignore(just('\''));
        double_q.or(single_q)
    };

    // -- Vertex shapes (longest delimiters first) ----------------------------
    let triple_circle = just("(((")
        .ignore_then(any().and_is(just(")))").not()).repeated().to_slice())
        .then_ignore(just(")))"));
    let stadium = just("([")
        .ignore_then(any().and_is(just("])").not()).repeated().to_slice())
        .then_ignore(just("])"));
    let subroutine = just("[[")
        .ignore_then(any().and_is(just("]]").not()).repeated().to_slice())
        .then_ignore(just("]]"));
    let cylinder = just("[(")
        .ignore_then(any().and_is(just(")]").not()).repeated().to_slice())
        .then_ignore(just(")]"));
    let circle = just("((")
        .ignore_then(any().and_is(just("))").not()).repeated().to_slice())
        .then_ignore(just("))"));
    let hexagon = just("{{")
        .ignore_then(any().and_is(just("}}").not()).repeated().to_slice())
        .then_ignore(just("}}"));
    let rect = just('[')
        .ignore_then(any().filter(|c: &char| *c != ']').repeated().to_slice())
        .then_ignore(just(']'));
    let rounded = just('(')
        .ignore_then(any().filter(|c: &char| *c != ')').repeated().to_slice())
        .then_ignore(just(')'));
    let diamond = just('{')
        .ignore_then(any().filter(|c: &char| *c != '}').repeated().to_slice())
        .then_ignore(just('}'));
    let odd = just('>')
        .ignore_then(any().filter(|c: &char| *c != ']').repeated().to_slice())
        .then_ignore(just(']'));

    let shape = choice((
        triple_circle.map(|t: &str| (t, VertexShape::DoubleCircle)),
        stadium.map(|t: &str| (t, VertexShape::Stadium)),
        subroutine.map(|t: &str| (t, VertexShape::Subroutine)),
        cylinder.map(|t: &str| (t, VertexShape::Cylinder)),
        circle.map(|t: &str| (t, VertexShape::Circle)),
        hexagon.map(|t: &str| (t, VertexShape::Hexagon)),
        rect.map(|t: &str| (t, VertexShape::Rect)),
        rounded.map(|t: &str| (t, VertexShape::Rounded)),
        diamond.map(|t: &str| (t, VertexShape::Diamond)),
        odd.map(|t: &str| (t, VertexShape::Odd)),
    ));

    let class_shorthand = just(":::").ignore_then(ident);

    let vertex = ident.then(shape.or_not()).then(class_shorthand.or_not()).map(
        |((id, shape_opt), class): ((&str, Option<(&str, VertexShape)>), Option<&str>)| {
            let (text, shape) = match shape_opt {
                Some((raw, shape)) => (clean_label(raw), Some(shape)),
                None => (None, None),
            };
            VertexToken {
                id: id.to_string(),
                text,
                shape,
                class: class.map(str::to_string),
            }
        },
    );

    // -- Edge operators (longest-first) --------------------------------------
    let edge_op = choice((
        just("-.->").to(EdgeType::DottedArrow),
        just("-.-x").to(EdgeType::DottedCross),
        just("-.-o").to(EdgeType::DottedCircle),
        just("-.-").to(EdgeType::DottedOpen),
        just("==>").to(EdgeType::ThickArrow),
        just("==x").to(EdgeType::ThickCross),
        just("==o").to(EdgeType::ThickCircle),
        just("===").to(EdgeType::ThickOpen),
        just("-->").to(EdgeType::SolidArrow),
        just("--x").to(EdgeType::SolidCross),
        just("--o").to(EdgeType::SolidCircle),
        just("---").to(EdgeType::SolidOpen),
    ));

    // -- Pipe label  |text| --------------------------------------------------
    let pipe_label = just('|')
        .ignore_then(any().filter(|c: &char| *c != '|').repeated().to_slice())
        .then_ignore(just('|'));

    // -- Mid-dash labels  A-- text -->B / A-. text .->B / A== text ==>B ------
    let solid_terminator = choice((
        just("-->").to(EdgeType::SolidArrow),
        just("--x").to(EdgeType::SolidCross),
        just("--o").to(EdgeType::SolidCircle),
        just("---").to(EdgeType::SolidOpen),
    ));
    let solid_mid = just("--")
        .ignore_then(
            any()
                .and_is(solid_terminator.not())
                .repeated()
                .at_least(1)
                .to_slice(),
        )
        .then(solid_terminator);

    let dotted_terminator = choice((
        just(".->").to(EdgeType::DottedArrow),
        just(".-x").to(EdgeType::DottedCross),
        just(".-o").to(EdgeType::DottedCircle),
        just(".-").to(EdgeType::DottedOpen),
    ));
    let dotted_mid = just("-.")
        .ignore_then(
            any()
                .and_is(dotted_terminator.not())
                .repeated()
                .at_least(1)
                .to_slice(),
        )
        .then(dotted_terminator);

    let thick_terminator = choice((
        just("==>").to(EdgeType::ThickArrow),
        just("==x").to(EdgeType::ThickCross),
        just("==o").to(EdgeType::ThickCircle),
        just("===").to(EdgeType::ThickOpen),
    ));
    let thick_mid = just("==")
        .ignore_then(
            any()
                .and_is(thick_terminator.not())
                .repeated()
                .at_least(1)
                .to_slice(),
        )
        .then(thick_terminator);

    let link = choice((
        edge_op
            .then_ignore(inline_ws)
            .then(pipe_label.or_not())
            .map(|(kind, label): (EdgeType, Option<&str>)| EdgeToken {
                kind,
                label: label.and_then(clean_label),
            }),
        solid_mid.map(|(label, kind): (&str, EdgeType)| EdgeToken {
            kind,
            label: clean_label(label),
        }),
        dotted_mid.map(|(label, kind): (&str, EdgeType)| EdgeToken {
            kind,
            label: clean_label(label),
        }),
        thick_mid.map(|(label, kind): (&str, EdgeType)| EdgeToken {
            kind,
            label: clean_label(label),
        }),
    ));

    let chain = vertex
        .then(
            inline_ws
                .ignore_then(link)
                .then_ignore(inline_ws)
                .then(vertex)
                .repeated()
                .collect::<Vec<_>>(),
        )
        .then_ignore(inline_ws)
        .then_ignore(end())
        .map(|(first, links)| FlowStmt::Chain { first, links });

    // -- Style declarations  prop:value,prop:value ---------------------------
    let decl = any()
        .filter(|c: &char| !matches!(*c, ',' | ':'))
        .repeated()
        .at_least(1)
        .to_slice()
        .then_ignore(just(':'))
        .then(
            any()
                .filter(|c: &char| *c != ',')
                .repeated()
                .at_least(1)
                .to_slice(),
        )
        .map(|(prop, value): (&str, &str)| format!("{}:{}", prop.trim(), value.trim()));
    let decls = decl
        .separated_by(just(','))
        .at_least(1)
        .collect::<Vec<String>>();

    // -- linkStyle <index-list|default> [interpolate <curve>] <decls> --------
    let number = any()
        .filter(|c: &char| c.is_ascii_digit())
        .repeated()
        .at_least(1)
        .to_slice()
        .map(|s: &str| s.parse::<usize>().unwrap_or(usize::MAX));
    let targets = choice((
        just("default").to(LinkStyleTargets::Default),
        number
            .separated_by(inline_ws.ignore_then(just(",")).then_ignore(inline_ws))
            .at_least(1)
            .collect::<Vec<_>>()
            .map(LinkStyleTargets::Indices),
    ));
    let link_style_body = choice((
        required_ws
            .ignore_then(just("interpolate"))
            .ignore_then(required_ws)
            .ignore_then(ident)
            .then(required_ws.ignore_then(decls).or_not())
            .map(|(curve, styles): (&str, Option<Vec<String>>)| {
                (Some(curve.to_string()), styles.unwrap_or_default())
            }),
        required_ws.ignore_then(decls).map(|styles| (None, styles)),
    ));
    let link_style = just("linkStyle")
        .ignore_then(required_ws)
        .ignore_then(targets)
        .then(link_style_body)
        .then_ignore(inline_ws)
        .then_ignore(end())
        .map(|(targets, (interpolate, styles))| FlowStmt::LinkStyle {
            targets,
            interpolate,
            styles,
        });

    // -- classDef <name> <decls> ---------------------------------------------
    let class_def = just("classDef")
        .ignore_then(required_ws)
        .ignore_then(ident)
        .then_ignore(required_ws)
        .then(decls)
        .then_ignore(inline_ws)
        .then_ignore(end())
        .map(|(name, styles): (&str, Vec<String>)| FlowStmt::ClassDef {
            name: name.to_string(),
            styles,
        });

    // -- class <id,...> <name> -----------------------------------------------
    let class_assign = just("class")
        .ignore_then(required_ws)
        .ignore_then(
            ident
                .separated_by(inline_ws.ignore_then(just(",")).then_ignore(inline_ws))
                .at_least(1)
                .collect::<Vec<_>>(),
        )
        .then_ignore(required_ws)
        .then(ident)
        .then_ignore(inline_ws)
        .then_ignore(end())
        .map(|(ids, class): (Vec<&str>, &str)| FlowStmt::ClassAssign {
            ids: ids.iter().map(|s| s.to_string()).collect(),
            class: class.to_string(),
        });

    // -- style <id> <decls> --------------------------------------------------
    let style_stmt = just("style")
        .ignore_then(required_ws)
        .ignore_then(ident)
        .then_ignore(required_ws)
        .then(decls)
        .then_ignore(inline_ws)
        .then_ignore(end())
        .map(|(id, styles): (&str, Vec<String>)| FlowStmt::Style {
            id: id.to_string(),
            styles,
        });

    // -- click <id> "<url>" ["tooltip"] --------------------------------------
    let bare_target = any()
        .filter(|c: &char| !c.is_whitespace())
        .repeated()
        .at_least(1)
        .to_slice();
    let click_stmt = just("click")
        .ignore_then(required_ws)
        .ignore_then(ident)
        .then_ignore(required_ws)
        .then(choice((quoted, bare_target)))
        .then(required_ws.ignore_then(quoted).or_not())
        .then_ignore(inline_ws)
        .then_ignore(end())
        .map(
            |((id, link), tooltip): ((&str, &str), Option<&str>)| FlowStmt::Click {
                id: id.to_string(),
                link: link.to_string(),
                tooltip: tooltip.map(str::to_string),
            },
        );

    choice((
        link_style,
        class_def,
        class_assign,
        style_stmt,
        click_stmt,
        chain,
    ))
}

// ---------------------------------------------------------------------------
// Lowering: FlowStmt → FlowDb semantic actions
// ---------------------------------------------------------------------------

fn apply_statement(stmt: FlowStmt, db: &mut FlowDb) {
    match stmt {
        FlowStmt::Chain { first, links } => {
            declare_vertex(db, &first);
            let mut prev = first.id;
            for (edge, vertex) in links {
                declare_vertex(db, &vertex);
                db.add_edge(&prev, &vertex.id, edge.kind, edge.label.as_deref());
                prev = vertex.id;
            }
        }
        FlowStmt::LinkStyle {
            targets,
            interpolate,
            styles,
        } => {
            let indices: Vec<LinkStyleIndex> = match targets {
                LinkStyleTargets::Default => vec![LinkStyleIndex::Default],
                LinkStyleTargets::Indices(list) => {
                    list.into_iter().map(LinkStyleIndex::At).collect()
                }
            };
            for index in indices {
                if let Some(curve) = &interpolate {
                    db.add_link_interpolate(index, curve);
                }
                if !styles.is_empty() {
                    db.add_link_style(index, styles.clone());
                }
            }
        }
        FlowStmt::ClassDef { name, styles } => db.add_class(&name, styles),
        FlowStmt::ClassAssign { ids, class } => {
            for id in ids {
                db.set_class(&id, &class);
            }
        }
        FlowStmt::Style { id, styles } => db.add_vertex_style(&id, styles),
        FlowStmt::Click { id, link, tooltip } => {
            db.update_link(&id, &link);
            if let Some(tooltip) = tooltip {
                db.set_tooltip(&id, &tooltip);
            }
        }
    }
}

fn declare_vertex(db: &mut FlowDb, token: &VertexToken) {
    db.add_vertex(&token.id, token.text.as_deref(), token.shape);
    if let Some(class) = &token.class {
        db.set_class(&token.id, class);
    }
}

// ---------------------------------------------------------------------------
// Header and document helpers
// ---------------------------------------------------------------------------

fn parse_header(
    statement: &str,
    line_number: usize,
    source_line: &str,
    stmt_offset: usize,
) -> Result<Direction, DiagramError> {
    let rest = statement
        .strip_prefix("flowchart")
        .or_else(|| statement.strip_prefix("graph"));
    let Some(rest) = rest else {
        return Err(DiagramError::Parse {
            message: format!("expected a 'graph' or 'flowchart' header, found: {statement}"),
            span: Span::at_token(line_number, col_at(source_line, stmt_offset), 1),
            expected: vec!["graph".to_string(), "flowchart".to_string()],
        });
    };

    let token = rest.trim();
    if token.is_empty() {
        return Ok(Direction::default());
    }
    let keyword_len = statement.len() - rest.len();
    let token_offset =
        stmt_offset + keyword_len + (rest.len() - rest.trim_start().len());
    if !rest.starts_with([' ', '\t']) {
        return Err(DiagramError::Parse {
            message: format!("malformed header: {statement}"),
            span: Span::at_token(line_number, col_at(source_line, stmt_offset), 1),
            expected: vec!["graph <direction>".to_string()],
        });
    }
    Direction::from_token(token).ok_or_else(|| DiagramError::Parse {
        message: format!("invalid flow direction {token:?}"),
        span: Span::at_token(
            line_number,
            col_at(source_line, token_offset),
            token.graphemes(true).count().max(1),
        ),
        expected: ["TB", "TD", "BT", "RL", "LR"]
            .iter()
            .map(|s| (*s).to_string())
            .collect(),
    })
}

/// Split a line into `;`-separated statements, returning each statement with
/// its byte offset in the line. Separators inside quotes or shape/label
/// brackets do not split.
fn split_statements(line: &str) -> Vec<(usize, &str)> {
    let mut statements = Vec::new();
    let mut current_start = 0;
    let mut in_quote: Option<char> = None;
    let mut square_depth = 0_usize;
    let mut paren_depth = 0_usize;
    let mut brace_depth = 0_usize;

    for (i, c) in line.char_indices() {
        if let Some(q) = in_quote {
            if c == q {
                in_quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => in_quote = Some(c),
            '[' => square_depth = square_depth.saturating_add(1),
            ']' => square_depth = square_depth.saturating_sub(1),
            '(' => paren_depth = paren_depth.saturating_add(1),
            ')' => paren_depth = paren_depth.saturating_sub(1),
            '{' => brace_depth = brace_depth.saturating_add(1),
            '}' => brace_depth = brace_depth.saturating_sub(1),
            ';' if square_depth == 0 && paren_depth == 0 && brace_depth == 0 => {
                push_trimmed(&mut statements, line, current_start, i);
                current_start = i + 1;
            }
            _ => {}
        }
    }
    push_trimmed(&mut statements, line, current_start, line.len());
    statements
}

fn push_trimmed<'a>(out: &mut Vec<(usize, &'a str)>, line: &'a str, start: usize, end: usize) {
    let segment = &line[start..end];
    let trimmed = segment.trim();
    if trimmed.is_empty() {
        return;
    }
    let offset = start + (segment.len() - segment.trim_start().len());
    out.push((offset, trimmed));
}

/// Cut a trailing `%%` comment off a line. The marker only counts when it is
/// preceded by whitespace (or starts the line) and sits outside quotes and
/// shape/label brackets.
fn strip_inline_comment(line: &str) -> &str {
    let mut in_quote: Option<char> = None;
    let mut depth = 0_usize;

    for (idx, ch) in line.char_indices() {
        if let Some(q) = in_quote {
            if ch == q {
                in_quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => in_quote = Some(ch),
            '[' | '(' | '{' => depth = depth.saturating_add(1),
            ']' | ')' | '}' => depth = depth.saturating_sub(1),
            '%' if depth == 0 && line[idx..].starts_with("%%") => {
                let at_start_or_after_ws = line[..idx]
                    .chars()
                    .next_back()
                    .is_none_or(char::is_whitespace);
                if at_start_or_after_ws {
                    return line[..idx].trim_end();
                }
            }
            _ => {}
        }
    }
    line
}

/// Strip one matched pair of surrounding quotes from a label.
fn clean_label(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let unquoted = match (trimmed.chars().next(), trimmed.chars().next_back()) {
        (Some(open), Some(close))
            if trimmed.len() >= 2 && open == close && matches!(open, '"' | '\'' | '`') =>
        {
            trimmed[open.len_utf8()..trimmed.len() - close.len_utf8()].trim()
        }
        _ => trimmed,
    };
    (!unquoted.is_empty()).then(|| unquoted.to_string())
}

/// 1-based grapheme column of a byte offset within a line.
fn col_at(line: &str, byte_offset: usize) -> usize {
    let mut offset = byte_offset.min(line.len());
    while offset > 0 && !line.is_char_boundary(offset) {
        offset -= 1;
    }
    line[..offset].graphemes(true).count() + 1
}

fn rich_to_error(
    error: &Rich<'_, char>,
    statement: &str,
    source_line: &str,
    stmt_offset: usize,
    line_number: usize,
) -> DiagramError {
    let start = error.span().start.min(statement.len());
    let col = col_at(source_line, stmt_offset + start);
    DiagramError::Parse {
        message: error.to_string(),
        span: Span::at_token(line_number, col, 1),
        expected: error.expected().map(|pattern| pattern.to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::{clean_label, parse, split_statements, strip_inline_comment};
    use dg_core::{Direction, EdgeType, FlowDb, VertexShape};

    fn parsed(text: &str) -> FlowDb {
        let mut db = FlowDb::new();
        parse(text, &mut db).expect("parse should succeed");
        db
    }

    #[test]
    fn parses_header_and_single_edge_statement_line() {
        let db = parsed("graph TD;A-->B;");
        assert_eq!(db.direction(), Direction::TD);
        assert_eq!(db.vertex_count(), 2);
        assert_eq!(db.edge_count(), 1);
        assert_eq!(db.edges()[0].kind, EdgeType::SolidArrow);
    }

    #[test]
    fn header_without_direction_defaults_to_tb() {
        let db = parsed("graph\nA-->B");
        assert_eq!(db.direction(), Direction::TB);
    }

    #[test]
    fn invalid_direction_token_is_a_parse_error() {
        let mut db = FlowDb::new();
        let err = parse("graph TQ;A--x|text including URL space|B;", &mut db).unwrap_err();
        match err {
            dg_core::DiagramError::Parse { message, span, expected } => {
                assert!(message.contains("direction"), "message: {message}");
                assert_eq!(span.start.line, 1);
                assert_eq!(span.start.col, 7);
                assert!(expected.contains(&"LR".to_string()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_header_is_a_parse_error() {
        let mut db = FlowDb::new();
        let err = parse("A-->B", &mut db).unwrap_err();
        assert!(err.to_string().contains("header"));
    }

    #[test]
    fn parses_all_vertex_shapes() {
        let db = parsed(
            "flowchart LR\nA[Box]\nB(Round)\nC([Stadium])\nD[[Sub]]\nE[(Store)]\nF((Ring))\nG(((Double)))\nH{Choice}\nI{{Hex}}\nJ>Flag]",
        );
        let shape_of = |id: &str| db.vertex_by_id(id).unwrap().shape;
        assert_eq!(shape_of("A"), VertexShape::Rect);
        assert_eq!(shape_of("B"), VertexShape::Rounded);
        assert_eq!(shape_of("C"), VertexShape::Stadium);
        assert_eq!(shape_of("D"), VertexShape::Subroutine);
        assert_eq!(shape_of("E"), VertexShape::Cylinder);
        assert_eq!(shape_of("F"), VertexShape::Circle);
        assert_eq!(shape_of("G"), VertexShape::DoubleCircle);
        assert_eq!(shape_of("H"), VertexShape::Diamond);
        assert_eq!(shape_of("I"), VertexShape::Hexagon);
        assert_eq!(shape_of("J"), VertexShape::Odd);
        assert_eq!(db.vertex_by_id("C").unwrap().text, "Stadium");
    }

    #[test]
    fn pipe_labels_attach_to_edges() {
        let db = parsed("graph TD;A-->|text ex|B;");
        assert_eq!(db.edges()[0].label.as_deref(), Some("text ex"));
    }

    #[test]
    fn open_edge_with_pipe_label() {
        let db = parsed("graph TD;A---|the text|B;");
        assert_eq!(db.edges()[0].kind, EdgeType::SolidOpen);
        assert_eq!(db.edges()[0].label.as_deref(), Some("the text"));
    }

    #[test]
    fn mid_dash_labels_attach_to_edges() {
        let db = parsed("graph TD\nA-- go north -->B\nC-. later .->D\nE== now ==>F");
        assert_eq!(db.edges()[0].label.as_deref(), Some("go north"));
        assert_eq!(db.edges()[0].kind, EdgeType::SolidArrow);
        assert_eq!(db.edges()[1].label.as_deref(), Some("later"));
        assert_eq!(db.edges()[1].kind, EdgeType::DottedArrow);
        assert_eq!(db.edges()[2].label.as_deref(), Some("now"));
        assert_eq!(db.edges()[2].kind, EdgeType::ThickArrow);
    }

    #[test]
    fn mid_dash_label_without_spaces() {
        let db = parsed("graph TD\nA--go-->B");
        assert_eq!(db.edges()[0].label.as_deref(), Some("go"));
    }

    #[test]
    fn dotted_and_thick_operators_parse() {
        let db = parsed("graph LR\nA-.->B\nB-.-C\nC==>D\nD===E\nE--xF\nF--oG");
        let kinds: Vec<EdgeType> = db.edges().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EdgeType::DottedArrow,
                EdgeType::DottedOpen,
                EdgeType::ThickArrow,
                EdgeType::ThickOpen,
                EdgeType::SolidCross,
                EdgeType::SolidCircle,
            ]
        );
    }

    #[test]
    fn chained_edges_record_in_order() {
        let db = parsed("graph LR\nA-->B-->C---D");
        assert_eq!(db.edge_count(), 3);
        assert_eq!(db.vertex_count(), 4);
        let edge = &db.edges()[2];
        assert_eq!(db.vertex(edge.start).id, "C");
        assert_eq!(db.vertex(edge.end).id, "D");
    }

    #[test]
    fn cross_edge_with_label_containing_spaces() {
        let db = parsed("graph TD;A--x|text including URL space|B;");
        assert_eq!(db.edges()[0].kind, EdgeType::SolidCross);
        assert_eq!(
            db.edges()[0].label.as_deref(),
            Some("text including URL space")
        );
    }

    #[test]
    fn link_style_records_sparse_overrides() {
        let db = parsed("graph TD;A---B; linkStyle 0 stroke:val1,stroke-width:val2;");
        let style = db.link_style(0).expect("override for edge 0");
        assert_eq!(style.styles, vec!["stroke:val1", "stroke-width:val2"]);
        assert_eq!(style.interpolate, None);
    }

    #[test]
    fn link_style_interpolate_without_declarations() {
        let db = parsed("graph TD;A---B; linkStyle 0 interpolate basis");
        let style = db.link_style(0).expect("override for edge 0");
        assert!(style.styles.is_empty());
        assert_eq!(style.interpolate.as_deref(), Some("basis"));
    }

    #[test]
    fn link_style_interpolate_with_declarations() {
        let db = parsed("graph TD\nA---B\nlinkStyle 0 interpolate basis stroke:red");
        let style = db.link_style(0).unwrap();
        assert_eq!(style.interpolate.as_deref(), Some("basis"));
        assert_eq!(style.styles, vec!["stroke:red"]);
    }

    #[test]
    fn link_style_default_targets_wildcard_slot() {
        let db = parsed("graph TD\nA---B\nlinkStyle default stroke:val1");
        assert_eq!(db.default_link_style().styles, vec!["stroke:val1"]);
        assert!(db.link_style(0).is_none());
    }

    #[test]
    fn link_style_accepts_index_lists() {
        let db = parsed("graph TD\nA---B\nB---C\nlinkStyle 0,1 stroke:red");
        assert_eq!(db.link_style(0).unwrap().styles, vec!["stroke:red"]);
        assert_eq!(db.link_style(1).unwrap().styles, vec!["stroke:red"]);
    }

    #[test]
    fn link_style_may_precede_its_edge() {
        let db = parsed("graph TD\nlinkStyle 0 stroke:red\nA---B");
        assert_eq!(db.link_style(0).unwrap().styles, vec!["stroke:red"]);
        assert_eq!(db.edge_count(), 1);
    }

    #[test]
    fn bare_link_style_statement_is_an_error() {
        let mut db = FlowDb::new();
        assert!(parse("graph TD\nA---B\nlinkStyle 0", &mut db).is_err());
    }

    #[test]
    fn class_def_and_assignment() {
        let db = parsed("graph TD\nA-->B\nclassDef warm fill:#f96,stroke:#333\nclass A,B warm");
        assert_eq!(db.classes().len(), 1);
        assert_eq!(db.classes()[0].name, "warm");
        assert_eq!(db.classes()[0].styles, vec!["fill:#f96", "stroke:#333"]);
        assert_eq!(db.vertex_by_id("A").unwrap().classes, vec!["warm"]);
        assert_eq!(db.vertex_by_id("B").unwrap().classes, vec!["warm"]);
    }

    #[test]
    fn class_shorthand_on_vertex_declaration() {
        let db = parsed("graph TD\nA[Start]:::warm-->B");
        assert_eq!(db.vertex_by_id("A").unwrap().classes, vec!["warm"]);
        assert_eq!(db.vertex_by_id("A").unwrap().text, "Start");
        assert_eq!(db.edge_count(), 1);
    }

    #[test]
    fn style_statement_appends_inline_styles() {
        let db = parsed("graph TD\nA-->B\nstyle A fill:#f9f,stroke-width:4px");
        assert_eq!(
            db.vertex_by_id("A").unwrap().styles,
            vec!["fill:#f9f", "stroke-width:4px"]
        );
    }

    #[test]
    fn click_statement_sets_link_and_tooltip() {
        let db = parsed("graph TD\nA-->B\nclick A \"https://example.com\" \"Open docs\"");
        let a = db.vertex_by_id("A").unwrap();
        assert_eq!(a.link.as_deref(), Some("https://example.com"));
        assert_eq!(a.tooltip.as_deref(), Some("Open docs"));
    }

    #[test]
    fn repeated_declarations_refine_text() {
        let db = parsed("graph TD\nA-->B\nA[Start]");
        assert_eq!(db.vertex_by_id("A").unwrap().text, "Start");
        assert_eq!(db.vertex_count(), 2);
    }

    #[test]
    fn quoted_vertex_text_is_unquoted() {
        let db = parsed("graph TD\nA[\"quoted text\"]-->B");
        assert_eq!(db.vertex_by_id("A").unwrap().text, "quoted text");
    }

    #[test]
    fn semicolons_inside_labels_do_not_split_statements() {
        let db = parsed("graph TD\nA[foo;bar]-->B");
        assert_eq!(db.vertex_count(), 2);
        assert_eq!(db.vertex_by_id("A").unwrap().text, "foo;bar");
    }

    #[test]
    fn trailing_comments_are_ignored() {
        let db = parsed("graph TD\nA-->B %% to be revisited");
        assert_eq!(db.edge_count(), 1);
        assert_eq!(db.vertex_count(), 2);
    }

    #[test]
    fn init_directives_are_skipped() {
        let db = parsed("%%{init: {\"theme\": \"dark\"}}%%\ngraph TD\nA-->B");
        assert_eq!(db.edge_count(), 1);
    }

    #[test]
    fn error_positions_point_at_the_offending_line() {
        let mut db = FlowDb::new();
        let err = parse("graph TD\nA-->B\nA-->", &mut db).unwrap_err();
        match err {
            dg_core::DiagramError::Parse { span, .. } => assert_eq!(span.start.line, 3),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn broken_shape_delimiter_is_an_error() {
        let mut db = FlowDb::new();
        assert!(parse("graph TD\nA[unclosed-->B", &mut db).is_err());
    }

    #[test]
    fn split_statements_reports_offsets() {
        let parts = split_statements("A-->B; C-->D;");
        assert_eq!(parts, vec![(0, "A-->B"), (7, "C-->D")]);
    }

    #[test]
    fn strip_inline_comment_requires_leading_whitespace() {
        assert_eq!(strip_inline_comment("A-->B %% note"), "A-->B");
        assert_eq!(strip_inline_comment("A[100%%]-->B"), "A[100%%]-->B");
    }

    #[test]
    fn clean_label_strips_matched_quotes_only() {
        assert_eq!(clean_label("\"hi\""), Some("hi".to_string()));
        assert_eq!(clean_label("  spaced  "), Some("spaced".to_string()));
        assert_eq!(clean_label("\"mismatch'"), Some("\"mismatch'".to_string()));
        assert_eq!(clean_label("   "), None);
    }
}

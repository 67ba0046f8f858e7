#![forbid(unsafe_code)]

use dg_core::{Arrowhead, FlowDb, LinkStyle, Warning, WarningCode};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Normalized edge descriptor handed to the layout sink. Absent options mean
/// "apply the sink's own default", never an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct EdgeOptions {
    pub arrowhead: Arrowhead,
    pub label: Option<String>,
    pub style: Option<String>,
    pub curve: Option<String>,
}

/// The graph-layout collaborator receiving one call per edge. Return values
/// are deliberately not consulted.
pub trait EdgeSink {
    fn set_edge(&mut self, start: &str, end: &str, options: EdgeOptions);
}

/// Build every edge of the database, in declaration order, into `sink`.
///
/// Per edge: endpoints resolve to the vertices' renderer-facing ids, the
/// arrowhead comes from the edge-type dispatch table, the label is attached
/// verbatim, and `linkStyle` overrides are merged into a `;`-joined style
/// string (indexed override first, wildcard otherwise). Overrides pointing
/// past the last edge never fail the build; they are reported as warnings.
pub fn add_edges<S: EdgeSink>(db: &FlowDb, sink: &mut S) -> Vec<Warning> {
    let warnings = out_of_range_warnings(db);

    for (index, edge) in db.edges().iter().enumerate() {
        let start = db.vertex(edge.start).dom_id();
        let end = db.vertex(edge.end).dom_id();

        let indexed = db.link_style(index);
        let fallback = db.default_link_style();

        let styles = indexed
            .filter(|style| !style.styles.is_empty())
            .map(|style| style.styles.as_slice())
            .or_else(|| (!fallback.styles.is_empty()).then(|| fallback.styles.as_slice()));

        let curve = indexed
            .and_then(|style| style.interpolate.clone())
            .or_else(|| fallback.interpolate.clone());

        let options = EdgeOptions {
            arrowhead: edge.kind.arrowhead(),
            label: edge.label.clone(),
            style: styles.map(merge_style),
            curve,
        };
        sink.set_edge(start, end, options);
    }

    warnings
}

/// Join declarations with `;`, always ending on a separator so callers can
/// append further rules, and inject `fill:none;` unless a declaration
/// already sets the `fill` property.
fn merge_style(decls: &[String]) -> String {
    let mut merged = String::new();
    for decl in decls {
        merged.push_str(decl);
        merged.push(';');
    }
    if !decls.iter().any(|decl| declares_fill(decl)) {
        merged.push_str("fill:none;");
    }
    merged
}

fn declares_fill(decl: &str) -> bool {
    decl.split_once(':')
        .is_some_and(|(prop, _)| prop.trim() == "fill")
}

fn out_of_range_warnings(db: &FlowDb) -> Vec<Warning> {
    let edge_count = db.edge_count();
    let mut indices: Vec<usize> = db
        .link_styles()
        .filter_map(|(index, style)| {
            (index >= edge_count && !style.is_empty()).then_some(index)
        })
        .collect();
    indices.sort_unstable();

    indices
        .into_iter()
        .map(|index| {
            let message = format!(
                "linkStyle index {index} is out of range; the diagram declares {edge_count} edge(s)"
            );
            warn!(code = WarningCode::LinkStyleIndexOutOfRange.as_str(), "{message}");
            Warning::new(WarningCode::LinkStyleIndexOutOfRange, message)
        })
        .collect()
}

/// Convenience view over one indexed override merged against the wildcard,
/// mirroring what [`add_edges`] attaches to that edge.
#[must_use]
pub fn resolved_link_style(db: &FlowDb, index: usize) -> LinkStyle {
    let indexed = db.link_style(index);
    let fallback = db.default_link_style();
    LinkStyle {
        styles: indexed
            .filter(|style| !style.styles.is_empty())
            .unwrap_or(fallback)
            .styles
            .clone(),
        interpolate: indexed
            .and_then(|style| style.interpolate.clone())
            .or_else(|| fallback.interpolate.clone()),
    }
}

use dg_core::{Dialect, DiagramError, FlowDb, Generation, SequenceDb, Warning};
use serde_json::json;

use crate::{detect, flow, sequence};

/// Database of a parsed diagram, tagged by dialect.
#[derive(Debug, Clone)]
pub enum DiagramDb {
    Flow(FlowDb),
    Sequence(SequenceDb),
}

/// One parsed diagram: the detected dialect plus the database its grammar
/// parser populated. Each instance owns its database exclusively; parsing a
/// second document means constructing a second `Diagram`.
#[derive(Debug, Clone)]
pub struct Diagram {
    dialect: Dialect,
    db: DiagramDb,
}

impl Diagram {
    /// Detect the dialect of `text`, parse it, and return the populated
    /// diagram.
    pub fn parse(text: &str) -> Result<Self, DiagramError> {
        Self::parse_with_gen(text, Generation::default())
    }

    /// Like [`Diagram::parse`] with an explicit identifier-formatting
    /// policy. The policy has to be chosen up front: renderer-facing ids are
    /// minted while the parse runs.
    pub fn parse_with_gen(text: &str, generation: Generation) -> Result<Self, DiagramError> {
        let dialect = detect::detect(text)?;
        let db = match dialect {
            Dialect::Flowchart => {
                let mut db = FlowDb::with_generation(generation);
                flow::parse(text, &mut db)?;
                DiagramDb::Flow(db)
            }
            Dialect::Sequence => {
                let mut db = SequenceDb::new();
                sequence::parse(text, &mut db)?;
                DiagramDb::Sequence(db)
            }
        };
        Ok(Self { dialect, db })
    }

    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    #[must_use]
    pub fn db(&self) -> &DiagramDb {
        &self.db
    }

    #[must_use]
    pub fn flow(&self) -> Option<&FlowDb> {
        match &self.db {
            DiagramDb::Flow(db) => Some(db),
            DiagramDb::Sequence(_) => None,
        }
    }

    #[must_use]
    pub fn sequence(&self) -> Option<&SequenceDb> {
        match &self.db {
            DiagramDb::Sequence(db) => Some(db),
            DiagramDb::Flow(_) => None,
        }
    }

    #[must_use]
    pub fn warnings(&self) -> &[Warning] {
        match &self.db {
            DiagramDb::Flow(db) => db.warnings(),
            DiagramDb::Sequence(db) => db.warnings(),
        }
    }

    /// JSON diagnostics summary: entity counts per dialect, for logs and
    /// tooling.
    #[must_use]
    pub fn summary_json(&self) -> String {
        match &self.db {
            DiagramDb::Flow(db) => json!({
                "dialect": self.dialect.as_str(),
                "vertex_count": db.vertex_count(),
                "edge_count": db.edge_count(),
                "class_count": db.classes().len(),
                "warning_count": db.warnings().len(),
            }),
            DiagramDb::Sequence(db) => json!({
                "dialect": self.dialect.as_str(),
                "actor_count": db.actors().len(),
                "message_count": db.messages().count(),
                "warning_count": db.warnings().len(),
            }),
        }
        .to_string()
    }
}

type ParseErrorHandler = Box<dyn Fn(&DiagramError) + Send + Sync>;

/// Top-level parse facade. Without a handler installed, [`Diagraph::parse`]
/// propagates errors; with one, the handler observes the error and the call
/// resolves to `Ok(None)` instead.
#[derive(Default)]
pub struct Diagraph {
    generation: Generation,
    parse_error_handler: Option<ParseErrorHandler>,
}

impl Diagraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the identifier-formatting policy for subsequent parses.
    pub fn set_gen(&mut self, generation: Generation) {
        self.generation = generation;
    }

    pub fn set_parse_error_handler(
        &mut self,
        handler: impl Fn(&DiagramError) + Send + Sync + 'static,
    ) {
        self.parse_error_handler = Some(Box::new(handler));
    }

    /// Parse `text` into a diagram. `Ok(None)` is only produced when an
    /// installed error handler swallowed a parse failure.
    pub fn parse(&self, text: &str) -> Result<Option<Diagram>, DiagramError> {
        match Diagram::parse_with_gen(text, self.generation) {
            Ok(diagram) => Ok(Some(diagram)),
            Err(error) => match &self.parse_error_handler {
                Some(handler) => {
                    handler(&error);
                    Ok(None)
                }
                None => Err(error),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Diagram, DiagramDb, Diagraph};
    use dg_core::{Dialect, DiagramError, Generation};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn parse_routes_to_the_flow_dialect() {
        let diagram = Diagram::parse("graph TD;A-->B;").expect("valid flow definition");
        assert_eq!(diagram.dialect(), Dialect::Flowchart);
        let db = diagram.flow().expect("flow database");
        assert_eq!(db.vertex_count(), 2);
        assert_eq!(db.edge_count(), 1);
        assert!(diagram.sequence().is_none());
        assert!(diagram.warnings().is_empty());
    }

    #[test]
    fn parse_routes_to_the_sequence_dialect() {
        let diagram =
            Diagram::parse("sequenceDiagram\nAlice->Bob: Hello").expect("valid sequence");
        assert_eq!(diagram.dialect(), Dialect::Sequence);
        assert!(matches!(diagram.db(), DiagramDb::Sequence(_)));
        assert_eq!(diagram.sequence().unwrap().actors().len(), 2);
    }

    #[test]
    fn parse_with_gen_controls_dom_ids() {
        let gen1 = Diagram::parse_with_gen("graph TD;A-->B;", Generation::Gen1).unwrap();
        assert_eq!(gen1.flow().unwrap().vertex_by_id("A").unwrap().dom_id(), "A");

        let gen2 = Diagram::parse_with_gen("graph TD;A-->B;", Generation::Gen2).unwrap();
        let dom_id = gen2.flow().unwrap().vertex_by_id("A").unwrap().dom_id().to_string();
        assert!(dom_id.contains("flowchart-A-"));
    }

    #[test]
    fn unknown_dialect_propagates_by_default() {
        let err = Diagram::parse("this is not a diagram definition").unwrap_err();
        assert!(matches!(err, DiagramError::UnknownDiagramType { .. }));
    }

    #[test]
    fn handler_turns_errors_into_the_falsy_sentinel() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);

        let mut diagraph = Diagraph::new();
        diagraph.set_parse_error_handler(move |_error| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let result = diagraph.parse("this is not a diagram definition");
        assert!(matches!(result, Ok(None)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handler_is_not_invoked_on_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);

        let mut diagraph = Diagraph::new();
        diagraph.set_parse_error_handler(move |_error| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let result = diagraph.parse("graph TD;A--x|text including URL space|B;");
        assert!(matches!(result, Ok(Some(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn without_handler_parse_errors_propagate() {
        let diagraph = Diagraph::new();
        assert!(diagraph.parse("graph TQ;A--x|text|B;").is_err());
        assert!(diagraph
            .parse("this is not a diagram definition")
            .is_err());
    }

    #[test]
    fn facade_gen_selection_applies_to_parses() {
        let mut diagraph = Diagraph::new();
        diagraph.set_gen(Generation::Gen2);
        let diagram = diagraph.parse("graph TD;A-->B;").unwrap().unwrap();
        assert!(diagram
            .flow()
            .unwrap()
            .vertex_by_id("A")
            .unwrap()
            .dom_id()
            .contains("flowchart-A-"));
    }

    #[test]
    fn summary_json_reports_counts() {
        let diagram = Diagram::parse("graph TD;A-->B;").unwrap();
        let summary = diagram.summary_json();
        assert!(summary.contains("\"dialect\":\"flowchart\""));
        assert!(summary.contains("\"vertex_count\":2"));
        assert!(summary.contains("\"edge_count\":1"));
    }
}

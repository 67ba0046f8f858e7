use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Direction, EdgeType, Generation, VertexShape, Warning, WarningCode};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct VertexId(pub usize);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Vertex {
    pub id: String,
    dom_id: String,
    pub text: String,
    pub shape: VertexShape,
    pub classes: Vec<String>,
    pub styles: Vec<String>,
    pub link: Option<String>,
    pub tooltip: Option<String>,
}

impl Vertex {
    /// Renderer-facing identifier, minted once at creation per the active
    /// generation policy. Opaque to sinks; unique per vertex within a parse.
    #[must_use]
    pub fn dom_id(&self) -> &str {
        &self.dom_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Edge {
    pub start: VertexId,
    pub end: VertexId,
    pub kind: EdgeType,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClassDef {
    pub name: String,
    pub styles: Vec<String>,
}

/// Style and interpolation overrides attached to an edge index by a
/// `linkStyle` directive. Declarations stay raw (`prop:value`) in the order
/// they were written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct LinkStyle {
    pub styles: Vec<String>,
    pub interpolate: Option<String>,
}

impl LinkStyle {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.styles.is_empty() && self.interpolate.is_none()
    }
}

/// Target of a `linkStyle` directive: one concrete edge index, or the
/// wildcard `default` slot that applies when no indexed override does.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LinkStyleIndex {
    Default,
    At(usize),
}

/// Graph database for the flow dialect. One instance per parse; call
/// [`FlowDb::clear`] before reusing it for an independent diagram.
#[derive(Debug, Clone, Default)]
pub struct FlowDb {
    generation: Generation,
    direction: Direction,
    vertices: Vec<Vertex>,
    vertex_lookup: FxHashMap<String, VertexId>,
    edges: Vec<Edge>,
    classes: Vec<ClassDef>,
    class_lookup: FxHashMap<String, usize>,
    link_styles: FxHashMap<usize, LinkStyle>,
    default_link_style: LinkStyle,
    warnings: Vec<Warning>,
}

impl FlowDb {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_generation(generation: Generation) -> Self {
        Self {
            generation,
            ..Self::default()
        }
    }

    /// Select the identifier-formatting policy. Must happen before parsing:
    /// renderer-facing ids are minted as vertices are created.
    pub fn set_gen(&mut self, generation: Generation) {
        self.generation = generation;
    }

    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Insert-or-merge a vertex. Repeated declarations refine display text
    /// and shape; they never create duplicates.
    pub fn add_vertex(
        &mut self,
        id: &str,
        text: Option<&str>,
        shape: Option<VertexShape>,
    ) -> VertexId {
        if let Some(&existing) = self.vertex_lookup.get(id) {
            let vertex = &mut self.vertices[existing.0];
            if let Some(text) = text {
                vertex.text = text.to_string();
            }
            if let Some(shape) = shape {
                vertex.shape = shape;
            }
            return existing;
        }

        let seq = self.vertices.len();
        let vertex_id = VertexId(seq);
        let dom_id = self.generation.dom_id(id, seq);
        debug!(vertex = id, dom_id = %dom_id, "new vertex");
        self.vertices.push(Vertex {
            id: id.to_string(),
            dom_id,
            text: text.unwrap_or(id).to_string(),
            shape: shape.unwrap_or_default(),
            classes: Vec::new(),
            styles: Vec::new(),
            link: None,
            tooltip: None,
        });
        self.vertex_lookup.insert(id.to_string(), vertex_id);
        vertex_id
    }

    /// Append an edge and return its declaration-order index. Endpoints that
    /// were never declared are created implicitly with default shape and
    /// text equal to their id.
    pub fn add_edge(
        &mut self,
        start: &str,
        end: &str,
        kind: EdgeType,
        label: Option<&str>,
    ) -> usize {
        let start = self.add_vertex(start, None, None);
        let end = self.add_vertex(end, None, None);
        let index = self.edges.len();
        self.edges.push(Edge {
            start,
            end,
            kind,
            label: label.map(str::to_string),
        });
        index
    }

    /// Register a `classDef`. Redefining a name replaces the previous
    /// declaration list and records a warning.
    pub fn add_class(&mut self, name: &str, styles: Vec<String>) {
        if let Some(&slot) = self.class_lookup.get(name) {
            self.warn(
                WarningCode::DuplicateClassDef,
                format!("classDef {name:?} was already defined; replacing it"),
            );
            self.classes[slot].styles = styles;
            return;
        }
        let slot = self.classes.len();
        self.classes.push(ClassDef {
            name: name.to_string(),
            styles,
        });
        self.class_lookup.insert(name.to_string(), slot);
    }

    /// Attach a class to a vertex. An undeclared vertex is created
    /// implicitly rather than failing the statement.
    pub fn set_class(&mut self, id: &str, class: &str) {
        if !self.vertex_lookup.contains_key(id) {
            self.warn(
                WarningCode::ImplicitTarget,
                format!("class {class:?} applied to undeclared vertex {id:?}"),
            );
        }
        let vertex_id = self.add_vertex(id, None, None);
        let vertex = &mut self.vertices[vertex_id.0];
        if !vertex.classes.iter().any(|existing| existing == class) {
            vertex.classes.push(class.to_string());
        }
    }

    /// Append inline style declarations from a `style` statement.
    pub fn add_vertex_style(&mut self, id: &str, styles: Vec<String>) {
        if !self.vertex_lookup.contains_key(id) {
            self.warn(
                WarningCode::ImplicitTarget,
                format!("style applied to undeclared vertex {id:?}"),
            );
        }
        let vertex_id = self.add_vertex(id, None, None);
        self.vertices[vertex_id.0].styles.extend(styles);
    }

    pub fn update_link(&mut self, id: &str, link: &str) {
        if !self.vertex_lookup.contains_key(id) {
            self.warn(
                WarningCode::ImplicitTarget,
                format!("link attached to undeclared vertex {id:?}"),
            );
        }
        let vertex_id = self.add_vertex(id, None, None);
        self.vertices[vertex_id.0].link = Some(link.to_string());
    }

    pub fn set_tooltip(&mut self, id: &str, tooltip: &str) {
        let vertex_id = self.add_vertex(id, None, None);
        self.vertices[vertex_id.0].tooltip = Some(tooltip.to_string());
    }

    /// Record style declarations for an edge index (or the wildcard slot).
    /// Overrides are applied lazily at edge-build time, so indices may
    /// reference edges that have not been declared yet.
    pub fn add_link_style(&mut self, index: LinkStyleIndex, styles: Vec<String>) {
        match index {
            LinkStyleIndex::Default => self.default_link_style.styles.extend(styles),
            LinkStyleIndex::At(i) => {
                self.link_styles.entry(i).or_default().styles.extend(styles);
            }
        }
    }

    /// Record a curve-interpolation mode for an edge index (or the wildcard
    /// slot), independently of any style declarations.
    pub fn add_link_interpolate(&mut self, index: LinkStyleIndex, curve: &str) {
        match index {
            LinkStyleIndex::Default => {
                self.default_link_style.interpolate = Some(curve.to_string());
            }
            LinkStyleIndex::At(i) => {
                self.link_styles.entry(i).or_default().interpolate = Some(curve.to_string());
            }
        }
    }

    #[must_use]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    #[must_use]
    pub fn classes(&self) -> &[ClassDef] {
        &self.classes
    }

    #[must_use]
    pub fn vertex(&self, id: VertexId) -> &Vertex {
        &self.vertices[id.0]
    }

    #[must_use]
    pub fn vertex_by_id(&self, id: &str) -> Option<&Vertex> {
        self.vertex_lookup.get(id).map(|&slot| &self.vertices[slot.0])
    }

    #[must_use]
    pub fn class_by_name(&self, name: &str) -> Option<&ClassDef> {
        self.class_lookup.get(name).map(|&slot| &self.classes[slot])
    }

    #[must_use]
    pub fn link_style(&self, index: usize) -> Option<&LinkStyle> {
        self.link_styles.get(&index)
    }

    #[must_use]
    pub fn default_link_style(&self) -> &LinkStyle {
        &self.default_link_style
    }

    /// All indexed overrides, in no particular order.
    pub fn link_styles(&self) -> impl Iterator<Item = (usize, &LinkStyle)> {
        self.link_styles.iter().map(|(&index, style)| (index, style))
    }

    #[must_use]
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Reset all parsed state. The generation policy is deliberately kept;
    /// it is a property of the surrounding pipeline, not of one document.
    pub fn clear(&mut self) {
        self.direction = Direction::default();
        self.vertices.clear();
        self.vertex_lookup.clear();
        self.edges.clear();
        self.classes.clear();
        self.class_lookup.clear();
        self.link_styles.clear();
        self.default_link_style = LinkStyle::default();
        self.warnings.clear();
    }

    fn warn(&mut self, code: WarningCode, message: String) {
        tracing::warn!(code = code.as_str(), "{message}");
        self.warnings.push(Warning::new(code, message));
    }
}

#[cfg(test)]
mod tests {
    use super::{FlowDb, LinkStyleIndex};
    use crate::{EdgeType, Generation, VertexShape, WarningCode};

    #[test]
    fn repeated_declarations_merge_instead_of_duplicating() {
        let mut db = FlowDb::new();
        let first = db.add_vertex("A", None, None);
        assert_eq!(db.vertex(first).text, "A");
        assert_eq!(db.vertex(first).shape, VertexShape::Rect);

        let second = db.add_vertex("A", Some("Start"), Some(VertexShape::Diamond));
        assert_eq!(first, second);
        assert_eq!(db.vertex_count(), 1);
        assert_eq!(db.vertex(first).text, "Start");
        assert_eq!(db.vertex(first).shape, VertexShape::Diamond);

        // A later bare reference must not erase the refined text/shape.
        db.add_vertex("A", None, None);
        assert_eq!(db.vertex(first).text, "Start");
        assert_eq!(db.vertex(first).shape, VertexShape::Diamond);
    }

    #[test]
    fn add_edge_creates_missing_endpoints_implicitly() {
        let mut db = FlowDb::new();
        let index = db.add_edge("A", "B", EdgeType::SolidArrow, Some("go"));
        assert_eq!(index, 0);
        assert_eq!(db.vertex_count(), 2);
        let a = db.vertex_by_id("A").expect("implicit A");
        assert_eq!(a.text, "A");
        assert_eq!(a.shape, VertexShape::Rect);
    }

    #[test]
    fn edge_indices_follow_declaration_order() {
        let mut db = FlowDb::new();
        assert_eq!(db.add_edge("A", "B", EdgeType::SolidArrow, None), 0);
        assert_eq!(db.add_edge("B", "C", EdgeType::SolidOpen, None), 1);
        assert_eq!(db.add_edge("A", "C", EdgeType::ThickArrow, None), 2);
        assert_eq!(db.edges()[1].kind, EdgeType::SolidOpen);
    }

    #[test]
    fn gen2_dom_ids_carry_prefix_and_suffix() {
        let mut db = FlowDb::with_generation(Generation::Gen2);
        db.add_edge("A", "B", EdgeType::SolidArrow, None);
        let a = db.vertex_by_id("A").unwrap();
        let b = db.vertex_by_id("B").unwrap();
        assert!(a.dom_id().contains("flowchart-A-"));
        assert!(b.dom_id().contains("flowchart-B-"));
        assert_ne!(a.dom_id(), b.dom_id());
    }

    #[test]
    fn gen1_dom_ids_reuse_raw_vertex_ids() {
        let mut db = FlowDb::with_generation(Generation::Gen1);
        db.add_vertex("A", None, None);
        assert_eq!(db.vertex_by_id("A").unwrap().dom_id(), "A");
    }

    #[test]
    fn set_class_on_undeclared_vertex_creates_it_with_warning() {
        let mut db = FlowDb::new();
        db.set_class("ghost", "highlight");
        let vertex = db.vertex_by_id("ghost").expect("implicitly created");
        assert_eq!(vertex.classes, vec!["highlight".to_string()]);
        assert_eq!(db.warnings().len(), 1);
        assert_eq!(db.warnings()[0].code, WarningCode::ImplicitTarget);
    }

    #[test]
    fn set_class_does_not_duplicate_class_names() {
        let mut db = FlowDb::new();
        db.add_vertex("A", None, None);
        db.set_class("A", "big");
        db.set_class("A", "big");
        assert_eq!(db.vertex_by_id("A").unwrap().classes.len(), 1);
    }

    #[test]
    fn class_def_redefinition_replaces_and_warns() {
        let mut db = FlowDb::new();
        db.add_class("warm", vec!["fill:#f96".to_string()]);
        db.add_class("warm", vec!["fill:#c00".to_string()]);
        assert_eq!(db.classes().len(), 1);
        assert_eq!(db.classes()[0].styles, vec!["fill:#c00".to_string()]);
        assert_eq!(
            db.class_by_name("warm").unwrap().styles,
            vec!["fill:#c00".to_string()]
        );
        assert_eq!(db.warnings()[0].code, WarningCode::DuplicateClassDef);
    }

    #[test]
    fn link_style_overrides_accumulate_sparsely() {
        let mut db = FlowDb::new();
        db.add_link_style(LinkStyleIndex::At(3), vec!["stroke:red".to_string()]);
        db.add_link_style(LinkStyleIndex::At(3), vec!["stroke-width:2px".to_string()]);
        db.add_link_interpolate(LinkStyleIndex::Default, "basis");

        let at3 = db.link_style(3).expect("override recorded");
        assert_eq!(at3.styles, vec!["stroke:red", "stroke-width:2px"]);
        assert_eq!(at3.interpolate, None);
        assert_eq!(db.link_style(0), None);
        assert_eq!(db.default_link_style().interpolate.as_deref(), Some("basis"));
    }

    #[test]
    fn clear_resets_everything_but_generation() {
        let mut db = FlowDb::with_generation(Generation::Gen1);
        db.add_edge("A", "B", EdgeType::SolidArrow, None);
        db.add_class("c", vec!["fill:none".to_string()]);
        db.add_link_style(LinkStyleIndex::At(0), vec!["stroke:red".to_string()]);
        db.set_class("A", "c");

        db.clear();
        assert_eq!(db.vertex_count(), 0);
        assert_eq!(db.edge_count(), 0);
        assert!(db.classes().is_empty());
        assert!(db.link_style(0).is_none());
        assert!(db.default_link_style().is_empty());
        assert!(db.warnings().is_empty());
        assert_eq!(db.generation(), Generation::Gen1);
    }
}

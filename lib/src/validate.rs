//! The validation seam and the built-in core engine.
//!
//! The form only needs to hand a dataset to an engine and read back a
//! [`ValidationReport`]. [`CoreEngine`] covers the SHACL Core constraints the
//! form can edit; anything richer plugs in through [`ValidationEngine`].
use crate::labels::term_value;
use crate::named_nodes::SH;
use crate::report::{ValidationReport, ValidationResult};
use crate::store::{QuadStore, SHAPES_GRAPH};
use crate::types::{check_lexical_form, NodeKind, Path, Severity};
use log::{debug, info, warn};
use oxigraph::model::vocab::{rdf, rdfs};
use oxigraph::model::{GraphName, NamedNode, NamedNodeRef, Quad, Term};
use regex::{Regex, RegexBuilder};

/// Anything that can validate the quads of a [`QuadStore`] against the shapes it holds.
pub trait ValidationEngine {
    fn validate(&self, store: &QuadStore) -> Result<ValidationReport, String>;
}

/// Focus node of one shape evaluation and the value nodes reached from it.
#[derive(Debug, Clone)]
struct Context {
    focus_node: Term,
    path: Option<Path>,
    value_nodes: Vec<Term>,
}

/// A constraint component parameterised by one shape.
#[derive(Debug)]
enum Component {
    MinCount(u64),
    MaxCount(u64),
    Datatype(NamedNode),
    Class(NamedNode),
    NodeKind(NodeKind),
    Pattern(Regex),
    MinLength(u64),
    MaxLength(u64),
    In(Vec<Term>),
    HasValue(Term),
    Node(Term),
    Or(Vec<Term>),
    Xone(Vec<Term>),
    And(Vec<Term>),
    Not(Term),
}

impl Component {
    fn iri(&self) -> NamedNodeRef<'static> {
        match self {
            Component::MinCount(_) => SH.min_count_component,
            Component::MaxCount(_) => SH.max_count_component,
            Component::Datatype(_) => SH.datatype_component,
            Component::Class(_) => SH.class_component,
            Component::NodeKind(_) => SH.node_kind_component,
            Component::Pattern(_) => SH.pattern_component,
            Component::MinLength(_) => SH.min_length_component,
            Component::MaxLength(_) => SH.max_length_component,
            Component::In(_) => SH.in_component,
            Component::HasValue(_) => SH.has_value_component,
            Component::Node(_) => SH.node_component,
            Component::Or(_) => SH.or_component,
            Component::Xone(_) => SH.xone_component,
            Component::And(_) => SH.and_component,
            Component::Not(_) => SH.not_component,
        }
    }
}

fn parse_count(term: &Term, what: &str) -> Result<u64, String> {
    term_value(term)
        .trim()
        .parse()
        .map_err(|e| format!("Invalid {} value {}: {}", what, term, e))
}

fn named(term: &Term, what: &str) -> Result<NamedNode, String> {
    match term {
        Term::NamedNode(nn) => Ok(nn.clone()),
        other => Err(format!("{} must be an IRI, got {}", what, other)),
    }
}

/// Drops repeated terms, keeping the first occurrence.
fn dedup_terms(terms: &mut Vec<Term>) {
    let mut seen: Vec<Term> = Vec::with_capacity(terms.len());
    terms.retain(|t| {
        if seen.contains(t) {
            false
        } else {
            seen.push(t.clone());
            true
        }
    });
}

/// Compiles `sh:pattern` with its `sh:flags`.
fn compile_pattern(pattern: &str, flags: &str) -> Result<Regex, String> {
    RegexBuilder::new(pattern)
        .case_insensitive(flags.contains('i'))
        .multi_line(flags.contains('m'))
        .dot_matches_new_line(flags.contains('s'))
        .ignore_whitespace(flags.contains('x'))
        .build()
        .map_err(|e| format!("Invalid sh:pattern \"{}\": {}", pattern, e))
}

/// Validates SHACL Core node and property shapes directly over the store.
///
/// Shapes are read from every graph, so `sh:targetNode` statements written next
/// to the data are honoured; data is read from `data_graph`, or from every graph
/// except the shapes graph when none is set.
#[derive(Debug, Clone)]
pub struct CoreEngine {
    data_graph: Option<GraphName>,
    max_depth: usize,
}

impl Default for CoreEngine {
    fn default() -> Self {
        CoreEngine {
            data_graph: None,
            max_depth: 32,
        }
    }
}

impl CoreEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data_graph(mut self, graph: GraphName) -> Self {
        self.data_graph = Some(graph);
        self
    }

    /// Nesting limit for `sh:node` and logical constraints; deeper checks are
    /// treated as conforming.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

impl ValidationEngine for CoreEngine {
    fn validate(&self, store: &QuadStore) -> Result<ValidationReport, String> {
        let run = Run {
            engine: self,
            store,
        };
        let mut results = Vec::new();
        for shape in run.node_shapes() {
            let targets = run.focus_nodes(&shape);
            debug!("validating {} against {} focus node(s)", shape, targets.len());
            for focus in targets {
                run.validate_shape(&shape, &focus, 0, &mut results)?;
            }
        }
        info!("core validation produced {} result(s)", results.len());
        Ok(ValidationReport::new(results))
    }
}

struct Run<'a> {
    engine: &'a CoreEngine,
    store: &'a QuadStore,
}

impl Run<'_> {
    fn in_data(&self, quad: &Quad) -> bool {
        match &self.engine.data_graph {
            Some(graph) => &quad.graph_name == graph,
            None => quad.graph_name != GraphName::from(SHAPES_GRAPH.into_owned()),
        }
    }

    fn data_quads(
        &self,
        subject: Option<&Term>,
        predicate: NamedNodeRef<'_>,
        object: Option<&Term>,
    ) -> Vec<Quad> {
        self.store
            .quads(subject, Some(predicate), object, None)
            .into_iter()
            .filter(|q| self.in_data(q))
            .collect()
    }

    fn is_deactivated(&self, shape: &Term) -> bool {
        self.store
            .object(shape, SH.deactivated, None)
            .is_some_and(|t| term_value(&t) == "true")
    }

    /// Shapes that declare targets, in a stable order.
    fn node_shapes(&self) -> Vec<Term> {
        let mut shapes: Vec<Term> = [SH.target_class, SH.target_node]
            .into_iter()
            .flat_map(|p| self.store.quads(None, Some(p), None, None))
            .map(|q| Term::from(q.subject))
            .collect();
        shapes.sort_by_key(|t| t.to_string());
        shapes.dedup();
        shapes.retain(|s| !self.is_deactivated(s));
        shapes
    }

    fn focus_nodes(&self, shape: &Term) -> Vec<Term> {
        let mut nodes = self.store.objects(shape, SH.target_node, None);
        for class in self.store.objects(shape, SH.target_class, None) {
            for sub in self.subclasses(&class) {
                for quad in self.data_quads(None, rdf::TYPE, Some(&sub)) {
                    nodes.push(quad.subject.into());
                }
            }
        }
        dedup_terms(&mut nodes);
        nodes
    }

    /// `class` and every class declared `rdfs:subClassOf` it, transitively.
    fn subclasses(&self, class: &Term) -> Vec<Term> {
        let mut out = vec![class.clone()];
        let mut i = 0;
        while i < out.len() {
            for sub in self.store.subjects(rdfs::SUB_CLASS_OF, &out[i], None) {
                if !out.contains(&sub) {
                    out.push(sub);
                }
            }
            i += 1;
        }
        out
    }

    fn is_instance(&self, value: &Term, class: &NamedNode) -> bool {
        let classes = self.subclasses(&Term::from(class.clone()));
        self.data_quads(Some(value), rdf::TYPE, None)
            .iter()
            .any(|q| classes.contains(&q.object))
    }

    fn components(&self, shape: &Term) -> Result<Vec<Component>, String> {
        let store = self.store;
        let mut components = Vec::new();
        let flags = store
            .object(shape, SH.flags, None)
            .map(|f| term_value(&f))
            .unwrap_or_default();
        for quad in store.quads(Some(shape), None, None, None) {
            let p = quad.predicate.as_ref();
            let o = &quad.object;
            let component = if p == SH.min_count {
                Component::MinCount(parse_count(o, "sh:minCount")?)
            } else if p == SH.max_count {
                Component::MaxCount(parse_count(o, "sh:maxCount")?)
            } else if p == SH.datatype {
                Component::Datatype(named(o, "sh:datatype")?)
            } else if p == SH.class {
                Component::Class(named(o, "sh:class")?)
            } else if p == SH.node_kind {
                Component::NodeKind(
                    NodeKind::from_term(o).ok_or_else(|| format!("Unknown sh:nodeKind {}", o))?,
                )
            } else if p == SH.pattern {
                Component::Pattern(compile_pattern(&term_value(o), &flags)?)
            } else if p == SH.min_length {
                Component::MinLength(parse_count(o, "sh:minLength")?)
            } else if p == SH.max_length {
                Component::MaxLength(parse_count(o, "sh:maxLength")?)
            } else if p == SH.in_ {
                Component::In(store.list(o, None))
            } else if p == SH.has_value {
                Component::HasValue(o.clone())
            } else if p == SH.node {
                Component::Node(o.clone())
            } else if p == SH.or {
                Component::Or(store.list(o, None))
            } else if p == SH.xone {
                Component::Xone(store.list(o, None))
            } else if p == SH.and {
                Component::And(store.list(o, None))
            } else if p == SH.not {
                Component::Not(o.clone())
            } else {
                continue;
            };
            components.push(component);
        }
        Ok(components)
    }

    fn conforms(&self, shape: &Term, value: &Term, depth: usize) -> Result<bool, String> {
        let mut nested = Vec::new();
        self.validate_shape(shape, value, depth + 1, &mut nested)?;
        Ok(nested.is_empty())
    }

    fn validate_shape(
        &self,
        shape: &Term,
        focus: &Term,
        depth: usize,
        out: &mut Vec<ValidationResult>,
    ) -> Result<(), String> {
        if depth > self.engine.max_depth {
            warn!("stopping at depth {} while validating {} against {}", depth, focus, shape);
            return Ok(());
        }
        if self.is_deactivated(shape) {
            return Ok(());
        }
        let path = Path::from_shape(self.store, shape);
        let has_path = self.store.count(Some(shape), Some(SH.path), None, None) > 0;
        if has_path && path.is_none() {
            debug!("skipping {}: only predicate and inverse paths are supported", shape);
            return Ok(());
        }
        let mut value_nodes: Vec<Term> = match &path {
            Some(Path::Predicate(p)) => self
                .data_quads(Some(focus), p.as_ref(), None)
                .into_iter()
                .map(|q| q.object)
                .collect(),
            Some(Path::Inverse(p)) => self
                .data_quads(None, p.as_ref(), Some(focus))
                .into_iter()
                .map(|q| q.subject.into())
                .collect(),
            None => vec![focus.clone()],
        };
        // the same triple may sit in the data graph and in the values graph
        dedup_terms(&mut value_nodes);
        let ctx = Context {
            focus_node: focus.clone(),
            path,
            value_nodes,
        };

        let message = self.store.object(shape, SH.message, None).map(|m| term_value(&m));
        let severity = self
            .store
            .object(shape, SH.severity, None)
            .and_then(|s| Severity::from_term(&s))
            .unwrap_or_default();
        for component in self.components(shape)? {
            for (default_message, value) in self.check(&component, &ctx, depth)? {
                out.push(ValidationResult {
                    focus_node: ctx.focus_node.clone(),
                    path: ctx.path.clone(),
                    value,
                    message: message.clone().unwrap_or(default_message),
                    source_shape: shape.clone(),
                    source_constraint_component: component.iri().into_owned(),
                    severity,
                });
            }
        }

        for property in self.store.objects(shape, SH.property, None) {
            for value in &ctx.value_nodes {
                self.validate_shape(&property, value, depth + 1, out)?;
            }
        }
        Ok(())
    }

    /// Failures of `component` on `ctx`: a message and the offending value, if any.
    fn check(
        &self,
        component: &Component,
        ctx: &Context,
        depth: usize,
    ) -> Result<Vec<(String, Option<Term>)>, String> {
        let count = ctx.value_nodes.len();
        let mut failures = Vec::new();
        match component {
            Component::MinCount(min) => {
                if (count as u64) < *min {
                    failures.push((
                        format!("Value count ({}) does not meet minimum requirement: {}", count, min),
                        None,
                    ));
                }
                return Ok(failures);
            }
            Component::MaxCount(max) => {
                if (count as u64) > *max {
                    failures.push((
                        format!("Value count ({}) does not meet maximum requirement: {}", count, max),
                        None,
                    ));
                }
                return Ok(failures);
            }
            Component::HasValue(expected) => {
                if !ctx.value_nodes.contains(expected) {
                    failures.push((format!("Missing expected value {}", expected), None));
                }
                return Ok(failures);
            }
            _ => {}
        }

        for value in &ctx.value_nodes {
            let failure = match component {
                Component::Datatype(dt) => match value {
                    Term::Literal(l)
                        if l.datatype() == dt.as_ref()
                            && check_lexical_form(l.value(), dt.as_ref()).is_ok() =>
                    {
                        None
                    }
                    _ => Some(format!("Value {} does not have datatype {}", value, dt)),
                },
                Component::Class(class) => {
                    let ok = !matches!(value, Term::Literal(_)) && self.is_instance(value, class);
                    (!ok).then(|| format!("Value {} is not an instance of {}", value, class))
                }
                Component::NodeKind(kind) => (!kind.matches(value.as_ref()))
                    .then(|| format!("Value {} does not have node kind {:?}", value, kind)),
                Component::Pattern(regex) => {
                    let ok = !matches!(value, Term::BlankNode(_))
                        && regex.is_match(&term_value(value));
                    (!ok).then(|| {
                        format!("Value {} does not match pattern \"{}\"", value, regex.as_str())
                    })
                }
                Component::MinLength(min) => {
                    let ok = !matches!(value, Term::BlankNode(_))
                        && term_value(value).chars().count() as u64 >= *min;
                    (!ok).then(|| format!("Value {} is shorter than {} characters", value, min))
                }
                Component::MaxLength(max) => {
                    let ok = !matches!(value, Term::BlankNode(_))
                        && term_value(value).chars().count() as u64 <= *max;
                    (!ok).then(|| format!("Value {} is longer than {} characters", value, max))
                }
                Component::In(allowed) => (!allowed.contains(value))
                    .then(|| format!("Value {} is not one of the allowed values", value)),
                Component::Node(shape) => (!self.conforms(shape, value, depth)?)
                    .then(|| format!("Value {} does not conform to sh:node shape {}", value, shape)),
                Component::Or(shapes) => {
                    let mut any = false;
                    for shape in shapes {
                        if self.conforms(shape, value, depth)? {
                            any = true;
                            break;
                        }
                    }
                    (!any).then(|| format!("Value {} does not conform to any sh:or shape", value))
                }
                Component::Xone(shapes) => {
                    let mut matching = 0;
                    for shape in shapes {
                        if self.conforms(shape, value, depth)? {
                            matching += 1;
                        }
                    }
                    (matching != 1).then(|| {
                        format!(
                            "Value {} conforms to {} sh:xone shapes, expected exactly one",
                            value, matching
                        )
                    })
                }
                Component::And(shapes) => {
                    let mut all = true;
                    for shape in shapes {
                        if !self.conforms(shape, value, depth)? {
                            all = false;
                            break;
                        }
                    }
                    (!all).then(|| format!("Value {} does not conform to every sh:and shape", value))
                }
                Component::Not(shape) => self
                    .conforms(shape, value, depth)?
                    .then(|| format!("Value {} conforms to sh:not shape {}", value, shape)),
                Component::MinCount(_) | Component::MaxCount(_) | Component::HasValue(_) => None,
            };
            if let Some(message) = failure {
                failures.push((message, Some(value.clone())));
            }
        }
        Ok(failures)
    }
}

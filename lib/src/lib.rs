//! An editable form model generated from SHACL shapes.
#![deny(clippy::all)]

// Publicly visible items
pub mod alternatives;
pub mod context;
pub mod group;
pub mod node;
pub mod property;
pub mod report;
pub mod resolver;
pub mod serialize;
pub mod store;
pub mod template;
pub mod types;
pub mod validate;

pub use alternatives::AlternativeSet;
pub use context::{Collapse, FormConfig, FormContext};
pub use node::{FormNode, NodeItem};
pub use property::{FormProperty, PropertyInstance, ValueSlot};
pub use report::{ValidationReport, ValidationResult};
pub use resolver::NodeMatchPolicy;
pub use validate::{CoreEngine, ValidationEngine};

// Helpers shared by the modules above.
pub mod canonicalization;
pub(crate) mod debounce;
pub mod labels;
pub mod named_nodes;

use crate::canonicalization::are_isomorphic;
use crate::debounce::Debouncer;
use crate::labels::find_label;
use crate::named_nodes::{DCTERMS_CONFORMS_TO, SH};
use crate::serialize::serialize_graph;
use crate::store::{as_subject, DATA_GRAPH, SHAPES_GRAPH};
use crate::types::Path;
use log::{debug, error, info, warn};
use oxigraph::io::RdfFormat;
use oxigraph::model::vocab::rdf;
use oxigraph::model::{Graph, GraphName, NamedNode, NamedNodeRef, NamedOrBlankNode, Quad, Term};
use std::error::Error;
use std::path::Path as FsPath;
use std::time::Instant;
use url::Url;

/// Notification sent to subscribers of a [`ShaclForm`].
#[derive(Debug, Clone, PartialEq)]
pub enum FormEvent {
    /// The form content changed. In edit mode the form was validated right
    /// after the change and `conforms` carries the outcome.
    Changed { conforms: Option<bool> },
    /// The form was rebuilt from the store.
    Initialized { nodes: usize },
}

type Subscriber = Box<dyn FnMut(&FormEvent)>;

/// A form over the shapes and data held in one [`QuadStore`](store::QuadStore).
///
/// This owns the store, the per-form settings and the rendered root nodes.
/// Shapes and data are loaded first, then [`ShaclForm::initialize`] builds one
/// node per data subject it can find a shape for.
pub struct ShaclForm {
    ctx: FormContext,
    nodes: Vec<FormNode>,
    engine: Box<dyn ValidationEngine>,
    report: Option<ValidationReport>,
    subscribers: Vec<Subscriber>,
    debouncer: Debouncer,
    /// Form RDF right after the last initialization.
    initial: Graph,
}

impl ShaclForm {
    /// Creates an empty form validating with [`CoreEngine`].
    pub fn new(config: FormConfig) -> Self {
        ShaclForm {
            ctx: FormContext::new(Default::default(), config),
            nodes: Vec::new(),
            engine: Box::new(CoreEngine::new()),
            report: None,
            subscribers: Vec::new(),
            debouncer: Debouncer::new(),
            initial: Graph::new(),
        }
    }

    /// Creates a form from Turtle files.
    ///
    /// # Arguments
    ///
    /// * `shapes_path` - The file holding the SHACL shapes.
    /// * `data_path` - An optional file with existing data to edit.
    /// * `config` - Form settings.
    pub fn from_files(
        shapes_path: &FsPath,
        data_path: Option<&FsPath>,
        config: FormConfig,
    ) -> Result<Self, Box<dyn Error>> {
        let mut form = ShaclForm::new(config);
        let shapes = std::fs::read_to_string(shapes_path)
            .map_err(|e| format!("Error reading {}: {}", shapes_path.display(), e))?;
        form.load_shapes(&shapes, Some(&file_base_iri(shapes_path)))?;
        if let Some(data_path) = data_path {
            let data = std::fs::read_to_string(data_path)
                .map_err(|e| format!("Error reading {}: {}", data_path.display(), e))?;
            form.load_data(&data, Some(&file_base_iri(data_path)))?;
        }
        Ok(form)
    }

    pub fn with_engine(mut self, engine: Box<dyn ValidationEngine>) -> Self {
        self.engine = engine;
        self
    }

    pub fn context(&self) -> &FormContext {
        &self.ctx
    }

    pub fn config(&self) -> &FormConfig {
        &self.ctx.config
    }

    pub fn config_mut(&mut self) -> &mut FormConfig {
        &mut self.ctx.config
    }

    pub fn nodes(&self) -> &[FormNode] {
        &self.nodes
    }

    /// Report of the last validation run.
    pub fn report(&self) -> Option<&ValidationReport> {
        self.report.as_ref()
    }

    pub fn load_shapes(&mut self, turtle: &str, base_iri: Option<&str>) -> Result<usize, Box<dyn Error>> {
        let added = self.ctx.store.load_turtle(turtle, SHAPES_GRAPH, base_iri)?;
        info!("Loaded {} shape triples", added);
        Ok(added)
    }

    pub fn load_data(&mut self, turtle: &str, base_iri: Option<&str>) -> Result<usize, Box<dyn Error>> {
        let added = self.ctx.store.load_turtle(turtle, DATA_GRAPH, base_iri)?;
        info!("Loaded {} data triples", added);
        Ok(added)
    }

    pub fn subscribe(&mut self, subscriber: impl FnMut(&FormEvent) + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    fn emit(&mut self, event: FormEvent) {
        for subscriber in self.subscribers.iter_mut() {
            subscriber(&event);
        }
    }

    /// Node shapes declared in the shapes graph, sorted by IRI.
    fn node_shapes(&self) -> Vec<Term> {
        let node_shape = Term::from(SH.node_shape.into_owned());
        let mut shapes = self.ctx.store.subjects(rdf::TYPE, &node_shape, Some(&self.ctx.shapes_graph()));
        shapes.sort_by_key(|t| t.to_string());
        shapes.dedup();
        shapes
    }

    fn is_node_shape(&self, term: &Term) -> bool {
        let node_shape = Term::from(SH.node_shape.into_owned());
        self.ctx
            .store
            .count(Some(term), Some(rdf::TYPE), Some(&node_shape), None)
            > 0
    }

    /// Node shapes a new root node can be created from: those with a `sh:targetClass`,
    /// with their labels.
    pub fn available_shapes(&self) -> Vec<(Term, String)> {
        self.node_shapes()
            .into_iter()
            .filter(|s| self.ctx.store.object(s, SH.target_class, None).is_some())
            .map(|s| {
                let quads = self.ctx.store.quads(Some(&s), None, None, None);
                let label = find_label(&quads, &self.ctx.config.languages)
                    .unwrap_or_else(|| labels::local_name(&labels::term_value(&s)).to_string());
                (s, label)
            })
            .collect()
    }

    /// The node shape for `subject`: a type or `dcterms:conformsTo` that is
    /// itself a node shape wins; otherwise the first shape targeting one of its types.
    fn shape_for_subject(&self, subject: &Term) -> Option<Term> {
        let store = &self.ctx.store;
        let mut types = store.objects(subject, rdf::TYPE, None);
        types.extend(store.objects(subject, DCTERMS_CONFORMS_TO, None));
        if types.is_empty() {
            warn!(
                "value subject {} has neither {} nor {} statement",
                subject,
                rdf::TYPE,
                DCTERMS_CONFORMS_TO
            );
            return None;
        }
        if let Some(shape) = types.iter().find(|t| self.is_node_shape(t)) {
            return Some(shape.clone());
        }
        let shapes: Vec<Term> = self
            .node_shapes()
            .into_iter()
            .filter(|shape| {
                store
                    .objects(shape, SH.target_class, None)
                    .iter()
                    .any(|class| types.contains(class))
            })
            .collect();
        if shapes.len() > 1 {
            warn!(
                "value subject {} has multiple shape definitions, choosing the first found ({})",
                subject, shapes[0]
            );
        }
        if shapes.is_empty() {
            error!("value subject {} has no shape definition in the shapes graph", subject);
        }
        shapes.into_iter().next()
    }

    /// Rebuilds every root node from the store.
    ///
    /// * with `values_subject`, one node for that subject;
    /// * otherwise, when data is loaded, one node per instance of each node
    ///   shape's `sh:targetClass`, each data subject at most once;
    /// * if that produced nothing, an empty node for `shape_subject`, or for the
    ///   first node shape when none is configured.
    ///
    /// In edit mode the form is validated afterwards.
    pub fn initialize(&mut self) -> Result<(), Box<dyn Error>> {
        self.debouncer.cancel();
        self.nodes.clear();
        self.report = None;
        let config = self.ctx.config.clone();

        if let Some(subject) = &config.values_subject {
            let focus = Term::from(subject.clone());
            let shape = match &config.shape_subject {
                Some(shape) => Some(Term::from(shape.clone())),
                None => self.shape_for_subject(&focus),
            };
            if let Some(shape) = shape {
                let node = FormNode::build(&self.ctx, &shape, Some(subject.clone().into()));
                self.nodes.push(node);
            }
        } else if self.has_data() {
            let graphs = self.data_graphs();
            for shape in self.node_shapes() {
                for class in self.ctx.store.objects(&shape, SH.target_class, None) {
                    let instances = graphs
                        .iter()
                        .flat_map(|g| self.ctx.store.subjects(rdf::TYPE, &class, Some(g)));
                    for instance in instances.collect::<Vec<_>>() {
                        let Some(subject) = as_subject(&instance) else {
                            continue;
                        };
                        if self.nodes.iter().any(|n| n.contains_node(&subject)) {
                            continue;
                        }
                        debug!("rendering {} with {}", subject, shape);
                        let node = FormNode::build(&self.ctx, &shape, Some(subject));
                        self.nodes.push(node);
                    }
                }
            }
        }

        if self.nodes.is_empty() {
            if let Some(shape) = self.root_shape() {
                self.nodes.push(FormNode::build(&self.ctx, &shape, None));
            }
        }

        self.initial = self.to_rdf();
        let count = self.nodes.len();
        info!("form initialized with {} node(s)", count);
        self.emit(FormEvent::Initialized { nodes: count });
        if self.ctx.config.edit_mode {
            self.validate(true);
        }
        Ok(())
    }

    /// The loaded data graph and the graph form values are written to.
    fn data_graphs(&self) -> Vec<GraphName> {
        let mut graphs = vec![self.ctx.data_graph()];
        let values = self.ctx.values_graph();
        if !graphs.contains(&values) {
            graphs.push(values);
        }
        graphs
    }

    fn has_data(&self) -> bool {
        self.data_graphs()
            .iter()
            .any(|g| self.ctx.store.count(None, None, None, Some(g)) > 0)
    }

    fn root_shape(&self) -> Option<Term> {
        if let Some(shape) = &self.ctx.config.shape_subject {
            let shape = Term::from(shape.clone());
            if !self.is_node_shape(&shape) {
                warn!("shapes graph does not contain requested root shape {}", shape);
                return None;
            }
            return Some(shape);
        }
        let shapes = self.node_shapes();
        match shapes.len() {
            0 => {
                warn!("shapes graph does not contain any root shapes");
                None
            }
            n => {
                if n > 1 {
                    warn!(
                        "shapes graph contains {} root shapes, choosing first found which is {}",
                        n, shapes[0]
                    );
                }
                shapes.into_iter().next()
            }
        }
    }

    /// Adds an empty root node for `shape`.
    pub fn add_node(&mut self, shape: &NamedNode) -> Result<&FormNode, Box<dyn Error>> {
        let shape = Term::from(shape.clone());
        if !self.is_node_shape(&shape) {
            return Err(format!("{} is not a sh:NodeShape", shape).into());
        }
        let node = FormNode::build(&self.ctx, &shape, None);
        self.nodes.push(node);
        self.changed();
        let last = self.nodes.len() - 1;
        Ok(&self.nodes[last])
    }

    pub fn remove_node(&mut self, index: usize) -> Result<FormNode, Box<dyn Error>> {
        if index >= self.nodes.len() {
            return Err(format!("form has no node at position {}", index).into());
        }
        let node = self.nodes.remove(index);
        self.changed();
        Ok(node)
    }

    /// The RDF of every root node.
    pub fn to_rdf(&self) -> Graph {
        let mut graph = Graph::new();
        for node in &self.nodes {
            node.to_rdf(&mut graph);
        }
        graph
    }

    pub fn serialize(&self, format: RdfFormat) -> Result<String, Box<dyn Error>> {
        Ok(serialize_graph(&self.to_rdf(), format, &self.ctx.config.prefixes)?)
    }

    /// True if the form RDF differs from what it was right after initialization.
    pub fn has_changes(&self) -> bool {
        !are_isomorphic(&self.initial, &self.to_rdf())
    }

    /// Validates with the form's own engine; see [`ShaclForm::validate_with`].
    pub fn validate(&mut self, ignore_empty: bool) -> ValidationReport {
        let engine = std::mem::replace(&mut self.engine, Box::new(CoreEngine::new()));
        let report = self.validate_with(engine.as_ref(), ignore_empty);
        self.engine = engine;
        report
    }

    /// Writes the form values into the values graph and validates the store.
    ///
    /// The values graph is cleared first. Data-graph triples along the paths
    /// the form renders are dropped, since the form now holds those values,
    /// and every root node is registered through `sh:targetNode`. An engine
    /// error is logged and turned into a non-conforming report. With
    /// `ignore_empty`, missing-value (`sh:minCount`) results are left out.
    pub fn validate_with(&mut self, engine: &dyn ValidationEngine, ignore_empty: bool) -> ValidationReport {
        let values_graph = self.ctx.values_graph();
        self.ctx.store.clear_graph(&values_graph);
        let mut superseded = Vec::new();
        for node in &self.nodes {
            collect_rendered_quads(&self.ctx, node, &mut superseded);
        }
        for quad in &superseded {
            self.ctx.store.remove(quad);
        }

        for triple in self.to_rdf().iter() {
            let quad = triple.into_owned().in_graph(values_graph.clone());
            self.ctx.store.insert(&quad);
        }
        for node in &self.nodes {
            if let Some(shape) = as_subject(node.shape()) {
                self.ctx.store.insert(&Quad::new(
                    shape,
                    SH.target_node,
                    Term::from(node.node_id().clone()),
                    values_graph.clone(),
                ));
            }
        }

        let mut report = match engine.validate(&self.ctx.store) {
            Ok(report) => report,
            Err(e) => {
                error!("validation failed: {}", e);
                ValidationReport::failed(e)
            }
        };
        if ignore_empty {
            report.retain(|r| !r.is_min_count());
        }
        debug!("form conforms: {}", report.conforms());
        self.report = Some(report.clone());
        report
    }

    fn changed(&mut self) {
        let conforms = if self.ctx.config.edit_mode {
            Some(self.validate(true).conforms())
        } else {
            None
        };
        self.emit(FormEvent::Changed { conforms });
    }

    /// Runs `edit` against the rendered nodes, then emits one
    /// [`FormEvent::Changed`] (validating first in edit mode).
    pub fn edit<R>(
        &mut self,
        edit: impl FnOnce(&FormContext, &mut [FormNode]) -> Result<R, String>,
    ) -> Result<R, Box<dyn Error>> {
        let out = edit(&self.ctx, &mut self.nodes)?;
        self.changed();
        Ok(out)
    }

    /// Sets the `instance`-th value of the property with path `predicate` on
    /// root node `node` from user text.
    pub fn set_value(
        &mut self,
        node: usize,
        predicate: NamedNodeRef<'_>,
        instance: usize,
        text: &str,
    ) -> Result<(), Box<dyn Error>> {
        self.edit(|_, nodes| {
            let slot = value_slot(nodes, node, predicate, instance)?;
            slot.set_text(text)
        })
    }

    /// Selects `branch` of the `alternative`-th node-level disjunction of root node `node`.
    /// Returns whether the selection changed; only a change emits an event.
    pub fn select_alternative(
        &mut self,
        node: usize,
        alternative: usize,
        branch: usize,
    ) -> Result<bool, Box<dyn Error>> {
        let set = self
            .nodes
            .get_mut(node)
            .ok_or_else(|| format!("form has no node at position {}", node))?
            .alternatives_mut(alternative)
            .ok_or_else(|| format!("node {} has no alternative {}", node, alternative))?;
        let changed = set.select(&self.ctx, branch)?;
        if changed {
            self.changed();
        }
        Ok(changed)
    }

    /// Selects `branch` for a property-level disjunction value.
    pub fn select_property_alternative(
        &mut self,
        node: usize,
        predicate: NamedNodeRef<'_>,
        instance: usize,
        branch: usize,
    ) -> Result<bool, Box<dyn Error>> {
        let property = property_mut(&mut self.nodes, node, predicate)?;
        let set = property
            .instance_mut(instance)
            .and_then(|i| i.as_alternatives_mut())
            .ok_or_else(|| format!("{} value {} is not a choice", predicate, instance))?;
        let changed = set.select(&self.ctx, branch)?;
        if changed {
            self.changed();
        }
        Ok(changed)
    }

    pub fn add_instance(&mut self, node: usize, predicate: NamedNodeRef<'_>) -> Result<(), Box<dyn Error>> {
        self.edit(|ctx, nodes| {
            let property = property_mut(nodes, node, predicate)?;
            property.add_instance(ctx).map(|_| ())
        })
    }

    pub fn remove_instance(
        &mut self,
        node: usize,
        predicate: NamedNodeRef<'_>,
        instance: usize,
    ) -> Result<(), Box<dyn Error>> {
        self.edit(|_, nodes| {
            let property = property_mut(nodes, node, predicate)?;
            property.remove_instance(instance).map(|_| ())
        })
    }

    /// Deletes `subject`'s statements from the data graph, following objects
    /// that are themselves subjects. Values that validation already moved into
    /// the values graph are deleted there too.
    pub fn remove_from_data_graph(&mut self, subject: &NamedOrBlankNode) -> usize {
        let graphs = self.data_graphs();
        let mut pending = vec![Term::from(subject.clone())];
        let mut visited: Vec<Term> = Vec::new();
        let mut removed = 0;
        while let Some(current) = pending.pop() {
            if visited.contains(&current) {
                continue;
            }
            for graph in &graphs {
                for quad in self.ctx.store.quads(Some(&current), None, None, Some(graph)) {
                    if self.ctx.store.remove(&quad) {
                        removed += 1;
                    }
                    if as_subject(&quad.object).is_some() {
                        pending.push(quad.object);
                    }
                }
            }
            visited.push(current);
        }
        removed
    }

    /// Call when a setting changed: re-initialization is scheduled after the
    /// configured debounce delay, replacing any pending one.
    pub fn attribute_changed(&mut self, now: Instant) {
        self.debouncer.schedule(now, self.ctx.config.debounce);
    }

    /// Re-initializes once the debounce delay has passed. Returns whether it ran.
    pub fn tick(&mut self, now: Instant) -> Result<bool, Box<dyn Error>> {
        if !self.debouncer.poll(now) {
            return Ok(false);
        }
        self.initialize()?;
        Ok(true)
    }

    /// The loading text while a re-initialization is pending.
    pub fn status(&self) -> Option<&str> {
        self.debouncer
            .is_pending()
            .then_some(self.ctx.config.loading.as_str())
    }
}

/// Data-graph quads that `node` (and its nested nodes) render along their paths.
fn collect_rendered_quads(ctx: &FormContext, node: &FormNode, out: &mut Vec<Quad>) {
    let data_graph = ctx.data_graph();
    let focus = Term::from(node.node_id().clone());
    for property in node.properties() {
        match &property.template().path {
            Some(Path::Predicate(p)) => out.extend(ctx.store.quads(
                Some(&focus),
                Some(p.as_ref()),
                None,
                Some(&data_graph),
            )),
            Some(Path::Inverse(p)) => out.extend(ctx.store.quads(
                None,
                Some(p.as_ref()),
                Some(&focus),
                Some(&data_graph),
            )),
            None => {}
        }
        for instance in property.instances() {
            let nested = match instance {
                PropertyInstance::Node(nested) => Some(nested.as_ref()),
                PropertyInstance::Alternatives(set) => set.instance().and_then(|i| i.as_node()),
                PropertyInstance::Value(_) => None,
            };
            if let Some(nested) = nested {
                collect_rendered_quads(ctx, nested, out);
            }
        }
    }
}

fn property_mut<'a>(
    nodes: &'a mut [FormNode],
    node: usize,
    predicate: NamedNodeRef<'_>,
) -> Result<&'a mut FormProperty, String> {
    nodes
        .get_mut(node)
        .ok_or_else(|| format!("form has no node at position {}", node))?
        .property_mut(predicate)
        .ok_or_else(|| format!("node {} has no property {}", node, predicate))
}

fn value_slot<'a>(
    nodes: &'a mut [FormNode],
    node: usize,
    predicate: NamedNodeRef<'_>,
    instance: usize,
) -> Result<&'a mut ValueSlot, String> {
    let instance_ref = property_mut(nodes, node, predicate)?
        .instance_mut(instance)
        .ok_or_else(|| format!("{} has no value at position {}", predicate, instance))?;
    match instance_ref {
        PropertyInstance::Value(slot) => Ok(slot),
        PropertyInstance::Alternatives(set) => set
            .instance_mut()
            .and_then(|i| i.as_value_mut())
            .ok_or_else(|| format!("{} value {} has no selected editor", predicate, instance)),
        PropertyInstance::Node(_) => Err(format!("{} value {} is a nested node", predicate, instance)),
    }
}

fn file_base_iri(path: &FsPath) -> String {
    let absolute = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    Url::from_file_path(&absolute)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| format!("file://{}", absolute.display()))
}

impl std::fmt::Debug for ShaclForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaclForm")
            .field("config", &self.ctx.config)
            .field("nodes", &self.nodes.len())
            .field("report", &self.report)
            .finish()
    }
}

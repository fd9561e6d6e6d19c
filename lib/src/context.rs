use crate::resolver::NodeMatchPolicy;
use crate::store::{QuadStore, DATA_GRAPH, SHAPES_GRAPH};
use oxigraph::model::{GraphName, NamedNode};
use std::collections::BTreeMap;
use std::time::Duration;

/// How `sh:group` sections are presented.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Collapse {
    /// Groups are plain headed sections.
    #[default]
    Never,
    /// Groups are collapsible and start closed.
    Closed,
    /// Groups are collapsible and start open.
    Open,
}

/// Settings of one form instance.
#[derive(Debug, Clone)]
pub struct FormConfig {
    /// Root node shape to render when no data selects one.
    pub shape_subject: Option<NamedNode>,
    /// Data subject to load into the form.
    pub values_subject: Option<NamedNode>,
    /// Graph that form values are written back to before validation; the
    /// default graph when unset.
    pub values_graph: Option<NamedNode>,
    /// Preferred label languages, most preferred first.
    pub languages: Vec<String>,
    /// Prefix name to namespace IRI, used to shorten labels and in serialization.
    pub prefixes: BTreeMap<String, String>,
    pub edit_mode: bool,
    /// Text shown while the form is (re)initializing.
    pub loading: String,
    pub collapse: Collapse,
    /// Quiet period before a scheduled re-initialization runs.
    pub debounce: Duration,
    /// Tie-break for node-level disjunctions matching more than one branch.
    pub node_match: NodeMatchPolicy,
}

impl Default for FormConfig {
    fn default() -> Self {
        let mut prefixes = BTreeMap::new();
        for (name, ns) in [
            ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
            ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
            ("xsd", "http://www.w3.org/2001/XMLSchema#"),
            ("sh", "http://www.w3.org/ns/shacl#"),
        ] {
            prefixes.insert(name.to_string(), ns.to_string());
        }
        FormConfig {
            shape_subject: None,
            values_subject: None,
            values_graph: None,
            languages: Vec::new(),
            prefixes,
            edit_mode: true,
            loading: "Loading...".to_string(),
            collapse: Collapse::default(),
            debounce: Duration::from_millis(200),
            node_match: NodeMatchPolicy::default(),
        }
    }
}

impl FormConfig {
    pub fn with_shape_subject(mut self, shape: NamedNode) -> Self {
        self.shape_subject = Some(shape);
        self
    }

    pub fn with_values_subject(mut self, subject: NamedNode) -> Self {
        self.values_subject = Some(subject);
        self
    }

    pub fn with_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = languages.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_prefix(mut self, name: impl Into<String>, namespace: impl Into<String>) -> Self {
        self.prefixes.insert(name.into(), namespace.into());
        self
    }

    pub fn with_values_graph(mut self, graph: NamedNode) -> Self {
        self.values_graph = Some(graph);
        self
    }

    pub fn with_edit_mode(mut self, edit_mode: bool) -> Self {
        self.edit_mode = edit_mode;
        self
    }

    pub fn with_collapse(mut self, collapse: Collapse) -> Self {
        self.collapse = collapse;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_node_match(mut self, policy: NodeMatchPolicy) -> Self {
        self.node_match = policy;
        self
    }
}

/// Everything the builder and the resolver read: the store and the per-form settings.
#[derive(Debug, Default, Clone)]
pub struct FormContext {
    pub store: QuadStore,
    pub config: FormConfig,
}

impl FormContext {
    pub fn new(store: QuadStore, config: FormConfig) -> Self {
        FormContext { store, config }
    }

    pub fn shapes_graph(&self) -> GraphName {
        SHAPES_GRAPH.into_owned().into()
    }

    pub fn data_graph(&self) -> GraphName {
        DATA_GRAPH.into_owned().into()
    }

    pub fn values_graph(&self) -> GraphName {
        match &self.config.values_graph {
            Some(graph) => graph.clone().into(),
            None => GraphName::DefaultGraph,
        }
    }
}

//! In-memory quad store holding the shapes graph, the data graph and the
//! values written back by the form.
use oxigraph::io::{RdfFormat, RdfParser};
use oxigraph::model::vocab::rdf;
use oxigraph::model::{
    Dataset, GraphName, NamedNode, NamedNodeRef, NamedOrBlankNode, Quad, QuadRef, Term,
};

/// Named graph that shapes are loaded into.
pub const SHAPES_GRAPH: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("urn:shacl-form:shapes-graph");
/// Named graph that existing data is loaded into. Form values go to the
/// configured values graph instead.
pub const DATA_GRAPH: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("urn:shacl-form:data-graph");

/// Converts a term into a subject, if it can be one.
pub fn as_subject(term: &Term) -> Option<NamedOrBlankNode> {
    match term {
        Term::NamedNode(n) => Some(n.clone().into()),
        Term::BlankNode(b) => Some(b.clone().into()),
        _ => None,
    }
}

#[derive(Debug, Default, Clone)]
pub struct QuadStore {
    dataset: Dataset,
}

impl QuadStore {
    pub fn new() -> Self {
        QuadStore {
            dataset: Dataset::new(),
        }
    }

    /// Parses `turtle` into `graph`, returning the number of new quads.
    ///
    /// Blank node labels are renamed on load so that shapes and data files using
    /// the same `_:b0` labels do not collide.
    pub fn load_turtle(
        &mut self,
        turtle: &str,
        graph: NamedNodeRef<'_>,
        base_iri: Option<&str>,
    ) -> Result<usize, String> {
        let mut parser = RdfParser::from_format(RdfFormat::Turtle)
            .with_default_graph(graph.into_owned())
            .rename_blank_nodes();
        if let Some(base) = base_iri {
            parser = parser
                .with_base_iri(base)
                .map_err(|e| format!("Invalid base IRI <{}>: {}", base, e))?;
        }
        let mut added = 0;
        for quad in parser.for_reader(turtle.as_bytes()) {
            let quad = quad.map_err(|e| format!("Error parsing turtle into <{}>: {}", graph, e))?;
            if self.dataset.insert(&quad) {
                added += 1;
            }
        }
        Ok(added)
    }

    pub fn insert(&mut self, quad: &Quad) -> bool {
        self.dataset.insert(quad)
    }

    pub fn remove(&mut self, quad: &Quad) -> bool {
        self.dataset.remove(quad)
    }

    /// Removes every quad of `graph`.
    pub fn clear_graph(&mut self, graph: &GraphName) -> usize {
        let doomed = self.quads(None, None, None, Some(graph));
        for quad in &doomed {
            self.dataset.remove(quad);
        }
        doomed.len()
    }

    pub fn len(&self) -> usize {
        self.dataset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// All quads matching the pattern. `None` is a wildcard.
    pub fn quads(
        &self,
        subject: Option<&Term>,
        predicate: Option<NamedNodeRef<'_>>,
        object: Option<&Term>,
        graph: Option<&GraphName>,
    ) -> Vec<Quad> {
        let matches = |q: &QuadRef<'_>| {
            predicate.is_none_or(|p| q.predicate == p)
                && object.is_none_or(|o| q.object == o.as_ref())
                && graph.is_none_or(|g| q.graph_name == g.as_ref())
        };
        match subject {
            Some(term) => {
                // literals never appear in subject position
                let Some(s) = as_subject(term) else {
                    return Vec::new();
                };
                self.dataset
                    .quads_for_subject(s.as_ref())
                    .filter(|q| matches(q))
                    .map(QuadRef::into_owned)
                    .collect()
            }
            None => self
                .dataset
                .iter()
                .filter(|q| matches(q))
                .map(QuadRef::into_owned)
                .collect(),
        }
    }

    pub fn objects(
        &self,
        subject: &Term,
        predicate: NamedNodeRef<'_>,
        graph: Option<&GraphName>,
    ) -> Vec<Term> {
        self.quads(Some(subject), Some(predicate), None, graph)
            .into_iter()
            .map(|q| q.object)
            .collect()
    }

    pub fn object(
        &self,
        subject: &Term,
        predicate: NamedNodeRef<'_>,
        graph: Option<&GraphName>,
    ) -> Option<Term> {
        self.objects(subject, predicate, graph).into_iter().next()
    }

    pub fn subjects(
        &self,
        predicate: NamedNodeRef<'_>,
        object: &Term,
        graph: Option<&GraphName>,
    ) -> Vec<Term> {
        self.quads(None, Some(predicate), Some(object), graph)
            .into_iter()
            .map(|q| q.subject.into())
            .collect()
    }

    pub fn count(
        &self,
        subject: Option<&Term>,
        predicate: Option<NamedNodeRef<'_>>,
        object: Option<&Term>,
        graph: Option<&GraphName>,
    ) -> usize {
        self.quads(subject, predicate, object, graph).len()
    }

    /// Reads an RDF collection starting at `head`. Stops at `rdf:nil`, at a
    /// missing `rdf:rest`, or when a cell is visited twice.
    pub fn list(&self, head: &Term, graph: Option<&GraphName>) -> Vec<Term> {
        let nil = Term::from(rdf::NIL.into_owned());
        let mut items = Vec::new();
        let mut seen: Vec<Term> = Vec::new();
        let mut current = head.clone();
        while current != nil && !seen.contains(&current) {
            if let Some(item) = self.object(&current, rdf::FIRST, graph) {
                items.push(item);
            }
            seen.push(current.clone());
            match self.object(&current, rdf::REST, graph) {
                Some(next) => current = next,
                None => break,
            }
        }
        items
    }

    /// Objects of `rdf:type` for `subject`, across all graphs.
    pub fn types(&self, subject: &Term) -> Vec<Term> {
        self.objects(subject, rdf::TYPE, None)
    }

    pub fn is_instance_of(&self, subject: &Term, class: &NamedNode) -> bool {
        let class = Term::from(class.clone());
        self.count(Some(subject), Some(rdf::TYPE), Some(&class), None) > 0
    }
}

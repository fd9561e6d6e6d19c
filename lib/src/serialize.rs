//! Writes the values held by a form tree back out as RDF.
use crate::node::FormNode;
use crate::property::PropertyInstance;
use crate::types::Path;
use log::debug;
use oxigraph::io::{RdfFormat, RdfSerializer};
use oxigraph::model::vocab::rdf;
use oxigraph::model::{Graph, NamedOrBlankNode, Term, Triple};
use std::collections::BTreeMap;

impl FormNode {
    /// Adds this node's triples to `graph`: `rdf:type` for the shape's
    /// `sh:targetClass`, then every non-empty value along its property path.
    /// Nested nodes are linked and written recursively.
    pub fn to_rdf(&self, graph: &mut Graph) {
        if let Some(class) = self.target_class() {
            graph.insert(&Triple::new(self.node_id().clone(), rdf::TYPE, class.clone()));
        }
        for property in self.properties() {
            let Some(path) = &property.template().path else {
                continue;
            };
            for instance in property.instances() {
                write_instance(self.node_id(), path, instance, graph);
            }
        }
    }
}

fn write_instance(
    focus: &NamedOrBlankNode,
    path: &Path,
    instance: &PropertyInstance,
    graph: &mut Graph,
) {
    match instance {
        PropertyInstance::Value(slot) => {
            if let Some(value) = slot.value() {
                link(focus, path, value, graph);
            }
        }
        PropertyInstance::Node(node) => {
            let mut nested = Graph::new();
            node.to_rdf(&mut nested);
            let is_iri = matches!(node.node_id(), NamedOrBlankNode::NamedNode(_));
            if nested.is_empty() && !is_iri {
                debug!("skipping empty nested node {}", node.node_id());
                return;
            }
            link(focus, path, &Term::from(node.node_id().clone()), graph);
            graph.extend(nested.iter());
        }
        PropertyInstance::Alternatives(set) => {
            if let Some(value) = set.unresolved() {
                link(focus, path, value, graph);
            } else if let Some(inner) = set.instance() {
                write_instance(focus, path, inner, graph);
            }
        }
    }
}

fn link(focus: &NamedOrBlankNode, path: &Path, value: &Term, graph: &mut Graph) {
    match path.triple(focus, value) {
        Some(triple) => {
            graph.insert(&triple);
        }
        None => debug!("cannot write {} along {} from {}", value, path, focus),
    }
}

/// Serializes `graph` into `format`, declaring `prefixes` where the format supports them.
pub fn serialize_graph(
    graph: &Graph,
    format: RdfFormat,
    prefixes: &BTreeMap<String, String>,
) -> Result<String, String> {
    let mut serializer = RdfSerializer::from_format(format);
    for (name, namespace) in prefixes {
        serializer = serializer
            .with_prefix(name.as_str(), namespace.as_str())
            .map_err(|e| format!("Invalid prefix {}: <{}>: {}", name, namespace, e))?;
    }
    let mut writer = serializer.for_writer(Vec::new());
    for triple in graph.iter() {
        writer
            .serialize_triple(triple)
            .map_err(|e| format!("Error serializing {}: {}", triple, e))?;
    }
    let bytes = writer
        .finish()
        .map_err(|e| format!("Error finishing {} output: {}", format, e))?;
    String::from_utf8(bytes).map_err(|e| format!("Serializer produced invalid UTF-8: {}", e))
}

/// Maps a user-facing format name to an RDF format.
pub fn format_from_name(name: &str) -> Option<RdfFormat> {
    match name.to_ascii_lowercase().as_str() {
        "turtle" | "ttl" => Some(RdfFormat::Turtle),
        "ntriples" | "n-triples" | "nt" => Some(RdfFormat::NTriples),
        "rdfxml" | "rdf/xml" | "xml" => Some(RdfFormat::RdfXml),
        _ => RdfFormat::from_media_type(name),
    }
}

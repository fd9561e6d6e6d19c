use crate::labels::term_value;
use crate::named_nodes::{PREFIX_SHACL, SH};
use crate::serialize::serialize_graph;
use crate::types::{Path, Severity};
use oxigraph::io::RdfFormat;
use oxigraph::model::vocab::rdf;
use oxigraph::model::{
    BlankNode, Graph, Literal, NamedNode, NamedNodeRef, NamedOrBlankNode, Quad, Term, Triple,
};
use std::collections::{BTreeMap, HashMap};

/// One `sh:ValidationResult`.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub focus_node: Term,
    pub path: Option<Path>,
    pub value: Option<Term>,
    pub message: String,
    pub source_shape: Term,
    pub source_constraint_component: NamedNode,
    pub severity: Severity,
}

impl ValidationResult {
    pub fn is_min_count(&self) -> bool {
        self.source_constraint_component == SH.min_count_component
    }
}

/// Outcome of running a [`crate::validate::ValidationEngine`] over the form's data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    results: Vec<ValidationResult>,
    /// Set when the engine itself failed; the report then does not conform.
    failure: Option<String>,
}

impl ValidationReport {
    pub fn new(results: Vec<ValidationResult>) -> Self {
        ValidationReport {
            results,
            failure: None,
        }
    }

    /// A non-conforming report without results, standing in for an engine error.
    pub fn failed(reason: impl Into<String>) -> Self {
        ValidationReport {
            results: Vec::new(),
            failure: Some(reason.into()),
        }
    }

    /// Only violations make a report non-conforming; info and warning results don't.
    pub fn conforms(&self) -> bool {
        self.failure.is_none()
            && !self
                .results
                .iter()
                .any(|r| r.severity == Severity::Violation)
    }

    pub fn results(&self) -> &[ValidationResult] {
        &self.results
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Results about `focus`, optionally restricted to one path predicate.
    pub fn results_for<'a>(
        &'a self,
        focus: &'a Term,
        path: Option<&'a Path>,
    ) -> impl Iterator<Item = &'a ValidationResult> + 'a {
        self.results
            .iter()
            .filter(move |r| &r.focus_node == focus && (path.is_none() || r.path.as_ref() == path))
    }

    pub(crate) fn retain(&mut self, keep: impl FnMut(&ValidationResult) -> bool) {
        self.results.retain(keep);
    }

    /// The W3C `sh:ValidationReport` graph of this report.
    pub fn to_graph(&self) -> Graph {
        let mut graph = Graph::new();
        let report_node: NamedOrBlankNode = BlankNode::default().into();
        graph.insert(&Triple::new(
            report_node.clone(),
            rdf::TYPE,
            SH.validation_report.into_owned(),
        ));
        graph.insert(&Triple::new(
            report_node.clone(),
            SH.conforms,
            Literal::from(self.conforms()),
        ));

        for result in &self.results {
            let result_node: NamedOrBlankNode = BlankNode::default().into();
            graph.insert(&Triple::new(
                report_node.clone(),
                SH.result,
                Term::from(result_node.clone()),
            ));
            let mut extra: Vec<Quad> = Vec::new();
            let mut objects: Vec<(NamedNodeRef<'static>, Term)> = vec![
                (rdf::TYPE, SH.validation_result.into_owned().into()),
                (SH.focus_node, result.focus_node.clone()),
                (
                    SH.result_message,
                    Literal::new_simple_literal(&result.message).into(),
                ),
                (SH.source_shape, result.source_shape.clone()),
                (
                    SH.source_constraint_component,
                    result.source_constraint_component.clone().into(),
                ),
                (SH.result_severity, result.severity.to_named_node().into_owned().into()),
            ];
            if let Some(value) = &result.value {
                objects.push((SH.value, value.clone()));
            }
            if let Some(path) = &result.path {
                objects.push((SH.result_path, path.to_term(&mut extra)));
            }
            for (predicate, object) in objects {
                graph.insert(&Triple::new(result_node.clone(), predicate, object));
            }
            for quad in extra {
                graph.insert(&Triple::new(quad.subject, quad.predicate, quad.object));
            }
        }
        graph
    }

    pub fn to_rdf(&self, format: RdfFormat) -> Result<String, String> {
        let mut prefixes = BTreeMap::new();
        prefixes.insert("sh".to_string(), PREFIX_SHACL.to_string());
        serialize_graph(&self.to_graph(), format, &prefixes)
    }

    pub fn to_turtle(&self) -> Result<String, String> {
        self.to_rdf(RdfFormat::Turtle)
    }

    pub fn dump(&self) {
        if let Some(reason) = &self.failure {
            println!("Validation failed: {}", reason);
            return;
        }
        if self.results.is_empty() {
            println!("Validation report: No errors found.");
            return;
        }

        println!("Validation Report:");
        println!("------------------");

        let mut grouped: HashMap<&Term, Vec<&ValidationResult>> = HashMap::new();
        let mut order: Vec<&Term> = Vec::new();
        for result in &self.results {
            if !grouped.contains_key(&result.focus_node) {
                order.push(&result.focus_node);
            }
            grouped.entry(&result.focus_node).or_default().push(result);
        }

        for focus in order {
            println!("\nFocus Node: {}", focus);
            for result in grouped.get(focus).into_iter().flatten() {
                println!("  - Error: {}", result.message);
                if let Some(path) = &result.path {
                    println!("    Path: {}", path);
                }
                if let Some(value) = &result.value {
                    println!("    Value: {}", term_value(value));
                }
                println!("    From shape: {}", result.source_shape);
            }
        }
        println!("\n------------------");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(severity: Severity) -> ValidationResult {
        ValidationResult {
            focus_node: NamedNode::new_unchecked("http://example.org/alice").into(),
            path: Some(Path::Inverse(NamedNode::new_unchecked("http://example.org/knows"))),
            value: None,
            message: "Value count (0) does not meet minimum requirement: 1".to_string(),
            source_shape: BlankNode::default().into(),
            source_constraint_component: SH.min_count_component.into_owned(),
            severity,
        }
    }

    #[test]
    fn warnings_do_not_break_conformance() {
        assert!(ValidationReport::new(vec![result(Severity::Warning)]).conforms());
        assert!(!ValidationReport::new(vec![result(Severity::Violation)]).conforms());
        assert!(!ValidationReport::failed("engine exploded").conforms());
        assert!(ValidationReport::default().conforms());
    }

    #[test]
    fn report_graph_has_typed_results() {
        let report = ValidationReport::new(vec![result(Severity::Violation)]);
        let graph = report.to_graph();
        let results: Vec<_> = graph.triples_for_predicate(SH.result).collect();
        assert_eq!(results.len(), 1);
        let types: Vec<_> = graph
            .triples_for_object(SH.validation_result)
            .filter(|t| t.predicate == rdf::TYPE)
            .collect();
        assert_eq!(types.len(), 1);
        // inverse result path is written as a blank node
        assert_eq!(graph.triples_for_predicate(SH.inverse_path).count(), 1);
        let conforms: Vec<_> = graph.triples_for_predicate(SH.conforms).collect();
        assert_eq!(conforms[0].object.into_owned(), Term::from(Literal::from(false)));
    }
}

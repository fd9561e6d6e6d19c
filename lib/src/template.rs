use crate::context::FormContext;
use crate::labels::{find_label, find_object_value, local_name};
use crate::named_nodes::SH;
use crate::types::{Disjunction, NodeKind, Path};
use log::debug;
use oxigraph::model::vocab::rdf;
use oxigraph::model::{NamedNode, Quad, Term};

/// Everything the form needs to know about one property shape.
///
/// Templates are built once from the shapes graph and cloned whenever a
/// disjunction branch overlays its own constraints with [`PropertyTemplate::merge`].
#[derive(Debug, Clone)]
pub struct PropertyTemplate {
    pub id: Term,
    pub label: String,
    pub description: Option<String>,
    pub path: Option<Path>,
    pub datatype: Option<NamedNode>,
    pub class: Option<NamedNode>,
    pub node_kind: Option<NodeKind>,
    /// Node shape the values must conform to (`sh:node`).
    pub node: Option<Term>,
    pub min_count: Option<u64>,
    pub max_count: Option<u64>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub pattern: Option<String>,
    pub flags: Option<String>,
    pub in_values: Vec<Term>,
    pub has_value: Option<Term>,
    pub default_value: Option<Term>,
    pub order: Option<f64>,
    pub group: Option<Term>,
    /// Property-level `sh:or` / `sh:xone`, branches in declaration order.
    pub disjunction: Option<(Disjunction, Vec<Term>)>,
    quads: Vec<Quad>,
}

fn parse_u64(term: &Term) -> Option<u64> {
    match term {
        Term::Literal(l) => l.value().trim().parse().ok(),
        _ => None,
    }
}

fn parse_f64(term: &Term) -> Option<f64> {
    match term {
        Term::Literal(l) => l.value().trim().parse().ok(),
        _ => None,
    }
}

fn named(term: &Term) -> Option<NamedNode> {
    match term {
        Term::NamedNode(nn) => Some(nn.clone()),
        _ => None,
    }
}

impl PropertyTemplate {
    fn empty(id: Term) -> Self {
        PropertyTemplate {
            id,
            label: String::new(),
            description: None,
            path: None,
            datatype: None,
            class: None,
            node_kind: None,
            node: None,
            min_count: None,
            max_count: None,
            min_length: None,
            max_length: None,
            pattern: None,
            flags: None,
            in_values: Vec::new(),
            has_value: None,
            default_value: None,
            order: None,
            group: None,
            disjunction: None,
            quads: Vec::new(),
        }
    }

    /// Builds the template for the property shape `subject`.
    pub fn from_shape(ctx: &FormContext, subject: &Term) -> Self {
        let mut template = PropertyTemplate::empty(subject.clone());
        let quads = ctx.store.quads(Some(subject), None, None, None);
        template.merge(ctx, &quads);
        if template.path.is_none() {
            debug!("property shape {} has no editable sh:path", subject);
        }
        template
    }

    /// Overlays `quads` onto this template. Later values replace earlier ones
    /// for single-valued constraints; unknown predicates are only kept as raw quads.
    pub fn merge(&mut self, ctx: &FormContext, quads: &[Quad]) -> &mut Self {
        let store = &ctx.store;
        for quad in quads {
            let p = quad.predicate.as_ref();
            let o = &quad.object;
            if p == SH.path {
                self.path = Path::from_term(store, o);
            } else if p == SH.datatype {
                self.datatype = named(o);
            } else if p == SH.class {
                self.class = named(o);
            } else if p == SH.node_kind {
                self.node_kind = NodeKind::from_term(o);
            } else if p == SH.node {
                self.node = Some(o.clone());
            } else if p == SH.min_count {
                self.min_count = parse_u64(o);
            } else if p == SH.max_count {
                self.max_count = parse_u64(o);
            } else if p == SH.min_length {
                self.min_length = parse_u64(o);
            } else if p == SH.max_length {
                self.max_length = parse_u64(o);
            } else if p == SH.pattern {
                self.pattern = Some(crate::labels::term_value(o));
            } else if p == SH.flags {
                self.flags = Some(crate::labels::term_value(o));
            } else if p == SH.in_ {
                self.in_values = store.list(o, None);
            } else if p == SH.has_value {
                self.has_value = Some(o.clone());
            } else if p == SH.default_value {
                self.default_value = Some(o.clone());
            } else if p == SH.order {
                self.order = parse_f64(o);
            } else if p == SH.group {
                self.group = Some(o.clone());
            } else if p == SH.or {
                self.disjunction = Some((Disjunction::Or, store.list(o, None)));
            } else if p == SH.xone {
                self.disjunction = Some((Disjunction::Xone, store.list(o, None)));
            }
            if !self.quads.contains(quad) {
                self.quads.push(quad.clone());
            }
        }
        let languages = &ctx.config.languages;
        if let Some(label) = find_label(quads, languages) {
            self.label = label;
        } else if self.label.is_empty() {
            self.label = match &self.path {
                Some(path) => local_name(path.predicate().as_str()).to_string(),
                None => crate::labels::term_value(&self.id),
            };
        }
        if let Some(description) = find_object_value(quads, SH.description, languages) {
            self.description = Some(description);
        }
        self
    }

    /// Every quad this template was built from, including merged branch quads.
    pub fn quads(&self) -> &[Quad] {
        &self.quads
    }

    pub fn is_multi_valued(&self) -> bool {
        self.max_count.is_none_or(|max| max > 1)
    }

    /// The node shape nested instances of this property are built from.
    pub fn nested_shape(&self) -> Option<&Term> {
        self.node.as_ref()
    }

    /// Values a user may pick from: `sh:in` members, or the instances of `sh:class`.
    pub fn choices(&self, ctx: &FormContext) -> Vec<Term> {
        if !self.in_values.is_empty() {
            return self.in_values.clone();
        }
        match &self.class {
            Some(class) => ctx
                .store
                .subjects(rdf::TYPE, &Term::from(class.clone()), None),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SHAPES_GRAPH;
    use oxigraph::model::vocab::xsd;
    use oxigraph::model::GraphName;

    const SHAPES: &str = r#"@prefix sh: <http://www.w3.org/ns/shacl#> .
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
@prefix ex: <http://example.org/> .
ex:AgeShape sh:path ex:age ; sh:datatype xsd:integer ; sh:minCount 1 ; sh:maxCount 1 ; sh:order 2 .
ex:ColorShape sh:path ex:color ; sh:in ( "red" "green" ) ; rdfs:label "Colour"@en, "Couleur"@fr .
"#;

    fn ctx() -> Result<FormContext, String> {
        let mut ctx = FormContext::default();
        ctx.store.load_turtle(SHAPES, SHAPES_GRAPH, None)?;
        Ok(ctx)
    }

    fn ex(local: &str) -> Term {
        NamedNode::new_unchecked(format!("http://example.org/{}", local)).into()
    }

    #[test]
    fn reads_constraints_from_shape() -> Result<(), String> {
        let ctx = ctx()?;
        let template = PropertyTemplate::from_shape(&ctx, &ex("AgeShape"));
        assert_eq!(template.label, "age");
        assert_eq!(template.datatype.as_ref().map(|d| d.as_ref()), Some(xsd::INTEGER));
        assert_eq!(template.min_count, Some(1));
        assert_eq!(template.max_count, Some(1));
        assert_eq!(template.order, Some(2.0));
        assert!(!template.is_multi_valued());
        Ok(())
    }

    #[test]
    fn label_language_and_in_list() -> Result<(), String> {
        let mut ctx = ctx()?;
        ctx.config.languages = vec!["fr".to_string()];
        let template = PropertyTemplate::from_shape(&ctx, &ex("ColorShape"));
        assert_eq!(template.label, "Couleur");
        assert_eq!(template.choices(&ctx).len(), 2);
        Ok(())
    }

    #[test]
    fn merge_overlays_branch_constraints_on_a_clone() -> Result<(), String> {
        let ctx = ctx()?;
        let base = PropertyTemplate::from_shape(&ctx, &ex("AgeShape"));
        let branch = vec![Quad::new(
            NamedNode::new_unchecked("http://example.org/branch"),
            SH.datatype,
            xsd::DECIMAL.into_owned(),
            GraphName::DefaultGraph,
        )];
        let mut merged = base.clone();
        merged.merge(&ctx, &branch);
        assert_eq!(merged.datatype.as_ref().map(|d| d.as_ref()), Some(xsd::DECIMAL));
        assert_eq!(base.datatype.as_ref().map(|d| d.as_ref()), Some(xsd::INTEGER));
        assert_eq!(merged.quads().len(), base.quads().len() + 1);
        Ok(())
    }
}

//! A selector over the branches of one `sh:or` / `sh:xone`, plus the content
//! rendered for the active branch.
use crate::context::FormContext;
use crate::labels::{find_label, remove_prefixes, term_value};
use crate::named_nodes::PREFIX_SHACL;
use crate::node::{write_instance_outline, write_property_outline, TreeBuilder};
use crate::property::{FormProperty, PropertyInstance};
use crate::resolver::{branch_property_shapes, select_node_branch, select_property_branch};
use crate::template::PropertyTemplate;
use crate::types::Disjunction;
use log::debug;
use oxigraph::model::{NamedOrBlankNode, Quad, Term};
use std::cmp::Ordering;
use std::rc::Rc;

/// What a branch contributes once selected.
#[derive(Debug, Clone)]
pub enum BranchContent {
    /// Node-level: the property shapes to render for the focus node.
    Properties(Vec<Term>),
    /// Property-level: constraint triples merged into the owning template.
    Constraints(Vec<Quad>),
}

#[derive(Debug, Clone)]
pub struct Branch {
    pub subject: Term,
    pub label: String,
    pub content: BranchContent,
}

/// What is currently shown below the selector.
#[derive(Debug, Clone)]
pub enum AlternativeContent {
    Empty,
    Properties(Vec<FormProperty>),
    Instance(Box<PropertyInstance>),
}

#[derive(Debug, Clone)]
enum Owner {
    Node(NamedOrBlankNode),
    Property(Rc<PropertyTemplate>),
}

#[derive(Debug, Clone)]
pub struct AlternativeSet {
    disjunction: Disjunction,
    branches: Vec<Branch>,
    selected: Option<usize>,
    content: AlternativeContent,
    owner: Owner,
    /// An existing value no branch accepted. Kept so it is still written back.
    unresolved: Option<Term>,
}

impl AlternativeSet {
    /// Node-level disjunction on the node `node_id`.
    ///
    /// With `has_data`, the branch whose property paths are populated is
    /// selected and filled from the data graph; if none is, the set is left
    /// without a selection. Without data, the first branch is selected.
    pub(crate) fn for_node(
        builder: &mut TreeBuilder<'_>,
        disjunction: Disjunction,
        branch_subjects: Vec<Term>,
        node_id: NamedOrBlankNode,
        has_data: bool,
    ) -> Self {
        let ctx = builder.ctx;
        let branches: Vec<Branch> = branch_subjects
            .iter()
            .map(|subject| {
                let shapes = sorted_property_shapes(ctx, subject);
                let labels: Vec<String> = shapes
                    .iter()
                    .map(|s| PropertyTemplate::from_shape(ctx, s).label)
                    .collect();
                Branch {
                    subject: subject.clone(),
                    label: labels.join(" / "),
                    content: BranchContent::Properties(shapes),
                }
            })
            .collect();

        let mut set = AlternativeSet {
            disjunction,
            branches,
            selected: None,
            content: AlternativeContent::Empty,
            owner: Owner::Node(node_id.clone()),
            unresolved: None,
        };
        let initial = if has_data {
            select_node_branch(&branch_subjects, &Term::from(node_id), ctx)
        } else {
            Some(0)
        };
        if let Some(index) = initial {
            set.render(builder, index, None, has_data);
        }
        set
    }

    /// Property-level disjunction for one value of the property `template`.
    ///
    /// An existing `value` selects the branch it resolves to; an unresolvable
    /// value leaves the set without a selection. Without a value, the first
    /// branch is selected.
    pub(crate) fn for_property(
        builder: &mut TreeBuilder<'_>,
        disjunction: Disjunction,
        branch_subjects: Vec<Term>,
        template: Rc<PropertyTemplate>,
        value: Option<Term>,
    ) -> Self {
        let ctx = builder.ctx;
        let branches: Vec<Branch> = branch_subjects
            .iter()
            .filter_map(|subject| {
                let quads = ctx.store.quads(Some(subject), None, None, None);
                if quads.is_empty() {
                    debug!("skipping {} branch {} without triples", disjunction, subject);
                    return None;
                }
                let label = find_label(&quads, &ctx.config.languages)
                    .unwrap_or_else(|| constraint_label(&quads, ctx));
                Some(Branch {
                    subject: subject.clone(),
                    label,
                    content: BranchContent::Constraints(quads),
                })
            })
            .collect();

        let mut set = AlternativeSet {
            disjunction,
            branches,
            selected: None,
            content: AlternativeContent::Empty,
            owner: Owner::Property(template),
            unresolved: None,
        };
        match value {
            Some(value) => {
                let resolved = select_property_branch(&branch_subjects, &value, ctx)
                    .and_then(|i| set.position_of(&branch_subjects[i]));
                match resolved {
                    Some(index) => set.render(builder, index, Some(value), true),
                    None => set.unresolved = Some(value),
                }
            }
            None if !set.branches.is_empty() => set.render(builder, 0, None, false),
            None => {}
        }
        set
    }

    fn position_of(&self, subject: &Term) -> Option<usize> {
        self.branches.iter().position(|b| &b.subject == subject)
    }

    pub fn disjunction(&self) -> Disjunction {
        self.disjunction
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn labels(&self) -> Vec<&str> {
        self.branches.iter().map(|b| b.label.as_str()).collect()
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn content(&self) -> &AlternativeContent {
        &self.content
    }

    pub fn content_mut(&mut self) -> &mut AlternativeContent {
        &mut self.content
    }

    pub fn unresolved(&self) -> Option<&Term> {
        self.unresolved.as_ref()
    }

    pub fn is_node_level(&self) -> bool {
        matches!(self.owner, Owner::Node(_))
    }

    /// The owning property template, for property-level sets.
    pub fn template(&self) -> Option<&PropertyTemplate> {
        match &self.owner {
            Owner::Property(t) => Some(t),
            Owner::Node(_) => None,
        }
    }

    pub fn properties(&self) -> Vec<&FormProperty> {
        match &self.content {
            AlternativeContent::Properties(props) => props.iter().collect(),
            _ => Vec::new(),
        }
    }

    pub fn properties_mut(&mut self) -> Vec<&mut FormProperty> {
        match &mut self.content {
            AlternativeContent::Properties(props) => props.iter_mut().collect(),
            _ => Vec::new(),
        }
    }

    pub fn instance(&self) -> Option<&PropertyInstance> {
        match &self.content {
            AlternativeContent::Instance(instance) => Some(instance),
            _ => None,
        }
    }

    pub fn instance_mut(&mut self) -> Option<&mut PropertyInstance> {
        match &mut self.content {
            AlternativeContent::Instance(instance) => Some(instance),
            _ => None,
        }
    }

    /// Makes `index` the active branch and rebuilds its content from scratch;
    /// values entered under the previous branch are discarded.
    ///
    /// Returns `Ok(false)` when `index` already is the active branch.
    pub fn select(&mut self, ctx: &FormContext, index: usize) -> Result<bool, String> {
        if index >= self.branches.len() {
            return Err(format!(
                "{} has {} branches, cannot select {}",
                self.disjunction,
                self.branches.len(),
                index
            ));
        }
        if self.selected == Some(index) {
            return Ok(false);
        }
        let mut builder = TreeBuilder::new(ctx);
        self.render(&mut builder, index, None, false);
        Ok(true)
    }

    fn render(
        &mut self,
        builder: &mut TreeBuilder<'_>,
        index: usize,
        value: Option<Term>,
        with_data: bool,
    ) {
        self.content = AlternativeContent::Empty;
        self.unresolved = None;
        let content = match (&self.owner, &self.branches[index].content) {
            (Owner::Node(node_id), BranchContent::Properties(shapes)) => {
                AlternativeContent::Properties(
                    shapes
                        .iter()
                        .map(|shape| builder.property(shape, node_id, with_data))
                        .collect(),
                )
            }
            (Owner::Property(template), BranchContent::Constraints(quads)) => {
                let mut merged = (**template).clone();
                merged.disjunction = None;
                merged.merge(builder.ctx, quads);
                let instance = builder.instance(&Rc::new(merged), value);
                AlternativeContent::Instance(Box::new(instance))
            }
            _ => AlternativeContent::Empty,
        };
        self.content = content;
        self.selected = Some(index);
    }

    pub(crate) fn write_outline(&self, out: &mut String, depth: usize) {
        let pad = "  ".repeat(depth);
        out.push_str(&format!("{}<{}>\n", pad, self.disjunction));
        for (i, branch) in self.branches.iter().enumerate() {
            let marker = if self.selected == Some(i) { "*" } else { " " };
            out.push_str(&format!("{}{} {}\n", pad, marker, branch.label));
        }
        if let Some(value) = &self.unresolved {
            out.push_str(&format!("{}? unresolved {}\n", pad, term_value(value)));
        }
        match &self.content {
            AlternativeContent::Empty => {}
            AlternativeContent::Properties(props) => {
                for p in props {
                    write_property_outline(p, out, depth + 1);
                }
            }
            AlternativeContent::Instance(instance) => {
                write_instance_outline(instance, out, depth + 1)
            }
        }
    }
}

/// Property shapes of a node-level branch, in `sh:order` then label order.
fn sorted_property_shapes(ctx: &FormContext, branch: &Term) -> Vec<Term> {
    let mut shapes: Vec<(Term, PropertyTemplate)> = branch_property_shapes(branch, ctx)
        .into_iter()
        .map(|s| {
            let t = PropertyTemplate::from_shape(ctx, &s);
            (s, t)
        })
        .collect();
    shapes.sort_by(|(_, a), (_, b)| {
        a.order
            .unwrap_or(f64::INFINITY)
            .partial_cmp(&b.order.unwrap_or(f64::INFINITY))
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.label.cmp(&b.label))
    });
    shapes.into_iter().map(|(s, _)| s).collect()
}

/// `predicate = object` for the first SHACL constraint of a branch, shortened
/// with the configured prefixes.
fn constraint_label(quads: &[Quad], ctx: &FormContext) -> String {
    let quad = quads
        .iter()
        .find(|q| q.predicate.as_str().starts_with(PREFIX_SHACL))
        .unwrap_or(&quads[0]);
    let prefixes = &ctx.config.prefixes;
    format!(
        "{} = {}",
        remove_prefixes(quad.predicate.as_str(), prefixes),
        remove_prefixes(&term_value(&quad.object), prefixes)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::FormNode;
    use crate::resolver::NodeMatchPolicy;
    use crate::store::{DATA_GRAPH, SHAPES_GRAPH};
    use oxigraph::model::vocab::xsd;
    use oxigraph::model::{Literal, NamedNode};

    const SHAPES: &str = r#"@prefix sh: <http://www.w3.org/ns/shacl#> .
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
@prefix ex: <http://example.org/> .

ex:PlaceShape a sh:NodeShape ;
    sh:targetClass ex:Place ;
    sh:xone ( ex:Postal ex:Geo ) .
ex:Postal sh:property ex:StreetShape, ex:CityShape .
ex:StreetShape sh:path ex:street ; sh:name "Street" ; sh:order 1 .
ex:CityShape sh:path ex:city ; sh:name "City" ; sh:order 2 .
ex:Geo sh:property ex:LatShape, ex:LonShape .
ex:LatShape sh:path ex:lat ; sh:name "Latitude" ; sh:order 1 .
ex:LonShape sh:path ex:lon ; sh:name "Longitude" ; sh:order 2 .

ex:ThingShape a sh:NodeShape ;
    sh:targetClass ex:Thing ;
    sh:property [
        sh:path ex:size ;
        sh:or ( [ sh:datatype xsd:string ] [ sh:datatype xsd:integer ; rdfs:label "Number" ] )
    ] .
"#;

    const DATA: &str = r#"@prefix ex: <http://example.org/> .
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .
ex:home a ex:Place ; ex:lat "1.5" ; ex:lon "2.5" .
ex:nowhere a ex:Place ; ex:altitude "3" .
ex:box a ex:Thing ; ex:size 12 .
ex:odd a ex:Thing ; ex:size true .
"#;

    fn ctx() -> Result<FormContext, String> {
        let mut ctx = FormContext::default();
        ctx.store.load_turtle(SHAPES, SHAPES_GRAPH, None)?;
        ctx.store.load_turtle(DATA, DATA_GRAPH, None)?;
        Ok(ctx)
    }

    fn ex(local: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("http://example.org/{}", local))
    }

    #[test]
    fn node_level_labels_join_property_labels() -> Result<(), String> {
        let ctx = ctx()?;
        let node = FormNode::build(&ctx, &ex("PlaceShape").into(), None);
        let set = node.alternatives().next().ok_or("no alternatives")?;
        assert!(set.is_node_level());
        assert_eq!(set.labels(), vec!["Street / City", "Latitude / Longitude"]);
        // fresh form: first branch rendered without user interaction
        assert_eq!(set.selected(), Some(0));
        let labels: Vec<&str> = set.properties().iter().map(|p| p.label()).collect();
        assert_eq!(labels, vec!["Street", "City"]);
        Ok(())
    }

    #[test]
    fn node_level_selection_follows_data() -> Result<(), String> {
        let ctx = ctx()?;
        let node = FormNode::build(&ctx, &ex("PlaceShape").into(), Some(ex("home").into()));
        let set = node.alternatives().next().ok_or("no alternatives")?;
        assert_eq!(set.selected(), Some(1));
        let lat = node.property(ex("lat").as_ref()).ok_or("lat")?;
        let value = lat.instances()[0].as_value().and_then(|s| s.value()).cloned();
        assert_eq!(value, Some(Term::from(Literal::new_simple_literal("1.5"))));
        Ok(())
    }

    #[test]
    fn unresolvable_node_data_leaves_no_selection() -> Result<(), String> {
        let ctx = ctx()?;
        let node = FormNode::build(&ctx, &ex("PlaceShape").into(), Some(ex("nowhere").into()));
        let set = node.alternatives().next().ok_or("no alternatives")?;
        assert_eq!(set.selected(), None);
        assert!(set.properties().is_empty());
        Ok(())
    }

    #[test]
    fn switching_branches_discards_entered_values() -> Result<(), String> {
        let ctx = ctx()?;
        let mut node = FormNode::build(&ctx, &ex("PlaceShape").into(), Some(ex("home").into()));
        let set = node.alternatives_mut(0).ok_or("no alternatives")?;
        assert!(set.select(&ctx, 0)?);
        assert!(!set.select(&ctx, 0)?);
        assert!(set.select(&ctx, 1)?);
        // rebuilt from scratch, not from the data graph
        let lat = node.property(ex("lat").as_ref()).ok_or("lat")?;
        assert!(lat.instances()[0].as_value().is_some_and(|s| s.is_empty()));
        let set = node.alternatives_mut(0).ok_or("no alternatives")?;
        assert!(set.select(&ctx, 2).is_err());
        Ok(())
    }

    #[test]
    fn property_level_branches_resolve_per_value() -> Result<(), String> {
        let ctx = ctx()?;
        let node = FormNode::build(&ctx, &ex("ThingShape").into(), Some(ex("box").into()));
        let size = node.property(ex("size").as_ref()).ok_or("size")?;
        let set = size.instances()[0].as_alternatives().ok_or("size alternatives")?;
        assert_eq!(set.labels(), vec!["sh:datatype = xsd:string", "Number"]);
        assert_eq!(set.selected(), Some(1));
        let slot = set.instance().and_then(|i| i.as_value()).ok_or("size slot")?;
        assert_eq!(slot.template().datatype.as_ref().map(|d| d.as_ref()), Some(xsd::INTEGER));
        assert_eq!(slot.value(), Some(&Term::from(Literal::new_typed_literal("12", xsd::INTEGER))));
        Ok(())
    }

    #[test]
    fn unresolved_property_value_is_kept_without_selection() -> Result<(), String> {
        let ctx = ctx()?;
        let node = FormNode::build(&ctx, &ex("ThingShape").into(), Some(ex("odd").into()));
        let size = node.property(ex("size").as_ref()).ok_or("size")?;
        let set = size.instances()[0].as_alternatives().ok_or("size alternatives")?;
        assert_eq!(set.selected(), None);
        assert_eq!(
            set.unresolved(),
            Some(&Term::from(Literal::new_typed_literal("true", xsd::BOOLEAN)))
        );
        Ok(())
    }

    #[test]
    fn most_populated_policy_is_honoured_by_the_builder() -> Result<(), String> {
        let mut ctx = ctx()?;
        ctx.store.load_turtle(
            "<http://example.org/home> <http://example.org/street> \"Main\" .",
            DATA_GRAPH,
            None,
        )?;
        let first = FormNode::build(&ctx, &ex("PlaceShape").into(), Some(ex("home").into()));
        assert_eq!(first.alternatives().next().and_then(|s| s.selected()), Some(0));
        ctx.config.node_match = NodeMatchPolicy::MostPopulated;
        let most = FormNode::build(&ctx, &ex("PlaceShape").into(), Some(ex("home").into()));
        assert_eq!(most.alternatives().next().and_then(|s| s.selected()), Some(1));
        Ok(())
    }
}

//! Walks node shapes and builds the form tree.
use crate::alternatives::AlternativeSet;
use crate::context::FormContext;
use crate::labels::{find_label, local_name, term_value};
use crate::named_nodes::SH;
use crate::property::{FormProperty, PropertyInstance, ValueSlot};
use crate::store::as_subject;
use crate::template::PropertyTemplate;
use crate::types::Disjunction;
use log::{debug, warn};
use oxigraph::model::{BlankNode, NamedNode, NamedNodeRef, NamedOrBlankNode, Term};
use std::cmp::Ordering;
use std::rc::Rc;

/// An entry of a node: either a property or a node-level disjunction.
#[derive(Debug, Clone)]
pub enum NodeItem {
    Property(FormProperty),
    Alternatives(AlternativeSet),
}

impl NodeItem {
    fn sort_key(&self) -> (f64, &str) {
        match self {
            NodeItem::Property(p) => (p.template().order.unwrap_or(f64::INFINITY), p.label()),
            NodeItem::Alternatives(_) => (f64::INFINITY, ""),
        }
    }
}

/// A node shape rendered for one data subject.
#[derive(Debug, Clone)]
pub struct FormNode {
    shape: Term,
    node_id: NamedOrBlankNode,
    label: String,
    target_class: Option<NamedNode>,
    /// Shapes pulled in through `sh:node` / `sh:and` on this node shape.
    inherited: Vec<Term>,
    items: Vec<NodeItem>,
}

impl FormNode {
    /// Builds the node for `shape`. With a `subject`, existing values are read
    /// from the data graph; without one, a fresh blank node is minted.
    pub fn build(ctx: &FormContext, shape: &Term, subject: Option<NamedOrBlankNode>) -> Self {
        TreeBuilder::new(ctx).node(shape, subject)
    }

    pub fn shape(&self) -> &Term {
        &self.shape
    }

    pub fn node_id(&self) -> &NamedOrBlankNode {
        &self.node_id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn target_class(&self) -> Option<&NamedNode> {
        self.target_class.as_ref()
    }

    pub fn inherited_shapes(&self) -> &[Term] {
        &self.inherited
    }

    pub fn items(&self) -> &[NodeItem] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut [NodeItem] {
        &mut self.items
    }

    /// All properties of this node, including those shown by the active branch
    /// of node-level disjunctions.
    pub fn properties(&self) -> Vec<&FormProperty> {
        let mut out = Vec::new();
        for item in &self.items {
            match item {
                NodeItem::Property(p) => out.push(p),
                NodeItem::Alternatives(set) => out.extend(set.properties()),
            }
        }
        out
    }

    /// The property whose path predicate is `predicate`.
    pub fn property(&self, predicate: NamedNodeRef<'_>) -> Option<&FormProperty> {
        self.properties().into_iter().find(|p| {
            p.template()
                .path
                .as_ref()
                .is_some_and(|path| path.predicate() == predicate)
        })
    }

    pub fn property_mut(&mut self, predicate: NamedNodeRef<'_>) -> Option<&mut FormProperty> {
        let matches = |p: &FormProperty| {
            p.template()
                .path
                .as_ref()
                .is_some_and(|path| path.predicate() == predicate)
        };
        for item in self.items.iter_mut() {
            let found = match item {
                NodeItem::Property(p) => matches(&*p).then_some(p),
                NodeItem::Alternatives(set) => set.properties_mut().into_iter().find(|p| matches(p)),
            };
            if found.is_some() {
                return found;
            }
        }
        None
    }

    /// Node-level disjunctions of this node, in declaration order.
    pub fn alternatives(&self) -> impl Iterator<Item = &AlternativeSet> {
        self.items.iter().filter_map(|item| match item {
            NodeItem::Alternatives(set) => Some(set),
            _ => None,
        })
    }

    pub fn alternatives_mut(&mut self, index: usize) -> Option<&mut AlternativeSet> {
        self.items
            .iter_mut()
            .filter_map(|item| match item {
                NodeItem::Alternatives(set) => Some(set),
                _ => None,
            })
            .nth(index)
    }

    /// Whether this node or any node nested below it renders `id`.
    pub fn contains_node(&self, id: &NamedOrBlankNode) -> bool {
        if &self.node_id == id {
            return true;
        }
        self.properties().iter().any(|p| {
            p.instances().iter().any(|instance| match instance {
                PropertyInstance::Node(nested) => nested.contains_node(id),
                PropertyInstance::Alternatives(set) => set
                    .instance()
                    .and_then(|i| i.as_node())
                    .is_some_and(|nested| nested.contains_node(id)),
                PropertyInstance::Value(_) => false,
            })
        })
    }

    /// Indented text rendering of the tree, one control per line.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.write_outline(&mut out, 0);
        out
    }

    pub(crate) fn write_outline(&self, out: &mut String, depth: usize) {
        let pad = "  ".repeat(depth);
        out.push_str(&format!("{}{} [{}]\n", pad, self.label, self.node_id));
        for item in &self.items {
            match item {
                NodeItem::Property(p) => write_property_outline(p, out, depth + 1),
                NodeItem::Alternatives(set) => set.write_outline(out, depth + 1),
            }
        }
    }
}

pub(crate) fn write_property_outline(property: &FormProperty, out: &mut String, depth: usize) {
    let pad = "  ".repeat(depth);
    out.push_str(&format!("{}{}:\n", pad, property.label()));
    for instance in property.instances() {
        write_instance_outline(instance, out, depth + 1);
    }
}

pub(crate) fn write_instance_outline(instance: &PropertyInstance, out: &mut String, depth: usize) {
    let pad = "  ".repeat(depth);
    match instance {
        PropertyInstance::Value(slot) => match slot.value() {
            Some(v) => out.push_str(&format!("{}- {}\n", pad, term_value(v))),
            None => out.push_str(&format!("{}- (empty)\n", pad)),
        },
        PropertyInstance::Node(node) => node.write_outline(out, depth),
        PropertyInstance::Alternatives(set) => set.write_outline(out, depth),
    }
}

/// Builds nodes, properties and instances while guarding against shapes that
/// reference themselves.
pub(crate) struct TreeBuilder<'a> {
    pub(crate) ctx: &'a FormContext,
    /// (shape, focus) pairs currently being expanded.
    stack: Vec<(Term, Option<Term>)>,
}

impl<'a> TreeBuilder<'a> {
    pub(crate) fn new(ctx: &'a FormContext) -> Self {
        TreeBuilder {
            ctx,
            stack: Vec::new(),
        }
    }

    pub(crate) fn node(&mut self, shape: &Term, subject: Option<NamedOrBlankNode>) -> FormNode {
        let ctx = self.ctx;
        let store = &ctx.store;
        let has_data = subject.is_some();
        let focus = subject.as_ref().map(|s| Term::from(s.clone()));
        let node_id = subject.unwrap_or_else(|| BlankNode::default().into());
        let shape_quads = store.quads(Some(shape), None, None, None);
        let label = find_label(&shape_quads, &ctx.config.languages)
            .unwrap_or_else(|| local_name(&term_value(shape)).to_string());
        let target_class = match store.object(shape, SH.target_class, None) {
            Some(Term::NamedNode(nn)) => Some(nn),
            _ => None,
        };
        let mut node = FormNode {
            shape: shape.clone(),
            node_id,
            label,
            target_class,
            inherited: Vec::new(),
            items: Vec::new(),
        };
        self.stack.push((shape.clone(), focus));
        self.expand(&mut node, shape, has_data);
        self.stack.pop();
        node.items.sort_by(|a, b| {
            let (oa, la) = a.sort_key();
            let (ob, lb) = b.sort_key();
            oa.partial_cmp(&ob).unwrap_or(Ordering::Equal).then_with(|| la.cmp(lb))
        });
        node
    }

    fn expand(&mut self, node: &mut FormNode, shape: &Term, has_data: bool) {
        let ctx = self.ctx;
        let store = &ctx.store;
        let mut parents = store.objects(shape, SH.node, None);
        for head in store.objects(shape, SH.and, None) {
            parents.extend(store.list(&head, None));
        }
        for parent in parents {
            if parent == node.shape || node.inherited.contains(&parent) {
                continue;
            }
            debug!("{} inherits from {}", node.shape, parent);
            node.inherited.push(parent.clone());
            self.expand(node, &parent, has_data);
        }

        for property_shape in store.objects(shape, SH.property, None) {
            let property = self.property(&property_shape, &node.node_id, has_data);
            node.items.push(NodeItem::Property(property));
        }

        for disjunction in [Disjunction::Or, Disjunction::Xone] {
            for head in store.objects(shape, disjunction.predicate(), None) {
                let branches = store.list(&head, None);
                if branches.is_empty() {
                    warn!("{} on {} has no branches", disjunction, shape);
                    continue;
                }
                let set = AlternativeSet::for_node(
                    self,
                    disjunction,
                    branches,
                    node.node_id.clone(),
                    has_data,
                );
                node.items.push(NodeItem::Alternatives(set));
            }
        }
    }

    /// Renders the property shape `shape` for `focus`. With `with_data`, one
    /// instance per existing value; otherwise (or when there are none) empty
    /// instances up to the minimum the form should show.
    pub(crate) fn property(
        &mut self,
        shape: &Term,
        focus: &NamedOrBlankNode,
        with_data: bool,
    ) -> FormProperty {
        let template = Rc::new(PropertyTemplate::from_shape(self.ctx, shape));
        let mut instances = Vec::new();
        if with_data {
            if let Some(path) = &template.path {
                for value in path.values(&self.ctx.store, &Term::from(focus.clone())) {
                    instances.push(self.instance(&template, Some(value)));
                }
            }
        }
        if instances.is_empty() && self.ctx.config.edit_mode {
            let min = template.min_count.unwrap_or(0);
            let wanted = if template.node.is_some() { min } else { min.max(1) };
            for _ in 0..wanted {
                instances.push(self.instance(&template, None));
            }
        }
        FormProperty::new(template, instances)
    }

    /// Renders one value of `template`.
    pub(crate) fn instance(
        &mut self,
        template: &Rc<PropertyTemplate>,
        value: Option<Term>,
    ) -> PropertyInstance {
        if let Some((disjunction, branches)) = &template.disjunction {
            return PropertyInstance::Alternatives(AlternativeSet::for_property(
                self,
                *disjunction,
                branches.clone(),
                template.clone(),
                value,
            ));
        }
        if let Some(shape) = template.nested_shape().cloned() {
            let subject = value.as_ref().and_then(as_subject);
            let nestable = match (&value, &subject) {
                (None, _) => !self.stack.iter().any(|(s, _)| *s == shape),
                (Some(v), Some(_)) => !self
                    .stack
                    .iter()
                    .any(|(s, f)| *s == shape && f.as_ref() == Some(v)),
                (Some(_), None) => false,
            };
            if nestable {
                return PropertyInstance::Node(Box::new(self.node(&shape, subject)));
            }
            debug!("not expanding {} again for {}", shape, template.label);
        }
        let value = value.or_else(|| {
            template
                .has_value
                .clone()
                .or_else(|| template.default_value.clone())
        });
        PropertyInstance::Value(ValueSlot::new(template.clone(), value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DATA_GRAPH, SHAPES_GRAPH};
    use oxigraph::model::Literal;

    const SHAPES: &str = r#"@prefix sh: <http://www.w3.org/ns/shacl#> .
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
@prefix ex: <http://example.org/> .

ex:PersonShape a sh:NodeShape ;
    rdfs:label "Person" ;
    sh:targetClass ex:Person ;
    sh:node ex:NamedShape ;
    sh:property [ sh:path ex:age ; sh:datatype xsd:integer ; sh:order 2 ] ,
                [ sh:path ex:knows ; sh:node ex:PersonShape ; sh:order 3 ] ,
                [ sh:path ex:status ; sh:defaultValue "active" ; sh:order 4 ] .

ex:NamedShape a sh:NodeShape ;
    sh:property [ sh:path ex:name ; sh:minCount 1 ; sh:order 1 ] .
"#;

    const DATA: &str = r#"@prefix ex: <http://example.org/> .
ex:alice a ex:Person ; ex:name "Alice" ; ex:knows ex:bob .
ex:bob a ex:Person ; ex:name "Bob" ; ex:knows ex:alice .
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
    fn empty_node_has_inherited_and_ordered_properties() -> Result<(), String> {
        let ctx = ctx()?;
        let node = FormNode::build(&ctx, &ex("PersonShape").into(), None);
        assert_eq!(node.label(), "Person");
        assert_eq!(node.target_class(), Some(&ex("Person")));
        assert_eq!(node.inherited_shapes(), &[Term::from(ex("NamedShape"))]);
        let labels: Vec<&str> = node.properties().iter().map(|p| p.label()).collect();
        assert_eq!(labels, vec!["name", "age", "knows", "status"]);

        // no minCount on knows: the recursive shape is not expanded for empty forms
        let knows = node.property(ex("knows").as_ref()).ok_or("knows")?;
        assert!(knows.instances().is_empty());

        let status = node.property(ex("status").as_ref()).ok_or("status")?;
        let slot = status.instances()[0].as_value().ok_or("status slot")?;
        assert_eq!(slot.value(), Some(&Term::from(Literal::new_simple_literal("active"))));
        Ok(())
    }

    #[test]
    fn cyclic_data_is_expanded_once_per_subject() -> Result<(), String> {
        let ctx = ctx()?;
        let node = FormNode::build(&ctx, &ex("PersonShape").into(), Some(ex("alice").into()));
        let knows = node.property(ex("knows").as_ref()).ok_or("knows")?;
        let bob = knows.instances()[0].as_node().ok_or("bob node")?;
        assert_eq!(bob.node_id(), &NamedOrBlankNode::from(ex("bob")));

        // bob knows alice, who is already being rendered: plain reference
        let back = bob.property(ex("knows").as_ref()).ok_or("bob knows")?;
        let slot = back.instances()[0].as_value().ok_or("back reference")?;
        assert_eq!(slot.value(), Some(&Term::from(ex("alice"))));

        let name = node.property(ex("name").as_ref()).ok_or("name")?;
        assert_eq!(name.instances().len(), 1);
        assert!(node.outline().contains("Alice"));
        Ok(())
    }
}

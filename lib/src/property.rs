use crate::alternatives::AlternativeSet;
use crate::context::FormContext;
use crate::node::{FormNode, TreeBuilder};
use crate::template::PropertyTemplate;
use crate::types::{check_lexical_form, NodeKind};
use oxigraph::model::vocab::{rdf, xsd};
use oxigraph::model::{Literal, NamedNode, Term};
use std::rc::Rc;

/// A single editable value of a property.
#[derive(Debug, Clone)]
pub struct ValueSlot {
    value: Option<Term>,
    template: Rc<PropertyTemplate>,
}

impl ValueSlot {
    pub fn new(template: Rc<PropertyTemplate>, value: Option<Term>) -> Self {
        ValueSlot { value, template }
    }

    pub fn value(&self) -> Option<&Term> {
        self.value.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_none()
    }

    pub fn template(&self) -> &PropertyTemplate {
        &self.template
    }

    pub fn set_value(&mut self, value: Option<Term>) {
        self.value = value;
    }

    /// Sets the value from user input, typed the way the template asks for.
    ///
    /// Empty input clears the slot. IRIs are produced for `sh:nodeKind sh:IRI`
    /// and `sh:class` properties, typed literals for `sh:datatype`, and plain
    /// literals otherwise.
    pub fn set_text(&mut self, text: &str) -> Result<(), String> {
        let text = text.trim();
        if text.is_empty() {
            self.value = None;
            return Ok(());
        }
        let wants_iri = self.template.node_kind == Some(NodeKind::Iri)
            || (self.template.class.is_some() && self.template.datatype.is_none());
        let term: Term = if wants_iri {
            NamedNode::new(text)
                .map_err(|e| format!("\"{}\" is not a valid IRI: {}", text, e))?
                .into()
        } else {
            match &self.template.datatype {
                Some(dt) if dt.as_ref() == rdf::LANG_STRING => {
                    return Err(format!(
                        "{} needs a language tag; use set_value with a tagged literal",
                        self.template.label
                    ))
                }
                Some(dt) if dt.as_ref() != xsd::STRING => {
                    check_lexical_form(text, dt.as_ref())?;
                    Literal::new_typed_literal(text, dt.clone()).into()
                }
                _ => Literal::new_simple_literal(text).into(),
            }
        };
        self.value = Some(term);
        Ok(())
    }
}

/// One rendered value of a property: a plain editor, a nested node, or a choice
/// between disjunction branches.
#[derive(Debug, Clone)]
pub enum PropertyInstance {
    Value(ValueSlot),
    Node(Box<FormNode>),
    Alternatives(AlternativeSet),
}

impl PropertyInstance {
    pub fn as_value(&self) -> Option<&ValueSlot> {
        match self {
            PropertyInstance::Value(slot) => Some(slot),
            _ => None,
        }
    }

    pub fn as_value_mut(&mut self) -> Option<&mut ValueSlot> {
        match self {
            PropertyInstance::Value(slot) => Some(slot),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&FormNode> {
        match self {
            PropertyInstance::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_node_mut(&mut self) -> Option<&mut FormNode> {
        match self {
            PropertyInstance::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_alternatives(&self) -> Option<&AlternativeSet> {
        match self {
            PropertyInstance::Alternatives(set) => Some(set),
            _ => None,
        }
    }

    pub fn as_alternatives_mut(&mut self) -> Option<&mut AlternativeSet> {
        match self {
            PropertyInstance::Alternatives(set) => Some(set),
            _ => None,
        }
    }
}

/// A property shape rendered for one focus node.
#[derive(Debug, Clone)]
pub struct FormProperty {
    template: Rc<PropertyTemplate>,
    instances: Vec<PropertyInstance>,
}

impl FormProperty {
    pub(crate) fn new(template: Rc<PropertyTemplate>, instances: Vec<PropertyInstance>) -> Self {
        FormProperty {
            template,
            instances,
        }
    }

    pub fn template(&self) -> &PropertyTemplate {
        &self.template
    }

    pub fn label(&self) -> &str {
        &self.template.label
    }

    pub fn instances(&self) -> &[PropertyInstance] {
        &self.instances
    }

    pub fn instance_mut(&mut self, index: usize) -> Option<&mut PropertyInstance> {
        self.instances.get_mut(index)
    }

    pub fn can_add(&self) -> bool {
        self.template
            .max_count
            .is_none_or(|max| (self.instances.len() as u64) < max)
    }

    pub fn can_remove(&self) -> bool {
        !self.instances.is_empty()
            && self
                .template
                .min_count
                .is_none_or(|min| (self.instances.len() as u64) > min)
    }

    /// Appends a fresh, empty instance.
    pub fn add_instance(&mut self, ctx: &FormContext) -> Result<&mut PropertyInstance, String> {
        if !self.can_add() {
            return Err(format!(
                "{} allows at most {} value(s)",
                self.template.label,
                self.template.max_count.unwrap_or_default()
            ));
        }
        let instance = TreeBuilder::new(ctx).instance(&self.template, None);
        self.instances.push(instance);
        let last = self.instances.len() - 1;
        Ok(&mut self.instances[last])
    }

    pub fn remove_instance(&mut self, index: usize) -> Result<PropertyInstance, String> {
        if index >= self.instances.len() {
            return Err(format!(
                "{} has no value at position {}",
                self.template.label, index
            ));
        }
        if !self.can_remove() {
            return Err(format!(
                "{} needs at least {} value(s)",
                self.template.label,
                self.template.min_count.unwrap_or_default()
            ));
        }
        Ok(self.instances.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SHAPES_GRAPH;

    const SHAPES: &str = r#"@prefix sh: <http://www.w3.org/ns/shacl#> .
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .
@prefix ex: <http://example.org/> .
ex:Age sh:path ex:age ; sh:datatype xsd:integer ; sh:minCount 1 ; sh:maxCount 2 .
ex:Homepage sh:path ex:homepage ; sh:nodeKind sh:IRI .
ex:Nick sh:path ex:nick .
"#;

    fn ctx() -> Result<FormContext, String> {
        let mut ctx = FormContext::default();
        ctx.store.load_turtle(SHAPES, SHAPES_GRAPH, None)?;
        Ok(ctx)
    }

    fn slot(ctx: &FormContext, shape: &str) -> ValueSlot {
        let subject = Term::from(NamedNode::new_unchecked(format!("http://example.org/{}", shape)));
        ValueSlot::new(Rc::new(PropertyTemplate::from_shape(ctx, &subject)), None)
    }

    #[test]
    fn text_input_is_typed_by_template() -> Result<(), String> {
        let ctx = ctx()?;
        let mut age = slot(&ctx, "Age");
        age.set_text(" 42 ")?;
        assert_eq!(
            age.value(),
            Some(&Term::from(Literal::new_typed_literal("42", xsd::INTEGER)))
        );
        assert!(age.set_text("old").is_err());
        age.set_text("")?;
        assert!(age.is_empty());

        let mut homepage = slot(&ctx, "Homepage");
        homepage.set_text("http://example.org/~me")?;
        assert!(matches!(homepage.value(), Some(Term::NamedNode(_))));

        let mut nick = slot(&ctx, "Nick");
        nick.set_text("bob")?;
        assert_eq!(nick.value(), Some(&Term::from(Literal::new_simple_literal("bob"))));
        Ok(())
    }

    #[test]
    fn instance_counts_respect_cardinality() -> Result<(), String> {
        let ctx = ctx()?;
        let subject = Term::from(NamedNode::new_unchecked("http://example.org/Age"));
        let template = Rc::new(PropertyTemplate::from_shape(&ctx, &subject));
        let first = PropertyInstance::Value(ValueSlot::new(template.clone(), None));
        let mut property = FormProperty::new(template, vec![first]);

        assert!(!property.can_remove());
        assert!(property.remove_instance(0).is_err());
        property.add_instance(&ctx)?;
        assert_eq!(property.instances().len(), 2);
        assert!(property.add_instance(&ctx).is_err());
        property.remove_instance(1)?;
        assert_eq!(property.instances().len(), 1);
        Ok(())
    }
}

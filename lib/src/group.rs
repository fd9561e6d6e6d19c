//! `sh:group` sections.
use crate::context::{Collapse, FormContext};
use crate::labels::{find_label, local_name, term_value};
use crate::named_nodes::SH;
use crate::node::FormNode;
use crate::property::FormProperty;
use oxigraph::model::Term;
use std::cmp::Ordering;

/// A `sh:PropertyGroup` as presented by the form.
#[derive(Debug, Clone, PartialEq)]
pub struct FormGroup {
    pub subject: Term,
    pub label: String,
    pub order: Option<f64>,
    pub collapse: Collapse,
}

impl FormGroup {
    pub fn from_subject(ctx: &FormContext, subject: &Term) -> Self {
        let quads = ctx.store.quads(Some(subject), None, None, None);
        let label = find_label(&quads, &ctx.config.languages)
            .unwrap_or_else(|| local_name(&term_value(subject)).to_string());
        let order = ctx
            .store
            .object(subject, SH.order, None)
            .and_then(|o| term_value(&o).trim().parse().ok());
        FormGroup {
            subject: subject.clone(),
            label,
            order,
            collapse: ctx.config.collapse,
        }
    }

    /// Whether the section starts expanded.
    pub fn is_open(&self) -> bool {
        self.collapse != Collapse::Closed
    }
}

/// Properties sharing one group, or the ungrouped ones when `group` is `None`.
#[derive(Debug)]
pub struct Section<'a> {
    pub group: Option<FormGroup>,
    pub properties: Vec<&'a FormProperty>,
}

impl FormNode {
    /// Properties of this node split into sections: ungrouped properties
    /// first, then one section per `sh:group` ordered by `sh:order` and label.
    /// Property order inside a section is the node's item order.
    pub fn sections<'a>(&'a self, ctx: &FormContext) -> Vec<Section<'a>> {
        let mut ungrouped = Section {
            group: None,
            properties: Vec::new(),
        };
        let mut groups: Vec<Section<'a>> = Vec::new();
        for property in self.properties() {
            let Some(subject) = &property.template().group else {
                ungrouped.properties.push(property);
                continue;
            };
            match groups
                .iter_mut()
                .find(|s| s.group.as_ref().map(|g| &g.subject) == Some(subject))
            {
                Some(section) => section.properties.push(property),
                None => groups.push(Section {
                    group: Some(FormGroup::from_subject(ctx, subject)),
                    properties: vec![property],
                }),
            }
        }
        groups.sort_by(|a, b| match (&a.group, &b.group) {
            (Some(a), Some(b)) => a
                .order
                .unwrap_or(f64::INFINITY)
                .partial_cmp(&b.order.unwrap_or(f64::INFINITY))
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.label.cmp(&b.label)),
            _ => Ordering::Equal,
        });
        let mut sections = Vec::with_capacity(groups.len() + 1);
        if !ungrouped.properties.is_empty() {
            sections.push(ungrouped);
        }
        sections.extend(groups);
        sections
    }
}

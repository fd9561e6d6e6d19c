//! Disjunction resolution: given the branches of a `sh:or` / `sh:xone` and a
//! value, decide which branch the value belongs to.
//!
//! Branches are always an ordered slice. When more than one branch could match,
//! the first one in declaration order wins; this is the documented tie-break and
//! the only one used for property-level disjunctions. Node-level disjunctions
//! may opt into [`NodeMatchPolicy::MostPopulated`] instead.
use crate::context::FormContext;
use crate::named_nodes::SH;
use crate::types::Path;
use log::{debug, error};
use oxigraph::model::{Quad, Term};

/// Tie-break used when a data subject populates paths of several node-level branches.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum NodeMatchPolicy {
    /// The first matching branch in declaration order.
    #[default]
    FirstMatch,
    /// The branch with the most populated paths; equal counts go to the earlier branch.
    MostPopulated,
}

/// Whether `branch` accepts `value` according to its own constraint triples.
fn property_branch_matches(
    ctx: &FormContext,
    branch: &[Quad],
    value: &Term,
    value_types: &[Term],
) -> bool {
    let store = &ctx.store;
    match value {
        Term::Literal(literal) => {
            let datatype = Term::from(literal.datatype().into_owned());
            branch
                .iter()
                .any(|q| q.predicate == SH.datatype && q.object == datatype)
        }
        _ if !value_types.is_empty() => branch.iter().any(|q| {
            if q.predicate == SH.node {
                value_types.iter().any(|t| {
                    store.count(Some(&q.object), Some(SH.target_class), Some(t), None) > 0
                })
            } else if q.predicate == SH.class {
                value_types.contains(&q.object)
            } else {
                false
            }
        }),
        _ => {
            let iri = Term::from(SH.iri.into_owned());
            branch
                .iter()
                .any(|q| q.predicate == SH.node_kind && q.object == iri)
        }
    }
}

/// Index of the first branch in `branches` that `value` satisfies.
///
/// * literals match on `sh:datatype` only,
/// * typed nodes match a `sh:node` whose shape targets one of their types, or a
///   `sh:class` equal to one of their types,
/// * untyped nodes match a branch declaring `sh:nodeKind sh:IRI`.
///
/// Branches without any of these constraints never match.
pub fn resolve_property_branch(
    branches: &[Term],
    value: &Term,
    ctx: &FormContext,
) -> Option<usize> {
    let value_types = match value {
        Term::Literal(_) => Vec::new(),
        _ => ctx.store.types(value),
    };
    branches.iter().position(|branch| {
        let quads = ctx.store.quads(Some(branch), None, None, None);
        property_branch_matches(ctx, &quads, value, &value_types)
    })
}

/// Like [`resolve_property_branch`], but writes the diagnostic line when nothing matches.
pub fn select_property_branch(
    branches: &[Term],
    value: &Term,
    ctx: &FormContext,
) -> Option<usize> {
    let index = resolve_property_branch(branches, value, ctx);
    match index {
        Some(i) => debug!("resolved {} to branch {} ({})", value, i, branches[i]),
        None => error!(
            "couldn't resolve sh:or/sh:xone on property for value {}",
            value
        ),
    }
    index
}

/// Resolves a property-level `sh:or` / `sh:xone` for `value`.
///
/// Returns the triples of the matching branch, or an empty vector (after one
/// diagnostic line) when no branch matches.
pub fn resolve_or_on_property(branches: &[Term], value: &Term, ctx: &FormContext) -> Vec<Quad> {
    select_property_branch(branches, value, ctx)
        .map(|i| ctx.store.quads(Some(&branches[i]), None, None, None))
        .unwrap_or_default()
}

/// The property shapes referenced by a node-level branch through `sh:property`.
/// A branch without `sh:property` but with its own `sh:path` is a group of one.
pub fn branch_property_shapes(branch: &Term, ctx: &FormContext) -> Vec<Term> {
    let shapes = ctx.store.objects(branch, SH.property, None);
    if shapes.is_empty() && ctx.store.count(Some(branch), Some(SH.path), None, None) > 0 {
        return vec![branch.clone()];
    }
    shapes
}

/// Number of referenced property paths of `branch` populated for `subject`.
fn populated_paths(branch: &Term, subject: &Term, ctx: &FormContext) -> usize {
    branch_property_shapes(branch, ctx)
        .iter()
        .filter_map(|shape| Path::from_shape(&ctx.store, shape))
        .filter(|path| path.is_populated(&ctx.store, subject))
        .count()
}

/// Every node-level branch index whose referenced property paths are populated
/// for `subject`, in declaration order.
pub fn matching_node_branches(branches: &[Term], subject: &Term, ctx: &FormContext) -> Vec<usize> {
    branches
        .iter()
        .enumerate()
        .filter(|(_, branch)| populated_paths(branch, subject, ctx) > 0)
        .map(|(i, _)| i)
        .collect()
}

/// Index of the node-level branch that `subject` populates, chosen with `policy`.
pub fn resolve_node_branch(
    branches: &[Term],
    subject: &Term,
    ctx: &FormContext,
    policy: NodeMatchPolicy,
) -> Option<usize> {
    match policy {
        NodeMatchPolicy::FirstMatch => branches
            .iter()
            .position(|branch| populated_paths(branch, subject, ctx) > 0),
        NodeMatchPolicy::MostPopulated => {
            let mut best: Option<(usize, usize)> = None;
            for (i, branch) in branches.iter().enumerate() {
                let count = populated_paths(branch, subject, ctx);
                if count > 0 && best.is_none_or(|(_, c)| count > c) {
                    best = Some((i, count));
                }
            }
            best.map(|(i, _)| i)
        }
    }
}

/// Resolves a node-level `sh:or` / `sh:xone` for the data subject `subject`.
///
/// Returns the property shapes of the matching branch, or an empty vector
/// (after one diagnostic line) when no branch has a populated path.
pub fn resolve_or_on_node(branches: &[Term], subject: &Term, ctx: &FormContext) -> Vec<Term> {
    select_node_branch(branches, subject, ctx)
        .map(|i| branch_property_shapes(&branches[i], ctx))
        .unwrap_or_default()
}

/// Applies the configured [`NodeMatchPolicy`] and writes the diagnostic line when
/// nothing matches.
pub fn select_node_branch(branches: &[Term], subject: &Term, ctx: &FormContext) -> Option<usize> {
    let index = resolve_node_branch(branches, subject, ctx, ctx.config.node_match);
    if index.is_none() {
        error!("couldn't resolve sh:or/sh:xone on node for value {}", subject);
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DATA_GRAPH, SHAPES_GRAPH};
    use oxigraph::model::{BlankNode, Literal, NamedNode};
    use oxigraph::model::vocab::xsd;
    use std::cell::RefCell;

    thread_local! {
        static LINES: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
    }

    /// Keeps `error!` lines per thread so parallel tests do not see each other's.
    struct Capture;

    impl log::Log for Capture {
        fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
            metadata.level() <= log::Level::Error
        }

        fn log(&self, record: &log::Record<'_>) {
            if self.enabled(record.metadata()) {
                LINES.with(|lines| lines.borrow_mut().push(record.args().to_string()));
            }
        }

        fn flush(&self) {}
    }

    static CAPTURE: Capture = Capture;

    fn logged<R>(f: impl FnOnce() -> R) -> (R, Vec<String>) {
        let _ = log::set_logger(&CAPTURE);
        log::set_max_level(log::LevelFilter::Error);
        LINES.with(|lines| lines.borrow_mut().clear());
        let out = f();
        let lines = LINES.with(|lines| lines.borrow_mut().drain(..).collect());
        (out, lines)
    }

    const SHAPES: &str = r#"@prefix sh: <http://www.w3.org/ns/shacl#> .
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .
@prefix ex: <http://example.org/> .

ex:String sh:datatype xsd:string .
ex:Integer sh:datatype xsd:integer .
ex:OrgClass sh:class ex:Org .
ex:PersonClass sh:class ex:Person .
ex:PersonNode sh:node ex:PersonShape .
ex:PersonShape a sh:NodeShape ; sh:targetClass ex:Person .
ex:AnyIri sh:nodeKind sh:IRI .
ex:Malformed ex:whatever "nothing SHACL here" .

ex:Postal sh:property ex:StreetShape, ex:CityShape .
ex:StreetShape sh:path ex:street .
ex:CityShape sh:path ex:city .
ex:Geo sh:property ex:LatShape, ex:LonShape .
ex:LatShape sh:path ex:lat .
ex:LonShape sh:path ex:lon .
"#;

    const DATA: &str = r#"@prefix ex: <http://example.org/> .
ex:alice a ex:Person .
ex:acme a ex:Org .
ex:place1 ex:lat "1.0" ; ex:lon "2.0" .
ex:place2 ex:street "Main St" ; ex:lat "3.0" ; ex:lon "4.0" .
ex:place3 ex:elevation "12" .
"#;

    fn ctx() -> Result<FormContext, String> {
        let mut ctx = FormContext::default();
        ctx.store.load_turtle(SHAPES, SHAPES_GRAPH, None)?;
        ctx.store.load_turtle(DATA, DATA_GRAPH, None)?;
        Ok(ctx)
    }

    fn ex(local: &str) -> Term {
        NamedNode::new_unchecked(format!("http://example.org/{}", local)).into()
    }

    fn integer(v: &str) -> Term {
        Literal::new_typed_literal(v, xsd::INTEGER).into()
    }

    #[test]
    fn literal_matches_branch_with_its_datatype() -> Result<(), String> {
        let ctx = ctx()?;
        let branches = vec![ex("String"), ex("Integer")];
        let quads = resolve_or_on_property(&branches, &integer("5"), &ctx);
        assert_eq!(quads, ctx.store.quads(Some(&ex("Integer")), None, None, None));
        assert_eq!(resolve_property_branch(&branches, &integer("5"), &ctx), Some(1));
        Ok(())
    }

    #[test]
    fn literal_without_matching_datatype_resolves_to_nothing() -> Result<(), String> {
        let ctx = ctx()?;
        let branches = vec![ex("String"), ex("OrgClass"), ex("AnyIri")];
        let value: Term = Literal::new_typed_literal("true", xsd::BOOLEAN).into();
        assert!(resolve_or_on_property(&branches, &value, &ctx).is_empty());
        Ok(())
    }

    #[test]
    fn unresolved_disjunctions_write_one_diagnostic_line() -> Result<(), String> {
        let ctx = ctx()?;
        let value: Term = Literal::new_typed_literal("true", xsd::BOOLEAN).into();
        let branches = vec![ex("String"), ex("Integer")];
        let (quads, lines) = logged(|| resolve_or_on_property(&branches, &value, &ctx));
        assert!(quads.is_empty());
        assert_eq!(lines.len(), 1, "{:?}", lines);
        assert!(lines[0].contains("on property"));
        assert!(lines[0].contains("true"));

        let groups = vec![ex("Postal"), ex("Geo")];
        let (shapes, lines) = logged(|| resolve_or_on_node(&groups, &ex("place3"), &ctx));
        assert!(shapes.is_empty());
        assert_eq!(lines.len(), 1, "{:?}", lines);
        assert!(lines[0].contains("on node"));
        assert!(lines[0].contains("place3"));

        // a resolved value stays quiet
        let (_, lines) = logged(|| resolve_or_on_property(&branches, &integer("5"), &ctx));
        assert!(lines.is_empty());
        Ok(())
    }

    #[test]
    fn literals_never_match_class_or_node_kind() -> Result<(), String> {
        let ctx = ctx()?;
        let branches = vec![ex("PersonClass"), ex("AnyIri"), ex("String")];
        let value: Term = Literal::new_simple_literal("x").into();
        assert_eq!(resolve_property_branch(&branches, &value, &ctx), Some(2));
        Ok(())
    }

    #[test]
    fn typed_node_matches_class_branch() -> Result<(), String> {
        let ctx = ctx()?;
        let branches = vec![ex("OrgClass"), ex("PersonClass")];
        let quads = resolve_or_on_property(&branches, &ex("alice"), &ctx);
        assert_eq!(quads, ctx.store.quads(Some(&ex("PersonClass")), None, None, None));
        assert_eq!(resolve_property_branch(&branches, &ex("acme"), &ctx), Some(0));
        Ok(())
    }

    #[test]
    fn typed_node_matches_node_branch_via_target_class() -> Result<(), String> {
        let ctx = ctx()?;
        let branches = vec![ex("OrgClass"), ex("PersonNode")];
        assert_eq!(resolve_property_branch(&branches, &ex("alice"), &ctx), Some(1));
        Ok(())
    }

    #[test]
    fn first_of_overlapping_branches_wins() -> Result<(), String> {
        let ctx = ctx()?;
        let node_first = vec![ex("PersonNode"), ex("PersonClass")];
        let class_first = vec![ex("PersonClass"), ex("PersonNode")];
        assert_eq!(resolve_property_branch(&node_first, &ex("alice"), &ctx), Some(0));
        assert_eq!(resolve_property_branch(&class_first, &ex("alice"), &ctx), Some(0));
        // same input, same answer
        assert_eq!(
            resolve_property_branch(&node_first, &ex("alice"), &ctx),
            resolve_property_branch(&node_first, &ex("alice"), &ctx)
        );
        Ok(())
    }

    #[test]
    fn untyped_node_matches_iri_node_kind() -> Result<(), String> {
        let ctx = ctx()?;
        let value: Term = BlankNode::default().into();
        let branches = vec![ex("AnyIri"), ex("String")];
        assert_eq!(
            resolve_or_on_property(&branches, &value, &ctx),
            ctx.store.quads(Some(&ex("AnyIri")), None, None, None)
        );
        let without = vec![ex("String"), ex("PersonClass")];
        assert_eq!(resolve_property_branch(&without, &value, &ctx), None);
        Ok(())
    }

    #[test]
    fn typed_node_ignores_node_kind_branches() -> Result<(), String> {
        let ctx = ctx()?;
        let branches = vec![ex("AnyIri")];
        assert_eq!(resolve_property_branch(&branches, &ex("alice"), &ctx), None);
        Ok(())
    }

    #[test]
    fn malformed_branches_are_skipped() -> Result<(), String> {
        let ctx = ctx()?;
        let branches = vec![ex("Malformed"), ex("Integer")];
        assert_eq!(resolve_property_branch(&branches, &integer("1"), &ctx), Some(1));
        Ok(())
    }

    #[test]
    fn node_branch_with_populated_path_wins() -> Result<(), String> {
        let ctx = ctx()?;
        let branches = vec![ex("Postal"), ex("Geo")];
        let mut shapes = resolve_or_on_node(&branches, &ex("place1"), &ctx);
        shapes.sort_by_key(|t| t.to_string());
        assert_eq!(shapes, vec![ex("LatShape"), ex("LonShape")]);
        Ok(())
    }

    #[test]
    fn node_branch_without_populated_paths_resolves_to_nothing() -> Result<(), String> {
        let ctx = ctx()?;
        let branches = vec![ex("Postal"), ex("Geo")];
        assert!(resolve_or_on_node(&branches, &ex("place3"), &ctx).is_empty());
        assert!(matching_node_branches(&branches, &ex("place3"), &ctx).is_empty());
        Ok(())
    }

    #[test]
    fn property_shape_branches_are_their_own_group() -> Result<(), String> {
        let ctx = ctx()?;
        let branches = vec![ex("StreetShape"), ex("LatShape")];
        assert_eq!(resolve_or_on_node(&branches, &ex("place1"), &ctx), vec![ex("LatShape")]);
        Ok(())
    }

    #[test]
    fn node_ties_are_observable_and_policy_driven() -> Result<(), String> {
        let ctx = ctx()?;
        let branches = vec![ex("Postal"), ex("Geo")];
        let subject = ex("place2");
        assert_eq!(matching_node_branches(&branches, &subject, &ctx), vec![0, 1]);
        assert_eq!(
            resolve_node_branch(&branches, &subject, &ctx, NodeMatchPolicy::FirstMatch),
            Some(0)
        );
        assert_eq!(
            resolve_node_branch(&branches, &subject, &ctx, NodeMatchPolicy::MostPopulated),
            Some(1)
        );
        Ok(())
    }
}

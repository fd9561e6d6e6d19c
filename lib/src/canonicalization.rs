use oxigraph::model::{Graph, NamedNode, Term};
use petgraph::algo::is_isomorphic_matching;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

/// Converts an `oxigraph::model::Graph` to a `petgraph::graph::DiGraph`.
///
/// Each unique subject and object becomes a node, each triple a directed edge
/// from subject to object weighted by its predicate.
pub fn to_petgraph(graph: &Graph) -> DiGraph<Term, NamedNode> {
    let mut pg = DiGraph::<Term, NamedNode>::new();
    let mut node_map = HashMap::<Term, NodeIndex>::new();

    for triple in graph.iter() {
        let subject = Term::from(triple.subject.into_owned());
        let object = triple.object.into_owned();
        let predicate = triple.predicate.into_owned();

        let s = *node_map
            .entry(subject.clone())
            .or_insert_with(|| pg.add_node(subject));
        let o = *node_map
            .entry(object.clone())
            .or_insert_with(|| pg.add_node(object));

        pg.add_edge(s, o, predicate);
    }

    pg
}

/// Checks whether two graphs are the same up to blank node renaming.
///
/// IRIs and literals must match exactly; any blank node may stand in for any
/// other as long as the edges around them line up.
pub fn are_isomorphic(g1: &Graph, g2: &Graph) -> bool {
    if g1.len() != g2.len() {
        return false;
    }
    let pg1 = to_petgraph(g1);
    let pg2 = to_petgraph(g2);

    is_isomorphic_matching(
        &pg1,
        &pg2,
        |n1, n2| match (n1, n2) {
            (Term::BlankNode(_), Term::BlankNode(_)) => true,
            _ => n1 == n2,
        },
        |e1, e2| e1 == e2,
    )
}

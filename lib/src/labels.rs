//! Human-readable labels for shapes, branches and groups.
use crate::named_nodes::{SH, SKOS_PREF_LABEL};
use oxigraph::model::vocab::rdfs;
use oxigraph::model::{NamedNodeRef, Quad, Term};
use std::collections::BTreeMap;

/// Picks the best literal among `candidates`: the earliest entry of
/// `languages`, then an untagged literal, then whatever comes first.
fn pick_by_language<'a>(candidates: &[&'a Term], languages: &[String]) -> Option<&'a str> {
    let literal = |t: &&'a Term| match *t {
        Term::Literal(l) => Some(l),
        _ => None,
    };
    for lang in languages {
        if let Some(l) = candidates
            .iter()
            .filter_map(literal)
            .find(|l| l.language().is_some_and(|tag| tag.eq_ignore_ascii_case(lang)))
        {
            return Some(l.value());
        }
    }
    if let Some(l) = candidates
        .iter()
        .filter_map(literal)
        .find(|l| l.language().is_none())
    {
        return Some(l.value());
    }
    candidates.iter().filter_map(literal).next().map(|l| l.value())
}

/// Value of `predicate` among `quads`, honouring the language preference.
pub fn find_object_value(
    quads: &[Quad],
    predicate: NamedNodeRef<'_>,
    languages: &[String],
) -> Option<String> {
    let candidates: Vec<&Term> = quads
        .iter()
        .filter(|q| q.predicate == predicate)
        .map(|q| &q.object)
        .collect();
    pick_by_language(&candidates, languages).map(str::to_string)
}

/// Looks for `sh:name`, then `rdfs:label`, then `skos:prefLabel`.
pub fn find_label(quads: &[Quad], languages: &[String]) -> Option<String> {
    [SH.name, rdfs::LABEL, SKOS_PREF_LABEL]
        .into_iter()
        .find_map(|p| find_object_value(quads, p, languages))
}

/// Shortens `iri` to `prefix:local` using the longest matching namespace.
pub fn remove_prefixes(iri: &str, prefixes: &BTreeMap<String, String>) -> String {
    prefixes
        .iter()
        .filter(|(_, ns)| !ns.is_empty() && iri.starts_with(ns.as_str()))
        .max_by_key(|(_, ns)| ns.len())
        .map(|(name, ns)| format!("{}:{}", name, &iri[ns.len()..]))
        .unwrap_or_else(|| iri.to_string())
}

/// The lexical value of a term: the IRI, the blank node id or the literal value.
pub fn term_value(term: &Term) -> String {
    match term {
        Term::NamedNode(nn) => nn.as_str().to_string(),
        Term::BlankNode(bn) => bn.as_str().to_string(),
        Term::Literal(l) => l.value().to_string(),
        #[allow(unreachable_patterns)]
        other => other.to_string(),
    }
}

/// Last segment of an IRI, used when a shape or property carries no label.
pub fn local_name(iri: &str) -> &str {
    iri.rsplit(|c| c == '#' || c == '/')
        .find(|s| !s.is_empty())
        .unwrap_or(iri)
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxigraph::model::{GraphName, Literal, NamedNode};

    fn label_quad(object: Literal) -> Quad {
        Quad::new(
            NamedNode::new_unchecked("http://example.org/s"),
            rdfs::LABEL,
            object,
            GraphName::DefaultGraph,
        )
    }

    #[test]
    fn prefers_requested_language_then_untagged() {
        let quads = vec![
            label_quad(Literal::new_language_tagged_literal_unchecked("Nom", "fr")),
            label_quad(Literal::new_simple_literal("Name")),
            label_quad(Literal::new_language_tagged_literal_unchecked("Name (en)", "en")),
        ];
        assert_eq!(find_label(&quads, &["fr".to_string()]).as_deref(), Some("Nom"));
        assert_eq!(find_label(&quads, &["de".to_string()]).as_deref(), Some("Name"));
        assert_eq!(find_label(&quads, &[]).as_deref(), Some("Name"));
    }

    #[test]
    fn sh_name_wins_over_rdfs_label() {
        let mut quads = vec![label_quad(Literal::new_simple_literal("label"))];
        quads.push(Quad::new(
            NamedNode::new_unchecked("http://example.org/s"),
            SH.name,
            Literal::new_simple_literal("name"),
            GraphName::DefaultGraph,
        ));
        assert_eq!(find_label(&quads, &[]).as_deref(), Some("name"));
    }

    #[test]
    fn shortens_with_longest_namespace() {
        let mut prefixes = BTreeMap::new();
        prefixes.insert("ex".to_string(), "http://example.org/".to_string());
        prefixes.insert("exv".to_string(), "http://example.org/vocab#".to_string());
        assert_eq!(remove_prefixes("http://example.org/vocab#name", &prefixes), "exv:name");
        assert_eq!(remove_prefixes("http://example.org/a", &prefixes), "ex:a");
        assert_eq!(remove_prefixes("urn:x", &prefixes), "urn:x");
    }

    #[test]
    fn local_names() {
        assert_eq!(local_name("http://example.org/vocab#name"), "name");
        assert_eq!(local_name("http://example.org/Person/"), "Person");
    }
}

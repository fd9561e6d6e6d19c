use crate::named_nodes::SH;
use crate::store::QuadStore;
use oxigraph::model::vocab::xsd;
use oxigraph::model::{NamedNode, NamedNodeRef, NamedOrBlankNode, Quad, Term, TermRef, Triple};
use oxsdatatypes::{Boolean, Date, DateTime, Decimal, Double, Float, Integer};
use std::fmt;
use std::str::FromStr;

/// Checks that `value` is a valid lexical form of `datatype`. Datatypes without a
/// known lexical space are accepted as-is.
pub fn check_lexical_form(value: &str, datatype: NamedNodeRef<'_>) -> Result<(), String> {
    fn parse<T: FromStr>(value: &str) -> Result<(), String>
    where
        T::Err: fmt::Display,
    {
        T::from_str(value).map(|_| ()).map_err(|e| e.to_string())
    }
    let result = if datatype == xsd::INTEGER {
        parse::<Integer>(value)
    } else if datatype == xsd::DECIMAL {
        parse::<Decimal>(value)
    } else if datatype == xsd::DOUBLE {
        parse::<Double>(value)
    } else if datatype == xsd::FLOAT {
        parse::<Float>(value)
    } else if datatype == xsd::BOOLEAN {
        parse::<Boolean>(value)
    } else if datatype == xsd::DATE {
        parse::<Date>(value)
    } else if datatype == xsd::DATE_TIME {
        parse::<DateTime>(value)
    } else {
        Ok(())
    };
    result.map_err(|e| format!("\"{}\" is not a valid {}: {}", value, datatype, e))
}

/// The property paths the form can both read and write.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Path {
    /// A predicate IRI.
    Predicate(NamedNode),
    /// `sh:inversePath` over a predicate IRI.
    Inverse(NamedNode),
}

impl Path {
    /// Reads the path declared by `sh:path` on `shape`. Sequence, alternative and
    /// repetition paths are not editable and yield `None`.
    pub fn from_shape(store: &QuadStore, shape: &Term) -> Option<Self> {
        let path = store.object(shape, SH.path, None)?;
        Self::from_term(store, &path)
    }

    pub fn from_term(store: &QuadStore, term: &Term) -> Option<Self> {
        match term {
            Term::NamedNode(nn) => Some(Path::Predicate(nn.clone())),
            Term::BlankNode(_) => match store.object(term, SH.inverse_path, None) {
                Some(Term::NamedNode(nn)) => Some(Path::Inverse(nn)),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn predicate(&self) -> NamedNodeRef<'_> {
        match self {
            Path::Predicate(p) | Path::Inverse(p) => p.as_ref(),
        }
    }

    /// Values reachable from `focus` along this path, across all graphs.
    pub fn values(&self, store: &QuadStore, focus: &Term) -> Vec<Term> {
        match self {
            Path::Predicate(p) => store.objects(focus, p.as_ref(), None),
            Path::Inverse(p) => store.subjects(p.as_ref(), focus, None),
        }
    }

    /// True if `focus` has at least one triple along this path.
    pub fn is_populated(&self, store: &QuadStore, focus: &Term) -> bool {
        match self {
            Path::Predicate(p) => store.count(Some(focus), Some(p.as_ref()), None, None) > 0,
            Path::Inverse(p) => store.count(None, Some(p.as_ref()), Some(focus), None) > 0,
        }
    }

    /// The triple linking `focus` to `value` along this path, if it can be expressed.
    pub fn triple(&self, focus: &NamedOrBlankNode, value: &Term) -> Option<Triple> {
        match self {
            Path::Predicate(p) => Some(Triple::new(focus.clone(), p.clone(), value.clone())),
            Path::Inverse(p) => {
                let subject = crate::store::as_subject(value)?;
                Some(Triple::new(subject, p.clone(), Term::from(focus.clone())))
            }
        }
    }

    /// The term to emit as `sh:resultPath`. Inverse paths are rendered as a
    /// fresh blank node carrying `sh:inversePath`, appended to `extra`.
    pub fn to_term(&self, extra: &mut Vec<Quad>) -> Term {
        match self {
            Path::Predicate(p) => p.clone().into(),
            Path::Inverse(p) => {
                let bn = oxigraph::model::BlankNode::default();
                extra.push(Quad::new(
                    bn.clone(),
                    SH.inverse_path,
                    p.clone(),
                    oxigraph::model::GraphName::DefaultGraph,
                ));
                bn.into()
            }
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Path::Predicate(p) => write!(f, "{}", p),
            Path::Inverse(p) => write!(f, "^{}", p),
        }
    }
}

/// `sh:nodeKind` values.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Iri,
    BlankNode,
    Literal,
    BlankNodeOrIri,
    BlankNodeOrLiteral,
    IriOrLiteral,
}

impl NodeKind {
    pub fn from_term(term: &Term) -> Option<Self> {
        let Term::NamedNode(nn) = term else {
            return None;
        };
        let nn = nn.as_ref();
        if nn == SH.iri {
            Some(NodeKind::Iri)
        } else if nn == SH.blank_node {
            Some(NodeKind::BlankNode)
        } else if nn == SH.literal {
            Some(NodeKind::Literal)
        } else if nn == SH.blank_node_or_iri {
            Some(NodeKind::BlankNodeOrIri)
        } else if nn == SH.blank_node_or_literal {
            Some(NodeKind::BlankNodeOrLiteral)
        } else if nn == SH.iri_or_literal {
            Some(NodeKind::IriOrLiteral)
        } else {
            None
        }
    }

    pub fn matches(&self, term: TermRef<'_>) -> bool {
        let (iri, blank, literal) = match term {
            TermRef::NamedNode(_) => (true, false, false),
            TermRef::BlankNode(_) => (false, true, false),
            TermRef::Literal(_) => (false, false, true),
            #[allow(unreachable_patterns)]
            _ => (false, false, false),
        };
        match self {
            NodeKind::Iri => iri,
            NodeKind::BlankNode => blank,
            NodeKind::Literal => literal,
            NodeKind::BlankNodeOrIri => blank || iri,
            NodeKind::BlankNodeOrLiteral => blank || literal,
            NodeKind::IriOrLiteral => iri || literal,
        }
    }
}

/// Which disjunction constraint an alternative set comes from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Disjunction {
    /// `sh:or`: at least one branch must hold.
    Or,
    /// `sh:xone`: exactly one branch must hold.
    Xone,
}

impl Disjunction {
    pub fn predicate(&self) -> NamedNodeRef<'static> {
        match self {
            Disjunction::Or => SH.or,
            Disjunction::Xone => SH.xone,
        }
    }
}

impl fmt::Display for Disjunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disjunction::Or => write!(f, "sh:or"),
            Disjunction::Xone => write!(f, "sh:xone"),
        }
    }
}

/// Represents the severity level of a validation result, corresponding to `sh:severity`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Severity {
    /// Corresponds to `sh:Info`.
    Info,
    /// Corresponds to `sh:Warning`.
    Warning,
    /// Corresponds to `sh:Violation`.
    #[default]
    Violation,
}

impl Severity {
    /// Creates a `Severity` from a `Term` if it matches a SHACL severity IRI.
    pub fn from_term(term: &Term) -> Option<Self> {
        if let Term::NamedNode(nn) = term {
            if *nn == SH.info {
                Some(Severity::Info)
            } else if *nn == SH.warning {
                Some(Severity::Warning)
            } else if *nn == SH.violation {
                Some(Severity::Violation)
            } else {
                None
            }
        } else {
            None
        }
    }

    pub fn to_named_node(&self) -> NamedNodeRef<'static> {
        match self {
            Severity::Info => SH.info,
            Severity::Warning => SH.warning,
            Severity::Violation => SH.violation,
        }
    }
}

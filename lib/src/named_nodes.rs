use oxigraph::model::NamedNodeRef;

/// SHACL vocabulary terms used by the form builder, the resolver and the core engine.
pub struct SHACL {
    pub node_shape: NamedNodeRef<'static>,
    pub property_shape: NamedNodeRef<'static>,
    pub property: NamedNodeRef<'static>,
    pub path: NamedNodeRef<'static>,
    pub inverse_path: NamedNodeRef<'static>,
    pub node: NamedNodeRef<'static>,
    pub class: NamedNodeRef<'static>,
    pub datatype: NamedNodeRef<'static>,
    pub node_kind: NamedNodeRef<'static>,
    pub min_count: NamedNodeRef<'static>,
    pub max_count: NamedNodeRef<'static>,
    pub min_length: NamedNodeRef<'static>,
    pub max_length: NamedNodeRef<'static>,
    pub pattern: NamedNodeRef<'static>,
    pub flags: NamedNodeRef<'static>,
    pub in_: NamedNodeRef<'static>,
    pub has_value: NamedNodeRef<'static>,
    pub default_value: NamedNodeRef<'static>,
    pub or: NamedNodeRef<'static>,
    pub xone: NamedNodeRef<'static>,
    pub and: NamedNodeRef<'static>,
    pub not: NamedNodeRef<'static>,
    pub name: NamedNodeRef<'static>,
    pub description: NamedNodeRef<'static>,
    pub order: NamedNodeRef<'static>,
    pub group: NamedNodeRef<'static>,
    pub message: NamedNodeRef<'static>,
    pub severity: NamedNodeRef<'static>,
    pub deactivated: NamedNodeRef<'static>,
    pub target_class: NamedNodeRef<'static>,
    pub target_node: NamedNodeRef<'static>,

    pub iri: NamedNodeRef<'static>,
    pub blank_node: NamedNodeRef<'static>,
    pub literal: NamedNodeRef<'static>,
    pub blank_node_or_iri: NamedNodeRef<'static>,
    pub blank_node_or_literal: NamedNodeRef<'static>,
    pub iri_or_literal: NamedNodeRef<'static>,

    pub info: NamedNodeRef<'static>,
    pub warning: NamedNodeRef<'static>,
    pub violation: NamedNodeRef<'static>,

    pub validation_report: NamedNodeRef<'static>,
    pub validation_result: NamedNodeRef<'static>,
    pub conforms: NamedNodeRef<'static>,
    pub result: NamedNodeRef<'static>,
    pub focus_node: NamedNodeRef<'static>,
    pub result_path: NamedNodeRef<'static>,
    pub value: NamedNodeRef<'static>,
    pub result_message: NamedNodeRef<'static>,
    pub result_severity: NamedNodeRef<'static>,
    pub source_shape: NamedNodeRef<'static>,
    pub source_constraint_component: NamedNodeRef<'static>,

    pub min_count_component: NamedNodeRef<'static>,
    pub max_count_component: NamedNodeRef<'static>,
    pub datatype_component: NamedNodeRef<'static>,
    pub class_component: NamedNodeRef<'static>,
    pub node_kind_component: NamedNodeRef<'static>,
    pub pattern_component: NamedNodeRef<'static>,
    pub min_length_component: NamedNodeRef<'static>,
    pub max_length_component: NamedNodeRef<'static>,
    pub in_component: NamedNodeRef<'static>,
    pub has_value_component: NamedNodeRef<'static>,
    pub node_component: NamedNodeRef<'static>,
    pub or_component: NamedNodeRef<'static>,
    pub xone_component: NamedNodeRef<'static>,
    pub and_component: NamedNodeRef<'static>,
    pub not_component: NamedNodeRef<'static>,
}

pub const PREFIX_SHACL: &str = "http://www.w3.org/ns/shacl#";

macro_rules! sh {
    ($local:literal) => {
        NamedNodeRef::new_unchecked(concat!("http://www.w3.org/ns/shacl#", $local))
    };
}

impl SHACL {
    pub const fn new() -> Self {
        SHACL {
            node_shape: sh!("NodeShape"),
            property_shape: sh!("PropertyShape"),
            property: sh!("property"),
            path: sh!("path"),
            inverse_path: sh!("inversePath"),
            node: sh!("node"),
            class: sh!("class"),
            datatype: sh!("datatype"),
            node_kind: sh!("nodeKind"),
            min_count: sh!("minCount"),
            max_count: sh!("maxCount"),
            min_length: sh!("minLength"),
            max_length: sh!("maxLength"),
            pattern: sh!("pattern"),
            flags: sh!("flags"),
            in_: sh!("in"),
            has_value: sh!("hasValue"),
            default_value: sh!("defaultValue"),
            or: sh!("or"),
            xone: sh!("xone"),
            and: sh!("and"),
            not: sh!("not"),
            name: sh!("name"),
            description: sh!("description"),
            order: sh!("order"),
            group: sh!("group"),
            message: sh!("message"),
            severity: sh!("severity"),
            deactivated: sh!("deactivated"),
            target_class: sh!("targetClass"),
            target_node: sh!("targetNode"),

            iri: sh!("IRI"),
            blank_node: sh!("BlankNode"),
            literal: sh!("Literal"),
            blank_node_or_iri: sh!("BlankNodeOrIRI"),
            blank_node_or_literal: sh!("BlankNodeOrLiteral"),
            iri_or_literal: sh!("IRIOrLiteral"),

            info: sh!("Info"),
            warning: sh!("Warning"),
            violation: sh!("Violation"),

            validation_report: sh!("ValidationReport"),
            validation_result: sh!("ValidationResult"),
            conforms: sh!("conforms"),
            result: sh!("result"),
            focus_node: sh!("focusNode"),
            result_path: sh!("resultPath"),
            value: sh!("value"),
            result_message: sh!("resultMessage"),
            result_severity: sh!("resultSeverity"),
            source_shape: sh!("sourceShape"),
            source_constraint_component: sh!("sourceConstraintComponent"),

            min_count_component: sh!("MinCountConstraintComponent"),
            max_count_component: sh!("MaxCountConstraintComponent"),
            datatype_component: sh!("DatatypeConstraintComponent"),
            class_component: sh!("ClassConstraintComponent"),
            node_kind_component: sh!("NodeKindConstraintComponent"),
            pattern_component: sh!("PatternConstraintComponent"),
            min_length_component: sh!("MinLengthConstraintComponent"),
            max_length_component: sh!("MaxLengthConstraintComponent"),
            in_component: sh!("InConstraintComponent"),
            has_value_component: sh!("HasValueConstraintComponent"),
            node_component: sh!("NodeConstraintComponent"),
            or_component: sh!("OrConstraintComponent"),
            xone_component: sh!("XoneConstraintComponent"),
            and_component: sh!("AndConstraintComponent"),
            not_component: sh!("NotConstraintComponent"),
        }
    }
}

impl Default for SHACL {
    fn default() -> Self {
        Self::new()
    }
}

pub const SH: SHACL = SHACL::new();

pub const DCTERMS_CONFORMS_TO: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("http://purl.org/dc/terms/conformsTo");
pub const SKOS_PREF_LABEL: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2004/02/skos/core#prefLabel");
pub const PREFIX_RDFS: &str = "http://www.w3.org/2000/01/rdf-schema#";

use oxigraph::io::RdfFormat;
use oxigraph::model::{NamedNode, Term};
use shacl_form::canonicalization::are_isomorphic;
use shacl_form::labels::term_value;
use shacl_form::{FormConfig, ShaclForm};
use std::error::Error;
use std::path::PathBuf;

fn data_file(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

fn ex(local: &str) -> NamedNode {
    NamedNode::new_unchecked(format!("http://example.org/{}", local))
}

fn alice_form(config: FormConfig) -> Result<ShaclForm, Box<dyn Error>> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut form = ShaclForm::from_files(
        &data_file("person_shapes.ttl"),
        Some(&data_file("person_data.ttl")),
        config.with_values_subject(ex("alice")),
    )?;
    form.initialize()?;
    Ok(form)
}

#[test]
fn existing_data_fills_the_form() -> Result<(), Box<dyn Error>> {
    let form = alice_form(FormConfig::default())?;
    let node = &form.nodes()[0];
    assert_eq!(node.label(), "Person");

    let address = node.property(ex("address").as_ref()).ok_or("address")?;
    let nested = address.instances()[0].as_node().ok_or("address node")?;
    let city = nested.property(ex("city").as_ref()).ok_or("city")?;
    let city = city.instances()[0].as_value().and_then(|s| s.value()).ok_or("city value")?;
    assert_eq!(term_value(city), "Paris");

    let contact = node.property(ex("contact").as_ref()).ok_or("contact")?;
    let choice = contact.instances()[0].as_alternatives().ok_or("contact choice")?;
    assert_eq!(choice.labels(), vec!["Phone", "Website"]);
    assert_eq!(choice.selected(), Some(1));

    assert!(form.report().is_some_and(|r| r.conforms()));
    Ok(())
}

#[test]
fn serialized_values_load_back_into_the_same_form() -> Result<(), Box<dyn Error>> {
    let mut form = alice_form(FormConfig::default())?;
    form.set_value(0, ex("birthDate").as_ref(), 0, "1991-03-04")?;
    assert!(form.has_changes());
    let turtle = form.serialize(RdfFormat::Turtle)?;

    let mut reloaded = ShaclForm::new(FormConfig::default().with_values_subject(ex("alice")));
    let shapes = std::fs::read_to_string(data_file("person_shapes.ttl"))?;
    reloaded.load_shapes(&shapes, None)?;
    reloaded.load_data(&turtle, None)?;
    reloaded.initialize()?;

    assert!(are_isomorphic(&form.to_rdf(), &reloaded.to_rdf()));
    assert!(!reloaded.has_changes());
    Ok(())
}

#[test]
fn invalid_edits_are_rejected_or_reported() -> Result<(), Box<dyn Error>> {
    let mut form = alice_form(FormConfig::default())?;
    assert!(form
        .set_value(0, ex("birthDate").as_ref(), 0, "yesterday")
        .is_err());

    form.set_value(0, ex("name").as_ref(), 0, "")?;
    assert!(form.validate(true).conforms());
    let report = form.validate(false);
    assert!(!report.conforms());
    let alice = Term::from(ex("alice"));
    let missing: Vec<_> = report.results_for(&alice, None).collect();
    assert_eq!(missing.len(), 1);
    assert!(missing[0].is_min_count());
    assert!(report.to_turtle()?.contains("MinCountConstraintComponent"));
    Ok(())
}

#[test]
fn groups_use_the_preferred_language() -> Result<(), Box<dyn Error>> {
    let form = alice_form(FormConfig::default().with_languages(["de"]))?;
    let node = &form.nodes()[0];
    let sections = node.sections(form.context());
    let group = sections
        .iter()
        .find_map(|s| s.group.as_ref())
        .ok_or("no group")?;
    assert_eq!(group.label, "Grundlagen");
    let labels: Vec<&str> = sections
        .iter()
        .filter(|s| s.group.is_some())
        .flat_map(|s| s.properties.iter().map(|p| p.label()))
        .collect();
    assert_eq!(labels, vec!["Name", "Geburtsdatum"]);
    Ok(())
}

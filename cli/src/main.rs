use clap::{Parser, ValueEnum};
use env_logger;
use log::info;
use oxigraph::io::RdfFormat;
use oxigraph::model::{NamedNode, Term};
use shacl_form::named_nodes::SH;
use shacl_form::resolver::{matching_node_branches, select_node_branch, select_property_branch};
use shacl_form::types::{Disjunction, Path};
use shacl_form::{Collapse, FormConfig, NodeMatchPolicy, ShaclForm};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
enum NodeMatchArg {
    #[default]
    First,
    MostPopulated,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
enum CollapseArg {
    #[default]
    Never,
    Closed,
    Open,
}

#[derive(Parser, Debug)]
struct CommonArgs {
    /// Path to the shapes file
    #[arg(short, long, value_name = "FILE")]
    shapes_file: PathBuf,

    /// Path to a data file with values to edit
    #[arg(short, long, value_name = "FILE")]
    data_file: Option<PathBuf>,

    /// IRI of the data subject to load
    #[arg(long, value_name = "URI")]
    values_subject: Option<String>,

    /// IRI of the root node shape
    #[arg(long, value_name = "URI")]
    shape_subject: Option<String>,

    /// Preferred label language; repeat for fallbacks
    #[arg(long = "lang", value_name = "TAG")]
    languages: Vec<String>,

    /// Render read-only: no empty editors, no validation
    #[arg(long)]
    view: bool,

    /// How node-level sh:or/sh:xone picks between several matching branches
    #[arg(long, value_enum, default_value_t = NodeMatchArg::First)]
    node_match: NodeMatchArg,

    /// How property groups are presented
    #[arg(long, value_enum, default_value_t = CollapseArg::Never)]
    collapse: CollapseArg,
}

#[derive(Parser)]
struct RenderArgs {
    #[clap(flatten)]
    common: CommonArgs,
}

#[derive(ValueEnum, Clone, Debug, Default)]
enum SerializeFormat {
    #[default]
    Turtle,
    NTriples,
    RdfXml,
}

#[derive(Parser)]
struct SerializeArgs {
    #[clap(flatten)]
    common: CommonArgs,

    /// The output format for the form values
    #[arg(long, value_enum, default_value_t = SerializeFormat::Turtle)]
    format: SerializeFormat,
}

#[derive(ValueEnum, Clone, Debug, Default)]
enum ValidateOutputFormat {
    #[default]
    Turtle,
    Dump,
    RdfXml,
    NTriples,
}

#[derive(Parser)]
struct ValidateArgs {
    #[clap(flatten)]
    common: CommonArgs,

    /// The output format for the validation report
    #[arg(long, value_enum, default_value_t = ValidateOutputFormat::Turtle)]
    format: ValidateOutputFormat,

    /// Leave out results about missing values (sh:minCount)
    #[arg(long)]
    ignore_empty: bool,
}

#[derive(Parser)]
struct ResolveArgs {
    #[clap(flatten)]
    common: CommonArgs,

    /// IRI of the data subject whose alternatives are resolved
    #[arg(long, value_name = "URI")]
    focus: String,

    /// IRI of the node shape declaring the alternatives
    #[arg(long, value_name = "URI")]
    shape: String,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Print an outline of the form built from the shapes and data
    Render(RenderArgs),
    /// Print the RDF the form would submit
    Serialize(SerializeArgs),
    /// Validate the form values against the shapes
    Validate(ValidateArgs),
    /// Show which sh:or/sh:xone branch each value of a subject resolves to
    Resolve(ResolveArgs),
}

fn parse_iri(iri: &str) -> Result<NamedNode, Box<dyn std::error::Error>> {
    NamedNode::new(iri).map_err(|e| format!("Invalid IRI {}: {}", iri, e).into())
}

fn get_form(common: &CommonArgs) -> Result<ShaclForm, Box<dyn std::error::Error>> {
    let mut config = FormConfig::default()
        .with_languages(common.languages.clone())
        .with_edit_mode(!common.view)
        .with_node_match(match common.node_match {
            NodeMatchArg::First => NodeMatchPolicy::FirstMatch,
            NodeMatchArg::MostPopulated => NodeMatchPolicy::MostPopulated,
        })
        .with_collapse(match common.collapse {
            CollapseArg::Never => Collapse::Never,
            CollapseArg::Closed => Collapse::Closed,
            CollapseArg::Open => Collapse::Open,
        });
    if let Some(subject) = &common.values_subject {
        config = config.with_values_subject(parse_iri(subject)?);
    }
    if let Some(shape) = &common.shape_subject {
        config = config.with_shape_subject(parse_iri(shape)?);
    }

    let mut form = ShaclForm::from_files(&common.shapes_file, common.data_file.as_deref(), config)
        .map_err(|e| format!("Error creating form: {}", e))?;
    form.initialize()?;
    Ok(form)
}

fn render(form: &ShaclForm) {
    for node in form.nodes() {
        print!("{}", node.outline());
        for section in node.sections(form.context()) {
            let Some(group) = section.group else {
                continue;
            };
            let marker = if group.is_open() { "-" } else { "+" };
            let labels: Vec<&str> = section.properties.iter().map(|p| p.label()).collect();
            println!("  [{}] {}: {}", marker, group.label, labels.join(", "));
        }
    }
}

fn resolve(form: &ShaclForm, focus: &Term, shape: &Term) {
    let ctx = form.context();
    let store = &ctx.store;
    for disjunction in [Disjunction::Or, Disjunction::Xone] {
        for head in store.objects(shape, disjunction.predicate(), None) {
            let branches = store.list(&head, None);
            let matching = matching_node_branches(&branches, focus, ctx);
            let selected = select_node_branch(&branches, focus, ctx);
            println!("{} on {} ({} branches)", disjunction, shape, branches.len());
            for (i, branch) in branches.iter().enumerate() {
                let mark = if selected == Some(i) {
                    "*"
                } else if matching.contains(&i) {
                    "+"
                } else {
                    " "
                };
                println!("  {} {}: {}", mark, i, branch);
            }
        }
    }

    for property in store.objects(shape, SH.property, None) {
        let Some(path) = Path::from_shape(store, &property) else {
            continue;
        };
        for disjunction in [Disjunction::Or, Disjunction::Xone] {
            for head in store.objects(&property, disjunction.predicate(), None) {
                let branches = store.list(&head, None);
                for value in path.values(store, focus) {
                    match select_property_branch(&branches, &value, ctx) {
                        Some(i) => println!("{} {} -> {}: {}", path, value, i, branches[i]),
                        None => println!("{} {} -> unresolved", path, value),
                    }
                }
            }
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Render(args) => {
            let form = get_form(&args.common)?;
            render(&form);
        }
        Commands::Serialize(args) => {
            let form = get_form(&args.common)?;
            let format = match args.format {
                SerializeFormat::Turtle => RdfFormat::Turtle,
                SerializeFormat::NTriples => RdfFormat::NTriples,
                SerializeFormat::RdfXml => RdfFormat::RdfXml,
            };
            println!("{}", form.serialize(format)?);
        }
        Commands::Validate(args) => {
            let mut form = get_form(&args.common)?;
            let report = form.validate(args.ignore_empty);
            info!("form conforms: {}", report.conforms());

            match args.format {
                ValidateOutputFormat::Turtle => {
                    let report_str = report.to_turtle()?;
                    println!("{}", report_str);
                }
                ValidateOutputFormat::Dump => {
                    report.dump();
                }
                ValidateOutputFormat::RdfXml => {
                    let report_str = report.to_rdf(RdfFormat::RdfXml)?;
                    println!("{}", report_str);
                }
                ValidateOutputFormat::NTriples => {
                    let report_str = report.to_rdf(RdfFormat::NTriples)?;
                    println!("{}", report_str);
                }
            }
        }
        Commands::Resolve(args) => {
            let form = get_form(&args.common)?;
            let focus = Term::from(parse_iri(&args.focus)?);
            let shape = Term::from(parse_iri(&args.shape)?);
            resolve(&form, &focus, &shape);
        }
    }
    Ok(())
}

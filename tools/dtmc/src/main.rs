use std::fs::File;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use log::info;
use log::warn;

use pmc_check::model_checking;
use pmc_io::LargeFormatter;
use pmc_model::Model;
use pmc_model::formula::PathFormula;
use pmc_model::formula::Property;
use pmc_model::formula::StateFormula;
use pmc_model::read_explicit;
use pmc_model::write_explicit;
use pmc_number::Value;
use pmc_number::parse_decimal;
use pmc_program::BuildOptions;
use pmc_program::Program;
use pmc_program::Scalar;
use pmc_program::build_model;
use pmc_program::build_parametric_model;
use pmc_program::case_studies;
use pmc_reduction::BisimulationType;
use pmc_reduction::Preserved;
use pmc_reduction::RefinementAlgorithm;
use pmc_reduction::compare_models;
use pmc_reduction::reduce_model;
use pmc_tools::Version;
use pmc_tools::VersionFlag;
use pmc_tools::verbosity::VerbosityFlag;
use pmc_utilities::PmcError;
use pmc_utilities::Timing;

#[derive(clap::Parser, Debug)]
#[command(
    about = "A command line tool for discrete-time Markov chains",
    arg_required_else_help = true
)]
struct Cli {
    #[command(flatten)]
    version: VersionFlag,

    #[command(flatten)]
    verbosity: VerbosityFlag,

    #[command(subcommand)]
    commands: Option<Commands>,

    #[arg(long, global = true)]
    timings: bool,
}

/// Defines the subcommands for this tool.
#[derive(Debug, Subcommand)]
enum Commands {
    Info(InfoArgs),
    Reduce(ReduceArgs),
    Compare(CompareArgs),
    Check(CheckArgs),
    Build(BuildArgs),
}

/// A DTMC in the explicit format, given by its transition and label files.
#[derive(clap::Args, Debug)]
struct ExplicitModel {
    /// The `.tra` file with the transitions.
    transitions: PathBuf,

    /// The `.lab` file with the state labels.
    labels: PathBuf,
}

#[derive(clap::Args, Debug)]
#[command(about = "Prints information related to the given DTMC")]
struct InfoArgs {
    #[command(flatten)]
    model: ExplicitModel,
}

#[derive(clap::Args, Debug)]
#[command(about = "Minimises the given DTMC modulo strong bisimulation")]
struct ReduceArgs {
    #[command(flatten)]
    model: ExplicitModel,

    #[arg(
        short,
        long,
        help = "List of labels that must be preserved, all labels are preserved when omitted",
        value_delimiter = ','
    )]
    preserve: Option<Vec<String>>,

    #[arg(long, value_enum, default_value_t = RefinementAlgorithm::Sigref)]
    algorithm: RefinementAlgorithm,

    #[arg(short, long, help = "Write the quotient to <OUTPUT>.tra and <OUTPUT>.lab")]
    output: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
#[command(about = "Checks whether the initial states of two DTMCs are strongly bisimilar")]
struct CompareArgs {
    left_transitions: PathBuf,
    left_labels: PathBuf,
    right_transitions: PathBuf,
    right_labels: PathBuf,

    #[arg(
        short,
        long,
        help = "List of labels that must be preserved",
        value_delimiter = ','
    )]
    preserve: Vec<String>,
}

#[derive(clap::Args, Debug)]
#[command(about = "Computes the probability of reaching the target label in the given DTMC")]
struct CheckArgs {
    #[command(flatten)]
    model: ExplicitModel,

    #[command(flatten)]
    query: QueryArgs,
}

#[derive(clap::Args, Debug)]
struct QueryArgs {
    #[arg(long, help = "The label of the states to reach")]
    target: Option<String>,

    #[arg(long, help = "Only consider paths through states with this label")]
    until: Option<String>,

    #[arg(long, help = "Compute the probability within the given number of steps")]
    bound: Option<usize>,

    #[arg(long, help = "Compute the expected reward of the given reward model instead")]
    reward: Option<String>,

    #[arg(long, help = "Minimise the model with respect to the query before checking it")]
    minimise: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CaseStudy {
    /// The crowds anonymity protocol.
    Crowds,
    /// The Knuth-Yao simulation of a die by coin flips.
    Die,
}

#[derive(clap::Args, Debug)]
#[command(about = "Builds the DTMC of one of the included case studies")]
struct BuildArgs {
    case_study: CaseStudy,

    #[arg(long, help = "Keep the probabilities symbolic in the undefined constants")]
    parametric: bool,

    #[arg(long, default_value_t = 3, help = "The number of protocol runs of the crowds protocol")]
    runs: i64,

    #[arg(long, default_value_t = 5, help = "The number of honest members of the crowd")]
    crowd_size: i64,

    #[arg(
        short,
        long,
        help = "Defines a constant as <NAME>=<VALUE>",
        value_parser = parse_constant
    )]
    constant: Vec<(String, Scalar)>,

    #[command(flatten)]
    query: QueryArgs,

    #[arg(short, long, help = "Write the model to <OUTPUT>.tra and <OUTPUT>.lab")]
    output: Option<PathBuf>,
}

fn main() -> Result<ExitCode, PmcError> {
    let cli = Cli::parse();
    cli.verbosity.init_logger();

    if cli.version.into() {
        eprintln!("{}", Version);
        return Ok(ExitCode::SUCCESS);
    }

    let mut timing = Timing::new();

    if let Some(command) = &cli.commands {
        match command {
            Commands::Info(args) => {
                handle_info(args, &mut timing)?;
            }
            Commands::Reduce(args) => {
                handle_reduce(args, &mut timing)?;
            }
            Commands::Compare(args) => {
                handle_compare(args, &mut timing)?;
            }
            Commands::Check(args) => {
                handle_check(args, &mut timing)?;
            }
            Commands::Build(args) => {
                handle_build(args, &mut timing)?;
            }
        }
    }

    if cli.timings {
        timing.print();
    }

    Ok(ExitCode::SUCCESS)
}

/// Display information about the given DTMC.
fn handle_info(args: &InfoArgs, timing: &mut Timing) -> Result<(), PmcError> {
    let model = read_model(&args.model.transitions, &args.model.labels, timing)?;
    println!("{}", model.metrics());
    Ok(())
}

/// Minimise the given DTMC and write the quotient in the explicit format.
fn handle_reduce(args: &ReduceArgs, timing: &mut Timing) -> Result<(), PmcError> {
    let model = read_model(&args.model.transitions, &args.model.labels, timing)?;

    let preserved = match &args.preserve {
        Some(labels) => Preserved::with_labels(labels.iter().map(String::as_str)),
        None => Preserved::all(&model),
    };

    let quotient = reduce_model(&model, &preserved, BisimulationType::Strong, args.algorithm, timing)?;
    println!(
        "Quotient has {} states and {} transitions.",
        LargeFormatter(quotient.model().num_of_states()),
        LargeFormatter(quotient.model().num_of_transitions())
    );

    if let Some(output) = &args.output {
        write_model(output, quotient.model(), timing)?;
    }

    Ok(())
}

/// Compares two DTMCs modulo strong bisimulation.
fn handle_compare(args: &CompareArgs, timing: &mut Timing) -> Result<(), PmcError> {
    let left = read_model(&args.left_transitions, &args.left_labels, timing)?;
    let right = read_model(&args.right_transitions, &args.right_labels, timing)?;

    let preserved = Preserved::with_labels(args.preserve.iter().map(String::as_str));
    if compare_models(&left, &right, &preserved, timing)? {
        println!("true");
    } else {
        println!("false");
    }

    Ok(())
}

/// Checks the query on the given DTMC.
fn handle_check(args: &CheckArgs, timing: &mut Timing) -> Result<(), PmcError> {
    let model = read_model(&args.model.transitions, &args.model.labels, timing)?;
    let property = args.query.property().ok_or("A target label must be given.")?;
    check_property(&model, &property, args.query.minimise, timing)
}

/// Builds one of the case studies, and optionally checks a query on it.
fn handle_build(args: &BuildArgs, timing: &mut Timing) -> Result<(), PmcError> {
    let program = match args.case_study {
        CaseStudy::Crowds => case_studies::crowds(args.runs, args.crowd_size, args.parametric),
        CaseStudy::Die => case_studies::knuth_yao_die(args.parametric),
    };

    let options = build_options(&program, args);

    let mut time_build = timing.start("build");
    if args.parametric {
        let model = build_parametric_model(&program, &options)?;
        time_build.finish();

        if args.output.is_some() {
            return Err("The explicit format cannot store parametric models.".into());
        }

        info!("Built parametric model with {} states", LargeFormatter(model.num_of_states()));
        if let Some(property) = args.query.property() {
            check_property(&model, &property, args.query.minimise, timing)?;
        } else {
            println!("{}", model.metrics());
        }
    } else {
        let model = build_model(&program, &options)?;
        time_build.finish();

        if let Some(output) = &args.output {
            write_model(output, &model, timing)?;
        }

        if let Some(property) = args.query.property() {
            check_property(&model, &property, args.query.minimise, timing)?;
        } else {
            println!("{}", model.metrics());
        }
    }

    Ok(())
}

/// Returns the build options for the given arguments. Only the labels and
/// reward structures of the query are built when a query is given.
fn build_options(program: &Program, args: &BuildArgs) -> BuildOptions {
    let mut options = match args.query.property() {
        Some(property) => BuildOptions::from_properties(&[property]),
        None => BuildOptions::default(),
    };

    for (name, value) in &args.constant {
        if program.constant(name).is_none() {
            warn!("The program does not declare the constant \"{name}\"");
        }
        options = options.with_constant(name, value.clone());
    }

    options
}

impl QueryArgs {
    /// Returns the property described by the query, or `None` when no target
    /// is given.
    fn property(&self) -> Option<Property> {
        let target = StateFormula::label(self.target.as_ref()?);

        if let Some(reward_model) = &self.reward {
            return Some(Property::reward(reward_model, target));
        }

        let path = match (&self.until, self.bound) {
            (None, None) => PathFormula::Eventually(target),
            (Some(label), None) => PathFormula::Until(StateFormula::label(label), target),
            (until, Some(bound)) => PathFormula::BoundedUntil(
                until.as_deref().map_or(StateFormula::True, StateFormula::label),
                target,
                bound,
            ),
        };

        Some(Property::Probability(path))
    }
}

/// Checks the property and prints its value in the initial states, after
/// minimising the model when requested.
fn check_property<V: Value>(
    model: &Model<V>,
    property: &Property,
    minimise: bool,
    timing: &mut Timing,
) -> Result<(), PmcError> {
    if minimise {
        let preserved = Preserved::from_properties(model, std::slice::from_ref(property));
        let quotient = reduce_model(
            model,
            &preserved,
            BisimulationType::Strong,
            RefinementAlgorithm::Sigref,
            timing,
        )?;

        let mut time_check = timing.start("check");
        let result = model_checking(quotient.model(), property)?;
        time_check.finish();

        for state_index in model.initial_states() {
            println!("{state_index}: {}", result.at(quotient.quotient_state(*state_index)));
        }
    } else {
        let mut time_check = timing.start("check");
        let result = model_checking(model, property)?;
        time_check.finish();

        for state_index in model.initial_states() {
            println!("{state_index}: {}", result.at(*state_index));
        }
    }

    Ok(())
}

fn read_model(transitions: &Path, labels: &Path, timing: &mut Timing) -> Result<Model<f64>, PmcError> {
    let mut time_read = timing.start("read");
    let model = read_explicit(File::open(transitions)?, File::open(labels)?)?;
    time_read.finish();

    info!(
        "DTMC has {} states and {} transitions.",
        LargeFormatter(model.num_of_states()),
        LargeFormatter(model.num_of_transitions())
    );
    Ok(model)
}

/// Writes the model to `<prefix>.tra` and `<prefix>.lab`.
fn write_model(prefix: &Path, model: &Model<f64>, timing: &mut Timing) -> Result<(), PmcError> {
    let mut time_write = timing.start("write");
    let mut transitions = File::create(prefix.with_extension("tra"))?;
    let mut labels = File::create(prefix.with_extension("lab"))?;
    write_explicit(&mut transitions, &mut labels, model)?;
    time_write.finish();
    Ok(())
}

/// Parses a constant definition of the shape `<NAME>=<VALUE>`, where the value
/// is a boolean, an integer or a decimal number.
fn parse_constant(text: &str) -> Result<(String, Scalar), String> {
    let (name, value) = text
        .split_once('=')
        .ok_or_else(|| format!("expected <NAME>=<VALUE>, found \"{text}\""))?;

    let value = match value.trim() {
        "true" => Scalar::Bool(true),
        "false" => Scalar::Bool(false),
        value => match value.parse::<i64>() {
            Ok(integer) => Scalar::Int(integer),
            Err(_) => Scalar::Rational(parse_decimal(value).ok_or_else(|| format!("invalid value \"{value}\""))?),
        },
    };

    Ok((name.trim().to_string(), value))
}

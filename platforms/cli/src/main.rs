use autosim::loader::load_automaton_as;
use autosim::{
    analyze, load_automaton, sample, samples::sample_names, Automaton, AutomatonError, Dfa,
    EngineConfig, ExecutionData, Formalism,
};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(author, version, about, long_about = None, arg_required_else_help = true)]
struct Cli {
    /// The automaton source file (.dfa, .nfa, .regex, .cfg or .tm)
    #[clap(required_unless_present = "sample", conflicts_with = "sample")]
    file: Option<PathBuf>,

    /// Run one of the embedded samples instead of a file
    #[clap(short, long)]
    sample: Option<String>,

    /// Parse the file as this formalism instead of guessing from its extension
    #[clap(short, long)]
    formalism: Option<Formalism>,

    /// An input string to run; may be given several times
    #[clap(short, long)]
    input: Vec<String>,

    /// Print the trace or execution log of each run
    #[clap(short, long)]
    trace: bool,

    /// Print traces as JSON
    #[clap(long)]
    json: bool,

    /// Minimize the DFA before running it
    #[clap(short, long)]
    minimize: bool,

    /// Turing Machine step limit
    #[clap(long)]
    max_steps: Option<usize>,

    /// Engine configuration file (JSON)
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,autosim={level},autosim_cli={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn engine_config(cli: &Cli) -> Result<EngineConfig, AutomatonError> {
    let mut config = match &cli.config {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(|e| {
                AutomatonError::FileError(format!("Failed to read file {}: {}", path.display(), e))
            })?;
            EngineConfig::from_json(&content)?
        }
        None => EngineConfig::default(),
    };
    if let Some(max_steps) = cli.max_steps {
        config = config.with_max_steps(max_steps);
    }
    Ok(config)
}

fn load(cli: &Cli, config: &EngineConfig) -> Result<Automaton, AutomatonError> {
    if let Some(name) = &cli.sample {
        let sample = sample(name).ok_or_else(|| {
            AutomatonError::FileError(format!(
                "Unknown sample '{}', expected one of: {}",
                name,
                sample_names().join(", ")
            ))
        })?;
        return sample.load(config);
    }

    match (&cli.file, cli.formalism) {
        (Some(path), Some(formalism)) => load_automaton_as(path, formalism, config),
        (Some(path), None) => load_automaton(path, config),
        (None, _) => Err(AutomatonError::FileError("No input file given".to_string())),
    }
}

fn print_dfa(dfa: &Dfa) {
    println!("states: [{}]", dfa.states().join(", "));
    println!("start_state: {}", dfa.start_state());
    println!("accept_states: [{}]", dfa.accept_states().join(", "));
    for (from, symbol, to) in dfa.transitions() {
        println!("  {from} --{symbol}--> {to}");
    }
}

fn print_trace(data: &ExecutionData) {
    match data {
        ExecutionData::Dfa(trace) => {
            let states: Vec<&str> = trace
                .states
                .iter()
                .map(|state| state.as_deref().unwrap_or("∅"))
                .collect();
            println!("  {}", states.join(" -> "));
        }
        ExecutionData::Nfa(trace) | ExecutionData::Regex(trace) => {
            for (index, set) in trace.state_sets.iter().enumerate() {
                let consumed: String = trace.input[..index].iter().collect();
                println!("  {:>8} {{{}}}", consumed, set.join(", "));
            }
        }
        ExecutionData::Cfg(trace) => {
            for form in &trace.derivation {
                println!("  => {form}");
            }
        }
        ExecutionData::Tm(log) => {
            let mut timeline = log.timeline();
            println!("  {:>5}  {}", 0, timeline.current());
            loop {
                match timeline.forward() {
                    Ok(true) => println!("  {:>5}  {}", timeline.position(), timeline.current()),
                    Ok(false) => break,
                    Err(e) => {
                        println!("  error: {e}");
                        break;
                    }
                }
            }
        }
    }
}

fn run(cli: &Cli) -> Result<(), AutomatonError> {
    let config = engine_config(cli)?;
    let mut automaton = load(cli, &config)?;

    for finding in analyze(&automaton) {
        warn!("{finding}");
    }

    if cli.minimize {
        automaton = automaton.minimize()?;
        if let Automaton::Dfa(dfa) = &automaton {
            print_dfa(dfa);
        }
    }

    for input in &cli.input {
        let data = automaton.execute(input, &config)?;

        if cli.json {
            let json = serde_json::to_string_pretty(&data)
                .map_err(|e| AutomatonError::FileError(format!("Failed to encode trace: {e}")))?;
            println!("{json}");
            continue;
        }

        match &data {
            ExecutionData::Tm(log) => println!(
                "{:?}: {} after {} step(s), output: {}",
                input,
                log.outcome,
                log.steps(),
                log.final_config.output_string()
            ),
            _ if data.accepted() => println!("{input:?}: accept"),
            _ => println!("{input:?}: reject"),
        }
        if cli.trace {
            print_trace(&data);
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

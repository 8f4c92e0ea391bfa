use std::fs::File;
use std::io::BufReader;
use std::time::Instant;

use clap::Parser;
use hiercache::config::SimulationConfig;
use hiercache::simulator::Simulator;
use hiercache::trace::load_trace_file;

#[cfg(debug_assertions)]
const DEBUG_DEFAULT: bool = true;

#[cfg(not(debug_assertions))]
const DEBUG_DEFAULT: bool = false;

#[derive(Parser, Debug)]
#[command(about = String::from("Set-associative cache and hierarchy simulator"))]
struct Args {
    /// A JSON configuration file for either a single cache or a hierarchy
    config: String,
    /// A trace file of OP ADDRESS [DATA] records
    trace: String,

    #[arg(short, long)]
    performance: bool,

    #[arg(short, long, default_value_t = DEBUG_DEFAULT)]
    debug: bool,
}

fn main() -> Result<(), String> {
    env_logger::init();
    let start = Instant::now();
    let args = Args::parse();
    let config_file = File::open(&args.config)
        .map_err(|e| format!("Couldn't open the config file at path {}: {e}", args.config))?;
    let config: SimulationConfig = serde_json::from_reader(BufReader::new(config_file))
        .map_err(|e| format!("Couldn't parse the config file: {e}"))?;
    let mut simulator =
        Simulator::new(&config).map_err(|e| format!("Invalid cache configuration: {e}"))?;
    let entries = load_trace_file(&args.trace).map_err(|e| e.to_string())?;
    let report = simulator.simulate(&entries);
    println!(
        "{}",
        serde_json::to_string_pretty(&report)
            .map_err(|e| format!("Couldn't serialise the output {e}"))?
    );
    if args.performance {
        let end = Instant::now();
        let simulation_time = simulator.get_execution_time();
        let total_time = end - start;
        println!("Simulation time: {}s", simulation_time.as_nanos() as f64 / 1e9);
        println!(
            "Total execution time (includes initial parsing, configuration, and output): {}s",
            total_time.as_nanos() as f64 / 1e9
        )
    }
    if args.debug {
        #[cfg(debug_assertions)]
        println!("Running the debug binary, debug mode is enabled by default. If benchmarking, re-compile with the --release argument when using cargo run");
        println!("Parsed input configuration: {config:?}");
        println!("Parsed trace entries: {}", entries.len());
        let uninitialised_lines = simulator.uninitialised_line_counts();
        let formatted = uninitialised_lines
            .iter()
            .map(|(name, count)| format!("{name}: {count}"))
            .reduce(|a, b| format!("{a}, {b}"))
            .unwrap_or_default();
        println!("Uninitialised cache lines by layer: ({formatted})");
        println!(
            "Total uninitialised cache lines: {}",
            uninitialised_lines.iter().map(|(_, count)| count).sum::<u64>()
        )
    }
    Ok(())
}

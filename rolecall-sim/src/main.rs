mod reports;
mod scenarios;
mod simulation;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use rolecall_engine::GameOptions;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use reports::ScenarioResult;
use scenarios::{Scenario, get_scenario, list_scenarios};
use simulation::run_round;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Console,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "rolecall-sim", version)]
#[command(about = "Seeded round simulator and invariant checker for the rolecall engine")]
struct Args {
    /// Scenarios to run (comma-separated, or "all")
    #[arg(long, default_value = "smoke")]
    scenarios: String,

    /// List all available scenarios and exit
    #[arg(long)]
    list_scenarios: bool,

    /// Seeds to run (comma-separated)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Rounds per scenario and seed
    #[arg(long, default_value_t = 10)]
    rounds: usize,

    /// Override the scenario's player count
    #[arg(long)]
    players: Option<u8>,

    /// Override the scenario's impostor count
    #[arg(long)]
    impostors: Option<u8>,

    /// Lobby options JSON; defaults to the bundled options
    #[arg(long)]
    options: Option<PathBuf>,

    /// Output report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let default_filter = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if maybe_list_scenarios(&args)? {
        return Ok(());
    }

    announce_banner();
    let start_time = Instant::now();
    let base = load_options(args.options.as_ref())?;
    let seeds = parse_seeds(&args.seeds)?;

    let mut results = Vec::new();
    for key in expand_scenarios(&args.scenarios) {
        let Some(mut scenario) = get_scenario(&key, &base) else {
            eprintln!("⚠️  Unknown scenario: {}", key.yellow());
            continue;
        };
        if let Some(players) = args.players {
            scenario.plan.players = players;
        }
        if let Some(impostors) = args.impostors {
            scenario.plan.impostors = impostors;
        }
        for &seed in &seeds {
            results.push(run_scenario(&scenario, seed, args.rounds, args.verbose));
        }
    }

    write_reports(&args, &results, start_time)?;

    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }
    Ok(())
}

fn maybe_list_scenarios(args: &Args) -> Result<bool> {
    if !args.list_scenarios {
        return Ok(false);
    }
    let mut out = open_output(args.output.as_deref())?;
    writeln!(out, "Available scenarios:")?;
    for (key, description) in list_scenarios() {
        writeln!(out, "  {key:25} - {description}")?;
    }
    out.flush()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🎭 Rolecall Round Simulator".bright_cyan().bold());
    println!("{}", "================================".cyan());
}

fn load_options(path: Option<&PathBuf>) -> Result<GameOptions> {
    let Some(path) = path else {
        return Ok(GameOptions::load_from_static());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    GameOptions::from_json(&text).with_context(|| format!("invalid options in {}", path.display()))
}

fn parse_seeds(seeds: &str) -> Result<Vec<u64>> {
    split_csv(seeds)
        .iter()
        .map(|s| s.parse::<u64>().with_context(|| format!("invalid seed '{s}'")))
        .collect()
}

fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

fn expand_scenarios(scenarios_arg: &str) -> Vec<String> {
    let mut scenarios = split_csv(scenarios_arg);
    if scenarios.iter().any(|s| s == "all") {
        scenarios.retain(|s| s != "all");
        for (key, _) in list_scenarios() {
            if !scenarios.iter().any(|s| s == key) {
                scenarios.push(key.to_string());
            }
        }
    }
    scenarios
}

fn run_scenario(scenario: &Scenario, seed: u64, rounds: usize, verbose: bool) -> ScenarioResult {
    if verbose {
        println!(
            "🧪 Scenario: {} [{}] {} (seed: {seed}, {} players, {} impostors)",
            scenario.name.bright_white(),
            scenario.key,
            scenario.description,
            scenario.plan.players,
            scenario.plan.impostors
        );
    }

    let mut result = ScenarioResult {
        scenario_name: scenario.name.to_string(),
        seed,
        passed: true,
        rounds_run: rounds,
        successful_rounds: 0,
        failures: Vec::new(),
        deaths: 0,
        ghost_grants: 0,
        kills_landed: 0,
        suppressions: 0,
        average_duration: Duration::ZERO,
    };
    let mut elapsed = Duration::ZERO;

    for i in 0..rounds {
        let round_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));
        let started = Instant::now();
        let summary = run_round(&scenario.plan, round_seed);
        elapsed += started.elapsed();

        result.deaths += summary.deaths.len();
        result.ghost_grants += summary.ghost_grants.values().sum::<u32>();
        result.kills_landed += summary.kills_landed;
        result.suppressions += summary.suppressed.values().sum::<usize>();

        match scenario.evaluate(&summary) {
            Some(err) => {
                if verbose {
                    println!("  ❌ Round {}/{rounds} failed: {}", i + 1, err.clone().red());
                }
                result
                    .failures
                    .push(format!("round {} (seed {round_seed}): {err}", i + 1));
            }
            None => {
                result.successful_rounds += 1;
                if verbose {
                    println!(
                        "  ✅ Round {}/{rounds} passed: {} steps, {} deaths, winner {}",
                        i + 1,
                        summary.steps,
                        summary.deaths.len(),
                        summary.winner.as_deref().unwrap_or("none")
                    );
                }
            }
        }
    }

    result.passed = result.failures.is_empty();
    if rounds > 0 {
        result.average_duration = elapsed / u32::try_from(rounds).unwrap_or(u32::MAX);
    }
    result
}

fn write_reports(args: &Args, results: &[ScenarioResult], start_time: Instant) -> Result<()> {
    let mut out = open_output(args.output.as_deref())?;
    match args.report {
        ReportFormat::Json => reports::generate_json_report(&mut *out, results)?,
        ReportFormat::Console if results.is_empty() => writeln!(out, "No scenarios executed.")?,
        ReportFormat::Console => {
            reports::generate_console_report(&mut *out, results, start_time.elapsed())?;
        }
    }
    if args.report == ReportFormat::Console {
        writeln!(out, "🏁 Total time: {:?}", start_time.elapsed())?;
    }
    out.flush()?;
    Ok(())
}

/// Report sink: the `--output` file when given, stdout otherwise.
fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    let Some(path) = path else {
        return Ok(Box::new(BufWriter::new(stdout().lock())));
    };
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    Ok(Box::new(BufWriter::new(file)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args {
            scenarios: "smoke".to_string(),
            list_scenarios: false,
            seeds: "1337".to_string(),
            rounds: 1,
            players: None,
            impostors: None,
            options: None,
            report: ReportFormat::Json,
            output: None,
            verbose: false,
        }
    }

    fn temp_path(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "rolecall-sim-{label}-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ))
    }

    #[test]
    fn expands_all_scenarios_keyword() {
        let expanded = expand_scenarios("smoke,all");
        assert_eq!(expanded[0], "smoke");
        assert!(expanded.contains(&"ghost-pool".to_string()));
        assert!(expanded.contains(&"sabotage-policy".to_string()));
        assert_eq!(expanded.iter().filter(|s| *s == "smoke").count(), 1);
    }

    #[test]
    fn seeds_must_be_numeric() {
        assert_eq!(parse_seeds(" 1, 2 ,3").unwrap(), vec![1, 2, 3]);
        assert!(parse_seeds("1,abc").is_err());
    }

    #[test]
    fn bad_options_file_is_reported() {
        let path = temp_path("options.json");
        std::fs::write(&path, r#"{ "map_id": 99 }"#).unwrap();
        let err = load_options(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("invalid options"));
        assert!(load_options(Some(&temp_path("missing"))).is_err());
    }

    #[test]
    fn run_scenario_counts_rounds() {
        let base = GameOptions::load_from_static();
        let scenario = get_scenario("smoke", &base).unwrap();
        let result = run_scenario(&scenario, 5, 3, false);
        assert_eq!(result.rounds_run, 3);
        assert_eq!(result.successful_rounds + result.failures.len(), 3);
        assert_eq!(result.passed, result.failures.is_empty());
    }

    #[test]
    fn write_reports_emits_json() {
        let path = temp_path("report.json");
        let args = Args {
            output: Some(path.clone()),
            ..base_args()
        };
        write_reports(&args, &[], Instant::now()).unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap().trim(), "[]");
    }

    #[test]
    fn write_reports_console_without_results() {
        let path = temp_path("report.txt");
        let args = Args {
            report: ReportFormat::Console,
            output: Some(path.clone()),
            ..base_args()
        };
        write_reports(&args, &[], Instant::now()).unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("No scenarios executed."));
    }

    #[test]
    fn open_output_writes_to_the_file_or_reports_why_not() {
        let path = temp_path("sink.txt");
        let mut out = open_output(Some(&path)).unwrap();
        writeln!(out, "hello").unwrap();
        out.flush().unwrap();
        drop(out);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\n");

        let missing_dir = temp_path("no-such-dir").join("report.json");
        let Err(err) = open_output(Some(&missing_dir)) else {
            panic!("creating a file in a missing directory should fail");
        };
        assert!(format!("{err:#}").contains("failed to create"));
    }

    #[test]
    fn maybe_list_scenarios_writes_output() {
        let path = temp_path("list.txt");
        let args = Args {
            list_scenarios: true,
            output: Some(path.clone()),
            ..base_args()
        };
        assert!(maybe_list_scenarios(&args).unwrap());
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("Available scenarios"));
        assert!(content.contains("sabotage-policy"));
    }
}

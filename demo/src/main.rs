//! Demo/test-harness binary (§6, §12, §13): runs the `orElse` and `Retry`
//! suites built from the concrete scenarios in §8 and exits 0 iff every
//! selected suite passed, 1 otherwise.

mod scenarios;

use clap::{Parser, ValueEnum};
use log::{error, LevelFilter};

use scenarios::Case;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Suite {
    OrElse,
    Retry,
}

/// Run the STM demo suites.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Which suite(s) to run. Runs both when omitted.
    #[arg(long = "suite", value_enum)]
    suites: Vec<Suite>,

    /// Increase logging verbosity (-v for debug, -vv for trace). Ignored if
    /// RUST_LOG is set in the environment.
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let selected: Vec<Suite> = if args.suites.is_empty() {
        vec![Suite::OrElse, Suite::Retry]
    } else {
        args.suites
    };

    let mut all_passed = true;
    for suite in selected {
        let (name, cases) = match suite {
            Suite::OrElse => ("orElse", scenarios::or_else_suite()),
            Suite::Retry => ("Retry", scenarios::retry_suite()),
        };
        if !run_suite(name, &cases) {
            all_passed = false;
        }
    }

    std::process::exit(if all_passed { 0 } else { 1 });
}

/// Initialize `env_logger` (§10, §12): verbosity from `-v`/`-vv`, unless
/// `RUST_LOG` is set in the environment, in which case that takes precedence.
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_env("RUST_LOG")
        .init();
}

fn run_suite(name: &str, cases: &[Case]) -> bool {
    println!("== {name} ==");
    let mut suite_passed = true;
    for case in cases {
        let passed = case.run();
        println!("  [{}] {}", if passed { "ok" } else { "FAIL" }, case.name);
        if !passed {
            suite_passed = false;
            error!("suite '{name}' case '{}' failed", case.name);
        }
    }
    suite_passed
}

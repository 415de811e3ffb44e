//! Headless host for the banter dialogue engine.
//!
//! Reads one JSON event per line from stdin and prints what the agent says.
//!
//! ```bash
//! cargo run -p banter -- --templates banter-core/data/templates.json --rapport 65 --seed 7
//! ```
//!
//! Set `RUST_LOG=banter_core=debug` to see selection decisions on stderr.

mod headless;

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return ExitCode::SUCCESS;
    }

    let config = match headless::parse_config_from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Run with --help for usage.");
            return ExitCode::FAILURE;
        }
    };

    match headless::run_headless(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn print_help() {
    println!("banter - personality-driven dialogue for game agents");
    println!();
    println!("USAGE:");
    println!("  banter --templates <bank.json> [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  --templates <path>        Template bank JSON (required)");
    println!("  --config <path>           Engine config JSON (defaults for omitted fields)");
    println!("  --agent <id>              Agent id (default: agent)");
    println!("  --seed <n>                Seed for tie-breaking (default: random)");
    println!("  --rapport <0-100>         Starting rapport (default: 10)");
    println!("  --specialization <name>   miner, builder, guard, scout, farmer, artisan");
    println!("  --traits <O,C,E,A,N>      Personality scores, each 0-100");
    println!("  -h, --help                Show this help");
    println!();
    println!("Each stdin line is either a JSON event or a #command (#help lists them).");
}

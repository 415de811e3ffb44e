//! Line-oriented host loop.
//!
//! This module drives one agent from stdin. It's designed for scripted
//! playtesting and for piping events from a game server.

use banter_core::config::ConfigError;
use banter_core::persist::{AgentSnapshot, PersistError};
use banter_core::personality::PersonalityError;
use banter_core::{
    AgentState, EngineConfig, Event, PersonalityProfile, SelectionEngine, Specialization,
    TemplateBank, Trait,
};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Errors that stop the host.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    #[error("Personality error: {0}")]
    Personality(#[from] PersonalityError),

    #[error("Missing required argument: {0}")]
    MissingArgument(&'static str),

    #[error("Invalid value for {flag}: {value}")]
    InvalidArgument { flag: &'static str, value: String },
}

/// Host settings parsed from the command line.
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub templates: PathBuf,
    pub engine_config: Option<PathBuf>,
    pub agent_id: String,
    pub seed: Option<u64>,
    pub rapport: Option<u8>,
    pub specialization: Option<Specialization>,
    pub personality: PersonalityProfile,
}

/// Run the host until stdin closes or `#quit`.
///
/// Protocol:
/// - Lines starting with `#` are commands (save, load, session, status, help, quit)
/// - Any other line is a JSON event
/// - Output lines are tagged: `[SAY]`, `[ACK]`, `[FOLLOW-UP]`, `[STATUS]`, `[ERROR]`
pub async fn run_headless(config: HostConfig) -> Result<(), HostError> {
    let engine_config = match &config.engine_config {
        Some(path) => EngineConfig::load_json(path).await?,
        None => EngineConfig::default(),
    };
    let bank = TemplateBank::load_json(&config.templates, &engine_config).await?;
    info!(templates = bank.len(), "template bank loaded");

    let engine = SelectionEngine::new(Arc::new(bank), Arc::new(engine_config));
    let mut agent = AgentState::new(config.agent_id.clone(), config.personality);
    if let Some(rapport) = config.rapport {
        agent = agent.with_rapport(rapport);
    }
    if let Some(specialization) = config.specialization {
        agent = agent.with_specialization(specialization);
    }
    agent.begin_session(Utc::now(), engine.config());

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    println!("=== Banter Headless Mode ===");
    print_status(&agent);
    println!();
    print_commands();
    println!();
    println!("Enter events as JSON (one per line):");
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("Error reading input: {e}");
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix('#') {
            let parts: Vec<&str> = command.split_whitespace().collect();
            match parts.first().copied() {
                Some("quit") | Some("exit") => {
                    println!("Goodbye!");
                    break;
                }
                Some("save") => {
                    if let Some(path) = parts.get(1) {
                        match agent.export_state().save_json(path).await {
                            Ok(()) => println!("[SAVED] Agent saved to {path}"),
                            Err(e) => println!("[ERROR] Save failed: {e}"),
                        }
                    } else {
                        println!("[ERROR] Usage: #save <path>");
                    }
                }
                Some("load") => {
                    if let Some(path) = parts.get(1) {
                        match load_into(&mut agent, path).await {
                            Ok(()) => {
                                println!("[LOADED] Agent loaded from {path}");
                                print_status(&agent);
                            }
                            Err(e) => println!("[ERROR] Load failed: {e}"),
                        }
                    } else {
                        println!("[ERROR] Usage: #load <path>");
                    }
                }
                Some("session") => {
                    agent.begin_session(Utc::now(), engine.config());
                    println!("[SESSION] New session started");
                }
                Some("status") => print_status(&agent),
                Some("help") => {
                    println!("[HELP]");
                    print_commands();
                    println!("  (anything else is parsed as a JSON event)");
                }
                _ => {
                    println!("[ERROR] Unknown command. Type #help for help.");
                }
            }
            stdout.flush().ok();
            continue;
        }

        let event: Event = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(e) => {
                println!("[ERROR] Invalid event: {e}");
                continue;
            }
        };

        match engine.respond_with_rng(&mut agent, &event, &mut rng) {
            Some(result) => {
                println!("[SAY] {}", result.text);
                if let Some(follow_up) = &result.suggested_follow_up {
                    println!("[FOLLOW-UP] {follow_up}");
                }
            }
            None => {
                let ack = engine.acknowledge(&mut agent, &event);
                println!("[ACK] {}", ack.text);
            }
        }
        stdout.flush().ok();
    }

    Ok(())
}

async fn load_into(agent: &mut AgentState, path: &str) -> Result<(), HostError> {
    let snapshot = AgentSnapshot::load_json(path).await?;
    let value = serde_json::to_value(&snapshot).map_err(PersistError::from)?;
    let report = agent.import_state(value);
    for store in &report.reset {
        println!("[WARN] {store} data was unreadable and has been reset");
    }
    Ok(())
}

fn print_commands() {
    println!("Commands:");
    println!("  #quit        - Exit");
    println!("  #save <path> - Save agent state");
    println!("  #load <path> - Load agent state");
    println!("  #session     - Start a new play session");
    println!("  #status      - Show agent status");
    println!("  #help        - Show this help");
}

fn print_status(agent: &AgentState) {
    println!("[STATUS]");
    println!("  Agent: {}", agent.agent_id);
    if let Some(specialization) = agent.specialization {
        println!("  Specialization: {}", specialization.title());
    }
    println!(
        "  Rapport: {} ({})",
        agent.relationship.rapport(),
        agent.stage().name()
    );
    println!("  Personality: {}", agent.personality);
    let levels: Vec<String> = Trait::ALL
        .iter()
        .map(|t| format!("{} {}", t.name(), agent.personality.level(*t).name()))
        .collect();
    println!("  Traits: {}", levels.join(", "));
    println!("  Memories: {}", agent.memory.len());
    println!(
        "  Lines said: {}",
        agent.cooldowns.records().map(|r| r.total_uses).sum::<u32>()
    );
}

/// Parse host configuration from command line arguments.
pub fn parse_config_from_args(args: &[String]) -> Result<HostConfig, HostError> {
    let mut templates = None;
    let mut config = HostConfig {
        templates: PathBuf::new(),
        engine_config: None,
        agent_id: "agent".to_string(),
        seed: None,
        rapport: None,
        specialization: None,
        personality: PersonalityProfile::balanced(),
    };

    let mut i = 0;
    while i < args.len() {
        let value = args.get(i + 1);
        match (args[i].as_str(), value) {
            ("--templates", Some(path)) => {
                templates = Some(PathBuf::from(path));
                i += 1;
            }
            ("--config", Some(path)) => {
                config.engine_config = Some(PathBuf::from(path));
                i += 1;
            }
            ("--agent", Some(id)) => {
                config.agent_id = id.clone();
                i += 1;
            }
            ("--seed", Some(seed)) => {
                config.seed = Some(seed.parse().map_err(|_| invalid("--seed", seed))?);
                i += 1;
            }
            ("--rapport", Some(rapport)) => {
                let rapport: u8 = rapport.parse().map_err(|_| invalid("--rapport", rapport))?;
                if rapport > 100 {
                    return Err(invalid("--rapport", &rapport.to_string()));
                }
                config.rapport = Some(rapport);
                i += 1;
            }
            ("--specialization", Some(name)) => {
                config.specialization =
                    Some(parse_specialization(name).ok_or_else(|| invalid("--specialization", name))?);
                i += 1;
            }
            ("--traits", Some(traits)) => {
                config.personality = parse_traits(traits)?;
                i += 1;
            }
            (flag, None) if flag.starts_with("--") => {
                warn!(flag, "flag is missing its value");
            }
            _ => {}
        }
        i += 1;
    }

    config.templates = templates.ok_or(HostError::MissingArgument("--templates"))?;
    Ok(config)
}

fn invalid(flag: &'static str, value: &str) -> HostError {
    HostError::InvalidArgument {
        flag,
        value: value.to_string(),
    }
}

fn parse_specialization(s: &str) -> Option<Specialization> {
    match s.to_lowercase().as_str() {
        "miner" => Some(Specialization::Miner),
        "builder" => Some(Specialization::Builder),
        "guard" => Some(Specialization::Guard),
        "scout" => Some(Specialization::Scout),
        "farmer" => Some(Specialization::Farmer),
        "artisan" | "crafter" => Some(Specialization::Artisan),
        _ => None,
    }
}

fn parse_traits(s: &str) -> Result<PersonalityProfile, HostError> {
    let scores = s
        .split(',')
        .map(|part| part.trim().parse::<u8>())
        .collect::<Result<Vec<u8>, _>>()
        .map_err(|_| invalid("--traits", s))?;
    match scores.as_slice() {
        &[o, c, e, a, n] => Ok(PersonalityProfile::new(o, c, e, a, n)?),
        _ => Err(invalid("--traits", s)),
    }
}

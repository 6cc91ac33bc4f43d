use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use turo_core::{EngineConfig, TutorEngine};
use turo_provider::create_provider;
use turo_schema::{ChatTurn, Persona};
use turo_server::ServerConfig;

#[derive(Parser)]
#[command(name = "turo", version, about = "Tagalog tutoring server")]
struct Cli {
    #[arg(long, default_value = "turo.yaml", help = "Path to the config file")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Start the HTTP API server")]
    Start,
    #[command(about = "Local tutoring REPL (no HTTP server needed)")]
    Chat {
        #[arg(long, default_value = "ate_maria", help = "Tutor persona")]
        persona: String,
    },
    #[command(about = "Validate the config file")]
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    match command {
        Commands::Start => {
            let config = ServerConfig::load(&cli.config)?;
            let state = turo_server::build_state(&config)?;
            turo_server::serve(state, &config.bind).await?;
        }
        Commands::Chat { persona } => {
            let persona = parse_persona(&persona)?;
            let config = ServerConfig::load(&cli.config)?;
            run_repl(&config, persona).await?;
        }
        Commands::Validate => {
            let config = ServerConfig::load(&cli.config)?;
            println!(
                "Config valid. model={}, {} tokens provisioned, tts={}.",
                config.provider.model,
                config.tokens.len(),
                if config.tts.is_some() { "on" } else { "off" },
            );
        }
    }

    Ok(())
}

fn parse_persona(name: &str) -> Result<Persona> {
    serde_json::from_value(serde_json::Value::String(name.to_string()))
        .map_err(|_| anyhow::anyhow!("unknown persona '{name}' (expected ate_maria or kuya_josh)"))
}

async fn run_repl(config: &ServerConfig, persona: Persona) -> Result<()> {
    let provider = create_provider(&config.provider)?;
    let engine = TutorEngine::new(
        provider,
        EngineConfig {
            model: config.provider.model.clone(),
            ..EngineConfig::default()
        },
    );

    println!("turo REPL with {}. Type 'quit' to exit.", persona.display_name());
    println!("---");

    let mut history: Vec<ChatTurn> = Vec::new();
    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let mut input = String::new();
        if stdin.read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        if input == "quit" || input == "exit" {
            break;
        }

        let reply = engine.generate(persona, input, &history).await;
        println!("{}", reply.tagalog);
        if let Some(sabihin) = &reply.sabihin {
            println!("  sabihin: {sabihin}");
        }
        if let Some(meaning) = &reply.meaning {
            println!("  meaning: {meaning}");
        }
        if let Some(examples) = &reply.examples {
            for example in examples {
                println!("  example: {example}");
            }
        }
        if let Some(correction) = &reply.correction {
            println!("  correction: {correction}");
        }
        if let Some(note) = &reply.note {
            println!("  note: {note}");
        }

        history.push(ChatTurn::user(input));
        history.push(ChatTurn::assistant(reply));
    }

    Ok(())
}

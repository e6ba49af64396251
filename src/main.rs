use std::collections::HashMap;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fathom::config::ConfigLoader;
use fathom::progress::{ConsoleSink, SafeSink};
use fathom::report::{AnthropicSynthesis, SynthesisApi};
use fathom::{Orchestrator, ResearchOptions};

#[derive(Parser)]
#[command(name = "fathom")]
#[command(version, about = "Time-budgeted deep research from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long)]
    verbose: bool,

    #[arg(long, short)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a research pass and print the report to stdout
    Research {
        #[arg(help = "The research query")]
        query: String,

        #[arg(long, short, default_value = "3", help = "Sub-queries per iteration (1-5)")]
        breadth: u32,

        #[arg(long, short, default_value = "2", help = "Refinement rounds per question (1-3)")]
        depth: u32,

        #[arg(long, short = 't', default_value = "30", help = "Wall-clock budget in minutes")]
        minutes: u64,

        #[arg(
            long,
            value_parser = parse_multiplier,
            help = "Depth multiplier override, name=value (0.5-2.0); repeatable"
        )]
        multiplier: Vec<(String, f64)>,

        #[arg(long, help = "Only verify the synthesis API key and exit")]
        test_synthesis: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(long, help = "Output as JSON")]
        json: bool,
    },
    /// Show configuration file paths
    Path,
    /// Write a default configuration file
    Init {
        #[arg(long, short, help = "Initialize the global config instead of the project one")]
        global: bool,
        #[arg(long, help = "Overwrite an existing config file")]
        force: bool,
    },
}

fn parse_multiplier(s: &str) -> Result<(String, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", s))?;
    let value: f64 = value
        .parse()
        .map_err(|e| format!("invalid multiplier '{}': {}", value, e))?;
    if !(0.5..=2.0).contains(&value) {
        return Err(format!("multiplier must be within 0.5..=2.0, got {}", value));
    }
    Ok((name.to_string(), value))
}

fn main() -> ExitCode {
    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Research {
            query,
            breadth,
            depth,
            minutes,
            multiplier,
            test_synthesis,
        } => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(run_research(
                query,
                breadth,
                depth,
                minutes,
                multiplier.into_iter().collect(),
                test_synthesis,
                cli.quiet,
            ))?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { json } => ConfigLoader::show_config(json)?,
            ConfigAction::Path => ConfigLoader::show_path(),
            ConfigAction::Init { global, force } => {
                let path = ConfigLoader::init_config(global, force)?;
                println!("wrote {}", path.display());
            }
        },
    }

    Ok(())
}

async fn run_research(
    query: String,
    breadth: u32,
    depth: u32,
    minutes: u64,
    multipliers: HashMap<String, f64>,
    test_synthesis: bool,
    quiet: bool,
) -> anyhow::Result<()> {
    let config = ConfigLoader::load()?;

    let llm = fathom::ai::create_provider(&config.llm)?;
    let search = Arc::new(fathom::search::FirecrawlClient::new(config.search.clone())?);
    let synthesis: Option<Arc<dyn SynthesisApi>> =
        match AnthropicSynthesis::from_config(&config.synthesis) {
            Some(client) => Some(Arc::new(client?)),
            None => None,
        };

    let sink = SafeSink::new(Arc::new(ConsoleSink::new(quiet)));
    let orchestrator = Orchestrator::new(llm, search, synthesis, sink, config);

    // Ctrl-C feeds the cooperative cancel token
    let cancel = orchestrator.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let mut options = ResearchOptions::new(query);
    options.breadth = breadth;
    options.depth = depth;
    options.max_duration_minutes = minutes;
    options.component_depth_multipliers = multipliers;
    options.test_anthropic_mode = test_synthesis;

    let output = orchestrator.run(options).await?;

    if let Some(test) = &output.api_test_result {
        println!(
            "synthesis API test: {} ({})",
            if test.success { "ok" } else { "failed" },
            test.message
        );
        return Ok(());
    }

    match &output.report {
        Some(report) => println!("{}", report),
        None => eprintln!("no report produced"),
    }

    eprintln!(
        "completed: {:?}  skipped: {:?}  total: {}s",
        output.time_stats.completed_components,
        output.time_stats.skipped_components,
        output.time_stats.total_time_ms / 1000
    );

    Ok(())
}

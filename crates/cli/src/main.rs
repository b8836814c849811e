use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use procure_agents::{build_assistant, AssistantConfig, LexiconPolicy, ProcurementAssistant};
use procure_core::MatchOrder;
use procure_observability::{init_tracing, AppMetrics};
use procure_storage::{load_orders, Store};

#[derive(Debug, Parser)]
#[command(name = "procure")]
#[command(about = "Ask questions about purchase-order data in plain English")]
struct Cli {
    /// SQLite URL, e.g. sqlite://orders.db. Defaults to an in-memory store.
    #[arg(long, env = "PROCURE_DATABASE_URL", global = true)]
    database_url: Option<String>,

    /// JSON or JSONL purchase orders loaded before the command runs.
    #[arg(long, env = "PROCURE_SEED_PATH", global = true)]
    seed: Option<PathBuf>,

    #[arg(
        long,
        env = "PROCURE_INTENT_DATASET",
        default_value = "data/intent_training.jsonl",
        global = true
    )]
    intent_dataset: PathBuf,

    /// `listing` (first listed value wins) or `longest`.
    #[arg(long, env = "PROCURE_LEXICON_MATCH", default_value = "listing", global = true)]
    lexicon_match: String,

    #[arg(long, env = "PROCURE_LEXICON_TTL_SECONDS", default_value_t = 0, global = true)]
    lexicon_ttl_seconds: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Answer a single question.
    Ask {
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
        /// Print the full structured reply.
        #[arg(long)]
        json: bool,
    },
    /// Interactive question loop.
    Chat,
    /// Load purchase orders into the configured store.
    Import { path: PathBuf },
    /// Print the departments, items and acquisition methods currently known.
    Lexicon,
}

impl Cli {
    fn assistant_config(&self) -> Result<AssistantConfig> {
        let match_order = MatchOrder::parse(&self.lexicon_match)
            .with_context(|| format!("invalid --lexicon-match value: {}", self.lexicon_match))?;

        Ok(AssistantConfig {
            database_url: self.database_url.clone(),
            seed_path: self.seed.clone(),
            intent_dataset: self.intent_dataset.clone(),
            lexicon_policy: LexiconPolicy::from_ttl(std::time::Duration::from_secs(
                self.lexicon_ttl_seconds,
            )),
            match_order,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("procure_cli");
    let cli = Cli::parse();

    let config = cli.assistant_config()?;
    let assistant = build_assistant(&config, AppMetrics::shared()).await?;

    match cli.command {
        Command::Ask { text, json } => {
            let reply = assistant.answer(&text.join(" ")).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&reply)?);
            } else {
                println!("{}", reply.reply_text);
            }
        }
        Command::Chat => run_chat(&assistant).await?,
        Command::Import { path } => {
            let orders = load_orders(&path)?;
            let inserted = assistant.import_orders(&orders).await?;
            println!("imported {inserted} purchase orders from {}", path.display());
            if config.database_url.is_none() {
                eprintln!("note: no --database-url given, imported orders live only for this run");
            }
        }
        Command::Lexicon => {
            let lexicon = assistant.lexicon().await?;
            println!("{}", serde_json::to_string_pretty(&lexicon)?);
        }
    }

    Ok(())
}

async fn run_chat(assistant: &ProcurementAssistant<Store>) -> Result<()> {
    println!("Procurement assistant. type 'exit' to quit.");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }

        let message = line.trim();
        if message.eq_ignore_ascii_case("exit") || message.eq_ignore_ascii_case("quit") {
            break;
        }

        if message.is_empty() {
            continue;
        }

        match assistant.answer(message).await {
            Ok(reply) => println!("\n{}\n", reply.reply_text),
            Err(err) => eprintln!("\nerror: {err}\n"),
        }
    }

    Ok(())
}

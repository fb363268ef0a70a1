use std::path::PathBuf;

use clap::{Parser, Subcommand};
use nlq_core::{build_kernel, NlqKernel, QueryOutcome, Settings};
use nlq_history::{export_entries, export_results, verify_log, ExportFormat, HistoryLog};

const DEMO_QUESTIONS: [&str; 5] = [
    "How many customers?",
    "average income by gender",
    "top 3 customers by spending score",
    "show orders where city is New York",
    "show all custmers",
];

#[derive(Parser)]
#[command(name = "nlq", about = "Ask questions of a SQL database in plain English")]
struct Cli {
    /// SQLite database (overrides NLQ_DATABASE).
    #[arg(long, global = true)]
    database: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the statement a question becomes, without running it.
    Translate { question: String },
    /// Answer a question.
    Ask {
        question: String,
        #[arg(long, value_parser = parse_format)]
        format: Option<ExportFormat>,
    },
    /// Print the catalog as YAML.
    Schema,
    Tables,
    /// Run sample questions against the built-in demo database.
    Demo,
    History {
        #[command(subcommand)]
        action: HistoryCommand,
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum HistoryCommand {
    Tail {
        #[arg(long, default_value_t = 10)]
        lines: usize,
    },
    Verify,
    Export {
        #[arg(long, value_parser = parse_format, default_value = "jsonl")]
        format: ExportFormat,
    },
}

fn parse_format(s: &str) -> Result<ExportFormat, String> {
    s.parse()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::load()?;
    if let Some(database) = cli.database {
        settings.database = Some(database);
    }

    match cli.command {
        Command::Translate { question } => {
            let kernel = build_kernel(&read_only(settings)).await?;
            let translation = kernel.translate(&question).await?;
            println!("{}", translation.statement.text);
            println!("params: {}", serde_json::to_string(&translation.statement.params)?);
        }
        Command::Ask { question, format } => {
            let kernel = build_kernel(&settings).await?;
            let outcome = kernel.handle_query(&question).await?;
            print_outcome(&outcome, format)?;
        }
        Command::Schema => {
            let kernel = build_kernel(&read_only(settings)).await?;
            print!("{}", kernel.catalog().to_yaml_string()?);
        }
        Command::Tables => {
            let kernel = build_kernel(&read_only(settings)).await?;
            for name in kernel.catalog().table_names() {
                println!("{name}");
            }
        }
        Command::Demo => {
            let kernel = build_kernel(&Settings {
                database: None,
                catalog_file: None,
                alias_file: None,
                ..read_only(settings)
            })
            .await?;
            run_demo(&kernel).await?;
        }
        Command::History { action, path } => {
            let path = path
                .or(settings.history_file)
                .ok_or_else(|| anyhow::anyhow!("history is disabled; pass --path"))?;
            match action {
                HistoryCommand::Tail { lines } => {
                    for entry in HistoryLog::open(&path)?.tail(lines)? {
                        println!("{}", serde_json::to_string(&entry)?);
                    }
                }
                HistoryCommand::Verify => {
                    let count = verify_log(&path)?;
                    println!("history ok ({count} entries)");
                }
                HistoryCommand::Export { format } => {
                    let entries = HistoryLog::open(&path)?.entries()?;
                    print!("{}", export_entries(&entries, format)?);
                }
            }
        }
    }

    Ok(())
}

/// Commands that do not answer questions leave no history behind.
fn read_only(settings: Settings) -> Settings {
    Settings {
        history_file: None,
        ..settings
    }
}

fn print_outcome(outcome: &QueryOutcome, format: Option<ExportFormat>) -> anyhow::Result<()> {
    match (format, outcome.metric()) {
        (None, Some(metric)) => println!("{}: {}", metric.label, metric.value),
        (format, _) => print!(
            "{}",
            export_results(&outcome.rows, format.unwrap_or(ExportFormat::Csv))?
        ),
    }
    Ok(())
}

async fn run_demo(kernel: &NlqKernel) -> anyhow::Result<()> {
    for question in DEMO_QUESTIONS {
        println!("> {question}");
        match kernel.handle_query(question).await {
            Ok(outcome) => {
                println!("{}", outcome.translation.statement.text);
                print_outcome(&outcome, None)?;
            }
            Err(err) => println!("error [{}]: {err}", err.kind()),
        }
        println!();
    }
    Ok(())
}

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use dream_journal::{
    insights::calendar::DEFAULT_CALENDAR_DAYS, telemetry, AnalysisClient, Config, DreamJournal,
    JournalDatabase,
};
#[cfg(feature = "cli")]
use std::sync::Arc;

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "dream-journal", version, about = "Record, interpret and explore your dreams")]
struct Cli {
    /// Log the effective configuration before running the command
    #[arg(long, global = true)]
    show_config: bool,

    /// Debug-level logs from the journal
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Command {
    /// Record a new dream
    Add {
        text: String,
        /// Analyze it right away
        #[arg(long)]
        analyze: bool,
    },
    /// List every dream, newest first
    List,
    Show { id: String },
    Delete { id: String },
    /// Interpret a dream and generate its thumbnail
    Analyze { id: String },
    /// Toggle validation of one explanation (0-based indices)
    Validate {
        id: String,
        aspect: usize,
        explanation: usize,
    },
    Rename { id: String, title: String },
    /// Move a dream to another day (YYYY-MM-DD), keeping its time
    Redate { id: String, day: chrono::NaiveDate },
    /// Explain a theme, from the journal when already explored
    Theme { name: String },
    /// List explored themes
    Themes {
        #[arg(long)]
        search: Option<String>,
    },
    ForgetTheme { name: String },
    /// Analyze recurring patterns across recent dreams
    Global {
        /// Print the stored analysis without requesting a new one
        #[arg(long)]
        cached: bool,
    },
    Insights,
    Calendar {
        #[arg(long, default_value_t = DEFAULT_CALENDAR_DAYS)]
        days: u32,
    },
}

#[cfg(feature = "cli")]
fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(feature = "cli")]
async fn analyze_and_wait(journal: &DreamJournal, id: &str) -> anyhow::Result<()> {
    let analyzed = journal.analyze_dream(id).await?;
    if let Some(task) = analyzed.thumbnail_task {
        if let Err(e) = task.await {
            tracing::warn!("Thumbnail task ended abnormally: {}", e);
        }
    }
    print_json(&journal.get(id).await?)
}

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing(if cli.verbose {
        telemetry::VERBOSE_LOG_FILTER
    } else {
        telemetry::DEFAULT_LOG_FILTER
    });

    let cfg = Config::from_env()?;
    if cli.show_config {
        cfg.print_config();
    }

    let db = Arc::new(JournalDatabase::open(&cfg.db_path));
    db.initialize().await?;
    let client = Arc::new(AnalysisClient::new(cfg.analysis_config()));
    let journal = DreamJournal::new(db, client);

    match cli.command {
        Command::Add { text, analyze } => {
            let dream = journal.record_dream(&text).await?;
            if analyze {
                analyze_and_wait(&journal, &dream.id).await?;
            } else {
                print_json(&dream)?;
            }
        }
        Command::List => print_json(&journal.load_all().await?)?,
        Command::Show { id } => print_json(&journal.get(&id).await?)?,
        Command::Delete { id } => {
            let deleted = journal.delete(&id).await?;
            print_json(&serde_json::json!({ "id": id, "deleted": deleted }))?;
        }
        Command::Analyze { id } => analyze_and_wait(&journal, &id).await?,
        Command::Validate { id, aspect, explanation } => {
            print_json(&journal.toggle_explanation_validation(&id, aspect, explanation).await?)?
        }
        Command::Rename { id, title } => print_json(&journal.rename_dream(&id, &title).await?)?,
        Command::Redate { id, day } => print_json(&journal.move_dream_to_day(&id, day).await?)?,
        Command::Theme { name } => print_json(&journal.explore_theme(&name).await?)?,
        Command::Themes { search } => match search {
            Some(query) => print_json(&journal.search_themes(&query).await?)?,
            None => print_json(&journal.saved_themes().await?)?,
        },
        Command::ForgetTheme { name } => {
            let deleted = journal.delete_theme(&name).await?;
            print_json(&serde_json::json!({ "theme": name, "deleted": deleted }))?;
        }
        Command::Global { cached } => {
            if cached {
                print_json(&journal.latest_global_analysis().await?)?
            } else {
                print_json(&journal.refresh_global_analysis().await?)?
            }
        }
        Command::Insights => print_json(&journal.insights().await?)?,
        Command::Calendar { days } => print_json(&journal.calendar(days).await?)?,
    }

    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    println!("CLI feature not enabled. Enable with --features cli");
}

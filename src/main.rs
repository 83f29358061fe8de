use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use guidance_dss::config::{self, Config, DatabaseSettings};
use guidance_dss::models::BehaviorReport;
use guidance_dss::{db, lexicon, report, rules};

#[derive(Parser)]
#[command(name = "guidance-dss")]
#[command(about = "Decision support for guidance counselors reviewing behavior reports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
#[group(id = "source", multiple = false)]
struct SourceArgs {
    /// Read reports from a CSV file instead of Postgres
    #[arg(long)]
    csv: Option<PathBuf>,
    /// Postgres connection string, overrides DATABASE_URL and DB_* settings
    #[arg(long)]
    database_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List lexicon keywords found in a piece of text
    Keywords {
        #[arg(long)]
        text: String,
    },
    /// Print the keyword lexicon as JSON
    Lexicon,
    /// Recommendations for a single report, as JSON
    Recommend {
        #[arg(long)]
        report_id: i64,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Dashboard analysis plus per-report recommendations, as JSON
    Analyze {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        scope: Option<String>,
        #[arg(long, default_value = "behavior-report.md")]
        out: PathBuf,
        #[command(flatten)]
        source: SourceArgs,
    },
}

async fn load_reports(source: &SourceArgs) -> anyhow::Result<Vec<BehaviorReport>> {
    if let Some(path) = &source.csv {
        return db::load_csv(path).with_context(|| format!("failed to read {}", path.display()));
    }

    let config = Config::from_env()?;
    let settings = match &source.database_url {
        Some(url) => DatabaseSettings::Url(url.clone()),
        None => config.require_database()?.clone(),
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(settings.connect_options()?)
        .await
        .context("failed to connect to Postgres")?;

    Ok(db::fetch_reports(&pool).await?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::load_dotenv();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config::log_filter_from_env()))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Keywords { text } => {
            let keywords = lexicon::extract_keywords(Some(text.as_str()));
            if keywords.is_empty() {
                println!("No keywords found.");
            } else {
                for keyword in keywords {
                    println!("- {keyword}");
                }
            }
        }
        Commands::Lexicon => {
            println!("{}", serde_json::to_string_pretty(lexicon::KEYWORD_GROUPS)?);
        }
        Commands::Recommend { report_id, source } => {
            let reports = load_reports(&source).await?;
            let target = db::find_report(&reports, report_id)?;
            let recommendations = rules::generate_recommendations(target, &reports);
            info!(report_id, recommendations = recommendations.len(), "generated recommendations");
            println!("{}", serde_json::to_string_pretty(&recommendations)?);
        }
        Commands::Analyze { source } => {
            let reports = load_reports(&source).await?;
            let dashboard = report::analyze_all_reports(&reports);
            let annotated = report::annotate_reports(&reports);
            let students = report::reported_students(&reports);
            let payload = serde_json::json!({
                "success": true,
                "reports": annotated,
                "students": students,
                "dashboardAnalysis": dashboard,
            });
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        Commands::Report { scope, out, source } => {
            let reports = load_reports(&source).await?;
            let markdown = report::build_report(scope.as_deref(), &reports);
            std::fs::write(&out, markdown)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

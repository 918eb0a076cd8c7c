// SmartSummary CLI
// Summarize saved web pages, chat over stored summaries and render share images
//
// Run with: cargo run --bin smartsummary -- summarize page.html --url https://...
//
// Provider settings live in the SQLite database (see `smartsummary config`);
// SMARTSUMMARY_API_KEY / _PROVIDER / _MODEL / _BASE_URL override them per run.

mod commands;
mod config;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use smartsummary_lib::{Language, SummaryLength};

#[derive(Parser)]
#[command(
    name = "smartsummary",
    version,
    about = "Summarize web pages with OpenAI, Claude or Gemini and share the result as an image"
)]
struct Cli {
    /// Database file (defaults to the per-user data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a saved HTML page, or a selection on it
    Summarize {
        /// HTML file of the page
        file: PathBuf,

        /// Address the page was saved from
        #[arg(long)]
        url: Option<String>,

        /// Summarize this text instead of the whole page
        #[arg(long)]
        selection: Option<String>,

        #[arg(long, value_enum)]
        length: Option<LengthArg>,

        /// bullet, paragraph, qa or a custom style id
        #[arg(long)]
        style: Option<String>,

        #[arg(long, value_enum)]
        language: Option<LanguageArg>,

        /// Print the result without storing it
        #[arg(long)]
        no_save: bool,
    },

    /// Ask a follow-up question about a stored summary
    Chat {
        /// Summary id
        summary: String,

        question: String,

        /// Continue an existing chat session
        #[arg(long)]
        session: Option<String>,
    },

    /// Check the configured provider with a minimal request
    Validate {
        #[arg(long)]
        json: bool,
    },

    /// Browse or prune stored summaries and chats
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Write all stored data as JSON
    Export {
        /// Output file (stdout when omitted)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Load data written by `export`
    Import { file: PathBuf },

    /// Render a stored summary as a PNG share image
    Render {
        /// Summary id
        summary: String,

        /// modern, xiaohongshu, zhihu, weibo or academic
        #[arg(long, short, default_value = "modern")]
        template: String,

        /// TrueType/OpenType font used for all text
        #[arg(long)]
        font: Option<PathBuf>,

        /// Bold face; bold text is double-struck without it
        #[arg(long)]
        bold_font: Option<PathBuf>,

        /// Directory the PNG is written to
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,

        /// Device pixels per layout pixel
        #[arg(long, default_value_t = 2.0)]
        scale: f32,
    },

    /// List the share image templates
    Templates,

    /// Show or change provider and summary defaults
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List stored summaries, newest first
    List,
    /// Print one summary
    Show { id: String },
    /// Delete one summary
    Delete { id: String },
    /// List chat sessions, newest first
    Chats,
    /// Print one chat session
    ShowChat { id: String },
    /// Delete one chat session
    DeleteChat { id: String },
    /// Remove all summaries, chats and settings
    Clear {
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the stored settings (API keys masked)
    Show,
    /// Update the default provider and summary defaults
    Set {
        #[arg(long)]
        provider: Option<String>,
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        base_url: Option<String>,
        #[arg(long, value_enum)]
        length: Option<LengthArg>,
        #[arg(long)]
        style: Option<String>,
        #[arg(long, value_enum)]
        language: Option<LanguageArg>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LengthArg {
    Short,
    Medium,
    Long,
}

impl From<LengthArg> for SummaryLength {
    fn from(value: LengthArg) -> Self {
        match value {
            LengthArg::Short => SummaryLength::Short,
            LengthArg::Medium => SummaryLength::Medium,
            LengthArg::Long => SummaryLength::Long,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LanguageArg {
    Zh,
    En,
    Auto,
}

impl From<LanguageArg> for Language {
    fn from(value: LanguageArg) -> Self {
        match value {
            LanguageArg::Zh => Language::Zh,
            LanguageArg::En => Language::En,
            LanguageArg::Auto => Language::Auto,
        }
    }
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let db = cli.db.as_deref();
    let mut out = std::io::stdout();
    match cli.command {
        Commands::Summarize { file, url, selection, length, style, language, no_save } => {
            let request = commands::SummarizeRequest {
                file,
                url,
                selection,
                length: length.map(Into::into),
                style: style.map(Into::into),
                language: language.map(Into::into),
                save: !no_save,
            };
            let ctx = config::CliContext::load(db)?;
            let service = ctx.service();
            commands::summarize(&ctx, &service, request, &mut out).await.map(|_| ())
        }
        Commands::Chat { summary, question, session } => {
            let ctx = config::CliContext::load(db)?;
            let service = ctx.service();
            commands::chat(&ctx, &service, &summary, &question, session.as_deref(), &mut out)
                .await
                .map(|_| ())
        }
        Commands::Validate { json } => {
            let ctx = config::CliContext::load(db)?;
            commands::validate(&ctx, &ctx.service(), json, &mut out).await
        }
        Commands::History { action } => {
            let storage = config::open_storage(db)?;
            match action {
                HistoryAction::List => commands::list_summaries(&storage, &mut out),
                HistoryAction::Show { id } => commands::show_summary(&storage, &id, &mut out),
                HistoryAction::Delete { id } => commands::delete_summary(&storage, &id, &mut out),
                HistoryAction::Chats => commands::list_chats(&storage, &mut out),
                HistoryAction::ShowChat { id } => commands::show_chat(&storage, &id, &mut out),
                HistoryAction::DeleteChat { id } => commands::delete_chat(&storage, &id, &mut out),
                HistoryAction::Clear { yes } => commands::clear(&storage, yes, &mut out),
            }
        }
        Commands::Export { output } => {
            commands::export(&config::open_storage(db)?, output.as_deref(), &mut out)
        }
        Commands::Import { file } => commands::import(&config::open_storage(db)?, &file, &mut out),
        Commands::Render { summary, template, font, bold_font, out_dir, scale } => {
            let request = commands::RenderRequest {
                summary_id: summary,
                template,
                font,
                bold_font,
                out_dir,
                scale,
            };
            commands::render(&config::open_storage(db)?, &request, &mut out).map(|_| ())
        }
        Commands::Templates => commands::list_templates(&mut out),
        Commands::Config { action } => {
            let storage = config::open_storage(db)?;
            match action {
                ConfigAction::Show => commands::show_config(&storage, &mut out),
                ConfigAction::Set { provider, api_key, model, base_url, length, style, language } => {
                    let update = commands::ConfigUpdate {
                        provider,
                        api_key,
                        model,
                        base_url,
                        length: length.map(Into::into),
                        style: style.map(Into::into),
                        language: language.map(Into::into),
                    };
                    commands::set_config(&storage, update, &mut out)
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("[smartsummary] Ignoring .env: {}", e);
        }
    }
    init_logging();

    let cli = Cli::parse();

    // Dropping the command future abandons any request in flight
    #[cfg(unix)]
    {
        let mut sigterm = signal(SignalKind::terminate())?;
        return tokio::select! {
            result = run(cli) => result,
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\n[smartsummary] Interrupted");
                std::process::exit(130);
            }
            _ = sigterm.recv() => {
                eprintln!("[smartsummary] Received SIGTERM, exiting");
                std::process::exit(143);
            }
        };
    }

    #[cfg(not(unix))]
    {
        tokio::select! {
            result = run(cli) => result,
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\n[smartsummary] Interrupted");
                std::process::exit(130);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_db_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["smartsummary", "history", "list", "--db", "/tmp/x.db"]).unwrap();
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/x.db")));
        assert!(matches!(cli.command, Commands::History { action: HistoryAction::List }));
    }

    #[test]
    fn test_summarize_options_parse() {
        let cli = Cli::try_parse_from([
            "smartsummary",
            "summarize",
            "page.html",
            "--length",
            "short",
            "--language",
            "zh",
            "--style",
            "qa",
        ])
        .unwrap();
        match cli.command {
            Commands::Summarize { file, length, language, style, no_save, .. } => {
                assert_eq!(file, PathBuf::from("page.html"));
                assert_eq!(length.map(SummaryLength::from), Some(SummaryLength::Short));
                assert_eq!(language.map(Language::from), Some(Language::Zh));
                assert_eq!(style.as_deref(), Some("qa"));
                assert!(!no_save);
            }
            _ => panic!("expected summarize"),
        }
    }

    #[test]
    fn test_render_defaults() {
        let cli = Cli::try_parse_from(["smartsummary", "render", "abc"]).unwrap();
        match cli.command {
            Commands::Render { template, scale, out_dir, font, .. } => {
                assert_eq!(template, "modern");
                assert_eq!(scale, 2.0);
                assert_eq!(out_dir, PathBuf::from("."));
                assert!(font.is_none());
            }
            _ => panic!("expected render"),
        }
    }

    #[test]
    fn test_invalid_length_is_rejected() {
        assert!(Cli::try_parse_from(["smartsummary", "summarize", "p.html", "--length", "huge"]).is_err());
    }
}

//! pizzini-post - Preview pizzini formatted for social platforms
//!
//! Formats an entry (or ad-hoc text) the way the daemon would publish it,
//! without publishing anything.

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use libpizzini::formatter::voice::{format_title_for_voice, normalize_text_for_voice};
use libpizzini::formatter::{optimal_posting_window, sanitize_content, Platform, PlatformLimits};
use libpizzini::logging::{LoggingConfig, LOG_LEVEL_ENV};
use libpizzini::scheduling::optimizer::suggest_posting_schedule;
use libpizzini::{
    Config, ContentEntry, ContentFormatter, EntryCatalog, EntryId, PizziniError, Result,
};
use serde::Serialize;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "pizzini-post")]
#[command(version)]
#[command(about = "Preview pizzini formatted for social platforms")]
#[command(long_about = "\
pizzini-post - Preview pizzini formatted for social platforms

DESCRIPTION:
    pizzini-post renders a pizzino the way the publishing daemon would:
    sanitized, truncated to the platform limit, tagged with hashtags and
    decorated in each platform's style. Nothing is published.

    Content comes from the entries file (--entry ID) or from --title and
    --content. Without either, the body is read from stdin.

USAGE EXAMPLES:
    # Preview entry 12 for twitter and linkedin
    pizzini-post format --entry 12 --platform twitter,linkedin

    # Format ad-hoc text from stdin as JSON
    echo \"La parola rapporto...\" | pizzini-post format --title \"AIUTO\" --format json

    # Split a long entry into a twitter thread
    pizzini-post thread --entry 40

    # List entries, suggest posting times
    pizzini-post entries
    pizzini-post suggest --platform twitter,instagram --posts-per-week 5

CONFIGURATION:
    Configuration file: ~/.config/pizzini/config.toml
    Override with environment variables:
        PIZZINI_CONFIG     - Path to config file
        PIZZINI_ENTRIES    - Path to the entries JSON file

EXIT CODES:
    0 - Success
    1 - Runtime error
    2 - Configuration or entries file error
    3 - Invalid input (unknown entry, platform, or format)
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Entries file (JSON array); defaults to the one in the config
    #[arg(long, global = true, env = "PIZZINI_ENTRIES", value_name = "PATH")]
    entries: Option<PathBuf>,

    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Entry id from the entries file
    #[arg(short, long, conflicts_with_all = ["title", "content"])]
    entry: Option<EntryId>,

    /// Title for ad-hoc content
    #[arg(short, long)]
    title: Option<String>,

    /// Body for ad-hoc content (reads stdin if omitted)
    #[arg(short, long)]
    content: Option<String>,

    /// Date shown on Instagram posts (entries use their own)
    #[arg(long)]
    date: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Format content for one or more platforms
    Format {
        #[command(flatten)]
        source: SourceArgs,

        /// Target platform(s), comma-separated
        #[arg(short, long, value_delimiter = ',', default_value = "twitter")]
        platform: Vec<String>,

        /// Leave hashtags out
        #[arg(long)]
        no_hashtags: bool,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Split content into a numbered thread
    Thread {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(short, long, default_value = "twitter")]
        platform: String,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// List entries in the entries file
    Entries {
        /// Preview length of each body
        #[arg(long, default_value_t = 60)]
        preview: usize,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Suggest posting times per platform
    Suggest {
        #[arg(short, long, value_delimiter = ',', default_value = "twitter,instagram")]
        platform: Vec<String>,

        #[arg(long, default_value_t = 3)]
        posts_per_week: usize,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Rewrite title and body for reading aloud
    Voice {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Print a default configuration file
    InitConfig,
}

/// Title, body and date of the content being previewed
struct Source {
    title: String,
    content: String,
    date: String,
}

fn main() {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::from_env(cli.verbose);
    if std::env::var(LOG_LEVEL_ENV).is_err() {
        // Keep stderr quiet unless asked
        logging.level = "error".to_string();
    }
    logging.init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<()> {
    let entries = cli.entries.as_deref();

    match cli.command {
        Commands::Format {
            source,
            platform,
            no_hashtags,
            format,
        } => cmd_format(entries, &source, &platform, !no_hashtags, &format),
        Commands::Thread {
            source,
            platform,
            format,
        } => cmd_thread(entries, &source, &platform, &format),
        Commands::Entries { preview, format } => cmd_entries(entries, preview, &format),
        Commands::Suggest {
            platform,
            posts_per_week,
            format,
        } => cmd_suggest(&platform, posts_per_week, &format),
        Commands::Voice { source } => cmd_voice(entries, &source),
        Commands::InitConfig => {
            print!("{}", Config::default_config().to_toml()?);
            Ok(())
        }
    }
}

/// Format a source for each platform
fn cmd_format(
    entries: Option<&Path>,
    args: &SourceArgs,
    platforms: &[String],
    include_hashtags: bool,
    format: &str,
) -> Result<()> {
    validate_format(format)?;
    let platforms = validate_platforms(platforms)?;
    let source = resolve_source(entries, args)?;

    let mut formatter = ContentFormatter::new();
    let posts: Vec<_> = platforms
        .iter()
        .map(|platform| {
            formatter.format_for_platform(
                &source.title,
                &source.content,
                platform.as_str(),
                &source.date,
                include_hashtags,
            )
        })
        .collect();

    if format == "json" {
        return print_json(&posts);
    }

    if let [post] = posts.as_slice() {
        println!("{}", post.text);
        return Ok(());
    }

    for post in &posts {
        let limit = PlatformLimits::for_name(&post.platform).max_text_length;
        let marker = if post.within_limits { "" } else { ", over limit" };
        println!("--- {} ({}/{} chars{}) ---", post.platform, post.length, limit, marker);
        println!("{}", post.text);
        println!();
    }
    Ok(())
}

#[derive(Serialize)]
struct ThreadOutput<'a> {
    platform: &'a str,
    segments: Vec<String>,
}

fn cmd_thread(entries: Option<&Path>, args: &SourceArgs, platform: &str, format: &str) -> Result<()> {
    validate_format(format)?;
    let platform = parse_platform(platform)?;
    let source = resolve_source(entries, args)?;

    let segments = ContentFormatter::new().create_thread(&source.title, &source.content, platform.as_str());
    debug!(segments = segments.len(), "Thread created");

    if format == "json" {
        return print_json(&ThreadOutput {
            platform: platform.as_str(),
            segments,
        });
    }

    println!("{}", segments.join("\n\n---\n\n"));
    Ok(())
}

/// One row of `entries --format json`
#[derive(Serialize)]
struct EntryListing<'a> {
    #[serde(flatten)]
    entry: &'a ContentEntry,
    /// `yyyy-mm-dd`, or null when the source date is malformed
    iso_date: Option<String>,
}

fn cmd_entries(entries: Option<&Path>, preview: usize, format: &str) -> Result<()> {
    validate_format(format)?;
    let catalog = load_catalog(entries)?;

    if format == "json" {
        let all: Vec<EntryListing> = catalog
            .iter()
            .map(|entry| EntryListing {
                entry,
                iso_date: entry.parsed_date().map(|d| d.to_string()),
            })
            .collect();
        return print_json(&all);
    }

    for entry in catalog.iter() {
        let cleaned = ContentEntry {
            content: sanitize_content(&entry.content),
            ..entry.clone()
        };
        let short = cleaned.short_content(preview);
        println!("{} | {} | {} | {}", entry.id, entry.date, entry.title, short);
    }
    Ok(())
}

fn cmd_suggest(platforms: &[String], posts_per_week: usize, format: &str) -> Result<()> {
    validate_format(format)?;
    let platforms = validate_platforms(platforms)?;
    let names: Vec<String> = platforms.iter().map(|p| p.as_str().to_string()).collect();
    let suggestion = suggest_posting_schedule(&names, posts_per_week);

    if format == "json" {
        return print_json(&suggestion);
    }

    for (platform, times) in &suggestion {
        println!(
            "{}: {} (best window: {})",
            platform,
            times.join(", "),
            optimal_posting_window(platform)
        );
    }
    Ok(())
}

fn cmd_voice(entries: Option<&Path>, args: &SourceArgs) -> Result<()> {
    let source = resolve_source(entries, args)?;
    println!("{}", format_title_for_voice(&source.title));
    println!();
    println!("{}", normalize_text_for_voice(&source.content));
    Ok(())
}

/// Content from the entries file, the command line, or stdin
fn resolve_source(entries: Option<&Path>, args: &SourceArgs) -> Result<Source> {
    if let Some(id) = args.entry {
        let catalog = load_catalog(entries)?;
        let entry = catalog
            .get(id)
            .ok_or_else(|| PizziniError::InvalidInput(format!("Entry {} not found", id)))?;
        return Ok(Source {
            title: entry.title.clone(),
            content: entry.content.clone(),
            date: args.date.clone().unwrap_or_else(|| entry.date.clone()),
        });
    }

    let content = match &args.content {
        Some(content) => content.clone(),
        None => read_stdin()?,
    };
    if content.trim().is_empty() && args.title.as_deref().unwrap_or("").trim().is_empty() {
        return Err(PizziniError::InvalidInput(
            "No content provided. Use --entry, --content or pipe text on stdin".to_string(),
        ));
    }

    Ok(Source {
        title: args.title.clone().unwrap_or_default(),
        content,
        date: args.date.clone().unwrap_or_default(),
    })
}

fn read_stdin() -> Result<String> {
    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|e| PizziniError::InvalidInput(format!("Failed to read stdin: {}", e)))?;
    Ok(buffer)
}

fn load_catalog(entries: Option<&Path>) -> Result<EntryCatalog> {
    match entries {
        Some(path) => EntryCatalog::load_from_path(path),
        None => {
            let config = Config::load()?;
            EntryCatalog::load_from_path(&config.entries_path())
        }
    }
}

fn parse_platform(name: &str) -> Result<Platform> {
    name.parse::<Platform>().map_err(PizziniError::InvalidInput)
}

fn validate_platforms(names: &[String]) -> Result<Vec<Platform>> {
    let platforms = names
        .iter()
        .filter(|n| !n.trim().is_empty())
        .map(|n| parse_platform(n))
        .collect::<Result<Vec<_>>>()?;
    if platforms.is_empty() {
        return Err(PizziniError::InvalidInput("No platform given".to_string()));
    }
    Ok(platforms)
}

fn validate_format(format: &str) -> Result<()> {
    if format != "text" && format != "json" {
        return Err(PizziniError::InvalidInput(format!(
            "Invalid format '{}'. Must be 'text' or 'json'",
            format
        )));
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| PizziniError::InvalidInput(format!("Failed to serialize output: {}", e)))?;
    println!("{}", json);
    Ok(())
}

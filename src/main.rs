//! CLI entry point for `receiptbox`.

use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};

use receiptbox::{AccountId, AttachmentKind, AttachmentRef, AttachmentStore, SaveOptions};

#[derive(Parser)]
#[command(
    name = "receiptbox",
    version,
    about = "Store receipts and statements per account and read them back as data URLs"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Attachment root directory (overrides the config file)
    #[arg(long, global = true, env = "RECEIPTBOX_ROOT", value_name = "DIR")]
    root: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Save a file as an attachment of an account
    Save {
        account: AccountId,
        file: PathBuf,
        /// Display name to store instead of the file's own name
        #[arg(long)]
        name: Option<String>,
        /// Declared MIME type, used when the name has no extension
        #[arg(long = "type", value_name = "MIME")]
        declared_type: Option<String>,
        /// Document kind: invoice or receipt
        #[arg(long)]
        kind: Option<AttachmentKind>,
        /// Free-form note stored with the attachment
        #[arg(long)]
        info: Option<String>,
    },
    /// List the attachments of an account
    List {
        account: AccountId,
        #[arg(long)]
        json: bool,
    },
    /// Print an attachment as a data URL
    Show {
        account: AccountId,
        stored_name: String,
    },
    /// Write the effective configuration to the config file
    InitConfig,
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = receiptbox::config::load_config();
    if let Some(root) = cli.root {
        config.storage.root = Some(root);
    }

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    let store = AttachmentStore::from_config(&config.storage);

    match cli.command {
        Commands::Save {
            account,
            file,
            name,
            declared_type,
            kind,
            info,
        } => {
            let mut options = SaveOptions::new(account, name.unwrap_or_default());
            options.declared_type = declared_type;
            options.kind = kind;
            options.info = info;
            cmd_save(&store, &file, options)
        }
        Commands::List { account, json } => cmd_list(&store, &account, json),
        Commands::Show {
            account,
            stored_name,
        } => cmd_show(&store, &account, &stored_name),
        Commands::InitConfig => cmd_init_config(&config),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &receiptbox::config::Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_path = receiptbox::config::log_file_path(config);
    let log_target = match (log_path.parent(), log_path.file_name()) {
        (Some(dir), Some(file)) if std::fs::create_dir_all(dir).is_ok() => Some((dir, file)),
        _ => None,
    };
    if let Some((log_dir, log_file)) = log_target {
        let file_appender = tracing_appender::rolling::never(log_dir, log_file);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Save a file from disk into the store. An empty name falls back to the
/// file's own name.
fn cmd_save(store: &AttachmentStore, file: &Path, mut options: SaveOptions) -> anyhow::Result<()> {
    let buffer = std::fs::read(file)
        .map_err(|e| anyhow::anyhow!("Cannot read '{}': {e}", file.display()))?;
    if options.original_name.is_empty() {
        options.original_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
    }

    let reference = store.save(&buffer, &options)?;
    println!("{}", reference.path.display());
    Ok(())
}

/// List an account's attachments as a table or JSON.
fn cmd_list(store: &AttachmentStore, account: &AccountId, json: bool) -> anyhow::Result<()> {
    let refs = store.list_by_account(account)?;
    if json {
        print_list_json(account, &refs)
    } else {
        print_list_table(account, &refs);
        Ok(())
    }
}

/// Print one attachment as a `data:` URL.
fn cmd_show(store: &AttachmentStore, account: &AccountId, stored_name: &str) -> anyhow::Result<()> {
    let reference = store.resolve(account, stored_name)?;
    let payload = store.read_as_payload(&reference)?;
    println!("{payload}");
    Ok(())
}

/// Persist the effective configuration (including `--root`) as TOML.
fn cmd_init_config(config: &receiptbox::config::Config) -> anyhow::Result<()> {
    receiptbox::config::save_config(config)?;
    if let Some(path) = receiptbox::config::config_file_path() {
        println!("  Wrote {}", path.display());
    }
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "receiptbox", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

/// Print attachments as a human-readable table.
fn print_list_table(account: &AccountId, refs: &[AttachmentRef]) {
    use humansize::{format_size, BINARY};

    println!();
    println!("  Account {account}: {} attachment(s)", refs.len());
    println!();

    if refs.is_empty() {
        return;
    }

    println!(
        "  {:<4} {:<17} {:<8} {:<24} {:>10}  {}",
        "#", "Saved", "Kind", "Type", "Size", "Name"
    );
    println!("  {}", "-".repeat(90));

    for (i, r) in refs.iter().enumerate() {
        println!(
            "  {:<4} {:<17} {:<8} {:<24} {:>10}  {}",
            i + 1,
            r.saved_at.format("%Y-%m-%d %H:%M").to_string(),
            r.kind.map(AttachmentKind::as_str).unwrap_or("-"),
            r.mime_type(),
            format_size(r.size, BINARY),
            r.original_name
        );
        if r.original_name != r.stored_name {
            println!("  {:<4} {:>62}  {}", "", "stored as", r.stored_name);
        }
    }
    println!();
}

/// Print attachments as JSON.
fn print_list_json(account: &AccountId, refs: &[AttachmentRef]) -> anyhow::Result<()> {
    let items: Vec<serde_json::Value> = refs
        .iter()
        .map(|r| {
            serde_json::json!({
                "stored_name": r.stored_name,
                "original_name": r.original_name,
                "kind": r.kind,
                "info": r.info,
                "path": r.path.to_string_lossy(),
                "mime_type": r.mime_type(),
                "size": r.size,
                "saved_at": r.saved_at.to_rfc3339(),
            })
        })
        .collect();

    let output = serde_json::json!({
        "account_id": account.as_str(),
        "count": refs.len(),
        "attachments": items,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

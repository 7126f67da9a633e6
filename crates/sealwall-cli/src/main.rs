//! sealwall: anonymous encrypted messages to a single recipient
//!
//! Recipient commands:
//!   keys generate [--force]  - create the recipient key pair
//!   keys show                - print the public key to hand to senders
//!   read <id>                - decrypt one ledger record
//!   inbox                    - decrypt the whole ledger
//!
//! Sender commands:
//!   send <message>           - encrypt and append to the ledger
//!   count                    - number of records in the ledger
//!
//! Offline codec:
//!   encrypt <message> [--armor]
//!   decrypt [--armor] [FILE|-]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use sealwall_core::config::{expand_tilde, SealwallConfig};
use sealwall_core::Record;
use sealwall_crypto::{
    decrypt_all_with_progress, CryptoError, EncryptedEnvelope, EncryptionService, KeyManager,
    ProgressFn, RsaOaep,
};
use sealwall_storage::Ledger;

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "sealwall",
    version,
    about = "Anonymous encrypted messages to a single recipient",
    long_about = "sealwall: encrypt messages to one recipient's RSA key and keep them in an append-only ledger"
)]
struct Cli {
    /// Path to sealwall.toml configuration file
    #[arg(
        long,
        short = 'c',
        env = "SEALWALL_CONFIG",
        default_value = "~/.config/sealwall/sealwall.toml"
    )]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides [logging] level
    #[arg(long, env = "SEALWALL_LOG")]
    log: Option<String>,

    /// Log format; overrides [logging] format
    #[arg(long)]
    log_format: Option<LogFormat>,

    /// Recipient public key (base64 SPKI); overrides [keys] recipient_public_key
    #[arg(long, env = "SEALWALL_RECIPIENT_PUBLIC_KEY")]
    recipient_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Recipient key management
    Keys {
        #[command(subcommand)]
        action: KeysAction,
    },

    /// Encrypt a message for the recipient and append it to the ledger
    Send {
        message: String,
    },

    /// Number of records in the ledger
    Count,

    /// Decrypt one ledger record (recipient only)
    Read {
        id: u64,
    },

    /// Decrypt every ledger record (recipient only)
    Inbox {
        /// Decryption threads (default: [inbox] workers)
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Encrypt without touching the ledger; prints hex words
    Encrypt {
        message: String,
        /// Print the armored envelope instead of hex words
        #[arg(long)]
        armor: bool,
    },

    /// Decrypt hex words or an armored envelope from a file or stdin
    Decrypt {
        /// Input file, or `-` for stdin
        #[arg(default_value = "-")]
        input: String,
        /// Input is an armored envelope
        #[arg(long)]
        armor: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum KeysAction {
    /// Generate and store a new recipient key pair
    Generate {
        /// Replace an existing key pair; messages sent to the old key become unreadable
        #[arg(long)]
        force: bool,
    },
    /// Print the recipient public key and its fingerprint
    Show,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = expand_tilde(&cli.config);
    let config = SealwallConfig::load(&config_path)
        .with_context(|| format!("loading config: {}", config_path.display()))?;

    let level = cli.log.clone().unwrap_or_else(|| config.logging.level.clone());
    let format = cli.log_format.clone().unwrap_or(match config.logging.format.as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    });
    init_logging(&level, &format);
    debug!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        found = config_path.exists(),
        "sealwall starting"
    );

    let result = run(cli, config, &config_path).await;
    result.map_err(with_key_hint)
}

async fn run(cli: Cli, config: SealwallConfig, config_path: &Path) -> Result<()> {
    let recipient_key = cli.recipient_key;
    match cli.command {
        Commands::Keys { action: KeysAction::Generate { force } } => {
            cmd_keys_generate(&config, force)
        }
        Commands::Keys { action: KeysAction::Show } => cmd_keys_show(&config, recipient_key),
        Commands::Send { message } => cmd_send(&config, recipient_key, &message).await,
        Commands::Count => cmd_count(&config).await,
        Commands::Read { id } => cmd_read(&config, id).await,
        Commands::Inbox { workers } => cmd_inbox(&config, workers).await,
        Commands::Encrypt { message, armor } => {
            cmd_encrypt(&config, recipient_key, &message, armor)
        }
        Commands::Decrypt { input, armor } => cmd_decrypt(&config, &input, armor),
        Commands::Config { action: ConfigAction::Show } => cmd_config_show(&config, config_path),
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// Tell the user what to do when key material is missing.
fn with_key_hint(err: anyhow::Error) -> anyhow::Error {
    let hint = match err.downcast_ref::<CryptoError>() {
        Some(CryptoError::NoPublicKey) => {
            "run `sealwall keys generate` on the recipient device, or pass the recipient's \
             public key with --recipient-key / SEALWALL_RECIPIENT_PUBLIC_KEY"
        }
        Some(CryptoError::NoPrivateKey) => {
            "only the device that ran `sealwall keys generate` can decrypt messages"
        }
        _ => return err,
    };
    err.context(hint)
}

// ── Shared builders ───────────────────────────────────────────────────────────

fn build_service(config: &SealwallConfig, recipient_key: Option<String>) -> Result<EncryptionService> {
    let store = sealwall_secrets::open_key_store(&config.keys).context("opening key store")?;
    let provider = RsaOaep::new(config.keys.key_bits)?;
    let public_override = recipient_key.or_else(|| config.keys.recipient_public_key.clone());
    let keys = KeyManager::new(provider, store).with_public_override(public_override);
    Ok(EncryptionService::new(keys, config.codec.length_recovery))
}

fn open_ledger(config: &SealwallConfig) -> Result<Ledger> {
    let op = sealwall_storage::build_operator(&config.ledger).context("building ledger operator")?;
    Ok(Ledger::new(op, &config.ledger.prefix))
}

/// Reject messages longer than `max_chars` characters (0 disables the check).
fn check_message_len(message: &str, max_chars: usize) -> Result<()> {
    let chars = message.chars().count();
    if max_chars > 0 && chars > max_chars {
        anyhow::bail!("message is {chars} characters; the limit is {max_chars} (codec.max_message_chars)");
    }
    Ok(())
}

fn make_progress_bar(total: u64, prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::with_template("{prefix:.bold} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .map(|s| s.progress_chars("=>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(input).with_context(|| format!("reading {input}"))
    }
}

// ── `sealwall keys` ───────────────────────────────────────────────────────────

fn cmd_keys_generate(config: &SealwallConfig, force: bool) -> Result<()> {
    let service = build_service(config, None)?;
    let keys = service.keys();

    if keys.has_private()? && !force {
        anyhow::bail!(
            "a recipient key pair already exists in {}\n\
             Regenerating makes every message sent to the old key unreadable.\n\
             Re-run with --force to replace it.",
            keys.store().describe()
        );
    }

    println!("Generating RSA-{} key pair...", config.keys.key_bits);
    let (pair, encoded) = keys.generate_and_persist()?;
    let fingerprint = keys.fingerprint(pair.public())?;
    info!(fingerprint = %fingerprint, "recipient key pair generated");

    println!("  store:       {}", keys.store().describe());
    println!("  fingerprint: {fingerprint}");
    println!();
    println!("Give senders this public key:");
    println!("{}", encoded.public);
    Ok(())
}

fn cmd_keys_show(config: &SealwallConfig, recipient_key: Option<String>) -> Result<()> {
    let service = build_service(config, recipient_key)?;
    let keys = service.keys();

    let Some(encoded) = keys.public_encoded()? else {
        return Err(CryptoError::NoPublicKey.into());
    };
    let public = keys
        .load_public()?
        .ok_or(CryptoError::NoPublicKey)?;

    println!("store:       {}", keys.store().describe());
    println!("private key: {}", if keys.has_private()? { "present" } else { "absent" });
    println!("fingerprint: {}", keys.fingerprint(&public)?);
    println!("public key:");
    println!("{encoded}");
    Ok(())
}

// ── `sealwall send` / `count` / `read` / `inbox` ──────────────────────────────

async fn cmd_send(
    config: &SealwallConfig,
    recipient_key: Option<String>,
    message: &str,
) -> Result<()> {
    check_message_len(message, config.codec.max_message_chars)?;
    let service = build_service(config, recipient_key)?;
    let record = service.encrypt_for_recipient(message)?;

    let ledger = open_ledger(config)?;
    let id = ledger.append(&record).await.context("appending to ledger")?;

    println!("sent: id {id} ({} words)", record.len());
    Ok(())
}

async fn cmd_count(config: &SealwallConfig) -> Result<()> {
    let ledger = open_ledger(config)?;
    println!("{}", ledger.count().await.context("counting ledger records")?);
    Ok(())
}

async fn cmd_read(config: &SealwallConfig, id: u64) -> Result<()> {
    let ledger = open_ledger(config)?;
    let record = ledger
        .get(id)
        .await
        .with_context(|| format!("reading record {id}"))?
        .with_context(|| format!("no record with id {id}"))?;

    let service = build_service(config, None)?;
    let message = service
        .decrypt_as_recipient(&record)
        .with_context(|| format!("decrypting record {id}"))?;
    println!("{message}");
    Ok(())
}

async fn cmd_inbox(config: &SealwallConfig, workers: Option<usize>) -> Result<()> {
    let ledger = open_ledger(config)?;
    let (ids, records): (Vec<u64>, Vec<Record>) = ledger
        .entries()
        .await
        .context("listing ledger")?
        .into_iter()
        .unzip();
    if records.is_empty() {
        println!("inbox is empty");
        return Ok(());
    }

    let service = build_service(config, None)?;
    let pb = make_progress_bar(records.len() as u64, "inbox");
    let pb_clone = pb.clone();
    let progress: ProgressFn = Box::new(move |done, _total, msg| {
        pb_clone.set_position(done);
        pb_clone.set_message(msg.to_string());
    });

    let workers = workers.unwrap_or(config.inbox.workers);
    let entries = decrypt_all_with_progress(&service, &records, workers, Some(&progress))?;
    pb.finish_with_message("done".to_string());

    let mut unreadable = 0usize;
    for entry in &entries {
        match &entry.result {
            Ok(message) => println!("[{}] {message}", ids[entry.index]),
            Err(e) => {
                unreadable += 1;
                println!("[{}] <unreadable: {e}>", ids[entry.index]);
            }
        }
    }
    println!();
    println!("{} messages, {unreadable} unreadable", entries.len());
    Ok(())
}

// ── `sealwall encrypt` / `decrypt` ────────────────────────────────────────────

fn cmd_encrypt(
    config: &SealwallConfig,
    recipient_key: Option<String>,
    message: &str,
    armor: bool,
) -> Result<()> {
    check_message_len(message, config.codec.max_message_chars)?;
    let service = build_service(config, recipient_key)?;

    if armor {
        let envelope = service.encrypt_envelope(message)?;
        println!("{}", envelope.to_armored()?);
    } else {
        let record = service.encrypt_for_recipient(message)?;
        println!("{}", record.to_hex_lines());
    }
    Ok(())
}

fn cmd_decrypt(config: &SealwallConfig, input: &str, armor: bool) -> Result<()> {
    let text = read_input(input)?;
    let service = build_service(config, None)?;

    let message = if armor {
        let envelope = EncryptedEnvelope::from_armored(&text)?;
        service.decrypt_envelope(&envelope)?
    } else {
        let record = Record::from_hex_words(&text).context("parsing hex words")?;
        service.decrypt_as_recipient(&record)?
    };
    println!("{message}");
    Ok(())
}

// ── `sealwall config show` ────────────────────────────────────────────────────

fn cmd_config_show(config: &SealwallConfig, path: &Path) -> Result<()> {
    println!("# {}", path.display());
    println!("{}", toml::to_string_pretty(config).context("rendering config")?);

    let store = sealwall_secrets::open_key_store(&config.keys).context("opening key store")?;
    println!("# key store: {}", store.describe());
    Ok(())
}

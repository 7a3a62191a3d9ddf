//! wacrypt: crypt15 backup tool
//!
//! Commands:
//!   decrypt <key> <input> <output>    - decrypt (and decompress) a backup
//!   encrypt <key> <input> <output>    - author a crypt15 container
//!   create-key [-o FILE]              - write a new 32-byte root key
//!
//! `<key>` is a key file (32 raw bytes or 64 hex characters) or a hex string.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use wacrypt_core::config::WacryptConfig;
use wacrypt_crypto::payload::{self, PayloadKind};
use wacrypt_crypto::{
    decrypt_container, encrypt_container, ContainerHeader, EncryptOptions, FeatureTable,
    HeaderTemplate, RootKey, TracingSink, IV_SIZE, KEY_SIZE,
};

#[derive(Parser, Debug)]
#[command(
    name = "wacrypt",
    version,
    about = "Decrypt and encrypt crypt15 backup containers"
)]
struct Cli {
    /// Path to wacrypt.toml configuration file
    #[arg(long, short = 'c', env = "WACRYPT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error) [default: from config, else info]
    #[arg(long, env = "WACRYPT_LOG")]
    log: Option<String>,

    /// Log format [default: from config, else text]
    #[arg(long, env = "WACRYPT_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Decrypt a backup container
    Decrypt {
        /// Key file or 64-character hex key
        key: String,
        /// Encrypted backup
        input: PathBuf,
        /// Where to write the decrypted database
        output: PathBuf,
        /// Write the decrypted payload without decompressing it
        #[arg(long)]
        keep_compressed: bool,
        /// Fail instead of writing output when the authentication tag does not match
        #[arg(long)]
        strict: bool,
    },

    /// Encrypt a database into a crypt15 container
    Encrypt(EncryptArgs),

    /// Create a new root key file
    #[command(name = "create-key")]
    CreateKey {
        /// Use this 64-character hex key instead of generating one
        #[arg(long)]
        hex: Option<String>,
        /// Output key file
        #[arg(long, short = 'o', default_value = "encrypted_backup.key")]
        output: PathBuf,
        /// Overwrite the output file if it exists
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

#[derive(Args, Debug)]
struct EncryptArgs {
    /// Key file or 64-character hex key
    key: String,
    /// Plain database file
    input: PathBuf,
    /// Where to write the container
    output: PathBuf,
    /// IV as 32 hex characters (default: random)
    #[arg(long)]
    iv: Option<String>,
    /// Copy header fields (version, suffix, features) from an existing container
    #[arg(long)]
    reference: Option<PathBuf>,
    /// Do not zlib-compress the input before encryption
    #[arg(long)]
    no_compress: bool,
    #[command(flatten)]
    header: HeaderOverrides,
}

/// Header fields set on the command line, applied over `[encrypt]` or `--reference`
#[derive(Args, Debug, Default)]
struct HeaderOverrides {
    /// App version written into the header
    #[arg(long)]
    wa_version: Option<String>,
    /// Last two digits of the owner's phone number
    #[arg(long)]
    jid: Option<String>,
    /// Feature numbers to enable (e.g. 5,7,8); replaces the configured feature table
    #[arg(long, num_args = 1.., value_delimiter = ',')]
    enable_features: Option<Vec<u32>>,
}

impl HeaderOverrides {
    fn apply(&self, mut template: HeaderTemplate) -> HeaderTemplate {
        if let Some(version) = &self.wa_version {
            template.app_version = version.clone();
        }
        if let Some(jid) = &self.jid {
            template.jid_suffix = jid.clone();
        }
        if let Some(numbers) = &self.enable_features {
            template.features = numbers
                .iter()
                .map(|n| (format!("f_{n}"), true))
                .collect::<FeatureTable>();
        }
        template
    }
}

#[derive(Clone, Debug, ValueEnum, PartialEq)]
enum LogFormat {
    Json,
    Text,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            anyhow::ensure!(path.exists(), "config file not found: {}", path.display());
            WacryptConfig::load(path)
                .map_err(|e| anyhow::anyhow!("loading config {}: {e}", path.display()))?
        }
        None => WacryptConfig::default(),
    };

    let level = cli.log.clone().unwrap_or_else(|| config.log.level.clone());
    let format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| match config.log.format.as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        });
    init_logging(&level, &format);

    match cli.command {
        Commands::Decrypt {
            key,
            input,
            output,
            keep_compressed,
            strict,
        } => cmd_decrypt(&key, &input, &output, keep_compressed, strict),
        Commands::Encrypt(args) => cmd_encrypt(&config, &args),
        Commands::CreateKey { hex, output, yes } => cmd_create_key(hex.as_deref(), &output, yes),
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

// ── decrypt ──────────────────────────────────────────────────────────────────

fn cmd_decrypt(
    key: &str,
    input: &Path,
    output: &Path,
    keep_compressed: bool,
    strict: bool,
) -> Result<()> {
    let root = load_key(key)?;
    let data =
        std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;

    let decrypted = decrypt_container(&root, &data, &TracingSink)
        .with_context(|| format!("decrypting {}", input.display()))?;
    info!(
        app_version = %decrypted.header.app_version,
        variant = ?decrypted.variant,
        verified = decrypted.verified,
        "container decrypted"
    );

    let plaintext = if strict {
        decrypted
            .into_verified()
            .context("refusing to write unauthenticated output (--strict)")?
    } else {
        if !decrypted.verified {
            warn!("writing output anyway; it may be corrupted");
        }
        decrypted.plaintext
    };

    let bytes = if keep_compressed {
        plaintext
    } else {
        match payload::classify(&plaintext) {
            PayloadKind::Zlib => {
                let inflated = payload::inflate(&plaintext).context("decompressing payload")?;
                if !inflated.complete {
                    warn!("the encrypted database file is truncated (damaged)");
                }
                inflated.data
            }
            PayloadKind::Zip => {
                info!("payload is a ZIP archive (multi-file backup), writing it as is");
                plaintext
            }
            PayloadKind::Unknown => {
                warn!("payload is neither zlib nor ZIP; the key is probably wrong");
                plaintext
            }
        }
    };

    std::fs::write(output, &bytes)
        .with_context(|| format!("writing {}", output.display()))?;
    info!(bytes = bytes.len(), output = %output.display(), "decryption complete");
    Ok(())
}

// ── encrypt ──────────────────────────────────────────────────────────────────

fn cmd_encrypt(config: &WacryptConfig, args: &EncryptArgs) -> Result<()> {
    let (input, output) = (args.input.as_path(), args.output.as_path());
    let root = load_key(&args.key)?;
    let data =
        std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;

    let header = match &args.reference {
        Some(path) => {
            let bytes =
                std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            let parsed = ContainerHeader::parse(&bytes, &TracingSink)
                .with_context(|| format!("parsing reference header {}", path.display()))?;
            info!(
                app_version = %parsed.app_version,
                features = parsed.enabled_features().len(),
                "using reference header"
            );
            HeaderTemplate::from_parsed(&parsed)
        }
        None => HeaderTemplate::from_config(&config.encrypt),
    };
    let header = args.header.apply(header);

    let mut options = EncryptOptions::new(header);
    if let Some(text) = &args.iv {
        options = options.with_iv(parse_iv(text)?);
    }

    let plaintext = if config.encrypt.compress && !args.no_compress {
        payload::deflate(&data).context("compressing input")?
    } else {
        data
    };

    let container = encrypt_container(&root, &plaintext, &options)
        .with_context(|| format!("encrypting {}", input.display()))?;
    std::fs::write(output, &container)
        .with_context(|| format!("writing {}", output.display()))?;
    info!(bytes = container.len(), output = %output.display(), "encryption complete");
    Ok(())
}

// ── create-key ───────────────────────────────────────────────────────────────

fn cmd_create_key(hex_key: Option<&str>, output: &Path, yes: bool) -> Result<()> {
    if output.exists() && !yes {
        anyhow::bail!(
            "{} already exists; pass --yes to overwrite it",
            output.display()
        );
    }

    let root = match hex_key {
        Some(text) => RootKey::from_hex(text)?,
        None => RootKey::generate(),
    };
    std::fs::write(output, root.as_bytes())
        .with_context(|| format!("writing {}", output.display()))?;
    info!(output = %output.display(), "key written");
    println!("{}", output.display());
    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

/// A key argument names a key file if one exists at that path, otherwise it is hex.
fn load_key(arg: &str) -> Result<RootKey> {
    let path = Path::new(arg);
    if !path.is_file() {
        return RootKey::from_hex(arg).context("key is neither a readable file nor hex");
    }

    let bytes = std::fs::read(path).with_context(|| format!("reading key {}", path.display()))?;
    if bytes.len() == KEY_SIZE {
        return Ok(RootKey::from_slice(&bytes)?);
    }
    let text = std::str::from_utf8(&bytes)
        .with_context(|| format!("key file {} is neither 32 raw bytes nor hex", path.display()))?;
    RootKey::from_hex(text).with_context(|| format!("parsing key file {}", path.display()))
}

fn parse_iv(text: &str) -> Result<[u8; IV_SIZE]> {
    let bytes = hex::decode(text.trim()).context("IV is not a hex string")?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| anyhow::anyhow!("IV must be {IV_SIZE} bytes, got {}", bytes.len()))
}

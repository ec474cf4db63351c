/// BOP command-line tool: build, inspect, validate and combine `.cfgbit`
/// packages, and run the `CFG_CMP` codec on plain files.
///
/// # Command overview
///
/// ```text
/// bop <COMMAND> [OPTIONS]
///
/// Commands:
///   pack        Build a .cfgbit package from a .bitasm JSON manifest
///   inspect     Print the full analyzer trace of a package
///   validate    Check a package and exit non-zero on any error
///   combine     Join packages into one multi-BOP stream
///   compress    Compress a file with the CFG_CMP codec
///   decompress  Decompress a CFG_CMP file
///   keygen      Generate an AES key or an ECDSA signing key
///
/// Global options:
///   -v, --verbose    Raise log level (-v info, -vv debug)
///   -h, --help       Print help
///   -V, --version    Print version
/// ```
///
/// # Exit codes
///
/// | Code | Meaning                                      |
/// |------|----------------------------------------------|
/// | 0    | Success                                      |
/// | 1    | Error (I/O failure, invalid package, etc.)   |
///
/// Logs and error details go to stderr so stdout can be piped cleanly.
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod cmd_combine;
mod cmd_compress;
mod cmd_decompress;
mod cmd_inspect;
mod cmd_keygen;
mod cmd_pack;
mod cmd_validate;
mod keys;

// ── CLI root ──────────────────────────────────────────────────────────────────

/// The BOP (Bitstream Object Package) command-line tool.
#[derive(Parser)]
#[command(name = "bop", version, about = "Bitstream Object Package CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Raise the log level; `RUST_LOG` overrides it.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

// ── Sub-commands ──────────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum Commands {
    /// Build a `.cfgbit` package from a `.bitasm` JSON manifest.
    Pack(PackArgs),
    /// Print the header table and analyzer trace of every BOP.
    Inspect(InspectArgs),
    /// Check a package; exits with code 1 on any error finding.
    Validate(ValidateArgs),
    /// Join packages into one multi-BOP stream with patched end sizes.
    Combine(CombineArgs),
    /// Compress a file with the `CFG_CMP` codec.
    Compress(CompressArgs),
    /// Decompress a `CFG_CMP` file.
    Decompress(DecompressArgs),
    /// Generate key material.
    Keygen(KeygenArgs),
}

// ── Argument structs ──────────────────────────────────────────────────────────

/// Arguments for `bop pack`.
///
/// ```text
/// ┌────────────────────┬──────────────────────────────────────────────┐
/// │ Flag               │ Effect                                       │
/// ├────────────────────┼──────────────────────────────────────────────┤
/// │ --aes-key FILE     │ encrypt payloads (hex key, 16 or 32 bytes)   │
/// │ --signing-key FILE │ sign each header (PKCS#8 PEM, P-256/P-384)   │
/// │ --no-compression   │ store every payload uncompressed             │
/// └────────────────────┴──────────────────────────────────────────────┘
/// ```
#[derive(clap::Args)]
pub struct PackArgs {
    /// Path to the `.bitasm` manifest.
    pub input: PathBuf,

    /// Output `.cfgbit` file path.
    #[arg(short, long)]
    pub output: PathBuf,

    /// File holding the hex-encoded AES key.
    #[arg(long)]
    pub aes_key: Option<PathBuf>,

    /// PKCS#8 PEM file holding the signing key.
    #[arg(long)]
    pub signing_key: Option<PathBuf>,

    /// Turn payload compression off, overriding the manifest.
    #[arg(long)]
    pub no_compression: bool,
}

/// Arguments for `bop inspect`.
#[derive(clap::Args)]
pub struct InspectArgs {
    /// Path to the `.cfgbit` file.
    pub file: PathBuf,

    /// File holding the hex-encoded AES key, to decrypt payloads.
    #[arg(long)]
    pub aes_key: Option<PathBuf>,

    /// Only check the hash chain; do not decrypt or decompress payloads.
    #[arg(long)]
    pub no_payloads: bool,

    /// Hex dump the first bytes of each recovered payload.
    #[arg(long)]
    pub show_payload: bool,

    /// Inspect only the BOP at this zero-based index.
    #[arg(long)]
    pub bop: Option<usize>,
}

/// Arguments for `bop validate`.
#[derive(clap::Args)]
pub struct ValidateArgs {
    /// Path to the `.cfgbit` file.
    pub file: PathBuf,

    /// File holding the hex-encoded AES key, to verify payload checksums.
    #[arg(long)]
    pub aes_key: Option<PathBuf>,

    /// Only validate the BOP sequence, not the BOP contents.
    #[arg(long)]
    pub structure_only: bool,
}

/// Arguments for `bop combine`.
#[derive(clap::Args)]
pub struct CombineArgs {
    /// Packages to join, in order.
    #[arg(required = true, num_args = 1..)]
    pub inputs: Vec<PathBuf>,

    /// Output `.cfgbit` file path.
    #[arg(short, long)]
    pub output: PathBuf,
}

/// Arguments for `bop compress`.
#[derive(clap::Args)]
pub struct CompressArgs {
    pub input: PathBuf,

    #[arg(short, long)]
    pub output: PathBuf,
}

/// Arguments for `bop decompress`.
#[derive(clap::Args)]
pub struct DecompressArgs {
    pub input: PathBuf,

    #[arg(short, long)]
    pub output: PathBuf,

    /// Print which token kinds the stream never used.
    #[arg(long)]
    pub coverage: bool,
}

/// Key kinds `bop keygen` can produce.
#[derive(Clone, Copy, ValueEnum)]
pub enum KeyKind {
    Aes128,
    Aes256,
    Ecdsa256,
    Ecdsa384,
}

/// Arguments for `bop keygen`.
///
/// AES keys are written as one line of hex; signing keys as PKCS#8 PEM.
#[derive(clap::Args)]
pub struct KeygenArgs {
    #[arg(value_enum)]
    pub kind: KeyKind,

    #[arg(short, long)]
    pub output: PathBuf,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Pack(args) => cmd_pack::run(&args),
        Commands::Inspect(args) => cmd_inspect::run(&args),
        Commands::Validate(args) => cmd_validate::run(&args),
        Commands::Combine(args) => cmd_combine::run(&args),
        Commands::Compress(args) => cmd_compress::run(&args),
        Commands::Decompress(args) => cmd_decompress::run(&args),
        Commands::Keygen(args) => cmd_keygen::run(&args),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

//! `igfs`: inspect, extract, verify and decrypt IGEL OS IGFS firmware
//! images from the command line (spec §6).

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use igfs::error::IgfsError;
use igfs::fs::Filesystem;
use igfs::structures::raw::partition_header::ExtentType;

#[derive(Debug, Clone, Parser)]
#[command(name = "igfs", version, about = "Inspect and manipulate IGEL OS IGFS images")]
struct Args {
    #[arg(short, long, global = true, help = "increase log verbosity")]
    verbose: bool,
    #[arg(short, long, global = true, help = "suppress non-error output")]
    quiet: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, clap::Subcommand)]
enum Command {
    /// Print the directory and every partition's header/extent table.
    Info(InfoArgs),
    /// Extract an extent's raw bytes to a file.
    Extract(ExtractArgs),
    /// Verify a partition's CRC32 and, optionally, its hash chain and
    /// signature.
    Verify(VerifyArgs),
    /// Decrypt a KML-encrypted Writeable/Login extent.
    Decrypt(DecryptArgs),
}

#[derive(Debug, Clone, Parser)]
struct InfoArgs {
    image: PathBuf,
    /// Print one `key=value` line per field, INI-style, instead of the
    /// default human-readable tree.
    #[arg(long)]
    inf: bool,
}

#[derive(Debug, Clone, Parser)]
struct ExtractArgs {
    image: PathBuf,
    #[arg(long)]
    minor: u32,
    #[arg(long, value_enum)]
    extent: ExtentArg,
    #[arg(short, long)]
    output: PathBuf,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum ExtentArg {
    Kernel,
    Ramdisk,
    Splash,
    Checksums,
    Squashfs,
    Writeable,
    Login,
    Sectoken,
}

impl From<ExtentArg> for ExtentType {
    fn from(value: ExtentArg) -> Self {
        match value {
            ExtentArg::Kernel => ExtentType::Kernel,
            ExtentArg::Ramdisk => ExtentType::Ramdisk,
            ExtentArg::Splash => ExtentType::Splash,
            ExtentArg::Checksums => ExtentType::Checksums,
            ExtentArg::Squashfs => ExtentType::Squashfs,
            ExtentArg::Writeable => ExtentType::Writeable,
            ExtentArg::Login => ExtentType::Login,
            ExtentArg::Sectoken => ExtentType::SecToken,
        }
    }
}

#[derive(Debug, Clone, Parser)]
struct VerifyArgs {
    image: PathBuf,
    #[arg(long)]
    minor: u32,
    /// Also verify the BLAKE2b hash chain and RSA signature, not just
    /// the CRC32 of each section.
    #[arg(long)]
    deep: bool,
}

#[derive(Debug, Clone, Parser)]
struct DecryptArgs {
    image: PathBuf,
    #[arg(long)]
    minor: u32,
    #[arg(short, long)]
    output: PathBuf,
    /// Boot identifier, hex-encoded (spec §6: `--boot-id <hex>`). Keys
    /// the BLAKE2b derivation that directly unlocks a `Writeable`/`Login`
    /// extent, no passphrase or prior `kmlconfig.json` is needed for
    /// this step (spec §4.8).
    #[arg(long, value_parser = parse_hex)]
    boot_id: Vec<u8>,
}

fn parse_hex(s: &str) -> Result<Vec<u8>, String> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.len() % 2 != 0 {
        return Err("hex string must have an even number of digits".into());
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).map_err(|e| e.to_string()))
        .collect()
}

/// Exit codes (spec §6): 0 success, 2 I/O/usage failure, 3 corrupt
/// structure, 4 integrity failure, 5 signature/trust failure, 1 any
/// other error.
fn exit_code_for(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<IgfsError>() {
        Some(IgfsError::Io(_)) => 2,
        Some(IgfsError::Truncated { .. })
        | Some(IgfsError::InvalidMagic { .. })
        | Some(IgfsError::OutOfRange { .. })
        | Some(IgfsError::CorruptDirectory(_))
        | Some(IgfsError::CycleDetected(_))
        | Some(IgfsError::InvalidImage(_)) => 3,
        Some(IgfsError::ChecksumFailed(_)) | Some(IgfsError::HashMismatch(_)) => 4,
        Some(IgfsError::SignatureInvalid) | Some(IgfsError::UntrustedSigner) => 5,
        _ => 1,
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else if args.quiet {
        tracing::Level::ERROR
    } else {
        tracing::Level::INFO
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(args) {
        Ok(()) => ExitCode::from(0),
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::from(exit_code_for(&err))
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    match args.command {
        Command::Info(cmd) => info(cmd),
        Command::Extract(cmd) => extract(cmd),
        Command::Verify(cmd) => verify(cmd),
        Command::Decrypt(cmd) => decrypt(cmd),
    }
}

fn info(args: InfoArgs) -> anyhow::Result<()> {
    let mut file = OpenOptions::new().read(true).open(&args.image)?;
    let mut fs = Filesystem::open(&mut file)?;

    if args.inf {
        println!("section_count={}", fs.section_count());
        for minor in fs.directory().minors().collect::<Vec<_>>() {
            let partition = fs.get_partition(minor)?;
            println!("partition.{minor}.type={}", partition.header.partition_type);
            println!("partition.{minor}.n_extents={}", partition.header.n_extents);
            for extent in &partition.extents {
                println!(
                    "partition.{minor}.extent.{:?}.length={}",
                    extent.extent_type, extent.length
                );
            }
        }
    } else {
        println!("IGFS image: {} sections", fs.section_count());
        for minor in fs.directory().minors().collect::<Vec<_>>() {
            let partition = fs.get_partition(minor)?;
            println!(
                "  partition {minor} ({} bytes, {} extents, hashed={})",
                partition.header.partition_size,
                partition.extents.len(),
                partition.header.has_hash_block()
            );
            for extent in &partition.extents {
                println!("    - {:?}: {} bytes", extent.extent_type, extent.length);
            }
        }
    }
    Ok(())
}

fn extract(args: ExtractArgs) -> anyhow::Result<()> {
    let mut file = OpenOptions::new().read(true).open(&args.image)?;
    let mut fs = Filesystem::open(&mut file)?;
    let bytes = fs.get_extent(args.minor, args.extent.into())?;
    std::fs::write(&args.output, bytes)?;
    tracing::info!(output = %args.output.display(), "extracted extent");
    Ok(())
}

fn verify(args: VerifyArgs) -> anyhow::Result<()> {
    let mut file = OpenOptions::new().read(true).open(&args.image)?;
    let mut fs = Filesystem::open(&mut file)?;

    let sections = fs.walk_chain(args.minor, |_, _| true)?;
    for (number, section) in &sections {
        let mut buf = vec![0u8; section.section_size()];
        igfs_common_model_serialize(section, &mut buf)?;
        igfs::integrity::verify_checksum(&buf, section.header.crc, *number)
            .map_err(|e| anyhow::anyhow!("section {number}: {e}"))?;
    }
    tracing::info!(sections = sections.len(), "CRC32 verification passed");

    if args.deep {
        let partition = fs.get_partition(args.minor)?;
        let hash = fs.get_hash_block(args.minor)?;
        igfs::integrity::verify_hash_chain(&mut fs, args.minor, &partition, &hash, None)?;
        tracing::info!("hash chain verification passed");
    }

    Ok(())
}

fn igfs_common_model_serialize(section: &igfs::structures::section::Section, buf: &mut [u8]) -> anyhow::Result<()> {
    use igfs_common::model::Model;
    let header_size = igfs::structures::raw::section_header::SectionHeader::SIZE;
    section.header.serialize(&mut buf[..header_size])?;
    buf[header_size..].copy_from_slice(&section.rest);
    Ok(())
}

fn decrypt(args: DecryptArgs) -> anyhow::Result<()> {
    let mut file = OpenOptions::new().read(true).open(&args.image)?;
    let mut fs = Filesystem::open(&mut file)?;

    let extent_key = igfs::crypto::extent_key(&args.boot_id);
    let encrypted = fs.get_extent(args.minor, ExtentType::Writeable)?;
    let tar_bytes = igfs::crypto::decrypt_extent(&extent_key, &encrypted)?;
    igfs::crypto::extent::unpack_tar(&tar_bytes, &args.output)?;

    tracing::info!(output = %args.output.display(), "decrypted extent filesystem");
    Ok(())
}

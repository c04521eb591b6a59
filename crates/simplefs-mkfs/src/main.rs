use anyhow::{bail, Context, Result};
use clap::Parser;
use log::warn;
use simplefs::{FileDisk, MountedVolume, Superblock, DEFAULT_TOTAL_BLOCKS};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Path to the disk image
    #[arg(short, long)]
    disk: PathBuf,

    /// Number of 512-byte blocks
    #[arg(short, long, default_value_t = DEFAULT_TOTAL_BLOCKS)]
    blocks: u32,

    /// Overwrite an image that already holds a filesystem
    #[arg(short, long)]
    force: bool,

    /// Host files to copy into the root directory
    files: Vec<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if cli.disk.exists() && !cli.force {
        let mut existing = FileDisk::open(&cli.disk)
            .with_context(|| format!("opening {}", cli.disk.display()))?;
        if Superblock::read(&mut existing).is_ok_and(|sb| sb.is_valid()) {
            bail!(
                "{} already holds a filesystem (use --force to overwrite)",
                cli.disk.display()
            );
        }
    }

    let disk = FileDisk::create(&cli.disk, cli.blocks)
        .with_context(|| format!("creating {}", cli.disk.display()))?;
    println!(
        "Formatting {} ({} bytes, {} blocks)...",
        cli.disk.display(),
        cli.blocks as u64 * simplefs::BLOCK_SIZE as u64,
        cli.blocks
    );

    let mut volume = MountedVolume::format(disk)?;
    println!("Superblock: {:#?}", volume.superblock());

    for path in &cli.files {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            warn!("Skipping {}: no usable file name", path.display());
            continue;
        };
        let content =
            std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;

        println!("Adding file: {} ({} bytes)", path.display(), content.len());
        volume
            .create_file(name)
            .with_context(|| format!("creating {name}"))?;
        volume
            .append_file(name, &content)
            .with_context(|| format!("writing {name}"))?;
    }

    let stats = volume.stats();
    volume.sync()?;
    println!(
        "Format complete. {} / {} inodes, {} / {} blocks in use.",
        stats.inodes_used, stats.inodes_total, stats.data_blocks_used, stats.data_blocks_total
    );

    Ok(())
}

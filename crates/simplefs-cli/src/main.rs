mod shell;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use simplefs::{BlockDevice, FileDisk, MemDisk, MountedVolume, DEFAULT_TOTAL_BLOCKS};
use std::io;
use std::path::PathBuf;

use shell::Shell;

#[derive(Parser)]
#[command(name = "simplefs")]
#[command(author, version, about = "Interactive shell over a SimpleFS volume")]
struct Cli {
    /// Disk image to mount (in-memory volume when omitted)
    #[arg(short, long)]
    disk: Option<PathBuf>,

    /// Number of 512-byte blocks when a new volume is created
    #[arg(short, long, default_value_t = DEFAULT_TOTAL_BLOCKS)]
    blocks: u32,

    /// Format the volume before starting the shell
    #[arg(short, long)]
    format: bool,
}

fn open_device(cli: &Cli) -> Result<Box<dyn BlockDevice>> {
    let Some(path) = &cli.disk else {
        info!("Using an in-memory volume of {} blocks", cli.blocks);
        return Ok(Box::new(MemDisk::new(cli.blocks)));
    };

    let disk = if path.exists() {
        FileDisk::open(path).with_context(|| format!("opening {}", path.display()))?
    } else {
        info!("Creating disk image {}", path.display());
        FileDisk::create(path, cli.blocks)
            .with_context(|| format!("creating {}", path.display()))?
    };
    Ok(Box::new(disk))
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let device = open_device(&cli)?;
    let volume = if cli.format {
        MountedVolume::format(device)?
    } else {
        MountedVolume::mount(device)?
    };

    println!("SimpleFS shell. Type 'help' for commands.");
    let mut shell = Shell::new(volume);
    shell.run(io::stdin().lock(), &mut io::stdout())?;
    println!();

    shell.into_volume().sync()?;
    Ok(())
}

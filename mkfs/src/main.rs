//! `mkfs`: formats one or more backing files with a fresh WFS layout (spec.md §4.1, §6).

use clap::Parser;
use log::info;
use std::path::PathBuf;
use std::process::exit;
use wfs_core::{format, FormatError, FormatOptions, RaidMode};

/// The RAID mode as spelled on the command line: `0`, `1`, or `1v` (spec.md §6), mapped to
/// [`RaidMode`] at parse time rather than carried as a raw code past this point.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum RaidModeArg {
	#[value(name = "0")]
	Stripe,
	#[value(name = "1")]
	Mirror,
	#[value(name = "1v")]
	VerifiedMirror,
}

impl From<RaidModeArg> for RaidMode {
	fn from(arg: RaidModeArg) -> Self {
		match arg {
			RaidModeArg::Stripe => RaidMode::Stripe,
			RaidModeArg::Mirror => RaidMode::Mirror,
			RaidModeArg::VerifiedMirror => RaidMode::VerifiedMirror,
		}
	}
}

/// `mkfs -r <mode> -d <disk> [-d <disk> ...] -i <inodes> -b <blocks>`
#[derive(Parser, Debug)]
#[command(name = "mkfs", about = "Formats one or more backing files as a WFS filesystem")]
struct Args {
	/// RAID mode: 0 (stripe), 1 (mirror), or 1v (mirror with majority-vote reads).
	#[arg(short = 'r', value_enum)]
	raid_mode: RaidModeArg,

	/// Backing disk path. Repeat for every disk in the array.
	#[arg(short = 'd', value_name = "DISK", required = true)]
	disks: Vec<PathBuf>,

	/// Requested inode count (rounded up to a multiple of 32).
	#[arg(short = 'i')]
	num_inodes: u32,

	/// Requested data-block count (rounded up to a multiple of 32).
	#[arg(short = 'b')]
	num_data_blocks: u32,
}

fn main() {
	env_logger::init();

	let args = match Args::try_parse() {
		Ok(args) => args,
		Err(e) => {
			eprintln!("{e}");
			exit(1);
		}
	};

	let opts = FormatOptions {
		disks: &args.disks,
		raid_mode: args.raid_mode.into(),
		num_inodes: args.num_inodes,
		num_data_blocks: args.num_data_blocks,
	};

	info!(
		"formatting {} disk(s), raid_mode={:?}, inodes={}, data_blocks={}",
		opts.disks.len(),
		opts.raid_mode,
		opts.num_inodes,
		opts.num_data_blocks
	);

	if let Err(e) = format(&opts) {
		eprintln!("mkfs: {e}");
		match e {
			// The source reports this as -1, which as the process's int8_t exit status is 255.
			FormatError::DiskTooSmall { .. } => exit(255),
			FormatError::BadRaidMode | FormatError::BadCount | FormatError::NotEnoughDisks => {
				exit(1)
			}
			FormatError::Io(_) => exit(1),
		}
	}
}

//! `wfs`: mounts a WFS filesystem via the kernel-side FUSE bridge.
//!
//! `wfs <disk1> [<disk2> ...] [<bridge flags>] <mountpoint>` (spec.md §6). Positional arguments
//! up to the first flag-prefixed one are backing disks; everything after that is forwarded to
//! the bridge (here, `fuser::mount2`) verbatim — spec.md §1 scopes the mount-time argument
//! splitter itself out as an external collaborator, so this stays a thin, un-clever loop rather
//! than a full option parser.

mod fs;

use fs::Wfs;
use fuser::MountOption;
use std::env;
use std::process::exit;
use wfs_core::DiskSet;

/// Splits `argv[1..]` into the leading run of disk paths and the remaining bridge arguments.
fn split_args(args: &[String]) -> (&[String], &[String]) {
	let split = args.iter().position(|a| a.starts_with('-')).unwrap_or(args.len());
	args.split_at(split)
}

/// Turns the trailing bridge arguments into a mountpoint and a set of `fuser` mount options.
///
/// `-o a,b,c` becomes one [`MountOption::CUSTOM`] per sub-option; any other non-flag argument is
/// taken as the mountpoint (the last one wins, matching how libfuse's own argument parser treats
/// a trailing positional argument).
fn parse_bridge_args(args: &[String]) -> (String, Vec<MountOption>) {
	let mut mountpoint = None;
	let mut options = Vec::new();
	let mut iter = args.iter().peekable();
	while let Some(arg) = iter.next() {
		if arg == "-o" {
			if let Some(opts) = iter.next() {
				for opt in opts.split(',') {
					options.push(MountOption::CUSTOM(opt.to_string()));
				}
			}
		} else if !arg.starts_with('-') {
			mountpoint = Some(arg.clone());
		}
	}
	(mountpoint.unwrap_or_default(), options)
}

fn main() {
	env_logger::init();

	let args: Vec<String> = env::args().collect();
	let bin = args.first().cloned().unwrap_or_else(|| "wfs".to_string());
	let (disk_args, bridge_args) = split_args(&args[1..]);

	if disk_args.is_empty() {
		eprintln!("{bin}: no disk paths provided");
		exit(1);
	}

	let (mountpoint, mut options) = parse_bridge_args(bridge_args);
	if mountpoint.is_empty() {
		eprintln!("{bin}: no mountpoint provided");
		exit(1);
	}
	options.push(MountOption::FSName("wfs".to_string()));

	let disks = DiskSet::open(disk_args).unwrap_or_else(|e| {
		eprintln!("{bin}: failed to open disks: {e}");
		exit(1);
	});

	let fs = Wfs::new(disks);
	if let Err(e) = fuser::mount2(fs, &mountpoint, &options) {
		eprintln!("{bin}: mount failed: {e}");
		exit(1);
	}
}

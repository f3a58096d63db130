//! End-to-end scenarios against real tempfile-backed disks, following spec.md §8.

use std::path::PathBuf;
use tempfile::NamedTempFile;
use wfs_core::ondisk::RaidMode;
use wfs_core::{format, ops, DiskSet, FormatOptions, WfsError};

struct Disks {
	_files: Vec<NamedTempFile>,
	paths: Vec<PathBuf>,
}

fn make_disks(count: usize, len: u64) -> Disks {
	let mut files = Vec::new();
	let mut paths = Vec::new();
	for _ in 0..count {
		let f = NamedTempFile::new().unwrap();
		f.as_file().set_len(len).unwrap();
		paths.push(f.path().to_path_buf());
		files.push(f);
	}
	Disks { _files: files, paths }
}

/// Scenario 1: format one 1 MiB file with `-i 32 -b 224 -r 0`; mount; root is a directory whose
/// listing is exactly `.`/`..`.
#[test]
fn scenario_format_single_disk_stripe() {
	let disks = make_disks(1, 1024 * 1024);
	format(&FormatOptions {
		disks: &disks.paths,
		raid_mode: RaidMode::Stripe,
		num_inodes: 32,
		num_data_blocks: 224,
	})
	.unwrap();

	let mounted = DiskSet::open(&disks.paths).unwrap();
	let stat = ops::getattr(&mounted, "/").unwrap();
	assert!(ops::mode_is_dir(stat.mode));
	let names: Vec<&str> = ops::readdir(&mounted, "/")
		.unwrap()
		.iter()
		.map(|e| e.name.as_str())
		.collect();
	assert_eq!(names, vec![".", ".."]);
}

/// Scenario 2: mirrored write survives a remount and both disks end up byte-identical from
/// `i_bitmap_ptr` on (spec.md §8's RAID-1 property).
#[test]
fn scenario_mirror_write_survives_remount_and_disks_match() {
	let disks = make_disks(2, 2 * 1024 * 1024);
	format(&FormatOptions {
		disks: &disks.paths,
		raid_mode: RaidMode::Mirror,
		num_inodes: 32,
		num_data_blocks: 224,
	})
	.unwrap();

	{
		let mounted = DiskSet::open(&disks.paths).unwrap();
		ops::mkdir(&mounted, "/a", 0o755).unwrap();
		ops::mknod(&mounted, "/a/f", 0o644).unwrap();
		ops::write(&mounted, "/a/f", b"hello", 0).unwrap();
		let mut buf = [0u8; 5];
		let n = ops::read(&mounted, "/a/f", &mut buf, 0).unwrap();
		assert_eq!(&buf[..n], b"hello");
	}

	// Remount.
	let mounted = DiskSet::open(&disks.paths).unwrap();
	let mut buf = [0u8; 5];
	let n = ops::read(&mounted, "/a/f", &mut buf, 0).unwrap();
	assert_eq!(&buf[..n], b"hello");

	let sb0 = mounted.superblock(0);
	let start = sb0.i_bitmap_ptr as usize;
	let end = disks._files[0].as_file().metadata().unwrap().len() as usize;
	let region0 = mounted.region(0, start as u64, end - start).to_vec();
	let region1 = mounted.region(1, start as u64, end - start).to_vec();
	assert_eq!(region0, region1);
}

/// Scenario 3: RAID-0 stripe correctness — the first three logical blocks of a single file land
/// on disks 0, 1, 2 respectively.
#[test]
fn scenario_stripe_places_blocks_round_robin() {
	let disks = make_disks(3, 4 * 1024 * 1024);
	format(&FormatOptions {
		disks: &disks.paths,
		raid_mode: RaidMode::Stripe,
		num_inodes: 32,
		num_data_blocks: 96,
	})
	.unwrap();

	let mounted = DiskSet::open(&disks.paths).unwrap();
	ops::mknod(&mounted, "/f", 0o644).unwrap();
	// A distinct marker byte at the start of each of the first three logical blocks.
	let markers = [b'A', b'B', b'C'];
	for (lb, marker) in markers.iter().enumerate() {
		ops::write(&mounted, "/f", &[*marker], (lb as u64) * 512).unwrap();
	}

	let num = wfs_core::path::resolve(&mounted, "/f").unwrap();
	let blocks = mounted.inode(0, num).blocks;
	for (lb, &marker) in markers.iter().enumerate() {
		let off = blocks[lb];
		assert_ne!(off, 0);
		let block = mounted.block(lb, off); // disk `lb` owns logical block `lb` (3 disks, stripe)
		assert_eq!(block[0], marker);
	}
}

/// Scenario 5: writing at offset 3584 (the first indirect-block byte) on a fresh file allocates
/// only the indirect block, leaves the direct blocks untouched, and sets `size` accordingly.
#[test]
fn scenario_indirect_growth() {
	let disks = make_disks(1, 1024 * 1024);
	format(&FormatOptions {
		disks: &disks.paths,
		raid_mode: RaidMode::Stripe,
		num_inodes: 32,
		num_data_blocks: 224,
	})
	.unwrap();
	let mounted = DiskSet::open(&disks.paths).unwrap();
	ops::mknod(&mounted, "/f", 0o644).unwrap();

	let offset = 7 * 512;
	ops::write(&mounted, "/f", b"x", offset).unwrap();

	let num = wfs_core::path::resolve(&mounted, "/f").unwrap();
	let inode = mounted.inode(0, num);
	assert_ne!(inode.blocks[7], 0);
	assert!(inode.blocks[..7].iter().all(|&b| b == 0));
	assert_eq!(inode.size, offset + 1);
}

/// Scenario 6 / idempotence: `mkdir` twice yields `EEXIST` on the second call and leaves the
/// filesystem unchanged beyond the first; `rmdir` refuses non-empty, then succeeds after unlink.
#[test]
fn scenario_mkdir_idempotence_and_rmdir_emptiness() {
	let disks = make_disks(1, 1024 * 1024);
	format(&FormatOptions {
		disks: &disks.paths,
		raid_mode: RaidMode::Stripe,
		num_inodes: 32,
		num_data_blocks: 224,
	})
	.unwrap();
	let mounted = DiskSet::open(&disks.paths).unwrap();

	ops::mkdir(&mounted, "/a", 0o755).unwrap();
	assert_eq!(ops::mkdir(&mounted, "/a", 0o755), Err(WfsError::AlreadyExists));

	ops::mknod(&mounted, "/a/f", 0o644).unwrap();
	assert_eq!(ops::rmdir(&mounted, "/a"), Err(WfsError::NotEmpty));
	ops::unlink(&mounted, "/a/f").unwrap();
	ops::rmdir(&mounted, "/a").unwrap();
	assert_eq!(ops::getattr(&mounted, "/a"), Err(WfsError::NotFound));
}

/// Round-trip: a write followed by a read at the same offset with no intervening mutation
/// returns exactly what was written, and `size` accounts for it.
#[test]
fn write_read_roundtrip_and_size() {
	let disks = make_disks(1, 1024 * 1024);
	format(&FormatOptions {
		disks: &disks.paths,
		raid_mode: RaidMode::Stripe,
		num_inodes: 32,
		num_data_blocks: 224,
	})
	.unwrap();
	let mounted = DiskSet::open(&disks.paths).unwrap();
	ops::mknod(&mounted, "/f", 0o644).unwrap();

	let buf = b"the quick brown fox jumps over the lazy dog";
	ops::write(&mounted, "/f", buf, 100).unwrap();
	let mut out = vec![0u8; buf.len()];
	let n = ops::read(&mounted, "/f", &mut out, 100).unwrap();
	assert_eq!(n, buf.len());
	assert_eq!(&out, buf);
	assert!(ops::getattr(&mounted, "/f").unwrap().size >= 100 + buf.len() as u64);
}

/// RAID-1v majority voting: corrupting one of three mirror copies still reads the uncorrupted
/// majority content; corrupting two of three flips the majority.
#[test]
fn scenario_verified_mirror_majority_vote() {
	let disks = make_disks(3, 2 * 1024 * 1024);
	format(&FormatOptions {
		disks: &disks.paths,
		raid_mode: RaidMode::VerifiedMirror,
		num_inodes: 32,
		num_data_blocks: 224,
	})
	.unwrap();
	let mounted = DiskSet::open(&disks.paths).unwrap();
	ops::mknod(&mounted, "/f", 0o644).unwrap();
	ops::write(&mounted, "/f", b"hello", 0).unwrap();

	let num = wfs_core::path::resolve(&mounted, "/f").unwrap();
	let off = mounted.inode(0, num).blocks[0];

	// Corrupt one copy: majority (2 of 3) still agrees on the original content.
	mounted.block_mut(1, off)[0] = b'!';
	let mut buf = [0u8; 5];
	ops::read(&mounted, "/f", &mut buf, 0).unwrap();
	assert_eq!(&buf, b"hello");

	// Corrupt a second copy identically: the corrupted content is now the majority.
	mounted.block_mut(2, off)[0] = b'!';
	let mut buf = [0u8; 5];
	ops::read(&mounted, "/f", &mut buf, 0).unwrap();
	assert_eq!(&buf, b"!ello");
}

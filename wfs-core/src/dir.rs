//! Directory dentry lookup and mutation.
//!
//! Directories only ever use their seven direct blocks (spec.md §4.5: "directories never use
//! the indirect block"), so every function here walks `blocks[0..D_BLOCK]` and nothing past it.

use crate::bitmap;
use crate::diskset::DiskSet;
use crate::error::WfsError;
use crate::layout::{DENTRIES_PER_BLOCK, D_BLOCK};
use crate::ondisk::{Dentry, RaidMode};
use std::mem::size_of;

/// Returns the disk that physically hosts directory block index `i`, given `i` direct blocks
/// are already in use ahead of it.
///
/// In RAID-0 a directory's `i`-th allocated direct block lands on disk `i mod N` (spec.md
/// §4.5); in the mirrored modes, directory content always lives on disk 0 and is replicated
/// by the synchroniser after the mutating operation completes.
fn block_disk(raid: RaidMode, n: usize, i: usize) -> usize {
	if raid == RaidMode::Stripe {
		i % n
	} else {
		0
	}
}

/// Returns a reference to the dentry at `slot` within `block`.
fn dentry_at(block: &[u8], slot: usize) -> &Dentry {
	unsafe { &*(block.as_ptr().add(slot * size_of::<Dentry>()) as *const Dentry) }
}

/// Returns a mutable reference to the dentry at `slot` within `block`.
fn dentry_at_mut(block: &mut [u8], slot: usize) -> &mut Dentry {
	unsafe { &mut *(block.as_mut_ptr().add(slot * size_of::<Dentry>()) as *mut Dentry) }
}

/// Searches directory `dir_num` for an entry named `name`, bytewise and bounded by
/// [`crate::layout::MAX_NAME`] as spec.md §4.4 requires.
pub fn find_dentry(disks: &DiskSet, dir_num: u32, name: &str) -> Option<Dentry> {
	let raid = disks.raid_mode();
	let n = disks.num_disks();
	let blocks = disks.inode(0, dir_num).blocks;
	for i in 0..D_BLOCK {
		let off = blocks[i];
		if off == 0 {
			continue;
		}
		let disk = block_disk(raid, n, i);
		let block = disks.block(disk, off);
		for slot in 0..DENTRIES_PER_BLOCK {
			let dentry = dentry_at(block, slot);
			if !dentry.is_free() && dentry.name_matches(name) {
				return Some(*dentry);
			}
		}
	}
	None
}

/// Adds `entry` to directory `dir_num`: reuses the first free slot in an already-allocated
/// block, or allocates a new direct block when none has room (spec.md §4.5).
pub fn add_dentry(disks: &DiskSet, dir_num: u32, entry: Dentry) -> Result<(), WfsError> {
	let raid = disks.raid_mode();
	let n = disks.num_disks();
	let blocks = disks.inode(0, dir_num).blocks;

	let mut allocated = 0usize;
	for i in 0..D_BLOCK {
		let off = blocks[i];
		if off == 0 {
			continue;
		}
		allocated += 1;
		let disk = block_disk(raid, n, i);
		let block = disks.block_mut(disk, off);
		for slot in 0..DENTRIES_PER_BLOCK {
			let dentry = dentry_at_mut(block, slot);
			if dentry.is_free() {
				*dentry = entry;
				return Ok(());
			}
		}
	}

	let free_idx = (0..D_BLOCK)
		.find(|&i| blocks[i] == 0)
		.ok_or(WfsError::NoSpace)?;
	let disk = block_disk(raid, n, allocated);
	// Allocation is centralised on disk 0's bitmap (spec.md §4.3); `disk` only routes where the
	// new block's data physically lives.
	let off = bitmap::alloc_block(disks, 0).ok_or(WfsError::NoSpace)?;
	disks.block_mut(disk, off).fill(0);
	*dentry_at_mut(disks.block_mut(disk, off), 0) = entry;
	disks.inode_mut(0, dir_num).blocks[free_idx] = off;
	Ok(())
}

/// Zero-fills the dentry slot named `name` in directory `dir_num`.
pub fn remove_dentry(disks: &DiskSet, dir_num: u32, name: &str) -> Result<(), WfsError> {
	let raid = disks.raid_mode();
	let n = disks.num_disks();
	let blocks = disks.inode(0, dir_num).blocks;
	for i in 0..D_BLOCK {
		let off = blocks[i];
		if off == 0 {
			continue;
		}
		let disk = block_disk(raid, n, i);
		let block = disks.block_mut(disk, off);
		for slot in 0..DENTRIES_PER_BLOCK {
			let dentry = dentry_at_mut(block, slot);
			if !dentry.is_free() && dentry.name_matches(name) {
				*dentry = Dentry::EMPTY;
				return Ok(());
			}
		}
	}
	Err(WfsError::NotFound)
}

/// Lists every occupied entry of directory `dir_num`, in on-disk scan order (which is also the
/// order `.` and `..` were written in, so they come first — spec.md §6's `readdir` contract).
pub fn list(disks: &DiskSet, dir_num: u32) -> Vec<(String, u32)> {
	let raid = disks.raid_mode();
	let n = disks.num_disks();
	let blocks = disks.inode(0, dir_num).blocks;
	let mut out = Vec::new();
	for i in 0..D_BLOCK {
		let off = blocks[i];
		if off == 0 {
			continue;
		}
		let disk = block_disk(raid, n, i);
		let block = disks.block(disk, off);
		for slot in 0..DENTRIES_PER_BLOCK {
			let dentry = dentry_at(block, slot);
			if !dentry.is_free() {
				out.push((dentry.name_str().to_string(), dentry.num));
			}
		}
	}
	out
}

/// A directory is empty when every occupied slot names `.` or `..` (spec.md §4.5).
pub fn is_empty(disks: &DiskSet, dir_num: u32) -> bool {
	list(disks, dir_num)
		.iter()
		.all(|(name, _)| name == "." || name == "..")
}

/// Frees every allocated direct block of directory `dir_num`'s own data (not the inode).
///
/// Allocation is centralised on disk 0's bitmap (spec.md §4.3) regardless of RAID mode, so the
/// free targets disk 0 even though the block's data physically lives on `block_disk(...)`.
pub fn free_dir_blocks(disks: &DiskSet, dir_num: u32) {
	let blocks = disks.inode(0, dir_num).blocks;
	for i in 0..D_BLOCK {
		let off = blocks[i];
		if off != 0 {
			bitmap::free_block(disks, 0, off);
		}
	}
}

//! Block-indexed file I/O: direct/single-indirect addressing, RAID routing, growth semantics.
//!
//! Addressing follows the read-side discipline on both the read and write paths (spec.md §9,
//! open question 3): a block pointer stored in an inode or an indirect block is always a
//! within-disk offset, and the disk that owns logical block `lb` is `lb mod N` in RAID-0. The
//! single-indirect block itself always lives on disk 0, regardless of RAID mode; only the data
//! blocks its entries point to are routed per-entry.

use crate::bitmap;
use crate::diskset::DiskSet;
use crate::error::WfsError;
use crate::layout::{BLOCK_SIZE, D_BLOCK, MAX_BLOCK_INDEX, PTRS_PER_BLOCK};
use crate::ondisk::{Inode, RaidMode};
use crate::util::now;

/// Returns the disk that owns logical block `lb`'s data, under `raid` with `n` disks.
fn owning_disk(raid: RaidMode, n: usize, lb: u64) -> usize {
	if raid == RaidMode::Stripe {
		(lb as usize) % n
	} else {
		0
	}
}

/// Resolves logical block `lb` of `inode` to `(disk, within-disk offset)`, without allocating.
/// Returns `None` if the block is unallocated.
fn block_offset(disks: &DiskSet, inode: &Inode, lb: u64) -> Option<(usize, u64)> {
	let raid = disks.raid_mode();
	let n = disks.num_disks();
	let disk = owning_disk(raid, n, lb);
	if lb < D_BLOCK as u64 {
		let off = inode.blocks[lb as usize];
		(off != 0).then_some((disk, off))
	} else {
		let ind_off = inode.blocks[D_BLOCK];
		if ind_off == 0 {
			return None;
		}
		let idx = (lb - D_BLOCK as u64) as usize;
		let ptr = *disks.indirect(0, ind_off).get(idx)?;
		(ptr != 0).then_some((disk, ptr))
	}
}

/// Same as [`block_offset`], but allocates the direct/indirect slot and the data block itself
/// on first use.
fn block_offset_for_write(disks: &DiskSet, inode_num: u32, lb: u64) -> Result<(usize, u64), WfsError> {
	if lb > MAX_BLOCK_INDEX {
		return Err(WfsError::OutOfRange);
	}
	let raid = disks.raid_mode();
	let n = disks.num_disks();
	let disk = owning_disk(raid, n, lb);

	// Allocation is always centralised on disk 0's bitmap (spec.md §4.3), regardless of which
	// disk physically hosts the block's data; `disk` below only routes the data write itself.
	if lb < D_BLOCK as u64 {
		let idx = lb as usize;
		if disks.inode(0, inode_num).blocks[idx] == 0 {
			let off = bitmap::alloc_block(disks, 0).ok_or(WfsError::NoSpace)?;
			disks.block_mut(disk, off).fill(0);
			disks.inode_mut(0, inode_num).blocks[idx] = off;
		}
		Ok((disk, disks.inode(0, inode_num).blocks[idx]))
	} else {
		if disks.inode(0, inode_num).blocks[D_BLOCK] == 0 {
			let ind_off = bitmap::alloc_block(disks, 0).ok_or(WfsError::NoSpace)?;
			disks.block_mut(0, ind_off).fill(0);
			disks.inode_mut(0, inode_num).blocks[D_BLOCK] = ind_off;
		}
		let ind_off = disks.inode(0, inode_num).blocks[D_BLOCK];
		let idx = (lb - D_BLOCK as u64) as usize;
		let existing = disks.indirect(0, ind_off)[idx];
		let ptr = if existing == 0 {
			let off = bitmap::alloc_block(disks, 0).ok_or(WfsError::NoSpace)?;
			disks.block_mut(disk, off).fill(0);
			disks.indirect_mut(0, ind_off)[idx] = off;
			off
		} else {
			existing
		};
		Ok((disk, ptr))
	}
}

/// Reads the majority-agreeing copy of the block at absolute offset `off` across all `n`
/// disks, breaking ties by lowest disk index (spec.md §4.7, RAID-1v).
fn majority_block(disks: &DiskSet, off: u64, n: usize) -> Vec<u8> {
	let copies: Vec<&[u8]> = (0..n).map(|d| disks.block(d, off)).collect();
	let mut votes = vec![0usize; n];
	for i in 0..n {
		for j in 0..n {
			if copies[i] == copies[j] {
				votes[i] += 1;
			}
		}
	}
	let mut best = 0;
	for i in 1..n {
		if votes[i] > votes[best] {
			best = i;
		}
	}
	copies[best].to_vec()
}

/// Reads up to `buf.len()` bytes of inode `inode_num` starting at `offset`, clamped to the
/// file's declared size. Stops early if an unallocated block is encountered within that size.
pub fn read(disks: &DiskSet, inode_num: u32, buf: &mut [u8], offset: u64) -> Result<usize, WfsError> {
	let size = disks.inode(0, inode_num).size;
	if !disks.inode(0, inode_num).is_reg() {
		return Err(WfsError::IsDirectory);
	}
	if offset >= size {
		return Ok(0);
	}
	let want = (buf.len() as u64).min(size - offset) as usize;
	let raid = disks.raid_mode();
	let n = disks.num_disks();

	let mut done = 0usize;
	let mut cur = offset;
	while done < want {
		let lb = cur / BLOCK_SIZE;
		let intra = (cur % BLOCK_SIZE) as usize;
		let inode = disks.inode(0, inode_num);
		let Some((disk, blk_off)) = block_offset(disks, inode, lb) else {
			break;
		};
		let chunk = ((BLOCK_SIZE as usize) - intra).min(want - done);
		match raid {
			RaidMode::VerifiedMirror => {
				let block = majority_block(disks, blk_off, n);
				buf[done..done + chunk].copy_from_slice(&block[intra..intra + chunk]);
			}
			RaidMode::Stripe | RaidMode::Mirror => {
				let block = disks.block(disk, blk_off);
				buf[done..done + chunk].copy_from_slice(&block[intra..intra + chunk]);
			}
		}
		done += chunk;
		cur += chunk as u64;
	}

	disks.inode_mut(0, inode_num).atim = now();
	Ok(done)
}

/// Writes `buf` to inode `inode_num` starting at `offset`, growing the file and allocating
/// blocks on demand. On partial failure (exhaustion mid-write), returns the bytes successfully
/// written so far with the file's size reflecting that prefix, matching spec.md §7; only
/// returns an error outright if nothing could be written.
pub fn write(disks: &DiskSet, inode_num: u32, buf: &[u8], offset: u64) -> Result<usize, WfsError> {
	if !disks.inode(0, inode_num).is_reg() {
		return Err(WfsError::IsDirectory);
	}
	if offset > crate::layout::MAX_FILE_SIZE {
		return Err(WfsError::OutOfRange);
	}
	let raid = disks.raid_mode();
	let n = disks.num_disks();

	let mut done = 0usize;
	let mut cur = offset;
	let mut failure = None;
	while done < buf.len() {
		let lb = cur / BLOCK_SIZE;
		let intra = (cur % BLOCK_SIZE) as usize;
		let (disk, blk_off) = match block_offset_for_write(disks, inode_num, lb) {
			Ok(v) => v,
			Err(e) => {
				failure = Some(e);
				break;
			}
		};
		let chunk = ((BLOCK_SIZE as usize) - intra).min(buf.len() - done);
		match raid {
			RaidMode::Stripe => {
				let block = disks.block_mut(disk, blk_off);
				block[intra..intra + chunk].copy_from_slice(&buf[done..done + chunk]);
			}
			RaidMode::Mirror | RaidMode::VerifiedMirror => {
				for d in 0..n {
					let block = disks.block_mut(d, blk_off);
					block[intra..intra + chunk].copy_from_slice(&buf[done..done + chunk]);
				}
			}
		}
		done += chunk;
		cur += chunk as u64;
	}

	let inode = disks.inode_mut(0, inode_num);
	if cur > inode.size {
		inode.size = cur;
	}
	inode.mtim = now();

	if done == 0 {
		if let Some(e) = failure {
			return Err(e);
		}
	}
	Ok(done)
}

/// Frees every block referenced by inode `inode_num`: direct blocks, indirect entries, and the
/// indirect block itself (spec.md §4.8, unlink).
///
/// Allocation is centralised on disk 0's bitmap (spec.md §4.3) regardless of RAID mode, so every
/// free here clears disk 0's bitmap too — the owning disk only ever held the physical data copy.
pub fn free_file_blocks(disks: &DiskSet, inode_num: u32) {
	let blocks = disks.inode(0, inode_num).blocks;

	for i in 0..D_BLOCK {
		let off = blocks[i];
		if off != 0 {
			bitmap::free_block(disks, 0, off);
		}
	}

	let ind_off = blocks[D_BLOCK];
	if ind_off != 0 {
		let entries: Vec<u64> = disks.indirect(0, ind_off)[..PTRS_PER_BLOCK].to_vec();
		for ptr in entries {
			if ptr != 0 {
				bitmap::free_block(disks, 0, ptr);
			}
		}
		bitmap::free_block(disks, 0, ind_off);
	}
}

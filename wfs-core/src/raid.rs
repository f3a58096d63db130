//! The RAID synchroniser: propagates metadata (and, in mirrored modes, data) from a source
//! disk to every other disk.
//!
//! Kept isolated from the rest of the engine (spec.md §9 design note) so every other module can
//! be written against a single logical image living on disk 0, and the façade is the only
//! caller that has to think about which disks to touch and when.

use crate::diskset::DiskSet;
use log::trace;

/// Copies `[i_bitmap_ptr, d_blocks_ptr)` — both bitmaps and the whole inode table — from `src`
/// to every other disk.
pub fn sync_meta(disks: &DiskSet, src: usize) {
	let sb = disks.superblock(src);
	let start = sb.i_bitmap_ptr;
	let len = (sb.d_blocks_ptr - start) as usize;
	let snapshot = disks.region(src, start, len).to_vec();
	for d in 0..disks.num_disks() {
		if d == src {
			continue;
		}
		disks.region_mut(d, start, len).copy_from_slice(&snapshot);
	}
	trace!("sync_meta: propagated metadata from disk {src}");
}

/// Same as [`sync_meta`], additionally copying `[d_blocks_ptr, end)` — the whole data region.
pub fn sync_all(disks: &DiskSet, src: usize) {
	sync_meta(disks, src);
	let sb = disks.superblock(src);
	let start = sb.d_blocks_ptr;
	let len = (disks.disk_len(src) - start) as usize;
	let snapshot = disks.region(src, start, len).to_vec();
	for d in 0..disks.num_disks() {
		if d == src {
			continue;
		}
		disks.region_mut(d, start, len).copy_from_slice(&snapshot);
	}
	trace!("sync_all: propagated data from disk {src}");
}

//! The array of backing disks and the raw accessors into their memory mappings.
//!
//! Every backing file is opened and mapped read/write once, at mount time, and lives for the
//! lifetime of the process (spec.md §5: mapped at startup, unmapped at shutdown, no
//! crash-durability guarantees). The engine is single-threaded cooperative, so the accessors
//! below hand out raw pointers / unsafe references into the mappings rather than threading
//! `&mut` borrows through every call site — mirroring the original implementation's direct
//! pointer arithmetic over a global `disk_region[]` array.

use crate::layout::BLOCK_SIZE;
use crate::ondisk::{Inode, RaidMode, Superblock};
use log::debug;
use memmap2::MmapMut;
use std::fs::OpenOptions;
use std::io;
use std::path::Path;

/// The ordered set of memory-mapped backing disks.
pub struct DiskSet {
	maps: Vec<MmapMut>,
}

impl DiskSet {
	/// Opens and maps every disk in `paths`, then reorders them (in RAID-0 only) so that
	/// `disks[i]` is the disk whose superblock records `disk_id == i` (spec.md §4.2).
	pub fn open(paths: &[impl AsRef<Path>]) -> io::Result<Self> {
		let mut maps = Vec::with_capacity(paths.len());
		for path in paths {
			let file = OpenOptions::new().read(true).write(true).open(path)?;
			let map = unsafe { MmapMut::map_mut(&file)? };
			maps.push(map);
		}
		let mut set = Self { maps };
		set.reorder_for_mount();
		Ok(set)
	}

	/// Permutes the disk array so that position `i` holds the disk whose `disk_id == i`, when
	/// the filesystem is striped. Mirrored modes don't care about order.
	fn reorder_for_mount(&mut self) {
		if self.superblock(0).raid_mode() != Some(RaidMode::Stripe) {
			return;
		}
		let n = self.maps.len();
		let mut ordered: Vec<Option<MmapMut>> = (0..n).map(|_| None).collect();
		for map in self.maps.drain(..) {
			let disk_id = unsafe { &*(map.as_ptr() as *const Superblock) }.disk_id as usize;
			debug!("mount: disk at slot carries disk_id {disk_id}");
			if disk_id < n {
				ordered[disk_id] = Some(map);
			}
		}
		self.maps = ordered
			.into_iter()
			.enumerate()
			.map(|(i, m)| m.unwrap_or_else(|| panic!("no disk advertises disk_id {i}")))
			.collect();
	}

	/// Number of disks in the array.
	pub fn num_disks(&self) -> usize {
		self.maps.len()
	}

	/// Size of disk `disk`, in bytes.
	pub fn disk_len(&self, disk: usize) -> u64 {
		self.maps[disk].len() as u64
	}

	/// The filesystem's RAID mode, read from disk 0's superblock.
	pub fn raid_mode(&self) -> RaidMode {
		self.superblock(0)
			.raid_mode()
			.expect("superblock carries an invalid raid mode")
	}

	/// Base pointer into disk `disk`'s mapping.
	///
	/// Handed out from `&self`: the engine is single-threaded cooperative (spec.md §5), so
	/// there is never more than one logical writer live at a time even though this bypasses
	/// the borrow checker's aliasing rules.
	fn disk_ptr(&self, disk: usize) -> *mut u8 {
		self.maps[disk].as_ptr() as *mut u8
	}

	/// Returns the superblock of `disk`.
	pub fn superblock(&self, disk: usize) -> &Superblock {
		unsafe { &*(self.disk_ptr(disk) as *const Superblock) }
	}

	/// Returns a mutable view of the superblock of `disk`.
	pub fn superblock_mut(&self, disk: usize) -> &mut Superblock {
		unsafe { &mut *(self.disk_ptr(disk) as *mut Superblock) }
	}

	/// Returns inode `num`'s slot on `disk`. Slots are 512 bytes apart, starting at
	/// `i_blocks_ptr` (spec.md §3), independent of `size_of::<Inode>()`.
	fn inode_ptr(&self, disk: usize, num: u32) -> *mut Inode {
		let sb = self.superblock(disk);
		let off = sb.i_blocks_ptr + (num as u64) * BLOCK_SIZE;
		unsafe { self.disk_ptr(disk).add(off as usize) as *mut Inode }
	}

	/// Returns a reference to inode `num` on `disk`.
	pub fn inode(&self, disk: usize, num: u32) -> &Inode {
		unsafe { &*self.inode_ptr(disk, num) }
	}

	/// Returns a mutable reference to inode `num` on `disk`.
	pub fn inode_mut(&self, disk: usize, num: u32) -> &mut Inode {
		unsafe { &mut *self.inode_ptr(disk, num) }
	}

	/// Returns the `len`-byte region starting at absolute offset `offset` on `disk`.
	pub fn region(&self, disk: usize, offset: u64, len: usize) -> &[u8] {
		unsafe { std::slice::from_raw_parts(self.disk_ptr(disk).add(offset as usize), len) }
	}

	/// Same as [`Self::region`], mutable.
	pub fn region_mut(&self, disk: usize, offset: u64, len: usize) -> &mut [u8] {
		unsafe { std::slice::from_raw_parts_mut(self.disk_ptr(disk).add(offset as usize), len) }
	}

	/// Returns the 512-byte data block living at absolute offset `offset` on `disk`.
	pub fn block(&self, disk: usize, offset: u64) -> &[u8] {
		self.region(disk, offset, BLOCK_SIZE as usize)
	}

	/// Same as [`Self::block`], mutable.
	pub fn block_mut(&self, disk: usize, offset: u64) -> &mut [u8] {
		self.region_mut(disk, offset, BLOCK_SIZE as usize)
	}

	/// Interprets the 512-byte block at `offset` on `disk` as an array of 64 absolute block
	/// offsets (a single-indirect block, spec.md §4.6).
	pub fn indirect(&self, disk: usize, offset: u64) -> &[u64] {
		unsafe {
			std::slice::from_raw_parts(
				self.disk_ptr(disk).add(offset as usize) as *const u64,
				crate::layout::PTRS_PER_BLOCK,
			)
		}
	}

	/// Same as [`Self::indirect`], mutable.
	pub fn indirect_mut(&self, disk: usize, offset: u64) -> &mut [u64] {
		unsafe {
			std::slice::from_raw_parts_mut(
				self.disk_ptr(disk).add(offset as usize) as *mut u64,
				crate::layout::PTRS_PER_BLOCK,
			)
		}
	}

	/// Flushes every mapping's dirty pages to their backing files.
	pub fn flush(&mut self) -> io::Result<()> {
		for map in &mut self.maps {
			map.flush()?;
		}
		Ok(())
	}
}

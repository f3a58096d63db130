//! The formatter: writes a fresh WFS layout onto each backing disk (spec.md §4.1).

use crate::error::FormatError;
use crate::layout::{round_up_32, Sections, BLOCK_SIZE};
use crate::ondisk::{Dentry, Inode, RaidMode, Superblock, S_IFDIR};
use crate::util::now;
use memmap2::MmapMut;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// Permission bits the root directory (and nothing else the formatter writes) is given:
/// `rwxr-xr-x`.
const ROOT_PERMS: u32 = 0o755;

/// Parameters for a single `format()` call.
pub struct FormatOptions<'a> {
	/// Ordered backing disk paths.
	pub disks: &'a [PathBuf],
	/// RAID mode to format with.
	pub raid_mode: RaidMode,
	/// Requested inode count (rounded up to a multiple of 32).
	pub num_inodes: u32,
	/// Requested data-block count (rounded up to a multiple of 32).
	pub num_data_blocks: u32,
}

/// Formats every disk in `opts.disks` with a fresh WFS layout.
///
/// Validates the raid mode, counts, and disk count up front, then per disk: opens (creating if
/// absent) the backing file, checks its size against the computed requirement, writes the
/// superblock, zeroes both bitmaps, marks inode 0 and data block 0 allocated, and writes the
/// root directory (inode 0, materialised with `.`/`..` dentries in its first data block).
pub fn format(opts: &FormatOptions) -> Result<(), FormatError> {
	if opts.num_inodes == 0 || opts.num_data_blocks == 0 {
		return Err(FormatError::BadCount);
	}
	if opts.raid_mode.is_mirrored() && opts.disks.len() < 2 {
		return Err(FormatError::NotEnoughDisks);
	}

	let num_inodes = round_up_32(opts.num_inodes);
	let num_data_blocks = round_up_32(opts.num_data_blocks);
	let sections = Sections::compute(num_inodes, num_data_blocks);
	let required = sections.required_len(num_data_blocks);

	for (disk_id, path) in opts.disks.iter().enumerate() {
		format_one(path, disk_id as u32, num_inodes, num_data_blocks, &sections, required, opts.raid_mode)?;
	}
	Ok(())
}

#[allow(clippy::too_many_arguments)]
fn format_one(
	path: &Path,
	disk_id: u32,
	num_inodes: u32,
	num_data_blocks: u32,
	sections: &Sections,
	required: u64,
	raid_mode: RaidMode,
) -> Result<(), FormatError> {
	let file = OpenOptions::new()
		.read(true)
		.write(true)
		.create(true)
		.open(path)?;
	let actual = file.metadata()?.len();
	if actual < required {
		return Err(FormatError::DiskTooSmall {
			path: path.to_path_buf(),
			required,
			actual,
		});
	}

	let mut map = unsafe { MmapMut::map_mut(&file)? };

	// Zero the superblock, both bitmaps, and the inode table.
	map[..sections.d_blocks_ptr as usize].fill(0);

	let sb = unsafe { &mut *(map.as_mut_ptr() as *mut Superblock) };
	*sb = Superblock {
		num_inodes,
		num_data_blocks,
		i_bitmap_ptr: sections.i_bitmap_ptr,
		d_bitmap_ptr: sections.d_bitmap_ptr,
		i_blocks_ptr: sections.i_blocks_ptr,
		d_blocks_ptr: sections.d_blocks_ptr,
		raid_mode: raid_mode.code(),
		disk_id,
	};

	// Inode 0 (the root) is always allocated.
	map[sections.i_bitmap_ptr as usize] = 0b0000_0001;
	// Data block 0 hosts the root's "." / ".." dentries.
	map[sections.d_bitmap_ptr as usize] = 0b0000_0001;

	let root_block_off = sections.d_blocks_ptr;
	let root_block = &mut map[root_block_off as usize..(root_block_off + BLOCK_SIZE) as usize];
	root_block.fill(0);
	let dentries = root_block.as_mut_ptr() as *mut Dentry;
	unsafe {
		*dentries = Dentry::new(".", 0).expect("\".\" fits MAX_NAME");
		*dentries.add(1) = Dentry::new("..", 0).expect("\"..\" fits MAX_NAME");
	}

	let timestamp = now();
	let root = unsafe { &mut *(map.as_mut_ptr().add(sections.i_blocks_ptr as usize) as *mut Inode) };
	*root = Inode {
		num: 0,
		mode: S_IFDIR | ROOT_PERMS,
		uid: 0,
		gid: 0,
		size: 0,
		nlinks: 2,
		atim: timestamp,
		mtim: timestamp,
		ctim: timestamp,
		blocks: [0; crate::layout::N_BLOCKS],
	};
	root.blocks[0] = root_block_off;

	map.flush()?;
	Ok(())
}

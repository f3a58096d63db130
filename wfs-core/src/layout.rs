//! On-disk layout constants.
//!
//! These values define the wire format shared by the formatter (`mkfs`) and
//! the live engine (`wfs`); changing any of them changes the on-disk
//! contract between the two.

use std::mem::size_of;

use crate::ondisk::{Dentry, Superblock};

/// Size of a disk block, in bytes.
pub const BLOCK_SIZE: u64 = 512;

/// Number of direct block pointers in an inode.
pub const D_BLOCK: usize = 7;
/// Total number of block pointer slots in an inode (direct + one indirect).
pub const N_BLOCKS: usize = D_BLOCK + 1;
/// Index of the single-indirect pointer within `Inode::blocks`.
pub const IND_BLOCK: usize = D_BLOCK;

/// Number of pointers an indirect block holds (512 / size_of::<u64>()).
pub const PTRS_PER_BLOCK: usize = (BLOCK_SIZE as usize) / size_of::<u64>();

/// Maximum usable length of a dentry name, including the NUL terminator.
pub const MAX_NAME: usize = 28;

/// Highest logical block index a file can address.
pub const MAX_BLOCK_INDEX: u64 = (D_BLOCK + PTRS_PER_BLOCK) as u64 - 1;
/// Maximum file size in bytes.
pub const MAX_FILE_SIZE: u64 = (D_BLOCK as u64 + PTRS_PER_BLOCK as u64) * BLOCK_SIZE;

/// Number of dentries that fit in a single data block.
pub const DENTRIES_PER_BLOCK: usize = (BLOCK_SIZE as usize) / size_of::<Dentry>();

/// Inode number of the root directory.
pub const ROOT_INODE: u32 = 0;

/// Rounds `n` up to the nearest multiple of 32, as the formatter does for
/// inode and data-block counts.
pub fn round_up_32(n: u32) -> u32 {
	utils::util::round_up(n as u64, 32) as u32
}

/// Rounds a byte offset up to the nearest multiple of the block size.
pub fn round_up_block(off: u64) -> u64 {
	utils::util::round_up(off, BLOCK_SIZE)
}

/// Computes the absolute section offsets for a filesystem with `num_inodes`
/// inodes and `num_data_blocks` data blocks. Mirrors spec.md §3's offset
/// equations exactly; used by both the formatter and the mount-time
/// superblock sanity check.
pub struct Sections {
	pub i_bitmap_ptr: u64,
	pub d_bitmap_ptr: u64,
	pub i_blocks_ptr: u64,
	pub d_blocks_ptr: u64,
}

impl Sections {
	pub fn compute(num_inodes: u32, num_data_blocks: u32) -> Self {
		let sb_size = size_of::<Superblock>() as u64;
		let i_bitmap_ptr = sb_size;
		let d_bitmap_ptr = i_bitmap_ptr + (num_inodes as u64) / 8;
		let i_blocks_ptr = round_up_block(d_bitmap_ptr + (num_data_blocks as u64) / 8);
		// Each inode occupies a whole 512-byte slot, regardless of `size_of::<Inode>()`.
		let d_blocks_ptr = round_up_block(i_blocks_ptr + (num_inodes as u64) * BLOCK_SIZE);
		Self {
			i_bitmap_ptr,
			d_bitmap_ptr,
			i_blocks_ptr,
			d_blocks_ptr,
		}
	}

	/// Total required size of a backing disk, in bytes.
	pub fn required_len(&self, num_data_blocks: u32) -> u64 {
		self.d_blocks_ptr + (num_data_blocks as u64) * BLOCK_SIZE
	}
}

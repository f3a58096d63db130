//! On-disk structures shared by the formatter and the live engine.
//!
//! Every structure here is `#[repr(C)]` and accessed in place through a memory mapping; the
//! layout is therefore this crate's wire format (see [`crate::layout`] for the offsets at
//! which each structure lives). Fields are plain host-endian integers, as on every platform
//! this crate targets the host is little-endian.

use crate::layout::{D_BLOCK, MAX_NAME, N_BLOCKS};

/// The RAID mode recorded in the superblock and used throughout the engine.
///
/// A three-valued tag is used at the engine's internal boundary instead of the raw integer
/// codes from the on-disk format and the `mkfs` CLI; [`RaidMode::from_code`] maps between them
/// at parse/mount time.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RaidMode {
	/// RAID-0: logical block `g` lives on disk `g mod N`.
	Stripe,
	/// RAID-1: every logical block is mirrored identically on every disk.
	Mirror,
	/// RAID-1 with majority voting on read.
	VerifiedMirror,
}

impl RaidMode {
	/// Maps an on-disk/CLI raid code to a [`RaidMode`]. Returns `None` for an invalid code.
	pub fn from_code(code: u32) -> Option<Self> {
		match code {
			0 => Some(Self::Stripe),
			1 => Some(Self::Mirror),
			2 => Some(Self::VerifiedMirror),
			_ => None,
		}
	}

	/// Returns the on-disk/CLI code for this mode.
	pub fn code(&self) -> u32 {
		match self {
			Self::Stripe => 0,
			Self::Mirror => 1,
			Self::VerifiedMirror => 2,
		}
	}

	/// Whether this mode mirrors data (RAID-1 or RAID-1v).
	pub fn is_mirrored(&self) -> bool {
		!matches!(self, Self::Stripe)
	}
}

/// The filesystem's superblock. Lives at offset 0 of every backing disk.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct Superblock {
	/// Total number of inodes, rounded up to a multiple of 32.
	pub num_inodes: u32,
	/// Total number of data blocks, rounded up to a multiple of 32.
	pub num_data_blocks: u32,
	/// Absolute byte offset of the inode bitmap.
	pub i_bitmap_ptr: u64,
	/// Absolute byte offset of the data-block bitmap.
	pub d_bitmap_ptr: u64,
	/// Absolute byte offset of the inode table.
	pub i_blocks_ptr: u64,
	/// Absolute byte offset of the data-block region.
	pub d_blocks_ptr: u64,
	/// The RAID mode's on-disk code (0 = stripe, 1 = mirror, 2 = verified mirror).
	pub raid_mode: u32,
	/// The 0-based index of this disk within the array at format time.
	pub disk_id: u32,
}

impl Superblock {
	/// Returns this superblock's [`RaidMode`], or `None` if `raid_mode` holds an invalid code.
	pub fn raid_mode(&self) -> Option<RaidMode> {
		RaidMode::from_code(self.raid_mode)
	}

	/// Returns whether `other` describes the same filesystem layout, ignoring `disk_id` (which
	/// legitimately differs per disk).
	pub fn layout_eq(&self, other: &Self) -> bool {
		self.num_inodes == other.num_inodes
			&& self.num_data_blocks == other.num_data_blocks
			&& self.i_bitmap_ptr == other.i_bitmap_ptr
			&& self.d_bitmap_ptr == other.d_bitmap_ptr
			&& self.i_blocks_ptr == other.i_blocks_ptr
			&& self.d_blocks_ptr == other.d_blocks_ptr
			&& self.raid_mode == other.raid_mode
	}
}

/// File type bits, matching the POSIX `S_IFREG`/`S_IFDIR` values so `mode` can be handed
/// straight to `stat`-shaped structures.
pub const S_IFDIR: u32 = 0o040000;
/// Regular-file type bit, see [`S_IFDIR`].
pub const S_IFREG: u32 = 0o100000;
/// Mask isolating the type bits of `mode`.
pub const S_IFMT: u32 = 0o170000;

/// An inode. One lives per 512-byte slot of the inode table; slot `n` begins at
/// `i_blocks_ptr + n * 512` (not `n * size_of::<Inode>()` — the slot is padded to the block
/// size by the formatter).
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct Inode {
	/// This inode's own index into the inode table.
	pub num: u32,
	/// Type bits ([`S_IFDIR`]/[`S_IFREG`]) plus permission bits.
	pub mode: u32,
	/// Owning user id.
	pub uid: u32,
	/// Owning group id.
	pub gid: u32,
	/// Size in bytes.
	pub size: u64,
	/// Number of directory entries referencing this inode.
	pub nlinks: u32,
	/// Last access time, seconds since epoch.
	pub atim: i64,
	/// Last modification time, seconds since epoch.
	pub mtim: i64,
	/// Last status change time, seconds since epoch.
	pub ctim: i64,
	/// Seven direct block offsets followed by one single-indirect block offset.
	pub blocks: [u64; N_BLOCKS],
}

impl Inode {
	/// Returns whether this inode describes a directory.
	pub fn is_dir(&self) -> bool {
		self.mode & S_IFMT == S_IFDIR
	}

	/// Returns whether this inode describes a regular file.
	pub fn is_reg(&self) -> bool {
		self.mode & S_IFMT == S_IFREG
	}

	/// Returns the index of the single-indirect pointer within `blocks`.
	pub fn indirect(&self) -> u64 {
		self.blocks[D_BLOCK]
	}
}

/// A directory entry. Fixed 32 bytes: a name and the inode it references.
///
/// A slot is free when `name[0] == 0` or `num == 0`.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct Dentry {
	/// Entry name, null-terminated if shorter than [`MAX_NAME`].
	pub name: [u8; MAX_NAME],
	/// Inode index this entry references.
	pub num: u32,
}

impl Dentry {
	/// The zeroed, free dentry.
	pub const EMPTY: Self = Self {
		name: [0; MAX_NAME],
		num: 0,
	};

	/// Whether this slot is free.
	///
	/// Checks the name only, not `num`: a dentry legitimately references inode 0 whenever its
	/// target is the root (the root's own `.`/`..`, or the `..` of any directory directly under
	/// it), so `num == 0` cannot double as "unwritten" the way spec.md's data model suggests.
	/// The original implementation's directory-mutation and lookup code agrees (`name[0] ==
	/// '\0'` is the only check in `add_dentry_to_directory`/`find_dentry_in_directory`); the
	/// `num == 0` check only shows up in an unrelated helper spec.md §9 already flags as likely
	/// buggy.
	pub fn is_free(&self) -> bool {
		self.name[0] == 0
	}

	/// Builds a dentry for `name` pointing at inode `num`.
	///
	/// Returns `None` if `name` (plus its NUL terminator) does not fit in [`MAX_NAME`] bytes.
	pub fn new(name: &str, num: u32) -> Option<Self> {
		let bytes = name.as_bytes();
		if bytes.len() >= MAX_NAME {
			return None;
		}
		let mut buf = [0u8; MAX_NAME];
		buf[..bytes.len()].copy_from_slice(bytes);
		Some(Self { name: buf, num })
	}

	/// Returns this entry's name, up to the first NUL byte (or [`MAX_NAME`] if there is none).
	pub fn name_str(&self) -> &str {
		let len = self
			.name
			.iter()
			.position(|b| *b == 0)
			.unwrap_or(MAX_NAME);
		std::str::from_utf8(&self.name[..len]).unwrap_or("")
	}

	/// Compares this entry's name against `other`, bounded by [`MAX_NAME`], the way the
	/// original implementation's `strncmp` does.
	pub fn name_matches(&self, other: &str) -> bool {
		self.name_str() == other
	}
}

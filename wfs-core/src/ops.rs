//! The operation façade: spec.md §6's nine callbacks, expressed path-first.
//!
//! Every function here validates its path, resolves the parent inode, mutates the inode/dentry
//! graph through [`crate::dir`], [`crate::file`] and [`crate::bitmap`], then schedules the RAID
//! synchroniser ([`crate::raid`]) when the mutation touched file or directory content. This is
//! the boundary the `wfs` binary's `fuser::Filesystem` impl calls into; it knows nothing about
//! FUSE inode numbers or kernel request structures, only paths and the on-disk graph.

use crate::bitmap;
use crate::dir;
use crate::diskset::DiskSet;
use crate::error::WfsError;
use crate::file;
use crate::ondisk::{Dentry, RaidMode, S_IFDIR, S_IFMT, S_IFREG};
use crate::path::{resolve, split_parent};
use crate::util::now;

/// The subset of an inode's metadata `getattr` needs to populate a `stat`-shaped reply.
#[derive(Clone, Copy, Debug)]
pub struct Stat {
	pub ino: u32,
	pub mode: u32,
	pub uid: u32,
	pub gid: u32,
	pub size: u64,
	pub nlinks: u32,
	pub atime: i64,
	pub mtime: i64,
	pub ctime: i64,
}

impl Stat {
	fn from_inode(num: u32, inode: &crate::ondisk::Inode) -> Self {
		Self {
			ino: num,
			mode: inode.mode,
			uid: inode.uid,
			gid: inode.gid,
			size: inode.size,
			nlinks: inode.nlinks,
			atime: inode.atim,
			mtime: inode.mtim,
			ctime: inode.ctim,
		}
	}
}

/// One entry of a directory listing: a name, the inode it references, and that inode's mode
/// (so a caller can tell directories from regular files without a second lookup).
#[derive(Clone, Debug)]
pub struct DirEntry {
	pub name: String,
	pub ino: u32,
	pub mode: u32,
}

/// Propagates a mutation on disk 0 to every other disk, per spec.md §4.9: metadata only in
/// stripe mode (directory content there is still centralised on disk 0, see §4.5), metadata and
/// data in the mirrored modes.
fn sync_after_mutation(disks: &DiskSet) {
	match disks.raid_mode() {
		RaidMode::Stripe => raid_sync_meta(disks),
		RaidMode::Mirror | RaidMode::VerifiedMirror => raid_sync_all(disks),
	}
}

fn raid_sync_meta(disks: &DiskSet) {
	crate::raid::sync_meta(disks, 0);
}

fn raid_sync_all(disks: &DiskSet) {
	crate::raid::sync_all(disks, 0);
}

/// `getattr(path, stat)`: populates mode, uid, gid, size, atime, mtime. ENOENT on missing.
pub fn getattr(disks: &DiskSet, path: &str) -> Result<Stat, WfsError> {
	let num = resolve(disks, path)?;
	Ok(Stat::from_inode(num, disks.inode(0, num)))
}

/// `readdir(path, buf, filler, off)`: always emits `.` and `..` first (spec.md §6), which holds
/// automatically here because both are the first two dentries ever written into a fresh
/// directory's first data block (see `format` and [`mkdir`]).
pub fn readdir(disks: &DiskSet, path: &str) -> Result<Vec<DirEntry>, WfsError> {
	let num = resolve(disks, path)?;
	if !disks.inode(0, num).is_dir() {
		return Err(WfsError::NotDirectory);
	}
	Ok(dir::list(disks, num)
		.into_iter()
		.map(|(name, ino)| {
			let mode = disks.inode(0, ino).mode;
			DirEntry { name, ino, mode }
		})
		.collect())
}

/// Shared setup for `mkdir`/`mknod`: validates the path, resolves the parent, rejects a
/// duplicate name, and allocates a fresh inode for the new entry.
fn create_common<'a>(disks: &DiskSet, path: &'a str) -> Result<(String, &'a str, u32, u32), WfsError> {
	let (parent_path, name) = split_parent(path)?;
	let parent_num = resolve(disks, &parent_path)?;
	if !disks.inode(0, parent_num).is_dir() {
		return Err(WfsError::NotDirectory);
	}
	if dir::find_dentry(disks, parent_num, name).is_some() {
		return Err(WfsError::AlreadyExists);
	}
	let new_num = bitmap::alloc_inode(disks).ok_or(WfsError::NoSpace)?;
	Ok((parent_path, name, parent_num, new_num))
}

/// `mkdir(path, mode)`: EEXIST on duplicate; ENOENT on missing parent; ENOSPC on exhaustion.
///
/// Materialises `.` and `..` dentries in the new directory's first data block (spec.md §8's
/// `readdir("/")` property needs literal entries to satisfy, and scenario 6's emptiness check
/// needs them to special-case — see SPEC_FULL.md's supplemented-features note on this).
pub fn mkdir(disks: &DiskSet, path: &str, mode: u32) -> Result<(), WfsError> {
	let (_, name, parent_num, new_num) = create_common(disks, path)?;

	let entry = Dentry::new(name, new_num).ok_or(WfsError::InvalidArgument)?;
	if let Err(e) = dir::add_dentry(disks, parent_num, entry) {
		bitmap::free_inode(disks, new_num);
		return Err(e);
	}

	let timestamp = now();
	*disks.inode_mut(0, new_num) = crate::ondisk::Inode {
		num: new_num,
		mode: S_IFDIR | mode,
		uid: 0,
		gid: 0,
		size: 0,
		nlinks: 2,
		atim: timestamp,
		mtim: timestamp,
		ctim: timestamp,
		blocks: [0; crate::layout::N_BLOCKS],
	};

	// `add_dentry` failing here (directory data exhaustion) leaves the child reachable but
	// missing `.`/`..`; per spec.md §7 there is no rollback for a partial mutation.
	dir::add_dentry(disks, new_num, Dentry::new(".", new_num).expect("\".\" fits"))?;
	dir::add_dentry(disks, new_num, Dentry::new("..", parent_num).expect("\"..\" fits"))?;

	let parent = disks.inode_mut(0, parent_num);
	parent.nlinks += 1;
	parent.mtim = timestamp;

	sync_after_mutation(disks);
	Ok(())
}

/// `mknod(path, mode, dev)`: as `mkdir`. `dev` is not modelled — spec.md's data model has no
/// device-number field, and the engine only ever creates regular files this way.
///
/// Per spec.md §9 (open question 1, resolved in SPEC_FULL.md): the parent's `nlinks` is
/// incremented here too, symmetrically with `mkdir`, matching the source's existing on-disk
/// behaviour.
pub fn mknod(disks: &DiskSet, path: &str, mode: u32) -> Result<(), WfsError> {
	let (_, name, parent_num, new_num) = create_common(disks, path)?;

	let entry = Dentry::new(name, new_num).ok_or(WfsError::InvalidArgument)?;
	if let Err(e) = dir::add_dentry(disks, parent_num, entry) {
		bitmap::free_inode(disks, new_num);
		return Err(e);
	}

	let timestamp = now();
	*disks.inode_mut(0, new_num) = crate::ondisk::Inode {
		num: new_num,
		mode: S_IFREG | mode,
		uid: 0,
		gid: 0,
		size: 0,
		nlinks: 1,
		atim: timestamp,
		mtim: timestamp,
		ctim: timestamp,
		blocks: [0; crate::layout::N_BLOCKS],
	};

	let parent = disks.inode_mut(0, parent_num);
	parent.nlinks += 1;
	parent.mtim = timestamp;

	sync_after_mutation(disks);
	Ok(())
}

/// `write(path, buf, n, off)`: returns bytes written; ENOSPC on exhaustion.
pub fn write(disks: &DiskSet, path: &str, buf: &[u8], offset: u64) -> Result<usize, WfsError> {
	let num = resolve(disks, path)?;
	let n = file::write(disks, num, buf, offset)?;
	if n > 0 {
		sync_after_mutation(disks);
	}
	Ok(n)
}

/// `read(path, buf, n, off)`: returns bytes read, 0 at EOF. Read-only: no synchronisation is
/// scheduled (only `atim` changes, and every disk already carries its own metadata replica).
pub fn read(disks: &DiskSet, path: &str, buf: &mut [u8], offset: u64) -> Result<usize, WfsError> {
	let num = resolve(disks, path)?;
	file::read(disks, num, buf, offset)
}

/// `unlink(path)`: ENOENT on missing. Refuses (`EISDIR`) when `path` names a directory.
pub fn unlink(disks: &DiskSet, path: &str) -> Result<(), WfsError> {
	let (parent_path, name) = split_parent(path)?;
	let parent_num = resolve(disks, &parent_path)?;
	let entry = dir::find_dentry(disks, parent_num, name).ok_or(WfsError::NotFound)?;
	if disks.inode(0, entry.num).is_dir() {
		return Err(WfsError::IsDirectory);
	}

	file::free_file_blocks(disks, entry.num);
	bitmap::free_inode(disks, entry.num);
	dir::remove_dentry(disks, parent_num, name)?;

	let parent = disks.inode_mut(0, parent_num);
	parent.nlinks -= 1;
	parent.mtim = now();

	sync_after_mutation(disks);
	Ok(())
}

/// `rmdir(path)`: refuses non-empty directories and the root.
pub fn rmdir(disks: &DiskSet, path: &str) -> Result<(), WfsError> {
	let (parent_path, name) = split_parent(path)?;
	let parent_num = resolve(disks, &parent_path)?;
	let entry = dir::find_dentry(disks, parent_num, name).ok_or(WfsError::NotFound)?;
	if !disks.inode(0, entry.num).is_dir() {
		return Err(WfsError::NotDirectory);
	}
	if !dir::is_empty(disks, entry.num) {
		return Err(WfsError::NotEmpty);
	}

	dir::free_dir_blocks(disks, entry.num);
	bitmap::free_inode(disks, entry.num);
	dir::remove_dentry(disks, parent_num, name)?;

	let parent = disks.inode_mut(0, parent_num);
	parent.nlinks -= 1;
	parent.mtim = now();

	sync_after_mutation(disks);
	Ok(())
}

/// Returns whether `mode` bits mark a directory. Exposed for the `wfs` binary's FUSE glue, which
/// needs to classify entries without reaching into [`crate::ondisk`] directly.
pub fn mode_is_dir(mode: u32) -> bool {
	mode & S_IFMT == S_IFDIR
}

/// Returns whether `mode` bits mark a regular file, see [`mode_is_dir`].
pub fn mode_is_reg(mode: u32) -> bool {
	mode & S_IFMT == S_IFREG
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::format::{format, FormatOptions};
	use crate::ondisk::RaidMode;
	use std::path::PathBuf;
	use tempfile::NamedTempFile;

	fn make_disk(len: u64) -> (NamedTempFile, PathBuf) {
		let file = NamedTempFile::new().unwrap();
		file.as_file().set_len(len).unwrap();
		let path = file.path().to_path_buf();
		(file, path)
	}

	fn format_and_open(n_disks: usize, raid: RaidMode) -> (Vec<NamedTempFile>, DiskSet) {
		let mut files = Vec::new();
		let mut paths = Vec::new();
		for _ in 0..n_disks {
			let (f, p) = make_disk(1024 * 1024);
			files.push(f);
			paths.push(p);
		}
		format(&FormatOptions {
			disks: &paths,
			raid_mode: raid,
			num_inodes: 32,
			num_data_blocks: 224,
		})
		.unwrap();
		let disks = DiskSet::open(&paths).unwrap();
		(files, disks)
	}

	#[test]
	fn root_getattr_is_directory() {
		let (_files, disks) = format_and_open(1, RaidMode::Stripe);
		let stat = getattr(&disks, "/").unwrap();
		assert!(mode_is_dir(stat.mode));
		assert_eq!(stat.nlinks, 2);
	}

	#[test]
	fn root_readdir_is_dot_and_dotdot() {
		let (_files, disks) = format_and_open(1, RaidMode::Stripe);
		let entries = readdir(&disks, "/").unwrap();
		let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
		assert_eq!(names, vec![".", ".."]);
	}

	#[test]
	fn mkdir_then_getattr() {
		let (_files, disks) = format_and_open(1, RaidMode::Stripe);
		mkdir(&disks, "/a", 0o755).unwrap();
		let stat = getattr(&disks, "/a").unwrap();
		assert!(mode_is_dir(stat.mode));
		assert_eq!(getattr(&disks, "/").unwrap().nlinks, 3);
	}

	#[test]
	fn mkdir_twice_is_eexist() {
		let (_files, disks) = format_and_open(1, RaidMode::Stripe);
		mkdir(&disks, "/a", 0o755).unwrap();
		assert_eq!(mkdir(&disks, "/a", 0o755), Err(WfsError::AlreadyExists));
	}

	#[test]
	fn write_then_read_roundtrip() {
		let (_files, disks) = format_and_open(1, RaidMode::Stripe);
		mknod(&disks, "/f", 0o644).unwrap();
		let n = write(&disks, "/f", b"hello", 0).unwrap();
		assert_eq!(n, 5);
		let mut buf = [0u8; 5];
		let n = read(&disks, "/f", &mut buf, 0).unwrap();
		assert_eq!(n, 5);
		assert_eq!(&buf, b"hello");
		assert_eq!(getattr(&disks, "/f").unwrap().size, 5);
	}

	#[test]
	fn rmdir_refuses_nonempty_then_succeeds_after_unlink() {
		let (_files, disks) = format_and_open(1, RaidMode::Stripe);
		mkdir(&disks, "/a", 0o755).unwrap();
		mknod(&disks, "/a/f", 0o644).unwrap();
		assert_eq!(rmdir(&disks, "/a"), Err(WfsError::NotEmpty));
		unlink(&disks, "/a/f").unwrap();
		rmdir(&disks, "/a").unwrap();
		assert_eq!(getattr(&disks, "/a"), Err(WfsError::NotFound));
	}

	#[test]
	fn indirect_block_growth() {
		let (_files, disks) = format_and_open(1, RaidMode::Stripe);
		mknod(&disks, "/f", 0o644).unwrap();
		let offset = 7 * 512;
		write(&disks, "/f", b"x", offset).unwrap();
		let num = resolve(&disks, "/f").unwrap();
		let inode = disks.inode(0, num);
		assert_ne!(inode.blocks[7], 0);
		assert!(inode.blocks[..7].iter().all(|&b| b == 0));
		assert_eq!(inode.size, offset + 1);
	}
}

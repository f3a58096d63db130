//! The `fuser::Filesystem` bridge: adapts the path-based operation façade in
//! `wfs_core::ops` to the kernel-side FUSE bridge's inode-number-based callbacks.
//!
//! spec.md §1 scopes "the kernel-side filesystem-in-userspace bridge that delivers path-based
//! operations to the engine" out as an external collaborator with a shape "dictated by that
//! bridge". `fuser`'s low-level `Filesystem` trait is inode-indexed, not path-indexed, so this
//! module keeps the one piece of state the engine itself has no use for: a table mapping the
//! FUSE inode numbers the kernel hands back on every call to the WFS paths they name. The engine
//! behind it (`wfs_core::ops`) never sees a FUSE inode number.

use fuser::{
	FileAttr, FileType, Filesystem, ReplyAttr, ReplyData, ReplyDirectory, ReplyEmpty, ReplyEntry,
	ReplyWrite, Request,
};
use log::{debug, warn};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use wfs_core::ops::{self, Stat};
use wfs_core::DiskSet;

/// How long the kernel may cache an attr/entry reply before re-validating it. The engine has no
/// durability or coherence guarantees beyond "reflects the last completed operation" (spec.md
/// §5), so a short TTL is used rather than an indefinite one.
const TTL: Duration = Duration::from_secs(1);

/// Translates a WFS inode number to the FUSE inode number used at the kernel boundary.
/// `fuser`'s root inode is conventionally 1, so WFS inode `n` maps to FUSE inode `n + 1`.
fn fuse_ino(wfs_num: u32) -> u64 {
	wfs_num as u64 + 1
}

/// The inverse of [`fuse_ino`].
fn wfs_num(fuse_ino: u64) -> u32 {
	(fuse_ino - 1) as u32
}

fn join(parent: &str, name: &str) -> String {
	if parent == "/" {
		format!("/{name}")
	} else {
		format!("{parent}/{name}")
	}
}

fn systime(secs: i64) -> SystemTime {
	if secs >= 0 {
		UNIX_EPOCH + Duration::from_secs(secs as u64)
	} else {
		UNIX_EPOCH - Duration::from_secs((-secs) as u64)
	}
}

fn attr_from_stat(stat: &Stat) -> FileAttr {
	let kind = if ops::mode_is_dir(stat.mode) {
		FileType::Directory
	} else {
		FileType::RegularFile
	};
	FileAttr {
		ino: fuse_ino(stat.ino),
		size: stat.size,
		blocks: stat.size.div_ceil(wfs_core::layout::BLOCK_SIZE),
		atime: systime(stat.atime),
		mtime: systime(stat.mtime),
		ctime: systime(stat.ctime),
		crtime: systime(stat.ctime),
		kind,
		perm: (stat.mode & 0o7777) as u16,
		nlink: stat.nlinks,
		uid: stat.uid,
		gid: stat.gid,
		rdev: 0,
		blksize: wfs_core::layout::BLOCK_SIZE as u32,
		flags: 0,
	}
}

/// The live filesystem, as seen by the FUSE bridge.
pub struct Wfs {
	disks: DiskSet,
	/// FUSE inode -> WFS absolute path. Populated by every `lookup`/`readdir`/create call;
	/// never shrunk (spec.md's engine keeps no reference counts on FUSE inodes — paths are
	/// cheap and the table lives for the process's lifetime, same as the disk mappings).
	paths: HashMap<u64, String>,
}

impl Wfs {
	/// Builds the bridge over an already-mounted [`DiskSet`].
	pub fn new(disks: DiskSet) -> Self {
		let mut paths = HashMap::new();
		paths.insert(fuser::FUSE_ROOT_ID, "/".to_string());
		Self { disks, paths }
	}

	fn path_of(&self, ino: u64) -> Option<&str> {
		self.paths.get(&ino).map(String::as_str)
	}

	fn remember(&mut self, path: String, stat: &Stat) -> u64 {
		let ino = fuse_ino(stat.ino);
		self.paths.insert(ino, path);
		ino
	}
}

impl Filesystem for Wfs {
	fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
		let Some(parent_path) = self.path_of(parent).map(str::to_string) else {
			reply.error(libc::ENOENT);
			return;
		};
		let Some(name) = name.to_str() else {
			reply.error(libc::EINVAL);
			return;
		};
		let path = join(&parent_path, name);
		match ops::getattr(&self.disks, &path) {
			Ok(stat) => {
				let attr = attr_from_stat(&stat);
				self.remember(path, &stat);
				reply.entry(&TTL, &attr, 0);
			}
			Err(e) => reply.error(e.to_errno().unsigned_abs() as i32),
		}
	}

	fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
		let Some(path) = self.path_of(ino).map(str::to_string) else {
			reply.error(libc::ENOENT);
			return;
		};
		match ops::getattr(&self.disks, &path) {
			Ok(stat) => reply.attr(&TTL, &attr_from_stat(&stat)),
			Err(e) => reply.error(e.to_errno().unsigned_abs() as i32),
		}
	}

	fn mkdir(
		&mut self,
		_req: &Request<'_>,
		parent: u64,
		name: &OsStr,
		mode: u32,
		umask: u32,
		reply: ReplyEntry,
	) {
		let Some(parent_path) = self.path_of(parent).map(str::to_string) else {
			reply.error(libc::ENOENT);
			return;
		};
		let Some(name) = name.to_str() else {
			reply.error(libc::EINVAL);
			return;
		};
		let path = join(&parent_path, name);
		if let Err(e) = ops::mkdir(&self.disks, &path, mode & !umask & 0o7777) {
			reply.error(e.to_errno().unsigned_abs() as i32);
			return;
		}
		match ops::getattr(&self.disks, &path) {
			Ok(stat) => {
				let attr = attr_from_stat(&stat);
				self.remember(path, &stat);
				reply.entry(&TTL, &attr, 0);
			}
			Err(e) => reply.error(e.to_errno().unsigned_abs() as i32),
		}
	}

	fn mknod(
		&mut self,
		_req: &Request<'_>,
		parent: u64,
		name: &OsStr,
		mode: u32,
		umask: u32,
		_rdev: u32,
		reply: ReplyEntry,
	) {
		let Some(parent_path) = self.path_of(parent).map(str::to_string) else {
			reply.error(libc::ENOENT);
			return;
		};
		let Some(name) = name.to_str() else {
			reply.error(libc::EINVAL);
			return;
		};
		let path = join(&parent_path, name);
		if let Err(e) = ops::mknod(&self.disks, &path, mode & !umask & 0o7777) {
			reply.error(e.to_errno().unsigned_abs() as i32);
			return;
		}
		match ops::getattr(&self.disks, &path) {
			Ok(stat) => {
				let attr = attr_from_stat(&stat);
				self.remember(path, &stat);
				reply.entry(&TTL, &attr, 0);
			}
			Err(e) => reply.error(e.to_errno().unsigned_abs() as i32),
		}
	}

	fn read(
		&mut self,
		_req: &Request<'_>,
		ino: u64,
		_fh: u64,
		offset: i64,
		size: u32,
		_flags: i32,
		_lock_owner: Option<u64>,
		reply: ReplyData,
	) {
		let Some(path) = self.path_of(ino).map(str::to_string) else {
			reply.error(libc::ENOENT);
			return;
		};
		let mut buf = vec![0u8; size as usize];
		match ops::read(&self.disks, &path, &mut buf, offset as u64) {
			Ok(n) => reply.data(&buf[..n]),
			Err(e) => reply.error(e.to_errno().unsigned_abs() as i32),
		}
	}

	fn write(
		&mut self,
		_req: &Request<'_>,
		ino: u64,
		_fh: u64,
		offset: i64,
		data: &[u8],
		_write_flags: u32,
		_flags: i32,
		_lock_owner: Option<u64>,
		reply: ReplyWrite,
	) {
		let Some(path) = self.path_of(ino).map(str::to_string) else {
			reply.error(libc::ENOENT);
			return;
		};
		match ops::write(&self.disks, &path, data, offset as u64) {
			Ok(n) => reply.written(n as u32),
			Err(e) => reply.error(e.to_errno().unsigned_abs() as i32),
		}
	}

	fn readdir(
		&mut self,
		_req: &Request<'_>,
		ino: u64,
		_fh: u64,
		offset: i64,
		mut reply: ReplyDirectory,
	) {
		let Some(path) = self.path_of(ino).map(str::to_string) else {
			reply.error(libc::ENOENT);
			return;
		};
		let entries = match ops::readdir(&self.disks, &path) {
			Ok(entries) => entries,
			Err(e) => {
				reply.error(e.to_errno().unsigned_abs() as i32);
				return;
			}
		};
		for (i, entry) in entries.into_iter().enumerate().skip(offset as usize) {
			let kind = if ops::mode_is_dir(entry.mode) {
				FileType::Directory
			} else {
				FileType::RegularFile
			};
			let child_ino = fuse_ino(entry.ino);
			if entry.name != "." && entry.name != ".." {
				self.paths.entry(child_ino).or_insert_with(|| join(&path, &entry.name));
			}
			let full = (i + 1) as i64;
			if reply.add(child_ino, full, kind, &entry.name) {
				break;
			}
		}
		reply.ok();
	}

	fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
		let Some(parent_path) = self.path_of(parent).map(str::to_string) else {
			reply.error(libc::ENOENT);
			return;
		};
		let Some(name) = name.to_str() else {
			reply.error(libc::EINVAL);
			return;
		};
		let path = join(&parent_path, name);
		match ops::unlink(&self.disks, &path) {
			Ok(()) => {
				debug!("unlink: removed {path}");
				reply.ok();
			}
			Err(e) => reply.error(e.to_errno().unsigned_abs() as i32),
		}
	}

	fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
		let Some(parent_path) = self.path_of(parent).map(str::to_string) else {
			reply.error(libc::ENOENT);
			return;
		};
		let Some(name) = name.to_str() else {
			reply.error(libc::EINVAL);
			return;
		};
		let path = join(&parent_path, name);
		match ops::rmdir(&self.disks, &path) {
			Ok(()) => {
				debug!("rmdir: removed {path}");
				reply.ok();
			}
			Err(e) => {
				warn!("rmdir: {path}: {e}");
				reply.error(e.to_errno().unsigned_abs() as i32);
			}
		}
	}
}

//! The engine's internal error type.
//!
//! `io::Result` stays at the formatter's boundary (opening/mapping files is plain I/O), but the
//! live engine's operations need a typed error so the operation façade can map cleanly to the
//! small, fixed set of negative errno values the FUSE bridge expects.

use std::fmt;

/// An error produced by an engine operation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WfsError {
	/// The path did not start with `/`, or a component was malformed (e.g. too long).
	InvalidArgument,
	/// A path component did not resolve to an existing entry.
	NotFound,
	/// The target of a creation already exists.
	AlreadyExists,
	/// Inodes, data blocks, or directory slots are exhausted.
	NoSpace,
	/// An operation expected a directory (or a regular file) and found the other type.
	NotDirectory,
	/// A directory operation was attempted on something that is not a directory.
	IsDirectory,
	/// `rmdir` was attempted on a non-empty directory.
	NotEmpty,
	/// An offset fell beyond the maximum addressable file size.
	OutOfRange,
}

impl WfsError {
	/// Maps this error to a negative errno value, as returned by every engine callback in
	/// spec.md §6.
	pub fn to_errno(self) -> i32 {
		let errno = match self {
			Self::InvalidArgument => libc::EINVAL,
			Self::NotFound => libc::ENOENT,
			Self::AlreadyExists => libc::EEXIST,
			Self::NoSpace => libc::ENOSPC,
			Self::NotDirectory => libc::ENOTDIR,
			Self::IsDirectory => libc::EISDIR,
			Self::NotEmpty => libc::ENOTEMPTY,
			Self::OutOfRange => libc::EFBIG,
		};
		-errno
	}
}

impl fmt::Display for WfsError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let msg = match self {
			Self::InvalidArgument => "invalid argument",
			Self::NotFound => "no such file or directory",
			Self::AlreadyExists => "file exists",
			Self::NoSpace => "no space left on device",
			Self::NotDirectory => "not a directory",
			Self::IsDirectory => "is a directory",
			Self::NotEmpty => "directory not empty",
			Self::OutOfRange => "file too large",
		};
		write!(f, "{msg}")
	}
}

impl std::error::Error for WfsError {}

/// An error produced by the formatter, surfaced to the `mkfs` binary.
#[derive(Debug)]
pub enum FormatError {
	/// An unrecognised RAID mode code.
	BadRaidMode,
	/// A non-positive inode or data-block count was requested.
	BadCount,
	/// RAID-1/1v was requested with fewer than two disks.
	NotEnoughDisks,
	/// A backing file is smaller than the computed required size.
	DiskTooSmall {
		/// Path of the undersized disk.
		path: std::path::PathBuf,
		/// Minimum required size, in bytes.
		required: u64,
		/// The disk's actual size, in bytes.
		actual: u64,
	},
	/// Opening or resizing a backing file failed.
	Io(std::io::Error),
}

impl From<std::io::Error> for FormatError {
	fn from(e: std::io::Error) -> Self {
		Self::Io(e)
	}
}

impl fmt::Display for FormatError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::BadRaidMode => write!(f, "invalid raid mode"),
			Self::BadCount => write!(f, "inode and data block counts must be positive"),
			Self::NotEnoughDisks => write!(f, "raid 1/1v requires at least two disks"),
			Self::DiskTooSmall {
				path,
				required,
				actual,
			} => write!(
				f,
				"{}: too small: need {required} bytes, got {actual}",
				path.display()
			),
			Self::Io(e) => write!(f, "{e}"),
		}
	}
}

impl std::error::Error for FormatError {}

//! Path splitting and resolution over the dentry graph.

use crate::diskset::DiskSet;
use crate::dir;
use crate::error::WfsError;
use crate::layout::{MAX_NAME, ROOT_INODE};

/// Splits an absolute path into its `/`-separated components. Empty components (from
/// doubled or trailing slashes) are dropped.
///
/// Returns [`WfsError::InvalidArgument`] if `path` does not start with `/`.
pub fn split(path: &str) -> Result<Vec<&str>, WfsError> {
	if !path.starts_with('/') {
		return Err(WfsError::InvalidArgument);
	}
	Ok(path.split('/').filter(|c| !c.is_empty()).collect())
}

/// Walks the dentry graph from the root, descending one component per path segment.
///
/// Fails with [`WfsError::NotFound`] on a missing component, or [`WfsError::NotDirectory`]
/// when an intermediate component is not a directory.
pub fn resolve(disks: &DiskSet, path: &str) -> Result<u32, WfsError> {
	let components = split(path)?;
	let mut current = ROOT_INODE;
	for name in components {
		let inode = disks.inode(0, current);
		if !inode.is_dir() {
			return Err(WfsError::NotDirectory);
		}
		let entry = dir::find_dentry(disks, current, name).ok_or(WfsError::NotFound)?;
		current = entry.num;
	}
	Ok(current)
}

/// Splits an absolute path into its parent directory path and final component name.
///
/// Rejects the root itself (it has no parent to split off), and names that are empty or too
/// long to fit a [`crate::ondisk::Dentry`].
pub fn split_parent(path: &str) -> Result<(String, &str), WfsError> {
	if !path.starts_with('/') {
		return Err(WfsError::InvalidArgument);
	}
	let trimmed = path.trim_end_matches('/');
	if trimmed.is_empty() {
		// path was "/" (or all slashes): no parent to split off.
		return Err(WfsError::InvalidArgument);
	}
	let idx = trimmed.rfind('/').ok_or(WfsError::InvalidArgument)?;
	let name = &trimmed[idx + 1..];
	if name.is_empty() || name.len() >= MAX_NAME {
		return Err(WfsError::InvalidArgument);
	}
	let parent = if idx == 0 {
		"/".to_string()
	} else {
		trimmed[..idx].to_string()
	};
	Ok((parent, name))
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn split_root() {
		assert_eq!(split("/").unwrap(), Vec::<&str>::new());
	}

	#[test]
	fn split_nested() {
		assert_eq!(split("/a/b/c").unwrap(), vec!["a", "b", "c"]);
	}

	#[test]
	fn split_rejects_relative() {
		assert_eq!(split("a/b"), Err(WfsError::InvalidArgument));
	}

	#[test]
	fn split_parent_top_level() {
		let (parent, name) = split_parent("/foo").unwrap();
		assert_eq!(parent, "/");
		assert_eq!(name, "foo");
	}

	#[test]
	fn split_parent_nested() {
		let (parent, name) = split_parent("/a/b").unwrap();
		assert_eq!(parent, "/a");
		assert_eq!(name, "b");
	}

	#[test]
	fn split_parent_rejects_root() {
		assert_eq!(split_parent("/"), Err(WfsError::InvalidArgument));
	}
}

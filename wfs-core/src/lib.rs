//! The WFS engine: on-disk layout, formatter, and the live inode/dentry graph.
//!
//! This crate is shared by the `mkfs` binary (which only needs [`format`] and the on-disk
//! structs) and the `wfs` binary (which links every module here and layers a FUSE bridge on top
//! of [`ops`]).

pub mod bitmap;
pub mod dir;
pub mod diskset;
pub mod error;
pub mod file;
pub mod format;
pub mod layout;
pub mod ondisk;
pub mod ops;
pub mod path;
pub mod raid;
pub mod util;

pub use diskset::DiskSet;
pub use error::{FormatError, WfsError};
pub use format::{format, FormatOptions};
pub use ondisk::RaidMode;

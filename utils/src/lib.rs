//! This module implements features common to the `mkfs` and `wfs` binaries.

pub mod util;

//! Small helpers shared across the engine.

/// Returns the current time, in whole seconds since the Unix epoch, as stored in
/// [`crate::ondisk::Inode`]'s `atim`/`mtim`/`ctim` fields.
pub fn now() -> i64 {
	utils::util::get_timestamp().as_secs() as i64
}

use crate::{
    device::CounterSource,
    error::{IbwatchError, Result},
};
use std::path::Path;

mod sysfs;
pub use sysfs::SysfsSource;

/// Default location of the InfiniBand device class tree.
pub const DEFAULT_SYSFS_ROOT: &str = "/sys/class/infiniband";

/// Opens the counter source rooted at `root`.
///
/// A missing root is not an error (discovery then finds no devices), but a
/// root that exists and is not a directory is.
pub fn create_source(root: &Path) -> Result<Box<dyn CounterSource>> {
    if root.exists() && !root.is_dir() {
        return Err(IbwatchError::Platform(format!(
            "{} is not a directory",
            root.display()
        )));
    }
    Ok(Box::new(SysfsSource::new(root)))
}

#![allow(dead_code)]

use simplefs::{MemDisk, MountedVolume, DEFAULT_TOTAL_BLOCKS};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A freshly formatted and mounted 4 MiB RAM volume.
pub fn fresh_volume() -> MountedVolume<MemDisk> {
    init_logger();
    MountedVolume::format(MemDisk::new(DEFAULT_TOTAL_BLOCKS)).expect("format")
}

pub fn names(vol: &mut MountedVolume<MemDisk>) -> Vec<String> {
    vol.list_directory()
        .expect("ls")
        .into_iter()
        .map(|e| e.name)
        .collect()
}

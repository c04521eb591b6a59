mod common;

use common::{fresh_volume, names};
use simplefs::{FsError, MemDisk, MountedVolume, BLOCK_SIZE, MAX_FILE_SIZE, NUM_INODES};

#[test]
fn nested_directory_removal_requires_emptying_first() {
    let mut vol = fresh_volume();
    vol.make_directory("a").unwrap();
    vol.change_directory("a").unwrap();
    vol.create_file("f").unwrap();
    vol.append_file("f", b"hello").unwrap();
    vol.change_directory("..").unwrap();

    assert!(matches!(vol.remove("a"), Err(FsError::DirectoryNotEmpty)));

    vol.change_directory("a").unwrap();
    vol.remove("f").unwrap();
    vol.change_directory("..").unwrap();
    vol.remove("a").unwrap();

    assert!(!names(&mut vol).iter().any(|n| n == "a"));
    assert_eq!(names(&mut vol), [".", ".."]);
}

#[test]
fn stats_after_format_count_root_and_reservation() {
    let vol = fresh_volume();
    let stats = vol.stats();
    let reserved = vol.layout().data_area_start;

    assert_eq!(stats.inodes_used, 1);
    assert_eq!(stats.inodes_total, NUM_INODES);
    assert_eq!(stats.reserved_blocks, reserved);
    // Metadata reservation plus the root directory's single block.
    assert_eq!(stats.data_blocks_used, reserved + 1);
    assert_eq!(stats.user_blocks_used(), 1);
    assert_eq!(stats.data_blocks_total, 8192);
}

#[test]
fn reservation_does_not_depend_on_disk_size() {
    common::init_logger();
    for blocks in [64, 1024, 8192, 16384] {
        let vol = MountedVolume::format(MemDisk::new(blocks)).unwrap();
        let stats = vol.stats();
        assert_eq!(stats.inodes_used, 1);
        assert_eq!(stats.data_blocks_used, vol.layout().data_area_start + 1);
        assert_eq!(stats.data_blocks_total, blocks);
    }
}

#[test]
fn freed_inode_is_reused_first() {
    let mut vol = fresh_volume();
    let a = vol.create_file("a").unwrap();
    let b = vol.create_file("b").unwrap();
    let c = vol.create_file("c").unwrap();
    assert_eq!((a, b, c), (1, 2, 3));

    vol.remove("b").unwrap();
    assert_eq!(vol.create_file("d").unwrap(), b);
    assert_eq!(vol.create_file("e").unwrap(), 4);
}

#[test]
fn freed_data_block_is_reused_first() {
    let mut vol = fresh_volume();
    vol.create_file("x").unwrap();
    vol.append_file("x", &[1; BLOCK_SIZE]).unwrap();
    let x = vol.lookup("x").unwrap();
    let x_block = vol.read_inode(x).unwrap().direct[0];

    vol.create_file("y").unwrap();
    vol.append_file("y", &[2; BLOCK_SIZE]).unwrap();

    vol.remove("x").unwrap();
    vol.create_file("z").unwrap();
    vol.append_file("z", b"z").unwrap();
    let z = vol.lookup("z").unwrap();
    let z_block = vol.read_inode(z).unwrap().direct[0];
    assert_eq!(z_block, x_block);
}

#[test]
fn retouching_a_removed_name_succeeds() {
    let mut vol = fresh_volume();
    let first = vol.create_file("note").unwrap();
    vol.append_file("note", b"old").unwrap();
    vol.remove("note").unwrap();
    assert!(!names(&mut vol).contains(&"note".to_string()));

    let second = vol.create_file("note").unwrap();
    assert_eq!(second, first);
    assert_eq!(vol.read_file("note").unwrap(), b"");
}

#[test]
fn append_boundary_at_direct_pointer_ceiling() {
    let mut vol = fresh_volume();
    vol.create_file("max").unwrap();
    let data: Vec<u8> = (0..MAX_FILE_SIZE).map(|i| (i * 7 % 256) as u8).collect();
    vol.append_file("max", &data).unwrap();

    assert!(matches!(
        vol.append_file("max", b"+"),
        Err(FsError::FileTooLarge)
    ));
    assert_eq!(vol.read_file("max").unwrap(), data);
    assert_eq!(vol.stat("max").unwrap().size as usize, MAX_FILE_SIZE);
}

#[test]
fn directory_holds_one_block_of_entries() {
    let mut vol = fresh_volume();
    for i in 0..14 {
        vol.create_file(&format!("f{i:02}")).unwrap();
    }
    assert!(matches!(
        vol.create_file("one-too-many"),
        Err(FsError::DirectoryFull)
    ));
    assert!(matches!(
        vol.make_directory("dir-too-many"),
        Err(FsError::DirectoryFull)
    ));
    // Failed inserts leak nothing.
    assert_eq!(vol.stats().inodes_used, 15);

    vol.remove("f03").unwrap();
    vol.make_directory("fits").unwrap();
}

#[test]
fn deep_navigation_is_one_component_per_call() {
    let mut vol = fresh_volume();
    vol.make_directory("a").unwrap();
    vol.change_directory("a").unwrap();
    vol.make_directory("b").unwrap();
    vol.change_directory("/").unwrap();

    assert!(matches!(vol.change_directory("a/b"), Err(FsError::NotFound)));
    assert_eq!(vol.current_path(), "/");

    vol.change_directory("a").unwrap();
    vol.change_directory("b").unwrap();
    assert_eq!(vol.current_path(), "/a/b/");
    vol.change_directory("..").unwrap();
    vol.change_directory("..").unwrap();
    vol.change_directory("..").unwrap();
    assert_eq!(vol.current_path(), "/");
    assert_eq!(vol.current_dir_inode(), 0);
}

#[test]
fn names_are_limited_to_27_bytes() {
    let mut vol = fresh_volume();
    let ok = "n".repeat(27);
    let long = "n".repeat(28);
    vol.create_file(&ok).unwrap();
    assert!(matches!(
        vol.create_file(&long),
        Err(FsError::NameTooLong { max: 27 })
    ));
    assert!(matches!(
        vol.make_directory(&long),
        Err(FsError::NameTooLong { .. })
    ));
    assert!(matches!(vol.create_file(&ok), Err(FsError::AlreadyExists)));
}

#[test]
fn disk_full_keeps_partial_append() {
    common::init_logger();
    // 64-block volume: 17 metadata blocks plus root leave 46 free blocks.
    let mut vol = MountedVolume::format(MemDisk::new(64)).unwrap();
    let free = vol.stats().data_blocks_total - vol.stats().data_blocks_used;
    assert_eq!(free, 46);

    let mut filled = 0;
    let mut i = 0;
    let err = loop {
        let name = format!("f{i}");
        vol.create_file(&name).unwrap();
        match vol.append_file(&name, &[0xEE; MAX_FILE_SIZE]) {
            Ok(()) => filled += MAX_FILE_SIZE,
            Err(e) => break (name, e),
        }
        i += 1;
    };
    assert!(matches!(err.1, FsError::NoFreeDataBlock));
    // 3 full files use 36 blocks; the fourth got the remaining 10.
    assert_eq!(filled, 3 * MAX_FILE_SIZE);
    assert_eq!(vol.stat(&err.0).unwrap().size as usize, 10 * BLOCK_SIZE);
    assert_eq!(vol.read_file(&err.0).unwrap(), vec![0xEE; 10 * BLOCK_SIZE]);

    // No room for a new directory's block either.
    assert!(matches!(
        vol.make_directory("d"),
        Err(FsError::NoFreeDataBlock)
    ));
}

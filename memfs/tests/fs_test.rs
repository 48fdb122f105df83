use std::collections::BTreeMap;
use std::io::{Read, Seek, SeekFrom, Write};

use memfs::{BlockError, EntryKind, FsError, MemFs, Snapshot};

#[test]
fn write_then_read_returns_whole_block_padded_data() {
    let mut fs = MemFs::new(4, 4);
    fs.create_entry("/", "a", EntryKind::File).unwrap();

    fs.write("/a", b"HELLOWORLD").unwrap();

    assert_eq!(fs.file_blocks("/a").unwrap(), &[0, 1, 2]);
    assert_eq!(fs.declared_size("/a").unwrap(), 12);
    assert_eq!(fs.read("/a").unwrap(), b"HELLOWORLD\0\0");
    assert_eq!(fs.free_blocks(), 1);
}

#[test]
fn exhaustion_mid_write_keeps_the_partial_blocks() {
    let mut fs = MemFs::new(4, 4);
    fs.create_entry("/", "a", EntryKind::File).unwrap();
    fs.write("/a", b"HELLOWORLD").unwrap();

    // One slot left; a second file needing two blocks must fail partway.
    fs.create_entry("/", "b", EntryKind::File).unwrap();
    match fs.write("/b", b"WXYZQ") {
        Err(FsError::Block(BlockError::OutOfSpace)) => {}
        other => panic!("unexpected result: {:?}", other),
    }

    // No rollback: the first chunk stays owned by the file.
    assert_eq!(fs.file_blocks("/b").unwrap(), &[3]);
    assert_eq!(fs.declared_size("/b").unwrap(), 4);
    assert_eq!(fs.read("/b").unwrap(), b"WXYZ");
    assert_eq!(fs.free_blocks(), 0);
}

#[test]
fn copy_duplicates_blocks_physically() {
    let mut fs = MemFs::new(8, 4);
    fs.create_entry("/", "a", EntryKind::File).unwrap();
    fs.write("/a", b"AAAA").unwrap();

    fs.copy("/a", "/b").unwrap();

    let a_blocks: Vec<usize> = fs.file_blocks("/a").unwrap().to_vec();
    let b_blocks: Vec<usize> = fs.file_blocks("/b").unwrap().to_vec();
    assert!(a_blocks.iter().all(|slot| !b_blocks.contains(slot)));

    // Mutating the source afterwards must not show through the copy.
    fs.write("/a", b"BBBB").unwrap();
    assert_eq!(fs.read("/b").unwrap(), b"AAAA");
}

#[test]
fn copy_into_missing_parent_fails_not_found() {
    let mut fs = MemFs::new(4, 4);
    fs.create_entry("/", "a", EntryKind::File).unwrap();

    match fs.copy("/a", "/ghost/b") {
        Err(FsError::NotFound(path)) => assert_eq!(path, "/ghost"),
        other => panic!("unexpected result: {:?}", other),
    }
    match fs.copy("/ghost", "/b") {
        Err(FsError::NotFound(path)) => assert_eq!(path, "/ghost"),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn move_relocates_contents_and_releases_the_source() {
    let mut fs = MemFs::new(4, 4);
    fs.create_entry("/", "a", EntryKind::File).unwrap();
    fs.create_entry("/", "d", EntryKind::Directory).unwrap();
    fs.write("/a", b"PAYLOAD").unwrap();
    let before = fs.read("/a").unwrap();

    fs.move_file("/a", "/d/a").unwrap();

    assert!(matches!(fs.kind_of("/a"), Err(FsError::NotFound(_))));
    assert_eq!(fs.read("/d/a").unwrap(), before);
    // Duplication plus release nets out to the same pool pressure.
    assert_eq!(fs.free_blocks(), 2);
}

#[test]
fn failed_move_never_leaves_zero_copies() {
    let mut fs = MemFs::new(2, 4);
    fs.create_entry("/", "a", EntryKind::File).unwrap();
    fs.write("/a", b"12345678").unwrap();

    // The pool is full, so the copy half must fail before the delete half.
    match fs.move_file("/a", "/b") {
        Err(FsError::Block(BlockError::OutOfSpace)) => {}
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(fs.read("/a").unwrap(), b"12345678");
}

#[test]
fn delete_releases_exactly_the_owned_slots() {
    let mut fs = MemFs::new(4, 4);
    fs.create_entry("/", "big", EntryKind::File).unwrap();
    fs.create_entry("/", "small", EntryKind::File).unwrap();
    fs.write("/big", b"123456789012").unwrap();
    fs.write("/small", b"1234").unwrap();
    assert_eq!(fs.free_blocks(), 0);

    fs.delete("/big").unwrap();

    // Exactly three slots came back; claiming all of them must succeed.
    assert_eq!(fs.free_blocks(), 3);
    fs.create_entry("/", "refill", EntryKind::File).unwrap();
    fs.write("/refill", b"123456789012").unwrap();
    assert_eq!(fs.free_blocks(), 0);
}

#[test]
fn directory_must_be_emptied_before_deletion() {
    let mut fs = MemFs::new(4, 4);
    fs.create_entry("/", "d", EntryKind::Directory).unwrap();
    fs.create_entry("/d", "f", EntryKind::File).unwrap();
    fs.write("/d/f", b"data").unwrap();

    match fs.delete("/d") {
        Err(FsError::DirectoryNotEmpty(path)) => assert_eq!(path, "/d"),
        other => panic!("unexpected result: {:?}", other),
    }

    fs.delete("/d/f").unwrap();
    fs.delete("/d").unwrap();
    assert_eq!(fs.free_blocks(), 4);
}

#[test]
fn no_two_files_ever_share_a_slot() {
    let mut fs = MemFs::new(16, 4);
    fs.create_entry("/", "d", EntryKind::Directory).unwrap();
    for name in &["a", "b", "c"] {
        fs.create_entry("/", name, EntryKind::File).unwrap();
    }
    fs.write("/a", b"aaaaaaaa").unwrap();
    fs.write("/b", b"bbbb").unwrap();
    fs.write("/c", b"cccccccccccc").unwrap();
    fs.copy("/a", "/d/a").unwrap();
    fs.move_file("/b", "/d/b").unwrap();
    fs.delete("/c").unwrap();
    fs.write("/a", b"more").unwrap();

    let snap = fs.snapshot();
    let mut seen = Vec::new();
    for blocks in snap.files.values() {
        for &slot in blocks {
            assert!(!seen.contains(&slot), "slot {} owned twice", slot);
            seen.push(slot);
        }
    }

    // Every owned slot is marked used and every used slot is owned.
    let owned: Vec<bool> = (0..fs.nblocks())
        .map(|slot| seen.contains(&slot))
        .collect();
    assert_eq!(owned, fs.block_usage());
}

/// Serializes a snapshot the way an external persistence layer could: one
/// line of usage markers, one `path:slot,slot` line per file, one
/// `path=name,name` line per directory.
fn serialize(snap: &Snapshot) -> String {
    let mut out = String::new();
    for &used in &snap.used {
        out.push(if used { '1' } else { '0' });
    }
    out.push('\n');
    for (path, blocks) in &snap.files {
        let slots: Vec<String> = blocks.iter().map(|slot| slot.to_string()).collect();
        out.push_str(&format!("{}:{}\n", path, slots.join(",")));
    }
    for (path, children) in &snap.dirs {
        out.push_str(&format!("{}={}\n", path, children.join(",")));
    }
    out
}

fn parse(text: &str, nblocks: usize, block_size: usize) -> Snapshot {
    let mut lines = text.lines();
    let used: Vec<bool> = lines
        .next()
        .expect("missing usage line")
        .chars()
        .map(|c| c == '1')
        .collect();

    let mut files = BTreeMap::new();
    let mut dirs = BTreeMap::new();
    for line in lines {
        if let Some(idx) = line.find(':') {
            let blocks: Vec<usize> = line[idx + 1..]
                .split(',')
                .filter(|part| !part.is_empty())
                .map(|part| part.parse().unwrap())
                .collect();
            files.insert(line[..idx].to_string(), blocks);
        } else if let Some(idx) = line.find('=') {
            let children: Vec<String> = line[idx + 1..]
                .split(',')
                .filter(|part| !part.is_empty())
                .map(|part| part.to_string())
                .collect();
            dirs.insert(line[..idx].to_string(), children);
        }
    }

    Snapshot {
        nblocks,
        block_size,
        used,
        files,
        dirs,
    }
}

#[test]
fn snapshot_survives_a_caller_side_text_round_trip() {
    let mut fs = MemFs::new(8, 4);
    fs.create_entry("/", "etc", EntryKind::Directory).unwrap();
    fs.create_entry("/etc", "motd", EntryKind::File).unwrap();
    fs.create_entry("/", "spool", EntryKind::Directory).unwrap();
    fs.write("/etc/motd", b"welcome").unwrap();
    let snap = fs.snapshot();

    let mut file = tempfile::tempfile().unwrap();
    file.write_all(serialize(&snap).as_bytes()).unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();
    let mut text = String::new();
    file.read_to_string(&mut text).unwrap();

    let reloaded = parse(&text, fs.nblocks(), fs.block_size());
    assert_eq!(reloaded, snap);

    let rebuilt = MemFs::restore(&reloaded).unwrap();
    assert_eq!(rebuilt.snapshot(), snap);
    assert_eq!(rebuilt.file_blocks("/etc/motd").unwrap(), &[0, 1]);
    assert_eq!(
        rebuilt.list("/").unwrap(),
        fs.list("/").unwrap()
    );
}

use memfs::{Cursor, EntryKind, MemFs};

pub fn main() {
    let mut fs = MemFs::new(32, 128);
    fs.create_entry("/", "notes", EntryKind::Directory).unwrap();
    fs.create_entry("/notes", "todo", EntryKind::File).unwrap();
    fs.write("/notes/todo", b"learn the block layer").unwrap();

    let mut cursor = Cursor::new();
    cursor.change_dir(&fs, "notes").unwrap();

    let todo = fs.read(&cursor.absolute("todo")).unwrap();
    println!("{} -> {}", cursor.path(), String::from_utf8_lossy(&todo));
    print!("{}", fs.dump());
    println!("{} of {} blocks free", fs.free_blocks(), fs.nblocks());
}

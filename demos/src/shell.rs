//! Interactive shell over the storage engine: the command-dispatch and
//! persistence layers the engine itself leaves to callers.

use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};

use memfs::{Cursor, EntryKind, FsError, MemFs, Snapshot};

const NUM_BLOCKS: usize = 32;
const BLOCK_SIZE: usize = 128;
const IMAGE: &str = "filesystem.txt";

fn main() {
    env_logger::init();

    let mut fs = match load(IMAGE) {
        Ok(fs) => fs,
        Err(err) => {
            eprintln!("starting empty: {}", err);
            MemFs::new(NUM_BLOCKS, BLOCK_SIZE)
        }
    };
    let mut cursor = Cursor::new();

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("{}: ", cursor.path());
        io::stdout().flush().expect("flush stdout");

        let line = match lines.next() {
            Some(Ok(line)) => line,
            _ => break,
        };
        let args: Vec<&str> = line.split_whitespace().collect();
        let (command, args) = match args.split_first() {
            Some(split) => split,
            None => continue,
        };

        let result = dispatch(&mut fs, &mut cursor, command, args);
        match result {
            Ok(true) => {}
            Ok(false) => break,
            Err(err) => eprintln!("{}", err),
        }
    }
}

fn dispatch(
    fs: &mut MemFs,
    cursor: &mut Cursor,
    command: &str,
    args: &[&str],
) -> Result<bool, FsError> {
    match command {
        "ls" => {
            let target = cursor.absolute(args.first().copied().unwrap_or("."));
            for entry in fs.list(&target)? {
                match entry.kind {
                    EntryKind::Directory => println!("{}/", entry.name),
                    EntryKind::File => println!("{}", entry.name),
                }
            }
        }
        "tree" => print!("{}", fs.dump()),
        "mkdir" | "touch" => {
            let name = require(args, 0, "mkdir|touch <name>")?;
            let (parent, leaf) = split_abs(&cursor.absolute(name));
            let kind = if command == "mkdir" {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            fs.create_entry(&parent, &leaf, kind)?;
        }
        "cd" => cursor.change_dir(fs, require(args, 0, "cd <path>")?)?,
        "pwd" => println!("{}", cursor.path()),
        "cat" => {
            let data = fs.read(&cursor.absolute(require(args, 0, "cat <file>")?))?;
            // Reads come back whole-block padded; drop the zero tail for display.
            let end = data.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
            println!("{}", String::from_utf8_lossy(&data[..end]));
        }
        "echo" => {
            let file = require(args, 0, "echo <file> <content>")?;
            if args.len() < 2 {
                return Err(FsError::InvalidArgument(
                    "usage: echo <file> <content>".to_string(),
                ));
            }
            let content = args[1..].join(" ");
            fs.write(&cursor.absolute(file), content.as_bytes())?;
        }
        "rm" => fs.delete(&cursor.absolute(require(args, 0, "rm <path>")?))?,
        "cp" => {
            let src = require(args, 0, "cp <src> <dest>")?;
            let dest = require(args, 1, "cp <src> <dest>")?;
            fs.copy(&cursor.absolute(src), &cursor.absolute(dest))?;
        }
        "mv" => {
            let src = require(args, 0, "mv <src> <dest>")?;
            let dest = require(args, 1, "mv <src> <dest>")?;
            fs.move_file(&cursor.absolute(src), &cursor.absolute(dest))?;
        }
        "df" => println!("{} of {} blocks free", fs.free_blocks(), fs.nblocks()),
        "save" => {
            let path = args.first().copied().unwrap_or(IMAGE);
            save(fs, path).map_err(|err| FsError::InvalidArgument(err.to_string()))?;
        }
        "load" => {
            let path = args.first().copied().unwrap_or(IMAGE);
            *fs = load(path).map_err(|err| FsError::InvalidArgument(err.to_string()))?;
            *cursor = Cursor::new();
        }
        "exit" => {
            if let Err(err) = save(fs, IMAGE) {
                eprintln!("could not save image: {}", err);
            } else {
                println!("File system saved. Exiting...");
            }
            return Ok(false);
        }
        other => println!("Unknown command: {}", other),
    }
    Ok(true)
}

fn require<'a>(args: &[&'a str], index: usize, usage: &str) -> Result<&'a str, FsError> {
    args.get(index)
        .copied()
        .ok_or_else(|| FsError::InvalidArgument(format!("usage: {}", usage)))
}

/// Splits a normalized absolute path into parent path and leaf name.
fn split_abs(abs: &str) -> (String, String) {
    match abs.rfind('/') {
        Some(0) => ("/".to_string(), abs[1..].to_string()),
        Some(idx) => (abs[..idx].to_string(), abs[idx + 1..].to_string()),
        None => ("/".to_string(), abs.to_string()),
    }
}

/// The image format mirrors what the engine exposes for persistence: one
/// line of block-usage markers, one `path:slot,slot` line per file, one
/// `path=name,name` line per directory.
fn save(fs: &MemFs, path: &str) -> io::Result<()> {
    let snap = fs.snapshot();
    let mut out = String::new();
    for &used in &snap.used {
        out.push(if used { '1' } else { '0' });
    }
    out.push('\n');
    for (file, blocks) in &snap.files {
        let slots: Vec<String> = blocks.iter().map(|slot| slot.to_string()).collect();
        out.push_str(&format!("{}:{}\n", file, slots.join(",")));
    }
    for (dir, children) in &snap.dirs {
        out.push_str(&format!("{}={}\n", dir, children.join(",")));
    }
    std::fs::write(path, out)
}

fn load(path: &str) -> Result<MemFs, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)?;
    let mut lines = text.lines();
    let used: Vec<bool> = lines
        .next()
        .ok_or("image is missing its usage line")?
        .chars()
        .map(|c| c == '1')
        .collect();

    let mut files = BTreeMap::new();
    let mut dirs = BTreeMap::new();
    for line in lines {
        if let Some(idx) = line.find(':') {
            let mut blocks = Vec::new();
            for part in line[idx + 1..].split(',').filter(|part| !part.is_empty()) {
                blocks.push(part.parse::<usize>()?);
            }
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

    let snap = Snapshot {
        nblocks: NUM_BLOCKS,
        block_size: BLOCK_SIZE,
        used,
        files,
        dirs,
    };
    Ok(MemFs::restore(&snap)?)
}

use std::collections::BTreeMap;

use crate::fs::{FsError, MemFs};
use crate::node::{DirNode, EntryKind, Node};

/// A plain-data view of engine state for external persistence layers: the
/// block-usage bitmap, every file's block-index list and every directory's
/// child names, keyed by absolute path. The engine performs no I/O itself;
/// the on-disk encoding of this view belongs to the caller.
///
/// Block contents are not part of the view. Restoring reproduces the
/// namespace and the allocation state; byte payloads are the persistence
/// layer's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub nblocks: usize,
    pub block_size: usize,
    pub used: Vec<bool>,
    pub files: BTreeMap<String, Vec<usize>>,
    pub dirs: BTreeMap<String, Vec<String>>,
}

impl MemFs {
    /// Captures the full engine state as a [`Snapshot`].
    pub fn snapshot(&self) -> Snapshot {
        let mut snap = Snapshot {
            nblocks: self.nblocks(),
            block_size: self.block_size(),
            used: self.block_usage(),
            files: BTreeMap::new(),
            dirs: BTreeMap::new(),
        };
        collect(self.tree.root(), "/", &mut snap);
        snap
    }

    /// Rebuilds an engine equivalent to the one a [`Snapshot`] was taken
    /// from. A slot that is out of range or claimed by two files fails with
    /// `InvalidSlot`.
    pub fn restore(snap: &Snapshot) -> Result<Self, FsError> {
        let mut fs = MemFs::new(snap.nblocks, snap.block_size);

        // Sorted keys visit parents before their children.
        for path in snap.dirs.keys() {
            if path == "/" {
                continue;
            }
            let (parent, name) = rsplit(path);
            fs.tree.create_entry(parent, name, EntryKind::Directory)?;
        }

        for (path, blocks) in &snap.files {
            let (parent, name) = rsplit(path);
            fs.tree.create_entry(parent, name, EntryKind::File)?;
            for &slot in blocks {
                fs.store.mark_used(slot)?;
            }
            let file = fs.tree.resolve_file_mut(path)?;
            file.blocks = blocks.clone();
            file.declared_size = blocks.len() * snap.block_size;
        }

        // Slots recorded as used without an owning file (e.g. leaked by a
        // crashed caller) stay reserved rather than silently reclaimed.
        for (slot, &used) in snap.used.iter().enumerate() {
            if used && !fs.store.is_used(slot) {
                fs.store.mark_used(slot)?;
            }
        }

        Ok(fs)
    }
}

fn collect(dir: &DirNode, path: &str, snap: &mut Snapshot) {
    snap.dirs
        .insert(path.to_string(), dir.children.keys().cloned().collect());
    for (name, node) in &dir.children {
        let child = if path == "/" {
            format!("/{}", name)
        } else {
            format!("{}/{}", path, name)
        };
        match node {
            Node::Directory(d) => collect(d, &child, snap),
            Node::File(f) => {
                snap.files.insert(child, f.blocks.clone());
            }
        }
    }
}

/// Splits a normalized absolute path into parent path and leaf name.
fn rsplit(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(0) => ("/", &path[1..]),
        Some(idx) => (&path[..idx], &path[idx + 1..]),
        None => ("/", path),
    }
}

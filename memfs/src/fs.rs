use log::{debug, info};
use thiserror::Error;

use crate::namespace::Namespace;
use crate::node::{DirEntry, EntryKind};
use crate::store::{BlockError, BlockStore};

#[derive(Error, Debug)]
pub enum FsError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("no entry at {0}")]
    NotFound(String),
    #[error("{0} is not a directory")]
    NotADirectory(String),
    #[error("{0} is not a file")]
    NotAFile(String),
    #[error("{0} already exists")]
    NameConflict(String),
    #[error("directory {0} is not empty")]
    DirectoryNotEmpty(String),
    #[error("block store: {0}")]
    Block(#[from] BlockError),
}

/// An in-memory, block-addressed hierarchical storage engine: a fixed pool
/// of fixed-size blocks exposed through a tree of files and directories,
/// addressed by slash-delimited paths.
///
/// The engine is single-threaded and synchronous; every operation runs to
/// completion before returning, and internal invariants (slot uniqueness,
/// tree consistency) are not safe under interleaved mutation. Embedders that
/// need sharing must wrap the whole engine in one exclusive lock.
pub struct MemFs {
    pub(crate) store: BlockStore,
    pub(crate) tree: Namespace,
}

impl MemFs {
    /// Creates an empty engine over a pool of `nblocks` blocks of
    /// `block_size` bytes. Geometry is never hard-coded; both values come
    /// from the caller.
    pub fn new(nblocks: usize, block_size: usize) -> Self {
        Self {
            store: BlockStore::new(nblocks, block_size),
            tree: Namespace::new(),
        }
    }

    pub fn nblocks(&self) -> usize {
        self.store.nblocks()
    }

    pub fn block_size(&self) -> usize {
        self.store.block_size()
    }

    /// Free slots remaining in the pool.
    pub fn free_blocks(&self) -> usize {
        self.store.free_count()
    }

    /// The block-usage bitmap, one marker per slot. Exposed so an external
    /// persistence layer can serialize allocation state.
    pub fn block_usage(&self) -> Vec<bool> {
        self.store.usage()
    }

    /// The ordered slot list owned by the file at `path`.
    pub fn file_blocks(&self, path: &str) -> Result<&[usize], FsError> {
        Ok(&self.tree.resolve_file(path)?.blocks)
    }

    /// The declared size of the file at `path`: its block count times the
    /// block size, a whole-block multiple rather than a live byte count.
    pub fn declared_size(&self, path: &str) -> Result<usize, FsError> {
        Ok(self.tree.resolve_file(path)?.declared_size)
    }

    /// Resolves a path to its structural state: file, directory, or a
    /// `NotFound` failure.
    pub fn kind_of(&self, path: &str) -> Result<EntryKind, FsError> {
        self.tree.kind_of(path)
    }

    /// Creates a new empty file or directory named `name` under the
    /// directory at `parent`.
    pub fn create_entry(
        &mut self,
        parent: &str,
        name: &str,
        kind: EntryKind,
    ) -> Result<(), FsError> {
        self.tree.create_entry(parent, name, kind)?;
        info!("created {:?} {} under {}", kind, name, parent);
        Ok(())
    }

    /// Appends `data` to the file at `path`, rounding up to whole blocks.
    ///
    /// Every call allocates fresh blocks; unused capacity in the file's
    /// previously last block is never topped up, so each call can waste up
    /// to `block_size - 1` bytes of the final block. The tail of the last
    /// block beyond the data keeps the store's zero fill. Writing never
    /// implicitly creates the file.
    ///
    /// If the pool runs out mid-write, the blocks appended so far stay
    /// owned by the file — there is no rollback; the caller decides what to
    /// do with the partial write.
    pub fn write(&mut self, path: &str, data: &[u8]) -> Result<(), FsError> {
        let block_size = self.store.block_size();
        let file = self.tree.resolve_file_mut(path)?;
        for chunk in data.chunks(block_size) {
            let slot = self.store.allocate()?;
            self.store.write(slot, chunk)?;
            file.blocks.push(slot);
            file.declared_size = file.blocks.len() * block_size;
        }
        debug!("wrote {} bytes to {}", data.len(), path);
        Ok(())
    }

    /// Reads the file at `path` as the concatenation of its blocks, in list
    /// order. The result is always `blocks.len() * block_size` bytes; the
    /// zero padding after the last written byte is part of the contract, and
    /// callers that need the exact logical length must track it themselves.
    pub fn read(&self, path: &str) -> Result<Vec<u8>, FsError> {
        let file = self.tree.resolve_file(path)?;
        let mut data = Vec::with_capacity(file.blocks.len() * self.store.block_size());
        for &slot in &file.blocks {
            data.extend_from_slice(self.store.read(slot)?);
        }
        Ok(data)
    }

    /// Copies the file at `src` to a new file at `dest`, physically
    /// duplicating every block into freshly allocated slots. The two files
    /// never share a slot, so mutating one afterwards cannot affect the
    /// other.
    ///
    /// If the pool runs out mid-copy, the destination keeps the blocks
    /// duplicated so far, mirroring the write contract.
    pub fn copy(&mut self, src: &str, dest: &str) -> Result<(), FsError> {
        let src_blocks = self.tree.resolve_file(src)?.blocks.clone();

        let (dest_parent, dest_name) = split_parent(dest)?;
        self.tree
            .create_entry(&dest_parent, dest_name, EntryKind::File)?;

        let mut copied = Vec::with_capacity(src_blocks.len());
        let mut failure = None;
        for &slot in &src_blocks {
            let new_slot = match self.store.allocate() {
                Ok(new_slot) => new_slot,
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            };
            let buf = self.store.read(slot)?.to_vec();
            self.store.write(new_slot, &buf)?;
            copied.push(new_slot);
        }

        let block_size = self.store.block_size();
        let file = self.tree.resolve_file_mut(dest)?;
        file.declared_size = copied.len() * block_size;
        file.blocks = copied;

        match failure {
            None => {
                info!("copied {} to {}", src, dest);
                Ok(())
            }
            Some(err) => Err(err.into()),
        }
    }

    /// Moves the file at `src` to `dest`, composed as a full copy followed
    /// by a delete of the source. This is never atomic: a failure between
    /// the two steps can leave both copies present, but never zero copies,
    /// since the source is only deleted after the copy fully succeeds.
    pub fn move_file(&mut self, src: &str, dest: &str) -> Result<(), FsError> {
        self.copy(src, dest)?;
        self.delete(src)?;
        info!("moved {} to {}", src, dest);
        Ok(())
    }

    /// Deletes the entry at `path`. A file's slots are all released back to
    /// the pool before the node is detached; a directory must be empty.
    /// Recursive deletion is composed by the caller.
    pub fn delete(&mut self, path: &str) -> Result<(), FsError> {
        if self.tree.kind_of(path)? == EntryKind::File {
            let blocks = self.tree.resolve_file(path)?.blocks.clone();
            for slot in blocks {
                self.store.free(slot)?;
            }
        }
        self.tree.remove_entry(path)?;
        info!("deleted {}", path);
        Ok(())
    }

    /// Lists the immediate children of the directory at `path`, each with
    /// its kind. Names come out in sorted order.
    pub fn list(&self, path: &str) -> Result<Vec<DirEntry>, FsError> {
        let dir = self.tree.resolve_dir(path)?;
        Ok(dir
            .children
            .iter()
            .map(|(name, node)| DirEntry {
                name: name.clone(),
                kind: node.kind(),
            })
            .collect())
    }

    /// Renders the whole tree depth-first for inspection, each directory
    /// before its children.
    pub fn dump(&self) -> String {
        self.tree.dump()
    }
}

/// Splits a path into its parent path and leaf name. The root has no leaf.
fn split_parent(path: &str) -> Result<(String, &str), FsError> {
    let segs = crate::namespace::segments(path);
    match segs.split_last() {
        Some((leaf, parents)) => {
            let name = *leaf;
            if parents.is_empty() {
                Ok(("/".to_string(), name))
            } else {
                Ok((format!("/{}", parents.join("/")), name))
            }
        }
        None => Err(FsError::InvalidArgument(format!(
            "path {:?} has no leaf name",
            path
        ))),
    }
}

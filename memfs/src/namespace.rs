use crate::fs::FsError;
use crate::node::{DirNode, EntryKind, FileNode, Node};

/// Splits a slash-delimited path into its meaningful segments. Empty
/// segments (leading, trailing, doubled slashes) and `.` are skipped. `..`
/// is not a path-addressing concept; it is looked up like any other name
/// and, since such entries can never be created, resolves to `NotFound`.
pub(crate) fn segments(path: &str) -> Vec<&str> {
    path.split('/')
        .filter(|seg| !seg.is_empty() && *seg != ".")
        .collect()
}

fn path_of(segs: &[&str]) -> String {
    if segs.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segs.join("/"))
    }
}

fn child_path(parents: &[&str], name: &str) -> String {
    if parents.is_empty() {
        format!("/{}", name)
    } else {
        format!("/{}/{}", parents.join("/"), name)
    }
}

fn walk<'a>(root: &'a DirNode, parents: &[&str]) -> Result<&'a DirNode, FsError> {
    let mut dir = root;
    for (i, seg) in parents.iter().enumerate() {
        dir = match dir.children.get(*seg) {
            Some(Node::Directory(d)) => d,
            Some(Node::File(_)) => {
                return Err(FsError::NotADirectory(path_of(&parents[..=i])));
            }
            None => return Err(FsError::NotFound(path_of(&parents[..=i]))),
        };
    }
    Ok(dir)
}

fn walk_mut<'a>(root: &'a mut DirNode, parents: &[&str]) -> Result<&'a mut DirNode, FsError> {
    let mut dir = root;
    for (i, seg) in parents.iter().enumerate() {
        dir = match dir.children.get_mut(*seg) {
            Some(Node::Directory(d)) => d,
            Some(Node::File(_)) => {
                return Err(FsError::NotADirectory(path_of(&parents[..=i])));
            }
            None => return Err(FsError::NotFound(path_of(&parents[..=i]))),
        };
    }
    Ok(dir)
}

/// The directory tree. Owns every node; never touches block contents. The
/// root directory always exists and cannot be removed.
pub(crate) struct Namespace {
    root: DirNode,
}

impl Namespace {
    pub fn new() -> Self {
        Self {
            root: DirNode::new(),
        }
    }

    pub fn root(&self) -> &DirNode {
        &self.root
    }

    pub fn resolve_dir(&self, path: &str) -> Result<&DirNode, FsError> {
        walk(&self.root, &segments(path))
    }

    pub fn resolve_file(&self, path: &str) -> Result<&FileNode, FsError> {
        let segs = segments(path);
        let (leaf, parents) = match segs.split_last() {
            Some(split) => split,
            None => return Err(FsError::NotAFile("/".to_string())),
        };
        let dir = walk(&self.root, parents)?;
        match dir.children.get(*leaf) {
            Some(Node::File(f)) => Ok(f),
            Some(Node::Directory(_)) => Err(FsError::NotAFile(path_of(&segs))),
            None => Err(FsError::NotFound(path_of(&segs))),
        }
    }

    pub fn resolve_file_mut(&mut self, path: &str) -> Result<&mut FileNode, FsError> {
        let segs = segments(path);
        let (leaf, parents) = match segs.split_last() {
            Some(split) => split,
            None => return Err(FsError::NotAFile("/".to_string())),
        };
        let dir = walk_mut(&mut self.root, parents)?;
        match dir.children.get_mut(*leaf) {
            Some(Node::File(f)) => Ok(f),
            Some(Node::Directory(_)) => Err(FsError::NotAFile(path_of(&segs))),
            None => Err(FsError::NotFound(path_of(&segs))),
        }
    }

    /// Resolves a path to its structural state: exists as a file, exists as
    /// a directory, or does not exist (`NotFound`). The empty path is the
    /// root directory.
    pub fn kind_of(&self, path: &str) -> Result<EntryKind, FsError> {
        let segs = segments(path);
        match segs.split_last() {
            None => Ok(EntryKind::Directory),
            Some((leaf, parents)) => {
                let dir = walk(&self.root, parents)?;
                dir.children
                    .get(*leaf)
                    .map(Node::kind)
                    .ok_or_else(|| FsError::NotFound(path_of(&segs)))
            }
        }
    }

    /// Inserts a new empty entry under the resolved parent directory. Any
    /// existing name at the target is a conflict; there is no implicit
    /// replace of either kind.
    pub fn create_entry(
        &mut self,
        parent: &str,
        name: &str,
        kind: EntryKind,
    ) -> Result<(), FsError> {
        if name.is_empty() || name == "." || name == ".." || name.contains('/') {
            return Err(FsError::InvalidArgument(format!(
                "invalid entry name {:?}",
                name
            )));
        }
        let parents = segments(parent);
        let dir = walk_mut(&mut self.root, &parents)?;
        if dir.children.contains_key(name) {
            return Err(FsError::NameConflict(child_path(&parents, name)));
        }
        let node = match kind {
            EntryKind::File => Node::File(FileNode::new()),
            EntryKind::Directory => Node::Directory(DirNode::new()),
        };
        dir.children.insert(name.to_string(), node);
        Ok(())
    }

    /// Detaches the leaf node from its parent. Directories must be empty;
    /// recursive removal is composed by the caller. For file leaves the
    /// caller must have released every owned block slot back to the store
    /// before calling this.
    pub fn remove_entry(&mut self, path: &str) -> Result<(), FsError> {
        let segs = segments(path);
        let (leaf, parents) = match segs.split_last() {
            Some(split) => split,
            None => {
                return Err(FsError::InvalidArgument(
                    "the root directory cannot be removed".to_string(),
                ));
            }
        };
        let dir = walk_mut(&mut self.root, parents)?;
        match dir.children.get(*leaf) {
            None => Err(FsError::NotFound(path_of(&segs))),
            Some(Node::Directory(d)) if !d.children.is_empty() => {
                Err(FsError::DirectoryNotEmpty(path_of(&segs)))
            }
            Some(_) => {
                dir.children.remove(*leaf);
                Ok(())
            }
        }
    }

    /// Renders the whole tree depth-first, each directory line printed
    /// before its children are drilled into.
    pub fn dump(&self) -> String {
        let mut out = String::from("/\n");
        dump_dir(&self.root, 1, &mut out);
        out
    }
}

fn dump_dir(dir: &DirNode, depth: usize, out: &mut String) {
    for (name, node) in &dir.children {
        for _ in 0..depth {
            out.push_str("  ");
        }
        match node {
            Node::Directory(d) => {
                out.push_str(name);
                out.push_str("/\n");
                dump_dir(d, depth + 1, out);
            }
            Node::File(f) => {
                out.push_str(&format!(
                    "{} [{} blocks, {} bytes]\n",
                    name,
                    f.blocks.len(),
                    f.declared_size
                ));
            }
        }
    }
}

use crate::fs::{FsError, MemFs};
use crate::node::EntryKind;

/// A stateful current-directory companion to [`MemFs`], for callers that
/// want shell-style relative addressing on top of the engine's pure
/// path-addressed API.
///
/// The cursor holds an absolute path and re-resolves it against the engine
/// on every use; it never keeps a pointer into the tree, so engine
/// mutations cannot leave it dangling (though they can leave it naming a
/// path that no longer resolves).
#[derive(Debug, Clone)]
pub struct Cursor {
    path: String,
}

impl Cursor {
    /// Starts at the root directory.
    pub fn new() -> Self {
        Self {
            path: "/".to_string(),
        }
    }

    /// The current absolute directory path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Joins `target` against the current directory and normalizes it:
    /// empty segments and `.` are dropped, `..` steps to the parent and
    /// clamps at the root. Absolute targets ignore the current directory.
    pub fn absolute(&self, target: &str) -> String {
        let mut stack: Vec<&str> = if target.starts_with('/') {
            Vec::new()
        } else {
            self.path.split('/').filter(|seg| !seg.is_empty()).collect()
        };
        for seg in target.split('/') {
            match seg {
                "" | "." => {}
                ".." => {
                    stack.pop();
                }
                name => stack.push(name),
            }
        }
        if stack.is_empty() {
            "/".to_string()
        } else {
            format!("/{}", stack.join("/"))
        }
    }

    /// Moves the cursor to `target`, which must resolve to a directory.
    /// On failure the cursor stays where it was.
    pub fn change_dir(&mut self, fs: &MemFs, target: &str) -> Result<(), FsError> {
        let abs = self.absolute(target);
        match fs.kind_of(&abs)? {
            EntryKind::Directory => {
                self.path = abs;
                Ok(())
            }
            EntryKind::File => Err(FsError::NotADirectory(abs)),
        }
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::new()
    }
}

mod alloc;
mod cursor;
mod fs;
mod namespace;
mod node;
mod snapshot;
mod store;

pub use crate::cursor::Cursor;
pub use crate::fs::{FsError, MemFs};
pub use crate::node::{DirEntry, EntryKind};
pub use crate::snapshot::Snapshot;
pub use crate::store::BlockError;

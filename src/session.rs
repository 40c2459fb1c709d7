use crate::errors::Error;
use crate::storage::Tree;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

/// One interactive session over an open store.
pub struct Session {
    pub id: Uuid,
    pub tree: Tree,
}

impl Session {
    pub fn open(index_path: &Path, data_path: &Path) -> Result<Self, Error> {
        let id = Uuid::new_v4();
        let tree = Tree::open(index_path, data_path)?;
        info!(session_id = %id, "Opened session");
        Ok(Session { id, tree })
    }

    pub fn close(self) -> Result<(), Error> {
        info!(session_id = %self.id, "Closing session");
        self.tree.close()
    }
}

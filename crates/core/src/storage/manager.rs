use tracing::debug;

use crate::errors::CoreError;
use crate::models::workspace::Workspace;

use super::encryption::{self, KdfParams};
use super::format;

/// Save/load a workspace as password-protected snapshot bytes or files.
pub struct StorageManager;

impl StorageManager {
    /// Workspace → bincode → AES-256-GCM(Argon2id(password)) → RJNL bytes
    pub fn save_to_bytes(workspace: &Workspace, password: &str) -> Result<Vec<u8>, CoreError> {
        Self::save_with_params(workspace, password, KdfParams::default())
    }

    /// Same as `save_to_bytes` with explicit KDF costs (tests use cheap ones).
    pub fn save_with_params(
        workspace: &Workspace,
        password: &str,
        kdf: KdfParams,
    ) -> Result<Vec<u8>, CoreError> {
        let plaintext = bincode::serialize(workspace)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize workspace: {e}")))?;
        let sealed = encryption::seal(&plaintext, password, kdf)?;
        let bytes = format::encode(&sealed);
        debug!(trades = workspace.journal.len(), bytes = bytes.len(), "workspace snapshot written");
        Ok(bytes)
    }

    /// RJNL bytes → header → decrypt → bincode → Workspace
    pub fn load_from_bytes(data: &[u8], password: &str) -> Result<Workspace, CoreError> {
        let sealed = format::decode(data)?;
        let plaintext = encryption::open(&sealed, password)?;
        bincode::deserialize(&plaintext)
            .map_err(|e| CoreError::Deserialization(format!("Failed to deserialize workspace: {e}")))
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_file(workspace: &Workspace, path: &str, password: &str) -> Result<(), CoreError> {
        let bytes = Self::save_to_bytes(workspace, password)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_file(path: &str, password: &str) -> Result<Workspace, CoreError> {
        let bytes = std::fs::read(path)?;
        Self::load_from_bytes(&bytes, password)
    }
}

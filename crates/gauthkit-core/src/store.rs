//! Persisted token store.
//!
//! Credentials live in a single JSON file keyed by a user identifier, so
//! one store can serve several accounts. The file is read once at open,
//! rewritten in full on every change (temp file + rename), and given
//! owner-only permissions on Unix. Concurrent writers are not coordinated:
//! last writer wins.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::{debug, info};

use crate::credential::Credential;
use crate::error::{AuthError, AuthResult};

/// User key used by single-user tools.
pub const DEFAULT_USER: &str = "default";

/// File-backed credential store keyed by user id.
#[derive(Debug)]
pub struct TokenStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, Credential>>,
}

impl TokenStore {
    /// Opens the store at the given path.
    ///
    /// An absent file is an empty store; the file is created on the first
    /// write. An existing file that does not parse is a configuration
    /// error, left for the operator to repair or remove.
    pub fn open(path: impl Into<PathBuf>) -> AuthResult<Self> {
        let path = path.into();

        let entries = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| {
                AuthError::configuration(format!(
                    "failed to read token store {}",
                    path.display()
                ))
                .with_source(e)
            })?;
            let entries: BTreeMap<String, Credential> =
                serde_json::from_str(&content).map_err(|e| {
                    AuthError::configuration(format!(
                        "failed to parse token store {}",
                        path.display()
                    ))
                    .with_source(e)
                })?;
            debug!("loaded {} credential(s) from {:?}", entries.len(), path);
            entries
        } else {
            debug!("no token store at {:?}", path);
            BTreeMap::new()
        };

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Returns a clone of the credential stored for `user`, if any.
    pub fn get(&self, user: &str) -> Option<Credential> {
        self.entries.read().unwrap().get(user).cloned()
    }

    /// Stores a credential for `user` and persists the store.
    pub fn put(&self, user: &str, credential: Credential) -> AuthResult<()> {
        self.entries
            .write()
            .unwrap()
            .insert(user.to_string(), credential);
        self.save()
    }

    /// Removes the credential for `user`, persisting the store.
    ///
    /// Returns true if a credential was present.
    pub fn remove(&self, user: &str) -> AuthResult<bool> {
        let removed = self.entries.write().unwrap().remove(user).is_some();
        if removed {
            self.save()?;
            info!("removed credential for {:?} from {:?}", user, self.path);
        }
        Ok(removed)
    }

    /// Returns the number of stored credentials.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// Returns true if no credentials are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.read().unwrap().is_empty()
    }

    /// Returns the store path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the store to disk: temp file, then rename.
    fn save(&self) -> AuthResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                AuthError::configuration(format!(
                    "failed to create token store directory {}",
                    parent.display()
                ))
                .with_source(e)
            })?;
        }

        let content = {
            let entries = self.entries.read().unwrap();
            serde_json::to_string_pretty(&*entries)
                .map_err(|e| AuthError::internal("failed to serialize token store").with_source(e))?
        };

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, &content).map_err(|e| {
            AuthError::configuration(format!(
                "failed to write token store {}",
                temp_path.display()
            ))
            .with_source(e)
        })?;

        fs::rename(&temp_path, &self.path).map_err(|e| {
            AuthError::configuration(format!(
                "failed to rename token store into {}",
                self.path.display()
            ))
            .with_source(e)
        })?;

        // Tokens grant account access: keep them owner-only.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            let _ = fs::set_permissions(&self.path, perms);
        }

        debug!("saved token store to {:?}", self.path);
        Ok(())
    }
}

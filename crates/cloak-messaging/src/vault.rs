//! Client-side private key storage.
//!
//! A vault holds at most one private key per identity and never transmits it.
//! Keys are stored as PEM text exactly as generated.

#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::HashMap,
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use cloak_crypto::{PRIVATE_KEY_LABEL, decode_pem_block};
use zeroize::Zeroizing;

use crate::{error::VaultError, identity::UserId};

/// Durable client-side storage for private keys.
///
/// # Invariants
///
/// - Storing overwrites any previous key for the identity
/// - Loaded text is byte-for-byte what was stored
/// - Implementations never send key material off the device
pub trait KeyVault: Send + Sync {
    /// Persist the private key PEM for an identity.
    fn store_private_key(&self, user: &UserId, pem: &str) -> Result<(), VaultError>;

    /// Private key PEM for an identity. `None` if nothing is stored.
    fn load_private_key(&self, user: &UserId) -> Result<Option<Zeroizing<String>>, VaultError>;

    /// Remove the stored key. Succeeds if nothing was stored.
    fn clear_private_key(&self, user: &UserId) -> Result<(), VaultError>;
}

/// Process-local vault. Contents are lost on exit.
///
/// Clone shares the same underlying storage.
#[derive(Clone, Default)]
pub struct MemoryKeyVault {
    keys: Arc<Mutex<HashMap<UserId, Zeroizing<String>>>>,
}

impl MemoryKeyVault {
    /// Create an empty vault.
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for MemoryKeyVault {
    #[allow(clippy::expect_used)]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.keys.lock().expect("Mutex poisoned").len();
        f.debug_struct("MemoryKeyVault").field("keys", &count).finish()
    }
}

impl KeyVault for MemoryKeyVault {
    #[allow(clippy::expect_used)]
    fn store_private_key(&self, user: &UserId, pem: &str) -> Result<(), VaultError> {
        self.keys
            .lock()
            .expect("Mutex poisoned")
            .insert(user.clone(), Zeroizing::new(pem.to_string()));
        Ok(())
    }

    #[allow(clippy::expect_used)]
    fn load_private_key(&self, user: &UserId) -> Result<Option<Zeroizing<String>>, VaultError> {
        Ok(self.keys.lock().expect("Mutex poisoned").get(user).cloned())
    }

    #[allow(clippy::expect_used)]
    fn clear_private_key(&self, user: &UserId) -> Result<(), VaultError> {
        self.keys.lock().expect("Mutex poisoned").remove(user);
        Ok(())
    }
}

/// Directory-backed vault: one PEM file per identity.
///
/// File names are the hex-encoded identity plus `.pem`, so arbitrary
/// identifiers cannot escape the directory. On Unix the files are readable
/// by the owner only.
#[derive(Debug, Clone)]
pub struct FileKeyVault {
    dir: PathBuf,
}

impl FileKeyVault {
    /// Open a vault rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, VaultError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Directory holding the key files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the key file for an identity.
    pub fn key_path(&self, user: &UserId) -> PathBuf {
        self.dir.join(format!("{}.pem", hex::encode(user.as_str())))
    }
}

impl KeyVault for FileKeyVault {
    /// Writes a temporary file created owner-only, syncs it, then renames it
    /// over the key file. A failed store leaves the previous key intact.
    fn store_private_key(&self, user: &UserId, pem: &str) -> Result<(), VaultError> {
        let path = self.key_path(user);
        let temp_path = path.with_extension("pem.tmp");

        // Left behind by an interrupted store
        match fs::remove_file(&temp_path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e.into()),
            _ => {},
        }

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let written = options.open(&temp_path).and_then(|mut file| {
            file.write_all(pem.as_bytes())?;
            file.sync_all()
        });
        if let Err(e) = written.and_then(|()| fs::rename(&temp_path, &path)) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        Ok(())
    }

    fn load_private_key(&self, user: &UserId) -> Result<Option<Zeroizing<String>>, VaultError> {
        let text = match fs::read_to_string(self.key_path(user)) {
            Ok(text) => Zeroizing::new(text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                return Err(corrupt(user, "not valid UTF-8"));
            },
            Err(e) => return Err(e.into()),
        };

        match decode_pem_block(&text) {
            Ok(block) if block.label == PRIVATE_KEY_LABEL => Ok(Some(text)),
            Ok(block) => Err(corrupt(user, &format!("unexpected PEM label {}", block.label))),
            Err(e) => Err(corrupt(user, &e.to_string())),
        }
    }

    fn clear_private_key(&self, user: &UserId) -> Result<(), VaultError> {
        match fs::remove_file(self.key_path(user)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

fn corrupt(user: &UserId, reason: &str) -> VaultError {
    VaultError::Corrupt { user: user.clone(), reason: reason.to_string() }
}

#[cfg(test)]
mod tests {
    use cloak_crypto::encode_pem;

    use super::*;

    fn sample_pem() -> String {
        encode_pem(b"not really a key but well framed", PRIVATE_KEY_LABEL)
    }

    #[test]
    fn memory_vault_store_load_clear() {
        let vault = MemoryKeyVault::new();
        let alice = UserId::new("alice");

        assert!(vault.load_private_key(&alice).unwrap().is_none());

        vault.store_private_key(&alice, "pem").unwrap();
        assert_eq!(vault.load_private_key(&alice).unwrap().as_deref().map(String::as_str), Some("pem"));

        vault.clear_private_key(&alice).unwrap();
        assert!(vault.load_private_key(&alice).unwrap().is_none());

        // Clearing twice is fine
        vault.clear_private_key(&alice).unwrap();
    }

    #[test]
    fn memory_vault_clones_share_storage() {
        let vault = MemoryKeyVault::new();
        let clone = vault.clone();
        let alice = UserId::new("alice");

        vault.store_private_key(&alice, "pem").unwrap();
        assert!(clone.load_private_key(&alice).unwrap().is_some());
    }

    #[test]
    fn memory_vault_debug_hides_keys() {
        let vault = MemoryKeyVault::new();
        vault.store_private_key(&UserId::new("alice"), "SECRET").unwrap();

        let debug = format!("{vault:?}");
        assert!(!debug.contains("SECRET"));
    }

    #[test]
    fn file_vault_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let vault = FileKeyVault::open(dir.path().join("keys")).unwrap();
        let alice = UserId::new("alice");
        let pem = sample_pem();

        assert!(vault.load_private_key(&alice).unwrap().is_none());

        vault.store_private_key(&alice, &pem).unwrap();
        let loaded = vault.load_private_key(&alice).unwrap().unwrap();
        assert_eq!(loaded.as_str(), pem);

        vault.clear_private_key(&alice).unwrap();
        assert!(vault.load_private_key(&alice).unwrap().is_none());
        vault.clear_private_key(&alice).unwrap();
    }

    #[test]
    fn file_vault_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let vault = FileKeyVault::open(dir.path()).unwrap();
        let alice = UserId::new("alice");

        vault.store_private_key(&alice, &sample_pem()).unwrap();
        let replacement = encode_pem(b"second key", PRIVATE_KEY_LABEL);
        vault.store_private_key(&alice, &replacement).unwrap();

        assert_eq!(vault.load_private_key(&alice).unwrap().unwrap().as_str(), replacement);
    }

    #[test]
    fn file_names_stay_inside_directory() {
        let dir = tempfile::tempdir().unwrap();
        let vault = FileKeyVault::open(dir.path()).unwrap();

        let path = vault.key_path(&UserId::new("../../etc/passwd"));
        assert_eq!(path.parent(), Some(dir.path()));
        assert!(path.file_name().unwrap().to_str().unwrap().ends_with(".pem"));
    }

    #[test]
    fn file_vault_rejects_non_private_key_content() {
        let dir = tempfile::tempdir().unwrap();
        let vault = FileKeyVault::open(dir.path()).unwrap();
        let alice = UserId::new("alice");

        fs::write(vault.key_path(&alice), "garbage").unwrap();
        assert!(matches!(vault.load_private_key(&alice), Err(VaultError::Corrupt { .. })));

        fs::write(vault.key_path(&alice), encode_pem(b"x", "PUBLIC KEY")).unwrap();
        assert!(matches!(
            vault.load_private_key(&alice),
            Err(VaultError::Corrupt { reason, .. }) if reason.contains("PUBLIC KEY")
        ));
    }

    #[test]
    fn failed_store_keeps_previous_key() {
        let dir = tempfile::tempdir().unwrap();
        let vault = FileKeyVault::open(dir.path()).unwrap();
        let alice = UserId::new("alice");
        let original = sample_pem();
        vault.store_private_key(&alice, &original).unwrap();

        // A directory squatting on the temporary path makes the write fail
        let temp_path = vault.key_path(&alice).with_extension("pem.tmp");
        fs::create_dir(&temp_path).unwrap();

        let replacement = encode_pem(b"second key", PRIVATE_KEY_LABEL);
        assert!(matches!(vault.store_private_key(&alice, &replacement), Err(VaultError::Io(_))));
        assert_eq!(vault.load_private_key(&alice).unwrap().unwrap().as_str(), original);

        fs::remove_dir(&temp_path).unwrap();
        vault.store_private_key(&alice, &replacement).unwrap();
        assert_eq!(vault.load_private_key(&alice).unwrap().unwrap().as_str(), replacement);
    }

    #[test]
    fn stale_temporary_file_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let vault = FileKeyVault::open(dir.path()).unwrap();
        let alice = UserId::new("alice");
        let temp_path = vault.key_path(&alice).with_extension("pem.tmp");
        fs::write(&temp_path, "half a key").unwrap();

        vault.store_private_key(&alice, &sample_pem()).unwrap();

        assert!(!temp_path.exists());
        assert_eq!(vault.load_private_key(&alice).unwrap().unwrap().as_str(), sample_pem());
    }

    #[cfg(unix)]
    #[test]
    fn key_file_is_never_group_or_world_readable() {
        use std::{
            os::unix::fs::PermissionsExt,
            sync::{
                Arc,
                atomic::{AtomicBool, Ordering},
            },
            thread,
        };

        let dir = tempfile::tempdir().unwrap();
        let vault = FileKeyVault::open(dir.path()).unwrap();
        let alice = UserId::new("alice");
        let key_path = vault.key_path(&alice);
        let temp_path = key_path.with_extension("pem.tmp");
        let done = Arc::new(AtomicBool::new(false));

        let watcher = {
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut exposed = false;
                while !done.load(Ordering::SeqCst) {
                    for path in [&key_path, &temp_path] {
                        if let Ok(meta) = fs::metadata(path) {
                            exposed |= (meta.permissions().mode() & 0o077) != 0;
                        }
                    }
                }
                exposed
            })
        };

        for _ in 0..200 {
            vault.clear_private_key(&alice).unwrap();
            vault.store_private_key(&alice, &sample_pem()).unwrap();
        }
        done.store(true, Ordering::SeqCst);

        assert!(!watcher.join().unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn file_vault_restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let vault = FileKeyVault::open(dir.path()).unwrap();
        let alice = UserId::new("alice");

        vault.store_private_key(&alice, &sample_pem()).unwrap();

        let mode = fs::metadata(vault.key_path(&alice)).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

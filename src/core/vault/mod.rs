use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use hmac::Mac;
use rusqlite::Connection;
use sha2::Sha256;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::platform::{NativePlatform, Platform};

type HmacSha256 = hmac::Hmac<Sha256>;

/// Vault key holding the GitHub personal access token.
pub const CREDENTIAL_KEY: &str = "gh_pat";

/// Opaque GitHub token. Never printed: `Debug` is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Holds at most one credential. Callers look it up on every request and
/// never keep a copy, so `set`/`clear` take effect on the next call.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Current credential, or `None`. Storage faults are logged and read as absent.
    async fn get(&self) -> Option<Credential>;

    async fn set(&self, credential: Credential) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}

pub struct SecretsVault {
    db: Arc<Mutex<Connection>>,
    cipher: Aes256Gcm,
}

/// Derive a 256-bit encryption key from machine-specific identifiers.
/// Uses HMAC-SHA256(hostname + username, "blogpanel-vault-v1") so the key is
/// stable across runs but tied to the local machine/user.
fn derive_key() -> [u8; 32] {
    let hostname = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown-host".to_string());
    let username = whoami::username();
    let input = format!("{}{}", hostname, username);

    let mut mac = <HmacSha256 as Mac>::new_from_slice(b"blogpanel-vault-v1")
        .expect("HMAC can take key of any size");
    mac.update(input.as_bytes());
    let bytes = mac.finalize().into_bytes();

    let mut key = [0u8; 32];
    key.copy_from_slice(&bytes);
    key
}

impl SecretsVault {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        let key = derive_key();
        let cipher = Aes256Gcm::new_from_slice(&key).expect("32-byte key is valid for AES-256");
        Self { db, cipher }
    }

    /// Open (or create) `vault.db` inside `data_dir` with owner-only permissions.
    pub async fn open(data_dir: &Path) -> Result<Self> {
        if !data_dir.exists() {
            std::fs::create_dir_all(data_dir)
                .with_context(|| format!("Failed to create {}", data_dir.display()))?;
            NativePlatform::restrict_dir_permissions(data_dir);
        }
        let db_path = data_dir.join("vault.db");
        let conn = Connection::open(&db_path)
            .with_context(|| format!("Failed to open vault at {}", db_path.display()))?;
        NativePlatform::restrict_file_permissions(&db_path);

        let vault = Self::new(Arc::new(Mutex::new(conn)));
        vault.initialize().await?;
        Ok(vault)
    }

    pub async fn initialize(&self) -> Result<()> {
        let db = self.db.lock().await;
        db.execute(
            "CREATE TABLE IF NOT EXISTS secrets_vault (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// Encrypt a plaintext value. Returns base64(nonce || ciphertext).
    fn encrypt(&self, plaintext: &str) -> Result<String> {
        let nonce_bytes: [u8; 12] = rand::random();
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| anyhow::anyhow!("Encryption failed: {}", e))?;

        let mut combined = Vec::with_capacity(12 + ciphertext.len());
        combined.extend_from_slice(&nonce_bytes);
        combined.extend_from_slice(&ciphertext);

        Ok(base64::engine::general_purpose::STANDARD.encode(&combined))
    }

    /// Decrypt a base64(nonce || ciphertext) value. Returns plaintext.
    fn decrypt(&self, encoded: &str) -> Result<String> {
        let combined = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| anyhow::anyhow!("Base64 decode failed: {}", e))?;

        if combined.len() < 13 {
            return Err(anyhow::anyhow!("Encrypted value too short"));
        }

        let (nonce_bytes, ciphertext) = combined.split_at(12);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| anyhow::anyhow!("Decryption failed: {}", e))?;

        String::from_utf8(plaintext).map_err(|e| anyhow::anyhow!("UTF-8 decode failed: {}", e))
    }

    pub async fn set_secret(&self, key: &str, value: &str) -> Result<()> {
        let encrypted = self.encrypt(value)?;
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO secrets_vault (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value=excluded.value",
            (key, &encrypted),
        )?;
        Ok(())
    }

    pub async fn get_secret(&self, key: &str) -> Result<Option<String>> {
        let stored: Option<String> = {
            let db = self.db.lock().await;
            let mut stmt = db.prepare("SELECT value FROM secrets_vault WHERE key = ?1")?;
            let mut rows = stmt.query([key])?;
            match rows.next()? {
                Some(row) => Some(row.get(0)?),
                None => None,
            }
        };

        match stored {
            Some(value) => Ok(Some(self.decrypt(&value)?)),
            None => Ok(None),
        }
    }

    pub async fn remove_secret(&self, key: &str) -> Result<()> {
        let db = self.db.lock().await;
        db.execute("DELETE FROM secrets_vault WHERE key = ?1", [key])?;
        Ok(())
    }
}

/// `CredentialStore` persisted in the encrypted vault under [`CREDENTIAL_KEY`].
pub struct VaultCredentialStore {
    vault: SecretsVault,
}

impl VaultCredentialStore {
    pub fn new(vault: SecretsVault) -> Self {
        Self { vault }
    }
}

#[async_trait]
impl CredentialStore for VaultCredentialStore {
    async fn get(&self) -> Option<Credential> {
        match self.vault.get_secret(CREDENTIAL_KEY).await {
            Ok(Some(token)) if !token.is_empty() => Some(Credential::new(token)),
            Ok(_) => None,
            Err(e) => {
                warn!("Could not read credential from vault: {}", e);
                None
            }
        }
    }

    async fn set(&self, credential: Credential) -> Result<()> {
        self.vault
            .set_secret(CREDENTIAL_KEY, credential.expose())
            .await?;
        debug!("Credential stored in vault");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.vault.remove_secret(CREDENTIAL_KEY).await?;
        debug!("Credential removed from vault");
        Ok(())
    }
}

/// In-memory store for protocol tests.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryCredentialStore {
    token: std::sync::Mutex<Option<Credential>>,
}

#[cfg(test)]
impl MemoryCredentialStore {
    pub fn with_token(token: &str) -> Self {
        Self {
            token: std::sync::Mutex::new(Some(Credential::new(token))),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self) -> Option<Credential> {
        self.token.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    async fn set(&self, credential: Credential) -> Result<()> {
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = Some(credential);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

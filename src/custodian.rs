// Key Custodian capability
// Owns key material and performs the raw AEAD primitive; the envelope
// codec only ever talks to it through the `KeyCustodian` trait and never
// holds key bytes itself.

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::errors::VaultError;

pub const IV_LEN: usize = 12;
pub const TAG_LEN: usize = 16;
const KEY_LEN: usize = 32;

/// Output of one authenticated-encryption call: ciphertext, the fresh
/// nonce used, and the GCM tag, kept separate so the envelope codec can
/// encode them as independent segments.
#[derive(Debug, Clone)]
pub struct CipherParts {
    pub ciphertext: Vec<u8>,
    pub iv: Vec<u8>,
    pub tag: Vec<u8>,
}

/// Capability interface over the encryption primitive. Implementations own
/// the key; callers never see it.
pub trait KeyCustodian: Send + Sync {
    /// Encrypt with a fresh random nonce. Fails with
    /// `VaultError::KeyUnavailable` if the key cannot be obtained.
    fn encrypt_primitive(&self, plaintext: &[u8]) -> Result<CipherParts, VaultError>;

    /// Verify the tag and decrypt. Fails with `VaultError::Integrity` on
    /// tag mismatch, never returning partial plaintext.
    fn decrypt_primitive(
        &self,
        ciphertext: &[u8],
        iv: &[u8],
        tag: &[u8],
    ) -> Result<Vec<u8>, VaultError>;
}

fn encrypt_with_key(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<CipherParts, VaultError> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| VaultError::Crypto(e.to_string()))?;

    let mut nonce_bytes = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    // aes-gcm appends the tag to the ciphertext; split it back out
    let mut combined = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| VaultError::Crypto(e.to_string()))?;
    let tag = combined.split_off(combined.len() - TAG_LEN);

    Ok(CipherParts {
        ciphertext: combined,
        iv: nonce_bytes.to_vec(),
        tag,
    })
}

fn decrypt_with_key(
    key: &[u8; KEY_LEN],
    ciphertext: &[u8],
    iv: &[u8],
    tag: &[u8],
) -> Result<Vec<u8>, VaultError> {
    if iv.len() != IV_LEN {
        return Err(VaultError::Format("invalid nonce length".to_string()));
    }
    if tag.len() != TAG_LEN {
        return Err(VaultError::Format("invalid tag length".to_string()));
    }

    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| VaultError::Crypto(e.to_string()))?;

    let nonce = Nonce::from_slice(iv);
    let mut combined = ciphertext.to_vec();
    combined.extend_from_slice(tag);

    // The aead API reports tag mismatch as an opaque error; on the decrypt
    // path that is the only failure mode left once lengths are checked.
    cipher
        .decrypt(nonce, combined.as_slice())
        .map_err(|_| VaultError::Integrity)
}

/// What `provision` may do after reading the existing entry. Only a
/// definitive "no entry" answer from the keychain permits generating a
/// new key; any other read failure must surface instead.
#[derive(Debug, PartialEq, Eq)]
enum ProvisionAction {
    Keep,
    Generate,
}

fn provision_action(
    read: Result<String, keyring::Error>,
) -> Result<ProvisionAction, VaultError> {
    match read {
        Ok(_) => Ok(ProvisionAction::Keep),
        Err(keyring::Error::NoEntry) => Ok(ProvisionAction::Generate),
        Err(e) => Err(VaultError::KeyUnavailable(e.to_string())),
    }
}

/// Custodian backed by the OS keychain. The master key is fetched per call
/// and never cached, so locking secure storage takes effect immediately.
pub struct KeychainCustodian {
    service: String,
    account: String,
}

impl KeychainCustodian {
    pub fn new(service: &str, account: &str) -> Self {
        Self {
            service: service.to_string(),
            account: account.to_string(),
        }
    }

    /// Generate a random master key and store it in the keychain.
    /// Call once during app setup; existing keys are not overwritten.
    /// A store that cannot be read (locked, no access) is an error, not a
    /// missing key: generating a fresh key there would orphan every
    /// envelope sealed under the old one.
    pub fn provision(&self) -> Result<(), VaultError> {
        let entry = self.entry()?;
        match provision_action(entry.get_password())? {
            ProvisionAction::Keep => Ok(()),
            ProvisionAction::Generate => {
                let mut key = [0u8; KEY_LEN];
                OsRng.fill_bytes(&mut key);
                entry
                    .set_password(&BASE64.encode(key))
                    .map_err(|e| VaultError::KeyUnavailable(e.to_string()))
            }
        }
    }

    /// Derive a master key from a user password and store it.
    pub fn provision_from_password(&self, password: &str) -> Result<(), VaultError> {
        let key = derive_key(password);
        self.entry()?
            .set_password(&BASE64.encode(key))
            .map_err(|e| VaultError::KeyUnavailable(e.to_string()))
    }

    fn entry(&self) -> Result<keyring::Entry, VaultError> {
        keyring::Entry::new(&self.service, &self.account)
            .map_err(|e| VaultError::KeyUnavailable(e.to_string()))
    }

    fn load_key(&self) -> Result<[u8; KEY_LEN], VaultError> {
        let encoded = match self.entry()?.get_password() {
            Ok(p) => p,
            Err(keyring::Error::NoEntry) => {
                return Err(VaultError::KeyUnavailable(
                    "no master key provisioned".to_string(),
                ))
            }
            Err(e) => return Err(VaultError::KeyUnavailable(e.to_string())),
        };

        let bytes = BASE64
            .decode(&encoded)
            .map_err(|_| VaultError::KeyUnavailable("stored key is not valid base64".to_string()))?;
        if bytes.len() != KEY_LEN {
            return Err(VaultError::KeyUnavailable(
                "stored key has wrong length".to_string(),
            ));
        }
        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&bytes);
        Ok(key)
    }
}

impl KeyCustodian for KeychainCustodian {
    fn encrypt_primitive(&self, plaintext: &[u8]) -> Result<CipherParts, VaultError> {
        let key = self.load_key()?;
        encrypt_with_key(&key, plaintext)
    }

    fn decrypt_primitive(
        &self,
        ciphertext: &[u8],
        iv: &[u8],
        tag: &[u8],
    ) -> Result<Vec<u8>, VaultError> {
        let key = self.load_key()?;
        decrypt_with_key(&key, ciphertext, iv, tag)
    }
}

/// Custodian holding a fixed in-memory key. For tests and local
/// development where no OS keychain is available.
pub struct StaticKeyCustodian {
    key: [u8; KEY_LEN],
}

impl StaticKeyCustodian {
    pub fn new(key: [u8; KEY_LEN]) -> Self {
        Self { key }
    }

    pub fn random() -> Self {
        let mut key = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut key);
        Self { key }
    }

    pub fn from_password(password: &str) -> Self {
        Self {
            key: derive_key(password),
        }
    }
}

impl KeyCustodian for StaticKeyCustodian {
    fn encrypt_primitive(&self, plaintext: &[u8]) -> Result<CipherParts, VaultError> {
        encrypt_with_key(&self.key, plaintext)
    }

    fn decrypt_primitive(
        &self,
        ciphertext: &[u8],
        iv: &[u8],
        tag: &[u8],
    ) -> Result<Vec<u8>, VaultError> {
        decrypt_with_key(&self.key, ciphertext, iv, tag)
    }
}

/// SHA-256 of password plus a fixed versioned salt. Matches the key layout
/// expected by existing stored data.
fn derive_key(password: &str) -> [u8; KEY_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.update(b"casevault-encryption-salt-v1");
    let digest = hasher.finalize();

    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(&digest);
    key
}

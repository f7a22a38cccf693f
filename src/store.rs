// Encrypted communication archive
// Bridges the provider API clients and the persistence store: raw
// message text is sealed before it is handed to the store, and the store
// only ever sees the envelope's opaque string form.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use parking_lot::Mutex;

use crate::custodian::KeyCustodian;
use crate::envelope;
use crate::errors::VaultError;
use crate::types::CommunicationRecord;

/// Persistence collaborator. Accepts and returns the envelope codec's
/// single-string encoding as an opaque field, no interpretation.
pub trait EnvelopeStore: Send + Sync {
    fn put(&self, id: &str, encoded: &str) -> Result<(), VaultError>;
    fn get(&self, id: &str) -> Result<Option<String>, VaultError>;
}

/// In-memory store for tests and local development.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl EnvelopeStore for MemoryStore {
    fn put(&self, id: &str, encoded: &str) -> Result<(), VaultError> {
        self.entries.lock().insert(id.to_string(), encoded.to_string());
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<String>, VaultError> {
        Ok(self.entries.lock().get(id).cloned())
    }
}

/// Provider API collaborator (Slack/Gmail/Zoom). Supplies raw message
/// records the archive seals before storage.
#[async_trait::async_trait]
pub trait ProviderClient: Send + Sync {
    async fn fetch_messages(&self) -> Result<Vec<CommunicationRecord>>;
}

/// Seals communication text on the way into the store and opens it on the
/// way out. Holds no key material; every seal/open goes through the
/// custodian capability.
pub struct CommunicationArchive {
    custodian: Arc<dyn KeyCustodian>,
    store: Arc<dyn EnvelopeStore>,
}

impl CommunicationArchive {
    pub fn new(custodian: Arc<dyn KeyCustodian>, store: Arc<dyn EnvelopeStore>) -> Self {
        Self { custodian, store }
    }

    /// Seal one record's text and persist it under the record id.
    pub fn store_record(&self, record: &CommunicationRecord) -> Result<(), VaultError> {
        let encoded = envelope::seal_to_string(&record.text, self.custodian.as_ref())?;
        self.store.put(&record.id, &encoded)
    }

    /// Load and decrypt one record's text. `Ok(None)` when the id is
    /// unknown; crypto and format failures propagate, never a silent
    /// fallback.
    pub fn load_text(&self, id: &str) -> Result<Option<String>, VaultError> {
        match self.store.get(id)? {
            Some(encoded) => Ok(Some(envelope::open_from_string(
                &encoded,
                self.custodian.as_ref(),
            )?)),
            None => Ok(None),
        }
    }

    /// Pull everything a provider has and seal it into the store.
    /// Returns the number of records stored.
    pub async fn ingest(&self, provider: &dyn ProviderClient) -> Result<usize, VaultError> {
        let records = provider
            .fetch_messages()
            .await
            .map_err(|e| VaultError::Store(e.to_string()))?;
        let count = records.len();
        for record in &records {
            self.store_record(record)?;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custodian::StaticKeyCustodian;
    use crate::types::Channel;
    use chrono::Utc;

    fn record(id: &str, text: &str) -> CommunicationRecord {
        CommunicationRecord {
            id: id.to_string(),
            channel: Channel::Slack,
            author_id: "U123".to_string(),
            timestamp: Utc::now(),
            text: text.to_string(),
        }
    }

    struct FakeProvider {
        records: Vec<CommunicationRecord>,
    }

    #[async_trait::async_trait]
    impl ProviderClient for FakeProvider {
        async fn fetch_messages(&self) -> Result<Vec<CommunicationRecord>> {
            Ok(self.records.clone())
        }
    }

    fn archive() -> (CommunicationArchive, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let archive = CommunicationArchive::new(
            Arc::new(StaticKeyCustodian::random()),
            store.clone(),
        );
        (archive, store)
    }

    #[test]
    fn test_store_and_load_roundtrip() {
        let (archive, store) = archive();
        archive
            .store_record(&record("m1", "the quarterly numbers slipped"))
            .unwrap();

        // The store only ever holds the opaque envelope string
        let stored = store.get("m1").unwrap().unwrap();
        assert!(!stored.contains("quarterly"));
        assert_eq!(stored.split(':').count(), 3);

        let text = archive.load_text("m1").unwrap().unwrap();
        assert_eq!(text, "the quarterly numbers slipped");
    }

    #[test]
    fn test_unknown_id_is_none() {
        let (archive, _) = archive();
        assert!(archive.load_text("missing").unwrap().is_none());
    }

    #[test]
    fn test_tampered_store_entry_fails_closed() {
        let (archive, store) = archive();
        archive.store_record(&record("m1", "private")).unwrap();

        let stored = store.get("m1").unwrap().unwrap();
        store.put("m1", &format!("{}AAAA", stored)).unwrap();
        assert!(archive.load_text("m1").is_err());
    }

    #[tokio::test]
    async fn test_ingest_seals_every_record() {
        let (archive, store) = archive();
        let provider = FakeProvider {
            records: vec![record("a", "one"), record("b", "two")],
        };
        let count = archive.ingest(&provider).await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(store.len(), 2);
        assert_eq!(archive.load_text("b").unwrap().unwrap(), "two");
    }
}

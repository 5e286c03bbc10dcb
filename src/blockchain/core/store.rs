//! The process-wide ledger instance.
//!
//! Every mutation (`add_block`, `import_chain`, `reset_chain`) takes the write
//! half of one `RwLock`, so appends never interleave and replacements are
//! observed whole. Reads share the read half.

use parking_lot::RwLock;
use serde::Serialize;

use crate::error::{ChainError, IntegrityError, Result};
use crate::persistence::Persistence;

use super::block::{now_timestamp, Block, BlockData, CertificateRecord};
use super::chain::Blockchain;
use super::validation::{validate_candidate, Verification};

/// What a caller gets back after issuing a certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueReceipt {
    pub hash: String,
    pub index: u64,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainStatus {
    pub chain_length: usize,
    pub certificate_count: usize,
    pub is_valid: bool,
    pub first_invalid_index: Option<u64>,
}

impl ChainStatus {
    fn of(chain: &Blockchain) -> Self {
        let integrity = chain.validate();
        ChainStatus {
            chain_length: chain.len(),
            certificate_count: chain.len().saturating_sub(1),
            is_valid: integrity.is_ok(),
            first_invalid_index: integrity.err().map(|e| e.index),
        }
    }
}

pub struct ChainStore {
    chain: RwLock<Blockchain>,
}

impl ChainStore {
    /// Start with a genesis-only chain.
    pub fn new() -> Result<Self> {
        Ok(ChainStore {
            chain: RwLock::new(Blockchain::new()?),
        })
    }

    /// Append a block after the current tip.
    pub fn add_block(&self, timestamp: impl Into<String>, data: BlockData) -> Result<Block> {
        let block = self.chain.write().add_block(timestamp, data)?;
        tracing::info!(index = block.index, hash = %block.hash, "block appended");
        Ok(block)
    }

    /// Validate a certificate record and append it stamped with the current time.
    pub fn issue(&self, record: CertificateRecord) -> Result<IssueReceipt> {
        record.validate()?;
        let certificate_id = record.certificate_id.clone();
        let block = self.add_block(now_timestamp(), BlockData::Certificate(record))?;
        tracing::info!(certificate_id = %certificate_id, index = block.index, "certificate issued");
        Ok(IssueReceipt {
            hash: block.hash,
            index: block.index,
            timestamp: block.timestamp,
        })
    }

    pub fn latest(&self) -> Option<Block> {
        self.chain.read().latest().cloned()
    }

    pub fn len(&self) -> usize {
        self.chain.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.read().is_empty()
    }

    pub fn validate(&self) -> std::result::Result<(), IntegrityError> {
        let result = self.chain.read().validate();
        if let Err(err) = &result {
            tracing::warn!(index = err.index, fault = %err.fault, "live chain failed integrity check");
        }
        result
    }

    pub fn is_chain_valid(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn verify_certificate(&self, certificate_id: &str) -> Verification {
        self.chain.read().verify_certificate(certificate_id)
    }

    /// Length and integrity taken from one consistent view of the chain.
    pub fn status(&self) -> ChainStatus {
        ChainStatus::of(&self.chain.read())
    }

    /// The blocks as stored, genesis first.
    pub fn export_chain(&self) -> Vec<Block> {
        self.chain.read().blocks.clone()
    }

    /// Replace the live chain with `candidate` if it passes every check.
    /// On rejection the live chain is untouched. Returns the new length.
    pub fn import_chain(&self, candidate: Vec<Block>) -> Result<usize> {
        if let Err(err) = validate_candidate(&candidate) {
            tracing::warn!(error = %err, blocks = candidate.len(), "chain import rejected");
            return Err(err);
        }

        let length = candidate.len();
        *self.chain.write() = Blockchain::from_validated(candidate);
        tracing::info!(chain_length = length, "chain imported");
        Ok(length)
    }

    /// Discard everything and start again from genesis.
    pub fn reset_chain(&self) -> Result<usize> {
        let fresh = Blockchain::new()?;
        let length = fresh.len();
        *self.chain.write() = fresh;
        tracing::info!("chain reset to genesis");
        Ok(length)
    }

    /// Write the current chain through `persistence`.
    pub fn export_to(&self, persistence: &dyn Persistence) -> Result<usize> {
        let blocks = self.export_chain();
        persistence.save_chain(&blocks)?;
        Ok(blocks.len())
    }

    /// Load a saved chain and import it. A missing snapshot is an error.
    pub fn import_from(&self, persistence: &dyn Persistence) -> Result<usize> {
        let blocks = persistence
            .load_chain()?
            .ok_or_else(|| ChainError::InvalidChain("No saved chain found.".to_string()))?;
        self.import_chain(blocks)
    }

    #[cfg(test)]
    pub(crate) fn tamper<F: FnOnce(&mut Blockchain)>(&self, edit: F) {
        edit(&mut *self.chain.write());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::InMemoryPersistence;

    fn record(id: &str) -> CertificateRecord {
        CertificateRecord::new(id, "A", "B", "2024-01-01", "X")
    }

    #[test]
    fn test_issue_scenario() {
        let store = ChainStore::new().unwrap();
        let receipt = store.issue(record("C1")).unwrap();
        assert_eq!(receipt.index, 1);
        assert_eq!(store.len(), 2);
        assert!(store.is_chain_valid());

        let chain = store.export_chain();
        assert_eq!(chain[1].certificate().unwrap().certificate_id, "C1");
        assert_eq!(chain[1].hash, receipt.hash);

        let found = store.verify_certificate("C1").into_match().unwrap();
        assert_eq!(found.data.student_name, "A");
        assert_eq!(found.block_hash, receipt.hash);
    }

    #[test]
    fn test_issue_rejects_invalid_record() {
        let store = ChainStore::new().unwrap();
        let mut bad = record("C1");
        bad.course_name = String::new();
        assert!(matches!(store.issue(bad), Err(ChainError::InvalidCertificate(_))));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_status_reports_first_broken_index() {
        let store = ChainStore::new().unwrap();
        for i in 0..3 {
            store.issue(record(&format!("C{}", i))).unwrap();
        }
        assert_eq!(
            store.status(),
            ChainStatus {
                chain_length: 4,
                certificate_count: 3,
                is_valid: true,
                first_invalid_index: None,
            }
        );

        store.tamper(|chain| chain.blocks[2].timestamp = "tampered".to_string());
        let status = store.status();
        assert!(!status.is_valid);
        assert_eq!(status.first_invalid_index, Some(2));
        // tampered chains stay queryable
        assert!(store.verify_certificate("C0").is_found());
    }

    #[test]
    fn test_rejected_import_leaves_chain_untouched() {
        let store = ChainStore::new().unwrap();
        store.issue(record("C1")).unwrap();
        let before = serde_json::to_vec(&store.export_chain()).unwrap();

        let mut candidate = store.export_chain();
        candidate.push(candidate[1].clone());
        assert!(store.import_chain(candidate).is_err());
        assert!(store.import_chain(Vec::new()).is_err());

        assert_eq!(serde_json::to_vec(&store.export_chain()).unwrap(), before);
    }

    #[test]
    fn test_import_replaces_chain() {
        let source = ChainStore::new().unwrap();
        for i in 0..4 {
            source.issue(record(&format!("C{}", i))).unwrap();
        }

        let target = ChainStore::new().unwrap();
        assert_eq!(target.import_chain(source.export_chain()).unwrap(), 5);
        assert_eq!(target.export_chain(), source.export_chain());
        assert!(target.verify_certificate("C3").is_found());

        let next = target.issue(record("C4")).unwrap();
        assert_eq!(next.index, 5);
    }

    #[test]
    fn test_reset_returns_to_genesis() {
        let store = ChainStore::new().unwrap();
        let genesis = store.latest().unwrap();
        store.issue(record("C1")).unwrap();
        store.tamper(|chain| chain.blocks[1].hash = "bad".to_string());

        assert_eq!(store.reset_chain().unwrap(), 1);
        assert_eq!(store.export_chain(), vec![genesis]);
        assert!(store.is_chain_valid());
    }

    #[test]
    fn test_concurrent_issue_keeps_links() {
        let store = ChainStore::new().unwrap();
        std::thread::scope(|scope| {
            for t in 0..4 {
                let store = &store;
                scope.spawn(move || {
                    for i in 0..25 {
                        store.issue(record(&format!("T{}-{}", t, i))).unwrap();
                    }
                });
            }
        });

        let chain = store.export_chain();
        assert_eq!(chain.len(), 101);
        for (i, block) in chain.iter().enumerate() {
            assert_eq!(block.index, i as u64);
            if i > 0 {
                assert_eq!(block.previous_hash, chain[i - 1].hash);
            }
        }
        assert!(store.is_chain_valid());
    }

    #[test]
    fn test_export_and_import_through_persistence() {
        let store = ChainStore::new().unwrap();
        store.issue(record("C1")).unwrap();
        let saved = InMemoryPersistence::new();
        assert_eq!(store.export_to(&saved).unwrap(), 2);

        let other = ChainStore::new().unwrap();
        assert!(other.import_from(&InMemoryPersistence::new()).is_err());
        assert_eq!(other.import_from(&saved).unwrap(), 2);
        assert_eq!(other.export_chain(), store.export_chain());
    }
}

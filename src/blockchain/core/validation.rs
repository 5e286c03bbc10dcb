use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::error::{ChainError, IntegrityError, IntegrityFault};

use super::block::{Block, CertificateRecord, GENESIS_PREVIOUS_HASH};
use super::chain::Blockchain;

/// Walk blocks `1..len`, recomputing each hash and checking each link.
///
/// Genesis is not rehashed here; a single-block chain is always valid.
/// Stops at the first broken block.
pub fn validate_blocks(blocks: &[Block]) -> Result<(), IntegrityError> {
    for (i, pair) in blocks.windows(2).enumerate() {
        let (previous, current) = (&pair[0], &pair[1]);
        let position = (i + 1) as u64;

        match current.calculate_hash() {
            Ok(hash) if hash == current.hash => {}
            _ => {
                return Err(IntegrityError {
                    index: position,
                    fault: IntegrityFault::HashMismatch,
                })
            }
        }

        if current.previous_hash != previous.hash {
            return Err(IntegrityError {
                index: position,
                fault: IntegrityFault::LinkMismatch,
            });
        }
    }
    Ok(())
}

/// Shape checks applied to an externally supplied chain before the
/// integrity walk.
pub fn validate_structure(blocks: &[Block]) -> Result<(), ChainError> {
    let genesis = blocks
        .first()
        .ok_or_else(|| ChainError::InvalidChain("Chain must contain at least the genesis block.".to_string()))?;

    if genesis.index != 0 {
        return Err(ChainError::InvalidChain(format!(
            "First block must have index 0, but got {}.",
            genesis.index
        )));
    }
    if genesis.previous_hash != GENESIS_PREVIOUS_HASH {
        return Err(ChainError::InvalidChain(format!(
            "Genesis previous hash must be \"{}\", but got \"{}\".",
            GENESIS_PREVIOUS_HASH, genesis.previous_hash
        )));
    }
    if !genesis.data.is_genesis() {
        return Err(ChainError::InvalidChain(
            "First block must carry the genesis payload.".to_string(),
        ));
    }
    if genesis.calculate_hash()? != genesis.hash {
        return Err(IntegrityError {
            index: 0,
            fault: IntegrityFault::HashMismatch,
        }
        .into());
    }

    for (position, block) in blocks.iter().enumerate().skip(1) {
        if block.index != position as u64 {
            return Err(IntegrityError {
                index: position as u64,
                fault: IntegrityFault::IndexMismatch,
            }
            .into());
        }
        if block.data.is_genesis() {
            return Err(ChainError::InvalidChain(format!(
                "Block {} carries a genesis payload.",
                position
            )));
        }
    }

    Ok(())
}

/// Full acceptance check for a replacement chain.
pub fn validate_candidate(blocks: &[Block]) -> Result<(), ChainError> {
    validate_structure(blocks)?;
    validate_blocks(blocks)?;
    Ok(())
}

/// First certificate block (ascending index) whose id matches.
pub fn find_certificate<'a>(blocks: &'a [Block], certificate_id: &str) -> Option<&'a Block> {
    blocks
        .iter()
        .skip(1)
        .find(|block| matches!(block.certificate(), Some(record) if record.certificate_id == certificate_id))
}

/// A resolved certificate together with where it lives in the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateMatch {
    pub data: CertificateRecord,
    pub block_hash: String,
    pub timestamp: String,
    pub index: u64,
}

/// Outcome of a certificate lookup. Absence is a normal result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Found(CertificateMatch),
    NotFound,
}

impl Verification {
    pub fn is_found(&self) -> bool {
        matches!(self, Verification::Found(_))
    }

    pub fn into_match(self) -> Option<CertificateMatch> {
        match self {
            Verification::Found(found) => Some(found),
            Verification::NotFound => None,
        }
    }
}

// Wire form: {"found":true,"data":…,"blockHash":…,"timestamp":…,"index":…} or {"found":false}
impl Serialize for Verification {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Verification::Found(found) => {
                let mut state = serializer.serialize_struct("Verification", 5)?;
                state.serialize_field("found", &true)?;
                state.serialize_field("data", &found.data)?;
                state.serialize_field("blockHash", &found.block_hash)?;
                state.serialize_field("timestamp", &found.timestamp)?;
                state.serialize_field("index", &found.index)?;
                state.end()
            }
            Verification::NotFound => {
                let mut state = serializer.serialize_struct("Verification", 1)?;
                state.serialize_field("found", &false)?;
                state.end()
            }
        }
    }
}

impl Blockchain {
    pub fn validate(&self) -> Result<(), IntegrityError> {
        validate_blocks(&self.blocks)
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Full check of blocks that did not come from `add_block`: structure
    /// (non-empty, genesis first, positional indices) and then the link walk.
    pub fn audit(&self) -> Result<(), ChainError> {
        validate_candidate(&self.blocks)
    }

    /// Index from which the blocks can no longer be trusted. A structural
    /// failure with no specific block taints the whole chain.
    pub fn first_untrusted_index(&self) -> Option<u64> {
        match self.audit() {
            Ok(()) => None,
            Err(ChainError::Integrity(err)) => Some(err.index),
            Err(_) => Some(0),
        }
    }

    pub fn verify_certificate(&self, certificate_id: &str) -> Verification {
        match find_certificate(&self.blocks, certificate_id) {
            Some(block) => match block.certificate() {
                Some(record) => Verification::Found(CertificateMatch {
                    data: record.clone(),
                    block_hash: block.hash.clone(),
                    timestamp: block.timestamp.clone(),
                    index: block.index,
                }),
                None => Verification::NotFound,
            },
            None => Verification::NotFound,
        }
    }
}

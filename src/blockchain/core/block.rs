//! Ledger entries and their content hash.
//!
//! The hash of a block is the lowercase hex SHA-256 of a compact JSON document
//! with the keys `index`, `timestamp`, `data`, `previousHash` in that order.
//! Certificate payload keys are emitted in declaration order of
//! [`CertificateRecord`], absent optional fields are omitted. Struct field
//! order is what pins the layout, so no map type is ever hashed.

use chrono::{NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::ChainError;

/// `previousHash` carried by the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";
/// Payload of the genesis block on the wire.
pub const GENESIS_MARKER: &str = "Genesis Block";
/// Genesis is pinned so a fresh or reset chain always has the same hash.
pub const GENESIS_TIMESTAMP: &str = "2024-01-01T00:00:00.000Z";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Current instant in the ISO-8601 form stored in blocks.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Metadata of one issued certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CertificateRecord {
    pub certificate_id: String,
    pub student_name: String,
    pub course_name: String,
    pub issue_date: String,
    pub issuer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CertificateRecord {
    /// Minimal record with the five required fields.
    pub fn new(
        certificate_id: impl Into<String>,
        student_name: impl Into<String>,
        course_name: impl Into<String>,
        issue_date: impl Into<String>,
        issuer: impl Into<String>,
    ) -> Self {
        CertificateRecord {
            certificate_id: certificate_id.into(),
            student_name: student_name.into(),
            course_name: course_name.into(),
            issue_date: issue_date.into(),
            issuer: issuer.into(),
            certificate_type: None,
            expiry_date: None,
            description: None,
        }
    }

    /// Checks applied before issuance.
    ///
    /// Required fields must be non-blank. When both dates parse as
    /// `YYYY-MM-DD`, the expiry must fall strictly after the issue date;
    /// unparseable dates are stored as given.
    pub fn validate(&self) -> Result<(), ChainError> {
        let required = [
            ("certificateId", &self.certificate_id),
            ("studentName", &self.student_name),
            ("courseName", &self.course_name),
            ("issueDate", &self.issue_date),
            ("issuer", &self.issuer),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(ChainError::InvalidCertificate(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }

        if let Some(expiry) = &self.expiry_date {
            if let (Some(issued), Some(expires)) = (parse_date(&self.issue_date), parse_date(expiry)) {
                if expires <= issued {
                    return Err(ChainError::InvalidCertificate(format!(
                        "expiry date {} must be after issue date {}",
                        expires, issued
                    )));
                }
            }
        }

        Ok(())
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

/// Block payload: the genesis marker or a certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockData {
    Genesis,
    Certificate(CertificateRecord),
}

impl BlockData {
    pub fn is_genesis(&self) -> bool {
        matches!(self, BlockData::Genesis)
    }

    pub fn certificate(&self) -> Option<&CertificateRecord> {
        match self {
            BlockData::Certificate(record) => Some(record),
            BlockData::Genesis => None,
        }
    }
}

impl From<CertificateRecord> for BlockData {
    fn from(record: CertificateRecord) -> Self {
        BlockData::Certificate(record)
    }
}

impl Serialize for BlockData {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            BlockData::Genesis => serializer.serialize_str(GENESIS_MARKER),
            BlockData::Certificate(record) => record.serialize(serializer),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BlockDataRepr {
    Marker(String),
    Record(CertificateRecord),
}

impl<'de> Deserialize<'de> for BlockData {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match BlockDataRepr::deserialize(deserializer)? {
            BlockDataRepr::Marker(marker) if marker == GENESIS_MARKER => Ok(BlockData::Genesis),
            BlockDataRepr::Marker(marker) => Err(serde::de::Error::custom(format!(
                "unknown block payload '{}'",
                marker
            ))),
            BlockDataRepr::Record(record) => Ok(BlockData::Certificate(record)),
        }
    }
}

/// One ledger entry. `hash` is computed once in [`Block::new`] and never
/// refreshed afterwards, so any later field edit is detectable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub index: u64,
    pub timestamp: String,
    pub data: BlockData,
    pub previous_hash: String,
    pub hash: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HashInput<'a> {
    index: u64,
    timestamp: &'a str,
    data: &'a BlockData,
    previous_hash: &'a str,
}

impl Block {
    pub fn new(
        index: u64,
        timestamp: impl Into<String>,
        data: BlockData,
        previous_hash: impl Into<String>,
    ) -> Result<Self, ChainError> {
        let mut block = Block {
            index,
            timestamp: timestamp.into(),
            data,
            previous_hash: previous_hash.into(),
            hash: String::new(),
        };
        block.hash = block.calculate_hash()?;
        Ok(block)
    }

    pub fn genesis() -> Result<Self, ChainError> {
        Block::new(0, GENESIS_TIMESTAMP, BlockData::Genesis, GENESIS_PREVIOUS_HASH)
    }

    /// The exact bytes fed to SHA-256.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, ChainError> {
        let input = HashInput {
            index: self.index,
            timestamp: &self.timestamp,
            data: &self.data,
            previous_hash: &self.previous_hash,
        };
        Ok(serde_json::to_vec(&input)?)
    }

    /// Recompute the content hash from the stored fields.
    pub fn calculate_hash(&self) -> Result<String, ChainError> {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical_bytes()?);
        Ok(hex::encode(hasher.finalize()))
    }

    pub fn certificate(&self) -> Option<&CertificateRecord> {
        self.data.certificate()
    }

    /// First 13 characters of the stored hash, for tables. Stored hashes
    /// from a snapshot file may be arbitrary text.
    pub fn short_hash(&self) -> String {
        if self.hash.chars().count() > 16 {
            format!("{}...", self.hash.chars().take(13).collect::<String>())
        } else {
            self.hash.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> CertificateRecord {
        CertificateRecord::new("C1", "A", "B", "2024-01-01", "X")
    }

    #[test]
    fn test_genesis_canonical_form() {
        let genesis = Block::genesis().unwrap();
        let bytes = genesis.canonical_bytes().unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"index":0,"timestamp":"2024-01-01T00:00:00.000Z","data":"Genesis Block","previousHash":"0"}"#
        );
        assert_eq!(genesis.hash.len(), 64);
        assert_eq!(genesis.hash, Block::genesis().unwrap().hash);
    }

    #[test]
    fn test_certificate_key_order_is_pinned() {
        let mut record = sample_record();
        record.description = Some("d".to_string());
        let block = Block::new(1, "t", record.into(), "p").unwrap();
        let text = String::from_utf8(block.canonical_bytes().unwrap()).unwrap();
        assert_eq!(
            text,
            r#"{"index":1,"timestamp":"t","data":{"certificateId":"C1","studentName":"A","courseName":"B","issueDate":"2024-01-01","issuer":"X","description":"d"},"previousHash":"p"}"#
        );
    }

    #[test]
    fn test_every_field_feeds_the_hash() {
        let block = Block::new(1, "2024-05-01T10:00:00.000Z", sample_record().into(), "abc").unwrap();
        assert_eq!(block.hash, block.calculate_hash().unwrap());

        let mut changed = block.clone();
        changed.index = 2;
        assert_ne!(changed.calculate_hash().unwrap(), block.hash);

        let mut changed = block.clone();
        changed.timestamp.push('x');
        assert_ne!(changed.calculate_hash().unwrap(), block.hash);

        let mut changed = block.clone();
        changed.previous_hash = "abd".to_string();
        assert_ne!(changed.calculate_hash().unwrap(), block.hash);

        let mut changed = block.clone();
        if let BlockData::Certificate(record) = &mut changed.data {
            record.student_name = "Mallory".to_string();
        }
        assert_ne!(changed.calculate_hash().unwrap(), block.hash);
    }

    #[test]
    fn test_block_json_round_trip_keeps_hash() {
        let block = Block::new(3, now_timestamp(), sample_record().into(), "abc").unwrap();
        let json = serde_json::to_string(&block).unwrap();
        assert!(json.contains("\"previousHash\":\"abc\""));
        assert!(!json.contains("expiryDate"));

        let back: Block = serde_json::from_str(&json).unwrap();
        assert_eq!(back, block);
        assert_eq!(back.calculate_hash().unwrap(), block.hash);
    }

    #[test]
    fn test_payload_marker_must_be_genesis() {
        let ok: BlockData = serde_json::from_str("\"Genesis Block\"").unwrap();
        assert!(ok.is_genesis());
        assert!(serde_json::from_str::<BlockData>("\"Something Else\"").is_err());
        assert!(serde_json::from_str::<BlockData>(r#"{"certificateId":"C1"}"#).is_err());
    }

    #[test]
    fn test_validate_required_fields() {
        assert!(sample_record().validate().is_ok());

        let mut record = sample_record();
        record.student_name = "  ".to_string();
        record.issuer = String::new();
        let err = record.validate().unwrap_err().to_string();
        assert!(err.contains("studentName"));
        assert!(err.contains("issuer"));
    }

    #[test]
    fn test_validate_expiry_after_issue() {
        let mut record = sample_record();
        record.expiry_date = Some("2023-12-31".to_string());
        assert!(record.validate().is_err());

        record.expiry_date = Some("2024-01-01".to_string());
        assert!(record.validate().is_err());

        record.expiry_date = Some("2025-01-01".to_string());
        assert!(record.validate().is_ok());

        record.expiry_date = Some("never".to_string());
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_short_hash_counts_characters() {
        let mut block = Block::genesis().unwrap();
        assert_eq!(block.short_hash(), format!("{}...", &block.hash[..13]));

        block.hash = "éééééééééééééééééé".to_string();
        assert_eq!(block.short_hash(), "ééééééééééééé...");

        block.hash = "éé".to_string();
        assert_eq!(block.short_hash(), "éé");
    }

    #[test]
    fn test_now_timestamp_format() {
        let ts = now_timestamp();
        assert!(ts.ends_with('Z'));
        assert_eq!(ts.len(), "2024-01-01T00:00:00.000Z".len());
    }
}

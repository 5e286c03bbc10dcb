//! Integration tests for JSON snapshot export and import

use certchain::blockchain::{Blockchain, CertificateRecord, ChainStore};
use certchain::persistence::{JsonFilePersistence, Persistence};
use tempfile::TempDir;

#[test]
fn test_snapshot_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let snapshot = JsonFilePersistence::new(dir.path().join("chain.json"));

    let store = ChainStore::new()?;
    store.issue(CertificateRecord::new("C1", "A", "B", "2024-01-01", "X"))?;
    store.issue(CertificateRecord::new("C2", "D", "E", "2024-02-01", "X"))?;
    assert_eq!(store.export_to(&snapshot)?, 3);

    let text = std::fs::read_to_string(snapshot.path())?;
    let raw: serde_json::Value = serde_json::from_str(&text)?;
    assert!(raw.is_array());
    assert_eq!(raw[1]["data"]["certificateId"], "C1");

    let restored = ChainStore::new()?;
    assert_eq!(restored.import_from(&snapshot)?, 3);
    assert_eq!(restored.export_chain(), store.export_chain());
    assert!(restored.verify_certificate("C2").is_found());
    Ok(())
}

#[test]
fn test_tampered_snapshot_is_refused() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let path = dir.path().join("chain.json");
    let snapshot = JsonFilePersistence::new(&path);

    let store = ChainStore::new()?;
    store.issue(CertificateRecord::new("C1", "A", "B", "2024-01-01", "X"))?;
    store.export_to(&snapshot)?;

    let text = std::fs::read_to_string(&path)?.replace("\"studentName\": \"A\"", "\"studentName\": \"Z\"");
    std::fs::write(&path, text)?;
    assert_eq!(snapshot.load_chain()?.map(|b| b.len()), Some(2));

    let target = ChainStore::new()?;
    assert!(target.import_from(&snapshot).is_err());
    assert_eq!(target.len(), 1);
    Ok(())
}

#[test]
fn test_raw_snapshot_inspection_flags_bad_files() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let path = dir.path().join("chain.json");
    let snapshot = JsonFilePersistence::new(&path);

    std::fs::write(&path, "[]")?;
    let empty = Blockchain { blocks: snapshot.load_chain()?.unwrap_or_default() };
    assert!(empty.audit().is_err());
    assert_eq!(empty.first_untrusted_index(), Some(0));

    let store = ChainStore::new()?;
    store.issue(CertificateRecord::new("C1", "A", "B", "2024-01-01", "X"))?;
    store.export_to(&snapshot)?;

    let mut raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    raw[1]["hash"] = serde_json::json!("éééééééééééééééééééé");
    std::fs::write(&path, serde_json::to_string(&raw)?)?;

    let tampered = Blockchain { blocks: snapshot.load_chain()?.unwrap_or_default() };
    assert_eq!(tampered.first_untrusted_index(), Some(1));
    assert_eq!(tampered.blocks[1].short_hash(), "ééééééééééééé...");
    Ok(())
}

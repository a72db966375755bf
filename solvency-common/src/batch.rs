//! Batch records as stored in the proof table, and their decoded form.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    digest::{decode_base64, decode_digest_base64, digest_base64, Digest},
    error::DecodeError,
};

/// One row of the proof table, with proof and digests still base64 encoded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawBatchRecord {
    pub batch_number: i64,
    #[serde(rename = "proof_info")]
    pub proof: String,
    /// Asset-ledger commitments before and after the batch.
    #[serde(rename = "cex_asset_list_commitments")]
    pub ledger_commitments: Vec<String>,
    /// Account-tree roots before and after the batch.
    #[serde(rename = "account_tree_roots")]
    pub tree_roots: Vec<String>,
    #[serde(rename = "batch_commitment")]
    pub public_input: String,
}

/// A decoded batch. Index 0 of each pair is the state the batch starts from,
/// index 1 the state it ends in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchRecord {
    pub batch_number: i64,
    pub proof: Vec<u8>,
    pub ledger_commitments: [Digest; 2],
    pub tree_roots: [Digest; 2],
    pub public_input: Digest,
}

impl RawBatchRecord {
    pub fn decode(&self) -> Result<BatchRecord, DecodeError> {
        let batch = self.batch_number;
        let proof = decode_base64(batch, "proof_info", &self.proof)?;
        if proof.is_empty() {
            return Err(DecodeError::EmptyProof { batch });
        }
        Ok(BatchRecord {
            batch_number: batch,
            proof,
            ledger_commitments: decode_pair(
                batch,
                "cex_asset_list_commitments",
                &self.ledger_commitments,
            )?,
            tree_roots: decode_pair(batch, "account_tree_roots", &self.tree_roots)?,
            public_input: decode_digest_base64(batch, "batch_commitment", &self.public_input)?,
        })
    }
}

impl From<&BatchRecord> for RawBatchRecord {
    fn from(record: &BatchRecord) -> Self {
        use base64::{engine::general_purpose::STANDARD, Engine as _};

        Self {
            batch_number: record.batch_number,
            proof: STANDARD.encode(&record.proof),
            ledger_commitments: record.ledger_commitments.iter().map(digest_base64).collect(),
            tree_roots: record.tree_roots.iter().map(digest_base64).collect(),
            public_input: digest_base64(&record.public_input),
        }
    }
}

fn decode_pair(
    batch: i64,
    field: &'static str,
    values: &[String],
) -> Result<[Digest; 2], DecodeError> {
    match values {
        [prev, next] => Ok([
            decode_digest_base64(batch, field, prev)?,
            decode_digest_base64(batch, field, next)?,
        ]),
        _ => Err(DecodeError::PairLength {
            batch,
            field,
            len: values.len(),
        }),
    }
}

/// Decodes every record, stopping at the first malformed one.
pub fn decode_batch_table(rows: &[RawBatchRecord]) -> Result<Vec<BatchRecord>, DecodeError> {
    rows.iter().map(RawBatchRecord::decode).collect()
}

/// On-disk layout of a proof table, chosen by file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableFormat {
    /// Header row plus one row per batch; the commitment and root pairs are
    /// JSON arrays inside their cells, as the proving side exports them.
    Csv,
    /// JSON array of [`RawBatchRecord`]s.
    Json,
}

impl TableFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Self::Csv,
            _ => Self::Json,
        }
    }
}

/// A proof-table row as it appears in a CSV cell layout.
#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    batch_number: i64,
    proof_info: String,
    cex_asset_list_commitments: String,
    account_tree_roots: String,
    batch_commitment: String,
}

impl CsvRow {
    fn into_raw(self) -> Result<RawBatchRecord> {
        let batch = self.batch_number;
        Ok(RawBatchRecord {
            batch_number: batch,
            proof: self.proof_info,
            ledger_commitments: serde_json::from_str(&self.cex_asset_list_commitments)
                .with_context(|| format!("batch {batch}: malformed cex_asset_list_commitments"))?,
            tree_roots: serde_json::from_str(&self.account_tree_roots)
                .with_context(|| format!("batch {batch}: malformed account_tree_roots"))?,
            public_input: self.batch_commitment,
        })
    }

    fn from_raw(raw: &RawBatchRecord) -> Result<Self> {
        Ok(Self {
            batch_number: raw.batch_number,
            proof_info: raw.proof.clone(),
            cex_asset_list_commitments: serde_json::to_string(&raw.ledger_commitments)?,
            account_tree_roots: serde_json::to_string(&raw.tree_roots)?,
            batch_commitment: raw.public_input.clone(),
        })
    }
}

/// Reads a proof table in any row order. `.csv` files use the proving side's
/// CSV export; anything else is read as JSON.
pub fn read_batch_table(path: impl AsRef<Path>) -> Result<Vec<RawBatchRecord>> {
    let path = path.as_ref();
    match TableFormat::from_path(path) {
        TableFormat::Csv => read_csv_table(path),
        TableFormat::Json => {
            let bytes = fs::read(path)
                .with_context(|| format!("failed to read proof table {}", path.display()))?;
            serde_json::from_slice(&bytes)
                .with_context(|| format!("failed to parse proof table {}", path.display()))
        }
    }
}

fn read_csv_table(path: &Path) -> Result<Vec<RawBatchRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to read proof table {}", path.display()))?;
    reader
        .deserialize::<CsvRow>()
        .map(|row| {
            row.with_context(|| format!("failed to parse proof table {}", path.display()))?
                .into_raw()
        })
        .collect()
}

pub fn write_batch_table(path: impl AsRef<Path>, rows: &[RawBatchRecord]) -> Result<()> {
    let path = path.as_ref();
    match TableFormat::from_path(path) {
        TableFormat::Csv => {
            let mut writer = csv::Writer::from_path(path)
                .with_context(|| format!("failed to write {}", path.display()))?;
            for row in rows {
                writer
                    .serialize(CsvRow::from_raw(row)?)
                    .context("failed to serialize proof table")?;
            }
            writer
                .flush()
                .with_context(|| format!("failed to write {}", path.display()))
        }
        TableFormat::Json => {
            let json =
                serde_json::to_vec_pretty(rows).context("failed to serialize proof table")?;
            fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> BatchRecord {
        BatchRecord {
            batch_number: 7,
            proof: vec![1, 2, 3, 4],
            ledger_commitments: [[1u8; 32], [2u8; 32]],
            tree_roots: [[3u8; 32], [4u8; 32]],
            public_input: [5u8; 32],
        }
    }

    #[test]
    fn raw_record_decodes_to_typed_fields() {
        let record = sample_record();
        let raw = RawBatchRecord::from(&record);
        assert_eq!(raw.decode().unwrap(), record);
    }

    #[test]
    fn table_json_uses_proof_table_column_names() {
        let raw = RawBatchRecord::from(&sample_record());
        let value = serde_json::to_value(&raw).unwrap();
        for column in [
            "batch_number",
            "proof_info",
            "cex_asset_list_commitments",
            "account_tree_roots",
            "batch_commitment",
        ] {
            assert!(value.get(column).is_some(), "missing column {column}");
        }
    }

    #[test]
    fn missing_root_is_a_pair_length_error() {
        let mut raw = RawBatchRecord::from(&sample_record());
        raw.tree_roots.pop();
        assert_eq!(
            raw.decode().unwrap_err(),
            DecodeError::PairLength {
                batch: 7,
                field: "account_tree_roots",
                len: 1
            }
        );
    }

    #[test]
    fn truncated_public_input_is_rejected() {
        use base64::{engine::general_purpose::STANDARD, Engine as _};

        let mut raw = RawBatchRecord::from(&sample_record());
        raw.public_input = STANDARD.encode([9u8; 16]);
        assert!(matches!(
            raw.decode(),
            Err(DecodeError::DigestLength {
                batch: 7,
                field: "batch_commitment",
                len: 16
            })
        ));
    }

    #[test]
    fn empty_proof_is_rejected() {
        let mut raw = RawBatchRecord::from(&sample_record());
        raw.proof = String::new();
        assert_eq!(raw.decode().unwrap_err(), DecodeError::EmptyProof { batch: 7 });
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(TableFormat::from_path(Path::new("proofs.csv")), TableFormat::Csv);
        assert_eq!(TableFormat::from_path(Path::new("PROOFS.CSV")), TableFormat::Csv);
        assert_eq!(TableFormat::from_path(Path::new("proofs.json")), TableFormat::Json);
        assert_eq!(TableFormat::from_path(Path::new("proofs")), TableFormat::Json);
    }

    #[test]
    fn csv_export_with_json_array_cells_is_read() {
        let record = sample_record();
        let raw = RawBatchRecord::from(&record);
        let csv = format!(
            "batch_number,proof_info,cex_asset_list_commitments,account_tree_roots,batch_commitment\n\
             {},{},\"{}\",\"{}\",{}\n",
            raw.batch_number,
            raw.proof,
            serde_json::to_string(&raw.ledger_commitments).unwrap().replace('"', "\"\""),
            serde_json::to_string(&raw.tree_roots).unwrap().replace('"', "\"\""),
            raw.public_input,
        );
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proofs.csv");
        fs::write(&path, csv).unwrap();

        let rows = read_batch_table(&path).unwrap();
        assert_eq!(rows, vec![raw]);
        assert_eq!(rows[0].decode().unwrap(), record);
    }

    #[test]
    fn csv_cell_that_is_not_a_json_array_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proofs.csv");
        fs::write(
            &path,
            "batch_number,proof_info,cex_asset_list_commitments,account_tree_roots,batch_commitment\n\
             3,AQID,abc,[],AQID\n",
        )
        .unwrap();
        let err = read_batch_table(&path).unwrap_err();
        assert!(format!("{err:#}").contains("batch 3: malformed cex_asset_list_commitments"));
    }

    #[test]
    fn decode_table_stops_at_first_bad_row() {
        let good = RawBatchRecord::from(&sample_record());
        let mut bad = good.clone();
        bad.batch_number = 8;
        bad.proof = "not base64!".into();
        let err = decode_batch_table(&[good, bad]).unwrap_err();
        assert!(matches!(err, DecodeError::Base64 { batch: 8, .. }));
    }
}

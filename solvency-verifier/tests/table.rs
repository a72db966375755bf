use solvency_common::{
    batch::write_batch_table, decode_batch_table, read_batch_table, DecodeError, RawBatchRecord,
};
use solvency_test_fixtures::{sample_chain, Blake3Scheme, RecordingProofSystem};
use solvency_verifier::{verify_chain, ChainVerificationError};

#[test]
fn proof_table_on_disk_replays_like_in_memory_records() {
    let chain = sample_chain();
    let dir = tempfile::tempdir().unwrap();

    for file in ["proofs.json", "proofs.csv"] {
        let path = dir.path().join(file);
        let mut rows: Vec<RawBatchRecord> =
            chain.records.iter().map(RawBatchRecord::from).collect();
        rows.swap(0, 2);
        write_batch_table(&path, &rows).unwrap();

        let read = read_batch_table(&path).unwrap();
        assert_eq!(read, rows, "{file}");
        let decoded = decode_batch_table(&read).unwrap();
        let stub = RecordingProofSystem::accepting();
        let outcome = verify_chain(&Blake3Scheme, &stub, &(), chain.genesis, decoded).unwrap();
        assert_eq!(outcome.batches_verified, chain.records.len());
    }
}

#[test]
fn malformed_row_surfaces_as_decode_error() {
    let chain = sample_chain();
    let mut rows: Vec<RawBatchRecord> = chain.records.iter().map(RawBatchRecord::from).collect();
    rows[1].tree_roots.pop();

    let err: ChainVerificationError = decode_batch_table(&rows).unwrap_err().into();
    assert_eq!(
        err,
        ChainVerificationError::Decode(DecodeError::PairLength {
            batch: 1,
            field: "account_tree_roots",
            len: 1,
        })
    );
}

mod family_store;
mod provider;
mod snapshot_file;

pub use {
    family_store::FamilyStore,
    provider::{FamilyRecord, JsonFileSource, MemorySource, RecordSource, SourceUpdater},
    snapshot_file::{
        SnapshotFile, decode_snapshot, encode_snapshot, read_snapshot, write_atomically,
    },
};

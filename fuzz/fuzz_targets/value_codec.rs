#![no_main]

use libfuzzer_sys::fuzz_target;
use zk_db::Table;
use zk_db::types::decode_l1_batch_info;
use zk_db::{GerUpdate, L1InfoTreeUpdate, L1InjectedBatch};

fuzz_target!(|data: &[u8]| {
    if let Ok(update) = GerUpdate::decode(data) {
        assert_eq!(update.encode().as_slice(), data);
    }
    if let Ok(update) = L1InfoTreeUpdate::decode(data) {
        assert_eq!(update.encode().as_slice(), data);
    }
    if let Ok(batch) = L1InjectedBatch::decode(data) {
        assert_eq!(batch.encode(), data);
    }
    if let Ok(info) = decode_l1_batch_info(Table::L1Verifications, 0, 0, data) {
        assert_eq!(info.encode_value(), data);
    }
});

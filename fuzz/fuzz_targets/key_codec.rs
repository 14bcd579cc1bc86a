#![no_main]

use libfuzzer_sys::fuzz_target;
use zk_db::keys::{bytes_to_uint64, concat_ger_key, concat_key, split_ger_key, split_key};

fuzz_target!(|data: &[u8]| {
    if let Ok(v) = bytes_to_uint64(data) {
        assert_eq!(v.to_be_bytes().as_slice(), data);
    }
    if let Ok((a, b)) = split_key(data) {
        assert_eq!(concat_key(a, b).as_slice(), data);
    }
    if let Ok((block, l1_hash)) = split_ger_key(data) {
        assert_eq!(concat_ger_key(block, l1_hash.as_ref()), data);
    }
});

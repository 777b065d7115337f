#![no_main]

use courier_rpc::FacadeRequest;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _: Result<(FacadeRequest, usize), _> =
        bincode::serde::decode_from_slice(data, bincode::config::legacy());
});

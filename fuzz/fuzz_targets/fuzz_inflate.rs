#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // errors are expected on garbage; panics and OOM are not
    let _ = tarflate::deflate_decompress(data);
});

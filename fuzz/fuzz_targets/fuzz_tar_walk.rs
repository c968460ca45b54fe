#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(entries) = tarflate::tar_walk(data) {
        // resolved names and data slices must always be consistent
        for entry in entries {
            assert!(entry.data.len() == entry.info.size);
        }
    }
});

#![no_main]
use libfuzzer_sys::fuzz_target;

// The validator must reject arbitrary bytes with an error, never a panic.
fuzz_target!(|data: &[u8]| {
    let _ = h1_oracle::response::parse_head(data);
});

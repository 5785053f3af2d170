#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let lines: Vec<String> = text.split('\n').map(|l| l.to_string()).collect();
        let _ = h1_oracle::response::requests_close(&lines);
    }
});

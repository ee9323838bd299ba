#![no_main]
use ibwatch::device::parse_counter;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Malformed counter files must yield errors, never panics
        let _ = parse_counter(input);
    }
});

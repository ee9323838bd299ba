#![no_main]
use ibwatch::validation::{validate_device_name, validate_file_path};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if validate_device_name(input).is_ok() {
            assert!(!input.contains('/'));
            assert!(!input.contains(".."));
        }
        let _ = validate_file_path(input);
    }
});

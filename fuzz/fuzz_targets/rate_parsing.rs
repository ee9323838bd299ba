#![no_main]
use ibwatch::units::parse_rate_gbps;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let gbps = parse_rate_gbps(Some(input));
        assert!(gbps.is_finite() && gbps >= 0.0);
    }
});

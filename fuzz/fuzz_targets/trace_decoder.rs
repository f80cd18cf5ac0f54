#![no_main]

use libfuzzer_sys::fuzz_target;
use frontera::trace::TraceSet;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(traces) = TraceSet::from_json_str(input) {
            assert_eq!(
                traces.total_accesses(),
                traces.iter().map(|(_, t)| t.len()).sum::<usize>()
            );
        }
    }
});

#![no_main]

use libfuzzer_sys::fuzz_target;
use frontera::filter::ControllerFilter;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Must reject or accept, never panic
        if let Ok(filter) = ControllerFilter::from_expr(input) {
            let _ = filter.should_analyze(input);
        }
    }
});

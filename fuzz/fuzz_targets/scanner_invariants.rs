#![no_main]

use frontera::decomposition::Decomposition;
use frontera::scanner::scan_controller;
use frontera::trace::{Access, AccessTrace};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|accesses: Vec<Access>| {
    let decomposition = Decomposition::from_clusters(
        (0..4i64).map(|c| (c, (0..64i64).filter(|e| e.rem_euclid(4) == c).collect())),
    );
    let trace = AccessTrace::new(accesses);
    let scan = scan_controller("fuzz", &trace, &decomposition);

    assert!(scan.costly_count() <= trace.len());
    assert_eq!(trace.is_empty(), scan.events.is_empty());
    for event in &scan.events {
        assert!(scan.accesses.costly_mode(event.access.entity).is_some());
    }
    if let Some(first) = trace.accesses().first() {
        assert!(scan.is_costly(0));
        assert!(scan.accesses.costly_mode(first.entity).is_some());
    }
});

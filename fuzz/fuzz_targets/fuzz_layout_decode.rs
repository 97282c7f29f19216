#![no_main]

use devdeck_layout::ScopeKey;
use devdeck_layout::persistence::{decode, encode};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Persisted documents come from disk and may be arbitrary bytes.
    // Decoding must never panic, and anything accepted must be clean.
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let scope = ScopeKey::project("fuzz");
    let Ok(state) = decode(&scope, text) else {
        return;
    };

    let report = state.invariant_report();
    assert!(!report.has_errors(), "accepted invalid layout: {:?}", report.issues);
    assert!(state.panels().iter().all(|p| !p.has_running_process));
    assert!(state.panels().iter().all(|p| p.content.handle().is_none()));
    assert!(state.next_id() > 0);

    // Re-encoding an accepted document is a fixed point.
    let json = encode(&scope, &state).expect("accepted state re-encodes");
    let again = decode(&scope, &json).expect("re-encoded state decodes");
    assert_eq!(again, state);
});

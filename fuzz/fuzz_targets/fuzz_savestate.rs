//! Fuzz target for save state decoding.
//!
//! Arbitrary bytes must either decode and restore cleanly or be rejected
//! with an error; a decoded state must survive a second round trip.

#![no_main]

use libfuzzer_sys::fuzz_target;
use moog_source::{BenchHost, SaveState, SourceMachine};

fuzz_target!(|data: &[u8]| {
    let Ok(state) = SaveState::deserialize(data) else {
        return;
    };

    let bytes = state.serialize();
    let again = SaveState::deserialize(&bytes).expect("re-encoded state must decode");
    assert_eq!(again.serialize(), bytes);

    let mut machine = SourceMachine::new(BenchHost::new());
    if machine.load_state(&state).is_ok() {
        machine.run_pending();
    }
});

#![no_main]

use libfuzzer_sys::fuzz_target;
use seedshard_shamir::combine_mnemonics;

fuzz_target!(|data: &[u8]| {
    // Feed newline-separated word soup through the full combine path.
    // Recovery must reject malformed input with an error, never panic.
    if let Ok(s) = std::str::from_utf8(data) {
        let mnemonics: Vec<&str> = s.lines().collect();
        let _ = combine_mnemonics(&mnemonics, "");
    }
});

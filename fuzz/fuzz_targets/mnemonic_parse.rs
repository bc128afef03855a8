#![no_main]

use libfuzzer_sys::fuzz_target;
use seedshard_shamir::Slip39Share;

fuzz_target!(|data: &[u8]| {
    // Try parsing arbitrary bytes as a UTF-8 string, then as a SLIP-39
    // share mnemonic. from_mnemonic must always return Ok or Err, never
    // panic.
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(share) = Slip39Share::from_mnemonic(s) {
            // a successfully decoded share must re-encode
            let _ = share.to_mnemonic();
        }
    }
});

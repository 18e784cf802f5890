//! Fuzz target for Descriptor decoding.
//!
//! Arbitrary bytes must never panic the decoder, and anything it accepts
//! must re-encode to the same bytes.

#![no_main]

use libfuzzer_sys::fuzz_target;
use semroute::descriptor::{decode, encode, validate};

fuzz_target!(|data: &[u8]| {
    let decoded = decode(data);
    assert_eq!(decoded.is_ok(), validate(data).is_ok());
    if let Ok(descriptor) = decoded {
        let bytes = encode(&descriptor).expect("accepted descriptor must encode");
        assert_eq!(bytes.as_slice(), data);
    }
});

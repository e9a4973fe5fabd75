//! Fuzz target: `ResponseDecoder::feed`
//!
//! Drives arbitrary byte sequences from the hub side into the streaming
//! response decoder, split at a fuzzer-chosen point, and checks that
//! decoded payloads never exceed the one-byte length field.
//!
//! cargo fuzz run fuzz_response_decoder

#![no_main]

use collarctl::serial::protocol::ResponseDecoder;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&split, stream)) = data.split_first() else {
        return;
    };
    let split = usize::from(split).min(stream.len());

    let mut decoder = ResponseDecoder::new();
    decoder.feed(&stream[..split]);
    decoder.feed(&stream[split..]);
    while let Some(response) = decoder.next_response() {
        assert!(response.payload.len() <= usize::from(u8::MAX));
    }

    // After a reset the decoder must accept bytes cleanly again.
    decoder.reset();
    assert!(!decoder.is_mid_frame());
    decoder.feed(stream);
});

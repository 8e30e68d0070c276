#![no_main]

use cas_scale::scale::frame::{calculate_bcc, decode_frame, parse_weight};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // The decoder should reject malformed input without panicking
    let _ = decode_frame(data);
    let _ = parse_weight(data);

    // Force a valid envelope and checksum so the field decoders get exercised
    if data.len() >= 10 {
        let mut frame = [0u8; 15];
        frame[0] = 0x01;
        frame[1] = 0x02;
        frame[2..12].copy_from_slice(&data[..10]);
        frame[12] = calculate_bcc(&frame[2..12]);
        frame[13] = 0x03;
        frame[14] = 0x04;
        let _ = decode_frame(&frame);
    }
});

//! Lookup tables shared by the effects.

/// Oscillator waveforms: sine, ramp down, square, random. 64 points each, amplitude 255.
pub const VIBRATO_TABLE: [[i16; 64]; 4] = [
    [
        0, 24, 49, 74, 97, 120, 141, 161, 180, 197, 212, 224, 235, 244, 250, 253,
        255, 253, 250, 244, 235, 224, 212, 197, 180, 161, 141, 120, 97, 74, 49, 24,
        0, -24, -49, -74, -97, -120, -141, -161, -180, -197, -212, -224, -235, -244, -250, -253,
        -255, -253, -250, -244, -235, -224, -212, -197, -180, -161, -141, -120, -97, -74, -49, -24,
    ],
    [
        255, 246, 238, 230, 222, 214, 206, 198, 190, 182, 173, 165, 157, 149, 141, 133,
        125, 117, 109, 100, 92, 84, 76, 68, 60, 52, 44, 36, 27, 19, 11, 3,
        -4, -12, -20, -28, -36, -45, -53, -61, -69, -77, -85, -93, -101, -109, -118, -126,
        -134, -142, -150, -158, -166, -174, -182, -191, -199, -207, -215, -223, -231, -239, -247, -255,
    ],
    [
        255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255,
        255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255,
        -255, -255, -255, -255, -255, -255, -255, -255, -255, -255, -255, -255, -255, -255, -255, -255,
        -255, -255, -255, -255, -255, -255, -255, -255, -255, -255, -255, -255, -255, -255, -255, -255,
    ],
    [
        81, -123, 63, -138, 153, -84, 208, 97, 160, -195, 173, -94, 162, 30, 34, -135,
        -102, -82, 24, -141, -167, -137, -232, -229, 224, 145, -212, 181, 60, 64, -55, 36,
        -26, 46, 120, 163, -132, -16, -208, -87, 179, 122, 244, 91, 179, -175, 202, -207,
        168, 191, -241, 236, -192, -146, -185, 12, 6, 81, 214, 151, 196, -10, -95, -155,
    ],
];

/// Oscillator value for a waveform (low two bits) and table position.
pub fn waveform_value(waveform: u8, pos: u8) -> i32 {
    i32::from(VIBRATO_TABLE[usize::from(waveform & 3)][usize::from(pos & 63)])
}

/// Invert loop speed per parameter nibble.
pub const INVERT_LOOP_TABLE: [u16; 16] = [0, 5, 6, 7, 8, 10, 11, 13, 16, 19, 22, 26, 32, 43, 64, 128];

/// S3M retrigger volume change for the high parameter nibble.
pub fn s3m_retrig_volume(kind: u8, volume: i32) -> i32 {
    match kind & 0x0f {
        1 => volume - 1,
        2 => volume - 2,
        3 => volume - 4,
        4 => volume - 8,
        5 => volume - 16,
        6 => volume * 2 / 3,
        7 => volume / 2,
        9 => volume + 1,
        0xa => volume + 2,
        0xb => volume + 4,
        0xc => volume + 8,
        0xd => volume + 16,
        0xe => volume * 3 / 2,
        0xf => volume * 2,
        _ => volume,
    }
}

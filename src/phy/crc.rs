// Frame check sequence and nibble packing.
// FCS: CRC-16/KERMIT (ITU-T polynomial x^16 + x^12 + x^5 + 1, reflected,
// init 0), transmitted least significant byte first.

const FCS_POLYNOMIAL_REFLECTED: u16 = 0x8408;

/// Calculate the FCS over `data`
pub fn calculate_fcs(data: &[u8]) -> u16 {
    let mut crc: u16 = 0x0000;

    for &byte in data {
        crc ^= byte as u16;
        for _ in 0..8 {
            if (crc & 0x0001) != 0 {
                crc = (crc >> 1) ^ FCS_POLYNOMIAL_REFLECTED;
            } else {
                crc >>= 1;
            }
        }
    }

    crc
}

/// Verify the FCS of `data`
pub fn verify_fcs(data: &[u8], expected: u16) -> bool {
    calculate_fcs(data) == expected
}

/// Split bytes into 4-bit symbols, low nibble first
pub fn bytes_to_symbols(bytes: &[u8]) -> Vec<u8> {
    let mut symbols = Vec::with_capacity(bytes.len() * 2);
    for &byte in bytes {
        symbols.push(byte & 0x0F);
        symbols.push(byte >> 4);
    }
    symbols
}

/// Join low/high nibble pairs back into bytes. A trailing odd nibble is
/// dropped.
pub fn symbols_to_bytes(symbols: &[u8]) -> Vec<u8> {
    symbols
        .chunks_exact(2)
        .map(|pair| (pair[0] & 0x0F) | (pair[1] << 4))
        .collect()
}

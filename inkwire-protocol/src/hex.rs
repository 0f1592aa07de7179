//! Hex transport encoding.
//!
//! Binary payloads travel as lowercase hex so that every chunk is one
//! printable line. Decoding accepts either case.

/// Lowercase hex digits
const DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Errors from hex decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HexError {
    /// Input has an odd number of characters
    OddLength,
    /// Input contains a character outside `[0-9a-fA-F]`
    InvalidChar { index: usize },
    /// Output buffer cannot hold the result
    BufferTooSmall,
}

impl HexError {
    /// Short reason sent back over the wire in `ERR:<reason>`
    pub fn reason(&self) -> &'static str {
        match self {
            HexError::OddLength => "odd-length string",
            HexError::InvalidChar { .. } => "non-hexadecimal digit found",
            HexError::BufferTooSmall => "output buffer too small",
        }
    }
}

impl core::fmt::Display for HexError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            HexError::InvalidChar { index } => write!(f, "{} at {index}", self.reason()),
            _ => f.write_str(self.reason()),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for HexError {}

fn nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Check that `hex` is well formed and return its decoded length
pub fn validate(hex: &[u8]) -> Result<usize, HexError> {
    if hex.len() % 2 != 0 {
        return Err(HexError::OddLength);
    }
    if let Some(index) = hex.iter().position(|&c| nibble(c).is_none()) {
        return Err(HexError::InvalidChar { index });
    }
    Ok(hex.len() / 2)
}

/// Decode `hex` into the start of `out`
///
/// The whole input is validated before anything is written, so a
/// malformed line never leaves partial output behind.
pub fn decode_into(hex: &[u8], out: &mut [u8]) -> Result<usize, HexError> {
    let len = validate(hex)?;
    if out.len() < len {
        return Err(HexError::BufferTooSmall);
    }
    for (byte, pair) in out.iter_mut().zip(hex.chunks_exact(2)) {
        // Validated above
        let hi = nibble(pair[0]).unwrap_or(0);
        let lo = nibble(pair[1]).unwrap_or(0);
        *byte = (hi << 4) | lo;
    }
    Ok(len)
}

/// Encode `bytes` as lowercase hex into `out`
pub fn encode_into<'a>(bytes: &[u8], out: &'a mut [u8]) -> Result<&'a str, HexError> {
    let len = bytes.len() * 2;
    if out.len() < len {
        return Err(HexError::BufferTooSmall);
    }
    for (pair, &byte) in out.chunks_exact_mut(2).zip(bytes) {
        pair[0] = DIGITS[(byte >> 4) as usize];
        pair[1] = DIGITS[(byte & 0x0F) as usize];
    }
    core::str::from_utf8(&out[..len]).map_err(|_| HexError::BufferTooSmall)
}

/// Encode `bytes` as a lowercase hex string
#[cfg(any(test, feature = "std"))]
pub fn encode(bytes: &[u8]) -> std::string::String {
    let mut out = std::vec![0u8; bytes.len() * 2];
    for (pair, &byte) in out.chunks_exact_mut(2).zip(bytes) {
        pair[0] = DIGITS[(byte >> 4) as usize];
        pair[1] = DIGITS[(byte & 0x0F) as usize];
    }
    // Only ASCII digits were written
    out.into_iter().map(char::from).collect()
}

/// Decode a hex string into a new buffer
#[cfg(any(test, feature = "std"))]
pub fn decode(hex: &str) -> Result<std::vec::Vec<u8>, HexError> {
    let mut out = std::vec![0u8; validate(hex.as_bytes())?];
    decode_into(hex.as_bytes(), &mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FRAME_SIZE;
    use proptest::prelude::*;

    #[test]
    fn test_encode_lowercase() {
        let mut out = [0u8; 8];
        assert_eq!(encode_into(&[0x00, 0xAB, 0x7F, 0xFF], &mut out), Ok("00ab7fff"));
    }

    #[test]
    fn test_decode_either_case() {
        let mut out = [0u8; 2];
        assert_eq!(decode_into(b"aBcD", &mut out), Ok(2));
        assert_eq!(out, [0xAB, 0xCD]);
    }

    #[test]
    fn test_decode_odd_length() {
        let mut out = [0u8; 4];
        assert_eq!(decode_into(b"abc", &mut out), Err(HexError::OddLength));
    }

    #[test]
    fn test_decode_invalid_char_writes_nothing() {
        let mut out = [0x55u8; 2];
        assert_eq!(
            decode_into(b"00zz", &mut out),
            Err(HexError::InvalidChar { index: 2 })
        );
        assert_eq!(out, [0x55, 0x55]);
    }

    #[test]
    fn test_decode_rejects_small_buffer() {
        let mut out = [0u8; 1];
        assert_eq!(decode_into(b"0102", &mut out), Err(HexError::BufferTooSmall));
    }

    #[test]
    fn test_owned_decode() {
        assert_eq!(decode(&encode(&[0x12, 0xFE, 0x00])), Ok(vec![0x12, 0xFE, 0x00]));
        assert_eq!(decode(""), Ok(Vec::new()));
        assert_eq!(decode("0a1"), Err(HexError::OddLength));
        assert_eq!(decode("0g"), Err(HexError::InvalidChar { index: 1 }));
    }

    #[test]
    fn test_reasons_match_wire_text() {
        assert_eq!(HexError::OddLength.reason(), "odd-length string");
        assert_eq!(
            HexError::InvalidChar { index: 0 }.reason(),
            "non-hexadecimal digit found"
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_frame_survives_hex_transport(seed in any::<u64>()) {
            let mut state = seed;
            let payload: Vec<u8> = (0..FRAME_SIZE)
                .map(|_| {
                    state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                    (state >> 56) as u8
                })
                .collect();

            let mut hex = vec![0u8; FRAME_SIZE * 2];
            let encoded = encode_into(&payload, &mut hex).unwrap();
            prop_assert!(encoded.bytes().all(|c| matches!(c, b'0'..=b'9' | b'a'..=b'f')));

            let mut decoded = vec![0u8; FRAME_SIZE];
            prop_assert_eq!(decode_into(encoded.as_bytes(), &mut decoded), Ok(FRAME_SIZE));
            prop_assert_eq!(decoded, payload);
        }
    }
}

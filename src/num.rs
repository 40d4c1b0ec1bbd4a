//! The canonical signed-integer byte encoding used by numeric opcodes.
//!
//! Numbers on the stack are little-endian sign-magnitude: the top bit of the
//! final byte is the sign, the remaining bits are the magnitude. The encoding
//! is minimal, with no redundant high zero or sign-extension bytes, and zero
//! is the empty byte sequence.

use crate::script_error::ScriptNumError;

/// Arithmetic opcodes accept operands of at most this many bytes. Results may
/// transiently exceed it, but feeding such a result back into a numeric
/// opcode re-validates it against this bound.
pub const DEFAULT_MAX_NUM_SIZE: usize = 4;

/// Decode a script number from its byte form.
///
/// `max_size` defaults to [`DEFAULT_MAX_NUM_SIZE`]; OP_CHECKLOCKTIMEVERIFY
/// and OP_CHECKSEQUENCEVERIFY pass 5 so lock times beyond 2**31-1 stay
/// representable.
pub fn parse_num(
    vch: &[u8],
    require_minimal: bool,
    max_size: Option<usize>,
) -> Result<i64, ScriptNumError> {
    // An i64 holds at most eight encoded bytes, whatever bound the caller asks
    // for.
    let max_num_size = max_size.unwrap_or(DEFAULT_MAX_NUM_SIZE).min(8);
    if vch.len() > max_num_size {
        return Err(ScriptNumError::Overflow {
            max_num_size,
            actual: vch.len(),
        });
    }
    if require_minimal && !is_minimal_vch(vch) {
        return Err(ScriptNumError::NonMinimalEncoding);
    }

    match vch.last() {
        None => Ok(0),
        Some(vch_back) => {
            let mut result: i64 = 0;
            for (i, vch_i) in vch.iter().enumerate() {
                result |= i64::from(*vch_i) << (8 * i);
            }

            // If the most significant byte carries the sign bit, remove it
            // from the magnitude and negate.
            if vch_back & 0x80 != 0 {
                return Ok(-(result & !(0x80 << (8 * (vch.len() - 1)))));
            }

            Ok(result)
        }
    }
}

/// Encode a value as its unique minimal byte form.
pub fn serialize_num(value: i64) -> Vec<u8> {
    if value == 0 {
        return Vec::new();
    }

    let mut result = Vec::new();
    let neg = value < 0;
    let mut absvalue = value.unsigned_abs();

    while absvalue != 0 {
        result.push((absvalue & 0xff) as u8);
        absvalue >>= 8;
    }

    // - If the most significant byte is >= 0x80 and the value is positive,
    //   push a new zero-byte to make the significant byte < 0x80 again.
    // - If the most significant byte is >= 0x80 and the value is negative,
    //   push a new 0x80 byte that will be popped off when converting back.
    // - If the most significant byte is < 0x80 and the value is negative,
    //   set its high bit to mark the sign.
    if result.last().map_or(true, |last| last & 0x80 != 0) {
        result.push(if neg { 0x80 } else { 0 });
    } else if neg {
        if let Some(last) = result.last_mut() {
            *last |= 0x80;
        }
    }

    result
}

/// Whether `vch` is the minimal encoding of some number no wider than
/// `max_size` bytes.
pub fn is_minimally_encoded(vch: &[u8], max_size: usize) -> bool {
    vch.len() <= max_size && is_minimal_vch(vch)
}

fn is_minimal_vch(vch: &[u8]) -> bool {
    match vch.last() {
        None => true,
        Some(last) => {
            // If the most-significant-byte - excluding the sign bit - is
            // zero, the encoding is not minimal. This also rejects the
            // negative-zero encoding, 0x80. One exception: when the most
            // significant bit of the second-to-last byte is set, dropping the
            // last byte would corrupt the sign (e.g. +-255 encode to 0xff00
            // and 0xff80).
            last & 0x7f != 0 || (vch.len() > 1 && vch[vch.len() - 2] & 0x80 != 0)
        }
    }
}

/// Rewrite a byte sequence into the minimal encoding of the number it
/// represents, dropping redundant zero/sign-extension bytes. The numeric
/// value is preserved exactly; this is the OP_BIN2NUM transform.
pub fn minimally_encode(vch: &[u8]) -> Vec<u8> {
    if is_minimal_vch(vch) {
        return vch.to_vec();
    }

    let sign = vch.last().map_or(0, |last| last & 0x80);

    let mut result: Vec<u8> = vch.to_vec();
    if let Some(last) = result.last_mut() {
        *last &= 0x7f;
    }
    while result.last() == Some(&0) {
        result.pop();
        // The dropped byte's predecessor must be free to carry the sign.
        if result.last().map_or(false, |last| last & 0x80 != 0) {
            result.push(0);
            break;
        }
    }

    if result.is_empty() {
        // Any encoding of zero, negative zero included, minimizes to empty.
        return result;
    }

    if let Some(last) = result.last_mut() {
        *last |= sign;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_is_empty() {
        assert_eq!(serialize_num(0), Vec::<u8>::new());
        assert_eq!(parse_num(&[], true, None), Ok(0));
    }

    #[test]
    fn known_encodings() {
        assert_eq!(serialize_num(256), vec![0x00, 0x01]);
        assert_eq!(serialize_num(-256), vec![0x00, 0x81]);
        assert_eq!(serialize_num(1), vec![0x01]);
        assert_eq!(serialize_num(-1), vec![0x81]);
        assert_eq!(serialize_num(127), vec![0x7f]);
        assert_eq!(serialize_num(128), vec![0x80, 0x00]);
        assert_eq!(serialize_num(-128), vec![0x80, 0x80]);
        assert_eq!(hex::encode(serialize_num(256)), "0001");
    }

    #[test]
    fn non_minimal_rejected_only_when_requested() {
        // The value 1 padded with a redundant zero byte.
        let padded = [0x01, 0x00];
        assert_eq!(
            parse_num(&padded, true, None),
            Err(ScriptNumError::NonMinimalEncoding)
        );
        assert_eq!(parse_num(&padded, false, None), Ok(1));

        // Negative zero.
        assert_eq!(
            parse_num(&[0x80], true, None),
            Err(ScriptNumError::NonMinimalEncoding)
        );
        assert_eq!(parse_num(&[0x80], false, None), Ok(0));
    }

    #[test]
    fn overflow_respects_max_size() {
        let five = [0x01, 0x02, 0x03, 0x04, 0x05];
        assert_eq!(
            parse_num(&five, false, None),
            Err(ScriptNumError::Overflow {
                max_num_size: 4,
                actual: 5
            })
        );
        assert!(parse_num(&five, false, Some(5)).is_ok());
    }

    #[test]
    fn wide_inputs_overflow_instead_of_wrapping() {
        // Nine bytes never fit an i64, no matter how generous the caller's
        // bound is.
        assert_eq!(
            parse_num(&[0xff; 9], false, Some(9)),
            Err(ScriptNumError::Overflow {
                max_num_size: 8,
                actual: 9
            })
        );
        assert_eq!(
            parse_num(&[0xff; 8], false, Some(9)),
            Ok(-0x7fff_ffff_ffff_ffff)
        );
    }

    #[test]
    fn minimally_encode_strips_padding() {
        assert_eq!(minimally_encode(&[0x01, 0x00]), vec![0x01]);
        assert_eq!(minimally_encode(&[0x80]), Vec::<u8>::new());
        assert_eq!(minimally_encode(&[0x00, 0x00]), Vec::<u8>::new());
        // 255 padded out to three bytes keeps its guard byte.
        assert_eq!(minimally_encode(&[0xff, 0x00, 0x00]), vec![0xff, 0x00]);
        // -255: sign bit travels back to the guard byte.
        assert_eq!(minimally_encode(&[0xff, 0x00, 0x80]), vec![0xff, 0x80]);
        assert_eq!(minimally_encode(&[0x01, 0x80]), vec![0x81]);
    }

    proptest! {
        #[test]
        fn round_trips_within_four_bytes(v in -0x7fffffffi64..=0x7fffffff) {
            let bytes = serialize_num(v);
            prop_assert!(bytes.len() <= 4);
            prop_assert!(is_minimally_encoded(&bytes, 4));
            prop_assert_eq!(parse_num(&bytes, true, None), Ok(v));
        }

        #[test]
        fn minimally_encode_agrees_with_parse(bytes in proptest::collection::vec(any::<u8>(), 0..=8)) {
            let minimal = minimally_encode(&bytes);
            prop_assert_eq!(
                parse_num(&minimal, true, Some(8)).unwrap(),
                parse_num(&bytes, false, Some(8)).unwrap()
            );
        }
    }
}

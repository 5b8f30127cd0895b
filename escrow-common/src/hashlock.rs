use sha3::{Digest, Keccak256};

use crate::error::EscrowError;

/// All commitments in the protocol are 32 bytes.
pub const HASH_LEN: usize = 32;

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Keccak256::digest(data));
    out
}

/// Decode a hex-encoded 32-byte commitment (order hash, hashlock, Merkle
/// root). The all-zero value is reserved and rejected.
pub fn decode_hash32(hex_value: &str, err: EscrowError) -> Result<[u8; 32], EscrowError> {
    let bytes = hex::decode(hex_value.trim_start_matches("0x")).map_err(|_| err)?;
    if bytes.len() != HASH_LEN {
        return Err(err);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    if out == [0u8; 32] {
        return Err(err);
    }
    Ok(out)
}

/// Decode a hex-encoded 32-byte secret preimage.
pub fn decode_secret(hex_value: &str) -> Result<[u8; 32], EscrowError> {
    let bytes = hex::decode(hex_value.trim_start_matches("0x"))
        .map_err(|_| EscrowError::InvalidSecret)?;
    if bytes.len() != HASH_LEN {
        return Err(EscrowError::InvalidSecret);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// `keccak256(secret) == hashlock`, the single-fill settlement gate.
pub fn verify_hashlock(secret: &[u8; 32], hashlock: &[u8; 32]) -> Result<(), EscrowError> {
    if keccak256(secret) == *hashlock {
        Ok(())
    } else {
        Err(EscrowError::InvalidSecret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // keccak256 of the empty input, the standard reference vector.
    const EMPTY_KECCAK: &str = "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470";

    #[test]
    fn keccak_reference_vector() {
        assert_eq!(hex::encode(keccak256(b"")), EMPTY_KECCAK);
    }

    #[test]
    fn hashlock_round_trip() {
        let secret = [0x42u8; 32];
        let lock = keccak256(&secret);
        assert!(verify_hashlock(&secret, &lock).is_ok());

        let mut wrong = secret;
        wrong[0] ^= 1;
        assert_eq!(
            verify_hashlock(&wrong, &lock),
            Err(EscrowError::InvalidSecret)
        );
    }

    #[test]
    fn decode_rejects_short_and_zero() {
        let err = EscrowError::InvalidOrderHash;
        assert_eq!(decode_hash32("abcd", err), Err(err));
        assert_eq!(decode_hash32(&"00".repeat(32), err), Err(err));
        assert_eq!(decode_hash32("zz", err), Err(err));

        let ok = "11".repeat(32);
        assert_eq!(decode_hash32(&ok, err).unwrap(), [0x11u8; 32]);
        // 0x prefix tolerated on the wire
        assert_eq!(decode_hash32(&format!("0x{ok}"), err).unwrap(), [0x11u8; 32]);
    }

    #[test]
    fn secret_must_be_exactly_32_bytes() {
        assert_eq!(
            decode_secret(&"22".repeat(31)),
            Err(EscrowError::InvalidSecret)
        );
        assert_eq!(
            decode_secret(&"22".repeat(33)),
            Err(EscrowError::InvalidSecret)
        );
        assert_eq!(decode_secret(&"22".repeat(32)).unwrap(), [0x22u8; 32]);
    }
}

//! Canonical byte codecs for Ristretto scalars and points.
//!
//! Every wire format in this crate is a fixed-length concatenation of 32-byte
//! group elements (plus, for proof-carrying types, a fixed number of proof
//! scalars). Decoding always runs length check, then structural decode, then
//! algebraic validity; no arithmetic happens on bytes that have not passed all
//! three. There is no trusted-bytes bypass.

use curve25519_dalek::{
    ristretto::{CompressedRistretto, RistrettoPoint},
    scalar::Scalar,
    traits::IsIdentity,
};

use crate::errors::Error;

/// Length of the canonical encoding of a scalar or a point.
pub const GROUP_ELEMENT_LEN: usize = 32;

/// Decode a scalar from its canonical 32-byte little-endian encoding.
///
/// Policy is reject, not reduce: encodings greater than or equal to the group
/// order fail with [`Error::InvalidInput`]. The check runs in constant time
/// with respect to the input value.
pub fn decode_scalar(bytes: &[u8; GROUP_ELEMENT_LEN]) -> Result<Scalar, Error> {
    Option::<Scalar>::from(Scalar::from_canonical_bytes(*bytes)).ok_or(Error::InvalidInput)
}

/// Decode a point from its canonical 32-byte Ristretto encoding.
///
/// Rejects non-canonical encodings and anything that is not an element of the
/// prime-order Ristretto group. Invalid points are never "corrected".
pub fn decode_point(bytes: &[u8; GROUP_ELEMENT_LEN]) -> Result<RistrettoPoint, Error> {
    CompressedRistretto(*bytes)
        .decompress()
        .ok_or(Error::InvalidInput)
}

/// Canonical encoding of a scalar. Deterministic: equal scalars always
/// serialize identically.
pub fn encode_scalar(scalar: &Scalar) -> [u8; GROUP_ELEMENT_LEN] {
    scalar.to_bytes()
}

/// Canonical encoding of a point. Deterministic: equal points always
/// serialize identically.
pub fn encode_point(point: &RistrettoPoint) -> [u8; GROUP_ELEMENT_LEN] {
    point.compress().to_bytes()
}

/// Cursor over a fixed-length wire buffer, consuming one 32-byte element at a
/// time. Construction fails unless the buffer is exactly the expected length,
/// so composite decoders reject wrong-length input before touching any bytes.
pub(crate) struct Decoder<'a> {
    buf: &'a [u8],
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8], expected_len: usize) -> Result<Self, Error> {
        if buf.len() != expected_len {
            return Err(Error::InvalidInput);
        }
        Ok(Self { buf })
    }

    fn chunk(&mut self) -> Result<&'a [u8; GROUP_ELEMENT_LEN], Error> {
        if self.buf.len() < GROUP_ELEMENT_LEN {
            return Err(Error::InvalidInput);
        }
        let (head, tail) = self.buf.split_at(GROUP_ELEMENT_LEN);
        self.buf = tail;
        // NOTE: Unwrap will never panic, head is exactly GROUP_ELEMENT_LEN bytes.
        Ok(head.try_into().unwrap())
    }

    pub fn scalar(&mut self) -> Result<Scalar, Error> {
        decode_scalar(self.chunk()?)
    }

    pub fn point(&mut self) -> Result<RistrettoPoint, Error> {
        decode_point(self.chunk()?)
    }

    /// Decode a point, additionally rejecting the identity element. Used for
    /// components that an honest party can never produce as the identity,
    /// e.g. ElGamal first components and the credential point U.
    pub fn nonidentity_point(&mut self) -> Result<RistrettoPoint, Error> {
        let point = self.point()?;
        if point.is_identity() {
            return Err(Error::InvalidInput);
        }
        Ok(point)
    }

    pub fn remaining(&self) -> &'a [u8] {
        self.buf
    }
}

/// Cursor writing 32-byte elements into a fixed-length output buffer.
pub(crate) struct Encoder<'a> {
    buf: &'a mut [u8],
    at: usize,
}

impl<'a> Encoder<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, at: 0 }
    }

    pub fn scalar(&mut self, scalar: &Scalar) -> &mut Self {
        self.put(encode_scalar(scalar))
    }

    pub fn point(&mut self, point: &RistrettoPoint) -> &mut Self {
        self.put(encode_point(point))
    }

    pub fn bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf[self.at..self.at + bytes.len()].copy_from_slice(bytes);
        self.at += bytes.len();
        self
    }

    fn put(&mut self, chunk: [u8; GROUP_ELEMENT_LEN]) -> &mut Self {
        self.bytes(&chunk)
    }
}

#[cfg(test)]
mod test {
    use curve25519_dalek::{constants::RISTRETTO_BASEPOINT_POINT, Scalar};

    use super::{decode_point, decode_scalar, encode_point, encode_scalar, Decoder};
    use crate::errors::Error;

    #[test]
    fn scalar_round_trip() {
        let s = Scalar::from(7654321u64);
        assert_eq!(decode_scalar(&encode_scalar(&s)).unwrap(), s);
    }

    #[test]
    fn point_round_trip() {
        let p = RISTRETTO_BASEPOINT_POINT * Scalar::from(99u64);
        assert_eq!(decode_point(&encode_point(&p)).unwrap(), p);
    }

    #[test]
    fn non_canonical_scalar_rejected() {
        // The group order minus one is canonical; the all-ones pattern above
        // the order is not.
        let bytes = [0xffu8; 32];
        let Err(Error::InvalidInput) = decode_scalar(&bytes) else {
            panic!("non-canonical scalar decoded");
        };
    }

    #[test]
    fn invalid_point_rejected() {
        // Bit pattern that does not decompress to a Ristretto element.
        let mut bytes = [0u8; 32];
        bytes[0] = 0x01;
        let Err(Error::InvalidInput) = decode_point(&bytes) else {
            panic!("invalid point decoded");
        };
    }

    #[test]
    fn all_zero_point_is_identity() {
        // The all-zero string is the canonical identity encoding; plain point
        // decode accepts it, the non-identity decoder must not.
        let bytes = [0u8; 64];
        let mut decoder = Decoder::new(&bytes, 64).unwrap();
        decoder.point().unwrap();
        let Err(Error::InvalidInput) = decoder.nonidentity_point() else {
            panic!("identity accepted where a non-identity element is required");
        };
    }

    #[test]
    fn decoder_rejects_wrong_length() {
        let bytes = [0u8; 33];
        let Err(Error::InvalidInput) = Decoder::new(&bytes, 32).map(|_| ()) else {
            panic!("wrong-length buffer accepted");
        };
    }
}

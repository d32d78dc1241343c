//! Pedersen-style commitment to the profile-key attribute.
//!
//! `J1 = M + j * G_j1` commits to the attribute point `M`, `J2 = j * G_j2`
//! pins the nonce. The nonce is derived deterministically from the profile
//! key and owning UID, so one profile key always re-commits to the same
//! value; an issuer can deduplicate commitments without learning anything.

#![allow(non_snake_case)]

use blake2::{Blake2b512, Digest};
use curve25519_dalek::{RistrettoPoint, Scalar};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::{
    attributes::{profile_key_attribute, ProfileKeyBytes, UidBytes},
    errors::Error,
    group::{Decoder, Encoder, GROUP_ELEMENT_LEN},
    params::SystemParams,
};

#[derive(Clone, Copy, Debug)]
pub struct ProfileKeyCommitment {
    pub(crate) J1: RistrettoPoint,
    pub(crate) J2: RistrettoPoint,
}

/// A commitment along with the nonce that opens it. Held by the committing
/// client only; the nonce is zeroized on drop.
pub struct ProfileKeyCommitmentWithSecretNonce {
    pub(crate) j: Scalar,
    pub(crate) commitment: ProfileKeyCommitment,
}

fn commitment_nonce(profile_key: &ProfileKeyBytes, uid: &UidBytes) -> Scalar {
    let mut hasher = Blake2b512::new();
    hasher.update(b"zkcred::commitment::ProfileKeyCommitment::nonce");
    hasher.update(profile_key);
    hasher.update(uid);
    Scalar::from_hash(hasher)
}

impl ProfileKeyCommitmentWithSecretNonce {
    /// Commit to the profile-key attribute of `(profile_key, uid)`.
    pub fn new(profile_key: &ProfileKeyBytes, uid: &UidBytes) -> Self {
        let system = SystemParams::get();
        let M = profile_key_attribute(profile_key, uid);
        let j = commitment_nonce(profile_key, uid);
        Self {
            j,
            commitment: ProfileKeyCommitment {
                J1: M + j * system.G_j1,
                J2: j * system.G_j2,
            },
        }
    }

    pub fn commitment(&self) -> ProfileKeyCommitment {
        self.commitment
    }
}

impl Drop for ProfileKeyCommitmentWithSecretNonce {
    fn drop(&mut self) {
        self.j.zeroize();
    }
}

impl ProfileKeyCommitment {
    pub const LEN: usize = 2 * GROUP_ELEMENT_LEN;

    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let mut decoder = Decoder::new(bytes, Self::LEN)?;
        Ok(Self {
            J1: decoder.point()?,
            J2: decoder.point()?,
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut bytes = [0u8; Self::LEN];
        Encoder::new(&mut bytes).point(&self.J1).point(&self.J2);
        bytes
    }

    /// Check that this commitment opens to `(profile_key, uid)`. The
    /// comparison is constant-time; failure reports only a generic
    /// [`Error::VerificationFailed`].
    pub fn verify(&self, profile_key: &ProfileKeyBytes, uid: &UidBytes) -> Result<(), Error> {
        let expected = ProfileKeyCommitmentWithSecretNonce::new(profile_key, uid);
        let eq = self.J1.ct_eq(&expected.commitment.J1) & self.J2.ct_eq(&expected.commitment.J2);
        match eq.into() {
            true => Ok(()),
            false => Err(Error::VerificationFailed),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{ProfileKeyCommitment, ProfileKeyCommitmentWithSecretNonce};
    use crate::errors::Error;

    #[test]
    fn commitment_round_trip() {
        let commitment = ProfileKeyCommitmentWithSecretNonce::new(&[5u8; 32], &[1u8; 16]);
        let bytes = commitment.commitment().to_bytes();
        let decoded = ProfileKeyCommitment::from_slice(&bytes).unwrap();
        assert_eq!(decoded.to_bytes(), bytes);
    }

    #[test]
    fn commitment_is_deterministic() {
        let a = ProfileKeyCommitmentWithSecretNonce::new(&[5u8; 32], &[1u8; 16]);
        let b = ProfileKeyCommitmentWithSecretNonce::new(&[5u8; 32], &[1u8; 16]);
        assert_eq!(a.commitment().to_bytes(), b.commitment().to_bytes());
    }

    #[test]
    fn verify_success_and_fail() {
        let commitment = ProfileKeyCommitmentWithSecretNonce::new(&[5u8; 32], &[1u8; 16]);
        commitment
            .commitment()
            .verify(&[5u8; 32], &[1u8; 16])
            .unwrap();

        let Err(Error::VerificationFailed) =
            commitment.commitment().verify(&[6u8; 32], &[1u8; 16])
        else {
            panic!("commitment opened with the wrong profile key");
        };
        let Err(Error::VerificationFailed) =
            commitment.commitment().verify(&[5u8; 32], &[2u8; 16])
        else {
            panic!("commitment opened with the wrong uid");
        };
    }

    #[test]
    fn truncated_and_extended_rejected() {
        let bytes = ProfileKeyCommitmentWithSecretNonce::new(&[5u8; 32], &[1u8; 16])
            .commitment()
            .to_bytes();
        let Err(Error::InvalidInput) = ProfileKeyCommitment::from_slice(&bytes[..63]) else {
            panic!("truncated commitment decoded");
        };
        let mut extended = [0u8; 65];
        extended[..64].copy_from_slice(&bytes);
        let Err(Error::InvalidInput) = ProfileKeyCommitment::from_slice(&extended) else {
            panic!("extended commitment decoded");
        };
    }
}

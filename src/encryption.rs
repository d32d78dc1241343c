//! ElGamal encryption of attribute points under a group's key pair.
//!
//! Group members hold [`GroupSecretParams`]; everyone else sees only
//! [`GroupPublicParams`]. Encryption is randomized: every call with fresh
//! randomness yields distinct ciphertext bytes, so presentations of the same
//! credential are unlinkable by their ciphertexts. Decryption and plaintext
//! equality checks are privileged operations of the secret-key holder.

#![allow(non_snake_case)]

use blake2::{Blake2b512, Digest};
use curve25519_dalek::{
    constants::RISTRETTO_BASEPOINT_TABLE, RistrettoPoint, Scalar,
};
use rand_core::CryptoRngCore;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::{
    attributes::{profile_key_attribute, uid_attribute, ProfileKeyBytes, UidBytes},
    errors::Error,
    group::{Decoder, Encoder, GROUP_ELEMENT_LEN},
};

/// Secret half of a group's encryption keys: one key per attribute kind.
pub struct GroupSecretParams {
    pub(crate) a: Scalar,
    pub(crate) b: Scalar,
}

/// Public half of a group's encryption keys.
#[derive(Clone, Copy, Debug)]
pub struct GroupPublicParams {
    pub(crate) A: RistrettoPoint,
    pub(crate) B: RistrettoPoint,
}

/// ElGamal ciphertext of a UID attribute: `E_A1 = r * G`, `E_A2 = r * A + M`.
#[derive(Clone, Copy, Debug)]
pub struct UidCiphertext {
    pub(crate) E_A1: RistrettoPoint,
    pub(crate) E_A2: RistrettoPoint,
}

/// ElGamal ciphertext of a profile-key attribute, under the group's `B` key.
#[derive(Clone, Copy, Debug)]
pub struct ProfileKeyCiphertext {
    pub(crate) E_B1: RistrettoPoint,
    pub(crate) E_B2: RistrettoPoint,
}

impl GroupSecretParams {
    pub const LEN: usize = 2 * GROUP_ELEMENT_LEN;

    pub fn gen<R>(rng: &mut R) -> Self
    where
        R: CryptoRngCore + ?Sized,
    {
        Self {
            a: Scalar::random(rng),
            b: Scalar::random(rng),
        }
    }

    /// Derive the group keys from a 32-byte master key, so every member of
    /// the group arrives at the same parameters.
    pub fn derive_from_master_key(master_key: &[u8; 32]) -> Self {
        let mut hasher = Blake2b512::new();
        hasher.update(b"zkcred::encryption::GroupSecretParams::a");
        hasher.update(master_key);
        let a = Scalar::from_hash(hasher);

        let mut hasher = Blake2b512::new();
        hasher.update(b"zkcred::encryption::GroupSecretParams::b");
        hasher.update(master_key);
        let b = Scalar::from_hash(hasher);

        Self { a, b }
    }

    pub fn public_params(&self) -> GroupPublicParams {
        GroupPublicParams {
            A: (&self.a) * RISTRETTO_BASEPOINT_TABLE,
            B: (&self.b) * RISTRETTO_BASEPOINT_TABLE,
        }
    }

    /// Decrypt a UID ciphertext to the attribute point it encrypts.
    pub fn decrypt_uid(&self, ciphertext: &UidCiphertext) -> RistrettoPoint {
        ciphertext.E_A2 - self.a * ciphertext.E_A1
    }

    /// Decrypt a profile-key ciphertext to the attribute point it encrypts.
    pub fn decrypt_profile_key(&self, ciphertext: &ProfileKeyCiphertext) -> RistrettoPoint {
        ciphertext.E_B2 - self.b * ciphertext.E_B1
    }

    /// Check that `ciphertext` encrypts the attribute of `uid`. Constant-time
    /// in the comparison; failure is a generic [`Error::VerificationFailed`].
    pub fn open_uid(&self, ciphertext: &UidCiphertext, uid: &UidBytes) -> Result<(), Error> {
        let eq = self.decrypt_uid(ciphertext).ct_eq(&uid_attribute(uid));
        match eq.into() {
            true => Ok(()),
            false => Err(Error::VerificationFailed),
        }
    }

    /// Check that `ciphertext` encrypts the attribute of `(profile_key, uid)`.
    pub fn open_profile_key(
        &self,
        ciphertext: &ProfileKeyCiphertext,
        profile_key: &ProfileKeyBytes,
        uid: &UidBytes,
    ) -> Result<(), Error> {
        let eq = self
            .decrypt_profile_key(ciphertext)
            .ct_eq(&profile_key_attribute(profile_key, uid));
        match eq.into() {
            true => Ok(()),
            false => Err(Error::VerificationFailed),
        }
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let mut decoder = Decoder::new(bytes, Self::LEN)?;
        Ok(Self {
            a: decoder.scalar()?,
            b: decoder.scalar()?,
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut bytes = [0u8; Self::LEN];
        Encoder::new(&mut bytes).scalar(&self.a).scalar(&self.b);
        bytes
    }
}

impl Drop for GroupSecretParams {
    fn drop(&mut self) {
        self.a.zeroize();
        self.b.zeroize();
    }
}

impl GroupPublicParams {
    pub const LEN: usize = 2 * GROUP_ELEMENT_LEN;

    /// Encrypt the UID attribute with the given randomness.
    ///
    /// Randomness must be fresh per ciphertext; reusing it across calls links
    /// the ciphertexts it produced.
    pub fn encrypt_uid_with_randomness(&self, uid: &UidBytes, r: Scalar) -> UidCiphertext {
        UidCiphertext {
            E_A1: (&r) * RISTRETTO_BASEPOINT_TABLE,
            E_A2: r * self.A + uid_attribute(uid),
        }
    }

    /// Encrypt the UID attribute with fresh randomness, returning the
    /// randomness for use in a proof over the ciphertext.
    pub fn encrypt_uid<R>(&self, uid: &UidBytes, rng: &mut R) -> (UidCiphertext, Scalar)
    where
        R: CryptoRngCore + ?Sized,
    {
        let r = Scalar::random(rng);
        (self.encrypt_uid_with_randomness(uid, r), r)
    }

    /// Encrypt the profile-key attribute with the given randomness.
    pub fn encrypt_profile_key_with_randomness(
        &self,
        profile_key: &ProfileKeyBytes,
        uid: &UidBytes,
        r: Scalar,
    ) -> ProfileKeyCiphertext {
        ProfileKeyCiphertext {
            E_B1: (&r) * RISTRETTO_BASEPOINT_TABLE,
            E_B2: r * self.B + profile_key_attribute(profile_key, uid),
        }
    }

    /// Encrypt the profile-key attribute with fresh randomness, returning the
    /// randomness for use in a proof over the ciphertext.
    pub fn encrypt_profile_key<R>(
        &self,
        profile_key: &ProfileKeyBytes,
        uid: &UidBytes,
        rng: &mut R,
    ) -> (ProfileKeyCiphertext, Scalar)
    where
        R: CryptoRngCore + ?Sized,
    {
        let r = Scalar::random(rng);
        (
            self.encrypt_profile_key_with_randomness(profile_key, uid, r),
            r,
        )
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let mut decoder = Decoder::new(bytes, Self::LEN)?;
        Ok(Self {
            A: decoder.point()?,
            B: decoder.point()?,
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut bytes = [0u8; Self::LEN];
        Encoder::new(&mut bytes).point(&self.A).point(&self.B);
        bytes
    }
}

impl UidCiphertext {
    pub const LEN: usize = 2 * GROUP_ELEMENT_LEN;

    /// Decode a ciphertext. The first component must be a non-identity
    /// element; an honest encryptor never produces `r = 0`.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let mut decoder = Decoder::new(bytes, Self::LEN)?;
        Ok(Self {
            E_A1: decoder.nonidentity_point()?,
            E_A2: decoder.point()?,
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut bytes = [0u8; Self::LEN];
        Encoder::new(&mut bytes).point(&self.E_A1).point(&self.E_A2);
        bytes
    }
}

impl ProfileKeyCiphertext {
    pub const LEN: usize = 2 * GROUP_ELEMENT_LEN;

    /// Decode a ciphertext. The first component must be a non-identity
    /// element; an honest encryptor never produces `r = 0`.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let mut decoder = Decoder::new(bytes, Self::LEN)?;
        Ok(Self {
            E_B1: decoder.nonidentity_point()?,
            E_B2: decoder.point()?,
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut bytes = [0u8; Self::LEN];
        Encoder::new(&mut bytes).point(&self.E_B1).point(&self.E_B2);
        bytes
    }
}

#[cfg(test)]
mod test {
    use super::{GroupSecretParams, ProfileKeyCiphertext, UidCiphertext};
    use crate::{
        attributes::{profile_key_attribute, uid_attribute},
        errors::Error,
    };

    #[test]
    fn uid_encrypt_decrypt() {
        let uid = [1u8; 16];
        let secret = GroupSecretParams::gen(&mut rand::thread_rng());
        let (ciphertext, _) = secret
            .public_params()
            .encrypt_uid(&uid, &mut rand::thread_rng());
        assert_eq!(secret.decrypt_uid(&ciphertext), uid_attribute(&uid));
        secret.open_uid(&ciphertext, &uid).unwrap();

        let Err(Error::VerificationFailed) = secret.open_uid(&ciphertext, &[2u8; 16]) else {
            panic!("ciphertext opened for the wrong uid");
        };
    }

    #[test]
    fn profile_key_encrypt_decrypt() {
        let uid = [1u8; 16];
        let profile_key = [5u8; 32];
        let secret = GroupSecretParams::gen(&mut rand::thread_rng());
        let (ciphertext, _) =
            secret
                .public_params()
                .encrypt_profile_key(&profile_key, &uid, &mut rand::thread_rng());
        assert_eq!(
            secret.decrypt_profile_key(&ciphertext),
            profile_key_attribute(&profile_key, &uid),
        );
        secret
            .open_profile_key(&ciphertext, &profile_key, &uid)
            .unwrap();

        let Err(Error::VerificationFailed) =
            secret.open_profile_key(&ciphertext, &[6u8; 32], &uid)
        else {
            panic!("ciphertext opened for the wrong profile key");
        };
    }

    #[test]
    fn encryption_is_randomized() {
        let uid = [1u8; 16];
        let secret = GroupSecretParams::gen(&mut rand::thread_rng());
        let public = secret.public_params();
        let (a, _) = public.encrypt_uid(&uid, &mut rand::thread_rng());
        let (b, _) = public.encrypt_uid(&uid, &mut rand::thread_rng());
        assert_ne!(a.to_bytes(), b.to_bytes());
        assert_eq!(secret.decrypt_uid(&a), secret.decrypt_uid(&b));
    }

    #[test]
    fn derive_from_master_key_is_deterministic() {
        let a = GroupSecretParams::derive_from_master_key(&[42u8; 32]);
        let b = GroupSecretParams::derive_from_master_key(&[42u8; 32]);
        assert_eq!(a.to_bytes(), b.to_bytes());
        assert_eq!(
            a.public_params().to_bytes(),
            b.public_params().to_bytes(),
        );
    }

    #[test]
    fn ciphertext_round_trip_and_rejection() {
        let uid = [1u8; 16];
        let secret = GroupSecretParams::gen(&mut rand::thread_rng());
        let (ciphertext, _) = secret
            .public_params()
            .encrypt_uid(&uid, &mut rand::thread_rng());
        let bytes = ciphertext.to_bytes();
        let decoded = UidCiphertext::from_slice(&bytes).unwrap();
        assert_eq!(decoded.to_bytes(), bytes);

        let Err(Error::InvalidInput) = UidCiphertext::from_slice(&bytes[..63]) else {
            panic!("truncated ciphertext decoded");
        };

        // All-zero first component is the identity, which honest encryption
        // never produces.
        let Err(Error::InvalidInput) = UidCiphertext::from_slice(&[0u8; 64]) else {
            panic!("identity first component decoded");
        };
        let Err(Error::InvalidInput) = ProfileKeyCiphertext::from_slice(&[0u8; 64]) else {
            panic!("identity first component decoded");
        };
    }
}

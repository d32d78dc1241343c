//! The algebraic MAC underlying credentials, and the issuer's keys.
//!
//! A credential on attribute points `(M1, M2)` is `(t, U, V)` with
//! `V = W + x0 * U + x1 * t * U + y1 * M1 + y2 * M2`. Verification is keyed:
//! only the holder of [`ServerKeyPair`] can check a MAC or a presentation.
//! Clients check the issuer's honesty through the issuance proof instead.

#![allow(non_snake_case)]

use curve25519_dalek::{traits::IsIdentity, RistrettoPoint, Scalar};
use rand_core::CryptoRngCore;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::{
    errors::Error,
    group::{Decoder, Encoder, GROUP_ELEMENT_LEN},
    params::SystemParams,
};

/// The issuer's secret key, with cached public points. Secret scalars are
/// zeroized on drop.
pub struct ServerKeyPair {
    pub(crate) w: Scalar,
    pub(crate) wprime: Scalar,
    pub(crate) x0: Scalar,
    pub(crate) x1: Scalar,
    pub(crate) y1: Scalar,
    pub(crate) y2: Scalar,
    /// `W = w * G_w`; the secret-key term of every MAC.
    pub(crate) W: RistrettoPoint,
    /// `C_W = W + wprime * G_wprime`; published commitment to `w`.
    pub(crate) C_W: RistrettoPoint,
    /// `I = G_V - x0 * G_x0 - x1 * G_x1 - y1 * G_y1 - y2 * G_y2`.
    pub(crate) I: RistrettoPoint,
}

/// The public half of [`ServerKeyPair`], all a client needs to verify
/// issuance and build presentations.
#[derive(Clone, Copy, Debug)]
pub struct ServerPublicKey {
    pub(crate) C_W: RistrettoPoint,
    pub(crate) I: RistrettoPoint,
}

/// An issued credential. Opaque to everyone but its holder; presented only
/// through [`crate::presentation::Presentation`].
#[derive(Clone, Copy, Debug)]
pub struct Credential {
    pub(crate) t: Scalar,
    pub(crate) U: RistrettoPoint,
    pub(crate) V: RistrettoPoint,
}

impl ServerKeyPair {
    pub const LEN: usize = 6 * GROUP_ELEMENT_LEN;

    pub fn gen<R>(rng: &mut R) -> Self
    where
        R: CryptoRngCore + ?Sized,
    {
        Self::from_secrets(
            Scalar::random(rng),
            Scalar::random(rng),
            Scalar::random(rng),
            Scalar::random(rng),
            Scalar::random(rng),
            Scalar::random(rng),
        )
    }

    fn from_secrets(
        w: Scalar,
        wprime: Scalar,
        x0: Scalar,
        x1: Scalar,
        y1: Scalar,
        y2: Scalar,
    ) -> Self {
        let system = SystemParams::get();
        let W = w * system.G_w;
        Self {
            w,
            wprime,
            x0,
            x1,
            y1,
            y2,
            W,
            C_W: W + wprime * system.G_wprime,
            I: system.G_V
                - x0 * system.G_x0
                - x1 * system.G_x1
                - y1 * system.G_y1
                - y2 * system.G_y2,
        }
    }

    pub fn public_key(&self) -> ServerPublicKey {
        ServerPublicKey {
            C_W: self.C_W,
            I: self.I,
        }
    }

    /// Issue a credential directly over known attribute points. The blinded
    /// path in [`crate::issuance`] builds on the same equation.
    pub fn mac<R>(&self, M1: RistrettoPoint, M2: RistrettoPoint, rng: &mut R) -> Credential
    where
        R: CryptoRngCore + ?Sized,
    {
        let t = Scalar::random(rng);
        let U = RistrettoPoint::random(rng);
        Credential {
            t,
            U,
            V: self.compute_V(&U, &t, &M1, &M2),
        }
    }

    /// Keyed MAC check, constant-time in the comparison.
    pub fn verify_mac(
        &self,
        credential: &Credential,
        M1: RistrettoPoint,
        M2: RistrettoPoint,
    ) -> Result<(), Error> {
        // U is non-private, so a variable-time identity check is fine here.
        if credential.U.is_identity() {
            return Err(Error::VerificationFailed);
        }
        let V = self.compute_V(&credential.U, &credential.t, &M1, &M2);
        match credential.V.ct_eq(&V).into() {
            true => Ok(()),
            false => Err(Error::VerificationFailed),
        }
    }

    pub(crate) fn compute_V(
        &self,
        U: &RistrettoPoint,
        t: &Scalar,
        M1: &RistrettoPoint,
        M2: &RistrettoPoint,
    ) -> RistrettoPoint {
        self.W + self.x0 * U + (self.x1 * t) * U + self.y1 * M1 + self.y2 * M2
    }

    /// Decode a key pair from its six secret scalars; the public points are
    /// recomputed rather than trusted.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let mut decoder = Decoder::new(bytes, Self::LEN)?;
        Ok(Self::from_secrets(
            decoder.scalar()?,
            decoder.scalar()?,
            decoder.scalar()?,
            decoder.scalar()?,
            decoder.scalar()?,
            decoder.scalar()?,
        ))
    }

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut bytes = [0u8; Self::LEN];
        Encoder::new(&mut bytes)
            .scalar(&self.w)
            .scalar(&self.wprime)
            .scalar(&self.x0)
            .scalar(&self.x1)
            .scalar(&self.y1)
            .scalar(&self.y2);
        bytes
    }
}

impl Drop for ServerKeyPair {
    fn drop(&mut self) {
        self.w.zeroize();
        self.wprime.zeroize();
        self.x0.zeroize();
        self.x1.zeroize();
        self.y1.zeroize();
        self.y2.zeroize();
    }
}

impl ServerPublicKey {
    pub const LEN: usize = 2 * GROUP_ELEMENT_LEN;

    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let mut decoder = Decoder::new(bytes, Self::LEN)?;
        Ok(Self {
            C_W: decoder.point()?,
            I: decoder.point()?,
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut bytes = [0u8; Self::LEN];
        Encoder::new(&mut bytes).point(&self.C_W).point(&self.I);
        bytes
    }
}

impl Credential {
    pub const LEN: usize = 3 * GROUP_ELEMENT_LEN;

    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let mut decoder = Decoder::new(bytes, Self::LEN)?;
        Ok(Self {
            t: decoder.scalar()?,
            U: decoder.nonidentity_point()?,
            V: decoder.point()?,
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut bytes = [0u8; Self::LEN];
        Encoder::new(&mut bytes)
            .scalar(&self.t)
            .point(&self.U)
            .point(&self.V);
        bytes
    }
}

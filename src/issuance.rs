//! Blinded credential issuance.
//!
//! The client commits to its profile-key attribute and sends the issuer an
//! ElGamal encryption of it under a fresh request key, with a proof that the
//! ciphertext encrypts the committed value. The issuer verifies that proof,
//! issues a credential over the still-hidden attribute plus the UID it knows,
//! and proves it used its published key. The client verifies the issuer's
//! proof and unblinds, ending up with a credential the issuer has never seen
//! in the clear.
//!
//! Every step is a pure function of its inputs and an explicit RNG; nothing
//! is stateful across calls.

#![allow(non_snake_case)]

use core::convert::Infallible;

use curve25519_dalek::{
    constants::{RISTRETTO_BASEPOINT_POINT, RISTRETTO_BASEPOINT_TABLE},
    RistrettoPoint, Scalar,
};
use rand_core::CryptoRngCore;
use zeroize::Zeroize;

use crate::{
    attributes::{profile_key_attribute, uid_attribute, ProfileKeyBytes, UidBytes},
    commitment::{ProfileKeyCommitment, ProfileKeyCommitmentWithSecretNonce},
    credentials::{Credential, ServerKeyPair, ServerPublicKey},
    errors::Error,
    group::{Decoder, Encoder, GROUP_ELEMENT_LEN},
    params::SystemParams,
    zkp::{
        decode_proof, encode_proof, proof_len, AllocPointVar, AllocScalarVar, CompactProof,
        Constraint, Prover, Transcript, Verifier,
    },
};

/// The client's secret for one issuance exchange: the request key that
/// unblinds the issuer's response. Zeroized on drop.
pub struct RequestSecret {
    pub(crate) y: Scalar,
}

impl Drop for RequestSecret {
    fn drop(&mut self) {
        self.y.zeroize();
    }
}

/// A credential request: the request public key `Y`, the profile-key
/// commitment, an encryption `(D1, D2)` of the profile-key attribute under
/// `Y`, and a proof that the ciphertext encrypts the committed value.
#[derive(Clone)]
pub struct CredentialRequest {
    pub(crate) Y: RistrettoPoint,
    pub(crate) commitment: ProfileKeyCommitment,
    pub(crate) D1: RistrettoPoint,
    pub(crate) D2: RistrettoPoint,
    pub(crate) proof: CompactProof,
}

/// The issuer's response: a blinded credential `(t, U, S1, S2)` and a proof
/// that it was computed with the issuer's published key over the requested
/// attributes.
#[derive(Clone)]
pub struct CredentialResponse {
    pub(crate) t: Scalar,
    pub(crate) U: RistrettoPoint,
    pub(crate) S1: RistrettoPoint,
    pub(crate) S2: RistrettoPoint,
    pub(crate) proof: CompactProof,
}

impl CredentialRequest {
    /// Response scalars in the request proof: `y`, `r1`, `j`.
    const NUM_RESPONSES: usize = 3;
    pub const LEN: usize = 5 * GROUP_ELEMENT_LEN + proof_len(Self::NUM_RESPONSES);

    /// Build a request for a credential over `(uid, profile_key)`.
    ///
    /// The returned [`RequestSecret`] must be kept to unblind the response;
    /// it is never sent anywhere.
    pub fn new<R>(
        uid: &UidBytes,
        profile_key: &ProfileKeyBytes,
        rng: &mut R,
    ) -> (Self, RequestSecret)
    where
        R: CryptoRngCore + ?Sized,
    {
        let commitment = ProfileKeyCommitmentWithSecretNonce::new(profile_key, uid);
        let M2 = profile_key_attribute(profile_key, uid);

        let y = Scalar::random(rng);
        let Y = (&y) * RISTRETTO_BASEPOINT_TABLE;
        let r1 = Scalar::random(rng);
        let D1 = (&r1) * RISTRETTO_BASEPOINT_TABLE;
        let D2 = r1 * Y + M2;

        // NOTE: Unwrap will never panic, proving is infallible.
        let proof = prove_request(y, Y, r1, D1, D2, &commitment).unwrap();

        (
            Self {
                Y,
                commitment: commitment.commitment(),
                D1,
                D2,
                proof,
            },
            RequestSecret { y },
        )
    }

    /// The commitment carried in this request, re-validated from its bytes.
    ///
    /// A commitment extracted from a well-formed request always decodes; a
    /// failure here is a defect, not a user error.
    pub fn commitment(&self) -> ProfileKeyCommitment {
        ProfileKeyCommitment::from_slice(&self.commitment.to_bytes())
            .expect("internally produced commitment must decode")
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let mut decoder = Decoder::new(bytes, Self::LEN)?;
        let request = Self {
            Y: decoder.nonidentity_point()?,
            commitment: ProfileKeyCommitment {
                J1: decoder.point()?,
                J2: decoder.point()?,
            },
            D1: decoder.nonidentity_point()?,
            D2: decoder.point()?,
            proof: decode_proof(decoder.remaining(), Self::NUM_RESPONSES)?,
        };
        Ok(request)
    }

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut bytes = [0u8; Self::LEN];
        let mut proof = [0u8; proof_len(Self::NUM_RESPONSES)];
        encode_proof(&self.proof, &mut proof);
        Encoder::new(&mut bytes)
            .point(&self.Y)
            .point(&self.commitment.J1)
            .point(&self.commitment.J2)
            .point(&self.D1)
            .point(&self.D2)
            .bytes(&proof);
        bytes
    }
}

impl ServerKeyPair {
    /// Issue a blinded credential for the given request.
    ///
    /// The request proof is verified before any secret-key operation; a
    /// request whose ciphertext does not match its commitment fails with
    /// [`Error::VerificationFailed`].
    pub fn issue<R>(
        &self,
        request: &CredentialRequest,
        uid: &UidBytes,
        rng: &mut R,
    ) -> Result<CredentialResponse, Error>
    where
        R: CryptoRngCore + ?Sized,
    {
        verify_request(request)?;

        let M1 = uid_attribute(uid);
        let t = Scalar::random(rng);
        let rprime = Scalar::random(rng);
        let U = RistrettoPoint::random(rng);

        let S1 = self.y2 * request.D1 + (&rprime) * RISTRETTO_BASEPOINT_TABLE;
        let S2 = self.y2 * request.D2
            + rprime * request.Y
            + self.W
            + self.x0 * U
            + (self.x1 * t) * U
            + self.y1 * M1;

        // NOTE: Unwrap will never panic, proving is infallible.
        let proof = prove_issuance(self, request, &M1, &t, &rprime, &U, &S1, &S2).unwrap();

        Ok(CredentialResponse {
            t,
            U,
            S1,
            S2,
            proof,
        })
    }
}

impl CredentialResponse {
    /// Response scalars in the issuance proof: `w`, `wprime`, `x0`, `x1`,
    /// `y1`, `y2`, `rprime`.
    const NUM_RESPONSES: usize = 7;
    pub const LEN: usize =
        GROUP_ELEMENT_LEN + 3 * GROUP_ELEMENT_LEN + proof_len(Self::NUM_RESPONSES);

    /// Verify the issuance proof against the issuer's published key and
    /// unblind the credential.
    ///
    /// This is the client's only defense against a misbehaving issuer; a
    /// response that was not produced with the published key fails with
    /// [`Error::VerificationFailed`] and yields no credential.
    pub fn receive(
        &self,
        request: &CredentialRequest,
        secret: &RequestSecret,
        server_public_key: &ServerPublicKey,
        uid: &UidBytes,
    ) -> Result<Credential, Error> {
        verify_issuance(self, request, server_public_key, &uid_attribute(uid))?;
        Ok(Credential {
            t: self.t,
            U: self.U,
            V: self.S2 - secret.y * self.S1,
        })
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let mut decoder = Decoder::new(bytes, Self::LEN)?;
        Ok(Self {
            t: decoder.scalar()?,
            U: decoder.nonidentity_point()?,
            S1: decoder.point()?,
            S2: decoder.point()?,
            proof: decode_proof(decoder.remaining(), Self::NUM_RESPONSES)?,
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut bytes = [0u8; Self::LEN];
        let mut proof = [0u8; proof_len(Self::NUM_RESPONSES)];
        encode_proof(&self.proof, &mut proof);
        Encoder::new(&mut bytes)
            .scalar(&self.t)
            .point(&self.U)
            .point(&self.S1)
            .point(&self.S2)
            .bytes(&proof);
        bytes
    }
}

// A small macro to construct the labels for variables that get added to the
// request-proof transcript.
macro_rules! request_label {
    ($s:literal) => {
        concat!("zkcred::issuance::CredentialRequest::proof::", $s)
    };
}

fn prove_request(
    y: Scalar,
    Y: RistrettoPoint,
    r1: Scalar,
    D1: RistrettoPoint,
    D2: RistrettoPoint,
    commitment: &ProfileKeyCommitmentWithSecretNonce,
) -> Result<CompactProof, Infallible> {
    let system = SystemParams::get();
    let mut transcript = Transcript::new(request_label!("transcript").as_bytes());
    let mut prover = Prover::new(request_label!("constraints").as_bytes(), &mut transcript);

    // Allocate variables used in multiple constraint declarations.
    let g_var = prover.alloc_point((request_label!("G"), RISTRETTO_BASEPOINT_POINT))?;
    let Y_var = prover.alloc_point((request_label!("Y"), Y))?;
    let r1_var = prover.alloc_scalar((request_label!("r1"), r1))?;
    let j_var = prover.alloc_scalar((request_label!("j"), commitment.j))?;

    // Constrain Y = y * G
    let mut constraint_y = Constraint::new();
    constraint_y.add(&mut prover, (request_label!("y"), y), g_var)?;
    constraint_y.eq(&mut prover, Y_var)?;

    // Constrain D1 = r1 * G
    let mut constraint_d1 = Constraint::new();
    constraint_d1.add(&mut prover, r1_var, g_var)?;
    constraint_d1.eq(&mut prover, (request_label!("D1"), D1))?;

    // Constrain J2 = j * G_j2
    let mut constraint_j2 = Constraint::new();
    constraint_j2.add(&mut prover, j_var, (request_label!("G_j2"), system.G_j2))?;
    constraint_j2.eq(
        &mut prover,
        (request_label!("J2"), commitment.commitment.J2),
    )?;

    // Constrain D2 - J1 = r1 * Y + j * -G_j1, tying the ciphertext to the
    // committed attribute.
    let mut constraint_link = Constraint::new();
    constraint_link.add(&mut prover, r1_var, Y_var)?;
    constraint_link.add(&mut prover, j_var, (request_label!("-G_j1"), -system.G_j1))?;
    constraint_link.eq(
        &mut prover,
        (request_label!("D2-J1"), D2 - commitment.commitment.J1),
    )?;

    Ok(prover.prove_compact())
}

fn verify_request(request: &CredentialRequest) -> Result<(), Error> {
    let system = SystemParams::get();
    let mut transcript = Transcript::new(request_label!("transcript").as_bytes());
    let mut verifier = Verifier::new(request_label!("constraints").as_bytes(), &mut transcript);

    let g_var = verifier.alloc_point((request_label!("G"), RISTRETTO_BASEPOINT_POINT))?;
    let Y_var = verifier.alloc_point((request_label!("Y"), request.Y))?;
    let r1_var = verifier.alloc_scalar(request_label!("r1"))?;
    let j_var = verifier.alloc_scalar(request_label!("j"))?;

    let mut constraint_y = Constraint::new();
    constraint_y.add(&mut verifier, request_label!("y"), g_var)?;
    constraint_y.eq(&mut verifier, Y_var)?;

    let mut constraint_d1 = Constraint::new();
    constraint_d1.add(&mut verifier, r1_var, g_var)?;
    constraint_d1.eq(&mut verifier, (request_label!("D1"), request.D1))?;

    let mut constraint_j2 = Constraint::new();
    constraint_j2.add(&mut verifier, j_var, (request_label!("G_j2"), system.G_j2))?;
    constraint_j2.eq(
        &mut verifier,
        (request_label!("J2"), request.commitment.J2),
    )?;

    let mut constraint_link = Constraint::new();
    constraint_link.add(&mut verifier, r1_var, Y_var)?;
    constraint_link.add(
        &mut verifier,
        j_var,
        (request_label!("-G_j1"), -system.G_j1),
    )?;
    constraint_link.eq(
        &mut verifier,
        (request_label!("D2-J1"), request.D2 - request.commitment.J1),
    )?;

    verifier.verify_compact(&request.proof)?;
    Ok(())
}

// A small macro to construct the labels for variables that get added to the
// issuance-proof transcript.
macro_rules! issuance_label {
    ($s:literal) => {
        concat!("zkcred::issuance::CredentialResponse::proof::", $s)
    };
}

#[allow(clippy::too_many_arguments)]
fn prove_issuance(
    key_pair: &ServerKeyPair,
    request: &CredentialRequest,
    M1: &RistrettoPoint,
    t: &Scalar,
    rprime: &Scalar,
    U: &RistrettoPoint,
    S1: &RistrettoPoint,
    S2: &RistrettoPoint,
) -> Result<CompactProof, Infallible> {
    let system = SystemParams::get();
    let mut transcript = Transcript::new(issuance_label!("transcript").as_bytes());
    let mut prover = Prover::new(issuance_label!("constraints").as_bytes(), &mut transcript);

    // Allocate variables used in multiple constraint declarations.
    let G_w_var = prover.alloc_point((issuance_label!("G_w"), system.G_w))?;
    let w_var = prover.alloc_scalar((issuance_label!("w"), key_pair.w))?;
    let x0_var = prover.alloc_scalar((issuance_label!("x0"), key_pair.x0))?;
    let x1_var = prover.alloc_scalar((issuance_label!("x1"), key_pair.x1))?;
    let y1_var = prover.alloc_scalar((issuance_label!("y1"), key_pair.y1))?;
    let y2_var = prover.alloc_scalar((issuance_label!("y2"), key_pair.y2))?;
    let rprime_var = prover.alloc_scalar((issuance_label!("rprime"), *rprime))?;

    // Constrain C_W = w * G_w + wprime * G_wprime
    let mut constraint_c_w = Constraint::new();
    constraint_c_w.add(&mut prover, w_var, G_w_var)?;
    constraint_c_w.add(
        &mut prover,
        (issuance_label!("wprime"), key_pair.wprime),
        (issuance_label!("G_wprime"), system.G_wprime),
    )?;
    constraint_c_w.eq(&mut prover, (issuance_label!("C_W"), key_pair.C_W))?;

    // Constrain G_V - I = x0 * G_x0 + x1 * G_x1 + y1 * G_y1 + y2 * G_y2
    let mut constraint_i = Constraint::new();
    constraint_i.add(&mut prover, x0_var, (issuance_label!("G_x0"), system.G_x0))?;
    constraint_i.add(&mut prover, x1_var, (issuance_label!("G_x1"), system.G_x1))?;
    constraint_i.add(&mut prover, y1_var, (issuance_label!("G_y1"), system.G_y1))?;
    constraint_i.add(&mut prover, y2_var, (issuance_label!("G_y2"), system.G_y2))?;
    constraint_i.eq(
        &mut prover,
        (issuance_label!("G_V-I"), system.G_V - key_pair.I),
    )?;

    // Constrain S1 = y2 * D1 + rprime * G
    let mut constraint_s1 = Constraint::new();
    constraint_s1.add(&mut prover, y2_var, (issuance_label!("D1"), request.D1))?;
    constraint_s1.add(
        &mut prover,
        rprime_var,
        (issuance_label!("G"), RISTRETTO_BASEPOINT_POINT),
    )?;
    constraint_s1.eq(&mut prover, (issuance_label!("S1"), *S1))?;

    // Constrain S2 = y2 * D2 + rprime * Y + w * G_w + x0 * U + x1 * tU + y1 * M1
    let mut constraint_s2 = Constraint::new();
    constraint_s2.add(&mut prover, y2_var, (issuance_label!("D2"), request.D2))?;
    constraint_s2.add(&mut prover, rprime_var, (issuance_label!("Y"), request.Y))?;
    constraint_s2.add(&mut prover, w_var, G_w_var)?;
    constraint_s2.add(&mut prover, x0_var, (issuance_label!("U"), *U))?;
    constraint_s2.add(&mut prover, x1_var, (issuance_label!("tU"), t * U))?;
    constraint_s2.add(&mut prover, y1_var, (issuance_label!("M1"), *M1))?;
    constraint_s2.eq(&mut prover, (issuance_label!("S2"), *S2))?;

    Ok(prover.prove_compact())
}

fn verify_issuance(
    response: &CredentialResponse,
    request: &CredentialRequest,
    server_public_key: &ServerPublicKey,
    M1: &RistrettoPoint,
) -> Result<(), Error> {
    let system = SystemParams::get();
    let mut transcript = Transcript::new(issuance_label!("transcript").as_bytes());
    let mut verifier = Verifier::new(issuance_label!("constraints").as_bytes(), &mut transcript);

    let G_w_var = verifier.alloc_point((issuance_label!("G_w"), system.G_w))?;
    let w_var = verifier.alloc_scalar(issuance_label!("w"))?;
    let x0_var = verifier.alloc_scalar(issuance_label!("x0"))?;
    let x1_var = verifier.alloc_scalar(issuance_label!("x1"))?;
    let y1_var = verifier.alloc_scalar(issuance_label!("y1"))?;
    let y2_var = verifier.alloc_scalar(issuance_label!("y2"))?;
    let rprime_var = verifier.alloc_scalar(issuance_label!("rprime"))?;

    let mut constraint_c_w = Constraint::new();
    constraint_c_w.add(&mut verifier, w_var, G_w_var)?;
    constraint_c_w.add(
        &mut verifier,
        issuance_label!("wprime"),
        (issuance_label!("G_wprime"), system.G_wprime),
    )?;
    constraint_c_w.eq(
        &mut verifier,
        (issuance_label!("C_W"), server_public_key.C_W),
    )?;

    let mut constraint_i = Constraint::new();
    constraint_i.add(
        &mut verifier,
        x0_var,
        (issuance_label!("G_x0"), system.G_x0),
    )?;
    constraint_i.add(
        &mut verifier,
        x1_var,
        (issuance_label!("G_x1"), system.G_x1),
    )?;
    constraint_i.add(
        &mut verifier,
        y1_var,
        (issuance_label!("G_y1"), system.G_y1),
    )?;
    constraint_i.add(
        &mut verifier,
        y2_var,
        (issuance_label!("G_y2"), system.G_y2),
    )?;
    constraint_i.eq(
        &mut verifier,
        (issuance_label!("G_V-I"), system.G_V - server_public_key.I),
    )?;

    let mut constraint_s1 = Constraint::new();
    constraint_s1.add(&mut verifier, y2_var, (issuance_label!("D1"), request.D1))?;
    constraint_s1.add(
        &mut verifier,
        rprime_var,
        (issuance_label!("G"), RISTRETTO_BASEPOINT_POINT),
    )?;
    constraint_s1.eq(&mut verifier, (issuance_label!("S1"), response.S1))?;

    let mut constraint_s2 = Constraint::new();
    constraint_s2.add(&mut verifier, y2_var, (issuance_label!("D2"), request.D2))?;
    constraint_s2.add(&mut verifier, rprime_var, (issuance_label!("Y"), request.Y))?;
    constraint_s2.add(&mut verifier, w_var, G_w_var)?;
    constraint_s2.add(&mut verifier, x0_var, (issuance_label!("U"), response.U))?;
    constraint_s2.add(
        &mut verifier,
        x1_var,
        (issuance_label!("tU"), response.t * response.U),
    )?;
    constraint_s2.add(&mut verifier, y1_var, (issuance_label!("M1"), *M1))?;
    constraint_s2.eq(&mut verifier, (issuance_label!("S2"), response.S2))?;

    verifier.verify_compact(&response.proof)?;
    Ok(())
}

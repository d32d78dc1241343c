//! Anonymous presentation of an issued credential.
//!
//! The holder re-randomizes its credential into Pedersen commitments, encrypts
//! both attribute points under the group's keys, and proves that the
//! commitments open to a valid credential whose attributes are exactly the
//! encrypted ones. The verifying server learns only the ciphertexts; every
//! presentation of the same credential uses fresh randomness, so two
//! presentations cannot be linked to each other by their bytes.
//!
//! Verification is keyed. Only the holder of [`ServerKeyPair`] can check a
//! presentation, by recomputing the blinded MAC term `Z` from its secrets.

#![allow(non_snake_case)]

use core::convert::Infallible;

use curve25519_dalek::{constants::RISTRETTO_BASEPOINT_POINT, RistrettoPoint, Scalar};
use rand_core::CryptoRngCore;

use crate::{
    attributes::{profile_key_attribute, uid_attribute, ProfileKeyBytes, UidBytes},
    credentials::{Credential, ServerKeyPair, ServerPublicKey},
    encryption::{GroupPublicParams, ProfileKeyCiphertext, UidCiphertext},
    errors::Error,
    group::{Decoder, Encoder, GROUP_ELEMENT_LEN},
    params::SystemParams,
    zkp::{
        decode_proof, encode_proof, proof_len, AllocPointVar, AllocScalarVar, CompactProof,
        Constraint, Prover, Transcript, Verifier,
    },
};

/// A single-use presentation of a credential to the issuing server.
///
/// Carries commitments to the credential, ciphertexts of both attributes
/// under the group's keys, and the proof tying them together. The server
/// checks it with [`ServerKeyPair::verify_presentation`].
#[derive(Clone)]
pub struct Presentation {
    pub(crate) C_x0: RistrettoPoint,
    pub(crate) C_x1: RistrettoPoint,
    pub(crate) C_y1: RistrettoPoint,
    pub(crate) C_y2: RistrettoPoint,
    pub(crate) C_V: RistrettoPoint,
    pub(crate) uid_ciphertext: UidCiphertext,
    pub(crate) profile_key_ciphertext: ProfileKeyCiphertext,
    pub(crate) proof: CompactProof,
}

impl Presentation {
    /// Response scalars in the presentation proof: `z`, `t`, `z0`, `r_a`,
    /// `r_b`.
    const NUM_RESPONSES: usize = 5;
    pub const LEN: usize = 5 * GROUP_ELEMENT_LEN
        + UidCiphertext::LEN
        + ProfileKeyCiphertext::LEN
        + proof_len(Self::NUM_RESPONSES);

    /// Present `credential` over `(uid, profile_key)` to the issuer, with the
    /// attribute ciphertexts bound to the given group keys.
    ///
    /// `context` is application data the presentation commits to; the server
    /// must verify with the same bytes. A presentation replayed under a
    /// different context fails verification.
    pub fn new<R>(
        credential: &Credential,
        uid: &UidBytes,
        profile_key: &ProfileKeyBytes,
        server_public_key: &ServerPublicKey,
        group_public_params: &GroupPublicParams,
        context: &[u8],
        rng: &mut R,
    ) -> Self
    where
        R: CryptoRngCore + ?Sized,
    {
        let system = SystemParams::get();
        let M1 = uid_attribute(uid);
        let M2 = profile_key_attribute(profile_key, uid);

        let z = Scalar::random(rng);
        let C_x0 = z * system.G_x0 + credential.U;
        let C_x1 = z * system.G_x1 + credential.t * credential.U;
        let C_y1 = z * system.G_y1 + M1;
        let C_y2 = z * system.G_y2 + M2;
        let C_V = z * system.G_V + credential.V;
        let Z = z * server_public_key.I;

        let (uid_ciphertext, r_a) = group_public_params.encrypt_uid(uid, rng);
        let (profile_key_ciphertext, r_b) =
            group_public_params.encrypt_profile_key(profile_key, uid, rng);

        // NOTE: Unwrap will never panic, proving is infallible.
        let proof = prove_presentation(
            &Statement {
                I: server_public_key.I,
                A: group_public_params.A,
                B: group_public_params.B,
                C_x0,
                C_x1,
                C_y1,
                C_y2,
                Z,
                uid_ciphertext,
                profile_key_ciphertext,
            },
            &Witness {
                z,
                t: credential.t,
                z0: -(credential.t * z),
                r_a,
                r_b,
            },
            context,
        )
        .unwrap();

        Self {
            C_x0,
            C_x1,
            C_y1,
            C_y2,
            C_V,
            uid_ciphertext,
            profile_key_ciphertext,
            proof,
        }
    }

    /// The UID ciphertext carried in this presentation, re-validated from its
    /// bytes. Meaningful only after the presentation has verified.
    pub fn uid_ciphertext(&self) -> UidCiphertext {
        UidCiphertext::from_slice(&self.uid_ciphertext.to_bytes())
            .expect("internally produced ciphertext must decode")
    }

    /// The profile-key ciphertext carried in this presentation, re-validated
    /// from its bytes. Meaningful only after the presentation has verified.
    pub fn profile_key_ciphertext(&self) -> ProfileKeyCiphertext {
        ProfileKeyCiphertext::from_slice(&self.profile_key_ciphertext.to_bytes())
            .expect("internally produced ciphertext must decode")
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let mut decoder = Decoder::new(bytes, Self::LEN)?;
        Ok(Self {
            C_x0: decoder.point()?,
            C_x1: decoder.point()?,
            C_y1: decoder.point()?,
            C_y2: decoder.point()?,
            C_V: decoder.point()?,
            uid_ciphertext: UidCiphertext {
                E_A1: decoder.nonidentity_point()?,
                E_A2: decoder.point()?,
            },
            profile_key_ciphertext: ProfileKeyCiphertext {
                E_B1: decoder.nonidentity_point()?,
                E_B2: decoder.point()?,
            },
            proof: decode_proof(decoder.remaining(), Self::NUM_RESPONSES)?,
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut bytes = [0u8; Self::LEN];
        let mut proof = [0u8; proof_len(Self::NUM_RESPONSES)];
        encode_proof(&self.proof, &mut proof);
        Encoder::new(&mut bytes)
            .point(&self.C_x0)
            .point(&self.C_x1)
            .point(&self.C_y1)
            .point(&self.C_y2)
            .point(&self.C_V)
            .point(&self.uid_ciphertext.E_A1)
            .point(&self.uid_ciphertext.E_A2)
            .point(&self.profile_key_ciphertext.E_B1)
            .point(&self.profile_key_ciphertext.E_B2)
            .bytes(&proof);
        bytes
    }
}

impl ServerKeyPair {
    /// Verify a presentation against this key and the group's public keys.
    ///
    /// `context` must be the same bytes the holder presented against. On
    /// success the presentation's ciphertexts are known to encrypt the
    /// attribute points of a credential this key issued.
    pub fn verify_presentation(
        &self,
        presentation: &Presentation,
        group_public_params: &GroupPublicParams,
        context: &[u8],
    ) -> Result<(), Error> {
        // The MAC check: with secrets (w, x0, x1, y1, y2), a valid credential
        // under fresh blinding z satisfies
        //   C_V - W - x0 * C_x0 - x1 * C_x1 - y1 * C_y1 - y2 * C_y2 = z * I,
        // so the recomputed Z must match the prover's z * I.
        let Z = presentation.C_V
            - self.W
            - self.x0 * presentation.C_x0
            - self.x1 * presentation.C_x1
            - self.y1 * presentation.C_y1
            - self.y2 * presentation.C_y2;

        verify_presentation_proof(
            &Statement {
                I: self.I,
                A: group_public_params.A,
                B: group_public_params.B,
                C_x0: presentation.C_x0,
                C_x1: presentation.C_x1,
                C_y1: presentation.C_y1,
                C_y2: presentation.C_y2,
                Z,
                uid_ciphertext: presentation.uid_ciphertext,
                profile_key_ciphertext: presentation.profile_key_ciphertext,
            },
            &presentation.proof,
            context,
        )
    }
}

/// Public inputs of the presentation proof, as seen by both sides.
struct Statement {
    I: RistrettoPoint,
    A: RistrettoPoint,
    B: RistrettoPoint,
    C_x0: RistrettoPoint,
    C_x1: RistrettoPoint,
    C_y1: RistrettoPoint,
    C_y2: RistrettoPoint,
    Z: RistrettoPoint,
    uid_ciphertext: UidCiphertext,
    profile_key_ciphertext: ProfileKeyCiphertext,
}

/// The prover's secrets. `z0 = -t * z` linearizes the `t * C_x0` term.
struct Witness {
    z: Scalar,
    t: Scalar,
    z0: Scalar,
    r_a: Scalar,
    r_b: Scalar,
}

// A small macro to construct the labels for variables that get added to the
// presentation-proof transcript.
macro_rules! label {
    ($s:literal) => {
        concat!("zkcred::presentation::Presentation::proof::", $s)
    };
}

fn prove_presentation(
    statement: &Statement,
    witness: &Witness,
    context: &[u8],
) -> Result<CompactProof, Infallible> {
    let system = SystemParams::get();
    let mut transcript = Transcript::new(label!("transcript").as_bytes());
    transcript.append_message(label!("context").as_bytes(), context);
    let mut prover = Prover::new(label!("constraints").as_bytes(), &mut transcript);

    // Allocate variables used in multiple constraint declarations.
    let g_var = prover.alloc_point((label!("G"), RISTRETTO_BASEPOINT_POINT))?;
    let z_var = prover.alloc_scalar((label!("z"), witness.z))?;
    let r_a_var = prover.alloc_scalar((label!("r_a"), witness.r_a))?;
    let r_b_var = prover.alloc_scalar((label!("r_b"), witness.r_b))?;

    // Constrain Z = z * I
    let mut constraint_z = Constraint::new();
    constraint_z.add(&mut prover, z_var, (label!("I"), statement.I))?;
    constraint_z.eq(&mut prover, (label!("Z"), statement.Z))?;

    // Constrain C_x1 = t * C_x0 + z0 * G_x0 + z * G_x1
    let mut constraint_c_x1 = Constraint::new();
    constraint_c_x1.add(
        &mut prover,
        (label!("t"), witness.t),
        (label!("C_x0"), statement.C_x0),
    )?;
    constraint_c_x1.add(
        &mut prover,
        (label!("z0"), witness.z0),
        (label!("G_x0"), system.G_x0),
    )?;
    constraint_c_x1.add(&mut prover, z_var, (label!("G_x1"), system.G_x1))?;
    constraint_c_x1.eq(&mut prover, (label!("C_x1"), statement.C_x1))?;

    // Constrain E_A1 = r_a * G
    let mut constraint_e_a1 = Constraint::new();
    constraint_e_a1.add(&mut prover, r_a_var, g_var)?;
    constraint_e_a1.eq(
        &mut prover,
        (label!("E_A1"), statement.uid_ciphertext.E_A1),
    )?;

    // Constrain E_A2 - C_y1 = r_a * A + z * -G_y1, tying the uid ciphertext
    // to the committed first attribute.
    let mut constraint_e_a2 = Constraint::new();
    constraint_e_a2.add(&mut prover, r_a_var, (label!("A"), statement.A))?;
    constraint_e_a2.add(&mut prover, z_var, (label!("-G_y1"), -system.G_y1))?;
    constraint_e_a2.eq(
        &mut prover,
        (
            label!("E_A2-C_y1"),
            statement.uid_ciphertext.E_A2 - statement.C_y1,
        ),
    )?;

    // Constrain E_B1 = r_b * G
    let mut constraint_e_b1 = Constraint::new();
    constraint_e_b1.add(&mut prover, r_b_var, g_var)?;
    constraint_e_b1.eq(
        &mut prover,
        (label!("E_B1"), statement.profile_key_ciphertext.E_B1),
    )?;

    // Constrain E_B2 - C_y2 = r_b * B + z * -G_y2, tying the profile-key
    // ciphertext to the committed second attribute.
    let mut constraint_e_b2 = Constraint::new();
    constraint_e_b2.add(&mut prover, r_b_var, (label!("B"), statement.B))?;
    constraint_e_b2.add(&mut prover, z_var, (label!("-G_y2"), -system.G_y2))?;
    constraint_e_b2.eq(
        &mut prover,
        (
            label!("E_B2-C_y2"),
            statement.profile_key_ciphertext.E_B2 - statement.C_y2,
        ),
    )?;

    Ok(prover.prove_compact())
}

fn verify_presentation_proof(
    statement: &Statement,
    proof: &CompactProof,
    context: &[u8],
) -> Result<(), Error> {
    let system = SystemParams::get();
    let mut transcript = Transcript::new(label!("transcript").as_bytes());
    transcript.append_message(label!("context").as_bytes(), context);
    let mut verifier = Verifier::new(label!("constraints").as_bytes(), &mut transcript);

    let g_var = verifier.alloc_point((label!("G"), RISTRETTO_BASEPOINT_POINT))?;
    let z_var = verifier.alloc_scalar(label!("z"))?;
    let r_a_var = verifier.alloc_scalar(label!("r_a"))?;
    let r_b_var = verifier.alloc_scalar(label!("r_b"))?;

    let mut constraint_z = Constraint::new();
    constraint_z.add(&mut verifier, z_var, (label!("I"), statement.I))?;
    constraint_z.eq(&mut verifier, (label!("Z"), statement.Z))?;

    let mut constraint_c_x1 = Constraint::new();
    constraint_c_x1.add(
        &mut verifier,
        label!("t"),
        (label!("C_x0"), statement.C_x0),
    )?;
    constraint_c_x1.add(
        &mut verifier,
        label!("z0"),
        (label!("G_x0"), system.G_x0),
    )?;
    constraint_c_x1.add(&mut verifier, z_var, (label!("G_x1"), system.G_x1))?;
    constraint_c_x1.eq(&mut verifier, (label!("C_x1"), statement.C_x1))?;

    let mut constraint_e_a1 = Constraint::new();
    constraint_e_a1.add(&mut verifier, r_a_var, g_var)?;
    constraint_e_a1.eq(
        &mut verifier,
        (label!("E_A1"), statement.uid_ciphertext.E_A1),
    )?;

    let mut constraint_e_a2 = Constraint::new();
    constraint_e_a2.add(&mut verifier, r_a_var, (label!("A"), statement.A))?;
    constraint_e_a2.add(&mut verifier, z_var, (label!("-G_y1"), -system.G_y1))?;
    constraint_e_a2.eq(
        &mut verifier,
        (
            label!("E_A2-C_y1"),
            statement.uid_ciphertext.E_A2 - statement.C_y1,
        ),
    )?;

    let mut constraint_e_b1 = Constraint::new();
    constraint_e_b1.add(&mut verifier, r_b_var, g_var)?;
    constraint_e_b1.eq(
        &mut verifier,
        (label!("E_B1"), statement.profile_key_ciphertext.E_B1),
    )?;

    let mut constraint_e_b2 = Constraint::new();
    constraint_e_b2.add(&mut verifier, r_b_var, (label!("B"), statement.B))?;
    constraint_e_b2.add(&mut verifier, z_var, (label!("-G_y2"), -system.G_y2))?;
    constraint_e_b2.eq(
        &mut verifier,
        (
            label!("E_B2-C_y2"),
            statement.profile_key_ciphertext.E_B2 - statement.C_y2,
        ),
    )?;

    verifier.verify_compact(proof)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use rand_core::CryptoRngCore;

    use super::Presentation;
    use crate::{
        credentials::{Credential, ServerKeyPair},
        encryption::GroupSecretParams,
        errors::Error,
        issuance::CredentialRequest,
    };

    const UID: [u8; 16] = [1u8; 16];
    const PROFILE_KEY: [u8; 32] = [5u8; 32];
    const CONTEXT: &[u8] = b"group 42, epoch 7";

    fn issue_credential<R>(server: &ServerKeyPair, rng: &mut R) -> Credential
    where
        R: CryptoRngCore + ?Sized,
    {
        let (request, secret) = CredentialRequest::new(&UID, &PROFILE_KEY, rng);
        server
            .issue(&request, &UID, rng)
            .unwrap()
            .receive(&request, &secret, &server.public_key(), &UID)
            .unwrap()
    }

    #[test]
    fn present_and_verify() {
        let mut rng = rand::thread_rng();
        let server = ServerKeyPair::gen(&mut rng);
        let group = GroupSecretParams::gen(&mut rng);
        let credential = issue_credential(&server, &mut rng);

        let presentation = Presentation::new(
            &credential,
            &UID,
            &PROFILE_KEY,
            &server.public_key(),
            &group.public_params(),
            CONTEXT,
            &mut rng,
        );
        server
            .verify_presentation(&presentation, &group.public_params(), CONTEXT)
            .unwrap();

        // The ciphertexts decrypt to the presented attributes.
        group
            .open_uid(&presentation.uid_ciphertext(), &UID)
            .unwrap();
        group
            .open_profile_key(&presentation.profile_key_ciphertext(), &PROFILE_KEY, &UID)
            .unwrap();
    }

    #[test]
    fn presentations_are_unlinkable_but_both_verify() {
        let mut rng = rand::thread_rng();
        let server = ServerKeyPair::gen(&mut rng);
        let group = GroupSecretParams::gen(&mut rng);
        let credential = issue_credential(&server, &mut rng);

        let a = Presentation::new(
            &credential,
            &UID,
            &PROFILE_KEY,
            &server.public_key(),
            &group.public_params(),
            CONTEXT,
            &mut rng,
        );
        let b = Presentation::new(
            &credential,
            &UID,
            &PROFILE_KEY,
            &server.public_key(),
            &group.public_params(),
            CONTEXT,
            &mut rng,
        );

        assert_ne!(a.to_bytes(), b.to_bytes());
        assert_ne!(
            a.uid_ciphertext().to_bytes(),
            b.uid_ciphertext().to_bytes(),
        );
        server
            .verify_presentation(&a, &group.public_params(), CONTEXT)
            .unwrap();
        server
            .verify_presentation(&b, &group.public_params(), CONTEXT)
            .unwrap();
    }

    #[test]
    fn wrong_context_rejected() {
        let mut rng = rand::thread_rng();
        let server = ServerKeyPair::gen(&mut rng);
        let group = GroupSecretParams::gen(&mut rng);
        let credential = issue_credential(&server, &mut rng);

        let presentation = Presentation::new(
            &credential,
            &UID,
            &PROFILE_KEY,
            &server.public_key(),
            &group.public_params(),
            CONTEXT,
            &mut rng,
        );
        let Err(Error::VerificationFailed) =
            server.verify_presentation(&presentation, &group.public_params(), b"other context")
        else {
            panic!("presentation verified under a different context");
        };
    }

    #[test]
    fn wrong_server_key_rejected() {
        let mut rng = rand::thread_rng();
        let server = ServerKeyPair::gen(&mut rng);
        let other = ServerKeyPair::gen(&mut rng);
        let group = GroupSecretParams::gen(&mut rng);
        let credential = issue_credential(&server, &mut rng);

        let presentation = Presentation::new(
            &credential,
            &UID,
            &PROFILE_KEY,
            &server.public_key(),
            &group.public_params(),
            CONTEXT,
            &mut rng,
        );
        let Err(Error::VerificationFailed) =
            other.verify_presentation(&presentation, &group.public_params(), CONTEXT)
        else {
            panic!("presentation verified under the wrong server key");
        };
    }

    #[test]
    fn wrong_group_keys_rejected() {
        let mut rng = rand::thread_rng();
        let server = ServerKeyPair::gen(&mut rng);
        let group = GroupSecretParams::gen(&mut rng);
        let other_group = GroupSecretParams::gen(&mut rng);
        let credential = issue_credential(&server, &mut rng);

        let presentation = Presentation::new(
            &credential,
            &UID,
            &PROFILE_KEY,
            &server.public_key(),
            &group.public_params(),
            CONTEXT,
            &mut rng,
        );
        let Err(Error::VerificationFailed) =
            server.verify_presentation(&presentation, &other_group.public_params(), CONTEXT)
        else {
            panic!("presentation verified under the wrong group keys");
        };
    }

    #[test]
    fn swapped_attributes_rejected() {
        let mut rng = rand::thread_rng();
        let server = ServerKeyPair::gen(&mut rng);
        let group = GroupSecretParams::gen(&mut rng);
        let credential = issue_credential(&server, &mut rng);

        // Present the credential over a profile key it was not issued for.
        let presentation = Presentation::new(
            &credential,
            &UID,
            &[6u8; 32],
            &server.public_key(),
            &group.public_params(),
            CONTEXT,
            &mut rng,
        );
        let Err(Error::VerificationFailed) =
            server.verify_presentation(&presentation, &group.public_params(), CONTEXT)
        else {
            panic!("presentation verified over attributes the credential does not cover");
        };
    }

    #[test]
    fn bit_flip_rejected() {
        let mut rng = rand::thread_rng();
        let server = ServerKeyPair::gen(&mut rng);
        let group = GroupSecretParams::gen(&mut rng);
        let credential = issue_credential(&server, &mut rng);

        let presentation = Presentation::new(
            &credential,
            &UID,
            &PROFILE_KEY,
            &server.public_key(),
            &group.public_params(),
            CONTEXT,
            &mut rng,
        );
        let bytes = presentation.to_bytes();
        // Flip a proof bit; the mangled presentation still decodes but must
        // not verify.
        let mut mangled = bytes;
        *mangled.last_mut().unwrap() ^= 0x01;
        let decoded = Presentation::from_slice(&mangled).unwrap();
        let Err(Error::VerificationFailed) =
            server.verify_presentation(&decoded, &group.public_params(), CONTEXT)
        else {
            panic!("bit-flipped presentation verified");
        };
    }

    #[test]
    fn round_trip_and_rejection() {
        let mut rng = rand::thread_rng();
        let server = ServerKeyPair::gen(&mut rng);
        let group = GroupSecretParams::gen(&mut rng);
        let credential = issue_credential(&server, &mut rng);

        let presentation = Presentation::new(
            &credential,
            &UID,
            &PROFILE_KEY,
            &server.public_key(),
            &group.public_params(),
            CONTEXT,
            &mut rng,
        );
        let bytes = presentation.to_bytes();
        assert_eq!(bytes.len(), Presentation::LEN);
        let decoded = Presentation::from_slice(&bytes).unwrap();
        assert_eq!(decoded.to_bytes(), bytes);
        server
            .verify_presentation(&decoded, &group.public_params(), CONTEXT)
            .unwrap();

        let Err(Error::InvalidInput) = Presentation::from_slice(&bytes[..bytes.len() - 1]) else {
            panic!("truncated presentation decoded");
        };
        let mut extended = [0u8; Presentation::LEN + 1];
        extended[..Presentation::LEN].copy_from_slice(&bytes);
        let Err(Error::InvalidInput) = Presentation::from_slice(&extended) else {
            panic!("extended presentation decoded");
        };
    }
}

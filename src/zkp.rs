//! Thin layer over the lox-zkp Schnorr constraint system.
//!
//! The alloc traits let proving and verification code share constraint
//! declarations: a variable can be introduced either as a labeled value or as
//! an already-allocated variable, whichever the call site has on hand.

use alloc::vec::Vec;
use core::convert::Infallible;

use curve25519_dalek::{
    ristretto::{CompressedRistretto, RistrettoPoint},
    Scalar,
};

// Re-export the core types for use in other modules.
pub use lox_zkp::{
    toolbox::{prover::Prover, verifier::Verifier, SchnorrCS},
    CompactProof, Transcript,
};

use crate::{
    errors::Error,
    group::{decode_scalar, encode_scalar, GROUP_ELEMENT_LEN},
};

pub trait AllocScalarVar<T>: SchnorrCS {
    type Error;

    fn alloc_scalar(&mut self, value: T) -> Result<Self::ScalarVar, Self::Error>;
}

impl AllocScalarVar<(&'static str, Scalar)> for Prover<'_> {
    type Error = Infallible;

    fn alloc_scalar(
        &mut self,
        value: (&'static str, Scalar),
    ) -> Result<Self::ScalarVar, Self::Error> {
        Ok(self.allocate_scalar(value.0.as_bytes(), value.1))
    }
}

impl AllocScalarVar<lox_zkp::toolbox::prover::ScalarVar> for Prover<'_> {
    type Error = Infallible;

    fn alloc_scalar(
        &mut self,
        value: lox_zkp::toolbox::prover::ScalarVar,
    ) -> Result<Self::ScalarVar, Self::Error> {
        Ok(value)
    }
}

impl AllocScalarVar<&'static str> for Verifier<'_> {
    type Error = lox_zkp::ProofError;

    fn alloc_scalar(&mut self, value: &'static str) -> Result<Self::ScalarVar, Self::Error> {
        Ok(self.allocate_scalar(value.as_bytes()))
    }
}

impl AllocScalarVar<lox_zkp::toolbox::verifier::ScalarVar> for Verifier<'_> {
    type Error = lox_zkp::ProofError;

    fn alloc_scalar(
        &mut self,
        value: lox_zkp::toolbox::verifier::ScalarVar,
    ) -> Result<Self::ScalarVar, Self::Error> {
        Ok(value)
    }
}

pub trait AllocPointVar<T>: SchnorrCS {
    type Error;

    fn alloc_point(&mut self, value: T) -> Result<Self::PointVar, Self::Error>;
}

impl AllocPointVar<(&'static str, RistrettoPoint)> for Prover<'_> {
    type Error = Infallible;

    fn alloc_point(
        &mut self,
        value: (&'static str, RistrettoPoint),
    ) -> Result<Self::PointVar, Self::Error> {
        Ok(self.allocate_point(value.0.as_bytes(), value.1).0)
    }
}

impl AllocPointVar<lox_zkp::toolbox::prover::PointVar> for Prover<'_> {
    type Error = Infallible;

    fn alloc_point(
        &mut self,
        value: lox_zkp::toolbox::prover::PointVar,
    ) -> Result<Self::PointVar, Self::Error> {
        Ok(value)
    }
}

impl AllocPointVar<(&'static str, RistrettoPoint)> for Verifier<'_> {
    type Error = lox_zkp::ProofError;

    fn alloc_point(
        &mut self,
        value: (&'static str, RistrettoPoint),
    ) -> Result<Self::PointVar, Self::Error> {
        self.allocate_point(value.0.as_bytes(), value.1.compress())
    }
}

impl AllocPointVar<(&'static str, CompressedRistretto)> for Verifier<'_> {
    type Error = lox_zkp::ProofError;

    fn alloc_point(
        &mut self,
        value: (&'static str, CompressedRistretto),
    ) -> Result<Self::PointVar, Self::Error> {
        self.allocate_point(value.0.as_bytes(), value.1)
    }
}

impl AllocPointVar<lox_zkp::toolbox::verifier::PointVar> for Verifier<'_> {
    type Error = lox_zkp::ProofError;

    fn alloc_point(
        &mut self,
        value: lox_zkp::toolbox::verifier::PointVar,
    ) -> Result<Self::PointVar, Self::Error> {
        Ok(value)
    }
}

/// One linear-combination constraint, `lhs = Σ scalar_i * point_i`.
pub struct Constraint<CS: SchnorrCS> {
    pub linear_combination: Vec<(CS::ScalarVar, CS::PointVar)>,
}

impl<CS: SchnorrCS> Constraint<CS> {
    pub fn new() -> Self {
        Self {
            linear_combination: Vec::new(),
        }
    }

    pub fn add<X, G, E>(&mut self, cs: &mut CS, x: X, g: G) -> Result<(), E>
    where
        CS: AllocScalarVar<X, Error = E> + AllocPointVar<G, Error = E>,
    {
        let x_var = cs.alloc_scalar(x)?;
        let g_var = cs.alloc_point(g)?;
        self.linear_combination.push((x_var, g_var));
        Ok(())
    }

    pub fn eq<G>(self, cs: &mut CS, g: G) -> Result<(), CS::Error>
    where
        CS: AllocPointVar<G>,
    {
        let g_var = cs.alloc_point(g)?;
        cs.constrain(g_var, self.linear_combination);
        Ok(())
    }
}

impl<CS: SchnorrCS> Default for Constraint<CS> {
    fn default() -> Self {
        Self::new()
    }
}

/// Wire length of a compact proof with the given statement-fixed number of
/// response scalars.
pub(crate) const fn proof_len(num_responses: usize) -> usize {
    GROUP_ELEMENT_LEN * (1 + num_responses)
}

/// Serialize a compact proof as `challenge ‖ responses`, 32 bytes per scalar.
pub(crate) fn encode_proof(proof: &CompactProof, out: &mut [u8]) {
    debug_assert_eq!(out.len(), proof_len(proof.responses.len()));
    out[..GROUP_ELEMENT_LEN].copy_from_slice(&encode_scalar(&proof.challenge));
    for (chunk, response) in out[GROUP_ELEMENT_LEN..]
        .chunks_exact_mut(GROUP_ELEMENT_LEN)
        .zip(proof.responses.iter())
    {
        chunk.copy_from_slice(&encode_scalar(response));
    }
}

/// Decode a compact proof with a statement-fixed response count. Scalar
/// decoding is canonical-only, so a proof has exactly one byte encoding.
pub(crate) fn decode_proof(bytes: &[u8], num_responses: usize) -> Result<CompactProof, Error> {
    if bytes.len() != proof_len(num_responses) {
        return Err(Error::InvalidInput);
    }
    let mut scalars = bytes.chunks_exact(GROUP_ELEMENT_LEN).map(|chunk| {
        // NOTE: Unwrap will never panic, chunks_exact yields 32-byte chunks.
        decode_scalar(chunk.try_into().unwrap())
    });
    // NOTE: Unwrap will never panic, the length check above guarantees
    // 1 + num_responses chunks.
    let challenge = scalars.next().unwrap()?;
    let responses = scalars.collect::<Result<Vec<_>, _>>()?;
    Ok(CompactProof {
        challenge,
        responses,
    })
}

#[cfg(test)]
mod test {
    use curve25519_dalek::Scalar;
    use lox_zkp::CompactProof;

    use super::{decode_proof, encode_proof, proof_len};
    use crate::errors::Error;

    fn example_proof() -> CompactProof {
        CompactProof {
            challenge: Scalar::from(11u64),
            responses: alloc::vec![Scalar::from(22u64), Scalar::from(33u64)],
        }
    }

    #[test]
    fn proof_round_trip() {
        let proof = example_proof();
        let mut bytes = [0u8; proof_len(2)];
        encode_proof(&proof, &mut bytes);
        let decoded = decode_proof(&bytes, 2).unwrap();
        assert_eq!(decoded.challenge, proof.challenge);
        assert_eq!(decoded.responses, proof.responses);
    }

    #[test]
    fn proof_wrong_length_rejected() {
        let proof = example_proof();
        let mut bytes = [0u8; proof_len(2)];
        encode_proof(&proof, &mut bytes);
        let Err(Error::InvalidInput) = decode_proof(&bytes[..bytes.len() - 1], 2) else {
            panic!("truncated proof decoded");
        };
        let Err(Error::InvalidInput) = decode_proof(&bytes, 3) else {
            panic!("proof with missing responses decoded");
        };
    }

    #[test]
    fn proof_non_canonical_scalar_rejected() {
        let proof = example_proof();
        let mut bytes = [0u8; proof_len(2)];
        encode_proof(&proof, &mut bytes);
        bytes[32..64].copy_from_slice(&[0xff; 32]);
        let Err(Error::InvalidInput) = decode_proof(&bytes, 2) else {
            panic!("non-canonical response scalar decoded");
        };
    }
}

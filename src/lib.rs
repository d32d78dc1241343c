//! Zero-knowledge group credentials over the Ristretto group.
//!
//! An issuing server gives a client a credential over two attributes, a
//! 16-byte UID it knows and a 32-byte profile key it never sees in the clear.
//! The client later presents the credential back to the server alongside
//! ElGamal encryptions of both attributes under a group's keys, proving in
//! zero knowledge that the ciphertexts encrypt the attributes of a credential
//! the server issued, without revealing which one.
//!
//! There are three roles:
//!
//! - The **client** requests a credential with [`issuance::CredentialRequest`],
//!   unblinds the response into a [`credentials::Credential`], and later
//!   builds [`presentation::Presentation`]s from it.
//! - The **issuing server** holds a [`credentials::ServerKeyPair`], issues
//!   against requests, and verifies presentations. Verification is keyed;
//!   there is no public verification of a presentation.
//! - **Group members** hold [`encryption::GroupSecretParams`] and can decrypt
//!   the attribute ciphertexts a presentation carries.
//!
//! All operations are pure functions of their inputs and an explicit RNG.
//! Every public wire type has a fixed length, a `from_slice` that rejects
//! non-canonical encodings, and a `to_bytes` inverse.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod attributes;
pub mod commitment;
pub mod credentials;
pub mod encryption;
pub mod errors;
mod group;
pub mod issuance;
pub mod params;
pub mod presentation;
mod zkp;

pub use attributes::{ProfileKeyBytes, UidBytes, PROFILE_KEY_LEN, UID_LEN};
pub use commitment::{ProfileKeyCommitment, ProfileKeyCommitmentWithSecretNonce};
pub use credentials::{Credential, ServerKeyPair, ServerPublicKey};
pub use encryption::{
    GroupPublicParams, GroupSecretParams, ProfileKeyCiphertext, UidCiphertext,
};
pub use errors::Error;
pub use issuance::{CredentialRequest, CredentialResponse, RequestSecret};
pub use presentation::Presentation;

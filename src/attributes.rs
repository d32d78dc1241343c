//! Attribute encodings: the group elements a credential is issued over.
//!
//! A UID maps to a single point by domain-separated hash-to-group. A profile
//! key maps to a point bound to its owning UID, so a profile-key attribute
//! issued to one user cannot be replayed inside another user's credential.

use blake2::{Blake2b512, Digest};
use curve25519_dalek::RistrettoPoint;

pub const UID_LEN: usize = 16;
pub const PROFILE_KEY_LEN: usize = 32;

pub type UidBytes = [u8; UID_LEN];
pub type ProfileKeyBytes = [u8; PROFILE_KEY_LEN];

/// The attribute point for a UID.
pub fn uid_attribute(uid: &UidBytes) -> RistrettoPoint {
    let mut hasher = Blake2b512::new();
    hasher.update(b"zkcred::attributes::uid_attribute");
    hasher.update(uid);
    RistrettoPoint::from_hash(hasher)
}

/// The attribute point for a profile key, bound to the UID that owns it.
pub fn profile_key_attribute(profile_key: &ProfileKeyBytes, uid: &UidBytes) -> RistrettoPoint {
    let mut hasher = Blake2b512::new();
    hasher.update(b"zkcred::attributes::profile_key_attribute");
    hasher.update(profile_key);
    hasher.update(uid);
    RistrettoPoint::from_hash(hasher)
}

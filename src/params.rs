//! Fixed system parameters shared by all parties.
//!
//! Every generator is derived by hash-to-group of a unique label, so no
//! pairwise discrete log is known to anyone, including the authors. The
//! basepoint `G` (used for ElGamal first components and request keys) is the
//! standard Ristretto basepoint.

#![allow(non_snake_case)]

use blake2::Blake2b512;
use curve25519_dalek::RistrettoPoint;

/// The generator set for the credential MAC, the profile-key commitment, and
/// the issuance protocol. Deterministic: [`SystemParams::get`] always returns
/// the same points.
#[derive(Clone, Debug)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub struct SystemParams {
    pub G_w: RistrettoPoint,
    pub G_wprime: RistrettoPoint,
    pub G_x0: RistrettoPoint,
    pub G_x1: RistrettoPoint,
    pub G_y1: RistrettoPoint,
    pub G_y2: RistrettoPoint,
    pub G_V: RistrettoPoint,
    pub G_j1: RistrettoPoint,
    pub G_j2: RistrettoPoint,
}

macro_rules! generator {
    ($s:literal) => {
        RistrettoPoint::hash_from_bytes::<Blake2b512>(
            concat!("zkcred::params::SystemParams::", $s).as_bytes(),
        )
    };
}

impl SystemParams {
    pub fn get() -> Self {
        SystemParams {
            G_w: generator!("G_w"),
            G_wprime: generator!("G_wprime"),
            G_x0: generator!("G_x0"),
            G_x1: generator!("G_x1"),
            G_y1: generator!("G_y1"),
            G_y2: generator!("G_y2"),
            G_V: generator!("G_V"),
            G_j1: generator!("G_j1"),
            G_j2: generator!("G_j2"),
        }
    }
}

#[cfg(test)]
mod test {
    use curve25519_dalek::constants::RISTRETTO_BASEPOINT_POINT;

    use super::SystemParams;

    #[test]
    fn derivation_is_deterministic() {
        assert_eq!(SystemParams::get(), SystemParams::get());
    }

    #[test]
    fn generators_are_pairwise_distinct() {
        let system = SystemParams::get();
        let points = [
            system.G_w,
            system.G_wprime,
            system.G_x0,
            system.G_x1,
            system.G_y1,
            system.G_y2,
            system.G_V,
            system.G_j1,
            system.G_j2,
            RISTRETTO_BASEPOINT_POINT,
        ];
        for (i, a) in points.iter().enumerate() {
            for b in points.iter().skip(i + 1) {
                assert_ne!(a.compress(), b.compress());
            }
        }
    }
}

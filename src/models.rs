use std::collections::{BTreeMap, BTreeSet};

use crate::abe_attribute::AbeAttribute;
use crate::group::{Fr, Gt, G1, G2};

/// Public parameters, `T_a = g1^{t_a}` and `Y = e(g1, g2)^y`.
#[derive(Debug, Clone, PartialEq)]
pub struct AbePublicKey {
    pub g1: G1,
    pub g2: G2,
    pub y: Gt,
    pub big_t: BTreeMap<AbeAttribute, G1>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AbeMasterKey {
    pub y: Fr,
    pub small_t: BTreeMap<AbeAttribute, Fr>,
}

impl AbePublicKey {
    pub fn attributes(&self) -> BTreeSet<AbeAttribute> {
        self.big_t.keys().copied().collect()
    }
}

/// Key components `D_a = g2^{q_leaf(0) / t_a}`, one per leaf of the tree the key was
/// issued for. The tree itself is kept by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct AbeSecretKey {
    pub arr_d: BTreeMap<AbeAttribute, G2>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AbeCipherText {
    pub attributes: BTreeSet<AbeAttribute>,
    /// `E' = M * Y^s`
    pub e_prime: Gt,
    /// `E_a = T_a^s`
    pub arr_e: BTreeMap<AbeAttribute, G1>,
}

/// Output of [`decrypt_bytes`](crate::crypto::decrypt_bytes).
#[derive(Debug, Clone, PartialEq)]
pub struct AbeDecrypted {
    pub secret: Gt,
    pub message: Vec<u8>,
}

impl AbeDecrypted {
    pub fn new(secret: Gt, message: Vec<u8>) -> AbeDecrypted {
        AbeDecrypted { secret, message }
    }
}

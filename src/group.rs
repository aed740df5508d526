//! Bilinear group primitives used by the scheme.
//!
//! The scheme runs over the asymmetric BLS12-381 pairing `e: G1 x G2 -> Gt`. Scalars and
//! base group elements are the arkworks types; [`Gt`] wraps the degree-12 extension field
//! so that messages, which are arbitrary extension field elements rather than pairing
//! outputs, can be multiplied and divided exactly.
//!
//! Every value has a canonical byte form ([`CanonicalBytes`]): the arkworks compressed
//! serialization. Decoding validates the value and rejects trailing bytes. A [`Gt`] decodes
//! from any nonzero field element, since ciphertexts carry messages outside the pairing
//! subgroup; use [`Gt::is_pairing_output`] where a value must be a pairing output.
//!
//! Embedded messages are plain field elements of order other than `r`. Anyone holding a
//! ciphertext can therefore check a guessed message `M` through `E'^r == M^r`, so the
//! scheme hides only messages with enough entropy that guessing is out of reach.
use std::ops::Mul;

use ark_bls12_381::{Bls12_381, Fq, Fq12, Fq2, Fq6};
use ark_ec::pairing::Pairing;
use ark_ec::short_weierstrass::{Projective, SWCurveConfig};
use ark_ff::{BigInteger, Field, One, PrimeField, UniformRand, Zero};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use rand::Rng;

pub use ark_bls12_381::{Fr, G1Projective as G1, G2Projective as G2};

use crate::errors::abe_error::AbeError;

const COEFFICIENTS: usize = 12;
// 47 bytes stay below the 381-bit base field modulus.
const CHUNK_LEN: usize = 47;
const HEADER_LEN: usize = 3;
const EMBED_MARKER: u8 = 0x01;

/// Element of the pairing target group, or a message embedded into the target field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Gt(Fq12);

impl Gt {
    /// Maximum number of bytes [`Gt::embed`] accepts.
    pub const EMBED_CAPACITY: usize = COEFFICIENTS * CHUNK_LEN - HEADER_LEN;

    pub fn one() -> Self {
        Gt(Fq12::one())
    }

    pub fn pow(&self, exp: Fr) -> Self {
        Gt(self.0.pow(exp.into_bigint()))
    }

    /// Whether the value lies in the order-`r` subgroup that pairings map into.
    pub fn is_pairing_output(&self) -> bool {
        !self.0.is_zero() && self.0.pow(Fr::MODULUS) == Fq12::one()
    }

    /// Multiplicative inverse, `None` for the zero element.
    pub fn inverse(&self) -> Option<Self> {
        self.0.inverse().map(Gt)
    }

    /// Embeds up to [`Gt::EMBED_CAPACITY`] bytes into a target field element.
    ///
    /// The payload is prefixed with a marker byte and its big-endian `u16` length, then
    /// split into twelve 47-byte big-endian coefficients.
    pub fn embed(bytes: &[u8]) -> Result<Self, AbeError> {
        if bytes.len() > Self::EMBED_CAPACITY {
            return Err(AbeError::encoding(format!(
                "message of {} bytes exceeds the embedding capacity of {} bytes",
                bytes.len(),
                Self::EMBED_CAPACITY
            )));
        }

        let mut buffer = vec![0u8; COEFFICIENTS * CHUNK_LEN];
        buffer[0] = EMBED_MARKER;
        buffer[1..HEADER_LEN].copy_from_slice(&(bytes.len() as u16).to_be_bytes());
        buffer[HEADER_LEN..HEADER_LEN + bytes.len()].copy_from_slice(bytes);

        let mut coefficients = [Fq::zero(); COEFFICIENTS];
        for (coefficient, chunk) in coefficients.iter_mut().zip(buffer.chunks(CHUNK_LEN)) {
            *coefficient = Fq::from_be_bytes_mod_order(chunk);
        }

        Ok(Gt(from_coefficients(&coefficients)))
    }

    /// Recovers the bytes embedded by [`Gt::embed`].
    pub fn extract(&self) -> Result<Vec<u8>, AbeError> {
        let mut buffer = Vec::with_capacity(COEFFICIENTS * CHUNK_LEN);
        for coefficient in to_coefficients(&self.0) {
            let bytes = coefficient.into_bigint().to_bytes_be();
            let (high, low) = bytes.split_at(bytes.len() - CHUNK_LEN);
            if high.iter().any(|b| *b != 0) {
                return Err(AbeError::encoding(
                    "target element does not carry an embedded message",
                ));
            }
            buffer.extend_from_slice(low);
        }

        if buffer[0] != EMBED_MARKER {
            return Err(AbeError::encoding(
                "target element does not carry an embedded message",
            ));
        }
        let len = u16::from_be_bytes([buffer[1], buffer[2]]) as usize;
        if len > Self::EMBED_CAPACITY {
            return Err(AbeError::encoding(format!(
                "embedded length {} exceeds the embedding capacity",
                len
            )));
        }

        Ok(buffer[HEADER_LEN..HEADER_LEN + len].to_vec())
    }
}

impl Mul for Gt {
    type Output = Gt;

    fn mul(self, rhs: Gt) -> Gt {
        Gt(self.0 * rhs.0)
    }
}

fn to_coefficients(value: &Fq12) -> [Fq; COEFFICIENTS] {
    let mut coefficients = [Fq::zero(); COEFFICIENTS];
    for (i, fq6) in [value.c0, value.c1].iter().enumerate() {
        for (j, fq2) in [fq6.c0, fq6.c1, fq6.c2].iter().enumerate() {
            coefficients[i * 6 + j * 2] = fq2.c0;
            coefficients[i * 6 + j * 2 + 1] = fq2.c1;
        }
    }
    coefficients
}

fn from_coefficients(c: &[Fq; COEFFICIENTS]) -> Fq12 {
    let fq6 = |o: usize| {
        Fq6::new(
            Fq2::new(c[o], c[o + 1]),
            Fq2::new(c[o + 2], c[o + 3]),
            Fq2::new(c[o + 4], c[o + 5]),
        )
    };
    Fq12::new(fq6(0), fq6(6))
}

pub fn pairing(p: G1, q: G2) -> Gt {
    Gt(Bls12_381::pairing(p, q).0)
}

pub fn random_scalar<R: Rng + ?Sized>(rng: &mut R) -> Fr {
    Fr::rand(rng)
}

pub fn random_nonzero_scalar<R: Rng + ?Sized>(rng: &mut R) -> Fr {
    loop {
        let scalar = Fr::rand(rng);
        if !scalar.is_zero() {
            return scalar;
        }
    }
}

pub fn random_g1<R: Rng + ?Sized>(rng: &mut R) -> G1 {
    loop {
        let point = G1::rand(rng);
        if !point.is_zero() {
            return point;
        }
    }
}

pub fn random_g2<R: Rng + ?Sized>(rng: &mut R) -> G2 {
    loop {
        let point = G2::rand(rng);
        if !point.is_zero() {
            return point;
        }
    }
}

/// Fixed-format byte serialization of group and field elements.
pub trait CanonicalBytes: Sized {
    fn to_canonical_bytes(&self) -> Result<Vec<u8>, AbeError>;

    fn from_canonical_bytes(bytes: &[u8]) -> Result<Self, AbeError>;
}

fn serialize<T: CanonicalSerialize>(value: &T) -> Result<Vec<u8>, AbeError> {
    let mut bytes = Vec::with_capacity(value.compressed_size());
    value
        .serialize_compressed(&mut bytes)
        .map_err(|e| AbeError::encoding(format!("serialization failed: {}", e)))?;
    Ok(bytes)
}

fn deserialize<T: CanonicalDeserialize>(bytes: &[u8]) -> Result<T, AbeError> {
    let mut reader = bytes;
    let value = T::deserialize_compressed(&mut reader)
        .map_err(|e| AbeError::encoding(format!("deserialization failed: {}", e)))?;
    if !reader.is_empty() {
        return Err(AbeError::encoding(format!(
            "{} trailing bytes after serialized value",
            reader.len()
        )));
    }
    Ok(value)
}

impl CanonicalBytes for Fr {
    fn to_canonical_bytes(&self) -> Result<Vec<u8>, AbeError> {
        serialize(self)
    }

    fn from_canonical_bytes(bytes: &[u8]) -> Result<Self, AbeError> {
        deserialize(bytes)
    }
}

// G1 and G2 are both `Projective<P>`, so one impl covers the two curves.
impl<P: SWCurveConfig> CanonicalBytes for Projective<P> {
    fn to_canonical_bytes(&self) -> Result<Vec<u8>, AbeError> {
        serialize(self)
    }

    fn from_canonical_bytes(bytes: &[u8]) -> Result<Self, AbeError> {
        deserialize(bytes)
    }
}

impl CanonicalBytes for Gt {
    fn to_canonical_bytes(&self) -> Result<Vec<u8>, AbeError> {
        serialize(&self.0)
    }

    fn from_canonical_bytes(bytes: &[u8]) -> Result<Self, AbeError> {
        let value: Fq12 = deserialize(bytes)?;
        if value.is_zero() {
            return Err(AbeError::encoding("target element is zero"));
        }
        Ok(Gt(value))
    }
}

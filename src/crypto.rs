use std::collections::{BTreeMap, BTreeSet};

use ark_ff::Field;
use rand::Rng;
use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::abe_attribute::AbeAttribute;
use crate::access_tree::{AccessTree, GetAttributes};
use crate::errors::abe_error::AbeError;
use crate::group::{
    pairing, random_g1, random_g2, random_nonzero_scalar, random_scalar, Fr, Gt, G1, G2,
};
use crate::models::{AbeCipherText, AbeDecrypted, AbeMasterKey, AbePublicKey, AbeSecretKey};
use crate::secret_sharing::{distribute_shares, recover_secret};

/// Creates keys for the attribute universe `1..=attribute_count`.
#[instrument(level = "info", skip_all, fields(attribute_count))]
pub fn setup<R: Rng + ?Sized>(
    attribute_count: u32,
    rng: &mut R,
) -> Result<(AbePublicKey, AbeMasterKey), AbeError> {
    if attribute_count == 0 {
        return Err(AbeError::configuration(
            "the attribute universe must not be empty",
        ));
    }

    let g1 = random_g1(rng);
    let g2 = random_g2(rng);

    // t_a must be invertible for keygen
    let small_t: BTreeMap<AbeAttribute, Fr> = (1..=attribute_count)
        .map(|a| (AbeAttribute::new(a), random_nonzero_scalar(rng)))
        .collect();
    let y = random_scalar(rng);

    // T_a = g1^t_a
    let big_t = small_t
        .par_iter()
        .map(|(a, t)| (*a, g1 * t))
        .collect::<BTreeMap<AbeAttribute, G1>>();

    // Y = e(g1, g2)^y
    let big_y = pairing(g1, g2).pow(y);

    Ok((
        AbePublicKey {
            g1,
            g2,
            y: big_y,
            big_t,
        },
        AbeMasterKey { y, small_t },
    ))
}

/// Issues a key for `tree`: `y` is shared down the tree and every leaf gets
/// `D_a = g2^{q_leaf(0) / t_a}`.
#[instrument(level = "info", skip_all, fields(nodes = tree.len()))]
pub fn keygen<R: Rng + ?Sized>(
    public_key: &AbePublicKey,
    master_key: &AbeMasterKey,
    tree: &AccessTree,
    rng: &mut R,
) -> Result<AbeSecretKey, AbeError> {
    if !public_key.big_t.keys().eq(master_key.small_t.keys()) {
        return Err(AbeError::configuration(
            "public key and master key cover different attribute universes",
        ));
    }
    // Y = e(g1, g2)^y
    if pairing(public_key.g1, public_key.g2).pow(master_key.y) != public_key.y {
        return Err(AbeError::configuration(
            "public key and master key come from different setups",
        ));
    }

    if let Some(unknown) = tree
        .get_attributes()
        .into_iter()
        .find(|a| !master_key.small_t.contains_key(a))
    {
        return Err(AbeError::UnknownAttribute(unknown));
    }

    let shares = distribute_shares(tree, master_key.y, rng);
    let leaves: Vec<(usize, AbeAttribute)> = tree.leaves().collect();

    let arr_d = leaves
        .par_iter()
        .map(|(index, a)| {
            let inverse = master_key
                .small_t
                .get(a)
                .and_then(|t| t.inverse())
                .ok_or_else(|| {
                    AbeError::configuration(format!("master key component for {} is not invertible", a))
                })?;
            Ok((*a, public_key.g2 * (shares[*index] * inverse)))
        })
        .collect::<Result<BTreeMap<AbeAttribute, G2>, AbeError>>()?;

    Ok(AbeSecretKey { arr_d })
}

/// Encrypts `message` under an attribute set. Duplicate attributes are collapsed.
#[instrument(level = "info", skip_all, fields(attributes = attributes.len()))]
pub fn encrypt<R: Rng + ?Sized>(
    public_key: &AbePublicKey,
    message: &Gt,
    attributes: &[AbeAttribute],
    rng: &mut R,
) -> Result<AbeCipherText, AbeError> {
    let attributes: BTreeSet<AbeAttribute> = attributes.iter().copied().collect();
    if attributes.is_empty() {
        return Err(AbeError::configuration(
            "cannot encrypt under an empty attribute set",
        ));
    }
    if let Some(unknown) = attributes
        .iter()
        .find(|a| !public_key.big_t.contains_key(a))
    {
        return Err(AbeError::UnknownAttribute(*unknown));
    }

    let s = random_nonzero_scalar(rng);

    // E' = M * Y^s
    let e_prime = *message * public_key.y.pow(s);

    // E_a = T_a^s
    let arr_e = attributes
        .par_iter()
        .filter_map(|a| public_key.big_t.get(a).map(|t| (*a, *t * s)))
        .collect::<BTreeMap<AbeAttribute, G1>>();

    Ok(AbeCipherText {
        attributes,
        e_prime,
        arr_e,
    })
}

/// Embeds `plaintext` into the target group and encrypts it.
pub fn encrypt_bytes<R: Rng + ?Sized>(
    public_key: &AbePublicKey,
    plaintext: &[u8],
    attributes: &[AbeAttribute],
    rng: &mut R,
) -> Result<AbeCipherText, AbeError> {
    let message = Gt::embed(plaintext)?;
    encrypt(public_key, &message, attributes, rng)
}

/// Recovers the message if the ciphertext's attributes satisfy `tree`, the tree the key
/// was issued for.
///
/// Leaves evaluate to `e(E_a, D_a) = e(g1, g2)^{s * q_leaf(0)}`, gates interpolate their
/// children in the exponent and the root yields the mask `Y^s`.
#[instrument(level = "info", skip_all, fields(nodes = tree.len(), attributes = cipher_text.attributes.len()))]
pub fn decrypt(
    cipher_text: &AbeCipherText,
    secret_key: &AbeSecretKey,
    tree: &AccessTree,
) -> Result<Gt, AbeError> {
    if let Some(unknown) = tree
        .get_attributes()
        .into_iter()
        .find(|a| !secret_key.arr_d.contains_key(a))
    {
        return Err(AbeError::UnknownAttribute(unknown));
    }

    let mask = recover_secret(tree, |_, a| {
        if !cipher_text.attributes.contains(&a) {
            return None;
        }
        let e = cipher_text.arr_e.get(&a)?;
        let d = secret_key.arr_d.get(&a)?;
        Some(pairing(*e, *d))
    });

    let mask = match mask {
        Some(mask) => mask,
        None => {
            debug!("ciphertext attributes do not satisfy the access tree");
            return Err(AbeError::UnsatisfiedPolicy);
        }
    };

    let inverse = mask
        .inverse()
        .ok_or_else(|| AbeError::encoding("recovered mask is not invertible"))?;
    Ok(cipher_text.e_prime * inverse)
}

/// Decrypts and extracts the embedded bytes.
pub fn decrypt_bytes(
    cipher_text: &AbeCipherText,
    secret_key: &AbeSecretKey,
    tree: &AccessTree,
) -> Result<AbeDecrypted, AbeError> {
    let secret = decrypt(cipher_text, secret_key, tree)?;
    let message = secret.extract()?;
    Ok(AbeDecrypted::new(secret, message))
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;
    use crate::group::CanonicalBytes;

    fn attributes(ids: &[u32]) -> Vec<AbeAttribute> {
        ids.iter().map(|id| AbeAttribute::new(*id)).collect()
    }

    #[test]
    fn test_setup_consistency() {
        let rng = &mut ChaCha20Rng::seed_from_u64(0);
        let (public_key, master_key) = setup(5, rng).unwrap();

        assert_eq!(public_key.attributes(), attributes(&[1, 2, 3, 4, 5]).into_iter().collect::<BTreeSet<_>>());
        for (a, t) in &master_key.small_t {
            assert_eq!(public_key.big_t[a], public_key.g1 * t);
        }
        assert_eq!(
            public_key.y,
            pairing(public_key.g1, public_key.g2).pow(master_key.y)
        );
    }

    #[test]
    fn test_setup_empty_universe() {
        let rng = &mut ChaCha20Rng::seed_from_u64(0);

        assert!(matches!(setup(0, rng), Err(AbeError::Configuration(_))));
    }

    #[test]
    fn test_keygen_components_match_shares() {
        let rng = &mut ChaCha20Rng::seed_from_u64(1);
        let (public_key, master_key) = setup(3, rng).unwrap();
        let tree = AccessTree::from_policy("1 & 3").unwrap();
        let secret_key = keygen(&public_key, &master_key, &tree, rng).unwrap();

        assert_eq!(
            secret_key.arr_d.keys().copied().collect::<Vec<_>>(),
            attributes(&[1, 3])
        );

        // e(T_a, D_a) = e(g1, g2)^{q_a(0)}, and for 2-of-2 the shares interpolate to y
        let t1 = public_key.big_t[&AbeAttribute::new(1)];
        let t3 = public_key.big_t[&AbeAttribute::new(3)];
        let p1 = pairing(t1, secret_key.arr_d[&AbeAttribute::new(1)]);
        let p3 = pairing(t3, secret_key.arr_d[&AbeAttribute::new(3)]);
        let two = Fr::from(2u64);
        assert_eq!(p1.pow(two) * p3.pow(-Fr::from(1u64)), public_key.y);
    }

    #[test]
    fn test_keygen_unknown_attribute() {
        let rng = &mut ChaCha20Rng::seed_from_u64(2);
        let (public_key, master_key) = setup(3, rng).unwrap();
        let tree = AccessTree::from_policy("1 | 4").unwrap();

        assert!(matches!(
            keygen(&public_key, &master_key, &tree, rng),
            Err(AbeError::UnknownAttribute(a)) if a == AbeAttribute::new(4)
        ));
    }

    #[test]
    fn test_keygen_rejects_mismatched_keys() {
        let rng = &mut ChaCha20Rng::seed_from_u64(8);
        let (public_key, _) = setup(3, rng).unwrap();
        let (_, other_master_key) = setup(3, rng).unwrap();
        let (_, smaller_master_key) = setup(2, rng).unwrap();
        let tree = AccessTree::from_policy("1 | 2").unwrap();

        assert!(matches!(
            keygen(&public_key, &other_master_key, &tree, rng),
            Err(AbeError::Configuration(_))
        ));
        assert!(matches!(
            keygen(&public_key, &smaller_master_key, &tree, rng),
            Err(AbeError::Configuration(_))
        ));
    }

    #[test]
    fn test_encrypt_collapses_duplicates() {
        let rng = &mut ChaCha20Rng::seed_from_u64(3);
        let (public_key, _) = setup(4, rng).unwrap();
        let message = Gt::embed(b"dup").unwrap();
        let cipher_text = encrypt(&public_key, &message, &attributes(&[2, 1, 2]), rng).unwrap();

        assert_eq!(cipher_text.attributes, attributes(&[1, 2]).into_iter().collect::<BTreeSet<_>>());
        assert_eq!(cipher_text.arr_e.len(), 2);
    }

    #[test]
    fn test_encrypt_rejects_bad_attribute_sets() {
        let rng = &mut ChaCha20Rng::seed_from_u64(4);
        let (public_key, _) = setup(4, rng).unwrap();
        let message = Gt::embed(b"nope").unwrap();

        assert!(matches!(
            encrypt(&public_key, &message, &[], rng),
            Err(AbeError::Configuration(_))
        ));
        assert!(matches!(
            encrypt(&public_key, &message, &attributes(&[1, 9]), rng),
            Err(AbeError::UnknownAttribute(a)) if a == AbeAttribute::new(9)
        ));
    }

    #[test]
    fn test_encrypt_is_randomized() {
        let rng = &mut ChaCha20Rng::seed_from_u64(5);
        let (public_key, _) = setup(2, rng).unwrap();
        let message = Gt::embed(b"same message").unwrap();

        let first = encrypt(&public_key, &message, &attributes(&[1, 2]), rng).unwrap();
        let second = encrypt(&public_key, &message, &attributes(&[1, 2]), rng).unwrap();

        assert_ne!(
            first.e_prime.to_canonical_bytes().unwrap(),
            second.e_prime.to_canonical_bytes().unwrap()
        );
    }

    #[test]
    fn test_decrypt_missing_key_component() {
        let rng = &mut ChaCha20Rng::seed_from_u64(6);
        let (public_key, master_key) = setup(3, rng).unwrap();
        let tree = AccessTree::from_policy("1 | 2").unwrap();
        let mut secret_key = keygen(&public_key, &master_key, &tree, rng).unwrap();
        secret_key.arr_d.remove(&AbeAttribute::new(2));

        let cipher_text = encrypt_bytes(&public_key, b"x", &attributes(&[1]), rng).unwrap();

        assert!(matches!(
            decrypt(&cipher_text, &secret_key, &tree),
            Err(AbeError::UnknownAttribute(a)) if a == AbeAttribute::new(2)
        ));
    }

    #[test]
    fn test_decrypt_uses_cipher_text_attribute_set() {
        let rng = &mut ChaCha20Rng::seed_from_u64(9);
        let (public_key, master_key) = setup(3, rng).unwrap();
        let tree = AccessTree::from_policy("1 & 2").unwrap();
        let secret_key = keygen(&public_key, &master_key, &tree, rng).unwrap();
        let mut cipher_text =
            encrypt_bytes(&public_key, b"x", &attributes(&[1, 2]), rng).unwrap();
        cipher_text.attributes.remove(&AbeAttribute::new(2));

        assert!(cipher_text.arr_e.contains_key(&AbeAttribute::new(2)));
        assert!(matches!(
            decrypt(&cipher_text, &secret_key, &tree),
            Err(AbeError::UnsatisfiedPolicy)
        ));
    }

    #[test]
    fn test_decrypt_bytes() {
        let rng = &mut ChaCha20Rng::seed_from_u64(7);
        let (public_key, master_key) = setup(20, rng).unwrap();
        let tree = AccessTree::from_policy("2 of (1, 2 of (2, 3, 4), 5)").unwrap();
        let secret_key = keygen(&public_key, &master_key, &tree, rng).unwrap();
        let cipher_text =
            encrypt_bytes(&public_key, b"Hello World!", &attributes(&[1, 2, 4, 5]), rng).unwrap();

        let decrypted = decrypt_bytes(&cipher_text, &secret_key, &tree).unwrap();

        assert_eq!(decrypted.message, b"Hello World!".to_vec());
        assert_eq!(decrypted.secret, Gt::embed(b"Hello World!").unwrap());
    }
}

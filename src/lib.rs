//! Key-policy attribute-based encryption over threshold access trees.
//!
//! A ciphertext is labelled with a set of attributes and a user key embeds an access
//! tree of threshold gates. Decryption succeeds exactly when the ciphertext's attributes
//! satisfy the key's tree. The scheme runs over the BLS12-381 pairing (see [`group`]).
//!
//! ```no_run
//! use kpabe::abe_attribute::AbeAttribute;
//! use kpabe::access_tree::AccessTree;
//! use kpabe::crypto::{decrypt_bytes, encrypt_bytes, keygen, setup};
//!
//! let rng = &mut rand::thread_rng();
//! let (public_key, master_key) = setup(20, rng).unwrap();
//! let tree = AccessTree::from_policy("2 of (1, 2 of (2, 3, 4), 5)").unwrap();
//! let secret_key = keygen(&public_key, &master_key, &tree, rng).unwrap();
//!
//! let attributes = [1, 2, 4, 5].map(AbeAttribute::new);
//! let cipher_text = encrypt_bytes(&public_key, b"Hello World!", &attributes, rng).unwrap();
//! let decrypted = decrypt_bytes(&cipher_text, &secret_key, &tree).unwrap();
//! assert_eq!(decrypted.message, b"Hello World!");
//! ```
pub mod abe_attribute;
pub mod access_tree;
pub mod access_tree_node;
pub mod crypto;
pub mod demo;
pub mod encoding;
pub mod errors;
pub mod group;
pub mod models;
pub mod parser;
pub mod secret_sharing;

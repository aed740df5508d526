use std::fs;
use std::path::{Path, PathBuf};

use rand::Rng;
use tracing::{info, instrument, warn};

use crate::abe_attribute::AbeAttribute;
use crate::access_tree::AccessTree;
use crate::crypto::{decrypt_bytes, encrypt_bytes, keygen, setup};
use crate::encoding::KeyValueEncoding;
use crate::errors::abe_error::AbeError;
use crate::models::{AbeCipherText, AbeDecrypted, AbeMasterKey, AbePublicKey, AbeSecretKey};

/// Parameters of the end-to-end demonstration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoConfig {
    pub attribute_count: u32,
    /// Attributes the plaintext is encrypted under.
    pub attributes: Vec<AbeAttribute>,
    /// Policy of the issued key.
    pub policy: String,
    pub data_dir: PathBuf,
}

impl Default for DemoConfig {
    fn default() -> Self {
        DemoConfig {
            attribute_count: 20,
            attributes: [1, 2, 4, 5].into_iter().map(AbeAttribute::new).collect(),
            policy: String::from("2 of (1, 2 of (2, 3, 4), 5)"),
            data_dir: PathBuf::from("data"),
        }
    }
}

impl DemoConfig {
    pub fn with_data_dir<P: AsRef<Path>>(data_dir: P) -> DemoConfig {
        DemoConfig {
            data_dir: data_dir.as_ref().to_path_buf(),
            ..DemoConfig::default()
        }
    }

    pub fn public_key_path(&self) -> PathBuf {
        self.data_dir.join("pk.properties")
    }

    pub fn master_key_path(&self) -> PathBuf {
        self.data_dir.join("msk.properties")
    }

    pub fn secret_key_path(&self) -> PathBuf {
        self.data_dir.join("sk.properties")
    }

    pub fn cipher_text_path(&self) -> PathBuf {
        self.data_dir.join("ct.properties")
    }

    pub fn input_path(&self) -> PathBuf {
        self.data_dir.join("input.txt")
    }

    pub fn output_path(&self) -> PathBuf {
        self.data_dir.join("output.txt")
    }
}

/// Runs setup, keygen, encrypt and decrypt, passing all material through files in the
/// data directory. Reads the plaintext from `input.txt` and writes the recovered
/// plaintext to `output.txt`.
#[instrument(level = "info", skip_all, fields(data_dir = %config.data_dir.display()))]
pub fn run_demo<R: Rng + ?Sized>(config: &DemoConfig, rng: &mut R) -> Result<AbeDecrypted, AbeError> {
    let tree = AccessTree::from_policy(&config.policy)?;

    let (public_key, master_key) = setup(config.attribute_count, rng)?;
    public_key.store(config.public_key_path())?;
    master_key.store(config.master_key_path())?;

    let public_key = AbePublicKey::load(config.public_key_path())?;
    let master_key = AbeMasterKey::load(config.master_key_path())?;
    keygen(&public_key, &master_key, &tree, rng)?.store(config.secret_key_path())?;

    let plaintext = fs::read(config.input_path())?;
    info!(bytes = plaintext.len(), "read plaintext");
    encrypt_bytes(&public_key, &plaintext, &config.attributes, rng)?
        .store(config.cipher_text_path())?;

    let cipher_text = AbeCipherText::load(config.cipher_text_path())?;
    let secret_key = AbeSecretKey::load(config.secret_key_path())?;
    let decrypted = decrypt_bytes(&cipher_text, &secret_key, &tree)?;
    fs::write(config.output_path(), &decrypted.message)?;

    if decrypted.message == plaintext {
        info!("decrypted plaintext matches the input");
    } else {
        warn!("decrypted plaintext differs from the input");
    }

    Ok(decrypted)
}

//! Text persistence for keys and ciphertexts.
//!
//! Every value is stored as one `key=value` line holding the Base64 (standard alphabet,
//! no padding) of its canonical bytes. Attribute-indexed components use the attribute
//! number as key suffix (`T3`, `D12`). The reader accepts Java properties style files:
//! blank lines and lines starting with `#` or `!` are skipped and unknown keys ignored.
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use itertools::Itertools;
use tracing::debug;

use crate::abe_attribute::AbeAttribute;
use crate::errors::abe_error::AbeError;
use crate::errors::parse_error::ParseError;
use crate::group::{CanonicalBytes, Gt};
use crate::models::{AbeCipherText, AbeMasterKey, AbePublicKey, AbeSecretKey};

const BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Conversion between key material and `key=value` text.
pub trait KeyValueEncoding: Sized {
    /// Written as the leading comment line.
    const DESCRIPTION: &'static str;

    /// Entries in output order.
    fn to_key_values(&self) -> Result<Vec<(String, String)>, AbeError>;

    fn from_key_values(entries: &BTreeMap<String, String>) -> Result<Self, AbeError>;

    fn to_text(&self) -> Result<String, AbeError> {
        let mut text = format!("# {}\n", Self::DESCRIPTION);
        for (key, value) in self.to_key_values()? {
            text.push_str(&key);
            text.push('=');
            text.push_str(&value);
            text.push('\n');
        }
        Ok(text)
    }

    fn from_text(text: &str) -> Result<Self, AbeError> {
        let entries = parse_key_values(text)?;
        Self::from_key_values(&entries)
    }

    fn store<P: AsRef<Path>>(&self, path: P) -> Result<(), AbeError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "storing {}", Self::DESCRIPTION);
        fs::write(path, self.to_text()?)?;
        Ok(())
    }

    fn load<P: AsRef<Path>>(path: P) -> Result<Self, AbeError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading {}", Self::DESCRIPTION);
        Self::from_text(&fs::read_to_string(path)?)
    }
}

/// Splits `text` into its entries. A later duplicate key replaces an earlier one.
pub fn parse_key_values(text: &str) -> Result<BTreeMap<String, String>, ParseError> {
    let mut entries = BTreeMap::new();
    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }

        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| ParseError::new("Expected key=value", number + 1))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(ParseError::new("Empty key", number + 1));
        }
        entries.insert(key.to_string(), value.trim().to_string());
    }
    Ok(entries)
}

pub fn encode_value<T: CanonicalBytes>(value: &T) -> Result<String, AbeError> {
    Ok(BASE64.encode(value.to_canonical_bytes()?))
}

pub fn decode_value<T: CanonicalBytes>(
    entries: &BTreeMap<String, String>,
    key: &str,
) -> Result<T, AbeError> {
    let value = entries
        .get(key)
        .ok_or_else(|| AbeError::encoding(format!("missing key '{}'", key)))?;
    decode(key, value)
}

fn decode<T: CanonicalBytes>(key: &str, value: &str) -> Result<T, AbeError> {
    let bytes = BASE64
        .decode(value)
        .map_err(|e| AbeError::encoding(format!("invalid Base64 for '{}': {}", key, e)))?;
    T::from_canonical_bytes(&bytes)
        .map_err(|e| AbeError::encoding(format!("invalid value for '{}': {}", key, e)))
}

/// Collects every entry named `<prefix><attribute>`.
fn attribute_entries<T: CanonicalBytes>(
    entries: &BTreeMap<String, String>,
    prefix: &str,
) -> Result<BTreeMap<AbeAttribute, T>, AbeError> {
    let mut components = BTreeMap::new();
    for (key, value) in entries {
        let suffix = match key.strip_prefix(prefix) {
            Some(suffix) if !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) => {
                suffix
            }
            _ => continue,
        };
        let attribute = suffix
            .parse::<AbeAttribute>()
            .map_err(|e| AbeError::encoding(format!("invalid attribute in key '{}': {}", key, e)))?;
        components.insert(attribute, decode(key, value)?);
    }
    Ok(components)
}

fn attribute_key_values<T: CanonicalBytes>(
    prefix: &str,
    components: &BTreeMap<AbeAttribute, T>,
) -> Result<Vec<(String, String)>, AbeError> {
    components
        .iter()
        .map(|(attribute, value)| Ok((format!("{}{}", prefix, attribute), encode_value(value)?)))
        .collect()
}

/// Renders an attribute list as `[1, 2, 4, 5]`.
pub fn format_attribute_list(attributes: &BTreeSet<AbeAttribute>) -> String {
    format!("[{}]", attributes.iter().join(", "))
}

pub fn parse_attribute_list(text: &str) -> Result<BTreeSet<AbeAttribute>, AbeError> {
    let inner = text
        .trim()
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .ok_or_else(|| AbeError::encoding(format!("attribute list '{}' is not bracketed", text)))?;
    if inner.trim().is_empty() {
        return Ok(BTreeSet::new());
    }
    inner
        .split(',')
        .map(|item| {
            item.parse::<AbeAttribute>()
                .map_err(|e| AbeError::encoding(format!("invalid attribute list '{}': {}", text, e)))
        })
        .collect()
}

fn require_components<T>(
    components: &BTreeMap<AbeAttribute, T>,
    prefix: &str,
    description: &str,
) -> Result<(), AbeError> {
    if components.is_empty() {
        return Err(AbeError::encoding(format!(
            "{} has no '{}<attribute>' entries",
            description, prefix
        )));
    }
    Ok(())
}

impl KeyValueEncoding for AbeMasterKey {
    const DESCRIPTION: &'static str = "master secret key";

    fn to_key_values(&self) -> Result<Vec<(String, String)>, AbeError> {
        let mut entries = attribute_key_values("t", &self.small_t)?;
        entries.push(("y".to_string(), encode_value(&self.y)?));
        Ok(entries)
    }

    fn from_key_values(entries: &BTreeMap<String, String>) -> Result<Self, AbeError> {
        let small_t = attribute_entries(entries, "t")?;
        require_components(&small_t, "t", Self::DESCRIPTION)?;
        Ok(AbeMasterKey {
            y: decode_value(entries, "y")?,
            small_t,
        })
    }
}

impl KeyValueEncoding for AbePublicKey {
    const DESCRIPTION: &'static str = "public key";

    fn to_key_values(&self) -> Result<Vec<(String, String)>, AbeError> {
        let mut entries = attribute_key_values("T", &self.big_t)?;
        entries.push(("egg_y".to_string(), encode_value(&self.y)?));
        entries.push(("g".to_string(), encode_value(&self.g1)?));
        entries.push(("g2".to_string(), encode_value(&self.g2)?));
        Ok(entries)
    }

    fn from_key_values(entries: &BTreeMap<String, String>) -> Result<Self, AbeError> {
        let big_t = attribute_entries(entries, "T")?;
        require_components(&big_t, "T", Self::DESCRIPTION)?;
        let y: Gt = decode_value(entries, "egg_y")?;
        if !y.is_pairing_output() {
            return Err(AbeError::encoding(
                "invalid value for 'egg_y': not a pairing output",
            ));
        }
        Ok(AbePublicKey {
            g1: decode_value(entries, "g")?,
            g2: decode_value(entries, "g2")?,
            y,
            big_t,
        })
    }
}

impl KeyValueEncoding for AbeSecretKey {
    const DESCRIPTION: &'static str = "secret key";

    fn to_key_values(&self) -> Result<Vec<(String, String)>, AbeError> {
        attribute_key_values("D", &self.arr_d)
    }

    fn from_key_values(entries: &BTreeMap<String, String>) -> Result<Self, AbeError> {
        Ok(AbeSecretKey {
            arr_d: attribute_entries(entries, "D")?,
        })
    }
}

impl KeyValueEncoding for AbeCipherText {
    const DESCRIPTION: &'static str = "ciphertext";

    fn to_key_values(&self) -> Result<Vec<(String, String)>, AbeError> {
        let mut entries = attribute_key_values("E", &self.arr_e)?;
        entries.push(("EP".to_string(), encode_value(&self.e_prime)?));
        entries.push((
            "messageAttList".to_string(),
            format_attribute_list(&self.attributes),
        ));
        Ok(entries)
    }

    fn from_key_values(entries: &BTreeMap<String, String>) -> Result<Self, AbeError> {
        let arr_e: BTreeMap<AbeAttribute, _> = attribute_entries(entries, "E")?;
        let attributes = entries
            .get("messageAttList")
            .ok_or_else(|| AbeError::encoding("missing key 'messageAttList'"))
            .and_then(|list| parse_attribute_list(list))?;

        if !attributes.iter().eq(arr_e.keys()) {
            return Err(AbeError::encoding(format!(
                "messageAttList {} does not match the E entries {}",
                format_attribute_list(&attributes),
                format_attribute_list(&arr_e.keys().copied().collect())
            )));
        }

        Ok(AbeCipherText {
            attributes,
            e_prime: decode_value(entries, "EP")?,
            arr_e,
        })
    }
}

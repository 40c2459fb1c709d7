use crate::errors;
use crate::storage::MAX_VALUE_LEN;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref KEY_REGEX: Regex = Regex::new(r#"^\d{1,20}$"#).unwrap();
}

/// Validates a textual key and converts it into the `u64` the tree
/// expects.
///
/// # Errors
/// Returns an `errors::Error::Syntax` if the text is not an unsigned
/// decimal integer or does not fit in 64 bits.
pub fn validate_key(text: &str) -> Result<u64, errors::Error> {
    if !KEY_REGEX.is_match(text) {
        return Err(err!(Syntax, "Key ({}) must be an unsigned integer.", text));
    }
    text.parse::<u64>()
        .map_err(|_| err!(Syntax, "Key ({}) does not fit in 64 bits.", text))
}

/// Validates a value literal against what the heap can store.
///
/// # Errors
/// Returns an `errors::Error::Syntax` if the value is empty or longer
/// than a one-byte length prefix allows.
pub fn validate_value(value: &str) -> Result<String, errors::Error> {
    if value.is_empty() {
        return Err(err!(Syntax, "Value cannot be empty."));
    }
    if value.len() > MAX_VALUE_LEN {
        return Err(err!(Syntax, "Value exceeds {} bytes.", MAX_VALUE_LEN));
    }
    Ok(value.to_owned())
}

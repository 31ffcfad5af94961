use crate::error::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

static BVID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"BV[a-zA-Z0-9]+").expect("valid BV regex"));

/// Returns the first `BV…` identifier found anywhere in `input`.
pub fn extract_bvid(input: &str) -> Result<String> {
    BVID_REGEX
        .find(input)
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| Error::NotFound(input.to_string()))
}

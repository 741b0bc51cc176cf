//! # Canonical Encoding
//!
//! Deterministic JSON serialization used as the exact byte sequence that
//! signatures and content ids are computed over. Two conformant TrustMesh
//! implementations must byte-for-byte agree on this encoding or
//! cross-verification of signed records fails.
//!
//! ## Rules
//!
//! 1. **Object keys**: sorted lexicographically by UTF-8 byte sequence
//! 2. **Whitespace**: none outside of string literals
//! 3. **Numbers**: fixed-point formatting, never exponent notation;
//!    whole-valued floats render as integers
//! 4. **Strings**: minimal escaping (`"`, `\`, control characters only)
//! 5. **Arrays**: elements in original order
//!
//! ## Why It Matters
//!
//! A reputation record is signed by the agent that last updated it, and a
//! session record is signed by both participants. Any encoding ambiguity
//! (key order, `1.0` vs `1.00`, exponent notation) would let two honest
//! parties compute different bytes for the same record and reject each
//! other's signatures.
//!
//! ## Example
//!
//! ```rust
//! use trustmesh_ledger::canonical::canonicalize;
//! use serde_json::json;
//!
//! let record = json!({"beta": 2.0, "alpha": 3.5, "agent_id": "did:mesh:a"});
//! assert_eq!(
//!     canonicalize(&record),
//!     r#"{"agent_id":"did:mesh:a","alpha":3.5,"beta":2}"#
//! );
//! ```

use sha2::{Digest, Sha256};

/// A 32-byte SHA-256 digest.
pub type Hash = [u8; 32];

/// Canonicalizes a JSON value into its deterministic string form.
///
/// Semantically identical inputs always produce bytewise identical output.
///
/// # Example
///
/// ```rust
/// use trustmesh_ledger::canonical::canonicalize;
/// use serde_json::json;
///
/// let a = json!({"b": 1, "a": 2});
/// let b = json!({"a": 2, "b": 1});
/// assert_eq!(canonicalize(&a), canonicalize(&b));
/// ```
pub fn canonicalize(value: &serde_json::Value) -> String {
    canonicalize_value(value)
}

/// Canonicalizes a serializable record into signing bytes.
///
/// # Errors
///
/// Returns the underlying `serde_json` error if the value cannot be
/// represented as JSON.
pub fn canonical_bytes<T: serde::Serialize>(record: &T) -> serde_json::Result<Vec<u8>> {
    let value = serde_json::to_value(record)?;
    Ok(canonicalize(&value).into_bytes())
}

/// Computes the SHA-256 hash of a canonicalized JSON value.
pub fn hash_canonical(value: &serde_json::Value) -> Hash {
    let canonical = canonicalize(value);
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hasher.finalize().into()
}

/// Computes the hex content id of a raw payload.
///
/// This is what [`crate::LedgerClient::put`] returns as proof of
/// publication: the SHA-256 of the exact bytes written.
pub fn content_id(payload: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload);
    hex::encode(hasher.finalize())
}

fn canonicalize_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::Bool(b) => {
            if *b {
                "true".to_string()
            } else {
                "false".to_string()
            }
        }
        serde_json::Value::Number(n) => canonicalize_number(n),
        serde_json::Value::String(s) => canonicalize_string(s),
        serde_json::Value::Array(arr) => canonicalize_array(arr),
        serde_json::Value::Object(obj) => canonicalize_object(obj),
    }
}

/// Canonicalizes a JSON number with fixed-point formatting.
///
/// Integers render directly. Floats with no fractional part render as
/// integers; all other floats render with at most 12 fractional digits,
/// trailing zeros trimmed. Exponent notation is never produced.
fn canonicalize_number(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) => format_fixed(f),
        None => n.to_string(),
    }
}

/// Formats a float in fixed-point, never exponent, notation.
fn format_fixed(f: f64) -> String {
    if !f.is_finite() {
        // Not representable in JSON; serde_json will not produce these.
        return "null".to_string();
    }
    if f.fract() == 0.0 && f.abs() < 9.007_199_254_740_992e15 {
        return format!("{}", f as i64);
    }
    let mut s = format!("{f:.12}");
    while s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    s
}

/// Canonicalizes a JSON string with minimal escaping.
///
/// Escapes `"`, `\` and control characters (0x00-0x1F); everything else,
/// including `/` and non-ASCII, passes through as UTF-8.
fn canonicalize_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 2);
    result.push('"');

    for ch in s.chars() {
        match ch {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\x08' => result.push_str("\\b"),
            '\x0C' => result.push_str("\\f"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            c if c < '\x20' => {
                result.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => result.push(c),
        }
    }

    result.push('"');
    result
}

fn canonicalize_array(arr: &[serde_json::Value]) -> String {
    let elements: Vec<String> = arr.iter().map(canonicalize_value).collect();
    format!("[{}]", elements.join(","))
}

/// Canonicalizes a JSON object with byte-lexicographic key order.
fn canonicalize_object(obj: &serde_json::Map<String, serde_json::Value>) -> String {
    let mut entries: Vec<(&String, &serde_json::Value)> = obj.iter().collect();
    entries.sort_by(|(a, _), (b, _)| a.as_bytes().cmp(b.as_bytes()));

    let pairs: Vec<String> = entries
        .iter()
        .map(|(k, v)| format!("{}:{}", canonicalize_string(k), canonicalize_value(v)))
        .collect();

    format!("{{{}}}", pairs.join(","))
}

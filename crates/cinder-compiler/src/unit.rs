//! Compiled, re-invocable units.

use std::fmt::Write as _;
use std::sync::Arc;

use cinder_eval::Code;
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    /// Top-level statements compiled into a host method.
    Statements,
    /// Usings, namespaces and types; runs static field initializers.
    Declarations,
}

/// The product of a successful compile.
///
/// Holds shared handles into the program image, never the image itself.
/// Running a unit again re-executes its code against the same storage.
#[derive(Debug, Clone)]
pub struct CompiledUnit {
    name: String,
    kind: UnitKind,
    code: Arc<Code>,
    fingerprint: String,
}

impl CompiledUnit {
    pub(crate) fn new(name: String, kind: UnitKind, code: Arc<Code>, text: &str) -> Self {
        Self {
            name,
            kind,
            code,
            fingerprint: fingerprint(text),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    pub fn code(&self) -> &Arc<Code> {
        &self.code
    }

    /// Lower-case hex SHA-256 of the chunk text. Identifies the unit in
    /// compile and run events.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

fn fingerprint(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_hex() {
        let a = fingerprint("1 + 2");
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(a, fingerprint("1 + 2"));
        assert_ne!(a, fingerprint("1 + 3"));
        assert_eq!(
            fingerprint(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}

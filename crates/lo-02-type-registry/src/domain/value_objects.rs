//! # Value Objects
//!
//! Version tags and type references.

use crate::domain::RegistryError;
use serde::{Deserialize, Serialize};
use shared_types::{keccak256, Hash};
use std::fmt;
use std::str::FromStr;

/// Version assigned to a type registered without one.
pub const DEFAULT_VERSION: Version = Version { major: 0, minor: 1 };

/// Largest value of either half.
const MAX_HALF: u8 = 99;

/// A `major.minor` version tag, packed on the ledger as `bytes2`.
///
/// Each half is one byte: `"0.1"` packs to `0x0001`, `"01.10"` to `0x010A`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version {
    /// Major half (0-99).
    pub major: u8,
    /// Minor half (0-99).
    pub minor: u8,
}

impl Version {
    /// Build from halves, rejecting values outside 0-99.
    pub fn new(major: u8, minor: u8) -> Result<Self, RegistryError> {
        if major > MAX_HALF || minor > MAX_HALF {
            return Err(RegistryError::InvalidVersion(format!("{major}.{minor}")));
        }
        Ok(Self { major, minor })
    }

    /// The on-ledger `bytes2` value.
    pub fn packed(self) -> u16 {
        u16::from(self.major) << 8 | u16::from(self.minor)
    }

    /// Unpack a `bytes2` value read from the ledger.
    pub fn from_packed(packed: u16) -> Self {
        let [major, minor] = packed.to_be_bytes();
        Self { major, minor }
    }
}

impl Default for Version {
    fn default() -> Self {
        DEFAULT_VERSION
    }
}

impl FromStr for Version {
    type Err = RegistryError;

    /// Parse `"MM.mm"`, each half one or two decimal digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RegistryError::InvalidVersion(s.to_string());
        let (major, minor) = s.split_once('.').ok_or_else(invalid)?;

        let half = |part: &str| -> Result<u8, RegistryError> {
            if part.is_empty() || part.len() > 2 || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse::<u8>().map_err(|_| invalid())
        };

        Self::new(half(major)?, half(minor)?)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Identifier of a type name.
pub fn type_id_for(name: &str) -> Hash {
    keccak256(name.as_bytes())
}

/// A type given either by name or by identifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeRef {
    /// Human-readable name.
    Name(String),
    /// Derived identifier.
    Id(Hash),
}

impl TypeRef {
    /// Interpret caller input: `0x`-prefixed strings are identifiers and
    /// must be exactly 32 bytes, anything else is a name.
    pub fn parse(input: &str) -> Result<Self, RegistryError> {
        if input.starts_with("0x") || input.starts_with("0X") {
            return Hash::from_str(input)
                .map(Self::Id)
                .map_err(|_| RegistryError::InvalidTypeId(input.to_string()));
        }
        Ok(Self::Name(input.to_string()))
    }

    /// The identifier this reference resolves to.
    pub fn type_id(&self) -> Hash {
        match self {
            Self::Name(name) => type_id_for(name),
            Self::Id(id) => *id,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Id(id) => write!(f, "{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_version_packs_to_0x0001() {
        assert_eq!(DEFAULT_VERSION.packed(), 0x0001);
        assert_eq!("0.1".parse::<Version>().unwrap(), DEFAULT_VERSION);
    }

    #[test]
    fn test_padded_halves() {
        assert_eq!("01.10".parse::<Version>().unwrap().packed(), 0x010A);
        assert_eq!("00.02".parse::<Version>().unwrap().packed(), 0x0002);
        assert_eq!("99.99".parse::<Version>().unwrap().packed(), 0x6363);
    }

    #[test]
    fn test_rejects_malformed_versions() {
        for bad in ["", "1", "1.", ".1", "1.2.3", "100.1", "1.100", "a.b", "+1.2", "1.-2"] {
            assert!(
                matches!(bad.parse::<Version>(), Err(RegistryError::InvalidVersion(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_type_ref_parsing() {
        assert_eq!(
            TypeRef::parse("example").unwrap(),
            TypeRef::Name("example".into())
        );
        let id = type_id_for("example");
        assert_eq!(TypeRef::parse(&id.to_string()).unwrap(), TypeRef::Id(id));
        assert!(matches!(
            TypeRef::parse("0x1234"),
            Err(RegistryError::InvalidTypeId(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_version_text_roundtrip(major in 0u8..=99, minor in 0u8..=99) {
            let version = Version::new(major, minor).unwrap();
            let parsed: Version = version.to_string().parse().unwrap();
            prop_assert_eq!(parsed, version);
            prop_assert_eq!(Version::from_packed(version.packed()), version);
        }

        #[test]
        fn prop_type_id_depends_only_on_name(name in "[a-z][a-z0-9-]{0,24}") {
            prop_assert_eq!(type_id_for(&name), type_id_for(&name.clone()));
            prop_assert_eq!(TypeRef::Name(name.clone()).type_id(), type_id_for(&name));
        }
    }
}

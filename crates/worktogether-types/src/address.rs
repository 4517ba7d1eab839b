use blake3::Hasher;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 32-byte account identifier. Contract-like components (registries, pools,
/// the fee manager) own an address of their own to hold custody balances.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountAddress([u8; 32]);

impl AccountAddress {
    /// The empty reference returned by lookups that find nothing.
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Deterministic address for a component, e.g. `derive("pool", 3)`.
    pub fn derive(domain: &str, index: u64) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(b"worktogether/address/");
        hasher.update(domain.as_bytes());
        hasher.update(&[0]);
        hasher.update(&index.to_le_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountAddress(0x{}...)", &self.to_hex()[..8])
    }
}

impl fmt::Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", &self.to_hex()[..16])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_is_deterministic_and_distinct() {
        let a = AccountAddress::derive("pool", 1);
        let b = AccountAddress::derive("pool", 1);
        let c = AccountAddress::derive("pool", 2);
        let d = AccountAddress::derive("issues", 1);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert!(!a.is_zero());
    }

    #[test]
    fn test_hex_roundtrip_accepts_prefix() {
        let addr = AccountAddress::from_bytes([7; 32]);
        let parsed = AccountAddress::from_hex(&format!("0x{}", addr.to_hex())).unwrap();
        assert_eq!(addr, parsed);
        assert!(AccountAddress::from_hex("abcd").is_err());
    }
}

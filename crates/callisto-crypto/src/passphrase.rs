//! User passphrase wrapper

use std::fmt;

use zeroize::Zeroizing;

/// A report passphrase.
///
/// Wiped from memory on drop and never printed: `Debug` is redacted and there
/// is no `Display` or `Serialize` impl.
#[derive(Clone)]
pub struct Passphrase(Zeroizing<String>);

impl Passphrase {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passphrase(<redacted>)")
    }
}

impl From<&str> for Passphrase {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Passphrase {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_redacted() {
        let p = Passphrase::new("super secret");
        let printed = format!("{p:?}");
        assert!(!printed.contains("super"));
        assert!(printed.contains("redacted"));
    }

    #[test]
    fn test_empty() {
        assert!(Passphrase::new("").is_empty());
        assert!(!Passphrase::from("héllo").is_empty());
    }
}

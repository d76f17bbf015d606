// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

macro_rules! request_token {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> u64 {
                self.0
            }

            /// Next token in issue order. Zero is reserved for "never issued".
            pub(crate) const fn next(self) -> Self {
                let next = self.0.wrapping_add(1);
                if next == 0 { Self(1) } else { Self(next) }
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

request_token!(ReloadToken);
request_token!(CheckToken);
request_token!(DeleteToken);

/// Identity of a configuration record. Every entity kind uses free-form
/// string identifiers chosen by the operator.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for RecordId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl PartialEq<str> for RecordId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for RecordId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::{ReloadToken, RecordId};

    #[test]
    fn tokens_skip_zero_on_wrap() {
        assert_eq!(ReloadToken::default().next().get(), 1);
        assert_eq!(ReloadToken::new(u64::MAX).next().get(), 1);
        assert!(ReloadToken::new(4).next() > ReloadToken::new(4));
    }

    #[test]
    fn record_id_compares_with_str() {
        let id = RecordId::from("dev1");
        assert_eq!(id, "dev1");
        assert_eq!(id.to_string(), "dev1");
    }
}

//! Session - 認証済みの利用者とその資格情報
//!
//! Session は identity と credential を必ずセットで持ちます。
//! 片方だけの状態は型として存在できません（`Option<Session>` で有無を表す）。

use std::fmt;

use serde::{Deserialize, Serialize};

/// Who is signed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,
    #[serde(rename = "fullName")]
    pub display_name: String,
}

/// Opaque bearer token issued by the server.
///
/// `Debug` is redacted so tokens never end up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub identity: Identity,
    pub credential: Credential,
}

impl Session {
    pub fn new(identity: Identity, credential: Credential) -> Self {
        Self {
            identity,
            credential,
        }
    }
}

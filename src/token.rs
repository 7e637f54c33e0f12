use serde::Serialize;
use std::fmt;

/// Identifies one outbound request within a logical slot.
///
/// Tokens only grow, so a response is current exactly when its token equals
/// the latest one issued for its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct RequestToken(u64);

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct TokenIssuer {
    latest: RequestToken,
}

impl TokenIssuer {
    pub fn issue(&mut self) -> RequestToken {
        self.latest = RequestToken(self.latest.0 + 1);
        self.latest
    }

    pub fn latest(&self) -> RequestToken {
        self.latest
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        token == self.latest && token != RequestToken::default()
    }
}

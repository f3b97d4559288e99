//! Server directive tokens.
//!
//! The server answers the sensor and status handlers with a plain-text,
//! comma-separated token list. The list is parsed once into a
//! [`DirectiveSet`]; unrecognized tokens are ignored for forward
//! compatibility, and the cycle applies recognized directives in a fixed
//! order regardless of their position in the response.

use std::str::FromStr;

/// One recognized server instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Stop recording altogether (sensor handler).
    StopRecording,
    /// Archive the current ledger as a numbered set and start fresh.
    NewSet,
    /// The configured password was rejected; keep recording locally.
    WrongPassword,
    /// The device never checked in on the server; keep recording locally.
    DeviceMissing,
    /// Resume recording (status handler).
    Record,
}

impl Directive {
    /// Every recognized directive, in wire-vocabulary order.
    pub const ALL: [Directive; 5] = [
        Directive::StopRecording,
        Directive::NewSet,
        Directive::WrongPassword,
        Directive::DeviceMissing,
        Directive::Record,
    ];

    /// The wire token for this directive.
    pub fn token(self) -> &'static str {
        match self {
            Directive::StopRecording => "Stop Recording",
            Directive::NewSet => "New Set",
            Directive::WrongPassword => "Wrong Password",
            Directive::DeviceMissing => "Device does not exist",
            Directive::Record => "Record",
        }
    }
}

impl FromStr for Directive {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Directive::ALL
            .into_iter()
            .find(|directive| directive.token() == s)
            .ok_or(())
    }
}

/// The set of directives present in one server response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectiveSet(Vec<Directive>);

impl DirectiveSet {
    pub fn contains(&self, directive: Directive) -> bool {
        self.0.contains(&directive)
    }
}

impl FromIterator<Directive> for DirectiveSet {
    fn from_iter<I: IntoIterator<Item = Directive>>(iter: I) -> Self {
        let mut set = Vec::new();
        for directive in iter {
            if !set.contains(&directive) {
                set.push(directive);
            }
        }
        Self(set)
    }
}

/// Parse a comma-separated response body into a [`DirectiveSet`].
///
/// Tokens are trimmed of surrounding whitespace; duplicates collapse;
/// unrecognized tokens are dropped.
pub fn parse_directives(body: &str) -> DirectiveSet {
    body.split(',')
        .filter_map(|token| token.trim().parse().ok())
        .collect()
}

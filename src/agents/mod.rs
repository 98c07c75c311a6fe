//! Training algorithms
mod mock;
mod pg;

pub use mock::MockAlgorithm;
pub use pg::PolicyGradient;

use crate::error::AgentError;
use std::fmt;
use std::str::FromStr;

/// Algorithms that can be selected by name.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AlgorithmKind {
    /// Policy gradient, `PG`.
    PolicyGradient,
    /// Mock algorithm for testing, `__fake`.
    Mock,
}

impl AlgorithmKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::PolicyGradient => "PG",
            Self::Mock => "__fake",
        }
    }
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for AlgorithmKind {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        get_agent_class(s)
    }
}

/// The algorithm registered under a name.
pub fn get_agent_class(name: &str) -> Result<AlgorithmKind, AgentError> {
    match name {
        "PG" => Ok(AlgorithmKind::PolicyGradient),
        "__fake" => Ok(AlgorithmKind::Mock),
        _ => Err(AgentError::UnknownAlgorithm(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("PG", AlgorithmKind::PolicyGradient)]
    #[case("__fake", AlgorithmKind::Mock)]
    fn lookup_known(#[case] name: &str, #[case] expected: AlgorithmKind) {
        assert_eq!(get_agent_class(name).unwrap(), expected);
        assert_eq!(expected.to_string(), name);
    }

    #[rstest]
    #[case("PPO")]
    #[case("pg")]
    #[case("")]
    fn lookup_unknown(#[case] name: &str) {
        assert!(matches!(
            name.parse::<AlgorithmKind>(),
            Err(AgentError::UnknownAlgorithm(n)) if n == name
        ));
    }
}

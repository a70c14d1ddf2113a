use std::fmt::{Display, Formatter, Result as FmtResult};

/// A `major.minor` version where either part may be absent.
///
/// Ordering compares `major` first; an absent part sorts before any present
/// one, so `Foo 2` < `Foo 2.0` < `Foo 2.1`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Version {
    pub major: Option<u32>,
    pub minor: Option<u32>,
}
impl Version {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major: Some(major), minor: Some(minor) }
    }

    pub const fn major(major: u32) -> Self {
        Self { major: Some(major), minor: None }
    }

    /// Version with neither part set.
    pub const fn none() -> Self {
        Self { major: None, minor: None }
    }

    pub fn is_empty(&self) -> bool {
        self.major.is_none()
    }

    /// Parse `M` or `M.m`. Anything else yields `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let captures = crate::consts::VERSION_REGEX.captures(text.trim())?;
        Some(Self {
            major: Some(captures.get(1)?.as_str().parse().ok()?),
            minor: match captures.get(2) {
                Some(minor) => Some(minor.as_str().parse().ok()?),
                None => None,
            },
        })
    }
}
impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match (self.major, self.minor) {
            (Some(major), Some(minor)) => write!(f, "{major}.{minor}"),
            (Some(major), None) => write!(f, "{major}"),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1.0", Some(Version::new(1, 0)))]
    #[case("2.15", Some(Version::new(2, 15)))]
    #[case("6", Some(Version::major(6)))]
    #[case(" 3.1 ", Some(Version::new(3, 1)))]
    #[case("1.", None)]
    #[case("1.2.3", None)]
    #[case("one", None)]
    #[case("", None)]
    fn test_parse(#[case] input: &str, #[case] expected: Option<Version>) {
        assert_eq!(Version::parse(input), expected);
    }

    #[test]
    fn test_ordering() {
        assert!(Version::none() < Version::major(1));
        assert!(Version::major(2) < Version::new(2, 0));
        assert!(Version::new(2, 0) < Version::new(2, 1));
        assert!(Version::new(1, 9) < Version::new(2, 0));
    }

    #[test]
    fn test_display() {
        assert_eq!(Version::new(2, 15).to_string(), "2.15");
        assert_eq!(Version::major(6).to_string(), "6");
        assert_eq!(Version::none().to_string(), "");
    }
}

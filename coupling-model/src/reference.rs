//! Structured names for simulation objects.
//!
//! A [`Reference`] is a non-empty dotted sequence of identifiers, optionally
//! interleaved with integer indices in square brackets: `macro.micro[3][1]`.
//! References name instances, ports, and settings throughout the framework,
//! and they are parsed rather than kept as strings so that prefix and index
//! manipulation is exact.

use {
    serde::{Deserialize, Serialize},
    std::{fmt, str::FromStr},
    thiserror::Error,
};

/// Errors produced when parsing or building names.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    /// The identifier does not match `[A-Za-z_][A-Za-z0-9_]*`.
    #[error(
        "invalid identifier '{0}': identifiers start with a letter or \
         underscore and contain only letters, digits, and underscores"
    )]
    InvalidIdentifier(String),

    /// The reference string could not be parsed.
    #[error("invalid reference '{text}': {problem}")]
    Malformed {
        /// The offending input.
        text: String,
        /// What went wrong.
        problem: String,
    },

    /// A reference must contain at least one part.
    #[error("a reference must not be empty")]
    Empty,
}

/// A valid name for a compute element, port, or setting segment.
///
/// Identifiers start with a letter or underscore and contain only letters,
/// digits, and underscores.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(String);

impl Identifier {
    /// Validate `name` and wrap it as an identifier.
    pub fn new(name: &str) -> Result<Self, ReferenceError> {
        let mut chars = name.chars();
        let valid_start = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid_start || !valid_rest {
            return Err(ReferenceError::InvalidIdentifier(name.to_string()));
        }
        Ok(Self(name.to_string()))
    }

    /// View the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Identifier {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Identifier {
    type Error = ReferenceError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(&s)
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One part of a [`Reference`]: either an identifier or an integer index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RefPart {
    /// A named segment, e.g. `micro` in `macro.micro[3]`.
    Identifier(Identifier),
    /// An index segment, e.g. `3` in `macro.micro[3]`.
    Index(usize),
}

impl RefPart {
    /// Whether this part is an identifier.
    pub fn is_identifier(&self) -> bool {
        matches!(self, RefPart::Identifier(_))
    }

    /// Whether this part is an index.
    pub fn is_index(&self) -> bool {
        matches!(self, RefPart::Index(_))
    }

    /// The index value, if this part is an index.
    pub fn index(&self) -> Option<usize> {
        match self {
            RefPart::Index(i) => Some(*i),
            RefPart::Identifier(_) => None,
        }
    }
}

/// A structured name: identifiers separated by dots, with optional integer
/// indices in square brackets.
///
/// Grammar: `identifier ('.' identifier | '[' integer ']')*`. A reference is
/// never empty and always starts with an identifier.
///
/// ```
/// use mcf_coupling_model::Reference;
///
/// let r: Reference = "macro.micro[3][1]".parse().unwrap();
/// assert_eq!(r.len(), 4);
/// assert_eq!(r.to_string(), "macro.micro[3][1]");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Reference(Vec<RefPart>);

impl Reference {
    /// The parts of this reference, in order.
    pub fn parts(&self) -> &[RefPart] {
        &self.0
    }

    /// Number of parts.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// A copy of this reference with `index` appended as a trailing index.
    pub fn with_index(&self, index: usize) -> Reference {
        let mut parts = self.0.clone();
        parts.push(RefPart::Index(index));
        Reference(parts)
    }

    /// Concatenate two references.
    pub fn join(&self, other: &Reference) -> Reference {
        let mut parts = self.0.clone();
        parts.extend(other.0.iter().cloned());
        Reference(parts)
    }

    /// The first `len` parts as a new reference.
    ///
    /// `len` must be between 1 and `self.len()`.
    pub fn truncated(&self, len: usize) -> Reference {
        debug_assert!(len >= 1 && len <= self.0.len());
        Reference(self.0[..len].to_vec())
    }

    /// The leading run of identifier parts.
    ///
    /// For an instance name such as `macro.meso[2]` this is the compute
    /// element name `macro.meso`.
    pub fn leading_identifiers(&self) -> Reference {
        let end = self
            .0
            .iter()
            .position(|p| p.is_index())
            .unwrap_or(self.0.len());
        Reference(self.0[..end].to_vec())
    }

    /// The run of index parts that follows the leading identifiers.
    ///
    /// For `macro.meso[2][0]` this is `[2, 0]`; empty when the name carries
    /// no index.
    pub fn trailing_indices(&self) -> Vec<usize> {
        self.0
            .iter()
            .skip_while(|p| p.is_identifier())
            .map_while(|p| p.index())
            .collect()
    }
}

impl From<Identifier> for Reference {
    fn from(id: Identifier) -> Self {
        Reference(vec![RefPart::Identifier(id)])
    }
}

impl FromStr for Reference {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ReferenceError::Empty);
        }
        let malformed = |problem: &str| ReferenceError::Malformed {
            text: s.to_string(),
            problem: problem.to_string(),
        };

        let mut parts = Vec::new();
        let mut rest = s;

        // Leading identifier, then any sequence of '.name' and '[index]'.
        let end = rest
            .find(|c| c == '.' || c == '[')
            .unwrap_or(rest.len());
        parts.push(RefPart::Identifier(Identifier::new(&rest[..end])?));
        rest = &rest[end..];

        while !rest.is_empty() {
            if let Some(tail) = rest.strip_prefix('.') {
                let end = tail
                    .find(|c| c == '.' || c == '[')
                    .unwrap_or(tail.len());
                parts.push(RefPart::Identifier(Identifier::new(&tail[..end])?));
                rest = &tail[end..];
            } else if let Some(tail) = rest.strip_prefix('[') {
                let end = tail
                    .find(']')
                    .ok_or_else(|| malformed("unterminated index"))?;
                let index = tail[..end]
                    .parse::<usize>()
                    .map_err(|_| malformed("index is not a non-negative integer"))?;
                parts.push(RefPart::Index(index));
                rest = &tail[end + 1..];
            } else {
                return Err(malformed("expected '.' or '['"));
            }
        }
        Ok(Reference(parts))
    }
}

impl TryFrom<String> for Reference {
    type Error = ReferenceError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Reference> for String {
    fn from(r: Reference) -> Self {
        r.to_string()
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.0.iter().enumerate() {
            match part {
                RefPart::Identifier(id) => {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    write!(f, "{id}")?;
                }
                RefPart::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_validation() {
        assert!(Identifier::new("macro").is_ok());
        assert!(Identifier::new("_under_score2").is_ok());
        assert!(Identifier::new("").is_err());
        assert!(Identifier::new("2fast").is_err());
        assert!(Identifier::new("has space").is_err());
        assert!(Identifier::new("dot.ted").is_err());
    }

    #[test]
    fn test_parse_plain_identifier() {
        let r: Reference = "macro".parse().unwrap();
        assert_eq!(r.len(), 1);
        assert_eq!(r.to_string(), "macro");
    }

    #[test]
    fn test_parse_dotted_with_indices() {
        let r: Reference = "macro.micro[3][1]".parse().unwrap();
        assert_eq!(r.len(), 4);
        assert!(r.parts()[0].is_identifier());
        assert!(r.parts()[1].is_identifier());
        assert_eq!(r.parts()[2].index(), Some(3));
        assert_eq!(r.parts()[3].index(), Some(1));
        assert_eq!(r.to_string(), "macro.micro[3][1]");
    }

    #[test]
    fn test_identifier_after_index() {
        // Scoped settings keys look like this: instance prefix plus name.
        let r: Reference = "macro[3].dt".parse().unwrap();
        assert_eq!(r.len(), 3);
        assert_eq!(r.to_string(), "macro[3].dt");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<Reference>().is_err());
        assert!("[3]".parse::<Reference>().is_err());
        assert!("macro[".parse::<Reference>().is_err());
        assert!("macro[x]".parse::<Reference>().is_err());
        assert!("macro[-1]".parse::<Reference>().is_err());
        assert!("macro..micro".parse::<Reference>().is_err());
        assert!("macro]3".parse::<Reference>().is_err());
    }

    #[test]
    fn test_with_index_and_join() {
        let port: Reference = "state_in".parse().unwrap();
        assert_eq!(port.with_index(7).to_string(), "state_in[7]");

        let instance: Reference = "macro[2]".parse().unwrap();
        let setting: Reference = "dt".parse().unwrap();
        assert_eq!(instance.join(&setting).to_string(), "macro[2].dt");
    }

    #[test]
    fn test_identity_split() {
        let name: Reference = "macro.meso[2][0]".parse().unwrap();
        assert_eq!(name.leading_identifiers().to_string(), "macro.meso");
        assert_eq!(name.trailing_indices(), vec![2, 0]);

        let plain: Reference = "macro".parse().unwrap();
        assert_eq!(plain.leading_identifiers(), plain);
        assert!(plain.trailing_indices().is_empty());
    }

    #[test]
    fn test_truncated() {
        let r: Reference = "a.b[1]".parse().unwrap();
        assert_eq!(r.truncated(1).to_string(), "a");
        assert_eq!(r.truncated(3), r);
    }
}

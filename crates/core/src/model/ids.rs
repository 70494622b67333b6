use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error type for parsing an ID from a string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

// Row ids are SQLite INTEGER PRIMARY KEYs, so every id wraps an `i64`.
macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            #[must_use]
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the underlying row id
            #[must_use]
            pub fn value(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<i64>()
                    .map($name::new)
                    .map_err(|_| ParseIdError {
                        kind: stringify!($name),
                    })
            }
        }
    };
}

row_id!(
    /// Unique identifier for a student account
    StudentId
);
row_id!(
    /// Unique identifier for a teacher account
    TeacherId
);
row_id!(
    /// Unique identifier for a subject module (e.g. Algebra)
    ModuleId
);
row_id!(
    /// Unique identifier for a concept within a module
    ConceptId
);
row_id!(QuestionId);
row_id!(PuzzleId);
row_id!(
    /// Unique identifier for a quiz session
    SessionId
);
row_id!(AnswerId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_bare_number() {
        assert_eq!(StudentId::new(42).to_string(), "42");
        assert_eq!(format!("{:?}", SessionId::new(7)), "SessionId(7)");
    }

    #[test]
    fn parses_from_path_segment() {
        let id: QuestionId = "123".parse().unwrap();
        assert_eq!(id, QuestionId::new(123));
    }

    #[test]
    fn rejects_non_numeric() {
        let err = "abc".parse::<ModuleId>().unwrap_err();
        assert_eq!(err.to_string(), "failed to parse ModuleId from string");
    }

    #[test]
    fn serializes_transparently() {
        let json = serde_json::to_string(&ConceptId::new(5)).unwrap();
        assert_eq!(json, "5");
    }
}

//! `-f` selector parsing.

use std::fmt;
use std::str::FromStr;

use samtest_core::TestCase;

use crate::error::{Result, RunnerError};

/// Which tests a run executes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    /// Every test of every function.
    #[default]
    All,
    /// Every test of one function.
    Function(String),
    /// One test, by 1-based position within its function's suite.
    Single {
        /// Logical function name.
        function: String,
        /// 1-based test index.
        index: usize,
    },
}

impl Selection {
    /// Parses `NAME`, `NAME.*`, `NAME.0` or `NAME.INDEX`.
    ///
    /// # Errors
    /// Returns a usage error for an empty name or a non-numeric index.
    pub fn parse(selector: &str) -> Result<Self> {
        let (function, index) = match selector.split_once('.') {
            Some((function, index)) => (function, Some(index)),
            None => (selector, None),
        };

        if function.is_empty() {
            return Err(RunnerError::usage(format!(
                "invalid selector {selector:?}: function name is empty"
            )));
        }

        match index {
            None | Some("*" | "0") => Ok(Self::Function(function.to_string())),
            Some(index) => {
                let index = index.parse::<usize>().map_err(|_| {
                    RunnerError::usage(format!(
                        "invalid selector {selector:?}: index must be a number or *"
                    ))
                })?;
                Ok(Self::Single {
                    function: function.to_string(),
                    index,
                })
            }
        }
    }

    /// Checks that debug mode targets exactly one test.
    ///
    /// # Errors
    /// Returns a usage error unless this is a [`Selection::Single`].
    pub fn require_single(&self) -> Result<()> {
        match self {
            Self::Single { .. } => Ok(()),
            _ => Err(RunnerError::usage(
                "Debug mode requires a single function and index to be specified via -f",
            )),
        }
    }

    /// Returns true if any test of `function` may run.
    #[must_use]
    pub fn includes_function(&self, function: &str) -> bool {
        match self {
            Self::All => true,
            Self::Function(name) | Self::Single { function: name, .. } => name == function,
        }
    }

    /// Picks the selected tests of `function`, paired with their 1-based index.
    #[must_use]
    pub fn select<'a>(&self, function: &str, cases: &'a [TestCase]) -> Vec<(usize, &'a TestCase)> {
        if !self.includes_function(function) {
            return Vec::new();
        }
        let numbered = cases.iter().enumerate().map(|(i, case)| (i + 1, case));
        match self {
            Self::Single { index, .. } => numbered.filter(|(i, _)| i == index).collect(),
            _ => numbered.collect(),
        }
    }
}

impl FromStr for Selection {
    type Err = RunnerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "*"),
            Self::Function(function) => write!(f, "{function}.*"),
            Self::Single { function, index } => write!(f, "{function}.{index}"),
        }
    }
}

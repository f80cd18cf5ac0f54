//! Controller filtering for -e controllers= expressions
//!
//! Supports:
//! - Individual controllers: -e controllers=StudentController.enrol,Admin.login
//! - Regex patterns: -e controllers=/^Student/
//! - Negation: -e controllers=!Admin.login or -e controllers=!/Test$/
//!
//! Without any include term every controller is analysed except the
//! excluded ones.

use regex::Regex;
use std::collections::HashSet;
use thiserror::Error;

/// Errors from parsing a controller filter expression
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid filter expression: {0}. Expected format: controllers=NAME,/REGEX/,!NAME")]
    InvalidExpression(String),

    #[error("Invalid regex pattern '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Controller filter that determines which controllers to analyse
#[derive(Debug, Clone, Default)]
pub struct ControllerFilter {
    /// Names to include (None = no name includes)
    include: Option<HashSet<String>>,
    include_patterns: Vec<Regex>,
    exclude: HashSet<String>,
    exclude_patterns: Vec<Regex>,
}

impl ControllerFilter {
    /// Create a filter that includes all controllers
    pub fn all() -> Self {
        Self::default()
    }

    /// Parse a filter expression like "controllers=A,B,!/Test$/"
    pub fn from_expr(expr: &str) -> Result<Self, FilterError> {
        match expr.strip_prefix("controllers=") {
            Some(list) => Self::from_list(list),
            None => Err(FilterError::InvalidExpression(expr.to_string())),
        }
    }

    /// Parse the part after "controllers="
    fn from_list(list: &str) -> Result<Self, FilterError> {
        let mut filter = Self::all();

        for part in list.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            let (negated, term) = match part.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, part),
            };

            if let Some(pattern) = term
                .strip_prefix('/')
                .and_then(|rest| rest.strip_suffix('/'))
            {
                let regex = Regex::new(pattern).map_err(|source| FilterError::InvalidRegex {
                    pattern: pattern.to_string(),
                    source,
                })?;
                if negated {
                    filter.exclude_patterns.push(regex);
                } else {
                    filter.include_patterns.push(regex);
                }
            } else if negated {
                filter.exclude.insert(term.to_string());
            } else {
                filter
                    .include
                    .get_or_insert_with(HashSet::new)
                    .insert(term.to_string());
            }
        }

        Ok(filter)
    }

    fn has_includes(&self) -> bool {
        self.include.is_some() || !self.include_patterns.is_empty()
    }

    /// Check if a controller should be analysed
    pub fn should_analyze(&self, controller: &str) -> bool {
        if self.exclude.contains(controller)
            || self.exclude_patterns.iter().any(|re| re.is_match(controller))
        {
            return false;
        }

        if !self.has_includes() {
            return true;
        }

        self.include
            .as_ref()
            .is_some_and(|set| set.contains(controller))
            || self.include_patterns.iter().any(|re| re.is_match(controller))
    }
}

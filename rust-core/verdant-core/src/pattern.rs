//! # Path Pattern Compiler
//!
//! Compiles a declared route path into a matcher plus the ordered list of
//! parameter names it captures.
//!
//! ## Syntax
//!
//! - `/users` - literal segment
//! - `/users/:id` - named parameter, one segment
//! - `/users/:id(int)` - typed parameter (`int`, `float`, `bool`, `alpha`, `string`)
//! - `/files/:name([a-z]+\.txt)` - parameter constrained by a custom regex
//! - `/static/*file` or `/static/*` - trailing wildcard, one or more characters
//!   including slashes
//! - `*` - matches every path; compilation is skipped
//!
//! Fully literal paths never touch the regex engine.

use crate::error::{Error, Result};
use crate::params::Params;
use crate::types::ParamType;
use regex::Regex;
use std::sync::Arc;

/// Path that matches every request
pub const MATCH_EVERYTHING: &str = "*";

/// How a parameter segment restricts its value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// One of the named types
    Type(ParamType),
    /// A user supplied regex
    Regex(String),
}

/// One parsed segment of a route path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal text
    Static(String),
    /// `:name` or `:name(constraint)`
    Param {
        /// Parameter name
        name: Arc<str>,
        /// Value restriction
        constraint: Constraint,
    },
    /// `*name` or `*`
    Wildcard {
        /// Capture name, `None` for the anonymous form
        name: Option<Arc<str>>,
    },
}

#[derive(Debug)]
enum Matcher {
    Everything,
    Literal,
    Regex {
        regex: Regex,
        /// Capture group index for each entry of `names`
        groups: Vec<usize>,
    },
}

/// A compiled route path
#[derive(Debug)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
    names: Vec<Arc<str>>,
    matcher: Matcher,
}

impl PathPattern {
    /// Compile a declared path
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutePattern` for a missing leading slash, an
    /// unterminated or empty constraint, an empty or duplicate parameter name,
    /// a wildcard that is not the last segment, or a custom regex that does
    /// not compile.
    pub fn compile(path: &str) -> Result<Self> {
        if path == MATCH_EVERYTHING {
            return Ok(Self {
                raw: path.to_string(),
                segments: Vec::new(),
                names: Vec::new(),
                matcher: Matcher::Everything,
            });
        }

        let invalid = |reason: String| Error::InvalidRoutePattern {
            pattern: path.to_string(),
            reason,
        };

        let rest = path
            .strip_prefix('/')
            .ok_or_else(|| invalid("path must start with '/'".to_string()))?;

        let mut segments = Vec::new();
        let mut names: Vec<Arc<str>> = Vec::new();
        let raw_segments = split_segments(rest).map_err(invalid)?;
        let count = raw_segments.len();

        for (i, raw) in raw_segments.into_iter().enumerate() {
            let segment = parse_segment(raw).map_err(invalid)?;
            if matches!(segment, Segment::Wildcard { .. }) && i + 1 != count {
                return Err(invalid("wildcard must be the last segment".to_string()));
            }
            let name = match &segment {
                Segment::Param { name, .. } | Segment::Wildcard { name: Some(name) } => {
                    Some(name.clone())
                }
                _ => None,
            };
            if let Some(name) = name {
                if names.contains(&name) {
                    return Err(invalid(format!("duplicate parameter name '{name}'")));
                }
                names.push(name);
            }
            segments.push(segment);
        }

        let literal = segments.iter().all(|s| matches!(s, Segment::Static(_)));
        let matcher = if literal {
            Matcher::Literal
        } else {
            build_regex(&segments).map_err(invalid)?
        };

        Ok(Self {
            raw: path.to_string(),
            segments,
            names,
            matcher,
        })
    }

    /// The path exactly as declared
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Parsed segments in declaration order
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Captured parameter names in declaration order
    #[must_use]
    pub fn param_names(&self) -> &[Arc<str>] {
        &self.names
    }

    /// Whether this is the `*` catch-all
    #[must_use]
    pub fn matches_everything(&self) -> bool {
        matches!(self.matcher, Matcher::Everything)
    }

    /// Test a request path without extracting anything
    #[must_use]
    pub fn is_match(&self, path: &str) -> bool {
        match &self.matcher {
            Matcher::Everything => true,
            Matcher::Literal => self.raw == path,
            Matcher::Regex { regex, .. } => regex.is_match(path),
        }
    }

    /// Match a request path and append its parameters to `params`
    ///
    /// Returns `false` and leaves `params` untouched when the path does not match.
    pub fn captures(&self, path: &str, params: &mut Params) -> bool {
        match &self.matcher {
            Matcher::Everything => true,
            Matcher::Literal => self.raw == path,
            Matcher::Regex { regex, groups } => {
                let Some(caps) = regex.captures(path) else {
                    return false;
                };
                for (name, group) in self.names.iter().zip(groups) {
                    let value = caps.get(*group).map_or("", |m| m.as_str());
                    params.push(name.clone(), value);
                }
                true
            }
        }
    }

    /// Declared type of a parameter
    ///
    /// Custom-regex parameters and wildcards report `ParamType::String`.
    #[must_use]
    pub fn param_type(&self, name: &str) -> Option<ParamType> {
        self.segments.iter().find_map(|segment| match segment {
            Segment::Param {
                name: n,
                constraint,
            } if &**n == name => Some(match constraint {
                Constraint::Type(t) => *t,
                Constraint::Regex(_) => ParamType::String,
            }),
            Segment::Wildcard { name: Some(n) } if &**n == name => Some(ParamType::String),
            _ => None,
        })
    }
}

/// Split on `/`, ignoring slashes inside a parenthesised constraint
fn split_segments(path: &str) -> std::result::Result<Vec<&str>, String> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in path.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| "unbalanced ')'".to_string())?;
            }
            '/' if depth == 0 => {
                out.push(&path[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err("unterminated type constraint".to_string());
    }
    out.push(&path[start..]);
    Ok(out)
}

fn valid_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_segment(raw: &str) -> std::result::Result<Segment, String> {
    if let Some(spec) = raw.strip_prefix(':') {
        let (name, constraint) = match spec.find('(') {
            Some(open) => {
                let inner = spec[open + 1..]
                    .strip_suffix(')')
                    .ok_or_else(|| format!("unterminated type constraint in '{raw}'"))?;
                if inner.is_empty() {
                    return Err(format!("empty type constraint in '{raw}'"));
                }
                let constraint = ParamType::from_specifier(inner)
                    .map_or_else(|| Constraint::Regex(inner.to_string()), Constraint::Type);
                (&spec[..open], constraint)
            }
            None => (spec, Constraint::Type(ParamType::String)),
        };
        if !valid_name(name) {
            return Err(format!("invalid parameter name in '{raw}'"));
        }
        return Ok(Segment::Param {
            name: Arc::from(name),
            constraint,
        });
    }

    if let Some(name) = raw.strip_prefix('*') {
        if name.is_empty() {
            return Ok(Segment::Wildcard { name: None });
        }
        if !valid_name(name) {
            return Err(format!("invalid wildcard name in '{raw}'"));
        }
        return Ok(Segment::Wildcard {
            name: Some(Arc::from(name)),
        });
    }

    Ok(Segment::Static(raw.to_string()))
}

fn build_regex(segments: &[Segment]) -> std::result::Result<Matcher, String> {
    let mut source = String::from("^");
    let mut group_names = Vec::new();

    for segment in segments {
        source.push('/');
        match segment {
            Segment::Static(text) => source.push_str(&regex::escape(text)),
            Segment::Param { constraint, .. } => {
                let group = format!("p{}", group_names.len());
                let fragment = match constraint {
                    Constraint::Type(t) => t.regex_fragment(),
                    Constraint::Regex(r) => r.as_str(),
                };
                source.push_str(&format!("(?P<{group}>{fragment})"));
                group_names.push(group);
            }
            Segment::Wildcard { name: Some(_) } => {
                let group = format!("p{}", group_names.len());
                source.push_str(&format!("(?P<{group}>.+)"));
                group_names.push(group);
            }
            Segment::Wildcard { name: None } => source.push_str("(?:.+)"),
        }
    }
    source.push('$');

    let regex = Regex::new(&source).map_err(|e| format!("invalid regex: {e}"))?;
    let groups = group_names
        .iter()
        .map(|wanted| {
            regex
                .capture_names()
                .position(|n| n == Some(wanted.as_str()))
                .ok_or_else(|| format!("capture group {wanted} missing"))
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Matcher::Regex { regex, groups })
}

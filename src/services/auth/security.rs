//! Path-based access decisions.
//!
//! An ordered table of Ant-style patterns (`*` within one segment, `**` across any
//! number of segments, `?` one character). The first matching rule wins; unmatched
//! paths get the default tier.

use std::fmt;

use thiserror::Error;

/// Paths reachable without a token in every deployment.
pub const STANDARD_PUBLIC_PATHS: &[&str] = &[
    "/api/auth/login",
    "/api/auth/refresh",
    "/health",
    "/doc.html",
    "/webjars/**",
    "/swagger-resources/**",
    "/v3/api-docs/**",
    "/swagger-ui/**",
    "/",
    "/static/**",
    "/uploads/**",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    Permission(String),
}

impl Access {
    pub fn is_public(&self) -> bool {
        matches!(self, Access::Public)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("path pattern must start with '/': {0:?}")]
    NotAbsolute(String),
    #[error("'**' must be a whole segment: {0:?}")]
    MisplacedDoubleStar(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Glob(String),
    AnyDepth,
}

impl Segment {
    fn matches(&self, segment: &str) -> bool {
        match self {
            Segment::Literal(lit) => lit == segment,
            Segment::Glob(glob) => glob_matches(glob.as_bytes(), segment.as_bytes()),
            Segment::AnyDepth => true,
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl fmt::Debug for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PathPattern {
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        let raw = raw.trim();
        if !raw.starts_with('/') {
            return Err(PatternError::NotAbsolute(raw.to_string()));
        }

        let mut segments = Vec::new();
        for part in raw.split('/').filter(|s| !s.is_empty()) {
            let segment = if part == "**" {
                Segment::AnyDepth
            } else if part.contains("**") {
                return Err(PatternError::MisplacedDoubleStar(raw.to_string()));
            } else if part.contains(['*', '?']) {
                Segment::Glob(part.to_string())
            } else {
                Segment::Literal(part.to_string())
            };
            segments.push(segment);
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn matches(&self, path: &str) -> bool {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match_from(&self.segments, &parts)
    }
}

fn match_from(pattern: &[Segment], path: &[&str]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((Segment::AnyDepth, rest)) => (0..=path.len()).any(|i| match_from(rest, &path[i..])),
        Some((segment, rest)) => match path.split_first() {
            Some((head, tail)) => segment.matches(head) && match_from(rest, tail),
            None => false,
        },
    }
}

/// `*` = any run of bytes, `?` = exactly one byte.
fn glob_matches(glob: &[u8], text: &[u8]) -> bool {
    let (mut g, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match glob.get(g) {
            Some(&b'*') => {
                backtrack = Some((g, t));
                g += 1;
            }
            Some(&c) if c == b'?' || c == text[t] => {
                g += 1;
                t += 1;
            }
            _ => match backtrack {
                Some((star_g, star_t)) => {
                    g = star_g + 1;
                    t = star_t + 1;
                    backtrack = Some((star_g, star_t + 1));
                }
                None => return false,
            },
        }
    }

    glob[g..].iter().all(|&c| c == b'*')
}

fn is_dot_segment(segment: &str) -> bool {
    let lower = segment.to_ascii_lowercase();
    matches!(
        lower.as_str(),
        "." | ".." | "%2e" | "%2e%2e" | ".%2e" | "%2e."
    )
}

fn has_dot_segment(path: &str) -> bool {
    path.split('/').any(is_dot_segment)
}

#[derive(Debug, Clone)]
pub struct SecurityRule {
    pub pattern: PathPattern,
    pub access: Access,
}

#[derive(Debug, Clone)]
pub struct SecurityPolicy {
    rules: Vec<SecurityRule>,
    default: Access,
}

impl SecurityPolicy {
    /// No rules; everything falls to `Authenticated`.
    pub fn empty() -> Self {
        Self {
            rules: Vec::new(),
            default: Access::Authenticated,
        }
    }

    /// [`STANDARD_PUBLIC_PATHS`] as public rules.
    pub fn standard() -> Result<Self, PatternError> {
        STANDARD_PUBLIC_PATHS
            .iter()
            .try_fold(Self::empty(), |policy, p| policy.public(p))
    }

    pub fn public(self, pattern: &str) -> Result<Self, PatternError> {
        self.rule(pattern, Access::Public)
    }

    pub fn permission(self, pattern: &str, code: impl Into<String>) -> Result<Self, PatternError> {
        self.rule(pattern, Access::Permission(code.into()))
    }

    fn rule(mut self, pattern: &str, access: Access) -> Result<Self, PatternError> {
        self.rules.push(SecurityRule {
            pattern: PathPattern::parse(pattern)?,
            access,
        });
        Ok(self)
    }

    pub fn rules(&self) -> &[SecurityRule] {
        &self.rules
    }

    /// Access tier for `path` (no query string).
    pub fn classify(&self, path: &str) -> &Access {
        let dotted = has_dot_segment(path);
        self.rules
            .iter()
            .filter(|r| !(dotted && r.access.is_public()))
            .find(|r| r.pattern.matches(path))
            .map(|r| &r.access)
            .unwrap_or(&self.default)
    }
}

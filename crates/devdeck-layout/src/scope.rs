//! Keys that partition layouts by project and optional session.
//!
//! The text form is `project` or `project:session`. A `:` or `%` inside the
//! project id is written as `%3A` or `%25`, so distinct keys never share a
//! text form and parsing always recovers the original key.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// `projectId`, or `projectId:sessionId` when a session subdivides the
/// project's workspace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeKey {
    project_id: String,
    session_id: Option<String>,
}

impl ScopeKey {
    /// Project-wide scope.
    #[must_use]
    pub fn project(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            session_id: None,
        }
    }

    /// Scope of one session inside a project.
    #[must_use]
    pub fn session(project_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            session_id: Some(session_id.into()),
        }
    }

    #[must_use]
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }
}

fn escape_project(project_id: &str) -> Cow<'_, str> {
    if project_id.contains([':', '%']) {
        Cow::Owned(project_id.replace('%', "%25").replace(':', "%3A"))
    } else {
        Cow::Borrowed(project_id)
    }
}

/// Inverse of [`escape_project`]. A `%` that starts no known escape is kept.
fn unescape_project(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if let Some(after) = tail.strip_prefix("%3A").or_else(|| tail.strip_prefix("%3a")) {
            out.push(':');
            rest = after;
        } else if let Some(after) = tail.strip_prefix("%25") {
            out.push('%');
            rest = after;
        } else {
            out.push('%');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let project = escape_project(&self.project_id);
        match &self.session_id {
            Some(session) => write!(f, "{project}:{session}"),
            None => f.write_str(&project),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeKeyParseError {
    #[error("scope key has an empty project id")]
    EmptyProject,
    #[error("scope key `{0}` has an empty session id")]
    EmptySession(String),
}

impl FromStr for ScopeKey {
    type Err = ScopeKeyParseError;

    /// Splits on the first `:`; session ids may themselves contain `:`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (project, session) = match s.split_once(':') {
            Some((project, session)) => (project, Some(session)),
            None => (s, None),
        };
        if project.is_empty() {
            return Err(ScopeKeyParseError::EmptyProject);
        }
        match session {
            Some("") => Err(ScopeKeyParseError::EmptySession(s.to_owned())),
            Some(session) => Ok(Self::session(unescape_project(project), session)),
            None => Ok(Self::project(unescape_project(project))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_with_colon() {
        assert_eq!(ScopeKey::project("p1").to_string(), "p1");
        assert_eq!(ScopeKey::session("p1", "s9").to_string(), "p1:s9");
    }

    #[test]
    fn parse_round_trips() {
        for key in [ScopeKey::project("alpha"), ScopeKey::session("alpha", "beta:gamma")] {
            assert_eq!(key.to_string().parse::<ScopeKey>(), Ok(key));
        }
    }

    #[test]
    fn colon_in_project_id_is_escaped() {
        let project = ScopeKey::project("a:b");
        let session = ScopeKey::session("a", "b");
        assert_eq!(project.to_string(), "a%3Ab");
        assert_eq!(session.to_string(), "a:b");
        assert_eq!("a%3Ab".parse::<ScopeKey>(), Ok(project));
        assert_eq!("a:b".parse::<ScopeKey>(), Ok(session));
    }

    #[test]
    fn escaped_forms_round_trip() {
        for key in [
            ScopeKey::project("100%"),
            ScopeKey::project("%3A"),
            ScopeKey::project("x:y:z"),
            ScopeKey::session("a:b", "c:d"),
            ScopeKey::session("%25:", "s"),
        ] {
            assert_eq!(key.to_string().parse::<ScopeKey>(), Ok(key));
        }
        assert_eq!("50%off".parse::<ScopeKey>(), Ok(ScopeKey::project("50%off")));
    }

    #[test]
    fn project_and_session_scopes_differ() {
        assert_ne!(ScopeKey::project("p"), ScopeKey::session("p", "s"));
        assert_ne!(ScopeKey::session("p", "a"), ScopeKey::session("p", "b"));
    }

    #[test]
    fn parse_rejects_empty_parts() {
        assert_eq!("".parse::<ScopeKey>(), Err(ScopeKeyParseError::EmptyProject));
        assert_eq!(":s".parse::<ScopeKey>(), Err(ScopeKeyParseError::EmptyProject));
        assert!(matches!(
            "p:".parse::<ScopeKey>(),
            Err(ScopeKeyParseError::EmptySession(_))
        ));
    }
}

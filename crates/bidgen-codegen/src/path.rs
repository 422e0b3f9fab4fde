//! Path resolution
//!
//! Turns dotted path strings from a bidder description into field
//! segment lists, strips scope markers and classifies where a copy
//! source is read from.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

use crate::error::{Error, Result};

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("Invalid identifier pattern"));

/// Scope marker of impression-level paths
pub const IMP_PREFIX: &str = "imp.";
/// Scope marker of the bidder's parsed impression extension
pub const IMP_EXT_PREFIX: &str = "impExt.";
/// Scope marker of request-level paths
pub const REQUEST_PREFIX: &str = "bidRequest.";

/// Deepest source path supported in either scope
pub const MAX_SOURCE_DEPTH: usize = 3;

/// Which object a transformation mutates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// A single impression (`imp`)
    Impression,
    /// The bid request (`bidRequest`)
    Request,
}

impl Scope {
    /// Scope of a raw target, decided by its `imp.` marker
    pub fn of_target(raw: &str) -> Self {
        if raw.starts_with(IMP_PREFIX) {
            Self::Impression
        } else {
            Self::Request
        }
    }

    /// Deepest target path supported by this scope
    pub fn max_target_depth(&self) -> usize {
        match self {
            Self::Impression => 2,
            Self::Request => 3,
        }
    }

    /// Marker that may lead a target of this scope
    pub fn target_prefix(&self) -> &'static str {
        match self {
            Self::Impression => IMP_PREFIX,
            Self::Request => REQUEST_PREFIX,
        }
    }

    /// Name of the base object in generated code
    pub fn base_var(&self) -> &'static str {
        match self {
            Self::Impression => "imp",
            Self::Request => "bidRequest",
        }
    }

    /// Name of the top-level builder in generated code
    pub fn builder_var(&self) -> &'static str {
        match self {
            Self::Impression => "impBuilder",
            Self::Request => "requestBuilder",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Impression => write!(f, "impression"),
            Self::Request => write!(f, "request"),
        }
    }
}

/// An ordered list of field names
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Parse a dotted path with no scope marker
    ///
    /// Returns a description of the problem when the path is empty or a
    /// segment is not a Java identifier.
    pub fn parse(raw: &str) -> std::result::Result<Self, String> {
        if raw.is_empty() {
            return Err("path is empty".to_string());
        }

        let segments: Vec<String> = raw.split('.').map(str::to_string).collect();
        for segment in &segments {
            if segment.is_empty() {
                return Err("path contains an empty segment".to_string());
            }
            if !IDENTIFIER.is_match(segment) {
                return Err(format!("'{}' is not a valid field name", segment));
            }
        }

        Ok(Self { segments })
    }

    /// All segments, outermost first
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Segment at `index`
    pub fn segment(&self, index: usize) -> Option<&str> {
        self.segments.get(index).map(String::as_str)
    }

    /// Outermost segment
    pub fn first(&self) -> &str {
        &self.segments[0]
    }

    /// Innermost segment
    pub fn leaf(&self) -> &str {
        &self.segments[self.segments.len() - 1]
    }

    /// The first `len` segments
    pub fn prefix(&self, len: usize) -> FieldPath {
        FieldPath {
            segments: self.segments[..len.min(self.segments.len())].to_vec(),
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

/// Object a copy source is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceRoot {
    /// The impression being modified
    Imp,
    /// The bidder's parsed impression extension
    ImpExt,
    /// The original bid request
    Request,
}

/// A resolved copy source
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourcePath {
    /// Object the path is rooted at
    pub root: SourceRoot,
    /// Fields read from the root
    pub path: FieldPath,
}

impl SourcePath {
    /// Whether the value is read from the marshaled extension object
    pub fn is_ext_sourced(&self) -> bool {
        self.root == SourceRoot::ImpExt
    }
}

/// Resolves target and source paths for one scope
#[derive(Debug, Clone, Copy)]
pub struct PathResolver {
    scope: Scope,
}

impl PathResolver {
    /// Create a resolver for the given scope
    pub fn new(scope: Scope) -> Self {
        Self { scope }
    }

    /// Scope this resolver works in
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Resolve a target path, stripping the scope's marker
    pub fn resolve_target(&self, raw: &str) -> Result<FieldPath> {
        let stripped = match self.scope {
            Scope::Impression => {
                if raw.starts_with(REQUEST_PREFIX) {
                    return Err(Error::AmbiguousSource {
                        target: raw.to_string(),
                        message: "request-level target in impression scope".to_string(),
                    });
                }
                if raw.starts_with(IMP_EXT_PREFIX) {
                    return Err(Error::AmbiguousSource {
                        target: raw.to_string(),
                        message: "the parsed impression extension is read-only".to_string(),
                    });
                }
                raw.strip_prefix(IMP_PREFIX).unwrap_or(raw)
            }
            Scope::Request => {
                if raw.starts_with(IMP_PREFIX) || raw.starts_with(IMP_EXT_PREFIX) {
                    return Err(Error::AmbiguousSource {
                        target: raw.to_string(),
                        message: "impression-level target in request scope".to_string(),
                    });
                }
                raw.strip_prefix(REQUEST_PREFIX).unwrap_or(raw)
            }
        };

        let path = FieldPath::parse(stripped).map_err(|message| Error::MalformedPath {
            target: raw.to_string(),
            path: raw.to_string(),
            message,
        })?;

        if self.scope == Scope::Request && path.first() == "imp" {
            return Err(Error::AmbiguousSource {
                target: raw.to_string(),
                message: "impressions are modified through 'imp.' targets".to_string(),
            });
        }

        let max = self.scope.max_target_depth();
        if path.depth() > max {
            return Err(Error::UnsupportedTransformation {
                target: raw.to_string(),
                message: format!(
                    "target path has {} segments, {} scope supports at most {}",
                    path.depth(),
                    self.scope,
                    max
                ),
            });
        }

        Ok(path)
    }

    /// Resolve a copy source path, classifying the object it is read from
    pub fn resolve_source(&self, target: &str, raw: &str) -> Result<SourcePath> {
        let ambiguous = |message: &str| Error::AmbiguousSource {
            target: target.to_string(),
            message: format!("'{}': {}", raw, message),
        };

        let (root, stripped) = if let Some(rest) = raw.strip_prefix(IMP_EXT_PREFIX) {
            (SourceRoot::ImpExt, rest)
        } else if let Some(rest) = raw.strip_prefix(IMP_PREFIX) {
            match self.scope {
                Scope::Impression => (SourceRoot::Imp, rest),
                Scope::Request => {
                    return Err(ambiguous(
                        "impression fields cannot be read from request scope",
                    ));
                }
            }
        } else if let Some(rest) = raw.strip_prefix(REQUEST_PREFIX) {
            match self.scope {
                Scope::Request => (SourceRoot::Request, rest),
                Scope::Impression => {
                    return Err(ambiguous(
                        "request fields cannot be read from impression scope",
                    ));
                }
            }
        } else {
            match self.scope {
                Scope::Impression => (SourceRoot::Imp, raw),
                Scope::Request => (SourceRoot::Request, raw),
            }
        };

        let path = FieldPath::parse(stripped).map_err(|message| Error::MalformedPath {
            target: target.to_string(),
            path: raw.to_string(),
            message,
        })?;

        if root == SourceRoot::Request && path.first() == "imp" {
            return Err(ambiguous("impressions are a list and cannot be read from request scope"));
        }

        if path.depth() > MAX_SOURCE_DEPTH {
            return Err(Error::UnsupportedTransformation {
                target: target.to_string(),
                message: format!(
                    "source path '{}' has {} segments, at most {} are supported",
                    raw,
                    path.depth(),
                    MAX_SOURCE_DEPTH
                ),
            });
        }

        Ok(SourcePath { root, path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("banner.w", &["banner", "w"])]
    #[case("tagid", &["tagid"])]
    #[case("site.content.title", &["site", "content", "title"])]
    fn test_parse_segments(#[case] raw: &str, #[case] expected: &[&str]) {
        let path = FieldPath::parse(raw).unwrap();
        assert_eq!(path.segments(), expected);
        assert_eq!(path.to_string(), raw);
    }

    #[rstest]
    #[case("")]
    #[case("banner..w")]
    #[case(".w")]
    #[case("banner.")]
    #[case("banner.1w")]
    #[case("banner.w-h")]
    fn test_parse_rejects(#[case] raw: &str) {
        assert!(FieldPath::parse(raw).is_err());
    }

    #[test]
    fn test_scope_of_target() {
        assert_eq!(Scope::of_target("imp.banner.w"), Scope::Impression);
        assert_eq!(Scope::of_target("site.page"), Scope::Request);
        assert_eq!(Scope::of_target("impression"), Scope::Request);
    }

    #[test]
    fn test_resolve_target_strips_imp_prefix() {
        let resolver = PathResolver::new(Scope::Impression);
        let path = resolver.resolve_target("imp.banner.w").unwrap();
        assert_eq!(path.segments(), &["banner", "w"]);

        let unprefixed = resolver.resolve_target("banner.w").unwrap();
        assert_eq!(path, unprefixed);
    }

    #[test]
    fn test_resolve_target_strips_request_prefix() {
        let resolver = PathResolver::new(Scope::Request);
        let path = resolver.resolve_target("bidRequest.site.page").unwrap();
        assert_eq!(path.segments(), &["site", "page"]);
    }

    #[test]
    fn test_resolve_target_empty_after_prefix() {
        let resolver = PathResolver::new(Scope::Impression);
        assert!(matches!(
            resolver.resolve_target("imp."),
            Err(Error::MalformedPath { .. })
        ));
        assert!(matches!(
            resolver.resolve_target(""),
            Err(Error::MalformedPath { .. })
        ));
    }

    #[rstest]
    #[case(Scope::Impression, "imp.banner.format.w")]
    #[case(Scope::Request, "site.content.producer.name")]
    #[case(Scope::Request, "a.b.c.d")]
    fn test_resolve_target_too_deep(#[case] scope: Scope, #[case] raw: &str) {
        let err = PathResolver::new(scope).resolve_target(raw).unwrap_err();
        match err {
            Error::UnsupportedTransformation { target, .. } => assert_eq!(target, raw),
            other => panic!("Expected UnsupportedTransformation, got {other:?}"),
        }
    }

    #[rstest]
    #[case(Scope::Impression, "bidRequest.site.page")]
    #[case(Scope::Impression, "impExt.placementId")]
    #[case(Scope::Request, "imp.banner.w")]
    #[case(Scope::Request, "imp")]
    #[case(Scope::Request, "impExt.placementId")]
    fn test_resolve_target_wrong_scope(#[case] scope: Scope, #[case] raw: &str) {
        assert!(matches!(
            PathResolver::new(scope).resolve_target(raw),
            Err(Error::AmbiguousSource { .. })
        ));
    }

    #[rstest]
    #[case(Scope::Impression, "impExt.placementId", SourceRoot::ImpExt, "placementId")]
    #[case(Scope::Impression, "imp.banner.w", SourceRoot::Imp, "banner.w")]
    #[case(Scope::Impression, "tagid", SourceRoot::Imp, "tagid")]
    #[case(Scope::Request, "impExt.publisherId", SourceRoot::ImpExt, "publisherId")]
    #[case(Scope::Request, "bidRequest.site.page", SourceRoot::Request, "site.page")]
    #[case(Scope::Request, "site.content.title", SourceRoot::Request, "site.content.title")]
    fn test_resolve_source(
        #[case] scope: Scope,
        #[case] raw: &str,
        #[case] root: SourceRoot,
        #[case] path: &str,
    ) {
        let source = PathResolver::new(scope).resolve_source("t", raw).unwrap();
        assert_eq!(source.root, root);
        assert_eq!(source.path.to_string(), path);
        assert_eq!(source.is_ext_sourced(), root == SourceRoot::ImpExt);
    }

    #[rstest]
    #[case(Scope::Impression, "bidRequest.site.page")]
    #[case(Scope::Request, "imp.banner.w")]
    #[case(Scope::Request, "bidRequest.imp.tagid")]
    #[case(Scope::Request, "imp.tagid")]
    fn test_resolve_source_ambiguous(#[case] scope: Scope, #[case] raw: &str) {
        let err = PathResolver::new(scope)
            .resolve_source("target.x", raw)
            .unwrap_err();
        match err {
            Error::AmbiguousSource { target, message } => {
                assert_eq!(target, "target.x");
                assert!(message.contains(raw));
            }
            other => panic!("Expected AmbiguousSource, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_source_depth_limit() {
        let resolver = PathResolver::new(Scope::Request);
        assert!(resolver.resolve_source("t", "a.b.c").is_ok());
        assert!(matches!(
            resolver.resolve_source("t", "a.b.c.d"),
            Err(Error::UnsupportedTransformation { .. })
        ));
    }

    #[test]
    fn test_resolve_source_malformed_names_source() {
        let err = PathResolver::new(Scope::Impression)
            .resolve_source("imp.tagid", "impExt.")
            .unwrap_err();
        match err {
            Error::MalformedPath { target, path, .. } => {
                assert_eq!(target, "imp.tagid");
                assert_eq!(path, "impExt.");
            }
            other => panic!("Expected MalformedPath, got {other:?}"),
        }
    }

    #[test]
    fn test_field_path_helpers() {
        let path = FieldPath::parse("site.content.title").unwrap();
        assert_eq!(path.first(), "site");
        assert_eq!(path.leaf(), "title");
        assert_eq!(path.segment(1), Some("content"));
        assert_eq!(path.segment(3), None);
        assert_eq!(path.prefix(2).to_string(), "site.content");
    }
}

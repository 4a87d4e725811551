//! HTTP path template parsing.
//!
//! ```text
//! template := '/' segments [ ':' verb ]
//! segments := segment ( '/' segment )*
//! segment  := literal | '{' field_path [ '=' segments ] '}'
//! ```
//!
//! `*` and `**` are literal wildcard segments.

use std::fmt;

use thiserror::Error;

const RESERVED: &[char] = &['/', '{', '}', '=', ':'];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("must start with leading /")]
    MissingLeadingSlash,
    #[error("expected '}}'")]
    ExpectedCloseBrace,
    #[error("unrecognized input at '{0}'")]
    Unrecognized(char),
    #[error("unexpected end of input")]
    UnexpectedEnd,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Literal {
        text: String,
        /// Set for the `:verb` suffix of a custom method.
        is_trailing_custom_verb: bool,
    },
    FieldBinding {
        field_path: String,
        sub_path: Vec<PathSegment>,
        /// The sub-path ends in `**`.
        is_trailing_wildcard: bool,
    },
}

impl PathSegment {
    pub fn literal(text: impl Into<String>) -> Self {
        PathSegment::Literal {
            text: text.into(),
            is_trailing_custom_verb: false,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, PathSegment::Literal { text, .. } if text == "*" || text == "**")
    }

    pub fn is_custom_verb(&self) -> bool {
        matches!(
            self,
            PathSegment::Literal {
                is_trailing_custom_verb: true,
                ..
            }
        )
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Literal { text, .. } => f.write_str(text),
            PathSegment::FieldBinding {
                field_path,
                sub_path,
                ..
            } => {
                write!(f, "{{{}", field_path)?;
                if !sub_path.is_empty() {
                    f.write_str("=")?;
                    write_joined(f, sub_path)?;
                }
                f.write_str("}")
            }
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, segments: &[PathSegment]) -> fmt::Result {
    for (i, seg) in segments.iter().enumerate() {
        if i > 0 {
            f.write_str("/")?;
        }
        write!(f, "{}", seg)?;
    }
    Ok(())
}

/// A parsed path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    segments: Vec<PathSegment>,
}

impl PathTemplate {
    /// Top-level segments, including a trailing custom verb if present.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn custom_verb(&self) -> Option<&str> {
        match self.segments.last() {
            Some(PathSegment::Literal {
                text,
                is_trailing_custom_verb: true,
            }) => Some(text),
            _ => None,
        }
    }

    /// Last segment before any custom verb.
    pub fn last_path_segment(&self) -> Option<&PathSegment> {
        self.segments.iter().rev().find(|s| !s.is_custom_verb())
    }

    /// Every bound field path, including those nested in sub-paths.
    pub fn field_paths(&self) -> Vec<&str> {
        fn collect<'a>(segments: &'a [PathSegment], out: &mut Vec<&'a str>) {
            for seg in segments {
                if let PathSegment::FieldBinding {
                    field_path,
                    sub_path,
                    ..
                } = seg
                {
                    out.push(field_path);
                    collect(sub_path, out);
                }
            }
        }
        let mut out = Vec::new();
        collect(&self.segments, &mut out);
        out
    }

    /// Literal segments in order, flattened through sub-paths, skipping
    /// wildcards and the custom verb.
    pub fn literals(&self) -> Vec<&str> {
        fn collect<'a>(segments: &'a [PathSegment], out: &mut Vec<&'a str>) {
            for seg in segments {
                match seg {
                    PathSegment::Literal { .. } if seg.is_wildcard() || seg.is_custom_verb() => {}
                    PathSegment::Literal { text, .. } => out.push(text),
                    PathSegment::FieldBinding { sub_path, .. } => collect(sub_path, out),
                }
            }
        }
        let mut out = Vec::new();
        collect(&self.segments, &mut out);
        out
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for seg in &self.segments {
            if seg.is_custom_verb() {
                write!(f, ":{}", seg)?;
            } else {
                write!(f, "/{}", seg)?;
            }
        }
        Ok(())
    }
}

/// Parse a path template.
pub fn parse(template: &str) -> Result<PathTemplate, TemplateError> {
    let mut parser = Parser {
        input: template,
        pos: 0,
    };
    parser.template()
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn take_while(&mut self, keep: impl Fn(char) -> bool) -> &str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !keep(c) {
                break;
            }
            self.bump();
        }
        &self.input[start..self.pos]
    }

    fn template(&mut self) -> Result<PathTemplate, TemplateError> {
        if self.peek() != Some('/') {
            return Err(TemplateError::MissingLeadingSlash);
        }
        self.bump();
        let mut segments = self.segments()?;

        if self.peek() == Some(':') {
            self.bump();
            let verb = self.take_while(|c| !RESERVED.contains(&c)).to_string();
            if let Some(c) = self.peek() {
                return Err(TemplateError::Unrecognized(c));
            }
            if verb.is_empty() {
                return Err(TemplateError::UnexpectedEnd);
            }
            segments.push(PathSegment::Literal {
                text: verb,
                is_trailing_custom_verb: true,
            });
        }

        match self.peek() {
            None => Ok(PathTemplate { segments }),
            Some(c) => Err(TemplateError::Unrecognized(c)),
        }
    }

    fn segments(&mut self) -> Result<Vec<PathSegment>, TemplateError> {
        let mut segments = vec![self.segment()?];
        while self.peek() == Some('/') {
            self.bump();
            segments.push(self.segment()?);
        }
        Ok(segments)
    }

    fn segment(&mut self) -> Result<PathSegment, TemplateError> {
        match self.peek() {
            None => Err(TemplateError::UnexpectedEnd),
            Some('{') => {
                self.bump();
                self.binding()
            }
            Some(c) if RESERVED.contains(&c) => Err(TemplateError::Unrecognized(c)),
            Some(_) => {
                let text = self.take_while(|c| !RESERVED.contains(&c));
                Ok(PathSegment::literal(text))
            }
        }
    }

    fn binding(&mut self) -> Result<PathSegment, TemplateError> {
        let field_path = self
            .take_while(|c| c.is_alphanumeric() || c == '_' || c == '.')
            .to_string();
        if field_path.is_empty() {
            return Err(match self.peek() {
                None => TemplateError::UnexpectedEnd,
                Some(c) => TemplateError::Unrecognized(c),
            });
        }

        let sub_path = if self.peek() == Some('=') {
            self.bump();
            self.segments()?
        } else {
            Vec::new()
        };

        if self.peek() != Some('}') {
            return Err(TemplateError::ExpectedCloseBrace);
        }
        self.bump();

        let is_trailing_wildcard = matches!(
            sub_path.last(),
            Some(PathSegment::Literal { text, .. }) if text == "**"
        );
        Ok(PathSegment::FieldBinding {
            field_path,
            sub_path,
            is_trailing_wildcard,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(path: &str, sub: Vec<PathSegment>) -> PathSegment {
        let is_trailing_wildcard =
            matches!(sub.last(), Some(PathSegment::Literal { text, .. }) if text == "**");
        PathSegment::FieldBinding {
            field_path: path.to_string(),
            sub_path: sub,
            is_trailing_wildcard,
        }
    }

    #[test]
    fn parses_nested_binding() {
        let template = parse("/v1/{name=shelves/*}/books/{id}").unwrap();
        assert_eq!(
            template.segments(),
            &[
                PathSegment::literal("v1"),
                binding(
                    "name",
                    vec![PathSegment::literal("shelves"), PathSegment::literal("*")]
                ),
                PathSegment::literal("books"),
                binding("id", vec![]),
            ]
        );
        assert_eq!(template.field_paths(), vec!["name", "id"]);
        assert_eq!(template.literals(), vec!["v1", "shelves", "books"]);
        assert_eq!(template.custom_verb(), None);
    }

    #[test]
    fn parses_custom_verb() {
        let template = parse("/v1/{name=shelves/*}:move").unwrap();
        assert_eq!(template.segments().len(), 3);
        assert_eq!(template.custom_verb(), Some("move"));
        assert!(matches!(
            template.last_path_segment(),
            Some(PathSegment::FieldBinding { .. })
        ));
        assert_eq!(template.literals(), vec!["v1", "shelves"]);
    }

    #[test]
    fn parses_dotted_field_paths_and_trailing_wildcards() {
        let template = parse("/v1/{shelf.name=shelves/**}").unwrap();
        match &template.segments()[1] {
            PathSegment::FieldBinding {
                field_path,
                is_trailing_wildcard,
                ..
            } => {
                assert_eq!(field_path, "shelf.name");
                assert!(is_trailing_wildcard);
            }
            other => panic!("unexpected segment {:?}", other),
        }
    }

    #[test]
    fn renders_canonical_form() {
        for input in [
            "/v1/{name=shelves/*}/books/{id}",
            "/v1/shelves:batchGet",
            "/v1/{name=shelves/*/books/**}:export",
            "/",
        ] {
            let parsed = parse(input);
            if input == "/" {
                assert_eq!(parsed, Err(TemplateError::UnexpectedEnd));
                continue;
            }
            assert_eq!(parsed.unwrap().to_string(), input);
        }
    }

    #[test]
    fn reports_grammar_errors() {
        assert_eq!(parse("/a/"), Err(TemplateError::UnexpectedEnd));
        assert_eq!(parse("a/b"), Err(TemplateError::MissingLeadingSlash));
        assert_eq!(parse(""), Err(TemplateError::MissingLeadingSlash));
        assert_eq!(parse("/a/{id"), Err(TemplateError::ExpectedCloseBrace));
        assert_eq!(parse("/a/{id=x/y"), Err(TemplateError::ExpectedCloseBrace));
        assert_eq!(parse("/a=b"), Err(TemplateError::Unrecognized('=')));
        assert_eq!(parse("/a//b"), Err(TemplateError::Unrecognized('/')));
        assert_eq!(parse("/a:"), Err(TemplateError::UnexpectedEnd));
        assert_eq!(parse("/a:b/c"), Err(TemplateError::Unrecognized('/')));
        assert_eq!(parse("/{}"), Err(TemplateError::Unrecognized('}')));
        assert_eq!(parse("/{"), Err(TemplateError::UnexpectedEnd));
    }

    #[test]
    fn error_messages() {
        assert_eq!(
            TemplateError::MissingLeadingSlash.to_string(),
            "must start with leading /"
        );
        assert_eq!(TemplateError::ExpectedCloseBrace.to_string(), "expected '}'");
        assert_eq!(
            TemplateError::Unrecognized('=').to_string(),
            "unrecognized input at '='"
        );
        assert_eq!(
            TemplateError::UnexpectedEnd.to_string(),
            "unexpected end of input"
        );
    }
}

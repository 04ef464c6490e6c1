//! CSS syntax parser using the `cssparser` crate.
//!
//! This module turns CSS text into the generic [`Node`] tree. Selectors,
//! at-rule parameters and declaration values are kept verbatim (trimmed) so
//! that printing a parsed tree reproduces the author's text. Sentinel rules
//! with the boundary-marker selectors are recognized and parsed into
//! [`Node::Marker`].

use std::cell::Cell;
use std::path::{Path, PathBuf};

use cssparser::{
    Delimiter, Delimiters, ParseError as CssParseError, Parser, ParserInput, SourceLocation,
    Token,
};

use crate::{Error, Result};
use crate::tree::{AtRule, Comment, Declaration, MarkerKind, Node, Rule, Source, SpanId};

/// Parse a CSS stylesheet string into a list of top-level nodes.
///
/// # Arguments
///
/// * `css` - CSS stylesheet content.
/// * `file` - Originating file, recorded in every node's [`Source`].
///
/// # Error Recovery
///
/// A rule whose prelude is not followed by a `{ ... }` block is dropped with a
/// warning logged via `tracing::warn!`, and parsing continues with the next
/// rule. Unterminated blocks are closed at end of input, as CSS requires.
/// A closing bracket without an opening one is an [`Error::Parse`].
///
/// # Example
///
/// ```ignore
/// let nodes = parse_css("@import 'b.css'; .a { color: red; }", None)?;
/// assert_eq!(nodes.len(), 2);
/// ```
pub fn parse_css(css: &str, file: Option<&Path>) -> Result<Vec<Node>> {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let context = ParseContext {
        file: file.map(Path::to_path_buf),
        unbalanced: Cell::new(None),
    };

    let nodes = parse_node_list(&mut parser, &context, false);
    if let Some(location) = context.unbalanced.get() {
        let source = context.source(location);
        return Err(Error::parse(
            "unbalanced closing bracket",
            source.line,
            source.column,
        ));
    }
    Ok(nodes)
}

struct ParseContext {
    file: Option<PathBuf>,
    /// First stray closing bracket.
    unbalanced: Cell<Option<SourceLocation>>,
}

impl ParseContext {
    fn source(&self, location: SourceLocation) -> Source {
        // cssparser lines are 0-indexed, columns 1-indexed
        Source::new(self.file.clone(), location.line + 1, location.column)
    }
}

/// Parse a list of rules, at-rules, comments and (inside blocks) declarations.
fn parse_node_list<'i>(parser: &mut Parser<'i, '_>, context: &ParseContext, nested: bool) -> Vec<Node> {
    let mut nodes = vec![];

    loop {
        let location = parser.current_source_location();
        let state = parser.state();

        let token = match parser.next_including_whitespace_and_comments() {
            Ok(t) => t.clone(),
            Err(_) => break,
        };

        match token {
            Token::WhiteSpace(_) | Token::CDO | Token::CDC | Token::Semicolon => {}

            Token::CloseCurlyBracket | Token::CloseParenthesis | Token::CloseSquareBracket => {
                if context.unbalanced.get().is_none() {
                    context.unbalanced.set(Some(location));
                }
            }

            Token::Comment(text) => nodes.push(Node::Comment(Comment {
                text: text.to_string(),
                source: context.source(location),
            })),

            Token::AtKeyword(name) => {
                nodes.push(parse_at_rule(parser, context, name.to_string(), location));
            }

            _ => {
                parser.reset(&state);

                if nested {
                    if let Some(decl) = try_parse_declaration(parser, context, location) {
                        nodes.push(decl);
                        continue;
                    }
                }

                if let Some(rule) = parse_qualified_rule(parser, context, location) {
                    nodes.push(rule);
                }
            }
        }
    }

    nodes
}

/// Parse an at-rule after its `@keyword` token.
fn parse_at_rule<'i>(
    parser: &mut Parser<'i, '_>,
    context: &ParseContext,
    name: String,
    location: SourceLocation,
) -> Node {
    let params = consume_until(parser, Delimiter::Semicolon | Delimiter::CurlyBracketBlock)
        .trim()
        .to_string();

    let nodes = match parser.next() {
        Ok(Token::CurlyBracketBlock) => Some(
            parser
                .parse_nested_block(|block| {
                    Ok::<_, CssParseError<'i, ()>>(parse_node_list(block, context, true))
                })
                .unwrap_or_default(),
        ),
        // `;` or end of input
        _ => None,
    };

    Node::AtRule(AtRule {
        name,
        params,
        nodes,
        source: context.source(location),
    })
}

/// Parse a qualified rule: `selector { ... }`.
fn parse_qualified_rule<'i>(
    parser: &mut Parser<'i, '_>,
    context: &ParseContext,
    location: SourceLocation,
) -> Option<Node> {
    let selector = consume_until(parser, Delimiter::CurlyBracketBlock).trim().to_string();
    let source = context.source(location);

    match parser.next() {
        Ok(Token::CurlyBracketBlock) => {}
        _ => {
            if !selector.is_empty() {
                tracing::warn!("CSS parse error at {}: expected '{{' after '{}'", source, selector);
            }
            return None;
        }
    }

    if let Some(kind) = MarkerKind::from_selector(&selector) {
        let _ = parser.parse_nested_block(|block| {
            while block.next_including_whitespace_and_comments().is_ok() {}
            Ok::<_, CssParseError<'i, ()>>(())
        });
        return Some(Node::marker(kind, SpanId::UNTRACKED, source));
    }

    let nodes = parser
        .parse_nested_block(|block| Ok::<_, CssParseError<'i, ()>>(parse_node_list(block, context, true)))
        .unwrap_or_default();

    Some(Node::Rule(Rule {
        selector,
        nodes,
        source,
    }))
}

/// Try to parse `name: value [!important];`.
///
/// Restores the parser and returns `None` when the input is a nested rule
/// instead (e.g. `a:hover { ... }`).
fn try_parse_declaration<'i>(
    parser: &mut Parser<'i, '_>,
    context: &ParseContext,
    location: SourceLocation,
) -> Option<Node> {
    let state = parser.state();

    let prop = match parser.next() {
        Ok(Token::Ident(name)) => name.to_string(),
        _ => {
            parser.reset(&state);
            return None;
        }
    };

    if parser.expect_colon().is_err() {
        parser.reset(&state);
        return None;
    }

    let raw = consume_until(parser, Delimiter::Semicolon | Delimiter::CurlyBracketBlock);

    let after_value = parser.state();
    match parser.next() {
        Ok(Token::CurlyBracketBlock) => {
            parser.reset(&state);
            return None;
        }
        Ok(Token::Semicolon) => {}
        _ => parser.reset(&after_value),
    }

    let (value, important) = split_important(raw);

    Some(Node::Declaration(Declaration {
        prop,
        value,
        important,
        source: context.source(location),
    }))
}

/// Consume tokens up to (not including) one of `delimiters`, returning the raw text.
fn consume_until<'i>(parser: &mut Parser<'i, '_>, delimiters: Delimiters) -> &'i str {
    let start = parser.position();
    let _ = parser.parse_until_before(delimiters, |p| {
        while p.next_including_whitespace_and_comments().is_ok() {}
        Ok::<_, CssParseError<'i, ()>>(())
    });
    parser.slice_from(start)
}

/// Split a trailing `!important` off a raw declaration value.
fn split_important(raw: &str) -> (String, bool) {
    let trimmed = raw.trim();
    if let Some(idx) = trimmed.rfind('!') {
        let (value, flag) = trimmed.split_at(idx);
        if flag[1..].trim().eq_ignore_ascii_case("important") {
            return (value.trim_end().to_string(), true);
        }
    }
    (trimmed.to_string(), false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(node: &Node) -> &Rule {
        match node {
            Node::Rule(r) => r,
            other => panic!("expected rule, got {:?}", other),
        }
    }

    fn decl(node: &Node) -> &Declaration {
        match node {
            Node::Declaration(d) => d,
            other => panic!("expected declaration, got {:?}", other),
        }
    }

    #[test]
    fn parse_simple_rule() {
        let nodes = parse_css(".b { color: blue; }", None).unwrap();

        assert_eq!(nodes.len(), 1);
        let rule = rule(&nodes[0]);
        assert_eq!(rule.selector, ".b");
        assert_eq!(rule.nodes.len(), 1);
        assert_eq!(decl(&rule.nodes[0]).prop, "color");
        assert_eq!(decl(&rule.nodes[0]).value, "blue");
    }

    #[test]
    fn parse_compact_rule_without_trailing_semicolon() {
        let nodes = parse_css(".a{color:red}", None).unwrap();
        let rule = rule(&nodes[0]);
        assert_eq!(decl(&rule.nodes[0]).value, "red");
    }

    #[test]
    fn parse_import_statement() {
        let nodes = parse_css("@import url('x.css') print;\n.a { color: red; }", None).unwrap();

        assert_eq!(nodes.len(), 2);
        let at = nodes[0].as_at_rule().unwrap();
        assert_eq!(at.name, "import");
        assert_eq!(at.params, "url('x.css') print");
        assert!(at.nodes.is_none());
    }

    #[test]
    fn parse_media_block_with_nested_rules() {
        let css = "@media screen and (max-width: 100px) { a:hover { color: red; } .c { color: green; } }";
        let nodes = parse_css(css, None).unwrap();

        let at = nodes[0].as_at_rule().unwrap();
        assert_eq!(at.params, "screen and (max-width: 100px)");
        assert_eq!(at.children().len(), 2);
        assert_eq!(rule(&at.children()[0]).selector, "a:hover");
        assert_eq!(rule(&at.children()[1]).selector, ".c");
    }

    #[test]
    fn parse_important_flag() {
        let nodes = parse_css(".a { color: red !important; content: \"hi!\"; }", None).unwrap();
        let rule = rule(&nodes[0]);

        let color = decl(&rule.nodes[0]);
        assert_eq!(color.value, "red");
        assert!(color.important);

        let content = decl(&rule.nodes[1]);
        assert_eq!(content.value, "\"hi!\"");
        assert!(!content.important);
    }

    #[test]
    fn parse_comments() {
        let nodes = parse_css("/* header */\n.a { /* inner */ color: red; }", None).unwrap();

        assert!(matches!(&nodes[0], Node::Comment(c) if c.text == " header "));
        assert!(rule(&nodes[1]).nodes[0].is_comment());
    }

    #[test]
    fn parse_marker_rules() {
        let css = ".postcss-reexport[data-type=\"start\"]{display: none;}\n\
                   .b { color: blue; }\n\
                   .postcss-reexport[data-type=\"end\"]{display: none;}";
        let nodes = parse_css(css, None).unwrap();

        assert_eq!(nodes.len(), 3);
        assert!(nodes[0].is_start_marker());
        assert!(nodes[2].is_end_marker());
    }

    #[test]
    fn parse_records_positions() {
        let nodes = parse_css("\n\n  .a { color: red; }", Some(Path::new("a.css"))).unwrap();
        let source = nodes[0].source();

        assert_eq!(source.line, 3);
        assert_eq!(source.column, 3);
        assert_eq!(source.file_path(), Some(Path::new("a.css")));
    }

    #[test]
    fn stray_closing_bracket_is_an_error() {
        let err = parse_css(".a { color: red; }\n}\n.b { color: blue; }", None).unwrap_err();
        assert!(matches!(err, Error::Parse { line: 2, column: 1, .. }));
    }

    #[test]
    fn drop_rule_without_block() {
        let nodes = parse_css(".a { color: red; } .broken", None).unwrap();
        assert_eq!(nodes.len(), 1);
    }
}

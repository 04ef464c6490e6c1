//! Relative `url(...)` rebasing for stylesheets that change location.

use std::path::Path;

use cssparser::{ParseError as CssParseError, Parser, ParserInput, Token};

use crate::imports::is_local_url;
use crate::paths::{normalize_path, relative_to, to_slash};
use crate::tree::Node;

/// Rewrite relative URLs in declaration values so they keep pointing at the
/// same files after the nodes move from `from` to `to` (both file paths,
/// absolute).
pub fn rebase_urls(nodes: &mut [Node], from: &Path, to: &Path) {
    let (Some(from_dir), Some(to_dir)) = (from.parent(), to.parent()) else {
        return;
    };
    if from_dir == to_dir {
        return;
    }
    rebase_nodes(nodes, from_dir, to_dir);
}

fn rebase_nodes(nodes: &mut [Node], from_dir: &Path, to_dir: &Path) {
    for node in nodes {
        match node {
            Node::Declaration(decl) => {
                if decl.value.to_ascii_lowercase().contains("url(") {
                    decl.value = rebase_value(&decl.value, from_dir, to_dir);
                }
            }
            Node::Rule(rule) => rebase_nodes(&mut rule.nodes, from_dir, to_dir),
            Node::AtRule(at) => {
                if let Some(children) = at.nodes.as_mut() {
                    rebase_nodes(children, from_dir, to_dir);
                }
            }
            Node::Comment(_) | Node::Marker(_) => {}
        }
    }
}

/// One `url(...)` occurrence inside a value.
struct UrlEdit {
    start: usize,
    end: usize,
    url: String,
    /// Quote character for `url("...")`; `None` for unquoted `url(...)`.
    quote: Option<char>,
}

/// Rebase every relative URL in a single declaration value.
pub fn rebase_value(value: &str, from_dir: &Path, to_dir: &Path) -> String {
    let mut input = ParserInput::new(value);
    let mut parser = Parser::new(&mut input);
    let mut edits = vec![];
    collect_url_edits(&mut parser, &mut edits);

    let mut out = String::with_capacity(value.len());
    let mut cursor = 0;
    for edit in edits {
        let Some(url) = rebase_url(&edit.url, from_dir, to_dir) else {
            continue;
        };
        out.push_str(&value[cursor..edit.start]);
        match edit.quote {
            Some(quote) => {
                out.push(quote);
                out.push_str(&url);
                out.push(quote);
            }
            None => {
                out.push_str("url(");
                out.push_str(&url);
                out.push(')');
            }
        }
        cursor = edit.end;
    }
    out.push_str(&value[cursor..]);
    out
}

fn collect_url_edits<'i>(parser: &mut Parser<'i, '_>, edits: &mut Vec<UrlEdit>) {
    loop {
        let start = parser.position();
        let token = match parser.next_including_whitespace_and_comments() {
            Ok(t) => t.clone(),
            Err(_) => break,
        };

        match token {
            Token::UnquotedUrl(url) => edits.push(UrlEdit {
                start: start.byte_index(),
                end: parser.position().byte_index(),
                url: url.to_string(),
                quote: None,
            }),
            Token::Function(name) if name.eq_ignore_ascii_case("url") => {
                let literal = parser.parse_nested_block(|p| {
                    p.skip_whitespace();
                    let literal_start = p.position();
                    let url = p.expect_string()?.to_string();
                    Ok::<_, CssParseError<'i, ()>>((literal_start, p.position(), url))
                });
                if let Ok((literal_start, literal_end, url)) = literal {
                    let quote = parser
                        .slice(literal_start..literal_end)
                        .chars()
                        .next();
                    edits.push(UrlEdit {
                        start: literal_start.byte_index(),
                        end: literal_end.byte_index(),
                        url,
                        quote,
                    });
                }
            }
            Token::Function(_)
            | Token::ParenthesisBlock
            | Token::SquareBracketBlock
            | Token::CurlyBracketBlock => {
                let _ = parser.parse_nested_block(|p| {
                    collect_url_edits(p, edits);
                    Ok::<_, CssParseError<'i, ()>>(())
                });
            }
            _ => {}
        }
    }
}

/// Rebase one URL, or `None` if it must be left untouched.
fn rebase_url(url: &str, from_dir: &Path, to_dir: &Path) -> Option<String> {
    if !is_local_url(url) || url.starts_with('/') || url.starts_with('#') {
        return None;
    }
    let split = url.find(['?', '#']).unwrap_or(url.len());
    let (path, suffix) = url.split_at(split);
    let target = normalize_path(from_dir.join(path));
    Some(format!("{}{}", to_slash(relative_to(to_dir, target)), suffix))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rebase(value: &str) -> String {
        rebase_value(value, Path::new("/p/src/components"), Path::new("/p/out/components"))
    }

    #[test]
    fn rebases_unquoted_url() {
        assert_eq!(
            rebase("url(img/bg.png) no-repeat"),
            "url(../../src/components/img/bg.png) no-repeat"
        );
    }

    #[test]
    fn rebases_quoted_url_keeping_quotes() {
        assert_eq!(
            rebase("url('../fonts/a.woff2') format(\"woff2\")"),
            "url('../../src/fonts/a.woff2') format(\"woff2\")"
        );
        assert_eq!(rebase("url(\"x.svg\")"), "url(\"../../src/components/x.svg\")");
    }

    #[test]
    fn keeps_query_and_fragment() {
        assert_eq!(
            rebase("url(icons.svg#close)"),
            "url(../../src/components/icons.svg#close)"
        );
        assert_eq!(
            rebase("url('a.png?v=3')"),
            "url('../../src/components/a.png?v=3')"
        );
    }

    #[test]
    fn leaves_absolute_and_special_urls() {
        for value in [
            "url(https://cdn.example.com/a.png)",
            "url(/static/a.png)",
            "url(#gradient)",
            "url(data:image/png;base64,AAAA)",
            "url(//cdn.example.com/a.png)",
        ] {
            assert_eq!(rebase(value), value);
        }
    }

    #[test]
    fn rebases_inside_nested_functions() {
        assert_eq!(
            rebase("image-set(url(a.png) 1x, url('b.png') 2x)"),
            "image-set(url(../../src/components/a.png) 1x, url('../../src/components/b.png') 2x)"
        );
    }

    #[test]
    fn rebases_declarations_in_tree() {
        let mut nodes = vec![Node::container(
            "media",
            "print",
            vec![Node::rule(".a", vec![Node::decl("background", "url(a.png)")])],
        )];

        rebase_urls(
            &mut nodes,
            Path::new("/p/src/a.css"),
            Path::new("/p/out/a.css"),
        );

        let media = nodes[0].as_at_rule().unwrap();
        let Node::Rule(rule) = &media.children()[0] else {
            panic!("expected rule");
        };
        let Node::Declaration(decl) = &rule.nodes[0] else {
            panic!("expected declaration");
        };
        assert_eq!(decl.value, "url(../src/a.png)");
    }

    #[test]
    fn same_directory_is_a_no_op() {
        let mut nodes = vec![Node::rule(".a", vec![Node::decl("background", "url(a.png)")])];
        let before = nodes.clone();

        rebase_urls(&mut nodes, Path::new("/p/a.css"), Path::new("/p/b.css"));

        assert_eq!(nodes, before);
    }
}

use logos::{Lexer, Logos};
use std::fmt;

/// Markup tokens for HTML fragments
///
/// The tokenizer is deliberately lenient: anything that doesn't form a
/// well-formed tag is handed back as text by [`tokenize`], so pasted or
/// half-typed markup never fails to tokenize.
#[derive(Logos, Debug, Clone, PartialEq)]
pub enum Token<'src> {
    /// `<!-- ... -->`
    #[token("<!--", comment)]
    Comment,

    /// `<!DOCTYPE ...>` and other declarations
    #[regex(r"<![a-zA-Z][^>]*>")]
    Declaration,

    /// Full start tag including attributes, e.g. `<a href="x">`
    #[regex(r"<[a-zA-Z][a-zA-Z0-9:-]*", start_tag)]
    StartTag(&'src str),

    /// `</name>`
    #[regex(r"</[a-zA-Z][a-zA-Z0-9:-]*[ \t\r\n]*>", |lex| lex.slice())]
    EndTag(&'src str),

    #[regex(r"[^<]+", |lex| lex.slice())]
    Text(&'src str),

    /// A `<` that doesn't open a tag
    #[token("<")]
    LAngle,
}

/// Consume everything up to and including the closing `-->`.
fn comment<'src>(lex: &mut Lexer<'src, Token<'src>>) -> bool {
    match lex.remainder().find("-->") {
        Some(end) => {
            lex.bump(end + 3);
            true
        }
        None => {
            // Unterminated comments swallow the rest of the input
            lex.bump(lex.remainder().len());
            true
        }
    }
}

/// Extend a start-tag match to its closing `>`, honoring quoted values.
fn start_tag<'src>(lex: &mut Lexer<'src, Token<'src>>) -> Option<&'src str> {
    let mut quote: Option<char> = None;

    for (i, ch) in lex.remainder().char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(ch),
            (None, '<') => return None,
            (None, '>') => {
                lex.bump(i + 1);
                return Some(lex.slice());
            }
            _ => {}
        }
    }

    None
}

/// Tokens inside a start tag, after the tag name
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum AttrToken<'src> {
    #[regex(r#"[^ \t\r\n\f"'<>=]+"#, |lex| lex.slice())]
    Name(&'src str),

    #[token("=")]
    Equals,

    #[regex(r#""[^"]*""#, |lex| { let s = lex.slice(); &s[1..s.len() - 1] })]
    DoubleQuoted(&'src str),

    #[regex(r"'[^']*'", |lex| { let s = lex.slice(); &s[1..s.len() - 1] })]
    SingleQuoted(&'src str),
}

impl<'src> fmt::Display for Token<'src> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Comment => write!(f, "comment"),
            Token::Declaration => write!(f, "declaration"),
            Token::StartTag(s) => write!(f, "start tag {}", s),
            Token::EndTag(s) => write!(f, "end tag {}", s),
            Token::Text(s) => write!(f, "text '{}'", s),
            Token::LAngle => write!(f, "<"),
        }
    }
}

/// Tokenize an HTML fragment
///
/// Unrecognized input (e.g. an unterminated `<a href="...`) is returned as
/// [`Token::Text`] covering the offending slice.
pub fn tokenize(source: &str) -> Vec<(Token<'_>, std::ops::Range<usize>)> {
    let lexer = Token::lexer(source);
    lexer
        .spanned()
        .map(|(result, span)| match result {
            Ok(token) => (token, span),
            Err(()) => (Token::Text(&source[span.clone()]), span),
        })
        .collect()
}

/// Tokenize the attribute section of a start tag
pub fn tokenize_attributes(source: &str) -> Vec<AttrToken<'_>> {
    AttrToken::lexer(source)
        .filter_map(|result| result.ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_and_end_tags() {
        let tokens = tokenize("<strong>bold</strong>");

        assert_eq!(tokens[0].0, Token::StartTag("<strong>"));
        assert_eq!(tokens[1].0, Token::Text("bold"));
        assert_eq!(tokens[2].0, Token::EndTag("</strong>"));
    }

    #[test]
    fn test_quoted_gt_in_attribute() {
        let tokens = tokenize(r#"<a title="a > b">x</a>"#);

        assert_eq!(tokens[0].0, Token::StartTag(r#"<a title="a > b">"#));
        assert_eq!(tokens[1].0, Token::Text("x"));
    }

    #[test]
    fn test_comments_and_declarations() {
        let tokens = tokenize("<!DOCTYPE html><!-- note -->text");

        assert_eq!(tokens[0].0, Token::Declaration);
        assert_eq!(tokens[1].0, Token::Comment);
        assert_eq!(tokens[2].0, Token::Text("text"));
    }

    #[test]
    fn test_stray_angle_is_not_a_tag() {
        let tokens = tokenize("1 < 2");

        assert_eq!(tokens[0].0, Token::Text("1 "));
        assert_eq!(tokens[1].0, Token::LAngle);
        assert_eq!(tokens[2].0, Token::Text(" 2"));
    }

    #[test]
    fn test_attribute_tokens() {
        let tokens = tokenize_attributes(r#" href="https://x.org/a" target='_blank' hidden data-x=1"#);

        assert_eq!(
            tokens,
            vec![
                AttrToken::Name("href"),
                AttrToken::Equals,
                AttrToken::DoubleQuoted("https://x.org/a"),
                AttrToken::Name("target"),
                AttrToken::Equals,
                AttrToken::SingleQuoted("_blank"),
                AttrToken::Name("hidden"),
                AttrToken::Name("data-x"),
                AttrToken::Equals,
                AttrToken::Name("1"),
            ]
        );
    }
}

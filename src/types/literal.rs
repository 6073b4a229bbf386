//! Bracketed literal parsing for array and tuple cells.
//!
//! `[1,[2,3],NULL,'a\'b']` and `(1,'x')` become a small tree that the value
//! decoder walks with the declared element types.

/// One node of a parsed literal.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum Node {
    /// Unquoted token, trimmed.
    Bare(String),
    /// Single- or double-quoted token, unescaped.
    Quoted(String),
    /// `[ ... ]`
    List(Vec<Node>),
    /// `( ... )`
    Group(Vec<Node>),
}

impl Node {
    /// Whether this is the null marker inside a literal.
    pub fn is_null(&self) -> bool {
        matches!(self, Node::Bare(token) if token.eq_ignore_ascii_case("null") || token == "\\N")
    }
}

/// Parse a whole literal; trailing content is an error.
pub(super) fn parse(text: &str) -> Result<Node, String> {
    let chars: Vec<char> = text.trim().chars().collect();
    let mut pos = 0;
    let node = parse_node(&chars, &mut pos)?;
    skip_ws(&chars, &mut pos);
    if pos != chars.len() {
        return Err(format!("unexpected trailing content at {pos}"));
    }
    Ok(node)
}

fn parse_node(chars: &[char], pos: &mut usize) -> Result<Node, String> {
    skip_ws(chars, pos);
    match chars.get(*pos) {
        Some('[') => parse_sequence(chars, pos, ']').map(Node::List),
        Some('(') => parse_sequence(chars, pos, ')').map(Node::Group),
        Some(&quote @ ('\'' | '"')) => parse_quoted(chars, pos, quote).map(Node::Quoted),
        Some(_) => Ok(Node::Bare(parse_bare(chars, pos))),
        None => Err("unexpected end of literal".to_string()),
    }
}

fn parse_sequence(chars: &[char], pos: &mut usize, close: char) -> Result<Vec<Node>, String> {
    *pos += 1;
    let mut items = Vec::new();

    skip_ws(chars, pos);
    if chars.get(*pos) == Some(&close) {
        *pos += 1;
        return Ok(items);
    }

    loop {
        items.push(parse_node(chars, pos)?);
        skip_ws(chars, pos);
        match chars.get(*pos) {
            Some(',') => *pos += 1,
            Some(&c) if c == close => {
                *pos += 1;
                return Ok(items);
            }
            Some(c) => return Err(format!("expected ',' or '{close}', found '{c}'")),
            None => return Err(format!("missing closing '{close}'")),
        }
    }
}

fn parse_quoted(chars: &[char], pos: &mut usize, quote: char) -> Result<String, String> {
    *pos += 1;
    let mut out = String::new();
    while let Some(&c) = chars.get(*pos) {
        *pos += 1;
        if c == '\\' {
            let escaped = chars
                .get(*pos)
                .ok_or_else(|| "dangling escape".to_string())?;
            *pos += 1;
            out.push(unescape_char(*escaped));
        } else if c == quote {
            if chars.get(*pos) == Some(&quote) {
                *pos += 1;
                out.push(quote);
            } else {
                return Ok(out);
            }
        } else {
            out.push(c);
        }
    }
    Err("unterminated quoted element".to_string())
}

fn parse_bare(chars: &[char], pos: &mut usize) -> String {
    let start = *pos;
    while let Some(&c) = chars.get(*pos) {
        if matches!(c, ',' | ']' | ')') {
            break;
        }
        *pos += 1;
    }
    chars[start..*pos].iter().collect::<String>().trim().to_string()
}

fn skip_ws(chars: &[char], pos: &mut usize) {
    while chars.get(*pos).is_some_and(|c| c.is_whitespace()) {
        *pos += 1;
    }
}

/// Character produced by a backslash escape.
pub(crate) fn unescape_char(c: char) -> char {
    match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        '0' => '\0',
        'b' => '\u{8}',
        'f' => '\u{c}',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare(s: &str) -> Node {
        Node::Bare(s.to_string())
    }

    #[test]
    fn test_flat_list() {
        assert_eq!(
            parse("[1, 2,3]").unwrap(),
            Node::List(vec![bare("1"), bare("2"), bare("3")])
        );
        assert_eq!(parse("[]").unwrap(), Node::List(vec![]));
    }

    #[test]
    fn test_nested_list() {
        assert_eq!(
            parse("[[1],[],[2,3]]").unwrap(),
            Node::List(vec![
                Node::List(vec![bare("1")]),
                Node::List(vec![]),
                Node::List(vec![bare("2"), bare("3")]),
            ])
        );
    }

    #[test]
    fn test_quoted_elements() {
        assert_eq!(
            parse(r"['a,b','it\'s','x''y']").unwrap(),
            Node::List(vec![
                Node::Quoted("a,b".to_string()),
                Node::Quoted("it's".to_string()),
                Node::Quoted("x'y".to_string()),
            ])
        );
    }

    #[test]
    fn test_null_elements() {
        let Node::List(items) = parse(r"[NULL,null,\N,'NULL']").unwrap() else {
            panic!("expected list");
        };
        assert!(items[0].is_null());
        assert!(items[1].is_null());
        assert!(items[2].is_null());
        assert!(!items[3].is_null());
    }

    #[test]
    fn test_tuple_group() {
        assert_eq!(
            parse("(1,'x')").unwrap(),
            Node::Group(vec![bare("1"), Node::Quoted("x".to_string())])
        );
    }

    #[test]
    fn test_errors() {
        assert!(parse("[1,2").is_err());
        assert!(parse("[1;2]x").is_err());
        assert!(parse("['abc]").is_err());
        assert!(parse("[1]x").is_err());
    }
}

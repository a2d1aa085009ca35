//! Byte-level S-expression reader.
//!
//! `parse` consumes at most one top-level expression from `bytes[start..]`
//! and returns the value plus the cursor of the first unconsumed byte.
//! Malformed input produces an `Error` value rather than a Rust error --
//! the reader never panics on bad source.

use ferro_core::{ErrorCode, Gc, Value};

/// Result of one `parse` call: either a value and the next cursor, or a
/// reader error value (also paired with a cursor, so a REPL can skip past
/// the offending byte and keep going).
pub struct ParseResult {
    pub value: Value,
    pub next: usize,
}

fn is_word_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'+' | b'*' | b'/' | b'?' | b'!' | b'<' | b'>' | b'=' | b'$' | b'.')
}

fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | 0x0c)
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(b) if is_space(b) => {
                    self.pos += 1;
                }
                Some(b';') => {
                    // `;;` starts a line comment; a lone `;` is an error,
                    // surfaced by the caller once it tries to read an atom.
                    if self.bytes.get(self.pos + 1) == Some(&b';') {
                        while let Some(b) = self.peek() {
                            self.pos += 1;
                            if b == b'\n' {
                                break;
                            }
                        }
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
    }
}

/// Parse exactly one top-level expression starting at `start`.
pub fn parse(gc: &mut Gc, bytes: &[u8], start: usize) -> ParseResult {
    let mut cur = Cursor { bytes, pos: start };
    read_expr(gc, &mut cur)
}

fn err(gc: &mut Gc, cur: &Cursor, code: ErrorCode, message: &str) -> ParseResult {
    ParseResult {
        value: gc.alloc_error(code, message),
        next: cur.pos,
    }
}

fn read_expr(gc: &mut Gc, cur: &mut Cursor) -> ParseResult {
    cur.skip_trivia();
    match cur.peek() {
        None => err(gc, cur, ErrorCode::ParseEndOfInput, "end of input"),
        Some(b';') => err(gc, cur, ErrorCode::ParseUnexpectedSemiColon, "unexpected ';'"),
        Some(b'(') => read_list(gc, cur),
        Some(b')') => err(gc, cur, ErrorCode::ParseUnexpectedEndList, "unexpected ')'"),
        Some(b'"') => read_string(gc, cur),
        Some(b'\'') => {
            cur.bump();
            let quoted = read_expr(gc, cur);
            if quoted.value.obj_type() == Some(ferro_core::ObjType::Error) {
                return quoted;
            }
            let quote_sym = gc.alloc_symbol("$quote");
            let list = gc.alloc_list(vec![quote_sym, quoted.value]);
            ParseResult { value: list, next: quoted.next }
        }
        Some(_) => read_atom(gc, cur),
    }
}

/// Read a `(...)`, handling the tail-splice `.` shorthand.
fn read_list(gc: &mut Gc, cur: &mut Cursor) -> ParseResult {
    debug_assert_eq!(cur.peek(), Some(b'('));
    cur.bump();

    let mut items = Vec::new();
    loop {
        cur.skip_trivia();
        match cur.peek() {
            None => return err(gc, cur, ErrorCode::ParseUnexpectedEndOfFile, "unclosed list"),
            Some(b')') => {
                cur.bump();
                return close_list(gc, cur, items);
            }
            Some(_) => {
                let item = read_expr(gc, cur);
                cur.pos = item.next;
                if item.value.obj_type() == Some(ferro_core::ObjType::Error) {
                    return item;
                }
                items.push(item.value);
            }
        }
    }
}

/// A completed list whose last element is a bare `.` symbol splices the
/// expressions following the closing `)` -- read from the enclosing
/// scope, past this list's own end -- in as further siblings of the `.`
/// itself. `(foo a .) (b c) (d e)` therefore reads as `(foo a (b c) (d
/// e))`, not `(foo a)`.
fn close_list(gc: &mut Gc, cur: &mut Cursor, mut items: Vec<Value>) -> ParseResult {
    let is_dot = matches!(items.last(), Some(v)
        if v.obj_type() == Some(ferro_core::ObjType::Symbol) && &*v.obj().as_symbol().name == ".");
    if !is_dot {
        let value = gc.alloc_list(items);
        return ParseResult { value, next: cur.pos };
    }
    items.pop();
    loop {
        cur.skip_trivia();
        match cur.peek() {
            None => break,
            Some(b')') => break,
            _ => {
                let spliced = read_expr(gc, cur);
                cur.pos = spliced.next;
                if spliced.value.obj_type() == Some(ferro_core::ObjType::Error) {
                    return spliced;
                }
                items.push(spliced.value);
            }
        }
    }
    let value = gc.alloc_list(items);
    ParseResult { value, next: cur.pos }
}

fn read_string(gc: &mut Gc, cur: &mut Cursor) -> ParseResult {
    debug_assert_eq!(cur.peek(), Some(b'"'));
    cur.bump();
    let mut out = Vec::new();
    loop {
        match cur.bump() {
            None => return err(gc, cur, ErrorCode::ParseUnexpectedEndOfFile, "unterminated string"),
            Some(0) => return err(gc, cur, ErrorCode::ParseUnexpectedNull, "NUL in string literal"),
            Some(b'"') => {
                let s = String::from_utf8_lossy(&out).into_owned();
                let value = gc.alloc_string(&s);
                return ParseResult { value, next: cur.pos };
            }
            Some(b'\\') => match cur.bump() {
                Some(b'n') => out.push(b'\n'),
                Some(b't') => out.push(b'\t'),
                Some(b'\\') => out.push(b'\\'),
                Some(b'"') => out.push(b'"'),
                _ => return err(gc, cur, ErrorCode::ParseUnexpectedEscape, "unrecognized escape"),
            },
            Some(b) => out.push(b),
        }
    }
}

/// Read a number-or-symbol token: an integer literal that parses exactly
/// in base 10 as i32 wins; otherwise a double; otherwise a symbol.
/// Anything starting with a letter is always a symbol.
fn read_atom(gc: &mut Gc, cur: &mut Cursor) -> ParseResult {
    let start = cur.pos;
    while let Some(b) = cur.peek() {
        if is_word_char(b) {
            cur.pos += 1;
        } else {
            break;
        }
    }
    if cur.pos == start {
        // Not whitespace, not `(`/`)`/`"`/`'`/`;`, and not a word char:
        // an unrecognized single byte. Treat it as a one-byte symbol so
        // we make forward progress rather than looping forever.
        cur.pos += 1;
    }
    let text = std::str::from_utf8(&cur.bytes[start..cur.pos]).unwrap_or("");

    let first = text.as_bytes().first().copied();
    let looks_alphabetic = matches!(first, Some(b) if b.is_ascii_alphabetic());

    let value = if !looks_alphabetic {
        if let Ok(i) = text.parse::<i32>() {
            Value::int(i)
        } else if let Ok(d) = text.parse::<f64>() {
            Value::double(d)
        } else {
            gc.alloc_symbol(text)
        }
    } else {
        gc.alloc_symbol(text)
    };
    ParseResult { value, next: cur.pos }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_str(gc: &mut Gc, s: &str) -> Value {
        parse(gc, s.as_bytes(), 0).value
    }

    #[test]
    fn parses_int() {
        let mut gc = Gc::new();
        let v = parse_str(&mut gc, "42");
        assert!(v.is_int());
        assert_eq!(v.as_int(), 42);
    }

    #[test]
    fn parses_negative_int() {
        let mut gc = Gc::new();
        let v = parse_str(&mut gc, "-7");
        assert!(v.is_int());
        assert_eq!(v.as_int(), -7);
    }

    #[test]
    fn parses_double() {
        let mut gc = Gc::new();
        let v = parse_str(&mut gc, "3.1415");
        assert!(v.is_double());
        assert!((v.as_double() - 3.1415).abs() < 1e-9);
    }

    #[test]
    fn parses_symbol() {
        let mut gc = Gc::new();
        let v = parse_str(&mut gc, "foo-bar?");
        assert_eq!(v.obj_type(), Some(ferro_core::ObjType::Symbol));
        assert_eq!(&*v.obj().as_symbol().name, "foo-bar?");
    }

    #[test]
    fn parses_string_with_escape() {
        let mut gc = Gc::new();
        let v = parse_str(&mut gc, "\"a\\nb\"");
        assert_eq!(&*v.obj().as_str().bytes, "a\nb");
    }

    #[test]
    fn parses_list() {
        let mut gc = Gc::new();
        let v = parse_str(&mut gc, "(1 2 3)");
        let items = &v.obj().as_list().items;
        assert_eq!(items.len(), 3);
        assert_eq!(items[1].as_int(), 2);
    }

    #[test]
    fn quote_sugar_expands() {
        let mut gc = Gc::new();
        let v = parse_str(&mut gc, "'x");
        let items = &v.obj().as_list().items;
        assert_eq!(items.len(), 2);
        assert_eq!(&*items[0].obj().as_symbol().name, "$quote");
    }

    #[test]
    fn tail_splice_appends_siblings() {
        let mut gc = Gc::new();
        let src = "(foo a .) (b c) (d e)";
        let v = parse_str(&mut gc, src);
        let items = &v.obj().as_list().items;
        // foo, a, (b c), (d e)
        assert_eq!(items.len(), 4);
        assert_eq!(&*items[0].obj().as_symbol().name, "foo");
    }

    #[test]
    fn unclosed_list_is_parse_error() {
        let mut gc = Gc::new();
        let v = parse_str(&mut gc, "(1 2");
        assert_eq!(v.obj_type(), Some(ferro_core::ObjType::Error));
        assert_eq!(v.obj().as_error().code, ErrorCode::ParseUnexpectedEndOfFile);
    }

    #[test]
    fn stray_close_paren_is_parse_error() {
        let mut gc = Gc::new();
        let v = parse_str(&mut gc, ")");
        assert_eq!(v.obj().as_error().code, ErrorCode::ParseUnexpectedEndList);
    }

    #[test]
    fn repeated_parse_advances_cursor() {
        let mut gc = Gc::new();
        let bytes = b"1 2 3";
        let r1 = parse(&mut gc, bytes, 0);
        assert_eq!(r1.value.as_int(), 1);
        let r2 = parse(&mut gc, bytes, r1.next);
        assert_eq!(r2.value.as_int(), 2);
        let r3 = parse(&mut gc, bytes, r2.next);
        assert_eq!(r3.value.as_int(), 3);
    }

    #[test]
    fn comment_is_skipped() {
        let mut gc = Gc::new();
        let v = parse_str(&mut gc, ";; a comment\n42");
        assert_eq!(v.as_int(), 42);
    }
}

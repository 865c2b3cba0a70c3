//! The lexer.

use derive_more::Display;
use regex::Regex;

/// Tokens in the program.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display("kind: '{kind}', part of input: '{text}'")]
pub struct Token<'src> {
    /// What token class this token belongs to.
    pub kind: TokenKind,
    /// What part of the input this token carries.
    pub text: &'src str,
    /// Byte offset of the start of this token in the source.
    pub pos: usize,
}

/// Token classes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Display, Debug)]
pub enum TokenKind {
    #[display("id")]
    Id,
    #[display("num")]
    Num,
    #[display("int")]
    Int,
    #[display("if")]
    If,
    #[display("else")]
    Else,
    #[display("while")]
    While,
    #[display("do")]
    Do,
    #[display("for")]
    For,
    #[display("break")]
    Break,
    #[display("continue")]
    Continue,
    #[display("return")]
    Return,
    #[display("(")]
    LParen,
    #[display(")")]
    RParen,
    #[display("{{")]
    LBrace,
    #[display("}}")]
    RBrace,
    #[display("[")]
    LBracket,
    #[display("]")]
    RBracket,
    #[display(",")]
    Comma,
    #[display(";")]
    Semi,
    #[display("=")]
    Assign,
    #[display("==")]
    EqEq,
    #[display("!=")]
    NotEq,
    #[display("<=")]
    Le,
    #[display(">=")]
    Ge,
    #[display("<")]
    Lt,
    #[display(">")]
    Gt,
    #[display("&&")]
    AndAnd,
    #[display("||")]
    OrOr,
    #[display("!")]
    Bang,
    #[display("+")]
    Plus,
    #[display("-")]
    Minus,
    #[display("*")]
    Star,
    #[display("/")]
    Slash,
    #[display("%")]
    Percent,
    #[display("~")]
    Tilde,
}

/// Fixed table of (regex, kind) tried in order at the current position.
/// Order matters: keywords must be tried before the generic identifier
/// pattern, and multi-character operators before their single-character
/// prefixes.
fn matchers() -> Vec<(Regex, TokenKind)> {
    use TokenKind::*;
    let k = |pat: &str| Regex::new(&format!(r"\A{pat}")).unwrap();
    vec![
        (k(r"int\b"), Int),
        (k(r"if\b"), If),
        (k(r"else\b"), Else),
        (k(r"while\b"), While),
        (k(r"do\b"), Do),
        (k(r"for\b"), For),
        (k(r"break\b"), Break),
        (k(r"continue\b"), Continue),
        (k(r"return\b"), Return),
        (k(r"[A-Za-z_][A-Za-z0-9_]*"), Id),
        (k(r"[0-9]+"), Num),
        (k(r"\("), LParen),
        (k(r"\)"), RParen),
        (k(r"\{"), LBrace),
        (k(r"\}"), RBrace),
        (k(r"\["), LBracket),
        (k(r"\]"), RBracket),
        (k(r","), Comma),
        (k(r";"), Semi),
        (k(r"=="), EqEq),
        (k(r"!="), NotEq),
        (k(r"<="), Le),
        (k(r">="), Ge),
        (k(r"&&"), AndAnd),
        (k(r"\|\|"), OrOr),
        (k(r"="), Assign),
        (k(r"<"), Lt),
        (k(r">"), Gt),
        (k(r"!"), Bang),
        (k(r"\+"), Plus),
        (k(r"-"), Minus),
        (k(r"\*"), Star),
        (k(r"/"), Slash),
        (k(r"%"), Percent),
        (k(r"~"), Tilde),
    ]
}

#[derive(Clone, Copy)]
pub struct LexError(pub usize, pub char);

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Lexer error: unexpected character {:?} at {}", self.1, self.0)
    }
}

impl std::fmt::Debug for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Lexer error: unexpected character {:?} at {}", self.1, self.0)
    }
}

impl std::error::Error for LexError {}

pub struct Lexer<'input> {
    input: &'input str,
    pos: usize,
    whitespace: Regex,
    matchers: Vec<(Regex, TokenKind)>,
}

impl<'input> Lexer<'input> {
    pub fn new(input: &'input str) -> Self {
        Lexer {
            input,
            pos: 0,
            whitespace: Regex::new(r"\A(?:[ \t\f\r\n\v]|(?://[^\n]*))*").unwrap(),
            matchers: matchers(),
        }
    }

    /// Has the lexer reached the end of input?
    pub fn end_of_input(&self) -> bool {
        self.peek_past_whitespace() == self.input.len()
    }

    fn peek_past_whitespace(&self) -> usize {
        match self.whitespace.find(&self.input[self.pos..]) {
            Some(m) => self.pos + m.end(),
            None => self.pos,
        }
    }

    // Skip comments and whitespace.
    fn skip_whitespace(&mut self) {
        self.pos = self.peek_past_whitespace();
    }

    /// Get the next token if possible.
    ///
    /// The return type distinguishes between end-of-input and lexer error.
    pub fn next(&mut self) -> Result<Option<Token<'input>>, LexError> {
        self.skip_whitespace();
        if self.pos == self.input.len() {
            return Ok(None);
        }
        let rest = &self.input[self.pos..];
        for (re, kind) in &self.matchers {
            if let Some(m) = re.find(rest) {
                let start = self.pos;
                let text = m.as_str();
                self.pos += text.len();
                return Ok(Some(Token { kind: *kind, text, pos: start }));
            }
        }
        let bad = rest.chars().next().unwrap();
        Err(LexError(self.pos, bad))
    }

    /// Collect every token, stopping at the first error.
    pub fn tokenize(mut self) -> Result<Vec<Token<'input>>, LexError> {
        let mut toks = Vec::new();
        while let Some(tok) = self.next()? {
            toks.push(tok);
        }
        Ok(toks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexes_keywords_and_identifiers() {
        let toks = Lexer::new("int main return returning").tokenize().unwrap();
        let kinds: Vec<_> = toks.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TokenKind::Int, TokenKind::Id, TokenKind::Return, TokenKind::Id]);
        assert_eq!(toks[3].text, "returning");
    }

    #[test]
    fn lexes_operators_longest_match_first() {
        let toks = Lexer::new("<= < == = &&").tokenize().unwrap();
        let kinds: Vec<_> = toks.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![TokenKind::Le, TokenKind::Lt, TokenKind::EqEq, TokenKind::Assign, TokenKind::AndAnd]
        );
    }

    #[test]
    fn skips_comments() {
        let toks = Lexer::new("int x; // a comment\nint y;").tokenize().unwrap();
        assert_eq!(toks.len(), 8);
    }

    #[test]
    fn reports_offset_of_bad_character() {
        let err = Lexer::new("int x = 1 @ 2;").tokenize().unwrap_err();
        assert_eq!(err.0, 10);
        assert_eq!(err.1, '@');
    }
}

//! Lexer for Arrow source text.
//!
//! Syntax:
//! - Comments: `# line` or `/* block */`
//! - String literals: double-quoted, single line
//! - Keywords: `exit enter do/undo yielding result until const from for ref if`
//! - Identifiers may contain dots (`xs.push`); the split into a variable
//!   and its method happens later, at lookup time
//! - Numbers are plain digit runs; the parser assembles `3.25` into an
//!   exact rational from the pieces

use crate::error::ArrowError;

/// Token categories produced by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier, possibly dotted.
    Id,
    /// A run of decimal digits.
    Digits,
    /// A double-quoted string literal (text stored without quotes).
    Str,
    /// A reserved word.
    Keyword,
    /// A punctuation symbol such as `:=` or `<=>`.
    Symbol,
    /// End of input.
    Eof,
}

/// A token with its position in the source (both zero-based).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub col: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize, col: usize) -> Self {
        Token {
            kind,
            text: text.into(),
            line,
            col,
        }
    }
}

const KEYWORDS: &[&str] = &[
    "exit", "enter", "do/undo", "yielding", "result", "until", "const", "from", "for", "if",
    "ref",
];

/// Multi-character symbols, longest first so that `<=>` wins over `<=`
/// and `<=` over `<`.
const SYMBOLS: &[&str] = &[
    "<=>", "*=", "/=", "^=", "+=", "-=", "<=", ">=", "==", "!=", ":=", "=>", "%", "&", "+", "-",
    "/", "*", ">", "<", "=", ":", "[", "]", "(", ")", "{", "}", ",", ".",
];

/// Tokenize the whole source, ending with an EOF token.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ArrowError> {
    Scanner::new(source).tokens()
}

pub struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
}

impl Scanner {
    pub fn new(source: &str) -> Self {
        Scanner {
            chars: source.chars().collect(),
            pos: 0,
            line: 0,
            col: 0,
        }
    }

    pub fn tokens(mut self) -> Result<Vec<Token>, ArrowError> {
        let mut tokens = Vec::new();

        while let Some(c) = self.peek(0) {
            let (line, col) = (self.line, self.col);

            if c == '\n' {
                self.advance();
                self.line += 1;
                self.col = 0;
            } else if c.is_whitespace() {
                self.advance();
            } else if c == '#' {
                // Line comment runs to the end of the line.
                while self.peek(0).is_some_and(|c| c != '\n') {
                    self.advance();
                }
            } else if self.matches("/*") {
                self.block_comment();
            } else if c == '"' {
                tokens.push(self.string_literal(line, col)?);
            } else if c.is_ascii_digit() {
                let text = self.take_while(|c| c.is_ascii_digit());
                tokens.push(Token::new(TokenKind::Digits, text, line, col));
            } else if c.is_ascii_alphabetic() || c == '_' {
                tokens.push(self.word(line, col));
            } else if let Some(symbol) = SYMBOLS.iter().find(|s| self.matches(s)) {
                for _ in 0..symbol.len() {
                    self.advance();
                }
                tokens.push(Token::new(TokenKind::Symbol, *symbol, line, col));
            } else {
                let token = Token::new(TokenKind::Symbol, c, line, col);
                return Err(ArrowError::scanning(
                    format!("Unrecognized symbol '{}'.", c),
                    token,
                ));
            }
        }

        tokens.push(Token::new(TokenKind::Eof, "", self.line, self.col));
        Ok(tokens)
    }

    fn peek(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    fn matches(&self, text: &str) -> bool {
        text.chars()
            .enumerate()
            .all(|(i, c)| self.peek(i) == Some(c))
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek(0);
        self.pos += 1;
        self.col += 1;
        c
    }

    fn take_while(&mut self, keep: impl Fn(char) -> bool) -> String {
        let mut text = String::new();
        while let Some(c) = self.peek(0) {
            if !keep(c) {
                break;
            }
            text.push(c);
            self.advance();
        }
        text
    }

    fn block_comment(&mut self) {
        self.advance();
        self.advance();
        while self.peek(0).is_some() && !self.matches("*/") {
            if self.peek(0) == Some('\n') {
                self.line += 1;
                self.col = 0;
                self.pos += 1;
            } else {
                self.advance();
            }
        }
        if self.matches("*/") {
            self.advance();
            self.advance();
        }
    }

    fn string_literal(&mut self, line: usize, col: usize) -> Result<Token, ArrowError> {
        self.advance(); // opening quote
        let text = self.take_while(|c| c != '"' && c != '\n');
        if self.peek(0) != Some('"') {
            let token = Token::new(TokenKind::Str, text, line, col);
            return Err(ArrowError::scanning("Unterminated string literal.", token));
        }
        self.advance(); // closing quote
        Ok(Token::new(TokenKind::Str, text, line, col))
    }

    /// Scan an identifier or keyword. Dots are part of identifiers here
    /// (`xs.push`); `do/undo` is the one keyword containing a slash.
    fn word(&mut self, line: usize, col: usize) -> Token {
        let mut text = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
        if text == "do" && self.matches("/undo") {
            for _ in 0.."/undo".len() {
                self.advance();
            }
            text.push_str("/undo");
        }
        let kind = if KEYWORDS.contains(&text.as_str()) {
            TokenKind::Keyword
        } else {
            TokenKind::Id
        };
        Token::new(kind, text, line, col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<(TokenKind, String)> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, t.text))
            .collect()
    }

    #[test]
    fn test_symbols_longest_match() {
        let tokens = kinds("a <=> b <= c := 1");
        let symbols: Vec<_> = tokens
            .iter()
            .filter(|(k, _)| *k == TokenKind::Symbol)
            .map(|(_, s)| s.as_str())
            .collect();
        assert_eq!(symbols, vec!["<=>", "<=", ":="]);
    }

    #[test]
    fn test_keywords_and_identifiers() {
        let tokens = kinds("from formula if iffy do/undo done");
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Keyword, "from".to_string()),
                (TokenKind::Id, "formula".to_string()),
                (TokenKind::Keyword, "if".to_string()),
                (TokenKind::Id, "iffy".to_string()),
                (TokenKind::Keyword, "do/undo".to_string()),
                (TokenKind::Id, "done".to_string()),
                (TokenKind::Eof, String::new()),
            ]
        );
    }

    #[test]
    fn test_dotted_identifier_is_one_token() {
        let tokens = kinds("xs.push(1)");
        assert_eq!(tokens[0], (TokenKind::Id, "xs.push".to_string()));
    }

    #[test]
    fn test_comments_are_skipped() {
        let tokens = kinds("x # trailing\n/* block\nspanning */ y");
        let ids: Vec<_> = tokens
            .iter()
            .filter(|(k, _)| *k == TokenKind::Id)
            .map(|(_, s)| s.as_str())
            .collect();
        assert_eq!(ids, vec!["x", "y"]);
    }

    #[test]
    fn test_string_literal() {
        let tokens = kinds("s := \"hello there\"");
        assert!(tokens.contains(&(TokenKind::Str, "hello there".to_string())));
    }

    #[test]
    fn test_positions() {
        let tokens = tokenize("x := 1\ny -= 2").unwrap();
        let y = tokens.iter().find(|t| t.text == "y").unwrap();
        assert_eq!((y.line, y.col), (1, 0));
        let two = tokens.iter().find(|t| t.text == "2").unwrap();
        assert_eq!((two.line, two.col), (1, 5));
    }

    #[test]
    fn test_unrecognized_symbol() {
        assert!(tokenize("x := $").is_err());
    }

    #[test]
    fn test_unterminated_string() {
        assert!(tokenize("s := \"oops\nnext").is_err());
    }
}

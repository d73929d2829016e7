//! 代码片段词法分析

use std::fmt;

use crate::error::*;

/// 运算符与标点
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punct {
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semi,
    Dot,
    Colon,
    Question,
    Arrow,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PlusPlus,
    MinusMinus,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Not,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

/// 运算符表, 按长度降序匹配
const PUNCTS: [(&str, Punct); 35] = [
    ("===", Punct::StrictEq),
    ("!==", Punct::StrictNotEq),
    ("==", Punct::Eq),
    ("!=", Punct::NotEq),
    ("<=", Punct::Le),
    (">=", Punct::Ge),
    ("&&", Punct::And),
    ("||", Punct::Or),
    ("=>", Punct::Arrow),
    ("++", Punct::PlusPlus),
    ("--", Punct::MinusMinus),
    ("+=", Punct::PlusAssign),
    ("-=", Punct::MinusAssign),
    ("*=", Punct::StarAssign),
    ("/=", Punct::SlashAssign),
    ("(", Punct::LParen),
    (")", Punct::RParen),
    ("{", Punct::LBrace),
    ("}", Punct::RBrace),
    ("[", Punct::LBracket),
    ("]", Punct::RBracket),
    (",", Punct::Comma),
    (";", Punct::Semi),
    (".", Punct::Dot),
    (":", Punct::Colon),
    ("?", Punct::Question),
    ("=", Punct::Assign),
    ("+", Punct::Plus),
    ("-", Punct::Minus),
    ("*", Punct::Star),
    ("/", Punct::Slash),
    ("%", Punct::Percent),
    ("!", Punct::Not),
    ("<", Punct::Lt),
    (">", Punct::Gt),
];

impl Punct {
    pub fn as_str(self) -> &'static str {
        PUNCTS
            .iter()
            .find(|(_, punct)| *punct == self)
            .map_or("?", |(text, _)| *text)
    }
}

/// 词法单元
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Number(f64),
    Str(String),
    Punct(Punct),
    /// 文本片段
    Text(String),
    /// 插值片段起点
    InterpolateOpen,
    /// 插值片段终点
    InterpolateClose,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(name) => write!(f, "`{name}`"),
            Self::Number(n) => write!(f, "number `{n}`"),
            Self::Str(s) => write!(f, "string {s:?}"),
            Self::Punct(punct) => write!(f, "`{}`", punct.as_str()),
            Self::Text(_) => write!(f, "template text"),
            Self::InterpolateOpen => write!(f, "start of interpolation"),
            Self::InterpolateClose => write!(f, "end of interpolation"),
            Self::Eof => write!(f, "end of template"),
        }
    }
}

/// 带行号的词法单元
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub token: Token,
    pub line: usize,
}

/// 对代码片段进行词法分析, 结果追加到 out
pub fn lex(code: &str, line: usize, out: &mut Vec<Lexeme>) -> Result<()> {
    let mut lexer = Lexer {
        chars: code.chars().collect(),
        pos: 0,
        line,
    };

    while let Some(lexeme) = lexer.next_lexeme()? {
        out.push(lexeme);
    }
    Ok(())
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
}

impl Lexer {
    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek(0)?;
        if c == '\n' {
            self.line += 1;
        }
        self.pos += 1;
        Some(c)
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars().enumerate().all(|(i, c)| self.peek(i) == Some(c))
    }

    /// 跳过空白与注释
    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            match self.peek(0) {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') if self.peek(1) == Some('/') => {
                    while self.peek(0).is_some_and(|c| c != '\n') {
                        self.bump();
                    }
                }
                Some('/') if self.peek(1) == Some('*') => {
                    let line = self.line;
                    self.pos += 2;
                    while !self.starts_with("*/") {
                        if self.bump().is_none() {
                            return Err(Error::syntax(line, "unterminated comment"));
                        }
                    }
                    self.pos += 2;
                }
                _ => return Ok(()),
            }
        }
    }

    fn next_lexeme(&mut self) -> Result<Option<Lexeme>> {
        self.skip_trivia()?;

        let line = self.line;
        let Some(c) = self.peek(0) else {
            return Ok(None);
        };

        let token = if c.is_ascii_digit() || (c == '.' && self.peek(1).is_some_and(|c| c.is_ascii_digit())) {
            self.number()?
        } else if c == '\'' || c == '"' {
            self.string(c)?
        } else if is_ident_start(c) {
            let start = self.pos;
            while self.peek(0).is_some_and(is_ident_continue) {
                self.pos += 1;
            }
            Token::Ident(self.chars[start..self.pos].iter().collect())
        } else {
            let (text, punct) = PUNCTS
                .iter()
                .find(|(text, _)| self.starts_with(text))
                .ok_or_else(|| Error::syntax(line, format!("unexpected character `{c}`")))?;
            self.pos += text.chars().count();
            Token::Punct(*punct)
        };

        Ok(Some(Lexeme { token, line }))
    }

    fn number(&mut self) -> Result<Token> {
        let start = self.pos;
        while self.peek(0).is_some_and(|c| c.is_ascii_digit() || c == '.') {
            self.pos += 1;
        }
        if matches!(self.peek(0), Some('e' | 'E')) {
            self.pos += 1;
            if matches!(self.peek(0), Some('+' | '-')) {
                self.pos += 1;
            }
            while self.peek(0).is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }

        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse()
            .map(Token::Number)
            .map_err(|_| Error::syntax(self.line, format!("invalid number `{text}`")))
    }

    fn string(&mut self, quote: char) -> Result<Token> {
        let line = self.line;
        let mut value = String::new();
        self.pos += 1;

        loop {
            let c = self
                .bump()
                .ok_or_else(|| Error::syntax(line, "unterminated string"))?;
            match c {
                c if c == quote => break,
                '\n' => return Err(Error::syntax(line, "unterminated string")),
                '\\' => {
                    let escaped = self
                        .bump()
                        .ok_or_else(|| Error::syntax(line, "unterminated string"))?;
                    match escaped {
                        'n' => value.push('\n'),
                        'r' => value.push('\r'),
                        't' => value.push('\t'),
                        'b' => value.push('\u{8}'),
                        'f' => value.push('\u{c}'),
                        'v' => value.push('\u{b}'),
                        '0' => value.push('\0'),
                        'u' => value.push(self.unicode_escape(line)?),
                        // 行接续
                        '\n' => {}
                        c => value.push(c),
                    }
                }
                c => value.push(c),
            }
        }

        Ok(Token::Str(value))
    }

    fn unicode_escape(&mut self, line: usize) -> Result<char> {
        let digits: String = (0..4).filter_map(|_| self.bump()).collect();
        u32::from_str_radix(&digits, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| Error::syntax(line, format!("invalid unicode escape `\\u{digits}`")))
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(code: &str) -> Vec<Token> {
        let mut out = Vec::new();
        lex(code, 1, &mut out).unwrap();
        out.into_iter().map(|lexeme| lexeme.token).collect()
    }

    #[test]
    fn test_lex_expression() {
        assert_eq!(
            tokens("a.b[0] !== 'x'"),
            vec![
                Token::Ident("a".into()),
                Token::Punct(Punct::Dot),
                Token::Ident("b".into()),
                Token::Punct(Punct::LBracket),
                Token::Number(0.),
                Token::Punct(Punct::RBracket),
                Token::Punct(Punct::StrictNotEq),
                Token::Str("x".into()),
            ]
        );
    }

    #[test]
    fn test_lex_jquery_each() {
        assert_eq!(
            tokens("$.each(xs, function (i, x) { // loop\n"),
            vec![
                Token::Ident("$".into()),
                Token::Punct(Punct::Dot),
                Token::Ident("each".into()),
                Token::Punct(Punct::LParen),
                Token::Ident("xs".into()),
                Token::Punct(Punct::Comma),
                Token::Ident("function".into()),
                Token::Punct(Punct::LParen),
                Token::Ident("i".into()),
                Token::Punct(Punct::Comma),
                Token::Ident("x".into()),
                Token::Punct(Punct::RParen),
                Token::Punct(Punct::LBrace),
            ]
        );
    }

    #[test]
    fn test_lex_string_escapes() {
        assert_eq!(
            tokens(r#""a\"b\n" 'c\'d' 'é'"#),
            vec![
                Token::Str("a\"b\n".into()),
                Token::Str("c'd".into()),
                Token::Str("é".into()),
            ]
        );
    }

    #[test]
    fn test_lex_errors() {
        let mut out = Vec::new();
        assert!(matches!(lex("'open", 3, &mut out), Err(Error::Syntax { line: 3, .. })));
        assert!(matches!(lex("a # b", 1, &mut out), Err(Error::Syntax { .. })));
    }
}

//! 模板语法分析
//!
//! 全部片段先拼接为同一个词法单元流: 文本片段为 Text, 插值片段包裹在
//! InterpolateOpen / InterpolateClose 之间, 求值片段之后补一个分号.
//! 因此代码块可以跨越多个求值片段, 中间夹杂文本与插值.

use std::sync::Arc;

use crate::{
    ast::*,
    error::*,
    lexer::{Lexeme, Punct, Token, lex},
    segment::{Segment, SegmentKind},
    value::number_to_string,
};

/// 不可用作标识符的关键字
const RESERVED: [&str; 24] = [
    "var", "let", "const", "function", "if", "else", "for", "while", "do", "break", "continue",
    "return", "true", "false", "null", "this", "typeof", "in", "new", "delete", "void",
    "switch", "case", "instanceof",
];

/// 将模板片段解析为语句序列
pub fn parse(segments: &[Segment]) -> Result<Vec<Stmt>> {
    let mut tokens = Vec::new();
    let mut line = 1;

    for seg in segments {
        line = seg.line;
        match seg.kind {
            SegmentKind::Text => tokens.push(Lexeme {
                token: Token::Text(seg.text().into_owned()),
                line,
            }),
            SegmentKind::Interpolate => {
                tokens.push(Lexeme {
                    token: Token::InterpolateOpen,
                    line,
                });
                lex(&seg.content, line, &mut tokens)?;
                tokens.push(Lexeme {
                    token: Token::InterpolateClose,
                    line,
                });
            }
            SegmentKind::Evaluate => {
                lex(&seg.content, line, &mut tokens)?;
                tokens.push(Lexeme {
                    token: Token::Punct(Punct::Semi),
                    line,
                });
            }
        }
    }
    tokens.push(Lexeme {
        token: Token::Eof,
        line,
    });

    let mut parser = Parser {
        tokens,
        pos: 0,
        loops: 0,
    };
    let mut program = Vec::new();
    while parser.peek() != &Token::Eof {
        program.push(parser.statement()?);
    }
    Ok(program)
}

struct Parser {
    tokens: Vec<Lexeme>,
    pos: usize,
    /// 当前所在的循环层数, 进入函数体时清零
    loops: usize,
}

impl Parser {
    // ---------------- cursor: begin ----------------

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.tokens
            .get(self.pos + offset)
            .map_or(&Token::Eof, |lexeme| &lexeme.token)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or(self.tokens.last())
            .map_or(1, |lexeme| lexeme.line)
    }

    fn prev_line(&self) -> usize {
        self.pos
            .checked_sub(1)
            .and_then(|pos| self.tokens.get(pos))
            .map_or(1, |lexeme| lexeme.line)
    }

    fn bump(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn is_punct(&self, punct: Punct) -> bool {
        self.peek() == &Token::Punct(punct)
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Token::Ident(word) if word == keyword)
    }

    fn eat(&mut self, punct: Punct) -> bool {
        let found = self.is_punct(punct);
        if found {
            self.bump();
        }
        found
    }

    fn expect(&mut self, punct: Punct) -> Result<()> {
        if self.eat(punct) {
            Ok(())
        } else {
            Err(Error::syntax(
                self.line(),
                format!("expected `{}`, found {}", punct.as_str(), self.peek()),
            ))
        }
    }

    fn unexpected(&self) -> Error {
        Error::syntax(self.line(), format!("unexpected {}", self.peek()))
    }

    /// 读取标识符
    fn ident(&mut self) -> Result<String> {
        match self.peek() {
            Token::Ident(name) if !RESERVED.contains(&name.as_str()) => {
                let name = name.clone();
                self.bump();
                Ok(name)
            }
            _ => Err(self.unexpected()),
        }
    }

    /// 语句结束: 分号可省略
    fn terminator(&mut self) -> Result<()> {
        if self.eat(Punct::Semi) || self.at_statement_end() {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn at_statement_end(&self) -> bool {
        matches!(
            self.peek(),
            Token::Punct(Punct::Semi | Punct::RBrace)
                | Token::Text(_)
                | Token::InterpolateOpen
                | Token::Eof
        ) || self.line() > self.prev_line()
    }

    // ----------------- cursor: end -----------------

    // ---------------- statement: begin ----------------

    fn statement(&mut self) -> Result<Stmt> {
        let token = self.peek().clone();

        match token {
            Token::Text(text) => {
                self.bump();
                Ok(Stmt::Text(text))
            }
            Token::InterpolateOpen => {
                self.bump();
                let expr = self.expression()?;
                if self.peek() != &Token::InterpolateClose {
                    return Err(self.unexpected());
                }
                self.bump();
                Ok(Stmt::Emit(expr))
            }
            Token::Punct(Punct::LBrace) => {
                self.bump();
                Ok(Stmt::Block(self.block_body()?))
            }
            Token::Punct(Punct::Semi) => {
                self.bump();
                Ok(Stmt::Empty)
            }
            Token::Eof => Err(self.unexpected()),
            Token::Ident(word) => match word.as_str() {
                "var" | "let" | "const" => {
                    let stmt = self.declaration()?;
                    self.terminator()?;
                    Ok(stmt)
                }
                "function" if matches!(self.peek_at(1), Token::Ident(_)) => {
                    self.bump();
                    let name = self.ident()?;
                    Ok(Stmt::Function(name, self.function_rest()?))
                }
                "if" => self.if_statement(),
                "for" => self.for_statement(),
                "while" => {
                    self.bump();
                    let test = self.paren_expression()?;
                    Ok(Stmt::While(test, self.loop_body()?))
                }
                "break" | "continue" if self.loops == 0 => {
                    Err(Error::syntax(self.line(), format!("illegal {word} statement")))
                }
                "break" => {
                    self.bump();
                    self.terminator()?;
                    Ok(Stmt::Break)
                }
                "continue" => {
                    self.bump();
                    self.terminator()?;
                    Ok(Stmt::Continue)
                }
                "return" => {
                    self.bump();
                    let value = if self.at_statement_end() {
                        None
                    } else {
                        Some(self.expression()?)
                    };
                    self.terminator()?;
                    Ok(Stmt::Return(value))
                }
                _ => self.expression_statement(),
            },
            _ => self.expression_statement(),
        }
    }

    fn expression_statement(&mut self) -> Result<Stmt> {
        let expr = self.expression()?;
        self.terminator()?;
        Ok(Stmt::Expr(expr))
    }

    /// 代码块主体, 调用时 `{` 已被消耗
    fn block_body(&mut self) -> Result<Vec<Stmt>> {
        let line = self.prev_line();
        let mut body = Vec::new();

        loop {
            match self.peek() {
                Token::Punct(Punct::RBrace) => {
                    self.bump();
                    return Ok(body);
                }
                Token::Eof => return Err(Error::syntax(line, "unclosed block")),
                _ => body.push(self.statement()?),
            }
        }
    }

    fn decl_kind(&self) -> Option<DeclKind> {
        match self.peek() {
            Token::Ident(word) => match word.as_str() {
                "var" => Some(DeclKind::Var),
                "let" => Some(DeclKind::Let),
                "const" => Some(DeclKind::Const),
                _ => None,
            },
            _ => None,
        }
    }

    fn declaration(&mut self) -> Result<Stmt> {
        let kind = self.decl_kind().ok_or_else(|| self.unexpected())?;
        self.bump();

        let mut declarators = Vec::new();
        loop {
            let name = self.ident()?;
            let init = if self.eat(Punct::Assign) {
                Some(self.assignment()?)
            } else {
                None
            };
            declarators.push((name, init));

            if !self.eat(Punct::Comma) {
                break;
            }
        }

        Ok(Stmt::Declare(kind, declarators))
    }

    fn paren_expression(&mut self) -> Result<Expr> {
        self.expect(Punct::LParen)?;
        let expr = self.expression()?;
        self.expect(Punct::RParen)?;
        Ok(expr)
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        self.bump();
        let test = self.paren_expression()?;
        let consequent = Box::new(self.statement()?);

        let alternate = if self.is_keyword("else") {
            self.bump();
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If(test, consequent, alternate))
    }

    fn for_statement(&mut self) -> Result<Stmt> {
        self.bump();
        self.expect(Punct::LParen)?;

        // for (x of xs) / for (k in obj)
        let decl = self.decl_kind();
        let offset = usize::from(decl.is_some());
        if let (Token::Ident(name), Token::Ident(word)) =
            (self.peek_at(offset), self.peek_at(offset + 1))
        {
            if (word == "of" || word == "in") && !RESERVED.contains(&name.as_str()) {
                let name = name.clone();
                let of = word == "of";
                self.pos += offset + 2;

                let target = self.expression()?;
                self.expect(Punct::RParen)?;
                let body = self.loop_body()?;

                return Ok(if of {
                    Stmt::ForOf {
                        decl,
                        name,
                        iterable: target,
                        body,
                    }
                } else {
                    Stmt::ForIn {
                        decl,
                        name,
                        object: target,
                        body,
                    }
                });
            }
        }

        let init = if self.is_punct(Punct::Semi) {
            None
        } else if decl.is_some() {
            Some(Box::new(self.declaration()?))
        } else {
            Some(Box::new(Stmt::Expr(self.expression()?)))
        };
        self.expect(Punct::Semi)?;

        let test = if self.is_punct(Punct::Semi) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(Punct::Semi)?;

        let update = if self.is_punct(Punct::RParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(Punct::RParen)?;

        Ok(Stmt::For {
            init,
            test,
            update,
            body: self.loop_body()?,
        })
    }

    fn loop_body(&mut self) -> Result<Box<Stmt>> {
        self.loops += 1;
        let body = self.statement();
        self.loops -= 1;
        Ok(Box::new(body?))
    }

    /// 函数主体, 调用时 `{` 已被消耗
    fn function_body(&mut self) -> Result<Vec<Stmt>> {
        let loops = std::mem::take(&mut self.loops);
        let body = self.block_body();
        self.loops = loops;
        body
    }

    /// 函数参数与主体, 调用时 `function` 与函数名已被消耗
    fn function_rest(&mut self) -> Result<Arc<FunctionDef>> {
        let params = self.params()?;
        self.expect(Punct::LBrace)?;

        Ok(Arc::new(FunctionDef {
            params,
            body: FunctionBody::Block(self.function_body()?),
            arrow: false,
        }))
    }

    fn params(&mut self) -> Result<Vec<String>> {
        self.expect(Punct::LParen)?;

        let mut params = Vec::new();
        while !self.eat(Punct::RParen) {
            params.push(self.ident()?);
            if !self.eat(Punct::Comma) {
                self.expect(Punct::RParen)?;
                break;
            }
        }
        Ok(params)
    }

    // ----------------- statement: end -----------------

    // ---------------- expression: begin ----------------

    fn expression(&mut self) -> Result<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr> {
        if let Some(arrow) = self.arrow_function()? {
            return Ok(arrow);
        }

        let target = self.conditional()?;
        let op = match self.peek() {
            Token::Punct(Punct::Assign) => None,
            Token::Punct(Punct::PlusAssign) => Some(BinaryOp::Add),
            Token::Punct(Punct::MinusAssign) => Some(BinaryOp::Sub),
            Token::Punct(Punct::StarAssign) => Some(BinaryOp::Mul),
            Token::Punct(Punct::SlashAssign) => Some(BinaryOp::Div),
            _ => return Ok(target),
        };

        let line = self.line();
        self.bump();
        let Expr::Ident(name) = target else {
            return Err(Error::syntax(line, "invalid assignment target"));
        };

        Ok(Expr::Assign(op, name, Box::new(self.assignment()?)))
    }

    /// 尝试解析箭头函数
    fn arrow_function(&mut self) -> Result<Option<Expr>> {
        let params = match (self.peek(), self.peek_at(1)) {
            (Token::Ident(name), Token::Punct(Punct::Arrow))
                if !RESERVED.contains(&name.as_str()) =>
            {
                let params = vec![name.clone()];
                self.pos += 2;
                params
            }
            (Token::Punct(Punct::LParen), _) => {
                let Some(close) = self.matching_paren() else {
                    return Ok(None);
                };
                if self.peek_at(close + 1) != &Token::Punct(Punct::Arrow) {
                    return Ok(None);
                }
                let params = self.params()?;
                self.expect(Punct::Arrow)?;
                params
            }
            _ => return Ok(None),
        };

        let body = if self.eat(Punct::LBrace) {
            FunctionBody::Block(self.function_body()?)
        } else {
            FunctionBody::Expr(self.assignment()?)
        };

        Ok(Some(Expr::Function(Arc::new(FunctionDef {
            params,
            body,
            arrow: true,
        }))))
    }

    /// 当前 `(` 对应的 `)` 的相对位置
    fn matching_paren(&self) -> Option<usize> {
        let mut depth = 0usize;
        let mut offset = 0;

        loop {
            match self.peek_at(offset) {
                Token::Punct(Punct::LParen) => depth += 1,
                Token::Punct(Punct::RParen) => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(offset);
                    }
                }
                Token::Eof => return None,
                _ => {}
            }
            offset += 1;
        }
    }

    fn conditional(&mut self) -> Result<Expr> {
        let test = self.logical_or()?;
        if !self.eat(Punct::Question) {
            return Ok(test);
        }

        let consequent = self.assignment()?;
        self.expect(Punct::Colon)?;
        let alternate = self.assignment()?;

        Ok(Expr::Conditional(
            Box::new(test),
            Box::new(consequent),
            Box::new(alternate),
        ))
    }

    fn logical_or(&mut self) -> Result<Expr> {
        let mut left = self.logical_and()?;
        while self.eat(Punct::Or) {
            let right = self.logical_and()?;
            left = Expr::Logical(LogicalOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn logical_and(&mut self) -> Result<Expr> {
        let mut left = self.equality()?;
        while self.eat(Punct::And) {
            let right = self.equality()?;
            left = Expr::Logical(LogicalOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    /// 左结合二元运算
    fn binary(
        &mut self,
        next: fn(&mut Self) -> Result<Expr>,
        ops: &[(Punct, BinaryOp)],
    ) -> Result<Expr> {
        let mut left = next(self)?;

        'outer: loop {
            for (punct, op) in ops {
                if self.eat(*punct) {
                    let right = next(self)?;
                    left = Expr::Binary(*op, Box::new(left), Box::new(right));
                    continue 'outer;
                }
            }
            return Ok(left);
        }
    }

    fn equality(&mut self) -> Result<Expr> {
        self.binary(
            Self::relational,
            &[
                (Punct::StrictEq, BinaryOp::StrictEq),
                (Punct::StrictNotEq, BinaryOp::StrictNotEq),
                (Punct::Eq, BinaryOp::Eq),
                (Punct::NotEq, BinaryOp::NotEq),
            ],
        )
    }

    fn relational(&mut self) -> Result<Expr> {
        self.binary(
            Self::additive,
            &[
                (Punct::Lt, BinaryOp::Lt),
                (Punct::Le, BinaryOp::Le),
                (Punct::Gt, BinaryOp::Gt),
                (Punct::Ge, BinaryOp::Ge),
            ],
        )
    }

    fn additive(&mut self) -> Result<Expr> {
        self.binary(
            Self::multiplicative,
            &[(Punct::Plus, BinaryOp::Add), (Punct::Minus, BinaryOp::Sub)],
        )
    }

    fn multiplicative(&mut self) -> Result<Expr> {
        self.binary(
            Self::unary,
            &[
                (Punct::Star, BinaryOp::Mul),
                (Punct::Slash, BinaryOp::Div),
                (Punct::Percent, BinaryOp::Rem),
            ],
        )
    }

    fn unary(&mut self) -> Result<Expr> {
        let op = match self.peek() {
            Token::Punct(Punct::Not) => UnaryOp::Not,
            Token::Punct(Punct::Minus) => UnaryOp::Neg,
            Token::Punct(Punct::Plus) => UnaryOp::Plus,
            Token::Ident(word) if word == "typeof" => UnaryOp::TypeOf,
            Token::Punct(Punct::PlusPlus | Punct::MinusMinus) => {
                let delta = if self.is_punct(Punct::PlusPlus) { 1. } else { -1. };
                let line = self.line();
                self.bump();
                return match self.unary()? {
                    Expr::Ident(name) => Ok(Expr::Update {
                        name,
                        delta,
                        prefix: true,
                    }),
                    _ => Err(Error::syntax(line, "invalid update target")),
                };
            }
            _ => return self.postfix(),
        };

        self.bump();
        Ok(Expr::Unary(op, Box::new(self.unary()?)))
    }

    fn postfix(&mut self) -> Result<Expr> {
        let expr = self.call_member()?;

        let delta = match self.peek() {
            Token::Punct(Punct::PlusPlus) => 1.,
            Token::Punct(Punct::MinusMinus) => -1.,
            _ => return Ok(expr),
        };
        // 换行后的 ++ / -- 属于下一条语句
        if self.line() > self.prev_line() {
            return Ok(expr);
        }

        let line = self.line();
        self.bump();
        match expr {
            Expr::Ident(name) => Ok(Expr::Update {
                name,
                delta,
                prefix: false,
            }),
            _ => Err(Error::syntax(line, "invalid update target")),
        }
    }

    fn call_member(&mut self) -> Result<Expr> {
        let mut expr = self.primary()?;

        loop {
            if self.eat(Punct::Dot) {
                // 属性名允许使用关键字
                let Token::Ident(name) = self.peek() else {
                    return Err(self.unexpected());
                };
                let name = name.clone();
                self.bump();
                expr = Expr::Member(Box::new(expr), name);
            } else if self.eat(Punct::LBracket) {
                let index = self.expression()?;
                self.expect(Punct::RBracket)?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else if self.eat(Punct::LParen) {
                let args = self.list(Punct::RParen)?;
                expr = Expr::Call(Box::new(expr), args);
            } else {
                return Ok(expr);
            }
        }
    }

    /// 逗号分隔的表达式列表, 调用时左括号已被消耗
    fn list(&mut self, close: Punct) -> Result<Vec<Expr>> {
        let mut items = Vec::new();
        while !self.eat(close) {
            items.push(self.assignment()?);
            if !self.eat(Punct::Comma) {
                self.expect(close)?;
                break;
            }
        }
        Ok(items)
    }

    fn primary(&mut self) -> Result<Expr> {
        let token = self.peek().clone();
        self.bump();

        match token {
            Token::Number(n) => Ok(Expr::Literal(Literal::Number(n))),
            Token::Str(s) => Ok(Expr::Literal(Literal::Str(s))),
            Token::Punct(Punct::LParen) => {
                let expr = self.expression()?;
                self.expect(Punct::RParen)?;
                Ok(expr)
            }
            Token::Punct(Punct::LBracket) => Ok(Expr::Array(self.list(Punct::RBracket)?)),
            Token::Punct(Punct::LBrace) => self.object(),
            Token::Ident(word) => match word.as_str() {
                "true" => Ok(Expr::Literal(Literal::Bool(true))),
                "false" => Ok(Expr::Literal(Literal::Bool(false))),
                "null" => Ok(Expr::Literal(Literal::Null)),
                "undefined" => Ok(Expr::Literal(Literal::Undefined)),
                "this" => Ok(Expr::This),
                "function" => {
                    // 函数表达式的名称仅作标注
                    if matches!(self.peek(), Token::Ident(_)) {
                        self.ident()?;
                    }
                    Ok(Expr::Function(self.function_rest()?))
                }
                word if RESERVED.contains(&word) => {
                    self.pos -= 1;
                    Err(self.unexpected())
                }
                _ => Ok(Expr::Ident(word)),
            },
            _ => {
                self.pos -= 1;
                Err(self.unexpected())
            }
        }
    }

    /// 对象字面量, 调用时 `{` 已被消耗
    fn object(&mut self) -> Result<Expr> {
        let mut props = Vec::new();

        while !self.eat(Punct::RBrace) {
            let token = self.peek().clone();
            self.bump();

            let (key, shorthand) = match token {
                Token::Ident(name) => (name, true),
                Token::Str(s) => (s, false),
                Token::Number(n) => (number_to_string(n), false),
                _ => {
                    self.pos -= 1;
                    return Err(self.unexpected());
                }
            };

            let value = if self.eat(Punct::Colon) {
                self.assignment()?
            } else if shorthand {
                Expr::Ident(key.clone())
            } else {
                return Err(self.unexpected());
            };
            props.push((key, value));

            if !self.eat(Punct::Comma) {
                self.expect(Punct::RBrace)?;
                break;
            }
        }

        Ok(Expr::Object(props))
    }

    // ----------------- expression: end -----------------
}

//! 模板语法树

use std::sync::Arc;

/// 声明关键字
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Var,
    Let,
    Const,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// 输出文本 (已还原转义)
    Text(String),
    /// 输出插值结果
    Emit(Expr),
    Declare(DeclKind, Vec<(String, Option<Expr>)>),
    Function(String, Arc<FunctionDef>),
    If(Expr, Box<Stmt>, Option<Box<Stmt>>),
    For {
        init: Option<Box<Stmt>>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },
    ForOf {
        decl: Option<DeclKind>,
        name: String,
        iterable: Expr,
        body: Box<Stmt>,
    },
    ForIn {
        decl: Option<DeclKind>,
        name: String,
        object: Expr,
        body: Box<Stmt>,
    },
    While(Expr, Box<Stmt>),
    Block(Vec<Stmt>),
    Break,
    Continue,
    Return(Option<Expr>),
    Expr(Expr),
    Empty,
}

/// 函数定义
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub params: Vec<String>,
    pub body: FunctionBody,
    /// 箭头函数沿用外层 this
    pub arrow: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionBody {
    Block(Vec<Stmt>),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    TypeOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// 赋值运算, None 为直接赋值
pub type AssignOp = Option<BinaryOp>;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Ident(String),
    This,
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call(Box<Expr>, Vec<Expr>),
    Function(Arc<FunctionDef>),
    Unary(UnaryOp, Box<Expr>),
    /// `++x` / `x--`, delta 为 1 或 -1
    Update {
        name: String,
        delta: f64,
        prefix: bool,
    },
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Logical(LogicalOp, Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
    Assign(AssignOp, String, Box<Expr>),
}

//! 模板运行时值

use std::{fmt, rc::Rc, sync::Arc};

use indexmap::IndexMap;

use crate::{ast::FunctionDef, scope::Env};

/// 运行时值
///
/// 数组与对象按引用共享, 比较时按引用判等.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Array(Rc<Vec<Value>>),
    Object(Rc<IndexMap<String, Value>>),
    Function(Rc<Function>),
}

/// 可调用值
#[derive(Debug)]
pub enum Function {
    Closure(Closure),
    Native(Native),
}

/// 模板内定义的函数
pub struct Closure {
    pub def: Arc<FunctionDef>,
    pub env: Env,
    /// 箭头函数捕获的 this
    pub this: Option<Value>,
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("params", &self.def.params)
            .finish_non_exhaustive()
    }
}

/// 内建函数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Native {
    /// 追加输出
    Print,
    /// `$.each(collection, fn(index, value))`
    JqueryEach,
    /// `_.each(collection, fn(value, index))`
    UnderscoreEach,
    /// `String(x)`
    String,
    /// `Number(x)`
    Number,
}

impl Value {
    pub fn string(s: impl Into<Rc<str>>) -> Self {
        Self::String(s.into())
    }

    pub fn native(native: Native) -> Self {
        Self::Function(Rc::new(Function::Native(native)))
    }

    pub fn object(entries: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self::Object(Rc::new(entries.into_iter().collect()))
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0. && !n.is_nan(),
            Self::String(s) => !s.is_empty(),
            Self::Array(_) | Self::Object(_) | Self::Function(_) => true,
        }
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null | Self::Array(_) | Self::Object(_) => "object",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Function(_) => "function",
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Self::Undefined => f64::NAN,
            Self::Null => 0.,
            Self::Bool(b) => f64::from(u8::from(*b)),
            Self::Number(n) => *n,
            Self::String(s) => string_to_number(s),
            Self::Array(_) => string_to_number(&self.to_string()),
            Self::Object(_) | Self::Function(_) => f64::NAN,
        }
    }

    /// 转为原始值: 数组与对象转为字符串
    fn to_primitive(&self) -> Value {
        match self {
            Self::Array(_) | Self::Object(_) | Self::Function(_) => Self::string(self.to_string()),
            v => v.clone(),
        }
    }

    /// 读取属性, 调用方需先排除 null / undefined
    pub fn get(&self, key: &str) -> Value {
        match self {
            Self::Object(map) => map.get(key).cloned().unwrap_or_default(),
            Self::Array(items) => match key {
                "length" => Self::Number(items.len() as f64),
                _ => key
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| items.get(i))
                    .cloned()
                    .unwrap_or_default(),
            },
            Self::String(s) => match key {
                "length" => Self::Number(s.chars().count() as f64),
                _ => key
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| s.chars().nth(i))
                    .map(|c| Self::string(c.to_string()))
                    .unwrap_or_default(),
            },
            _ => Self::Undefined,
        }
    }

    /// `===`
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => Rc::ptr_eq(a, b),
            (Self::Object(a), Self::Object(b)) => Rc::ptr_eq(a, b),
            (Self::Function(a), Self::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// `==`
    pub fn loose_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() || b.is_nullish() => a.is_nullish() && b.is_nullish(),
            (Self::Number(_), Self::String(_))
            | (Self::String(_), Self::Number(_))
            | (Self::Bool(_), _)
            | (_, Self::Bool(_)) => self.to_number() == other.to_number(),
            (Self::Array(_) | Self::Object(_), Self::Number(_) | Self::String(_))
            | (Self::Number(_) | Self::String(_), Self::Array(_) | Self::Object(_)) => {
                self.to_primitive().loose_equals(&other.to_primitive())
            }
            _ => self.strict_equals(other),
        }
    }

    /// `+`: 任一侧为字符串时拼接
    pub fn add(&self, other: &Value) -> Value {
        let (a, b) = (self.to_primitive(), other.to_primitive());
        match (&a, &b) {
            (Self::String(_), _) | (_, Self::String(_)) => Self::string(format!("{a}{b}")),
            _ => Self::Number(a.to_number() + b.to_number()),
        }
    }

    /// 关系比较, 任一侧为 NaN 时返回 None
    pub fn compare(&self, other: &Value) -> Option<std::cmp::Ordering> {
        let (a, b) = (self.to_primitive(), other.to_primitive());
        match (&a, &b) {
            (Self::String(a), Self::String(b)) => Some(a.cmp(b)),
            _ => a.to_number().partial_cmp(&b.to_number()),
        }
    }
}

impl fmt::Display for Value {
    /// 字符串转换
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("undefined"),
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => f.write_str(&number_to_string(*n)),
            Self::String(s) => f.write_str(s),
            Self::Array(items) => f.write_str(&join(items, ",")),
            Self::Object(_) => f.write_str("[object Object]"),
            Self::Function(_) => f.write_str("function () { [native code] }"),
        }
    }
}

impl From<&serde_json::Value> for Value {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Self::string(s.as_str()),
            serde_json::Value::Array(items) => {
                Self::Array(Rc::new(items.iter().map(Self::from).collect()))
            }
            serde_json::Value::Object(map) => {
                Self::object(map.iter().map(|(k, v)| (k.clone(), Self::from(v))))
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::string(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// 数字的字符串形式
///
/// 取最短往返表示的有效数字, 十进制指数不小于 21 或不大于 -7 时使用指数形式.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    // -0 同样输出 0
    if n == 0. {
        return "0".to_string();
    }
    if n < 0. {
        return format!("-{}", number_to_string(-n));
    }
    if n.is_infinite() {
        return "Infinity".to_string();
    }

    let formatted = format!("{n:e}");
    let (mantissa, exponent) = formatted
        .split_once('e')
        .unwrap_or((formatted.as_str(), "0"));
    let digits = mantissa.replace('.', "");
    let len = digits.len() as i32;
    // 小数点相对有效数字首位的位置
    let point = exponent.parse::<i32>().unwrap_or_default() + 1;

    match point {
        p if len <= p && p <= 21 => format!("{digits}{}", "0".repeat((p - len) as usize)),
        p if 0 < p && p <= 21 => {
            let (int, frac) = digits.split_at(p as usize);
            format!("{int}.{frac}")
        }
        p if -6 < p && p <= 0 => format!("0.{}{digits}", "0".repeat(-p as usize)),
        p => {
            let (first, rest) = digits.split_at(1);
            let rest = if rest.is_empty() {
                String::new()
            } else {
                format!(".{rest}")
            };
            let sign = if p > 0 { '+' } else { '-' };
            format!("{first}{rest}e{sign}{}", (p - 1).abs())
        }
    }
}

/// `toFixed` 的字符串形式, 恰好居中时远离零舍入
///
/// 绝对值不小于 1e21 时同 [`number_to_string`].
pub fn number_to_fixed(n: f64, digits: usize) -> String {
    if !n.is_finite() || n.abs() >= 1e21 {
        return number_to_string(n);
    }

    // f64 的精确十进制展开至多 1074 位小数
    let exact = format!("{:.1074}", n.abs());
    let (int, frac) = exact.split_once('.').unwrap_or((exact.as_str(), ""));
    let (kept, dropped) = frac.split_at(digits.min(frac.len()));

    let mut fixed = format!("{int}{kept}").into_bytes();
    if dropped.as_bytes().first().is_some_and(|&d| d >= b'5') {
        let mut carry = true;
        for d in fixed.iter_mut().rev() {
            if *d == b'9' {
                *d = b'0';
            } else {
                *d += 1;
                carry = false;
                break;
            }
        }
        if carry {
            fixed.insert(0, b'1');
        }
    }

    let mut fixed = fixed.into_iter().map(char::from).collect::<String>();
    if digits > 0 {
        fixed.insert(fixed.len() - digits, '.');
    }
    if n < 0. {
        fixed.insert(0, '-');
    }
    fixed
}

/// 以分隔符连接, null / undefined 视为空串
pub fn join(items: &[Value], sep: &str) -> String {
    items
        .iter()
        .map(|item| match item {
            Value::Undefined | Value::Null => String::new(),
            item => item.to_string(),
        })
        .collect::<Vec<_>>()
        .join(sep)
}

fn string_to_number(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() {
        return 0.;
    }
    match s {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        // Rust 接受的 inf / nan 等写法不是合法数字
        s if s.chars().any(|c| c.is_ascii_alphabetic() && !matches!(c, 'e' | 'E')) => f64::NAN,
        s => s.parse().unwrap_or(f64::NAN),
    }
}

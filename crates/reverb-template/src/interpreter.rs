//! 模板解释执行

use std::{mem, rc::Rc, sync::Arc};

use indexmap::IndexMap;

use crate::{
    ast::*,
    builtins,
    error::*,
    scope::Env,
    value::{Closure, Function, Value},
};

/// 函数调用的最大嵌套深度
const MAX_CALL_DEPTH: usize = 50;

/// 语句执行结果
enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

/// 模板解释器
///
/// 每次渲染创建一个, 持有输出缓冲区.
pub struct Interpreter {
    output: String,
    this: Value,
    globals: Env,
    /// 闭包捕获的作用域, 渲染结束后清空
    captured: Vec<Env>,
    depth: usize,
}

impl Interpreter {
    pub fn new(this: Value, globals: Env) -> Self {
        Self {
            output: String::new(),
            this,
            globals,
            captured: Vec::new(),
            depth: 0,
        }
    }

    /// 执行模板主体, 返回输出
    ///
    /// 顶层 return 提前结束渲染.
    pub fn run(mut self, program: &[Stmt], env: &Env) -> Result<String> {
        let result = self.exec_block(program, env);

        env.clear();
        self.globals.clear();
        for env in mem::take(&mut self.captured) {
            env.clear();
        }

        result.map(|_| self.output)
    }

    /// 追加输出
    pub fn write(&mut self, text: &str) {
        self.output.push_str(text);
    }

    // ---------------- statement: begin ----------------

    fn exec_block(&mut self, stmts: &[Stmt], env: &Env) -> Result<Flow> {
        // 函数声明提升
        for stmt in stmts {
            if let Stmt::Function(name, def) = stmt {
                let closure = self.closure(def, env);
                env.declare(name, closure);
            }
        }

        for stmt in stmts {
            match self.exec(stmt, env)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, stmt: &Stmt, env: &Env) -> Result<Flow> {
        match stmt {
            Stmt::Text(text) => self.write(text),
            Stmt::Emit(expr) => {
                let value = self.eval(expr, env)?;
                self.write(&value.to_string());
            }
            Stmt::Declare(kind, declarators) => {
                for (name, init) in declarators {
                    let value = match init {
                        Some(init) => self.eval(init, env)?,
                        None => Value::Undefined,
                    };
                    match kind {
                        // 重复的 var 声明不覆盖已有值
                        DeclKind::Var if init.is_none() && env.get(name).is_some() => {}
                        DeclKind::Var => env.declare_var(name, value),
                        DeclKind::Let => env.declare(name, value),
                        DeclKind::Const => env.declare_const(name, value),
                    }
                }
            }
            Stmt::Function(..) | Stmt::Empty => {}
            Stmt::If(test, consequent, alternate) => {
                if self.eval(test, env)?.is_truthy() {
                    return self.exec(consequent, env);
                } else if let Some(alternate) = alternate {
                    return self.exec(alternate, env);
                }
            }
            Stmt::For {
                init,
                test,
                update,
                body,
            } => {
                let scope = env.block();
                if let Some(init) = init {
                    self.exec(init, &scope)?;
                }

                loop {
                    if let Some(test) = test {
                        if !self.eval(test, &scope)?.is_truthy() {
                            break;
                        }
                    }
                    match self.exec(body, &scope)? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                    if let Some(update) = update {
                        self.eval(update, &scope)?;
                    }
                }
            }
            Stmt::ForOf {
                decl,
                name,
                iterable,
                body,
            } => {
                let items = match self.eval(iterable, env)? {
                    Value::Array(items) => items.to_vec(),
                    Value::String(s) => s.chars().map(|c| Value::string(c.to_string())).collect(),
                    value => {
                        return Err(Error::type_error(format!("{value} is not iterable")));
                    }
                };
                return self.iterate(*decl, name, items, body, env);
            }
            Stmt::ForIn {
                decl,
                name,
                object,
                body,
            } => {
                let keys = match self.eval(object, env)? {
                    Value::Object(map) => map.keys().map(|k| Value::from(k.as_str())).collect(),
                    Value::Array(items) => index_keys(items.len()),
                    Value::String(s) => index_keys(s.chars().count()),
                    _ => Vec::new(),
                };
                return self.iterate(*decl, name, keys, body, env);
            }
            Stmt::While(test, body) => {
                while self.eval(test, env)?.is_truthy() {
                    match self.exec(body, env)? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
            }
            Stmt::Block(stmts) => return self.exec_block(stmts, &env.block()),
            Stmt::Break => return Ok(Flow::Break),
            Stmt::Continue => return Ok(Flow::Continue),
            Stmt::Return(value) => {
                let value = match value {
                    Some(value) => self.eval(value, env)?,
                    None => Value::Undefined,
                };
                return Ok(Flow::Return(value));
            }
            Stmt::Expr(expr) => {
                self.eval(expr, env)?;
            }
        }

        Ok(Flow::Normal)
    }

    /// for-of / for-in 的循环主体
    fn iterate(
        &mut self,
        decl: Option<DeclKind>,
        name: &str,
        items: Vec<Value>,
        body: &Stmt,
        env: &Env,
    ) -> Result<Flow> {
        for item in items {
            let scope = env.block();
            match decl {
                Some(DeclKind::Var) => env.declare_var(name, item),
                Some(DeclKind::Let) => scope.declare(name, item),
                Some(DeclKind::Const) => scope.declare_const(name, item),
                None => self.assign(name, item, env)?,
            }

            match self.exec(body, &scope)? {
                Flow::Break => break,
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Normal | Flow::Continue => {}
            }
        }
        Ok(Flow::Normal)
    }

    // ----------------- statement: end -----------------

    // ---------------- expression: begin ----------------

    fn eval(&mut self, expr: &Expr, env: &Env) -> Result<Value> {
        Ok(match expr {
            Expr::Literal(literal) => match literal {
                Literal::Undefined => Value::Undefined,
                Literal::Null => Value::Null,
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Number(n) => Value::Number(*n),
                Literal::Str(s) => Value::string(s.as_str()),
            },
            Expr::Ident(name) => self.lookup(name, env)?,
            Expr::This => self.this.clone(),
            Expr::Array(items) => {
                let items = items
                    .iter()
                    .map(|item| self.eval(item, env))
                    .collect::<Result<Vec<_>>>()?;
                Value::Array(Rc::new(items))
            }
            Expr::Object(props) => {
                let mut map = IndexMap::with_capacity(props.len());
                for (key, value) in props {
                    map.insert(key.clone(), self.eval(value, env)?);
                }
                Value::Object(Rc::new(map))
            }
            Expr::Member(object, key) => {
                let object = self.eval(object, env)?;
                property(&object, key)?
            }
            Expr::Index(object, index) => {
                let object = self.eval(object, env)?;
                let key = self.eval(index, env)?.to_string();
                property(&object, &key)?
            }
            Expr::Call(callee, args) => self.eval_call(callee, args, env)?,
            Expr::Function(def) => self.closure(def, env),
            // 未声明的标识符同样返回 "undefined"
            Expr::Unary(UnaryOp::TypeOf, operand) => match operand.as_ref() {
                Expr::Ident(name) => Value::from(env.get(name).unwrap_or_default().type_of()),
                operand => Value::from(self.eval(operand, env)?.type_of()),
            },
            Expr::Unary(op, operand) => {
                let value = self.eval(operand, env)?;
                match op {
                    UnaryOp::Not => Value::Bool(!value.is_truthy()),
                    UnaryOp::Neg => Value::Number(-value.to_number()),
                    UnaryOp::Plus => Value::Number(value.to_number()),
                    UnaryOp::TypeOf => Value::from(value.type_of()),
                }
            }
            Expr::Update {
                name,
                delta,
                prefix,
            } => {
                let old = self.lookup(name, env)?.to_number();
                let new = old + delta;
                self.assign(name, Value::Number(new), env)?;
                Value::Number(if *prefix { new } else { old })
            }
            Expr::Binary(op, left, right) => {
                let left = self.eval(left, env)?;
                let right = self.eval(right, env)?;
                binary(*op, &left, &right)
            }
            Expr::Logical(op, left, right) => {
                let left = self.eval(left, env)?;
                match (op, left.is_truthy()) {
                    (LogicalOp::And, true) | (LogicalOp::Or, false) => self.eval(right, env)?,
                    _ => left,
                }
            }
            Expr::Conditional(test, consequent, alternate) => {
                if self.eval(test, env)?.is_truthy() {
                    self.eval(consequent, env)?
                } else {
                    self.eval(alternate, env)?
                }
            }
            Expr::Assign(op, name, value) => {
                let value = match op {
                    None => self.eval(value, env)?,
                    Some(op) => {
                        let current = self.lookup(name, env)?;
                        binary(*op, &current, &self.eval(value, env)?)
                    }
                };
                self.assign(name, value.clone(), env)?;
                value
            }
        })
    }

    fn lookup(&self, name: &str, env: &Env) -> Result<Value> {
        env.get(name)
            .ok_or_else(|| Error::Reference(name.to_string()))
    }

    /// 赋值, 未声明的变量落在全局作用域
    fn assign(&self, name: &str, value: Value, env: &Env) -> Result<()> {
        if !env.assign(name, value.clone())? {
            self.globals.declare(name, value);
        }
        Ok(())
    }

    fn closure(&mut self, def: &Arc<FunctionDef>, env: &Env) -> Value {
        self.captured.push(env.clone());
        Value::Function(Rc::new(Function::Closure(Closure {
            def: def.clone(),
            env: env.clone(),
            this: def.arrow.then(|| self.this.clone()),
        })))
    }

    fn eval_args(&mut self, args: &[Expr], env: &Env) -> Result<Vec<Value>> {
        args.iter().map(|arg| self.eval(arg, env)).collect()
    }

    fn eval_call(&mut self, callee: &Expr, args: &[Expr], env: &Env) -> Result<Value> {
        let (this, key) = match callee {
            Expr::Member(object, key) => (self.eval(object, env)?, key.clone()),
            Expr::Index(object, index) => {
                let object = self.eval(object, env)?;
                (object, self.eval(index, env)?.to_string())
            }
            callee => {
                let function = self.eval(callee, env)?;
                let args = self.eval_args(args, env)?;
                return match function {
                    Value::Function(_) => self.call(&function, Value::Undefined, args),
                    _ => Err(not_a_function(callee)),
                };
            }
        };

        // 方法调用: 对象自身的函数属性优先, 其次为内建方法
        let method = property(&this, &key)?;
        let args = self.eval_args(args, env)?;
        if let Value::Function(_) = method {
            return self.call(&method, this, args);
        }
        builtins::call_method(self, &this, &key, args)?
            .ok_or_else(|| Error::type_error(format!("{key} is not a function")))
    }

    /// 调用函数值
    pub fn call(&mut self, function: &Value, this: Value, args: Vec<Value>) -> Result<Value> {
        let Value::Function(function) = function else {
            return Err(Error::type_error(format!("{function} is not a function")));
        };

        match &**function {
            Function::Native(native) => builtins::call_native(self, *native, args),
            Function::Closure(closure) => {
                if self.depth >= MAX_CALL_DEPTH {
                    return Err(Error::Range("maximum call stack size exceeded".to_string()));
                }

                let scope = closure.env.function();
                let mut args = args.into_iter();
                for param in &closure.def.params {
                    scope.declare(param, args.next().unwrap_or_default());
                }

                let this = closure.this.clone().unwrap_or(this);
                let saved = mem::replace(&mut self.this, this);
                self.depth += 1;
                let result = match &closure.def.body {
                    FunctionBody::Block(stmts) => {
                        self.exec_block(stmts, &scope).map(|flow| match flow {
                            Flow::Return(value) => value,
                            _ => Value::Undefined,
                        })
                    }
                    FunctionBody::Expr(expr) => self.eval(expr, &scope),
                };
                self.depth -= 1;
                self.this = saved;
                result
            }
        }
    }

    // ----------------- expression: end -----------------
}

/// 读取属性, null / undefined 上读取属性为类型错误
fn property(object: &Value, key: &str) -> Result<Value> {
    if object.is_nullish() {
        return Err(Error::type_error(format!(
            "cannot read properties of {object} (reading '{key}')"
        )));
    }
    Ok(object.get(key))
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    use std::cmp::Ordering::*;

    match op {
        BinaryOp::Add => left.add(right),
        BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
        BinaryOp::Rem => Value::Number(left.to_number() % right.to_number()),
        BinaryOp::Eq => Value::Bool(left.loose_equals(right)),
        BinaryOp::NotEq => Value::Bool(!left.loose_equals(right)),
        BinaryOp::StrictEq => Value::Bool(left.strict_equals(right)),
        BinaryOp::StrictNotEq => Value::Bool(!left.strict_equals(right)),
        BinaryOp::Lt => Value::Bool(left.compare(right) == Some(Less)),
        BinaryOp::Le => Value::Bool(matches!(left.compare(right), Some(Less | Equal))),
        BinaryOp::Gt => Value::Bool(left.compare(right) == Some(Greater)),
        BinaryOp::Ge => Value::Bool(matches!(left.compare(right), Some(Greater | Equal))),
    }
}

fn index_keys(len: usize) -> Vec<Value> {
    (0..len).map(|i| Value::string(i.to_string())).collect()
}

fn not_a_function(callee: &Expr) -> Error {
    let name = match callee {
        Expr::Ident(name) => name.as_str(),
        _ => "expression",
    };
    Error::type_error(format!("{name} is not a function"))
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::{parser::parse, segment::split, settings::TemplateSettings};

    fn run(template: &str, globals: &Env) -> Result<String> {
        let program = parse(&split(template, &TemplateSettings::default()))?;
        Interpreter::new(Value::Undefined, globals.clone()).run(&program, &globals.function())
    }

    #[test]
    fn test_release_scopes() {
        let items = Rc::new(vec![Value::from(1.)]);
        let weak = Rc::downgrade(&items);

        let globals = Env::root();
        globals.declare("items", Value::Array(items));
        // 内层函数保存在其捕获的作用域中
        let template = "<% $.each([0], function () { var held = items; var inner = function () { return held }; }) %>\
                        <% function outer() { var held = items; var g = () => held; return g } outer() %>";
        globals.declare(
            "$",
            Value::object([("each".to_string(), Value::native(crate::value::Native::JqueryEach))]),
        );

        assert_eq!(run(template, &globals).unwrap(), "");
        drop(globals);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_call_depth() {
        let globals = Env::root();
        let error = run("<% function f(n) { return f(n + 1) } f(0) %>", &globals).unwrap_err();
        assert!(matches!(error, Error::Range(_)));

        // 未超过上限的递归正常返回
        let result = run(
            "<% function sum(n) { return n ? n + sum(n - 1) : 0 } %><%= sum(30) %>",
            &Env::root(),
        );
        assert_eq!(result.unwrap(), "465");
    }
}

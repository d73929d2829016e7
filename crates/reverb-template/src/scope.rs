//! 作用域链

use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
    mem,
    rc::Rc,
};

use crate::{error::*, value::Value};

/// 作用域
///
/// 以引用计数共享, 闭包持有定义处的作用域.
#[derive(Clone)]
pub struct Env(Rc<RefCell<Scope>>);

struct Scope {
    vars: HashMap<String, Value>,
    /// const 声明的变量
    consts: HashSet<String>,
    parent: Option<Env>,
    /// 函数作用域, var 声明落在最近的函数作用域
    function: bool,
}

impl Env {
    pub fn root() -> Self {
        Self::new(None, true)
    }

    fn new(parent: Option<Env>, function: bool) -> Self {
        Self(Rc::new(RefCell::new(Scope {
            vars: HashMap::new(),
            consts: HashSet::new(),
            parent,
            function,
        })))
    }

    /// 创建块作用域
    pub fn block(&self) -> Self {
        Self::new(Some(self.clone()), false)
    }

    /// 创建函数作用域
    pub fn function(&self) -> Self {
        Self::new(Some(self.clone()), true)
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        let scope = self.0.borrow();
        match scope.vars.get(name) {
            Some(value) => Some(value.clone()),
            None => scope.parent.as_ref()?.get(name),
        }
    }

    /// 在当前作用域声明变量
    pub fn declare(&self, name: &str, value: Value) {
        let mut scope = self.0.borrow_mut();
        scope.consts.remove(name);
        scope.vars.insert(name.to_string(), value);
    }

    /// 在当前作用域声明常量
    pub fn declare_const(&self, name: &str, value: Value) {
        let mut scope = self.0.borrow_mut();
        scope.consts.insert(name.to_string());
        scope.vars.insert(name.to_string(), value);
    }

    /// 在最近的函数作用域声明变量
    pub fn declare_var(&self, name: &str, value: Value) {
        let parent = {
            let scope = self.0.borrow();
            if scope.function {
                None
            } else {
                scope.parent.clone()
            }
        };

        match parent {
            Some(parent) => parent.declare_var(name, value),
            None => self.declare(name, value),
        }
    }

    /// 为已声明的变量赋值, 未声明时返回 false
    pub fn assign(&self, name: &str, value: Value) -> Result<bool> {
        let parent = {
            let mut scope = self.0.borrow_mut();
            if scope.consts.contains(name) {
                return Err(Error::type_error(format!(
                    "assignment to constant variable '{name}'"
                )));
            }
            if let Some(slot) = scope.vars.get_mut(name) {
                *slot = value;
                return Ok(true);
            }
            scope.parent.clone()
        };

        match parent {
            Some(parent) => parent.assign(name, value),
            None => Ok(false),
        }
    }

    /// 清空当前作用域及其全部外层作用域
    ///
    /// 闭包持有定义处的作用域, 渲染结束后以此断开循环引用.
    pub fn clear(&self) {
        let (vars, parent) = {
            let mut scope = self.0.borrow_mut();
            scope.consts.clear();
            (mem::take(&mut scope.vars), scope.parent.clone())
        };
        // 释放变量时不持有借用
        drop(vars);

        if let Some(parent) = parent {
            parent.clear();
        }
    }
}

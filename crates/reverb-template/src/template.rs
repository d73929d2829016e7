//! 编译后的模板

use log::debug;

use crate::{
    ast::Stmt,
    error::*,
    interpreter::Interpreter,
    parser::parse,
    scope::Env,
    segment::split,
    settings::TemplateSettings,
    source::generate,
    value::{Native, Value},
};

/// 编译后的模板
///
/// 编译后不可变, 可重复渲染, 也可在线程间共享.
#[derive(Debug, Clone)]
pub struct Template {
    program: Vec<Stmt>,
    variable: Option<String>,
    source: String,
}

impl Template {
    pub fn new(template: &str, settings: &TemplateSettings) -> Result<Self> {
        let segments = split(template, settings);
        let program = parse(&segments)?;
        let source = generate(&segments, settings.variable.as_deref());
        debug!(
            "compiled template: {} segments, {} statements",
            segments.len(),
            program.len()
        );

        Ok(Self {
            program,
            variable: settings.variable.clone(),
            source,
        })
    }

    /// 生成的函数源码, 仅供查看
    pub fn source(&self) -> &str {
        &self.source
    }

    /// 以数据上下文渲染, this 为 undefined
    pub fn render(&self, data: &serde_json::Value) -> Result<String> {
        self.run(Value::Undefined, data)
    }

    /// 以数据上下文渲染, 模板顶层的 this 绑定为 receiver
    pub fn render_with_receiver(
        &self,
        receiver: &serde_json::Value,
        data: &serde_json::Value,
    ) -> Result<String> {
        self.run(Value::from(receiver), data)
    }

    fn run(&self, this: Value, data: &serde_json::Value) -> Result<String> {
        let data = match data {
            serde_json::Value::Null => Value::object([]),
            data => Value::from(data),
        };

        let globals = Env::root();
        globals.declare("print", Value::native(Native::Print));
        globals.declare(
            "$",
            Value::object([("each".to_string(), Value::native(Native::JqueryEach))]),
        );
        globals.declare(
            "_",
            Value::object([("each".to_string(), Value::native(Native::UnderscoreEach))]),
        );
        globals.declare("String", Value::native(Native::String));
        globals.declare("Number", Value::native(Native::Number));

        // 未设置变量名时, 上下文的键位于模板作用域之外的一层
        let context = match &self.variable {
            Some(name) => {
                globals.declare(name, data);
                globals.clone()
            }
            None => {
                globals.declare("obj", data.clone());
                let context = globals.block();
                if let Value::Object(map) = &data {
                    for (key, value) in map.iter() {
                        context.declare(key, value.clone());
                    }
                }
                context
            }
        };

        Interpreter::new(this, globals).run(&self.program, &context.function())
    }
}

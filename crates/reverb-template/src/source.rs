//! 生成源码
//!
//! 仅供预编译工具参考, 不会被再次解析.

use crate::segment::{Segment, SegmentKind};

const PRELUDE: &str =
    "var __p='';var print=function(){__p+=Array.prototype.join.call(arguments, '')};\n";

/// 生成模板对应的函数源码
pub fn generate(segments: &[Segment], variable: Option<&str>) -> String {
    let mut body = String::from("__p+='");

    for seg in segments {
        match seg.kind {
            SegmentKind::Text => body.push_str(&seg.content),
            SegmentKind::Interpolate => {
                body.push_str("'+\n(");
                body.push_str(&seg.content);
                body.push_str(")+\n'");
            }
            SegmentKind::Evaluate => {
                body.push_str("';\n");
                body.push_str(&seg.content);
                body.push_str("\n;__p+='");
            }
        }
    }
    body.push_str("';\n");

    // 未指定变量名时, 上下文置于局部作用域
    if variable.is_none() {
        body = format!("with(obj||{{}}){{\n{body}}}\n");
    }

    format!(
        "function({}){{\n{PRELUDE}{body}return __p;\n}}",
        variable.unwrap_or("obj")
    )
}

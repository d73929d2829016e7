//! 命令行辅助工具

use std::fmt::Display;

#[macro_export]
macro_rules! flush {
    () => {{
        use std::io::{Write, stderr, stdout};

        let _ = stdout().flush();
        let _ = stderr().flush();
    }};
}

/// 展示错误
///
/// 标准输出用于结果, 错误写入标准错误.
pub fn try_show_errors<E: Display>(errs: &[E]) {
    if errs.is_empty() {
        eprintln!("no error.");
    } else {
        eprintln!("{} errors: ", errs.len());

        for (k, err) in errs.iter().enumerate() {
            eprintln!("{}. {}.", k + 1, err);
        }
    }

    flush!()
}

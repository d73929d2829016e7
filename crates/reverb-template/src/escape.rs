//! 字符串字面量转义
//!
//! 模板文本在编译时被整体转义, 以便嵌入生成源码的单引号字面量中.
//! 代码片段中的内容随后经由 unescape 还原.

use std::{borrow::Cow, sync::LazyLock};

use regex::{Captures, Regex};

/// 转义表: (字符, 转义码)
const ESCAPES: [(&str, &str); 7] = [
    ("\\", "\\"),
    ("'", "'"),
    ("\r", "r"),
    ("\n", "n"),
    ("\t", "t"),
    ("\u{2028}", "u2028"),
    ("\u{2029}", "u2029"),
];

static ESCAPER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\|'|\r|\n|\t|\x{2028}|\x{2029}").unwrap());

static UNESCAPER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\(\\|'|r|n|t|u2028|u2029)").unwrap());

/// 转义无法直接置于字符串字面量中的字符
pub fn escape(text: &str) -> Cow<'_, str> {
    ESCAPER.replace_all(text, |caps: &Captures| {
        let code = ESCAPES
            .iter()
            .find(|(c, _)| *c == &caps[0])
            .map_or("", |(_, code)| *code);
        format!("\\{code}")
    })
}

/// 还原 escape 产生的转义序列
pub fn unescape(text: &str) -> Cow<'_, str> {
    UNESCAPER.replace_all(text, |caps: &Captures| {
        ESCAPES
            .iter()
            .find(|(_, code)| *code == &caps[1])
            .map_or("", |(c, _)| *c)
            .to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_table() {
        assert_eq!(escape("it's"), "it\\'s");
        assert_eq!(escape("a\\b"), "a\\\\b");
        assert_eq!(escape("\r\n\t"), "\\r\\n\\t");
        assert_eq!(escape("\u{2028}\u{2029}"), "\\u2028\\u2029");
        assert!(matches!(escape("plain text"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_unescape_reverses_escape() {
        for text in [
            "",
            "no specials",
            "quote ' and backslash \\",
            "literal \\n is not a newline",
            "mixed\r\n\ttabs\u{2028}\u{2029}",
            "\\\\'\\'",
        ] {
            assert_eq!(unescape(&escape(text)), text);
        }
    }
}

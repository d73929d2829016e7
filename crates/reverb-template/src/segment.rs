//! 模板片段切分

use std::borrow::Cow;

use regex::Regex;

use crate::{
    escape::{escape, unescape},
    settings::TemplateSettings,
};

/// 片段类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// 文本
    Text,
    /// 插值 `<%= ... %>`
    Interpolate,
    /// 求值 `<% ... %>`
    Evaluate,
}

/// 模板片段
///
/// 文本片段保存转义后的内容, 代码片段保存还原后的代码.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub content: String,
    /// 片段起始行号 (从 1 开始)
    pub line: usize,
}

impl Segment {
    /// 文本片段的原始内容
    pub fn text(&self) -> Cow<'_, str> {
        unescape(&self.content)
    }
}

/// 切分模板串
///
/// 先整体转义, 再取出全部插值片段, 最后在插值片段之间的区间内取出求值片段.
/// 因此插值片段总是优先于与其重叠的求值片段.
pub fn split(template: &str, settings: &TemplateSettings) -> Vec<Segment> {
    let escaped = escape(template);
    let mut splitter = Splitter {
        segments: Vec::new(),
        line: 1,
    };

    let mut pos = 0;
    for caps in settings.interpolate.captures_iter(&escaped) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.as_str().is_empty() {
            continue;
        }

        splitter.gap(&escaped[pos..whole.start()], &settings.evaluate);
        splitter.code(
            SegmentKind::Interpolate,
            whole.as_str(),
            caps.get(1).map_or("", |m| m.as_str()),
        );
        pos = whole.end();
    }
    splitter.gap(&escaped[pos..], &settings.evaluate);

    splitter.segments
}

struct Splitter {
    segments: Vec<Segment>,
    line: usize,
}

impl Splitter {
    /// 处理插值片段之间的区间
    fn gap(&mut self, gap: &str, evaluate: &Regex) {
        let mut pos = 0;
        for caps in evaluate.captures_iter(gap) {
            let Some(whole) = caps.get(0) else { continue };
            if whole.as_str().is_empty() {
                continue;
            }

            self.text(&gap[pos..whole.start()]);
            self.code(
                SegmentKind::Evaluate,
                whole.as_str(),
                caps.get(1).map_or("", |m| m.as_str()),
            );
            pos = whole.end();
        }
        self.text(&gap[pos..]);
    }

    fn text(&mut self, escaped: &str) {
        if escaped.is_empty() {
            return;
        }

        // 相邻文本合并为一个片段
        match self.segments.last_mut() {
            Some(last) if last.kind == SegmentKind::Text => last.content.push_str(escaped),
            _ => self.segments.push(Segment {
                kind: SegmentKind::Text,
                content: escaped.to_string(),
                line: self.line,
            }),
        }
        self.advance(escaped);
    }

    fn code(&mut self, kind: SegmentKind, whole: &str, code: &str) {
        self.segments.push(Segment {
            kind,
            content: unescape(code).into_owned(),
            line: self.line,
        });
        self.advance(whole);
    }

    fn advance(&mut self, escaped: &str) {
        self.line += unescape(escaped).matches('\n').count();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(template: &str) -> Vec<(SegmentKind, String)> {
        split(template, &TemplateSettings::default())
            .into_iter()
            .map(|seg| (seg.kind, seg.content))
            .collect()
    }

    #[test]
    fn test_split_kinds() {
        use SegmentKind::*;

        assert_eq!(
            kinds("a<%= b %>c<% d %>e"),
            vec![
                (Text, "a".to_string()),
                (Interpolate, " b ".to_string()),
                (Text, "c".to_string()),
                (Evaluate, " d ".to_string()),
                (Text, "e".to_string()),
            ]
        );
        assert!(kinds("").is_empty());
        assert_eq!(kinds("<%%>"), vec![(Text, "<%%>".to_string())]);
    }

    #[test]
    fn test_interpolate_wins_overlap() {
        use SegmentKind::*;

        assert_eq!(
            kinds("<%= <% %> %>"),
            vec![(Interpolate, " <% ".to_string()), (Text, " %>".to_string())]
        );
        assert_eq!(
            kinds("<% x <%= y %>"),
            vec![(Text, "<% x ".to_string()), (Interpolate, " y ".to_string())]
        );
    }

    #[test]
    fn test_code_is_unescaped() {
        let segs = split("it's <%= 'a\\b' %>\n", &TemplateSettings::default());

        assert_eq!(segs[0].content, "it\\'s ");
        assert_eq!(segs[0].text(), "it's ");
        assert_eq!(segs[1].content, " 'a\\b' ");
        assert_eq!(segs[2].content, "\\n");
    }

    #[test]
    fn test_line_numbers() {
        let segs = split("a\nb<% x\ny %>\n<%= z %>", &TemplateSettings::default());
        let lines: Vec<_> = segs.iter().map(|seg| seg.line).collect();

        assert_eq!(lines, vec![1, 2, 3, 4]);
    }
}

//! 测试模板编译与渲染

use std::thread;

use reverb_template::*;
use serde_json::{Value, json};

fn test_compare(template: &str, expect: &str, data: Value) {
    let result = render(template, &data, &TemplateSettings::default());
    assert_eq!(result.unwrap(), expect);
}

fn test_error(template: &str, data: Value) -> Error {
    let template = compile(template, &TemplateSettings::default()).unwrap();
    template.render(&data).unwrap_err()
}

//////////////// test ////////////////

#[test]
fn test_literal() {
    let test = |template| test_compare(template, template, json!({"a": 1}));

    test("");
    test("hello world");
    test("<div class='x'>\"quoted\"</div>");
    test("% > < %= %");
    test("line\r\nbreak\ttab \\ back\\slash \u{2028}\u{2029}");
}

#[test]
fn test_interpolate() {
    test_compare("Hi <%= name %>!", "Hi Ann!", json!({"name": "Ann"}));
    test_compare("<%= a %>,<%= b %>", "1,1.5", json!({"a": 1, "b": 1.5}));
    test_compare("<%= ok %> <%= nothing %>", "true null", json!({"ok": true, "nothing": null}));
    test_compare("<%= list %>|<%= obj %>", "1,,x|[object Object]", json!({"list": [1, null, "x"], "obj": {}}));
    test_compare("<%= 'it\\'s' + \" \" + 1 + 2 %>", "it's 12", json!({}));
    test_compare("<%= 1 + 2 * 3 %> <%= (1 + 2) * 3 %>", "7 9", json!({}));
    test_compare("<%= a.b[0].c %>", "deep", json!({"a": {"b": [{"c": "deep"}]}}));
    test_compare("<%= a.missing %>", "undefined", json!({"a": {}}));
}

#[test]
fn test_evaluate() {
    test_compare("[<% for (var i = 0; i < 3; i++) { print('x'); } %>]", "[xxx]", json!({}));
    test_compare("<% for (var i = 0; i < n; i++) { %>x<% } %>", "xxxxx", json!({"n": 5}));
    test_compare("<% print('a', null, 1, undefined) %>", "a1", json!({}));
    test_compare(
        "<% if (admin) { %>admin<% } else { %>guest<% } %>",
        "guest",
        json!({"admin": false}),
    );
    test_compare(
        "<% var total = 0; for (const n of nums) total += n; %><%= total %>",
        "6",
        json!({"nums": [1, 2, 3]}),
    );
    test_compare(
        "<% for (var k in o) { %><%= k %>=<%= o[k] %>;<% } %>",
        "b=1;a=2;",
        json!({"o": {"b": 1, "a": 2}}),
    );
    test_compare(
        "<% var i = 0; while (true) { if (++i > 2) break; %><%= i %><% } %>",
        "12",
        json!({}),
    );
}

#[test]
fn test_each() {
    test_compare(
        "<ul><% $.each(items, function (index, item) { %><li><%= index %>:<%= item %></li><% }) %></ul>",
        "<ul><li>0:a</li><li>1:b</li></ul>",
        json!({"items": ["a", "b"]}),
    );
    test_compare(
        "<% $.each(items, function (i, item) { if (i > 0) return false; print(this) }) %>",
        "a",
        json!({"items": ["a", "b"]}),
    );
    test_compare(
        "<% _.each(prices, function (price, key) { %><%= key %>:<%= price %> <% }) %>",
        "min:1 max:9 ",
        json!({"prices": {"min": 1, "max": 9}}),
    );
    test_compare(
        "<%= items.map(x => x.toUpperCase()).join('-') %>",
        "A-B",
        json!({"items": ["a", "b"]}),
    );
}

#[test]
fn test_functions() {
    test_compare(
        "<% function twice(s) { return s + s } %><%= twice(word) %>",
        "abab",
        json!({"word": "ab"}),
    );
    test_compare(
        "<% var add = (a, b) => { return a + b }; %><%= add(1, 2) %>",
        "3",
        json!({}),
    );
    test_compare(
        "<%= price.toFixed(2) %> <%= title.slice(0, 3) %> <%= String(1) + Number('2') %>",
        "9.50 Str 12",
        json!({"price": 9.5, "title": "Strat"}),
    );
}

#[test]
fn test_escape() {
    test_compare("it's \\ \"x\"\n<%= name %>", "it's \\ \"x\"\nAnn", json!({"name": "Ann"}));
    test_compare("<%= 'a\\nb' %>", "a\nb", json!({}));
    test_compare("<%= a\n+\nb %>", "3", json!({"a": 1, "b": 2}));
    test_compare("<% print('\\'') %>", "'", json!({}));
}

#[test]
fn test_variable() {
    let settings = TemplateSettings::default().variable("ctx");
    let data = json!({"name": "Bo"});

    let named = compile("<%= ctx.name %>", &settings).unwrap();
    assert_eq!(named.render(&data).unwrap(), "Bo");
    test_compare("<%= name %>", "Bo", data.clone());

    // 绑定变量名后, 上下文的键不再可见
    let bare = compile("<%= name %>", &settings).unwrap();
    assert!(matches!(bare.render(&data), Err(Error::Reference(name)) if name == "name"));
}

#[test]
fn test_scope() {
    test_compare("<%= obj.name %>", "Ann", json!({"name": "Ann"}));
    test_compare("<% var name = 'local' %><%= name %>", "local", json!({"name": "Ann"}));
    test_compare("<%= typeof missing %>", "undefined", json!({}));
    test_compare("x<%= obj.a %>", "xundefined", Value::Null);
}

#[test]
fn test_receiver() {
    let template = compile("<%= this.label %>", &TemplateSettings::default()).unwrap();

    assert_eq!(
        template
            .render_with_receiver(&json!({"label": "recv"}), &json!({}))
            .unwrap(),
        "recv"
    );
    assert!(matches!(template.render(&json!({})), Err(Error::Type(_))));
}

#[test]
fn test_idempotent() {
    let text = "<% for (var i = 0; i < n; i++) { %><%= i %>,<% } %><%= label %>";
    let data = json!({"n": 4, "label": "end"});

    let first = compile(text, &TemplateSettings::default()).unwrap();
    let second = compile(text, &TemplateSettings::default()).unwrap();
    assert_eq!(first.source(), second.source());

    let expect = first.render(&data).unwrap();
    assert_eq!(expect, "0,1,2,3,end");
    for _ in 0..3 {
        assert_eq!(first.render(&data).unwrap(), expect);
        assert_eq!(second.render(&data).unwrap(), expect);
    }
}

#[test]
fn test_send_sync() {
    let template = compile("<%= n * 2 %>", &TemplateSettings::default()).unwrap();

    thread::scope(|s| {
        let handles = (0..4)
            .map(|n| {
                let template = &template;
                s.spawn(move || template.render(&json!({"n": n})).unwrap())
            })
            .collect::<Vec<_>>();
        let results = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(results, ["0", "2", "4", "6"]);
    });
}

#[test]
fn test_custom_delimiters() {
    let settings = TemplateSettings::new(r"\{\{([\s\S]+?)\}\}", r"\{\{=([\s\S]+?)\}\}").unwrap();

    assert_eq!(
        render("{{ var x = 2 }}{{= x * n }} <%= n %>", &json!({"n": 3}), &settings).unwrap(),
        "6 <%= n %>"
    );
    assert!(matches!(TemplateSettings::new("(", "x"), Err(Error::Regex(_))));
}

#[test]
fn test_overlapping_markers() {
    // 插值片段优先, 余下的 ` %>` 为文本
    test_compare("<%= '<%' %>%>", "<%%>", json!({}));
    test_compare("<% x <%= y %>", "<% x 1", json!({"y": 1}));
    assert!(matches!(
        compile("<%= <% %> %>", &TemplateSettings::default()),
        Err(Error::Syntax { .. })
    ));
}

#[test]
fn test_source() {
    let template = compile("Hi <%= name %>", &TemplateSettings::default()).unwrap();

    assert!(template.source().starts_with("function(obj){\nvar __p='';"));
    assert!(template.source().contains("with(obj||{}){\n__p+='Hi '+\n( name )+\n'';\n}"));
    assert!(template.source().ends_with("return __p;\n}"));
}

#[test]
fn test_numbers() {
    test_compare(
        "<%= 1e-7 %> <%= 1e21 %> <%= 1.5e300 %> <%= 0.000001 %> <%= 1 / 3 %>",
        "1e-7 1e+21 1.5e+300 0.000001 0.3333333333333333",
        json!({}),
    );
    test_compare(
        "<%= [(2.5).toFixed(0), (0.125).toFixed(2), (-2.5).toFixed(0), (1e21).toFixed(2)] %>",
        "3,0.13,-3,1e+21",
        json!({}),
    );
    assert!(matches!(test_error("<%= (1).toFixed(101) %>", json!({})), Error::Range(_)));
}

#[test]
fn test_recursion() {
    test_compare(
        "<% function fact(n) { return n > 1 ? n * fact(n - 1) : 1 } %><%= fact(10) %>",
        "3628800",
        json!({}),
    );

    // 无限递归返回错误而非栈溢出
    let error = test_error("<% function f(n) { return f(n + 1) } f(0) %>", json!({}));
    assert!(matches!(error, Error::Range(_)));
}

#[test]
fn test_const() {
    test_compare("<% const x = 1; { let x = 2 } %><%= x %>", "1", json!({}));

    assert!(matches!(test_error("<% const x = 1; x = 2 %>", json!({})), Error::Type(_)));
    assert!(matches!(test_error("<% const x = 1; x++ %>", json!({})), Error::Type(_)));
    assert!(matches!(
        test_error("<% for (const n of [1, 2]) { n += 1 } %>", json!({})),
        Error::Type(_)
    ));
}

#[test]
fn test_errors() {
    assert!(matches!(test_error("<%= missing %>", json!({})), Error::Reference(name) if name == "missing"));
    assert!(matches!(test_error("<%= a.b.c %>", json!({"a": {}})), Error::Type(_)));
    assert!(matches!(test_error("<% name() %>", json!({"name": "x"})), Error::Type(_)));
    assert!(matches!(test_error("<% [1].nope() %>", json!({})), Error::Type(_)));

    let settings = TemplateSettings::default();
    assert!(matches!(
        compile("a\n<% if (x) { %>", &settings),
        Err(Error::Syntax { line: 2, .. })
    ));
    assert!(matches!(compile("<%= a + %>", &settings), Err(Error::Syntax { .. })));
    assert!(matches!(compile("<% } %>", &settings), Err(Error::Syntax { .. })));
}

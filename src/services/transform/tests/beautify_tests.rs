use super::*;

fn pad_to_minified(body: &str) -> String {
    // One long line so the heuristic trips.
    format!("{body}/*{}*/", "x".repeat(MINIFIED_LINE_LEN))
}

#[test]
fn test_looks_minified() {
    assert!(!looks_minified(""));
    assert!(!looks_minified("body {\n  color: red;\n}\n"));
    assert!(looks_minified(&"a{b:c}".repeat(60)));
    // Many short lines, one very long one
    let mixed = format!("x\ny\n{}\n", "z".repeat(MINIFIED_LINE_LEN + 1));
    assert!(looks_minified(&mixed));
}

#[test]
fn test_readable_code_passes_through() {
    let src = "function a() {\r\n  return 1;\r\n}\r\n";
    assert_eq!(beautify(CodeKind::Js, src), "function a() {\n  return 1;\n}\n");
}

#[test]
fn test_css_rules_split_and_indented() {
    let out = beautify_css("a{color:red;margin:0}b,i{padding:1px}");
    assert_eq!(out, "a {\n  color:red;\n  margin:0\n}\nb,i {\n  padding:1px\n}\n");
}

#[test]
fn test_css_keeps_strings_and_data_urls_intact() {
    let out = beautify_css(r#"a{content:"x;{y}";background:url(data:image/png;base64,AAA)}"#);
    assert!(out.contains(r#"content:"x;{y}";"#));
    assert!(out.contains("url(data:image/png;base64,AAA)"));
}

#[test]
fn test_css_nested_at_rule() {
    let out = beautify_css("@media (max-width:600px){a{color:red}}");
    assert_eq!(
        out,
        "@media (max-width:600px) {\n  a {\n    color:red\n  }\n}\n"
    );
}

#[test]
fn test_js_statements_and_blocks() {
    let out = beautify_js("function f(a){if(a){return 1;}return 2;}f(1);");
    assert_eq!(
        out,
        "function f(a) {\n  if(a) {\n    return 1;\n  }\n  return 2;\n}\nf(1);\n"
    );
}

#[test]
fn test_js_for_header_not_split() {
    let out = beautify_js("for(var i=0;i<3;i++){x();}");
    assert!(out.starts_with("for(var i=0;i<3;i++) {\n"));
}

#[test]
fn test_js_literals_untouched() {
    let src = r#"var s="a;{b}";var t='c}';var u=`d;${1}`;var r=/[;{]+/g;"#;
    let out = beautify_js(src);
    assert!(out.contains(r#"var s="a;{b}";"#));
    assert!(out.contains("var t='c}';"));
    assert!(out.contains("var u=`d;${1}`;"));
    assert!(out.contains("var r=/[;{]+/g;"));
}

#[test]
fn test_js_regex_after_return() {
    let out = beautify_js("function f(){return /a;b/.test(x);}");
    assert!(out.contains("return /a;b/.test(x);"));
}

#[test]
fn test_js_line_comment_ends_line() {
    let out = beautify_js("a();// note; {x}\nb();");
    assert_eq!(out, "a();\n// note; {x}\nb();\n");
}

#[test]
fn test_js_keeps_source_line_breaks() {
    // No semicolons: the newline is significant
    let out = beautify_js("let a = 1\nlet b = 2");
    assert_eq!(out, "let a = 1\nlet b = 2\n");
}

#[test]
fn test_js_callback_closing_stays_attached() {
    let out = beautify_js("run(function(){go();});");
    assert!(out.contains("})"), "{out}");
    assert!(out.trim_end().ends_with("});"), "{out}");
}

#[test]
fn test_html_nesting_indented() {
    let out = beautify_html("<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>T</title></head><body><div><p>Hi  there</p><br></div></body></html>");
    let expected = "\
<!DOCTYPE html>
<html>
  <head>
    <meta charset=\"utf-8\">
    <title>
      T
    </title>
  </head>
  <body>
    <div>
      <p>
        Hi there
      </p>
      <br>
    </div>
  </body>
</html>
";
    assert_eq!(out, expected);
}

#[test]
fn test_html_raw_text_elements_verbatim() {
    let script = "if(a<b){x()}\n  var s='</div>';";
    let src = format!(
        "<body><script>{script}</script><pre>  keep   this\n spacing</pre><STYLE>a{{b:c}}</STYLE></body>"
    );
    let out = beautify_html(&src);
    assert!(out.contains(&format!("<script>{script}</script>")));
    assert!(out.contains("<pre>  keep   this\n spacing</pre>"));
    assert!(out.contains("<STYLE>a{b:c}</STYLE>"));
}

#[test]
fn test_html_attribute_with_angle_bracket() {
    let out = beautify_html(r#"<div data-x="a>b"><span>t</span></div>"#);
    assert!(out.starts_with("<div data-x=\"a>b\">\n  <span>\n"));
}

#[test]
fn test_html_comment_preserved() {
    let out = beautify_html("<div><!-- a <b> c --></div>");
    assert!(out.contains("  <!-- a <b> c -->\n"));
}

#[test]
fn test_beautify_dispatches_minified_content() {
    let css = pad_to_minified("a{color:red}");
    let out = beautify(CodeKind::Css, &css);
    assert!(out.starts_with("a {\n  color:red\n}\n"));
}

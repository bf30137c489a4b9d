//! Re-serialization of arbitrary HTML as well-formed XHTML.
//!
//! E-book readers reject the tag soup article bodies usually contain, so
//! fragments are parsed with an HTML5 parser and written back out with
//! every element closed, attributes quoted and text escaped. Elements that
//! cannot work in a static e-book (scripts, frames, forms) are dropped with
//! their content.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node};

static XML_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.-]*$").expect("valid xml name regex"));

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr",
];

const DROPPED_ELEMENTS: &[&str] = &[
    "script", "noscript", "style", "iframe", "object", "embed", "form", "input", "button", "select", "textarea",
    "svg", "math", "template", "canvas", "video", "audio",
];

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{0}'..='\u{8}' | '\u{b}' | '\u{c}' | '\u{e}'..='\u{1f}' => {}
            _ => out.push(c),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\n' => out.push_str("&#10;"),
            '\u{0}'..='\u{8}' | '\u{b}' | '\u{c}' | '\u{e}'..='\u{1f}' => {}
            _ => out.push(c),
        }
    }
}

/// Serializes an HTML fragment as XHTML.
///
/// `rewrite_src` is called for every `img` source and may return a
/// replacement (used to swap inline data for packaged files).
pub fn fragment_to_xhtml(html: &str, rewrite_src: &mut dyn FnMut(&str) -> Option<String>) -> String {
    let fragment = Html::parse_fragment(html);
    let mut out = String::with_capacity(html.len());
    write_children(fragment.root_element(), rewrite_src, &mut out);
    out
}

fn write_children(element: ElementRef<'_>, rewrite_src: &mut dyn FnMut(&str) -> Option<String>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => escape_text(text, out),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    write_element(child, rewrite_src, out);
                }
            }
            _ => {}
        }
    }
}

fn write_element(element: ElementRef<'_>, rewrite_src: &mut dyn FnMut(&str) -> Option<String>, out: &mut String) {
    let name = element.value().name().to_ascii_lowercase();

    if DROPPED_ELEMENTS.contains(&name.as_str()) {
        return;
    }
    if !XML_NAME.is_match(&name) {
        write_children(element, rewrite_src, out);
        return;
    }

    out.push('<');
    out.push_str(&name);
    for (attr, value) in element.value().attrs() {
        let attr = attr.to_ascii_lowercase();
        if !XML_NAME.is_match(&attr) || attr.starts_with("on") || attr == "xmlns" {
            continue;
        }
        if name == "img" && attr == "srcset" {
            continue;
        }

        let value = if name == "img" && attr == "src" {
            rewrite_src(value).unwrap_or_else(|| value.to_string())
        } else {
            value.to_string()
        };

        out.push(' ');
        out.push_str(&attr);
        out.push_str("=\"");
        escape_attr(&value, out);
        out.push('"');
    }

    if name == "img" && element.value().attr("alt").is_none() {
        out.push_str(" alt=\"\"");
    }

    if VOID_ELEMENTS.contains(&name.as_str()) {
        out.push_str("/>");
        return;
    }

    out.push('>');
    write_children(element, rewrite_src, out);
    out.push_str("</");
    out.push_str(&name);
    out.push('>');
}

/// Wraps an XHTML body in a complete EPUB content document.
pub fn xhtml_document(title: &str, body: &str, stylesheet: Option<&str>) -> String {
    let mut escaped_title = String::new();
    escape_text(title, &mut escaped_title);

    let link = stylesheet
        .map(|href| format!("\n    <link rel=\"stylesheet\" type=\"text/css\" href=\"{}\"/>", href))
        .unwrap_or_default();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" lang="en" xml:lang="en">
<head>
    <meta charset="UTF-8"/>
    <title>{escaped_title}</title>{link}
</head>
<body>
{body}
</body>
</html>
"#
    )
}

//! Regex rewriting of the HTML shell's `<head>`.
//!
//! Each managed tag is matched inside the head whatever its attribute order,
//! replaced with a freshly rendered tag, or inserted before `</head>` when the
//! shell lacks it. The body is never touched, so inline SVG `<title>`s survive. Values are HTML-escaped and substituted
//! literally, so a `$` in a title is never read as a capture reference.

use regex::Regex;
use static_init::dynamic;
use tracing::{debug, warn};

use super::SeoMeta;

/// One managed tag: how to find it and how to render it.
struct TagRule {
    pattern: Regex,
    render: fn(&SeoMeta) -> Option<String>,
}

struct Rules {
    tags: Vec<TagRule>,
    head_close: Regex,
}

#[dynamic]
static RULES: Result<Rules, regex::Error> = build_rules();

fn meta_pattern(attr: &str, key: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r#"(?i)<meta\s[^>]*\b{}\s*=\s*["']{}["'][^>]*>"#,
        attr,
        regex::escape(key)
    ))
}

fn build_rules() -> Result<Rules, regex::Error> {
    let tags = vec![
        TagRule {
            pattern: Regex::new(r"(?is)<title[^>]*>.*?</title\s*>")?,
            render: |m| Some(format!("<title>{}</title>", escape(&m.title))),
        },
        TagRule {
            pattern: meta_pattern("name", "description")?,
            render: |m| Some(meta_name("description", &m.description)),
        },
        TagRule {
            pattern: meta_pattern("name", "keywords")?,
            render: |m| m.keywords.as_deref().map(|k| meta_name("keywords", k)),
        },
        TagRule {
            pattern: meta_pattern("property", "og:title")?,
            render: |m| Some(meta_property("og:title", &m.title)),
        },
        TagRule {
            pattern: meta_pattern("property", "og:description")?,
            render: |m| Some(meta_property("og:description", &m.description)),
        },
        TagRule {
            pattern: meta_pattern("property", "og:image")?,
            render: |m| Some(meta_property("og:image", &m.image)),
        },
        TagRule {
            pattern: meta_pattern("property", "og:url")?,
            render: |m| Some(meta_property("og:url", &m.url)),
        },
        TagRule {
            pattern: meta_pattern("(?:name|property)", "twitter:title")?,
            render: |m| Some(meta_name("twitter:title", &m.title)),
        },
        TagRule {
            pattern: meta_pattern("(?:name|property)", "twitter:description")?,
            render: |m| Some(meta_name("twitter:description", &m.description)),
        },
        TagRule {
            pattern: meta_pattern("(?:name|property)", "twitter:image")?,
            render: |m| Some(meta_name("twitter:image", &m.image)),
        },
        TagRule {
            pattern: Regex::new(r#"(?i)<link\s[^>]*\brel\s*=\s*["']canonical["'][^>]*>"#)?,
            render: |m| Some(format!(r#"<link rel="canonical" href="{}">"#, escape(&m.url))),
        },
    ];
    Ok(Rules {
        tags,
        head_close: Regex::new(r"(?i)</head\s*>")?,
    })
}

/// Escapes a value for use inside element text or a quoted attribute.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn meta_name(name: &str, content: &str) -> String {
    format!(r#"<meta name="{}" content="{}">"#, name, escape(content))
}

fn meta_property(property: &str, content: &str) -> String {
    format!(r#"<meta property="{}" content="{}">"#, property, escape(content))
}

/// Writes `meta` into the shell's head.
///
/// Only the text before `</head>` is rewritten. There the first occurrence
/// of a managed tag is replaced and later duplicates are dropped. A shell
/// without `</head>` is returned unchanged.
pub fn inject(html: &str, meta: &SeoMeta) -> String {
    let rules = match &*RULES {
        Ok(rules) => rules,
        Err(e) => {
            warn!("SEO tag patterns failed to compile, serving shell as is: {}", e);
            return html.to_string();
        }
    };
    let Some(close) = rules.head_close.find(html) else {
        debug!("Shell has no </head>, serving it as is");
        return html.to_string();
    };

    let (head, rest) = html.split_at(close.start());
    let mut head = head.to_string();
    let mut missing = Vec::new();

    for rule in &rules.tags {
        let Some(tag) = (rule.render)(meta) else {
            continue;
        };
        match replace_tag(&head, &rule.pattern, &tag) {
            Some(rewritten) => head = rewritten,
            None => missing.push(tag),
        }
    }

    for tag in missing {
        head.push_str(&tag);
        head.push('\n');
    }
    head.push_str(rest);
    head
}

/// Replaces the first match with `tag` and removes any later ones.
/// `None` when the pattern does not occur.
fn replace_tag(page: &str, pattern: &Regex, tag: &str) -> Option<String> {
    let mut matches = pattern.find_iter(page);
    let first = matches.next()?;

    let mut out = String::with_capacity(page.len() + tag.len());
    out.push_str(&page[..first.start()]);
    out.push_str(tag);
    let mut cursor = first.end();
    for dup in matches {
        out.push_str(&page[cursor..dup.start()]);
        cursor = dup.end();
    }
    out.push_str(&page[cursor..]);
    Some(out)
}

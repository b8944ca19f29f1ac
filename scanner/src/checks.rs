//! Static accessibility checks over a fetched HTML page.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

const ERROR_PENALTY: u32 = 10;
const WARNING_PENALTY: u32 = 2;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageFindings {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl PageFindings {
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }

    /// 100 minus 10 per error and 2 per warning, floored at zero.
    pub fn score(&self) -> u32 {
        let penalty = ERROR_PENALTY * self.errors.len() as u32
            + WARNING_PENALTY * self.warnings.len() as u32;
        100u32.saturating_sub(penalty)
    }
}

struct Patterns {
    html_lang: Regex,
    title: Regex,
    img: Regex,
    alt: Regex,
    src: Regex,
    control: Regex,
    input_type: Regex,
    id: Regex,
    name: Regex,
    aria_label: Regex,
    label_for: Regex,
    h1: Regex,
    main: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let re = |p: &str| Regex::new(p).expect("static pattern");
        Patterns {
            html_lang: re(r#"(?is)<html\b[^>]*\blang\s*=\s*["']?[^"'\s>]+"#),
            title: re(r"(?is)<title\b[^>]*>(.*?)</title>"),
            img: re(r"(?is)<img\b[^>]*>"),
            alt: re(r"(?i)\balt\s*="),
            src: re(r#"(?i)\bsrc\s*=\s*["']([^"']*)["']"#),
            control: re(r"(?is)<(input|select|textarea)\b[^>]*>"),
            input_type: re(r#"(?i)\btype\s*=\s*["']?([a-z]+)"#),
            id: re(r#"(?i)\bid\s*=\s*["']([^"']+)["']"#),
            name: re(r#"(?i)\bname\s*=\s*["']([^"']+)["']"#),
            aria_label: re(r#"(?i)\baria-label(ledby)?\s*=\s*["'][^"']+["']"#),
            label_for: re(r#"(?is)<label\b[^>]*\bfor\s*=\s*["']([^"']+)["']"#),
            h1: re(r"(?i)<h1\b"),
            main: re(r#"(?i)<main\b|\brole\s*=\s*["']main["']"#),
        }
    })
}

/// Run every check over `html`.
pub fn check_html(html: &str) -> PageFindings {
    let p = patterns();
    let mut findings = PageFindings::default();

    if !p.html_lang.is_match(html) {
        findings
            .errors
            .push("<html> element has no lang attribute".to_string());
    }

    match p.title.captures(html) {
        Some(caps) if !caps[1].trim().is_empty() => {}
        Some(_) => findings.errors.push("<title> is empty".to_string()),
        None => findings.errors.push("Page has no <title>".to_string()),
    }

    for img in p.img.find_iter(html) {
        let tag = img.as_str();
        if !p.alt.is_match(tag) {
            let src = p
                .src
                .captures(tag)
                .map(|c| c[1].to_string())
                .unwrap_or_else(|| "?".to_string());
            findings
                .errors
                .push(format!("Image {} has no alt attribute", src));
        }
    }

    let labelled: HashSet<String> = p
        .label_for
        .captures_iter(html)
        .map(|c| c[1].to_string())
        .collect();

    for control in p.control.captures_iter(html) {
        let tag = control.get(0).map(|m| m.as_str()).unwrap_or_default();
        let kind = control[1].to_ascii_lowercase();

        if kind == "input" {
            let input_type = p
                .input_type
                .captures(tag)
                .map(|c| c[1].to_ascii_lowercase())
                .unwrap_or_default();
            if matches!(
                input_type.as_str(),
                "hidden" | "submit" | "button" | "reset" | "image"
            ) {
                continue;
            }
        }

        if p.aria_label.is_match(tag) {
            continue;
        }

        let id = p.id.captures(tag).map(|c| c[1].to_string());
        if id.as_ref().is_some_and(|id| labelled.contains(id)) {
            continue;
        }

        let name = id
            .or_else(|| p.name.captures(tag).map(|c| c[1].to_string()))
            .unwrap_or_else(|| "?".to_string());
        findings
            .errors
            .push(format!("Form control <{}> {} has no label", kind, name));
    }

    if !p.h1.is_match(html) {
        findings.warnings.push("Page has no <h1> heading".to_string());
    }

    if !p.main.is_match(html) {
        findings
            .warnings
            .push("Page has no <main> landmark".to_string());
    }

    findings
}

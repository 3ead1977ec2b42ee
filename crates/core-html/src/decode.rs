use crate::HtmlError;
use crate::entity::unescape;
use core_actions::ImageLoader;
use core_text::{Document, ImageBounds, ImageSpan, PLACEHOLDER, StyleKind};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{info, warn};

/// Comments, doctype/processing declarations, and start/end tags. Attribute
/// values may be quoted and contain `>`.
static MARKUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)<!--.*?-->|<![^>]*>|<\?[^>]*>|<(/?)([A-Za-z][A-Za-z0-9]*)((?:[^>"']|"[^"]*"|'[^']*')*?)(/?)>"#,
    )
    .expect("markup pattern")
});

static SRC_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:^|\s)src\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).expect("src pattern")
});

/// A `<` that can only be the start of markup.
static STRAY_TAG_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[A-Za-z/!?]").expect("tag-open pattern"));

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

struct Builder<'a> {
    doc: Document,
    loader: &'a dyn ImageLoader,
    bounds: ImageBounds,
    bold: usize,
    italic: usize,
    pending_break: bool,
    unresolved: usize,
}

impl Builder<'_> {
    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.break_if_pending();
        let start = self.doc.len_chars();
        let end = start + text.chars().count();
        self.doc.insert(start, text);
        self.style(start, end);
    }

    fn push_image(&mut self, reference: &str) {
        self.break_if_pending();
        let at = self.doc.len_chars();
        self.doc.insert(at, &PLACEHOLDER.to_string());
        let span = match self.loader.load_scaled(reference, self.bounds) {
            Ok(image) => ImageSpan::resolved(reference, image),
            Err(err) => {
                warn!(target: "html.codec", reference, %err, "image_unresolved");
                self.unresolved += 1;
                ImageSpan::unresolved(reference)
            }
        };
        self.doc.attach_image(at, span);
        self.style(at, at + 1);
    }

    fn push_line_break(&mut self) {
        self.pending_break = false;
        let at = self.doc.len_chars();
        self.doc.insert(at, "\n");
        self.style(at, at + 1);
    }

    /// Block boundaries separate content with a single newline, emitted lazily
    /// so leading and trailing blocks add nothing.
    fn block_boundary(&mut self) {
        self.pending_break = true;
    }

    fn break_if_pending(&mut self) {
        if !std::mem::take(&mut self.pending_break) {
            return;
        }
        let len = self.doc.len_chars();
        if len > 0 && self.doc.char_at(len - 1) != Some('\n') {
            self.doc.insert(len, "\n");
        }
    }

    fn style(&mut self, start: usize, end: usize) {
        if self.bold > 0 {
            self.doc.styles_mut().apply(StyleKind::Bold, start, end);
        }
        if self.italic > 0 {
            self.doc.styles_mut().apply(StyleKind::Italic, start, end);
        }
    }

    fn open(&mut self, name: &str, attrs: &str) {
        match name {
            "b" | "strong" => self.bold += 1,
            "i" | "em" => self.italic += 1,
            "p" | "div" => self.block_boundary(),
            "br" => self.push_line_break(),
            "img" => match src_of(attrs) {
                Some(src) => self.push_image(&src),
                None => warn!(target: "html.codec", "img_without_src"),
            },
            _ => {}
        }
    }

    fn close(&mut self, name: &str) {
        match name {
            "b" | "strong" => self.bold = self.bold.saturating_sub(1),
            "i" | "em" => self.italic = self.italic.saturating_sub(1),
            "p" | "div" => self.block_boundary(),
            _ => {}
        }
    }
}

fn src_of(attrs: &str) -> Option<String> {
    let caps = SRC_ATTR.captures(attrs)?;
    let raw = caps.get(1).or(caps.get(2)).or(caps.get(3))?.as_str();
    Some(unescape(raw).into_owned())
}

/// Normalize a text node: whitespace-only runs spanning a line break are
/// formatting and vanish; remaining raw line breaks read as spaces.
fn text_node(raw: &str) -> Option<String> {
    if raw.trim().is_empty() && raw.contains('\n') {
        return None;
    }
    let flattened: String = raw
        .chars()
        .filter(|c| *c != '\r')
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect();
    Some(unescape(&flattened).into_owned())
}

fn check_text(raw: &str, base: usize) -> Result<(), HtmlError> {
    match STRAY_TAG_OPEN.find(raw) {
        Some(m) => Err(HtmlError::UnterminatedTag {
            offset: base + m.start(),
        }),
        None => Ok(()),
    }
}

/// Parse markup into a fresh document. Images are decoded through `loader`
/// into `bounds`; an image that fails to resolve keeps its reference with no
/// bitmap. Structural errors (unterminated or mismatched tags) fail the whole
/// parse.
pub fn decode(
    html: &str,
    loader: &dyn ImageLoader,
    bounds: ImageBounds,
) -> Result<Document, HtmlError> {
    let mut b = Builder {
        doc: Document::new(),
        loader,
        bounds,
        bold: 0,
        italic: 0,
        pending_break: false,
        unresolved: 0,
    };
    let mut stack: Vec<String> = Vec::new();
    let mut cursor = 0;

    for caps in MARKUP.captures_iter(html) {
        let Some(whole) = caps.get(0) else { continue };
        let between = &html[cursor..whole.start()];
        check_text(between, cursor)?;
        if let Some(text) = text_node(between) {
            b.push_text(&text);
        }
        cursor = whole.end();

        let Some(name) = caps.get(2) else {
            // comment or declaration
            continue;
        };
        let name = name.as_str().to_ascii_lowercase();
        let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
        let self_closing = caps.get(4).is_some_and(|m| !m.as_str().is_empty());
        let void = VOID_ELEMENTS.contains(&name.as_str());

        if closing {
            if void {
                continue;
            }
            match stack.pop() {
                None => {
                    return Err(HtmlError::UnexpectedClose {
                        tag: name,
                        offset: whole.start(),
                    });
                }
                Some(top) if top != name => {
                    return Err(HtmlError::MismatchedClose {
                        expected: top,
                        found: name,
                        offset: whole.start(),
                    });
                }
                Some(_) => b.close(&name),
            }
            continue;
        }

        let attrs = caps.get(3).map_or("", |m| m.as_str());
        b.open(&name, attrs);
        if self_closing && !void {
            b.close(&name);
        } else if !void {
            stack.push(name);
        }
    }

    let tail = &html[cursor..];
    check_text(tail, cursor)?;
    if let Some(text) = text_node(tail) {
        b.push_text(&text);
    }
    if let Some(tag) = stack.pop() {
        return Err(HtmlError::UnclosedTag { tag });
    }

    info!(
        target: "html.codec",
        chars = b.doc.len_chars(),
        images = b.doc.images().len(),
        unresolved = b.unresolved,
        "decoded"
    );
    Ok(b.doc)
}

use crate::entity::escape;
use core_text::{Document, PLACEHOLDER, StyleKind, StyleMask};
use tracing::debug;

fn open_tag(kind: StyleKind) -> &'static str {
    match kind {
        StyleKind::Bold => "<b>",
        StyleKind::Italic => "<i>",
    }
}

fn close_tag(kind: StyleKind) -> &'static str {
    match kind {
        StyleKind::Bold => "</b>",
        StyleKind::Italic => "</i>",
    }
}

/// Serialize `doc` to markup. Style boundaries are emitted as properly nested
/// `<b>`/`<i>` pairs, line breaks as `<br>`, and images with an attached span
/// as `<img src>`. A placeholder without a span produces nothing.
pub fn encode(doc: &Document) -> String {
    let mut out = String::with_capacity(doc.len_chars() + 16);
    let mut open: Vec<StyleKind> = Vec::new();
    let mut run = String::new();

    for (pos, ch) in doc.text().chars().enumerate() {
        let wanted = doc.styles().mask_at(pos);
        if open.iter().any(|k| !wanted.contains(k.mask()))
            || StyleKind::ALL
                .iter()
                .any(|k| wanted.contains(k.mask()) && !open.contains(k))
        {
            out.push_str(&escape(&run));
            run.clear();
            transition(&mut out, &mut open, wanted);
        }
        match ch {
            '\n' => {
                out.push_str(&escape(&run));
                run.clear();
                out.push_str("<br>");
            }
            PLACEHOLDER => {
                out.push_str(&escape(&run));
                run.clear();
                if let Some(span) = doc.image_at(pos) {
                    out.push_str("<img src=\"");
                    out.push_str(&escape(&span.reference));
                    out.push_str("\">");
                }
            }
            other => run.push(other),
        }
    }
    out.push_str(&escape(&run));
    while let Some(kind) = open.pop() {
        out.push_str(close_tag(kind));
    }
    debug!(target: "html.codec", chars = doc.len_chars(), bytes = out.len(), "encoded");
    out
}

/// Close tags from the top of `open` until nothing unwanted remains, then open
/// whatever `wanted` still lacks.
fn transition(out: &mut String, open: &mut Vec<StyleKind>, wanted: StyleMask) {
    while open.iter().any(|k| !wanted.contains(k.mask())) {
        if let Some(kind) = open.pop() {
            out.push_str(close_tag(kind));
        }
    }
    for kind in StyleKind::ALL {
        if wanted.contains(kind.mask()) && !open.contains(&kind) {
            out.push_str(open_tag(kind));
            open.push(kind);
        }
    }
}

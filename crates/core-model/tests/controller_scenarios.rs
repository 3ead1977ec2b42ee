use core_actions::{FsImageLoader, FsImageStore, PassthroughImageStore};
use core_config::{Config, ConfigContext};
use core_model::{ControllerError, EditPhase, EditorController};
use core_text::{PLACEHOLDER, StyleKind};
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;
use tokio::runtime::Handle;

fn fast_config() -> Config {
    let mut cfg = Config::default();
    cfg.file.coalescer.debounce_ms = 20;
    cfg.apply_context(ConfigContext::default());
    cfg
}

fn controller() -> EditorController {
    EditorController::new(
        fast_config(),
        Arc::new(FsImageLoader),
        Arc::new(PassthroughImageStore),
        Handle::current(),
    )
}

fn loaded(html: &str) -> EditorController {
    let mut c = controller();
    c.load_html(html).unwrap();
    c
}

/// Collects every content-changed notification.
fn recorder(c: &mut EditorController) -> Rc<RefCell<Vec<String>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    c.set_on_content_changed(move |html| sink.borrow_mut().push(html.to_string()));
    seen
}

#[tokio::test]
async fn replace_then_undo_then_redo() {
    let mut c = loaded("Hello world");
    assert!(c.perform_replace(6, 11, "planet"));
    assert_eq!(c.text(), "Hello planet");
    assert_eq!(c.document().selection().map(|s| s.start), Some(12));
    assert!(c.undo());
    assert_eq!(c.text(), "Hello world");
    assert!(c.redo());
    assert_eq!(c.text(), "Hello planet");
    assert!(!c.can_redo());
    c.settle().await;
    assert_eq!(c.history().undo_depth(), 1, "programmatic edits are not re-recorded");
}

#[tokio::test]
async fn invalid_replace_bounds_are_rejected() {
    let mut c = loaded("Hello");
    assert!(!c.perform_replace(4, 2, "x"));
    assert!(!c.perform_replace(0, 6, "x"));
    assert_eq!(c.text(), "Hello");
    assert!(!c.can_undo());
}

#[tokio::test]
async fn undo_is_not_recorded_and_next_edit_diffs_against_new_snapshot() {
    let mut c = loaded("Hello");
    c.type_text(5, "!");
    c.settle().await;
    assert_eq!(c.history().undo_depth(), 1);

    assert!(c.undo());
    assert_eq!(c.text(), "Hello");
    c.settle().await;
    assert_eq!(c.history().undo_depth(), 0);
    assert_eq!(c.history().redo_depth(), 1);
    assert_eq!(c.guard().phase(), EditPhase::Idle);

    c.type_text(5, " there");
    c.settle().await;
    assert!(!c.can_redo());
    assert!(c.undo());
    assert_eq!(c.text(), "Hello");
}

#[tokio::test]
async fn typing_inside_debounce_window_is_flushed_before_undo() {
    let mut c = controller();
    c.type_text(0, "abc");
    assert!(c.undo(), "pending edit recorded then undone");
    assert_eq!(c.text(), "");
    assert!(c.redo());
    assert_eq!(c.text(), "abc");
}

#[tokio::test]
async fn burst_of_typing_becomes_one_step() {
    let mut c = loaded("Hi");
    for (i, ch) in [" ", "t", "h", "e", "r", "e"].iter().enumerate() {
        c.type_text(2 + i, ch);
    }
    c.settle().await;
    assert_eq!(c.text(), "Hi there");
    assert_eq!(c.history().undo_depth(), 1);
    assert!(c.undo());
    assert_eq!(c.text(), "Hi");
}

#[tokio::test]
async fn select_and_retype_is_recorded_as_replace() {
    let mut c = loaded("Hello world");
    c.delete_range(6, 11);
    c.type_text(6, "Rust");
    c.settle().await;
    assert_eq!(c.text(), "Hello Rust");
    assert_eq!(c.history().undo_depth(), 1);
    assert!(c.undo());
    assert_eq!(c.text(), "Hello world");
    assert!(c.redo());
    assert_eq!(c.text(), "Hello Rust");
}

#[tokio::test]
async fn toggles_notify_and_undo() {
    let mut c = loaded("0123456789");
    let seen = recorder(&mut c);
    c.set_selection(2, 8);
    c.toggle_bold();
    assert!(c.document().styles().is_fully_styled(2, 8, StyleKind::Bold));
    c.toggle_bold();
    assert!(c.document().styles().intervals_of(StyleKind::Bold).is_empty());
    c.undo();
    assert_eq!(
        seen.borrow().as_slice(),
        &["01<b>234567</b>89", "0123456789", "01<b>234567</b>89"]
    );
}

#[tokio::test]
async fn toggle_inside_bold_punches_hole() {
    let mut c = loaded("<b>0123456789</b>");
    c.set_selection(2, 8);
    c.toggle_bold();
    assert_eq!(c.export_html(), "<b>01</b>234567<b>89</b>");
    c.set_selection(0, 1);
    c.toggle_italic();
    assert_eq!(c.export_html(), "<b><i>0</i>1</b>234567<b>89</b>");
}

#[tokio::test]
async fn toggle_without_selection_is_noop() {
    let mut c = loaded("abc");
    c.set_selection(1, 1);
    c.toggle_bold();
    assert!(!c.can_undo());
}

#[tokio::test]
async fn load_clears_history_and_does_not_notify() {
    let mut c = loaded("one");
    let seen = recorder(&mut c);
    c.type_text(3, " two");
    c.settle().await;
    assert!(c.can_undo());
    assert_eq!(seen.borrow().len(), 1);

    c.load_html("<i>fresh</i>").unwrap();
    assert_eq!(c.text(), "fresh");
    assert!(!c.can_undo());
    assert!(!c.can_redo());
    assert_eq!(c.document().selection().map(|s| s.start), Some(5));
    assert_eq!(seen.borrow().len(), 1);
}

#[tokio::test]
async fn malformed_load_keeps_document() {
    let mut c = loaded("keep");
    let err = c.load_html("<b>broken").unwrap_err();
    assert!(matches!(err, ControllerError::Html(_)));
    assert_eq!(c.text(), "keep");
}

fn write_png(dir: &Path, w: u32, h: u32) -> String {
    let path = dir.join("picked.png");
    image::RgbaImage::from_pixel(w, h, image::Rgba([0, 128, 255, 255]))
        .save(&path)
        .unwrap();
    path.to_string_lossy().into_owned()
}

#[tokio::test]
async fn inserted_image_is_stored_scaled_and_undoable() {
    let picked = tempfile::tempdir().unwrap();
    let storage = tempfile::tempdir().unwrap();
    let source = write_png(picked.path(), 300, 300);

    let mut c = EditorController::new(
        fast_config(),
        Arc::new(FsImageLoader),
        Arc::new(FsImageStore::new(storage.path())),
        Handle::current(),
    );
    c.load_html("ab").unwrap();
    c.set_viewport(400, 200);
    c.set_selection(1, 1);
    c.insert_image(source.clone());
    c.settle().await;

    assert_eq!(c.text(), format!("a{PLACEHOLDER}b"));
    let span = c.document().image_at(1).expect("image attached");
    assert_ne!(span.reference, source);
    assert!(Path::new(&span.reference).starts_with(storage.path()));
    let bitmap = span.image.as_ref().expect("decoded");
    assert_eq!((bitmap.width, bitmap.height), (100, 100));
    assert_eq!(
        c.export_html(),
        format!("a<img src=\"{}\">b", span.reference)
    );

    assert!(c.undo());
    assert_eq!(c.text(), "ab");
    assert!(c.document().images().is_empty());
}

#[tokio::test]
async fn failed_copy_falls_back_to_original_reference() {
    let picked = tempfile::tempdir().unwrap();
    let source = write_png(picked.path(), 10, 10);
    let blocker = tempfile::NamedTempFile::new().unwrap();
    // A regular file where the storage directory should be makes the copy fail.
    let mut c = EditorController::new(
        fast_config(),
        Arc::new(FsImageLoader),
        Arc::new(FsImageStore::new(blocker.path().join("images"))),
        Handle::current(),
    );
    c.insert_image(source.clone());
    c.settle().await;
    assert_eq!(c.document().image_at(0).map(|s| s.reference.clone()), Some(source));
}

#[tokio::test]
async fn deleting_an_image_keeps_it_recoverable() {
    let picked = tempfile::tempdir().unwrap();
    let source = write_png(picked.path(), 8, 8);
    let mut c = loaded(&format!("x<img src=\"{source}\">y"));
    c.delete_range(0, 3);
    assert_eq!(c.text(), "");
    assert!(c.undo());
    assert_eq!(c.text(), format!("x{PLACEHOLDER}y"));
    assert_eq!(
        c.document().image_at(1).map(|s| s.reference.as_str()),
        Some(source.as_str())
    );
    assert!(c.document().image_at(1).and_then(|s| s.image.as_ref()).is_some());
}

#[tokio::test]
async fn poll_folds_in_finished_work() {
    let mut c = loaded("a");
    c.type_text(1, "b");
    assert_eq!(c.poll(), 0);
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    assert_eq!(c.poll(), 1);
    assert!(c.can_undo());
}

#[tokio::test]
async fn image_inserted_before_another_image_undoes_cleanly() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    let existing = write_png(first.path(), 8, 8);
    let added = write_png(second.path(), 8, 8);
    let original = format!("a<img src=\"{existing}\">b");

    let mut c = loaded(&original);
    c.set_selection(1, 1);
    c.insert_image(added.clone());
    c.settle().await;
    assert_eq!(c.text(), format!("a{PLACEHOLDER}{PLACEHOLDER}b"));
    assert_eq!(
        c.export_html(),
        format!("a<img src=\"{added}\"><img src=\"{existing}\">b")
    );

    assert!(c.undo());
    assert_eq!(c.export_html(), original);
    assert!(c.redo());
    assert_eq!(c.document().images().len(), 2);
}

#[tokio::test]
async fn unresolved_image_survives_delete_and_undo() {
    let original = "a<img src=\"/nonexistent/pic.png\">b";
    let mut c = loaded(original);
    c.delete_range(1, 2);
    assert_eq!(c.export_html(), "ab");
    assert!(c.undo());
    assert_eq!(c.text(), format!("a{PLACEHOLDER}b"));
    assert_eq!(c.export_html(), original);
}

#[tokio::test]
async fn bare_placeholder_delete_does_not_recall_an_older_image() {
    let picked = tempfile::tempdir().unwrap();
    let source = write_png(picked.path(), 8, 8);
    let mut c = loaded(&format!("a<img src=\"{source}\">"));
    c.delete_range(1, 2);
    c.type_text(1, &PLACEHOLDER.to_string());
    c.settle().await;
    c.delete_range(1, 2);
    c.settle().await;

    assert!(c.undo());
    assert_eq!(c.text(), format!("a{PLACEHOLDER}"));
    assert!(c.document().images().is_empty(), "typed placeholder has no image");
    assert!(c.undo());
    assert_eq!(c.text(), "a");
    assert!(c.undo());
    assert_eq!(c.export_html(), format!("a<img src=\"{source}\">"));
}

use serde::{Deserialize, Serialize};
use std::fmt;

// ── Editor / clipboard snapshots ───────────────────────────────────────────

/// What the frontend editor looks like at the moment the lookup was
/// triggered. Sent as the command payload, so the resolver never has to
/// query the webview back.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorContext {
    pub active_document: Option<ActiveDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveDocument {
    /// Vault-relative path of the focused document.
    pub path: String,
    /// Current editor selection, if any.
    #[serde(default)]
    pub selection: Option<String>,
}

/// Clipboard contents read on the backend. Read failures are mapped to
/// `None` by the caller before this is built; an unreadable clipboard is
/// the same as an empty one.
#[derive(Debug, Clone, Default)]
pub struct ClipboardSnapshot {
    pub text: Option<String>,
    /// Base64-encoded PNG, no data-URL prefix.
    pub image_base64: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Markdown,
    Pdf,
    Other,
}

/// Kind of the active document, from its file extension.
pub fn document_kind(path: &str) -> DocumentKind {
    let ext = std::path::Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "md" => DocumentKind::Markdown,
        "pdf" => DocumentKind::Pdf,
        _ => DocumentKind::Other,
    }
}

// ── Resolved input ─────────────────────────────────────────────────────────

/// Exactly one of these is produced per invocation. The variants mirror the
/// four ways a word can reach us, in precedence order.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedInput {
    /// Non-empty selection in an active markdown document.
    Selection(String),
    /// PDF annotation copied to the clipboard, already parsed.
    Annotation(PdfAnnotation),
    /// Plain clipboard text.
    Text(String),
    /// Clipboard image as base64 PNG.
    Image(String),
}

impl ResolvedInput {
    /// Short label for the activity log.
    pub fn source(&self) -> &'static str {
        match self {
            ResolvedInput::Selection(_) => "selection",
            ResolvedInput::Annotation(_) => "pdf-annotation",
            ResolvedInput::Text(_) => "clipboard-text",
            ResolvedInput::Image(_) => "clipboard-image",
        }
    }
}

/// A PDF reader annotation of shape `A>B>[caption|WORD]`. The word drives
/// the card name; the backlink block is appended to the card body so the
/// card points back at the annotated page.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfAnnotation {
    /// Uppercased, trimmed word name.
    pub word: String,
    /// `\n\n---\n\n...]]` block to append to the card.
    pub backlink: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// No selection, no clipboard text, no clipboard image.
    NoInputAvailable,
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::NoInputAvailable => {
                write!(f, "Nothing to look up: no selection, clipboard text, or clipboard image")
            }
        }
    }
}

// ── Precedence ─────────────────────────────────────────────────────────────

/// Decide which input drives this lookup. Evaluated top to bottom, first
/// match wins:
///
/// 1. markdown document + non-empty selection
/// 2. pdf document + clipboard annotation (`A>B>[caption|WORD]`)
/// 3. non-empty clipboard text
/// 4. clipboard image
pub fn resolve(
    editor: &EditorContext,
    clipboard: &ClipboardSnapshot,
) -> Result<ResolvedInput, ResolveError> {
    let kind = editor
        .active_document
        .as_ref()
        .map(|doc| document_kind(&doc.path));

    if kind == Some(DocumentKind::Markdown) {
        let selection = editor
            .active_document
            .as_ref()
            .and_then(|doc| doc.selection.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty());
        if let Some(selection) = selection {
            return Ok(ResolvedInput::Selection(selection.to_string()));
        }
    }

    let text = clipboard
        .text
        .as_deref()
        .filter(|t| !t.trim().is_empty());

    if kind == Some(DocumentKind::Pdf) {
        if let Some(annotation) = text.and_then(parse_annotation) {
            return Ok(ResolvedInput::Annotation(annotation));
        }
    }

    if let Some(text) = text {
        return Ok(ResolvedInput::Text(text.to_string()));
    }

    if let Some(image) = clipboard.image_base64.as_deref().filter(|i| !i.is_empty()) {
        return Ok(ResolvedInput::Image(image.to_string()));
    }

    Err(ResolveError::NoInputAvailable)
}

// ── PDF annotation parsing ─────────────────────────────────────────────────

/// Parse `A>B>[caption|WORD]` clipboard text. Needs at least three
/// `>`-separated sections with the third containing a `[caption|WORD]`
/// bracket pair; anything else is not an annotation and falls through to
/// the plain-text path.
pub fn parse_annotation(clip: &str) -> Option<PdfAnnotation> {
    let sections: Vec<&str> = clip.split('>').collect();
    if sections.len() < 3 {
        return None;
    }

    let bracket = regex::Regex::new(r"\[([^\|\]]+)\|([^\]]+)\]").unwrap();
    let caps = bracket.captures(sections[2])?;

    let word = caps[2].to_uppercase().trim().to_string();

    // The backlink keeps the raw pipe-split halves of the whole clipboard
    // string plus the caption up to its first `#` fragment marker. The
    // trailing `]]` closes the wiki link the caption opened.
    let mut pipes = clip.splitn(3, '|');
    let head = pipes.next()?;
    let page = pipes.next()?;
    let caption = caps[1].split('#').next().unwrap_or("");

    Some(PdfAnnotation {
        word,
        backlink: format!("\n\n---\n\n{}|{}|{}]]", head, page, caption),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markdown_editor(selection: Option<&str>) -> EditorContext {
        EditorContext {
            active_document: Some(ActiveDocument {
                path: "reading/notes.md".to_string(),
                selection: selection.map(|s| s.to_string()),
            }),
        }
    }

    fn pdf_editor() -> EditorContext {
        EditorContext {
            active_document: Some(ActiveDocument {
                path: "reading/paper.pdf".to_string(),
                selection: None,
            }),
        }
    }

    fn clipboard(text: Option<&str>, image: Option<&str>) -> ClipboardSnapshot {
        ClipboardSnapshot {
            text: text.map(|t| t.to_string()),
            image_base64: image.map(|i| i.to_string()),
        }
    }

    #[test]
    fn test_document_kind_from_extension() {
        assert_eq!(document_kind("notes/foo.md"), DocumentKind::Markdown);
        assert_eq!(document_kind("papers/bar.PDF"), DocumentKind::Pdf);
        assert_eq!(document_kind("img/pic.png"), DocumentKind::Other);
        assert_eq!(document_kind("no-extension"), DocumentKind::Other);
    }

    #[test]
    fn test_selection_wins_over_clipboard() {
        let editor = markdown_editor(Some("ephemeral"));
        let clip = clipboard(Some("other text"), Some("aW1n"));
        let resolved = resolve(&editor, &clip).unwrap();
        assert_eq!(resolved, ResolvedInput::Selection("ephemeral".to_string()));
    }

    #[test]
    fn test_blank_selection_falls_through_to_text() {
        let editor = markdown_editor(Some("   "));
        let clip = clipboard(Some("serendipity"), None);
        let resolved = resolve(&editor, &clip).unwrap();
        assert_eq!(resolved, ResolvedInput::Text("serendipity".to_string()));
    }

    #[test]
    fn test_pdf_annotation_parsed() {
        let editor = pdf_editor();
        let clip = clipboard(Some("a>b>[foo#bar|HELLO]"), None);
        match resolve(&editor, &clip).unwrap() {
            ResolvedInput::Annotation(ann) => {
                assert_eq!(ann.word, "HELLO");
                assert!(ann.backlink.starts_with("\n\n---\n\n"));
                assert!(ann.backlink.ends_with("]]"));
                assert_eq!(ann.backlink, "\n\n---\n\na>b>[foo#bar|HELLO]|foo]]");
            }
            other => panic!("expected annotation, got {:?}", other),
        }
    }

    #[test]
    fn test_pdf_with_plain_text_is_text_input() {
        let editor = pdf_editor();
        let clip = clipboard(Some("just a word"), None);
        let resolved = resolve(&editor, &clip).unwrap();
        assert_eq!(resolved, ResolvedInput::Text("just a word".to_string()));
    }

    #[test]
    fn test_text_wins_over_image() {
        let editor = EditorContext::default();
        let clip = clipboard(Some("word"), Some("aW1n"));
        let resolved = resolve(&editor, &clip).unwrap();
        assert_eq!(resolved, ResolvedInput::Text("word".to_string()));
    }

    #[test]
    fn test_image_when_no_text() {
        let editor = EditorContext::default();
        let clip = clipboard(None, Some("aW1n"));
        let resolved = resolve(&editor, &clip).unwrap();
        assert_eq!(resolved, ResolvedInput::Image("aW1n".to_string()));
    }

    #[test]
    fn test_nothing_available() {
        let editor = EditorContext::default();
        let clip = clipboard(None, None);
        assert_eq!(resolve(&editor, &clip), Err(ResolveError::NoInputAvailable));
    }

    #[test]
    fn test_annotation_word_uppercased_and_trimmed() {
        let ann = parse_annotation("p>12>[caption|hello ]").unwrap();
        assert_eq!(ann.word, "HELLO");
    }

    #[test]
    fn test_annotation_requires_three_sections() {
        assert!(parse_annotation("only>two").is_none());
        assert!(parse_annotation("a>b>no bracket here").is_none());
    }
}

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::Path;
use tokio::fs;

use crate::gpt::Explanation;

// Card naming. The on-disk convention is load-bearing: existing vaults and
// the wiki links inside them address cards by exactly this shape.
//   {targetFolder}/{sourceLanguage}/word-{sourceLanguage}-{WORD}.md

/// Uppercase + trim, the canonical word form used in file names.
pub fn normalize_word(raw: &str) -> String {
    raw.to_uppercase().trim().to_string()
}

pub fn card_file_name(source_language: &str, word: &str) -> String {
    format!("word-{}-{}.md", source_language, normalize_word(word))
}

/// Vault-relative path of a card. An empty target folder drops its segment
/// rather than producing a leading slash.
pub fn card_relative_path(target_folder: &str, source_language: &str, word: &str) -> String {
    let file = card_file_name(source_language, word);
    let folder = target_folder.trim().trim_matches('/');

    if folder.is_empty() {
        format!("{}/{}", source_language, file)
    } else {
        format!("{}/{}/{}", folder, source_language, file)
    }
}

/// Wiki link spliced over an editor selection, pointing at the card the
/// selection resolves to while keeping the selected text as the label. The
/// link target uses the raw selection; the file name normalization happens
/// when the host resolves the link, exactly as it does for hand-written
/// links.
pub fn selection_link(source_language: &str, selection: &str) -> String {
    format!(
        "[[word-{}-{}|{}]]",
        source_language, selection, selection
    )
}

// ── Materialization ────────────────────────────────────────────────────────

/// What happened to the card file this invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardOutcome {
    Created,
    Appended,
    Unchanged,
}

impl CardOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardOutcome::Created => "created",
            CardOutcome::Appended => "appended",
            CardOutcome::Unchanged => "unchanged",
        }
    }
}

/// Create the parent folder if missing. Idempotent; failures are swallowed
/// and logged, never propagated. A racing create or a pre-existing folder
/// must not kill the lookup.
async fn ensure_folder(folder: Option<&Path>) {
    if let Some(folder) = folder {
        if let Err(e) = fs::create_dir_all(folder).await {
            eprintln!(
                "Warning: could not create folder {}: {}",
                folder.display(),
                e
            );
        }
    }
}

/// The create-vs-append decision, keyed by the card path.
///
/// Absent file: fetch the explanation (only now, never on append), write
/// explanation + suffix as the new body. Present file: append the suffix to
/// the existing content without touching the explanation; an empty suffix
/// leaves the file as it is. Write failures propagate to the caller.
pub async fn create_or_append<F, Fut>(
    vault_root: &Path,
    relative_path: &str,
    suffix: &str,
    fetch_explanation: F,
) -> Result<CardOutcome, String>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Explanation>,
{
    let file_path = vault_root.join(relative_path);
    ensure_folder(file_path.parent()).await;

    if file_path.exists() {
        if suffix.is_empty() {
            return Ok(CardOutcome::Unchanged);
        }

        let mut content = fs::read_to_string(&file_path)
            .await
            .map_err(|e| format!("Failed to read {}: {}", relative_path, e))?;
        content.push_str(suffix);

        fs::write(&file_path, content)
            .await
            .map_err(|e| format!("Failed to update {}: {}", relative_path, e))?;

        Ok(CardOutcome::Appended)
    } else {
        let mut body = fetch_explanation().await.into_body();
        body.push_str(suffix);

        fs::write(&file_path, body)
            .await
            .map_err(|e| format!("Failed to create {}: {}", relative_path, e))?;

        Ok(CardOutcome::Created)
    }
}

// ── Card listing ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardMetadata {
    pub word: String,
    pub path: String,
    pub modified: i64,
}

/// Cards for one source language, newest first.
pub async fn list_cards(
    vault_root: &Path,
    target_folder: &str,
    source_language: &str,
) -> Result<Vec<CardMetadata>, String> {
    let folder = target_folder.trim().trim_matches('/');
    let dir = if folder.is_empty() {
        vault_root.join(source_language)
    } else {
        vault_root.join(folder).join(source_language)
    };

    if !dir.exists() {
        return Ok(vec![]);
    }

    let prefix = format!("word-{}-", source_language);
    let mut cards = Vec::new();

    let mut entries = fs::read_dir(&dir).await.map_err(|e| e.to_string())?;
    while let Some(entry) = entries.next_entry().await.map_err(|e| e.to_string())? {
        let file_path = entry.path();
        if !file_path.extension().map_or(false, |ext| ext == "md") {
            continue;
        }

        let stem = file_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("");
        let word = match stem.strip_prefix(&prefix) {
            Some(word) if !word.is_empty() => word.to_string(),
            _ => continue,
        };

        let modified = entry
            .metadata()
            .await
            .ok()
            .and_then(|m| m.modified().ok())
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        cards.push(CardMetadata {
            word,
            path: file_path.to_string_lossy().into_owned(),
            modified,
        });
    }

    cards.sort_by(|a, b| b.modified.cmp(&a.modified));
    Ok(cards)
}

// ── Lookup activity log ────────────────────────────────────────────────────

const LOG_FILE: &str = ".wordcards/activity.json";
const MAX_LOG_ENTRIES: usize = 200;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardLogEntry {
    pub timestamp: String,
    pub word: String,
    pub language: String,
    /// Which input produced the lookup: selection, clipboard-text,
    /// clipboard-image, or pdf-annotation.
    pub source: String,
    pub outcome: String,
}

impl CardLogEntry {
    pub fn now(word: &str, language: &str, source: &str, outcome: CardOutcome) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            word: word.to_string(),
            language: language.to_string(),
            source: source.to_string(),
            outcome: outcome.as_str().to_string(),
        }
    }
}

pub fn read_log(vault_root: &Path) -> Vec<CardLogEntry> {
    let path = vault_root.join(LOG_FILE);
    if !path.exists() {
        return vec![];
    }

    std::fs::read_to_string(&path)
        .ok()
        .and_then(|content| serde_json::from_str(&content).ok())
        .unwrap_or_default()
}

/// Best-effort append; the log is a convenience trail, not a ledger, so
/// failures only warn.
pub fn append_log(vault_root: &Path, entry: CardLogEntry) {
    let path = vault_root.join(LOG_FILE);
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let mut entries = read_log(vault_root);
    entries.push(entry);

    // Keep the most recent entries only.
    if entries.len() > MAX_LOG_ENTRIES {
        entries = entries.split_off(entries.len() - MAX_LOG_ENTRIES);
    }

    match serde_json::to_string_pretty(&entries) {
        Ok(json) => {
            if let Err(e) = std::fs::write(&path, json) {
                eprintln!("Warning: could not write activity log: {}", e);
            }
        }
        Err(e) => eprintln!("Warning: could not serialize activity log: {}", e),
    }
}

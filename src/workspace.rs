use serde::{Deserialize, Serialize};
use std::fmt;
use tauri::{AppHandle, Emitter};

// --- Open mode ---

/// Where a freshly looked-up card should appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Left,
    Right,
    Window,
    Active,
    Tab,
    None,
}

impl OpenMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpenMode::Left => "left",
            OpenMode::Right => "right",
            OpenMode::Window => "window",
            OpenMode::Active => "active",
            OpenMode::Tab => "tab",
            OpenMode::None => "none",
        }
    }

    /// Settings store the mode as a string; an unrecognized value is a user
    /// error surfaced before any pane is touched, not silently ignored.
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.trim() {
            "left" => Ok(OpenMode::Left),
            "right" => Ok(OpenMode::Right),
            "window" => Ok(OpenMode::Window),
            "active" => Ok(OpenMode::Active),
            "tab" => Ok(OpenMode::Tab),
            "none" => Ok(OpenMode::None),
            _ => Err(format!(
                "Unknown open mode '{}'. Must be one of: left, right, window, active, tab, none",
                s
            )),
        }
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// --- Pane registry ---

/// One open pane, as mirrored from the frontend via `sync_panes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaneInfo {
    pub id: String,
    /// Basename of the file the pane currently shows.
    pub file_name: String,
}

/// Card files share this basename prefix; pane reuse keys on it.
const CARD_PREFIX: &str = "word-";

// --- Open planning ---

#[derive(Debug, Clone, PartialEq)]
pub enum OpenTarget {
    /// Show the card in this already-open pane.
    Reuse(String),
    /// Open a fresh pane at the given placement.
    NewPane(OpenMode),
    /// Mode `none`: write only, display nothing.
    Skip,
}

/// Decide where the card goes. With overlap allowed, the first pane already
/// showing a `word-` file is reused so repeated lookups don't multiply
/// panes; otherwise every lookup gets a fresh pane per the configured mode.
pub fn plan_open(mode: OpenMode, allow_overlap: bool, panes: &[PaneInfo]) -> OpenTarget {
    if mode == OpenMode::None {
        return OpenTarget::Skip;
    }

    if allow_overlap {
        if let Some(pane) = panes.iter().find(|p| p.file_name.starts_with(CARD_PREFIX)) {
            return OpenTarget::Reuse(pane.id.clone());
        }
    }

    OpenTarget::NewPane(mode)
}

// --- Event emission ---

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenCardEvent {
    pub path: String,
    /// Pane id to reuse; absent means open a fresh pane.
    pub pane: Option<String>,
    /// Placement for a fresh pane.
    pub mode: Option<String>,
    pub reveal: bool,
}

/// Ask the frontend to display a card. Returns whether an open was actually
/// requested (`false` for mode `none`). Failures here never affect the
/// already-written card file; the caller reports them and moves on.
pub fn open_card(
    app: &AppHandle,
    panes: &[PaneInfo],
    relative_path: &str,
    mode: &str,
    allow_overlap: bool,
    reveal: bool,
) -> Result<bool, String> {
    let mode = OpenMode::from_str(mode)?;

    let event = match plan_open(mode, allow_overlap, panes) {
        OpenTarget::Skip => return Ok(false),
        OpenTarget::Reuse(pane) => OpenCardEvent {
            path: relative_path.to_string(),
            pane: Some(pane),
            mode: None,
            reveal,
        },
        OpenTarget::NewPane(mode) => OpenCardEvent {
            path: relative_path.to_string(),
            pane: None,
            mode: Some(mode.as_str().to_string()),
            reveal,
        },
    };

    app.emit("open-card", event)
        .map_err(|e| format!("Could not open card pane: {}", e))?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panes(names: &[&str]) -> Vec<PaneInfo> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| PaneInfo {
                id: format!("pane-{}", i),
                file_name: name.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_open_mode_roundtrip() {
        for s in ["left", "right", "window", "active", "tab", "none"] {
            assert_eq!(OpenMode::from_str(s).unwrap().as_str(), s);
        }
        assert_eq!(OpenMode::from_str(" right ").unwrap(), OpenMode::Right);
    }

    #[test]
    fn test_open_mode_unknown_is_error() {
        let err = OpenMode::from_str("sideways").unwrap_err();
        assert!(err.contains("sideways"));
    }

    #[test]
    fn test_plan_open_none_skips() {
        let panes = panes(&["word-English-APPLE.md"]);
        assert_eq!(plan_open(OpenMode::None, true, &panes), OpenTarget::Skip);
    }

    #[test]
    fn test_plan_open_reuses_first_card_pane() {
        let panes = panes(&["notes.md", "word-English-APPLE.md", "word-English-PEAR.md"]);
        assert_eq!(
            plan_open(OpenMode::Right, true, &panes),
            OpenTarget::Reuse("pane-1".to_string())
        );
    }

    #[test]
    fn test_plan_open_new_pane_when_no_card_open() {
        let panes = panes(&["notes.md", "journal.md"]);
        assert_eq!(
            plan_open(OpenMode::Right, true, &panes),
            OpenTarget::NewPane(OpenMode::Right)
        );
    }

    #[test]
    fn test_plan_open_overlap_disabled_always_new_pane() {
        let panes = panes(&["word-English-APPLE.md"]);
        assert_eq!(
            plan_open(OpenMode::Tab, false, &panes),
            OpenTarget::NewPane(OpenMode::Tab)
        );
    }
}

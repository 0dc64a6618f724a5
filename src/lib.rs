use anyhow::Result;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::RwLock;
use tauri::{AppHandle, Emitter, Manager, State};
use tauri_plugin_clipboard_manager::ClipboardExt;

mod cards;
mod gpt;
mod imgur;
mod resolver;
mod workspace;

use cards::{CardLogEntry, CardMetadata, CardOutcome};
use gpt::GptClient;
use resolver::{ClipboardSnapshot, EditorContext, ResolvedInput};
use workspace::PaneInfo;

// Default dictionary card template. Users edit this in settings; the
// fetcher embeds it verbatim in the lookup prompt.
const DEFAULT_PROMPT: &str = "## Translation\nThe inflection and translation of the word\n## Phonetics\nPhonetic transcription of the word\n## Example Sentences\nTwo to three example sentences and their translations\n## Roots and Affixes\nInformation about roots and affixes";

// App settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Root of the note vault. Lookups refuse to run until this is set.
    pub vault_folder: Option<String>,
    /// Card subfolder inside the vault, may be empty.
    pub target_folder_path: String,
    pub api_key: String,
    /// Image host credential.
    pub client_id: String,
    pub source_language: String,
    pub target_language: String,
    /// left | right | window | active | tab | none
    pub open_mode: String,
    /// Focus the pane after opening the card.
    pub reveal_pane: bool,
    /// Reuse an already-open word-card pane instead of stacking new ones.
    pub allow_overlap: bool,
    pub prompt: String,
    pub model: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            vault_folder: None,
            target_folder_path: String::new(),
            api_key: String::new(),
            client_id: String::new(),
            source_language: "English".to_string(),
            target_language: "Chinese".to_string(),
            open_mode: "right".to_string(),
            reveal_pane: true,
            allow_overlap: false,
            prompt: DEFAULT_PROMPT.to_string(),
            model: "gpt-4o".to_string(),
        }
    }
}

// App state
pub struct AppState {
    pub settings: RwLock<Settings>,
    /// Open panes mirrored from the frontend, for the reuse decision.
    pub panes: RwLock<Vec<PaneInfo>>,
}

// Result of one lookup, returned to the frontend.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardResult {
    pub word: String,
    pub path: String,
    pub outcome: String,
    pub opened: bool,
    /// For selection lookups: the wiki link the editor splices over the
    /// selection.
    pub selection_link: Option<String>,
}

// Get settings file path
fn get_settings_path(app: &AppHandle) -> Result<PathBuf> {
    let app_data = app.path().app_data_dir()?;
    std::fs::create_dir_all(&app_data)?;
    Ok(app_data.join("settings.json"))
}

// Load settings from disk
fn load_settings(app: &AppHandle) -> Settings {
    let path = match get_settings_path(app) {
        Ok(p) => p,
        Err(_) => return Settings::default(),
    };

    if path.exists() {
        std::fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    } else {
        Settings::default()
    }
}

// Save settings to disk
fn save_settings(app: &AppHandle, settings: &Settings) -> Result<()> {
    let path = get_settings_path(app)?;
    let content = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, content)?;
    Ok(())
}

// Notice event payload: transient toast messages shown by the frontend.
#[derive(Clone, Serialize)]
struct NoticeEvent {
    message: String,
}

fn notify(app: &AppHandle, message: impl Into<String>) {
    let message = message.into();
    if let Err(e) = app.emit("notice", NoticeEvent { message }) {
        eprintln!("Warning: could not emit notice: {}", e);
    }
}

// Read the clipboard without ever failing hard: an unreadable clipboard is
// treated as an empty one and the resolver falls through to the next input.
fn clipboard_snapshot(app: &AppHandle) -> ClipboardSnapshot {
    let text = app
        .clipboard()
        .read_text()
        .ok()
        .filter(|t| !t.trim().is_empty());

    let image_base64 = app
        .clipboard()
        .read_image()
        .ok()
        .and_then(|img| encode_png_base64(img.rgba(), img.width(), img.height()));

    ClipboardSnapshot { text, image_base64 }
}

// Re-encode raw clipboard RGBA as base64 PNG for the image host.
fn encode_png_base64(rgba: &[u8], width: u32, height: u32) -> Option<String> {
    let buffer = image::RgbaImage::from_raw(width, height, rgba.to_vec())?;
    let mut png = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(buffer)
        .write_to(&mut png, image::ImageFormat::Png)
        .ok()?;
    Some(STANDARD.encode(png.into_inner()))
}

// TAURI COMMANDS

#[tauri::command]
async fn create_word_card(
    app: AppHandle,
    editor: EditorContext,
    state: State<'_, AppState>,
) -> Result<CardResult, String> {
    let settings = state.settings.read().expect("settings read lock").clone();

    let vault = settings
        .vault_folder
        .clone()
        .ok_or("Vault folder not set")?;
    let vault_root = PathBuf::from(&vault);

    let clipboard = clipboard_snapshot(&app);
    let input = match resolver::resolve(&editor, &clipboard) {
        Ok(input) => input,
        Err(e) => {
            notify(&app, e.to_string());
            return Err(e.to_string());
        }
    };
    let source = input.source();

    let gpt = GptClient::new(settings.api_key.clone(), settings.model.clone())?;

    let (word, suffix, selection_link) = match input {
        ResolvedInput::Selection(selection) => {
            let link = cards::selection_link(&settings.source_language, &selection);
            (selection, String::new(), Some(link))
        }
        ResolvedInput::Annotation(annotation) => (annotation.word, annotation.backlink, None),
        ResolvedInput::Text(text) => (text, String::new(), None),
        ResolvedInput::Image(base64_png) => {
            notify(&app, "Uploading clipboard image...");
            let http = reqwest::Client::new();
            let url = match imgur::upload_image(&http, &settings.client_id, &base64_png).await {
                Ok(url) => url,
                Err(e) => {
                    notify(&app, e.clone());
                    return Err(e);
                }
            };

            notify(&app, "Analyzing image content...");
            let description = match gpt
                .describe_image(
                    &url,
                    &settings.source_language,
                    &settings.target_language,
                    &settings.prompt,
                )
                .await
            {
                Ok(description) => description,
                Err(e) => {
                    notify(&app, e.clone());
                    return Err(e);
                }
            };

            if description.word.is_empty() {
                let msg = "Image lookup returned no word name".to_string();
                notify(&app, msg.clone());
                return Err(msg);
            }

            let suffix = format!("\n\n---\n\n![{}]({})", description.word, url);
            (description.word, suffix, None)
        }
    };

    let word = cards::normalize_word(&word);
    let relative_path =
        cards::card_relative_path(&settings.target_folder_path, &settings.source_language, &word);

    let outcome = cards::create_or_append(&vault_root, &relative_path, &suffix, || async {
        notify(&app, format!("Generating card content for {}...", word));
        gpt.describe_word(&word, &settings.target_language, &settings.prompt)
            .await
    })
    .await?;

    cards::append_log(
        &vault_root,
        CardLogEntry::now(&word, &settings.source_language, source, outcome),
    );

    // Display step. A failure here never rolls back the write: the card
    // stays on disk and the user gets a notice instead.
    let panes = state.panes.read().expect("panes read lock").clone();
    let opened = match workspace::open_card(
        &app,
        &panes,
        &relative_path,
        &settings.open_mode,
        settings.allow_overlap,
        settings.reveal_pane,
    ) {
        Ok(opened) => opened,
        Err(e) => {
            notify(&app, e);
            false
        }
    };

    match outcome {
        CardOutcome::Created => notify(&app, format!("Card created: {}", relative_path)),
        CardOutcome::Appended => notify(&app, format!("Card updated: {}", relative_path)),
        CardOutcome::Unchanged => {}
    }

    Ok(CardResult {
        word,
        path: relative_path,
        outcome: outcome.as_str().to_string(),
        opened,
        selection_link,
    })
}

#[tauri::command]
fn get_settings(state: State<AppState>) -> Settings {
    state.settings.read().expect("settings read lock").clone()
}

#[tauri::command]
fn update_settings(
    app: AppHandle,
    new_settings: Settings,
    state: State<AppState>,
) -> Result<(), String> {
    {
        let mut settings = state.settings.write().expect("settings write lock");
        *settings = new_settings;
    }

    let settings = state.settings.read().expect("settings read lock");
    save_settings(&app, &settings).map_err(|e| e.to_string())?;

    Ok(())
}

#[tauri::command]
fn sync_panes(panes: Vec<PaneInfo>, state: State<AppState>) {
    let mut registry = state.panes.write().expect("panes write lock");
    *registry = panes;
}

#[tauri::command]
async fn list_cards(state: State<'_, AppState>) -> Result<Vec<CardMetadata>, String> {
    let settings = state.settings.read().expect("settings read lock").clone();
    let vault = settings.vault_folder.ok_or("Vault folder not set")?;

    cards::list_cards(
        &PathBuf::from(&vault),
        &settings.target_folder_path,
        &settings.source_language,
    )
    .await
}

#[tauri::command]
fn get_card_log(state: State<AppState>) -> Result<Vec<CardLogEntry>, String> {
    let vault = {
        let settings = state.settings.read().expect("settings read lock");
        settings.vault_folder.clone().ok_or("Vault folder not set")?
    };

    Ok(cards::read_log(&PathBuf::from(&vault)))
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_fs::init())
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_clipboard_manager::init())
        .setup(|app| {
            // Load settings on startup
            let settings = load_settings(app.handle());

            app.manage(AppState {
                settings: RwLock::new(settings),
                panes: RwLock::new(Vec::new()),
            });
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            create_word_card,
            get_settings,
            update_settings,
            sync_panes,
            list_cards,
            get_card_log,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}

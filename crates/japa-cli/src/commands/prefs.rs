use clap::Subcommand;

use japa_core::storage::{BackgroundTheme, Config, Language, PersistedRecord, Preferences, StateStore};

use crate::context::{self, CliResult};

#[derive(Subcommand)]
pub enum PrefsAction {
    /// Show effective preferences
    Show,
    /// Set the background gradient (comma-separated colors)
    Theme {
        colors: String,
    },
    /// Set the devotional image URI
    Image {
        uri: String,
    },
    /// Set the display language (hindi, english)
    Language {
        language: Language,
    },
}

pub fn run(action: PrefsAction) -> CliResult {
    let store = context::open_store()?;
    let update = match action {
        PrefsAction::Show => None,
        PrefsAction::Theme { colors } => Some(PersistedRecord {
            background_theme: Some(BackgroundTheme::parse_list(&colors)?),
            ..Default::default()
        }),
        PrefsAction::Image { uri } => {
            if uri.trim().is_empty() {
                return Err("image uri must not be empty".into());
            }
            Some(PersistedRecord {
                image_uri: Some(uri.trim().to_string()),
                ..Default::default()
            })
        }
        PrefsAction::Language { language } => Some(PersistedRecord {
            language: Some(language),
            ..Default::default()
        }),
    };

    if let Some(record) = update {
        store.save(&record)?;
    }

    let config = Config::load_or_default();
    context::print_json(&Preferences::resolve(&store.load(), &config.defaults))
}

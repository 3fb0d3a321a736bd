use anyhow::Context;
use eframe::egui;
use sketch_tutor::api::{HttpAnalysisClient, API_KEY_ENV};
use sketch_tutor::backend::BackendClient;
use sketch_tutor::gui::TutorApp;
use sketch_tutor::settings::Settings;
use std::sync::Arc;

const SETTINGS_PATH: &str = "settings.json";

fn main() -> anyhow::Result<()> {
    let settings = Settings::load(SETTINGS_PATH)?;
    sketch_tutor::logging::init(settings.debug_logging);

    // A missing service key is a startup failure, not something the UI can
    // recover from later.
    let api_key = std::env::var(API_KEY_ENV)
        .with_context(|| format!("{API_KEY_ENV} must be set before starting"))?;
    let client = Arc::new(HttpAnalysisClient::new(
        settings.backend_url.clone(),
        api_key.clone(),
    )?);
    let backend = BackendClient::new(settings.backend_url.clone(), api_key)?;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([900.0, 600.0]),
        ..Default::default()
    };

    let _ = eframe::run_native(
        "Sketch Tutor",
        native_options,
        Box::new(move |_cc| Box::new(TutorApp::new(settings, client, backend))),
    );
    Ok(())
}

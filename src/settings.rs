use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Settings {
    /// Base URL of the hosted backend (analysis, speech, classes, auth).
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    /// Fixed raster resolution of the drawing canvas.
    #[serde(default = "default_canvas_size")]
    pub canvas_size: (u32, u32),
    #[serde(default = "default_brush_width")]
    pub brush_width: u32,
    /// Initial brush color as RGB.
    #[serde(default = "default_brush_color")]
    pub brush_color: (u8, u8, u8),
    /// Canvas background color as RGB; also what the eraser paints.
    #[serde(default = "default_background")]
    pub background: (u8, u8, u8),
    /// Read answers aloud through the speech endpoint.
    #[serde(default = "default_voice_enabled")]
    pub voice_enabled: bool,
    /// Directory used for exported sketches. If `None`, a folder under the
    /// working directory is used.
    pub export_dir: Option<String>,
    /// When enabled the application initialises the logger at debug level.
    /// Defaults to `false` when the field is missing in the settings file.
    #[serde(default)]
    pub debug_logging: bool,
}

fn default_backend_url() -> String {
    "http://localhost:3000".into()
}

fn default_canvas_size() -> (u32, u32) {
    (960, 640)
}

fn default_brush_width() -> u32 {
    4
}

fn default_brush_color() -> (u8, u8, u8) {
    (20, 20, 20)
}

fn default_background() -> (u8, u8, u8) {
    (255, 255, 255)
}

fn default_voice_enabled() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            canvas_size: default_canvas_size(),
            brush_width: default_brush_width(),
            brush_color: default_brush_color(),
            background: default_background(),
            voice_enabled: default_voice_enabled(),
            export_dir: None,
            debug_logging: false,
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

use crate::api::AnalysisClient;
use crate::audio::{AudioRecorder, RecordedClip};
use crate::backend::{BackendClient, ChapterRecord, ClassRecord, Session};
use crate::conversation::Role;
use crate::draw::{display_to_raster, DrawSurface, Rgba};
use crate::markup::render_markup;
use crate::orchestrator::{AnalysisOrchestrator, QueryKind, TutorEvent};
use crate::settings::Settings;
use crate::speech::SpeechPlayer;
use base64::Engine;
use eframe::egui;
use std::sync::Arc;

#[derive(Default)]
struct SignInForm {
    email: String,
    password: String,
}

#[derive(Default)]
struct LibraryState {
    open: bool,
    loaded: bool,
    show_archived: bool,
    classes: Vec<ClassRecord>,
    chapters: Vec<ChapterRecord>,
    selected_class: Option<String>,
    selected_chapter: Option<String>,
    new_class_name: String,
    new_chapter_title: String,
}

pub struct TutorApp {
    settings: Settings,
    surface: DrawSurface,
    orchestrator: AnalysisOrchestrator,
    speech: SpeechPlayer,
    recorder: AudioRecorder,
    pending_clip: Option<RecordedClip>,
    backend: BackendClient,
    session: Option<Session>,
    sign_in: SignInForm,
    library: LibraryState,
    prompt: String,
    voice_enabled: bool,
    error: Option<String>,
    status: Option<String>,
    canvas_texture: Option<egui::TextureHandle>,
}

impl TutorApp {
    pub fn new(
        settings: Settings,
        client: Arc<dyn AnalysisClient>,
        backend: BackendClient,
    ) -> Self {
        let (width, height) = settings.canvas_size;
        let bg = settings.background;
        let mut surface = DrawSurface::new(width, height, Rgba::rgb(bg.0, bg.1, bg.2));
        surface.brush.width = settings.brush_width;
        let (r, g, b) = settings.brush_color;
        surface.brush.color = Rgba::rgb(r, g, b);

        let session = match backend.current_session() {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "could not fetch session");
                None
            }
        };

        Self {
            voice_enabled: settings.voice_enabled,
            surface,
            orchestrator: AnalysisOrchestrator::new(Arc::clone(&client)),
            speech: SpeechPlayer::new(client),
            recorder: AudioRecorder::new(),
            pending_clip: None,
            backend,
            session,
            sign_in: SignInForm::default(),
            library: LibraryState::default(),
            prompt: String::new(),
            error: None,
            status: None,
            settings,
            canvas_texture: None,
        }
    }

    fn apply_events(&mut self) {
        for event in self.orchestrator.poll() {
            match event {
                TutorEvent::Answer { text } => {
                    self.error = None;
                    if self.voice_enabled {
                        self.speech.speak(&text);
                    }
                }
                TutorEvent::Failed { message, .. } => {
                    self.error = Some(message);
                }
            }
        }
        self.speech.poll();
    }

    fn submit_prompt(&mut self) {
        let prompt = self.prompt.trim().to_string();
        if prompt.is_empty() {
            return;
        }
        match self.surface.snapshot_base64() {
            Ok(snapshot) => {
                self.orchestrator.submit_image_query(&prompt, snapshot);
                self.prompt.clear();
                self.error = None;
            }
            Err(e) => self.error = Some(format!("could not capture the canvas: {e}")),
        }
    }

    fn submit_clip(&mut self) {
        let Some(clip) = self.pending_clip.take() else {
            return;
        };
        let audio = base64::engine::general_purpose::STANDARD.encode(&clip.bytes);
        let snapshot = self.surface.snapshot_base64().ok();
        let prompt = {
            let trimmed = self.prompt.trim();
            if trimmed.is_empty() {
                "Please answer the question in this recording.".to_string()
            } else {
                trimmed.to_string()
            }
        };
        self.orchestrator
            .submit_audio_query(audio, clip.mime_type, &prompt, snapshot);
        self.prompt.clear();
        self.error = None;
    }

    fn sign_in_ui(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(120.0);
                ui.heading("Sketch Tutor");
                ui.label("Sign in to continue");
                ui.add_space(12.0);
                if let Some(err) = &self.error {
                    ui.colored_label(egui::Color32::RED, err);
                }
                ui.add(
                    egui::TextEdit::singleline(&mut self.sign_in.email).hint_text("email"),
                );
                ui.add(
                    egui::TextEdit::singleline(&mut self.sign_in.password)
                        .password(true)
                        .hint_text("password"),
                );
                if ui.button("Sign in").clicked() {
                    match self
                        .backend
                        .sign_in(&self.sign_in.email, &self.sign_in.password)
                    {
                        Ok(session) => {
                            self.session = Some(session);
                            self.error = None;
                            self.sign_in.password.clear();
                        }
                        Err(e) => self.error = Some(format!("sign in failed: {e}")),
                    }
                }
            });
        });
    }

    fn toolbar_ui(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let eraser = self.surface.brush.eraser;
                // The eraser always paints the background color, so the
                // color picker is disabled while it is on.
                ui.add_enabled_ui(!eraser, |ui| {
                    let mut rgb = [
                        self.surface.brush.color.r,
                        self.surface.brush.color.g,
                        self.surface.brush.color.b,
                    ];
                    if ui.color_edit_button_srgb(&mut rgb).changed() {
                        self.surface.brush.color = Rgba::rgb(rgb[0], rgb[1], rgb[2]);
                    }
                });
                ui.add(
                    egui::Slider::new(&mut self.surface.brush.width, 1..=32).text("Width"),
                );
                ui.toggle_value(&mut self.surface.brush.eraser, "Eraser");
                if ui.button("Clear").clicked() {
                    self.surface.clear();
                }
                if ui.button("Export PNG").clicked() {
                    self.export_drawing();
                }
                ui.toggle_value(&mut self.library.open, "Library");
                ui.separator();
                ui.add_enabled_ui(self.speech.is_enabled(), |ui| {
                    ui.toggle_value(&mut self.voice_enabled, "🔊 Voice");
                });
                if self.speech.is_speaking() && ui.button("Stop speaking").clicked() {
                    self.speech.cancel();
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Sign out").clicked() {
                        if let Err(e) = self.backend.sign_out() {
                            tracing::warn!(error = %e, "sign out failed");
                        }
                        self.session = None;
                        self.orchestrator.reset_conversation();
                    }
                    if let Some(session) = &self.session {
                        ui.label(&session.email);
                    }
                });
            });
        });
    }

    fn export_drawing(&mut self) {
        let folder = match self.settings.export_dir.as_deref() {
            Some(dir) => Ok(std::path::PathBuf::from(dir)),
            None => crate::draw::export::default_export_folder(),
        };
        let result =
            folder.and_then(|dir| crate::draw::export::export_raster(self.surface.raster(), &dir));
        match result {
            Ok(path) => self.status = Some(format!("saved {}", path.display())),
            Err(e) => self.error = Some(format!("export failed: {e}")),
        }
    }

    fn chat_ui(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("chat")
            .default_width(360.0)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("Tutor");
                    if ui.button("New conversation").clicked() {
                        self.orchestrator.reset_conversation();
                        self.speech.cancel();
                        self.error = None;
                    }
                });
                ui.separator();

                let log_height = ui.available_height() - 140.0;
                egui::ScrollArea::vertical()
                    .stick_to_bottom(true)
                    .max_height(log_height.max(100.0))
                    .show(ui, |ui| {
                        for turn in self.orchestrator.log().turns() {
                            match turn.role {
                                Role::User => {
                                    ui.label(
                                        egui::RichText::new(format!("You: {}", turn.content))
                                            .strong(),
                                    );
                                }
                                Role::Assistant => {
                                    // Display form only; the log keeps the
                                    // raw text.
                                    ui.label(format!("Tutor: {}", render_markup(&turn.content)));
                                }
                            }
                            ui.add_space(4.0);
                        }
                        if self.orchestrator.is_busy(QueryKind::Image) {
                            ui.horizontal(|ui| {
                                ui.spinner();
                                ui.label("Analyzing sketch…");
                            });
                        }
                        if self.orchestrator.is_busy(QueryKind::Audio) {
                            ui.horizontal(|ui| {
                                ui.spinner();
                                ui.label("Analyzing recording…");
                            });
                        }
                    });

                ui.separator();
                if let Some(err) = &self.error {
                    ui.colored_label(egui::Color32::RED, err);
                }
                if let Some(status) = &self.status {
                    ui.weak(status.clone());
                }

                let ask_enabled = !self.orchestrator.is_busy(QueryKind::Image);
                ui.horizontal(|ui| {
                    let input = ui.add(
                        egui::TextEdit::singleline(&mut self.prompt)
                            .hint_text("Ask about your sketch"),
                    );
                    let entered =
                        input.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                    let asked = ui
                        .add_enabled(ask_enabled, egui::Button::new("Ask"))
                        .clicked();
                    if ask_enabled && (asked || entered) {
                        self.submit_prompt();
                    }
                });

                self.recording_ui(ui);
            });
    }

    fn recording_ui(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if self.recorder.is_recording() {
                if ui.button("⏹ Stop").clicked() {
                    match self.recorder.stop() {
                        Ok(clip) => self.pending_clip = clip,
                        Err(e) => self.error = Some(format!("recording failed: {e}")),
                    }
                }
                ui.label("recording…");
            } else if ui.button("🎤 Record").clicked() {
                self.pending_clip = None;
                if let Err(e) = self.recorder.start() {
                    self.error = Some(e.to_string());
                }
            }

            let clip_info = self
                .pending_clip
                .as_ref()
                .map(|clip| (clip.duration_secs(), clip.is_empty()));
            if let Some((duration, empty)) = clip_info {
                ui.label(format!("{duration:.1}s"));
                if ui.button("▶ Play").clicked() {
                    if let Some(clip) = &self.pending_clip {
                        self.speech.play_clip(clip.bytes.clone());
                    }
                }
                if ui.button("Discard").clicked() {
                    self.pending_clip = None;
                }
                let sendable = !empty && !self.orchestrator.is_busy(QueryKind::Audio);
                if ui.add_enabled(sendable, egui::Button::new("Send")).clicked() {
                    self.submit_clip();
                }
            }
        });
    }

    fn library_ui(&mut self, ctx: &egui::Context) {
        if !self.library.open {
            return;
        }
        let mut open = self.library.open;
        egui::Window::new("Library").open(&mut open).show(ctx, |ui| {
            ui.checkbox(&mut self.library.show_archived, "Show archived");
            if ui.button("Refresh").clicked() || !self.library.loaded {
                self.refresh_classes();
            }
            ui.separator();

            ui.horizontal(|ui| {
                ui.text_edit_singleline(&mut self.library.new_class_name);
                if ui.button("Add class").clicked() && !self.library.new_class_name.is_empty() {
                    match self.backend.create_class(&self.library.new_class_name) {
                        Ok(_) => {
                            self.library.new_class_name.clear();
                            self.refresh_classes();
                        }
                        Err(e) => self.error = Some(format!("create class failed: {e}")),
                    }
                }
            });

            let classes = self.library.classes.clone();
            for class in &classes {
                if class.archived_at.is_some() && !self.library.show_archived {
                    continue;
                }
                ui.horizontal(|ui| {
                    let selected = self.library.selected_class.as_deref() == Some(&class.id);
                    if ui.selectable_label(selected, &class.name).clicked() {
                        self.library.selected_class = Some(class.id.clone());
                        self.library.selected_chapter = None;
                        self.refresh_chapters();
                    }
                    if class.archived_at.is_some() {
                        if ui.small_button("Restore").clicked() {
                            self.run_backend(|app| app.backend.restore_class(&class.id));
                            self.refresh_classes();
                        }
                    } else if ui.small_button("Archive").clicked() {
                        self.run_backend(|app| app.backend.archive_class(&class.id));
                        self.refresh_classes();
                    }
                });
            }

            if let Some(class_id) = self.library.selected_class.clone() {
                ui.separator();
                ui.horizontal(|ui| {
                    ui.text_edit_singleline(&mut self.library.new_chapter_title);
                    if ui.button("Add chapter").clicked()
                        && !self.library.new_chapter_title.is_empty()
                    {
                        match self
                            .backend
                            .create_chapter(&class_id, &self.library.new_chapter_title)
                        {
                            Ok(_) => {
                                self.library.new_chapter_title.clear();
                                self.refresh_chapters();
                            }
                            Err(e) => self.error = Some(format!("create chapter failed: {e}")),
                        }
                    }
                });

                let chapters = self.library.chapters.clone();
                for chapter in &chapters {
                    if chapter.archived_at.is_some() && !self.library.show_archived {
                        continue;
                    }
                    ui.horizontal(|ui| {
                        let selected =
                            self.library.selected_chapter.as_deref() == Some(&chapter.id);
                        if ui.selectable_label(selected, &chapter.title).clicked() {
                            self.library.selected_chapter = Some(chapter.id.clone());
                        }
                        if chapter.archived_at.is_some() {
                            if ui.small_button("Restore").clicked() {
                                self.run_backend(|app| app.backend.restore_chapter(&chapter.id));
                                self.refresh_chapters();
                            }
                        } else if ui.small_button("Archive").clicked() {
                            self.run_backend(|app| app.backend.archive_chapter(&chapter.id));
                            self.refresh_chapters();
                        }
                    });
                }

                if let Some(chapter_id) = self.library.selected_chapter.clone() {
                    ui.separator();
                    ui.horizontal(|ui| {
                        if ui.button("Save drawing").clicked() {
                            match self.surface.snapshot_base64() {
                                Ok(snapshot) => {
                                    if let Err(e) =
                                        self.backend.save_drawing(&chapter_id, snapshot)
                                    {
                                        self.error = Some(format!("save failed: {e}"));
                                    } else {
                                        self.status = Some("drawing saved".into());
                                    }
                                }
                                Err(e) => self.error = Some(format!("save failed: {e}")),
                            }
                        }
                        if ui.button("Load drawing").clicked() {
                            self.load_drawing(&chapter_id);
                        }
                    });
                }
            }
        });
        self.library.open = open;
    }

    fn run_backend(&mut self, op: impl FnOnce(&Self) -> anyhow::Result<()>) {
        if let Err(e) = op(self) {
            self.error = Some(e.to_string());
        }
    }

    fn refresh_classes(&mut self) {
        self.library.loaded = true;
        match self.backend.list_classes(self.library.show_archived) {
            Ok(classes) => self.library.classes = classes,
            Err(e) => self.error = Some(format!("load classes failed: {e}")),
        }
    }

    fn refresh_chapters(&mut self) {
        let Some(class_id) = self.library.selected_class.clone() else {
            self.library.chapters.clear();
            return;
        };
        match self.backend.list_chapters(&class_id) {
            Ok(chapters) => self.library.chapters = chapters,
            Err(e) => self.error = Some(format!("load chapters failed: {e}")),
        }
    }

    fn load_drawing(&mut self, chapter_id: &str) {
        match self.backend.load_drawing(chapter_id) {
            Ok(Some(image_data)) => {
                let result = base64::engine::general_purpose::STANDARD
                    .decode(&image_data)
                    .map_err(anyhow::Error::from)
                    .and_then(|png| self.surface.restore_png(&png));
                if let Err(e) = result {
                    self.error = Some(format!("load failed: {e}"));
                }
            }
            Ok(None) => self.status = Some("no saved drawing for this chapter".into()),
            Err(e) => self.error = Some(format!("load failed: {e}")),
        }
    }

    fn canvas_ui(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let raster = self.surface.raster();
            let raster_size = (raster.width(), raster.height());

            if self.surface.take_dirty() || self.canvas_texture.is_none() {
                let image = egui::ColorImage::from_rgba_unmultiplied(
                    [raster_size.0 as usize, raster_size.1 as usize],
                    self.surface.raster().pixels(),
                );
                match &mut self.canvas_texture {
                    Some(texture) => texture.set(image, egui::TextureOptions::NEAREST),
                    None => {
                        self.canvas_texture = Some(ui.ctx().load_texture(
                            "canvas",
                            image,
                            egui::TextureOptions::NEAREST,
                        ));
                    }
                }
            }

            let aspect = raster_size.0 as f32 / raster_size.1 as f32;
            let avail = ui.available_size();
            let display = if avail.x / avail.y > aspect {
                egui::vec2(avail.y * aspect, avail.y)
            } else {
                egui::vec2(avail.x, avail.x / aspect)
            };

            let (rect, response) =
                ui.allocate_exact_size(display, egui::Sense::click_and_drag());
            if let Some(texture) = &self.canvas_texture {
                ui.painter().image(
                    texture.id(),
                    rect,
                    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    egui::Color32::WHITE,
                );
            }

            // Pointer positions are in display space; the raster has a fixed
            // resolution, so scale per axis or strokes drift from the cursor.
            let to_raster = |pos: egui::Pos2| {
                display_to_raster(
                    (pos.x - rect.min.x, pos.y - rect.min.y),
                    (rect.width(), rect.height()),
                    raster_size,
                )
            };

            if response.drag_started() {
                if let Some(pos) = response.interact_pointer_pos() {
                    self.surface.begin_stroke(to_raster(pos));
                }
            }
            if response.dragged() {
                if let Some(pos) = response.interact_pointer_pos() {
                    self.surface.extend_stroke(to_raster(pos));
                }
            }
            if response.drag_stopped() {
                self.surface.end_stroke();
            }
        });
    }
}

impl eframe::App for TutorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.apply_events();

        // Keep polling while work is outstanding; completions arrive over
        // channels, not through input events.
        if self.orchestrator.is_busy(QueryKind::Image)
            || self.orchestrator.is_busy(QueryKind::Audio)
            || self.speech.is_speaking()
            || self.recorder.is_recording()
        {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }

        if self.session.is_none() {
            self.sign_in_ui(ctx);
            return;
        }

        self.toolbar_ui(ctx);
        self.chat_ui(ctx);
        self.library_ui(ctx);
        self.canvas_ui(ctx);
    }
}

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};

use anyhow::Result;
use eframe::egui::{self, Color32, RichText};
use eframe::egui::{FontData, FontDefinitions, FontFamily};

use crate::io::{load_description_policy, load_diagram_pixels, load_record, save_record};
use crate::model::AppState;
use damage_report_common::render::persisted_subject_id;
use damage_report_common::{
    CanvasPoint, DamageType, DescriptionPolicy, MarkerId, MarkingSession, MarkingState,
    PointerEvent,
    RenderedReport, ScreenPos, ScreenRect, SessionEvent, Severity, Snapshot, CANVAS_HEIGHT,
    CANVAS_WIDTH, MARKER_RADIUS,
};

pub struct DesktopApp {
    state: AppState,
    status: String,
    render_status: String,
    render_rx: Option<Receiver<UiMessage>>,
    rendering: bool,
    diagram: Option<egui::TextureHandle>,
    diagram_rx: Option<Receiver<UiMessage>>,
    pending_diagram: Option<DiagramData>,
    last_pointer: Option<ScreenPos>,
    last_report: Option<RenderedReport>,
}

enum UiMessage {
    RenderDone { result: std::result::Result<RenderedReport, String> },
    DiagramLoaded { result: std::result::Result<DiagramData, String> },
}

struct DiagramData {
    path: String,
    size: [usize; 2],
    pixels: Vec<u8>,
}

enum FormAction {
    Save,
    Cancel,
    Delete(MarkerId),
}

impl DesktopApp {
    fn open_record(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON", &["json"])
            .pick_file()
        {
            match self.load_from_path(&path) {
                Ok(_) => self.status = format!("Loaded {}", path.display()),
                Err(err) => self.status = format!("Load failed: {err}"),
            }
        }
    }

    fn load_from_path(&mut self, path: &Path) -> Result<()> {
        let record = load_record(path)?;
        let read_only = self.state.session.is_read_only();
        self.state = AppState::from_record(
            record,
            Some(path.to_path_buf()),
            read_only,
            self.state.policy,
        );
        self.last_report = None;
        Ok(())
    }

    fn save_record_as(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON", &["json"])
            .set_file_name("inspection.json")
            .save_file()
        {
            let record = self.state.to_record(self.state.session.snapshot());
            match save_record(&path, &record) {
                Ok(_) => {
                    self.status = format!("Saved {}", path.display());
                    self.state.source_path = Some(path);
                }
                Err(err) => self.status = format!("Save failed: {err}"),
            }
        }
    }

    fn open_diagram(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("Image", &["png", "jpg", "jpeg", "webp"])
            .pick_file()
        else {
            return;
        };

        let (tx, rx) = mpsc::channel();
        self.diagram_rx = Some(rx);
        std::thread::spawn(move || {
            let result = load_diagram_pixels(&path)
                .map(|(size, pixels)| DiagramData {
                    path: path.display().to_string(),
                    size,
                    pixels,
                })
                .map_err(|err| err.to_string());
            let _ = tx.send(UiMessage::DiagramLoaded { result });
        });
    }

    /// セッションの保存要求をレコードファイルへ書き出す（失敗はログとステータスのみ）
    fn flush_events(&mut self) {
        for event in self.state.session.drain_events() {
            match event {
                SessionEvent::Persist(snapshot) => self.persist(snapshot),
            }
        }
    }

    fn persist(&mut self, snapshot: Snapshot) {
        let Some(path) = self.state.source_path.clone() else {
            log::debug!("no record file, skipping save");
            return;
        };
        let record = self.state.to_record(snapshot);
        if let Err(err) = save_record(&path, &record) {
            log::warn!("persistence failed (ignored): {err}");
            self.status = format!("Save failed: {err}");
        }
    }

    fn toggle_marking(&mut self) {
        if let Err(err) = self.state.session.toggle_marking() {
            self.status = err.to_string();
        }
    }

    fn clear_all(&mut self) {
        match self.state.session.clear_all() {
            Ok(_) => self.flush_events(),
            Err(err) => self.status = err.to_string(),
        }
    }

    fn delete_marker(&mut self, id: &MarkerId) {
        match self.state.session.delete_marker(id) {
            Ok(_) => self.flush_events(),
            Err(err) => self.status = err.to_string(),
        }
    }

    fn can_render(&self) -> bool {
        !self.rendering && !self.state.session.is_read_only()
    }

    fn run_render(&mut self) {
        if !self.can_render() {
            return;
        }
        let subject = self.state.subject();
        let Some(subject) = persisted_subject_id(subject.as_deref()).map(str::to_string) else {
            self.render_status =
                "Please save the car first before generating the damage report image".to_string();
            return;
        };
        let Some(path) = self.state.source_path.clone() else {
            self.render_status = "Save the record to a file first".to_string();
            return;
        };

        // CLIはファイルから読むので、現在の内容を先に書いておく
        let snapshot = self.state.session.begin_render_save();
        self.persist(snapshot);

        let cli = resolve_cli_binary();
        let (tx, rx) = mpsc::channel();
        self.render_rx = Some(rx);
        self.rendering = true;
        self.render_status = "Generating report image...".to_string();

        std::thread::spawn(move || {
            let result = std::process::Command::new(cli)
                .args([
                    "render",
                    path.to_string_lossy().as_ref(),
                    "--subject",
                    subject.as_str(),
                    "--json",
                ])
                .output();

            let result = match result {
                Ok(out) if out.status.success() => {
                    let stdout = String::from_utf8_lossy(&out.stdout);
                    serde_json::from_str::<RenderedReport>(stdout.trim())
                        .map_err(|err| format!("unexpected output: {err}"))
                }
                Ok(out) => {
                    let stderr = String::from_utf8_lossy(&out.stderr);
                    Err(stderr.trim().to_string())
                }
                Err(err) => Err(err.to_string()),
            };
            let _ = tx.send(UiMessage::RenderDone { result });
        });
    }

    fn poll_messages(&mut self) {
        if let Some(rx) = &self.render_rx {
            if let Ok(UiMessage::RenderDone { result }) = rx.try_recv() {
                self.rendering = false;
                self.render_rx = None;
                self.state.session.finish_render_save();
                match result {
                    Ok(report) => {
                        self.render_status = format!("Report generated: {}", report.file_name);
                        log::info!("damage report image generated: {}", report.image_url);
                        self.last_report = Some(report);
                    }
                    Err(message) => {
                        self.render_status = format!("Report failed: {message}");
                    }
                }
            }
        }

        if let Some(rx) = &self.diagram_rx {
            if let Ok(UiMessage::DiagramLoaded { result }) = rx.try_recv() {
                self.diagram_rx = None;
                match result {
                    Ok(data) => self.pending_diagram = Some(data),
                    Err(message) => self.status = format!("Diagram load failed: {message}"),
                }
            }
        }
    }

    fn process_pending_diagram(&mut self, ctx: &egui::Context) {
        let Some(data) = self.pending_diagram.take() else {
            return;
        };
        if data.size[0] == 0 || data.size[1] == 0 {
            return;
        }
        let color_image = egui::ColorImage::from_rgba_unmultiplied(data.size, &data.pixels);
        let texture = ctx.load_texture(&data.path, color_image, egui::TextureOptions::default());
        self.diagram = Some(texture);
        self.status = format!("Diagram {}", data.path);
    }

    fn render_diagram(&mut self, ui: &mut egui::Ui) {
        let width = ui.available_width().max(1.0);
        let height = width * (CANVAS_HEIGHT / CANVAS_WIDTH) as f32;
        let (response, painter) =
            ui.allocate_painter(egui::vec2(width, height), egui::Sense::click_and_drag());
        let rect = response.rect;
        self.state.session.resize_surface(ScreenRect::new(
            rect.left() as f64,
            rect.top() as f64,
            rect.width() as f64,
            rect.height() as f64,
        ));

        match &self.diagram {
            Some(texture) => {
                let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
                painter.image(texture.id(), rect, uv, Color32::WHITE);
            }
            None => {
                painter.rect_filled(rect, 6.0, Color32::from_gray(235));
                painter.text(
                    rect.center(),
                    egui::Align2::CENTER_CENTER,
                    "Open a vehicle diagram image (File > Open Diagram)",
                    egui::FontId::proportional(14.0),
                    Color32::from_gray(120),
                );
            }
        }

        let scale = (rect.width() as f64 / CANVAS_WIDTH) as f32;
        let surface = self.state.session.surface();
        for marker in self.state.session.store().iter() {
            let Some(center) = surface.to_screen(CanvasPoint::new(marker.x, marker.y)) else {
                continue;
            };
            let center = egui::pos2(center.x as f32, center.y as f32);
            let [r, g, b] = marker.severity.color_rgb();
            let color = Color32::from_rgb(r, g, b);
            let selected = self
                .state
                .session
                .form()
                .and_then(|form| form.marker_id.as_ref())
                == Some(&marker.id);

            painter.circle(
                center,
                MARKER_RADIUS as f32 * scale,
                color.gamma_multiply(0.35),
                egui::Stroke::new(if selected { 4.0 } else { 2.0 }, color),
            );
            painter.text(
                center,
                egui::Align2::CENTER_CENTER,
                marker.damage_type.code(),
                egui::FontId::proportional((14.0 * scale).max(9.0)),
                Color32::WHITE,
            );
        }

        // 新規フォームの位置
        if let Some(form) = self.state.session.form().filter(|form| form.is_new()) {
            if let Some(center) = surface.to_screen(CanvasPoint::new(form.x, form.y)) {
                painter.circle_stroke(
                    egui::pos2(center.x as f32, center.y as f32),
                    MARKER_RADIUS as f32 * scale,
                    egui::Stroke::new(2.0, Color32::from_rgb(59, 130, 246)),
                );
            }
        }

        let stroke: Vec<egui::Pos2> = surface
            .stroke()
            .iter()
            .filter_map(|point| surface.to_screen(*point))
            .map(|pos| egui::pos2(pos.x as f32, pos.y as f32))
            .collect();
        if stroke.len() > 1 {
            painter.add(egui::Shape::line(
                stroke,
                egui::Stroke::new(3.0, Color32::from_rgb(59, 130, 246)),
            ));
        }

        self.handle_diagram_input(ui, &response);
    }

    fn handle_diagram_input(&mut self, ui: &egui::Ui, response: &egui::Response) {
        let (pressed, released, pointer) = ui.input(|i| {
            (
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
                i.pointer.interact_pos(),
            )
        });
        let pos = pointer.map(|p| ScreenPos::new(p.x as f64, p.y as f64));
        let inside = pointer.is_some_and(|p| response.rect.contains(p));
        let session = &mut self.state.session;

        if session.state() == MarkingState::Marking {
            let frame = FramePointer {
                pressed,
                released,
                pos,
                inside,
            };
            if route_pointer(session, frame, self.last_pointer) {
                log::debug!("damage form opened");
            }
        } else if session.state() == MarkingState::Idle && response.clicked() {
            let hit = pos
                .and_then(|pos| session.surface().to_canvas(pos))
                .and_then(|point| session.store().hit_test(point, MARKER_RADIUS))
                .map(|marker| marker.id.clone());
            if let Some(id) = hit {
                if let Err(err) = session.select_marker(&id) {
                    self.status = err.to_string();
                }
            }
        }
        self.last_pointer = pos;
    }

    fn render_form(&mut self, ctx: &egui::Context) {
        let Some(form) = self.state.session.form() else {
            return;
        };
        let title = format!("{} Damage", form.verb());
        let marker_id = form.marker_id.clone();
        let required = self.state.policy == DescriptionPolicy::Required;
        let mut action = None;

        egui::Window::new(title)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                let Some(form) = self.state.session.form_mut() else {
                    return;
                };
                ui.label(
                    RichText::new(format!("Position ({:.0}, {:.0})", form.x, form.y))
                        .color(Color32::from_gray(140)),
                );

                egui::Grid::new("damage_form").num_columns(2).show(ui, |ui| {
                    ui.label("Damage Type");
                    egui::ComboBox::from_id_source("damage_type")
                        .selected_text(form.damage_type.label())
                        .width(220.0)
                        .show_ui(ui, |ui| {
                            for damage_type in DamageType::ALL {
                                ui.selectable_value(
                                    &mut form.damage_type,
                                    damage_type,
                                    damage_type.label(),
                                );
                            }
                        });
                    ui.end_row();

                    ui.label("Severity");
                    egui::ComboBox::from_id_source("severity")
                        .selected_text(form.severity.as_str())
                        .show_ui(ui, |ui| {
                            for severity in Severity::ALL {
                                ui.selectable_value(
                                    &mut form.severity,
                                    severity,
                                    severity.as_str(),
                                );
                            }
                        });
                    ui.end_row();

                    ui.label(if required { "Description *" } else { "Description" });
                    ui.add(
                        egui::TextEdit::multiline(&mut form.description)
                            .desired_rows(3)
                            .hint_text("Describe the damage..."),
                    );
                    ui.end_row();
                });

                let can_commit = self.state.session.can_commit();
                ui.separator();
                ui.horizontal(|ui| {
                    if ui.add_enabled(can_commit, egui::Button::new("Save")).clicked() {
                        action = Some(FormAction::Save);
                    }
                    if ui.button("Cancel").clicked() {
                        action = Some(FormAction::Cancel);
                    }
                    if let Some(id) = &marker_id {
                        if ui
                            .button(RichText::new("Delete").color(Color32::from_rgb(220, 38, 38)))
                            .clicked()
                        {
                            action = Some(FormAction::Delete(id.clone()));
                        }
                    }
                });
            });

        match action {
            Some(FormAction::Save) => match self.state.session.commit() {
                Ok(id) => {
                    self.status = format!("Saved {id}");
                    self.flush_events();
                }
                Err(err) => self.status = err.to_string(),
            },
            Some(FormAction::Cancel) => {
                let _ = self.state.session.cancel();
            }
            Some(FormAction::Delete(id)) => {
                let _ = self.state.session.cancel();
                self.delete_marker(&id);
            }
            None => {}
        }
    }

    fn render_notes(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("Inspection Notes");
            if self.state.session.notes().is_saving() {
                ui.spinner();
                ui.label(RichText::new("Saving...").color(Color32::from_gray(140)));
            }
        });
        ui.separator();

        let read_only = self.state.session.is_read_only();
        let mut text = self.state.session.notes().text().to_string();
        let edit = egui::TextEdit::multiline(&mut text)
            .desired_rows(18)
            .desired_width(f32::INFINITY)
            .font(egui::TextStyle::Monospace)
            .hint_text("Notes are generated from the damage markers.");
        if ui.add_enabled(!read_only, edit).changed() {
            if let Err(err) = self.state.session.edit_notes(text) {
                self.status = err.to_string();
            }
        }

        let notes = self.state.session.notes();
        let color = if notes.is_over_limit() {
            Color32::from_rgb(220, 38, 38)
        } else {
            Color32::from_gray(140)
        };
        ui.label(RichText::new(notes.limit_label()).color(color).size(12.0));
    }

    fn render_marker_list(&mut self, ui: &mut egui::Ui) {
        ui.heading("Damage");
        ui.label(format!("{} markers", self.state.session.store().len()));
        ui.separator();

        let idle = self.state.session.state() == MarkingState::Idle;
        let editable = idle && !self.state.session.is_read_only();
        let markers: Vec<_> = self.state.session.store().iter().cloned().collect();
        let mut edit = None;
        let mut delete = None;

        egui::ScrollArea::vertical().max_height(220.0).show(ui, |ui| {
            for marker in &markers {
                let [r, g, b] = marker.severity.color_rgb();
                ui.horizontal(|ui| {
                    ui.label(RichText::new("●").color(Color32::from_rgb(r, g, b)));
                    ui.label(format!("{} {}", marker.id, marker.damage_type.label()));
                    ui.label(
                        RichText::new(marker.severity.as_str()).color(Color32::from_gray(140)),
                    );
                    if ui.add_enabled(editable, egui::Button::new("Edit")).clicked() {
                        edit = Some(marker.id.clone());
                    }
                    if ui.add_enabled(editable, egui::Button::new("Delete")).clicked() {
                        delete = Some(marker.id.clone());
                    }
                });
                if !marker.description.is_empty() {
                    ui.label(
                        RichText::new(&marker.description)
                            .size(12.0)
                            .color(Color32::from_gray(160)),
                    );
                }
            }
        });

        if let Some(id) = edit {
            if let Err(err) = self.state.session.select_marker(&id) {
                self.status = err.to_string();
            }
        }
        if let Some(id) = delete {
            self.delete_marker(&id);
        }
    }
}

pub fn configure_fonts(ctx: &egui::Context) {
    let mut fonts = FontDefinitions::default();
    let candidates = [
        r"C:\Windows\Fonts\meiryo.ttc",
        r"C:\Windows\Fonts\msgothic.ttc",
        "/System/Library/Fonts/Supplemental/Arial Unicode.ttf",
        "/usr/share/fonts/truetype/noto/NotoSansCJK-Regular.ttc",
        "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    ];

    for path in candidates {
        if let Ok(data) = std::fs::read(path) {
            fonts.font_data.insert("jp_fallback".to_string(), FontData::from_owned(data));
            fonts.families
                .entry(FontFamily::Proportional)
                .or_default()
                .insert(0, "jp_fallback".to_string());
            fonts.families
                .entry(FontFamily::Monospace)
                .or_default()
                .insert(0, "jp_fallback".to_string());
            ctx.set_fonts(fonts);
            return;
        }
    }
}

impl Default for DesktopApp {
    fn default() -> Self {
        Self::with_state(AppState::with_policy(load_description_policy()))
    }
}

impl DesktopApp {
    fn with_state(state: AppState) -> Self {
        Self {
            state,
            status: String::new(),
            render_status: String::new(),
            render_rx: None,
            rendering: false,
            diagram: None,
            diagram_rx: None,
            pending_diagram: None,
            last_pointer: None,
            last_report: None,
        }
    }
}

impl eframe::App for DesktopApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.rendering || self.diagram_rx.is_some() {
            ctx.request_repaint();
        }
        self.poll_messages();
        self.process_pending_diagram(ctx);

        let read_only = self.state.session.is_read_only();
        let state = self.state.session.state();
        let form_open = matches!(
            state,
            MarkingState::AwaitingDetails | MarkingState::EditingExisting
        );

        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open Record").clicked() {
                        self.open_record();
                        ui.close_menu();
                    }
                    if ui.button("Save Record As").clicked() {
                        self.save_record_as();
                        ui.close_menu();
                    }
                    if ui.button("Open Diagram").clicked() {
                        self.open_diagram();
                        ui.close_menu();
                    }
                });

                ui.menu_button("View", |ui| {
                    let mut view_only = read_only;
                    let toggle = egui::Checkbox::new(&mut view_only, "Read Only");
                    if ui.add_enabled(!form_open, toggle).changed() {
                        self.state.set_read_only(view_only);
                    }
                });

                ui.separator();
                ui.label("Car ID");
                ui.add(egui::TextEdit::singleline(&mut self.state.subject_id).desired_width(140.0));

                ui.separator();
                if !self.render_status.is_empty() {
                    ui.label(
                        RichText::new(&self.render_status).color(Color32::from_rgb(246, 196, 69)),
                    );
                }
                if !self.status.is_empty() {
                    ui.label(RichText::new(&self.status).color(Color32::from_gray(170)));
                }
            });
        });

        egui::SidePanel::right("notes").resizable(true).min_width(320.0).show(ctx, |ui| {
            self.render_marker_list(ui);
            ui.add_space(12.0);
            self.render_notes(ui);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Damage Marking");
                ui.add_space(12.0);

                let marking = state == MarkingState::Marking;
                let label = if marking { "Stop Marking" } else { "Mark Damage" };
                let button = egui::Button::new(label).fill(if marking {
                    Color32::from_rgb(220, 38, 38)
                } else {
                    Color32::from_rgb(37, 99, 235)
                });
                if ui.add_enabled(!read_only && !form_open, button).clicked() {
                    self.toggle_marking();
                }

                let can_clear = !read_only
                    && state == MarkingState::Idle
                    && !self.state.session.store().is_empty();
                if ui.add_enabled(can_clear, egui::Button::new("Clear All")).clicked() {
                    self.clear_all();
                }

                if !read_only {
                    let render_label =
                        if self.rendering { "Generating..." } else { "Generate Report" };
                    let button = egui::Button::new(render_label);
                    if ui.add_enabled(self.can_render(), button).clicked() {
                        self.run_render();
                    }
                }
                if self.rendering {
                    ui.spinner();
                }
            });

            if state == MarkingState::Marking {
                ui.label(
                    RichText::new("Click or drag on the diagram to place a damage marker.")
                        .color(Color32::from_rgb(37, 99, 235)),
                );
            }
            if let Some(report) = &self.last_report {
                ui.horizontal(|ui| {
                    ui.label("Report:");
                    ui.hyperlink_to(report.file_name.as_str(), report.image_url.as_str());
                });
            }
            ui.separator();

            self.render_diagram(ui);

            ui.add_space(8.0);
            ui.horizontal_wrapped(|ui| {
                for severity in Severity::ALL {
                    let [r, g, b] = severity.color_rgb();
                    ui.label(RichText::new("●").color(Color32::from_rgb(r, g, b)));
                    ui.label(severity.as_str());
                }
            });
        });

        self.render_form(ctx);
    }
}

/// 1フレーム分のポインタ状態
#[derive(Debug, Clone, Copy)]
struct FramePointer {
    pressed: bool,
    released: bool,
    pos: Option<ScreenPos>,
    inside: bool,
}

/// ポインタ入力を図面へ流す。フォームが開いたら true
///
/// 押下と解放が同じフレームに来た場合は Down → Up の順に両方流す。
fn route_pointer(
    session: &mut MarkingSession,
    frame: FramePointer,
    last_pointer: Option<ScreenPos>,
) -> bool {
    let mut opened = false;

    if let Some(pos) = frame.pos {
        if frame.pressed && frame.inside {
            opened |= session.handle_pointer(PointerEvent::Down(pos));
        }
        if frame.released {
            opened |= session.handle_pointer(PointerEvent::Up(pos));
        }
    }

    if session.surface().is_drawing() {
        if !frame.inside {
            opened |= session.handle_pointer(PointerEvent::Leave(None));
        } else if let Some(pos) = frame.pos {
            if !frame.pressed && last_pointer != Some(pos) {
                opened |= session.handle_pointer(PointerEvent::Move(pos));
            }
        }
    }
    opened
}

fn resolve_cli_binary() -> PathBuf {
    let file_name = format!("damage-report{}", std::env::consts::EXE_SUFFIX);
    let exe = std::env::current_exe().ok();
    if let Some(base_dir) = exe.as_ref().and_then(|p| p.parent()) {
        let local = base_dir.join(&file_name);
        if local.exists() {
            return local;
        }
        if let Some(target_dir) = base_dir.parent() {
            for profile in ["debug", "release"] {
                let sibling = target_dir.join(profile).join(&file_name);
                if sibling.exists() {
                    return sibling;
                }
            }
        }
    }
    PathBuf::from("damage-report")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marking_session() -> MarkingSession {
        let mut session = MarkingSession::new(Default::default());
        session.resize_surface(ScreenRect::new(0.0, 0.0, 1000.0, 400.0));
        session.toggle_marking().unwrap();
        session
    }

    fn frame(pressed: bool, released: bool, x: f64, y: f64) -> FramePointer {
        FramePointer {
            pressed,
            released,
            pos: Some(ScreenPos::new(x, y)),
            inside: true,
        }
    }

    #[test]
    fn test_press_and_release_in_one_frame_opens_form() {
        let mut session = marking_session();

        assert!(route_pointer(&mut session, frame(true, true, 500.0, 200.0), None));
        assert!(!session.surface().is_drawing());
        let form = session.form().unwrap();
        assert_eq!((form.x, form.y), (1015.0, 383.0));
    }

    #[test]
    fn test_drag_across_frames_opens_form_at_release() {
        let mut session = marking_session();

        assert!(!route_pointer(&mut session, frame(true, false, 100.0, 100.0), None));
        assert!(session.surface().is_drawing());
        let last = Some(ScreenPos::new(100.0, 100.0));
        assert!(!route_pointer(&mut session, frame(false, false, 200.0, 100.0), last));
        assert_eq!(session.surface().stroke().len(), 2);

        let last = Some(ScreenPos::new(200.0, 100.0));
        assert!(route_pointer(&mut session, frame(false, true, 300.0, 100.0), last));
        assert!(session.form().is_some());
    }

    #[test]
    fn test_leaving_diagram_while_drawing_opens_form() {
        let mut session = marking_session();
        route_pointer(&mut session, frame(true, false, 100.0, 100.0), None);

        let outside = FramePointer {
            pressed: false,
            released: false,
            pos: Some(ScreenPos::new(1200.0, 100.0)),
            inside: false,
        };
        assert!(route_pointer(&mut session, outside, Some(ScreenPos::new(100.0, 100.0))));
        assert!(!session.surface().is_drawing());
    }

    #[test]
    fn test_resolve_cli_binary_falls_back_to_path() {
        let resolved = resolve_cli_binary();
        let name = resolved.file_name().and_then(|s| s.to_str()).unwrap_or_default();
        assert!(name.starts_with("damage-report"));
    }

    #[test]
    fn test_render_without_subject_does_not_spawn() {
        let mut app = DesktopApp::with_state(AppState::default());
        app.run_render();
        assert!(!app.rendering);
        assert!(app.render_rx.is_none());
        assert!(app.render_status.contains("save the car first"));
    }

    #[test]
    fn test_read_only_does_not_render_or_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("car.json");
        let mut app = DesktopApp::with_state(AppState::default());
        app.state.subject_id = "car-1".to_string();
        app.state.source_path = Some(path.clone());
        app.state.set_read_only(true);

        assert!(!app.can_render());
        app.run_render();
        assert!(!app.rendering);
        assert!(!app.state.session.notes().is_saving());
        assert!(!path.exists());
    }

    #[test]
    fn test_placeholder_subject_does_not_spawn() {
        let mut app = DesktopApp::with_state(AppState::default());
        app.state.subject_id = "temp-car-id".to_string();
        app.state.source_path = Some(PathBuf::from("car.json"));
        app.run_render();
        assert!(!app.rendering);
    }
}

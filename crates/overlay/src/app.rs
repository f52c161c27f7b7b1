use std::time::{Instant, SystemTime};

use channel::Paths;
use eframe::egui::{
    self, pos2, vec2, Align2, Color32, ColorImage, FontId, Pos2, Rect, Stroke, TextureHandle,
    TextureOptions, ViewportCommand,
};
use tracing::info;

use crate::bubble::{box_height, box_width, wrap_words, PADDING};
use crate::config::OverlayConfig;
use crate::drag::DragState;
use crate::sprite;
use crate::state::{OverlayState, Step};

pub const TITLE: &str = "Aria Avatar";
pub const WINDOW_SIZE: [f32; 2] = [450.0, 550.0];

const SPRITE_TOP: f32 = 150.0;
const BUBBLE_TOP: f32 = 20.0;
const BUBBLE_FILL: Color32 = Color32::from_rgba_premultiplied(28, 28, 28, 240);
const BUBBLE_BORDER: Color32 = Color32::from_rgba_premultiplied(78, 78, 78, 200);
const SHADOW: Color32 = Color32::from_rgba_premultiplied(0, 0, 0, 50);
const FALLBACK_FILL: Color32 = Color32::from_rgba_premultiplied(150, 107, 113, 150);

/// Frameless, always-on-top, transparent window for the avatar.
pub fn native_options() -> eframe::NativeOptions {
    eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(TITLE)
            .with_inner_size(WINDOW_SIZE)
            .with_resizable(false)
            .with_decorations(false)
            .with_always_on_top()
            .with_transparent(true)
            .with_taskbar(false),
        ..Default::default()
    }
}

pub struct OverlayApp {
    state: OverlayState,
    sheet: Option<TextureHandle>,
    drag: DragState,
    margin: f32,
    placed: bool,
}

impl OverlayApp {
    pub fn new(cc: &eframe::CreationContext<'_>, paths: &Paths, config: OverlayConfig) -> Self {
        let exe_dir = channel::exe_directory();
        let candidates = sprite::candidate_paths(
            config.sprite_sheet.as_deref(),
            exe_dir.as_deref(),
            &paths.plugin_dir,
        );
        let sheet = match sprite::load_first(&candidates) {
            Some((path, image)) => {
                info!("Loaded sprite sheet {}", path.display());
                Some(upload(&cc.egui_ctx, image))
            }
            None => {
                info!("No sprite sheet found, drawing text avatar");
                None
            }
        };

        Self {
            margin: config.margin,
            state: OverlayState::new(paths, config, Instant::now()),
            sheet,
            drag: DragState::default(),
            placed: false,
        }
    }

    /// Move to the bottom-right corner once the monitor size is known.
    fn place(&mut self, ctx: &egui::Context) {
        if self.placed {
            return;
        }
        let Some(monitor) = ctx.input(|i| i.viewport().monitor_size) else {
            return;
        };
        let pos = pos2(
            monitor.x - WINDOW_SIZE[0] - self.margin,
            monitor.y - WINDOW_SIZE[1] - self.margin,
        );
        ctx.send_viewport_cmd(ViewportCommand::OuterPosition(pos));
        self.placed = true;
    }

    fn handle_drag(&mut self, ctx: &egui::Context) {
        let (pressed, released, pointer, window) = ctx.input(|i| {
            let window = i.viewport().outer_rect.map(|r| r.min);
            let pointer = i.pointer.latest_pos();
            (i.pointer.primary_pressed(), i.pointer.primary_released(), pointer, window)
        });
        let (Some(pointer), Some(window)) = (pointer, window) else {
            return;
        };
        // Pointer positions are window-local; the drag works in screen space.
        let screen = window + pointer.to_vec2();

        if pressed {
            self.drag.press(screen, window);
        } else if released {
            self.drag.release();
        } else if let Some(target) = self.drag.move_to(screen) {
            if target != window {
                ctx.send_viewport_cmd(ViewportCommand::OuterPosition(target));
            }
        }
    }

    fn draw(&self, ui: &egui::Ui) {
        let painter = ui.painter();
        let origin = ui.max_rect().min;

        if let Some(text) = self.state.bubble_text() {
            draw_bubble(painter, origin, text);
        }

        let frame = self.state.emotion().frame();
        match &self.sheet {
            Some(texture) => {
                let size = sprite::frame_display_size(texture.size());
                let min = origin + vec2((WINDOW_SIZE[0] - size.x) / 2.0, SPRITE_TOP);
                painter.image(
                    texture.id(),
                    Rect::from_min_size(min, size),
                    sprite::frame_uv(frame),
                    Color32::WHITE,
                );
            }
            None => {
                let size = vec2(sprite::DISPLAY_SIZE, sprite::DISPLAY_SIZE);
                let min = origin + vec2((WINDOW_SIZE[0] - size.x) / 2.0, SPRITE_TOP);
                let rect = Rect::from_min_size(min, size);
                painter.rect_filled(rect, 20.0, FALLBACK_FILL);
                painter.text(
                    rect.center(),
                    Align2::CENTER_CENTER,
                    "ARIA",
                    FontId::proportional(24.0),
                    Color32::WHITE,
                );
            }
        }
    }
}

impl eframe::App for OverlayApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.place(ctx);
        self.handle_drag(ctx);

        let now = Instant::now();
        match self.state.step(now, SystemTime::now()) {
            Step::Exit(_) => {
                ctx.send_viewport_cmd(ViewportCommand::Close);
                return;
            }
            Step::Running { repaint: true } => ctx.request_repaint(),
            Step::Running { repaint: false } => {}
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| self.draw(ui));

        if !self.drag.is_dragging() {
            let wait = self.state.next_wakeup().saturating_duration_since(now);
            ctx.request_repaint_after(wait);
        }
    }

    fn clear_color(&self, _visuals: &egui::Visuals) -> [f32; 4] {
        egui::Rgba::TRANSPARENT.to_array()
    }
}

fn upload(ctx: &egui::Context, image: ColorImage) -> TextureHandle {
    ctx.load_texture("aria-sprites", image, TextureOptions::LINEAR)
}

fn draw_bubble(painter: &egui::Painter, origin: Pos2, text: &str) {
    let font = FontId::proportional(16.0);
    let width = box_width(text.chars().count());
    let measure = |s: &str| {
        painter
            .layout_no_wrap(s.to_owned(), font.clone(), Color32::WHITE)
            .size()
            .x
    };
    let lines = wrap_words(text, width - PADDING * 2.0, measure);
    let line_height = painter.ctx().fonts(|f| f.row_height(&font)) + 2.0;
    let height = box_height(lines.len(), line_height);

    // Wide boxes overhang the window edge rather than shrink.
    let left = ((WINDOW_SIZE[0] - width) / 2.0).max(-15.0);
    let rect = Rect::from_min_size(origin + vec2(left, BUBBLE_TOP), vec2(width, height));

    painter.rect_filled(rect.translate(vec2(2.0, 2.0)), 0.0, SHADOW);
    painter.rect_filled(rect, 0.0, BUBBLE_FILL);
    painter.rect_stroke(rect, 0.0, Stroke::new(1.0, BUBBLE_BORDER));

    let mut cursor = rect.min + vec2(PADDING, PADDING);
    for line in lines {
        if cursor.y + line_height > rect.max.y {
            break;
        }
        painter.text(cursor, Align2::LEFT_TOP, line, font.clone(), Color32::WHITE);
        cursor.y += line_height;
    }
}

use std::path::{Path, PathBuf};

use eframe::egui::{pos2, vec2, ColorImage, Rect, Vec2};

pub const COLUMNS: usize = 5;
pub const ROWS: usize = 2;
/// On-screen size of one frame, before aspect correction.
pub const DISPLAY_SIZE: f32 = 350.0;

/// Places the sprite sheet is looked for, most specific first.
pub fn candidate_paths(
    configured: Option<&Path>,
    exe_dir: Option<&Path>,
    plugin_dir: &Path,
) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    paths.extend(configured.map(Path::to_path_buf));
    paths.extend(exe_dir.map(|d| d.join("sprites").join("aria.png")));
    paths.push(plugin_dir.join("sprites").join("aria.png"));
    paths.push(plugin_dir.join("sprites").join("companion_sprites.png"));
    paths
}

/// Decode the first readable sheet among `candidates`.
pub fn load_first(candidates: &[PathBuf]) -> Option<(PathBuf, ColorImage)> {
    for path in candidates.iter().filter(|p| p.exists()) {
        match load_sheet(path) {
            Ok(image) => return Some((path.clone(), image)),
            Err(e) => tracing::warn!("Cannot load sprite sheet {}: {e}", path.display()),
        }
    }
    None
}

pub fn load_sheet(path: &Path) -> Result<ColorImage, image::ImageError> {
    let rgba = image::open(path)?.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    Ok(ColorImage::from_rgba_unmultiplied(size, rgba.as_raw()))
}

/// Normalized texture coordinates of `frame` in the sheet, row-major.
pub fn frame_uv(frame: usize) -> Rect {
    let frame = frame % (COLUMNS * ROWS);
    let (col, row) = (frame % COLUMNS, frame / COLUMNS);
    let (w, h) = (1.0 / COLUMNS as f32, 1.0 / ROWS as f32);
    Rect::from_min_size(pos2(col as f32 * w, row as f32 * h), vec2(w, h))
}

/// Scale one cell of a `sheet` sized image into a `DISPLAY_SIZE` square,
/// keeping its aspect ratio.
pub fn frame_display_size(sheet: [usize; 2]) -> Vec2 {
    let cell = vec2(
        sheet[0] as f32 / COLUMNS as f32,
        sheet[1] as f32 / ROWS as f32,
    );
    if cell.x <= 0.0 || cell.y <= 0.0 {
        return Vec2::splat(DISPLAY_SIZE);
    }
    let scale = (DISPLAY_SIZE / cell.x).min(DISPLAY_SIZE / cell.y);
    cell * scale
}

use eframe::egui::ColorImage;

/// Downloads and decodes the thumbnail reported by the engine metadata.
/// Any network or decode failure just leaves the UI without a thumbnail.
pub fn fetch_thumbnail(url: &str) -> Option<ColorImage> {
    // Blocking GET; callers run this on a blocking task off the UI thread
    let resp = reqwest::blocking::get(url).ok()?.bytes().ok()?;
    // Decode into RGBA8 for egui
    let img = image::load_from_memory(&resp).ok()?.to_rgba8();
    let size = [img.width() as usize, img.height() as usize];
    Some(ColorImage::from_rgba_unmultiplied(size, &img))
}

use super::process::{render_command, ProcessOutput};
use super::{ActiveOutput, OutputError};
use crate::kernel::emotion::Emotion;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy)]
pub struct MemeCard<'a> {
    pub emotion: Emotion,
    pub path: &'a Path,
}

impl MemeCard<'_> {
    pub fn title(&self) -> String {
        format!("{} DETECTED!", self.emotion.as_str().to_uppercase())
    }

    pub fn caption(&self) -> String {
        format!("You look {}!", self.emotion)
    }
}

/// Opens a transient surface for a meme. The returned handle closes it.
pub trait Presenter: Send {
    fn present(&self, card: &MemeCard<'_>) -> Result<Box<dyn ActiveOutput>, OutputError>;
}

/// Shrink-to-fit keeping aspect ratio. Never upscales, never returns a zero side.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (max_width.max(1), max_height.max(1));
    }
    let scale = (max_width as f64 / width as f64)
        .min(max_height as f64 / height as f64)
        .min(1.0);
    let w = ((width as f64 * scale).round() as u32).max(1);
    let h = ((height as f64 * scale).round() as u32).max(1);
    (w, h)
}

/// Viewer process per meme. Template placeholders: `{path}`, `{title}`,
/// `{caption}`, `{width}`, `{height}`, `{emotion}`.
#[derive(Debug, Clone)]
pub struct CommandPresenter {
    template: Vec<String>,
    surface_max: (u32, u32),
}

impl CommandPresenter {
    pub fn new(template: Vec<String>, surface_max: (u32, u32)) -> Self {
        Self { template, surface_max }
    }

    pub fn argv(&self, card: &MemeCard<'_>, size: (u32, u32)) -> Vec<String> {
        render_command(
            &self.template,
            &[
                ("path", card.path.display().to_string()),
                ("title", card.title()),
                ("caption", card.caption()),
                ("width", size.0.to_string()),
                ("height", size.1.to_string()),
                ("emotion", card.emotion.to_string()),
            ],
        )
    }
}

impl Presenter for CommandPresenter {
    fn present(&self, card: &MemeCard<'_>) -> Result<Box<dyn ActiveOutput>, OutputError> {
        let (w, h) = image::image_dimensions(card.path).map_err(|e| OutputError::Image {
            path: card.path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let size = fit_within(w, h, self.surface_max.0, self.surface_max.1);

        let output = ProcessOutput::spawn(&self.argv(card, size))?;
        info!(
            meme = %card.path.display(),
            width = size.0,
            height = size.1,
            "{}",
            card.caption()
        );
        Ok(Box::new(output))
    }
}

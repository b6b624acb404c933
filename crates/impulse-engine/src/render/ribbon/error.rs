use std::fmt;

use crate::gfx::ShaderStage;

/// Errors raised while setting up or feeding a [`RibbonRenderer`](super::RibbonRenderer).
///
/// Per-frame operations never return these; they log and carry on.
#[derive(Debug, Clone, PartialEq)]
pub enum RibbonError {
    /// The scaled texture width came out non-positive, so `u` would divide by zero.
    ZeroAreaTexture { key: String, scaled_width: f32 },
    /// The world vertical span produced a non-positive ribbon extent.
    ZeroVerticalExtent { extent: f32 },
    /// No shader source registered under `id`.
    MissingShaderSource { id: String },
    /// Source `id` exists but is registered for the other stage.
    WrongShaderStage { id: String, expected: ShaderStage },
    /// The context cannot back the renderer (buffer or texture creation refused).
    UnsupportedContext { reason: String },
    ShaderCompile { stage: ShaderStage, log: String },
    ProgramLink { log: String },
    /// The texture source has no entry for `key` (or for `frame` within it).
    TextureNotFound { key: String, frame: Option<String> },
    /// More vertices than a u16 index can address.
    IndexRangeExhausted { vertices: usize },
    TextureDecode { source: String, message: String },
}

impl RibbonError {
    /// `true` for errors caused by bad inputs or setup rather than the device.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            RibbonError::ZeroAreaTexture { .. }
                | RibbonError::ZeroVerticalExtent { .. }
                | RibbonError::MissingShaderSource { .. }
                | RibbonError::WrongShaderStage { .. }
                | RibbonError::IndexRangeExhausted { .. }
        )
    }
}

impl fmt::Display for RibbonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RibbonError::ZeroAreaTexture { key, scaled_width } => {
                write!(f, "texture '{key}' has non-positive scaled width {scaled_width}")
            }
            RibbonError::ZeroVerticalExtent { extent } => {
                write!(f, "ribbon vertical extent {extent} is not positive")
            }
            RibbonError::MissingShaderSource { id } => write!(f, "no shader source named '{id}'"),
            RibbonError::WrongShaderStage { id, expected } => {
                write!(f, "shader '{id}' is not a {} shader", expected.label())
            }
            RibbonError::UnsupportedContext { reason } => {
                write!(f, "graphics context unsupported: {reason}")
            }
            RibbonError::ShaderCompile { stage, log } => {
                write!(f, "{} shader failed to compile: {log}", stage.label())
            }
            RibbonError::ProgramLink { log } => write!(f, "program failed to link: {log}"),
            RibbonError::TextureNotFound { key, frame: Some(frame) } => {
                write!(f, "texture '{key}' has no frame '{frame}'")
            }
            RibbonError::TextureNotFound { key, frame: None } => {
                write!(f, "texture '{key}' not found")
            }
            RibbonError::IndexRangeExhausted { vertices } => {
                write!(f, "{vertices} vertices exceed the u16 index range")
            }
            RibbonError::TextureDecode { source, message } => {
                write!(f, "failed to decode texture {source}: {message}")
            }
        }
    }
}

impl std::error::Error for RibbonError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_family() {
        assert!(RibbonError::ZeroVerticalExtent { extent: 0.0 }.is_configuration());
        assert!(RibbonError::MissingShaderSource { id: "shader-vs".into() }.is_configuration());
        assert!(RibbonError::IndexRangeExhausted { vertices: 70_000 }.is_configuration());
        assert!(!RibbonError::ProgramLink { log: String::new() }.is_configuration());
        assert!(!RibbonError::TextureNotFound { key: "tex".into(), frame: None }.is_configuration());
    }

    #[test]
    fn display_names_the_frame() {
        let err = RibbonError::TextureNotFound {
            key: "atlas".into(),
            frame: Some("rainbow".into()),
        };
        assert_eq!(err.to_string(), "texture 'atlas' has no frame 'rainbow'");
    }
}

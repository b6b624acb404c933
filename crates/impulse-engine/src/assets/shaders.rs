use std::collections::HashMap;

use crate::gfx::ShaderStage;
use crate::render::ribbon::RibbonError;

const RIBBON_VERTEX: &str = include_str!("../../shaders/ribbon.vert.wgsl");
const RIBBON_FRAGMENT: &str = include_str!("../../shaders/ribbon.frag.wgsl");

#[derive(Debug, Clone)]
struct ShaderSource {
    stage: ShaderStage,
    source: String,
}

/// Named shader sources, each tagged with the stage it compiles as.
#[derive(Debug, Clone, Default)]
pub struct ShaderLibrary {
    sources: HashMap<String, ShaderSource>,
}

impl ShaderLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Library holding the built-in ribbon shaders as `shader-vs` / `shader-fs`.
    pub fn with_ribbon_defaults() -> Self {
        let mut lib = Self::new();
        lib.insert("shader-vs", ShaderStage::Vertex, RIBBON_VERTEX);
        lib.insert("shader-fs", ShaderStage::Fragment, RIBBON_FRAGMENT);
        lib
    }

    /// Registers (or replaces) a source.
    pub fn insert(&mut self, id: impl Into<String>, stage: ShaderStage, source: impl Into<String>) {
        self.sources.insert(
            id.into(),
            ShaderSource {
                stage,
                source: source.into(),
            },
        );
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    /// Source registered as `id`, checked against the stage it will be compiled as.
    pub fn fetch(&self, id: &str, stage: ShaderStage) -> Result<&str, RibbonError> {
        let entry = self
            .sources
            .get(id)
            .ok_or_else(|| RibbonError::MissingShaderSource { id: id.to_string() })?;
        if entry.stage != stage {
            return Err(RibbonError::WrongShaderStage {
                id: id.to_string(),
                expected: stage,
            });
        }
        Ok(&entry.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_expose_both_stages() {
        let lib = ShaderLibrary::with_ribbon_defaults();
        assert!(lib.fetch("shader-vs", ShaderStage::Vertex).unwrap().contains("fn vs_main"));
        assert!(lib.fetch("shader-fs", ShaderStage::Fragment).unwrap().contains("fn fs_main"));
    }

    #[test]
    fn fetch_checks_presence_and_stage() {
        let lib = ShaderLibrary::with_ribbon_defaults();
        assert!(matches!(
            lib.fetch("shader-gs", ShaderStage::Vertex),
            Err(RibbonError::MissingShaderSource { .. })
        ));
        assert!(matches!(
            lib.fetch("shader-vs", ShaderStage::Fragment),
            Err(RibbonError::WrongShaderStage { .. })
        ));
    }
}

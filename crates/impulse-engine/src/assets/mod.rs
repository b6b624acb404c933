//! Asset lookup: textures by key (optionally an atlas frame) and shader
//! sources by id.

mod shaders;
mod textures;

pub use shaders::ShaderLibrary;
pub use textures::AssetStore;

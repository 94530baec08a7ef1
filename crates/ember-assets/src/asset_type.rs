//! The closed set of asset variants managed by the lifecycle system.

use std::fmt;

/// Variant tag carried by every asset header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetType {
    Mesh,
    Texture,
    Shader,
    Material,
    Model,
    Font,
    Sprite,
    Sound,
    /// Physics collision solid.
    Solid,
}

impl AssetType {
    /// Every variant, in declaration order.
    pub const ALL: [AssetType; 9] = [
        AssetType::Mesh,
        AssetType::Texture,
        AssetType::Shader,
        AssetType::Material,
        AssetType::Model,
        AssetType::Font,
        AssetType::Sprite,
        AssetType::Sound,
        AssetType::Solid,
    ];

    /// Stable lowercase name, used in logs and leak reports.
    pub const fn name(self) -> &'static str {
        match self {
            AssetType::Mesh => "mesh",
            AssetType::Texture => "texture",
            AssetType::Shader => "shader",
            AssetType::Material => "material",
            AssetType::Model => "model",
            AssetType::Font => "font",
            AssetType::Sprite => "sprite",
            AssetType::Sound => "sound",
            AssetType::Solid => "solid",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_distinct() {
        let mut names: Vec<_> = AssetType::ALL.iter().map(|t| t.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), AssetType::ALL.len());
    }

    #[test]
    fn test_display_matches_name() {
        assert_eq!(AssetType::Solid.to_string(), "solid");
        assert_eq!(format!("{}", AssetType::Texture), "texture");
    }
}

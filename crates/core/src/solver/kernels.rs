//! WGSL kernel sources for the surface stencils

const TILE_SIZE_DECL: &str = "const TILE_SIZE: u32 = 16u;";

/// The three device kernels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelKind {
    /// Procedural wave
    Procedural,
    /// Clamped-edge diffusion pass 1
    Heightfield,
    /// Obstacle-aware diffusion pass 1
    HeightfieldObstacle,
}

impl KernelKind {
    /// Entry point name inside the kernel source
    #[must_use]
    pub fn entry_point(self) -> &'static str {
        match self {
            Self::Procedural => "procedural",
            Self::Heightfield => "heightfield_p1",
            Self::HeightfieldObstacle => "heightfield_obs",
        }
    }

    /// Kernel source as shipped (16x16 work-groups)
    #[must_use]
    pub fn source(self) -> &'static str {
        match self {
            Self::Procedural => include_str!("shaders/procedural.wgsl"),
            Self::Heightfield => include_str!("shaders/heightfield.wgsl"),
            Self::HeightfieldObstacle => include_str!("shaders/heightfield_obstacle.wgsl"),
        }
    }

    /// Kernel source with the work-group edge set to `tile_size`
    #[must_use]
    pub fn source_for_tile(self, tile_size: u32) -> String {
        self.source()
            .replace(TILE_SIZE_DECL, &format!("const TILE_SIZE: u32 = {tile_size}u;"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [KernelKind; 3] = [
        KernelKind::Procedural,
        KernelKind::Heightfield,
        KernelKind::HeightfieldObstacle,
    ];

    #[test]
    fn test_sources_declare_entry_points() {
        for kind in ALL {
            let decl = format!("fn {}(", kind.entry_point());
            assert!(kind.source().contains(&decl), "{kind:?} missing {decl}");
            assert!(kind.source().contains(TILE_SIZE_DECL));
        }
    }

    #[test]
    fn test_tile_size_substitution() {
        let source = KernelKind::Heightfield.source_for_tile(8);
        assert!(source.contains("const TILE_SIZE: u32 = 8u;"));
        assert!(!source.contains(TILE_SIZE_DECL));
    }
}

//! Draw-data model: the per-frame, renderer-agnostic output of the GUI layer
//!
//! A `DrawData` is produced once per frame per viewport by the widget layer
//! and consumed by the presentation backend. It is read-only input whose
//! lifetime spans only the current frame; backends copy its geometry into
//! per-slot GPU buffers before submission and must not retain references
//! past submit.

use glam::Vec2;

/// Opaque texture handle, registered with the backend ahead of time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u64);

/// One GUI vertex: position, UV, packed RGBA color
///
/// 20 bytes, no padding; uploaded verbatim to the vertex buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GuiVertex {
    /// Position in framebuffer-space points
    pub position: Vec2,
    /// Texture coordinates
    pub uv: Vec2,
    /// Packed RGBA color (one byte per channel)
    pub color: u32,
}

/// One draw command: a clipped, textured range of indices
#[derive(Debug, Clone)]
pub struct DrawCmd {
    /// Clip rectangle in framebuffer space: (min_x, min_y, max_x, max_y)
    pub clip_rect: [f32; 4],

    /// Texture bound for this command
    pub texture: TextureId,

    /// First index within the owning list's index array
    pub index_offset: u32,

    /// Number of indices to draw
    pub index_count: u32,

    /// Added to each index value; lets lists with more than 64K vertices
    /// keep 16-bit indices
    pub vertex_offset: i32,
}

/// One draw-command list: a vertex array, an index array, and the commands
/// that consume them
#[derive(Debug, Clone, Default)]
pub struct DrawList {
    /// Vertex payload
    pub vertices: Vec<GuiVertex>,

    /// 16-bit index payload
    pub indices: Vec<u16>,

    /// Draw commands, in submission order
    pub commands: Vec<DrawCmd>,
}

impl DrawList {
    /// Size of the vertex payload in bytes
    pub fn vertex_bytes(&self) -> u64 {
        (self.vertices.len() * std::mem::size_of::<GuiVertex>()) as u64
    }

    /// Size of the index payload in bytes
    pub fn index_bytes(&self) -> u64 {
        (self.indices.len() * std::mem::size_of::<u16>()) as u64
    }
}

/// All draw-command lists for one viewport for one frame
#[derive(Debug, Clone)]
pub struct DrawData {
    /// Draw lists in submission order
    pub lists: Vec<DrawList>,

    /// Top-left of the viewport in framebuffer-space points
    /// (non-zero for secondary viewports)
    pub display_pos: Vec2,

    /// Size of the viewport in points
    pub display_size: Vec2,

    /// Points-to-pixels scale (HiDPI)
    pub framebuffer_scale: Vec2,
}

impl DrawData {
    /// Empty draw data for a viewport of the given size
    pub fn empty(display_size: Vec2) -> Self {
        Self {
            lists: Vec::new(),
            display_pos: Vec2::ZERO,
            display_size,
            framebuffer_scale: Vec2::ONE,
        }
    }

    /// Total vertex count across all lists
    pub fn total_vertex_count(&self) -> usize {
        self.lists.iter().map(|l| l.vertices.len()).sum()
    }

    /// Total index count across all lists
    pub fn total_index_count(&self) -> usize {
        self.lists.iter().map(|l| l.indices.len()).sum()
    }

    /// Total vertex payload in bytes
    pub fn total_vertex_bytes(&self) -> u64 {
        self.lists.iter().map(|l| l.vertex_bytes()).sum()
    }

    /// Total index payload in bytes
    pub fn total_index_bytes(&self) -> u64 {
        self.lists.iter().map(|l| l.index_bytes()).sum()
    }

    /// Whether there is nothing to draw this frame
    pub fn is_empty(&self) -> bool {
        self.total_index_count() == 0
    }
}

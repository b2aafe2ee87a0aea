//! Unit tests for the draw-data model

use glam::Vec2;

use crate::aurora::{DrawCmd, DrawData, DrawList, GuiVertex, TextureId};

fn vertex(x: f32, y: f32) -> GuiVertex {
    GuiVertex {
        position: Vec2::new(x, y),
        uv: Vec2::ZERO,
        color: 0xFFFF_FFFF,
    }
}

fn quad_list(texture: TextureId) -> DrawList {
    DrawList {
        vertices: vec![
            vertex(0.0, 0.0),
            vertex(1.0, 0.0),
            vertex(1.0, 1.0),
            vertex(0.0, 1.0),
        ],
        indices: vec![0, 1, 2, 0, 2, 3],
        commands: vec![DrawCmd {
            clip_rect: [0.0, 0.0, 1.0, 1.0],
            texture,
            index_offset: 0,
            index_count: 6,
            vertex_offset: 0,
        }],
    }
}

#[test]
fn test_vertex_layout_is_20_bytes_packed() {
    assert_eq!(std::mem::size_of::<GuiVertex>(), 20);
    assert_eq!(std::mem::offset_of!(GuiVertex, position), 0);
    assert_eq!(std::mem::offset_of!(GuiVertex, uv), 8);
    assert_eq!(std::mem::offset_of!(GuiVertex, color), 16);
}

#[test]
fn test_empty_draw_data() {
    let dd = DrawData::empty(Vec2::new(800.0, 600.0));
    assert!(dd.is_empty());
    assert_eq!(dd.total_vertex_count(), 0);
    assert_eq!(dd.total_index_count(), 0);
    assert_eq!(dd.display_size, Vec2::new(800.0, 600.0));
    assert_eq!(dd.framebuffer_scale, Vec2::ONE);
}

#[test]
fn test_totals_sum_across_lists() {
    let mut dd = DrawData::empty(Vec2::new(800.0, 600.0));
    dd.lists.push(quad_list(TextureId(1)));
    dd.lists.push(quad_list(TextureId(2)));

    assert!(!dd.is_empty());
    assert_eq!(dd.total_vertex_count(), 8);
    assert_eq!(dd.total_index_count(), 12);
    assert_eq!(dd.total_vertex_bytes(), 8 * 20);
    assert_eq!(dd.total_index_bytes(), 12 * 2);
}

#[test]
fn test_vertices_are_pod() {
    // bytemuck casting is how the backend uploads geometry.
    let list = quad_list(TextureId(0));
    let bytes: &[u8] = bytemuck::cast_slice(&list.vertices);
    assert_eq!(bytes.len() as u64, list.vertex_bytes());
}

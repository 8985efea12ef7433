//! Static mesh data declared at startup.

/// Unit cube (-1..1), 36 vertices, counter-clockwise front faces.
#[rustfmt::skip]
pub const CUBE_VERTICES: [f32; 108] = [
    // front
    -1.0, -1.0,  1.0,   1.0, -1.0,  1.0,   1.0,  1.0,  1.0,
    -1.0, -1.0,  1.0,   1.0,  1.0,  1.0,  -1.0,  1.0,  1.0,
    // right
     1.0, -1.0,  1.0,   1.0, -1.0, -1.0,   1.0,  1.0, -1.0,
     1.0, -1.0,  1.0,   1.0,  1.0, -1.0,   1.0,  1.0,  1.0,
    // back
     1.0, -1.0, -1.0,  -1.0, -1.0, -1.0,   1.0,  1.0, -1.0,
     1.0,  1.0, -1.0,  -1.0, -1.0, -1.0,  -1.0,  1.0, -1.0,
    // left
    -1.0, -1.0, -1.0,  -1.0, -1.0,  1.0,  -1.0,  1.0,  1.0,
    -1.0, -1.0, -1.0,  -1.0,  1.0,  1.0,  -1.0,  1.0, -1.0,
    // top
    -1.0,  1.0,  1.0,   1.0,  1.0,  1.0,   1.0,  1.0, -1.0,
    -1.0,  1.0,  1.0,   1.0,  1.0, -1.0,  -1.0,  1.0, -1.0,
    // bottom
    -1.0, -1.0,  1.0,   1.0, -1.0, -1.0,   1.0, -1.0,  1.0,
    -1.0, -1.0,  1.0,  -1.0, -1.0, -1.0,   1.0, -1.0, -1.0,
];

/// Per-vertex RGB bytes, two shades per face.
#[rustfmt::skip]
pub const CUBE_COLORS: [u8; 108] = [
    // front
    200,  70, 120,  200,  70, 120,  200,  70, 120,
     80,  70, 120,   80,  70, 120,   80,  70, 120,
    // right
     80,  70, 200,   80,  70, 200,   80,  70, 200,
    160, 160, 220,  160, 160, 220,  160, 160, 220,
    // back
    200,  70, 120,  200,  70, 120,  200,  70, 120,
     80,  70, 120,   80,  70, 120,   80,  70, 120,
    // left
     80,  70, 200,   80,  70, 200,   80,  70, 200,
    160, 160, 220,  160, 160, 220,  160, 160, 220,
    // top
     76, 170, 100,   76, 170, 100,   76, 170, 100,
    140, 170,  80,  140, 170,  80,  140, 170,  80,
    // bottom
     76, 170, 100,   76, 170, 100,   76, 170, 100,
    140, 170,  80,  140, 170,  80,  140, 170,  80,
];

pub const CUBE_VERTEX_COUNT: u32 = (CUBE_VERTICES.len() / 3) as u32;

/// Ground quad in the xz plane, facing up.
#[rustfmt::skip]
pub const QUAD: [f32; 18] = [
    -1.0, 0.0,  1.0,   1.0, 0.0,  1.0,   1.0, 0.0, -1.0,
    -1.0, 0.0,  1.0,   1.0, 0.0, -1.0,  -1.0, 0.0, -1.0,
];

pub const QUAD_VERTEX_COUNT: u32 = (QUAD.len() / 3) as u32;

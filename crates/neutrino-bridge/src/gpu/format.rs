use crate::registry::ElementType;

use super::reflect::InputKind;

/// GPU-side layout of one vertex buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct VertexLayout {
    pub format: wgpu::VertexFormat,
    /// Bytes per vertex after padding.
    pub stride: u64,
    /// Components per vertex as declared by the host.
    pub declared_components: u32,
    /// Components per vertex as uploaded.
    pub components: u32,
}

impl VertexLayout {
    /// True when uploads must widen each element by one component.
    #[inline]
    pub fn is_padded(&self) -> bool {
        self.components != self.declared_components
    }

    /// What a shader input bound to this layout must be read as.
    pub fn kind(&self) -> InputKind {
        format_kind(self.format)
    }
}

fn format_kind(format: wgpu::VertexFormat) -> InputKind {
    use wgpu::VertexFormat as F;

    match format {
        F::Uint8 | F::Uint8x2 | F::Uint8x4 => InputKind::Uint,
        F::Uint16 | F::Uint16x2 | F::Uint16x4 => InputKind::Uint,
        F::Uint32 | F::Uint32x2 | F::Uint32x3 | F::Uint32x4 => InputKind::Uint,
        F::Sint8 | F::Sint8x2 | F::Sint8x4 => InputKind::Sint,
        F::Sint16 | F::Sint16x2 | F::Sint16x4 => InputKind::Sint,
        F::Sint32 | F::Sint32x2 | F::Sint32x3 | F::Sint32x4 => InputKind::Sint,
        _ => InputKind::Float,
    }
}

/// Maps a declared buffer element to a vertex format.
///
/// 8- and 16-bit three-component elements have no native format; they are
/// widened to four components. Normalization is ignored for floats and
/// unsupported for 32-bit integers.
pub fn vertex_layout(
    element_type: ElementType,
    element_size: u32,
    normalize: bool,
) -> Option<VertexLayout> {
    use wgpu::VertexFormat as F;

    let components = match (element_type.byte_size(), element_size) {
        (_, n) if n == 0 || n > 4 => return None,
        (1 | 2, 3) => 4,
        (_, n) => n,
    };

    let format = match (element_type, normalize, components) {
        (ElementType::Float32, _, 1) => F::Float32,
        (ElementType::Float32, _, 2) => F::Float32x2,
        (ElementType::Float32, _, 3) => F::Float32x3,
        (ElementType::Float32, _, 4) => F::Float32x4,

        (ElementType::Uint8, true, 1) => F::Unorm8,
        (ElementType::Uint8, true, 2) => F::Unorm8x2,
        (ElementType::Uint8, true, 4) => F::Unorm8x4,
        (ElementType::Uint8, false, 1) => F::Uint8,
        (ElementType::Uint8, false, 2) => F::Uint8x2,
        (ElementType::Uint8, false, 4) => F::Uint8x4,

        (ElementType::Int8, true, 1) => F::Snorm8,
        (ElementType::Int8, true, 2) => F::Snorm8x2,
        (ElementType::Int8, true, 4) => F::Snorm8x4,
        (ElementType::Int8, false, 1) => F::Sint8,
        (ElementType::Int8, false, 2) => F::Sint8x2,
        (ElementType::Int8, false, 4) => F::Sint8x4,

        (ElementType::Uint16, true, 1) => F::Unorm16,
        (ElementType::Uint16, true, 2) => F::Unorm16x2,
        (ElementType::Uint16, true, 4) => F::Unorm16x4,
        (ElementType::Uint16, false, 1) => F::Uint16,
        (ElementType::Uint16, false, 2) => F::Uint16x2,
        (ElementType::Uint16, false, 4) => F::Uint16x4,

        (ElementType::Int16, true, 1) => F::Snorm16,
        (ElementType::Int16, true, 2) => F::Snorm16x2,
        (ElementType::Int16, true, 4) => F::Snorm16x4,
        (ElementType::Int16, false, 1) => F::Sint16,
        (ElementType::Int16, false, 2) => F::Sint16x2,
        (ElementType::Int16, false, 4) => F::Sint16x4,

        (ElementType::Uint32, false, 1) => F::Uint32,
        (ElementType::Uint32, false, 2) => F::Uint32x2,
        (ElementType::Uint32, false, 3) => F::Uint32x3,
        (ElementType::Uint32, false, 4) => F::Uint32x4,

        (ElementType::Int32, false, 1) => F::Sint32,
        (ElementType::Int32, false, 2) => F::Sint32x2,
        (ElementType::Int32, false, 3) => F::Sint32x3,
        (ElementType::Int32, false, 4) => F::Sint32x4,

        _ => return None,
    };

    Some(VertexLayout {
        format,
        stride: (components as usize * element_type.byte_size()) as u64,
        declared_components: element_size,
        components,
    })
}

/// Encoding of one component that reads as 1 (1.0 when normalized), the
/// value a missing `w` takes in a shader.
fn unit_component(format: wgpu::VertexFormat) -> Vec<u8> {
    use wgpu::VertexFormat as F;

    match format {
        F::Unorm8x4 => vec![u8::MAX],
        F::Snorm8x4 => vec![i8::MAX as u8],
        F::Uint8x4 | F::Sint8x4 => vec![1],
        F::Unorm16x4 => u16::MAX.to_le_bytes().to_vec(),
        F::Snorm16x4 => i16::MAX.to_le_bytes().to_vec(),
        F::Uint16x4 | F::Sint16x4 => 1u16.to_le_bytes().to_vec(),
        _ => vec![0; format.size() as usize / 4],
    }
}

/// Widens each element of `bytes` to the layout's component count.
/// Added components read as 1. A trailing partial element is dropped.
pub fn pad_elements(bytes: &[u8], element_type: ElementType, layout: &VertexLayout) -> Vec<u8> {
    if !layout.is_padded() {
        return bytes.to_vec();
    }

    let component = element_type.byte_size();
    let src = layout.declared_components as usize * component;
    let dst = layout.stride as usize;
    let unit = unit_component(layout.format);

    let mut out = Vec::with_capacity(bytes.len() / src * dst);
    for element in bytes.chunks_exact(src) {
        out.extend_from_slice(element);
        for _ in 0..(dst - src) / component {
            out.extend_from_slice(&unit);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_vec3_is_native() {
        let layout = vertex_layout(ElementType::Float32, 3, false).unwrap();
        assert_eq!(layout.format, wgpu::VertexFormat::Float32x3);
        assert_eq!(layout.stride, 12);
        assert!(!layout.is_padded());
    }

    #[test]
    fn normalized_byte_rgb_is_widened() {
        let layout = vertex_layout(ElementType::Uint8, 3, true).unwrap();
        assert_eq!(layout.format, wgpu::VertexFormat::Unorm8x4);
        assert_eq!(layout.stride, 4);
        assert!(layout.is_padded());

        let padded = pad_elements(&[200, 70, 120, 80, 70, 200], ElementType::Uint8, &layout);
        assert_eq!(padded, [200, 70, 120, 255, 80, 70, 200, 255]);
    }

    #[test]
    fn padding_reads_as_one_for_every_widened_format() {
        let cases: [(ElementType, bool, Vec<u8>); 6] = [
            (ElementType::Int8, true, vec![0x7F]),
            (ElementType::Uint8, false, vec![1]),
            (ElementType::Int8, false, vec![1]),
            (ElementType::Uint16, true, 0xFFFFu16.to_le_bytes().to_vec()),
            (ElementType::Int16, true, 0x7FFFu16.to_le_bytes().to_vec()),
            (ElementType::Uint16, false, 1u16.to_le_bytes().to_vec()),
        ];

        for (element_type, normalize, unit) in cases {
            let layout = vertex_layout(element_type, 3, normalize).unwrap();
            let width = element_type.byte_size();
            let element = vec![9u8; 3 * width];

            let padded = pad_elements(&element, element_type, &layout);
            assert_eq!(padded.len(), 4 * width, "{element_type:?}");
            assert_eq!(&padded[..3 * width], &element[..], "{element_type:?}");
            assert_eq!(&padded[3 * width..], &unit[..], "{element_type:?} normalize={normalize}");
        }
    }

    #[test]
    fn integer_formats_feed_integer_inputs() {
        let ints = vertex_layout(ElementType::Uint8, 3, false).unwrap();
        assert_eq!(ints.kind(), InputKind::Uint);

        let signed = vertex_layout(ElementType::Int16, 2, false).unwrap();
        assert_eq!(signed.kind(), InputKind::Sint);

        let normalized = vertex_layout(ElementType::Uint8, 3, true).unwrap();
        assert_eq!(normalized.kind(), InputKind::Float);
    }

    #[test]
    fn unsupported_combinations_are_rejected() {
        assert!(vertex_layout(ElementType::Float32, 0, false).is_none());
        assert!(vertex_layout(ElementType::Float32, 5, false).is_none());
        assert!(vertex_layout(ElementType::Int32, 2, true).is_none());
    }
}

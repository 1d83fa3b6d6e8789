//! C struct layout: field offsets, explicit padding, size and alignment.
//!
//! Follows the C ABI rules used for structs passed by value: fields in
//! declaration order, each at its natural alignment, total size rounded up
//! to the alignment of the widest field.

use std::collections::HashMap;

use crate::error::{ManifestError, Result};
use crate::kind::ParamKind;

/// Size and alignment of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeSize {
    /// Size in bytes.
    pub size_bytes: u64,
    /// Required alignment in bytes.
    pub alignment_bytes: u64,
}

impl TypeSize {
    const fn new(size_bytes: u64, alignment_bytes: u64) -> Self {
        TypeSize {
            size_bytes,
            alignment_bytes,
        }
    }
}

/// One field after layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    pub name: String,
    pub offset: u64,
    pub size: TypeSize,
    /// Padding inserted before this field.
    pub padding_before: u64,
}

/// A laid-out struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructLayout {
    pub name: String,
    pub fields: Vec<FieldLayout>,
    pub size: TypeSize,
    /// Padding after the last field.
    pub trailing_padding: u64,
}

impl StructLayout {
    /// Lay out `fields` in order.
    pub fn compute(name: &str, fields: &[(String, TypeSize)]) -> Self {
        let mut offset: u64 = 0;
        let mut max_align: u64 = 1;
        let mut laid_out = Vec::with_capacity(fields.len());
        for (field_name, size) in fields {
            let aligned = align_up(offset, size.alignment_bytes);
            laid_out.push(FieldLayout {
                name: field_name.clone(),
                offset: aligned,
                size: *size,
                padding_before: aligned - offset,
            });
            offset = aligned + size.size_bytes;
            max_align = max_align.max(size.alignment_bytes);
        }
        let total = align_up(offset, max_align);
        StructLayout {
            name: name.to_string(),
            fields: laid_out,
            size: TypeSize::new(total, max_align),
            trailing_padding: total - offset,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldLayout> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Total padding bytes, between fields and trailing.
    pub fn padding_bytes(&self) -> u64 {
        self.fields.iter().map(|f| f.padding_before).sum::<u64>() + self.trailing_padding
    }
}

const WORD: TypeSize = TypeSize::new(
    std::mem::size_of::<usize>() as u64,
    std::mem::align_of::<usize>() as u64,
);
const U64: TypeSize = TypeSize::new(8, std::mem::align_of::<u64>() as u64);

/// Size of a C struct made of `fields`, ignoring names.
fn wire(fields: &[TypeSize]) -> TypeSize {
    let named: Vec<(String, TypeSize)> = fields.iter().map(|f| (String::new(), *f)).collect();
    StructLayout::compute("", &named).size
}

/// Size of a kind when embedded in a struct or passed by value.
///
/// `structs` resolves declared struct names. Envelopes and tickets have no
/// fixed size without their error type, so they are rejected.
pub fn kind_size(
    kind: &ParamKind,
    structs: &dyn Fn(&str) -> Result<TypeSize>,
) -> Result<TypeSize> {
    match kind {
        ParamKind::Unit => Ok(TypeSize::new(0, 1)),
        ParamKind::Primitive(p) => Ok(TypeSize::new(p.size_bytes(), p.size_bytes())),
        // {ptr, len: u64}
        ParamKind::View { .. } => Ok(wire(&[WORD, U64])),
        // {ptr, len: u64, capacity: u64, release}
        ParamKind::OwnedString | ParamKind::OwnedBuffer => Ok(wire(&[WORD, U64, U64, WORD])),
        ParamKind::Handle(_) => Ok(WORD),
        // {fn, context, release}
        ParamKind::Callback { .. } => Ok(wire(&[WORD, WORD, WORD])),
        ParamKind::Struct(name) => structs(name),
        ParamKind::Result(_) | ParamKind::Option(_) | ParamKind::Async(_) => {
            Err(ManifestError::Layout {
                name: kind.to_string(),
                detail: "envelopes and tickets cannot be struct fields".to_string(),
            })
        }
    }
}

/// Lay out every struct in `decls`, resolving nested structs and rejecting
/// recursive definitions.
pub fn compute_all(decls: &[(String, Vec<(String, ParamKind)>)]) -> Result<HashMap<String, StructLayout>> {
    let by_name: HashMap<&str, &Vec<(String, ParamKind)>> =
        decls.iter().map(|(name, fields)| (name.as_str(), fields)).collect();
    let mut done = HashMap::new();
    for (name, _) in decls {
        let mut visiting = Vec::new();
        resolve(name, &by_name, &mut done, &mut visiting)?;
    }
    Ok(done)
}

fn resolve(
    name: &str,
    by_name: &HashMap<&str, &Vec<(String, ParamKind)>>,
    done: &mut HashMap<String, StructLayout>,
    visiting: &mut Vec<String>,
) -> Result<TypeSize> {
    if let Some(layout) = done.get(name) {
        return Ok(layout.size);
    }
    if visiting.iter().any(|v| v == name) {
        return Err(ManifestError::Layout {
            name: name.to_string(),
            detail: format!("recursive definition via {}", visiting.join(" -> ")),
        });
    }
    let fields = by_name.get(name).ok_or_else(|| ManifestError::UnknownStruct {
        name: name.to_string(),
    })?;

    visiting.push(name.to_string());
    let mut sized = Vec::with_capacity(fields.len());
    for (field_name, kind) in fields.iter() {
        let size = match kind {
            ParamKind::Struct(inner) => resolve(inner, by_name, done, visiting)?,
            other => kind_size(other, &|n: &str| {
                Err(ManifestError::UnknownStruct { name: n.to_string() })
            })?,
        };
        sized.push((field_name.clone(), size));
    }
    visiting.pop();

    let layout = StructLayout::compute(name, &sized);
    let size = layout.size;
    done.insert(name.to_string(), layout);
    Ok(size)
}

/// Round `value` up to the next multiple of `align`.
fn align_up(value: u64, align: u64) -> u64 {
    if align == 0 {
        return value;
    }
    value.div_ceil(align) * align
}

#[cfg(test)]
mod tests {
    use super::*;
    use seam_core::PrimitiveKind;

    fn prim(p: PrimitiveKind) -> TypeSize {
        TypeSize::new(p.size_bytes(), p.size_bytes())
    }

    #[allow(dead_code)]
    #[repr(C)]
    struct Mixed {
        a: u8,
        b: u64,
        c: u16,
    }

    #[test]
    fn matches_rust_repr_c() {
        let layout = StructLayout::compute(
            "Mixed",
            &[
                ("a".to_string(), prim(PrimitiveKind::U8)),
                ("b".to_string(), prim(PrimitiveKind::U64)),
                ("c".to_string(), prim(PrimitiveKind::U16)),
            ],
        );
        assert_eq!(layout.size.size_bytes, std::mem::size_of::<Mixed>() as u64);
        assert_eq!(layout.size.alignment_bytes, std::mem::align_of::<Mixed>() as u64);
        assert_eq!(layout.field("a").unwrap().offset, std::mem::offset_of!(Mixed, a) as u64);
        assert_eq!(layout.field("b").unwrap().offset, std::mem::offset_of!(Mixed, b) as u64);
        assert_eq!(layout.field("c").unwrap().offset, std::mem::offset_of!(Mixed, c) as u64);
        assert_eq!(layout.field("b").unwrap().padding_before, 7);
        assert_eq!(layout.trailing_padding, 6);
        assert_eq!(layout.padding_bytes(), 13);
    }

    #[test]
    fn vec3_has_no_padding() {
        let f = prim(PrimitiveKind::F32);
        let layout = StructLayout::compute(
            "Vec3f32",
            &[("x".to_string(), f), ("y".to_string(), f), ("z".to_string(), f)],
        );
        assert_eq!(layout.size, TypeSize::new(12, 4));
        assert_eq!(layout.padding_bytes(), 0);
    }

    #[test]
    fn empty_struct() {
        let layout = StructLayout::compute("Empty", &[]);
        assert_eq!(layout.size, TypeSize::new(0, 1));
    }

    #[test]
    fn boundary_kinds_match_core_types() {
        let none = |n: &str| -> Result<TypeSize> {
            Err(ManifestError::UnknownStruct { name: n.to_string() })
        };
        let view = kind_size(&ParamKind::parse("slice<u8>").unwrap(), &none).unwrap();
        assert_eq!(view.size_bytes, std::mem::size_of::<seam_core::Slice<'_, u8>>() as u64);
        let owned = kind_size(&ParamKind::OwnedBuffer, &none).unwrap();
        assert_eq!(owned.size_bytes, std::mem::size_of::<seam_core::RawBuffer>() as u64);
        let handle = kind_size(&ParamKind::Handle("S".to_string()), &none).unwrap();
        assert_eq!(handle.size_bytes, std::mem::size_of::<*mut u8>() as u64);
        assert!(kind_size(&ParamKind::parse("result<u32>").unwrap(), &none).is_err());
    }

    #[test]
    fn nested_structs_resolve() {
        let decls = vec![
            (
                "Outer".to_string(),
                vec![
                    ("flag".to_string(), ParamKind::Primitive(PrimitiveKind::Bool)),
                    ("inner".to_string(), ParamKind::Struct("Inner".to_string())),
                ],
            ),
            (
                "Inner".to_string(),
                vec![("value".to_string(), ParamKind::Primitive(PrimitiveKind::F64))],
            ),
        ];
        let layouts = compute_all(&decls).unwrap();
        let outer = &layouts["Outer"];
        assert_eq!(outer.field("inner").unwrap().offset, 8);
        assert_eq!(outer.size, TypeSize::new(16, 8));
    }

    #[test]
    fn recursive_structs_rejected() {
        let decls = vec![(
            "Node".to_string(),
            vec![("next".to_string(), ParamKind::Struct("Node".to_string()))],
        )];
        assert!(matches!(compute_all(&decls), Err(ManifestError::Layout { .. })));
    }

    #[test]
    fn unknown_struct_rejected() {
        let decls = vec![(
            "A".to_string(),
            vec![("b".to_string(), ParamKind::Struct("B".to_string()))],
        )];
        assert!(matches!(compute_all(&decls), Err(ManifestError::UnknownStruct { .. })));
    }
}

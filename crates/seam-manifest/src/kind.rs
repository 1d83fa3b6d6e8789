//! Parameter and return kinds.
//!
//! Kinds are written as compact strings in manifests:
//!
//! | String                 | Kind                                  |
//! |------------------------|---------------------------------------|
//! | `u32`, `f64`, `bool`   | primitive by value                    |
//! | `slice<u8>`            | read-only view                        |
//! | `slice_mut<f32>`       | mutable view                          |
//! | `string`, `buffer`     | owned resource                        |
//! | `handle<Service>`      | opaque handle                         |
//! | `callback`             | unchecked callback token              |
//! | `checked_callback`     | callback returning an envelope        |
//! | `result<u32>`          | result envelope                       |
//! | `option<u64>`          | option envelope                       |
//! | `async<result<u64>>`   | async ticket                          |
//! | `Vec3f32`              | declared struct by value              |
//! | `()` / `void`          | nothing (returns and envelopes only)  |

use std::fmt;

use seam_core::PrimitiveKind;

use crate::error::{ManifestError, Result};

/// What crosses the boundary in one parameter position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamKind {
    Unit,
    Primitive(PrimitiveKind),
    View { element: Box<ParamKind>, mutable: bool },
    OwnedString,
    OwnedBuffer,
    Handle(String),
    Callback { checked: bool },
    Result(Box<ParamKind>),
    Option(Box<ParamKind>),
    Async(Box<ParamKind>),
    Struct(String),
}

/// What a native function returns.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReturnKind {
    Unit,
    Value(ParamKind),
}

fn invalid(detail: impl Into<String>) -> ManifestError {
    ManifestError::InvalidKind {
        detail: detail.into(),
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl ParamKind {
    /// Parse a kind string (see the module docs for the grammar).
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(invalid("empty kind"));
        }

        if let Some(primitive) = PrimitiveKind::from_name(input) {
            return Ok(ParamKind::Primitive(primitive));
        }

        match input {
            "()" | "void" => return Ok(ParamKind::Unit),
            "string" => return Ok(ParamKind::OwnedString),
            "buffer" => return Ok(ParamKind::OwnedBuffer),
            "callback" => return Ok(ParamKind::Callback { checked: false }),
            "checked_callback" => return Ok(ParamKind::Callback { checked: true }),
            _ => {}
        }

        let Some(open) = input.find('<') else {
            // Bare identifiers name declared structs; they start upper-case
            // so typos of the keywords above are not taken as structs.
            if is_identifier(input) && input.starts_with(|c: char| c.is_ascii_uppercase()) {
                return Ok(ParamKind::Struct(input.to_string()));
            }
            return Err(invalid(format!("unknown kind '{input}'")));
        };

        if !input.ends_with('>') {
            return Err(invalid(format!("missing '>' in '{input}'")));
        }
        let head = input[..open].trim();
        let inner = input[open + 1..input.len() - 1].trim();
        if inner.is_empty() {
            return Err(invalid(format!("empty type argument in '{input}'")));
        }

        match head {
            "slice" | "slice_mut" => {
                let element = Self::parse(inner)?;
                if !matches!(element, ParamKind::Primitive(_) | ParamKind::Struct(_)) {
                    return Err(invalid(format!(
                        "view elements must be primitives or structs, found '{element}'"
                    )));
                }
                Ok(ParamKind::View {
                    element: Box::new(element),
                    mutable: head == "slice_mut",
                })
            }
            "handle" => {
                if !is_identifier(inner) {
                    return Err(invalid(format!("handle target '{inner}' is not an identifier")));
                }
                Ok(ParamKind::Handle(inner.to_string()))
            }
            "result" => Ok(ParamKind::Result(Box::new(Self::parse(inner)?))),
            "option" => {
                let value = Self::parse(inner)?;
                if value == ParamKind::Unit {
                    return Err(invalid("option<()> carries no information"));
                }
                Ok(ParamKind::Option(Box::new(value)))
            }
            "async" => {
                let value = Self::parse(inner)?;
                if matches!(value, ParamKind::Async(_)) {
                    return Err(invalid("nested async kinds"));
                }
                Ok(ParamKind::Async(Box::new(value)))
            }
            other => Err(invalid(format!("unknown kind constructor '{other}'"))),
        }
    }

    /// Whether values of this kind require exactly one release.
    pub fn is_owned(&self) -> bool {
        matches!(
            self,
            ParamKind::OwnedString | ParamKind::OwnedBuffer | ParamKind::Handle(_)
        )
    }

    /// Whether this kind reports failure as data.
    pub fn is_fallible(&self) -> bool {
        match self {
            ParamKind::Result(_) => true,
            ParamKind::Async(inner) => inner.is_fallible(),
            _ => false,
        }
    }

    /// Struct names this kind refers to, directly or nested.
    pub fn referenced_structs(&self) -> Vec<&str> {
        match self {
            ParamKind::Struct(name) => vec![name.as_str()],
            ParamKind::View { element, .. } => element.referenced_structs(),
            ParamKind::Result(inner) | ParamKind::Option(inner) | ParamKind::Async(inner) => {
                inner.referenced_structs()
            }
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKind::Unit => write!(f, "()"),
            ParamKind::Primitive(p) => write!(f, "{p}"),
            ParamKind::View { element, mutable } => {
                let head = if *mutable { "slice_mut" } else { "slice" };
                write!(f, "{head}<{element}>")
            }
            ParamKind::OwnedString => write!(f, "string"),
            ParamKind::OwnedBuffer => write!(f, "buffer"),
            ParamKind::Handle(name) => write!(f, "handle<{name}>"),
            ParamKind::Callback { checked: false } => write!(f, "callback"),
            ParamKind::Callback { checked: true } => write!(f, "checked_callback"),
            ParamKind::Result(inner) => write!(f, "result<{inner}>"),
            ParamKind::Option(inner) => write!(f, "option<{inner}>"),
            ParamKind::Async(inner) => write!(f, "async<{inner}>"),
            ParamKind::Struct(name) => write!(f, "{name}"),
        }
    }
}

impl ReturnKind {
    pub fn parse(input: &str) -> Result<Self> {
        match ParamKind::parse(input)? {
            ParamKind::Unit => Ok(ReturnKind::Unit),
            ParamKind::View { .. } => Err(invalid("views cannot be returned; they never outlive the call")),
            ParamKind::Callback { .. } => Err(invalid("callbacks cannot be returned")),
            kind => Ok(ReturnKind::Value(kind)),
        }
    }

    pub fn as_param(&self) -> Option<&ParamKind> {
        match self {
            ReturnKind::Unit => None,
            ReturnKind::Value(kind) => Some(kind),
        }
    }
}

impl fmt::Display for ReturnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnKind::Unit => write!(f, "()"),
            ReturnKind::Value(kind) => write!(f, "{kind}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_primitives() {
        assert_eq!(ParamKind::parse("u32").unwrap(), ParamKind::Primitive(PrimitiveKind::U32));
        assert_eq!(ParamKind::parse(" f64 ").unwrap(), ParamKind::Primitive(PrimitiveKind::F64));
        assert_eq!(ParamKind::parse("bool").unwrap(), ParamKind::Primitive(PrimitiveKind::Bool));
    }

    #[test]
    fn parse_views() {
        assert_eq!(
            ParamKind::parse("slice<u8>").unwrap(),
            ParamKind::View {
                element: Box::new(ParamKind::Primitive(PrimitiveKind::U8)),
                mutable: false,
            }
        );
        let kind = ParamKind::parse("slice_mut<Vec3f32>").unwrap();
        assert_eq!(
            kind,
            ParamKind::View {
                element: Box::new(ParamKind::Struct("Vec3f32".to_string())),
                mutable: true,
            }
        );
        assert_eq!(kind.referenced_structs(), vec!["Vec3f32"]);
    }

    #[test]
    fn parse_envelopes_and_async() {
        let kind = ParamKind::parse("async<result<u64>>").unwrap();
        assert_eq!(
            kind,
            ParamKind::Async(Box::new(ParamKind::Result(Box::new(ParamKind::Primitive(
                PrimitiveKind::U64
            )))))
        );
        assert!(kind.is_fallible());
        assert!(!ParamKind::parse("option<u64>").unwrap().is_fallible());
        assert_eq!(
            ParamKind::parse("result<()>").unwrap(),
            ParamKind::Result(Box::new(ParamKind::Unit))
        );
    }

    #[test]
    fn parse_owned_and_callbacks() {
        assert!(ParamKind::parse("string").unwrap().is_owned());
        assert!(ParamKind::parse("buffer").unwrap().is_owned());
        assert!(ParamKind::parse("handle<ServiceResult>").unwrap().is_owned());
        assert_eq!(
            ParamKind::parse("checked_callback").unwrap(),
            ParamKind::Callback { checked: true }
        );
    }

    #[test]
    fn reject_malformed() {
        assert!(ParamKind::parse("").is_err());
        assert!(ParamKind::parse("usize").is_err());
        assert!(ParamKind::parse("slice<u8").is_err());
        assert!(ParamKind::parse("slice<>").is_err());
        assert!(ParamKind::parse("slice<string>").is_err());
        assert!(ParamKind::parse("handle<a b>").is_err());
        assert!(ParamKind::parse("async<async<u8>>").is_err());
        assert!(ParamKind::parse("option<()>").is_err());
        assert!(ParamKind::parse("vec<u8>").is_err());
    }

    #[test]
    fn display_round_trips() {
        for text in [
            "u8",
            "slice<u32>",
            "slice_mut<f32>",
            "string",
            "buffer",
            "handle<ServiceAsync>",
            "callback",
            "checked_callback",
            "result<string>",
            "option<u64>",
            "async<result<u64>>",
            "Vec3f32",
        ] {
            assert_eq!(ParamKind::parse(text).unwrap().to_string(), text);
        }
    }

    #[test]
    fn return_kinds() {
        assert_eq!(ReturnKind::parse("void").unwrap(), ReturnKind::Unit);
        assert!(ReturnKind::parse("slice<u8>").is_err());
        assert!(ReturnKind::parse("callback").is_err());
        assert_eq!(
            ReturnKind::parse("result<u32>").unwrap().to_string(),
            "result<u32>"
        );
    }
}

//! Signature manifest (`*.seam.toml`) parsing.
//!
//! A manifest declares a native library, the structs it passes by value and
//! the signature of each exported function:
//!
//! ```toml
//! [library]
//! name = "seam_reference"
//!
//! [[structs]]
//! name = "Vec3f32"
//! fields = [
//!     { name = "x", kind = "f32" },
//!     { name = "y", kind = "f32" },
//!     { name = "z", kind = "f32" },
//! ]
//!
//! [[functions]]
//! name = "slice_vec3_at"
//! params = [
//!     { name = "data", kind = "slice<Vec3f32>" },
//!     { name = "index", kind = "u32" },
//! ]
//! returns = "Vec3f32"
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ManifestError, Result};
use crate::kind::{ParamKind, ReturnKind};
use crate::layout::{self, StructLayout};
use crate::signature::{Param, Signature};

/// A complete manifest parsed from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub library: Library,
    #[serde(default)]
    pub structs: Vec<StructDecl>,
    #[serde(default)]
    pub functions: Vec<FunctionDecl>,
}

/// Metadata about the native library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Library {
    /// Library name, without platform prefix or extension.
    pub name: String,
    /// Calling convention; only `"C"` is supported.
    #[serde(default = "default_abi")]
    pub abi: String,
}

fn default_abi() -> String {
    "C".to_string()
}

fn default_returns() -> String {
    "()".to_string()
}

/// A struct passed by value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructDecl {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub kind: String,
}

/// One exported function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDecl {
    /// Exported symbol name.
    pub name: String,
    #[serde(default)]
    pub params: Vec<ParamDecl>,
    #[serde(default = "default_returns")]
    pub returns: String,
    /// Free-form description shown by `seam inspect`.
    #[serde(default)]
    pub doc: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamDecl {
    pub name: String,
    pub kind: String,
}

fn invalid(detail: impl Into<String>) -> ManifestError {
    ManifestError::InvalidManifest {
        detail: detail.into(),
    }
}

impl FunctionDecl {
    /// Build the signature descriptor for this function.
    pub fn signature(&self) -> Result<Signature> {
        let params = self
            .params
            .iter()
            .map(|p| {
                Ok(Param {
                    name: p.name.clone(),
                    kind: ParamKind::parse(&p.kind)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let signature = Signature::new(self.name.clone(), params, ReturnKind::parse(&self.returns)?);
        signature.validate()?;
        Ok(signature)
    }
}

impl Manifest {
    /// Parse a manifest from a TOML string.
    pub fn parse(input: &str) -> Result<Self> {
        let manifest: Manifest = toml::from_str(input)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Parse a manifest from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn function(&self, name: &str) -> Option<&FunctionDecl> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Signature descriptors for every function, in declaration order.
    pub fn signatures(&self) -> Result<Vec<Signature>> {
        self.functions.iter().map(FunctionDecl::signature).collect()
    }

    /// Layouts of every declared struct.
    pub fn layouts(&self) -> Result<HashMap<String, StructLayout>> {
        let decls = self
            .structs
            .iter()
            .map(|s| {
                let fields = s
                    .fields
                    .iter()
                    .map(|f| Ok((f.name.clone(), ParamKind::parse(&f.kind)?)))
                    .collect::<Result<Vec<_>>>()?;
                Ok((s.name.clone(), fields))
            })
            .collect::<Result<Vec<_>>>()?;
        layout::compute_all(&decls)
    }

    /// Layout of one declared struct.
    pub fn struct_layout(&self, name: &str) -> Result<StructLayout> {
        self.layouts()?
            .remove(name)
            .ok_or_else(|| ManifestError::UnknownStruct {
                name: name.to_string(),
            })
    }

    fn validate(&self) -> Result<()> {
        if self.library.name.is_empty() {
            return Err(invalid("library.name is required"));
        }
        if self.library.abi != "C" {
            return Err(invalid(format!(
                "unsupported abi '{}'; only \"C\" is supported",
                self.library.abi
            )));
        }

        let mut struct_names = HashSet::new();
        for decl in &self.structs {
            if !struct_names.insert(decl.name.as_str()) {
                return Err(invalid(format!("struct '{}' declared twice", decl.name)));
            }
        }
        // Also rejects unknown or recursive field types.
        self.layouts()?;

        let mut function_names = HashSet::new();
        for function in &self.functions {
            if !function_names.insert(function.name.as_str()) {
                return Err(invalid(format!("function '{}' declared twice", function.name)));
            }
            let signature = function.signature()?;
            let mut kinds: Vec<&ParamKind> = signature.params.iter().map(|p| &p.kind).collect();
            kinds.extend(signature.returns.as_param());
            for kind in kinds {
                for name in kind.referenced_structs() {
                    if !struct_names.contains(name) {
                        return Err(ManifestError::UnknownStruct {
                            name: name.to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

//! Signature descriptors.
//!
//! A [`Signature`] is the ordered parameter kinds plus the return kind of one
//! native function. Signatures come from manifest entries or from the compact
//! form `name(param: kind, ...) -> kind`.

use std::fmt;

use crate::error::{ManifestError, Result};
use crate::kind::{ParamKind, ReturnKind};
use crate::marshal::{callback_failure, select_path, select_return_path, CallbackFailure, MarshalPath};

/// A named parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub kind: ParamKind,
}

/// Descriptor of one native function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub params: Vec<Param>,
    pub returns: ReturnKind,
}

/// The marshal path chosen for each position of a signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallPlan {
    pub params: Vec<PlannedParam>,
    pub returns: MarshalPath,
    /// Whether the function reports failure as data.
    pub fallible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedParam {
    pub name: String,
    pub path: MarshalPath,
    pub callback: Option<CallbackFailure>,
    /// Whether the callee takes over a release obligation.
    pub transfers_release: bool,
}

fn invalid(detail: impl Into<String>) -> ManifestError {
    ManifestError::InvalidSignature {
        detail: detail.into(),
    }
}

/// Split on commas outside angle brackets.
fn split_top_level(s: &str) -> Result<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| invalid(format!("unbalanced '>' in '{s}'")))?;
            }
            ',' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(invalid(format!("unbalanced '<' in '{s}'")));
    }
    parts.push(&s[start..]);
    Ok(parts)
}

impl Signature {
    pub fn new(name: impl Into<String>, params: Vec<Param>, returns: ReturnKind) -> Self {
        Signature {
            name: name.into(),
            params,
            returns,
        }
    }

    /// Parse the compact form.
    ///
    /// Examples:
    /// - `"echo_u32(x: u32) -> u32"`
    /// - `"slice_fill(data: slice_mut<u8>, value: u8)"`
    /// - `"result_slice(this: handle<ServiceResult>, data: slice<u32>, i: u32) -> result<u32>"`
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(invalid("empty signature"));
        }

        let open = input.find('(').ok_or_else(|| invalid("missing '('"))?;
        let close = input.rfind(')').ok_or_else(|| invalid("missing ')'"))?;
        if close < open {
            return Err(invalid("')' before '('"));
        }

        let name = input[..open].trim();
        if name.is_empty() {
            return Err(invalid("missing function name"));
        }

        let params_str = input[open + 1..close].trim();
        let mut params = Vec::new();
        if !params_str.is_empty() {
            for part in split_top_level(params_str)? {
                let (param_name, kind) = part
                    .split_once(':')
                    .ok_or_else(|| invalid(format!("parameter '{}' has no kind", part.trim())))?;
                params.push(Param {
                    name: param_name.trim().to_string(),
                    kind: ParamKind::parse(kind)?,
                });
            }
        }

        let rest = input[close + 1..].trim();
        let returns = if rest.is_empty() {
            ReturnKind::Unit
        } else {
            let kind = rest
                .strip_prefix("->")
                .ok_or_else(|| invalid(format!("expected '->' after ')', found '{rest}'")))?;
            ReturnKind::parse(kind)?
        };

        let signature = Signature::new(name, params, returns);
        signature.validate()?;
        Ok(signature)
    }

    /// Check the rules the kind grammar alone cannot express.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for param in &self.params {
            if param.name.is_empty() {
                return Err(invalid(format!("{}: unnamed parameter", self.name)));
            }
            if !seen.insert(param.name.as_str()) {
                return Err(invalid(format!(
                    "{}: duplicate parameter '{}'",
                    self.name, param.name
                )));
            }
            if param.kind == ParamKind::Unit {
                return Err(invalid(format!(
                    "{}: parameter '{}' has unit kind",
                    self.name, param.name
                )));
            }
            if matches!(param.kind, ParamKind::Async(_)) {
                return Err(invalid(format!(
                    "{}: parameter '{}' is async; tickets are only returned",
                    self.name, param.name
                )));
            }
        }
        Ok(())
    }

    /// Select marshal paths for every position.
    pub fn plan(&self) -> CallPlan {
        CallPlan {
            params: self
                .params
                .iter()
                .map(|param| PlannedParam {
                    name: param.name.clone(),
                    path: select_path(&param.kind),
                    callback: callback_failure(&param.kind),
                    transfers_release: param.kind.is_owned()
                        && !matches!(param.kind, ParamKind::Handle(_)),
                })
                .collect(),
            returns: select_return_path(&self.returns),
            fallible: self
                .returns
                .as_param()
                .is_some_and(ParamKind::is_fallible),
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", param.name, param.kind)?;
        }
        write!(f, ")")?;
        if self.returns != ReturnKind::Unit {
            write!(f, " -> {}", self.returns)?;
        }
        Ok(())
    }
}

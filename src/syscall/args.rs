//! Argument contracts and validation

use crate::core::error::{KernelError, Result};
use crate::syscall::Syscall;
use serde_json::Value;

/// Raw named arguments as they arrive from either grammar
pub type Params = serde_json::Map<String, Value>;

/// Shape a single argument must have
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// Non-empty string, resolved later against the working directory
    Path,
    /// Any string
    Text,
    /// A string (UTF-8 encoded) or an array of byte values
    Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgSpec {
    pub name: &'static str,
    pub kind: ArgKind,
    pub required: bool,
}

impl ArgSpec {
    pub const fn required(name: &'static str, kind: ArgKind) -> Self {
        Self { name, kind, required: true }
    }

    pub const fn optional(name: &'static str, kind: ArgKind) -> Self {
        Self { name, kind, required: false }
    }
}

/// Arguments that passed a syscall's contract
#[derive(Debug, Clone)]
pub struct ValidArgs {
    params: Params,
}

impl ValidArgs {
    /// Check `params` against the contract of `syscall`
    ///
    /// Missing required arguments, wrongly typed values and unexpected
    /// extra keys are all `InvalidParams`.
    pub fn validate(syscall: Syscall, params: &Params) -> Result<Self> {
        let spec = syscall.arg_spec();

        if let Some(extra) = params.keys().find(|k| !spec.iter().any(|s| s.name == k.as_str())) {
            return Err(KernelError::InvalidParams(format!(
                "{} does not take '{}'",
                syscall, extra
            )));
        }

        for arg in spec {
            match params.get(arg.name) {
                None | Some(Value::Null) if arg.required => {
                    return Err(KernelError::InvalidParams(format!(
                        "{} requires '{}'",
                        syscall, arg.name
                    )));
                }
                None | Some(Value::Null) => {}
                Some(value) => check_kind(syscall, arg, value)?,
            }
        }

        Ok(Self {
            params: params
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        })
    }

    /// A path argument, if supplied
    pub fn path(&self, name: &str) -> Option<&str> {
        self.params.get(name).and_then(Value::as_str)
    }

    /// A required path argument
    pub fn require_path(&self, name: &str) -> Result<&str> {
        self.path(name).ok_or_else(|| missing(name))
    }

    pub fn text(&self, name: &str) -> Result<&str> {
        self.params
            .get(name)
            .and_then(Value::as_str)
            .ok_or_else(|| missing(name))
    }

    pub fn bytes(&self, name: &str) -> Result<Vec<u8>> {
        let value = self.params.get(name).ok_or_else(|| missing(name))?;
        to_bytes(value).ok_or_else(|| missing(name))
    }
}

fn missing(name: &str) -> KernelError {
    KernelError::internal(format!("validated argument '{}' missing", name))
}

fn check_kind(syscall: Syscall, arg: &ArgSpec, value: &Value) -> Result<()> {
    let ok = match arg.kind {
        ArgKind::Path => value.as_str().is_some_and(|s| !s.trim().is_empty()),
        ArgKind::Text => value.is_string(),
        ArgKind::Bytes => to_bytes(value).is_some(),
    };
    if ok {
        Ok(())
    } else {
        Err(KernelError::InvalidParams(format!(
            "{}: '{}' must be {}",
            syscall,
            arg.name,
            match arg.kind {
                ArgKind::Path => "a non-empty path string",
                ArgKind::Text => "a string",
                ArgKind::Bytes => "a string or an array of bytes",
            }
        )))
    }
}

fn to_bytes(value: &Value) -> Option<Vec<u8>> {
    match value {
        Value::String(s) => Some(s.as_bytes().to_vec()),
        Value::Array(items) => items
            .iter()
            .map(|v| v.as_u64().and_then(|n| u8::try_from(n).ok()))
            .collect(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Params {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_valid_write() {
        let args = ValidArgs::validate(
            Syscall::WriteFile,
            &params(json!({"path": "/a", "content": "hi"})),
        )
        .unwrap();
        assert_eq!(args.require_path("path").unwrap(), "/a");
        assert_eq!(args.bytes("content").unwrap(), b"hi");
    }

    #[test]
    fn test_bytes_from_array() {
        let args = ValidArgs::validate(
            Syscall::WriteFile,
            &params(json!({"path": "/a", "content": [0, 255, 7]})),
        )
        .unwrap();
        assert_eq!(args.bytes("content").unwrap(), vec![0u8, 255, 7]);
    }

    #[test]
    fn test_rejects_out_of_range_bytes() {
        let result = ValidArgs::validate(
            Syscall::WriteFile,
            &params(json!({"path": "/a", "content": [256]})),
        );
        assert!(matches!(result, Err(KernelError::InvalidParams(_))));
    }

    #[test]
    fn test_missing_required() {
        let result = ValidArgs::validate(Syscall::MakeDir, &Params::new());
        assert!(matches!(result, Err(KernelError::InvalidParams(_))));
        let result = ValidArgs::validate(Syscall::MakeDir, &params(json!({"path": null})));
        assert!(matches!(result, Err(KernelError::InvalidParams(_))));
    }

    #[test]
    fn test_wrong_type_and_empty_path() {
        let result = ValidArgs::validate(Syscall::MakeDir, &params(json!({"path": 3})));
        assert!(result.is_err());
        let result = ValidArgs::validate(Syscall::MakeDir, &params(json!({"path": "  "})));
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_extra_keys() {
        let result = ValidArgs::validate(
            Syscall::MakeDir,
            &params(json!({"path": "/a", "recursive": true})),
        );
        assert!(matches!(result, Err(KernelError::InvalidParams(_))));
    }

    #[test]
    fn test_optional_path() {
        let args = ValidArgs::validate(Syscall::ListDir, &Params::new()).unwrap();
        assert_eq!(args.path("path"), None);
    }
}

//! Decode and validate intents returned by the inference service
//!
//! The model's reply is untrusted. It is decoded into the fixed
//! `{action, params}` schema, normalised, and checked against the syscall
//! registry and argument contracts before anything can run.

use crate::core::error::{KernelError, Result};
use crate::syscall::{Origin, Params, Syscall, SyscallInvocation, ValidArgs};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Structured intent as returned by the inference service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedIntent {
    /// Requested syscall name (possibly an alias)
    pub action: String,
    /// Named arguments
    #[serde(default)]
    pub params: Params,
}

/// Parameter names models commonly use instead of the registered ones
const PARAM_ALIASES: &[(&str, &str)] = &[
    ("filename", "path"),
    ("file", "path"),
    ("directory", "path"),
    ("file_content", "content"),
    ("text", "content"),
    ("from", "old"),
    ("to", "new"),
    ("app", "name"),
    ("user", "username"),
];

/// Action names from the earlier syscall vocabulary
const ACTION_ALIASES: &[(&str, &str)] = &[
    ("create_file", "write_file"),
    ("delete_file", "remove_file"),
    ("list_files", "list_dir"),
    ("mkdir", "make_dir"),
];

/// Decode a raw model reply into a [`ParsedIntent`]
///
/// Fails with `MalformedIntent` when no JSON object can be recovered or
/// it lacks an `action`.
pub fn decode_intent(response: &str) -> Result<ParsedIntent> {
    let json_str = extract_json(response)?;
    let value: Value = serde_json::from_str(json_str).map_err(|e| {
        KernelError::MalformedIntent(format!("Failed to parse intent: {} - Response: {}", e, response))
    })?;

    let Value::Object(mut object) = value else {
        return Err(KernelError::MalformedIntent("intent is not a JSON object".into()));
    };

    let action = match object.remove("action").or_else(|| object.remove("intent")) {
        Some(Value::String(action)) if !action.trim().is_empty() => action.trim().to_string(),
        Some(_) => {
            return Err(KernelError::MalformedIntent("'action' must be a string".into()));
        }
        None => return Err(KernelError::MalformedIntent("missing 'action' field".into())),
    };
    object.remove("intent");

    let mut params = match object.remove("params") {
        Some(Value::Object(params)) => params,
        Some(Value::Null) => Params::new(),
        Some(_) => {
            return Err(KernelError::MalformedIntent("'params' must be an object".into()));
        }
        // Without a params object every other key is a param
        None => object,
    };

    for (alias, canonical) in PARAM_ALIASES {
        if !params.contains_key(*canonical) {
            if let Some(value) = params.remove(*alias) {
                params.insert(canonical.to_string(), value);
            }
        }
    }

    Ok(ParsedIntent { action, params })
}

/// Check an intent against the syscall registry and argument contracts
pub fn validate_intent(intent: ParsedIntent) -> Result<SyscallInvocation> {
    let name = ACTION_ALIASES
        .iter()
        .find(|(alias, _)| *alias == intent.action)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(intent.action.as_str());

    let syscall =
        Syscall::from_name(name).ok_or_else(|| KernelError::UnknownAction(intent.action.clone()))?;

    let mut params = intent.params;
    match intent.action.as_str() {
        "create_file" if !params.contains_key("content") => {
            params.insert("content".into(), Value::String(String::new()));
        }
        "list_files" if !params.contains_key("path") => {
            params.insert("path".into(), Value::String("/".into()));
        }
        _ => {}
    }

    ValidArgs::validate(syscall, &params)?;

    Ok(SyscallInvocation {
        name: syscall,
        args: params,
        origin: Origin::Intent,
    })
}

/// Extract JSON object from LLM response (handles fences and surrounding text)
pub fn extract_json(response: &str) -> Result<&str> {
    let text = response.trim();
    let fenced = text
        .find("```json")
        .map(|i| i + "```json".len())
        .or_else(|| text.find("```").map(|i| i + 3))
        .and_then(|start| {
            text[start..]
                .find("```")
                .map(|end| text[start..start + end].trim())
        });
    let body = fenced.unwrap_or(text);

    let start = body
        .find('{')
        .ok_or_else(|| KernelError::MalformedIntent("No JSON found in response".into()))?;
    let end = body
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| KernelError::MalformedIntent("No closing brace found in response".into()))?;
    Ok(&body[start..=end])
}

/// Fixed instructions sent ahead of every request
pub fn preamble() -> String {
    let mut s = String::from(PREAMBLE_HEADER);
    s.push_str("\nAVAILABLE ACTIONS:\n");
    for syscall in Syscall::ALL {
        let params: Vec<String> = syscall
            .arg_spec()
            .iter()
            .map(|a| {
                if a.required {
                    a.name.to_string()
                } else {
                    format!("{}?", a.name)
                }
            })
            .collect();
        s.push_str(&format!("- {}({})\n", syscall, params.join(", ")));
    }
    s.push_str(PREAMBLE_EXAMPLES);
    s
}

const PREAMBLE_HEADER: &str = r#"You are the kernel of NEURO-CASIO OS, a retro-futurist operating system.
Convert the user's natural language request into exactly one system call.

Paths are absolute ("/notes/todo.txt") or relative to the working directory.
If the request cannot be expressed as one of the actions below, answer
{"action": "unknown", "params": {}}.

OUTPUT FORMAT (JSON only, no markdown, no explanation):
{"action": "action_name", "params": {"param": "value"}}
"#;

const PREAMBLE_EXAMPLES: &str = r#"
Examples:
"what files do I have" -> {"action": "list_dir", "params": {"path": "/"}}
"create a file notes.txt saying hello world" -> {"action": "write_file", "params": {"path": "notes.txt", "content": "hello world"}}
"make a folder for projects" -> {"action": "make_dir", "params": {"path": "projects"}}
"delete the notes file" -> {"action": "remove_file", "params": {"path": "notes.txt"}}
"rename todo.txt to done.txt" -> {"action": "rename", "params": {"old": "todo.txt", "new": "done.txt"}}
"start the calculator" -> {"action": "launch_app", "params": {"name": "calculator"}}
"get me the snake game" -> {"action": "install_app", "params": {"name": "snake"}}
"which apps can I install" -> {"action": "list_apps", "params": {}}
"how is the system doing" -> {"action": "system_status", "params": {}}
"#;

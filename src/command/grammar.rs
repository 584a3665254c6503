//! Deterministic shell grammar
//!
//! The first word selects a command. Unknown first words are not an error:
//! they mean "not a command" and the line goes to the intent bridge.

use crate::command::tokenizer::tokenize;
use crate::core::error::{KernelError, Result};
use crate::syscall::{Origin, Syscall, SyscallInvocation};

/// Outcome of parsing one input line
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    Invocation(SyscallInvocation),
    /// End the session
    Exit,
    /// First word is not a known command
    NotACommand,
}

/// Commands recognised by the shell, as `(word, usage)`
pub const COMMANDS: &[(&str, &str)] = &[
    ("ls", "ls [path]"),
    ("cd", "cd [path]"),
    ("mkdir", "mkdir <path>"),
    ("rmdir", "rmdir <path>"),
    ("cat", "cat <path>"),
    ("write", "write <path> <text...>"),
    ("rm", "rm [-r] <path>"),
    ("mv", "mv <old> <new>"),
    ("open", "open <app>"),
    ("launch", "launch <app>"),
    ("apps", "apps"),
    ("install", "install <app>"),
    ("uninstall", "uninstall <app>"),
    ("register", "register <user> <password>"),
    ("login", "login <user> <password>"),
    ("logout", "logout"),
    ("log", "log <text...>"),
    ("status", "status"),
    ("exit", "exit"),
    ("quit", "quit"),
    ("shutdown", "shutdown"),
];

fn usage(word: &str) -> KernelError {
    let usage = COMMANDS
        .iter()
        .find(|(w, _)| *w == word)
        .map(|(_, u)| *u)
        .unwrap_or(word);
    KernelError::SyntaxError(format!("usage: {}", usage))
}

/// Parse a raw input line
pub fn parse_command(line: &str) -> Result<Parsed> {
    let Some(word) = line.split_whitespace().next() else {
        return Ok(Parsed::NotACommand);
    };
    if !COMMANDS.iter().any(|(w, _)| *w == word) {
        return Ok(Parsed::NotACommand);
    }

    let tokens = tokenize(line)?;
    let args: Vec<&str> = tokens[1..].iter().map(String::as_str).collect();
    let call = |name: Syscall| SyscallInvocation::new(name, Origin::Command);

    let invocation = match (word, args.as_slice()) {
        ("exit" | "quit" | "shutdown", []) => return Ok(Parsed::Exit),
        ("ls", []) => call(Syscall::ListDir),
        ("ls", [path]) => call(Syscall::ListDir).arg("path", *path),
        ("cd", []) => call(Syscall::ChangeDir).arg("path", "/"),
        ("cd", [path]) => call(Syscall::ChangeDir).arg("path", *path),
        ("mkdir", [path]) => call(Syscall::MakeDir).arg("path", *path),
        ("rmdir", [path]) => call(Syscall::RemoveDir).arg("path", *path),
        ("cat", [path]) => call(Syscall::ReadFile).arg("path", *path),
        ("write", [path, text @ ..]) if !text.is_empty() => call(Syscall::WriteFile)
            .arg("path", *path)
            .arg("content", text.join(" ")),
        ("rm", ["-r", path]) => call(Syscall::RemoveTree).arg("path", *path),
        ("rm", [path]) if !path.starts_with('-') => call(Syscall::RemoveFile).arg("path", *path),
        ("mv", [old, new]) => call(Syscall::Rename).arg("old", *old).arg("new", *new),
        ("open" | "launch", [app]) => call(Syscall::LaunchApp).arg("name", *app),
        ("apps", []) => call(Syscall::ListApps),
        ("install", [app]) => call(Syscall::InstallApp).arg("name", *app),
        ("uninstall", [app]) => call(Syscall::RemoveApp).arg("name", *app),
        ("register", [user, password]) => call(Syscall::Register)
            .arg("username", *user)
            .arg("password", *password),
        ("login", [user, password]) => call(Syscall::Login)
            .arg("username", *user)
            .arg("password", *password),
        ("logout", []) => call(Syscall::Logout),
        ("log", text) if !text.is_empty() => call(Syscall::Log).arg("message", text.join(" ")),
        ("status", []) => call(Syscall::SystemStatus),
        _ => return Err(usage(word)),
    };

    Ok(Parsed::Invocation(invocation))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation(line: &str) -> SyscallInvocation {
        match parse_command(line).unwrap() {
            Parsed::Invocation(inv) => inv,
            other => panic!("expected invocation, got {:?}", other),
        }
    }

    #[test]
    fn test_mkdir() {
        let inv = invocation("mkdir /notes");
        assert_eq!(inv.name, Syscall::MakeDir);
        assert_eq!(inv.origin, Origin::Command);
        assert_eq!(inv.args["path"], "/notes");
    }

    #[test]
    fn test_ls_optional_path() {
        assert!(invocation("ls").args.is_empty());
        assert_eq!(invocation("ls /home").args["path"], "/home");
    }

    #[test]
    fn test_write_joins_text() {
        let inv = invocation("write /a.txt hello   big world");
        assert_eq!(inv.name, Syscall::WriteFile);
        assert_eq!(inv.args["content"], "hello big world");

        let inv = invocation(r#"write /a.txt "hello   big world""#);
        assert_eq!(inv.args["content"], "hello   big world");
    }

    #[test]
    fn test_rm_variants() {
        assert_eq!(invocation("rm /a").name, Syscall::RemoveFile);
        assert_eq!(invocation("rm -r /a").name, Syscall::RemoveTree);
        assert!(matches!(parse_command("rm -f /a"), Err(KernelError::SyntaxError(_))));
        assert!(matches!(parse_command("rm -x"), Err(KernelError::SyntaxError(_))));
    }

    #[test]
    fn test_arity_errors() {
        for line in ["mkdir", "mkdir /a /b", "mv /a", "cat", "status now", "write /a", "log"] {
            assert!(
                matches!(parse_command(line), Err(KernelError::SyntaxError(_))),
                "{} should be a syntax error",
                line
            );
        }
    }

    #[test]
    fn test_not_a_command() {
        assert_eq!(parse_command("what files do I have").unwrap(), Parsed::NotACommand);
        assert_eq!(parse_command("").unwrap(), Parsed::NotACommand);
        // Apostrophes in natural language never reach the tokenizer
        assert_eq!(parse_command("what's in my notes").unwrap(), Parsed::NotACommand);
    }

    #[test]
    fn test_exit_words() {
        for word in ["exit", "quit", "shutdown"] {
            assert_eq!(parse_command(word).unwrap(), Parsed::Exit);
        }
        assert!(parse_command("exit now").is_err());
    }

    #[test]
    fn test_open_app() {
        let inv = invocation("open calculator");
        assert_eq!(inv.name, Syscall::LaunchApp);
        assert_eq!(inv.args["name"], "calculator");
        assert_eq!(invocation("launch snake").args["name"], "snake");
    }

    #[test]
    fn test_package_commands() {
        assert_eq!(invocation("apps").name, Syscall::ListApps);
        let inv = invocation("install snake");
        assert_eq!(inv.name, Syscall::InstallApp);
        assert_eq!(inv.args["name"], "snake");
        assert_eq!(invocation("uninstall snake").name, Syscall::RemoveApp);
        assert!(parse_command("install").is_err());
    }

    #[test]
    fn test_account_commands() {
        let inv = invocation(r#"register ada "two words""#);
        assert_eq!(inv.name, Syscall::Register);
        assert_eq!(inv.args["username"], "ada");
        assert_eq!(inv.args["password"], "two words");
        assert_eq!(invocation("login ada pw").name, Syscall::Login);
        assert_eq!(invocation("logout").name, Syscall::Logout);
        assert!(matches!(parse_command("login ada"), Err(KernelError::SyntaxError(_))));
    }

    #[test]
    fn test_unterminated_quote_is_syntax_error() {
        assert!(matches!(
            parse_command("cat '/a"),
            Err(KernelError::SyntaxError(_))
        ));
    }
}

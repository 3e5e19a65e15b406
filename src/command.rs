//! Remote command construction.
//!
//! Commands are built as structured program+argument lists and only
//! flattened to a shell string in [`RemoteCommand::render`], the single
//! place quoting happens. Nothing else in the crate concatenates user
//! input into command text.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::passwd::User;

/// Conventional POSIX login name shape, as enforced by shadow-utils.
static LOGIN_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z_][a-z0-9_-]*\$?$").unwrap());

pub fn is_valid_login_name(name: &str) -> bool {
    !name.is_empty() && name.len() <= 32 && LOGIN_NAME.is_match(name)
}

/// A command destined for the remote shell: a program and its argument
/// list, unquoted until render time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCommand {
    program: String,
    args: Vec<String>,
}

impl RemoteCommand {
    pub fn new(program: impl Into<String>) -> Self {
        RemoteCommand {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Flatten to a single shell-safe string. Every token is quoted
    /// here and nowhere else, so injection review has one place to look.
    pub fn render(&self) -> String {
        shell_words::join(
            std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str)),
        )
    }
}

impl std::fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

/// Dump the user database.
pub fn read_database() -> RemoteCommand {
    RemoteCommand::new("cat").arg("/etc/passwd")
}

/// Account creation. Only fields the caller populated become explicit
/// flags; the rest fall back to the remote system's useradd defaults.
pub fn user_add(user: &User) -> RemoteCommand {
    let mut cmd = RemoteCommand::new("useradd");
    if !user.uid.is_empty() {
        cmd = cmd.arg("-u").arg(&user.uid);
    }
    if !user.gid.is_empty() {
        cmd = cmd.arg("-g").arg(&user.gid);
    }
    if !user.comment.is_empty() {
        cmd = cmd.arg("-c").arg(&user.comment);
    }
    if !user.shell.is_empty() {
        cmd = cmd.arg("-s").arg(&user.shell);
    }
    if !user.home.is_empty() {
        cmd = cmd.arg("-d").arg(&user.home);
    }
    cmd.arg(&user.name)
}

/// Account deletion. `remove_home` additionally removes the home tree.
pub fn user_delete(name: &str, remove_home: bool) -> RemoteCommand {
    let mut cmd = RemoteCommand::new("userdel");
    if remove_home {
        cmd = cmd.arg("-r");
    }
    cmd.arg(name)
}

/// Create the per-account ssh authorization directory with the expected
/// mode. Key material itself is out of scope here.
pub fn prepare_auth_dir(home: &str) -> RemoteCommand {
    RemoteCommand::new("install")
        .arg("-d")
        .arg("-m")
        .arg("700")
        .arg(format!("{home}/.ssh"))
}

/// Copy the skeleton tree into the home directory.
pub fn copy_skeleton(skel_dir: &str, home: &str) -> RemoteCommand {
    RemoteCommand::new("cp").arg("-rT").arg(skel_dir).arg(home)
}

/// Recursively hand the home tree to the account and its login group.
pub fn chown_home(name: &str, home: &str) -> RemoteCommand {
    RemoteCommand::new("chown")
        .arg("-R")
        .arg(format!("{name}:"))
        .arg(home)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_quotes_spaces() {
        let cmd = RemoteCommand::new("useradd")
            .arg("-c")
            .arg("Alice Example")
            .arg("alice");
        assert_eq!(cmd.render(), "useradd -c 'Alice Example' alice");
    }

    #[test]
    fn test_render_neutralizes_shell_metacharacters() {
        let cmd = RemoteCommand::new("cp")
            .arg("-rT")
            .arg("/etc/skel")
            .arg("/home/alice; rm -rf /");
        let rendered = cmd.render();
        assert_eq!(rendered, "cp -rT /etc/skel '/home/alice; rm -rf /'");
    }

    #[test]
    fn test_user_add_full_record() {
        let user = User {
            name: "alice".into(),
            uid: "1001".into(),
            gid: "1001".into(),
            comment: "Alice".into(),
            home: "/home/alice".into(),
            shell: "/bin/zsh".into(),
            ..Default::default()
        };
        assert_eq!(
            user_add(&user).render(),
            "useradd -u 1001 -g 1001 -c Alice -s /bin/zsh -d /home/alice alice"
        );
    }

    #[test]
    fn test_user_add_omits_unset_fields() {
        let user = User::by_name("bob");
        assert_eq!(user_add(&user).render(), "useradd bob");
    }

    #[test]
    fn test_user_delete_flags() {
        assert_eq!(user_delete("alice", false).render(), "userdel alice");
        assert_eq!(user_delete("alice", true).render(), "userdel -r alice");
    }

    #[test]
    fn test_read_database() {
        assert_eq!(read_database().render(), "cat /etc/passwd");
    }

    #[test]
    fn test_home_commands() {
        assert_eq!(
            prepare_auth_dir("/home/alice").render(),
            "install -d -m 700 /home/alice/.ssh"
        );
        assert_eq!(
            copy_skeleton("/etc/skel", "/home/alice").render(),
            "cp -rT /etc/skel /home/alice"
        );
        assert_eq!(
            chown_home("alice", "/home/alice").render(),
            "chown -R alice: /home/alice"
        );
    }

    #[test]
    fn test_login_name_validation() {
        assert!(is_valid_login_name("alice"));
        assert!(is_valid_login_name("_svc-backup"));
        assert!(is_valid_login_name("machine$"));
        assert!(!is_valid_login_name(""));
        assert!(!is_valid_login_name("Alice"));
        assert!(!is_valid_login_name("a lice"));
        assert!(!is_valid_login_name("-alice"));
        assert!(!is_valid_login_name("al;ce"));
    }
}

//! Per-connection client: cached view of the remote user database plus
//! lookups against it.
//!
//! The cache has exactly two states. `Empty` means the next read goes to
//! the remote host; `Populated` mirrors the last successful read in file
//! order. Mutations always drop back to `Empty` (see `account`), so
//! there is never a partially updated view. One logical caller per
//! client: read-then-invalidate is not atomic, concurrent sharing needs
//! an external mutex.

use crate::command;
use crate::error::Result;
use crate::passwd::{self, User};
use crate::runner::CommandRunner;

/// Materialized view of the remote database.
#[derive(Debug, Clone, Default)]
pub enum UserCache {
    #[default]
    Empty,
    Populated(Vec<User>),
}

pub struct Client<R: CommandRunner> {
    runner: R,
    cache: UserCache,
    skel_dir: String,
}

pub const DEFAULT_SKEL_DIR: &str = "/etc/skel";

impl<R: CommandRunner> Client<R> {
    pub fn new(runner: R) -> Self {
        Client {
            runner,
            cache: UserCache::Empty,
            skel_dir: DEFAULT_SKEL_DIR.to_string(),
        }
    }

    /// Override the skeleton tree copied into new home directories.
    pub fn skel_dir(mut self, dir: impl Into<String>) -> Self {
        self.skel_dir = dir.into();
        self
    }

    pub(crate) fn skel(&self) -> &str {
        &self.skel_dir
    }

    pub(crate) fn runner(&self) -> &R {
        &self.runner
    }

    /// All users, from cache when populated, otherwise via a fresh
    /// remote read. A failed read (execution or parse) leaves the cache
    /// Empty and propagates.
    pub fn users(&mut self) -> Result<&[User]> {
        if let UserCache::Empty = self.cache {
            let raw = self.runner.run(&command::read_database().render())?;
            let users = passwd::parse(&raw.stdout)?;
            tracing::debug!(count = users.len(), "user database loaded");
            self.cache = UserCache::Populated(users);
        }
        match &self.cache {
            UserCache::Populated(users) => Ok(users),
            UserCache::Empty => unreachable!("cache populated above"),
        }
    }

    /// Drop the cached view. Next read hits the remote host again.
    pub fn clear_user_cache(&mut self) {
        self.cache = UserCache::Empty;
    }

    /// First record matching the query (uid OR name, see
    /// [`User::matches`]). `Ok(None)` means the database was read and
    /// holds no match; `Err` means the lookup itself could not be
    /// performed — callers decide how loudly to report that.
    pub fn find_user(&mut self, query: &User) -> Result<Option<User>> {
        let users = match self.users() {
            Ok(users) => users,
            Err(err) => {
                tracing::warn!(error = %err, "user lookup failed");
                return Err(err);
            }
        };
        Ok(users.iter().find(|u| u.matches(query)).cloned())
    }

    pub fn user_by_uid(&mut self, uid: &str) -> Result<Option<User>> {
        self.find_user(&User::by_uid(uid))
    }

    pub fn user_by_name(&mut self, name: &str) -> Result<Option<User>> {
        self.find_user(&User::by_name(name))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted runner for orchestration tests: canned responses in
    //! order, every executed command recorded.

    use std::cell::RefCell;

    use crate::error::{Error, Result};
    use crate::runner::{CommandRunner, ExecOutput};

    pub enum Script {
        /// Exit 0 with this stdout.
        Ok(&'static str),
        /// Nonzero exit with this combined output.
        Fail(i32, &'static str),
    }

    pub struct ScriptedRunner {
        script: RefCell<Vec<Script>>,
        pub commands: RefCell<Vec<String>>,
    }

    impl ScriptedRunner {
        pub fn new(mut script: Vec<Script>) -> Self {
            script.reverse();
            ScriptedRunner {
                script: RefCell::new(script),
                commands: RefCell::new(Vec::new()),
            }
        }

        pub fn executed(&self) -> Vec<String> {
            self.commands.borrow().clone()
        }
    }

    impl CommandRunner for ScriptedRunner {
        fn run(&self, command: &str) -> Result<ExecOutput> {
            self.commands.borrow_mut().push(command.to_string());
            match self.script.borrow_mut().pop() {
                Some(Script::Ok(stdout)) => Ok(ExecOutput {
                    stdout: stdout.to_string(),
                    stderr: String::new(),
                }),
                Some(Script::Fail(status, output)) => Err(Error::Execution {
                    command: command.to_string(),
                    status,
                    output: output.to_string(),
                }),
                None => panic!("unscripted command: {command}"),
            }
        }

        fn target(&self) -> String {
            "scripted".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{Script, ScriptedRunner};
    use super::*;

    const DB: &str = "root:x:0:0:root:/root:/bin/bash\n\
                      alice:x:1001:1001:Alice:/home/alice:/bin/bash\n\
                      bob:x:1002:1002:Bob:/home/bob:/bin/sh\n";

    #[test]
    fn test_users_reads_once_then_hits_cache() {
        let runner = ScriptedRunner::new(vec![Script::Ok(DB)]);
        let mut client = Client::new(runner);

        assert_eq!(client.users().unwrap().len(), 3);
        // second call must not consume another scripted response
        assert_eq!(client.users().unwrap().len(), 3);
        assert_eq!(client.runner().executed(), vec!["cat /etc/passwd"]);
    }

    #[test]
    fn test_clear_cache_forces_reread() {
        let runner = ScriptedRunner::new(vec![Script::Ok(DB), Script::Ok(DB)]);
        let mut client = Client::new(runner);

        client.users().unwrap();
        client.clear_user_cache();
        client.users().unwrap();
        assert_eq!(client.runner().executed().len(), 2);
    }

    #[test]
    fn test_read_failure_leaves_cache_empty() {
        let runner = ScriptedRunner::new(vec![
            Script::Fail(1, "cat: /etc/passwd: Permission denied"),
            Script::Ok(DB),
        ]);
        let mut client = Client::new(runner);

        assert!(client.users().is_err());
        // next call retries the remote read instead of serving a broken cache
        assert_eq!(client.users().unwrap().len(), 3);
    }

    #[test]
    fn test_parse_failure_propagates_and_leaves_cache_empty() {
        let runner = ScriptedRunner::new(vec![Script::Ok("short:line\n"), Script::Ok(DB)]);
        let mut client = Client::new(runner);

        assert!(matches!(
            client.users().unwrap_err(),
            crate::error::Error::Parse { line: 1, .. }
        ));
        assert_eq!(client.users().unwrap().len(), 3);
    }

    #[test]
    fn test_find_user_by_name_and_uid() {
        let runner = ScriptedRunner::new(vec![Script::Ok(DB)]);
        let mut client = Client::new(runner);

        let alice = client.user_by_name("alice").unwrap().unwrap();
        assert_eq!(alice.uid, "1001");
        let bob = client.user_by_uid("1002").unwrap().unwrap();
        assert_eq!(bob.name, "bob");
        assert!(client.user_by_name("carol").unwrap().is_none());
    }

    #[test]
    fn test_find_user_returns_first_match_in_file_order() {
        let db = "a:x:1:1::/a:/bin/sh\nb:x:1:2::/b:/bin/sh\n";
        let runner = ScriptedRunner::new(vec![Script::Ok(db)]);
        let mut client = Client::new(runner);

        let hit = client.user_by_uid("1").unwrap().unwrap();
        assert_eq!(hit.name, "a");
    }

    #[test]
    fn test_find_user_or_semantics_with_conflicting_query() {
        let runner = ScriptedRunner::new(vec![Script::Ok(DB)]);
        let mut client = Client::new(runner);

        // name matches alice, uid matches nobody: still a hit
        let query = User {
            name: "alice".into(),
            uid: "4242".into(),
            ..Default::default()
        };
        let hit = client.find_user(&query).unwrap().unwrap();
        assert_eq!(hit.name, "alice");
    }

    #[test]
    fn test_find_user_propagates_lookup_failure() {
        let runner = ScriptedRunner::new(vec![Script::Fail(255, "ssh: connect refused")]);
        let mut client = Client::new(runner);

        assert!(client.user_by_name("alice").is_err());
    }
}

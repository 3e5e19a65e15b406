//! Mutation orchestration: add, delete, home creation.
//!
//! Every mutation follows the same shape: validate locally, execute the
//! generated command, drop the cache, re-read, and verify the database
//! actually changed. The re-read is detection of silently ineffective
//! commands, not a retry; a failed command is surfaced exactly once.
//! Partially completed home setup is not rolled back.

use crate::client::Client;
use crate::command;
use crate::error::{Error, Result};
use crate::passwd::User;
use crate::runner::CommandRunner;

impl<R: CommandRunner> Client<R> {
    /// Create an account. Name is required; unset fields fall back to
    /// the remote useradd defaults. Idempotent: when the identity
    /// already resolves, the existing record is returned and no command
    /// is issued. With `create_home`, home setup runs after the account
    /// is verified.
    pub fn add_user(&mut self, desired: &User, create_home: bool) -> Result<User> {
        if desired.name.is_empty() {
            return Err(Error::Validation("user name cannot be empty".into()));
        }
        if !command::is_valid_login_name(&desired.name) {
            return Err(Error::Validation(format!(
                "invalid login name {:?}",
                desired.name
            )));
        }

        if let Some(existing) = self.find_user(desired)? {
            tracing::debug!(name = %existing.name, "user already present, add is a no-op");
            return Ok(existing);
        }

        self.runner().run(&command::user_add(desired).render())?;

        self.clear_user_cache();
        let added = self
            .find_user(desired)?
            .ok_or_else(|| Error::AddUnverified {
                name: desired.name.clone(),
            })?;
        tracing::info!(name = %added.name, uid = %added.uid, "user added");

        if create_home {
            self.create_home(&added)
        } else {
            Ok(added)
        }
    }

    /// Remove the account resolved by `query`. A nonexistent target is
    /// [`Error::NotFound`], not a silent no-op. On verification failure
    /// the pre-delete record rides along inside the error.
    pub fn delete_user(&mut self, query: &User, remove_home: bool) -> Result<User> {
        let found = self.find_user(query)?.ok_or_else(|| Error::NotFound {
            query: query.identity().to_string(),
        })?;
        if found.name.is_empty() {
            return Err(Error::Validation(
                "resolved user record has no name".into(),
            ));
        }

        self.runner()
            .run(&command::user_delete(&found.name, remove_home).render())?;

        self.clear_user_cache();
        if self.find_user(query)?.is_some() {
            return Err(Error::DeleteUnverified { stale: found });
        }
        tracing::info!(name = %found.name, "user deleted");
        Ok(found)
    }

    /// Set up the home directory: auth dir, skeleton copy, recursive
    /// chown, in that order. The first failure aborts; earlier steps
    /// stay in place.
    pub fn create_home(&mut self, user: &User) -> Result<User> {
        if user.name.is_empty() {
            return Err(Error::Validation("user name cannot be empty".into()));
        }
        let mut user = user.clone();
        if user.home.is_empty() {
            user.home = format!("/home/{}", user.name);
        }

        self.runner()
            .run(&command::prepare_auth_dir(&user.home).render())?;
        self.runner()
            .run(&command::copy_skeleton(self.skel(), &user.home).render())?;
        self.runner()
            .run(&command::chown_home(&user.name, &user.home).render())?;

        tracing::info!(name = %user.name, home = %user.home, "home directory created");
        Ok(user)
    }
}

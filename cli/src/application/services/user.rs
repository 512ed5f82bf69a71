//! User reconciler.

use anyhow::{Context, Result, bail};
use rigger_common::User;

use crate::application::ports::MachineAccess;
use crate::application::reconciler::{Diagnostics, Reconciler, invalid};
use crate::application::services::accounts::{check_account_name, database};
use crate::domain::accounts::{
    find_id, group_name, member_gids, membership_changes, primary_gid,
};
use crate::domain::{Cmd, ConfigError};

/// `useradd` exit status for an existing user.
const USERADD_EXISTS: i32 = 9;
/// `userdel` exit status for a user that does not exist.
const USERDEL_NO_SUCH_USER: i32 = 6;

pub struct UserReconciler<'a, M> {
    machine: &'a M,
}

impl<'a, M: MachineAccess> UserReconciler<'a, M> {
    pub fn new(machine: &'a M) -> Self {
        Self { machine }
    }

    async fn require_uid(&self, name: &str) -> Result<u32> {
        let db = database(self.machine, "passwd").await?;
        match find_id(&db, name) {
            Some(uid) => Ok(uid),
            None => bail!("user {name} not found in passwd database"),
        }
    }

    async fn add_to_group(&self, user: &str, gid: u32) -> Result<()> {
        self.machine
            .run_command(
                &Cmd::privileged("usermod")
                    .arg("-aG")
                    .arg(gid.to_string())
                    .arg(user),
            )
            .await
            .with_context(|| format!("adding user {user} to group {gid}"))?;
        Ok(())
    }

    async fn remove_from_group(&self, user: &str, gid: u32, group_db: &str) -> Result<()> {
        let Some(group) = group_name(group_db, gid) else {
            tracing::debug!(user, gid, "group no longer exists, skipping removal");
            return Ok(());
        };
        self.machine
            .run_command(&Cmd::privileged("gpasswd").arg("-d").arg(user).arg(&group))
            .await
            .with_context(|| format!("removing user {user} from group {group}"))?;
        Ok(())
    }
}

impl<M: MachineAccess> Reconciler for UserReconciler<'_, M> {
    type Model = User;

    fn validate(&self, model: &User) -> Result<(), ConfigError> {
        check_account_name(&model.name).map_err(invalid::<User>)
    }

    async fn create(&self, desired: User, _diags: &mut Diagnostics) -> Result<User> {
        match self
            .machine
            .run_command(&Cmd::privileged("useradd").arg("-m").arg(&desired.name))
            .await
        {
            Err(e) if e.exit_code() == Some(USERADD_EXISTS) => {
                tracing::debug!(user = %desired.name, "user already exists");
            }
            r => {
                r.with_context(|| format!("creating user {}", desired.name))?;
            }
        }
        for gid in membership_changes(&[], &desired.groups).add {
            self.add_to_group(&desired.name, gid).await?;
        }
        let uid = self.require_uid(&desired.name).await?;
        Ok(User {
            uid: Some(uid),
            ..desired
        })
    }

    async fn read(&self, tracked: User, _diags: &mut Diagnostics) -> Result<Option<User>> {
        let passwd = database(self.machine, "passwd").await?;
        let Some(uid) = find_id(&passwd, &tracked.name) else {
            return Ok(None);
        };
        let groups_db = database(self.machine, "group").await?;
        // The primary group never lists its own users as members.
        let mut members = member_gids(&groups_db, &tracked.name);
        members.extend(primary_gid(&passwd, &tracked.name));
        let groups = tracked
            .groups
            .iter()
            .copied()
            .filter(|gid| members.contains(gid))
            .collect();
        Ok(Some(User {
            uid: Some(uid),
            groups,
            ..tracked
        }))
    }

    async fn update(&self, prior: User, desired: User, _diags: &mut Diagnostics) -> Result<User> {
        if prior.name != desired.name {
            self.machine
                .run_command(
                    &Cmd::privileged("usermod")
                        .arg("-l")
                        .arg(&desired.name)
                        .arg(&prior.name),
                )
                .await
                .with_context(|| format!("renaming user {} to {}", prior.name, desired.name))?;
        }

        let changes = membership_changes(&prior.groups, &desired.groups);
        for gid in changes.add {
            self.add_to_group(&desired.name, gid).await?;
        }
        if !changes.remove.is_empty() {
            let group_db = database(self.machine, "group").await?;
            for gid in changes.remove {
                self.remove_from_group(&desired.name, gid, &group_db).await?;
            }
        }

        let uid = self.require_uid(&desired.name).await?;
        Ok(User {
            uid: Some(uid),
            ..desired
        })
    }

    async fn delete(&self, tracked: User, _diags: &mut Diagnostics) -> Result<()> {
        match self
            .machine
            .run_command(&Cmd::privileged("userdel").arg(&tracked.name))
            .await
        {
            Err(e) if e.exit_code() == Some(USERDEL_NO_SUCH_USER) => Ok(()),
            r => r
                .map(drop)
                .with_context(|| format!("deleting user {}", tracked.name)),
        }
    }
}

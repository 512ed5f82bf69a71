//! Group reconciler.

use anyhow::{Context, Result, bail};
use rigger_common::Group;

use crate::application::ports::MachineAccess;
use crate::application::reconciler::{Diagnostics, Reconciler, invalid};
use crate::application::services::accounts::{check_account_name, database};
use crate::domain::accounts::find_id;
use crate::domain::{Cmd, ConfigError};

/// `groupdel` exit status for a group that does not exist.
const GROUPDEL_NO_SUCH_GROUP: i32 = 6;

pub struct GroupReconciler<'a, M> {
    machine: &'a M,
}

impl<'a, M: MachineAccess> GroupReconciler<'a, M> {
    pub fn new(machine: &'a M) -> Self {
        Self { machine }
    }

    async fn lookup_gid(&self, name: &str) -> Result<Option<u32>> {
        let db = database(self.machine, "group").await?;
        Ok(find_id(&db, name))
    }

    async fn require_gid(&self, name: &str) -> Result<u32> {
        match self.lookup_gid(name).await? {
            Some(gid) => Ok(gid),
            None => bail!("group {name} not found in group database after creation"),
        }
    }
}

impl<M: MachineAccess> Reconciler for GroupReconciler<'_, M> {
    type Model = Group;

    fn validate(&self, model: &Group) -> Result<(), ConfigError> {
        check_account_name(&model.name).map_err(invalid::<Group>)
    }

    async fn create(&self, desired: Group, _diags: &mut Diagnostics) -> Result<Group> {
        // -f succeeds when the group already exists.
        self.machine
            .run_command(&Cmd::privileged("groupadd").arg("-f").arg(&desired.name))
            .await
            .with_context(|| format!("creating group {}", desired.name))?;
        let gid = self.require_gid(&desired.name).await?;
        Ok(Group {
            gid: Some(gid),
            ..desired
        })
    }

    async fn read(&self, tracked: Group, _diags: &mut Diagnostics) -> Result<Option<Group>> {
        Ok(self
            .lookup_gid(&tracked.name)
            .await?
            .map(|gid| Group {
                gid: Some(gid),
                ..tracked
            }))
    }

    async fn update(&self, prior: Group, desired: Group, _diags: &mut Diagnostics) -> Result<Group> {
        if prior.name != desired.name {
            self.machine
                .run_command(
                    &Cmd::privileged("groupmod")
                        .arg("-n")
                        .arg(&desired.name)
                        .arg(&prior.name),
                )
                .await
                .with_context(|| format!("renaming group {} to {}", prior.name, desired.name))?;
        }
        let gid = self.require_gid(&desired.name).await?;
        Ok(Group {
            gid: Some(gid),
            ..desired
        })
    }

    async fn delete(&self, tracked: Group, _diags: &mut Diagnostics) -> Result<()> {
        match self
            .machine
            .run_command(&Cmd::privileged("groupdel").arg(&tracked.name))
            .await
        {
            Err(e) if e.exit_code() == Some(GROUPDEL_NO_SUCH_GROUP) => Ok(()),
            r => r
                .map(drop)
                .with_context(|| format!("deleting group {}", tracked.name)),
        }
    }
}

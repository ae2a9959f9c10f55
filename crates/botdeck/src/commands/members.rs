//! Member roster handlers.

use botdeck_core::{CoreError, Dashboard, DashboardConfig, Member};
use tabled::Tabled;

use crate::cli::{GlobalOpts, MemberEditArgs, MembersArgs, MembersCommand};
use crate::error::CliError;
use crate::output::{self, Painter};

use super::util;

#[derive(Tabled)]
struct MemberRow {
    #[tabled(rename = "QQ")]
    qq: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Nickname")]
    nickname: String,
    #[tabled(rename = "Group card")]
    group_card: String,
    #[tabled(rename = "Active")]
    active: String,
    #[tabled(rename = "Messages")]
    messages: u64,
    #[tabled(rename = "Last active")]
    last_active: String,
}

fn member_row(m: &Member) -> MemberRow {
    MemberRow {
        qq: m.qq.clone(),
        name: m.qq_name.clone().unwrap_or_default(),
        nickname: m.nickname.clone().unwrap_or_default(),
        group_card: m.group_card.clone().unwrap_or_default(),
        active: String::from(if m.is_active { "yes" } else { "no" }),
        messages: m.message_count,
        last_active: m.last_active.clone().unwrap_or_default(),
    }
}

pub async fn handle(
    config: DashboardConfig,
    args: MembersArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        MembersCommand::List => {
            let dashboard = util::dashboard(config)?;
            let members = dashboard
                .client()
                .list_members()
                .await
                .map_err(util::core_err)?;
            let out = output::render_list(global.output, &members, member_row, |m| {
                m.qq.clone()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        MembersCommand::Edit(edit) => {
            if !edit.has_changes() {
                return Err(CliError::Validation {
                    field: "members edit".into(),
                    reason: "nothing to change; pass at least one field flag".into(),
                });
            }
            util::with_session(config, global, |dashboard| async move {
                open_draft(&dashboard, &edit.qq).await?;
                let draft = dashboard.edit_draft(move |m| edit.apply(m)).await?;
                dashboard.save_member().await?;
                if !global.quiet {
                    eprintln!(
                        "{} Member {} saved",
                        Painter::new(global.color).good("✓"),
                        draft.display_name()
                    );
                }
                Ok(())
            })
            .await
        }
    }
}

/// Open the draft; an unknown member is re-checked against a fresh
/// roster so a failed initial load reports the real cause.
async fn open_draft(dashboard: &Dashboard, qq: &str) -> Result<Member, CliError> {
    match dashboard.start_edit(qq).await {
        Err(CoreError::MemberNotFound { .. }) => {
            dashboard.refresh_members().await?;
            Ok(dashboard.start_edit(qq).await?)
        }
        other => Ok(other?),
    }
}

impl MemberEditArgs {
    fn has_changes(&self) -> bool {
        self.nickname.is_some()
            || self.group_card.is_some()
            || self.birthday.is_some()
            || self.notes.is_some()
            || self.active
            || self.inactive
    }

    /// Empty strings clear a field.
    fn apply(self, member: &mut Member) {
        fn field(value: Option<String>, slot: &mut Option<String>) {
            if let Some(v) = value {
                *slot = if v.is_empty() { None } else { Some(v) };
            }
        }
        field(self.nickname, &mut member.nickname);
        field(self.group_card, &mut member.group_card);
        field(self.birthday, &mut member.birthday);
        field(self.notes, &mut member.notes);
        if self.active {
            member.is_active = true;
        } else if self.inactive {
            member.is_active = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> MemberEditArgs {
        MemberEditArgs {
            qq: "10001".into(),
            nickname: None,
            group_card: None,
            birthday: None,
            notes: None,
            active: false,
            inactive: false,
        }
    }

    #[test]
    fn apply_sets_and_clears_fields() {
        let mut member = Member::new("10001");
        member.notes = Some("old".into());

        let mut edit = args();
        edit.nickname = Some("小A".into());
        edit.notes = Some(String::new());
        edit.inactive = true;
        assert!(edit.has_changes());
        edit.apply(&mut member);

        assert_eq!(member.nickname.as_deref(), Some("小A"));
        assert_eq!(member.notes, None);
        assert!(!member.is_active);
    }

    #[test]
    fn no_flags_means_no_changes() {
        assert!(!args().has_changes());
    }
}

// ── Member edit session ──
//
// Single-slot edit workflow for roster entries:
//
//   Idle ── start_edit ──▶ Editing ── begin_save ──▶ Saving ── succeeded ──▶ Idle
//                            ▲  │                      │
//                            │  └──── cancel ──▶ Idle  │
//                            └────── save_failed ──────┘
//
// While a session is open the draft is what the roster shows for that
// member, whatever the server list says.

use botdeck_api::Member;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CoreError;

/// What happens to an unsaved draft when another edit starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditPolicy {
    /// Silently drop the old draft.
    #[default]
    DiscardUnsaved,
    /// Refuse while the old draft differs from what was loaded.
    RejectDirty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EditPhase {
    Idle,
    Editing,
    Saving,
}

#[derive(Debug, Clone)]
struct Slot {
    original: Member,
    draft: Member,
    saving: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MemberEditSession {
    policy: EditPolicy,
    slot: Option<Slot>,
}

impl MemberEditSession {
    pub fn new(policy: EditPolicy) -> Self {
        Self { policy, slot: None }
    }

    pub fn policy(&self) -> EditPolicy {
        self.policy
    }

    pub fn phase(&self) -> EditPhase {
        match &self.slot {
            None => EditPhase::Idle,
            Some(slot) if slot.saving => EditPhase::Saving,
            Some(_) => EditPhase::Editing,
        }
    }

    /// Id of the member being edited, if any.
    pub fn editing_id(&self) -> Option<&str> {
        self.slot.as_ref().map(|s| s.draft.qq.as_str())
    }

    pub fn draft(&self) -> Option<&Member> {
        self.slot.as_ref().map(|s| &s.draft)
    }

    /// The draft differs from the member as it was when the edit began.
    pub fn is_dirty(&self) -> bool {
        self.slot.as_ref().is_some_and(|s| s.draft != s.original)
    }

    /// Open a draft copied from `member`.
    ///
    /// An open draft is replaced according to the policy; the discarded
    /// draft is returned. Fails while a save is in flight.
    pub fn start_edit(&mut self, member: &Member) -> Result<Option<Member>, CoreError> {
        if let Some(slot) = &self.slot {
            if slot.saving {
                return Err(CoreError::SaveInProgress);
            }
            if self.policy == EditPolicy::RejectDirty && self.is_dirty() {
                return Err(CoreError::EditConflict {
                    qq: slot.draft.qq.clone(),
                });
            }
        }
        let previous = self.slot.replace(Slot {
            original: member.clone(),
            draft: member.clone(),
            saving: false,
        });
        if let Some(prev) = &previous {
            debug!(qq = %prev.draft.qq, "discarding open member draft");
        }
        Ok(previous.map(|s| s.draft))
    }

    /// Change the draft. The identity key cannot be edited.
    pub fn update(&mut self, edit: impl FnOnce(&mut Member)) -> Result<(), CoreError> {
        let slot = self.slot.as_mut().ok_or(CoreError::NoActiveEdit)?;
        if slot.saving {
            return Err(CoreError::SaveInProgress);
        }
        edit(&mut slot.draft);
        slot.draft.qq.clone_from(&slot.original.qq);
        Ok(())
    }

    /// Enter `Saving` and hand out the draft to send.
    pub fn begin_save(&mut self) -> Result<Member, CoreError> {
        let slot = self.slot.as_mut().ok_or(CoreError::NoActiveEdit)?;
        if slot.saving {
            return Err(CoreError::SaveInProgress);
        }
        slot.saving = true;
        Ok(slot.draft.clone())
    }

    /// The update for `qq` was accepted: close the session. A result for a
    /// session that was cancelled in the meantime is ignored.
    pub fn save_succeeded(&mut self, qq: &str) {
        if self.editing_id() == Some(qq) {
            self.slot = None;
        }
    }

    /// The update for `qq` failed: back to `Editing` with the draft intact.
    pub fn save_failed(&mut self, qq: &str) {
        if let Some(slot) = self.slot.as_mut().filter(|s| s.draft.qq == qq) {
            slot.saving = false;
        }
    }

    /// Drop the draft unconditionally.
    pub fn cancel(&mut self) -> Option<Member> {
        self.slot.take().map(|s| s.draft)
    }

    /// Show the draft in place of the edited member's entry. A member the
    /// server list no longer carries is appended, so the draft stays
    /// visible until the session ends.
    pub fn overlay(&self, members: &mut Vec<Member>) {
        let Some(draft) = self.draft() else { return };
        match members.iter_mut().find(|m| m.qq == draft.qq) {
            Some(entry) => entry.clone_from(draft),
            None => members.push(draft.clone()),
        }
    }
}

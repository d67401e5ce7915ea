// src/service/policy_reconciler.rs

//! Policy acceptance decisions.
//!
//! Everything in this module is pure: callers load the configuration and the user's
//! record, and persist the returned [`AttributeChange`]s themselves.

use crate::domain::policy::{
    AcceptancePolicySet, AttributeChange, PolicyConfig, PolicySlot, UserPolicyRecord,
    RESERVED_ADMIN_UID,
};
use crate::types::acceptance_timestamp;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

pub const POLICY_ACCEPTANCE_REQUIRED: &str = "policy_acceptance_required";
pub const ACCEPT_POLICIES_LOGIN_PATH: &str = "/legal/acceptpolicies?login=1";
pub const LOGIN_VETO_MESSAGE: &str = "Your log-in request was not completed. You must review and confirm your acceptance of one or more site policies prior to logging in.";

/// Which slots the site currently enforces.
pub fn active_policies(config: &PolicyConfig) -> AcceptancePolicySet<bool> {
    AcceptancePolicySet {
        terms_of_use: config.terms_of_use_active,
        privacy_policy: config.privacy_policy_active,
        age_policy: config.minimum_age != 0,
        cancellation_right_policy: config.cancellation_right_policy_active,
        trade_conditions: config.trade_conditions_active,
    }
}

/// Which slots the user has a stored acceptance for.
///
/// Reserved accounts (guest and site administrator) count as having accepted everything.
pub fn accepted_policies(record: &UserPolicyRecord) -> AcceptancePolicySet<bool> {
    if is_exempt(record.uid) {
        return AcceptancePolicySet::all(true);
    }
    AcceptancePolicySet::from_fn(|slot| record.has_accepted(slot))
}

pub fn is_exempt(uid: i32) -> bool {
    uid <= RESERVED_ADMIN_UID
}

/// Slots shown on `subject_uid`'s profile to `viewer_uid`.
pub fn viewable_policies(
    active: &AcceptancePolicySet<bool>,
    subject_uid: i32,
    viewer_uid: Option<i32>,
) -> AcceptancePolicySet<bool> {
    let may_view =
        viewer_uid.is_some_and(|viewer| viewer == subject_uid || viewer == RESERVED_ADMIN_UID);
    AcceptancePolicySet::from_fn(|slot| may_view && slot.shown_on_profile() && active.is(slot))
}

/// Result of the login check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginVeto {
    pub blocked: bool,
    /// Login-gating slots that are active but not yet accepted.
    pub outstanding: Vec<PolicySlot>,
}

impl LoginVeto {
    pub fn allowed() -> Self {
        Self {
            blocked: false,
            outstanding: Vec::new(),
        }
    }

    pub fn reason(&self) -> Option<&'static str> {
        self.blocked.then_some(POLICY_ACCEPTANCE_REQUIRED)
    }

    pub fn redirect_url(&self) -> Option<&'static str> {
        self.blocked.then_some(ACCEPT_POLICIES_LOGIN_PATH)
    }

    pub fn message(&self) -> Option<&'static str> {
        self.blocked.then_some(LOGIN_VETO_MESSAGE)
    }
}

/// Decides whether a login must be interrupted.
///
/// Only terms of use, privacy policy and age policy are checked here.
pub fn evaluate_login_veto(
    active: &AcceptancePolicySet<bool>,
    accepted: &AcceptancePolicySet<bool>,
) -> LoginVeto {
    let outstanding: Vec<PolicySlot> = PolicySlot::ALL
        .into_iter()
        .filter(|slot| slot.gates_login() && active.is(*slot) && !accepted.is(*slot))
        .collect();

    if outstanding.is_empty() {
        LoginVeto::allowed()
    } else {
        LoginVeto {
            blocked: true,
            outstanding,
        }
    }
}

/// Message shown next to an unchecked, required check box.
pub fn slot_error_message(slot: PolicySlot, minimum_age: u32) -> String {
    match slot {
        PolicySlot::TermsOfUse => {
            "You must accept this site's Terms of Use in order to proceed.".to_string()
        }
        PolicySlot::PrivacyPolicy => {
            "You must accept this site's Privacy Policy in order to proceed.".to_string()
        }
        PolicySlot::AgePolicy => format!(
            "In order to log in, you must confirm that you meet the requirements of this site's Minimum Age Policy. If you are not {minimum_age} years of age or older, and you do not have a parent's permission to use this site, then please ask your parent to contact a site administrator."
        ),
        PolicySlot::CancellationRightPolicy => {
            "You must accept our cancellation right policy in order to proceed.".to_string()
        }
        PolicySlot::TradeConditions => {
            "You must accept our general terms and conditions of trade in order to proceed."
                .to_string()
        }
    }
}

/// Result of processing the acceptance form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionOutcome {
    /// Keyed by [`PolicySlot::field_key`]. Empty on success.
    pub field_errors: BTreeMap<&'static str, String>,
    pub processed_ok: bool,
    /// Snapshot for re-display: the submitted flags on error, the merged state otherwise.
    pub accepted_policies: AcceptancePolicySet<bool>,
    pub changes: Vec<AttributeChange>,
}

impl SubmissionOutcome {
    pub fn has_errors(&self) -> bool {
        !self.field_errors.is_empty()
    }
}

/// Reconciles the acceptance form against what the user had already accepted.
///
/// Never produces a [`AttributeChange::Delete`]; acceptance is only ever added here.
pub fn reconcile_submission(
    uid: i32,
    config: &PolicyConfig,
    original: &AcceptancePolicySet<bool>,
    submitted: &AcceptancePolicySet<bool>,
    now: DateTime<Utc>,
) -> SubmissionOutcome {
    let active = active_policies(config);

    let field_errors: BTreeMap<&'static str, String> = PolicySlot::ALL
        .into_iter()
        .filter(|slot| active.is(*slot) && !original.is(*slot) && !submitted.is(*slot))
        .map(|slot| (slot.field_key(), slot_error_message(slot, config.minimum_age)))
        .collect();

    if !field_errors.is_empty() {
        return SubmissionOutcome {
            field_errors,
            processed_ok: false,
            accepted_policies: *submitted,
            changes: Vec::new(),
        };
    }

    let written = AcceptancePolicySet::from_fn(|slot| active.is(slot) && submitted.is(slot));
    let value = acceptance_timestamp(now);
    let changes = written
        .iter()
        .filter(|(_, write)| **write)
        .map(|(slot, _)| AttributeChange::Set {
            uid,
            slot,
            value: value.clone(),
        })
        .collect();

    let processed_ok = PolicySlot::ALL
        .into_iter()
        .all(|slot| !active.is(slot) || original.is(slot) || written.is(slot));

    SubmissionOutcome {
        field_errors,
        processed_ok,
        accepted_policies: AcceptancePolicySet::from_fn(|slot| {
            original.is(slot) || written.is(slot)
        }),
        changes,
    }
}

/// Applies the single consent check box of the profile / registration form.
///
/// Only active slots are touched: consent stamps them, a cleared check box revokes them.
/// Inactive slots keep whatever was stored. `None` means the form carried no policy block.
pub fn reconcile_profile_edit(
    uid: i32,
    active: &AcceptancePolicySet<bool>,
    consent: Option<bool>,
    now: DateTime<Utc>,
) -> Vec<AttributeChange> {
    let Some(consent) = consent else {
        return Vec::new();
    };

    let value = acceptance_timestamp(now);
    PolicySlot::ALL
        .into_iter()
        .filter(|slot| active.is(*slot))
        .map(|slot| {
            if consent {
                AttributeChange::Set {
                    uid,
                    slot,
                    value: value.clone(),
                }
            } else {
                AttributeChange::Delete { uid, slot }
            }
        })
        .collect()
}

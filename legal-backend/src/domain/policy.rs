// src/domain/policy.rs

//! Value types for legal policy acceptance.
//!
//! A user's acceptance of each policy slot is stored as a user attribute holding the
//! acceptance timestamp. Site-wide settings decide which slots are enforced.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// ゲストアカウントのuid
pub const GUEST_UID: i32 = 1;

/// サイト管理者のuid。これ以下のuidはポリシー承認の対象外
pub const RESERVED_ADMIN_UID: i32 = 2;

/// One of the five acceptance categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PolicySlot {
    TermsOfUse,
    PrivacyPolicy,
    AgePolicy,
    CancellationRightPolicy,
    TradeConditions,
}

impl PolicySlot {
    pub const ALL: [PolicySlot; 5] = [
        PolicySlot::TermsOfUse,
        PolicySlot::PrivacyPolicy,
        PolicySlot::AgePolicy,
        PolicySlot::CancellationRightPolicy,
        PolicySlot::TradeConditions,
    ];

    /// User attribute holding the acceptance timestamp.
    pub fn attribute_name(self) -> &'static str {
        match self {
            PolicySlot::TermsOfUse => "_Legal_termsOfUseAccepted",
            PolicySlot::PrivacyPolicy => "_Legal_privacyPolicyAccepted",
            PolicySlot::AgePolicy => "_Legal_agePolicyConfirmed",
            PolicySlot::CancellationRightPolicy => "_Legal_cancellationRightPolicyAccepted",
            PolicySlot::TradeConditions => "_Legal_tradeConditionsAccepted",
        }
    }

    /// Short key used for field errors.
    pub fn field_key(self) -> &'static str {
        match self {
            PolicySlot::TermsOfUse => "termsofuse",
            PolicySlot::PrivacyPolicy => "privacypolicy",
            PolicySlot::AgePolicy => "agepolicy",
            PolicySlot::CancellationRightPolicy => "cancellationrightpolicy",
            PolicySlot::TradeConditions => "tradeconditions",
        }
    }

    /// Name of the check box submitted by the acceptance form.
    pub fn form_field(self) -> &'static str {
        match self {
            PolicySlot::TermsOfUse => "acceptedpolicies_termsofuse",
            PolicySlot::PrivacyPolicy => "acceptedpolicies_privacypolicy",
            PolicySlot::AgePolicy => "acceptedpolicies_agepolicy",
            PolicySlot::CancellationRightPolicy => "acceptedpolicies_cancellationrightpolicy",
            PolicySlot::TradeConditions => "acceptedpolicies_tradeconditions",
        }
    }

    /// Whether an outstanding acceptance of this slot vetoes a login.
    ///
    /// Trade conditions and the cancellation right policy are not checked at login time
    /// even when active; they are still enforced by the acceptance form.
    pub fn gates_login(self) -> bool {
        matches!(
            self,
            PolicySlot::TermsOfUse | PolicySlot::PrivacyPolicy | PolicySlot::AgePolicy
        )
    }

    /// Whether the slot is shown on a user's profile page.
    pub fn shown_on_profile(self) -> bool {
        matches!(
            self,
            PolicySlot::TermsOfUse | PolicySlot::PrivacyPolicy | PolicySlot::AgePolicy
        )
    }
}

/// One value per policy slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptancePolicySet<T> {
    pub terms_of_use: T,
    pub privacy_policy: T,
    pub age_policy: T,
    pub cancellation_right_policy: T,
    pub trade_conditions: T,
}

impl<T> AcceptancePolicySet<T> {
    pub fn from_fn(mut f: impl FnMut(PolicySlot) -> T) -> Self {
        Self {
            terms_of_use: f(PolicySlot::TermsOfUse),
            privacy_policy: f(PolicySlot::PrivacyPolicy),
            age_policy: f(PolicySlot::AgePolicy),
            cancellation_right_policy: f(PolicySlot::CancellationRightPolicy),
            trade_conditions: f(PolicySlot::TradeConditions),
        }
    }

    pub fn get(&self, slot: PolicySlot) -> &T {
        match slot {
            PolicySlot::TermsOfUse => &self.terms_of_use,
            PolicySlot::PrivacyPolicy => &self.privacy_policy,
            PolicySlot::AgePolicy => &self.age_policy,
            PolicySlot::CancellationRightPolicy => &self.cancellation_right_policy,
            PolicySlot::TradeConditions => &self.trade_conditions,
        }
    }

    pub fn set(&mut self, slot: PolicySlot, value: T) {
        match slot {
            PolicySlot::TermsOfUse => self.terms_of_use = value,
            PolicySlot::PrivacyPolicy => self.privacy_policy = value,
            PolicySlot::AgePolicy => self.age_policy = value,
            PolicySlot::CancellationRightPolicy => self.cancellation_right_policy = value,
            PolicySlot::TradeConditions => self.trade_conditions = value,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (PolicySlot, &T)> + '_ {
        PolicySlot::ALL.into_iter().map(move |slot| (slot, self.get(slot)))
    }
}

impl AcceptancePolicySet<bool> {
    pub fn all(value: bool) -> Self {
        Self::from_fn(|_| value)
    }

    pub fn is(&self, slot: PolicySlot) -> bool {
        *self.get(slot)
    }

    /// Number of slots set to `true`.
    pub fn count(&self) -> usize {
        self.iter().filter(|(_, value)| **value).count()
    }

    pub fn any(&self) -> bool {
        self.count() > 0
    }
}

/// Legal documents served by the `/legal` endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegalDocument {
    LegalNotice,
    TermsOfUse,
    PrivacyPolicy,
    AccessibilityStatement,
    CancellationRightPolicy,
    TradeConditions,
}

impl LegalDocument {
    pub const ALL: [LegalDocument; 6] = [
        LegalDocument::LegalNotice,
        LegalDocument::TermsOfUse,
        LegalDocument::PrivacyPolicy,
        LegalDocument::AccessibilityStatement,
        LegalDocument::CancellationRightPolicy,
        LegalDocument::TradeConditions,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            LegalDocument::LegalNotice => "legalnotice",
            LegalDocument::TermsOfUse => "termsofuse",
            LegalDocument::PrivacyPolicy => "privacypolicy",
            LegalDocument::AccessibilityStatement => "accessibilitystatement",
            LegalDocument::CancellationRightPolicy => "cancellationrightpolicy",
            LegalDocument::TradeConditions => "tradeconditions",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|doc| doc.slug() == slug)
    }

    fn active_key(self) -> &'static str {
        match self {
            LegalDocument::LegalNotice => setting_keys::LEGAL_NOTICE_ACTIVE,
            LegalDocument::TermsOfUse => setting_keys::TERMS_OF_USE_ACTIVE,
            LegalDocument::PrivacyPolicy => setting_keys::PRIVACY_POLICY_ACTIVE,
            LegalDocument::AccessibilityStatement => setting_keys::ACCESSIBILITY_STATEMENT_ACTIVE,
            LegalDocument::CancellationRightPolicy => {
                setting_keys::CANCELLATION_RIGHT_POLICY_ACTIVE
            }
            LegalDocument::TradeConditions => setting_keys::TRADE_CONDITIONS_ACTIVE,
        }
    }

    fn url_key(self) -> &'static str {
        match self {
            LegalDocument::LegalNotice => setting_keys::LEGAL_NOTICE_URL,
            LegalDocument::TermsOfUse => setting_keys::TERMS_OF_USE_URL,
            LegalDocument::PrivacyPolicy => setting_keys::PRIVACY_POLICY_URL,
            LegalDocument::AccessibilityStatement => setting_keys::ACCESSIBILITY_STATEMENT_URL,
            LegalDocument::CancellationRightPolicy => setting_keys::CANCELLATION_RIGHT_POLICY_URL,
            LegalDocument::TradeConditions => setting_keys::TRADE_CONDITIONS_URL,
        }
    }
}

/// legal_settings テーブルのキー
pub mod setting_keys {
    pub const LEGAL_NOTICE_ACTIVE: &str = "legalNoticeActive";
    pub const TERMS_OF_USE_ACTIVE: &str = "termsOfUseActive";
    pub const PRIVACY_POLICY_ACTIVE: &str = "privacyPolicyActive";
    pub const ACCESSIBILITY_STATEMENT_ACTIVE: &str = "accessibilityStatementActive";
    pub const CANCELLATION_RIGHT_POLICY_ACTIVE: &str = "cancellationRightPolicyActive";
    pub const TRADE_CONDITIONS_ACTIVE: &str = "tradeConditionsActive";
    pub const LEGAL_NOTICE_URL: &str = "legalNoticeUrl";
    pub const TERMS_OF_USE_URL: &str = "termsOfUseUrl";
    pub const PRIVACY_POLICY_URL: &str = "privacyPolicyUrl";
    pub const ACCESSIBILITY_STATEMENT_URL: &str = "accessibilityStatementUrl";
    pub const CANCELLATION_RIGHT_POLICY_URL: &str = "cancellationRightPolicyUrl";
    pub const TRADE_CONDITIONS_URL: &str = "tradeConditionsUrl";
    pub const MINIMUM_AGE: &str = "minimumAge";
}

/// Site-wide policy settings, loaded once per request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyConfig {
    pub terms_of_use_active: bool,
    pub privacy_policy_active: bool,
    /// 0 disables the age policy; any other value is only displayed.
    pub minimum_age: u32,
    pub cancellation_right_policy_active: bool,
    pub trade_conditions_active: bool,
    pub legal_notice_active: bool,
    pub accessibility_statement_active: bool,
    pub custom_urls: BTreeMap<LegalDocument, String>,
}

impl PolicyConfig {
    /// Build the configuration from raw `legal_settings` rows.
    pub fn from_settings(settings: &HashMap<String, String>) -> Self {
        let flag = |doc: LegalDocument| {
            settings
                .get(doc.active_key())
                .is_some_and(|v| parse_flag(v))
        };

        let custom_urls = LegalDocument::ALL
            .into_iter()
            .filter_map(|doc| {
                settings
                    .get(doc.url_key())
                    .map(|url| url.trim())
                    .filter(|url| !url.is_empty())
                    .map(|url| (doc, url.to_string()))
            })
            .collect();

        Self {
            terms_of_use_active: flag(LegalDocument::TermsOfUse),
            privacy_policy_active: flag(LegalDocument::PrivacyPolicy),
            minimum_age: settings
                .get(setting_keys::MINIMUM_AGE)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0),
            cancellation_right_policy_active: flag(LegalDocument::CancellationRightPolicy),
            trade_conditions_active: flag(LegalDocument::TradeConditions),
            legal_notice_active: flag(LegalDocument::LegalNotice),
            accessibility_statement_active: flag(LegalDocument::AccessibilityStatement),
            custom_urls,
        }
    }

    pub fn is_document_active(&self, document: LegalDocument) -> bool {
        match document {
            LegalDocument::LegalNotice => self.legal_notice_active,
            LegalDocument::TermsOfUse => self.terms_of_use_active,
            LegalDocument::PrivacyPolicy => self.privacy_policy_active,
            LegalDocument::AccessibilityStatement => self.accessibility_statement_active,
            LegalDocument::CancellationRightPolicy => self.cancellation_right_policy_active,
            LegalDocument::TradeConditions => self.trade_conditions_active,
        }
    }

    pub fn custom_url(&self, document: LegalDocument) -> Option<&str> {
        self.custom_urls.get(&document).map(String::as_str)
    }
}

/// Interprets a stored setting or check box value.
pub fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "" | "0" | "false" | "off" | "no"
    )
}

/// A user's stored acceptance timestamps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPolicyRecord {
    pub uid: i32,
    pub accepted_at: AcceptancePolicySet<Option<String>>,
}

impl UserPolicyRecord {
    pub fn from_attributes(uid: i32, attributes: &HashMap<String, String>) -> Self {
        Self {
            uid,
            accepted_at: AcceptancePolicySet::from_fn(|slot| {
                attributes.get(slot.attribute_name()).cloned()
            }),
        }
    }

    /// 空文字列は未承認として扱う。空白のみの値は承認済み
    pub fn has_accepted(&self, slot: PolicySlot) -> bool {
        self.accepted_at
            .get(slot)
            .as_deref()
            .is_some_and(|value| !value.is_empty())
    }
}

/// A write the caller must apply to the attribute store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeChange {
    Set {
        uid: i32,
        slot: PolicySlot,
        value: String,
    },
    Delete {
        uid: i32,
        slot: PolicySlot,
    },
}

impl AttributeChange {
    pub fn slot(&self) -> PolicySlot {
        match self {
            AttributeChange::Set { slot, .. } | AttributeChange::Delete { slot, .. } => *slot,
        }
    }
}

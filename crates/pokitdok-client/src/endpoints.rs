//! Named platform operations
//!
//! Each operation maps to one verb and path template. Template placeholders:
//!
//! - `{name}`: required path parameter
//! - `{name?}`: optional parameter, replaced by nothing when absent
//! - `{/name?}`: optional trailing segment, dropped together with its slash
//!
//! Path arguments are positional, in template order. An empty argument counts
//! as absent. Each argument is percent-encoded as one path segment, so `/`,
//! `?` and `#` inside an id cannot change the endpoint.

use crate::dispatcher::Verb;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub name: &'static str,
    pub verb: Verb,
    pub path: &'static str,
    pub accepts_file: bool,
    pub deprecated: bool,
    /// Operation to migrate to, for deprecated entries that have one.
    pub replacement: Option<&'static str>,
}

const fn op(name: &'static str, verb: Verb, path: &'static str) -> EndpointDescriptor {
    EndpointDescriptor {
        name,
        verb,
        path,
        accepts_file: false,
        deprecated: false,
        replacement: None,
    }
}

impl EndpointDescriptor {
    const fn upload(self) -> Self {
        Self {
            accepts_file: true,
            ..self
        }
    }

    const fn deprecated(self) -> Self {
        Self {
            deprecated: true,
            ..self
        }
    }

    const fn replaced_by(self, replacement: &'static str) -> Self {
        Self {
            deprecated: true,
            replacement: Some(replacement),
            ..self
        }
    }

    /// Substitute positional path arguments into the template.
    pub fn render(&self, args: &[&str]) -> Result<String> {
        render_path(self.path, args)
    }

    /// Human-readable deprecation notice, if any.
    pub fn deprecation_notice(&self) -> Option<String> {
        if !self.deprecated {
            return None;
        }
        Some(match self.replacement {
            Some(replacement) => format!(
                "`{}` will be removed in a future release; use `{replacement}` instead",
                self.name
            ),
            None => format!("`{}` will be removed in a future release", self.name),
        })
    }
}

use Verb::{Delete, Get, Post, Put};

pub static ENDPOINTS: &[EndpointDescriptor] = &[
    // General
    op("activities", Get, "activities/{activity_id?}"),
    op("trading_partners", Get, "tradingpartners/{trading_partner_id?}"),
    // X12
    op("authorizations", Post, "authorizations/"),
    op("claims", Post, "claims/"),
    op("claims_status", Post, "claims/status"),
    op("claims_convert", Post, "claims/convert").upload(),
    op("eligibility", Post, "eligibility/"),
    op("enrollment", Post, "enrollment/").deprecated(),
    op("enrollment_snapshot", Post, "enrollment/snapshot/{trading_partner_id}")
        .upload()
        .deprecated(),
    op("enrollment_snapshots", Get, "enrollment/snapshot{/snapshot_id?}").deprecated(),
    op("enrollment_snapshot_data", Get, "enrollment/snapshot/{snapshot_id}/data").deprecated(),
    op("referrals", Post, "referrals/"),
    // Data
    op("cash_prices", Get, "prices/cash"),
    op("icd_convert", Get, "icd/convert/{code}"),
    op("mpc", Get, "mpc/"),
    op("insurance_prices", Get, "prices/insurance"),
    op("oop_insurance_estimate", Post, "oop/insurance-estimate"),
    op("oop_insurance_prices", Post, "oop/insurance-load-price"),
    op("payers", Get, "payers/").replaced_by("trading_partners"),
    op("plans", Get, "plans/"),
    op("providers", Get, "providers/"),
    // Pharmacy
    op("pharmacy_plans", Get, "pharmacy/plans"),
    op("pharmacy_formulary", Get, "pharmacy/formulary"),
    op("pharmacy_network", Get, "pharmacy/network{/npi?}"),
    // Scheduling
    op("appointment", Get, "schedule/appointmenttypes/{appointment_id}")
        .replaced_by("appointment_types"),
    op("get_appointments", Get, "schedule/appointments/{appointment_uuid?}"),
    op("appointments", Get, "schedule/appointments/{appointment_uuid?}")
        .replaced_by("get_appointments"),
    op("appointment_type", Get, "schedule/appointmenttypes/{uuid}")
        .replaced_by("appointment_types"),
    op("appointment_types", Get, "schedule/appointmenttypes/{appointment_type_uuid?}"),
    op("book_appointment", Put, "schedule/appointments/{appointment_uuid}"),
    op("cancel_appointment", Delete, "schedule/appointments/{appointment_uuid}"),
    op("open_appointment_slots", Get, "schedule/appointments").replaced_by("get_appointments"),
    op("schedulers", Get, "schedule/schedulers/{scheduler_uuid?}"),
    op("scheduler", Get, "schedule/schedulers/{uuid}").replaced_by("schedulers"),
    op("schedule_slots", Post, "schedule/slots/"),
    op("update_appointment", Put, "schedule/appointments/{appointment_uuid}"),
    // Identity
    op("answer_proof_question", Post, "identity/proof/questions/score/"),
    op("create_proof_questionnaire", Post, "identity/proof/questions/generate/"),
    op("create_identity", Post, "identity/"),
    op("update_identity", Put, "identity/{identity_uuid}"),
    op("get_identity", Get, "identity{/identity_uuid?}"),
    op("identity", Get, "identity{/identity_uuid?}").replaced_by("get_identity"),
    op("identity_history", Get, "identity/{identity_uuid}/history{/historical_version?}"),
    op("identity_match", Post, "identity/match"),
    op("validate_identity", Post, "identity/proof/valid/"),
];

pub fn lookup(name: &str) -> Option<&'static EndpointDescriptor> {
    ENDPOINTS.iter().find(|e| e.name == name)
}

/// Render a path template with positional arguments.
pub fn render_path(template: &str, args: &[&str]) -> Result<String> {
    let mut out = String::with_capacity(template.len() + 40);
    let mut args = args.iter();
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let close = rest[open..].find('}').map(|i| open + i).ok_or_else(|| {
            Error::InvalidRequest(format!("unterminated placeholder in `{template}`"))
        })?;

        let placeholder = &rest[open + 1..close];
        let (leading_slash, placeholder) = match placeholder.strip_prefix('/') {
            Some(s) => (true, s),
            None => (false, placeholder),
        };
        let (name, optional) = match placeholder.strip_suffix('?') {
            Some(n) => (n, true),
            None => (placeholder, false),
        };

        match args.next().filter(|value| !value.is_empty()) {
            Some(value) => {
                if leading_slash {
                    out.push('/');
                }
                out.push_str(&urlencoding::encode(value));
            }
            None if optional => {}
            None => {
                return Err(Error::InvalidRequest(format!(
                    "missing path parameter `{name}` for `{template}`"
                )));
            }
        }
        rest = &rest[close + 1..];
    }
    out.push_str(rest);

    if args.next().is_some() {
        return Err(Error::InvalidRequest(format!(
            "too many path parameters for `{template}`"
        )));
    }
    Ok(out)
}

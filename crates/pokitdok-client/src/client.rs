//! PokitDok platform client
//!
//! `PokitDok` ties a `TokenManager` to a `Dispatcher` and exposes one method
//! per operation in the endpoint table. Every method is a thin lookup into
//! that table; the table, not the method, decides verb and path.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use pokitdok_auth::{
    AuthOptions, Credentials, DEFAULT_API_VERSION, DEFAULT_BASE_URL, TokenManager,
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::dispatcher::{Dispatcher, Verb};
use crate::endpoints::{self, EndpointDescriptor};
use crate::error::{Error, Result};
use crate::response::ApiResponse;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection settings. Everything except credentials.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Scheme and host, e.g. `https://platform.pokitdok.com`.
    pub base_url: String,
    pub version: String,
    /// Per-request timeout; must be non-zero.
    pub timeout: Duration,
    /// Overrides the default `pokitdok-rust#<version>#<os>` agent string.
    pub user_agent: Option<String>,
    pub auth: AuthOptions,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            version: DEFAULT_API_VERSION.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
            auth: AuthOptions::default(),
        }
    }
}

pub fn default_user_agent() -> String {
    format!(
        "pokitdok-rust#{}#{}",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS
    )
}

pub struct PokitDok {
    tokens: Arc<TokenManager>,
    dispatcher: Dispatcher,
    version: String,
}

impl PokitDok {
    /// Validate options, establish the bearer token, and build the client.
    ///
    /// Fails with `Error::Auth` if the token exchange is rejected; a supplied
    /// token is accepted without contacting the platform.
    pub async fn connect(credentials: Credentials, options: ClientOptions) -> Result<Self> {
        let base_url = validate_base_url(&options.base_url)?;
        if options.timeout.is_zero() {
            return Err(Error::InvalidRequest(
                "timeout must be greater than 0".into(),
            ));
        }

        // Bounds the token exchange too; the dispatcher also sets it per request.
        let http = reqwest::Client::builder()
            .connect_timeout(options.timeout)
            .timeout(options.timeout)
            .build()
            .map_err(|e| Error::transport(&e))?;

        let tokens = Arc::new(
            TokenManager::obtain(http.clone(), &base_url, credentials, options.auth).await?,
        );

        let api_url = format!("{base_url}/api/{}", options.version);
        debug!(api_url = %api_url, "client ready");
        let dispatcher = Dispatcher::new(
            http,
            api_url,
            options.timeout,
            options.user_agent.unwrap_or_else(default_user_agent),
            tokens.clone(),
        );

        Ok(Self {
            tokens,
            dispatcher,
            version: options.version,
        })
    }

    pub fn api_url(&self) -> &str {
        self.dispatcher.api_url()
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// The bearer token in use; pass it back via `AuthOptions::token` to skip
    /// the exchange next time.
    pub fn current_token(&self) -> String {
        self.tokens.current_token()
    }

    pub fn token_manager(&self) -> &TokenManager {
        &self.tokens
    }

    /// Explicitly replace the bearer token. Never called implicitly.
    pub async fn reauthenticate(&self) -> Result<String> {
        Ok(self.tokens.reauthenticate().await?)
    }

    /// Status of the most recent response. See `Dispatcher::last_status_code`.
    pub fn last_status_code(&self) -> Option<u16> {
        self.dispatcher.last_status_code()
    }

    /// Send a request to an arbitrary endpoint path.
    ///
    /// With `file`, the request is a multipart POST regardless of `verb`.
    pub async fn request(
        &self,
        endpoint: &str,
        verb: Verb,
        params: &Value,
        file: Option<&Path>,
    ) -> Result<ApiResponse> {
        self.dispatcher.send(endpoint, verb, params, file).await
    }

    pub async fn get(&self, endpoint: &str, params: &Value) -> Result<ApiResponse> {
        self.request(endpoint, Verb::Get, params, None).await
    }

    pub async fn post(&self, endpoint: &str, params: &Value) -> Result<ApiResponse> {
        self.request(endpoint, Verb::Post, params, None).await
    }

    pub async fn put(&self, endpoint: &str, params: &Value) -> Result<ApiResponse> {
        self.request(endpoint, Verb::Put, params, None).await
    }

    /// DELETE; an empty response body yields `ApiBody::Deleted(status == 204)`.
    pub async fn delete(&self, endpoint: &str, params: &Value) -> Result<ApiResponse> {
        self.request(endpoint, Verb::Delete, params, None).await
    }

    /// Invoke a named operation from the endpoint table.
    pub async fn call(
        &self,
        name: &str,
        path_args: &[&str],
        params: &Value,
        file: Option<&Path>,
    ) -> Result<ApiResponse> {
        let endpoint = endpoints::lookup(name)
            .ok_or_else(|| Error::InvalidRequest(format!("unknown endpoint `{name}`")))?;
        self.invoke(endpoint, path_args, params, file).await
    }

    async fn invoke(
        &self,
        endpoint: &EndpointDescriptor,
        path_args: &[&str],
        params: &Value,
        file: Option<&Path>,
    ) -> Result<ApiResponse> {
        match (endpoint.accepts_file, file.is_some()) {
            (true, false) => {
                return Err(Error::InvalidRequest(format!(
                    "`{}` requires a file",
                    endpoint.name
                )));
            }
            (false, true) => {
                return Err(Error::InvalidRequest(format!(
                    "`{}` does not accept file uploads",
                    endpoint.name
                )));
            }
            _ => {}
        }

        if let Some(notice) = endpoint.deprecation_notice() {
            warn!(endpoint = endpoint.name, "{notice}");
        }

        let path = endpoint.render(path_args)?;
        self.dispatcher
            .send(&path, endpoint.verb, params, file)
            .await
    }

    // General

    pub async fn activities(&self, activity_id: Option<&str>, params: &Value) -> Result<ApiResponse> {
        self.call("activities", activity_id.as_slice(), params, None).await
    }

    pub async fn trading_partners(&self, trading_partner_id: Option<&str>) -> Result<ApiResponse> {
        self.call("trading_partners", trading_partner_id.as_slice(), &Value::Null, None)
            .await
    }

    // X12

    pub async fn authorizations(&self, params: &Value) -> Result<ApiResponse> {
        self.call("authorizations", &[], params, None).await
    }

    pub async fn claims(&self, params: &Value) -> Result<ApiResponse> {
        self.call("claims", &[], params, None).await
    }

    pub async fn claims_status(&self, params: &Value) -> Result<ApiResponse> {
        self.call("claims_status", &[], params, None).await
    }

    /// Upload an X12 837 file for conversion to JSON claims.
    pub async fn claims_convert(&self, x12_claims_file: &Path) -> Result<ApiResponse> {
        self.call("claims_convert", &[], &Value::Null, Some(x12_claims_file))
            .await
    }

    pub async fn eligibility(&self, params: &Value) -> Result<ApiResponse> {
        self.call("eligibility", &[], params, None).await
    }

    #[deprecated(note = "enrollment will be removed in a future release")]
    pub async fn enrollment(&self, params: &Value) -> Result<ApiResponse> {
        self.call("enrollment", &[], params, None).await
    }

    /// Upload an X12 834 file as an enrollment snapshot.
    #[deprecated(note = "enrollment_snapshot will be removed in a future release")]
    pub async fn enrollment_snapshot(
        &self,
        trading_partner_id: &str,
        x12_file: &Path,
    ) -> Result<ApiResponse> {
        self.call(
            "enrollment_snapshot",
            &[trading_partner_id],
            &Value::Null,
            Some(x12_file),
        )
        .await
    }

    #[deprecated(note = "enrollment_snapshots will be removed in a future release")]
    pub async fn enrollment_snapshots(
        &self,
        snapshot_id: Option<&str>,
        params: &Value,
    ) -> Result<ApiResponse> {
        self.call("enrollment_snapshots", snapshot_id.as_slice(), params, None)
            .await
    }

    #[deprecated(note = "enrollment_snapshot_data will be removed in a future release")]
    pub async fn enrollment_snapshot_data(&self, snapshot_id: &str) -> Result<ApiResponse> {
        self.call("enrollment_snapshot_data", &[snapshot_id], &Value::Null, None)
            .await
    }

    pub async fn referrals(&self, params: &Value) -> Result<ApiResponse> {
        self.call("referrals", &[], params, None).await
    }

    // Data

    pub async fn cash_prices(&self, params: &Value) -> Result<ApiResponse> {
        self.call("cash_prices", &[], params, None).await
    }

    pub async fn icd_convert(&self, code: &str) -> Result<ApiResponse> {
        self.call("icd_convert", &[code], &Value::Null, None).await
    }

    pub async fn mpc(&self, params: &Value) -> Result<ApiResponse> {
        self.call("mpc", &[], params, None).await
    }

    pub async fn insurance_prices(&self, params: &Value) -> Result<ApiResponse> {
        self.call("insurance_prices", &[], params, None).await
    }

    /// Estimated out-of-pocket cost and eligibility for a procedure.
    pub async fn oop_insurance_estimate(&self, params: &Value) -> Result<ApiResponse> {
        self.call("oop_insurance_estimate", &[], params, None).await
    }

    /// Load procedure prices for a trading partner.
    pub async fn oop_insurance_prices(&self, params: &Value) -> Result<ApiResponse> {
        self.call("oop_insurance_prices", &[], params, None).await
    }

    #[deprecated(note = "use `trading_partners`")]
    pub async fn payers(&self, params: &Value) -> Result<ApiResponse> {
        self.call("payers", &[], params, None).await
    }

    pub async fn plans(&self, params: &Value) -> Result<ApiResponse> {
        self.call("plans", &[], params, None).await
    }

    pub async fn providers(&self, params: &Value) -> Result<ApiResponse> {
        self.call("providers", &[], params, None).await
    }

    // Pharmacy

    pub async fn pharmacy_plans(&self, params: &Value) -> Result<ApiResponse> {
        self.call("pharmacy_plans", &[], params, None).await
    }

    pub async fn pharmacy_formulary(&self, params: &Value) -> Result<ApiResponse> {
        self.call("pharmacy_formulary", &[], params, None).await
    }

    pub async fn pharmacy_network(&self, npi: Option<&str>, params: &Value) -> Result<ApiResponse> {
        self.call("pharmacy_network", npi.as_slice(), params, None).await
    }

    // Scheduling. Most of these need the `user_schedule` scope, which is only
    // granted through the authorization-code flow.

    #[deprecated(note = "use `appointment_types`")]
    pub async fn appointment(&self, appointment_id: &str, params: &Value) -> Result<ApiResponse> {
        self.call("appointment", &[appointment_id], params, None).await
    }

    pub async fn get_appointments(
        &self,
        appointment_uuid: Option<&str>,
        params: &Value,
    ) -> Result<ApiResponse> {
        self.call("get_appointments", appointment_uuid.as_slice(), params, None)
            .await
    }

    #[deprecated(note = "use `get_appointments`")]
    pub async fn appointments(
        &self,
        appointment_uuid: Option<&str>,
        params: &Value,
    ) -> Result<ApiResponse> {
        self.call("appointments", appointment_uuid.as_slice(), params, None)
            .await
    }

    #[deprecated(note = "use `appointment_types`")]
    pub async fn appointment_type(&self, uuid: &str) -> Result<ApiResponse> {
        self.call("appointment_type", &[uuid], &Value::Null, None).await
    }

    pub async fn appointment_types(
        &self,
        appointment_type_uuid: Option<&str>,
        params: &Value,
    ) -> Result<ApiResponse> {
        self.call("appointment_types", appointment_type_uuid.as_slice(), params, None)
            .await
    }

    pub async fn book_appointment(&self, appointment_uuid: &str, params: &Value) -> Result<ApiResponse> {
        self.call("book_appointment", &[appointment_uuid], params, None)
            .await
    }

    pub async fn cancel_appointment(&self, appointment_uuid: &str, params: &Value) -> Result<ApiResponse> {
        self.call("cancel_appointment", &[appointment_uuid], params, None)
            .await
    }

    #[deprecated(note = "use `get_appointments`")]
    pub async fn open_appointment_slots(&self, params: &Value) -> Result<ApiResponse> {
        self.call("open_appointment_slots", &[], params, None).await
    }

    pub async fn schedulers(&self, scheduler_uuid: Option<&str>, params: &Value) -> Result<ApiResponse> {
        self.call("schedulers", scheduler_uuid.as_slice(), params, None)
            .await
    }

    #[deprecated(note = "use `schedulers`")]
    pub async fn scheduler(&self, uuid: &str) -> Result<ApiResponse> {
        self.call("scheduler", &[uuid], &Value::Null, None).await
    }

    pub async fn schedule_slots(&self, params: &Value) -> Result<ApiResponse> {
        self.call("schedule_slots", &[], params, None).await
    }

    pub async fn update_appointment(&self, appointment_uuid: &str, params: &Value) -> Result<ApiResponse> {
        self.call("update_appointment", &[appointment_uuid], params, None)
            .await
    }

    // Identity

    /// Score a user's answer to a knowledge-based authentication question.
    pub async fn answer_proof_question(&self, params: &Value) -> Result<ApiResponse> {
        self.call("answer_proof_question", &[], params, None).await
    }

    /// Validate an identity proof request and generate a questionnaire.
    pub async fn create_proof_questionnaire(&self, params: &Value) -> Result<ApiResponse> {
        self.call("create_proof_questionnaire", &[], params, None).await
    }

    pub async fn create_identity(&self, params: &Value) -> Result<ApiResponse> {
        self.call("create_identity", &[], params, None).await
    }

    pub async fn update_identity(&self, identity_uuid: &str, params: &Value) -> Result<ApiResponse> {
        self.call("update_identity", &[identity_uuid], params, None).await
    }

    pub async fn get_identity(&self, identity_uuid: Option<&str>, params: &Value) -> Result<ApiResponse> {
        self.call("get_identity", identity_uuid.as_slice(), params, None)
            .await
    }

    #[deprecated(note = "use `get_identity`")]
    pub async fn identity(&self, identity_uuid: Option<&str>, params: &Value) -> Result<ApiResponse> {
        self.call("identity", identity_uuid.as_slice(), params, None).await
    }

    pub async fn identity_history(
        &self,
        identity_uuid: &str,
        historical_version: Option<&str>,
    ) -> Result<ApiResponse> {
        let mut args = vec![identity_uuid];
        args.extend(historical_version);
        self.call("identity_history", &args, &Value::Null, None).await
    }

    pub async fn identity_match(&self, params: &Value) -> Result<ApiResponse> {
        self.call("identity_match", &[], params, None).await
    }

    /// Test the validity of an identity through identity proofing.
    pub async fn validate_identity(&self, params: &Value) -> Result<ApiResponse> {
        self.call("validate_identity", &[], params, None).await
    }
}

/// Accept only absolute http(s) URLs; returns the URL without a trailing slash.
fn validate_base_url(base_url: &str) -> Result<String> {
    let parsed = reqwest::Url::parse(base_url)
        .map_err(|e| Error::InvalidRequest(format!("invalid base_url {base_url}: {e}")))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(Error::InvalidRequest(format!(
            "base_url must start with http:// or https://, got: {base_url}"
        )));
    }
    Ok(base_url.trim_end_matches('/').to_string())
}

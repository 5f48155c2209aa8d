use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Transaction detail returned by `GET /api/v1/idps/tx/{txId}/target`.
#[derive(Debug, Clone, Deserialize)]
pub struct IdpTransaction {
    #[serde(default)]
    pub id: Option<String>,
    // Partial profile from the social provider (email, names, ...). Shape is provider-defined.
    #[serde(default)]
    pub profile: Map<String, Value>,
}

/// Supplemental profile sent to the provisioning endpoint.
///
/// Unset fields are omitted from the request body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ProvisionRequest<'a> {
    pub profile: &'a ProvisionProfile,
}

/// Provisioning response: the raw body plus the two fields this server acts on.
#[derive(Debug, Clone)]
pub struct ProvisionResponse {
    pub status: Option<String>,
    pub session_token: Option<String>,
    pub body: Value,
}

impl ProvisionResponse {
    pub const SUCCESS: &'static str = "SUCCESS";

    pub fn from_body(body: Value) -> Self {
        let field = |name: &str| body.get(name).and_then(Value::as_str).map(str::to_string);
        Self {
            status: field("status"),
            session_token: field("sessionToken"),
            body,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some(Self::SUCCESS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn provision_profile_uses_camel_case_and_omits_missing_fields() {
        let profile = ProvisionProfile {
            customer_id: Some("c-1".into()),
            zip_code: Some("94107".into()),
            ..Default::default()
        };

        assert_eq!(
            serde_json::to_value(ProvisionRequest { profile: &profile }).unwrap(),
            json!({ "profile": { "customerId": "c-1", "zipCode": "94107" } })
        );
    }

    #[test]
    fn provision_response_reads_status_and_token() {
        let success = ProvisionResponse::from_body(json!({ "status": "SUCCESS", "sessionToken": "tok" }));
        assert!(success.is_success());
        assert_eq!(success.session_token.as_deref(), Some("tok"));

        let mfa = ProvisionResponse::from_body(json!({ "status": "MFA_ENROLL", "_embedded": {} }));
        assert!(!mfa.is_success());
        assert_eq!(mfa.body["_embedded"], json!({}));
    }
}

/*
 * Responsibility
 * - POST /social/callback の form DTO
 * - form field 名 (postalCode) と IdP API の profile 属性名 (zipCode) の対応付け
 */
use serde::Deserialize;

use crate::services::idp::ProvisionProfile;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationForm {
    pub customer_id: Option<String>,
    pub street_address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
}

impl RegistrationForm {
    pub fn into_profile(self) -> ProvisionProfile {
        ProvisionProfile {
            customer_id: filled(self.customer_id),
            street_address: filled(self.street_address),
            city: filled(self.city),
            zip_code: filled(self.postal_code),
        }
    }
}

// Blank inputs are left out of the profile rather than sent as "".
fn filled(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Query string of `GET /social/callback`.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub tx_id: Option<String>,
}

use serde_json::{Map, Value};
use url::Url;

use super::{html_escape, layout};

fn profile_str<'a>(profile: &'a Map<String, Value>, key: &str) -> &'a str {
    profile.get(key).and_then(Value::as_str).unwrap_or_default()
}

/// Supplemental-profile form, prefilled from the partial profile the IdP returned.
pub fn render_register_page(profile: &Map<String, Value>) -> String {
    let name = [profile_str(profile, "firstName"), profile_str(profile, "lastName")]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    let email = profile_str(profile, "email");

    let input = |field: &str, label: &str, value: &str| {
        format!(
            r#"<label for="{field}">{label}
<input id="{field}" name="{field}" type="text" value="{value}">
</label>"#,
            value = html_escape(value),
        )
    };

    let body = format!(
        r#"<h1>Complete your registration</h1>
<dl>
<dt>Name</dt><dd>{name}</dd>
<dt>Email</dt><dd>{email}</dd>
</dl>
<form method="POST" action="/social/callback">
{customer_id}
{street_address}
{city}
{postal_code}
<button type="submit">Register</button>
</form>"#,
        name = html_escape(&name),
        email = html_escape(email),
        customer_id = input("customerId", "Customer ID", profile_str(profile, "customerId")),
        street_address = input(
            "streetAddress",
            "Street address",
            profile_str(profile, "streetAddress")
        ),
        city = input("city", "City", profile_str(profile, "city")),
        postal_code = input("postalCode", "Postal code", profile_str(profile, "zipCode")),
    );

    layout("Register", &body)
}

/// Auto-posts the one-time session token to the IdP's finish endpoint.
pub fn render_finish_page(finish_url: &Url, session_token: Option<&str>) -> String {
    let body = format!(
        r#"<h1>Finishing sign-in…</h1>
<form id="finish" method="POST" action="{url}">
<input type="hidden" name="token" value="{token}">
<noscript><button type="submit">Continue</button></noscript>
</form>
<script>document.getElementById("finish").submit();</script>"#,
        url = html_escape(finish_url.as_str()),
        token = html_escape(session_token.unwrap_or_default()),
    );

    layout("Finishing sign-in", &body)
}

pub struct WelcomePage<'a> {
    pub app_url: &'a str,
    pub admin_url: &'a str,
    pub issuer: &'a str,
    pub audience: &'a str,
}

pub fn render_welcome_page(page: &WelcomePage<'_>) -> String {
    let body = format!(
        r#"<h1>Protected resource server</h1>
<dl>
<dt>This app</dt><dd><a href="{app_url}">{app_url}</a></dd>
<dt>Admin console</dt><dd><a href="{admin_url}">{admin_url}</a></dd>
<dt>Issuer</dt><dd>{issuer}</dd>
<dt>Audience</dt><dd>{audience}</dd>
</dl>
<p>Routes: <code>/claims</code>, <code>/protected</code></p>
<script src="/js/config.js"></script>"#,
        app_url = html_escape(page.app_url),
        admin_url = html_escape(page.admin_url),
        issuer = html_escape(page.issuer),
        audience = html_escape(page.audience),
    );

    layout("Welcome", &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn register_page_prefills_and_escapes_profile() {
        let profile = json!({
            "firstName": "Ada",
            "lastName": "<Lovelace>",
            "email": "ada@example.com",
            "zipCode": "94107"
        });

        let html = render_register_page(profile.as_object().unwrap());

        assert!(html.contains("Ada &lt;Lovelace&gt;"));
        assert!(html.contains("ada@example.com"));
        assert!(html.contains(r#"name="postalCode" type="text" value="94107""#));
        assert!(html.contains(r#"action="/social/callback""#));
    }

    #[test]
    fn finish_page_posts_token_to_finish_url() {
        let url = Url::parse("https://example.okta.com/api/v1/idps/tx/tx1/finish").unwrap();

        let html = render_finish_page(&url, Some("tok"));

        assert!(html.contains(r#"action="https://example.okta.com/api/v1/idps/tx/tx1/finish""#));
        assert!(html.contains(r#"name="token" value="tok""#));
    }
}

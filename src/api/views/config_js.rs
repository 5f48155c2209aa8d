use serde_json::json;

use crate::config::Config;

/// Browser sign-in widget configuration, served as `/js/config.js`.
///
/// Values are emitted as JSON literals, so no JavaScript escaping is needed.
pub fn render_config_js(config: &Config) -> String {
    let widget = json!({
        "issuer": config.issuer,
        "clientId": config.audience,
        "authzIssuer": config.authz_issuer,
        "scopes": config.widget_scopes,
        "idpId": config.idp_id,
        "protectedScope": config.protected_scopes.join(" "),
    });

    format!("window.appConfig = {widget:#};\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[test]
    fn emits_widget_settings_as_json_literal() {
        let mut config = test_support::config("https://example.okta.com/oauth2/default");
        config.idp_id = Some("0oa-social".into());
        config.widget_scopes = vec!["openid".into(), "email".into()];

        let js = render_config_js(&config);

        assert!(js.starts_with("window.appConfig = {"));
        assert!(js.trim_end().ends_with("};"));
        assert!(js.contains(r#""issuer": "https://example.okta.com/oauth2/default""#));
        assert!(js.contains(r#""idpId": "0oa-social""#));
        assert!(js.contains(r#""authzIssuer": null"#));
    }
}

//! OAuth2 provider parameter and key cache.
//!
//! One [`AuthParam`] per configured provider holds the provider's raw
//! parameter JSON and its JWKS-shaped `keys` object. The derived
//! accessors (algorithm, audience, issuers, endpoint URIs) are read out
//! of the JSON once and cached; the stack runs on a single reactor
//! thread, so the caches are plain `OnceCell`s.
//!
//! Key material lives in memory only; fetching and persisting it is the
//! application's business, tracked through [`KeyStatus`].

use std::cell::OnceCell;
use std::time::SystemTime;

use serde_json::Value;

/// Lookup failure: no provider knows the requested key id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuth2Error {
    kid: String,
}

impl OAuth2Error {
    #[must_use]
    pub fn new(kid: &str) -> Self {
        Self { kid: kid.into() }
    }

    /// The key id that missed.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }
}

impl std::fmt::Display for OAuth2Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "OAuth2 error: public key with id \"{}\" not found in listed providers",
            self.kid
        )
    }
}

impl std::error::Error for OAuth2Error {}

/// Lifecycle of a provider's key material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyStatus {
    #[default]
    Unknown,
    Fetching,
    Success,
    Error,
    Saved,
}

/// Per-provider OAuth2 parameters and keys.
#[derive(Debug, Clone, Default)]
pub struct AuthParam {
    pub provider: String,
    /// Raw provider parameters (issuers, audience, endpoints, ...).
    pub params: Value,
    /// JWKS-shaped object mapping key ids to PEM public keys.
    pub keys: Value,
    pub status: KeyStatus,
    pub status_time: Option<SystemTime>,

    algorithm: OnceCell<String>,
    audience: OnceCell<String>,
    issuer: OnceCell<String>,
    issuers: OnceCell<Vec<(String, String)>>,
    secret: OnceCell<String>,
    auth_uri: OnceCell<String>,
    token_uri: OnceCell<String>,
    redirect_uri: OnceCell<String>,
    cert_url: OnceCell<String>,
}

impl AuthParam {
    #[must_use]
    pub fn new(provider: &str, params: Value) -> Self {
        Self {
            provider: provider.into(),
            params,
            status: KeyStatus::Unknown,
            status_time: Some(SystemTime::now()),
            ..Self::default()
        }
    }

    /// Record new key material and mark it successfully fetched.
    pub fn set_keys(&mut self, keys: Value) {
        self.keys = keys;
        self.status = KeyStatus::Success;
        self.status_time = Some(SystemTime::now());
    }

    fn param_str(&self, cell: &OnceCell<String>, key: &str) -> String {
        cell.get_or_init(|| {
            self.params[key]
                .as_str()
                .unwrap_or_default()
                .to_string()
        })
        .clone()
    }

    #[must_use]
    pub fn algorithm(&self) -> String {
        self.param_str(&self.algorithm, "algorithm")
    }

    #[must_use]
    pub fn audience(&self) -> String {
        self.param_str(&self.audience, "audience")
    }

    /// The provider's primary issuer (first entry of `issuers`).
    #[must_use]
    pub fn issuer(&self) -> String {
        self.issuer
            .get_or_init(|| {
                self.params["issuers"][0]
                    .as_str()
                    .unwrap_or_default()
                    .to_string()
            })
            .clone()
    }

    /// All issuers, each paired with this provider's name.
    pub fn issuers(&self) -> &[(String, String)] {
        self.issuers.get_or_init(|| {
            match self.params["issuers"].as_array() {
                Some(list) => list
                    .iter()
                    .filter_map(|v| v.as_str())
                    .map(|issuer| (issuer.to_string(), self.provider.clone()))
                    .collect(),
                None => Vec::new(),
            }
        })
    }

    #[must_use]
    pub fn secret(&self) -> String {
        self.param_str(&self.secret, "secret")
    }

    #[must_use]
    pub fn auth_uri(&self) -> String {
        self.param_str(&self.auth_uri, "auth_uri")
    }

    #[must_use]
    pub fn token_uri(&self) -> String {
        self.param_str(&self.token_uri, "token_uri")
    }

    #[must_use]
    pub fn redirect_uri(&self) -> String {
        self.param_str(&self.redirect_uri, "redirect_uri")
    }

    #[must_use]
    pub fn cert_url(&self) -> String {
        self.param_str(&self.cert_url, "auth_provider_x509_cert_url")
    }

    /// Public key by key id, or `""` when this provider does not carry it.
    #[must_use]
    pub fn public_key(&self, kid: &str) -> String {
        if self.keys.is_object() {
            return self.keys[kid].as_str().unwrap_or_default().to_string();
        }
        String::new()
    }
}

/// Ordered collection of provider records; lookup order is registration
/// order.
#[derive(Debug, Clone, Default)]
pub struct AuthParams {
    list: Vec<AuthParam>,
}

impl AuthParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.list.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn add(&mut self, param: AuthParam) -> usize {
        self.list.push(param);
        self.list.len() - 1
    }

    #[must_use]
    pub fn at(&self, index: usize) -> Option<&AuthParam> {
        self.list.get(index)
    }

    #[must_use]
    pub fn provider(&self, name: &str) -> Option<&AuthParam> {
        self.list.iter().find(|p| p.provider == name)
    }

    pub fn provider_mut(&mut self, name: &str) -> Option<&mut AuthParam> {
        self.list.iter_mut().find(|p| p.provider == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AuthParam> {
        self.list.iter()
    }

    /// Audiences of every provider, in registration order.
    #[must_use]
    pub fn audiences(&self) -> Vec<String> {
        self.list.iter().map(AuthParam::audience).collect()
    }

    /// Union of all providers' issuers as (issuer, provider) pairs.
    #[must_use]
    pub fn issuers(&self) -> Vec<(String, String)> {
        self.list
            .iter()
            .flat_map(|p| p.issuers().iter().cloned())
            .collect()
    }

    /// Index of the provider registered for `audience`.
    #[must_use]
    pub fn index_of_audience(&self, audience: &str) -> Option<usize> {
        self.list.iter().position(|p| p.audience() == audience)
    }

    /// Resolve a public key by key id, scanning providers in order; the
    /// first non-empty match wins.
    ///
    /// # Errors
    ///
    /// [`OAuth2Error`] carrying the key id when no provider has it.
    pub fn get_public_key(&self, kid: &str) -> Result<String, OAuth2Error> {
        for param in &self.list {
            let key = param.public_key(kid);
            if !key.is_empty() {
                return Ok(key);
            }
        }
        Err(OAuth2Error::new(kid))
    }
}

impl<'a> IntoIterator for &'a AuthParams {
    type Item = &'a AuthParam;
    type IntoIter = std::slice::Iter<'a, AuthParam>;

    fn into_iter(self) -> Self::IntoIter {
        self.list.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn provider(name: &str, audience: &str, issuers: Value, keys: Value) -> AuthParam {
        let mut param = AuthParam::new(
            name,
            json!({
                "algorithm": "RS256",
                "audience": audience,
                "issuers": issuers,
                "auth_uri": "https://auth.example.com/authorize",
                "token_uri": "https://auth.example.com/token",
            }),
        );
        param.set_keys(keys);
        param
    }

    #[test]
    fn accessors_read_the_params_json() {
        let param = provider(
            "acme",
            "svc-1",
            json!(["https://issuer.one", "https://issuer.two"]),
            json!({}),
        );

        assert_eq!(param.algorithm(), "RS256");
        assert_eq!(param.audience(), "svc-1");
        assert_eq!(param.issuer(), "https://issuer.one");
        assert_eq!(
            param.issuers(),
            &[
                ("https://issuer.one".to_string(), "acme".to_string()),
                ("https://issuer.two".to_string(), "acme".to_string()),
            ]
        );
        assert_eq!(param.auth_uri(), "https://auth.example.com/authorize");
        assert_eq!(param.secret(), "");
        assert_eq!(param.status, KeyStatus::Success);
    }

    #[test]
    fn public_key_lookup_scans_providers_in_order() {
        let mut params = AuthParams::new();
        params.add(provider(
            "a",
            "aud-a",
            json!(["https://a"]),
            json!({"k1": "PEM-A1"}),
        ));
        params.add(provider(
            "b",
            "aud-b",
            json!(["https://b"]),
            json!({"k2": "PEM-B2"}),
        ));

        assert_eq!(params.get_public_key("k1").unwrap(), "PEM-A1");
        assert_eq!(params.get_public_key("k2").unwrap(), "PEM-B2");

        let err = params.get_public_key("k3").unwrap_err();
        assert_eq!(err.kid(), "k3");
        assert!(err.to_string().contains("\"k3\""));
    }

    #[test]
    fn helpers_aggregate_across_providers() {
        let mut params = AuthParams::new();
        params.add(provider(
            "a",
            "aud-a",
            json!(["https://a1", "https://a2"]),
            json!({}),
        ));
        params.add(provider("b", "aud-b", json!(["https://b1"]), json!({})));

        assert_eq!(params.audiences(), vec!["aud-a", "aud-b"]);
        assert_eq!(
            params.issuers(),
            vec![
                ("https://a1".to_string(), "a".to_string()),
                ("https://a2".to_string(), "a".to_string()),
                ("https://b1".to_string(), "b".to_string()),
            ]
        );
        assert_eq!(params.index_of_audience("aud-b"), Some(1));
        assert_eq!(params.index_of_audience("nope"), None);
    }

    #[test]
    fn non_object_keys_yield_no_match() {
        let mut param = AuthParam::new("x", json!({}));
        param.keys = json!("not an object");
        assert_eq!(param.public_key("k"), "");
    }
}

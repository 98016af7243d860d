//! Financing quotes from the Creditcar API.
//!
//! The upstream answer has no stable shape: options may be the body itself
//! or nested under one of several keys, and numbers arrive as text. The
//! helpers here pull out the installment options the site offers.

use std::cmp::Ordering;
use std::time::Duration;

use anyhow::Context;
use serde::Serialize;
use serde_json::{json, Value};

use crate::coerce::as_number;

/// Terms, in months, offered on the site.
pub const ALLOWED_TERMS: [i64; 4] = [6, 12, 18, 24];

/// At most 40% of the vehicle price may be financed.
pub const MAX_FINANCED_SHARE: f64 = 0.4;

/// Raw-text excerpt length kept when the upstream body is not JSON.
const RAW_TEXT_LIMIT: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteOption {
    pub plazo: i64,
    pub cuota: String,
    pub inclusion: f64,
}

/// Upstream status and decoded body.
#[derive(Debug, Clone)]
pub struct QuoteReply {
    pub status: u16,
    pub url: String,
    pub data: Value,
}

impl QuoteReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Clone)]
pub struct QuoteClient {
    http: reqwest::Client,
    base_url: Option<String>,
    api_key: Option<String>,
}

impl QuoteClient {
    pub fn new(
        base_url: Option<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0")
            .build()
            .context("failed to build quote HTTP client")?;
        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    /// `GET {base}?monto=..&modelo=..`. Non-2xx answers are returned, not
    /// raised; only transport failures are errors.
    pub async fn request_quote(&self, amount: f64, model_year: f64) -> anyhow::Result<QuoteReply> {
        let base = self
            .base_url
            .as_deref()
            .context("CREDITCAR_API_URL is not set")?;
        let url = quote_url(base, amount, model_year)?;

        let mut req = self
            .http
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.context("creditcar request failed")?;
        let status = resp.status().as_u16();
        let text = resp.text().await.unwrap_or_default();

        Ok(QuoteReply {
            status,
            url: url.to_string(),
            data: parse_body(&text),
        })
    }
}

/// Build the quote URL, replacing any `monto`/`modelo` already in `base`.
fn quote_url(base: &str, amount: f64, model_year: f64) -> anyhow::Result<url::Url> {
    let mut url = url::Url::parse(base).context("CREDITCAR_API_URL is not a valid URL")?;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "monto" && k != "modelo")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (k, v) in &kept {
            pairs.append_pair(k, v);
        }
        pairs.append_pair("monto", &(amount.round() as i64).to_string());
        pairs.append_pair("modelo", &(model_year.round() as i64).to_string());
    }
    Ok(url)
}

/// JSON when possible, otherwise a `rawText` excerpt for diagnosis.
pub fn parse_body(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| {
        let excerpt: String = text.chars().take(RAW_TEXT_LIMIT).collect();
        json!({ "rawText": excerpt })
    })
}

/// Locate the option list: the body itself, `quote.raw`, `raw` or `options`.
fn raw_options(data: &Value) -> &[Value] {
    if let Value::Array(items) = data {
        return items;
    }
    [
        data.pointer("/quote/raw"),
        data.get("raw"),
        data.get("options"),
    ]
    .into_iter()
    .flatten()
    .find_map(Value::as_array)
    .map(Vec::as_slice)
    .unwrap_or(&[])
}

/// First non-null value among `keys`.
fn first_present<'a>(item: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| item.get(*k))
        .find(|v| !v.is_null())
}

/// Installment options for the allowed terms, sorted by term.
pub fn extract_options(data: &Value) -> Vec<QuoteOption> {
    let mut options: Vec<(f64, f64, f64)> = raw_options(data)
        .iter()
        .filter_map(|it| {
            let plazo = first_present(it, &["plazo", "term", "months"]).and_then(as_number)?;
            let cuota = first_present(it, &["cuota", "payment", "installment"]).and_then(as_number)?;
            let inclusion = it.get("inclusion").and_then(as_number).unwrap_or(0.0);
            Some((plazo, cuota, inclusion))
        })
        .filter(|(plazo, _, _)| plazo.fract() == 0.0 && ALLOWED_TERMS.contains(&(*plazo as i64)))
        .collect();

    options.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

    options
        .into_iter()
        .map(|(plazo, cuota, inclusion)| QuoteOption {
            plazo: plazo as i64,
            cuota: cuota.to_string(),
            inclusion,
        })
        .collect()
}

/// `quote.summaryText`, falling back to a top-level `summaryText`.
pub fn summary_text(data: &Value) -> Value {
    [data.pointer("/quote/summaryText"), data.get("summaryText")]
        .into_iter()
        .flatten()
        .find(|v| !v.is_null())
        .cloned()
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_bare_array() {
        let data = json!([
            {"plazo": 24, "cuota": 150000, "inclusion": 5000},
            {"plazo": "12", "cuota": "$ 250000,5"},
            {"plazo": 36, "cuota": 90000},
            {"plazo": 6, "cuota": null}
        ]);
        let options = extract_options(&data);
        assert_eq!(
            options,
            vec![
                QuoteOption { plazo: 12, cuota: "250000.5".into(), inclusion: 0.0 },
                QuoteOption { plazo: 24, cuota: "150000".into(), inclusion: 5000.0 },
            ]
        );
    }

    #[test]
    fn test_options_from_nested_keys_and_synonyms() {
        let nested = json!({"quote": {"raw": [{"term": 18, "payment": 1000}], "summaryText": "ok"}});
        assert_eq!(extract_options(&nested)[0].plazo, 18);
        assert_eq!(summary_text(&nested), json!("ok"));

        let top = json!({"options": [{"months": 6, "installment": "2.500"}], "summaryText": "top"});
        let options = extract_options(&top);
        assert_eq!(options[0].plazo, 6);
        assert_eq!(options[0].cuota, "2.5");
        assert_eq!(summary_text(&top), json!("top"));
    }

    #[test]
    fn test_unknown_shape_gives_no_options() {
        assert!(extract_options(&json!({"rawText": "<html>"})).is_empty());
        assert!(extract_options(&json!("text")).is_empty());
        assert_eq!(summary_text(&json!({})), Value::Null);
    }

    #[test]
    fn test_parse_body_keeps_excerpt_of_non_json() {
        let long = "x".repeat(800);
        let data = parse_body(&long);
        assert_eq!(data["rawText"].as_str().unwrap().len(), RAW_TEXT_LIMIT);
        assert_eq!(parse_body(r#"{"a":1}"#), json!({"a": 1}));
    }

    #[test]
    fn test_quote_url_replaces_existing_params() {
        let url = quote_url("https://api.example.com/cotizar?token=abc&monto=1", 1234.6, 2018.0).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/cotizar?token=abc&monto=1235&modelo=2018"
        );
    }
}

use std::sync::Arc;

use axum::{body::Bytes, extract::State, Json};
use serde_json::{json, Value};

use crate::coerce::as_number;
use crate::creditcar::{extract_options, summary_text, MAX_FINANCED_SHARE};
use crate::errors::AppError;
use crate::AppState;

/// Lowest model year Creditcar quotes for.
const MIN_MODEL_YEAR: f64 = 1900.0;

/// POST /api/creditcar/quote: validate a financing request and forward it
///
/// The body is read leniently: malformed JSON is treated as an empty object
/// and fails validation like any missing field.
pub async fn request_quote(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let body: Value = serde_json::from_slice(&body).unwrap_or_else(|_| json!({}));

    let field = |key: &str| body.get(key).and_then(as_number);
    let price = field("price");
    let amount = field("amountToFinance");
    // The provider calls the model year "modelo"; older clients send other names.
    let model_year = ["modelo", "year", "vehicleYear", "autoYear"]
        .iter()
        .find_map(|key| field(*key));

    let price = price
        .filter(|p| *p > 0.0)
        .ok_or_else(|| AppError::bad_request("invalid price"))?;
    let amount = amount
        .filter(|a| *a >= 0.0)
        .ok_or_else(|| AppError::bad_request("invalid amount to finance"))?;
    let model_year = model_year
        .filter(|y| *y >= MIN_MODEL_YEAR)
        .ok_or_else(|| AppError::bad_request("invalid model year"))?;

    let max_finance = price * MAX_FINANCED_SHARE;
    if amount > max_finance + 0.01 {
        return Err(AppError::BadRequest {
            message: "minimum down payment is 60% (at most 40% of the vehicle price can be financed)"
                .to_string(),
            details: Some(json!({
                "limits": {
                    "maxFinance": max_finance,
                    "minDownPayment": price - max_finance,
                }
            })),
        });
    }

    if !state.quotes.is_configured() {
        return Err(AppError::Configuration(
            "CREDITCAR_API_URL is not configured".to_string(),
        ));
    }

    let reply = state.quotes.request_quote(amount, model_year).await?;
    if !reply.is_success() {
        return Err(AppError::Upstream {
            message: "creditcar error".to_string(),
            details: json!({
                "creditcar": {
                    "status": reply.status,
                    "url": reply.url,
                    "data": reply.data,
                }
            }),
        });
    }

    Ok(Json(json!({
        "ok": true,
        "price": price,
        "amountToFinance": amount,
        "modelo": model_year,
        "options": extract_options(&reply.data),
        "summaryText": summary_text(&reply.data),
    })))
}

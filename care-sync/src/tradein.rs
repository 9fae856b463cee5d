//! Trade-in evaluation workflow
//!
//! `pending -> approved | rejected`, `approved -> redeemed`.
//!
//! Approval writes local state first (coupon, then evaluation) and only then
//! asks the storefront for the matching discount. A storefront failure never
//! rolls the local records back; it is written onto the coupon instead, so
//! the local coupon stays the record of what credit was promised.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared::error::{AppError, ErrorCode};
use shared::models::{Condition, Coupon, Evaluation, EvaluationStatus, Mattress, ValueType};
use shared::util::{DAY_MS, to_base36};

use crate::commerce::{CommerceApi, CouponOptions};
use crate::error::ServiceResult;
use crate::store::{RecordStore, coupons, customers, evaluations};

/// Trade-in coupons expire 90 days after approval
pub const COUPON_VALIDITY_MS: i64 = 90 * DAY_MS;

/// Credit granted for a mattress, in whole currency units
/// (half away from zero).
pub fn credit_for(estimated_value: f64, condition: Condition) -> i64 {
    let value = Decimal::from_f64(estimated_value).unwrap_or_default();
    let factor = Decimal::new(condition.factor_tenths(), 1);
    (value * factor)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or_default()
}

/// `TRADEIN-<last 6 of evaluation id>-<base36 timestamp>`, uppercased
pub fn coupon_code(evaluation_id: &str, now: i64) -> String {
    let chars: Vec<char> = evaluation_id.chars().collect();
    let short: String = chars[chars.len().saturating_sub(6)..].iter().collect();
    let stamp = to_base36(u64::try_from(now).unwrap_or_default());
    format!("TRADEIN-{short}-{stamp}").to_uppercase()
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvaluationCreate {
    pub customer_id: String,
    pub mattress: Mattress,
    pub estimated_value: f64,
}

/// Result of approving an evaluation
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalOutcome {
    pub evaluation: Evaluation,
    pub coupon: Coupon,
    /// Storefront failure, if the remote discount could not be created
    pub remote_error: Option<String>,
}

/// Result of redeeming a discount code
#[derive(Debug, Clone, Default, Serialize)]
pub struct RedemptionOutcome {
    pub coupon: Option<Coupon>,
    pub evaluation: Option<Evaluation>,
    /// True when this call moved the evaluation to `redeemed`
    pub redeemed: bool,
}

fn evaluation_not_found(id: &str) -> AppError {
    AppError::with_message(
        ErrorCode::EvaluationNotFound,
        format!("Evaluation {id} not found"),
    )
}

async fn load(store: &dyn RecordStore, id: &str) -> ServiceResult<Evaluation> {
    Ok(evaluations::get(store, id)
        .await?
        .ok_or_else(|| evaluation_not_found(id))?)
}

fn ensure_transition(evaluation: &Evaluation, target: EvaluationStatus) -> ServiceResult<()> {
    if evaluation.status.can_transition_to(target) {
        Ok(())
    } else {
        Err(AppError::invalid_evaluation_transition(evaluation.status.as_str(), target.as_str()).into())
    }
}

pub async fn create_evaluation(
    store: &dyn RecordStore,
    input: &EvaluationCreate,
) -> ServiceResult<Evaluation> {
    if input.estimated_value < 0.0 || !input.estimated_value.is_finite() {
        return Err(AppError::validation("estimated_value must be a non-negative number").into());
    }
    if customers::get(store, &input.customer_id).await?.is_none() {
        return Err(AppError::with_message(
            ErrorCode::CustomerNotFound,
            format!("Customer {} not found", input.customer_id),
        )
        .into());
    }

    let credit = credit_for(input.estimated_value, input.mattress.condition);
    let evaluation = evaluations::create(
        store,
        &json!({
            "customer_id": input.customer_id,
            "mattress": input.mattress,
            "estimated_value": input.estimated_value,
            "credit_approved": credit,
            "status": EvaluationStatus::Pending,
        }),
    )
    .await?;
    tracing::info!(evaluation_id = %evaluation.id, credit, "Trade-in evaluation created");
    Ok(evaluation)
}

/// `pending -> approved`: issue the coupon locally, then best-effort remotely
pub async fn approve(
    store: &dyn RecordStore,
    commerce: &dyn CommerceApi,
    evaluation_id: &str,
    now: i64,
) -> ServiceResult<ApprovalOutcome> {
    let evaluation = load(store, evaluation_id).await?;
    ensure_transition(&evaluation, EvaluationStatus::Approved)?;

    let code = coupon_code(&evaluation.id, now);
    let expires_at = now + COUPON_VALIDITY_MS;
    let value = evaluation.credit_approved as f64;

    let coupon = coupons::create(
        store,
        &json!({
            "code": code,
            "evaluation_id": evaluation.id,
            "customer_id": evaluation.customer_id,
            "value": value,
            "value_type": ValueType::FixedAmount,
            "active": true,
            "usage_count": 0,
            "usage_limit": 1,
            "expires_at": expires_at,
            "description": format!("Trade-in credit for evaluation {}", evaluation.id),
        }),
    )
    .await?;

    let evaluation = evaluations::update(
        store,
        &evaluation.id,
        json!({
            "status": EvaluationStatus::Approved,
            "coupon_id": coupon.id,
            "coupon_code": code,
            "expires_at": expires_at,
        }),
    )
    .await?;
    tracing::info!(evaluation_id = %evaluation.id, coupon_code = %code, "Trade-in evaluation approved");

    // Restrict the discount to the customer's storefront account when known
    let storefront_customer = match customers::get(store, &evaluation.customer_id).await {
        Ok(customer) => customer
            .and_then(|c| c.commerce_customer_id)
            .and_then(|id| id.parse::<u64>().ok()),
        Err(e) => {
            tracing::warn!(customer_id = %evaluation.customer_id, error = %e, "Customer lookup failed, issuing unrestricted discount");
            None
        }
    };
    let options = CouponOptions {
        usage_limit: Some(coupon.usage_limit),
        once_per_customer: true,
        starts_at: Some(now),
        ends_at: Some(expires_at),
        customer_id: storefront_customer,
    };

    let title = format!("Trade-in credit {code}");
    let (coupon, remote_error) = match commerce
        .create_coupon(&title, &code, value, ValueType::FixedAmount, &options)
        .await
    {
        Ok(created) => {
            let patch = json!({
                "commerce_price_rule_id": created.price_rule_id.to_string(),
                "commerce_discount_code_id": created.discount_code_id.to_string(),
            });
            let coupon = match coupons::update(store, &coupon.id, patch).await {
                Ok(updated) => updated,
                Err(e) => {
                    tracing::error!(coupon_id = %coupon.id, error = %e, "Failed to record storefront ids on coupon");
                    coupon
                }
            };
            (coupon, None)
        }
        Err(e) => {
            tracing::warn!(coupon_id = %coupon.id, code = %code, error = %e, "Storefront discount creation failed");
            let description = format!(
                "{} [storefront sync failed: {e}]",
                coupon.description.clone().unwrap_or_default()
            );
            let patch = json!({
                "description": description.trim_start(),
                "orphaned_price_rule_id": e.orphaned_price_rule_id().map(|id| id.to_string()),
            });
            let coupon = match coupons::update(store, &coupon.id, patch).await {
                Ok(updated) => updated,
                Err(store_err) => {
                    tracing::error!(coupon_id = %coupon.id, error = %store_err, "Failed to annotate coupon");
                    coupon
                }
            };
            (coupon, Some(e.to_string()))
        }
    };

    Ok(ApprovalOutcome {
        evaluation,
        coupon,
        remote_error,
    })
}

/// `pending -> rejected`; local only
pub async fn reject(store: &dyn RecordStore, evaluation_id: &str) -> ServiceResult<Evaluation> {
    let evaluation = load(store, evaluation_id).await?;
    ensure_transition(&evaluation, EvaluationStatus::Rejected)?;
    let evaluation = evaluations::update(
        store,
        &evaluation.id,
        json!({ "status": EvaluationStatus::Rejected }),
    )
    .await?;
    tracing::info!(evaluation_id = %evaluation.id, "Trade-in evaluation rejected");
    Ok(evaluation)
}

/// Apply one use of a discount code seen on an order.
///
/// The coupon's usage is counted and the linked evaluation moves to
/// `redeemed`. An evaluation in any state other than `approved` is left as
/// it is; a code that matches nothing is ignored.
pub async fn redeem_code(
    store: &dyn RecordStore,
    code: &str,
    now: i64,
) -> ServiceResult<RedemptionOutcome> {
    let mut outcome = RedemptionOutcome::default();

    let coupon = coupons::find_by_code(store, code).await?;
    if let Some(mut coupon) = coupon {
        if coupon.active {
            let exhausted = coupon.record_use();
            coupon = coupons::update(
                store,
                &coupon.id,
                json!({ "usage_count": coupon.usage_count, "active": coupon.active }),
            )
            .await?;
            tracing::info!(code, usage_count = coupon.usage_count, exhausted, "Coupon used");
        } else {
            tracing::warn!(code, "Inactive coupon used on order");
        }
        outcome.coupon = Some(coupon);
    }

    let linked = match outcome.coupon.as_ref().and_then(|c| c.evaluation_id.clone()) {
        Some(evaluation_id) => evaluations::get(store, &evaluation_id).await?,
        None => evaluations::find_by_coupon_code(store, code).await?,
    };

    let Some(evaluation) = linked else {
        if outcome.coupon.is_none() {
            tracing::debug!(code, "Discount code is not a trade-in coupon");
        }
        return Ok(outcome);
    };

    match evaluation.status {
        EvaluationStatus::Approved => {
            let updated = evaluations::update(
                store,
                &evaluation.id,
                json!({ "status": EvaluationStatus::Redeemed, "redeemed_at": now }),
            )
            .await?;
            tracing::info!(evaluation_id = %updated.id, code, "Trade-in evaluation redeemed");
            outcome.evaluation = Some(updated);
            outcome.redeemed = true;
        }
        EvaluationStatus::Redeemed => {
            outcome.evaluation = Some(evaluation);
        }
        status => {
            tracing::warn!(
                evaluation_id = %evaluation.id,
                status = status.as_str(),
                code,
                "Refusing redemption of evaluation that is not approved"
            );
            outcome.evaluation = Some(evaluation);
        }
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_by_condition() {
        assert_eq!(credit_for(1000.0, Condition::Good), 600);
        assert_eq!(credit_for(1000.0, Condition::Poor), 200);
        assert_eq!(credit_for(1000.0, Condition::Excellent), 800);
        assert_eq!(credit_for(1000.0, Condition::Fair), 400);
    }

    #[test]
    fn test_credit_rounds_half_away_from_zero() {
        // 12.5 * 0.2 = 2.5
        assert_eq!(credit_for(12.5, Condition::Poor), 3);
        // 101 * 0.6 = 60.6
        assert_eq!(credit_for(101.0, Condition::Good), 61);
        assert_eq!(credit_for(0.0, Condition::Excellent), 0);
    }

    #[test]
    fn test_coupon_code_shape() {
        let code = coupon_code("lx3k9abcdefgh", 36);
        assert_eq!(code, "TRADEIN-CDEFGH-10");
        assert_eq!(coupon_code("ab", 0), "TRADEIN-AB-0");
    }
}

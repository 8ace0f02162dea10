use crate::api::{parse_address, AppState};
use crate::collaborators::Hints;
use crate::domain::{TroveView, Wad};
use crate::engine::{AdjustTroveRequest, ClaimReceipt, OpenTroveRequest, OperationReceipt};
use crate::error::AppError;
use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HintsBody {
    pub upper_hint: Option<String>,
    pub lower_hint: Option<String>,
}

impl HintsBody {
    fn parse(&self) -> Result<Hints, AppError> {
        let upper = self
            .upper_hint
            .as_deref()
            .map(|raw| parse_address("upperHint", raw))
            .transpose()?;
        let lower = self
            .lower_hint
            .as_deref()
            .map(|raw| parse_address("lowerHint", raw))
            .transpose()?;
        Ok(Hints::between(upper, lower))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenTroveBody {
    pub caller: String,
    #[serde(default)]
    pub asset: u8,
    pub coll: Wad,
    pub debt: Wad,
    pub max_fee_percentage: Wad,
    #[serde(flatten)]
    pub hints: HintsBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustTroveBody {
    pub caller: String,
    /// Trove to adjust; defaults to the caller's own.
    pub borrower: Option<String>,
    pub coll_top_up: Option<Wad>,
    pub coll_withdrawal: Option<Wad>,
    pub debt_change: Option<Wad>,
    #[serde(default)]
    pub is_debt_increase: bool,
    pub max_fee_percentage: Option<Wad>,
    #[serde(flatten)]
    pub hints: HintsBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerBody {
    pub caller: String,
}

pub async fn get_trove(
    Path(owner): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<TroveView>, AppError> {
    let owner = parse_address("owner", &owner)?;
    Ok(Json(state.orchestrator.trove_view(&owner).await?))
}

pub async fn open_trove(
    State(state): State<AppState>,
    Json(body): Json<OpenTroveBody>,
) -> Result<Json<OperationReceipt>, AppError> {
    let caller = parse_address("caller", &body.caller)?;
    let req = OpenTroveRequest {
        asset: body.asset,
        coll: body.coll,
        debt: body.debt,
        max_fee_percentage: body.max_fee_percentage,
        hints: body.hints.parse()?,
    };
    Ok(Json(state.orchestrator.open_trove(&caller, &req).await?))
}

pub async fn adjust_trove(
    State(state): State<AppState>,
    Json(body): Json<AdjustTroveBody>,
) -> Result<Json<OperationReceipt>, AppError> {
    let caller = parse_address("caller", &body.caller)?;
    let borrower = match body.borrower.as_deref() {
        Some(raw) => parse_address("borrower", raw)?,
        None => caller.clone(),
    };
    let req = AdjustTroveRequest {
        borrower,
        coll_top_up: body.coll_top_up.unwrap_or_default(),
        coll_withdrawal: body.coll_withdrawal.unwrap_or_default(),
        debt_change: body.debt_change.unwrap_or_default(),
        is_debt_increase: body.is_debt_increase,
        max_fee_percentage: body.max_fee_percentage.unwrap_or_default(),
        hints: body.hints.parse()?,
    };
    Ok(Json(state.orchestrator.adjust_trove(&caller, &req).await?))
}

pub async fn close_trove(
    State(state): State<AppState>,
    Json(body): Json<CallerBody>,
) -> Result<Json<OperationReceipt>, AppError> {
    let caller = parse_address("caller", &body.caller)?;
    Ok(Json(state.orchestrator.close_trove(&caller).await?))
}

pub async fn claim_collateral(
    State(state): State<AppState>,
    Json(body): Json<CallerBody>,
) -> Result<Json<ClaimReceipt>, AppError> {
    let caller = parse_address("caller", &body.caller)?;
    Ok(Json(state.orchestrator.claim_collateral(&caller).await?))
}

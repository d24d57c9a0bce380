//! Loading-plan generation: batch the trucks, prompt the model once per
//! batch, recover JSON from each answer and merge the trucks.

use std::sync::Arc;

use db::models::{
    loading_plan::{OptimizationResult, TruckPlan},
    order::Order,
    order_data::LineItem,
};
use serde::Serialize;
use serde_json::Value;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::{
    claude_api::{ClaudeApiError, DEFAULT_MAX_TOKENS, TextGenerator},
    loading_prompt::{self, LoadingPrompt},
    response_sanitizer::{self, SanitizationError},
};

/// Trucks planned per model call. Keeps prompt and answer well inside the
/// output token limit.
pub const TRUCKS_PER_BATCH: u32 = 2;

#[derive(Debug, Error)]
pub enum LoadingError {
    #[error("API configuration error: {0}")]
    Configuration(String),
    #[error("{0}")]
    Validation(String),
    #[error("model call failed: {0}")]
    Upstream(#[from] ClaudeApiError),
    #[error(transparent)]
    Sanitization(#[from] SanitizationError),
    #[error("invalid response structure: {0}")]
    Schema(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("order not found")]
    OrderNotFound,
}

/// Contiguous, 1-based range of trucks planned by one model call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TruckBatch {
    pub first_truck: u32,
    pub last_truck: u32,
}

impl TruckBatch {
    pub fn truck_count(&self) -> u32 {
        self.last_truck - self.first_truck + 1
    }
}

/// Split `num_trucks` into batches of [`TRUCKS_PER_BATCH`]; the last batch
/// takes the remainder. Batches are produced lazily, one per model call.
pub fn plan_batches(num_trucks: u32) -> impl Iterator<Item = TruckBatch> {
    (1..=num_trucks)
        .step_by(TRUCKS_PER_BATCH as usize)
        .map(move |first_truck| TruckBatch {
            first_truck,
            last_truck: first_truck
                .saturating_add(TRUCKS_PER_BATCH - 1)
                .min(num_trucks),
        })
}

pub fn batch_count(num_trucks: u32) -> u32 {
    num_trucks.div_ceil(TRUCKS_PER_BATCH)
}

#[derive(Debug, Clone)]
pub struct OptimizationRequest {
    pub line_items: Vec<LineItem>,
    pub num_trucks: u32,
    pub allow_stacking: bool,
}

impl OptimizationRequest {
    pub fn validate(&self) -> Result<(), LoadingError> {
        if self.line_items.is_empty() {
            return Err(LoadingError::Validation(
                "Invalid or empty line items".to_string(),
            ));
        }
        if self.num_trucks < 1 {
            return Err(LoadingError::Validation(
                "Invalid number of trucks".to_string(),
            ));
        }
        Ok(())
    }
}

/// Which part of a plan a regeneration replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegenerationScope {
    /// Zero-based index into the plan's trucks
    Truck(usize),
    Full,
}

#[derive(Debug, Clone)]
pub struct RegenerationRequest {
    pub scope: RegenerationScope,
    pub feedback: String,
    pub current_plan: OptimizationResult,
    pub line_items: Vec<LineItem>,
}

impl RegenerationRequest {
    pub fn validate(&self) -> Result<(), LoadingError> {
        if self.feedback.trim().is_empty() {
            return Err(LoadingError::Validation("Feedback is required".to_string()));
        }
        Ok(())
    }
}

/// What a regeneration produced.
#[derive(Debug, Clone, PartialEq)]
pub enum RegenerationOutcome {
    Truck {
        index: usize,
        truck: TruckPlan,
        plan: OptimizationResult,
    },
    Full(OptimizationResult),
}

/// Part of a regeneration handed back to the caller: the new truck, or the
/// whole new plan.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RegenerationFragment {
    Truck(TruckPlan),
    Plan(OptimizationResult),
}

impl RegenerationOutcome {
    /// Complete plan after the regeneration was applied
    pub fn plan(&self) -> &OptimizationResult {
        match self {
            Self::Truck { plan, .. } => plan,
            Self::Full(plan) => plan,
        }
    }

    pub fn into_fragment(self) -> RegenerationFragment {
        match self {
            Self::Truck { truck, .. } => RegenerationFragment::Truck(truck),
            Self::Full(plan) => RegenerationFragment::Plan(plan),
        }
    }
}

/// Pull the truck list out of one parsed batch answer.
pub fn trucks_from_batch(value: Value) -> Result<Vec<TruckPlan>, LoadingError> {
    let trucks = match value {
        Value::Object(mut map) => match map.remove("trucks") {
            Some(Value::Array(trucks)) => trucks,
            Some(_) => {
                return Err(LoadingError::Schema(
                    "trucks field is not an array".to_string(),
                ));
            }
            None => {
                return Err(LoadingError::Schema("missing trucks array".to_string()));
            }
        },
        _ => {
            return Err(LoadingError::Schema(
                "response is not a JSON object".to_string(),
            ));
        }
    };

    Ok(trucks.into_iter().map(TruckPlan::from).collect())
}

/// Merge batch answers in batch order. Any malformed batch fails the whole
/// merge.
pub fn aggregate(batches: Vec<Value>) -> Result<OptimizationResult, LoadingError> {
    let mut trucks = Vec::new();
    for batch in batches {
        trucks.extend(trucks_from_batch(batch)?);
    }
    Ok(OptimizationResult::with_advisories(trucks))
}

fn single_truck(value: Value) -> Result<TruckPlan, LoadingError> {
    let truck = match value {
        Value::Object(mut map) => match map.remove("trucks") {
            Some(Value::Array(trucks)) => trucks.into_iter().next().ok_or_else(|| {
                LoadingError::Schema("trucks array is empty".to_string())
            })?,
            Some(_) => {
                return Err(LoadingError::Schema(
                    "trucks field is not an array".to_string(),
                ));
            }
            None => Value::Object(map),
        },
        _ => {
            return Err(LoadingError::Schema(
                "response is not a JSON object".to_string(),
            ));
        }
    };

    Ok(TruckPlan::from(truck))
}

/// Runs loading-plan generation against a [`TextGenerator`].
///
/// Batches go out one at a time, in order; the first failure aborts the
/// request and nothing from earlier batches is returned or stored.
#[derive(Clone)]
pub struct LoadingOptimizer {
    generator: Arc<dyn TextGenerator>,
    max_tokens: u32,
}

impl LoadingOptimizer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    async fn ask(&self, prompt: &LoadingPrompt) -> Result<Value, LoadingError> {
        let text = self
            .generator
            .generate(&prompt.system, &prompt.user, self.max_tokens)
            .await?;
        debug!(response_length = text.len(), raw = %text, "Model response");
        Ok(response_sanitizer::parse_model_json(&text)?)
    }

    pub async fn optimize(
        &self,
        request: &OptimizationRequest,
    ) -> Result<OptimizationResult, LoadingError> {
        request.validate()?;

        info!(
            num_trucks = request.num_trucks,
            batch_count = batch_count(request.num_trucks),
            line_items = request.line_items.len(),
            allow_stacking = request.allow_stacking,
            "Starting loading optimization"
        );

        let mut trucks = Vec::new();
        for batch in plan_batches(request.num_trucks) {
            let prompt =
                loading_prompt::batch_prompt(&batch, &request.line_items, request.allow_stacking);
            let batch_trucks = self
                .ask(&prompt)
                .await
                .and_then(trucks_from_batch)
                .inspect_err(|e| {
                    error!(
                        first_truck = batch.first_truck,
                        last_truck = batch.last_truck,
                        error = %e,
                        "Batch failed"
                    );
                })?;
            debug!(
                first_truck = batch.first_truck,
                last_truck = batch.last_truck,
                trucks = batch_trucks.len(),
                "Batch completed"
            );
            trucks.extend(batch_trucks);
        }

        let result = OptimizationResult::with_advisories(trucks);
        info!(trucks = result.trucks.len(), "Loading optimization completed");
        Ok(result)
    }

    /// Optimize and store the plan on the order. Nothing is written unless
    /// every batch succeeded.
    pub async fn optimize_order(
        &self,
        pool: &SqlitePool,
        order_id: Uuid,
        request: &OptimizationRequest,
    ) -> Result<OptimizationResult, LoadingError> {
        request.validate()?;
        if Order::find_by_id(pool, order_id).await?.is_none() {
            return Err(LoadingError::OrderNotFound);
        }

        let result = self.optimize(request).await?;

        Order::update_loading_instructions(pool, order_id, &result)
            .await?
            .ok_or(LoadingError::OrderNotFound)?;
        info!(order_id = %order_id, "Stored loading instructions");
        Ok(result)
    }

    pub async fn regenerate(
        &self,
        request: &RegenerationRequest,
    ) -> Result<RegenerationOutcome, LoadingError> {
        request.validate()?;

        match request.scope {
            RegenerationScope::Truck(index) => {
                let current = request.current_plan.trucks.get(index).ok_or_else(|| {
                    LoadingError::Validation(format!(
                        "Truck index {} is out of range ({} trucks in plan)",
                        index,
                        request.current_plan.trucks.len()
                    ))
                })?;

                info!(truck_index = index, "Regenerating single truck plan");
                let prompt = loading_prompt::truck_regeneration_prompt(
                    index,
                    current,
                    &request.feedback,
                    &request.line_items,
                );
                let truck = single_truck(self.ask(&prompt).await?)?;

                let mut plan = request.current_plan.clone();
                plan.trucks[index] = truck.clone();
                Ok(RegenerationOutcome::Truck { index, truck, plan })
            }
            RegenerationScope::Full => {
                info!(
                    trucks = request.current_plan.trucks.len(),
                    "Regenerating full loading plan"
                );
                let prompt = loading_prompt::full_regeneration_prompt(
                    &request.current_plan,
                    &request.feedback,
                    &request.line_items,
                );
                let plan = aggregate(vec![self.ask(&prompt).await?])?;
                Ok(RegenerationOutcome::Full(plan))
            }
        }
    }

    /// Regenerate against the plan stored on the order (falling back to the
    /// caller's copy when none is stored yet) and write the result back.
    pub async fn regenerate_order(
        &self,
        pool: &SqlitePool,
        order_id: Uuid,
        mut request: RegenerationRequest,
    ) -> Result<RegenerationOutcome, LoadingError> {
        request.validate()?;
        let order = Order::find_by_id(pool, order_id)
            .await?
            .ok_or(LoadingError::OrderNotFound)?;

        if let Some(stored) = order.parsed_loading_instructions() {
            request.current_plan = stored;
        }

        let outcome = self.regenerate(&request).await?;

        Order::update_loading_instructions(pool, order_id, outcome.plan())
            .await?
            .ok_or(LoadingError::OrderNotFound)?;
        info!(order_id = %order_id, "Stored regenerated loading instructions");
        Ok(outcome)
    }
}

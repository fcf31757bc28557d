use super::{
    DeltaMap, RebalanceMetrics, RouteFinder,
    bridge::{Bridge, DepositParams},
    swap::{SwapCostParams, SwapParams, Swapper},
};
use crate::{
    chain::{Chains, approve_tx},
    config::FeeManagerConfig,
    constants::{DEFAULT_BLOCK_CONFIRMATIONS, NATIVE_GAS_RESERVE},
    error::{StepExecutionError, StepFailure},
    types::{Route, RouteAction, RouteStep, TxRequest, scale_amount},
};
use alloy::primitives::{Address, ChainId, TxHash, U256};
use eyre::eyre;
use rust_decimal::Decimal;
use std::{collections::BTreeMap, sync::Arc};
use tracing::{debug, error, info, warn};

/// Why a route was skipped without submitting anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SkipReason {
    /// The source network has no surplus left to move.
    NoSurplus,
    /// The surplus token balance is zero.
    ZeroBalance,
    /// The native balance does not exceed the gas kept in reserve.
    BelowGasReserve,
}

/// Result of attempting a route.
#[derive(Debug)]
pub enum RouteResult {
    /// Every step was confirmed.
    Completed {
        /// Transactions sent, in order.
        transactions: Vec<TxHash>,
    },
    /// Nothing was sent.
    Skipped(SkipReason),
    /// A step failed and the rest of the route was abandoned.
    Failed(StepExecutionError),
}

impl RouteResult {
    /// Whether the route completed.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// An attempted route and its result.
#[derive(Debug)]
pub struct RouteOutcome {
    /// The route attempted.
    pub route: Route,
    /// What happened.
    pub result: RouteResult,
}

/// A token swapped into the native token on the trigger network.
#[derive(Debug)]
pub struct ConsolidationOutcome {
    /// Network of the swap.
    pub chain_id: ChainId,
    /// Token swapped.
    pub token: Address,
    /// Its USD value before the swap.
    pub value_usd: Decimal,
    /// What happened.
    pub result: RouteResult,
}

/// Summary of a rebalance cycle.
#[derive(Debug, Default)]
pub struct RebalanceReport {
    /// Consolidation swaps attempted on the trigger network.
    pub consolidations: Vec<ConsolidationOutcome>,
    /// Routes attempted, in order.
    pub outcomes: Vec<RouteOutcome>,
    /// Deficit left per network once routes were exhausted or the deficit was covered.
    pub remaining: BTreeMap<ChainId, Decimal>,
}

impl RebalanceReport {
    /// Returns the failed routes.
    pub fn failures(&self) -> impl Iterator<Item = &RouteOutcome> {
        self.outcomes.iter().filter(|outcome| matches!(outcome.result, RouteResult::Failed(_)))
    }

    /// Returns the number of completed routes.
    pub fn completed(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.result.is_completed()).count()
    }
}

/// Outcome of a route that did not fail.
#[derive(Debug)]
enum RouteExecution {
    Completed { transactions: Vec<TxHash>, moved_usd: Decimal },
    Skipped(SkipReason),
}

/// Returns a closure turning a step failure into a [`StepExecutionError`] with its context.
fn step_failed<E: Into<StepFailure>>(
    step: RouteStep,
    chain_id: ChainId,
    token: Address,
    amount: U256,
) -> impl FnOnce(E) -> StepExecutionError {
    move |err| StepExecutionError { step, chain_id, token, amount, reason: err.into() }
}

/// Executes ranked routes by sending approve, convert and transfer transactions from the
/// master funding account.
#[derive(Debug, Clone)]
pub struct RebalanceExecutor {
    finder: RouteFinder,
    chains: Chains,
    bridge: Arc<dyn Bridge>,
    swapper: Arc<dyn Swapper>,
    config: Arc<FeeManagerConfig>,
    metrics: Arc<RebalanceMetrics>,
}

impl RebalanceExecutor {
    /// Creates a new [`RebalanceExecutor`].
    pub fn new(
        finder: RouteFinder,
        chains: Chains,
        bridge: Arc<dyn Bridge>,
        swapper: Arc<dyn Swapper>,
        config: Arc<FeeManagerConfig>,
        metrics: Arc<RebalanceMetrics>,
    ) -> Self {
        Self { finder, chains, bridge, swapper, config, metrics }
    }

    fn account(&self) -> Address {
        self.config.master_funding_account
    }

    fn confirmations(&self, chain_id: ChainId) -> u64 {
        self.config
            .chain(chain_id)
            .map(|chain| chain.block_confirmations)
            .unwrap_or(DEFAULT_BLOCK_CONFIRMATIONS)
    }

    /// Walks the ranked routes into each deficit network until its deficit is covered or the
    /// routes are exhausted.
    ///
    /// Routes are executed one at a time and a failed route is never retried. Each completed
    /// route takes its cost off the remaining deficit. A route moves no more than what is left
    /// of its source network's surplus, so a cycle never pulls a network below its target.
    pub async fn execute(&self, routes: &[Route], delta: &DeltaMap) -> RebalanceReport {
        let mut report = RebalanceReport::default();
        let mut available = delta.surplus.clone();

        for (chain_id, amount) in &delta.deficit {
            let mut remaining = *amount;

            for route in routes.iter().filter(|route| route.to_chain == *chain_id) {
                if remaining <= Decimal::ZERO {
                    break;
                }

                let budget =
                    available.get(&route.from_chain).copied().unwrap_or_default().min(remaining);
                let result = match self.execute_route(route, budget).await {
                    Ok(RouteExecution::Completed { transactions, moved_usd }) => {
                        self.metrics.routes_completed.increment(1);
                        remaining -= route.cost_usd;
                        if let Some(left) = available.get_mut(&route.from_chain) {
                            *left = (*left - moved_usd).max(Decimal::ZERO);
                        }
                        info!(
                            bridge = self.bridge.id(),
                            from_chain = route.from_chain,
                            to_chain = route.to_chain,
                            token = %route.token,
                            action = %route.action,
                            %moved_usd,
                            %remaining,
                            "Route completed"
                        );
                        RouteResult::Completed { transactions }
                    }
                    Ok(RouteExecution::Skipped(reason)) => {
                        self.metrics.routes_skipped.increment(1);
                        debug!(
                            from_chain = route.from_chain,
                            to_chain = route.to_chain,
                            token = %route.token,
                            %reason,
                            "Route skipped"
                        );
                        RouteResult::Skipped(reason)
                    }
                    Err(err) => {
                        self.metrics.routes_failed.increment(1);
                        error!(
                            bridge = self.bridge.id(),
                            from_chain = route.from_chain,
                            to_chain = route.to_chain,
                            token = %route.token,
                            action = %route.action,
                            step = %err.step,
                            step_chain = err.chain_id,
                            step_token = %err.token,
                            amount = %err.amount,
                            %err,
                            "Route failed, moving on to the next route"
                        );
                        RouteResult::Failed(err)
                    }
                };
                report.outcomes.push(RouteOutcome { route: route.clone(), result });
            }

            if remaining > Decimal::ZERO {
                warn!(chain_id, %remaining, "Routes exhausted before deficit was covered");
            }
            report.remaining.insert(*chain_id, remaining.max(Decimal::ZERO));
        }

        report
    }

    /// Swaps tokens on `chain_id` whose USD value exceeds their consolidation threshold into
    /// the native token.
    pub async fn consolidate(&self, chain_id: ChainId) -> Vec<ConsolidationOutcome> {
        let Some(chain) = self.config.chain(chain_id) else {
            return Vec::new();
        };
        let sentinels = &self.config.native_sentinels;
        let valuer = self.finder.valuer();

        let mut thresholds: Vec<_> = chain
            .consolidation_thresholds
            .iter()
            .filter(|(token, _)| !sentinels.is_native(**token))
            .collect();
        thresholds.sort_by_key(|(token, _)| **token);

        let mut outcomes = Vec::new();
        for (token, threshold) in thresholds {
            let amount = match valuer.balances().balance(chain_id, *token).await {
                Ok(amount) => amount,
                Err(err) => {
                    warn!(chain_id, %token, %err, "Skipping consolidation");
                    continue;
                }
            };
            let value_usd = match valuer.value_of(chain_id, *token, amount).await {
                Ok(value) => value,
                Err(err) => {
                    warn!(chain_id, %token, %err, "Skipping consolidation");
                    continue;
                }
            };
            if value_usd <= *threshold {
                continue;
            }

            info!(chain_id, %token, %value_usd, %threshold, "Consolidating token into native");
            let result = match self.convert(chain_id, *token, sentinels.router, amount).await {
                Ok(transactions) => {
                    self.metrics.consolidations.increment(1);
                    RouteResult::Completed { transactions }
                }
                Err(err) => {
                    error!(
                        chain_id,
                        %token,
                        step = %err.step,
                        amount = %err.amount,
                        %err,
                        "Consolidation failed"
                    );
                    RouteResult::Failed(err)
                }
            };
            outcomes.push(ConsolidationOutcome { chain_id, token: *token, value_usd, result });
        }

        outcomes
    }

    /// Moves up to `budget` USD worth of the route's token.
    async fn execute_route(
        &self,
        route: &Route,
        budget: Decimal,
    ) -> Result<RouteExecution, StepExecutionError> {
        let (from, to, token) = (route.from_chain, route.to_chain, route.token);
        if budget <= Decimal::ZERO {
            return Ok(RouteExecution::Skipped(SkipReason::NoSurplus));
        }

        let valuer = self.finder.valuer();
        let balance = valuer
            .balances()
            .balance(from, token)
            .await
            .map_err(step_failed(RouteStep::Prepare, from, token, U256::ZERO))?;
        if balance.is_zero() {
            return Ok(RouteExecution::Skipped(SkipReason::ZeroBalance));
        }

        let value = valuer
            .value_of(from, token, balance)
            .await
            .map_err(step_failed(RouteStep::Prepare, from, token, balance))?;
        let (mut amount, moved_usd) = match budget.checked_div(value) {
            Some(ratio) if value > budget => (scale_amount(balance, ratio), budget),
            _ => (balance, value),
        };
        let native = self.config.native_sentinels.is_native(token);
        if native {
            amount = amount.min(self.spendable_native(from, balance).await?);
        }
        if amount.is_zero() {
            let reason = if native { SkipReason::BelowGasReserve } else { SkipReason::NoSurplus };
            return Ok(RouteExecution::Skipped(reason));
        }

        let plan = self
            .finder
            .plan(from, to, token, route.action)
            .await
            .map_err(step_failed(RouteStep::Prepare, from, token, amount))?;

        let mut transactions = Vec::new();
        match route.action {
            RouteAction::ConvertThenTransfer => {
                let mut bridge_amount = amount;
                if let Some(bridge_token) = plan.convert_to {
                    let quote = self
                        .swapper
                        .quote(&SwapCostParams {
                            chain_id: from,
                            from_token: self.finder.swap_address(token),
                            to_token: self.finder.swap_address(bridge_token),
                            amount,
                        })
                        .await
                        .map_err(step_failed(RouteStep::Prepare, from, token, amount))?;
                    transactions.extend(self.convert(from, token, bridge_token, amount).await?);

                    // bridge what the conversion yielded, not what the account already held
                    let mut held = valuer
                        .balances()
                        .balance(from, bridge_token)
                        .await
                        .map_err(step_failed(RouteStep::Prepare, from, bridge_token, amount))?;
                    if self.config.native_sentinels.is_native(bridge_token) {
                        held = self.spendable_native(from, held).await?;
                    }
                    bridge_amount = quote.to_amount.min(held);
                    if bridge_amount.is_zero() {
                        return Err(StepExecutionError {
                            step: RouteStep::Transfer,
                            chain_id: from,
                            token: bridge_token,
                            amount: held,
                            reason: eyre!("conversion left nothing to bridge").into(),
                        });
                    }
                }
                transactions
                    .extend(self.transfer(from, to, plan.bridge_token, bridge_amount).await?);
            }
            RouteAction::TransferThenConvert => {
                transactions.extend(self.transfer(from, to, token, amount).await?);
                if let Some(reference) = plan.convert_received_to {
                    transactions
                        .extend(self.convert_received(to, plan.received_token, reference).await?);
                }
            }
        }

        Ok(RouteExecution::Completed { transactions, moved_usd })
    }

    /// Returns the part of a native `balance` that can be moved while leaving enough to pay for
    /// [`NATIVE_GAS_RESERVE`] gas.
    async fn spendable_native(
        &self,
        chain_id: ChainId,
        balance: U256,
    ) -> Result<U256, StepExecutionError> {
        let native = self.config.native_sentinels.relayer;
        let gas_price = self
            .chains
            .get(chain_id)
            .map_err(step_failed(RouteStep::Prepare, chain_id, native, balance))?
            .gas_price()
            .await
            .map_err(step_failed(RouteStep::Prepare, chain_id, native, balance))?;
        let reserve = U256::from(NATIVE_GAS_RESERVE).saturating_mul(U256::from(gas_price));
        Ok(balance.saturating_sub(reserve))
    }

    /// Converts whatever has arrived of the bridged token on the destination network.
    async fn convert_received(
        &self,
        chain_id: ChainId,
        received: Address,
        reference: Address,
    ) -> Result<Vec<TxHash>, StepExecutionError> {
        let amount = self
            .finder
            .valuer()
            .balances()
            .balance(chain_id, received)
            .await
            .map_err(step_failed(RouteStep::Prepare, chain_id, received, U256::ZERO))?;
        if amount.is_zero() {
            info!(
                chain_id,
                token = %received,
                "Bridged funds not arrived yet, leaving them unconverted"
            );
            return Ok(Vec::new());
        }
        self.convert(chain_id, received, reference, amount).await
    }

    /// Swaps `amount` of `from_token` into `to_token`.
    async fn convert(
        &self,
        chain_id: ChainId,
        from_token: Address,
        to_token: Address,
        amount: U256,
    ) -> Result<Vec<TxHash>, StepExecutionError> {
        let mut transactions = Vec::new();
        if !self.config.native_sentinels.is_native(from_token) {
            let spender = self
                .swapper
                .spender(chain_id)
                .await
                .map_err(step_failed(RouteStep::Approve, chain_id, from_token, amount))?;
            transactions
                .extend(self.ensure_allowance(chain_id, from_token, spender, amount).await?);
        }

        let tx = self
            .swapper
            .swap(&SwapParams {
                chain_id,
                from_token: self.finder.swap_address(from_token),
                to_token: self.finder.swap_address(to_token),
                amount,
                account: self.account(),
            })
            .await
            .map_err(step_failed(RouteStep::Convert, chain_id, from_token, amount))?;
        transactions.push(self.submit(chain_id, RouteStep::Convert, from_token, amount, tx).await?);

        Ok(transactions)
    }

    /// Bridges `amount` of `token` from `from_chain` to the master funding account on
    /// `to_chain`.
    async fn transfer(
        &self,
        from_chain: ChainId,
        to_chain: ChainId,
        token: Address,
        amount: U256,
    ) -> Result<Vec<TxHash>, StepExecutionError> {
        let mut transactions = Vec::new();
        if !self.config.native_sentinels.is_native(token) {
            let spender = self
                .bridge
                .spender(from_chain)
                .await
                .map_err(step_failed(RouteStep::Approve, from_chain, token, amount))?;
            transactions.extend(self.ensure_allowance(from_chain, token, spender, amount).await?);
        }

        let tx = self
            .bridge
            .deposit(&DepositParams {
                from_chain,
                to_chain,
                token: self.finder.bridge_address(token),
                amount,
                sender: self.account(),
                receiver: self.account(),
            })
            .await
            .map_err(step_failed(RouteStep::Transfer, from_chain, token, amount))?;
        transactions.push(self.submit(from_chain, RouteStep::Transfer, token, amount, tx).await?);

        Ok(transactions)
    }

    /// Approves `spender` for `amount` of `token` unless the allowance already covers it.
    async fn ensure_allowance(
        &self,
        chain_id: ChainId,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<Option<TxHash>, StepExecutionError> {
        let allowance = self
            .chains
            .erc20_allowance(chain_id, token, self.account(), spender)
            .await
            .map_err(step_failed(RouteStep::Approve, chain_id, token, amount))?;
        if allowance >= amount {
            return Ok(None);
        }

        debug!(chain_id, %token, %spender, %allowance, %amount, "Approving spender");
        let tx = approve_tx(token, spender, amount);
        self.submit(chain_id, RouteStep::Approve, token, amount, tx).await.map(Some)
    }

    /// Sends a step's transaction and waits for the network's configured confirmations.
    async fn submit(
        &self,
        chain_id: ChainId,
        step: RouteStep,
        token: Address,
        amount: U256,
        tx: TxRequest,
    ) -> Result<TxHash, StepExecutionError> {
        let receipt = self
            .chains
            .send_and_confirm(chain_id, self.account(), tx, self.confirmations(chain_id))
            .await
            .map_err(step_failed(step, chain_id, token, amount))?;
        debug!(chain_id, %step, tx_hash = %receipt.transaction_hash, "Step confirmed");
        Ok(receipt.transaction_hash)
    }
}

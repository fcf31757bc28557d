use super::{
    CrossNetworkBalanceValuer, DeltaMap, RebalanceMetrics,
    bridge::{Bridge, DepositCostParams, ExitCostParams},
    swap::{SwapCostParams, Swapper},
    tokens::SupportedTokens,
};
use crate::{
    config::FeeManagerConfig,
    error::{RouteEstimationError, ValuationError},
    types::{NativeSentinels, Route, RouteAction},
};
use alloy::primitives::{Address, ChainId, U256};
use futures_util::future::join_all;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Tokens a route moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutePlan {
    /// Token converted before the transfer, if the route converts on the source network.
    pub convert_to: Option<Address>,
    /// Token handed to the bridge on the source network.
    pub bridge_token: Address,
    /// Token the bridge delivers on the destination network.
    pub received_token: Address,
    /// Token converted into on the destination network, if the received token needs
    /// converting.
    pub convert_received_to: Option<Address>,
}

/// Sorts routes by ascending cost, keeping discovery order among equal costs.
pub fn rank_routes(mut routes: Vec<Route>) -> Vec<Route> {
    routes.sort_by(|a, b| a.cost_usd.cmp(&b.cost_usd));
    routes
}

/// Enumerates and prices the ways of moving surplus funds to a deficit network.
#[derive(Debug, Clone)]
pub struct RouteFinder {
    valuer: CrossNetworkBalanceValuer,
    tokens: SupportedTokens,
    bridge: Arc<dyn Bridge>,
    swapper: Arc<dyn Swapper>,
    config: Arc<FeeManagerConfig>,
    metrics: Arc<RebalanceMetrics>,
}

impl RouteFinder {
    /// Creates a new [`RouteFinder`].
    pub fn new(
        valuer: CrossNetworkBalanceValuer,
        tokens: SupportedTokens,
        bridge: Arc<dyn Bridge>,
        swapper: Arc<dyn Swapper>,
        config: Arc<FeeManagerConfig>,
        metrics: Arc<RebalanceMetrics>,
    ) -> Self {
        Self { valuer, tokens, bridge, swapper, config, metrics }
    }

    /// Returns the balance valuer.
    pub fn valuer(&self) -> &CrossNetworkBalanceValuer {
        &self.valuer
    }

    fn sentinels(&self) -> &NativeSentinels {
        &self.config.native_sentinels
    }

    /// Returns every priceable route from a surplus network to `target`, cheapest first.
    ///
    /// Candidates are priced concurrently. A candidate that fails to be priced is logged and
    /// dropped.
    pub async fn find_routes(&self, delta: &DeltaMap, target: ChainId) -> Vec<Route> {
        let candidates: Vec<_> = delta
            .surplus
            .keys()
            .filter(|from_chain| **from_chain != target)
            .filter_map(|from_chain| Some((*from_chain, self.config.chain(*from_chain)?)))
            .flat_map(|(from_chain, chain)| {
                chain.tokens.iter().flat_map(move |token| {
                    [RouteAction::ConvertThenTransfer, RouteAction::TransferThenConvert]
                        .map(|action| (from_chain, token.address, action))
                })
            })
            .collect();

        let costs = join_all(
            candidates
                .iter()
                .map(|(from_chain, token, action)| self.cost(*from_chain, target, *token, *action)),
        )
        .await;

        let mut routes = Vec::with_capacity(candidates.len());
        for ((from_chain, token, action), cost) in candidates.into_iter().zip(costs) {
            self.metrics.routes_priced.increment(1);
            match cost {
                Ok(cost_usd) => {
                    debug!(
                        from_chain,
                        to_chain = target,
                        %token,
                        %action,
                        %cost_usd,
                        "Priced route"
                    );
                    routes.push(Route { from_chain, to_chain: target, token, action, cost_usd });
                }
                Err(err) => {
                    self.metrics.route_estimation_failures.increment(1);
                    warn!(
                        from_chain,
                        to_chain = target,
                        %token,
                        %action,
                        %err,
                        "Dropping route candidate"
                    );
                }
            }
        }

        let routes = rank_routes(routes);
        info!(to_chain = target, num = routes.len(), "Found rebalance routes");
        routes
    }

    /// Returns the estimated USD cost of a route.
    pub async fn cost(
        &self,
        from_chain: ChainId,
        to_chain: ChainId,
        token: Address,
        action: RouteAction,
    ) -> Result<Decimal, RouteEstimationError> {
        let amount = self.valuer.balances().balance(from_chain, token).await?;
        let plan = self.plan(from_chain, to_chain, token, action).await?;

        let convert_cost = match plan.convert_to {
            Some(to_token) => self.swap_cost(from_chain, token, to_token, amount, action).await?,
            None => Decimal::ZERO,
        };
        let bridge_cost = self
            .bridge_cost(
                from_chain,
                to_chain,
                plan.bridge_token,
                plan.received_token,
                amount,
                action,
            )
            .await?;
        let convert_received_cost = match plan.convert_received_to {
            Some(to_token) => {
                self.swap_cost(to_chain, plan.received_token, to_token, amount, action).await?
            }
            None => Decimal::ZERO,
        };

        convert_cost
            .checked_add(bridge_cost)
            .and_then(|cost| cost.checked_add(convert_received_cost))
            .ok_or(RouteEstimationError::Overflow)
    }

    /// Resolves the tokens a route moves through.
    pub async fn plan(
        &self,
        from_chain: ChainId,
        to_chain: ChainId,
        token: Address,
        action: RouteAction,
    ) -> Result<RoutePlan, RouteEstimationError> {
        match action {
            RouteAction::ConvertThenTransfer => {
                // convert into the destination's native token as listed on the source network
                let symbol = self
                    .config
                    .chain(to_chain)
                    .map(|chain| chain.native_symbol.clone())
                    .unwrap_or_default();
                let swap_tokens = self.tokens.swap_tokens(from_chain).await.map_err(|source| {
                    RouteEstimationError::Quote { action, source }
                })?;
                let bridge_token = *swap_tokens.get(&symbol).ok_or_else(|| {
                    RouteEstimationError::NoConversionTarget { chain_id: from_chain, symbol }
                })?;
                let received_token =
                    self.received_token(from_chain, to_chain, bridge_token, action).await?;
                let convert_to =
                    (!self.sentinels().same_token(token, bridge_token)).then_some(bridge_token);
                Ok(RoutePlan {
                    convert_to,
                    bridge_token,
                    received_token,
                    convert_received_to: None,
                })
            }
            RouteAction::TransferThenConvert => {
                let received_token =
                    self.received_token(from_chain, to_chain, token, action).await?;
                let convert_received_to = (!self.sentinels().is_native(received_token))
                    .then_some(self.sentinels().router);
                Ok(RoutePlan {
                    convert_to: None,
                    bridge_token: token,
                    received_token,
                    convert_received_to,
                })
            }
        }
    }

    /// Returns what `token` arrives as on `to_chain`.
    async fn received_token(
        &self,
        from_chain: ChainId,
        to_chain: ChainId,
        token: Address,
        action: RouteAction,
    ) -> Result<Address, RouteEstimationError> {
        let bridge_tokens = self
            .tokens
            .bridge_tokens(from_chain)
            .await
            .map_err(|source| RouteEstimationError::Quote { action, source })?;
        bridge_tokens
            .get(&self.bridge_address(token))
            .and_then(|destinations| destinations.get(&to_chain))
            .copied()
            .ok_or(RouteEstimationError::UnsupportedBridgeToken { token, from_chain, to_chain })
    }

    /// Returns the address the bridge knows `token` under.
    pub fn bridge_address(&self, token: Address) -> Address {
        if self.sentinels().is_native(token) { self.sentinels().relayer } else { token }
    }

    /// Returns the address the swap aggregator knows `token` under.
    pub fn swap_address(&self, token: Address) -> Address {
        if self.sentinels().is_native(token) { self.sentinels().router } else { token }
    }

    async fn swap_cost(
        &self,
        chain_id: ChainId,
        from_token: Address,
        to_token: Address,
        amount: U256,
        action: RouteAction,
    ) -> Result<Decimal, RouteEstimationError> {
        let quote = self
            .swapper
            .quote(&SwapCostParams {
                chain_id,
                from_token: self.swap_address(from_token),
                to_token: self.swap_address(to_token),
                amount,
            })
            .await
            .map_err(|source| RouteEstimationError::Quote { action, source })?;
        self.gas_cost(chain_id, quote.estimated_gas).await
    }

    async fn bridge_cost(
        &self,
        from_chain: ChainId,
        to_chain: ChainId,
        token: Address,
        received_token: Address,
        amount: U256,
        action: RouteAction,
    ) -> Result<Decimal, RouteEstimationError> {
        let token = self.bridge_address(token);
        let deposit_cost = self
            .bridge
            .deposit_cost(&DepositCostParams {
                from_chain,
                to_chain,
                token,
                amount,
                account: self.valuer.balances().account(),
            })
            .await
            .map_err(|source| RouteEstimationError::Quote { action, source })?;
        let exit_cost = self
            .bridge
            .exit_cost(&ExitCostParams { from_chain, to_chain, token, amount })
            .await
            .map_err(|source| RouteEstimationError::Quote { action, source })?;
        let exit_cost = self.valuer.value_of(to_chain, received_token, exit_cost).await?;

        deposit_cost.checked_add(exit_cost).ok_or(RouteEstimationError::Overflow)
    }

    /// Returns the USD cost of `gas` at the current gas price of `chain_id`.
    pub async fn gas_cost(
        &self,
        chain_id: ChainId,
        gas: u64,
    ) -> Result<Decimal, RouteEstimationError> {
        let gas_price = self.valuer.balances().chains().get(chain_id)?.gas_price().await?;
        let fee = U256::from(gas).saturating_mul(U256::from(gas_price));
        Ok(self.valuer.native_value(chain_id, fee).await.map_err(ValuationError::from)?)
    }
}

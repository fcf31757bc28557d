//! Mocks and fixtures shared by unit tests.

use crate::{
    chain::{ChainReader, Chains},
    config::{ChainConfig, FeeManagerConfig},
    constants::{NATIVE_ADDRESS_RELAYER, NATIVE_ADDRESS_ROUTER},
    error::ChainError,
    fees::FeeManager,
    liquidity::{
        BalanceAggregator, CrossNetworkBalanceValuer, DeltaCalculator, Rebalance,
        RebalanceExecutor, RebalanceMetrics, RebalanceReport, Rebalancer, RouteFinder,
        SupportedTokens,
        bridge::{Bridge, BridgeTokenMap, DepositCostParams, DepositParams, ExitCostParams},
        swap::{SwapCostParams, SwapParams, SwapQuote, SwapTokenList, Swapper},
    },
    price::PriceOracle,
    storage::FeeStorage,
    types::{FeeMode, IERC20, Route, RouteAction, TokenRecord, TxReceipt, TxRequest},
};
use alloy::{
    primitives::{Address, B256, Bytes, ChainId, TxHash, U256, address},
    sol_types::{SolCall, SolInterface},
};
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use eyre::eyre;
use metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};
use rust_decimal::Decimal;
use std::{
    collections::BTreeMap,
    sync::{
        Arc,
        RwLock,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
    time::Duration,
};

pub const MFA: Address = address!("0x1111111111111111111111111111111111111111");
pub const USDC: Address = address!("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
pub const WETH: Address = address!("0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2");
pub const MATIC_ON_ETH: Address = address!("0x7d1afa7b718fb893db30a3abc0cfc608aacfebb0");
pub const BRIDGE_SPENDER: Address = address!("0x2222222222222222222222222222222222222222");
pub const SWAP_SPENDER: Address = address!("0x3333333333333333333333333333333333333333");

const ETHER: u128 = 1_000_000_000_000_000_000;
const GWEI: u128 = 1_000_000_000;

/// Ethereum (1) and Optimism (10) in ETH, Polygon (137) in MATIC, each tracking the native
/// token and 6-decimal USDC.
pub fn test_config() -> FeeManagerConfig {
    let chain = |symbol: &str, target: i64| {
        ChainConfig::new(symbol, Decimal::from(5000))
            .with_token(TokenRecord::new(NATIVE_ADDRESS_RELAYER, symbol, 18))
            .with_token(TokenRecord::new(USDC, "USDC", 6))
            .with_target_funding(Decimal::from(target))
    };
    FeeManagerConfig::new(MFA)
        .with_chain(1, chain("ETH", 1000))
        .with_chain(137, chain("MATIC", 200))
        .with_chain(10, chain("ETH", 500))
}

/// Returns a route into Ethereum.
pub fn route(from_chain: ChainId, token: Address, cost_usd: i64) -> Route {
    Route {
        from_chain,
        to_chain: 1,
        token,
        action: RouteAction::ConvertThenTransfer,
        cost_usd: Decimal::from(cost_usd),
    }
}

/// An in-memory network holding the master funding account's balances.
///
/// Approvals update allowances and attached value is debited from the native balance. Every
/// other effect of a transaction is ignored.
#[derive(Debug)]
pub struct MockChain {
    native_balance: RwLock<U256>,
    token_balances: DashMap<Address, U256>,
    decimals: DashMap<Address, u8>,
    allowances: DashMap<(Address, Address), U256>,
    failing_approvals: DashSet<Address>,
    receipts: DashMap<TxHash, TxReceipt>,
    sent: DashMap<TxHash, TxRequest>,
    nonce: AtomicU64,
    gas_price: u128,
    fail_calls: bool,
    fail_balance: bool,
}

impl Default for MockChain {
    fn default() -> Self {
        Self {
            native_balance: RwLock::new(U256::ZERO),
            token_balances: DashMap::default(),
            decimals: [(USDC, 6)].into_iter().collect(),
            allowances: DashMap::default(),
            failing_approvals: DashSet::default(),
            receipts: DashMap::default(),
            sent: DashMap::default(),
            nonce: AtomicU64::new(0),
            gas_price: 20 * GWEI,
            fail_calls: false,
            fail_balance: false,
        }
    }
}

impl MockChain {
    pub fn with_native_balance(self, balance: U256) -> Self {
        self.set_native_balance(balance);
        self
    }

    pub fn with_token_balance(self, token: Address, balance: U256) -> Self {
        self.set_token_balance(token, balance);
        self
    }

    /// Fails every `eth_call`, so ERC20 balances cannot be read.
    pub fn with_failing_calls(mut self) -> Self {
        self.fail_calls = true;
        self
    }

    /// Fails native balance reads.
    pub fn with_failing_balance(mut self) -> Self {
        self.fail_balance = true;
        self
    }

    pub fn set_native_balance(&self, balance: U256) {
        *self.native_balance.write().unwrap() = balance;
    }

    pub fn set_token_balance(&self, token: Address, balance: U256) {
        self.token_balances.insert(token, balance);
    }

    /// Makes every approval of `token` revert.
    pub fn fail_approvals(&self, token: Address) {
        self.failing_approvals.insert(token);
    }

    pub fn add_receipt(&self, receipt: TxReceipt) {
        self.receipts.insert(receipt.transaction_hash, receipt);
    }

    /// Returns the transactions sent, in no particular order.
    pub fn sent(&self) -> Vec<TxRequest> {
        self.sent.iter().map(|tx| tx.value().clone()).collect()
    }

    pub fn allowance(&self, token: Address, spender: Address) -> U256 {
        self.allowances.get(&(token, spender)).map(|a| *a).unwrap_or_default()
    }
}

#[async_trait]
impl ChainReader for MockChain {
    async fn native_balance(&self, _account: Address) -> Result<U256, ChainError> {
        if self.fail_balance {
            return Err(eyre!("balance unavailable").into());
        }
        Ok(*self.native_balance.read().unwrap())
    }

    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, ChainError> {
        if self.fail_calls {
            return Err(eyre!("call failed").into());
        }
        let output = match IERC20::IERC20Calls::abi_decode(&input)? {
            IERC20::IERC20Calls::balanceOf(_) => IERC20::balanceOfCall::abi_encode_returns(
                &self.token_balances.get(&to).map(|b| *b).unwrap_or_default(),
            ),
            IERC20::IERC20Calls::allowance(call) => {
                IERC20::allowanceCall::abi_encode_returns(&self.allowance(to, call.spender))
            }
            IERC20::IERC20Calls::decimals(_) => IERC20::decimalsCall::abi_encode_returns(
                &self.decimals.get(&to).map(|d| *d).unwrap_or(18),
            ),
            IERC20::IERC20Calls::approve(_) => return Err(eyre!("approve is not a view").into()),
        };
        Ok(output.into())
    }

    async fn gas_price(&self) -> Result<u128, ChainError> {
        Ok(self.gas_price)
    }

    async fn estimate_gas(&self, _from: Address, _tx: &TxRequest) -> Result<u64, ChainError> {
        Ok(100_000)
    }

    async fn send_transaction(&self, _from: Address, tx: TxRequest) -> Result<TxHash, ChainError> {
        {
            let mut native = self.native_balance.write().unwrap();
            if tx.value > *native {
                return Err(eyre!("insufficient funds for value {}", tx.value).into());
            }
            *native -= tx.value;
        }

        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst) + 1;
        let hash = B256::left_padding_from(&nonce.to_be_bytes());

        let mut status = true;
        if let Ok(IERC20::IERC20Calls::approve(call)) = IERC20::IERC20Calls::abi_decode(&tx.input)
        {
            if self.failing_approvals.contains(&tx.to) {
                status = false;
            } else {
                self.allowances.insert((tx.to, call.spender), call.amount);
            }
        }

        self.receipts.insert(
            hash,
            TxReceipt {
                transaction_hash: hash,
                status,
                gas_used: 100_000,
                effective_gas_price: self.gas_price,
                block_number: Some(nonce),
            },
        );
        self.sent.insert(hash, tx);
        Ok(hash)
    }

    async fn wait_for_confirmation(
        &self,
        hash: TxHash,
        _confirmations: u64,
    ) -> Result<TxReceipt, ChainError> {
        self.receipts
            .get(&hash)
            .map(|receipt| *receipt)
            .ok_or_else(|| eyre!("transaction {hash} not found").into())
    }
}

#[derive(Debug, Default)]
pub struct MockPriceOracle {
    symbols: DashMap<String, Decimal>,
    tokens: DashMap<(ChainId, Address), Decimal>,
    lookups: AtomicUsize,
}

impl MockPriceOracle {
    pub fn with_symbol(self, symbol: &str, price: Decimal) -> Self {
        self.set_symbol(symbol, price);
        self
    }

    pub fn with_token(self, chain_id: ChainId, token: Address, price: Decimal) -> Self {
        self.tokens.insert((chain_id, token), price);
        self
    }

    pub fn set_symbol(&self, symbol: &str, price: Decimal) {
        self.symbols.insert(symbol.to_string(), price);
    }

    pub fn remove_symbol(&self, symbol: &str) {
        self.symbols.remove(symbol);
    }

    /// Number of upstream lookups served.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceOracle for MockPriceOracle {
    async fn usd_price(&self, symbol: &str) -> Option<Decimal> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.symbols.get(symbol).map(|price| *price)
    }

    async fn usd_price_by_address(&self, chain_id: ChainId, token: Address) -> Option<Decimal> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.tokens.get(&(chain_id, token)).map(|price| *price)
    }
}

/// A bridge charging 1 USD per deposit and nothing on exit.
#[derive(Debug, Default)]
pub struct MockBridge {
    routes: DashMap<ChainId, BridgeTokenMap>,
    fetches: AtomicUsize,
}

impl MockBridge {
    /// Lets `token` on `from_chain` be bridged to `to_chain`, arriving as `received`.
    pub fn with_route(
        self,
        from_chain: ChainId,
        token: Address,
        to_chain: ChainId,
        received: Address,
    ) -> Self {
        self.routes
            .entry(from_chain)
            .or_default()
            .entry(token)
            .or_default()
            .insert(to_chain, received);
        self
    }

    pub fn token_list_fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Bridge for MockBridge {
    fn id(&self) -> &'static str {
        "mock"
    }

    async fn supported_tokens(&self, chain_id: ChainId) -> eyre::Result<BridgeTokenMap> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.routes.get(&chain_id).map(|map| map.clone()).unwrap_or_default())
    }

    async fn deposit_cost(&self, _params: &DepositCostParams) -> eyre::Result<Decimal> {
        Ok(Decimal::ONE)
    }

    async fn exit_cost(&self, _params: &ExitCostParams) -> eyre::Result<U256> {
        Ok(U256::ZERO)
    }

    async fn spender(&self, _chain_id: ChainId) -> eyre::Result<Address> {
        Ok(BRIDGE_SPENDER)
    }

    async fn deposit(&self, params: &DepositParams) -> eyre::Result<TxRequest> {
        let tx = TxRequest::call(BRIDGE_SPENDER, Bytes::new());
        Ok(if params.token == NATIVE_ADDRESS_RELAYER { tx.with_value(params.amount) } else { tx })
    }
}

/// A swap aggregator quoting 1:1 at 150k gas.
#[derive(Debug, Default)]
pub struct MockSwapper {
    tokens: DashMap<ChainId, SwapTokenList>,
    failing_quotes: DashSet<(ChainId, Address)>,
    fetches: AtomicUsize,
}

impl MockSwapper {
    pub fn with_token(self, chain_id: ChainId, symbol: &str, token: Address) -> Self {
        self.tokens.entry(chain_id).or_default().insert(symbol.to_string(), token);
        self
    }

    /// Fails every quote selling `token` on `chain_id`.
    pub fn fail_quotes_from(&self, chain_id: ChainId, token: Address) {
        self.failing_quotes.insert((chain_id, token));
    }

    pub fn token_list_fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Swapper for MockSwapper {
    async fn supported_tokens(&self, chain_id: ChainId) -> eyre::Result<SwapTokenList> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.tokens.get(&chain_id).map(|list| list.clone()).unwrap_or_default())
    }

    async fn quote(&self, params: &SwapCostParams) -> eyre::Result<SwapQuote> {
        if self.failing_quotes.contains(&(params.chain_id, params.from_token)) {
            eyre::bail!("no liquidity for {}", params.from_token);
        }
        Ok(SwapQuote { to_amount: params.amount, estimated_gas: 150_000 })
    }

    async fn spender(&self, _chain_id: ChainId) -> eyre::Result<Address> {
        Ok(SWAP_SPENDER)
    }

    async fn swap(&self, params: &SwapParams) -> eyre::Result<TxRequest> {
        let tx = TxRequest::call(SWAP_SPENDER, Bytes::new());
        Ok(if params.from_token == NATIVE_ADDRESS_ROUTER {
            tx.with_value(params.amount)
        } else {
            tx
        })
    }
}

/// A recorder keeping the value of every counter registered through it.
///
/// Install it with [`metrics::with_local_recorder`] while the metrics struct is created.
#[derive(Debug, Default)]
pub struct MetricsRecorder {
    counters: DashMap<String, Arc<AtomicU64>>,
}

impl MetricsRecorder {
    /// Returns the value of the counter whose name ends with `name`.
    pub fn counter(&self, name: &str) -> u64 {
        self.counters
            .iter()
            .find(|entry| entry.key().ends_with(name))
            .map(|entry| entry.value().load(Ordering::SeqCst))
            .unwrap_or_default()
    }
}

impl Recorder for MetricsRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn describe_histogram(
        &self,
        _key: KeyName,
        _unit: Option<Unit>,
        _description: SharedString,
    ) {
    }

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        Counter::from_arc(self.counters.entry(key.name().to_string()).or_default().clone())
    }

    fn register_gauge(&self, _key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        Gauge::noop()
    }

    fn register_histogram(&self, _key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        Histogram::noop()
    }
}

/// A rebalance cycle that counts its invocations.
#[derive(Debug, Default)]
pub struct CountingRebalance {
    calls: AtomicUsize,
    fail: bool,
    delay: Option<Duration>,
}

impl CountingRebalance {
    pub fn failing() -> Self {
        Self { fail: true, ..Default::default() }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Rebalance for CountingRebalance {
    async fn rebalance(&self, _chain_id: ChainId, _mode: FeeMode) -> eyre::Result<RebalanceReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            eyre::bail!("balances unknown on every network");
        }
        Ok(RebalanceReport::default())
    }
}

/// Three funded networks wired to mock clients.
///
/// Ethereum holds 300 USD against a target of 1000, Polygon 800 against 200 and Optimism
/// exactly its target of 500. Polygon MATIC bridges to Ethereum as an ERC20 and Polygon WETH
/// bridges as native ETH. USDC cannot be bridged from Polygon to Ethereum.
#[derive(Debug)]
pub struct TestContext {
    pub config: Arc<FeeManagerConfig>,
    pub readers: BTreeMap<ChainId, Arc<MockChain>>,
    pub oracle: Arc<MockPriceOracle>,
    pub bridge: Arc<MockBridge>,
    pub swapper: Arc<MockSwapper>,
    pub storage: FeeStorage,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new(test_config())
    }
}

impl TestContext {
    pub fn new(config: FeeManagerConfig) -> Self {
        let ethereum = MockChain::default()
            .with_native_balance(U256::from(ETHER / 10))
            .with_token_balance(USDC, U256::from(100_000_000u64));
        let polygon = MockChain::default()
            .with_native_balance(U256::from(1000 * ETHER))
            .with_token_balance(USDC, U256::from(300_000_000u64))
            .with_token_balance(WETH, U256::from(ETHER / 2));
        let optimism = MockChain::default()
            .with_native_balance(U256::from(ETHER / 4))
            .with_token_balance(USDC, U256::ZERO);

        let oracle = MockPriceOracle::default()
            .with_symbol("ETH", Decimal::from(2000))
            .with_symbol("MATIC", Decimal::new(5, 1))
            .with_symbol("USDC", Decimal::ONE)
            .with_token(1, MATIC_ON_ETH, Decimal::new(5, 1))
            .with_token(1, WETH, Decimal::from(2000));

        let bridge = MockBridge::default()
            .with_route(137, WETH, 1, NATIVE_ADDRESS_RELAYER)
            .with_route(137, NATIVE_ADDRESS_RELAYER, 1, MATIC_ON_ETH)
            .with_route(1, USDC, 137, USDC);
        let swapper = MockSwapper::default()
            .with_token(137, "ETH", WETH)
            .with_token(137, "USDC", USDC)
            .with_token(1, "MATIC", MATIC_ON_ETH)
            .with_token(1, "USDC", USDC);

        Self {
            config: Arc::new(config),
            readers: BTreeMap::from([
                (1, Arc::new(ethereum)),
                (137, Arc::new(polygon)),
                (10, Arc::new(optimism)),
            ]),
            oracle: Arc::new(oracle),
            bridge: Arc::new(bridge),
            swapper: Arc::new(swapper),
            storage: FeeStorage::in_memory(),
        }
    }

    /// Returns the mock network of `chain_id`.
    pub fn chain(&self, chain_id: ChainId) -> &Arc<MockChain> {
        &self.readers[&chain_id]
    }

    pub fn chains(&self) -> Chains {
        Chains::new(self.readers.iter().map(|(chain_id, reader)| {
            (*chain_id, reader.clone() as Arc<dyn ChainReader>)
        }))
    }

    pub fn valuer(&self) -> CrossNetworkBalanceValuer {
        CrossNetworkBalanceValuer::new(
            BalanceAggregator::new(self.chains(), MFA, self.config.native_sentinels),
            self.oracle.clone(),
            self.config.clone(),
        )
    }

    pub fn tokens(&self) -> SupportedTokens {
        SupportedTokens::new(
            self.bridge.clone(),
            self.swapper.clone(),
            self.storage.cache().clone(),
            self.config.token_list_ttl,
        )
    }

    pub fn route_finder(&self) -> RouteFinder {
        RouteFinder::new(
            self.valuer(),
            self.tokens(),
            self.bridge.clone(),
            self.swapper.clone(),
            self.config.clone(),
            Arc::new(RebalanceMetrics::default()),
        )
    }

    pub fn executor(&self) -> RebalanceExecutor {
        RebalanceExecutor::new(
            self.route_finder(),
            self.chains(),
            self.bridge.clone(),
            self.swapper.clone(),
            self.config.clone(),
            Arc::new(RebalanceMetrics::default()),
        )
    }

    pub fn rebalancer(&self) -> Rebalancer {
        Rebalancer::new(
            self.valuer(),
            DeltaCalculator::from_config(&self.config),
            self.route_finder(),
            self.executor(),
            Arc::new(RebalanceMetrics::default()),
        )
    }

    pub fn fee_manager(&self) -> FeeManager {
        FeeManager::new(
            (*self.config).clone(),
            self.chains(),
            self.oracle.clone(),
            self.storage.clone(),
            self.bridge.clone(),
            self.swapper.clone(),
        )
        .unwrap()
    }
}

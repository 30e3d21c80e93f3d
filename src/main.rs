//! Arbitrum One MEV engine — entry point. Wires the RPC router, block bus,
//! market sentinel, quote engine, hunters, executor, and sinks together per
//! the single-threaded cooperative task layout: one RPC ranker, one block
//! bus publisher, one task per hunter class, one drainer per sink.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use anyhow::Result;
use futures::StreamExt;
use signal_hook_tokio::Signals;
use tracing::{info, warn, Level};

use arb_sentinel::arbitrage::{encode_swap_call, RouteCooldown, TwoLegHunter, TriLegHunter};
use arb_sentinel::bus::BlockBus;
use arb_sentinel::executor::{Executor, TxClass};
use arb_sentinel::filters::WhitelistFilter;
use arb_sentinel::graph::ArbGraph;
use arb_sentinel::liquidation::{LiquidationHunter, TargetList};
use arb_sentinel::quote::QuoteEngine;
use arb_sentinel::sentinel::MarketSentinel;
use arb_sentinel::sinks::{run_local_drainer, run_persistent_drainer, run_remote_drainer, EngineEvent, ExecutionStatus, LocalSink, PersistentSink, RemoteSink, SinkBus};
use arb_sentinel::types::ProtocolKind;
use arb_sentinel::{Config, RpcRouter};

const TWO_LEG_COOLDOWN_INITIAL: Duration = Duration::from_secs(600);
const TWO_LEG_COOLDOWN_MAX: Duration = Duration::from_secs(1800);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).with_target(false).json().init();

    let config = Config::load()?;
    info!("arb-sentinel starting, execution_enabled={}", config.execution_enabled());

    let router = RpcRouter::new(config.primary_rpc.clone(), config.fallback_rpcs.clone());
    let _ranker = router.spawn_ranker();

    let bus = Arc::new(BlockBus::new());
    let bus_task = {
        let bus = bus.clone();
        let router = router.clone();
        tokio::spawn(async move { bus.run(router, Duration::from_millis(config.block_poll_ms)).await })
    };

    let sink_bus = SinkBus::new();
    let local_drainer = {
        let sink_bus = sink_bus.clone();
        tokio::spawn(async move { run_local_drainer(&sink_bus, LocalSink::new()).await })
    };
    let remote_drainer = {
        let sink_bus = sink_bus.clone();
        let webhook = config.discord_webhook.clone();
        tokio::spawn(async move { run_remote_drainer(&sink_bus, RemoteSink::new(webhook)).await })
    };
    let persistent_drainer = {
        let sink_bus = sink_bus.clone();
        tokio::spawn(async move { run_persistent_drainer(&sink_bus, PersistentSink::new("data/events")).await })
    };

    let sentinel = Arc::new(MarketSentinel::new(config.sentinel_symbol.clone(), config.system_state_file.clone().into(), sink_bus.clone()));

    let graph = Arc::new(ArbGraph::arbitrum_default());
    let quotes = Arc::new(QuoteEngine::new(router.clone()));
    let whitelist = config
        .whitelist_file
        .as_ref()
        .and_then(|path| WhitelistFilter::load(path).ok())
        .map(Arc::new);
    if whitelist.is_none() {
        warn!("no whitelist file configured, quote engine will not gate venues");
    }

    let flashloan = U256::from(config.flashloan_usdc_amount);
    let two_leg = Arc::new(
        TwoLegHunter::new(flashloan, config.min_profit_usd, RouteCooldown::new(TWO_LEG_COOLDOWN_INITIAL, TWO_LEG_COOLDOWN_MAX))
            .with_whitelist(whitelist.clone()),
    );
    let tri_leg = Arc::new(
        TriLegHunter::new(flashloan, config.min_profit_usd_tri, RouteCooldown::new(TWO_LEG_COOLDOWN_INITIAL, TWO_LEG_COOLDOWN_MAX))
            .with_whitelist(whitelist.clone()),
    );

    let executor = Arc::new(Executor::new(router.clone(), config.private_key.as_deref())?);

    let mut targets = TargetList::new(config.targets_file.clone().unwrap_or_else(|| "targets.json".into()));
    targets.reload().await.ok();
    let liquidation_hunter = config.liquidator.map(|liquidator_addr| {
        Arc::new(tokio::sync::Mutex::new(LiquidationHunter::new(
            ProtocolKind::AaveV2,
            liquidator_addr,
            liquidator_addr,
            liquidator_addr,
            config.min_liquidation_debt_usd,
            targets,
        )))
    });

    let mut block_rx = bus.subscribe();
    let hunter_task = {
        let graph = graph.clone();
        let quotes = quotes.clone();
        let two_leg = two_leg.clone();
        let tri_leg = tri_leg.clone();
        let executor = executor.clone();
        let sentinel = sentinel.clone();
        let sink_bus = sink_bus.clone();
        let config = config.clone();
        tokio::spawn(async move {
            loop {
                let block_height = match block_rx.recv().await {
                    Ok(h) => h,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                };

                let should_scan = sentinel.should_scan().await;
                if !should_scan {
                    continue;
                }
                if let Err(e) = sentinel.update_last_price(block_height).await {
                    warn!("sentinel price update failed: {}", e);
                }

                if let Err(e) = run_two_leg_cycle(&graph, &quotes, &two_leg, &executor, &sink_bus, &config, block_height).await {
                    warn!("two-leg cycle failed: {}", e);
                }
                if let Err(e) = run_tri_leg_cycle(&graph, &quotes, &tri_leg, &executor, &sink_bus, &config, block_height).await {
                    warn!("tri-leg cycle failed: {}", e);
                }
            }
        })
    };

    let liquidation_task = liquidation_hunter.map(|hunter| {
        let router = router.clone();
        let executor = executor.clone();
        let sink_bus = sink_bus.clone();
        let mut block_rx = bus.subscribe();
        tokio::spawn(async move {
            loop {
                let block_height = match block_rx.recv().await {
                    Ok(h) => h,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                };
                if let Err(e) = run_liquidation_cycle(&hunter, &router, &executor, &sink_bus, block_height).await {
                    warn!("liquidation cycle failed: {}", e);
                }
            }
        })
    });

    let mut signals = Signals::new([signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM])?;
    let shutdown = tokio::spawn(async move {
        signals.next().await;
        info!("shutdown signal received");
    });

    tokio::select! {
        _ = shutdown => {}
        _ = bus_task => {}
        _ = hunter_task => {}
    }

    local_drainer.abort();
    remote_drainer.abort();
    persistent_drainer.abort();
    if let Some(task) = liquidation_task {
        task.abort();
    }

    info!("arb-sentinel shut down");
    Ok(())
}

async fn run_two_leg_cycle(
    graph: &ArbGraph,
    quotes: &QuoteEngine,
    hunter: &TwoLegHunter,
    executor: &Executor,
    sink_bus: &SinkBus,
    config: &Config,
    block_height: u64,
) -> Result<()> {
    let gas_price_wei = 10_000_000u64;
    let opportunities = hunter.scan_once(graph, quotes, config.eth_price_usd, gas_price_wei).await?;
    for opp in &opportunities {
        sink_bus.publish(hunter.spread_event(opp, block_height));
    }
    let Some(best) = opportunities.iter().find(|o| hunter.is_dispatchable(o)) else {
        return Ok(());
    };
    if !executor.execution_enabled() {
        return Ok(());
    }

    let Some(executor_addr) = config.two_leg_executor else {
        return Ok(());
    };
    let Some(target) = graph.token_by_symbol(&best.target_symbol) else {
        return Ok(());
    };
    let Some(buy_venue) = graph.venue_by_name(&best.buy_venue) else {
        return Ok(());
    };
    let Some(sell_venue) = graph.venue_by_name(&best.sell_venue) else {
        return Ok(());
    };
    let deadline = deadline_from_now();
    let Some((router_a, calldata_a)) = encode_swap_call(
        buy_venue, graph.usdc.address, target.address, best.buy_fee, executor_addr, deadline, hunter.flashloan_usdc, best.leg_a_min_out(),
    ) else {
        return Ok(());
    };
    let Some((router_b, calldata_b)) = encode_swap_call(
        sell_venue, target.address, graph.usdc.address, best.sell_fee, executor_addr, deadline, best.leg_a_out, best.leg_b_min_out(hunter.flashloan_usdc),
    ) else {
        return Ok(());
    };
    let params = arb_sentinel::executor::encode_two_leg_params(router_a, calldata_a, router_b, calldata_b, graph.usdc.address);
    let (to, calldata) = arb_sentinel::executor::build_two_leg_call(executor_addr, graph.usdc.address, hunter.flashloan_usdc, params);

    if executor.simulate(to, &calldata).await.is_err() {
        hunter.record_failure(&best.fingerprint());
        sink_bus.publish(EngineEvent::Error { block_height, route: Some(best.fingerprint()), message: "simulation reverted".into() });
        return Ok(());
    }
    let outcome = match executor.broadcast(to, calldata, TxClass::TwoLeg).await {
        Ok(outcome) => outcome,
        Err(e) => {
            hunter.record_failure(&best.fingerprint());
            return Err(e.into());
        }
    };
    match outcome.status {
        ExecutionStatus::Confirmed => hunter.record_success(&best.fingerprint()),
        _ => hunter.record_failure(&best.fingerprint()),
    }
    sink_bus.publish(executor.execution_event(&outcome, block_height, best.fingerprint(), best.net_usd));
    Ok(())
}

async fn run_tri_leg_cycle(
    graph: &ArbGraph,
    quotes: &QuoteEngine,
    hunter: &TriLegHunter,
    executor: &Executor,
    sink_bus: &SinkBus,
    config: &Config,
    block_height: u64,
) -> Result<()> {
    let gas_price_wei = 10_000_000u64;
    let opportunities = hunter.scan_once(graph, quotes, config.eth_price_usd, gas_price_wei).await?;
    for opp in &opportunities {
        sink_bus.publish(hunter.spread_event(opp, block_height));
    }
    let Some(best) = hunter.select_best(&opportunities) else {
        return Ok(());
    };
    if !executor.execution_enabled() {
        return Ok(());
    }
    let Some(executor_addr) = config.tri_leg_executor else {
        return Ok(());
    };
    let Some(routes) = build_tri_leg_routes(graph, best, executor_addr, hunter.flashloan_usdc) else {
        return Ok(());
    };
    let (to, calldata) = arb_sentinel::executor::build_tri_leg_call(executor_addr, graph.usdc.address, hunter.flashloan_usdc, routes);
    if executor.simulate(to, &calldata).await.is_err() {
        hunter.record_failure(&best.fingerprint());
        sink_bus.publish(EngineEvent::Error { block_height, route: Some(best.fingerprint()), message: "simulation reverted".into() });
        return Ok(());
    }
    let outcome = match executor.broadcast(to, calldata, TxClass::TriLeg).await {
        Ok(outcome) => outcome,
        Err(e) => {
            hunter.record_failure(&best.fingerprint());
            return Err(e.into());
        }
    };
    match outcome.status {
        ExecutionStatus::Confirmed => hunter.record_success(&best.fingerprint()),
        _ => hunter.record_failure(&best.fingerprint()),
    }
    sink_bus.publish(executor.execution_event(&outcome, block_height, best.fingerprint(), best.net_usd));
    Ok(())
}

async fn run_liquidation_cycle(
    hunter: &tokio::sync::Mutex<LiquidationHunter>,
    router: &RpcRouter,
    executor: &Executor,
    sink_bus: &SinkBus,
    block_height: u64,
) -> Result<()> {
    let multicall: Address = arb_sentinel::contracts::MULTICALL3_ADDRESS.parse()?;
    let mut hunter = hunter.lock().await;
    hunter.targets.reload().await.ok();

    let sniper_hits = hunter.sniper_pass(router, multicall, 50_000_000).await?;
    let scout_hits = hunter.scout_pass(router, multicall, 50_000_000, block_height).await?;
    hunter.targets.apply_scout_results(&scout_hits);

    // Reserve prices are fetched by a separate data collaborator in a full
    // deployment; a single USDC reserve keeps the candidate path exercised
    // without requiring that pipeline here.
    let usdc: Address = arb_sentinel::graph::USDC_ADDRESS.parse()?;
    let reserves = vec![(usdc, 1.0f64)];

    let opportunities = hunter.analyze_candidates(router, &sniper_hits, &reserves).await?;
    for opp in &opportunities {
        sink_bus.publish(hunter.execution_event(opp, block_height, opp.debt_value_usd));
    }
    let Some(best) = opportunities.first() else {
        return Ok(());
    };
    if !executor.execution_enabled() {
        return Ok(());
    }
    let executor_addr = hunter.lending_pool;
    let (to, calldata) = arb_sentinel::executor::build_liquidation_call(
        executor_addr,
        best.user,
        best.debt_asset,
        best.collateral_asset,
        best.debt_amount,
        best.fee,
        best.amount_out_minimum,
        best.sqrt_price_limit_x96,
    );
    if executor.simulate(to, &calldata).await.is_err() {
        sink_bus.publish(EngineEvent::Error { block_height, route: Some(best.fingerprint()), message: "simulation reverted".into() });
        return Ok(());
    }
    let outcome = executor.broadcast(to, calldata, TxClass::Liquidation).await?;
    sink_bus.publish(executor.execution_event(&outcome, block_height, best.fingerprint(), best.debt_value_usd));
    Ok(())
}

fn deadline_from_now() -> U256 {
    let now = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
    arb_sentinel::arbitrage::calldata::deadline_from_unix_secs(now, 120)
}

/// Assemble the three legs of a tri-leg route for the flash-loan callback:
/// `USDC -> sym1 -> sym2 -> USDC`, with a 99.5% slippage floor on the first
/// two legs and a flashloan-plus-fee floor on the repayment leg.
fn build_tri_leg_routes(
    graph: &ArbGraph,
    opp: &arb_sentinel::arbitrage::tri_leg::TriLegOpportunity,
    executor_addr: Address,
    flashloan: U256,
) -> Option<Vec<arb_sentinel::contracts::ITriLegArbExecutor::Route>> {
    let token1 = graph.token_by_symbol(&opp.sym1)?;
    let token2 = graph.token_by_symbol(&opp.sym2)?;
    let venue1 = graph.venue_by_name(&opp.dex1)?;
    let venue2 = graph.venue_by_name(&opp.dex2)?;
    let venue3 = graph.venue_by_name(&opp.dex3)?;
    let deadline = deadline_from_now();

    let leg1_min_out = opp.leg1_out * U256::from(995u64) / U256::from(1000u64);
    let leg2_min_out = opp.leg2_out * U256::from(995u64) / U256::from(1000u64);
    let repay_min_out = flashloan + flashloan * U256::from(arb_sentinel::arbitrage::FLASHLOAN_FEE_BPS) / U256::from(10_000u64);

    let (router1, payload1) = encode_swap_call(venue1, graph.usdc.address, token1.address, opp.fee1, executor_addr, deadline, flashloan, leg1_min_out)?;
    let (router2, payload2) = encode_swap_call(venue2, token1.address, token2.address, opp.fee2, executor_addr, deadline, opp.leg1_out, leg2_min_out)?;
    let (router3, payload3) = encode_swap_call(venue3, token2.address, graph.usdc.address, opp.fee3, executor_addr, deadline, opp.leg2_out, repay_min_out)?;

    Some(vec![
        arb_sentinel::contracts::ITriLegArbExecutor::Route { router: router1, tokenIn: graph.usdc.address, payload: payload1 },
        arb_sentinel::contracts::ITriLegArbExecutor::Route { router: router2, tokenIn: token1.address, payload: payload2 },
        arb_sentinel::contracts::ITriLegArbExecutor::Route { router: router3, tokenIn: token2.address, payload: payload3 },
    ])
}

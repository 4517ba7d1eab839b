use crate::engine::WorkTogetherEngine;
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use worktogether_fees::{FixedRateRouter, SwapRoute, SwapRouter};
use worktogether_ledger::TokenLedger;
use worktogether_pool::PoolStatus;
use worktogether_types::{AccountAddress, ChainClock, Role, TokenAmount};

/// Fee amount swapped by the optional fee round, in FEE units.
const SIMULATED_FEES: u64 = 5;
/// FEE to REWARD rate quoted by the simulated router.
const SIMULATED_RATE: u64 = 20;

#[derive(Debug, Clone, Serialize)]
pub struct EntrantReport {
    pub account: String,
    pub bounty: u64,
    pub weight: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub pool_address: String,
    pub pool_status: PoolStatus,
    pub entrants: Vec<EntrantReport>,
    pub total_weight: u64,
    pub request_id: u32,
    pub target_block: u64,
    pub winner: String,
    pub reward_paid: u64,
    pub winner_reward_balance: u64,
    pub escrow_remaining: u64,
    pub dividends_distributed: u64,
    pub final_block: u64,
    pub events_emitted: u64,
}

/// Run one full round: contributors earn stake by resolving issues, stake it
/// in a fresh pool, and one of them wins `reward`. When `with_fees` is set, a
/// batch of fees is also swapped into the reward token for the dividend pool.
pub async fn run_simulation(
    engine: &WorkTogetherEngine,
    entrants: u64,
    reward: TokenAmount,
    with_fees: bool,
) -> Result<SimulationReport> {
    if entrants == 0 {
        bail!("a simulation needs at least one entrant");
    }
    let admin = engine.admin;
    let first_issue = engine.issues.issue_count().await as u64 + 1;

    let mut contributors = Vec::new();
    for i in 0..entrants {
        let contributor = AccountAddress::derive("contributor", i);
        let issue_id = first_issue + i;
        let bounty = TokenAmount::from_units(10 * (i + 1));

        engine.issues.register_issue(admin, issue_id, bounty).await?;
        engine
            .issues
            .claim_resolve_issue(contributor, issue_id, format!("fix #{}", issue_id))
            .await?;
        engine
            .issues
            .select_issue_resolver(admin, issue_id, contributor)
            .await?;
        engine.issues.release_bounty(admin, issue_id).await?;
        contributors.push((contributor, bounty));
    }

    let pool = engine.create_pool("simulation", None).await?;
    let mut entrant_reports = Vec::new();
    for (contributor, bounty) in &contributors {
        let balance = engine.stake_token.balance_of(*contributor).await?;
        let weight = engine.enter_pool(&pool, *contributor, balance).await?;
        entrant_reports.push(EntrantReport {
            account: contributor.to_string(),
            bounty: bounty.units(),
            weight: weight.units(),
        });
    }
    engine.fund_pool(&pool, reward).await?;

    engine.chain.advance_time(pool.window().duration).await;
    let ticket = pool.request_random_number(admin).await?;
    engine
        .chain
        .advance_blocks(engine.config.randomness.reveal_delay_blocks)
        .await;
    let (winner, reward_paid) = pool
        .distribute_reward(admin)
        .await
        .context("distributing the pool reward")?;

    let dividends_distributed = if with_fees {
        run_fee_round(engine).await?
    } else {
        TokenAmount::ZERO
    };

    let report = SimulationReport {
        pool_address: pool.address().to_hex(),
        pool_status: pool.status().await,
        entrants: entrant_reports,
        total_weight: pool.total_weight().await.units(),
        request_id: ticket.request_id,
        target_block: ticket.target_block,
        winner: winner.to_string(),
        reward_paid: reward_paid.units(),
        winner_reward_balance: engine.reward_token.balance_of(winner).await?.units(),
        escrow_remaining: engine.issues.total_escrowed().await.units(),
        dividends_distributed: dividends_distributed.units(),
        final_block: engine.chain.block_number().await,
        events_emitted: engine.events.total_events_emitted(),
    };

    info!(
        pool = %pool.address(),
        winner = %winner,
        reward = reward_paid.units(),
        entrants = entrants,
        "🎬 Simulation finished"
    );
    Ok(report)
}

/// Collect some FEE at the fee manager and swap it along a registered route
/// to a fixed-rate router. Returns the running total paid to the dividend pool.
async fn run_fee_round(engine: &WorkTogetherEngine) -> Result<TokenAmount> {
    let admin = engine.admin;
    let amount = TokenAmount::from_units(SIMULATED_FEES);
    let router_address = AccountAddress::derive("router", 0);

    let router = Arc::new(FixedRateRouter::new(
        router_address,
        engine.reward_token.clone(),
        SIMULATED_RATE,
        1,
    ));
    let inventory = router
        .quote(amount)
        .context("router quote overflows")?;

    engine.roles.grant_role(Role::Executor, admin).await;
    engine.roles.grant_role(Role::RouterAllowlist, router_address).await;
    engine.fees.register_router(admin, router.clone()).await?;

    engine
        .reward_token
        .mint(admin, router.address(), inventory)
        .await?;
    engine
        .fee_token
        .mint(admin, engine.fees.address(), amount)
        .await?;

    engine
        .routes
        .insert(
            engine.fee_token.address(),
            engine.reward_token.address(),
            SwapRoute {
                target: router_address,
                payload: b"simulated-route".to_vec(),
            },
        )
        .await;
    engine
        .swap_fees(admin, engine.fee_token.clone(), amount)
        .await?
        .context("no swap route for the fee token")?;

    Ok(engine
        .dividends
        .total_distributed(engine.reward_token.address())
        .await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NodeConfig;

    #[tokio::test]
    async fn test_zero_entrants_rejected() {
        let engine = WorkTogetherEngine::new(NodeConfig::default(), AccountAddress::derive("admin", 0))
            .await
            .unwrap();
        let err = run_simulation(&engine, 0, TokenAmount::from_units(1), false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("at least one entrant"));
        assert_eq!(engine.issues.issue_count().await, 0);
    }
}

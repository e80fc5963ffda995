use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::sync::Arc;

use crate::errors::MonitorError;
use crate::processors::valuation::{lamports_to_sol, Valuation};
use crate::processors::{AccountInfoLookup, EventHandler, RawEvent, TokenBalanceEntry, TokenLookup};

/// 联合曲线账户及其 SOL 储备
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BondingCurveInfo {
    pub address: Pubkey,
    pub lamports: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValuationReport {
    pub signature: String,
    pub slot: u64,
    pub mint: Pubkey,
    pub bonding_curve: Pubkey,
    pub pool_sol: f64,
    pub pool_token_balance: f64,
    pub current_supply: f64,
    pub valuation: Valuation,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoTokenBalances,
    NoBondingCurve,
    DegenerateValuation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Enrichment {
    Valued(ValuationReport),
    Skipped(SkipReason),
}

pub struct EnrichmentPipeline {
    accounts: Arc<dyn AccountInfoLookup>,
    tokens: Arc<dyn TokenLookup>,
    program_id: Pubkey,
    sol_price_usd: f64,
}

impl EnrichmentPipeline {
    pub fn new(
        accounts: Arc<dyn AccountInfoLookup>,
        tokens: Arc<dyn TokenLookup>,
        program_id: Pubkey,
        sol_price_usd: f64,
    ) -> Self {
        Self {
            accounts,
            tokens,
            program_id,
            sol_price_usd,
        }
    }

    pub async fn enrich(&self, event: &RawEvent) -> Result<Enrichment, MonitorError> {
        let Some(first_mint) = event.first_mint() else {
            return Ok(Enrichment::Skipped(SkipReason::NoTokenBalances));
        };

        let Some(curve) = self.resolve_bonding_curve(&event.post_token_balances).await? else {
            return Ok(Enrichment::Skipped(SkipReason::NoBondingCurve));
        };

        let mint = parse_pubkey(first_mint, "mint")?;
        let (current_supply, pool_token_balance) = tokio::try_join!(
            self.tokens.token_supply(&mint),
            self.tokens.token_balance(&curve.address, &mint),
        )?;

        let pool_sol = lamports_to_sol(curve.lamports);
        let Some(valuation) = Valuation::compute(pool_sol, pool_token_balance, current_supply, self.sol_price_usd) else {
            return Ok(Enrichment::Skipped(SkipReason::DegenerateValuation));
        };

        Ok(Enrichment::Valued(ValuationReport {
            signature: event.signature.clone(),
            slot: event.slot,
            mint,
            bonding_curve: curve.address,
            pool_sol,
            pool_token_balance,
            current_supply,
            valuation,
            observed_at: Utc::now(),
        }))
    }

    /// First balance owner (in entry order) whose account belongs to the program.
    pub async fn resolve_bonding_curve(
        &self,
        balances: &[TokenBalanceEntry],
    ) -> Result<Option<BondingCurveInfo>, MonitorError> {
        let mut checked: Vec<&str> = Vec::with_capacity(balances.len());

        for entry in balances {
            let owner = entry.owner.as_str();
            if owner.is_empty() || checked.contains(&owner) {
                continue;
            }
            checked.push(owner);

            let address = parse_pubkey(owner, "owner")?;
            if let Some(account) = self.accounts.account_info(&address).await? {
                if account.owner == self.program_id {
                    return Ok(Some(BondingCurveInfo {
                        address,
                        lamports: account.lamports,
                    }));
                }
            }
        }

        Ok(None)
    }
}

#[async_trait]
impl EventHandler for EnrichmentPipeline {
    async fn handle(&self, event: RawEvent) -> Result<(), MonitorError> {
        match self.enrich(&event).await? {
            Enrichment::Valued(report) => log_report(&report),
            Enrichment::Skipped(reason) => {
                debug!("Skipped {} (slot {}): {:?}", event.signature, event.slot, reason);
            }
        }
        Ok(())
    }
}

fn log_report(report: &ValuationReport) {
    info!("🔔 Latest Pool | slot {} | {}", report.slot, report.signature);
    info!("   Ca : {}", report.mint);
    info!("   Bonding Curve Address : {}", report.bonding_curve);
    info!("   Pool Value SOL : {:.2} SOL", report.pool_sol);
    info!("   Pool Value : {}", report.pool_token_balance);
    info!("   Price : ${}", report.valuation.price);
    info!("   MarketCap : {}", report.valuation.market_proxy);
    info!("   Current Supply : {}", report.current_supply);
}

fn parse_pubkey(value: &str, field: &str) -> Result<Pubkey, MonitorError> {
    Pubkey::from_str(value)
        .map_err(|e| MonitorError::Enrichment(format!("invalid {} '{}': {}", field, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constant::accounts::PUMPFUN;
    use crate::processors::AccountSnapshot;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockChain {
        accounts: HashMap<Pubkey, AccountSnapshot>,
        supply: f64,
        pool_balance: f64,
        lookups: Mutex<Vec<Pubkey>>,
        fail_supply: bool,
    }

    #[async_trait]
    impl AccountInfoLookup for MockChain {
        async fn account_info(&self, address: &Pubkey) -> Result<Option<AccountSnapshot>, MonitorError> {
            self.lookups.lock().unwrap().push(*address);
            Ok(self.accounts.get(address).copied())
        }
    }

    #[async_trait]
    impl TokenLookup for MockChain {
        async fn token_supply(&self, _mint: &Pubkey) -> Result<f64, MonitorError> {
            if self.fail_supply {
                return Err(MonitorError::rpc("getTokenSupply", "boom"));
            }
            Ok(self.supply)
        }

        async fn token_balance(&self, _owner: &Pubkey, _mint: &Pubkey) -> Result<f64, MonitorError> {
            Ok(self.pool_balance)
        }
    }

    fn entry(mint: &Pubkey, owner: &Pubkey) -> TokenBalanceEntry {
        TokenBalanceEntry {
            mint: mint.to_string(),
            owner: owner.to_string(),
        }
    }

    fn pipeline(chain: MockChain) -> (Arc<MockChain>, EnrichmentPipeline) {
        let chain = Arc::new(chain);
        let pipeline = EnrichmentPipeline::new(chain.clone(), chain.clone(), PUMPFUN, 134.7);
        (chain, pipeline)
    }

    fn event(balances: Vec<TokenBalanceEntry>) -> RawEvent {
        RawEvent {
            signature: "sig".to_string(),
            slot: 99,
            post_token_balances: balances,
        }
    }

    #[tokio::test]
    async fn test_first_matching_owner_wins() {
        let mint = Pubkey::new_unique();
        let first_curve = Pubkey::new_unique();
        let wallet = Pubkey::new_unique();
        let second_curve = Pubkey::new_unique();

        let mut chain = MockChain::default();
        chain.accounts.insert(first_curve, AccountSnapshot { owner: PUMPFUN, lamports: 1 });
        chain.accounts.insert(wallet, AccountSnapshot { owner: Pubkey::default(), lamports: 5 });
        chain.accounts.insert(second_curve, AccountSnapshot { owner: PUMPFUN, lamports: 2 });
        let (chain, pipeline) = pipeline(chain);

        let balances = vec![entry(&mint, &first_curve), entry(&mint, &wallet), entry(&mint, &second_curve)];
        let curve = pipeline.resolve_bonding_curve(&balances).await.unwrap().unwrap();

        assert_eq!(curve, BondingCurveInfo { address: first_curve, lamports: 1 });
        // 命中后立即停止扫描
        assert_eq!(*chain.lookups.lock().unwrap(), vec![first_curve]);
    }

    #[tokio::test]
    async fn test_scan_skips_non_program_and_missing_accounts() {
        let mint = Pubkey::new_unique();
        let missing = Pubkey::new_unique();
        let wallet = Pubkey::new_unique();
        let curve = Pubkey::new_unique();

        let mut chain = MockChain::default();
        chain.accounts.insert(wallet, AccountSnapshot { owner: Pubkey::default(), lamports: 5 });
        chain.accounts.insert(curve, AccountSnapshot { owner: PUMPFUN, lamports: 7 });
        let (chain, pipeline) = pipeline(chain);

        let balances = vec![
            entry(&mint, &missing),
            entry(&mint, &wallet),
            entry(&mint, &wallet),
            entry(&mint, &curve),
        ];
        let resolved = pipeline.resolve_bonding_curve(&balances).await.unwrap().unwrap();

        assert_eq!(resolved.address, curve);
        assert_eq!(*chain.lookups.lock().unwrap(), vec![missing, wallet, curve]);
    }

    #[tokio::test]
    async fn test_enrich_computes_reference_valuation() {
        let mint = Pubkey::new_unique();
        let curve = Pubkey::new_unique();

        let mut chain = MockChain::default();
        chain.accounts.insert(curve, AccountSnapshot { owner: PUMPFUN, lamports: 10_000_000_000 });
        chain.supply = 1000.0;
        chain.pool_balance = 500.0;
        let (_, pipeline) = pipeline(chain);

        let result = pipeline.enrich(&event(vec![entry(&mint, &curve)])).await.unwrap();
        let Enrichment::Valued(report) = result else {
            panic!("expected a valuation, got {:?}", result);
        };

        assert_eq!(report.mint, mint);
        assert_eq!(report.bonding_curve, curve);
        assert_eq!(report.slot, 99);
        assert!((report.pool_sol - 10.0).abs() < 1e-12);
        assert!((report.valuation.price - 5.388).abs() < 1e-9);
        assert!((report.valuation.market_proxy - 5388.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_mint_comes_from_first_entry() {
        let first_mint = Pubkey::new_unique();
        let other_mint = Pubkey::new_unique();
        let wallet = Pubkey::new_unique();
        let curve = Pubkey::new_unique();

        let mut chain = MockChain::default();
        chain.accounts.insert(curve, AccountSnapshot { owner: PUMPFUN, lamports: 10_000_000_000 });
        chain.supply = 1000.0;
        chain.pool_balance = 500.0;
        let (_, pipeline) = pipeline(chain);

        let balances = vec![entry(&first_mint, &wallet), entry(&other_mint, &curve)];
        let Enrichment::Valued(report) = pipeline.enrich(&event(balances)).await.unwrap() else {
            panic!("expected a valuation");
        };

        assert_eq!(report.mint, first_mint);
        assert_eq!(report.bonding_curve, curve);
    }

    #[tokio::test]
    async fn test_empty_balances_are_skipped() {
        let (chain, pipeline) = pipeline(MockChain::default());
        let result = pipeline.enrich(&event(vec![])).await.unwrap();

        assert_eq!(result, Enrichment::Skipped(SkipReason::NoTokenBalances));
        assert!(chain.lookups.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_bonding_curve_suppresses_event() {
        let mint = Pubkey::new_unique();
        let wallet = Pubkey::new_unique();
        let mut chain = MockChain::default();
        chain.accounts.insert(wallet, AccountSnapshot { owner: Pubkey::default(), lamports: 5 });
        let (_, pipeline) = pipeline(chain);

        let result = pipeline.enrich(&event(vec![entry(&mint, &wallet)])).await.unwrap();
        assert_eq!(result, Enrichment::Skipped(SkipReason::NoBondingCurve));
    }

    #[tokio::test]
    async fn test_empty_pool_is_degenerate() {
        let mint = Pubkey::new_unique();
        let curve = Pubkey::new_unique();
        let mut chain = MockChain::default();
        chain.accounts.insert(curve, AccountSnapshot { owner: PUMPFUN, lamports: 10_000_000_000 });
        chain.supply = 1000.0;
        chain.pool_balance = 0.0;
        let (_, pipeline) = pipeline(chain);

        let result = pipeline.enrich(&event(vec![entry(&mint, &curve)])).await.unwrap();
        assert_eq!(result, Enrichment::Skipped(SkipReason::DegenerateValuation));
    }

    #[tokio::test]
    async fn test_lookup_failure_is_an_error() {
        let mint = Pubkey::new_unique();
        let curve = Pubkey::new_unique();
        let mut chain = MockChain::default();
        chain.accounts.insert(curve, AccountSnapshot { owner: PUMPFUN, lamports: 1 });
        chain.fail_supply = true;
        let (_, pipeline) = pipeline(chain);

        let err = pipeline.enrich(&event(vec![entry(&mint, &curve)])).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(pipeline.handle(event(vec![entry(&mint, &curve)])).await.is_err());
    }

    #[tokio::test]
    async fn test_malformed_owner_is_an_error() {
        let mint = Pubkey::new_unique();
        let (_, pipeline) = pipeline(MockChain::default());
        let balances = vec![TokenBalanceEntry {
            mint: mint.to_string(),
            owner: "not-base58!".to_string(),
        }];

        let result = pipeline.enrich(&event(balances)).await;
        assert!(matches!(result, Err(MonitorError::Enrichment(_))));
    }
}

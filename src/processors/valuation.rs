use serde::{Deserialize, Serialize};

use crate::constant::valuation::LAMPORTS_PER_SOL;

/// 由联合曲线储备推算出的价格
///
/// `market_proxy` 只是一个估值参考，并不是真实市值。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    pub sol_value_usd: f64,
    pub tokens_sold: f64,
    pub price_per_token: f64,
    pub pool_token_value_usd: f64,
    pub price: f64,
    pub market_proxy: f64,
}

impl Valuation {
    /// Returns `None` when any output is NaN or infinite, e.g. when the pool
    /// holds no tokens or nothing has been sold yet.
    pub fn compute(
        sol_balance: f64,
        pool_token_balance: f64,
        current_supply: f64,
        sol_price_usd: f64,
    ) -> Option<Self> {
        let sol_value_usd = sol_balance * sol_price_usd;
        let tokens_sold = current_supply - pool_token_balance;
        let price_per_token = sol_value_usd / tokens_sold;
        let pool_token_value_usd = price_per_token * current_supply;
        let price = pool_token_value_usd / pool_token_balance;
        let market_proxy = price * current_supply;

        let valuation = Self {
            sol_value_usd,
            tokens_sold,
            price_per_token,
            pool_token_value_usd,
            price,
            market_proxy,
        };

        valuation.is_finite().then_some(valuation)
    }

    fn is_finite(&self) -> bool {
        [
            self.sol_value_usd,
            self.tokens_sold,
            self.price_per_token,
            self.pool_token_value_usd,
            self.price,
            self.market_proxy,
        ]
        .iter()
        .all(|value| value.is_finite())
    }
}

pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL
}

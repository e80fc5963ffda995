pub mod accounts {
    use solana_sdk::pubkey::Pubkey;

    pub const PUMPFUN: Pubkey = Pubkey::from_str_const("6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P");
}

pub mod valuation {
    /// SOL/USD 快照价格（默认值，可通过配置覆盖）
    pub const DEFAULT_SOL_PRICE_USD: f64 = 134.7;

    pub const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;
}

pub mod stream {
    /// 交易过滤器名称
    pub const DEFAULT_FILTER_NAME: &str = "pumpfun";

    pub const DEFAULT_ACTIVE_TOKENS_QUERY: &str = "SELECT contractaddress FROM tokens WHERE active = true;";
}

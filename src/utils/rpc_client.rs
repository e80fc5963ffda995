use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use log::{debug, info};
use serde_json::{json, Value};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::time::Duration;

use crate::config::RpcConfig;
use crate::errors::MonitorError;
use crate::processors::{AccountInfoLookup, AccountSnapshot, TokenLookup};

/// Shyft JSON-RPC 客户端 - 查询账户信息、代币流通量和代币余额
pub struct ShyftRpcClient {
    rpc_endpoint: String,
    api_key: String,
    client: reqwest::Client,
    request_timeout: Duration,
    max_retry_elapsed: Duration,
}

impl ShyftRpcClient {
    pub fn new(rpc_endpoint: String, api_key: String, config: &RpcConfig) -> Result<Self, MonitorError> {
        let request_timeout = Duration::from_millis(config.request_timeout_ms);
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| MonitorError::Configuration(format!("Failed to build RPC HTTP client: {}", e)))?;

        Ok(Self {
            rpc_endpoint,
            api_key,
            client,
            request_timeout,
            max_retry_elapsed: Duration::from_millis(config.max_retry_elapsed_ms),
        })
    }

    /// 发送 JSON-RPC 请求，网络错误和 5xx/429 会在限定时间内按指数退避重试
    pub async fn make_rpc_request(&self, method: &str, params: Value) -> Result<Value, MonitorError> {
        let request_body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params
        });
        debug!("📡 发送RPC请求: {}", request_body);

        let url_with_key = format!("{}?api_key={}", self.rpc_endpoint, self.api_key);
        let policy = ExponentialBackoff {
            max_elapsed_time: Some(self.max_retry_elapsed),
            ..Default::default()
        };

        let client = &self.client;
        let request_timeout = self.request_timeout;
        let url = url_with_key.as_str();
        let body = &request_body;

        let response = retry(policy, || async move {
            let response = client
                .post(url)
                .header("Content-Type", "application/json")
                .json(body)
                .send()
                .await
                .map_err(|e| retry_class(http_error(e, request_timeout)))?;

            let status = response.status();
            let response_text = response.text().await
                .map_err(|e| retry_class(http_error(e, request_timeout)))?;
            debug!("📡 RPC响应状态: {}", status);

            if status.is_server_error() || status.as_u16() == 429 {
                return Err(backoff::Error::transient(MonitorError::rpc(
                    method,
                    format!("{} - {}", status, response_text),
                )));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(MonitorError::rpc(
                    method,
                    format!("{} - {}", status, response_text),
                )));
            }

            serde_json::from_str::<Value>(&response_text)
                .map_err(|e| backoff::Error::permanent(MonitorError::from(e)))
        })
        .await?;

        if let Some(error) = response.get("error") {
            return Err(MonitorError::rpc(method, error.to_string()));
        }

        response
            .get("result")
            .cloned()
            .ok_or_else(|| MonitorError::rpc(method, "missing result"))
    }
}

fn http_error(err: reqwest::Error, request_timeout: Duration) -> MonitorError {
    if err.is_timeout() {
        MonitorError::Timeout {
            timeout_ms: request_timeout.as_millis() as u64,
        }
    } else {
        MonitorError::from(err)
    }
}

fn retry_class(err: MonitorError) -> backoff::Error<MonitorError> {
    if err.is_retryable() {
        backoff::Error::transient(err)
    } else {
        backoff::Error::permanent(err)
    }
}

#[async_trait]
impl AccountInfoLookup for ShyftRpcClient {
    async fn account_info(&self, address: &Pubkey) -> Result<Option<AccountSnapshot>, MonitorError> {
        // 只需要 owner 和 lamports，不拉取账户数据
        let result = self
            .make_rpc_request(
                "getAccountInfo",
                json!([
                    address.to_string(),
                    {
                        "encoding": "base64",
                        "dataSlice": { "offset": 0, "length": 0 },
                        "commitment": "confirmed"
                    }
                ]),
            )
            .await?;

        parse_account_info(&result)
    }
}

#[async_trait]
impl TokenLookup for ShyftRpcClient {
    async fn token_supply(&self, mint: &Pubkey) -> Result<f64, MonitorError> {
        let result = self
            .make_rpc_request("getTokenSupply", json!([mint.to_string()]))
            .await?;

        let supply = result
            .get("value")
            .and_then(parse_ui_amount)
            .ok_or_else(|| MonitorError::rpc("getTokenSupply", format!("unexpected response: {}", result)))?;
        debug!("代币流通量: {} = {}", mint, supply);
        Ok(supply)
    }

    async fn token_balance(&self, owner: &Pubkey, mint: &Pubkey) -> Result<f64, MonitorError> {
        let result = self
            .make_rpc_request(
                "getTokenAccountsByOwner",
                json!([
                    owner.to_string(),
                    { "mint": mint.to_string() },
                    { "encoding": "jsonParsed" }
                ]),
            )
            .await?;

        let balance = parse_token_accounts_balance(&result);
        if balance.is_none() {
            info!("ℹ️ 未找到代币账户或余额为0: 所有者={}, 代币={}", owner, mint);
        }
        Ok(balance.unwrap_or(0.0))
    }
}

fn parse_account_info(result: &Value) -> Result<Option<AccountSnapshot>, MonitorError> {
    let value = match result.get("value") {
        Some(value) if !value.is_null() => value,
        _ => return Ok(None),
    };

    let owner = value
        .get("owner")
        .and_then(|o| o.as_str())
        .ok_or_else(|| MonitorError::rpc("getAccountInfo", "missing owner"))?;
    let owner = Pubkey::from_str(owner)
        .map_err(|e| MonitorError::rpc("getAccountInfo", format!("invalid owner '{}': {}", owner, e)))?;
    let lamports = value
        .get("lamports")
        .and_then(|l| l.as_u64())
        .ok_or_else(|| MonitorError::rpc("getAccountInfo", "missing lamports"))?;

    Ok(Some(AccountSnapshot { owner, lamports }))
}

fn parse_token_accounts_balance(result: &Value) -> Option<f64> {
    result
        .get("value")?
        .as_array()?
        .first()?
        .get("account")
        .and_then(|a| a.get("data"))
        .and_then(|d| d.get("parsed"))
        .and_then(|p| p.get("info"))
        .and_then(|i| i.get("tokenAmount"))
        .and_then(parse_ui_amount)
}

/// Reads a token amount object, preferring the exact `uiAmountString`.
fn parse_ui_amount(amount: &Value) -> Option<f64> {
    if let Some(ui) = amount.get("uiAmountString").and_then(|a| a.as_str()) {
        if let Ok(parsed) = ui.parse::<f64>() {
            return Some(parsed);
        }
    }

    if let Some(ui) = amount.get("uiAmount").and_then(|a| a.as_f64()) {
        return Some(ui);
    }

    let raw = amount.get("amount")?.as_str()?.parse::<u64>().ok()?;
    let decimals = amount.get("decimals")?.as_u64()?;
    Some(raw as f64 / 10f64.powi(decimals as i32))
}

use crate::config::Credentials;
use crate::models::{OrderSide, PriceType};
use crate::Result;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

/// Client for a Noren-style trading API (Shoonya and compatible brokers)
///
/// Every endpoint takes a form body of `jData=<json>` with the session
/// token appended as `jKey=<token>` once a session is active.
#[derive(Clone)]
pub struct NorenClient {
    client: Client,
    base_url: String,
    session: Option<Session>,
}

#[derive(Clone)]
struct Session {
    user_id: String,
    token: String,
}

// ============== Response Types ==============

#[derive(Debug, Deserialize)]
struct LoginResponse {
    stat: String,
    #[serde(default)]
    susertoken: Option<String>,
    #[serde(default)]
    emsg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchScripResponse {
    stat: String,
    #[serde(default)]
    values: Vec<ScripEntryRaw>,
    #[serde(default)]
    emsg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScripEntryRaw {
    tsym: String,
    token: String,
}

/// One row of the minute-bar time-price series, as the vendor sends it:
/// numerics are strings, rows arrive newest first
#[derive(Debug, Clone, Deserialize)]
pub struct TimePriceRow {
    pub stat: String,
    pub time: String,
    #[serde(default, rename = "into")]
    pub open: Option<String>,
    #[serde(default, rename = "inth")]
    pub high: Option<String>,
    #[serde(default, rename = "intl")]
    pub low: Option<String>,
    #[serde(default, rename = "intc")]
    pub close: Option<String>,
    #[serde(default, rename = "intv")]
    pub volume: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TpSeriesResponse {
    Rows(Vec<TimePriceRow>),
    Failure {
        stat: String,
        #[serde(default)]
        emsg: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct PlaceOrderResponse {
    stat: String,
    #[serde(default)]
    norenordno: Option<String>,
    #[serde(default)]
    emsg: Option<String>,
}

// ============== Public Types ==============

/// A scrip search hit
#[derive(Debug, Clone, PartialEq)]
pub struct ScripMatch {
    pub tsym: String,
    pub token: String,
}

impl From<ScripEntryRaw> for ScripMatch {
    fn from(raw: ScripEntryRaw) -> Self {
        ScripMatch {
            tsym: raw.tsym,
            token: raw.token,
        }
    }
}

/// Parameters for order placement
///
/// Product type `M`, retention `DAY` and zero disclosed quantity are fixed
/// for every order this client places.
#[derive(Debug, Clone)]
pub struct OrderParams {
    pub side: OrderSide,
    pub exchange: String,
    pub symbol: String,
    pub quantity: u32,
    pub price_type: PriceType,
    pub trigger_price: Option<f64>,
    pub remarks: String,
}

// ============== Implementation ==============

impl NorenClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            session: None,
        }
    }

    /// Authenticate and return the session token (`susertoken`)
    ///
    /// The second factor in `creds` is the current one-time value; this
    /// client never generates it.
    pub async fn login(&self, creds: &Credentials) -> Result<String> {
        let jdata = json!({
            "apkversion": "1.0.0",
            "uid": creds.user,
            "pwd": creds.password,
            "factor2": creds.factor2,
            "vc": creds.vendor_code,
            "appkey": creds.api_key,
            "imei": creds.imei,
            "source": "API",
        });

        let response: LoginResponse = self.post("QuickAuth", &jdata, false).await?;

        if response.stat != "Ok" {
            return Err(format!(
                "login rejected: {}",
                response.emsg.unwrap_or_else(|| "no error message".to_string())
            )
            .into());
        }

        match response.susertoken {
            Some(token) => Ok(token),
            None => Err("login response missing session token".into()),
        }
    }

    /// Install the session used for all subsequent authenticated calls
    pub fn set_session(&mut self, user_id: &str, token: &str) {
        self.session = Some(Session {
            user_id: user_id.to_string(),
            token: token.to_string(),
        });
    }

    /// Search for scrips matching `text` on `exchange`
    pub async fn search_scrip(&self, exchange: &str, text: &str) -> Result<Vec<ScripMatch>> {
        let session = self.session()?;
        let jdata = json!({
            "uid": session.user_id,
            "exch": exchange,
            "stext": text,
        });

        let response: SearchScripResponse = self.post("SearchScrip", &jdata, true).await?;

        if response.stat != "Ok" {
            return Err(format!(
                "scrip search failed: {}",
                response.emsg.unwrap_or_else(|| "no error message".to_string())
            )
            .into());
        }

        Ok(response.values.into_iter().map(ScripMatch::from).collect())
    }

    /// Resolve a trading symbol to its instrument token
    ///
    /// Only an exact `tsym` match counts; `None` means the symbol is not
    /// tradable on this exchange.
    pub async fn resolve_token(&self, exchange: &str, symbol: &str) -> Result<Option<String>> {
        let matches = self.search_scrip(exchange, symbol).await?;
        Ok(matches
            .into_iter()
            .find(|m| m.tsym == symbol)
            .map(|m| m.token))
    }

    /// Fetch the minute-bar series for `token` between two epoch timestamps
    ///
    /// Rows come back in the vendor's newest-first order; chronological
    /// reordering is the caller's job.
    pub async fn get_time_price_series(
        &self,
        exchange: &str,
        token: &str,
        start_secs: i64,
        end_secs: i64,
        interval_minutes: u32,
    ) -> Result<Vec<TimePriceRow>> {
        let session = self.session()?;
        let jdata = json!({
            "uid": session.user_id,
            "exch": exchange,
            "token": token,
            "st": start_secs.to_string(),
            "et": end_secs.to_string(),
            "intrv": interval_minutes.to_string(),
        });

        let response: TpSeriesResponse = self.post("TPSeries", &jdata, true).await?;

        match response {
            TpSeriesResponse::Rows(rows) => Ok(rows),
            TpSeriesResponse::Failure { stat, emsg } => Err(format!(
                "time-price series failed ({}): {}",
                stat,
                emsg.unwrap_or_else(|| "no error message".to_string())
            )
            .into()),
        }
    }

    /// Place an order and return the broker's order number
    pub async fn place_order(&self, order: &OrderParams) -> Result<String> {
        let session = self.session()?;
        let mut jdata = json!({
            "uid": session.user_id,
            "actid": session.user_id,
            "exch": order.exchange,
            "tsym": order.symbol,
            "qty": order.quantity.to_string(),
            "dscqty": "0",
            "prd": "M",
            "trantype": order.side.code(),
            "prctyp": order.price_type.code(),
            "prc": "0",
            "ret": "DAY",
            "remarks": order.remarks,
        });
        if let Some(trigger) = order.trigger_price {
            jdata["trgprc"] = json!(format!("{:.2}", trigger));
        }

        let response: PlaceOrderResponse = self.post("PlaceOrder", &jdata, true).await?;

        if response.stat != "Ok" {
            return Err(format!(
                "order rejected: {}",
                response.emsg.unwrap_or_else(|| "no error message".to_string())
            )
            .into());
        }

        match response.norenordno {
            Some(order_no) => Ok(order_no),
            None => Err("order response missing order number".into()),
        }
    }

    fn session(&self) -> Result<&Session> {
        match self.session.as_ref() {
            Some(session) => Ok(session),
            None => Err("no active session; call set_session first".into()),
        }
    }

    async fn post<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        jdata: &serde_json::Value,
        with_key: bool,
    ) -> Result<T> {
        let mut body = format!("jData={}", jdata);
        if with_key {
            let session = self.session()?;
            body.push_str("&jKey=");
            body.push_str(&session.token);
        }

        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self.client.post(&url).body(body).send().await?;

        if !response.status().is_success() {
            return Err(format!("broker API error: {}", response.status()).into());
        }

        Ok(response.json::<T>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn test_credentials() -> Credentials {
        Credentials {
            user: "FA0001".to_string(),
            password: "secret".to_string(),
            factor2: "123456".to_string(),
            vendor_code: "FA0001_U".to_string(),
            api_key: "key".to_string(),
            imei: "abc1234".to_string(),
        }
    }

    fn client_with_session(base_url: &str) -> NorenClient {
        let mut client = NorenClient::new(base_url);
        client.set_session("FA0001", "sessiontoken");
        client
    }

    #[tokio::test]
    async fn test_login_returns_session_token() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/QuickAuth")
            .match_body(Matcher::Regex("jData=".to_string()))
            .with_body(r#"{"stat":"Ok","susertoken":"abc123"}"#)
            .create_async()
            .await;

        let client = NorenClient::new(server.url());
        let token = client.login(&test_credentials()).await.unwrap();
        assert_eq!(token, "abc123");
    }

    #[tokio::test]
    async fn test_login_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/QuickAuth")
            .with_body(r#"{"stat":"Not_Ok","emsg":"Invalid credentials"}"#)
            .create_async()
            .await;

        let client = NorenClient::new(server.url());
        let result = client.login(&test_credentials()).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid credentials"));
    }

    #[tokio::test]
    async fn test_resolve_token_exact_match_only() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/SearchScrip")
            .match_body(Matcher::Regex("jKey=sessiontoken".to_string()))
            .with_body(
                r#"{"stat":"Ok","values":[
                    {"tsym":"RELIANCE-BE","token":"9997"},
                    {"tsym":"RELIANCE-EQ","token":"2885"}
                ]}"#,
            )
            .create_async()
            .await;

        let client = client_with_session(&server.url());
        let token = client.resolve_token("NSE", "RELIANCE-EQ").await.unwrap();
        assert_eq!(token, Some("2885".to_string()));
    }

    #[tokio::test]
    async fn test_resolve_token_no_match() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/SearchScrip")
            .with_body(r#"{"stat":"Ok","values":[{"tsym":"RELIANCE-BE","token":"9997"}]}"#)
            .create_async()
            .await;

        let client = client_with_session(&server.url());
        let token = client.resolve_token("NSE", "RELIANCE-EQ").await.unwrap();
        assert_eq!(token, None);
    }

    #[tokio::test]
    async fn test_time_price_series_parses_rows() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/TPSeries")
            .with_body(
                r#"[
                    {"stat":"Ok","time":"02-08-2024 09:16:00","into":"101.0","inth":"102.0","intl":"100.5","intc":"101.5","intv":"1200"},
                    {"stat":"Ok","time":"02-08-2024 09:15:00","into":"100.0","inth":"101.0","intl":"99.5","intc":"100.5","intv":"900"}
                ]"#,
            )
            .create_async()
            .await;

        let client = client_with_session(&server.url());
        let rows = client
            .get_time_price_series("NSE", "2885", 1722569100, 1722569220, 1)
            .await
            .unwrap();

        // Vendor order preserved: newest first
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].time, "02-08-2024 09:16:00");
        assert_eq!(rows[1].close.as_deref(), Some("100.5"));
    }

    #[tokio::test]
    async fn test_time_price_series_failure_object() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/TPSeries")
            .with_body(r#"{"stat":"Not_Ok","emsg":"Session Expired"}"#)
            .create_async()
            .await;

        let client = client_with_session(&server.url());
        let result = client
            .get_time_price_series("NSE", "2885", 0, 1, 1)
            .await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Session Expired"));
    }

    #[tokio::test]
    async fn test_place_stoploss_order_includes_trigger() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/PlaceOrder")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("SL-MKT".to_string()),
                Matcher::Regex(r#""trgprc":"105\.00""#.to_string()),
                Matcher::Regex(r#""trantype":"B""#.to_string()),
            ]))
            .with_body(r#"{"stat":"Ok","norenordno":"24080200001"}"#)
            .create_async()
            .await;

        let client = client_with_session(&server.url());
        let order_no = client
            .place_order(&OrderParams {
                side: OrderSide::Buy,
                exchange: "NSE".to_string(),
                symbol: "RELIANCE-EQ".to_string(),
                quantity: 5,
                price_type: PriceType::StopLossMarket,
                trigger_price: Some(105.0),
                remarks: "protective stop".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(order_no, "24080200001");
    }

    #[tokio::test]
    async fn test_place_order_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/PlaceOrder")
            .with_body(r#"{"stat":"Not_Ok","emsg":"Insufficient margin"}"#)
            .create_async()
            .await;

        let client = client_with_session(&server.url());
        let result = client
            .place_order(&OrderParams {
                side: OrderSide::Sell,
                exchange: "NSE".to_string(),
                symbol: "RELIANCE-EQ".to_string(),
                quantity: 5,
                price_type: PriceType::Market,
                trigger_price: None,
                remarks: "trend sell".to_string(),
            })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_authenticated_call_without_session() {
        let client = NorenClient::new("http://localhost:1");
        let result = client.search_scrip("NSE", "RELIANCE-EQ").await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("no active session"));
    }
}

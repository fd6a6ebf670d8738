//! Huobi spot adapter
//!
//! ```text
//! REST  /v1/common/symbols ─► contract events + name map
//!       /v1/account/accounts ─► spot account id ─► balance ─► account events
//!       /v1/order/openOrders ─► registry
//!       /v1/order/orders/place, /submitcancel
//! WS    market (gzip)  depth + detail ─► TickBook ─► tick events ─► BarAggregator
//!       trade  (gzip)  auth ─► orders.{symbol} ─► registry.apply_update
//! ```

mod mapping;
mod market;
mod sign;
mod trade;

pub use mapping::{
    OpenOrder, check_error, order_type_from_huobi, order_type_to_huobi, status_from_huobi,
};
pub use sign::{HuobiSigner, split_url};

use async_trait::async_trait;
use chrono::Utc;
use flate2::read::GzDecoder;
use meridian_core::{
    CancelRequest, CanonicalSymbol, Exchange, LocalOrderId, OrderRequest, OrderStatus, Tick,
};
use meridian_event::{EVENT_TIMER, Event, Handler, handler};
use meridian_order_manager::{OrderIdentityRegistry, OrderUpdate};
use meridian_transport::{
    Connector, Frame, StreamingTransport, TransportError, WsConnector, decode_json,
};
use parking_lot::{Mutex, RwLock};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::config::GatewayConfig;
use crate::context::GatewayContext;
use crate::error::{GatewayError, RestError};
use crate::gateway::Gateway;
use crate::rest::{HttpRestClient, RestRequest, RestTransport};
use market::MarketStream;
use trade::TradeStream;

/// Binary frames are gzip-compressed JSON; text frames are plain JSON
pub(crate) fn decode_frame(frame: &Frame) -> Result<Option<Value>, TransportError> {
    match frame {
        Frame::Binary(bytes) => {
            let mut text = String::new();
            GzDecoder::new(bytes.as_slice())
                .read_to_string(&mut text)
                .map_err(|e| TransportError::Decode(format!("gzip: {e}")))?;
            Ok(Some(serde_json::from_str(&text)?))
        }
        other => decode_json(other),
    }
}

struct Inner {
    config: GatewayConfig,
    ctx: GatewayContext,
    rest: Arc<dyn RestTransport>,
    registry: Arc<OrderIdentityRegistry>,
    names: Arc<RwLock<HashMap<String, String>>>,
    market: Arc<MarketStream>,
    trade: Arc<TradeStream>,
    market_ws: StreamingTransport,
    trade_ws: StreamingTransport,
    account_id: RwLock<Option<String>>,
    timer: Mutex<Option<Handler>>,
    /// Runtime `connect` ran on; timer callbacks spawn REST polls onto it
    runtime: Mutex<Option<Handle>>,
    timer_ticks: AtomicU32,
    contracts_loaded: AtomicBool,
    open_orders_loaded: AtomicBool,
    /// A startup query failed; retried on the account poll cadence
    startup_pending: AtomicBool,
    closed: AtomicBool,
}

/// Gateway for Huobi spot
#[derive(Clone)]
pub struct HuobiGateway {
    inner: Arc<Inner>,
}

impl HuobiGateway {
    /// Production wiring: reqwest REST client and tungstenite streams
    pub fn new(
        config: GatewayConfig,
        engine: Arc<meridian_event::EventEngine>,
    ) -> Result<Self, GatewayError> {
        let signer = HuobiSigner::for_url(&config.api_key, &config.api_secret, &config.rest_url)?;
        let rest = HttpRestClient::new(
            config.rest_url.clone(),
            Arc::new(signer),
            config.request_timeout(),
        )?;
        let market = WsConnector::new(config.market_ws_url.clone());
        let trade = WsConnector::new(config.trade_ws_url.clone());
        Self::with_parts(config, engine, Arc::new(rest), Arc::new(market), Arc::new(trade))
    }

    /// Wiring with injected REST and stream connectors
    pub fn with_parts(
        config: GatewayConfig,
        engine: Arc<meridian_event::EventEngine>,
        rest: Arc<dyn RestTransport>,
        market_connector: Arc<dyn Connector>,
        trade_connector: Arc<dyn Connector>,
    ) -> Result<Self, GatewayError> {
        let ctx = GatewayContext::new(config.name.clone(), engine);
        let registry = Arc::new(OrderIdentityRegistry::with_policy(
            config.name.clone(),
            Arc::new(ctx.clone()),
            config.orphan_policy(),
        ));
        let names = Arc::new(RwLock::new(HashMap::new()));

        let (host, path) = split_url(&config.trade_ws_url)?;
        let signer = HuobiSigner::new(&config.api_key, &config.api_secret, host.clone());
        let market = Arc::new(MarketStream::new(ctx.clone(), Arc::clone(&names)));
        let trade = Arc::new(TradeStream::new(
            ctx.clone(),
            Arc::clone(&registry),
            signer,
            host,
            path,
        ));

        let transport_config = config.transport_config();
        let market_ws = StreamingTransport::new(
            format!("{}-market", config.name),
            market_connector,
            market.clone(),
            transport_config.clone(),
        );
        let trade_ws = StreamingTransport::new(
            format!("{}-trade", config.name),
            trade_connector,
            trade.clone(),
            transport_config,
        );

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                ctx,
                rest,
                registry,
                names,
                market,
                trade,
                market_ws,
                trade_ws,
                account_id: RwLock::new(None),
                timer: Mutex::new(None),
                runtime: Mutex::new(None),
                timer_ticks: AtomicU32::new(0),
                contracts_loaded: AtomicBool::new(false),
                open_orders_loaded: AtomicBool::new(false),
                startup_pending: AtomicBool::new(false),
                closed: AtomicBool::new(false),
            }),
        })
    }

    pub fn registry(&self) -> &Arc<OrderIdentityRegistry> {
        &self.inner.registry
    }

    pub fn account_id(&self) -> Option<String> {
        self.inner.account_id.read().clone()
    }

    /// Display name learned from the contract query
    pub fn contract_name(&self, symbol: &str) -> Option<String> {
        self.inner.names.read().get(symbol).cloned()
    }

    /// Current working tick for `symbol`
    pub fn tick(&self, symbol: &str) -> Option<Tick> {
        self.inner.market.tick(symbol)
    }

    pub fn market_transport(&self) -> &StreamingTransport {
        &self.inner.market_ws
    }

    pub fn trade_transport(&self) -> &StreamingTransport {
        &self.inner.trade_ws
    }

    fn ensure_open(&self) -> Result<(), GatewayError> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(GatewayError::Shutdown);
        }
        Ok(())
    }

    fn own_symbol<'a>(&self, symbol: &'a CanonicalSymbol) -> Result<&'a str, GatewayError> {
        if symbol.exchange() != Exchange::Huobi {
            return Err(GatewayError::ForeignSymbol {
                symbol: symbol.to_string(),
                gateway: self.inner.config.name.clone(),
            });
        }
        Ok(symbol.symbol())
    }

    async fn call(&self, request: RestRequest) -> Result<Value, RestError> {
        let response = self.inner.rest.request(request).await?;
        check_error(response)
    }

    pub async fn query_contracts(&self) -> Result<usize, GatewayError> {
        let response = self.call(RestRequest::get("/v1/common/symbols")).await?;
        let contracts = mapping::parse_contracts(&response, &self.inner.config.name)
            .map_err(RestError::from)?;
        let count = contracts.len();
        {
            let mut names = self.inner.names.write();
            for contract in &contracts {
                names.insert(contract.symbol.clone(), contract.name.clone());
            }
        }
        for contract in contracts {
            self.inner.ctx.on_contract(contract);
        }
        self.inner.ctx.write_log(format!("Loaded {count} contracts"));
        Ok(count)
    }

    async fn query_account_id(&self) -> Result<Option<String>, GatewayError> {
        let response = self.call(RestRequest::get("/v1/account/accounts")).await?;
        let account_id = mapping::parse_spot_account_id(&response).map_err(RestError::from)?;
        if let Some(id) = &account_id {
            self.inner.ctx.write_log(format!("Spot account {id}"));
        }
        *self.inner.account_id.write() = account_id.clone();
        Ok(account_id)
    }

    async fn query_balances(&self, account_id: &str) -> Result<(), GatewayError> {
        let path = format!("/v1/account/accounts/{account_id}/balance");
        let response = self.call(RestRequest::get(path)).await?;
        let accounts = mapping::parse_balances(&response, &self.inner.config.name)
            .map_err(RestError::from)?;
        for account in accounts {
            self.inner.ctx.on_account(account);
        }
        Ok(())
    }

    pub async fn query_open_orders(&self) -> Result<usize, GatewayError> {
        let response = self.call(RestRequest::get("/v1/order/openOrders")).await?;
        let orders = mapping::parse_open_orders(&response).map_err(RestError::from)?;
        let count = orders.len();
        for open in orders {
            let local_id = self.inner.registry.local_id_for_exchange(&open.exchange_id);
            self.inner
                .registry
                .on_order(open.into_order(local_id, &self.inner.config.name));
        }
        self.inner.ctx.write_log(format!("Loaded {count} open orders"));
        Ok(count)
    }

    async fn place_order(&self, local_id: LocalOrderId, request: OrderRequest) {
        let inner = &self.inner;
        let account_id = inner.account_id.read().clone().unwrap_or_default();
        let body = json!({
            "account-id": account_id,
            "amount": request.volume.to_string(),
            "symbol": request.symbol.symbol(),
            "type": order_type_to_huobi(request.direction, request.order_type),
            "price": request.price.to_string(),
            "source": "api",
        });

        let placed = match self.call(RestRequest::post("/v1/order/orders/place", body)).await {
            Ok(response) => mapping::parse_placed_order_id(&response).map_err(RestError::from),
            Err(e) => Err(e),
        };

        match placed {
            Ok(exchange_id) => {
                if let Err(e) = inner.registry.bind_exchange_id(&local_id, &exchange_id) {
                    inner.ctx.write_warning(format!("Cannot bind {local_id} to {exchange_id}: {e}"));
                    return;
                }
                let acknowledged = OrderUpdate::new().status(OrderStatus::NotTraded);
                if let Err(e) = inner.registry.update_local(&local_id, acknowledged) {
                    warn!(%local_id, error = %e, "Acknowledgement not applied");
                }
            }
            Err(e) => {
                let reason = e.to_string();
                if let Err(e) = inner.registry.reject(&local_id, &reason) {
                    warn!(%local_id, error = %e, "Reject not applied");
                }
                inner.ctx.write_warning(format!("Order {local_id} rejected: {reason}"));
            }
        }
    }

    fn on_timer(&self) {
        let inner = &self.inner;
        inner.registry.evict_orphans(Utc::now());

        let ticks = inner.timer_ticks.fetch_add(1, Ordering::SeqCst) + 1;
        if ticks < inner.config.account_poll_ticks {
            return;
        }
        inner.timer_ticks.store(0, Ordering::SeqCst);

        let gateway = self.clone();
        let retry_startup = inner.startup_pending.swap(false, Ordering::SeqCst);
        if let Some(runtime) = self.runtime() {
            runtime.spawn(async move {
                if retry_startup {
                    gateway.load_startup_state().await;
                } else if let Err(e) = gateway.query_account().await {
                    debug!(gateway = %gateway.inner.config.name, error = %e, "Account poll failed");
                }
            });
        }
    }

    /// Contracts, account and open orders. Failures are reported as log
    /// events and leave the load pending for the next timer poll; parts
    /// already loaded are not queried again.
    async fn load_startup_state(&self) -> bool {
        let inner = &self.inner;
        let mut complete = true;

        if !inner.contracts_loaded.load(Ordering::SeqCst) {
            match self.query_contracts().await {
                Ok(_) => inner.contracts_loaded.store(true, Ordering::SeqCst),
                Err(e) => {
                    inner.ctx.write_warning(format!("Contract query failed: {e}"));
                    complete = false;
                }
            }
        }

        match self.query_account_id().await {
            Ok(Some(account_id)) => {
                if let Err(e) = self.query_balances(&account_id).await {
                    inner.ctx.write_warning(format!("Balance query failed: {e}"));
                    complete = false;
                }
            }
            Ok(None) => inner.ctx.write_warning("No spot account found"),
            Err(e) => {
                inner.ctx.write_warning(format!("Account query failed: {e}"));
                complete = false;
            }
        }

        if !inner.open_orders_loaded.load(Ordering::SeqCst) {
            match self.query_open_orders().await {
                Ok(_) => inner.open_orders_loaded.store(true, Ordering::SeqCst),
                Err(e) => {
                    inner.ctx.write_warning(format!("Open order query failed: {e}"));
                    complete = false;
                }
            }
        }

        if !complete {
            inner.startup_pending.store(true, Ordering::SeqCst);
        }
        complete
    }

    fn runtime(&self) -> Option<Handle> {
        self.inner.runtime.lock().clone()
    }

    fn register_timer(&self) {
        let mut slot = self.inner.timer.lock();
        if slot.is_some() {
            return;
        }
        let weak = Arc::downgrade(&self.inner);
        let timer = handler(move |_event: &Event| {
            if let Some(inner) = weak.upgrade() {
                HuobiGateway { inner }.on_timer();
            }
        });
        self.inner.ctx.engine().register(EVENT_TIMER, Arc::clone(&timer));
        *slot = Some(timer);
    }
}

#[async_trait]
impl Gateway for HuobiGateway {
    fn name(&self) -> &str {
        &self.inner.config.name
    }

    fn exchange(&self) -> Exchange {
        Exchange::Huobi
    }

    async fn connect(&self) -> Result<(), GatewayError> {
        self.ensure_open()?;
        *self.inner.runtime.lock() = Some(Handle::current());
        info!(gateway = %self.inner.config.name, rest = %self.inner.config.rest_url, "Connecting");

        if !self.load_startup_state().await {
            warn!(gateway = %self.inner.config.name, "Startup queries incomplete, retrying on timer");
        }

        self.inner.market_ws.start()?;
        self.inner.trade_ws.start()?;
        self.register_timer();
        Ok(())
    }

    async fn subscribe_ticks(&self, symbol: &CanonicalSymbol) -> Result<(), GatewayError> {
        self.subscribe_symbol(symbol, false).await
    }

    async fn subscribe_bars(&self, symbol: &CanonicalSymbol) -> Result<(), GatewayError> {
        self.subscribe_symbol(symbol, true).await
    }

    async fn send_order(&self, request: &OrderRequest) -> Result<LocalOrderId, GatewayError> {
        self.ensure_open()?;
        self.own_symbol(&request.symbol)?;

        let inner = &self.inner;
        let local_id = inner.registry.new_local_id();
        let order = request.create_order(local_id.clone(), inner.config.name.clone(), Utc::now());
        inner.registry.on_order(order);

        let gateway = self.clone();
        let request = request.clone();
        let id = local_id.clone();
        tokio::spawn(async move { gateway.place_order(id, request).await });
        Ok(local_id)
    }

    async fn cancel_order(&self, request: &CancelRequest) -> Result<(), GatewayError> {
        self.ensure_open()?;
        let inner = &self.inner;
        let order = inner.registry.require(&request.local_id)?;
        let exchange_id = order
            .exchange_id
            .ok_or_else(|| GatewayError::NotAcknowledged(request.local_id.clone()))?;

        let path = format!("/v1/order/orders/{exchange_id}/submitcancel");
        match self.call(RestRequest::post(path, json!({}))).await {
            Ok(_) => {
                inner.registry.update_local(
                    &request.local_id,
                    OrderUpdate::new().status(OrderStatus::Cancelled),
                )?;
                inner.ctx.write_log(format!("Order {} cancelled", request.local_id));
                Ok(())
            }
            Err(e) => {
                inner
                    .ctx
                    .write_warning(format!("Cancel of {} failed: {e}", request.local_id));
                Err(e.into())
            }
        }
    }

    async fn query_account(&self) -> Result<(), GatewayError> {
        self.ensure_open()?;
        let account_id = match self.account_id() {
            Some(id) => id,
            None => self
                .query_account_id()
                .await?
                .ok_or(GatewayError::NotConnected)?,
        };
        self.query_balances(&account_id).await
    }

    async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let timer = self.inner.timer.lock().take();
        if let Some(timer) = timer {
            self.inner.ctx.engine().unregister(EVENT_TIMER, &timer);
        }
        self.inner.market_ws.stop().await;
        self.inner.trade_ws.stop().await;
        info!(gateway = %self.inner.config.name, "Gateway closed");
    }
}

impl HuobiGateway {
    async fn subscribe_symbol(&self, symbol: &CanonicalSymbol, bars: bool) -> Result<(), GatewayError> {
        self.ensure_open()?;
        let symbol = self.own_symbol(symbol)?;
        let inner = &self.inner;

        if inner.market.track(symbol, bars) {
            let sender = inner.market_ws.sender();
            if sender.is_connected() {
                for request in inner.market.subscriptions(symbol) {
                    sender.send_json(&request).await?;
                }
            }
        }
        if inner.trade.track(symbol) && inner.trade.is_authenticated() {
            inner
                .trade_ws
                .sender()
                .send_json(&inner.trade.subscription(symbol))
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    #[test]
    fn test_decode_gzip_frame() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(br#"{"ping": 1709285400000}"#).unwrap();
        let bytes = encoder.finish().unwrap();

        let value = decode_frame(&Frame::Binary(bytes)).unwrap().unwrap();
        assert_eq!(value["ping"], 1709285400000i64);
    }

    #[test]
    fn test_decode_plain_text_and_garbage() {
        let value = decode_frame(&Frame::Text(r#"{"op":"ping","ts":1}"#.into()))
            .unwrap()
            .unwrap();
        assert_eq!(value["op"], "ping");

        let err = decode_frame(&Frame::Binary(b"not gzip".to_vec())).unwrap_err();
        assert!(matches!(err, TransportError::Decode(_)));
    }
}

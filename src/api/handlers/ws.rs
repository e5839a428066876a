// src/api/handlers/ws.rs
//! Live run state over websocket.
//!
//! A client may subscribe to one session, either with `?session_id=` on
//! connect or by sending `{"session_id": "..."}` later. Unsubscribed clients
//! see every run.

use actix::{Actor, Addr, AsyncContext, Handler, Message, StreamHandler};
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::pipeline::RunState;

/// A state change of one run.
#[derive(Message, Clone, Debug, Serialize)]
#[rtype(result = "()")]
pub struct RunUpdate {
    pub run_id: String,
    pub session_id: String,
    pub state: RunState,
}

impl RunUpdate {
    /// Whether a client subscribed to `subscription` should receive this.
    /// A subscription names either a session or a single run.
    pub fn is_visible_to(&self, subscription: Option<&str>) -> bool {
        match subscription {
            None => true,
            Some(key) => key == self.session_id || key == self.run_id,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Subscription {
    #[serde(default)]
    pub session_id: Option<String>,
}

struct Subscriber {
    addr: Addr<WsConnection>,
    session: Option<String>,
}

#[derive(Clone, Default)]
pub struct WsBroker {
    subscribers: Arc<RwLock<Vec<Subscriber>>>,
}

impl WsBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `addr`, or moves it to `session` if already registered.
    pub async fn subscribe(&self, addr: Addr<WsConnection>, session: Option<String>) {
        let mut subscribers = self.subscribers.write().await;
        match subscribers.iter_mut().find(|s| s.addr == addr) {
            Some(existing) => existing.session = session,
            None => subscribers.push(Subscriber { addr, session }),
        }
    }

    pub async fn unregister(&self, addr: &Addr<WsConnection>) {
        self.subscribers.write().await.retain(|s| &s.addr != addr);
    }

    pub async fn client_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    /// Sends `update` to every subscriber it is visible to. Returns how many
    /// clients it went to.
    pub async fn broadcast(&self, update: RunUpdate) -> usize {
        let subscribers = self.subscribers.read().await;
        let mut delivered = 0;
        for subscriber in subscribers
            .iter()
            .filter(|s| update.is_visible_to(s.session.as_deref()))
        {
            subscriber.addr.do_send(update.clone());
            delivered += 1;
        }
        delivered
    }
}

pub struct WsConnection {
    broker: WsBroker,
    session: Option<String>,
}

impl WsConnection {
    pub fn new(broker: WsBroker, session: Option<String>) -> Self {
        Self { broker, session }
    }

    fn resubscribe(&self, ctx: &mut ws::WebsocketContext<Self>) {
        let addr = ctx.address();
        let broker = self.broker.clone();
        let session = self.session.clone();
        actix::spawn(async move {
            broker.subscribe(addr, session).await;
        });
    }
}

impl Actor for WsConnection {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.resubscribe(ctx);
    }

    fn stopped(&mut self, ctx: &mut Self::Context) {
        let addr = ctx.address();
        let broker = self.broker.clone();
        actix::spawn(async move {
            broker.unregister(&addr).await;
        });
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsConnection {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => ctx.pong(&msg),
            Ok(ws::Message::Text(text)) => match serde_json::from_str::<Subscription>(&text) {
                Ok(subscription) => {
                    self.session = subscription.session_id.filter(|s| !s.is_empty());
                    self.resubscribe(ctx);
                }
                Err(e) => debug!("Ignoring websocket message: {}", e),
            },
            Ok(ws::Message::Close(reason)) => ctx.close(reason),
            _ => (),
        }
    }
}

impl Handler<RunUpdate> for WsConnection {
    type Result = ();

    fn handle(&mut self, msg: RunUpdate, ctx: &mut Self::Context) {
        if let Ok(json) = serde_json::to_string(&msg) {
            ctx.text(json);
        }
    }
}

pub async fn ws_handler(
    req: HttpRequest,
    stream: web::Payload,
    query: web::Query<Subscription>,
    broker: web::Data<WsBroker>,
) -> Result<HttpResponse, Error> {
    let session = query.into_inner().session_id.filter(|s| !s.is_empty());
    let conn = WsConnection::new(broker.get_ref().clone(), session);
    ws::start(conn, &req, stream)
}

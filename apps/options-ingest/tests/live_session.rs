//! Live Session Integration Tests
//!
//! Runs the OPRA feed against a local WebSocket server and checks the
//! payload lines the live handler writes.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]

use futures_util::{SinkExt, StreamExt};
use rmpv::Value;
use rust_decimal::Decimal;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use options_ingest::infrastructure::alpaca::Credentials;
use options_ingest::{
    CanonicalPayload, JsonLinesEmitter, LiveFeed, LiveFeedError, LiveTickHandler, OpraFeedConfig,
    OpraLiveFeed, OptionContract, OptionsFeed,
};

const OCC: &str = "SPY240119C00470000";

fn frame(entries: Vec<(&str, Value)>) -> Message {
    let map = Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect());
    let mut buf = Vec::new();
    rmpv::encode::write_value(&mut buf, &Value::Array(vec![map])).unwrap();
    Message::Binary(buf.into())
}

fn success(msg: &str) -> Message {
    frame(vec![("T", "success".into()), ("msg", msg.into())])
}

fn trade(ms: u32, price: f64, size: i64, exchange: Option<&str>) -> Message {
    let mut entries = vec![
        ("T", Value::from("t")),
        ("S", OCC.into()),
        ("t", Value::from(format!("2024-01-02T14:30:00.{ms:03}Z"))),
        ("p", price.into()),
        ("s", size.into()),
        ("c", Value::Array(vec!["I".into(), "f".into()])),
    ];
    if let Some(exchange) = exchange {
        entries.push(("x", exchange.into()));
    }
    frame(entries)
}

async fn serve(messages: Vec<Message>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws: WebSocketStream<TcpStream> = tokio_tungstenite::accept_async(tcp).await.unwrap();

        ws.send(success("connected")).await.unwrap();
        let _auth = ws.next().await;
        ws.send(success("authenticated")).await.unwrap();
        let _subscribe = ws.next().await;
        ws.send(frame(vec![
            ("T", "subscription".into()),
            ("trades", Value::Array(vec![OCC.into()])),
        ]))
        .await
        .unwrap();

        for message in messages {
            ws.send(message).await.unwrap();
        }
        ws.close(None).await.unwrap();
    });
    format!("ws://{addr}")
}

fn contract() -> OptionContract {
    OptionContract::new("SPY", "20240119", Decimal::from(470), "C", Some("CBOE"), "USD").unwrap()
}

fn feed(url: String) -> OpraLiveFeed {
    let credentials = Credentials::new("key", "secret").unwrap();
    OpraLiveFeed::new(OpraFeedConfig::new(OptionsFeed::Opra, credentials).with_url(url))
}

#[tokio::test]
async fn session_emits_deduplicated_payload_lines() {
    let url = serve(vec![
        trade(100, 1.5, 2, Some("N")),
        trade(100, 1.5, 2, Some("N")),
        trade(250, 1.55, 1, None),
        trade(100, 1.5, 2, Some("N")),
    ])
    .await;

    let mut feed = feed(url);
    feed.connect().await.unwrap();
    let qualified = feed.qualify(&contract()).await.unwrap();

    let mut handler = LiveTickHandler::new(JsonLinesEmitter::new(Vec::new()), &qualified);
    let result = feed.run(&mut handler, CancellationToken::new()).await;
    feed.disconnect().await.unwrap();

    assert!(matches!(result, Err(LiveFeedError::Stream(_))));
    assert_eq!(handler.stats().received, 4);
    assert_eq!(handler.stats().duplicates, 1);

    let output = String::from_utf8(handler.into_sink().into_inner()).unwrap();
    let prices: Vec<f64> = output
        .lines()
        .map(|line| serde_json::from_str::<CanonicalPayload>(line).unwrap().price)
        .collect();
    // The repeat after a different trade is accepted again.
    assert_eq!(prices, vec![1.5, 1.55, 1.5]);
}

#[tokio::test]
async fn payloads_carry_contract_symbol_and_exchange_fallback() {
    let url = serve(vec![trade(100, 1.5, 2, Some("N")), trade(250, 1.55, 1, None)]).await;

    let mut feed = feed(url);
    feed.connect().await.unwrap();
    let qualified = feed.qualify(&contract()).await.unwrap();

    let mut handler = LiveTickHandler::new(Vec::<CanonicalPayload>::new(), &qualified);
    let _ = feed.run(&mut handler, CancellationToken::new()).await;
    feed.disconnect().await.unwrap();

    let payloads = handler.sink();
    assert_eq!(payloads.len(), 2);
    assert_eq!(payloads[0].symbol, OCC);
    assert_eq!(payloads[0].ts, 1_704_205_800_100);
    assert_eq!(payloads[0].exchange.as_deref(), Some("N"));
    assert_eq!(payloads[0].conditions, vec!["I".to_string(), "f".to_string()]);
    assert_eq!(payloads[1].exchange.as_deref(), Some("CBOE"));
    assert_eq!(payloads[1].price, 1.55);
}

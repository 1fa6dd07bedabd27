mod common;

use common::*;
use ledgerx::core::kernel::StreamEvent;
use ledgerx::{
    Entry, ErrorKind, LedgerError, NetworkConfig, Options, ReconnectPolicy, WatchTarget,
};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

#[cfg(test)]
mod watch_tests {
    use super::*;

    const WAIT: Duration = Duration::from_secs(5);

    fn payment_json(paging_token: &str, tx_hash: &str) -> serde_json::Value {
        json!({
            "id": paging_token,
            "paging_token": paging_token,
            "type": "payment",
            "from": ADDRESS2,
            "to": ADDRESS,
            "asset_type": "native",
            "amount": "4.0000000",
            "transaction_hash": tx_hash,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    fn ledger_tokens(entries: &[Entry]) -> Vec<String> {
        entries
            .iter()
            .map(|entry| entry.paging_token().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_fake_watcher_emits_until_done() {
        let (mock, client) = mock_client(NetworkConfig::fake());
        let mut watcher = client.watch_ledgers(Options::new()).await.unwrap();

        let started = Instant::now();
        for _ in 0..3 {
            let entry = timeout(WAIT, watcher.recv()).await.unwrap().unwrap();
            assert!(matches!(entry, Entry::LedgerClose(ref ledger) if ledger.id == "fake"));
        }
        // First tick is immediate, then one every 200ms
        assert!(started.elapsed() >= Duration::from_millis(350));

        watcher.done();
        assert!(watcher.recv().await.is_none());
        assert!(mock.stream_requests().is_empty());
    }

    #[tokio::test]
    async fn test_fake_watcher_does_not_burst_after_slow_reader() {
        let (_, client) = mock_client(NetworkConfig::fake().with_stream_buffer(1));
        let mut watcher = client.watch_ledgers(Options::new()).await.unwrap();

        timeout(WAIT, watcher.recv()).await.unwrap().unwrap();
        tokio::time::sleep(Duration::from_millis(1200)).await;

        // Buffered entry, the blocked send, then one overdue tick at most
        let mut ready = 0;
        while let Ok(Some(_)) = timeout(Duration::from_millis(60), watcher.recv()).await {
            ready += 1;
            if ready > 10 {
                break;
            }
        }
        assert!(ready <= 3, "{} entries arrived back to back", ready);

        let before = Instant::now();
        timeout(WAIT, watcher.recv()).await.unwrap().unwrap();
        assert!(before.elapsed() >= Duration::from_millis(100));
        watcher.done();
    }

    #[tokio::test]
    async fn test_done_interrupts_pending_memo_lookup() {
        let (mock, client) = mock_client(NetworkConfig::test());
        mock.stall("/transactions/txhash");
        mock.script_stream(vec![hello(), event(payment_json("p1", "txhash"))]);

        let mut watcher = client.watch_payments(ADDRESS, Options::new()).await.unwrap();
        let lookup_started = timeout(WAIT, async {
            while !mock.query_paths().contains(&"/transactions/txhash".to_string()) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(lookup_started.is_ok());

        watcher.done();
        let stopped = timeout(WAIT, async {
            while !watcher.is_finished() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(stopped.is_ok());
        assert!(watcher.last_error().is_none());
    }

    #[tokio::test]
    async fn test_outer_token_stops_watcher() {
        let (_, client) = mock_client(NetworkConfig::fake());
        let token = CancellationToken::new();
        let mut watcher = client
            .watch_payments(ADDRESS, Options::new().with_cancellation(token.clone()))
            .await
            .unwrap();

        timeout(WAIT, watcher.recv()).await.unwrap().unwrap();
        token.cancel();

        let drained = timeout(WAIT, async {
            while watcher.recv().await.is_some() {}
        })
        .await;
        assert!(drained.is_ok());
        assert!(watcher.last_error().is_none());
    }

    #[tokio::test]
    async fn test_invalid_target_fails_before_subscribing() {
        let (mock, client) = mock_client(NetworkConfig::test());
        let err = client
            .watch_transactions("GBAD", Options::new())
            .await
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(mock.stream_requests().is_empty());
    }

    #[tokio::test]
    async fn test_payment_stream_loads_memo() {
        let (mock, client) = mock_client(NetworkConfig::test());
        mock.respond(
            "/transactions/txhash",
            json!({
                "id": "txhash",
                "paging_token": "p1",
                "hash": "txhash",
                "ledger": 7,
                "source_account": ADDRESS2,
                "memo_type": "text",
                "memo": "invoice-7"
            }),
        );
        mock.script_stream(vec![hello(), event(payment_json("p1", "txhash"))]);

        let mut watcher = client
            .watch_payments(ADDRESS, Options::new().with_cursor(ledgerx::CURSOR_NOW))
            .await
            .unwrap();

        let entry = timeout(WAIT, watcher.recv()).await.unwrap().unwrap();
        match entry {
            Entry::Payment(payment) => {
                assert_eq!(payment.from, ADDRESS2);
                assert_eq!(payment.amount, "4.0000000");
                assert_eq!(payment.memo_type.as_deref(), Some("text"));
                assert_eq!(payment.memo.as_deref(), Some("invoice-7"));
            }
            other => panic!("unexpected entry {:?}", other),
        }

        // Server closed the stream after the scripted events
        assert!(timeout(WAIT, watcher.recv()).await.unwrap().is_none());
        assert!(matches!(
            watcher.last_error(),
            Some(LedgerError::StreamDisconnected(_))
        ));

        let requests = mock.stream_requests();
        assert_eq!(requests[0].0, format!("/accounts/{}/payments", ADDRESS));
        assert!(requests[0]
            .1
            .contains(&("cursor".to_string(), "now".to_string())));
    }

    #[tokio::test]
    async fn test_undecodable_events_are_skipped() {
        let (mock, client) = mock_client(NetworkConfig::test());
        let garbage = StreamEvent {
            id: None,
            event: None,
            data: "{\"unexpected\": true}".to_string(),
        };
        mock.script_stream(vec![garbage, event(ledger_json("7"))]);

        let mut watcher = client.watch_ledgers(Options::new()).await.unwrap();
        let entry = timeout(WAIT, watcher.recv()).await.unwrap().unwrap();
        assert_eq!(entry.paging_token(), "7");
    }

    #[tokio::test]
    async fn test_reconnect_resumes_from_last_token() {
        let (mock, client) = mock_client(NetworkConfig::test());
        mock.script_stream(vec![event(ledger_json("1")), event(ledger_json("2"))]);
        mock.script_stream(vec![hello(), event(ledger_json("3"))]);

        let token = CancellationToken::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let on_entry = {
            let seen = Arc::clone(&seen);
            let token = token.clone();
            move |entry: Entry| {
                let mut seen = seen.lock().unwrap();
                seen.push(entry);
                if seen.len() == 3 {
                    token.cancel();
                }
            }
        };

        let result = timeout(
            WAIT,
            client.watch_with_reconnect(
                WatchTarget::Ledgers,
                Options::new().with_cancellation(token),
                ReconnectPolicy::default().with_delay(Duration::from_millis(10)),
                on_entry,
            ),
        )
        .await
        .unwrap();
        assert!(result.is_ok());

        assert_eq!(ledger_tokens(&seen.lock().unwrap()), vec!["1", "2", "3"]);

        let requests = mock.stream_requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].1.is_empty());
        assert!(requests[1]
            .1
            .contains(&("cursor".to_string(), "2".to_string())));
    }

    #[tokio::test]
    async fn test_reconnect_without_resume_keeps_cursor() {
        let (mock, client) = mock_client(NetworkConfig::test());
        mock.script_stream(vec![event(ledger_json("1"))]);
        mock.script_stream(vec![event(ledger_json("2"))]);

        let token = CancellationToken::new();
        let count = Arc::new(Mutex::new(0));
        let on_entry = {
            let count = Arc::clone(&count);
            let token = token.clone();
            move |_: Entry| {
                let mut count = count.lock().unwrap();
                *count += 1;
                if *count == 2 {
                    token.cancel();
                }
            }
        };

        timeout(
            WAIT,
            client.watch_with_reconnect(
                WatchTarget::Ledgers,
                Options::new().with_cancellation(token).with_cursor("now"),
                ReconnectPolicy::default()
                    .with_delay(Duration::from_millis(10))
                    .without_resume(),
                on_entry,
            ),
        )
        .await
        .unwrap()
        .unwrap();

        for (_, params) in mock.stream_requests() {
            assert_eq!(params, vec![("cursor".to_string(), "now".to_string())]);
        }
    }

    #[tokio::test]
    async fn test_reconnect_gives_up_after_max_attempts() {
        let (mock, client) = mock_client(NetworkConfig::test());
        for _ in 0..3 {
            mock.script_stream(Vec::new());
        }

        let err = timeout(
            WAIT,
            client.watch_with_reconnect(
                WatchTarget::Ledgers,
                Options::new(),
                ReconnectPolicy::default()
                    .with_delay(Duration::from_millis(10))
                    .with_max_attempts(1),
                |_| {},
            ),
        )
        .await
        .unwrap()
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::StreamDisconnected);
        assert_eq!(mock.stream_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_reconnect_returns_input_errors() {
        let (mock, client) = mock_client(NetworkConfig::test());

        let err = client
            .watch_with_reconnect(
                WatchTarget::Payments("GBAD".to_string()),
                Options::new(),
                ReconnectPolicy::default(),
                |_| {},
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(mock.stream_requests().is_empty());
    }
}

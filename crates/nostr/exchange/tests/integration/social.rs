//! Follow/membership lists: fetch, publish gate and round trip

use super::*;
use nostr::{Contact, KIND_CONTACTS, Nip02Error};
use nostr_exchange::ExchangeError;
use pretty_assertions::assert_eq;
use tokio::time::Instant;

fn p_tag(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[tokio::test(start_paused = true)]
async fn test_fetch_follow_list_in_tag_order() {
    let alice = pubkey('a');
    let bob = pubkey('b');
    let carol = pubkey('c');
    let event = contacts(
        &alice,
        1,
        vec![
            p_tag(&["p", carol.as_str(), "wss://carol.test", "carol"]),
            p_tag(&["e", "not-a-contact"]),
            p_tag(&["p", bob.as_str()]),
            p_tag(&["p"]),
            p_tag(&["p", carol.as_str()]),
        ],
    );
    let source = Arc::new(ScriptedSource::new().events(vec![event]));
    let exchange = exchange_with(Arc::clone(&source));

    let list = exchange.fetch_follow_list(&alice).await.unwrap();

    assert_eq!(
        list,
        vec![
            Contact::with_relay_and_petname(carol.clone(), "wss://carol.test", "carol"),
            Contact::new(bob.clone()),
            Contact::new(carol.clone()),
        ]
    );
    let filter = source.last_filter().unwrap();
    assert_eq!(filter.kinds, Some(vec![KIND_CONTACTS]));
    assert_eq!(filter.limit, Some(1));
}

#[tokio::test(start_paused = true)]
async fn test_fetch_follow_list_missing_is_empty() {
    let source = Arc::new(ScriptedSource::new().query_tail(Tail::Hang));
    let exchange = exchange_with(Arc::clone(&source));
    let start = Instant::now();

    let list = exchange.fetch_follow_list(&pubkey('a')).await.unwrap();

    assert!(list.is_empty());
    assert_near(start.elapsed(), exchange.config().follow_list_timeout());
    assert_eq!(source.drop_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_fetch_follow_list_source_error_is_empty() {
    let source = Arc::new(
        ScriptedSource::new()
            .query_tail(Tail::Fail(SourceError::Protocol("bad frame".to_string()))),
    );
    let exchange = exchange_with(source);

    assert!(exchange.fetch_follow_list(&pubkey('a')).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_publish_follow_list_rejects_short_pubkey_before_signing() {
    let source = Arc::new(ScriptedSource::new());
    let exchange = exchange_with(Arc::clone(&source));
    let signer = CountingSigner::new();
    let entries = vec![Contact::new(pubkey('b')), Contact::new("b".repeat(63))];

    let result = exchange
        .publish_follow_list(&pubkey('a'), &entries, &signer)
        .await;

    assert!(matches!(
        result,
        Err(ExchangeError::Validation(Nip02Error::InvalidPublicKey(key))) if key.len() == 63
    ));
    assert_eq!(signer.calls(), 0);
    assert!(source.published().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_publish_follow_list_rejects_bad_relay_hint() {
    let source = Arc::new(ScriptedSource::new());
    let exchange = exchange_with(Arc::clone(&source));
    let signer = CountingSigner::new();
    let entries = vec![Contact::with_relay(pubkey('b'), "https://not-a-relay.test")];

    let result = exchange
        .publish_follow_list(&pubkey('a'), &entries, &signer)
        .await;

    assert!(matches!(
        result,
        Err(ExchangeError::Validation(Nip02Error::InvalidRelayUrl { .. }))
    ));
    assert_eq!(signer.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_publish_follow_list_without_relays() {
    let source = Arc::new(ScriptedSource::new());
    let exchange = exchange_with(Arc::clone(&source));
    exchange.set_relays(vec![]).await.unwrap();
    let signer = CountingSigner::new();

    let result = exchange
        .publish_follow_list(&pubkey('a'), &[Contact::new(pubkey('b'))], &signer)
        .await;

    assert!(matches!(result, Err(ExchangeError::NoRelays)));
    assert_eq!(signer.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_follow_list_round_trip() {
    let alice = pubkey('a');
    let entries = vec![
        Contact::new(pubkey('b')),
        Contact::with_relay(pubkey('c'), "wss://c.test"),
        Contact::with_relay_and_petname(pubkey('d'), "", "dave"),
    ];

    let writer_source = Arc::new(
        ScriptedSource::new().confirmations(vec![confirmation(RELAY, "signed-0", true)]),
    );
    let writer = exchange_with(Arc::clone(&writer_source));
    let signer = CountingSigner::new();

    assert!(writer.publish_follow_list(&alice, &entries, &signer).await.unwrap());
    let published = writer_source.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].kind, KIND_CONTACTS);
    assert_eq!(published[0].pubkey, alice);

    let reader_source = Arc::new(ScriptedSource::new().events(published));
    let reader = exchange_with(reader_source);

    assert_eq!(reader.fetch_follow_list(&alice).await.unwrap(), entries);
}

#[tokio::test(start_paused = true)]
async fn test_set_relays_all_or_nothing() {
    let source = Arc::new(ScriptedSource::new().events(vec![named(&pubkey('a'), 1, "alice")]));
    let exchange = exchange_with(Arc::clone(&source));

    assert!(matches!(
        exchange
            .set_relays(vec!["wss://ok.test".to_string(), "relay.test".to_string()])
            .await,
        Err(ExchangeError::InvalidRelayUrl(_))
    ));
    assert_eq!(exchange.relays().await, vec![RELAY.to_string()]);

    exchange
        .set_relays(vec!["wss://one.test".to_string(), "wss://two.test".to_string()])
        .await
        .unwrap();
    exchange.fetch_profile(&pubkey('a')).await.unwrap();

    let queries = source.queries.lock().unwrap();
    assert_eq!(
        queries.last().map(|(relays, _)| relays.clone()),
        Some(vec!["wss://one.test".to_string(), "wss://two.test".to_string()])
    );
}

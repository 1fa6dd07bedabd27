use ledgerx::tx::Operation;
use ledgerx::{Asset, Entry, LedgerClient, NetworkConfig, Options};
use secrecy::ExposeSecret;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Fake network: every call below runs offline
    let client = LedgerClient::from_config(NetworkConfig::fake())?;

    let alice = LedgerClient::create_keypair();
    let bob = LedgerClient::create_keypair();
    let alice_seed = alice.seed().expose_secret().clone();

    let response = client
        .pay_native(
            &alice_seed,
            &bob.address(),
            "4",
            Options::new().with_memo_text("hello"),
        )
        .await?;
    println!("Payment submitted: {} (submitted = {})", response.hash, response.submitted);

    let usd = Asset::credit("USD", alice.address());
    let mut batch = client.start(&alice_seed, Options::new());
    batch
        .add(
            &alice_seed,
            vec![Operation::payment(&bob.address(), &Asset::native(), "1")?],
        )
        .await?;
    batch
        .add(
            &alice_seed,
            vec![Operation::payment(&bob.address(), &Asset::native(), "2")?],
        )
        .await?;
    println!("Batch of {} operations", batch.len());
    let response = batch.submit(&[]).await?;
    println!("Batch submitted: {}", response.hash);

    let book = client
        .load_order_book(&Asset::native(), &usd, &Options::new())
        .await?;
    println!("Order book: {} bids, {} asks", book.bids.len(), book.asks.len());

    let mut watcher = client.watch_ledgers(Options::new()).await?;
    for _ in 0..3 {
        if let Some(Entry::LedgerClose(ledger)) = watcher.recv().await {
            println!("Ledger closed: {}", ledger.id);
        }
    }
    watcher.done();

    Ok(())
}

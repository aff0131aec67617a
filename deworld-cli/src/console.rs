//! Terminal output: notices on stderr, results on stdout.

use std::fmt::Write as _;

use deworld::amount::{INLINE_PRECISION, format_units_fixed};
use deworld::balance::BalanceSnapshot;
use deworld::chain::{ChainMetadata, NetworkStatus};
use deworld::config::TokenConfig;
use deworld::market::{Product, Purchase};
use deworld::notify::{Notice, NoticeLevel, Notifier};
use deworld::purchase::PurchaseResult;

/// Prints notices to stderr, one line each.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    #[allow(clippy::print_stderr)]
    fn notify(&self, notice: Notice) {
        let tag = match notice.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Loading => "....",
            NoticeLevel::Success => " ok ",
            NoticeLevel::Error => "fail",
        };
        eprintln!("[{tag}] {}", notice.message);
    }
}

/// Writes a rendered block to stdout.
#[allow(clippy::print_stdout)]
pub fn print(block: &str) {
    println!("{block}");
}

fn format_timestamp(timestamp: Option<u64>) -> String {
    timestamp
        .and_then(|ts| i64::try_from(ts).ok())
        .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
        .map_or_else(|| "-".to_owned(), |dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
}

fn price(raw: alloy_primitives::U256, token: &TokenConfig) -> String {
    format!(
        "{} {}",
        format_units_fixed(raw, token.decimals, INLINE_PRECISION),
        token.symbol
    )
}

/// Network line: the required chain and whether the wallet is on it.
#[must_use]
pub fn render_network(status: &NetworkStatus, chain: &ChainMetadata) -> String {
    match status.observed {
        Some(_) if status.is_correct() => format!("network: {} ({})", chain.chain_name, chain.chain_id),
        Some(observed) => format!(
            "network: wallet is on {observed}, {} ({}) required; run `deworld switch-network`",
            chain.chain_name, chain.chain_id
        ),
        None => format!("network: unknown, {} ({}) required", chain.chain_name, chain.chain_id),
    }
}

/// Product listing, one product per line.
#[must_use]
pub fn render_products(products: &[Product], token: &TokenConfig) -> String {
    if products.is_empty() {
        return "no products listed".to_owned();
    }
    let mut out = format!("{:>6}  {:<28} {:>16} {:>9}  image", "id", "name", "price", "available");
    for product in products {
        let availability = if product.available() == 0 {
            "sold out".to_owned()
        } else {
            product.available().to_string()
        };
        // Writing to a String cannot fail.
        let _ = write!(
            out,
            "\n{:>6}  {:<28} {:>16} {:>9}  {}",
            product.id,
            product.name,
            price(product.price, token),
            availability,
            product.image_url()
        );
    }
    out
}

/// Native and stablecoin balances at table precision.
#[must_use]
pub fn render_snapshot(snapshot: &BalanceSnapshot) -> String {
    format!("{}\n{}", snapshot.native.table(), snapshot.token.table())
}

/// Purchase details: transactions, gas paid and the balance comparison.
#[must_use]
pub fn render_purchase(result: &PurchaseResult, chain: &ChainMetadata, token: &TokenConfig) -> String {
    let mut out = format!(
        "bought {} x {} for {} ({})",
        result.quantity,
        result.product.name,
        price(result.total, token),
        result.path
    );
    if let Some(id) = result.purchase_id {
        let _ = write!(out, "\npurchase id: {id}");
    }
    for (label, outcome) in [("approval", &result.approval), ("purchase", &result.receipt)] {
        let link = chain
            .explorer_tx_url(&outcome.tx_hash)
            .unwrap_or_else(|| outcome.tx_hash.to_string());
        let _ = write!(out, "\n{label}: {link}");
    }
    let _ = write!(out, "\ngas paid: {}", result.gas_paid.display(&chain.native_currency));

    let _ = write!(out, "\n\n{:<10} {:>24} {:>24}", "", "before", "after");
    let before = &result.previous_balances;
    match &result.new_balances {
        Some(after) => {
            for (prev, next) in [(&before.native, &after.native), (&before.token, &after.token)] {
                let _ = write!(out, "\n{:<10} {:>24} {:>24}", prev.symbol(), prev.table(), next.table());
            }
        }
        None => {
            for prev in [&before.native, &before.token] {
                let _ = write!(out, "\n{:<10} {:>24} {:>24}", prev.symbol(), prev.table(), "unavailable");
            }
        }
    }
    out
}

/// Purchase history, most recent first.
#[must_use]
pub fn render_history(purchases: &[Purchase], token: &TokenConfig) -> String {
    if purchases.is_empty() {
        return "no purchases found".to_owned();
    }
    let mut out = format!(
        "{:>6}  {:<24} {:>6} {:>16}  {:<10} date",
        "id", "product", "qty", "total", "status"
    );
    for purchase in purchases {
        let total = purchase
            .total()
            .map_or_else(|e| e.to_string(), |total| price(total, token));
        let _ = write!(
            out,
            "\n{:>6}  {:<24} {:>6} {:>16}  {:<10} {}",
            purchase.id,
            purchase.product.name,
            purchase.amount,
            total,
            purchase.status(),
            format_timestamp(purchase.timestamp)
        );
    }
    out
}

//! `search` and `resolve` command handlers.
//!
//! A search drives one [`ResultAccumulator`] session against the server,
//! one page at a time, printing only the results each page adds.

use nearbite_core::{AppendOutcome, EnrichedResult, GeoPoint, ResultAccumulator, SCAN_POSITIONS};

use crate::client::{ApiClient, ClientError, SearchParams};
use crate::visited::{VisitedBackend, VisitedSet};

/// What a single merged page contributed.
pub(crate) struct ScanProgress<'a> {
    pub center: GeoPoint,
    pub radius_meters: u32,
    pub new_results: &'a [EnrichedResult],
    pub scanned: u8,
    pub total: usize,
}

/// Fetches up to `max_pages` pages, stopping early once the scan plan is
/// exhausted. A failed fetch releases the accumulator's slot and ends the
/// session with that error.
pub(crate) async fn scan<F>(
    api: &ApiClient,
    params: &SearchParams,
    max_pages: usize,
    mut on_page: F,
) -> Result<ResultAccumulator, ClientError>
where
    F: FnMut(&ScanProgress<'_>),
{
    let mut acc = ResultAccumulator::new();
    let mut fetched = 0;

    while fetched < max_pages {
        let Some(ticket) = acc.begin_request() else {
            break;
        };
        let page = match api.search(params, ticket.cursor()).await {
            Ok(page) => page,
            Err(e) => {
                acc.fail_request(ticket);
                tracing::warn!(cursor = %ticket.cursor(), error = %e, "scan page failed");
                return Err(e);
            }
        };
        fetched += 1;

        let center = page.center;
        let radius_meters = page.radius_meters;
        let before = acc.len();
        match acc.append_page(ticket, page) {
            AppendOutcome::Merged { added } => {
                tracing::debug!(cursor = %ticket.cursor(), added, "merged scan page");
                on_page(&ScanProgress {
                    center,
                    radius_meters,
                    new_results: &acc.results()[before..],
                    scanned: acc.scanned_positions(),
                    total: acc.len(),
                });
            }
            AppendOutcome::Stale => {
                tracing::debug!(cursor = %ticket.cursor(), "discarded stale scan page");
            }
            AppendOutcome::CursorMismatch => {
                tracing::warn!(cursor = %ticket.cursor(), "server answered for another position; stopping scan");
                break;
            }
        }
    }

    Ok(acc)
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        format!("{}...", text.chars().take(max).collect::<String>())
    } else {
        text.to_owned()
    }
}

/// Rows to print for a batch of results; the accumulator keeps all of them.
fn visible(
    results: &[EnrichedResult],
    only_reservable: bool,
) -> impl Iterator<Item = &EnrichedResult> {
    results
        .iter()
        .filter(move |r| !only_reservable || r.reservable)
}

fn print_result(result: &EnrichedResult, visited: bool) {
    let price = result.price_level.map_or("-", |p| p.symbol());
    let reservable = if result.reservable { "yes" } else { "no" };
    let mut flags = String::new();
    if result.signed {
        flags.push_str(" [signed]");
    }
    if visited {
        flags.push_str(" [visited]");
    }
    println!(
        "{:<42}{:<7}{:<6}{:<16}{}{}",
        truncate(&result.name, 38),
        price,
        reservable,
        result.phone.as_deref().unwrap_or("-"),
        truncate(&result.address, 48),
        flags
    );
}

/// Runs a scan session and prints it page by page. With `only_reservable`
/// only places taking reservations are printed and counted as shown.
///
/// # Errors
///
/// Returns an error if any page request fails.
pub(crate) async fn run_search<B: VisitedBackend>(
    api: &ApiClient,
    params: &SearchParams,
    max_pages: usize,
    only_reservable: bool,
    visited: &VisitedSet<B>,
) -> anyhow::Result<()> {
    let mut header_printed = false;
    let mut shown = 0;
    let acc = scan(api, params, max_pages, |progress| {
        if !header_printed {
            println!(
                "center {:.5},{:.5}  radius {} m",
                progress.center.lat, progress.center.lng, progress.radius_meters
            );
            println!(
                "{:<42}{:<7}{:<6}{:<16}ADDRESS",
                "NAME", "PRICE", "BOOK", "PHONE"
            );
            header_printed = true;
        }
        let mut new_shown = 0;
        for result in visible(progress.new_results, only_reservable) {
            print_result(result, visited.contains(&result.place_id));
            new_shown += 1;
        }
        shown += new_shown;
        if only_reservable {
            println!(
                "-- {}/{SCAN_POSITIONS} positions, {new_shown} new reservable, {shown} reservable of {} total",
                progress.scanned, progress.total
            );
        } else {
            println!(
                "-- {}/{SCAN_POSITIONS} positions, {new_shown} new, {} total",
                progress.scanned, progress.total
            );
        }
    })
    .await?;

    let found = if only_reservable {
        format!("{shown} reservable of {} restaurants", acc.len())
    } else {
        format!("{} restaurants", acc.len())
    };
    if acc.has_more() {
        println!("{found} so far; continue with --pages or --all");
    } else {
        println!("scan complete: {found}");
    }
    Ok(())
}

/// Prints the text-search candidates for a place name.
///
/// # Errors
///
/// Returns an error if the resolve request fails.
pub(crate) async fn run_resolve(api: &ApiClient, query: &str) -> anyhow::Result<()> {
    let candidates = api.resolve(query).await?;
    if candidates.is_empty() {
        println!("no matches for '{query}'");
        return Ok(());
    }
    for c in &candidates {
        println!(
            "{:.5},{:.5}  {}  {}  ({})",
            c.lat,
            c.lng,
            c.name,
            truncate(&c.address, 48),
            c.place_id
        );
    }
    Ok(())
}

//! Caller-side merge state for a scan session.
//!
//! A [`ResultAccumulator`] holds every result seen so far in first-seen order,
//! the cursor to request next, and whether the plan is exhausted. Fetches are
//! single-flight: [`ResultAccumulator::begin_request`] hands out at most one
//! outstanding [`PageTicket`]. Only the outstanding ticket can merge a page or
//! release the slot; tickets from an earlier session (before a
//! [`ResultAccumulator::reset`]) or from an abandoned request are stale.

use std::collections::HashSet;

use crate::scan::{EnrichedResult, Page, ScanCursor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulatorState {
    Idle,
    Scanning,
    Exhausted,
}

/// Permission to fetch one page, bound to the session and request that
/// issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTicket {
    session: u64,
    request: u64,
    cursor: ScanCursor,
}

impl PageTicket {
    /// Position this ticket was issued for.
    #[must_use]
    pub fn cursor(&self) -> ScanCursor {
        self.cursor
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Page merged; carries the number of results not seen before.
    Merged { added: usize },
    /// Page belonged to a reset session or an abandoned request.
    Stale,
    /// Page was served for a different position than the ticket asked for.
    /// Nothing is merged, the slot is released and the cursor stays put.
    CursorMismatch,
}

#[derive(Debug)]
pub struct ResultAccumulator {
    results: Vec<EnrichedResult>,
    seen: HashSet<String>,
    cursor: ScanCursor,
    has_more: bool,
    state: AccumulatorState,
    outstanding: Option<u64>,
    session: u64,
    next_request: u64,
}

impl Default for ResultAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            results: Vec::new(),
            seen: HashSet::new(),
            cursor: ScanCursor::START,
            has_more: true,
            state: AccumulatorState::Idle,
            outstanding: None,
            session: 0,
            next_request: 0,
        }
    }

    /// Drops all results and starts a new session. Tickets issued before the
    /// reset become stale.
    pub fn reset(&mut self) {
        self.results.clear();
        self.seen.clear();
        self.cursor = ScanCursor::START;
        self.has_more = true;
        self.state = AccumulatorState::Idle;
        self.outstanding = None;
        self.session = self.session.wrapping_add(1);
    }

    /// Claims the single fetch slot for this session.
    ///
    /// Returns `None` while another fetch is outstanding or once the scan is
    /// exhausted; the caller must not issue a request in that case.
    pub fn begin_request(&mut self) -> Option<PageTicket> {
        if self.outstanding.is_some() || self.state == AccumulatorState::Exhausted {
            return None;
        }
        let request = self.next_request;
        self.next_request = self.next_request.wrapping_add(1);
        self.outstanding = Some(request);
        self.state = AccumulatorState::Scanning;
        Some(PageTicket {
            session: self.session,
            request,
            cursor: self.cursor,
        })
    }

    fn is_outstanding(&self, ticket: PageTicket) -> bool {
        ticket.session == self.session && self.outstanding == Some(ticket.request)
    }

    /// Merges a page fetched under `ticket`.
    pub fn append_page(&mut self, ticket: PageTicket, page: Page) -> AppendOutcome {
        if !self.is_outstanding(ticket) {
            return AppendOutcome::Stale;
        }
        self.outstanding = None;
        if page.scan_index != ticket.cursor {
            return AppendOutcome::CursorMismatch;
        }

        let mut added = 0;
        for result in page.results {
            if self.seen.insert(result.place_id.clone()) {
                self.results.push(result);
                added += 1;
            }
        }

        self.cursor = ScanCursor::normalize(i64::from(page.next_scan_index));
        self.has_more = page.has_more;
        self.state = if page.has_more {
            AccumulatorState::Scanning
        } else {
            AccumulatorState::Exhausted
        };

        AppendOutcome::Merged { added }
    }

    /// Releases the fetch slot after a failed or abandoned request. The
    /// cursor is left unchanged so the same position can be retried; any
    /// later response to this ticket is stale.
    pub fn fail_request(&mut self, ticket: PageTicket) {
        if self.is_outstanding(ticket) {
            self.outstanding = None;
        }
    }

    #[must_use]
    pub fn results(&self) -> &[EnrichedResult] {
        &self.results
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Position the next request will ask for; `None` once the plan is
    /// exhausted.
    #[must_use]
    pub fn cursor(&self) -> Option<ScanCursor> {
        (self.state != AccumulatorState::Exhausted).then_some(self.cursor)
    }

    #[must_use]
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    #[must_use]
    pub fn state(&self) -> AccumulatorState {
        self.state
    }

    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.outstanding.is_some()
    }

    /// Positions scanned so far, out of [`crate::SCAN_POSITIONS`].
    #[must_use]
    pub fn scanned_positions(&self) -> u8 {
        match self.state {
            AccumulatorState::Exhausted => crate::SCAN_POSITIONS,
            _ => self.cursor.index(),
        }
    }
}

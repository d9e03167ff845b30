//! Request processing
//!
//! Turns a raw chunk of received bytes into the bytes the emulated device
//! answers with, if any.

use std::thread;

use tracing::{debug, trace};

use crate::rules::RuleSet;

/// Decide the response to a request
///
/// Echo mode takes precedence over the rules: when enabled the request is
/// returned verbatim and no rule is ever consulted. Otherwise the first
/// matching rule wins, and its delay is slept on the calling thread before
/// the response is returned. `None` means nothing is written back.
pub fn process(request: &[u8], rules: &RuleSet) -> Option<Vec<u8>> {
    if rules.echo_mode {
        trace!("Echoing {} bytes", request.len());
        return Some(request.to_vec());
    }

    let Some(rule) = rules.find_match(request) else {
        debug!(
            "No rule matched request {:?}",
            String::from_utf8_lossy(request)
        );
        return None;
    };

    debug!(
        "Request {:?} matched pattern {:?}",
        String::from_utf8_lossy(request),
        rule.pattern()
    );

    if !rule.delay().is_zero() {
        trace!("Delaying response by {:?}", rule.delay());
        thread::sleep(rule.delay());
    }

    Some(rule.response().to_vec())
}

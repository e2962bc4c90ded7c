//! Pairing and gating of cross-venue quotes.

use fundarb_core::{round_rate, FundingQuote};
use fundarb_feed::{MarketSnapshot, QuoteBatch};
use fundarb_telemetry::Metrics;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::config::DetectorConfig;
use crate::error::{DetectorError, DetectorResult};
use crate::opportunity::ArbitrageOpportunity;
use crate::strategy::{classify, VenueRate};

/// Arbitrage detector bound to a configuration.
#[derive(Debug, Clone)]
pub struct ArbitrageDetector {
    config: DetectorConfig,
}

impl ArbitrageDetector {
    pub fn new(config: DetectorConfig) -> DetectorResult<Self> {
        config.validate().map_err(DetectorError::InvalidConfig)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Detect over a snapshot, optionally overriding the configured gate.
    pub fn detect(
        &self,
        snapshot: &MarketSnapshot,
        min_diff: Option<Decimal>,
    ) -> Vec<ArbitrageOpportunity> {
        let min_diff = min_diff.unwrap_or(self.config.min_diff);
        detect(&snapshot.venue_a, &snapshot.venue_b, min_diff)
    }
}

/// Pair two venues' quotes and return the gated opportunities, ordered by
/// absolute differential, largest first. Ties keep venue A's feed order.
pub fn detect(
    quotes_a: &QuoteBatch,
    quotes_b: &QuoteBatch,
    min_diff: Decimal,
) -> Vec<ArbitrageOpportunity> {
    let mut opportunities: Vec<ArbitrageOpportunity> = quotes_a
        .quotes()
        .iter()
        .filter_map(|qa| {
            let qb = quotes_b.get(&qa.symbol)?;
            pair(qa, qb, min_diff)
        })
        .collect();

    opportunities.sort_by(|x, y| y.difference.abs().cmp(&x.difference.abs()));

    let with_strategy = opportunities.iter().filter(|o| o.has_strategy()).count();
    Metrics::detection_pass(with_strategy, opportunities.len() - with_strategy);
    info!(
        opportunities = opportunities.len(),
        with_strategy,
        %min_diff,
        "Detection pass complete"
    );
    opportunities
}

fn pair(qa: &FundingQuote, qb: &FundingQuote, min_diff: Decimal) -> Option<ArbitrageOpportunity> {
    let (Some(at_a), Some(at_b)) = (qa.next_settlement.instant(), qb.next_settlement.instant())
    else {
        debug!(symbol = %qa.symbol, "Settlement unavailable, pair skipped");
        return None;
    };

    let rate_a = qa.rate_percent;
    let rate_b = round_rate(qb.rate_percent);
    let difference = round_rate(rate_a - rate_b);
    if difference.abs() < min_diff {
        return None;
    }

    // Venue B only wins on a strictly earlier settlement or strictly
    // larger rate; ties go to venue A.
    let a_settles_first = at_a <= at_b;
    let a_has_bigger_rate = rate_a.abs() >= rate_b.abs();
    let strategy = classify(
        VenueRate::new(qa.venue, rate_a),
        VenueRate::new(qb.venue, rate_b),
        a_settles_first,
        a_has_bigger_rate,
    );

    let opportunity = ArbitrageOpportunity {
        symbol: qa.symbol.clone(),
        quote_a: qa.clone(),
        quote_b: FundingQuote {
            rate_percent: rate_b,
            ..qb.clone()
        },
        difference,
        favored_venue: if a_has_bigger_rate { qa.venue } else { qb.venue },
        settles_first: if a_settles_first { qa.venue } else { qb.venue },
        strategy,
    };
    debug!(
        symbol = %opportunity.symbol,
        %difference,
        strategy = %opportunity.strategy_text(),
        "Opportunity"
    );
    Some(opportunity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use fundarb_core::{Settlement, Venue};
    use fundarb_feed::StaticFeed;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 3, 50, 0).unwrap()
    }

    fn at(minutes: i64) -> Settlement {
        Settlement::At(now() + Duration::minutes(minutes))
    }

    fn batch(venue: Venue, quotes: &[(&str, Decimal, Settlement)]) -> QuoteBatch {
        quotes
            .iter()
            .fold(StaticFeed::new(venue), |feed, (sym, rate, s)| {
                feed.with_quote(sym, *rate, *s)
            })
            .batch(now())
    }

    #[test]
    fn test_negative_pair_scenario() {
        let a = batch(Venue::Binance, &[("BTC", dec!(-0.30), at(10))]);
        let b = batch(Venue::Hyperliquid, &[("BTC", dec!(-0.05), at(240))]);
        let opps = detect(&a, &b, dec!(0.25));

        assert_eq!(opps.len(), 1);
        let o = &opps[0];
        assert_eq!(o.difference, dec!(-0.25));
        assert_eq!(o.settles_first, Venue::Binance);
        assert_eq!(o.favored_venue, Venue::Binance);
        let s = o.strategy.unwrap();
        assert_eq!(s.long.venue, Venue::Binance);
        assert_eq!(s.short.venue, Venue::Hyperliquid);
    }

    #[test]
    fn test_below_threshold_excluded() {
        let a = batch(Venue::Binance, &[("ETH", dec!(-0.05), at(10))]);
        let b = batch(Venue::Hyperliquid, &[("ETH", dec!(-0.02), at(40))]);
        assert!(detect(&a, &b, dec!(0.25)).is_empty());
    }

    #[test]
    fn test_gate_passes_without_strategy() {
        // A bigger but settles later: no directional case applies
        let a = batch(Venue::Binance, &[("SOL", dec!(-0.40), at(240))]);
        let b = batch(Venue::Hyperliquid, &[("SOL", dec!(-0.05), at(10))]);
        let opps = detect(&a, &b, dec!(0.25));
        assert_eq!(opps.len(), 1);
        assert!(opps[0].strategy.is_none());
        assert_eq!(opps[0].strategy_text(), crate::NO_OPPORTUNITY);
    }

    #[test]
    fn test_unavailable_settlement_skipped() {
        let a = batch(Venue::Binance, &[("BTC", dec!(-0.9), Settlement::Unavailable)]);
        let b = batch(Venue::Hyperliquid, &[("BTC", dec!(0.0), at(10))]);
        assert!(detect(&a, &b, dec!(0.25)).is_empty());
    }

    #[test]
    fn test_unpaired_symbols_ignored() {
        let a = batch(Venue::Binance, &[("BTC", dec!(0.9), at(10))]);
        let b = batch(Venue::Hyperliquid, &[("ETH", dec!(0.0), at(10))]);
        assert!(detect(&a, &b, dec!(0.25)).is_empty());
    }

    #[test]
    fn test_sorted_by_abs_difference_ties_in_pairing_order() {
        let a = batch(
            Venue::Binance,
            &[
                ("AAA", dec!(0.30), at(10)),
                ("BBB", dec!(-0.60), at(10)),
                ("CCC", dec!(-0.30), at(10)),
                ("DDD", dec!(0.01), at(10)),
            ],
        );
        let b = batch(
            Venue::Hyperliquid,
            &[
                ("DDD", dec!(0.0), at(30)),
                ("CCC", dec!(0.0), at(30)),
                ("BBB", dec!(0.0), at(30)),
                ("AAA", dec!(0.0), at(30)),
            ],
        );
        let opps = detect(&a, &b, dec!(0.25));
        let order: Vec<&str> = opps.iter().map(|o| o.symbol.as_str()).collect();
        assert_eq!(order, vec!["BBB", "AAA", "CCC"]);
    }

    #[test]
    fn test_venue_b_rate_rounded_venue_a_kept() {
        let a = batch(Venue::Binance, &[("BTC", dec!(0.123456), at(10))]);
        let b = batch(Venue::Hyperliquid, &[("BTC", dec!(-0.987654), at(30))]);
        let o = &detect(&a, &b, dec!(0.25))[0];
        assert_eq!(o.quote_a.rate_percent, dec!(0.123456));
        assert_eq!(o.quote_b.rate_percent, dec!(-0.9877));
        assert_eq!(o.difference, dec!(1.1112));
    }

    #[test]
    fn test_equal_settlements_count_venue_a_first() {
        // B bigger but A first on the tie: no directional case applies
        let a = batch(Venue::Binance, &[("BTC", dec!(0.05), at(30))]);
        let b = batch(Venue::Hyperliquid, &[("BTC", dec!(0.40), at(30))]);
        let o = &detect(&a, &b, dec!(0.25))[0];
        assert_eq!(o.settles_first, Venue::Binance);
        assert_eq!(o.favored_venue, Venue::Hyperliquid);
        assert!(o.strategy.is_none());
    }

    #[test]
    fn test_equal_abs_rates_favor_venue_a() {
        let a = batch(Venue::Binance, &[("ETH", dec!(-0.20), at(10))]);
        let b = batch(Venue::Hyperliquid, &[("ETH", dec!(0.20), at(30))]);
        let o = &detect(&a, &b, dec!(0.25))[0];
        assert_eq!(o.favored_venue, Venue::Binance);
        assert_eq!(o.settles_first, Venue::Binance);
        // A leads with a negative rate: long A, short B
        let s = o.strategy.unwrap();
        assert_eq!(s.long.venue, Venue::Binance);
        assert_eq!(s.short.venue, Venue::Hyperliquid);
    }

    #[test]
    fn test_detector_min_diff_override() {
        let detector = ArbitrageDetector::new(DetectorConfig::default()).unwrap();
        let a = batch(Venue::Binance, &[("ETH", dec!(-0.05), at(10))]);
        let b = batch(Venue::Hyperliquid, &[("ETH", dec!(-0.02), at(40))]);
        let snapshot = MarketSnapshot {
            venue_a: a,
            venue_b: b,
            taken_at: now(),
        };
        assert!(detector.detect(&snapshot, None).is_empty());
        assert_eq!(detector.detect(&snapshot, Some(dec!(0.01))).len(), 1);
    }

    #[test]
    fn test_opportunity_serializes_null_strategy() {
        let a = batch(Venue::Binance, &[("SOL", dec!(-0.40), at(240))]);
        let b = batch(Venue::Hyperliquid, &[("SOL", dec!(-0.05), at(10))]);
        let json = serde_json::to_value(&detect(&a, &b, dec!(0.25))[0]).unwrap();
        assert!(json["strategy"].is_null());
        assert_eq!(json["difference"], serde_json::json!("-0.35"));
    }
}

use chrono::NaiveDate;
use lotwise_domain::services::metrics::max_drawdown_pct;
use lotwise_domain::services::outcomes::OutcomeTally;
use lotwise_domain::value_objects::bar_record::BarAction;
use lotwise_domain::value_objects::price_bar::PriceBar;
use lotwise_domain::value_objects::strategy_params::StrategyParameters;
use lotwise_domain::value_objects::trade::Side;
use lotwise_domain::{run, BacktestOutcome};
use proptest::prelude::*;

/// (low, close position in [0,1], range above low, days since previous bar)
type RawBar = (f64, f64, f64, i64);

fn build_bars(raw: &[RawBar]) -> Vec<PriceBar> {
    let mut date = NaiveDate::from_ymd_opt(2023, 1, 2).expect("valid date");
    raw.iter()
        .map(|(low, close_frac, range, step)| {
            date += chrono::Duration::days(*step);
            let high = low + range;
            let close = low + range * close_frac;
            PriceBar {
                date,
                open: (low + high) / 2.0,
                high,
                low: *low,
                close,
                volume: 1_000.0,
            }
        })
        .collect()
}

fn raw_bars() -> impl Strategy<Value = Vec<RawBar>> {
    prop::collection::vec((1.0f64..50.0, 0.0f64..=1.0, 0.0f64..5.0, 1i64..4), 1..120)
}

fn strategy_params() -> impl Strategy<Value = StrategyParameters> {
    (100.0f64..200_000.0, 1.0f64..50.0, 0.01f64..20.0).prop_map(|(capital, buy, gap)| {
        StrategyParameters::new(capital, buy, buy + gap)
    })
}

fn simulate(raw: &[RawBar], params: StrategyParameters) -> BacktestOutcome {
    run(build_bars(raw), params).expect("generated input is valid")
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    #[test]
    fn repeated_runs_are_identical(raw in raw_bars(), params in strategy_params()) {
        let first = simulate(&raw, params);
        let second = simulate(&raw, params);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn position_is_whole_lots(raw in raw_bars(), params in strategy_params()) {
        let outcome = simulate(&raw, params);
        prop_assert_eq!(outcome.records.len(), raw.len());
        for record in &outcome.records {
            prop_assert_eq!(record.position_after % params.lot_size, 0);
        }
    }

    #[test]
    fn at_most_one_trade_per_bar(raw in raw_bars(), params in strategy_params()) {
        let outcome = simulate(&raw, params);
        let acted = outcome
            .records
            .iter()
            .filter(|r| r.action != BarAction::None)
            .count();
        prop_assert_eq!(acted, outcome.trades.len());
        for pair in outcome.trades.windows(2) {
            prop_assert!(pair[0].date < pair[1].date);
        }
        for record in &outcome.records {
            prop_assert_eq!(record.action_price.is_some(), record.action != BarAction::None);
        }
    }

    #[test]
    fn buys_never_exceed_available_cash(raw in raw_bars(), params in strategy_params()) {
        let outcome = simulate(&raw, params);
        let mut cash_before = params.initial_capital;
        let mut trades = outcome.trades.iter();
        for record in &outcome.records {
            if record.action == BarAction::Buy {
                let trade = trades.next().expect("trade for buy record");
                prop_assert_eq!(trade.side, Side::Buy);
                prop_assert!(trade.notional <= cash_before + 1e-9);
                prop_assert!(trade.units > 0);
            } else if record.action == BarAction::Sell {
                trades.next();
            }
            cash_before = record.cash_after;
        }
    }

    #[test]
    fn drawdown_is_a_percentage(raw in raw_bars(), params in strategy_params()) {
        let outcome = simulate(&raw, params);
        let dd = outcome.summary.max_drawdown_pct;
        prop_assert!((0.0..=100.0).contains(&dd));
        prop_assert!(outcome.summary.sharpe_ratio.is_finite());
        prop_assert!(outcome.summary.annualized_return_pct.is_finite());
    }

    #[test]
    fn drawdown_bound_holds_for_any_positive_curve(values in prop::collection::vec(0.01f64..1e6, 0..200)) {
        let dd = max_drawdown_pct(&values);
        prop_assert!((0.0..=100.0).contains(&dd));
    }

    #[test]
    fn paired_outcomes_match_sells_after_open_buys(raw in raw_bars(), params in strategy_params()) {
        let outcome = simulate(&raw, params);

        let mut open_buy = false;
        let mut paired = 0usize;
        for record in &outcome.records {
            match record.action {
                BarAction::Buy => open_buy = true,
                BarAction::Sell if open_buy => {
                    paired += 1;
                    open_buy = false;
                }
                _ => {}
            }
        }

        let summary = &outcome.summary;
        prop_assert_eq!(summary.win_count + summary.lose_count, paired);

        let replayed = OutcomeTally::from_records(&outcome.records);
        prop_assert_eq!(replayed.win_count(), summary.win_count);
        prop_assert_eq!(replayed.lose_count(), summary.lose_count);
    }
}

use lotwise_domain::services::metrics::SummaryStatistics;

pub fn print_banner() {
    eprintln!(
        "{} {} ({} {}, built {})",
        lotwise_domain::engine_name(),
        env!("CARGO_PKG_VERSION"),
        env!("LOTWISE_GIT_SHA"),
        env!("LOTWISE_TARGET"),
        env!("LOTWISE_BUILD_UNIX_EPOCH"),
    );
}

/// Two-decimal view of the statistics; full precision lives in summary.json.
pub fn print_summary(summary: &SummaryStatistics) {
    let s = summary.rounded();
    let dates = match (s.start_date, s.end_date) {
        (Some(start), Some(end)) => format!("{start} .. {end} ({} days)", s.elapsed_days),
        _ => "n/a".to_string(),
    };
    println!("period:              {dates}");
    println!("bars processed:      {}", s.bars_processed);
    println!("initial capital:     {:.2}", s.initial_capital);
    println!("final value:         {:.2}", s.final_portfolio_value);
    println!("total return:        {:.2}%", s.total_return_pct);
    println!("annualized return:   {:.2}%", s.annualized_return_pct);
    println!("max drawdown:        {:.2}%", s.max_drawdown_pct);
    println!("sharpe ratio:        {:.2}", s.sharpe_ratio);
    println!(
        "trades:              {} buys, {} sells ({} win / {} lose, win rate {:.2}%)",
        s.buy_count, s.sell_count, s.win_count, s.lose_count, s.win_rate_pct
    );
    println!(
        "buy and hold:        {:.2} ({:.2}%), excess {:.2}%",
        s.buy_and_hold_final_value, s.buy_and_hold_return_pct, s.excess_return_pct
    );
}

use mini25_core::dashboard::render_histogram;
use mini25_core::{summarize_local, BarChart, Config, Summary};

use super::open_history;

pub fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let history = open_history(&config);
    let summary = summarize_local(history.entries());

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", render(&summary));
    }
    Ok(())
}

/// The Progress view as plain text.
pub(crate) fn render(summary: &Summary) -> String {
    let chart = BarChart::default();
    format!(
        "Your Progress\n\n  {today:>3}  Sessions Today\n  {week:>3}  Sessions This Week\n\nLast 7 Days\n{chart}",
        today = summary.today,
        week = summary.this_week,
        chart = render_histogram(Some(&chart), &summary.last_7_days),
    )
}

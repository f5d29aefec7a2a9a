use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use crate::client::UserApi;
use crate::controllers::dashboard;
use crate::error::Result;
use crate::output::{bar, is_json_output, print_item, print_table};
use crate::types::{ChartPoint, UserStats};

const BAR_WIDTH: usize = 30;

#[derive(Tabled)]
struct StatRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Count")]
    count: u64,
}

#[derive(Tabled)]
struct ChartRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "New users")]
    users: u64,
    #[tabled(rename = "")]
    bar: String,
}

#[derive(Serialize)]
struct DashboardOutput<'a> {
    stats: Option<&'a UserStats>,
    chart: Option<&'a [ChartPoint]>,
    errors: Vec<String>,
}

fn stat_rows(stats: &UserStats) -> Vec<StatRow> {
    vec![
        StatRow { metric: "Total", count: stats.total },
        StatRow { metric: "Active", count: stats.active },
        StatRow { metric: "Inactive", count: stats.inactive },
        StatRow { metric: "Admins", count: stats.admins },
        StatRow { metric: "Users", count: stats.users },
    ]
}

fn print_stats(stats: &UserStats) {
    print_item(stats, |s| {
        let rows = stat_rows(s);
        println!("{}", Table::new(rows).with(Style::rounded()));
    });
}

fn print_chart(points: &[ChartPoint]) {
    let max = points.iter().map(|p| p.users).max().unwrap_or(0);
    print_table(points, |p| ChartRow {
        date: p.date.clone(),
        users: p.users,
        bar: bar(p.users, max, BAR_WIDTH),
    });
}

pub async fn stats<A: UserApi + ?Sized>(api: &A) -> Result<()> {
    let stats = api.stats().await?;
    print_stats(&stats);
    Ok(())
}

pub async fn chart<A: UserApi + ?Sized>(api: &A, days: u32) -> Result<()> {
    let points = api.chart(days).await?;
    if points.is_empty() && !is_json_output() {
        println!("No signups in the last {days} days");
        return Ok(());
    }
    print_chart(&points);
    Ok(())
}

/// Stats and chart together. Fails only when both halves failed.
pub async fn dashboard<A: UserApi + ?Sized>(api: &A, days: u32) -> Result<()> {
    let dashboard = dashboard::load(api, days).await;

    if is_json_output() {
        print_item(
            &DashboardOutput {
                stats: dashboard.stats.as_ref().ok(),
                chart: dashboard.chart.as_deref().ok(),
                errors: dashboard.errors().iter().map(|e| e.to_string()).collect(),
            },
            |_| {},
        );
    } else {
        match &dashboard.stats {
            Ok(stats) => print_stats(stats),
            Err(e) => eprintln!("{} {e}", "Stats unavailable:".red()),
        }
        println!();
        match &dashboard.chart {
            Ok(points) => print_chart(points),
            Err(e) => eprintln!("{} {e}", "Chart unavailable:".red()),
        }
    }

    match (dashboard.stats, dashboard.chart) {
        (Err(e), Err(_)) => Err(e.into()),
        _ => Ok(()),
    }
}

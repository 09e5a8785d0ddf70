//! Chart generation and rendering for the dashboard.
//!
//! Two ECharts visualisations are built with `charming`:
//! - **Income vs expenses**: a grouped bar chart per month
//! - **Expenses by category**: a pie chart of all-time expenses
//!
//! Each chart is serialised to an ECharts option object and rendered with an
//! HTML container plus a small initialisation script.

use charming::{
    Chart,
    component::{Axis, Grid, Legend, Title},
    element::{
        AxisLabel, AxisPointer, AxisPointerType, AxisType, Emphasis, EmphasisFocus, JsFunction,
        Tooltip, Trigger,
    },
    series::{Bar, Pie},
};
use maud::{Markup, PreEscaped, html};

use crate::{
    dashboard::aggregation::{CategoryTotal, MonthlyTotals},
    html::HeadElement,
};

/// A dashboard chart with its HTML container ID and ECharts configuration.
pub(super) struct DashboardChart {
    /// The HTML element ID to use for the chart (kebab-case)
    pub id: &'static str,
    /// The ECharts configuration as a JSON string
    pub options: String,
}

/// Renders the HTML containers for dashboard charts.
pub(super) fn charts_view(charts: &[DashboardChart]) -> Markup {
    html!(
        section id="charts" class="chart-grid"
        {
            @for chart in charts {
                div id=(chart.id) class="card chart" {}
            }
        }
    )
}

/// Generates the JavaScript that initialises each chart once the page has
/// loaded and keeps it sized to its container.
pub(super) fn charts_script(charts: &[DashboardChart]) -> HeadElement {
    let script_content = charts
        .iter()
        .map(|chart| {
            format!(
                r#"(function() {{
                    const chart = echarts.init(document.getElementById("{}"));
                    chart.setOption({});
                    window.addEventListener('resize', chart.resize);
                }})();"#,
                chart.id, chart.options
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    HeadElement::ScriptSource(PreEscaped(format!(
        "document.addEventListener('DOMContentLoaded', function() {{\n{script_content}\n}});"
    )))
}

/// Month names as shown on the chart axis.
const MONTH_ABBREVIATIONS: [&str; 12] = [
    "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez",
];

/// Turn `YYYY-MM` into a short label such as "mar/2025". Text in any other
/// shape is returned unchanged.
pub(super) fn format_month_label(month: &str) -> String {
    let Some((year, month_number)) = month.split_once('-') else {
        return month.to_owned();
    };

    match month_number.parse::<usize>() {
        Ok(number @ 1..=12) => format!("{}/{year}", MONTH_ABBREVIATIONS[number - 1]),
        _ => month.to_owned(),
    }
}

pub(super) fn income_expenses_chart(months: &[MonthlyTotals]) -> Chart {
    let labels: Vec<String> = months
        .iter()
        .map(|totals| format_month_label(&totals.month))
        .collect();
    let income: Vec<f64> = months.iter().map(|totals| totals.income).collect();
    let expenses: Vec<f64> = months.iter().map(|totals| totals.expenses).collect();

    Chart::new()
        .title(
            Title::new()
                .text("Receitas x Despesas")
                .subtext("Últimos doze meses"),
        )
        .tooltip(currency_tooltip())
        .legend(Legend::new().right("4%"))
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .top(80)
                .contain_label(true),
        )
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter())),
        )
        .series(
            Bar::new()
                .name("Receitas")
                .emphasis(Emphasis::new().focus(EmphasisFocus::Series))
                .data(income),
        )
        .series(
            Bar::new()
                .name("Despesas")
                .emphasis(Emphasis::new().focus(EmphasisFocus::Series))
                .data(expenses),
        )
}

pub(super) fn expenses_by_category_chart(totals: &[CategoryTotal]) -> Chart {
    let data: Vec<(f64, String)> = totals
        .iter()
        .map(|total| (total.total, total.category.clone()))
        .collect();

    Chart::new()
        .title(Title::new().text("Despesas por categoria"))
        .tooltip(
            Tooltip::new()
                .trigger(Trigger::Item)
                .value_formatter(currency_formatter()),
        )
        .legend(Legend::new().bottom("0%"))
        .series(
            Pie::new()
                .name("Despesas")
                .radius(vec!["40%", "70%"])
                .data(data),
        )
}

#[inline]
fn currency_formatter() -> JsFunction {
    JsFunction::new_with_args(
        "number",
        "const currencyFormatter = new Intl.NumberFormat('pt-BR', {
              style: 'currency',
              currency: 'BRL'
            });
            return (number) ? currencyFormatter.format(number) : \"-\";",
    )
}

/// Creates a tooltip configuration for currency values
fn currency_tooltip() -> Tooltip {
    Tooltip::new()
        .trigger(Trigger::Axis)
        .value_formatter(currency_formatter())
        .axis_pointer(AxisPointer::new().type_(AxisPointerType::Shadow))
}

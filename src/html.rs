//! Shared page layout and formatting helpers for the server-rendered pages.

use std::sync::OnceLock;

use maud::{DOCTYPE, Markup, PreEscaped, html};
use numfmt::{Formatter, Precision, Scales};

/// The ECharts build loaded by pages that draw charts.
pub const ECHARTS_URL: &str = "https://cdn.jsdelivr.net/npm/echarts@5.5.1/dist/echarts.min.js";

// Form styles
pub const FORM_LABEL_STYLE: &str = "field-label";
pub const FORM_TEXT_INPUT_STYLE: &str = "field-input";
pub const BUTTON_PRIMARY_STYLE: &str = "button-primary";

const BASE_STYLE: &str = r#"
    body {
        font-family: system-ui, sans-serif;
        margin: 0;
        background: #f9fafb;
        color: #111827;
    }
    main {
        max-width: 64rem;
        margin: 0 auto;
        padding: 2rem 1rem;
    }
    .card {
        background: #fff;
        border-radius: 0.5rem;
        box-shadow: 0 1px 3px rgba(0, 0, 0, 0.1);
        padding: 1.5rem;
    }
    .field-label {
        display: block;
        margin-bottom: 0.25rem;
        font-size: 0.875rem;
        font-weight: 500;
    }
    .field-input {
        display: block;
        width: 100%;
        box-sizing: border-box;
        padding: 0.5rem;
        margin-bottom: 1rem;
        border: 1px solid #d1d5db;
        border-radius: 0.25rem;
    }
    .button-primary {
        width: 100%;
        padding: 0.5rem 1rem;
        border: none;
        border-radius: 0.25rem;
        background: #2563eb;
        color: #fff;
        cursor: pointer;
    }
    .error-message {
        color: #dc2626;
    }
    .page-header {
        display: flex;
        justify-content: space-between;
        align-items: center;
    }
    .totals, .chart-grid {
        display: grid;
        grid-template-columns: repeat(auto-fit, minmax(16rem, 1fr));
        gap: 1rem;
        margin-bottom: 1rem;
    }
    .total-value {
        font-size: 1.5rem;
        font-weight: 600;
    }
    .chart {
        min-height: 380px;
    }
    section.card {
        margin-bottom: 1rem;
    }
    table {
        width: 100%;
        border-collapse: collapse;
    }
    th, td {
        padding: 0.5rem;
        text-align: left;
        border-bottom: 1px solid #e5e7eb;
    }
    .amount {
        text-align: right;
    }
    .income {
        color: #16a34a;
    }
    .expense {
        color: #dc2626;
    }
"#;

/// Extra elements to put in a page's `<head>`.
pub enum HeadElement {
    /// The file path or URL to a JavaScript script.
    ScriptLink(String),
    /// JavaScript source code.
    ScriptSource(PreEscaped<String>),
}

/// Wrap `content` in the HTML document shared by every page.
pub fn base(title: &str, head_elements: &[HeadElement], content: &Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="pt-BR"
        {
            head
            {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) " - Finance Tracker" }
                style { (PreEscaped(BASE_STYLE)) }

                @for element in head_elements
                {
                    @match element
                    {
                        HeadElement::ScriptSource(text) => script { (text) }
                        HeadElement::ScriptLink(path) => script src=(path) {}
                    }
                }
            }

            body
            {
                main { (content) }
            }
        }
    }
}

/// Centre a form in a card with a heading, for the log-in page.
pub fn log_in_register(form_title: &str, form: &Markup) -> Markup {
    html! {
        div class="card" style="max-width: 28rem; margin: 4rem auto;"
        {
            h1 { (form_title) }

            (form)
        }
    }
}

/// A labelled input that fills the width of its form.
pub fn text_input(label: &str, name: &str, input_type: &str) -> Markup {
    html! {
        label for=(name) class=(FORM_LABEL_STYLE) { (label) }
        input type=(input_type) name=(name) id=(name) class=(FORM_TEXT_INPUT_STYLE) required;
    }
}

/// Format `amount` as Brazilian reais, e.g. "R$ 1.234,50" or "-R$ 42,00".
pub fn format_currency(amount: f64) -> String {
    static DIGITS_FMT: OnceLock<Formatter> = OnceLock::new();

    let digits_fmt = DIGITS_FMT.get_or_init(|| {
        Formatter::new()
            .separator(',')
            .unwrap_or_else(|_| Formatter::new())
            .scales(Scales::none())
            .precision(Precision::Decimals(2))
    });

    let rounded = (amount * 100.0).round() / 100.0;

    // numfmt renders zero as "0", and rounding can leave "-0".
    if rounded == 0.0 {
        return "R$ 0,00".to_owned();
    }

    // numfmt drops trailing zeros in the cents, e.g. "1,234.5" or "500".
    let digits = digits_fmt.fmt_string(rounded.abs());
    let (whole, cents) = digits.split_once('.').unwrap_or((&digits, ""));
    let whole = whole.replace(',', ".");
    let sign = if rounded < 0.0 { "-" } else { "" };

    format!("{sign}R$ {whole},{cents:0<2}")
}

#[cfg(test)]
mod tests {
    use maud::html;

    use crate::html::{base, format_currency};

    #[test]
    fn formats_currency_with_two_decimals() {
        assert_eq!(format_currency(12.3), "R$ 12,30");
        assert_eq!(format_currency(0.5), "R$ 0,50");
        assert_eq!(format_currency(500.0), "R$ 500,00");
    }

    #[test]
    fn groups_thousands_with_dots() {
        assert_eq!(format_currency(1234567.5), "R$ 1.234.567,50");
        assert_eq!(format_currency(999.999), "R$ 1.000,00");
    }

    #[test]
    fn puts_the_sign_before_the_symbol() {
        assert_eq!(format_currency(-42.0), "-R$ 42,00");
        assert_eq!(format_currency(-1500.75), "-R$ 1.500,75");
    }

    #[test]
    fn tiny_amounts_round_to_zero() {
        assert_eq!(format_currency(-0.001), "R$ 0,00");
        assert_eq!(format_currency(0.0), "R$ 0,00");
    }

    #[test]
    fn base_includes_title_and_content() {
        let page = base("Painel", &[], &html! { p { "Olá" } }).into_string();

        assert!(page.contains("<title>Painel - Finance Tracker</title>"));
        assert!(page.contains("<p>Olá</p>"));
    }
}

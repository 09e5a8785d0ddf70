//! Dashboard HTTP handler and view rendering.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, PreEscaped, html};
use rusqlite::Connection;
use time::{Duration, OffsetDateTime, macros::format_description};

use crate::{
    AppState, Error,
    account::{Account, list_accounts},
    category::list_categories,
    dashboard::{
        aggregation::{
            RecentTransaction, Totals, get_expenses_by_category, get_monthly_totals,
            get_recent_transactions, get_totals,
        },
        charts::{
            DashboardChart, charts_script, charts_view, expenses_by_category_chart,
            income_expenses_chart,
        },
    },
    db::lock_connection,
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, ECHARTS_URL, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, HeadElement,
        base, format_currency,
    },
    transaction::TransactionKind,
    user::UserID,
};

/// How far back the monthly chart looks.
const CHART_PERIOD_DAYS: i64 = 365;

/// How many transactions the recent transactions table shows.
const RECENT_TRANSACTION_LIMIT: u32 = 10;

/// The state needed for displaying the dashboard page.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The database connection for reading the user's data.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Everything the dashboard shows, read under a single lock.
struct DashboardData {
    totals: Totals,
    recent_transactions: Vec<RecentTransaction>,
    charts: Vec<DashboardChart>,
    categories: Vec<(i64, String)>,
    accounts: Vec<Account>,
}

fn build_dashboard_data(user_id: UserID, connection: &Connection) -> Result<DashboardData, Error> {
    let since = OffsetDateTime::now_utc() - Duration::days(CHART_PERIOD_DAYS);

    let totals = get_totals(user_id, connection)?;
    let monthly_totals = get_monthly_totals(user_id, since, connection)?;
    let category_totals = get_expenses_by_category(user_id, connection)?;
    let recent_transactions =
        get_recent_transactions(user_id, RECENT_TRANSACTION_LIMIT, connection)?;
    let categories = list_categories(user_id, connection)?
        .into_iter()
        .map(|category| (category.id, category.name))
        .collect();
    let accounts = list_accounts(user_id, connection)?;

    let mut charts = Vec::new();
    if !monthly_totals.is_empty() {
        charts.push(DashboardChart {
            id: "income-expenses-chart",
            options: income_expenses_chart(&monthly_totals).to_string(),
        });
    }
    if !category_totals.is_empty() {
        charts.push(DashboardChart {
            id: "expenses-by-category-chart",
            options: expenses_by_category_chart(&category_totals).to_string(),
        });
    }

    Ok(DashboardData {
        totals,
        recent_transactions,
        charts,
        categories,
        accounts,
    })
}

/// Display a page with an overview of the logged-in user's finances.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let data = {
        let connection = lock_connection(&state.db_connection)?;
        build_dashboard_data(user_id, &connection)
            .inspect_err(|error| tracing::error!("could not build dashboard: {error}"))?
    };

    Ok(dashboard_view(&data).into_response())
}

fn dashboard_view(data: &DashboardData) -> Markup {
    let mut head_elements = vec![HeadElement::ScriptSource(PreEscaped(
        DASHBOARD_SCRIPT.to_owned(),
    ))];
    if !data.charts.is_empty() {
        head_elements.push(HeadElement::ScriptLink(ECHARTS_URL.to_owned()));
        head_elements.push(charts_script(&data.charts));
    }

    let content = html! {
        header class="page-header"
        {
            h1 { "Painel" }

            button type="button" id="log-out-button" data-endpoint=(endpoints::LOG_OUT)
            {
                "Sair"
            }
        }

        (totals_view(&data.totals))

        @if data.charts.is_empty() {
            p class="card" id="no-data"
            {
                "Nenhuma transação registrada ainda. Adicione a primeira abaixo."
            }
        } @else {
            (charts_view(&data.charts))
        }

        (recent_transactions_view(&data.recent_transactions))

        (transaction_form_view(&data.categories, &data.accounts))
    };

    base("Dashboard", &head_elements, &content)
}

fn totals_view(totals: &Totals) -> Markup {
    let cards = [
        ("total-balance", "Saldo total", totals.balance),
        ("total-income", "Receitas", totals.income),
        ("total-expenses", "Despesas", totals.expenses),
    ];

    html! {
        section id="totals" class="totals"
        {
            @for (id, label, amount) in cards {
                div class="card"
                {
                    p class="total-label" { (label) }
                    p id=(id) class="total-value" { (format_currency(amount)) }
                }
            }
        }
    }
}

fn recent_transactions_view(transactions: &[RecentTransaction]) -> Markup {
    let date_format = format_description!("[day]/[month]/[year]");

    html! {
        section id="recent-transactions" class="card"
        {
            h2 { "Transações recentes" }

            @if transactions.is_empty() {
                p { "Nada por aqui." }
            } @else {
                table
                {
                    thead
                    {
                        tr
                        {
                            th { "Data" }
                            th { "Descrição" }
                            th { "Categoria" }
                            th { "Conta" }
                            th class="amount" { "Valor" }
                        }
                    }
                    tbody
                    {
                        @for transaction in transactions {
                            @let signed = transaction.kind.signed(transaction.amount);
                            tr
                            {
                                td { (transaction.date.format(date_format).unwrap_or_default()) }
                                td { (transaction.description) }
                                td { (transaction.category) }
                                td { (transaction.account) }
                                td class=(amount_class(transaction.kind)) { (format_currency(signed)) }
                            }
                        }
                    }
                }
            }
        }
    }
}

fn amount_class(kind: TransactionKind) -> &'static str {
    match kind {
        TransactionKind::Income => "amount income",
        TransactionKind::Expense => "amount expense",
    }
}

fn transaction_form_view(categories: &[(i64, String)], accounts: &[Account]) -> Markup {
    html! {
        section class="card"
        {
            h2 { "Nova transação" }

            form id="transaction-form" data-endpoint=(endpoints::TRANSACTIONS)
            {
                label for="descricao" class=(FORM_LABEL_STYLE) { "Descrição" }
                input type="text" name="descricao" id="descricao" class=(FORM_TEXT_INPUT_STYLE) required;

                label for="valor" class=(FORM_LABEL_STYLE) { "Valor" }
                input type="number" name="valor" id="valor" step="0.01" min="0"
                    class=(FORM_TEXT_INPUT_STYLE) required;

                label for="tipo" class=(FORM_LABEL_STYLE) { "Tipo" }
                select name="tipo" id="tipo" class=(FORM_TEXT_INPUT_STYLE) required
                {
                    option value=(TransactionKind::Expense.as_str()) { "Despesa" }
                    option value=(TransactionKind::Income.as_str()) { "Receita" }
                }

                label for="categoria_id" class=(FORM_LABEL_STYLE) { "Categoria" }
                select name="categoria_id" id="categoria_id" class=(FORM_TEXT_INPUT_STYLE) required
                {
                    @for (id, name) in categories {
                        option value=(id) { (name) }
                    }
                }

                label for="conta_id" class=(FORM_LABEL_STYLE) { "Conta" }
                select name="conta_id" id="conta_id" class=(FORM_TEXT_INPUT_STYLE) required
                {
                    @for account in accounts {
                        option value=(account.id) { (account.name) " (" (format_currency(account.balance)) ")" }
                    }
                }

                label for="data" class=(FORM_LABEL_STYLE) { "Data" }
                input type="date" name="data" id="data" class=(FORM_TEXT_INPUT_STYLE);

                p id="error-message" class="error-message" {}

                button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Adicionar" }
            }
        }
    }
}

const DASHBOARD_SCRIPT: &str = r#"
document.addEventListener("DOMContentLoaded", () => {
    const form = document.getElementById("transaction-form");
    const errorMessage = document.getElementById("error-message");
    const logOutButton = document.getElementById("log-out-button");

    form.addEventListener("submit", async (event) => {
        event.preventDefault();
        errorMessage.textContent = "";

        const body = {
            descricao: form.elements.descricao.value,
            valor: form.elements.valor.value,
            tipo: form.elements.tipo.value,
            categoria_id: Number(form.elements.categoria_id.value),
            conta_id: Number(form.elements.conta_id.value),
        };
        if (form.elements.data.value) {
            body.data = form.elements.data.value;
        }

        const response = await fetch(form.dataset.endpoint, {
            method: "POST",
            headers: { "Content-Type": "application/json" },
            body: JSON.stringify(body),
        });

        if (response.ok) {
            window.location.reload();
        } else {
            const error = await response.json();
            errorMessage.textContent = error.error;
        }
    });

    logOutButton.addEventListener("click", async () => {
        await fetch(logOutButton.dataset.endpoint, { method: "POST" });
        window.location.assign("/login");
    });
});
"#;

//! SQL aggregation of a user's transactions for the dashboard.
//!
//! All sums are computed by SQLite over the user's rows only.

use rusqlite::{Connection, params};
use time::OffsetDateTime;

use crate::{
    Error, account::get_total_account_balance, transaction::TransactionKind, user::UserID,
};

/// All-time totals for one user.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct Totals {
    /// The sum of every account balance.
    pub balance: f64,
    /// The sum of every income transaction.
    pub income: f64,
    /// The sum of every expense transaction.
    pub expenses: f64,
}

/// Income and expenses within one calendar month.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct MonthlyTotals {
    /// The month as `YYYY-MM`.
    pub month: String,
    pub income: f64,
    pub expenses: f64,
}

/// The expenses filed under one category.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct CategoryTotal {
    pub category: String,
    pub total: f64,
}

/// A transaction joined with the names of its category and account.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct RecentTransaction {
    pub date: OffsetDateTime,
    pub description: String,
    pub category: String,
    pub account: String,
    pub kind: TransactionKind,
    pub amount: f64,
}

pub(super) fn get_totals(user_id: UserID, connection: &Connection) -> Result<Totals, Error> {
    let balance = get_total_account_balance(user_id, connection)?;

    let (income, expenses) = connection.query_row(
        "SELECT
            COALESCE(SUM(CASE WHEN tipo = 'receita' THEN valor END), 0),
            COALESCE(SUM(CASE WHEN tipo = 'despesa' THEN valor END), 0)
        FROM transacoes WHERE usuario_id = ?1",
        params![user_id.as_i64()],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    Ok(Totals {
        balance,
        income,
        expenses,
    })
}

/// Sum income and expenses per month for transactions dated on or after
/// `since`, oldest month first.
pub(super) fn get_monthly_totals(
    user_id: UserID,
    since: OffsetDateTime,
    connection: &Connection,
) -> Result<Vec<MonthlyTotals>, Error> {
    // Dates are stored as UTC text starting with YYYY-MM, so the prefix is the month.
    connection
        .prepare(
            "SELECT
                substr(data, 1, 7) AS mes,
                COALESCE(SUM(CASE WHEN tipo = 'receita' THEN valor END), 0),
                COALESCE(SUM(CASE WHEN tipo = 'despesa' THEN valor END), 0)
            FROM transacoes
            WHERE usuario_id = ?1 AND data >= ?2
            GROUP BY mes
            ORDER BY mes",
        )?
        .query_map(params![user_id.as_i64(), since], |row| {
            Ok(MonthlyTotals {
                month: row.get(0)?,
                income: row.get(1)?,
                expenses: row.get(2)?,
            })
        })?
        .map(|maybe_totals| maybe_totals.map_err(Error::from))
        .collect()
}

/// Sum expenses per category, largest first. Categories without expenses are
/// left out.
pub(super) fn get_expenses_by_category(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<CategoryTotal>, Error> {
    connection
        .prepare(
            "SELECT c.nome, SUM(t.valor) AS total
            FROM transacoes t
            INNER JOIN categorias c ON c.id = t.categoria_id
            WHERE t.usuario_id = ?1 AND t.tipo = 'despesa'
            GROUP BY c.id
            ORDER BY total DESC, c.nome",
        )?
        .query_map(params![user_id.as_i64()], |row| {
            Ok(CategoryTotal {
                category: row.get(0)?,
                total: row.get(1)?,
            })
        })?
        .map(|maybe_total| maybe_total.map_err(Error::from))
        .collect()
}

/// Get the `limit` most recent transactions, newest first.
pub(super) fn get_recent_transactions(
    user_id: UserID,
    limit: u32,
    connection: &Connection,
) -> Result<Vec<RecentTransaction>, Error> {
    connection
        .prepare(
            "SELECT t.data, t.descricao, c.nome, a.nome, t.tipo, t.valor
            FROM transacoes t
            INNER JOIN categorias c ON c.id = t.categoria_id
            INNER JOIN contas a ON a.id = t.conta_id
            WHERE t.usuario_id = ?1
            ORDER BY t.data DESC, t.id DESC
            LIMIT ?2",
        )?
        .query_map(params![user_id.as_i64(), limit], |row| {
            Ok(RecentTransaction {
                date: row.get(0)?,
                description: row.get(1)?,
                category: row.get(2)?,
                account: row.get(3)?,
                kind: row.get(4)?,
                amount: row.get(5)?,
            })
        })?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use time::macros::datetime;

    use crate::{
        account::create_account,
        category::create_category,
        dashboard::aggregation::{
            CategoryTotal, MonthlyTotals, Totals, get_expenses_by_category, get_monthly_totals,
            get_recent_transactions, get_totals,
        },
        test_utils::{must_create_test_connection, must_create_user},
        transaction::{NewTransaction, TransactionKind, create_transaction},
        user::UserID,
    };

    /// Maria gets two categories, an account starting at zero and four
    /// transactions over February and March 2025. João gets one transaction
    /// that must never show up in Maria's numbers.
    fn fixture() -> (Connection, UserID) {
        let mut connection = must_create_test_connection();
        let maria = must_create_user("maria@example.com", &connection);
        let joao = must_create_user("joao@example.com", &connection);
        let food = create_category("Alimentação", maria.id, &connection).unwrap();
        let fun = create_category("Lazer", maria.id, &connection).unwrap();
        let account = create_account("Conta corrente", 0.0, maria.id, &connection).unwrap();
        let joao_category = create_category("Outros", joao.id, &connection).unwrap();
        let joao_account = create_account("Conta", 0.0, joao.id, &connection).unwrap();

        let transactions = [
            ("Salário", 3000.0, TransactionKind::Income, food.id, datetime!(2025-02-05 12:00 UTC)),
            ("Mercado", 150.75, TransactionKind::Expense, food.id, datetime!(2025-02-10 12:00 UTC)),
            ("Cinema", 40.0, TransactionKind::Expense, fun.id, datetime!(2025-03-01 20:00 UTC)),
            ("Padaria", 9.25, TransactionKind::Expense, food.id, datetime!(2025-03-02 08:00 UTC)),
        ];
        for (description, amount, kind, category_id, date) in transactions {
            create_transaction(
                &NewTransaction {
                    description: description.to_owned(),
                    amount,
                    kind,
                    category_id,
                    account_id: account.id,
                    date,
                },
                maria.id,
                &mut connection,
            )
            .unwrap();
        }
        create_transaction(
            &NewTransaction {
                description: "Aluguel".to_owned(),
                amount: 999.0,
                kind: TransactionKind::Expense,
                category_id: joao_category.id,
                account_id: joao_account.id,
                date: datetime!(2025-03-01 12:00 UTC),
            },
            joao.id,
            &mut connection,
        )
        .unwrap();

        (connection, maria.id)
    }

    #[test]
    fn totals_cover_only_the_user() {
        let (connection, user_id) = fixture();

        let totals = get_totals(user_id, &connection).unwrap();

        assert_eq!(
            totals,
            Totals {
                balance: 2800.0,
                income: 3000.0,
                expenses: 200.0,
            }
        );
    }

    #[test]
    fn totals_are_zero_without_transactions() {
        let connection = must_create_test_connection();
        let maria = must_create_user("maria@example.com", &connection);

        let totals = get_totals(maria.id, &connection).unwrap();

        assert_eq!(
            totals,
            Totals {
                balance: 0.0,
                income: 0.0,
                expenses: 0.0,
            }
        );
    }

    #[test]
    fn monthly_totals_are_grouped_and_ordered() {
        let (connection, user_id) = fixture();

        let months =
            get_monthly_totals(user_id, datetime!(2025-01-01 00:00 UTC), &connection).unwrap();

        assert_eq!(
            months,
            vec![
                MonthlyTotals {
                    month: "2025-02".to_owned(),
                    income: 3000.0,
                    expenses: 150.75,
                },
                MonthlyTotals {
                    month: "2025-03".to_owned(),
                    income: 0.0,
                    expenses: 49.25,
                },
            ]
        );
    }

    #[test]
    fn monthly_totals_respect_the_start_date() {
        let (connection, user_id) = fixture();

        let months =
            get_monthly_totals(user_id, datetime!(2025-03-01 00:00 UTC), &connection).unwrap();

        assert_eq!(months.len(), 1);
        assert_eq!(months[0].month, "2025-03");
    }

    #[test]
    fn expenses_are_summed_per_category() {
        let (connection, user_id) = fixture();

        let totals = get_expenses_by_category(user_id, &connection).unwrap();

        assert_eq!(
            totals,
            vec![
                CategoryTotal {
                    category: "Alimentação".to_owned(),
                    total: 160.0,
                },
                CategoryTotal {
                    category: "Lazer".to_owned(),
                    total: 40.0,
                },
            ]
        );
    }

    #[test]
    fn recent_transactions_are_newest_first_and_limited() {
        let (connection, user_id) = fixture();

        let recent = get_recent_transactions(user_id, 2, &connection).unwrap();

        let descriptions: Vec<_> = recent.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(descriptions, ["Padaria", "Cinema"]);
        assert_eq!(recent[0].category, "Alimentação");
        assert_eq!(recent[0].account, "Conta corrente");
        assert_eq!(recent[0].kind, TransactionKind::Expense);
    }
}

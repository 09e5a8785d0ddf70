use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use time::{Duration, OffsetDateTime};

use finance_tracker::{
    NewTransaction, NewUser, PasswordHash, TransactionKind, ValidatedPassword, create_transaction,
    create_user, initialize_db, seed_default_data,
};

/// A utility for creating a demo database for the finance tracker server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// The demo user's login.
const DEMO_EMAIL: &str = "demo@example.com";
const DEMO_PASSWORD: &str = "correct horse battery staple";

/// Sample transactions as (description, amount, kind, category, account, days ago).
const SAMPLE_TRANSACTIONS: [(&str, f64, TransactionKind, &str, &str, i64); 8] = [
    ("Salário", 4500.0, TransactionKind::Income, "Outros", "Conta corrente", 62),
    ("Aluguel", 1500.0, TransactionKind::Expense, "Moradia", "Conta corrente", 60),
    ("Mercado", 150.75, TransactionKind::Expense, "Alimentação", "Cartão de crédito", 45),
    ("Salário", 4500.0, TransactionKind::Income, "Outros", "Conta corrente", 31),
    ("Aluguel", 1500.0, TransactionKind::Expense, "Moradia", "Conta corrente", 30),
    ("Farmácia", 62.4, TransactionKind::Expense, "Saúde", "Cartão de crédito", 12),
    ("Cinema", 48.0, TransactionKind::Expense, "Lazer", "Cartão de crédito", 5),
    ("Ônibus", 4.4, TransactionKind::Expense, "Transporte", "Conta corrente", 1),
];

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        Some(extension) if !extension.is_empty() => {}
        _ => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let mut conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating demo user {DEMO_EMAIL}...");

    let password_hash = PasswordHash::new(
        ValidatedPassword::new_unchecked(DEMO_PASSWORD),
        PasswordHash::DEFAULT_COST,
    )?;
    let user = create_user(
        &NewUser {
            name: "Demo".to_owned(),
            email: DEMO_EMAIL.to_owned(),
            password_hash,
        },
        &conn,
    )?;
    seed_default_data(user.id, &conn)?;

    println!("Adding sample transactions...");

    let now = OffsetDateTime::now_utc();
    for (description, amount, kind, category, account, days_ago) in SAMPLE_TRANSACTIONS {
        let category_id = conn.query_row(
            "SELECT id FROM categorias WHERE nome = ?1 AND usuario_id = ?2",
            (category, user.id.as_i64()),
            |row| row.get(0),
        )?;
        let account_id = conn.query_row(
            "SELECT id FROM contas WHERE nome = ?1 AND usuario_id = ?2",
            (account, user.id.as_i64()),
            |row| row.get(0),
        )?;

        create_transaction(
            &NewTransaction {
                description: description.to_owned(),
                amount,
                kind,
                category_id,
                account_id,
                date: now - Duration::days(days_ago),
            },
            user.id,
            &mut conn,
        )?;
    }

    println!("Success! Log in as {DEMO_EMAIL} with the password \"{DEMO_PASSWORD}\".");

    Ok(())
}

//! The JSON bodies for creating and editing transactions and their validation.

use serde::Deserialize;
use time::{
    Date, OffsetDateTime, format_description::well_known::Rfc3339, macros::format_description,
};

use crate::{
    Error,
    account::AccountId,
    category::CategoryId,
    db::{now_utc, truncate_to_seconds},
    json::{NumberInput, optional_text, required_text},
    transaction::core::{NewTransaction, TransactionKind, TransactionUpdate},
};

/// The body of a request to create a transaction.
#[derive(Debug, Default, Deserialize)]
pub struct TransactionData {
    /// What the transaction was for.
    pub descricao: Option<String>,
    /// The amount, as a number or a numeric string.
    pub valor: Option<NumberInput>,
    /// "receita" or "despesa".
    pub tipo: Option<String>,
    /// The category of the transaction.
    pub categoria_id: Option<CategoryId>,
    /// The account to post the transaction to.
    pub conta_id: Option<AccountId>,
    /// When the transaction happened, defaults to now.
    pub data: Option<String>,
}

/// The body of a request to edit a transaction. At least one field must be given.
#[derive(Debug, Default, Deserialize)]
pub struct EditTransactionData {
    /// What the transaction was for.
    pub descricao: Option<String>,
    /// The amount, as a number or a numeric string.
    pub valor: Option<NumberInput>,
    /// "receita" or "despesa".
    pub tipo: Option<String>,
    /// The category of the transaction.
    pub categoria_id: Option<CategoryId>,
    /// The account to post the transaction to.
    pub conta_id: Option<AccountId>,
    /// When the transaction happened.
    pub data: Option<String>,
}

fn missing(field: &str) -> Error {
    Error::Validation(format!("{field} is required"))
}

/// Parse an RFC 3339 timestamp, or a plain `YYYY-MM-DD` date taken as
/// midnight UTC.
fn parse_date(text: &str) -> Result<OffsetDateTime, Error> {
    let text = text.trim();

    if let Ok(date_time) = OffsetDateTime::parse(text, &Rfc3339) {
        return Ok(truncate_to_seconds(date_time));
    }

    Date::parse(text, format_description!("[year]-[month]-[day]"))
        .map(|date| date.midnight().assume_utc())
        .map_err(|_| Error::Validation("data must be a date such as 2025-03-01".to_owned()))
}

impl TransactionData {
    /// Check every field and convert the body into a [NewTransaction].
    ///
    /// # Errors
    /// Returns [Error::Validation] naming the first field that is missing or invalid.
    pub fn validate(self) -> Result<NewTransaction, Error> {
        let description = required_text(self.descricao, "descricao is required")?;
        let amount = self.valor.ok_or_else(|| missing("valor"))?.parse("valor")?;
        let kind = self
            .tipo
            .ok_or_else(|| missing("tipo"))?
            .parse::<TransactionKind>()?;
        let category_id = self.categoria_id.ok_or_else(|| missing("categoria_id"))?;
        let account_id = self.conta_id.ok_or_else(|| missing("conta_id"))?;
        let date = match self.data {
            Some(text) => parse_date(&text)?,
            None => now_utc(),
        };

        Ok(NewTransaction {
            description,
            amount,
            kind,
            category_id,
            account_id,
            date,
        })
    }
}

impl EditTransactionData {
    /// Check the given fields and convert the body into a [TransactionUpdate].
    ///
    /// # Errors
    /// Returns [Error::Validation] if no field is given or a field is invalid.
    pub fn validate(self) -> Result<TransactionUpdate, Error> {
        let update = TransactionUpdate {
            description: optional_text(self.descricao, "descricao must not be blank")?,
            amount: self.valor.map(|valor| valor.parse("valor")).transpose()?,
            kind: self
                .tipo
                .map(|tipo| tipo.parse::<TransactionKind>())
                .transpose()?,
            category_id: self.categoria_id,
            account_id: self.conta_id,
            date: self.data.map(|data| parse_date(&data)).transpose()?,
        };

        if update.is_empty() {
            return Err(Error::Validation(
                "at least one field to update is required".to_owned(),
            ));
        }

        Ok(update)
    }
}

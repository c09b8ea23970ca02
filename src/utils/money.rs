// Arithmétique monétaire commune (échelle fixe de 8 décimales)

use std::fmt;
use std::ops::Deref;

use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::sea_query::{ArrayType, ColumnType, Nullable, ValueType, ValueTypeErr};
use sea_orm::{ColIdx, DbErr, QueryResult, TryGetError, TryGetable, Value};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Nombre de décimales conservées pour les montants, prix et quantités
pub const MONEY_SCALE: u32 = 8;

/// Arrondit à 8 décimales (demi vers l'extérieur, comme NUMERIC côté Postgres)
pub fn to_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Refuse les valeurs <= 0 ou avec plus de 8 décimales
pub fn ensure_positive(field: &str, value: Decimal) -> Result<Decimal, AppError> {
    if value <= Decimal::ZERO {
        return Err(AppError::Validation(format!(
            "{} must be greater than 0 (got {})",
            field, value
        )));
    }

    let normalized = value.normalize();
    if normalized.scale() > MONEY_SCALE {
        return Err(AppError::Validation(format!(
            "{} supports at most {} decimal places (got {})",
            field, MONEY_SCALE, value
        )));
    }

    Ok(normalized)
}

/// Montant stocké en base sous forme de texte décimal exact.
///
/// Le driver SQLite lit et écrit les `Decimal` en f64; la colonne TEXT
/// garde tous les chiffres, quel que soit le backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(pub Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn amount(self) -> Decimal {
        self.0
    }
}

impl Deref for Money {
    type Target = Decimal;

    fn deref(&self) -> &Decimal {
        &self.0
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Money(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl PartialEq<Decimal> for Money {
    fn eq(&self, other: &Decimal) -> bool {
        self.0 == *other
    }
}

impl PartialOrd<Decimal> for Money {
    fn partial_cmp(&self, other: &Decimal) -> Option<std::cmp::Ordering> {
        self.0.partial_cmp(other)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Money> for Value {
    fn from(value: Money) -> Self {
        Value::String(Some(Box::new(value.0.to_string())))
    }
}

impl TryGetable for Money {
    fn try_get_by<I: ColIdx>(res: &QueryResult, index: I) -> Result<Self, TryGetError> {
        let raw = <String as TryGetable>::try_get_by(res, index)?;
        raw.parse::<Decimal>()
            .map(Money)
            .map_err(|e| TryGetError::DbErr(DbErr::Type(format!("invalid amount {:?}: {}", raw, e))))
    }
}

impl ValueType for Money {
    fn try_from(v: Value) -> Result<Self, ValueTypeErr> {
        match v {
            Value::String(Some(raw)) => raw.parse::<Decimal>().map(Money).map_err(|_| ValueTypeErr),
            _ => Err(ValueTypeErr),
        }
    }

    fn type_name() -> String {
        "Money".to_string()
    }

    fn array_type() -> ArrayType {
        ArrayType::String
    }

    fn column_type() -> ColumnType {
        ColumnType::Text
    }
}

impl Nullable for Money {
    fn null() -> Value {
        Value::String(None)
    }
}

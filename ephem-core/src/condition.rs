/// Condition expressions for conditional paste updates
///
/// A store accepts a `Condition` and a `Mutation` together and applies the
/// mutation only if the condition holds against the record as the store
/// currently sees it. The caller never decides on the basis of an earlier
/// read.
///
/// # Example
///
/// ```ignore
/// // (expires_at absent OR expires_at > now) AND (max_views absent OR current_views < max_views)
/// let condition = Condition::available_at(now);
/// let outcome = store.update_if(&id, &condition, Mutation::IncrementViews)?;
/// ```

use crate::{Error, PasteRecord, Result, Timestamp};
use serde::{Deserialize, Serialize};

/// Record fields a condition can refer to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Field {
    ExpiresAt,
    MaxViews,
    CurrentViews,
}

impl Field {
    fn name(&self) -> &'static str {
        match self {
            Field::ExpiresAt => "expires_at",
            Field::MaxViews => "max_views",
            Field::CurrentViews => "current_views",
        }
    }
}

/// Comparison operand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    Field(Field),
    Timestamp(Timestamp),
    Count(u64),
}

/// Condition expression AST
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    /// The field has no value (no TTL, no view limit)
    IsAbsent(Field),
    GreaterThan(Operand, Operand),
    LessThan(Operand, Operand),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
}

/// Resolved operand value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scalar {
    Ts(i64),
    Count(u64),
}

impl Condition {
    pub fn and(self, other: Condition) -> Condition {
        Condition::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Condition) -> Condition {
        Condition::Or(Box::new(self), Box::new(other))
    }

    pub fn negate(self) -> Condition {
        Condition::Not(Box::new(self))
    }

    /// The paste is neither expired nor exhausted at `now`.
    ///
    /// Must agree with [`crate::is_available`] for every record and instant.
    pub fn available_at(now: Timestamp) -> Condition {
        let not_expired = Condition::IsAbsent(Field::ExpiresAt).or(Condition::GreaterThan(
            Operand::Field(Field::ExpiresAt),
            Operand::Timestamp(now),
        ));
        let within_quota = Condition::IsAbsent(Field::MaxViews).or(Condition::LessThan(
            Operand::Field(Field::CurrentViews),
            Operand::Field(Field::MaxViews),
        ));
        not_expired.and(within_quota)
    }

    /// Evaluate against a record.
    ///
    /// A comparison involving an absent field is false. Comparing a
    /// timestamp with a count is an error.
    pub fn evaluate(&self, record: &PasteRecord) -> Result<bool> {
        match self {
            Condition::IsAbsent(field) => Ok(resolve_field(record, *field).is_none()),
            Condition::GreaterThan(left, right) => {
                Ok(compare(record, left, right)? == Some(std::cmp::Ordering::Greater))
            }
            Condition::LessThan(left, right) => {
                Ok(compare(record, left, right)? == Some(std::cmp::Ordering::Less))
            }
            Condition::And(left, right) => Ok(left.evaluate(record)? && right.evaluate(record)?),
            Condition::Or(left, right) => Ok(left.evaluate(record)? || right.evaluate(record)?),
            Condition::Not(inner) => Ok(!inner.evaluate(record)?),
        }
    }
}

fn resolve_field(record: &PasteRecord, field: Field) -> Option<Scalar> {
    match field {
        Field::ExpiresAt => record.expires_at.map(|ts| Scalar::Ts(ts.as_millis())),
        Field::MaxViews => record.max_views.map(Scalar::Count),
        Field::CurrentViews => Some(Scalar::Count(record.current_views)),
    }
}

fn resolve(record: &PasteRecord, operand: &Operand) -> Option<Scalar> {
    match operand {
        Operand::Field(field) => resolve_field(record, *field),
        Operand::Timestamp(ts) => Some(Scalar::Ts(ts.as_millis())),
        Operand::Count(n) => Some(Scalar::Count(*n)),
    }
}

/// None when either side is absent
fn compare(
    record: &PasteRecord,
    left: &Operand,
    right: &Operand,
) -> Result<Option<std::cmp::Ordering>> {
    match (resolve(record, left), resolve(record, right)) {
        (Some(Scalar::Ts(l)), Some(Scalar::Ts(r))) => Ok(Some(l.cmp(&r))),
        (Some(Scalar::Count(l)), Some(Scalar::Count(r))) => Ok(Some(l.cmp(&r))),
        (Some(_), Some(_)) => Err(Error::InvalidExpression(format!(
            "cannot compare {} with {}",
            describe(left),
            describe(right)
        ))),
        _ => Ok(None),
    }
}

fn describe(operand: &Operand) -> String {
    match operand {
        Operand::Field(field) => field.name().to_string(),
        Operand::Timestamp(ts) => format!("timestamp {}", ts.as_millis()),
        Operand::Count(n) => format!("count {}", n),
    }
}

/// The one permitted post-creation change to a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mutation {
    /// current_views += 1
    IncrementViews,
}

impl Mutation {
    pub fn apply(&self, record: &mut PasteRecord) -> Result<()> {
        match self {
            Mutation::IncrementViews => {
                record.current_views = record.current_views.checked_add(1).ok_or_else(|| {
                    Error::Internal(format!("view counter overflow for paste {}", record.id))
                })?;
                Ok(())
            }
        }
    }
}

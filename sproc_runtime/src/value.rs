use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// A single SQL value crossing the call boundary in either direction.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    /// A database array built by `Connection::create_array`.
    Array {
        element_type: String,
        elements: Vec<SqlValue>,
    },
}

impl SqlValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            SqlValue::Null => "NULL",
            SqlValue::Bool(_) => "BOOLEAN",
            SqlValue::Int(_) => "INTEGER",
            SqlValue::Float(_) => "DOUBLE",
            SqlValue::Text(_) => "VARCHAR",
            SqlValue::Bytes(_) => "BINARY",
            SqlValue::Date(_) => "DATE",
            SqlValue::Time(_) => "TIME",
            SqlValue::Timestamp(_) => "TIMESTAMP",
            SqlValue::Array { .. } => "ARRAY",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }
}

/// SQL type code declared for a procedure parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Boolean,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Float,
    Double,
    Varchar,
    Binary,
    Date,
    Time,
    Timestamp,
    Array,
    Other,
}

/// Conversion of a Rust argument into a bound SQL value.
pub trait ToSql {
    fn to_sql(&self) -> SqlValue;
}

/// Conversion of a column value into a Rust value. Returns `None` when the
/// column holds a value of an incompatible kind.
pub trait FromSql: Sized {
    fn from_sql(value: &SqlValue) -> Option<Self>;
}

impl<T: ToSql + ?Sized> ToSql for &T {
    fn to_sql(&self) -> SqlValue {
        (**self).to_sql()
    }
}

impl<T: ToSql> ToSql for Option<T> {
    fn to_sql(&self) -> SqlValue {
        match self {
            Some(value) => value.to_sql(),
            None => SqlValue::Null,
        }
    }
}

impl ToSql for bool {
    fn to_sql(&self) -> SqlValue {
        SqlValue::Bool(*self)
    }
}

macro_rules! int_to_sql {
    ($($ty:ty),*) => {
        $(
            impl ToSql for $ty {
                fn to_sql(&self) -> SqlValue {
                    SqlValue::Int(i64::from(*self))
                }
            }

            impl FromSql for $ty {
                fn from_sql(value: &SqlValue) -> Option<Self> {
                    match value {
                        SqlValue::Int(v) => <$ty>::try_from(*v).ok(),
                        _ => None,
                    }
                }
            }
        )*
    };
}

int_to_sql!(i8, i16, i32, i64);

impl ToSql for f32 {
    fn to_sql(&self) -> SqlValue {
        SqlValue::Float(f64::from(*self))
    }
}

impl ToSql for f64 {
    fn to_sql(&self) -> SqlValue {
        SqlValue::Float(*self)
    }
}

impl ToSql for str {
    fn to_sql(&self) -> SqlValue {
        SqlValue::Text(self.to_string())
    }
}

impl ToSql for String {
    fn to_sql(&self) -> SqlValue {
        SqlValue::Text(self.clone())
    }
}

impl ToSql for Vec<u8> {
    fn to_sql(&self) -> SqlValue {
        SqlValue::Bytes(self.clone())
    }
}

impl ToSql for NaiveDate {
    fn to_sql(&self) -> SqlValue {
        SqlValue::Date(*self)
    }
}

impl ToSql for NaiveTime {
    fn to_sql(&self) -> SqlValue {
        SqlValue::Time(*self)
    }
}

impl ToSql for NaiveDateTime {
    fn to_sql(&self) -> SqlValue {
        SqlValue::Timestamp(*self)
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> SqlValue {
        self.clone()
    }
}

impl<T: FromSql> FromSql for Option<T> {
    fn from_sql(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Null => Some(None),
            other => T::from_sql(other).map(Some),
        }
    }
}

impl FromSql for bool {
    fn from_sql(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Bool(v) => Some(*v),
            SqlValue::Int(v) => Some(*v != 0),
            _ => None,
        }
    }
}

impl FromSql for f32 {
    fn from_sql(value: &SqlValue) -> Option<Self> {
        f64::from_sql(value).map(|v| v as f32)
    }
}

impl FromSql for f64 {
    fn from_sql(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Float(v) => Some(*v),
            SqlValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }
}

impl FromSql for String {
    fn from_sql(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Text(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl FromSql for Vec<u8> {
    fn from_sql(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Bytes(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl FromSql for NaiveDate {
    fn from_sql(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Date(v) => Some(*v),
            SqlValue::Timestamp(v) => Some(v.date()),
            _ => None,
        }
    }
}

impl FromSql for NaiveTime {
    fn from_sql(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Time(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromSql for NaiveDateTime {
    fn from_sql(value: &SqlValue) -> Option<Self> {
        match value {
            SqlValue::Timestamp(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromSql for SqlValue {
    fn from_sql(value: &SqlValue) -> Option<Self> {
        Some(value.clone())
    }
}

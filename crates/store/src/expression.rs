use sea_orm::sea_query::{Alias, Expr, SimpleExpr};

use aisthesis_model::EntityProperty;

use crate::db::Observations;

/// Native column types the expression layer can resolve to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FieldType {
    Boolean,
    Number,
    String,
    Json,
    Time,
}

/// One physical column together with its native type.
#[derive(Clone, Debug)]
pub struct TypedColumn {
    pub field_type: FieldType,
    pub expr: SimpleExpr,
}

impl TypedColumn {
    pub fn new(field_type: FieldType, expr: impl Into<SimpleExpr>) -> Self {
        Self {
            field_type,
            expr: expr.into(),
        }
    }
}

/// A logical field that resolves to one or several physical columns, so
/// query, order, and filter code can treat it as a single typed operand.
/// Declaration order matters: the first column is the default expression.
#[derive(Clone, Debug)]
pub struct FieldWrapper {
    first: TypedColumn,
    rest: Vec<TypedColumn>,
}

impl FieldWrapper {
    pub fn new(first: TypedColumn, rest: Vec<TypedColumn>) -> Self {
        Self { first, rest }
    }

    pub fn single(field_type: FieldType, expr: impl Into<SimpleExpr>) -> Self {
        Self {
            first: TypedColumn::new(field_type, expr),
            rest: Vec::new(),
        }
    }

    fn columns(&self) -> impl Iterator<Item = &TypedColumn> {
        std::iter::once(&self.first).chain(self.rest.iter())
    }

    /// The expression used when no explicit operand type was requested.
    pub fn default_expr(&self) -> SimpleExpr {
        self.first.expr.clone()
    }

    /// Two passes: an exact type match first, then a best-effort coercion
    /// (currently numeric columns cast to text). `None` is not an error;
    /// the caller rejects the expression at a higher layer.
    pub fn resolve(&self, expected: FieldType) -> Option<SimpleExpr> {
        for column in self.columns() {
            if column.field_type == expected {
                return Some(column.expr.clone());
            }
        }
        for column in self.columns() {
            if expected == FieldType::String && column.field_type == FieldType::Number {
                return Some(column.expr.clone().cast_as(Alias::new("TEXT")));
            }
        }
        None
    }
}

/// The observation result: four columns behind one logical field.
pub fn observation_result() -> FieldWrapper {
    FieldWrapper::new(
        TypedColumn::new(
            FieldType::Number,
            Expr::col((Observations::Table, Observations::ResultNumber)),
        ),
        vec![
            TypedColumn::new(
                FieldType::String,
                Expr::col((Observations::Table, Observations::ResultString)),
            ),
            TypedColumn::new(
                FieldType::Boolean,
                Expr::col((Observations::Table, Observations::ResultBoolean)),
            ),
            TypedColumn::new(
                FieldType::Json,
                Expr::col((Observations::Table, Observations::ResultJson)),
            ),
        ],
    )
}

fn time_pair(start: Observations, end: Observations) -> FieldWrapper {
    FieldWrapper::new(
        TypedColumn::new(FieldType::Time, Expr::col((Observations::Table, start))),
        vec![TypedColumn::new(
            FieldType::Time,
            Expr::col((Observations::Table, end)),
        )],
    )
}

/// Maps a logical observation property onto its column expression(s).
pub fn observation_field(property: EntityProperty) -> Option<FieldWrapper> {
    match property {
        EntityProperty::Result => Some(observation_result()),
        EntityProperty::PhenomenonTime => Some(time_pair(
            Observations::PhenomenonTimeStart,
            Observations::PhenomenonTimeEnd,
        )),
        EntityProperty::ValidTime => Some(time_pair(
            Observations::ValidTimeStart,
            Observations::ValidTimeEnd,
        )),
        EntityProperty::ResultTime => Some(FieldWrapper::single(
            FieldType::Time,
            Expr::col((Observations::Table, Observations::ResultTime)),
        )),
        EntityProperty::Parameters => Some(FieldWrapper::single(
            FieldType::Json,
            Expr::col((Observations::Table, Observations::Parameters)),
        )),
        EntityProperty::ResultQuality => Some(FieldWrapper::single(
            FieldType::Json,
            Expr::col((Observations::Table, Observations::ResultQuality)),
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{observation_field, observation_result, FieldType, FieldWrapper, TypedColumn};
    use aisthesis_model::EntityProperty;
    use sea_orm::sea_query::{Expr, Query, QueryStatementWriter, SqliteQueryBuilder};

    fn render(expr: sea_orm::sea_query::SimpleExpr) -> String {
        Query::select().expr(expr).to_string(SqliteQueryBuilder)
    }

    #[test]
    fn exact_type_wins_over_coercion() {
        let wrapper = observation_result();
        let resolved = wrapper.resolve(FieldType::String).expect("string column");
        let sql = render(resolved);
        assert!(sql.contains("result_string"));
        assert!(!sql.contains("CAST"));
    }

    #[test]
    fn numeric_column_coerces_to_text() {
        let wrapper = FieldWrapper::single(
            FieldType::Number,
            Expr::col(crate::db::Observations::ResultNumber),
        );
        let resolved = wrapper.resolve(FieldType::String).expect("cast column");
        let sql = render(resolved);
        assert!(sql.contains("CAST"));
        assert!(sql.contains("result_number"));
    }

    #[test]
    fn unresolvable_type_is_no_match_not_an_error() {
        let wrapper = FieldWrapper::single(
            FieldType::Json,
            Expr::col(crate::db::Observations::ResultJson),
        );
        assert!(wrapper.resolve(FieldType::Boolean).is_none());
    }

    #[test]
    fn default_expression_is_first_declared_column() {
        let wrapper = FieldWrapper::new(
            TypedColumn::new(
                FieldType::Time,
                Expr::col(crate::db::Observations::PhenomenonTimeStart),
            ),
            vec![TypedColumn::new(
                FieldType::Time,
                Expr::col(crate::db::Observations::PhenomenonTimeEnd),
            )],
        );
        let sql = render(wrapper.default_expr());
        assert!(sql.contains("phenomenon_time_start"));
    }

    #[test]
    fn property_mapping_covers_multi_column_fields() {
        assert!(observation_field(EntityProperty::Result).is_some());
        assert!(observation_field(EntityProperty::PhenomenonTime).is_some());
        assert!(observation_field(EntityProperty::Name).is_none());
    }
}

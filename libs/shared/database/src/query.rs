use std::fmt::Display;

use chrono::{Days, NaiveDate, NaiveTime};

use crate::tables::Table;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Builds PostgREST request paths: `/rest/v1/<table>?select=..&col=op.value&order=..`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    table: Table,
    params: Vec<(String, String)>,
}

impl Query {
    pub fn table(table: &Table) -> Self {
        Self {
            table: *table,
            params: Vec::new(),
        }
    }

    pub fn target(&self) -> Table {
        self.table
    }

    pub fn select(self, columns: &str) -> Self {
        self.param("select", columns.to_string())
    }

    pub fn eq(self, column: &str, value: impl Display) -> Self {
        self.param(column, format!("eq.{}", value))
    }

    pub fn neq(self, column: &str, value: impl Display) -> Self {
        self.param(column, format!("neq.{}", value))
    }

    pub fn gte(self, column: &str, value: impl Display) -> Self {
        self.param(column, format!("gte.{}", value))
    }

    pub fn lt(self, column: &str, value: impl Display) -> Self {
        self.param(column, format!("lt.{}", value))
    }

    /// `column` within the calendar day `day`.
    pub fn on_day(self, column: &str, day: NaiveDate) -> Self {
        self.between_days(column, day, day)
    }

    /// `column` from the start of `first` up to the end of `last`.
    pub fn between_days(self, column: &str, first: NaiveDate, last: NaiveDate) -> Self {
        let start = first.and_time(NaiveTime::MIN);
        let end = last
            .checked_add_days(Days::new(1))
            .unwrap_or(NaiveDate::MAX)
            .and_time(NaiveTime::MIN);

        self.gte(column, start.format(TIMESTAMP_FORMAT))
            .lt(column, end.format(TIMESTAMP_FORMAT))
    }

    pub fn is_null(self, column: &str) -> Self {
        self.param(column, "is.null".to_string())
    }

    pub fn in_list<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Display,
    {
        let joined: Vec<String> = values.into_iter().map(|v| v.to_string()).collect();
        self.param(column, format!("in.({})", joined.join(",")))
    }

    /// Case-insensitive "contains" on one column.
    pub fn ilike(self, column: &str, term: &str) -> Self {
        self.param(column, format!("ilike.*{}*", strip_wildcards(term)))
    }

    /// Case-insensitive equality through an `ilike` with the LIKE
    /// metacharacters escaped. PostgREST turns `*` into `%` before the
    /// database sees it, so a value holding one falls back to `eq`.
    pub fn ieq(self, column: &str, value: &str) -> Self {
        if value.contains('*') {
            return self.eq(column, value);
        }
        let escaped = value
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        self.param(column, format!("ilike.{}", escaped))
    }

    /// Case-insensitive "contains" on any of `columns`.
    pub fn search(self, columns: &[&str], term: &str) -> Self {
        let clauses: Vec<String> = columns
            .iter()
            .map(|column| ilike_clause(column, term))
            .collect();
        self.or(clauses)
    }

    /// `or=(a,b,c)` from pre-rendered PostgREST clauses such as `state.eq.Visite`.
    pub fn or(self, clauses: Vec<String>) -> Self {
        if clauses.is_empty() {
            return self;
        }
        self.param("or", format!("({})", clauses.join(",")))
    }

    pub fn order(self, spec: &str) -> Self {
        self.param("order", spec.to_string())
    }

    pub fn limit(self, limit: i64) -> Self {
        self.param("limit", limit.to_string())
    }

    pub fn offset(self, offset: i64) -> Self {
        self.param("offset", offset.to_string())
    }

    /// Filters only, without select/order/limit/offset; used for counts.
    pub fn filters_only(&self) -> Self {
        Self {
            table: self.table,
            params: self
                .params
                .iter()
                .filter(|(k, _)| !matches!(k.as_str(), "select" | "order" | "limit" | "offset"))
                .cloned()
                .collect(),
        }
    }

    pub fn path(&self) -> String {
        let mut path = format!("/rest/v1/{}", self.table.name);
        if !self.params.is_empty() {
            let encoded: Vec<String> = self
                .params
                .iter()
                .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
                .collect();
            path.push('?');
            path.push_str(&encoded.join("&"));
        }
        path
    }

    fn param(mut self, key: &str, value: String) -> Self {
        self.params.push((key.to_string(), value));
        self
    }
}

/// Rendered `column.ilike."*term*"` clause for use inside `or=(...)`.
pub fn ilike_clause(column: &str, term: &str) -> String {
    let quoted = strip_wildcards(term).replace('\\', "\\\\").replace('"', "\\\"");
    format!("{}.ilike.\"*{}*\"", column, quoted)
}

fn strip_wildcards(term: &str) -> String {
    term.replace(['*', '%'], "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::{CONSULTATIONS, PATIENTS};

    #[test]
    fn bare_table_path() {
        assert_eq!(Query::table(&PATIENTS).path(), "/rest/v1/patients");
    }

    #[test]
    fn filters_are_encoded() {
        let path = Query::table(&CONSULTATIONS)
            .select("*,patient:patients(id,last_name)")
            .gte("consultation_date", "2026-10-19T00:00:00")
            .lt("consultation_date", "2026-10-20T00:00:00")
            .order("consultation_date.desc")
            .limit(25)
            .offset(50)
            .path();

        assert_eq!(
            path,
            "/rest/v1/consultations?select=%2A%2Cpatient%3Apatients%28id%2Clast_name%29\
             &consultation_date=gte.2026-10-19T00%3A00%3A00\
             &consultation_date=lt.2026-10-20T00%3A00%3A00\
             &order=consultation_date.desc&limit=25&offset=50"
        );
    }

    #[test]
    fn ieq_matches_the_whole_value() {
        let q = Query::table(&PATIENTS).ieq("email", "Dr.Alami@Cabinet.ma");
        assert_eq!(q.path(), "/rest/v1/patients?email=ilike.Dr.Alami%40Cabinet.ma");
    }

    #[test]
    fn ieq_escapes_like_wildcards() {
        let q = Query::table(&PATIENTS).ieq("email", "a_b%c@x.ma");
        assert_eq!(q.path(), "/rest/v1/patients?email=ilike.a%5C_b%5C%25c%40x.ma");

        let starred = Query::table(&PATIENTS).ieq("email", "a*b@x.ma");
        assert_eq!(starred.path(), "/rest/v1/patients?email=eq.a%2Ab%40x.ma");
    }

    #[test]
    fn search_quotes_user_input() {
        let clause = ilike_clause("last_name", "el \"Amrani\", *");
        assert_eq!(clause, "last_name.ilike.\"*el \\\"Amrani\\\",*\"");
    }

    #[test]
    fn counts_drop_paging_params() {
        let q = Query::table(&PATIENTS)
            .select("*")
            .search(&["last_name", "cin"], "ben")
            .order("id.desc")
            .limit(25);
        let counted = q.filters_only();

        assert_eq!(
            counted.path(),
            Query::table(&PATIENTS).search(&["last_name", "cin"], "ben").path()
        );
    }

    #[test]
    fn day_range_is_half_open() {
        let day = NaiveDate::from_ymd_opt(2026, 12, 31).unwrap();
        let path = Query::table(&CONSULTATIONS).on_day("consultation_date", day).path();

        assert_eq!(
            path,
            "/rest/v1/consultations?consultation_date=gte.2026-12-31T00%3A00%3A00\
             &consultation_date=lt.2027-01-01T00%3A00%3A00"
        );
    }

    #[test]
    fn empty_or_is_skipped() {
        assert_eq!(Query::table(&PATIENTS).or(vec![]).path(), "/rest/v1/patients");
    }
}
